//! Record sets on disk.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use pvcat_catalog::records::{read_records, write_records};
use pvcat_catalog::RecordSet;
use tracing::info;

use crate::error::IoError;

/// Read a record set, or the raw reference index, from a CSV file.
pub fn load_records(path: &Path) -> Result<RecordSet, IoError> {
    let file = File::open(path).map_err(|e| IoError::io(path, e))?;
    let records = read_records(BufReader::new(file)).map_err(|e| IoError::catalog(path, e))?;
    info!(file = %path.display(), systems = records.len(), "records loaded");
    Ok(records)
}

/// Write a record set, creating parent directories as needed.
pub fn save_records(path: &Path, records: &RecordSet) -> Result<(), IoError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| IoError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| IoError::io(path, e))?;
    write_records(BufWriter::new(file), records).map_err(|e| IoError::catalog(path, e))?;
    info!(file = %path.display(), systems = records.len(), "records written");
    Ok(())
}
