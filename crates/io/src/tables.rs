//! Catalog table directories.
//!
//! A table is a directory of part files, as the lake publishes them. Parquet
//! parts win; if a directory has none, `.csv` exports of the same table are
//! read instead.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use pvcat_catalog::tables::{metrics_from_csv, system_ids_from_csv, METRICS_TABLE, SYSTEMS_TABLE};
use pvcat_catalog::{CatalogTables, MetricDescriptor, SystemId};
use tracing::{debug, info};

use crate::columnar::{metrics_from_parquet, system_ids_from_parquet};
use crate::error::IoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartFormat {
    Parquet,
    Csv,
}

/// Part files of a table directory, sorted by name.
pub fn table_parts(table: &str, dir: &Path) -> Result<(PartFormat, Vec<PathBuf>), IoError> {
    let entries = std::fs::read_dir(dir).map_err(|e| IoError::io(dir, e))?;
    let mut parquet = Vec::new();
    let mut csv = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| IoError::io(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("parquet") => parquet.push(path),
            Some("csv") => csv.push(path),
            _ => {}
        }
    }
    parquet.sort();
    csv.sort();

    if !parquet.is_empty() {
        Ok((PartFormat::Parquet, parquet))
    } else if !csv.is_empty() {
        Ok((PartFormat::Csv, csv))
    } else {
        Err(IoError::EmptyTable {
            path: dir.to_path_buf(),
            table: table.to_string(),
        })
    }
}

fn open(path: &Path) -> Result<File, IoError> {
    File::open(path).map_err(|e| IoError::io(path, e))
}

pub fn load_metrics(dir: &Path) -> Result<Vec<MetricDescriptor>, IoError> {
    let (format, parts) = table_parts(METRICS_TABLE, dir)?;
    let mut rows = Vec::new();
    for part in &parts {
        let mut part_rows = match format {
            PartFormat::Parquet => metrics_from_parquet(part)?,
            PartFormat::Csv => metrics_from_csv(open(part)?).map_err(|e| IoError::catalog(part, e))?,
        };
        debug!(file = %part.display(), rows = part_rows.len(), "metrics part read");
        rows.append(&mut part_rows);
    }
    Ok(rows)
}

pub fn load_system_ids(dir: &Path) -> Result<BTreeSet<SystemId>, IoError> {
    let (format, parts) = table_parts(SYSTEMS_TABLE, dir)?;
    let mut ids = BTreeSet::new();
    for part in &parts {
        let part_ids = match format {
            PartFormat::Parquet => system_ids_from_parquet(SYSTEMS_TABLE, part)?,
            PartFormat::Csv => {
                system_ids_from_csv(SYSTEMS_TABLE, open(part)?).map_err(|e| IoError::catalog(part, e))?
            }
        };
        ids.extend(part_ids);
    }
    Ok(ids)
}

/// Load the metrics and systems tables.
pub fn load_catalog(metrics_dir: &Path, systems_dir: &Path) -> Result<CatalogTables, IoError> {
    let metrics = load_metrics(metrics_dir)?;
    let system_ids = load_system_ids(systems_dir)?;
    info!(
        metric_rows = metrics.len(),
        systems = system_ids.len(),
        "catalog tables loaded"
    );
    Ok(CatalogTables { metrics, system_ids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columnar::testutil::write_metrics;

    #[test]
    fn parquet_parts_are_concatenated() {
        let dir = tempfile::tempdir().unwrap();
        write_metrics(&dir.path().join("part-0.parquet"), &[(1, "a_pow", "AC Power")]);
        write_metrics(&dir.path().join("part-1.parquet"), &[(2, "ghi", "Irradiance")]);
        std::fs::write(dir.path().join("_SUCCESS"), "").unwrap();

        let rows = load_metrics(dir.path()).unwrap();
        assert_eq!(rows.iter().map(|r| r.system_id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn csv_exports_as_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("system.csv"), "system_id,name\n4,a\n2045,b\n").unwrap();
        let ids = load_system_ids(dir.path()).unwrap();
        assert_eq!(ids, BTreeSet::from([4, 2045]));
    }

    #[test]
    fn empty_table_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.txt"), "").unwrap();
        let err = load_metrics(dir.path()).unwrap_err();
        assert!(matches!(err, IoError::EmptyTable { ref table, .. } if table == "metrics"));
    }

    #[test]
    fn bad_csv_part_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("system.csv"), "system_id\nxyz\n").unwrap();
        let err = load_system_ids(dir.path()).unwrap_err();
        assert!(err.to_string().contains("system.csv"));
    }
}
