//! Where things live under the local data directory.
//!
//! ```text
//! <root>/
//!   raw/systems_20250729.csv        reference index
//!   raw/prize-metadata/             <id>_system_metadata.json
//!   raw/csv-metadata/               <id>_system_metadata.json (+ pdf)
//!   raw/parquet-metrics/            catalog metrics table
//!   raw/parquet-sites/
//!   raw/parquet-systems/            catalog systems table
//!   raw/systems/prize/<id>/         prize time series
//!   raw/systems/parquet/<id>/       lake time series
//!   core/systems_cleaned.csv        enriched record set
//!   logs/logs.csv                   access log
//!   data_inventory.csv
//! ```

use std::path::{Path, PathBuf};

use pvcat_catalog::SystemId;

pub const REFERENCE_FILE: &str = "systems_20250729.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DataLayout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    pub fn reference_index(&self) -> PathBuf {
        self.raw_dir().join(REFERENCE_FILE)
    }

    pub fn prize_metadata_dir(&self) -> PathBuf {
        self.raw_dir().join("prize-metadata")
    }

    pub fn csv_metadata_dir(&self) -> PathBuf {
        self.raw_dir().join("csv-metadata")
    }

    pub fn parquet_metrics_dir(&self) -> PathBuf {
        self.raw_dir().join("parquet-metrics")
    }

    pub fn parquet_sites_dir(&self) -> PathBuf {
        self.raw_dir().join("parquet-sites")
    }

    pub fn parquet_systems_dir(&self) -> PathBuf {
        self.raw_dir().join("parquet-systems")
    }

    pub fn prize_series_dir(&self, system_id: SystemId) -> PathBuf {
        self.raw_dir().join("systems").join("prize").join(system_id.to_string())
    }

    pub fn parquet_series_dir(&self, system_id: SystemId) -> PathBuf {
        self.raw_dir().join("systems").join("parquet").join(system_id.to_string())
    }

    pub fn cleaned_records(&self) -> PathBuf {
        self.root.join("core").join("systems_cleaned.csv")
    }

    pub fn access_log(&self) -> PathBuf {
        self.root.join("logs").join("logs.csv")
    }

    pub fn data_inventory(&self) -> PathBuf {
        self.root.join("data_inventory.csv")
    }
}

/// Render a directory path with a trailing separator, the form the fetcher
/// requires for its destination.
pub fn dir_string(path: &Path) -> String {
    let mut s = path.to_string_lossy().into_owned();
    if !s.ends_with('/') && !s.ends_with('\\') {
        s.push(std::path::MAIN_SEPARATOR);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_root() {
        let layout = DataLayout::new("/data");
        assert_eq!(layout.reference_index(), Path::new("/data/raw/systems_20250729.csv"));
        assert_eq!(layout.prize_series_dir(2105), Path::new("/data/raw/systems/prize/2105"));
        assert_eq!(layout.cleaned_records(), Path::new("/data/core/systems_cleaned.csv"));
    }

    #[test]
    fn dir_string_adds_one_separator() {
        let s = dir_string(Path::new("/data/raw"));
        assert!(s.ends_with('/') || s.ends_with('\\'));
        assert_eq!(dir_string(Path::new("/data/raw/")), "/data/raw/");
    }
}
