use std::path::PathBuf;

use pvcat_catalog::CatalogError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem error on a specific path.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file was read but its contents are not usable.
    #[error("{}: {source}", path.display())]
    Catalog {
        path: PathBuf,
        #[source]
        source: CatalogError,
    },
    #[error("{}: parquet: {source}", path.display())]
    Parquet {
        path: PathBuf,
        #[source]
        source: parquet::errors::ParquetError,
    },
    /// A catalog table directory holds neither `.parquet` nor `.csv` files.
    #[error("{}: no .parquet or .csv files for table '{table}'", path.display())]
    EmptyTable { path: PathBuf, table: String },
}

impl IoError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IoError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn catalog(path: impl Into<PathBuf>, source: CatalogError) -> Self {
        IoError::Catalog {
            path: path.into(),
            source,
        }
    }

    /// The underlying catalog error, if this is one.
    pub fn as_catalog(&self) -> Option<&CatalogError> {
        match self {
            IoError::Catalog { source, .. } => Some(source),
            _ => None,
        }
    }
}
