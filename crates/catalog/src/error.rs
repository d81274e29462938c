use std::collections::BTreeSet;

use thiserror::Error;

use crate::model::SystemId;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty prize list, horizon out of range, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// The catalog's orphan set is not the documented exception set.
    #[error(
        "identity mismatch: catalog systems missing from the reference index \
         expected {expected:?}, found {actual:?}"
    )]
    IdentityMismatch {
        expected: BTreeSet<SystemId>,
        actual: BTreeSet<SystemId>,
    },
    /// Missing required column in a table.
    #[error("table '{table}': missing column '{column}'")]
    MissingColumn { table: String, column: String },
    /// A cell that should hold a system ID does not.
    #[error("table '{table}': cannot parse system_id '{value}'")]
    SystemIdParse { table: String, value: String },
    /// Timestamp parse error.
    #[error("system {system_id}: cannot parse timestamp '{value}'")]
    TimestampParse { system_id: SystemId, value: String },
    /// Year parse error.
    #[error("system {system_id}: cannot parse year '{value}'")]
    YearParse { system_id: SystemId, value: String },
    /// Flag cell that is neither true nor false.
    #[error("system {system_id}, column '{column}': cannot parse flag '{value}'")]
    FlagParse {
        system_id: SystemId,
        column: String,
        value: String,
    },
    /// Duplicate primary key in a record set.
    #[error("duplicate system_id {0} in record set")]
    DuplicateSystem(SystemId),
    /// Metadata document lacks its `System` section or timestamp key.
    #[error("system {system_id}: metadata document has no '{field}'")]
    MissingMetadataField { system_id: SystemId, field: String },
    /// JSON parse error in a metadata document.
    #[error("system {system_id}: invalid metadata document: {message}")]
    MetadataParse { system_id: SystemId, message: String },
    /// CSV read/write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// IO error (file read, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
