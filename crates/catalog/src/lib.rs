//! `pvcat-catalog`: capability catalog engine.
//!
//! Pure engine crate: receives pre-loaded reference records, metadata
//! documents and catalog tables, returns enriched records. The only outside
//! world it touches is the [`ExistenceProbe`] the caller hands in.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod first_year;
pub mod matcher;
pub mod metadata;
pub mod model;
pub mod reconcile;
pub mod records;
pub mod summary;
pub mod tables;

pub use config::CatalogConfig;
pub use engine::run;
pub use error::CatalogError;
pub use first_year::{ExistenceProbe, ProbeError, Resolution, ResolutionStatus};
pub use metadata::MetadataDocument;
pub use model::{CatalogInput, CatalogResult, CatalogTables, MetricDescriptor, RecordSet, SystemId, SystemRecord};
