//! Local data directory I/O for `pvcat`.
//!
//! Everything here reads or writes files under a [`DataLayout`]; nothing
//! talks to the network.

pub mod columnar;
pub mod documents;
pub mod error;
pub mod layout;
pub mod records;
pub mod tables;

use pvcat_catalog::CatalogInput;

pub use documents::load_documents;
pub use error::IoError;
pub use layout::DataLayout;
pub use records::{load_records, save_records};
pub use tables::load_catalog;

/// Load every source the catalog run needs from a synced data directory.
pub fn load_input(layout: &DataLayout) -> Result<CatalogInput, IoError> {
    Ok(CatalogInput {
        reference: load_records(&layout.reference_index())?,
        prize: load_documents(&layout.prize_metadata_dir())?,
        catalog: load_catalog(&layout.parquet_metrics_dir(), &layout.parquet_systems_dir())?,
        csv: load_documents(&layout.csv_metadata_dir())?,
    })
}
