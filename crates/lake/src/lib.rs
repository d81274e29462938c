//! PVDAQ data lake access: object listing and download, bulk fetch into the
//! local data directory, and the time-series existence probe.

pub mod client;
pub mod error;
pub mod fetch;
pub mod layout;
pub mod listing;
pub mod probe;

pub use client::{LakeClient, LakeConfig, ObjectStore};
pub use error::LakeError;
pub use fetch::{fetch, FetchOptions, FetchOutcome};
pub use listing::ObjectEntry;
pub use probe::LakeProbe;
