//! Key layout of the PVDAQ data lake in the `oedi-data-lake` bucket.

use std::fmt;

use pvcat_catalog::SystemId;

pub const BUCKET: &str = "oedi-data-lake";

pub const REFERENCE_INDEX_KEY: &str = "pvdaq/csv/systems_20250729.csv";
pub const CSV_METADATA_PREFIX: &str = "pvdaq/csv/system_metadata/";
pub const PARQUET_METRICS_PREFIX: &str = "pvdaq/parquet/metrics/";
pub const PARQUET_SITES_PREFIX: &str = "pvdaq/parquet/site/";
pub const PARQUET_SYSTEMS_PREFIX: &str = "pvdaq/parquet/system/";

const PRIZE_ROOT: &str = "pvdaq/2023-solar-data-prize";
const PVDATA_ROOT: &str = "pvdaq/parquet/pvdata";

/// Data groups published per prize system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrizeGroup {
    Environment,
    Irradiance,
}

impl PrizeGroup {
    pub const ALL: [PrizeGroup; 2] = [PrizeGroup::Environment, PrizeGroup::Irradiance];
}

impl fmt::Display for PrizeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrizeGroup::Environment => write!(f, "environment"),
            PrizeGroup::Irradiance => write!(f, "irradiance"),
        }
    }
}

/// Metadata folder of a prize dataset. `dataset` is the system ID or the
/// dataset name when they differ (`7333_5_min`).
pub fn prize_metadata_prefix(dataset: &str) -> String {
    format!("{PRIZE_ROOT}/{dataset}_OEDI/metadata/")
}

pub fn prize_data_prefix(dataset: &str, group: PrizeGroup) -> String {
    format!("{PRIZE_ROOT}/{dataset}_OEDI/data/{dataset}_{group}")
}

/// Every time-series object of one system.
pub fn pvdata_prefix(system_id: SystemId) -> String {
    format!("{PVDATA_ROOT}/system_id={system_id}/")
}

/// Time-series partition for one year. No trailing slash: the probe only
/// asks whether anything starts with it.
pub fn pvdata_year_prefix(system_id: SystemId, year: i32) -> String {
    format!("{PVDATA_ROOT}/system_id={system_id}/year={year}")
}
