use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDateTime};
use serde::Serialize;

use crate::metadata::MetadataDocument;

/// Stable integer identifier of a physical installation.
pub type SystemId = u32;

/// Records keyed by system ID. Ordered so output is deterministic.
pub type RecordSet = BTreeMap<SystemId, SystemRecord>;

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// A semantic signal category a system may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Irradiance,
    Power,
    AmbientTemperature,
    SomeTemperature,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Irradiance,
        Capability::Power,
        Capability::AmbientTemperature,
        Capability::SomeTemperature,
    ];

    /// Canonical fragment searched for in channel labels.
    ///
    /// `rrad` rather than `irrad`: sources disagree on the case of the
    /// leading letter.
    pub fn fragment(&self) -> &'static str {
        match self {
            Self::Irradiance => "rrad",
            Self::Power => "pow",
            Self::AmbientTemperature => "mbient",
            Self::SomeTemperature => "temp",
        }
    }

    /// Column name in the persisted record set.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Irradiance => "has_irrad_data",
            Self::Power => "has_power_data",
            Self::AmbientTemperature => "has_ambient_temp_data",
            Self::SomeTemperature => "has_some_temp_data",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Irradiance => write!(f, "irradiance"),
            Self::Power => write!(f, "power"),
            Self::AmbientTemperature => write!(f, "ambient_temperature"),
            Self::SomeTemperature => write!(f, "some_temperature"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CapabilityFlags {
    pub irradiance: bool,
    pub power: bool,
    pub ambient_temperature: bool,
    pub some_temperature: bool,
}

impl CapabilityFlags {
    pub fn get(&self, cap: Capability) -> bool {
        match cap {
            Capability::Irradiance => self.irradiance,
            Capability::Power => self.power,
            Capability::AmbientTemperature => self.ambient_temperature,
            Capability::SomeTemperature => self.some_temperature,
        }
    }

    /// Set a flag. Flags only ever go from false to true.
    pub fn set(&mut self, cap: Capability) {
        match cap {
            Capability::Irradiance => self.irradiance = true,
            Capability::Power => self.power = true,
            Capability::AmbientTemperature => self.ambient_temperature = true,
            Capability::SomeTemperature => self.some_temperature = true,
        }
    }

    pub fn union(self, other: CapabilityFlags) -> CapabilityFlags {
        CapabilityFlags {
            irradiance: self.irradiance || other.irradiance,
            power: self.power || other.power,
            ambient_temperature: self.ambient_temperature || other.ambient_temperature,
            some_temperature: self.some_temperature || other.some_temperature,
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Which evidentiary source a stage reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Hand-picked prize collection (per-system JSON documents).
    Prize,
    /// Columnar catalog (metrics / systems tables).
    LakeParquet,
    /// Per-system JSON documents published next to the CSV exports.
    LakeCsv,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Prize, SourceKind::LakeParquet, SourceKind::LakeCsv];

    /// Column name in the persisted record set.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Prize => "is_prize_data",
            Self::LakeParquet => "is_lake_parquet_data",
            Self::LakeCsv => "is_lake_csv_data",
        }
    }

    /// Key inside the document's `System` object holding the first timestamp.
    /// The catalog source has no documents.
    pub fn timestamp_key(&self) -> Option<&'static str> {
        match self {
            Self::Prize => Some("first_timestamp"),
            Self::LakeParquet => None,
            Self::LakeCsv => Some("started_on"),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prize => write!(f, "prize"),
            Self::LakeParquet => write!(f, "lake_parquet"),
            Self::LakeCsv => write!(f, "lake_csv"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceFlags {
    pub prize: bool,
    pub lake_parquet: bool,
    pub lake_csv: bool,
}

impl SourceFlags {
    pub fn get(&self, source: SourceKind) -> bool {
        match source {
            SourceKind::Prize => self.prize,
            SourceKind::LakeParquet => self.lake_parquet,
            SourceKind::LakeCsv => self.lake_csv,
        }
    }

    pub fn set(&mut self, source: SourceKind) {
        match source {
            SourceKind::Prize => self.prize = true,
            SourceKind::LakeParquet => self.lake_parquet = true,
            SourceKind::LakeCsv => self.lake_csv = true,
        }
    }

    pub fn union(self, other: SourceFlags) -> SourceFlags {
        SourceFlags {
            prize: self.prize || other.prize,
            lake_parquet: self.lake_parquet || other.lake_parquet,
            lake_csv: self.lake_csv || other.lake_csv,
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One physical installation as known to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemRecord {
    pub system_id: SystemId,
    pub first_timestamp: Option<NaiveDateTime>,
    pub first_year: Option<i32>,
    pub sources: SourceFlags,
    pub capabilities: CapabilityFlags,
    /// Remaining reference-index columns, in their original order.
    #[serde(skip)]
    pub extra: Vec<(String, String)>,
}

impl SystemRecord {
    pub fn new(system_id: SystemId, first_timestamp: Option<NaiveDateTime>) -> Self {
        Self {
            system_id,
            first_timestamp,
            first_year: first_timestamp.map(|ts| ts.year()),
            sources: SourceFlags::default(),
            capabilities: CapabilityFlags::default(),
            extra: Vec::new(),
        }
    }

    /// Combine this record with one stage's evidence, producing a new record.
    ///
    /// Flags are OR-ed and the first year only moves forward, so merging is
    /// commutative across stages and idempotent.
    pub fn merge(&self, evidence: &Evidence) -> SystemRecord {
        let first_year = match (self.first_year, evidence.first_year) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        SystemRecord {
            first_year,
            sources: self.sources.union(evidence.sources),
            capabilities: self.capabilities.union(evidence.capabilities),
            ..self.clone()
        }
    }
}

/// What one stage concluded about one system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evidence {
    pub sources: SourceFlags,
    pub capabilities: CapabilityFlags,
    pub first_year: Option<i32>,
}

/// One named channel within a source.
///
/// `key` is the channel name of a JSON `Metrics` entry; catalog rows have
/// none. Either label may be missing depending on the source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub system_id: SystemId,
    pub key: Option<String>,
    pub sensor_name: Option<String>,
    pub common_name: Option<String>,
}

impl MetricDescriptor {
    /// Labels to test, in order: key, sensor name, common name.
    pub fn labels(&self) -> impl Iterator<Item = (Label, &str)> {
        [
            (Label::Key, self.key.as_deref()),
            (Label::SensorName, self.sensor_name.as_deref()),
            (Label::CommonName, self.common_name.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, text)| text.map(|t| (label, t)))
    }
}

/// Which label of a descriptor produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Key,
    SensorName,
    CommonName,
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Metrics and systems tables of the columnar catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogTables {
    pub metrics: Vec<MetricDescriptor>,
    pub system_ids: BTreeSet<SystemId>,
}

impl CatalogTables {
    pub fn metric_system_ids(&self) -> BTreeSet<SystemId> {
        self.metrics.iter().map(|m| m.system_id).collect()
    }
}

/// Pre-loaded sources for one run.
pub struct CatalogInput {
    pub reference: RecordSet,
    pub prize: BTreeMap<SystemId, MetadataDocument>,
    pub catalog: CatalogTables,
    pub csv: BTreeMap<SystemId, MetadataDocument>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CatalogResult {
    pub meta: CatalogMeta,
    pub summary: crate::summary::RunSummary,
    #[serde(skip)]
    pub records: RecordSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogMeta {
    pub engine_version: String,
    pub run_at: String,
    pub horizon: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn new_record_derives_year_and_defaults_flags() {
        let r = SystemRecord::new(10, Some(ts(2011)));
        assert_eq!(r.first_year, Some(2011));
        assert_eq!(r.sources, SourceFlags::default());
        assert_eq!(r.capabilities, CapabilityFlags::default());
    }

    #[test]
    fn merge_never_clears_flags() {
        let mut r = SystemRecord::new(10, Some(ts(2011)));
        r.capabilities.set(Capability::Power);
        r.sources.set(SourceKind::Prize);

        let merged = r.merge(&Evidence::default());
        assert!(merged.capabilities.power);
        assert!(merged.sources.prize);
        assert_eq!(merged.first_year, Some(2011));
    }

    #[test]
    fn merge_keeps_later_year() {
        let r = SystemRecord::new(10, Some(ts(2011)));
        let earlier = Evidence { first_year: Some(2009), ..Evidence::default() };
        let later = Evidence { first_year: Some(2014), ..Evidence::default() };
        assert_eq!(r.merge(&earlier).first_year, Some(2011));
        assert_eq!(r.merge(&later).first_year, Some(2014));
        assert_eq!(SystemRecord::new(11, None).merge(&earlier).first_year, Some(2009));
    }

    #[test]
    fn merge_is_order_independent() {
        let r = SystemRecord::new(10, Some(ts(2011)));
        let mut a = Evidence::default();
        a.capabilities.set(Capability::Irradiance);
        a.sources.set(SourceKind::Prize);
        let mut b = Evidence { first_year: Some(2013), ..Evidence::default() };
        b.capabilities.set(Capability::AmbientTemperature);

        assert_eq!(r.merge(&a).merge(&b), r.merge(&b).merge(&a));
        assert_eq!(r.merge(&a).merge(&a), r.merge(&a));
    }

    #[test]
    fn descriptor_labels_skip_missing() {
        let d = MetricDescriptor {
            system_id: 1,
            key: None,
            sensor_name: Some("ac_power".into()),
            common_name: None,
        };
        let labels: Vec<_> = d.labels().collect();
        assert_eq!(labels, vec![(Label::SensorName, "ac_power")]);
    }
}
