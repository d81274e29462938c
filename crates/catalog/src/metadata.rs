//! Per-system JSON metadata documents.
//!
//! ```json
//! {
//!   "System":  { "system_id": 1200, "started_on": "2011-04-05 00:00:00", ... },
//!   "Metrics": { "ac_power": { "sensor_name": "inv_ac_pwr", "common_name": "AC Power" }, ... }
//! }
//! ```
//!
//! `Metrics` is optional: documents for systems publishing only the standard
//! output schema leave it out.

use chrono::Datelike;
use serde_json::{Map, Value};

use crate::error::CatalogError;
use crate::model::{MetricDescriptor, SourceKind, SystemId};
use crate::records::parse_timestamp;

pub const METADATA_SUFFIX: &str = "_system_metadata.json";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataDocument {
    pub system: Map<String, Value>,
    /// `None` when the document has no `Metrics` section at all.
    pub metrics: Option<Vec<ChannelEntry>>,
}

/// One entry of the `Metrics` object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelEntry {
    pub key: String,
    pub sensor_name: Option<String>,
    pub common_name: Option<String>,
}

impl MetadataDocument {
    pub fn from_json(system_id: SystemId, text: &str) -> Result<Self, CatalogError> {
        let value: Value = serde_json::from_str(text).map_err(|e| CatalogError::MetadataParse {
            system_id,
            message: e.to_string(),
        })?;
        let Value::Object(mut root) = value else {
            return Err(CatalogError::MetadataParse {
                system_id,
                message: "top level is not an object".into(),
            });
        };

        let system = match root.remove("System") {
            Some(Value::Object(map)) => map,
            _ => {
                return Err(CatalogError::MissingMetadataField {
                    system_id,
                    field: "System".into(),
                })
            }
        };

        let metrics = match root.remove("Metrics") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(
                map.into_iter()
                    .map(|(key, entry)| ChannelEntry {
                        sensor_name: string_field(&entry, "sensor_name"),
                        common_name: string_field(&entry, "common_name"),
                        key,
                    })
                    .collect(),
            ),
            Some(_) => {
                return Err(CatalogError::MetadataParse {
                    system_id,
                    message: "'Metrics' is not an object".into(),
                })
            }
        };

        Ok(Self { system, metrics })
    }

    /// Channels as descriptors, or `None` if the document has no `Metrics`.
    pub fn descriptors(&self, system_id: SystemId) -> Option<Vec<MetricDescriptor>> {
        self.metrics.as_ref().map(|entries| {
            entries
                .iter()
                .map(|e| MetricDescriptor {
                    system_id,
                    key: Some(e.key.clone()),
                    sensor_name: e.sensor_name.clone(),
                    common_name: e.common_name.clone(),
                })
                .collect()
        })
    }

    /// Year of the source-specific first timestamp, if the document has one.
    pub fn first_year(&self, system_id: SystemId, source: SourceKind) -> Result<Option<i32>, CatalogError> {
        let Some(key) = source.timestamp_key() else {
            return Ok(None);
        };
        match self.system.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => parse_timestamp(s)
                .map(|ts| Some(ts.year()))
                .ok_or_else(|| CatalogError::TimestampParse {
                    system_id,
                    value: s.clone(),
                }),
            Some(other) => Err(CatalogError::TimestampParse {
                system_id,
                value: other.to_string(),
            }),
        }
    }
}

fn string_field(entry: &Value, field: &str) -> Option<String> {
    entry
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// `1234_system_metadata.json` -> `1234`.
pub fn system_id_from_filename(name: &str) -> Option<SystemId> {
    name.strip_suffix(METADATA_SUFFIX)?.parse().ok()
}
