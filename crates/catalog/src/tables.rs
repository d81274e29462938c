//! Catalog tables from delimited exports.

use std::collections::BTreeSet;
use std::io::Read;

use crate::error::CatalogError;
use crate::model::{MetricDescriptor, SystemId};

pub const METRICS_TABLE: &str = "metrics";
pub const SYSTEMS_TABLE: &str = "systems";

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Parse a system ID cell. Exports from dataframe tools sometimes write
/// integer IDs as `1283.0`.
pub fn parse_system_id(table: &str, value: &str) -> Result<SystemId, CatalogError> {
    let v = value.trim();
    v.parse::<SystemId>()
        .ok()
        .or_else(|| v.strip_suffix(".0").and_then(|s| s.parse().ok()))
        .ok_or_else(|| CatalogError::SystemIdParse {
            table: table.into(),
            value: value.into(),
        })
}

/// Metric rows: `system_id`, `sensor_name`, `common_name` (other columns ignored).
pub fn metrics_from_csv<R: Read>(reader: R) -> Result<Vec<MetricDescriptor>, CatalogError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let idx = |name: &str| -> Result<usize, CatalogError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CatalogError::MissingColumn {
                table: METRICS_TABLE.into(),
                column: name.into(),
            })
    };
    let system_id_idx = idx("system_id")?;
    let sensor_idx = idx("sensor_name")?;
    let common_idx = idx("common_name")?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let system_id = parse_system_id(METRICS_TABLE, record.get(system_id_idx).unwrap_or(""))?;
        rows.push(MetricDescriptor {
            system_id,
            key: None,
            sensor_name: record.get(sensor_idx).and_then(non_empty),
            common_name: record.get(common_idx).and_then(non_empty),
        });
    }
    Ok(rows)
}

/// Distinct `system_id` values of a table.
pub fn system_ids_from_csv<R: Read>(table: &str, reader: R) -> Result<BTreeSet<SystemId>, CatalogError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let system_id_idx = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == "system_id")
        .ok_or_else(|| CatalogError::MissingColumn {
            table: table.into(),
            column: "system_id".into(),
        })?;

    let mut ids = BTreeSet::new();
    for record in reader.records() {
        let record = record?;
        ids.insert(parse_system_id(table, record.get(system_id_idx).unwrap_or(""))?);
    }
    Ok(ids)
}
