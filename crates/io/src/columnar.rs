//! Catalog tables stored as Parquet.
//!
//! Files are read row by row through the record API; only the columns the
//! catalog needs are looked at.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::{Field, Row};
use pvcat_catalog::{CatalogError, MetricDescriptor, SystemId};

use crate::error::IoError;

const SYSTEM_ID: &str = "system_id";

fn open(path: &Path) -> Result<SerializedFileReader<File>, IoError> {
    let file = File::open(path).map_err(|e| IoError::io(path, e))?;
    SerializedFileReader::new(file).map_err(|source| IoError::Parquet {
        path: path.to_path_buf(),
        source,
    })
}

fn for_each_row(path: &Path, mut f: impl FnMut(&Row) -> Result<(), IoError>) -> Result<usize, IoError> {
    let reader = open(path)?;
    let parquet_err = |source| IoError::Parquet {
        path: path.to_path_buf(),
        source,
    };
    let rows = reader.get_row_iter(None).map_err(parquet_err)?;
    let mut n = 0;
    for row in rows {
        let row = row.map_err(parquet_err)?;
        f(&row)?;
        n += 1;
    }
    Ok(n)
}

fn field<'a>(row: &'a Row, name: &str) -> Option<&'a Field> {
    row.get_column_iter().find(|(col, _)| col.as_str() == name).map(|(_, f)| f)
}

/// Integer-like cell to a system ID. Dataframe writers use int32, int64 or
/// float64 depending on whether the column ever held nulls.
fn system_id_of(table: &str, path: &Path, field: Option<&Field>) -> Result<SystemId, IoError> {
    let bad = |value: String| {
        IoError::catalog(
            path,
            CatalogError::SystemIdParse {
                table: table.to_string(),
                value,
            },
        )
    };
    let Some(field) = field else {
        return Err(IoError::catalog(
            path,
            CatalogError::MissingColumn {
                table: table.to_string(),
                column: SYSTEM_ID.to_string(),
            },
        ));
    };

    let wide: Option<i64> = match field {
        Field::Short(v) => Some(i64::from(*v)),
        Field::Int(v) => Some(i64::from(*v)),
        Field::Long(v) => Some(*v),
        Field::UShort(v) => Some(i64::from(*v)),
        Field::UInt(v) => Some(i64::from(*v)),
        Field::ULong(v) => i64::try_from(*v).ok(),
        Field::Double(v) if v.fract() == 0.0 => Some(*v as i64),
        Field::Str(s) => {
            return pvcat_catalog::tables::parse_system_id(table, s).map_err(|e| IoError::catalog(path, e))
        }
        _ => None,
    };
    wide.and_then(|v| SystemId::try_from(v).ok())
        .ok_or_else(|| bad(field.to_string()))
}

fn text_of(field: Option<&Field>) -> Option<String> {
    match field {
        Some(Field::Str(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Metric rows from one Parquet file of the metrics table.
pub fn metrics_from_parquet(path: &Path) -> Result<Vec<MetricDescriptor>, IoError> {
    let table = pvcat_catalog::tables::METRICS_TABLE;
    let mut rows = Vec::new();
    for_each_row(path, |row| {
        rows.push(MetricDescriptor {
            system_id: system_id_of(table, path, field(row, SYSTEM_ID))?,
            key: None,
            sensor_name: text_of(field(row, "sensor_name")),
            common_name: text_of(field(row, "common_name")),
        });
        Ok(())
    })?;
    Ok(rows)
}

/// Distinct system IDs in one Parquet file.
pub fn system_ids_from_parquet(table: &str, path: &Path) -> Result<BTreeSet<SystemId>, IoError> {
    let mut ids = BTreeSet::new();
    for_each_row(path, |row| {
        ids.insert(system_id_of(table, path, field(row, SYSTEM_ID))?);
        Ok(())
    })?;
    Ok(ids)
}
