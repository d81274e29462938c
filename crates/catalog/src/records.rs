//! Persisted record set.
//!
//! The same reader handles the raw reference index (system_id,
//! first_timestamp and whatever else the export carries) and record sets
//! written by [`write_records`]: flag and year columns that are absent take
//! their defaults.

use std::io::{Read, Write};

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::CatalogError;
use crate::model::{Capability, RecordSet, SourceKind, SystemId, SystemRecord};

pub const SYSTEM_ID: &str = "system_id";
pub const FIRST_TIMESTAMP: &str = "first_timestamp";
pub const FIRST_YEAR: &str = "first_year";

const TIMESTAMP_WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TIMESTAMP_READ_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];

/// Fixed leading columns of a written record set.
pub fn record_columns() -> Vec<&'static str> {
    let mut cols = vec![SYSTEM_ID, FIRST_TIMESTAMP, FIRST_YEAR];
    cols.extend(SourceKind::ALL.iter().map(|s| s.column()));
    cols.extend(Capability::ALL.iter().map(|c| c.column()));
    cols
}

/// Parse a timestamp in any of the formats the sources use.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    TIMESTAMP_READ_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// `None` for anything that is not a recognizable boolean.
fn parse_flag(s: &str) -> Option<bool> {
    match s.trim() {
        "" | "False" | "false" | "FALSE" | "0" => Some(false),
        "True" | "true" | "TRUE" | "1" => Some(true),
        _ => None,
    }
}

fn format_flag(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

/// Years written by dataframe tools may carry a `.0` suffix.
fn parse_year(s: &str) -> Option<i32> {
    let s = s.trim();
    s.parse::<i32>().ok().or_else(|| {
        let f: f64 = s.parse().ok()?;
        (f.fract() == 0.0 && f.abs() < 10_000.0).then_some(f as i32)
    })
}

/// Read a record set (or the raw reference index).
pub fn read_records<R: Read>(reader: R) -> Result<RecordSet, CatalogError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let idx = |name: &str| headers.iter().position(|h| h == name);
    let system_id_idx = idx(SYSTEM_ID).ok_or_else(|| CatalogError::MissingColumn {
        table: "records".into(),
        column: SYSTEM_ID.into(),
    })?;
    let timestamp_idx = idx(FIRST_TIMESTAMP);
    let year_idx = idx(FIRST_YEAR);
    let source_idx: Vec<(SourceKind, Option<usize>)> =
        SourceKind::ALL.iter().map(|s| (*s, idx(s.column()))).collect();
    let capability_idx: Vec<(Capability, Option<usize>)> =
        Capability::ALL.iter().map(|c| (*c, idx(c.column()))).collect();

    let known = record_columns();
    // Empty header names come from trailing commas in the raw export.
    let extra_idx: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !h.is_empty() && !known.contains(&h.as_str()))
        .map(|(i, _)| i)
        .collect();

    let mut records = RecordSet::new();

    for row in reader.records() {
        let row = row?;
        let raw_id = row.get(system_id_idx).unwrap_or("").trim();
        if raw_id.is_empty() {
            continue;
        }
        let system_id: SystemId = raw_id.parse().map_err(|_| CatalogError::SystemIdParse {
            table: "records".into(),
            value: raw_id.into(),
        })?;

        let first_timestamp = match timestamp_idx.map(|i| row.get(i).unwrap_or("").trim()) {
            None | Some("") => None,
            Some(s) => Some(parse_timestamp(s).ok_or_else(|| CatalogError::TimestampParse {
                system_id,
                value: s.into(),
            })?),
        };

        let mut record = SystemRecord::new(system_id, first_timestamp);

        if let Some(i) = year_idx {
            let s = row.get(i).unwrap_or("").trim();
            record.first_year = if s.is_empty() {
                None
            } else {
                Some(parse_year(s).ok_or_else(|| CatalogError::YearParse {
                    system_id,
                    value: s.into(),
                })?)
            };
        }

        let flag = |column: &str, i: Option<usize>| -> Result<bool, CatalogError> {
            let Some(i) = i else { return Ok(false) };
            let s = row.get(i).unwrap_or("");
            parse_flag(s).ok_or_else(|| CatalogError::FlagParse {
                system_id,
                column: column.into(),
                value: s.into(),
            })
        };
        for (source, i) in &source_idx {
            if flag(source.column(), *i)? {
                record.sources.set(*source);
            }
        }
        for (cap, i) in &capability_idx {
            if flag(cap.column(), *i)? {
                record.capabilities.set(*cap);
            }
        }

        record.extra = extra_idx
            .iter()
            .map(|&i| (headers[i].clone(), row.get(i).unwrap_or("").to_string()))
            .collect();

        if records.insert(system_id, record).is_some() {
            return Err(CatalogError::DuplicateSystem(system_id));
        }
    }

    Ok(records)
}

/// Write a record set: fixed columns first, then every extra column seen
/// in any record, in first-seen order.
pub fn write_records<W: Write>(writer: W, records: &RecordSet) -> Result<(), CatalogError> {
    let mut extra_columns: Vec<&str> = Vec::new();
    for record in records.values() {
        for (name, _) in &record.extra {
            if !extra_columns.contains(&name.as_str()) {
                extra_columns.push(name);
            }
        }
    }

    let mut wtr = csv::Writer::from_writer(writer);
    let mut header = record_columns();
    header.extend(extra_columns.iter().copied());
    wtr.write_record(&header)?;

    for record in records.values() {
        let mut row: Vec<String> = vec![
            record.system_id.to_string(),
            record
                .first_timestamp
                .map(|ts| ts.format(TIMESTAMP_WRITE_FORMAT).to_string())
                .unwrap_or_default(),
            record.first_year.map(|y| y.to_string()).unwrap_or_default(),
        ];
        row.extend(SourceKind::ALL.iter().map(|s| format_flag(record.sources.get(*s)).to_string()));
        row.extend(Capability::ALL.iter().map(|c| format_flag(record.capabilities.get(*c)).to_string()));
        for column in &extra_columns {
            let value = record
                .extra
                .iter()
                .find(|(name, _)| name.as_str() == *column)
                .map(|(_, v)| v.clone())
                .unwrap_or_default();
            row.push(value);
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    const RAW_INDEX: &str = "\
system_id,public_name,first_timestamp,site_area,,
1283,NREL x-Si #1,01/15/2010 11:30,Golden CO,,
1200,Desert site,06/01/2011 00:00,Tucson AZ,,
";

    #[test]
    fn reads_raw_reference_index() {
        let records = read_records(RAW_INDEX.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);

        let r = &records[&1283];
        assert_eq!(r.first_year, Some(2010));
        assert_eq!(r.first_timestamp.unwrap().month(), 1);
        assert!(!r.sources.prize);
        assert!(!r.capabilities.irradiance);
        assert_eq!(
            r.extra,
            vec![
                ("public_name".to_string(), "NREL x-Si #1".to_string()),
                ("site_area".to_string(), "Golden CO".to_string()),
            ]
        );

        assert_eq!(records[&1200].first_year, Some(2011));
    }

    #[test]
    fn round_trip_preserves_flags_and_years() {
        let mut records = read_records(RAW_INDEX.as_bytes()).unwrap();
        {
            let r = records.get_mut(&1283).unwrap();
            r.first_year = Some(2012);
            r.sources.set(SourceKind::LakeParquet);
            r.capabilities.set(Capability::Irradiance);
            r.capabilities.set(Capability::SomeTemperature);
        }
        records.get_mut(&1200).unwrap().first_year = None;

        let mut buf = Vec::new();
        write_records(&mut buf, &records).unwrap();
        let back = read_records(buf.as_slice()).unwrap();

        assert_eq!(back, records);
    }

    #[test]
    fn written_header_and_flag_format() {
        let records = read_records(RAW_INDEX.as_bytes()).unwrap();
        let mut buf = Vec::new();
        write_records(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "system_id,first_timestamp,first_year,is_prize_data,is_lake_parquet_data,\
is_lake_csv_data,has_irrad_data,has_power_data,has_ambient_temp_data,has_some_temp_data,\
public_name,site_area"
        );
        assert_eq!(
            lines.next().unwrap(),
            "1200,2011-06-01 00:00:00,2011,False,False,False,False,False,False,False,Desert site,Tucson AZ"
        );
    }

    #[test]
    fn accepts_dataframe_style_values() {
        let csv = "\
system_id,first_timestamp,first_year,is_prize_data,has_irrad_data
5,2015-02-03 04:05:06,2016.0,True,
6,,,false,1
";
        let records = read_records(csv.as_bytes()).unwrap();
        assert_eq!(records[&5].first_year, Some(2016));
        assert!(records[&5].sources.prize);
        assert!(!records[&5].capabilities.irradiance);
        assert_eq!(records[&6].first_year, None);
        assert!(records[&6].capabilities.irradiance);
    }

    #[test]
    fn rejects_unknown_flag_value() {
        let csv = "system_id,has_power_data\n5,maybe\n";
        let err = read_records(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogError::FlagParse { system_id: 5, .. }));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let csv = "system_id\n5\n5\n";
        assert!(matches!(
            read_records(csv.as_bytes()),
            Err(CatalogError::DuplicateSystem(5))
        ));
    }

    #[test]
    fn requires_system_id_column() {
        let csv = "id,first_timestamp\n5,\n";
        assert!(matches!(
            read_records(csv.as_bytes()),
            Err(CatalogError::MissingColumn { .. })
        ));
    }
}
