//! Wire shape of raw records: a JSON array of flat objects keyed by column.
//!
//! ```json
//! [{"timestamp": "2024-01-01T00:00:00", "wind_speed": 7.31, "power": "512.40"}]
//! ```
//!
//! Numeric columns may arrive as numbers or as decimal strings. A query
//! failure on the collaborator side arrives as `{"error": "..."}`.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::{Map, Number, Value};

use vento_core::{FieldSet, RawRecord, VentoError, VentoResult, TIMESTAMP_COLUMN};

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Result-or-error body returned by the data endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SourceResponse {
    Failure { error: String },
    Records(Vec<Map<String, Value>>),
}

impl SourceResponse {
    /// Normalize into records of `fields`; a failure payload becomes an error.
    pub fn into_records(self, fields: &FieldSet) -> VentoResult<Vec<RawRecord>> {
        match self {
            SourceResponse::Failure { error } => Err(VentoError::query(error)),
            SourceResponse::Records(rows) => parse_rows(rows, fields),
        }
    }
}

pub fn parse_body(body: &[u8], fields: &FieldSet) -> VentoResult<Vec<RawRecord>> {
    let response: SourceResponse = serde_json::from_slice(body)
        .map_err(|err| VentoError::source_fetch(format!("malformed source payload: {err}")))?;
    response.into_records(fields)
}

/// Rows sorted by timestamp; columns outside `fields` are ignored.
pub fn parse_rows(rows: Vec<Map<String, Value>>, fields: &FieldSet) -> VentoResult<Vec<RawRecord>> {
    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        records.push(parse_row(index, row, fields)?);
    }
    records.sort_by_key(|record| record.timestamp);
    Ok(records)
}

fn parse_row(index: usize, mut row: Map<String, Value>, fields: &FieldSet) -> VentoResult<RawRecord> {
    let timestamp = match row.remove(TIMESTAMP_COLUMN) {
        Some(Value::String(raw)) => parse_timestamp(&raw).ok_or_else(|| {
            VentoError::source_fetch(format!("row {index}: unreadable timestamp '{raw}'"))
        })?,
        _ => {
            return Err(VentoError::source_fetch(format!(
                "row {index}: missing timestamp"
            )))
        }
    };
    let mut record = RawRecord::new(timestamp);
    for field in fields.names() {
        let value = match row.remove(field.as_str()) {
            None | Some(Value::Null) => None,
            Some(Value::Number(number)) => number.as_f64(),
            Some(Value::String(raw)) => Some(raw.trim().parse::<f64>().map_err(|_| {
                VentoError::source_fetch(format!("row {index}: '{field}' is not numeric: '{raw}'"))
            })?),
            Some(other) => {
                return Err(VentoError::source_fetch(format!(
                    "row {index}: '{field}' is not numeric: {other}"
                )))
            }
        };
        record.values.insert(field.clone(), value);
    }
    Ok(record)
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim().trim_end_matches('Z');
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// Keep records whose timestamp falls on `date`.
pub fn within_day(records: Vec<RawRecord>, date: NaiveDate) -> Vec<RawRecord> {
    records
        .into_iter()
        .filter(|record| record.timestamp.date() == date)
        .collect()
}

/// Inverse of [`parse_rows`], used to write record files.
pub fn records_to_json(records: &[RawRecord]) -> Value {
    let rows = records
        .iter()
        .map(|record| {
            let mut row = Map::new();
            row.insert(
                TIMESTAMP_COLUMN.to_string(),
                Value::String(record.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()),
            );
            for (field, value) in &record.values {
                let value = value
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null);
                row.insert(field.clone(), value);
            }
            Value::Object(row)
        })
        .collect();
    Value::Array(rows)
}
