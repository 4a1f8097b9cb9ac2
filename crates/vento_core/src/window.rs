//! Fixed-width window aggregation over raw records.
//!
//! Buckets are anchored at the earliest record of the input ("origin =
//! start"), not at a calendar boundary:
//!
//! - bucket `i` covers the half-open interval `[origin + i * width, origin + (i + 1) * width)`;
//! - every bucket from the first to the last populated one is emitted, so
//!   gaps in the input show up as buckets with no values;
//! - each operation yields one row per bucket, ascending, and the rows of all
//!   operations are concatenated in the order the operations were given.

use std::collections::HashSet;

use chrono::{Duration, NaiveDateTime};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{AggregationOp, FieldSet, RawRecord, VentoError, VentoResult};

pub const DEFAULT_BUCKET_MINUTES: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BucketWidth(Duration);

impl BucketWidth {
    pub fn minutes(minutes: u32) -> VentoResult<Self> {
        if minutes == 0 {
            return Err(VentoError::config("bucket width must be positive"));
        }
        Ok(Self(Duration::minutes(i64::from(minutes))))
    }

    fn millis(self) -> i64 {
        self.0.num_milliseconds()
    }

    /// Index of the bucket holding `ts` for buckets anchored at `origin`.
    pub fn bucket_index(self, origin: NaiveDateTime, ts: NaiveDateTime) -> i64 {
        (ts - origin).num_milliseconds().div_euclid(self.millis())
    }

    pub fn bucket_start(self, origin: NaiveDateTime, index: i64) -> NaiveDateTime {
        origin + Duration::milliseconds(self.millis() * index)
    }
}

impl Default for BucketWidth {
    fn default() -> Self {
        Self(Duration::minutes(i64::from(DEFAULT_BUCKET_MINUTES)))
    }
}

/// One bucket of one operation; `values` follows the frame's field order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub bucket_start: NaiveDateTime,
    pub operation: AggregationOp,
    pub values: Vec<Option<f64>>,
}

/// Wide output of the aggregator: one column per measured field.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregatedFrame {
    fields: FieldSet,
    origin: NaiveDateTime,
    width: BucketWidth,
    bucket_count: usize,
    rows: Vec<AggregatedRow>,
}

impl AggregatedFrame {
    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn origin(&self) -> NaiveDateTime {
        self.origin
    }

    /// Buckets per operation.
    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    pub fn rows(&self) -> &[AggregatedRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<AggregatedRow> {
        self.rows
    }

    /// Start of the first bucket and start of the last bucket, inclusive.
    pub fn bucket_span(&self) -> (NaiveDateTime, NaiveDateTime) {
        let last = self.bucket_count.saturating_sub(1) as i64;
        (self.origin, self.width.bucket_start(self.origin, last))
    }

    pub fn value(&self, row: &AggregatedRow, field: &str) -> Option<f64> {
        let idx = self.fields.names().iter().position(|name| name == field)?;
        row.values.get(idx).copied().flatten()
    }
}

/// Aggregate `records` into fixed-width buckets under every operation.
pub fn aggregate(
    records: &[RawRecord],
    fields: &FieldSet,
    operations: &[AggregationOp],
    width: BucketWidth,
) -> VentoResult<AggregatedFrame> {
    if operations.is_empty() {
        return Err(VentoError::invalid("at least one aggregation operation is required"));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = operations.iter().find(|op| !seen.insert(**op)) {
        return Err(VentoError::invalid(format!("duplicate aggregation operation '{dup}'")));
    }

    let (origin, last) = match time_range(records) {
        Some(range) => range,
        None => return Err(VentoError::empty_dataset("no raw records to aggregate")),
    };
    let bucket_count = width.bucket_index(origin, last) as usize + 1;

    // grouped[bucket][field] holds the raw values falling into that bucket.
    let field_names = fields.names();
    let mut grouped: Vec<Vec<Vec<f64>>> = vec![vec![Vec::new(); field_names.len()]; bucket_count];
    for record in records {
        let bucket = width.bucket_index(origin, record.timestamp) as usize;
        for (idx, field) in field_names.iter().enumerate() {
            if let Some(value) = record.value(field) {
                grouped[bucket][idx].push(value);
            }
        }
    }

    let mut rows = Vec::with_capacity(bucket_count * operations.len());
    for &operation in operations {
        for (bucket, per_field) in grouped.iter().enumerate() {
            rows.push(AggregatedRow {
                bucket_start: width.bucket_start(origin, bucket as i64),
                operation,
                values: per_field.iter().map(|values| operation.reduce(values)).collect(),
            });
        }
    }

    debug!(
        "window: aggregated {} records into {} buckets x {} operations",
        records.len(),
        bucket_count,
        operations.len()
    );

    Ok(AggregatedFrame {
        fields: fields.clone(),
        origin,
        width,
        bucket_count,
        rows,
    })
}

fn time_range(records: &[RawRecord]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let first = records.iter().map(|record| record.timestamp).min()?;
    let last = records.iter().map(|record| record.timestamp).max()?;
    Some((first, last))
}
