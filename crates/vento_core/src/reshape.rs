use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{AggregatedFrame, AggregationOp};

/// One (bucket, operation, field) cell of the aggregated frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LongRow {
    pub timestamp: NaiveDateTime,
    pub operation: AggregationOp,
    pub field: String,
    pub value: Option<f64>,
}

/// Melt the per-field columns of `frame` into (field, value) pairs.
///
/// Emits field by field, each in frame row order. Nothing is dropped: a
/// bucket without data stays as a row with `value: None`.
pub fn melt(frame: &AggregatedFrame) -> Vec<LongRow> {
    let rows = frame.rows();
    let mut out = Vec::with_capacity(rows.len() * frame.fields().len());
    for (idx, field) in frame.fields().names().iter().enumerate() {
        for row in rows {
            out.push(LongRow {
                timestamp: row.bucket_start,
                operation: row.operation,
                field: field.clone(),
                value: row.values.get(idx).copied().flatten(),
            });
        }
    }
    out
}
