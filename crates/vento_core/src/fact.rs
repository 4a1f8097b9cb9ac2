use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{ResolvedRow, SignalId};

/// A fact ready to be written: resolved signal and a concrete value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactRow {
    pub signal_id: SignalId,
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// A fact as persisted, with its surrogate key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredFact {
    pub id: i32,
    pub signal_id: SignalId,
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Plain append; re-running a range duplicates its facts.
    #[default]
    Append,
    /// Delete the run's signals over the run's bucket span, then append.
    ReplaceRange,
}

/// Inclusive bucket-start span a run wrote into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRange {
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReport {
    pub inserted: usize,
    pub skipped_missing: usize,
    pub replaced: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FactQuery {
    pub signal_id: Option<SignalId>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    pub limit: Option<u64>,
}

/// Drop rows without a finite value; the fact table's value column is not null.
pub fn prepare_facts(rows: &[ResolvedRow]) -> (Vec<FactRow>, usize) {
    let mut facts = Vec::with_capacity(rows.len());
    let mut skipped = 0;
    for row in rows {
        match row.value.filter(|value| value.is_finite()) {
            Some(value) => facts.push(FactRow {
                signal_id: row.signal_id,
                timestamp: row.timestamp,
                value,
            }),
            None => skipped += 1,
        }
    }
    (facts, skipped)
}
