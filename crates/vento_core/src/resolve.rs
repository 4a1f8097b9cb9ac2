use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{LongRow, Signal, SignalId, SignalKey};

/// Lookup from (field, operation) to dimension id.
#[derive(Clone, Debug, Default)]
pub struct SignalIndex {
    ids: HashMap<SignalKey, SignalId>,
}

impl SignalIndex {
    pub fn new(signals: &[Signal]) -> Self {
        Self {
            ids: signals
                .iter()
                .map(|signal| (signal.key(), signal.id))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn lookup(&self, name: &str, operation: &str) -> Option<SignalId> {
        self.ids
            .get(&SignalKey {
                name: name.to_string(),
                operation: operation.to_string(),
            })
            .copied()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRow {
    pub timestamp: NaiveDateTime,
    pub signal_id: SignalId,
    pub value: Option<f64>,
}

/// A (field, operation) pair with no dimension row, and how many rows it cost.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedSignal {
    pub name: String,
    pub operation: String,
    pub rows: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resolution {
    /// Sorted ascending by (timestamp, signal_id).
    pub rows: Vec<ResolvedRow>,
    pub unresolved: Vec<UnresolvedSignal>,
}

impl Resolution {
    pub fn dropped_rows(&self) -> usize {
        self.unresolved.iter().map(|pair| pair.rows).sum()
    }
}

/// Join long rows against the dimension.
///
/// Rows whose pair is not registered are dropped from `rows` and counted in
/// `unresolved`; this is not an error.
pub fn resolve(long_rows: Vec<LongRow>, index: &SignalIndex) -> Resolution {
    let mut rows = Vec::with_capacity(long_rows.len());
    let mut missing: BTreeMap<SignalKey, usize> = BTreeMap::new();
    for row in long_rows {
        let operation = row.operation.as_str();
        match index.lookup(&row.field, operation) {
            Some(signal_id) => rows.push(ResolvedRow {
                timestamp: row.timestamp,
                signal_id,
                value: row.value,
            }),
            None => {
                *missing
                    .entry(SignalKey {
                        name: row.field,
                        operation: operation.to_string(),
                    })
                    .or_default() += 1;
            }
        }
    }
    rows.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then(a.signal_id.cmp(&b.signal_id))
    });

    let unresolved: Vec<UnresolvedSignal> = missing
        .into_iter()
        .map(|(key, count)| {
            warn!(
                "resolve: no signal registered for ({}, {}); dropped {} rows",
                key.name, key.operation, count
            );
            UnresolvedSignal {
                name: key.name,
                operation: key.operation,
                rows: count,
            }
        })
        .collect();

    Resolution { rows, unresolved }
}
