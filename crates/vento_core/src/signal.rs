use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{AggregationOp, FieldSet};

pub type SignalId = i32;

/// Dimension row: the identity of one (measured field, operation) pair.
///
/// `operation` is kept as the stored text so rows written by other tools
/// with operations this build does not know still load.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub name: String,
    pub operation: String,
}

impl Signal {
    pub fn key(&self) -> SignalKey {
        SignalKey {
            name: self.name.clone(),
            operation: self.operation.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalKey {
    pub name: String,
    pub operation: String,
}

impl SignalKey {
    pub fn new(name: impl Into<String>, operation: AggregationOp) -> Self {
        Self {
            name: name.into(),
            operation: operation.as_str().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Populated { inserted: usize },
    Skipped { existing: usize },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub inserted: Vec<Signal>,
    pub existing: usize,
}

/// Cartesian product of fields x operations with dense ids `1..=N`.
///
/// Fields form the outer loop and operations the inner loop, so ids are
/// stable for a given configuration order.
pub fn enumerate_signals(fields: &FieldSet, operations: &[AggregationOp]) -> Vec<Signal> {
    let mut out = Vec::with_capacity(fields.len() * operations.len());
    for name in fields.names() {
        for operation in operations {
            out.push(Signal {
                id: out.len() as SignalId + 1,
                name: name.clone(),
                operation: operation.as_str().to_string(),
            });
        }
    }
    out
}

/// Configured pairs missing from `existing`, numbered after the current max id.
///
/// Existing rows are never renumbered; pairs already present are skipped
/// regardless of their id.
pub fn plan_reconcile(
    existing: &[Signal],
    fields: &FieldSet,
    operations: &[AggregationOp],
) -> Vec<Signal> {
    let present: HashSet<SignalKey> = existing.iter().map(Signal::key).collect();
    let mut next_id = existing.iter().map(|signal| signal.id).max().unwrap_or(0) + 1;
    let mut out = Vec::new();
    for signal in enumerate_signals(fields, operations) {
        if present.contains(&signal.key()) {
            continue;
        }
        out.push(Signal {
            id: next_id,
            ..signal
        });
        next_id += 1;
    }
    out
}
