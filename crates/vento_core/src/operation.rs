use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{VentoError, VentoResult};

/// Reducer applied to every field inside a bucket.
///
/// The lowercase names double as the `operation` column of the signal
/// dimension, so renaming a variant breaks existing dimension rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationOp {
    Std,
    Min,
    Max,
    Mean,
}

impl AggregationOp {
    pub const ALL: [AggregationOp; 4] = [
        AggregationOp::Std,
        AggregationOp::Min,
        AggregationOp::Max,
        AggregationOp::Mean,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AggregationOp::Std => "std",
            AggregationOp::Min => "min",
            AggregationOp::Max => "max",
            AggregationOp::Mean => "mean",
        }
    }

    /// Reduce the values of one field within one bucket.
    ///
    /// Returns `None` when the bucket holds no values. `Std` is the sample
    /// standard deviation (n - 1 denominator) and needs at least two values.
    pub fn reduce(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        match self {
            AggregationOp::Min => values.iter().copied().reduce(f64::min),
            AggregationOp::Max => values.iter().copied().reduce(f64::max),
            AggregationOp::Mean => Some(mean(values)),
            AggregationOp::Std => {
                if values.len() < 2 {
                    return None;
                }
                let avg = mean(values);
                let squares: f64 = values.iter().map(|v| (v - avg) * (v - avg)).sum();
                Some((squares / (values.len() - 1) as f64).sqrt())
            }
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

impl fmt::Display for AggregationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationOp {
    type Err = VentoError;

    fn from_str(value: &str) -> VentoResult<Self> {
        match value.trim() {
            "std" => Ok(AggregationOp::Std),
            "min" => Ok(AggregationOp::Min),
            "max" => Ok(AggregationOp::Max),
            "mean" => Ok(AggregationOp::Mean),
            other => Err(VentoError::invalid(format!(
                "unknown aggregation operation '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AggregationOp;

    #[test]
    fn names_roundtrip_through_from_str() {
        for op in AggregationOp::ALL {
            let parsed: AggregationOp = op.as_str().parse().expect("parse");
            assert_eq!(parsed, op);
        }
        assert!("median".parse::<AggregationOp>().is_err());
    }

    #[test]
    fn reducers_on_known_values() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(AggregationOp::Min.reduce(&values), Some(2.0));
        assert_eq!(AggregationOp::Max.reduce(&values), Some(9.0));
        assert_eq!(AggregationOp::Mean.reduce(&values), Some(5.0));
        // Sample deviation: sqrt(32 / 7).
        let std = AggregationOp::Std.reduce(&values).expect("std");
        assert!((std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn empty_bucket_has_no_value() {
        for op in AggregationOp::ALL {
            assert_eq!(op.reduce(&[]), None);
        }
    }

    #[test]
    fn std_needs_two_values() {
        assert_eq!(AggregationOp::Std.reduce(&[3.5]), None);
        assert_eq!(AggregationOp::Std.reduce(&[1.0, 1.0]), Some(0.0));
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let encoded = serde_json::to_string(&AggregationOp::Mean).expect("encode");
        assert_eq!(encoded, "\"mean\"");
        let decoded: AggregationOp = serde_json::from_str("\"std\"").expect("decode");
        assert_eq!(decoded, AggregationOp::Std);
    }
}
