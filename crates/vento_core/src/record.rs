use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{VentoError, VentoResult};

/// Column carrying the record instant; never a measured field.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// One row of the raw wide table as delivered by the source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub timestamp: NaiveDateTime,
    pub values: BTreeMap<String, Option<f64>>,
}

impl RawRecord {
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, field: impl Into<String>, value: f64) -> Self {
        self.values.insert(field.into(), Some(value));
        self
    }

    /// Finite value of `field`, if the record carries one.
    pub fn value(&self, field: &str) -> Option<f64> {
        self.values
            .get(field)
            .copied()
            .flatten()
            .filter(|value| value.is_finite())
    }
}

/// The measured fields fixed at configuration time, in configured order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FieldSet {
    fields: Vec<String>,
}

impl FieldSet {
    pub fn new<I, S>(fields: I) -> VentoResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            return Err(VentoError::config("at least one measured field is required"));
        }
        let mut seen = HashSet::new();
        for field in &fields {
            if !is_valid_field_name(field) {
                return Err(VentoError::config(format!(
                    "invalid measured field name '{field}'"
                )));
            }
            if field == TIMESTAMP_COLUMN {
                return Err(VentoError::config(
                    "'timestamp' is the record instant, not a measured field",
                ));
            }
            if !seen.insert(field.as_str()) {
                return Err(VentoError::config(format!("duplicate measured field '{field}'")));
            }
        }
        Ok(Self { fields })
    }

    pub fn names(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|known| known == field)
    }

    /// Check a requested projection against the configured fields.
    ///
    /// Unknown names are rejected instead of being passed on to the source's
    /// column lookup. The timestamp column is accepted and always kept last.
    pub fn validate_projection<S: AsRef<str>>(&self, requested: &[S]) -> VentoResult<Vec<String>> {
        let mut projection = Vec::with_capacity(requested.len() + 1);
        let mut unknown = Vec::new();
        for name in requested {
            let name = name.as_ref().trim();
            if name == TIMESTAMP_COLUMN {
                continue;
            }
            if !self.contains(name) {
                unknown.push(name.to_string());
            } else if !projection.iter().any(|known: &String| known == name) {
                projection.push(name.to_string());
            }
        }
        if !unknown.is_empty() {
            return Err(VentoError::invalid(format!(
                "unknown fields requested: {}",
                unknown.join(", ")
            )));
        }
        if projection.is_empty() {
            return Err(VentoError::invalid("projection names no measured field"));
        }
        projection.push(TIMESTAMP_COLUMN.to_string());
        Ok(projection)
    }
}

impl TryFrom<Vec<String>> for FieldSet {
    type Error = VentoError;

    fn try_from(value: Vec<String>) -> VentoResult<Self> {
        FieldSet::new(value)
    }
}

impl From<FieldSet> for Vec<String> {
    fn from(value: FieldSet) -> Self {
        value.fields
    }
}

fn is_valid_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
