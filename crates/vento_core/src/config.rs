use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{AggregationOp, BucketWidth, FieldSet, VentoError, VentoResult, WriteMode};

pub const DEFAULT_SOURCE_URL: &str = "http://127.0.0.1:8007";
pub const DEFAULT_TOKEN_VALIDITY_SECS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    pub token_validity_secs: Option<u64>,
    pub request_timeout_ms: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SOURCE_URL.to_string(),
            token_validity_secs: Some(DEFAULT_TOKEN_VALIDITY_SECS),
            request_timeout_ms: Some(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub fields: FieldSet,
    pub operations: Vec<AggregationOp>,
    pub bucket_minutes: u32,
    #[serde(default)]
    pub write_mode: WriteMode,
}

impl PipelineConfig {
    pub fn validate(&self) -> VentoResult<()> {
        if self.operations.is_empty() {
            return Err(VentoError::config("at least one aggregation operation is required"));
        }
        let mut seen = HashSet::new();
        for op in &self.operations {
            if !seen.insert(*op) {
                return Err(VentoError::config(format!("duplicate aggregation operation '{op}'")));
            }
        }
        self.bucket_width().map(|_| ())
    }

    pub fn bucket_width(&self) -> VentoResult<BucketWidth> {
        BucketWidth::minutes(self.bucket_minutes)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fields: FieldSet::new(["wind_speed", "power"])
                .unwrap_or_else(|_| unreachable!("static field names are valid")),
            operations: AggregationOp::ALL.to_vec(),
            bucket_minutes: crate::DEFAULT_BUCKET_MINUTES,
            write_mode: WriteMode::Append,
        }
    }
}
