use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info};

use vento_core::{FieldSet, RawRecord, SourceApi, VentoError, VentoResult};

use crate::payload::{parse_body, within_day};

/// Records read from a JSON file in the data endpoint's wire shape.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SourceApi for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch_day(&self, date: NaiveDate, fields: &FieldSet) -> VentoResult<Vec<RawRecord>> {
        let body = tokio::fs::read(&self.path).await.map_err(|err| {
            VentoError::source_fetch(format!("read {}: {err}", self.path.display()))
        })?;
        let records = within_day(parse_body(&body, fields)?, date);
        if records.is_empty() {
            return Err(VentoError::empty_dataset(format!(
                "no records for {date} in {}",
                self.path.display()
            )));
        }
        info!(
            "source: read {} records for {date} from {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }
}

/// In-memory records, projected and filtered like the other sources.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    records: Vec<RawRecord>,
}

impl StaticSource {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl SourceApi for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_day(&self, date: NaiveDate, fields: &FieldSet) -> VentoResult<Vec<RawRecord>> {
        let mut records: Vec<RawRecord> = self
            .records
            .iter()
            .filter(|record| record.timestamp.date() == date)
            .map(|record| {
                let mut projected = RawRecord::new(record.timestamp);
                for field in fields.names() {
                    let value = record.values.get(field).copied().flatten();
                    projected.values.insert(field.clone(), value);
                }
                projected
            })
            .collect();
        if records.is_empty() {
            return Err(VentoError::empty_dataset(format!("no records for {date}")));
        }
        records.sort_by_key(|record| record.timestamp);
        debug!("source: {} static records for {date}", records.len());
        Ok(records)
    }
}
