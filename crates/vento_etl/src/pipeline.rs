use chrono::NaiveDate;
use log::{info, warn};
use serde::Serialize;

use vento_core::{
    aggregate, melt, resolve, FactRange, FactWriteApi, PipelineConfig, RawRecord, Resolution,
    SignalDimensionApi, SignalIndex, SourceApi, UnresolvedSignal, VentoError, VentoResult,
    WriteMode, WriteReport,
};

/// Output of the pure stages, ready for the writer.
#[derive(Clone, Debug)]
pub struct Transformed {
    pub buckets: usize,
    pub long_rows: usize,
    pub range: FactRange,
    pub resolution: Resolution,
}

/// Aggregate, reshape and resolve `records` against `index`.
pub fn transform(
    records: &[RawRecord],
    config: &PipelineConfig,
    index: &SignalIndex,
) -> VentoResult<Transformed> {
    let frame = aggregate(
        records,
        &config.fields,
        &config.operations,
        config.bucket_width()?,
    )?;
    let (first, last) = frame.bucket_span();
    let long = melt(&frame);
    let long_rows = long.len();
    let resolution = resolve(long, index);
    Ok(Transformed {
        buckets: frame.bucket_count(),
        long_rows,
        range: FactRange { first, last },
        resolution,
    })
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub records: usize,
    pub buckets: usize,
    pub long_rows: usize,
    pub resolved_rows: usize,
    pub unresolved: Vec<UnresolvedSignal>,
    pub range: FactRange,
    pub write: WriteReport,
}

impl RunReport {
    pub fn dropped_rows(&self) -> usize {
        self.unresolved.iter().map(|pair| pair.rows).sum()
    }
}

/// One source, one store and one configuration; runs are independent.
pub struct EtlPipeline<S, T> {
    source: S,
    store: T,
    config: PipelineConfig,
}

impl<S, T> EtlPipeline<S, T>
where
    S: SourceApi,
    T: SignalDimensionApi + FactWriteApi,
{
    pub fn new(source: S, store: T, config: PipelineConfig) -> VentoResult<Self> {
        config.validate()?;
        Ok(Self {
            source,
            store,
            config,
        })
    }

    /// Process one calendar day.
    pub async fn run(&self, date: NaiveDate) -> VentoResult<RunReport> {
        self.run_range(date, date).await
    }

    /// Process `from..=to` as one batch, so buckets share a single origin.
    pub async fn run_range(&self, from: NaiveDate, to: NaiveDate) -> VentoResult<RunReport> {
        if from > to {
            return Err(VentoError::invalid(format!(
                "start date {from} is after end date {to}"
            )));
        }
        let mut records = Vec::new();
        for date in from.iter_days().take_while(|date| *date <= to) {
            match self.source.fetch_day(date, &self.config.fields).await {
                Ok(day) => records.extend(day),
                // A gap inside a multi-day range is tolerated; the whole range being empty is not.
                Err(VentoError::EmptyDataset { message }) if from != to => {
                    warn!("pipeline: {message}");
                }
                Err(err) => return Err(err),
            }
        }
        if records.is_empty() {
            return Err(VentoError::empty_dataset(format!(
                "{} returned no records for {from}..={to}",
                self.source.name()
            )));
        }
        info!(
            "pipeline: fetched {} records for {from}..={to} from {}",
            records.len(),
            self.source.name()
        );
        let mut report = self.process(&records).await?;
        report.from = from;
        report.to = to;
        Ok(report)
    }

    /// Transform and load already-fetched records.
    pub async fn process(&self, records: &[RawRecord]) -> VentoResult<RunReport> {
        let signals = self.store.list_signals().await?;
        let index = SignalIndex::new(&signals);
        if index.is_empty() {
            warn!("pipeline: signal dimension is empty; every row will be dropped");
        }
        let transformed = transform(records, &self.config, &index)?;
        info!(
            "pipeline: {} buckets, {} long rows, {} resolved",
            transformed.buckets,
            transformed.long_rows,
            transformed.resolution.rows.len()
        );

        let rows = &transformed.resolution.rows;
        let write = match self.config.write_mode {
            WriteMode::Append => self.store.append_facts(rows).await?,
            WriteMode::ReplaceRange => self.store.replace_facts(transformed.range, rows).await?,
        };
        info!(
            "pipeline: wrote {} facts ({} without value, {} replaced)",
            write.inserted, write.skipped_missing, write.replaced
        );

        let first_day = transformed.range.first.date();
        let last_day = transformed.range.last.date();
        Ok(RunReport {
            from: first_day,
            to: last_day,
            records: records.len(),
            buckets: transformed.buckets,
            long_rows: transformed.long_rows,
            resolved_rows: rows.len(),
            unresolved: transformed.resolution.unresolved,
            range: transformed.range,
            write,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDateTime};
    use vento_core::{enumerate_signals, AggregationOp, FieldSet};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("start")
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            fields: FieldSet::new(["power"]).expect("fields"),
            operations: vec![AggregationOp::Min, AggregationOp::Max],
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn transform_reports_span_and_counts() {
        let records: Vec<RawRecord> = (0..25)
            .map(|minute| {
                RawRecord::new(start() + Duration::minutes(minute)).with_value("power", minute as f64)
            })
            .collect();
        let config = config();
        let index = SignalIndex::new(&enumerate_signals(&config.fields, &config.operations));
        let out = transform(&records, &config, &index).expect("transform");
        assert_eq!(out.buckets, 3);
        assert_eq!(out.long_rows, 6);
        assert_eq!(out.range.first, start());
        assert_eq!(out.range.last, start() + Duration::minutes(20));
        let maxima: Vec<f64> = out
            .resolution
            .rows
            .iter()
            .filter(|row| row.signal_id == 2)
            .filter_map(|row| row.value)
            .collect();
        assert_eq!(maxima, vec![9.0, 19.0, 24.0]);
    }

    #[test]
    fn transform_of_nothing_is_empty_dataset() {
        let config = config();
        let err = transform(&[], &config, &SignalIndex::default()).expect_err("empty");
        assert!(matches!(err, VentoError::EmptyDataset { .. }));
    }
}
