use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use tempfile::tempdir;
use vento_core::synthetic::generate_records;
use vento_core::{
    AggregationOp, FactQuery, FactReadApi, FieldSet, PipelineConfig, SignalDimensionApi,
    VentoError, VentoResult, WriteMode,
};
use vento_etl::EtlPipeline;
use vento_source::{records_to_json, FileSource, StaticSource};
use vento_store::{SignalStore, VentoConfig};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).expect("date")
}

fn midnight(d: u32) -> NaiveDateTime {
    day(d).and_hms_opt(0, 0, 0).expect("midnight")
}

fn turbine_config() -> PipelineConfig {
    PipelineConfig {
        fields: FieldSet::new(["wind_speed", "power"]).expect("fields"),
        operations: AggregationOp::ALL.to_vec(),
        bucket_minutes: 10,
        write_mode: WriteMode::Append,
    }
}

async fn bootstrapped_store(dir: &std::path::Path) -> VentoResult<SignalStore> {
    let config = VentoConfig::default_sqlite(dir.join("vento.sqlite").to_string_lossy());
    let store = SignalStore::connect(&config, dir).await?;
    let pipeline = turbine_config();
    store
        .bootstrap_signals(&pipeline.fields, &pipeline.operations)
        .await?;
    Ok(store)
}

#[tokio::test]
async fn ten_days_load_11520_facts() -> VentoResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = bootstrapped_store(dir.path()).await?;
    let source = StaticSource::new(generate_records(midnight(1), 10, 42));
    let pipeline = EtlPipeline::new(source, store.clone(), turbine_config())?;

    let report = pipeline.run_range(day(1), day(10)).await?;
    assert_eq!(report.records, 14_400);
    assert_eq!(report.buckets, 1440);
    assert_eq!(report.long_rows, 11_520);
    assert!(report.unresolved.is_empty());
    assert_eq!(report.write.inserted, 11_520);
    assert_eq!(store.count_facts().await?, 11_520);

    let facts = store.list_facts(FactQuery::default()).await?;
    let last_bucket = midnight(10) + chrono::Duration::minutes(23 * 60 + 50);
    for fact in &facts {
        assert!((1..=8).contains(&fact.signal_id), "signal {}", fact.signal_id);
        assert_eq!(fact.timestamp.minute() % 10, 0);
        assert_eq!(fact.timestamp.second(), 0);
        assert!(fact.timestamp >= midnight(1) && fact.timestamp <= last_bucket);
    }
    for pair in facts.windows(2) {
        assert!((pair[0].timestamp, pair[0].signal_id) <= (pair[1].timestamp, pair[1].signal_id));
    }
    Ok(())
}

#[tokio::test]
async fn running_the_same_day_twice_doubles_the_facts() -> VentoResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = bootstrapped_store(dir.path()).await?;
    let source = StaticSource::new(generate_records(midnight(3), 1, 5));
    let pipeline = EtlPipeline::new(source, store.clone(), turbine_config())?;

    pipeline.run(day(3)).await?;
    let once = store.count_facts().await?;
    assert_eq!(once, 144 * 8);
    pipeline.run(day(3)).await?;
    assert_eq!(store.count_facts().await?, 2 * once);

    let per_signal: BTreeMap<i32, u64> = store.count_facts_by_signal().await?.into_iter().collect();
    assert!(per_signal.values().all(|count| *count == 288));
    Ok(())
}

#[tokio::test]
async fn replace_range_mode_keeps_one_copy() -> VentoResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = bootstrapped_store(dir.path()).await?;
    let source = StaticSource::new(generate_records(midnight(3), 1, 5));
    let config = PipelineConfig {
        write_mode: WriteMode::ReplaceRange,
        ..turbine_config()
    };
    let pipeline = EtlPipeline::new(source, store.clone(), config)?;

    pipeline.run(day(3)).await?;
    let second = pipeline.run(day(3)).await?;
    assert_eq!(second.write.replaced, 144 * 8);
    assert_eq!(store.count_facts().await?, 144 * 8);
    Ok(())
}

#[tokio::test]
async fn pairs_missing_from_the_dimension_are_reported() -> VentoResult<()> {
    let dir = tempdir().expect("tempdir");
    let config = VentoConfig::default_sqlite(dir.path().join("vento.sqlite").to_string_lossy());
    let store = SignalStore::connect(&config, dir.path()).await?;
    store
        .bootstrap_signals(
            &FieldSet::new(["wind_speed"]).expect("fields"),
            &[AggregationOp::Mean],
        )
        .await?;

    let source = StaticSource::new(generate_records(midnight(2), 1, 9));
    let pipeline = EtlPipeline::new(source, store.clone(), turbine_config())?;
    let report = pipeline.run(day(2)).await?;

    assert_eq!(report.resolved_rows, 144);
    assert_eq!(report.unresolved.len(), 7);
    assert_eq!(report.dropped_rows(), 144 * 7);
    assert!(report
        .unresolved
        .iter()
        .any(|pair| pair.name == "power" && pair.operation == "std"));
    assert_eq!(store.count_facts().await?, 144);
    Ok(())
}

#[tokio::test]
async fn empty_source_is_a_fatal_input_error() -> VentoResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = bootstrapped_store(dir.path()).await?;
    let pipeline = EtlPipeline::new(StaticSource::default(), store.clone(), turbine_config())?;
    let err = pipeline.run(day(1)).await.expect_err("no data");
    assert!(matches!(err, VentoError::EmptyDataset { .. }), "{err}");
    assert!(err.is_fatal_input());
    assert_eq!(store.count_facts().await?, 0);
    Ok(())
}

#[tokio::test]
async fn file_source_feeds_the_pipeline() -> VentoResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = bootstrapped_store(dir.path()).await?;
    let path = dir.path().join("records.json");
    std::fs::write(
        &path,
        records_to_json(&generate_records(midnight(1), 2, 11)).to_string(),
    )
    .expect("write records");

    let pipeline = EtlPipeline::new(FileSource::new(&path), store.clone(), turbine_config())?;
    let report = pipeline.run(day(2)).await?;
    assert_eq!(report.records, 1440);
    assert_eq!(report.range.first, midnight(2));
    assert_eq!(store.count_facts().await?, 144 * 8);
    Ok(())
}

#[tokio::test]
async fn invalid_pipeline_config_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let store = bootstrapped_store(dir.path()).await.expect("store");
    let config = PipelineConfig {
        operations: Vec::new(),
        ..turbine_config()
    };
    assert!(EtlPipeline::new(StaticSource::default(), store, config).is_err());
}
