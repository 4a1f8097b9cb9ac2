use std::collections::HashSet;

use tempfile::tempdir;
use vento_store::{
    AggregationOp, BootstrapOutcome, FieldSet, SignalDimensionApi, SignalStore, VentoConfig,
    VentoResult,
};

async fn open(dir: &std::path::Path) -> VentoResult<SignalStore> {
    let config = VentoConfig::default_sqlite(dir.join("vento.sqlite").to_string_lossy());
    SignalStore::connect(&config, dir).await
}

fn turbine_fields() -> FieldSet {
    FieldSet::new(["wind_speed", "power"]).expect("fields")
}

#[tokio::test]
async fn bootstrap_populates_empty_dimension() -> VentoResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = open(dir.path()).await?;
    let outcome = store
        .bootstrap_signals(&turbine_fields(), &AggregationOp::ALL)
        .await?;
    assert_eq!(outcome, BootstrapOutcome::Populated { inserted: 8 });

    let signals = store.list_signals().await?;
    assert_eq!(signals.len(), 8);
    assert_eq!(
        signals.iter().map(|s| s.id).collect::<Vec<_>>(),
        (1..=8).collect::<Vec<_>>()
    );
    let pairs: HashSet<(String, String)> = signals
        .iter()
        .map(|s| (s.name.clone(), s.operation.clone()))
        .collect();
    assert_eq!(pairs.len(), 8);
    for field in ["wind_speed", "power"] {
        for op in ["std", "min", "max", "mean"] {
            assert!(
                pairs.contains(&(field.to_string(), op.to_string())),
                "missing ({field}, {op})"
            );
        }
    }
    Ok(())
}

#[tokio::test]
async fn bootstrap_is_a_no_op_on_non_empty_dimension() -> VentoResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = open(dir.path()).await?;
    store
        .bootstrap_signals(&turbine_fields(), &AggregationOp::ALL)
        .await?;
    let before = store.list_signals().await?;

    let wider = FieldSet::new(["wind_speed", "power", "rotor_speed"]).expect("fields");
    let outcome = store.bootstrap_signals(&wider, &AggregationOp::ALL).await?;
    assert_eq!(outcome, BootstrapOutcome::Skipped { existing: 8 });
    assert_eq!(store.list_signals().await?, before);
    assert_eq!(store.count_signals().await?, 8);
    Ok(())
}

#[tokio::test]
async fn reconcile_adds_missing_pairs_after_existing_ids() -> VentoResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = open(dir.path()).await?;
    store
        .bootstrap_signals(&turbine_fields(), &AggregationOp::ALL)
        .await?;

    let wider = FieldSet::new(["wind_speed", "power", "rotor_speed"]).expect("fields");
    let outcome = store
        .reconcile_signals(&wider, &[AggregationOp::Mean, AggregationOp::Max])
        .await?;
    assert_eq!(outcome.existing, 8);
    let added: Vec<(i32, &str, &str)> = outcome
        .inserted
        .iter()
        .map(|s| (s.id, s.name.as_str(), s.operation.as_str()))
        .collect();
    assert_eq!(
        added,
        vec![(9, "rotor_speed", "mean"), (10, "rotor_speed", "max")]
    );

    let again = store
        .reconcile_signals(&wider, &[AggregationOp::Mean, AggregationOp::Max])
        .await?;
    assert!(again.inserted.is_empty());
    assert_eq!(store.count_signals().await?, 10);
    Ok(())
}

#[tokio::test]
async fn reconcile_on_empty_dimension_matches_bootstrap() -> VentoResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = open(dir.path()).await?;
    let outcome = store
        .reconcile_signals(&turbine_fields(), &AggregationOp::ALL)
        .await?;
    assert_eq!(outcome.existing, 0);
    assert_eq!(outcome.inserted.len(), 8);
    assert_eq!(outcome.inserted.first().map(|s| s.id), Some(1));
    Ok(())
}

#[tokio::test]
async fn delete_signal_reports_absence() -> VentoResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = open(dir.path()).await?;
    store
        .bootstrap_signals(&turbine_fields(), &AggregationOp::ALL)
        .await?;
    assert!(store.delete_signal(3).await?);
    assert!(!store.delete_signal(3).await?);
    assert_eq!(store.count_signals().await?, 7);
    Ok(())
}
