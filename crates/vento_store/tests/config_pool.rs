use serde_json::json;
use vento_store::{AggregationOp, DatabaseConfig, PoolConfig, VentoConfig, WriteMode};

#[test]
fn deserializes_pool_settings() {
    let payload = json!({
        "database": { "backend": "sqlite", "path": "data.sqlite" },
        "pool": {
            "max_connections": 20,
            "min_connections": 2,
            "connect_timeout_ms": 1000,
            "acquire_timeout_ms": 500,
            "idle_timeout_ms": 60000
        }
    });
    let config: VentoConfig = serde_json::from_value(payload).expect("config");
    match config.database {
        DatabaseConfig::Sqlite { path } => {
            assert_eq!(path.as_deref(), Some("data.sqlite"));
        }
        _ => panic!("expected sqlite backend"),
    }
    let pool = config.pool.expect("pool");
    assert_eq!(pool.max_connections, Some(20));
    assert_eq!(pool.min_connections, Some(2));
    assert_eq!(pool.connect_timeout_ms, Some(1000));
    assert_eq!(pool.acquire_timeout_ms, Some(500));
    assert_eq!(pool.idle_timeout_ms, Some(60000));
}

#[test]
fn pipeline_and_source_sections_default_when_absent() {
    let payload = json!({
        "database": { "backend": "postgres", "url": "postgres://etl@localhost/wind" }
    });
    let config: VentoConfig = serde_json::from_value(payload).expect("config");
    assert_eq!(config.backend_name(), "postgres");
    assert_eq!(config.connection_url(), Some("postgres://etl@localhost/wind"));
    assert_eq!(config.pipeline.bucket_minutes, 10);
    assert_eq!(config.pipeline.operations, AggregationOp::ALL.to_vec());
    assert_eq!(config.pipeline.fields.names(), ["wind_speed", "power"]);
    assert_eq!(config.pipeline.write_mode, WriteMode::Append);
    assert!(config.source.base_url.starts_with("http://"));
}

#[test]
fn pipeline_section_is_parsed() {
    let payload = json!({
        "database": { "backend": "sqlite", "path": null },
        "pool": PoolConfig {
            max_connections: Some(1),
            min_connections: None,
            connect_timeout_ms: None,
            acquire_timeout_ms: None,
            idle_timeout_ms: None,
        },
        "pipeline": {
            "fields": ["power", "ambient_temperature"],
            "operations": ["mean", "max"],
            "bucket_minutes": 5,
            "write_mode": "replace_range"
        }
    });
    let config: VentoConfig = serde_json::from_value(payload).expect("config");
    assert_eq!(
        config.pipeline.operations,
        vec![AggregationOp::Mean, AggregationOp::Max]
    );
    assert_eq!(config.pipeline.write_mode, WriteMode::ReplaceRange);
    assert_eq!(config.pipeline.bucket_minutes, 5);
}

#[test]
fn load_rejects_invalid_pipeline() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("vento.json");
    std::fs::write(
        &path,
        json!({
            "database": { "backend": "sqlite", "path": "x.sqlite" },
            "pipeline": {
                "fields": ["power"],
                "operations": [],
                "bucket_minutes": 10
            }
        })
        .to_string(),
    )
    .expect("write");
    let err = VentoConfig::load(&path).expect_err("empty operations");
    assert!(err.to_string().contains("operation"), "{err}");
}
