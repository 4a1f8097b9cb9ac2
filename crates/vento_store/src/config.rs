//! `vento.json`: where the signal store lives and how the pipeline runs.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use vento_core::{PipelineConfig, SourceConfig, VentoError, VentoResult};

pub const CONFIG_FILE_NAME: &str = "vento.json";
pub const DEFAULT_DB_FILE: &str = "vento.sqlite";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum DatabaseConfig {
    Sqlite { path: Option<String> },
    Postgres { url: String },
    Mysql { url: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub connect_timeout_ms: Option<u64>,
    pub acquire_timeout_ms: Option<u64>,
    pub idle_timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VentoConfig {
    pub database: DatabaseConfig,
    pub pool: Option<PoolConfig>,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl VentoConfig {
    pub fn default_sqlite(path: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig::Sqlite {
                path: Some(path.into()),
            },
            pool: None,
            source: SourceConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }

    /// Read `vento.json` under `base_dir`, writing a sqlite default on first use.
    pub fn load_or_init(base_dir: &Path, default_sqlite_path: &Path) -> VentoResult<Self> {
        let config_path = base_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Self::load(&config_path);
        }
        fs::create_dir_all(base_dir).map_err(|err| {
            VentoError::storage(format!("create datastore dir {}: {err}", base_dir.display()))
        })?;
        let default = VentoConfig::default_sqlite(default_sqlite_path.to_string_lossy());
        default.validate()?;
        let payload = serde_json::to_string_pretty(&default)
            .map_err(|err| VentoError::config(format!("encode default settings: {err}")))?;
        fs::write(&config_path, payload).map_err(|err| {
            VentoError::storage(format!("write {}: {err}", config_path.display()))
        })?;
        info!("config: wrote default settings to {}", config_path.display());
        Ok(default)
    }

    pub fn load(path: &Path) -> VentoResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| VentoError::config(format!("cannot read {}: {err}", path.display())))?;
        let config: VentoConfig = serde_json::from_str(&raw).map_err(|err| {
            VentoError::config(format!(
                "{} is not valid settings (line {}, column {}): {err}",
                path.display(),
                err.line(),
                err.column()
            ))
        })?;
        config
            .validate()
            .map_err(|err| VentoError::config(format!("{}: {}", path.display(), err.message())))?;
        Ok(config)
    }

    /// Database target and pipeline settings both have to be usable.
    pub fn validate(&self) -> VentoResult<()> {
        match &self.database {
            DatabaseConfig::Sqlite { path: Some(path) } if path.trim().is_empty() => {
                return Err(VentoError::config("sqlite path is empty"));
            }
            DatabaseConfig::Postgres { url } | DatabaseConfig::Mysql { url }
                if url.trim().is_empty() =>
            {
                return Err(VentoError::config(format!(
                    "{} backend needs a connection url",
                    self.backend_name()
                )));
            }
            _ => {}
        }
        if self.source.base_url.trim_end_matches('/').is_empty() {
            return Err(VentoError::config("source base_url is empty"));
        }
        self.pipeline.validate()
    }

    /// Relative sqlite paths resolve against the datastore directory.
    pub fn sqlite_path(&self, base_dir: &Path) -> VentoResult<PathBuf> {
        match &self.database {
            DatabaseConfig::Sqlite { path } => {
                let candidate = PathBuf::from(path.as_deref().unwrap_or(DEFAULT_DB_FILE));
                if candidate.is_absolute() {
                    Ok(candidate)
                } else {
                    Ok(base_dir.join(candidate))
                }
            }
            _ => Err(VentoError::config(format!(
                "database backend is {}, not sqlite",
                self.backend_name()
            ))),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.database {
            DatabaseConfig::Sqlite { .. } => "sqlite",
            DatabaseConfig::Postgres { .. } => "postgres",
            DatabaseConfig::Mysql { .. } => "mysql",
        }
    }

    pub fn connection_url(&self) -> Option<&str> {
        match &self.database {
            DatabaseConfig::Sqlite { .. } => None,
            DatabaseConfig::Postgres { url } | DatabaseConfig::Mysql { url } => Some(url.as_str()),
        }
    }
}
