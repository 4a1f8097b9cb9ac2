//! A datastore directory holds `vento.json` and, for sqlite, the database file.

use std::path::{Path, PathBuf};

use log::info;
use vento_core::VentoResult;

use crate::config::{CONFIG_FILE_NAME, DEFAULT_DB_FILE};
use crate::{SignalStore, VentoConfig};

pub fn config_path(base: &Path) -> PathBuf {
    base.join(CONFIG_FILE_NAME)
}

pub fn default_sqlite_path(base: &Path) -> PathBuf {
    base.join(DEFAULT_DB_FILE)
}

pub fn load_or_init_config(base: &Path) -> VentoResult<VentoConfig> {
    VentoConfig::load_or_init(base, &default_sqlite_path(base))
}

/// Load or create the settings under `base`, then connect and migrate the store.
pub async fn open_store(base: &Path) -> VentoResult<SignalStore> {
    let config = load_or_init_config(base)?;
    info!(
        "datastore: opening {} store from {}",
        config.backend_name(),
        config_path(base).display()
    );
    SignalStore::connect(&config, base).await
}
