pub mod config;
pub mod datastore;
mod db;
pub mod migration;
pub mod store;

pub use config::{DatabaseConfig, PoolConfig, VentoConfig};
pub use datastore::{config_path, default_sqlite_path, load_or_init_config, open_store};
pub use store::SignalStore;
pub use vento_core::*;
