/// Process configuration from `config.toml` and the environment
pub mod app;

/// Database connection and schema management
pub mod database;

/// Local settings tree consumed by the reconciler
pub mod settings;

pub use app::AppConfig;
