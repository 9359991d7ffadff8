// config lets the database location be read from a separate file
use config::{Config, Environment, File};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::error::Result;

/// Name of the settings file, looked up with any supported extension.
pub const SETTINGS_FILE: &str = "rowkeep";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// Path of the SQLite database, or `:memory:`.
    #[serde(default = "default_database")]
    pub database: String,
    /// Enforce foreign keys in the engine. REPLACE of a referenced row
    /// fails while this is on.
    #[serde(default)]
    pub foreign_keys: bool,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_database() -> String {
    ":memory:".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: default_database(),
            foreign_keys: false,
            log_filter: default_log_filter(),
        }
    }
}

impl Settings {
    /// Reads `rowkeep.toml` (or `.json`, ...) if present, overridden by
    /// `ROWKEEP_*` environment variables.
    pub fn load() -> Result<Settings> {
        Self::load_from(SETTINGS_FILE)
    }

    pub fn load_from(name: &str) -> Result<Settings> {
        let settings = Config::builder()
            .add_source(File::with_name(name).required(false))
            .add_source(Environment::with_prefix("ROWKEEP"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

/// Installs a formatting subscriber. `RUST_LOG` wins over `filter` when set.
/// Returns false when a global subscriber was already installed.
pub fn init_logging(filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok()
}
