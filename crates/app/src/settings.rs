//! Application settings.
//!
//! Read from `config/splitledger.toml` when present, then overridden by
//! `SPLITLEDGER__*` environment variables (e.g. `SPLITLEDGER__APP__LEVEL=debug`,
//! `SPLITLEDGER__SERVER__PORT=8080`).

use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/splitledger";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database: Database,
}

fn default_port() -> u16 {
    3000
}

/// Where the ledger lives.
///
/// `database = "memory"` or `database = { sqlite = "splitledger.db" }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    #[default]
    Memory,
    Sqlite(String),
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::from_sources(
            config::File::with_name(DEFAULT_CONFIG_PATH).required(false),
            config::Environment::with_prefix("SPLITLEDGER").separator("__"),
        )
    }

    fn from_sources(
        file: config::File<config::FileSourceFile, config::FileFormat>,
        env: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()
    }
}
