//! Configuration management
//!
//! Loads configuration from config.toml at startup.
//! All values are configurable to avoid hardcoded constants.

use crate::core::{InstrumentCatalog, InstrumentId, SpreadMapping};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use time::macros::format_description;

/// Spread engine configuration
///
/// Loaded from config.toml at startup. Contains all tunable parameters
/// plus the static spread mappings and instrument catalog.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Engine loop settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// API server settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Order gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Spread id -> ordered leg instrument ids (exactly two per spread)
    #[serde(default)]
    pub spreads: HashMap<String, Vec<String>>,

    /// Instrument id -> contract lot size
    #[serde(default)]
    pub lot_sizes: HashMap<String, u32>,

    /// Instrument id -> display name
    #[serde(default)]
    pub instrument_names: HashMap<String, String>,

    /// Contract expiry dates, ISO `YYYY-MM-DD`
    #[serde(default)]
    pub expiry_dates: Vec<String>,
}

/// Engine loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Refresh cycle interval in milliseconds
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,

    /// Directory holding the shared-memory regions
    #[serde(default = "default_shm_dir")]
    pub shm_dir: PathBuf,

    /// Path of the per-tick result snapshot file
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Path of the position ledger file
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Port for HTTP API server
    #[serde(default = "default_api_port")]
    pub port: u16,
}

/// Order gateway configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// Basket order endpoint
    #[serde(default = "default_gateway_url")]
    pub url: String,

    /// Client identifier shared by both legs
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Strategy identifier shared by both legs
    #[serde(default = "default_strategy_id")]
    pub strategy_id: String,

    /// Exchange segment tag on each leg
    #[serde(default = "default_exchange_segment")]
    pub exchange_segment: String,

    /// Order type tag on each leg
    #[serde(default = "default_order_type")]
    pub order_type: String,

    /// Order validity tag on each leg
    #[serde(default = "default_order_validity")]
    pub order_validity: String,

    /// Request deadline in milliseconds
    #[serde(default = "default_gateway_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_ms: default_refresh_ms(),
            shm_dir: default_shm_dir(),
            snapshot_path: default_snapshot_path(),
            ledger_path: default_ledger_path(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            client_id: default_client_id(),
            strategy_id: default_strategy_id(),
            exchange_segment: default_exchange_segment(),
            order_type: default_order_type(),
            order_validity: default_order_validity(),
            timeout_ms: default_gateway_timeout_ms(),
        }
    }
}

fn default_refresh_ms() -> u64 {
    1000
}

fn default_shm_dir() -> PathBuf {
    PathBuf::from("/dev/shm")
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("spread_snapshot.json")
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("positions.json")
}

fn default_api_port() -> u16 {
    5001
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:5004/api/v1/orders/basket".to_string()
}

fn default_client_id() -> String {
    "SampleClient".to_string()
}

fn default_strategy_id() -> String {
    "SpreadStrategy".to_string()
}

fn default_exchange_segment() -> String {
    "NSEFO".to_string()
}

fn default_order_type() -> String {
    "LIMIT".to_string()
}

fn default_order_validity() -> String {
    "1".to_string()
}

fn default_gateway_timeout_ms() -> u64 {
    5000
}

impl Config {
    /// Load configuration from config.toml file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// # Errors
    /// Returns error if file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => {
                let config: Config = toml::from_str(&contents)
                    .map_err(|e| ConfigError::ParseError(e.to_string()))?;
                config.validate()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File not found - use defaults
                Ok(Config::default())
            }
            Err(e) => Err(ConfigError::IoError(e)),
        }
    }

    /// Reject malformed expiry dates at startup rather than per tick.
    /// Leg-count problems are deliberately NOT load failures: a spread id
    /// with the wrong number of legs renders as a per-spread error entry.
    fn validate(&self) -> Result<(), ConfigError> {
        let format = format_description!("[year]-[month]-[day]");
        for date in &self.expiry_dates {
            time::Date::parse(date, &format).map_err(|e| {
                ConfigError::ParseError(format!("invalid expiry date '{date}': {e}"))
            })?;
        }
        Ok(())
    }

    /// Spread mapping view of the configuration.
    pub fn spread_mapping(&self) -> SpreadMapping {
        let legs = self
            .spreads
            .iter()
            .map(|(spread_id, legs)| {
                (
                    spread_id.clone(),
                    legs.iter().map(|l| InstrumentId::from(l.clone())).collect(),
                )
            })
            .collect();
        SpreadMapping::new(legs)
    }

    /// Instrument catalog view of the configuration.
    pub fn instrument_catalog(&self) -> InstrumentCatalog {
        InstrumentCatalog::new(
            self.instrument_names.clone(),
            self.lot_sizes.clone(),
            self.expiry_dates.clone(),
        )
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading file
    IoError(std::io::Error),
    /// Parse error (invalid TOML or invalid values)
    ParseError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::ParseError(e) => write!(f, "Failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError(e) => Some(e),
            ConfigError::ParseError(_) => None,
        }
    }
}
