//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Ledger behaviour.
    #[serde(default)]
    pub ledger: LedgerSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

/// Settings consumed by the ledger core.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSettings {
    /// Fractional digits allowed on amounts (currency minor unit).
    #[serde(default = "default_amount_scale")]
    pub amount_scale: u32,
    /// Maximum rows accepted by a single import batch.
    #[serde(default = "default_max_import_rows")]
    pub max_import_rows: usize,
    /// Page size used when a list request does not give one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    /// Upper bound on requested page sizes.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    /// Whether a posted transaction without payments may be cancelled.
    #[serde(default = "default_allow_cancel_posted")]
    pub allow_cancel_posted: bool,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            amount_scale: default_amount_scale(),
            max_import_rows: default_max_import_rows(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            allow_cancel_posted: default_allow_cancel_posted(),
        }
    }
}

fn default_amount_scale() -> u32 {
    crate::types::DEFAULT_AMOUNT_SCALE
}

fn default_max_import_rows() -> usize {
    5000
}

fn default_page_size() -> u32 {
    20
}

fn default_max_page_size() -> u32 {
    100
}

fn default_allow_cancel_posted() -> bool {
    true
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
