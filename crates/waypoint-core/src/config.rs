use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_TIMEZONE: &str = "Europe/Moscow";

/// Top-level config (waypoint.toml + WAYPOINT_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaypointConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub result_set: ResultSetConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub dialog: DialogConfig,
    /// Bearer token the transport adapter must present on every `/process`
    /// and `/callback` request.
    pub transport_api_token: String,
    /// Default IANA timezone assigned to a user profile on first contact.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for WaypointConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            model: ModelConfig::default(),
            store: StoreConfig::default(),
            result_set: ResultSetConfig::default(),
            notification: NotificationConfig::default(),
            dialog: DialogConfig::default(),
            transport_api_token: "change-me".to_string(),
            default_timezone: default_timezone(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// §5 "an inbound request carries a deadline": past this, the request
    /// is cancelled and the caller gets the generic "try again" response.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Language model adapter settings. No concrete client ships in this
/// workspace (see [`crate::model::ModelAdapter`]) — `adapter_url` is carried
/// here only so a real implementation has somewhere to read its endpoint
/// from without inventing a second config layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub adapter_url: Option<String>,
    #[serde(default = "default_model_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_model_temperature")]
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            adapter_url: None,
            timeout_ms: default_model_timeout_ms(),
            temperature: default_model_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_dsn")]
    pub dsn: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dsn: default_store_dsn(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSetConfig {
    #[serde(default = "default_result_set_ttl_s")]
    pub ttl_s: u64,
    #[serde(default = "default_result_set_capacity")]
    pub capacity: usize,
}

impl Default for ResultSetConfig {
    fn default() -> Self {
        Self {
            ttl_s: default_result_set_ttl_s(),
            capacity: default_result_set_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_rate_per_s")]
    pub rate_per_s: u32,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            rate_per_s: default_notification_rate_per_s(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogConfig {
    #[serde(default = "default_dialog_state_timeout_s")]
    pub state_timeout_s: u64,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            state_timeout_s: default_dialog_state_timeout_s(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_model_timeout_ms() -> u64 {
    20_000
}
fn default_model_temperature() -> f32 {
    0.2
}
fn default_store_dsn() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.waypoint/waypoint.db", home)
}
fn default_result_set_ttl_s() -> u64 {
    3600
}
fn default_result_set_capacity() -> usize {
    64
}
fn default_notification_rate_per_s() -> u32 {
    30
}
fn default_dialog_state_timeout_s() -> u64 {
    1800
}
fn default_request_timeout_ms() -> u64 {
    30_000
}

impl WaypointConfig {
    /// Load config from a TOML file with WAYPOINT_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. `WAYPOINT_CONFIG` env var
    ///   3. `~/.waypoint/waypoint.toml`
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("WAYPOINT_CONFIG").ok())
            .unwrap_or_else(default_config_path);

        let config: WaypointConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("WAYPOINT_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.waypoint/waypoint.toml", home)
}
