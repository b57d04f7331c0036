//! Layered configuration for tableside.
//!
//! Settings are read from `.tableside/tableside.toml` (or an explicit
//! `--config` path), then overridden by environment variables and finally by
//! CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! ws_url = "ws://127.0.0.1:8080"
//! orders_path = "/ws/orders"
//! bills_path = "/ws/bills"
//!
//! [connection]
//! reconnect_attempts = 20
//! reconnect_interval_ms = 5000
//! connect_timeout_ms = 5000
//! frame_buffer = 256
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! directory = ".tableside/logs"
//!
//! [kitchen]
//! statuses = ["APPROVED_BY_FRONT_DESK", "APPROVED_BY_KITCHEN", "APPROVED", "CONFIRMED"]
//! ```
//!
//! | Environment variable | Overrides          |
//! |----------------------|--------------------|
//! | `TABLESIDE_WS_URL`   | `server.ws_url`    |
//! | `TABLESIDE_TOKEN`    | session token      |
//! | `RUST_LOG`           | `logging.level`    |

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tableside_common::OrderStatus;

use crate::feed::views::DEFAULT_KITCHEN_STATUSES;
use crate::feed::{ConnectionOptions, ReconnectPolicy};
use crate::session::Session;

pub const CONFIG_DIR: &str = ".tableside";
pub const CONFIG_FILE: &str = "tableside.toml";

pub const WS_URL_ENV: &str = "TABLESIDE_WS_URL";
pub const TOKEN_ENV: &str = "TABLESIDE_TOKEN";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Invalid log format '{}'. Valid values: pretty, json", s),
        }
    }
}

/// Backend endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// WebSocket base URL (ws:// or wss://)
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_orders_path")]
    pub orders_path: String,
    #[serde(default = "default_bills_path")]
    pub bills_path: String,
}

fn default_ws_url() -> String {
    "ws://127.0.0.1:8080".to_string()
}

fn default_orders_path() -> String {
    "/ws/orders".to_string()
}

fn default_bills_path() -> String {
    "/ws/bills".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            orders_path: default_orders_path(),
            bills_path: default_bills_path(),
        }
    }
}

/// Socket behaviour shared by both feeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSection {
    /// Reconnect attempts after an unexpected close
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,
    /// Fixed delay between reconnect attempts
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Frames buffered between socket and synchronizer
    #[serde(default = "default_frame_buffer")]
    pub frame_buffer: usize,
}

fn default_reconnect_attempts() -> u32 {
    20
}

fn default_reconnect_interval_ms() -> u64 {
    5000
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_frame_buffer() -> usize {
    256
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            frame_buffer: default_frame_buffer(),
        }
    }
}

impl ConnectionSection {
    pub fn to_connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            reconnect: ReconnectPolicy {
                max_attempts: self.reconnect_attempts,
                interval: Duration::from_millis(self.reconnect_interval_ms),
            },
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            frame_buffer: self.frame_buffer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Also write daily-rolling log files here
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            directory: None,
        }
    }
}

/// Kitchen dashboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KitchenSection {
    /// Order statuses shown on the kitchen dashboard
    #[serde(default = "default_kitchen_statuses")]
    pub statuses: Vec<String>,
}

fn default_kitchen_statuses() -> Vec<String> {
    DEFAULT_KITCHEN_STATUSES
        .iter()
        .map(|status| status.as_str().to_string())
        .collect()
}

impl Default for KitchenSection {
    fn default() -> Self {
        Self {
            statuses: default_kitchen_statuses(),
        }
    }
}

/// The complete tableside.toml structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TablesideToml {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub connection: ConnectionSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub kitchen: KitchenSection,
}

impl TablesideToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse tableside.toml")
    }

    /// Load `<config_dir>/tableside.toml`, or defaults when it does not exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize tableside.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Kitchen allow-list, skipping entries that are not order statuses.
    pub fn kitchen_statuses(&self) -> Vec<OrderStatus> {
        self.kitchen
            .statuses
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect()
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !self.server.ws_url.starts_with("ws://") && !self.server.ws_url.starts_with("wss://") {
            warnings.push(format!(
                "server.ws_url '{}' should start with ws:// or wss://",
                self.server.ws_url
            ));
        }
        for (key, path) in [
            ("orders_path", &self.server.orders_path),
            ("bills_path", &self.server.bills_path),
        ] {
            if !path.starts_with('/') {
                warnings.push(format!("server.{} '{}' should start with '/'", key, path));
            }
        }

        if self.connection.reconnect_interval_ms == 0 {
            warnings.push(
                "connection.reconnect_interval_ms is 0: reconnects will spin".to_string(),
            );
        }
        if self.connection.connect_timeout_ms == 0 {
            warnings.push(
                "connection.connect_timeout_ms is 0: every connect will time out".to_string(),
            );
        }
        if self.connection.frame_buffer == 0 {
            warnings.push("connection.frame_buffer is 0; a buffer of 1 will be used".to_string());
        }

        for status in &self.kitchen.statuses {
            if status.parse::<OrderStatus>().is_err() {
                warnings.push(format!("kitchen.statuses: unknown order status '{}'", status));
            }
        }
        if self.kitchen_statuses().is_empty() {
            warnings.push(
                "kitchen.statuses is empty: the kitchen dashboard will show nothing".to_string(),
            );
        }

        warnings
    }
}

/// Runtime configuration.
///
/// Merges settings from:
/// 1. tableside.toml
/// 2. Environment variables
/// 3. CLI arguments
#[derive(Debug, Clone)]
pub struct TablesideConfig {
    /// Path the file settings were read from (may not exist)
    pub config_path: PathBuf,
    pub toml: TablesideToml,
    /// CLI override for server.ws_url
    pub cli_ws_url: Option<String>,
    /// CLI override for the session token
    pub cli_token: Option<String>,
}

impl TablesideConfig {
    /// Load from an explicit file, or from `<project_dir>/.tableside/tableside.toml`.
    /// A missing file yields defaults; `config_path` still records where it was looked for.
    pub fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        let (config_path, toml) = match explicit {
            Some(path) if path.exists() => (path.to_path_buf(), TablesideToml::load(path)?),
            Some(path) => (path.to_path_buf(), TablesideToml::default()),
            None => {
                let config_dir = project_dir.join(CONFIG_DIR);
                (
                    config_dir.join(CONFIG_FILE),
                    TablesideToml::load_or_default(&config_dir)?,
                )
            }
        };
        Ok(Self {
            config_path,
            toml,
            cli_ws_url: None,
            cli_token: None,
        })
    }

    pub fn with_cli_args(mut self, ws_url: Option<String>, token: Option<String>) -> Self {
        self.cli_ws_url = ws_url;
        self.cli_token = token;
        self
    }

    /// WebSocket base URL (CLI → env → file).
    pub fn ws_url(&self) -> String {
        self.cli_ws_url
            .clone()
            .or_else(|| std::env::var(WS_URL_ENV).ok())
            .unwrap_or_else(|| self.toml.server.ws_url.clone())
    }

    /// Session token (CLI → env). Never read from the config file.
    pub fn token(&self) -> Option<String> {
        self.cli_token
            .clone()
            .or_else(|| std::env::var(TOKEN_ENV).ok())
            .filter(|token| !token.is_empty())
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        self.toml.connection.to_connection_options()
    }

    pub fn kitchen_statuses(&self) -> Vec<OrderStatus> {
        self.toml.kitchen_statuses()
    }

    /// Build a signed-out session for the configured endpoints.
    pub fn session(&self) -> Result<Session> {
        let ws_url = self.ws_url();
        Session::new(
            &ws_url,
            &self.toml.server.orders_path,
            &self.toml.server.bills_path,
        )
        .with_context(|| format!("Invalid feed endpoints for {}", ws_url))
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;

    /// Serializes tests that touch process environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults() {
        let toml = TablesideToml::default();
        assert_eq!(toml.server.ws_url, "ws://127.0.0.1:8080");
        assert_eq!(toml.server.orders_path, "/ws/orders");
        assert_eq!(toml.connection.reconnect_attempts, 20);
        assert_eq!(toml.logging.format, LogFormat::Pretty);
        assert_eq!(toml.kitchen_statuses(), DEFAULT_KITCHEN_STATUSES.to_vec());
        assert!(toml.validate().is_empty());
    }

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let content = r#"
[server]
ws_url = "wss://pos.example.com"

[connection]
reconnect_attempts = 3
reconnect_interval_ms = 250

[logging]
format = "json"
"#;
        let toml = TablesideToml::parse(content).unwrap();
        assert_eq!(toml.server.ws_url, "wss://pos.example.com");
        assert_eq!(toml.server.bills_path, "/ws/bills");
        assert_eq!(toml.logging.format, LogFormat::Json);
        assert_eq!(toml.logging.level, "info");

        let options = toml.connection.to_connection_options();
        assert_eq!(options.reconnect.max_attempts, 3);
        assert_eq!(options.reconnect.interval, Duration::from_millis(250));
        assert_eq!(options.connect_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_parse_rejects_bad_format() {
        let content = "[logging]\nformat = \"xml\"\n";
        assert!(TablesideToml::parse(content).is_err());
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
    }

    #[test]
    fn test_validate_reports_problems() {
        let content = r#"
[server]
ws_url = "http://pos.example.com"
orders_path = "ws/orders"

[connection]
reconnect_interval_ms = 0

[kitchen]
statuses = ["COOKING"]
"#;
        let warnings = TablesideToml::parse(content).unwrap().validate();
        assert!(warnings.iter().any(|w| w.contains("ws_url")));
        assert!(warnings.iter().any(|w| w.contains("orders_path")));
        assert!(warnings.iter().any(|w| w.contains("reconnect_interval_ms")));
        assert!(warnings.iter().any(|w| w.contains("'COOKING'")));
        assert!(warnings.iter().any(|w| w.contains("kitchen.statuses is empty")));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut toml = TablesideToml::default();
        toml.connection.frame_buffer = 64;
        toml.save(&path).unwrap();

        let loaded = TablesideToml::load(&path).unwrap();
        assert_eq!(loaded.connection.frame_buffer, 64);
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = TablesideConfig::load(dir.path(), None).unwrap();
        assert_eq!(
            config.config_path,
            dir.path().join(CONFIG_DIR).join(CONFIG_FILE)
        );
        assert_eq!(config.toml.connection.reconnect_attempts, 20);

        let missing = dir.path().join("nope.toml");
        let config = TablesideConfig::load(dir.path(), Some(&missing)).unwrap();
        assert_eq!(config.config_path, missing);

        std::fs::write(&missing, "[connection]\nreconnect_attempts = \"many\"\n").unwrap();
        assert!(TablesideConfig::load(dir.path(), Some(&missing)).is_err());
    }

    #[test]
    fn test_cli_overrides_env_and_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let saved_url = std::env::var(WS_URL_ENV).ok();
        let saved_token = std::env::var(TOKEN_ENV).ok();
        unsafe {
            std::env::set_var(WS_URL_ENV, "ws://from-env:9000");
            std::env::remove_var(TOKEN_ENV);
        }

        let dir = TempDir::new().unwrap();
        let config = TablesideConfig::load(dir.path(), None).unwrap();
        assert_eq!(config.ws_url(), "ws://from-env:9000");
        assert_eq!(config.token(), None);

        let config = config.with_cli_args(Some("ws://from-cli:7000".into()), Some("tok".into()));
        assert_eq!(config.ws_url(), "ws://from-cli:7000");
        assert_eq!(config.token().as_deref(), Some("tok"));
        assert!(config.session().is_ok());

        unsafe {
            match saved_url {
                Some(val) => std::env::set_var(WS_URL_ENV, val),
                None => std::env::remove_var(WS_URL_ENV),
            }
            if let Some(val) = saved_token {
                std::env::set_var(TOKEN_ENV, val);
            }
        }
    }
}
