//! Configuration module for the structure panel
//!
//! Configuration is loaded from a TOML file, falls back to defaults for
//! anything missing, and accepts a few environment overrides (`.env` is
//! honoured).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::channel::{Backoff, RetryPolicy};
use crate::errors::{PanelError, PanelResult};
use crate::refresh::{RefreshOptions, Routes};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub wallet: WalletConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL relative endpoints are resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Inserted before the address in structure routes
    #[serde(default)]
    pub route_prefix: String,

    /// Request timeout in seconds; unset waits indefinitely
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per submission; `0` retries forever
    #[serde(default = "default_max_attempts")]
    pub max_attempts: Option<u32>,

    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,

    #[serde(default)]
    pub backoff: Backoff,

    /// Cap for exponential backoff
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// JSON-RPC endpoint of the wallet node
    #[serde(default = "default_wallet_rpc_url")]
    pub rpc_url: String,

    /// Deposit amount in ether
    #[serde(default = "default_deposit_ether")]
    pub deposit_ether: String,

    /// Refuse deposits outside the main network
    #[serde(default)]
    pub require_main_network: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Re-enable the reload control when a refresh fails
    #[serde(default)]
    pub restore_on_failure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_path")]
    pub state_path: String,
}

// Default value functions
fn default_base_url() -> String { "http://127.0.0.1:5000".to_string() }
fn default_max_attempts() -> Option<u32> { Some(crate::channel::retry_policy::DEFAULT_MAX_ATTEMPTS) }
fn default_retry_delay_ms() -> u64 { 5000 }
fn default_max_delay_ms() -> u64 { 60_000 }
fn default_wallet_rpc_url() -> String { "http://127.0.0.1:8545".to_string() }
fn default_deposit_ether() -> String { crate::wallet::units::DEPOSIT_ETHER.to_string() }
fn default_session_path() -> String { ".erc360-session.json".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            route_prefix: String::new(),
            request_timeout_secs: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay_ms(),
            backoff: Backoff::Fixed,
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_wallet_rpc_url(),
            deposit_ether: default_deposit_ether(),
            require_main_network: false,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            state_path: default_session_path(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.filter(|n| *n > 0),
            delay: Duration::from_millis(self.delay_ms),
            backoff: self.backoff,
            max_delay: Duration::from_millis(self.max_delay_ms.max(self.delay_ms)),
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> PanelResult<Self> {
        toml::from_str(content)
            .map_err(|e| PanelError::Configuration(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> PanelResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PanelError::Configuration(format!("Failed to read config file {}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> PanelResult<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `PANEL_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> PanelResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PANEL_BASE_URL") {
            self.server.base_url = url;
        }
        if let Some(url) = lookup("PANEL_WALLET_RPC_URL") {
            self.wallet.rpc_url = url;
        }
        if let Some(raw) = lookup("PANEL_RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = match raw.trim() {
                "" | "unbounded" | "none" => None,
                n => Some(n.parse().map_err(|_| {
                    PanelError::Configuration(format!("PANEL_RETRY_MAX_ATTEMPTS={}", raw))
                })?),
            };
        }
        Ok(())
    }

    pub fn refresh_options(&self) -> RefreshOptions {
        RefreshOptions {
            routes: Routes::new(&self.server.route_prefix),
            restore_on_failure: self.refresh.restore_on_failure,
        }
    }
}
