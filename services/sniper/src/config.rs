//! Configuration types for the sniper service

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::SniperError;

/// Smallest accepted check interval, in seconds
pub const MIN_CHECK_INTERVAL_SECONDS: u64 = 30;

/// Largest accepted provider call timeout, in seconds
pub const MAX_REQUEST_TIMEOUT_SECONDS: u64 = 600;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Monitoring session to start at boot
    #[serde(default)]
    pub monitoring: Option<MonitoringConfig>,
}

impl Config {
    /// Fill empty OVH credentials from the environment
    ///
    /// Fails when the OVH provider is selected and a credential is still
    /// missing afterwards.
    pub fn resolve_secrets(&mut self) -> crate::Result<()> {
        if let ProviderConfig::Ovh {
            app_key,
            app_secret,
            consumer_key,
            ..
        } = &mut self.provider
        {
            for (value, var) in [
                (app_key, "OVH_APP_KEY"),
                (app_secret, "OVH_APP_SECRET"),
                (consumer_key, "OVH_CONSUMER_KEY"),
            ] {
                if value.is_empty() {
                    if let Ok(from_env) = std::env::var(var) {
                        tracing::debug!("Using {} from environment", var);
                        *value = from_env;
                    }
                }
                if value.is_empty() {
                    return Err(SniperError::InvalidConfig(format!(
                        "OVH provider requires a credential, set it in the config file or {}",
                        var
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Inventory provider selection with tagged enum for extensibility
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProviderConfig {
    #[serde(rename = "simulated")]
    Simulated {
        #[serde(default = "default_availability_probability")]
        availability_probability: f64,
    },
    #[serde(rename = "ovh")]
    Ovh {
        #[serde(default = "default_ovh_endpoint")]
        endpoint: String,
        #[serde(default)]
        app_key: String,
        #[serde(default)]
        app_secret: String,
        #[serde(default)]
        consumer_key: String,
    },
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Simulated {
            availability_probability: default_availability_probability(),
        }
    }
}

impl ProviderConfig {
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Simulated { .. } => "simulated",
            ProviderConfig::Ovh { .. } => "ovh",
        }
    }
}

/// Engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound for every single provider call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Maximum number of retained log entries
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
            log_capacity: default_log_capacity(),
        }
    }
}

impl EngineConfig {
    /// Reject timeouts that are zero or too large to schedule, and an empty log
    pub fn validate(&self) -> crate::Result<()> {
        if self.request_timeout_seconds == 0
            || self.request_timeout_seconds > MAX_REQUEST_TIMEOUT_SECONDS
        {
            return Err(SniperError::InvalidConfig(format!(
                "engine.request_timeout_seconds must be between 1 and {}, got {}",
                MAX_REQUEST_TIMEOUT_SECONDS, self.request_timeout_seconds
            )));
        }
        if self.log_capacity == 0 {
            return Err(SniperError::InvalidConfig(
                "engine.log_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP control API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_server_port(),
        }
    }
}

/// What to watch and how to buy it. Immutable once accepted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringConfig {
    #[serde(default)]
    pub identifier: String,
    /// OVH subsidiary the cart is created in (FR, GB, DE, ...)
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub target_plan_code: String,
    #[serde(rename = "targetOS", default = "default_target_os")]
    pub target_os: String,
    #[serde(default = "default_target_duration")]
    pub target_duration: String,
    #[serde(default)]
    pub datacenter: Option<String>,
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
    #[serde(default)]
    pub auto_checkout: bool,
}

impl MonitoringConfig {
    /// Reject a config that can't be monitored. Nothing is clamped.
    pub fn validate(&self) -> crate::Result<()> {
        if self.check_interval < MIN_CHECK_INTERVAL_SECONDS {
            return Err(SniperError::InvalidConfig(format!(
                "checkInterval must be at least {} seconds, got {}",
                MIN_CHECK_INTERVAL_SECONDS, self.check_interval
            )));
        }

        let required = [
            ("identifier", &self.identifier),
            ("zone", &self.zone),
            ("targetPlanCode", &self.target_plan_code),
            ("targetOS", &self.target_os),
            ("targetDuration", &self.target_duration),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(SniperError::InvalidConfig(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }

    /// Preferred datacenter, ignoring blank values
    pub fn preferred_datacenter(&self) -> Option<&str> {
        self.datacenter
            .as_deref()
            .map(str::trim)
            .filter(|dc| !dc.is_empty())
    }
}

fn default_availability_probability() -> f64 {
    0.3
}

fn default_ovh_endpoint() -> String {
    "ovh-eu".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_capacity() -> usize {
    500
}

fn default_true() -> bool {
    true
}

fn default_server_port() -> u16 {
    11120
}

fn default_target_os() -> String {
    "none_64.en".to_string()
}

fn default_target_duration() -> String {
    "P1M".to_string()
}

fn default_check_interval() -> u64 {
    360
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SniperError::InvalidConfig(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    config.engine.validate()?;
    Ok(config)
}
