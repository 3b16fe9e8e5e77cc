//! Daemon settings
//!
//! Settings come from an optional JSON file named by `BEACON_CONFIG`,
//! overridden field by field from the environment:
//!
//! | Variable                   | Field                    |
//! |----------------------------|--------------------------|
//! | `BEACON_DIRECTORY_URL`     | `directory.url`          |
//! | `BEACON_HTTP_TIMEOUT_SECS` | `directory.timeout_secs` |
//! | `BEACON_DEVICE_NAME`       | `device.name`            |
//! | `BEACON_PORT`              | `device.port`            |
//! | `BEACON_REGISTER`          | `device.register`        |
//! | `BEACON_LOG_LEVEL`         | log level (not in JSON)  |

use anyhow::{Context, Result};
use beacon_core::BeaconConfig;
use std::str::FromStr;
use tracing::Level;

/// Fully resolved daemon settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: BeaconConfig,
    pub log_level: Level,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("BEACON_CONFIG").filter(|path| !path.is_empty()) {
            Some(path) => {
                let json = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read BEACON_CONFIG file {}", path))?;
                BeaconConfig::from_json_str(&json)
                    .with_context(|| format!("Invalid configuration in {}", path))?
            }
            None => BeaconConfig::new(),
        };

        if let Some(url) = lookup("BEACON_DIRECTORY_URL") {
            config.directory.url = url;
        }
        if let Some(timeout) = lookup("BEACON_HTTP_TIMEOUT_SECS") {
            config.directory.timeout_secs = parse_var("BEACON_HTTP_TIMEOUT_SECS", &timeout)?;
        }
        if let Some(name) = lookup("BEACON_DEVICE_NAME") {
            config.device.name = name;
        }
        if let Some(port) = lookup("BEACON_PORT") {
            config.device.port = parse_var("BEACON_PORT", &port)?;
        }
        if let Some(register) = lookup("BEACON_REGISTER") {
            config.device.register = parse_flag("BEACON_REGISTER", &register)?;
        }

        let log_level = match lookup("BEACON_LOG_LEVEL") {
            Some(level) => parse_level(&level)?,
            None => Level::INFO,
        };

        config.validate().context("Configuration validation error")?;

        Ok(Self { config, log_level })
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{} has an invalid value: '{}'", name, value))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!(
            "{} must be a boolean (true/false, yes/no, on/off, 1/0). Got: '{}'",
            name,
            value
        ),
    }
}

fn parse_level(value: &str) -> Result<Level> {
    match value.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "BEACON_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            value
        ),
    }
}
