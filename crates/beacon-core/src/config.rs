//! Configuration types for the beacon agent
//!
//! This module defines all configuration structures used throughout the workspace.

use serde::{Deserialize, Serialize};

/// Default directory service endpoint
pub const DEFAULT_DIRECTORY_URL: &str = "http://www.sparod.com/melo/discover.php";

/// Size of a netlink message header; receive buffers must hold at least one
pub const NETLINK_HEADER_LEN: usize = 16;

/// Main beacon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeaconConfig {
    /// Directory service settings
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Device identity advertised to the directory
    #[serde(default)]
    pub device: DeviceConfig,

    /// Discovery service settings
    #[serde(default)]
    pub service: ServiceConfig,
}

impl BeaconConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from a JSON document
    ///
    /// Missing sections and fields fall back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, crate::Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.directory.validate()?;
        self.device.validate()?;
        self.service.validate()?;

        Ok(())
    }
}

/// Directory service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Endpoint receiving `action=...` GET requests
    #[serde(default = "default_directory_url")]
    pub url: String,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl DirectoryConfig {
    /// Validate the directory configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.url.is_empty() {
            return Err(crate::Error::config("Directory URL cannot be empty"));
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(crate::Error::config(format!(
                "Directory URL must use HTTP or HTTPS scheme. Got: {}",
                self.url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Directory timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: default_directory_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Device identity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Human-readable device name
    #[serde(default = "default_device_name")]
    pub name: String,

    /// Port the device's own service listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Register with the directory when the daemon starts
    #[serde(default)]
    pub register: bool,
}

impl DeviceConfig {
    /// Validate the device configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::config("Device name cannot be empty"));
        }
        if self.port == 0 {
            return Err(crate::Error::config("Device port must be > 0"));
        }
        Ok(())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            port: default_port(),
            register: false,
        }
    }
}

/// Discovery service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Capacity of the service event channel
    ///
    /// When full, new service events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Size of the buffer used for one kernel socket read
    #[serde(default = "default_receive_buffer_size")]
    pub receive_buffer_size: usize,
}

impl ServiceConfig {
    /// Validate the service configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        if self.receive_buffer_size < NETLINK_HEADER_LEN {
            return Err(crate::Error::config(format!(
                "Receive buffer must hold at least {} bytes",
                NETLINK_HEADER_LEN
            )));
        }
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
            receive_buffer_size: default_receive_buffer_size(),
        }
    }
}

fn default_directory_url() -> String {
    DEFAULT_DIRECTORY_URL.to_string()
}

fn default_user_agent() -> String {
    "beacon".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_device_name() -> String {
    "Beacon".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_receive_buffer_size() -> usize {
    4096
}
