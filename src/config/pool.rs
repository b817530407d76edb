//! Pool role configuration
//!
//! Defines the settings of a dialing (client) pool and a listening
//! (server) pool.

use super::{TcpConfig, TlsMode};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Default minimum and maximum capacity
pub const DEFAULT_CAPACITY: usize = 1;

/// Default minimum and maximum creation interval in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

/// Default dial timeout in seconds
fn default_connect_timeout() -> u64 {
    10
}

/// Dialing pool configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClientPoolConfig {
    /// Address of the listening pool (e.g., "tunnel.example.com:10101")
    pub remote_addr: String,

    /// Lower bound of the target capacity
    #[serde(default = "default_capacity")]
    pub min_capacity: usize,

    /// Upper bound of the target capacity and size of the availability queue
    #[serde(default = "default_capacity")]
    pub max_capacity: usize,

    /// Lower bound of the creation interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub min_interval_ms: u64,

    /// Upper bound of the creation interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub max_interval_ms: u64,

    /// Dial timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// TLS mode
    #[serde(default)]
    pub tls: TlsMode,

    /// Extra PEM trust anchor for verified TLS
    #[serde(default)]
    pub trusted_root: Option<String>,

    /// TCP socket settings
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl ClientPoolConfig {
    /// Create a configuration with default bounds for the given address
    pub fn new(remote_addr: &str) -> Self {
        ClientPoolConfig {
            remote_addr: remote_addr.to_string(),
            min_capacity: DEFAULT_CAPACITY,
            max_capacity: DEFAULT_CAPACITY,
            min_interval_ms: DEFAULT_INTERVAL_MS,
            max_interval_ms: DEFAULT_INTERVAL_MS,
            connect_timeout_secs: default_connect_timeout(),
            tls: TlsMode::default(),
            trusted_root: None,
            tcp: TcpConfig::default(),
        }
    }

    /// Replace zero bounds and timeouts with defaults and order swapped bounds
    pub fn normalized(mut self) -> Self {
        if self.min_capacity == 0 {
            self.min_capacity = DEFAULT_CAPACITY;
        }
        if self.max_capacity == 0 {
            self.max_capacity = DEFAULT_CAPACITY;
        }
        if self.min_capacity > self.max_capacity {
            std::mem::swap(&mut self.min_capacity, &mut self.max_capacity);
        }

        if self.min_interval_ms == 0 {
            self.min_interval_ms = DEFAULT_INTERVAL_MS;
        }
        if self.max_interval_ms == 0 {
            self.max_interval_ms = DEFAULT_INTERVAL_MS;
        }
        if self.min_interval_ms > self.max_interval_ms {
            std::mem::swap(&mut self.min_interval_ms, &mut self.max_interval_ms);
        }

        if self.connect_timeout_secs == 0 {
            self.connect_timeout_secs = default_connect_timeout();
        }
        self
    }

    /// Lower bound of the creation interval
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Upper bound of the creation interval
    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    /// Dial timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.remote_addr.is_empty() {
            return Err("client remote_addr must not be empty".to_string());
        }
        if let TlsMode::Verified { hostname } = &self.tls {
            if hostname.is_empty() {
                return Err("verified TLS requires a hostname".to_string());
            }
        }
        Ok(())
    }
}

/// Listening pool configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerPoolConfig {
    /// Local address to accept pool connections on
    pub bind_addr: String,

    /// Maximum number of idle connections
    #[serde(default = "default_capacity")]
    pub max_capacity: usize,

    /// Only accept connections from this address
    #[serde(default)]
    pub client_ip: Option<IpAddr>,

    /// Generate a self-signed TLS credential under this name
    #[serde(default)]
    pub tls_name: Option<String>,

    /// TCP socket settings
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl ServerPoolConfig {
    /// Create a configuration with default capacity for the given address
    pub fn new(bind_addr: &str) -> Self {
        ServerPoolConfig {
            bind_addr: bind_addr.to_string(),
            max_capacity: DEFAULT_CAPACITY,
            client_ip: None,
            tls_name: None,
            tcp: TcpConfig::default(),
        }
    }

    /// Replace a zero capacity with the default
    pub fn normalized(mut self) -> Self {
        if self.max_capacity == 0 {
            self.max_capacity = DEFAULT_CAPACITY;
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.bind_addr.is_empty() {
            return Err("server bind_addr must not be empty".to_string());
        }
        if matches!(self.tls_name.as_deref(), Some("")) {
            return Err("server tls_name must not be empty".to_string());
        }
        Ok(())
    }
}
