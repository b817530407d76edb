//! Configuration module for Linkpool
//!
//! This module provides configuration types and parsing for both pool roles.

mod pool;
mod transport;

pub use pool::{ClientPoolConfig, ServerPoolConfig, DEFAULT_CAPACITY, DEFAULT_INTERVAL_MS};
pub use transport::{TcpConfig, TlsMode};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default seconds between stats reports
fn default_report_interval() -> u64 {
    30
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Listening pool, if this process accepts pool connections
    #[serde(default)]
    pub server: Option<ServerPoolConfig>,

    /// Dialing pool, if this process maintains outbound connections
    #[serde(default)]
    pub client: Option<ClientPoolConfig>,

    /// Seconds between stats log lines
    #[serde(default = "default_report_interval")]
    pub report_interval: u64,
}

impl Config {
    /// Interval between stats reports
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval.max(1))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.server.is_none() && self.client.is_none() {
            return Err("at least one of [server] or [client] must be configured".to_string());
        }
        if let Some(server) = &self.server {
            server.validate()?;
        }
        if let Some(client) = &self.client {
            client.validate()?;
        }
        Ok(())
    }
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_server_config() {
        let config_str = r#"
[server]
bind_addr = "0.0.0.0:10101"
"#;

        let config = parse_config(config_str).unwrap();
        let server = config.server.unwrap();
        assert_eq!(server.bind_addr, "0.0.0.0:10101");
        assert_eq!(server.max_capacity, 1);
        assert!(server.client_ip.is_none());
        assert!(config.client.is_none());
        assert_eq!(config.report_interval, 30);
    }

    #[test]
    fn test_parse_full_config() {
        let config_str = r#"
report_interval = 5

[server]
bind_addr = "0.0.0.0:10101"
max_capacity = 64
client_ip = "203.0.113.7"
tls_name = "linkpool"

[server.tcp]
nodelay = false
keepalive_secs = 15

[client]
remote_addr = "tunnel.example.com:10101"
min_capacity = 4
max_capacity = 64
min_interval_ms = 100
max_interval_ms = 1000
trusted_root = "/etc/linkpool/ca.pem"

[client.tls]
mode = "verified"
hostname = "tunnel.example.com"
"#;

        let config = parse_config(config_str).unwrap();
        assert_eq!(config.report_interval(), Duration::from_secs(5));

        let server = config.server.unwrap();
        assert_eq!(server.max_capacity, 64);
        assert_eq!(server.client_ip, Some("203.0.113.7".parse().unwrap()));
        assert_eq!(server.tls_name.as_deref(), Some("linkpool"));
        assert!(!server.tcp.nodelay);
        assert_eq!(server.tcp.keepalive_secs, 15);

        let client = config.client.unwrap();
        assert_eq!(client.min_capacity, 4);
        assert_eq!(client.min_interval(), Duration::from_millis(100));
        assert_eq!(
            client.tls,
            TlsMode::Verified {
                hostname: "tunnel.example.com".to_string()
            }
        );
        assert_eq!(client.trusted_root.as_deref(), Some("/etc/linkpool/ca.pem"));
    }

    #[test]
    fn test_parse_config_without_roles() {
        let err = parse_config("report_interval = 10").unwrap_err();
        assert!(format!("{:#}", err).contains("at least one"));
    }

    #[test]
    fn test_parse_config_bad_client_ip() {
        let config_str = r#"
[server]
bind_addr = "0.0.0.0:10101"
client_ip = "not-an-ip"
"#;
        assert!(parse_config(config_str).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linkpool.toml");
        std::fs::write(&path, "[client]\nremote_addr = \"127.0.0.1:10101\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.client.unwrap().remote_addr, "127.0.0.1:10101");

        assert!(load_config(dir.path().join("missing.toml")).is_err());
    }
}
