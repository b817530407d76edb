//! Transport configuration types
//!
//! Defines the TLS mode of a dialing pool and the TCP socket settings
//! shared by both pool roles.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// TLS mode applied by a dialing pool after the raw connection is open
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TlsMode {
    /// No TLS wrapping
    #[default]
    Plaintext,
    /// TLS 1.3 with peer certificate verification disabled
    Opportunistic,
    /// TLS 1.3 with full chain and hostname verification
    Verified {
        /// Hostname the server certificate must match
        hostname: String,
    },
}

impl TlsMode {
    /// Whether connections are TLS-wrapped at all
    pub fn is_tls(&self) -> bool {
        !matches!(self, TlsMode::Plaintext)
    }
}

/// Default keepalive period in seconds
fn default_keepalive_secs() -> u64 {
    30
}

fn default_nodelay() -> bool {
    true
}

/// TCP socket configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TcpConfig {
    /// Enable TCP_NODELAY
    #[serde(default = "default_nodelay")]
    pub nodelay: bool,

    /// TCP keepalive period in seconds, 0 disables keepalive
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        TcpConfig {
            nodelay: default_nodelay(),
            keepalive_secs: default_keepalive_secs(),
        }
    }
}

impl TcpConfig {
    /// Keepalive period, `None` when disabled
    pub fn keepalive(&self) -> Option<Duration> {
        (self.keepalive_secs > 0).then(|| Duration::from_secs(self.keepalive_secs))
    }
}
