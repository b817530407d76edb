//! Transport module for Linkpool
//!
//! This module provides the raw connection seam used by dialing pools,
//! socket tuning for pooled connections, and TLS wrapping for both roles.

mod tcp;
mod tls;

pub use tcp::TcpDialer;
pub use tls::{ClientTls, ServerTls};

use crate::config::TcpConfig;
use async_trait::async_trait;
use std::fmt::Debug;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Socket options for pooled connections
#[derive(Debug, Clone)]
pub struct SocketOpts {
    /// Enable TCP_NODELAY
    pub nodelay: bool,
    /// TCP keepalive period, used for both idle time and probe interval
    pub keepalive: Option<Duration>,
}

impl Default for SocketOpts {
    fn default() -> Self {
        SocketOpts {
            nodelay: true,
            keepalive: Some(Duration::from_secs(30)),
        }
    }
}

impl SocketOpts {
    /// Create socket options from TCP config
    pub fn from_tcp_config(config: &TcpConfig) -> Self {
        SocketOpts {
            nodelay: config.nodelay,
            keepalive: config.keepalive(),
        }
    }

    /// Apply socket options to a TCP stream
    pub fn apply(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_nodelay(self.nodelay)?;

        if let Some(period) = self.keepalive {
            let socket = socket2::SockRef::from(stream);
            let keepalive = socket2::TcpKeepalive::new()
                .with_time(period)
                .with_interval(period);
            socket.set_tcp_keepalive(&keepalive)?;
        }

        Ok(())
    }

    /// Apply socket options, logging instead of failing
    pub fn hint(&self, stream: &TcpStream) {
        if let Err(e) = self.apply(stream) {
            tracing::warn!("Failed to apply socket options: {}", e);
        }
    }
}

/// Source of raw transport connections for a dialing pool
///
/// Implementations open one fresh connection to the listening pool per call.
/// TLS and the ID exchange are layered on top by the pool.
#[async_trait]
pub trait Dialer: Debug + Send + Sync + 'static {
    /// Open a raw connection
    async fn dial(&self) -> io::Result<TcpStream>;
}

/// Dynamic stream trait for pooled connections
pub trait StreamDyn: AsyncRead + AsyncWrite + Unpin + Send + Sync + Debug {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + Sync + Debug> StreamDyn for T {}

/// A pooled connection handle, plain or TLS-wrapped
pub type PooledConn = Box<dyn StreamDyn>;
