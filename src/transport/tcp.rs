//! TCP dialer implementation
//!
//! Opens plain TCP connections to the listening pool.

use super::Dialer;
use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;

/// Dials a fixed remote address over TCP
#[derive(Debug, Clone)]
pub struct TcpDialer {
    /// Remote address, resolved on every dial
    addr: String,
    /// Connection timeout
    connect_timeout: Duration,
}

impl TcpDialer {
    /// Create a new TCP dialer with the default timeout
    pub fn new(addr: &str) -> Self {
        TcpDialer {
            addr: addr.to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Get the remote address
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self) -> io::Result<TcpStream> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("Connection timeout to {}", self.addr),
                )
            })??;

        tracing::trace!("TCP connection established to {}", self.addr);
        Ok(stream)
    }
}
