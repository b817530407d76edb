//! Test utilities for Linkpool
//!
//! This module provides common helpers used across integration tests.

#![allow(dead_code)]

use linkpool::config::{ClientPoolConfig, ServerPoolConfig, TlsMode};
use linkpool::Pool;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_rustls::rustls::ServerConfig;

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Address on loopback that nothing listens on
pub async fn unused_addr() -> SocketAddr {
    let (_listener, addr) = create_test_listener().await;
    addr
}

/// Start a listening pool on an ephemeral port
pub async fn start_server_pool(
    max_capacity: usize,
    tls: Option<Arc<ServerConfig>>,
) -> (Arc<Pool>, SocketAddr) {
    start_server_pool_with(ServerPoolConfig::new("127.0.0.1:0"), max_capacity, tls).await
}

/// Start a listening pool from a base config on an ephemeral port
pub async fn start_server_pool_with(
    config: ServerPoolConfig,
    max_capacity: usize,
    tls: Option<Arc<ServerConfig>>,
) -> (Arc<Pool>, SocketAddr) {
    let (listener, addr) = create_test_listener().await;
    let config = ServerPoolConfig {
        max_capacity,
        ..config
    };
    let pool = Pool::server(config, listener, tls);
    pool.start();
    (pool, addr)
}

/// Test configuration builder for dialing pools
pub struct TestClientBuilder {
    config: ClientPoolConfig,
}

impl TestClientBuilder {
    /// Create a new builder targeting `addr` with a fast creation interval
    pub fn new(addr: SocketAddr) -> Self {
        let mut config = ClientPoolConfig::new(&addr.to_string());
        config.min_interval_ms = 50;
        config.max_interval_ms = 300;
        TestClientBuilder { config }
    }

    /// Set capacity bounds
    pub fn capacity(mut self, min: usize, max: usize) -> Self {
        self.config.min_capacity = min;
        self.config.max_capacity = max;
        self
    }

    /// Set interval bounds
    pub fn interval_ms(mut self, min: u64, max: u64) -> Self {
        self.config.min_interval_ms = min;
        self.config.max_interval_ms = max;
        self
    }

    /// Set TLS mode
    pub fn tls(mut self, mode: TlsMode) -> Self {
        self.config.tls = mode;
        self
    }

    /// Set an extra trust anchor
    pub fn trusted_root(mut self, path: &str) -> Self {
        self.config.trusted_root = Some(path.to_string());
        self
    }

    /// Build the config
    pub fn build(self) -> ClientPoolConfig {
        self.config
    }

    /// Build and start the pool
    pub fn start(self) -> Arc<Pool> {
        let pool = Pool::client(self.config).unwrap();
        pool.start();
        pool
    }
}

/// Poll `check` until it holds or `timeout` elapses
pub async fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

/// Run a future with a timeout, panicking on expiry
pub async fn with_timeout<F: Future>(timeout: Duration, fut: F) -> F::Output {
    tokio::time::timeout(timeout, fut)
        .await
        .expect("operation timed out")
}
