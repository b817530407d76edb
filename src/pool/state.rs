//! Pool state, acquisition and lifecycle
//!
//! A [`Pool`] is built in one of two fixed roles. Both roles publish idle
//! connections the same way: the ID goes into the availability queue and
//! the handle into the connection map, together, under the queue lock.

use super::controller::Controller;
use super::queue::IdQueue;
use super::stats::{PoolStats, PoolStatsSnapshot};
use super::{CLOSE_TIMEOUT, ID_RETRY_INTERVAL};
use crate::cert::SelfSignedCert;
use crate::config::{ClientPoolConfig, ServerPoolConfig};
use crate::error::{PoolError, Result};
use crate::transport::{ClientTls, Dialer, PooledConn, ServerTls, SocketOpts, TcpDialer};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::time::Instant;
use tokio_rustls::rustls::ServerConfig;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Pool of pre-established connections shared between two endpoints
pub struct Pool {
    /// Idle connections by ID
    pub(super) conns: DashMap<String, PooledConn>,
    /// IDs of idle connections
    pub(super) queue: IdQueue,
    /// Role-specific collaborators
    pub(super) role: Role,
    /// Socket options applied to every raw connection
    pub(super) socket_opts: SocketOpts,
    /// Statistics
    pub(super) stats: PoolStats,
    /// Advisory error counter, only touched by callers
    errors: AtomicUsize,
    /// Token of the current manager run
    token: Mutex<CancellationToken>,
}

pub(super) enum Role {
    Client(ClientRole),
    Server(ServerRole),
}

pub(super) struct ClientRole {
    pub(super) dialer: Arc<dyn Dialer>,
    pub(super) tls: ClientTls,
    pub(super) controller: Controller,
}

pub(super) struct ServerRole {
    pub(super) listener: TcpListener,
    pub(super) max_capacity: usize,
    pub(super) allowed_ip: Option<IpAddr>,
    pub(super) tls: Option<ServerTls>,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let role = match self.role {
            Role::Client(_) => "client",
            Role::Server(_) => "server",
        };
        f.debug_struct("Pool")
            .field("role", &role)
            .field("active", &self.active())
            .field("capacity", &self.capacity())
            .field("max_idle", &self.queue.capacity())
            .field("interval", &self.interval())
            .finish()
    }
}

impl Pool {
    fn with_role(queue_capacity: usize, socket_opts: SocketOpts, role: Role) -> Self {
        Pool {
            conns: DashMap::new(),
            queue: IdQueue::new(queue_capacity),
            role,
            socket_opts,
            stats: PoolStats::new(),
            errors: AtomicUsize::new(0),
            token: Mutex::new(CancellationToken::new()),
        }
    }

    /// Create a dialing pool that connects to `config.remote_addr` over TCP
    pub fn client(config: ClientPoolConfig) -> Result<Arc<Self>> {
        let config = config.normalized();
        let dialer =
            TcpDialer::new(&config.remote_addr).with_connect_timeout(config.connect_timeout());
        Self::client_with_dialer(config, Arc::new(dialer))
    }

    /// Create a dialing pool with a custom dialer
    ///
    /// `config.remote_addr` is not used; the dialer decides where to connect.
    pub fn client_with_dialer(
        config: ClientPoolConfig,
        dialer: Arc<dyn Dialer>,
    ) -> Result<Arc<Self>> {
        let config = config.normalized();
        let tls = ClientTls::from_mode(&config.tls, config.trusted_root.as_deref())?;
        let controller = Controller::new(
            config.min_capacity,
            config.max_capacity,
            config.min_interval(),
            config.max_interval(),
        );

        let role = Role::Client(ClientRole {
            dialer,
            tls,
            controller,
        });
        Ok(Arc::new(Self::with_role(
            config.max_capacity,
            SocketOpts::from_tcp_config(&config.tcp),
            role,
        )))
    }

    /// Create a listening pool on an already bound listener
    ///
    /// `tls` is applied to every accepted connection when present.
    pub fn server(
        config: ServerPoolConfig,
        listener: TcpListener,
        tls: Option<Arc<ServerConfig>>,
    ) -> Arc<Self> {
        let config = config.normalized();
        let role = Role::Server(ServerRole {
            listener,
            max_capacity: config.max_capacity,
            allowed_ip: config.client_ip,
            tls: tls.map(ServerTls::new),
        });
        Arc::new(Self::with_role(
            config.max_capacity,
            SocketOpts::from_tcp_config(&config.tcp),
            role,
        ))
    }

    /// Bind `config.bind_addr` and create a listening pool on it
    ///
    /// When `config.tls_name` is set, a fresh self-signed credential is
    /// generated under that name.
    pub async fn bind_server(config: ServerPoolConfig) -> Result<Arc<Self>> {
        let tls = match &config.tls_name {
            Some(name) => Some(SelfSignedCert::generate(name)?.server_config()?),
            None => None,
        };
        let listener = TcpListener::bind(&config.bind_addr).await?;
        Ok(Self::server(config, listener, tls))
    }

    fn lock_token(&self) -> MutexGuard<'_, CancellationToken> {
        self.token.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Token of the current run
    pub(super) fn token(&self) -> CancellationToken {
        self.lock_token().clone()
    }

    /// Cancel the current run and install a fresh token
    pub(super) fn renew_token(&self) -> CancellationToken {
        let mut slot = self.lock_token();
        slot.cancel();
        *slot = CancellationToken::new();
        slot.clone()
    }

    /// Publish an established connection as idle
    ///
    /// On any rejection the connection is dropped, which closes it. The
    /// token is checked under the queue lock, so nothing registers for a
    /// run once its close has drained the queue.
    pub(super) fn register(
        &self,
        id: &str,
        conn: PooledConn,
        token: &CancellationToken,
    ) -> Result<()> {
        self.queue.try_push_with(id, || {
            if token.is_cancelled() {
                return Err(PoolError::Canceled);
            }
            match self.conns.entry(id.to_string()) {
                Entry::Occupied(_) => Err(PoolError::IdCollision(id.to_string())),
                Entry::Vacant(slot) => {
                    slot.insert(conn);
                    Ok(())
                }
            }
        })?;
        self.stats.record_registered();
        Ok(())
    }

    /// Take the connection with a known ID
    ///
    /// Polls until the ID shows up, the timeout elapses, or the pool is
    /// closed. Fails with [`PoolError::NotFound`].
    pub async fn acquire_by_id(&self, id: &str, timeout: Duration) -> Result<PooledConn> {
        let token = self.token();
        let deadline = Instant::now() + timeout;

        loop {
            if let Some((_, conn)) = self.conns.remove(id) {
                self.queue.remove(id);
                self.stats.record_acquired();
                return Ok(conn);
            }

            tokio::select! {
                _ = tokio::time::sleep(ID_RETRY_INTERVAL) => {}
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(PoolError::NotFound(id.to_string()));
                }
                _ = token.cancelled() => {
                    return Err(PoolError::NotFound(id.to_string()));
                }
            }
        }
    }

    /// Take any idle connection along with its ID
    ///
    /// Waits until one is available, the timeout elapses, or the pool is
    /// closed. Fails with [`PoolError::Insufficient`].
    pub async fn acquire_any(&self, timeout: Duration) -> Result<(String, PooledConn)> {
        let token = self.token();
        let deadline = Instant::now() + timeout;

        loop {
            let id = self
                .queue
                .pop(deadline, &token)
                .await
                .ok_or(PoolError::Insufficient)?;

            if let Some(entry) = self.conns.remove(&id) {
                self.stats.record_acquired();
                return Ok(entry);
            }
            debug!("Queued connection {} already taken, waiting again", id);
        }
    }

    /// Close every idle connection and empty the pool
    ///
    /// A running manager keeps going and repopulates on its next iteration.
    pub async fn flush(&self) {
        let conns = self.queue.drain(|ids| {
            let mut conns: Vec<PooledConn> = ids
                .iter()
                .filter_map(|id| self.conns.remove(id).map(|(_, conn)| conn))
                .collect();

            let stray: Vec<String> = self.conns.iter().map(|e| e.key().clone()).collect();
            conns.extend(
                stray
                    .iter()
                    .filter_map(|id| self.conns.remove(id).map(|(_, conn)| conn)),
            );
            conns
        });

        let count = conns.len();
        join_all(conns.into_iter().map(close_conn)).await;
        self.stats.record_flushed(count);

        if count > 0 {
            debug!("Flushed {} idle connections", count);
        }
    }

    /// Stop the manager and flush
    pub async fn close(&self) {
        self.lock_token().cancel();
        self.flush().await;
    }

    /// Always true for a constructed pool
    pub fn ready(&self) -> bool {
        true
    }

    /// Whether this pool dials out
    pub fn is_client(&self) -> bool {
        matches!(self.role, Role::Client(_))
    }

    /// Number of idle connections
    pub fn active(&self) -> usize {
        self.queue.len()
    }

    /// Target capacity, or the idle maximum for a listening pool
    pub fn capacity(&self) -> usize {
        match &self.role {
            Role::Client(client) => client.controller.capacity(),
            Role::Server(server) => server.max_capacity,
        }
    }

    /// Creation interval, zero for a listening pool
    pub fn interval(&self) -> Duration {
        match &self.role {
            Role::Client(client) => client.controller.interval(),
            Role::Server(_) => Duration::ZERO,
        }
    }

    /// Local address of a listening pool
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.role {
            Role::Server(server) => server.listener.local_addr().ok(),
            Role::Client(_) => None,
        }
    }

    /// Record an externally observed fault
    pub fn add_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Current advisory error count
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    /// Clear the advisory error count
    pub fn reset_error(&self) {
        self.errors.store(0, Ordering::Relaxed);
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStatsSnapshot {
        self.stats.snapshot()
    }
}

async fn close_conn(mut conn: PooledConn) {
    let _ = tokio::time::timeout(CLOSE_TIMEOUT, conn.shutdown()).await;
}
