//! # Linkpool - Pre-established Tunnel Connection Pool
//!
//! Linkpool keeps a set of idle connections open between two endpoints of a
//! tunnel so forwarded traffic never waits for a TCP or TLS handshake.
//!
//! ## Roles
//!
//! - **Client pool**: dials the remote endpoint in the background, reads the
//!   connection ID the listener assigns, and keeps the connection idle until
//!   a caller asks for that ID. Capacity and dial pacing adapt to demand.
//! - **Server pool**: accepts connections, optionally restricts the peer IP
//!   and wraps in TLS, assigns each a random ID and writes it to the peer.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use linkpool::config::{ClientPoolConfig, ServerPoolConfig};
//! use linkpool::Pool;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> linkpool::Result<()> {
//!     let server = Pool::bind_server(ServerPoolConfig::new("127.0.0.1:10101")).await?;
//!     server.start();
//!
//!     let client = Pool::client(ClientPoolConfig::new("127.0.0.1:10101"))?;
//!     client.start();
//!
//!     // The server side picks a connection and tells its peer the ID
//!     let (id, _server_conn) = server.acquire_any(Duration::from_secs(5)).await?;
//!     let _client_conn = client.acquire_by_id(&id, Duration::from_secs(5)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Wire format
//!
//! ```text
//! Client --TCP--> Server
//!        [TLS handshake, optional]
//!        <-- 4 raw ID bytes --
//!        ... idle until acquired, then application bytes ...
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cert;
pub mod config;
pub mod error;
pub mod pool;
pub mod transport;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use error::{PoolError, Result};
pub use pool::{Pool, PoolStatsSnapshot};
pub use transport::{Dialer, PooledConn, TcpDialer};

/// Version of the Linkpool library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
