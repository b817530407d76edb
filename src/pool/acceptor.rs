//! Inbound connection admission for listening pools

use super::state::{Pool, Role, ServerRole};
use super::id;
use crate::error::{PoolError, Result};
use crate::transport::PooledConn;
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

impl Pool {
    /// Admit one accepted connection, or close it
    pub(super) async fn handle_inbound(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        token: &CancellationToken,
    ) {
        let Role::Server(server) = &self.role else {
            return;
        };

        let result = tokio::select! {
            result = self.accept_inbound(server, stream, peer, token) => result,
            _ = token.cancelled() => Err(PoolError::Canceled),
        };

        match result {
            Ok(id) => trace!("Registered inbound connection {} from {}", id, peer),
            Err(e) => {
                self.stats.record_rejected();
                debug!("Rejected inbound connection from {}: {}", peer, e);
            }
        }
    }

    async fn accept_inbound(
        &self,
        server: &ServerRole,
        stream: TcpStream,
        peer: SocketAddr,
        token: &CancellationToken,
    ) -> Result<String> {
        if self.active() >= server.max_capacity {
            return Err(PoolError::PoolFull);
        }
        self.socket_opts.hint(&stream);

        if let Some(allowed) = server.allowed_ip {
            let ip = peer.ip().to_canonical();
            if ip != allowed.to_canonical() {
                return Err(PoolError::Auth(ip));
            }
        }

        let conn: PooledConn = match &server.tls {
            Some(tls) => tls.accept(stream).await.map_err(PoolError::Handshake)?,
            None => Box::new(stream),
        };

        self.offer_inbound(conn, token).await
    }

    /// Assign a fresh ID to `conn`, send it, and register the connection
    pub(super) async fn offer_inbound(
        &self,
        conn: PooledConn,
        token: &CancellationToken,
    ) -> Result<String> {
        self.offer_inbound_with(id::generate(), conn, token).await
    }

    async fn offer_inbound_with(
        &self,
        raw: id::RawId,
        mut conn: PooledConn,
        token: &CancellationToken,
    ) -> Result<String> {
        let id = id::encode(&raw);
        if self.conns.contains_key(&id) {
            return Err(PoolError::IdCollision(id));
        }

        id::write_id(&mut conn, &raw).await?;
        self.register(&id, conn, token)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ServerPoolConfig;
    use crate::error::PoolError;
    use crate::pool::Pool;
    use std::io;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::io::{duplex, AsyncRead, AsyncReadExt, AsyncWrite, ReadBuf};
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    /// Stream whose writes always fail, flagging when it is dropped
    #[derive(Debug)]
    struct BrokenStream {
        dropped: Arc<AtomicBool>,
    }

    impl AsyncRead for BrokenStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for BrokenStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    impl Drop for BrokenStream {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    async fn server_pool(max_capacity: usize) -> Arc<Pool> {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerPoolConfig {
            max_capacity,
            ..ServerPoolConfig::new("127.0.0.1:0")
        };
        Pool::server(config, listener, None)
    }

    #[tokio::test]
    async fn test_offer_sends_id_and_registers() {
        let pool = server_pool(2).await;
        let (local, mut peer) = duplex(64);

        let id = pool
            .offer_inbound(Box::new(local), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(id.len(), 8);
        assert!(pool.conns.contains_key(&id));
        assert_eq!(pool.active(), 1);

        let mut raw = [0u8; 4];
        peer.read_exact(&mut raw).await.unwrap();
        assert_eq!(crate::pool::id::encode(&raw), id);
    }

    #[tokio::test]
    async fn test_offer_write_failure_leaves_nothing_behind() {
        let pool = server_pool(2).await;
        let dropped = Arc::new(AtomicBool::new(false));
        let conn = BrokenStream {
            dropped: dropped.clone(),
        };

        let err = pool
            .offer_inbound(Box::new(conn), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::Protocol(_)));
        assert!(pool.conns.is_empty());
        assert_eq!(pool.active(), 0);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_offer_when_full_closes_connection() {
        let pool = server_pool(1).await;
        let (first, _first_peer) = duplex(64);
        pool.offer_inbound(Box::new(first), &CancellationToken::new())
            .await
            .unwrap();

        let (second, mut second_peer) = duplex(64);
        let err = pool
            .offer_inbound(Box::new(second), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::PoolFull));
        assert_eq!(pool.active(), 1);

        // The ID went out before the queue check; the stream then hits EOF
        let mut buf = Vec::new();
        tokio::time::timeout(Duration::from_secs(1), second_peer.read_to_end(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(buf.len(), 4);
    }

    #[tokio::test]
    async fn test_offer_id_collision_drops_connection() {
        let pool = server_pool(4).await;
        let raw = [0x01, 0x02, 0x03, 0x04];
        let (first, _first_peer) = duplex(64);
        let id = pool
            .offer_inbound_with(raw, Box::new(first), &CancellationToken::new())
            .await
            .unwrap();

        let (second, mut second_peer) = duplex(64);
        let err = pool
            .offer_inbound_with(raw, Box::new(second), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::IdCollision(ref dup) if *dup == id));
        assert_eq!(pool.active(), 1);
        assert_eq!(pool.conns.len(), 1);

        // Nothing was sent before the connection was dropped
        let mut buf = Vec::new();
        tokio::time::timeout(Duration::from_secs(1), second_peer.read_to_end(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert!(buf.is_empty());

        let conn = pool.acquire_by_id(&id, Duration::from_secs(1)).await;
        assert!(conn.is_ok());
        assert_eq!(pool.active(), 0);
    }
}
