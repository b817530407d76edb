//! Connection ID exchange
//!
//! The listening side generates 4 random bytes and writes them unframed
//! right after any TLS handshake; the dialing side reads exactly 4 bytes.
//! Both sides key the connection by the lowercase hex form.

use crate::error::{PoolError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Raw ID width on the wire
pub const ID_LEN: usize = 4;

/// Raw connection ID
pub type RawId = [u8; ID_LEN];

/// Generate a random ID from the OS CSPRNG
pub fn generate() -> RawId {
    let mut raw = [0u8; ID_LEN];
    OsRng.fill_bytes(&mut raw);
    raw
}

/// Lowercase hex form used as the pool key
pub fn encode(raw: &RawId) -> String {
    hex::encode(raw)
}

/// Read exactly one ID within `timeout`
pub async fn read_id<S: AsyncRead + Unpin + ?Sized>(
    stream: &mut S,
    timeout: Duration,
) -> Result<RawId> {
    let mut raw = [0u8; ID_LEN];
    match tokio::time::timeout(timeout, stream.read_exact(&mut raw)).await {
        Ok(Ok(_)) => Ok(raw),
        Ok(Err(e)) => Err(PoolError::Protocol(format!("Failed to read connection ID: {}", e))),
        Err(_) => Err(PoolError::Protocol(format!(
            "Timed out reading connection ID after {:?}",
            timeout
        ))),
    }
}

/// Write one ID and flush it to the peer
pub async fn write_id<S: AsyncWrite + Unpin + ?Sized>(stream: &mut S, raw: &RawId) -> Result<()> {
    stream
        .write_all(raw)
        .await
        .map_err(|e| PoolError::Protocol(format!("Failed to send connection ID: {}", e)))?;
    stream
        .flush()
        .await
        .map_err(|e| PoolError::Protocol(format!("Failed to send connection ID: {}", e)))
}
