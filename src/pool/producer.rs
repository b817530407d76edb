//! Outbound connection establishment for dialing pools

use super::state::{ClientRole, Pool, Role};
use super::id;
use super::ID_READ_TIMEOUT;
use crate::error::{PoolError, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

impl Pool {
    /// Establish and register one outbound connection
    ///
    /// Returns whether a connection was registered. Any failure closes the
    /// partial connection and only shows up in the return value.
    pub(super) async fn create_connection(&self, token: &CancellationToken) -> bool {
        let Role::Client(client) = &self.role else {
            return false;
        };

        let result = tokio::select! {
            result = self.establish_outbound(client, token) => result,
            _ = token.cancelled() => Err(PoolError::Canceled),
        };

        match result {
            Ok(id) => {
                trace!("Registered outbound connection {}", id);
                true
            }
            Err(e) => {
                self.stats.record_rejected();
                debug!("Outbound connection attempt failed: {}", e);
                false
            }
        }
    }

    async fn establish_outbound(
        &self,
        client: &ClientRole,
        token: &CancellationToken,
    ) -> Result<String> {
        let stream = client.dialer.dial().await.map_err(PoolError::Dial)?;
        self.socket_opts.hint(&stream);

        let mut conn = client.tls.wrap(stream).await.map_err(PoolError::Handshake)?;

        let raw = id::read_id(&mut conn, ID_READ_TIMEOUT).await?;
        let id = id::encode(&raw);
        self.register(&id, conn, token)?;
        Ok(id)
    }
}
