//! Pool manager loops
//!
//! A dialing pool keeps its idle count near the controller's target by
//! spawning producers each iteration. A listening pool accepts and admits
//! connections until its token is canceled.

use super::state::{ClientRole, Pool, Role, ServerRole};
use super::ACCEPT_RETRY_INTERVAL;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

impl Pool {
    /// Start the manager in the background
    ///
    /// Any previous run is canceled first. The returned handle completes
    /// once the run stops.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let token = self.renew_token();
        let pool = self.clone();
        tokio::spawn(async move { pool.manage(token).await })
    }

    /// Run the manager on the current task until [`Pool::close`]
    pub async fn run(self: &Arc<Self>) {
        let token = self.renew_token();
        self.manage(token).await
    }

    async fn manage(self: &Arc<Self>, token: CancellationToken) {
        match &self.role {
            Role::Client(client) => self.client_loop(client, token).await,
            Role::Server(server) => self.server_loop(server, token).await,
        }
    }

    async fn client_loop(self: &Arc<Self>, client: &ClientRole, token: CancellationToken) {
        info!(
            "Client pool manager started (capacity {}..{})",
            client.controller.min_capacity(),
            client.controller.max_capacity()
        );

        while !token.is_cancelled() {
            client.controller.adjust_interval(self.active());

            let need = client.controller.capacity().saturating_sub(self.active());
            let mut created = 0;
            if need > 0 {
                let tasks: Vec<_> = (0..need)
                    .map(|_| {
                        let pool = self.clone();
                        let token = token.clone();
                        tokio::spawn(async move { pool.create_connection(&token).await })
                    })
                    .collect();

                for task in tasks {
                    if matches!(task.await, Ok(true)) {
                        created += 1;
                    }
                }
            }

            // Producers cut short by cancellation say nothing about the peer
            if token.is_cancelled() {
                break;
            }

            client.controller.adjust_capacity(created);
            self.log_health(created);

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(client.controller.interval()) => {}
            }
        }

        info!("Client pool manager stopped");
    }

    async fn server_loop(self: &Arc<Self>, server: &ServerRole, token: CancellationToken) {
        match server.listener.local_addr() {
            Ok(addr) => info!("Server pool manager listening on {}", addr),
            Err(_) => info!("Server pool manager started"),
        }

        loop {
            let accepted = tokio::select! {
                accepted = server.listener.accept() => accepted,
                _ = token.cancelled() => break,
            };

            match accepted {
                Ok((stream, peer)) => {
                    let pool = self.clone();
                    let token = token.clone();
                    tokio::spawn(async move { pool.handle_inbound(stream, peer, &token).await });
                }
                Err(e) => {
                    if token.is_cancelled() {
                        break;
                    }
                    warn!("Failed to accept pool connection: {}", e);
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(ACCEPT_RETRY_INTERVAL) => {}
                    }
                }
            }
        }

        info!("Server pool manager stopped");
    }

    fn log_health(&self, created: usize) {
        let stats = self.stats.snapshot();
        debug!(
            "Pool health: idle={}, capacity={}, interval={:?}, created={}, registered={}, rejected={}, acquired={}",
            self.active(),
            self.capacity(),
            self.interval(),
            created,
            stats.total_registered,
            stats.total_rejected,
            stats.total_acquired
        );
    }
}
