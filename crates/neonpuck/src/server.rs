//! `NeonPuckServer` builder and accept loop.
//!
//! Ties the layers together: WebSocket transport, JSON envelopes, and the
//! room registry.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use neonpuck_protocol::{Codec, JsonCodec};
use neonpuck_room::{MatchConfig, RoomRegistry};
use neonpuck_transport::{Incoming, Transport, WebSocketTransport};
use tokio::time::Instant;

use crate::handler::handle_connection;
use crate::NeonPuckError;

/// How long a peer gets to finish the WebSocket upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared by every connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: RoomRegistry,
    pub(crate) codec: C,
    started: Instant,
}

impl<C: Codec> ServerState<C> {
    /// Milliseconds since the server started; stamped on outgoing frames.
    pub(crate) fn uptime_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Builder for configuring and starting a server.
///
/// ```rust,no_run
/// # async fn start() -> Result<(), neonpuck::NeonPuckError> {
/// use neonpuck::prelude::*;
///
/// let server = NeonPuckServer::builder()
///     .bind("0.0.0.0:3000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct NeonPuckServerBuilder {
    bind_addr: String,
    match_config: MatchConfig,
    handshake_timeout: Duration,
}

impl NeonPuckServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            match_config: MatchConfig::default(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Sets the address to bind. Port 0 picks a free port; read it back
    /// with [`NeonPuckServer::local_addr`].
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Sets the timing every room on this server uses.
    pub fn match_config(mut self, config: MatchConfig) -> Self {
        self.match_config = config;
        self
    }

    /// Sets how long a peer may take to finish its WebSocket upgrade
    /// before it is dropped.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Binds the listener. Connections are not accepted until
    /// [`run`](NeonPuckServer::run).
    pub async fn build(self) -> Result<NeonPuckServer, NeonPuckError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let state = Arc::new(ServerState {
            registry: RoomRegistry::new(self.match_config),
            codec: JsonCodec,
            started: Instant::now(),
        });
        Ok(NeonPuckServer {
            transport,
            state,
            handshake_timeout: self.handshake_timeout,
        })
    }
}

impl Default for NeonPuckServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound server. Call [`run`](Self::run) to start accepting
/// connections.
pub struct NeonPuckServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    handshake_timeout: Duration,
}

impl NeonPuckServer {
    pub fn builder() -> NeonPuckServerBuilder {
        NeonPuckServerBuilder::new()
    }
}

impl<C: Codec> NeonPuckServer<C> {
    pub fn local_addr(&self) -> Result<SocketAddr, NeonPuckError> {
        Ok(self.transport.local_addr()?)
    }

    /// The server's rooms. Cloning shares the same registry.
    pub fn registry(&self) -> RoomRegistry {
        self.state.registry.clone()
    }

    /// Accepts connections until the process ends.
    pub async fn run(self) -> Result<(), NeonPuckError> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` completes, then destroys
    /// every room.
    ///
    /// Accept failures are logged and the loop keeps going; one bad peer
    /// never stops the server. Each peer's handshake runs on its own task,
    /// so a peer that never completes it only costs that task.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), NeonPuckError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "neon puck server running");
        tokio::pin!(shutdown);

        loop {
            let accepted = tokio::select! {
                accepted = self.transport.accept() => accepted,
                () = &mut shutdown => break,
            };
            match accepted {
                Ok(incoming) => {
                    let state = Arc::clone(&self.state);
                    let timeout = self.handshake_timeout;
                    tokio::spawn(async move {
                        let peer = incoming.peer_addr();
                        let conn = match incoming.establish(timeout).await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::warn!(%peer, error = %e, "rejected connection");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) if e.is_per_peer() => {
                    tracing::warn!(error = %e, "rejected connection");
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }

        let codes = self.state.registry.codes().await;
        tracing::info!(rooms = codes.len(), "shutting down");
        for code in codes {
            self.state.registry.destroy_room(code).await;
        }
        Ok(())
    }
}
