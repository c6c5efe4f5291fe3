//! Transport layer for Neon Puck.
//!
//! [`Transport`] accepts peers; [`Connection`] moves opaque frames to and
//! from one peer. Nothing here knows about envelopes or rooms.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{IncomingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Opaque identifier for a connection, unique per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts incoming peers.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Incoming: Incoming<Connection = Self::Connection, Error = Self::Error>;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next peer. Only the raw accept happens here, so a
    /// peer that stalls its handshake cannot hold up the accept loop.
    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error>;

    /// The address actually bound, useful after binding port 0.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// A peer that has connected but not finished its handshake.
pub trait Incoming: Send + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    fn peer_addr(&self) -> SocketAddr;

    /// Completes the handshake, giving up after `timeout`.
    async fn establish(self, timeout: Duration) -> Result<Self::Connection, Self::Error>;
}

/// One peer. Sending and receiving may run concurrently from different
/// tasks: a connection is typically shared behind an `Arc` between a
/// reader loop and a writer task.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Sends a frame that must arrive, in order.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Sends a frame that may be dropped.
    ///
    /// The default is a reliable send. Implementations that can shed load
    /// should drop the frame instead of queueing behind earlier writes; a
    /// dropped frame is not an error.
    async fn send_unreliable(&self, data: &[u8]) -> Result<(), Self::Error> {
        self.send(data).await
    }

    /// Receives the next frame. `Ok(None)` means the peer closed cleanly.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
        assert_eq!(ConnectionId::new(7).into_inner(), 7);
    }

    #[test]
    fn test_transport_error_only_handshake_is_per_peer() {
        let peer: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let handshake = TransportError::Handshake {
            peer,
            reason: "not a websocket".into(),
        };
        assert!(handshake.is_per_peer());
        let stalled = TransportError::HandshakeTimeout {
            peer,
            after: Duration::from_secs(5),
        };
        assert!(stalled.is_per_peer());
        assert_eq!(stalled.to_string(), "handshake with 127.0.0.1:9 timed out after 5s");
        assert!(!TransportError::Closed.is_per_peer());
    }
}
