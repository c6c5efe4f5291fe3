use std::io;
use std::net::SocketAddr;
use std::time::Duration;

/// Errors raised by transports and their connections.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer is gone; nothing more can be sent.
    #[error("connection closed")]
    Closed,

    #[error("send failed: {0}")]
    SendFailed(#[source] io::Error),

    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] io::Error),

    /// Binding the listener or accepting a TCP stream failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] io::Error),

    /// A TCP stream arrived but the WebSocket upgrade did not complete.
    /// Only that peer is affected; the listener keeps running.
    #[error("handshake with {peer} failed: {reason}")]
    Handshake { peer: SocketAddr, reason: String },

    /// The peer opened a TCP stream and never finished the upgrade.
    #[error("handshake with {peer} timed out after {after:?}")]
    HandshakeTimeout { peer: SocketAddr, after: Duration },
}

impl TransportError {
    /// Whether the listener itself is still usable after this error.
    pub fn is_per_peer(&self) -> bool {
        matches!(self, Self::Handshake { .. } | Self::HandshakeTimeout { .. })
    }
}
