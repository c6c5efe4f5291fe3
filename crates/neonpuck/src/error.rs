//! Unified error type for the Neon Puck server.
//!
//! Only failures that end the process or a connection surface here. A
//! frame that fails to decode is logged and skipped, and a refused room
//! request becomes a `join-error` for that client, so neither has a
//! variant.

use neonpuck_transport::TransportError;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum NeonPuckError {
    /// Socket-level failure (bind, accept, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: NeonPuckError = TransportError::Closed.into();
        assert!(matches!(err, NeonPuckError::Transport(_)));
        assert_eq!(err.to_string(), "connection closed");
    }

    #[test]
    fn test_from_config_error() {
        let err: NeonPuckError = ConfigError::InvalidAddress("nowhere".into()).into();
        assert!(matches!(err, NeonPuckError::Config(_)));
        assert!(err.to_string().contains("nowhere"));
    }
}
