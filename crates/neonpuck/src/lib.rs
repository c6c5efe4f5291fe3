//! # Neon Puck
//!
//! Server-authoritative two-player air hockey over WebSocket.
//!
//! Clients create a room and share its four-letter code; the opponent
//! joins with it. Each room runs its own 60 Hz simulation and streams
//! snapshots to both players.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use neonpuck::prelude::*;
//!
//! # async fn start() -> Result<(), NeonPuckError> {
//! let config = ServerConfig::from_env()?;
//! let server = NeonPuckServer::builder()
//!     .bind(config.bind_addr.to_string())
//!     .match_config(config.match_config)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::NeonPuckError;
pub use server::{NeonPuckServer, NeonPuckServerBuilder, DEFAULT_HANDSHAKE_TIMEOUT};

pub mod prelude {
    pub use crate::{ConfigError, NeonPuckError, NeonPuckServer, NeonPuckServerBuilder, ServerConfig};
    pub use neonpuck_protocol::{
        Channel, ClientMessage, Envelope, ParticipantId, RoomCode, ServerMessage, Side, Snapshot,
    };
    pub use neonpuck_room::{MatchConfig, MatchPhase, RoomError, RoomRegistry};
}
