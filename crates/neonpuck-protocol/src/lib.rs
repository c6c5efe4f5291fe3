//! Wire protocol for Neon Puck.
//!
//! - **Types** ([`Envelope`], [`Channel`], [`RoomCode`], ...): identity and
//!   framing shared by every message.
//! - **Messages** ([`ServerMessage`], [`ClientMessage`]): the payloads,
//!   each declaring its own delivery class through [`Delivery`].
//! - **Codec** ([`Codec`], [`JsonCodec`]): bytes in, envelopes out.
//!
//! The protocol knows nothing about sockets or rooms:
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope<ClientMessage>) → Room (MatchInput)
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{
    ClientMessage, PaddleSnapshot, PuckSnapshot, ServerMessage, Snapshot, COUNTDOWN_GO,
    COUNTDOWN_RESUME,
};
pub use types::{Channel, Delivery, Envelope, ParticipantId, RoomCode};

/// Re-exported so downstream crates name sides through one path.
pub use neonpuck_physics::Side;
