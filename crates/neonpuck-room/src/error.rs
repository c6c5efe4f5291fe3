//! Error types for the room layer.

use neonpuck_protocol::{ParticipantId, ProtocolError, RoomCode};

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// Both slots are occupied.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    #[error("{0} is not in room {1}")]
    NotInRoom(ParticipantId, RoomCode),

    #[error("{0} is already in room {1}")]
    AlreadyInRoom(ParticipantId, RoomCode),

    /// The room's actor has stopped or its command channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    /// Every attempt to draw an unused code collided.
    #[error("no free room code")]
    NoFreeCode,

    #[error(transparent)]
    InvalidCode(#[from] ProtocolError),
}

impl RoomError {
    /// Text for a `join-error` message.
    pub fn reason(&self) -> &'static str {
        match self {
            // A room that stopped mid-request looks gone to the client.
            Self::NotFound(_) | Self::Unavailable(_) => "Room not found",
            Self::RoomFull(_) => "Room is full",
            Self::InvalidCode(_) => "Invalid room code",
            Self::AlreadyInRoom(..) => "Already in this room",
            Self::NotInRoom(..) => "Not in a room",
            Self::NoFreeCode => "No rooms available, try again",
        }
    }
}
