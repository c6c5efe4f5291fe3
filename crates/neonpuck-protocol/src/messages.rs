//! Message payloads exchanged between the server and browser clients.
//!
//! Messages are internally tagged with a kebab-case `type` field:
//!
//! ```text
//! { "type": "room-joined", "code": "KQZT", "side": 2 }
//! ```

use neonpuck_physics::{GameState, Side};
use serde::{Deserialize, Serialize};

use crate::types::{Channel, Delivery, RoomCode};

/// Countdown value meaning "go": the last number shown to players.
pub const COUNTDOWN_GO: i8 = 0;

/// Countdown value sent when play actually resumes, after the "go" frame.
pub const COUNTDOWN_RESUME: i8 = -1;

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PuckSnapshot {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaddleSnapshot {
    pub x: f64,
    pub y: f64,
}

/// The authoritative court state, broadcast once per tick while playing.
///
/// Paddles are indexed by side: `paddles[0]` is side 1 (left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub puck: PuckSnapshot,
    pub paddles: [PaddleSnapshot; 2],
    pub scores: [u32; 2],
}

impl From<&GameState> for Snapshot {
    fn from(state: &GameState) -> Self {
        let puck = state.puck;
        Self {
            puck: PuckSnapshot {
                x: puck.x,
                y: puck.y,
                vx: puck.vx,
                vy: puck.vy,
            },
            paddles: state.paddles.map(|p| PaddleSnapshot { x: p.x, y: p.y }),
            scores: state.scores,
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Everything the server sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Sent to the creator only. The creator always plays side 1.
    RoomCreated { code: RoomCode },

    /// Sent to a participant who joined an existing room.
    RoomJoined { code: RoomCode, side: Side },

    /// The join or create request was refused; nothing changed.
    JoinError { reason: String },

    OpponentJoined,
    OpponentLeft,

    StateSnapshot(Snapshot),

    Goal { scorer: Side, scores: [u32; 2] },

    GameOver { winner: Side, scores: [u32; 2] },

    /// 3, 2, 1, then [`COUNTDOWN_GO`], then [`COUNTDOWN_RESUME`] when the
    /// puck is live.
    CountdownStep { value: i8 },

    RematchStart,
}

impl Delivery for ServerMessage {
    fn channel(&self) -> Channel {
        match self {
            Self::StateSnapshot(_) => Channel::Unreliable,
            Self::RoomCreated { .. }
            | Self::RoomJoined { .. }
            | Self::JoinError { .. }
            | Self::OpponentJoined
            | Self::OpponentLeft
            | Self::Goal { .. }
            | Self::GameOver { .. }
            | Self::CountdownStep { .. }
            | Self::RematchStart => Channel::ReliableOrdered,
        }
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Everything a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    CreateRoom,

    /// `code` is raw user input; the server normalizes and validates it.
    JoinRoom { code: String },

    /// Desired paddle center in court coordinates. Out-of-range values are
    /// clamped by the server, not rejected.
    PaddleUpdate { x: f64, y: f64 },

    /// Vote for a rematch once the match is over.
    Rematch,

    LeaveRoom,
}

impl Delivery for ClientMessage {
    fn channel(&self) -> Channel {
        match self {
            Self::PaddleUpdate { .. } => Channel::Unreliable,
            Self::CreateRoom | Self::JoinRoom { .. } | Self::Rematch | Self::LeaveRoom => {
                Channel::ReliableOrdered
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to_value<T: Serialize>(value: &T) -> serde_json::Value {
        serde_json::to_value(value).unwrap()
    }

    #[test]
    fn test_room_joined_uses_side_number() {
        let msg = ServerMessage::RoomJoined {
            code: RoomCode::parse("ABCD").unwrap(),
            side: Side::Right,
        };
        assert_eq!(
            to_value(&msg),
            json!({ "type": "room-joined", "code": "ABCD", "side": 2 })
        );
    }

    #[test]
    fn test_unit_variants_carry_only_type() {
        assert_eq!(
            to_value(&ServerMessage::OpponentJoined),
            json!({ "type": "opponent-joined" })
        );
        assert_eq!(
            to_value(&ServerMessage::RematchStart),
            json!({ "type": "rematch-start" })
        );
    }

    #[test]
    fn test_state_snapshot_shape() {
        let mut state = GameState::new();
        state.scores = [3, 1];
        let msg = ServerMessage::StateSnapshot(Snapshot::from(&state));
        assert_eq!(
            to_value(&msg),
            json!({
                "type": "state-snapshot",
                "puck": { "x": 400.0, "y": 200.0, "vx": 0.0, "vy": 0.0 },
                "paddles": [{ "x": 100.0, "y": 200.0 }, { "x": 700.0, "y": 200.0 }],
                "scores": [3, 1],
            })
        );
    }

    #[test]
    fn test_goal_and_game_over_use_side_numbers() {
        assert_eq!(
            to_value(&ServerMessage::Goal { scorer: Side::Left, scores: [1, 0] }),
            json!({ "type": "goal", "scorer": 1, "scores": [1, 0] })
        );
        assert_eq!(
            to_value(&ServerMessage::GameOver { winner: Side::Right, scores: [4, 7] }),
            json!({ "type": "game-over", "winner": 2, "scores": [4, 7] })
        );
    }

    #[test]
    fn test_countdown_resume_is_negative_one() {
        assert_eq!(
            to_value(&ServerMessage::CountdownStep { value: COUNTDOWN_RESUME }),
            json!({ "type": "countdown-step", "value": -1 })
        );
    }

    #[test]
    fn test_client_join_room_keeps_raw_code() {
        let msg: ClientMessage =
            serde_json::from_value(json!({ "type": "join-room", "code": " kqzt" })).unwrap();
        assert_eq!(msg, ClientMessage::JoinRoom { code: " kqzt".into() });
    }

    #[test]
    fn test_client_unknown_type_is_rejected() {
        let result = serde_json::from_value::<ClientMessage>(json!({ "type": "cheat" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_only_positions_are_unreliable() {
        let snapshot = ServerMessage::StateSnapshot(Snapshot::from(&GameState::new()));
        assert_eq!(snapshot.channel(), Channel::Unreliable);
        assert_eq!(
            ClientMessage::PaddleUpdate { x: 0.0, y: 0.0 }.channel(),
            Channel::Unreliable
        );
        assert_eq!(ServerMessage::OpponentLeft.channel(), Channel::ReliableOrdered);
        assert_eq!(
            ServerMessage::CountdownStep { value: 3 }.channel(),
            Channel::ReliableOrdered
        );
        assert_eq!(ClientMessage::Rematch.channel(), Channel::ReliableOrdered);
    }
}
