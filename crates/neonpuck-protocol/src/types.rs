//! Identity, channel, and envelope types shared by every message.
//!
//! Everything in this module travels on the wire, so serde attributes here
//! define the JSON shapes clients see.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifies one connected participant for the lifetime of its connection.
///
/// Rooms key slots and rematch votes by this id, so a participant who votes
/// twice still counts once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A four-letter room code such as `KQZT`.
///
/// Codes use [`RoomCode::ALPHABET`], which leaves out `I`, `L`, and `O`
/// because they are easy to confuse with `1` and `0` when read aloud or
/// typed on a phone. Serialized as a plain string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode([u8; RoomCode::LEN]);

impl RoomCode {
    /// Characters a code may contain.
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ";

    /// Number of characters in a code.
    pub const LEN: usize = 4;

    /// Builds a code from alphabet positions. Indices wrap around the
    /// alphabet, so any `usize` produces a valid code.
    pub fn from_indices(indices: [usize; Self::LEN]) -> Self {
        Self(indices.map(|i| Self::ALPHABET[i % Self::ALPHABET.len()]))
    }

    /// Parses user input: surrounding whitespace is trimmed and letters are
    /// upper-cased before validation.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidRoomCode`] unless the result is exactly
    /// [`LEN`](Self::LEN) characters from [`ALPHABET`](Self::ALPHABET).
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let normalized = input.trim().to_ascii_uppercase();
        let bytes = normalized.as_bytes();
        if bytes.len() != Self::LEN || !bytes.iter().all(|b| Self::ALPHABET.contains(b)) {
            return Err(ProtocolError::InvalidRoomCode(input.to_string()));
        }
        let mut code = [0u8; Self::LEN];
        code.copy_from_slice(bytes);
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        // Only ALPHABET bytes are ever stored, all of them ASCII.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> String {
        code.as_str().to_string()
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Channel: delivery guarantees
// ---------------------------------------------------------------------------

/// How a message must be delivered.
///
/// Every message type declares its channel through [`Delivery`]; nothing
/// picks a channel ad hoc at the send site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum Channel {
    /// Must arrive, in order. Lifecycle events: joins, countdown, goals.
    #[default]
    ReliableOrdered,

    /// May be dropped or arrive late; the next one supersedes it.
    /// Snapshots and paddle positions.
    Unreliable,
}

impl Channel {
    pub fn is_reliable(self) -> bool {
        matches!(self, Self::ReliableOrdered)
    }
}

/// Implemented by every message type to state its delivery class.
pub trait Delivery {
    fn channel(&self) -> Channel;
}

// ---------------------------------------------------------------------------
// Envelope: the top-level wire format
// ---------------------------------------------------------------------------

/// Every frame on the wire is an envelope around one message.
///
/// ```text
/// { "seq": 42, "timestamp": 15000, "channel": "Unreliable",
///   "payload": { "type": "state-snapshot", ... } }
/// ```
///
/// `seq` is per connection and per direction. The server uses the client's
/// `seq` to discard paddle updates that arrive after a newer one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<M> {
    /// Sender's frame counter, starting at 1. A gap on the receiving side
    /// means unreliable frames were dropped.
    pub seq: u64,

    /// Milliseconds since the sender started.
    pub timestamp: u64,

    /// Defaults to `ReliableOrdered` when absent.
    #[serde(default)]
    pub channel: Channel,

    pub payload: M,
}

impl<M: Delivery> Envelope<M> {
    /// Wraps a message, taking the channel from the message type.
    ///
    /// The `channel` field is informational for the receiver; the sender
    /// already chose how to transmit the frame.
    pub fn wrap(seq: u64, timestamp: u64, payload: M) -> Self {
        Self {
            seq,
            timestamp,
            channel: payload.channel(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_id_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&ParticipantId(42)).unwrap(), "42");
        assert_eq!(ParticipantId(7).to_string(), "P-7");
    }

    #[test]
    fn test_room_code_parse_normalizes_case_and_whitespace() {
        let code = RoomCode::parse("  kqzt ").unwrap();
        assert_eq!(code.as_str(), "KQZT");
    }

    #[test]
    fn test_room_code_rejects_ambiguous_letters() {
        for bad in ["ABCI", "LOVE", "ABC0"] {
            assert!(
                matches!(RoomCode::parse(bad), Err(ProtocolError::InvalidRoomCode(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_room_code_rejects_wrong_length() {
        assert!(RoomCode::parse("ABC").is_err());
        assert!(RoomCode::parse("ABCDE").is_err());
        assert!(RoomCode::parse("").is_err());
    }

    #[test]
    fn test_room_code_from_indices_wraps() {
        let code = RoomCode::from_indices([0, 1, 23, 47]);
        assert_eq!(code.as_str(), "ABAB");
    }

    #[test]
    fn test_room_code_json_is_a_string() {
        let code = RoomCode::parse("WXYZ").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"WXYZ\"");
        let back: RoomCode = serde_json::from_str("\"wxyz\"").unwrap();
        assert_eq!(back, code);
        assert!(serde_json::from_str::<RoomCode>("\"IIII\"").is_err());
    }

    #[test]
    fn test_channel_default_is_reliable() {
        assert_eq!(Channel::default(), Channel::ReliableOrdered);
        assert!(Channel::ReliableOrdered.is_reliable());
        assert!(!Channel::Unreliable.is_reliable());
    }

    #[test]
    fn test_envelope_channel_defaults_when_missing() {
        let json = r#"{ "seq": 1, "timestamp": 100, "payload": 5 }"#;
        let envelope: Envelope<u32> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.channel, Channel::ReliableOrdered);
    }
}
