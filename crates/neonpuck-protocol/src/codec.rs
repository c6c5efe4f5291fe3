//! Codec trait and implementations for turning envelopes into frames.
//!
//! The handler only talks to the [`Codec`] trait, so the wire format can
//! change without touching room or connection code. [`JsonCodec`] is the
//! format browsers speak today.
//!
//! A codec sees whole envelopes, never bare messages: `seq`, `timestamp`
//! and `channel` are part of every frame. Framing itself (where one frame
//! ends and the next begins) belongs to the transport; a codec is handed
//! exactly one frame's bytes.
//!
//! Codecs are stateless. Nothing about one frame may depend on an earlier
//! one, because unreliable frames can be dropped in between.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
///
/// The methods are generic over the value so one codec serves both
/// directions: the server encodes `Envelope<ServerMessage>` and decodes
/// `Envelope<ClientMessage>`.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes a frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` for malformed or mistyped input.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`. Output is UTF-8, so transports can
/// ship it as WebSocket text frames.
///
/// ```rust
/// use neonpuck_protocol::{Codec, Envelope, JsonCodec, ServerMessage};
///
/// let codec = JsonCodec;
/// let envelope = Envelope::wrap(1, 250, ServerMessage::CountdownStep { value: 3 });
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope<ServerMessage> = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
///
/// Message types are tagged with a `type` field in kebab-case (see
/// `messages.rs`), which is what the browser client switches on.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    // Unknown fields are ignored, so clients may send extra data.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
