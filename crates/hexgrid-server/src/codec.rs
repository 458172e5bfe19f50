//! Frame encoding.
//!
//! The hub only depends on the [`Codec`] contract: envelope to bytes and
//! back. [`JsonCodec`] and [`MsgPackCodec`] implement it, and
//! [`WireCodec`] picks one of them from configuration.
//!
//! `MessagePack` envelopes are encoded as maps with named fields, which is
//! the shape JavaScript `msgpackr` clients send and expect.

use std::fmt;
use std::str::FromStr;

use axum::body::Bytes;
use hexgrid_types::Envelope;
use serde::Deserialize;

/// Errors raised by a [`Codec`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame is not a valid envelope.
    #[error("decode error: {0}")]
    Decode(String),

    /// The envelope could not be serialized.
    #[error("encode error: {0}")]
    Encode(String),
}

/// Converts envelopes to wire frames and back.
///
/// `decode(encode(m))` must equal `m` for every envelope `m`.
pub trait Codec: Send + Sync + 'static {
    /// Serialize an envelope into one frame.
    fn encode(&self, envelope: &Envelope) -> Result<Bytes, CodecError>;

    /// Parse one frame. Malformed input is an error, never a panic.
    fn decode(&self, frame: &[u8]) -> Result<Envelope, CodecError>;
}

/// JSON envelopes, one object per frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, envelope: &Envelope) -> Result<Bytes, CodecError> {
        serde_json::to_vec(envelope)
            .map(Bytes::from)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, frame: &[u8]) -> Result<Envelope, CodecError> {
        serde_json::from_slice(frame).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// `MessagePack` envelopes, one map per frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl Codec for MsgPackCodec {
    fn encode(&self, envelope: &Envelope) -> Result<Bytes, CodecError> {
        rmp_serde::to_vec_named(envelope)
            .map(Bytes::from)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, frame: &[u8]) -> Result<Envelope, CodecError> {
        rmp_serde::from_slice(frame).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// The codec selected by the `codec` setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireCodec {
    /// [`JsonCodec`].
    #[default]
    Json,
    /// [`MsgPackCodec`].
    Msgpack,
}

impl WireCodec {
    /// The configuration name of this codec.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Msgpack => "msgpack",
        }
    }
}

impl fmt::Display for WireCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WireCodec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "msgpack" | "messagepack" => Ok(Self::Msgpack),
            other => Err(format!("unknown codec {other:?} (expected json or msgpack)")),
        }
    }
}

impl Codec for WireCodec {
    fn encode(&self, envelope: &Envelope) -> Result<Bytes, CodecError> {
        match self {
            Self::Json => JsonCodec.encode(envelope),
            Self::Msgpack => MsgPackCodec.encode(envelope),
        }
    }

    fn decode(&self, frame: &[u8]) -> Result<Envelope, CodecError> {
        match self {
            Self::Json => JsonCodec.decode(frame),
            Self::Msgpack => MsgPackCodec.decode(frame),
        }
    }
}
