//! Wire messages exchanged with clients.
//!
//! Every frame is an [`Envelope`]: an `action` tag plus a free-form
//! `payload`. Inbound envelopes are classified into a [`ClientAction`];
//! outbound ones are built from a [`ServerMessage`]. The byte encoding is
//! not decided here.
//!
//! | action (in)      | action (out)       | payload out            |
//! |------------------|--------------------|------------------------|
//! | (connect)        | `initial-hexagons` | all cells              |
//! | (denied)         | `no-access`        | [`NO_ACCESS_MESSAGE`]  |
//! | `update-hexagon` | `hexagon-update`   | the submitted payload  |
//! | `ping`           | `pong`             | [`PONG_PAYLOAD`]       |

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::cell::Cell;

/// Localized denial text carried by `no-access` messages.
pub const NO_ACCESS_MESSAGE: &str = "Acceso denegado: Master Key no válido.";

/// Plain-text notice (not enveloped) sent for frames that cannot be handled.
pub const INVALID_ACTION_NOTICE: &str = "invalid action";

/// Payload of every `pong` reply.
pub const PONG_PAYLOAD: &str = "pong";

/// Every action tag the server knows about, in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum Action {
    /// Full snapshot pushed on connect.
    InitialHexagons,
    /// Credential denial.
    NoAccess,
    /// Client request to change one cell.
    UpdateHexagon,
    /// Broadcast of an accepted change.
    HexagonUpdate,
    /// Client liveness check.
    Ping,
    /// Reply to [`Action::Ping`].
    Pong,
}

impl Action {
    /// The wire tag for this action.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InitialHexagons => "initial-hexagons",
            Self::NoAccess => "no-access",
            Self::UpdateHexagon => "update-hexagon",
            Self::HexagonUpdate => "hexagon-update",
            Self::Ping => "ping",
            Self::Pong => "pong",
        }
    }

    /// Parse a wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "initial-hexagons" => Some(Self::InitialHexagons),
            "no-access" => Some(Self::NoAccess),
            "update-hexagon" => Some(Self::UpdateHexagon),
            "hexagon-update" => Some(Self::HexagonUpdate),
            "ping" => Some(Self::Ping),
            "pong" => Some(Self::Pong),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The logical frame: `{ action, payload }`.
///
/// `action` stays a raw string so that unknown or missing tags survive
/// decoding and can be answered instead of failing the frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Envelope {
    /// Action tag, if the sender supplied one.
    #[serde(default)]
    pub action: Option<String>,
    /// Action-specific payload.
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// Build an envelope for a known action.
    pub fn new(action: Action, payload: Value) -> Self {
        Self {
            action: Some(action.as_str().to_owned()),
            payload,
        }
    }

    /// The parsed action tag, if present and known.
    pub fn action(&self) -> Option<Action> {
        self.action.as_deref().and_then(Action::from_tag)
    }
}

/// What a client asked for, after classifying the envelope tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Change one cell. Holds the payload exactly as received so it can be
    /// echoed back untouched.
    UpdateHexagon(Value),
    /// Liveness check.
    Ping,
    /// Any other tag, including server-only tags and a missing tag.
    Unknown(Option<String>),
}

impl From<Envelope> for ClientAction {
    fn from(envelope: Envelope) -> Self {
        match envelope.action() {
            Some(Action::UpdateHexagon) => Self::UpdateHexagon(envelope.payload),
            Some(Action::Ping) => Self::Ping,
            Some(
                Action::InitialHexagons | Action::NoAccess | Action::HexagonUpdate | Action::Pong,
            )
            | None => Self::Unknown(envelope.action),
        }
    }
}

/// Errors raised when an `update-hexagon` payload is unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// The payload is not an object with string `id` and `status`.
    #[error("malformed update payload: {0}")]
    Malformed(String),

    /// The requested status is empty.
    #[error("empty status for cell {0}")]
    EmptyStatus(String),
}

/// The fields of an `update-hexagon` payload the server acts on.
///
/// Extra fields are ignored here but still broadcast, since the echo uses
/// the raw payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HexagonUpdate {
    /// Target cell id.
    pub id: String,
    /// New status label.
    pub status: String,
}

impl HexagonUpdate {
    /// Extract the target id and status from a raw payload.
    pub fn from_payload(payload: &Value) -> Result<Self, PayloadError> {
        let update = Self::deserialize(payload)
            .map_err(|e| PayloadError::Malformed(e.to_string()))?;
        if update.status.is_empty() {
            return Err(PayloadError::EmptyStatus(update.id));
        }
        Ok(update)
    }
}

/// Messages the server sends inside an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Snapshot of every cell.
    InitialHexagons(Vec<Cell>),
    /// Credential denial with a human-readable reason.
    NoAccess(String),
    /// An accepted change, carrying the submitted payload.
    HexagonUpdate(Value),
    /// Reply to a ping.
    Pong(String),
}

impl ServerMessage {
    /// The standard denial message.
    pub fn no_access() -> Self {
        Self::NoAccess(NO_ACCESS_MESSAGE.to_owned())
    }

    /// The standard ping reply.
    pub fn pong() -> Self {
        Self::Pong(PONG_PAYLOAD.to_owned())
    }

    /// The action tag this message is sent under.
    pub const fn action(&self) -> Action {
        match self {
            Self::InitialHexagons(_) => Action::InitialHexagons,
            Self::NoAccess(_) => Action::NoAccess,
            Self::HexagonUpdate(_) => Action::HexagonUpdate,
            Self::Pong(_) => Action::Pong,
        }
    }

    /// Wrap this message in its wire envelope.
    pub fn into_envelope(self) -> Result<Envelope, serde_json::Error> {
        let action = self.action();
        let payload = match self {
            Self::InitialHexagons(cells) => serde_json::to_value(cells)?,
            Self::NoAccess(text) | Self::Pong(text) => Value::String(text),
            Self::HexagonUpdate(payload) => payload,
        };
        Ok(Envelope::new(action, payload))
    }
}
