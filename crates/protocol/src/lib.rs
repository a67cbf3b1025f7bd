//! Wire protocol for the padlink relay.
//!
//! All traffic is UTF-8 text frames carrying JSON objects. Clients send a
//! `register` frame to join a session; every other well-formed object is an
//! application payload relayed controller→game. Server frames are the
//! tagged [`ServerFrame`] shapes.

use std::time::{SystemTime, UNIX_EPOCH};

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
    thiserror::Error,
};

/// Error messages sent to clients in `error` frames.
pub mod errors {
    pub const INVALID_SESSION: &str = "Invalid session";
    pub const ALREADY_REGISTERED: &str = "Already registered";
}

/// Milliseconds since the Unix epoch, for frame timestamps.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ── Roles ────────────────────────────────────────────────────────────────────

/// Connection role within a session. Controllers originate input frames;
/// games consume them. There is no third role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Controller,
    Game,
}

impl Role {
    /// Parse the `client` field of a register frame. Unknown values are
    /// `None` — the caller decides how to ignore them.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "controller" => Some(Self::Controller),
            "game" => Some(Self::Game),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Controller => "controller",
            Self::Game => "game",
        }
    }
}

// ── Server → client frames ───────────────────────────────────────────────────

/// Frames the server originates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    /// Registration acknowledgement.
    Registered {
        session_id: String,
        client: Role,
        timestamp: u64,
    },
    /// Registration (or other request) failure. The connection stays open.
    Error { message: String, timestamp: u64 },
    /// Membership notice, sent to every member on each join/leave.
    SessionStatus {
        session_id: String,
        games: usize,
        controllers: usize,
        timestamp: u64,
    },
}

impl ServerFrame {
    /// Serialize to the wire representation.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ── Client → server frames ───────────────────────────────────────────────────

/// Payload of a `register` frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterParams {
    pub session_id: String,
    /// Requested role, as sent. Resolve with [`Role::parse`].
    pub client: String,
}

/// A decoded inbound frame.
#[derive(Debug, Clone)]
pub enum ClientFrame {
    Register(RegisterParams),
    /// Any other JSON object: an application payload to relay verbatim.
    Relay(Value),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("malformed register frame: {0}")]
    BadRegister(serde_json::Error),
}

/// Decode one inbound text frame.
///
/// Only JSON objects are accepted; scalars and arrays are malformed. An
/// object with `"type":"register"` must carry `sessionId` and `client`.
pub fn parse_client_frame(text: &str) -> Result<ClientFrame, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(ProtocolError::NotAnObject);
    }
    if value.get("type").and_then(Value::as_str) == Some("register") {
        let params = serde_json::from_value(value).map_err(ProtocolError::BadRegister)?;
        return Ok(ClientFrame::Register(params));
    }
    Ok(ClientFrame::Relay(value))
}
