//! # Response Envelopes
//!
//! Wire types for the A2A JSON-RPC exchange with Stage Providers, and the
//! tagged [`ResponseEnvelope`] every reply is decoded into.
//!
//! ## Reply Shapes
//!
//! ```text
//! result.kind == "task", artifacts non-empty  → ArtifactBearing
//! result.kind == "task", no usable artifacts  → StatusBearing
//! result.kind == "message"                    → PlainMessage
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One content part.
///
/// Providers put text either inline (`{"kind":"text","text":"..."}`) or
/// behind a `root` wrapper (`{"root":{"text":"..."}}`). Non-text parts
/// (files, data) decode as `Empty`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPart", into = "RawPart")]
pub enum Part {
    Text(String),
    Nested(Box<Part>),
    Empty,
}

impl Part {
    pub fn text(value: impl Into<String>) -> Self {
        Part::Text(value.into())
    }

    /// Text carried by this part, following `root` wrappers
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(text),
            Part::Nested(inner) => inner.as_text(),
            Part::Empty => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root: Option<Box<RawPart>>,
}

impl From<RawPart> for Part {
    fn from(raw: RawPart) -> Self {
        match (raw.text, raw.root) {
            (Some(text), _) => Part::Text(text),
            (None, Some(root)) => Part::Nested(Box::new(Part::from(*root))),
            (None, None) => Part::Empty,
        }
    }
}

impl From<Part> for RawPart {
    fn from(part: Part) -> Self {
        match part {
            Part::Text(text) => RawPart {
                kind: Some("text".to_string()),
                text: Some(text),
                root: None,
            },
            Part::Nested(inner) => RawPart {
                root: Some(Box::new(RawPart::from(*inner))),
                ..RawPart::default()
            },
            Part::Empty => RawPart::default(),
        }
    }
}

/// A task output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Artifact {
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            artifact_id: None,
            name: None,
            parts,
        }
    }
}

/// A message (standalone reply or a task status message)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Message {
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self { role: None, parts }
    }
}

/// A provider reply, in one of the three shapes providers answer with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ResponseEnvelope {
    /// Tracked task that produced artifacts. The status message is kept
    /// for when every artifact turns out to be empty.
    ArtifactBearing {
        artifacts: Vec<Artifact>,
        #[serde(default)]
        status_message: Option<Message>,
    },
    /// Tracked task that only reached a status update
    StatusBearing { status_message: Option<Message> },
    /// Synchronous message reply
    PlainMessage { parts: Vec<Part> },
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    artifacts: Option<Vec<Artifact>>,
    #[serde(default)]
    status: Option<RawStatus>,
    #[serde(default)]
    parts: Option<Vec<Part>>,
}

impl ResponseEnvelope {
    /// Decode the `result` member of a JSON-RPC reply.
    pub fn from_result(result: Value) -> Result<Self, String> {
        let raw: RawResult = serde_json::from_value(result).map_err(|e| e.to_string())?;
        let status_message = raw.status.and_then(|s| s.message);

        match raw.artifacts {
            Some(artifacts) if !artifacts.is_empty() => {
                return Ok(ResponseEnvelope::ArtifactBearing {
                    artifacts,
                    status_message,
                })
            }
            _ => {}
        }

        let is_task = raw.kind.as_deref() == Some("task");
        if is_task || status_message.is_some() {
            return Ok(ResponseEnvelope::StatusBearing { status_message });
        }

        match raw.parts {
            Some(parts) => Ok(ResponseEnvelope::PlainMessage { parts }),
            None => Err(format!(
                "unrecognized reply shape (kind: {})",
                raw.kind.as_deref().unwrap_or("none")
            )),
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            ResponseEnvelope::ArtifactBearing { .. } => "artifact_bearing",
            ResponseEnvelope::StatusBearing { .. } => "status_bearing",
            ResponseEnvelope::PlainMessage { .. } => "plain_message",
        }
    }
}

// ============================================================================
// JSON-RPC wire types
// ============================================================================

pub const JSONRPC_VERSION: &str = "2.0";
pub const SEND_MESSAGE_METHOD: &str = "message/send";

/// JSON-RPC error codes
pub mod rpc_code {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    #[serde(default = "message_kind")]
    pub kind: String,
    #[serde(default)]
    pub message_id: String,
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

fn message_kind() -> String {
    "message".to_string()
}

impl OutboundMessage {
    fn new(role: &str, text: impl Into<String>) -> Self {
        Self {
            kind: message_kind(),
            message_id: uuid::Uuid::new_v4().to_string(),
            role: role.to_string(),
            parts: vec![Part::text(text)],
        }
    }

    /// Single-part reply from an agent
    pub fn agent_text(text: impl Into<String>) -> Self {
        Self::new("agent", text)
    }

    /// First text part, if any
    pub fn text(&self) -> Option<&str> {
        self.parts.iter().find_map(Part::as_text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageParams {
    pub message: OutboundMessage,
}

/// `message/send` request carrying one user text part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub jsonrpc: String,
    pub id: String,
    pub method: String,
    pub params: SendMessageParams,
}

impl SendMessageRequest {
    pub fn user_text(text: impl Into<String>) -> Self {
        let message = OutboundMessage::new("user", text);
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: message.message_id.clone(),
            method: SEND_MESSAGE_METHOD.to_string(),
            params: SendMessageParams { message },
        }
    }

    /// The request text, as a provider would read it
    pub fn text(&self) -> Option<&str> {
        self.params.message.text()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    /// Echo of the request id; null when the request had none
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcErrorObject {
                code,
                message: message.into(),
            }),
        }
    }
}
