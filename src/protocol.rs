//! Message types for the live-sync WebSocket channel.
//!
//! Every frame is a JSON text message tagged by `type`:
//!
//! ```text
//! {"type":"init","todos":[...]}     sent once, right after connect
//! {"type":"create","todo":{...}}
//! {"type":"update","todo":{...}}
//! {"type":"delete","id":"<uuid>"}
//! ```
//!
//! Clients may send anything; the server reads and discards it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Todo;

/// Server to client messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Full snapshot handed to a newly connected client
    Init { todos: Vec<Todo> },
    /// A record was created
    Create { todo: Todo },
    /// A record's title was replaced
    Update { todo: Todo },
    /// A record was removed
    Delete { id: Uuid },
}

impl ServerMessage {
    /// Returns the `type` tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Init { .. } => "init",
            ServerMessage::Create { .. } => "create",
            ServerMessage::Update { .. } => "update",
            ServerMessage::Delete { .. } => "delete",
        }
    }

    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode from a JSON text frame.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
