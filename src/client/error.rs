//! Client error types.

use reqwest::StatusCode;

/// Errors that can occur talking to the todo server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered 404 for the requested todo
    #[error("Todo not found")]
    NotFound,
    /// Any other non-success status
    #[error("Server returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
    /// Request could not be sent or the response could not be read
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Failed to open the WebSocket connection
    #[error("Connection error: {0}")]
    Connection(String),
    /// WebSocket error after connecting
    #[error("WebSocket error: {0}")]
    WebSocket(String),
    /// A sync message could not be decoded
    #[error("Invalid sync message: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Returns true if this is a not-found response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound)
    }
}
