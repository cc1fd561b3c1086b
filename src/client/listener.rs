//! WebSocket listener for the server's live change feed.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use super::error::ClientError;
use crate::protocol::ServerMessage;

/// An open subscription to `/ws`.
///
/// The first message is always [`ServerMessage::Init`], followed by one
/// message per change in the order the server applied them.
pub struct SyncListener {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl SyncListener {
    /// Connects to the sync endpoint of the server at `server_url`.
    pub async fn connect(server_url: &str) -> Result<Self, ClientError> {
        let ws_url = build_ws_url(server_url);
        tracing::debug!("Connecting to {}", ws_url);

        let (stream, _) = connect_async(&ws_url)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        Ok(Self { stream })
    }

    /// Waits for the next sync message.
    ///
    /// Returns `Ok(None)` once the server closes the connection.
    pub async fn next_message(&mut self) -> Result<Option<ServerMessage>, ClientError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(ServerMessage::decode(text.as_str())?));
                }
                Some(Ok(Message::Ping(data))) => {
                    self.stream
                        .send(Message::Pong(data))
                        .await
                        .map_err(|e| ClientError::WebSocket(e.to_string()))?;
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => {
                    // Ignore other frame types
                }
                Some(Err(e)) => return Err(ClientError::WebSocket(e.to_string())),
            }
        }
    }

    /// Sends a text frame. The server accepts and discards it.
    pub async fn send_text(&mut self, text: &str) -> Result<(), ClientError> {
        self.stream
            .send(Message::Text(text.to_string().into()))
            .await
            .map_err(|e| ClientError::WebSocket(e.to_string()))
    }

    /// Closes the connection gracefully.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| ClientError::WebSocket(e.to_string()))
    }
}

/// Builds the sync endpoint URL, converting http(s) to ws(s) if needed.
fn build_ws_url(server_url: &str) -> String {
    let server_url = server_url.trim_end_matches('/');

    let base_url = if let Some(rest) = server_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if let Some(rest) = server_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if !server_url.starts_with("ws://") && !server_url.starts_with("wss://") {
        format!("ws://{}", server_url)
    } else {
        server_url.to_string()
    };

    format!("{}/ws", base_url)
}
