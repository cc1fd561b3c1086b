//! Registry of live sync connections.
//!
//! Each connection is represented by the sending half of a bounded
//! channel. The socket task owns the receiving half and drains it to the
//! peer in order. Sends never wait, so one slow or dead peer never holds up
//! a broadcast. A connection whose receiving half is gone, or whose outbox
//! is full because the peer stopped reading, is pruned by the next
//! broadcast.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;

/// Messages a connection may have queued before it is dropped as lagging.
pub const OUTBOX_CAPACITY: usize = 1024;

/// Identifies a connection for the lifetime of the process.
pub type ConnectionId = u64;

/// Errors that can occur when pushing a message to a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The connection's socket task has shut down.
    #[error("Connection {0} is closed")]
    Closed(ConnectionId),
    /// The peer is not keeping up and its outbox is full.
    #[error("Connection {0} is lagging, outbox full")]
    Lagging(ConnectionId),
    /// The message could not be serialized.
    #[error("Failed to encode message: {0}")]
    Encode(String),
}

/// Handle for pushing messages to one client.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    outbox: mpsc::Sender<String>,
}

impl Connection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues a message for delivery. Never blocks.
    pub fn send(&self, message: impl Into<String>) -> Result<(), TransportError> {
        self.outbox.try_send(message.into()).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Lagging(self.id),
            TrySendError::Closed(_) => TransportError::Closed(self.id),
        })
    }
}

/// Tracks every registered connection for fan-out.
pub struct ConnectionRegistry {
    capacity: usize,
    next_id: AtomicU64,
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::with_capacity(OUTBOX_CAPACITY)
    }

    /// Creates a registry whose connections queue at most `capacity`
    /// undelivered messages.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            next_id: AtomicU64::new(1),
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Allocates a connection handle and the receiver its socket task drains.
    ///
    /// The connection is not registered yet; messages sent to it before
    /// [`register`](Self::register) are still delivered first.
    pub fn open(&self) -> (Connection, mpsc::Receiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (outbox, rx) = mpsc::channel(self.capacity);
        (Connection { id, outbox }, rx)
    }

    /// Adds a connection to the broadcast set.
    pub async fn register(&self, connection: Connection) {
        let id = connection.id;
        let mut connections = self.connections.write().await;
        connections.insert(id, connection);
        tracing::debug!("Registered connection {} ({} active)", id, connections.len());
    }

    /// Removes a connection. Returns false if it was not registered.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(&id).is_some();
        if removed {
            tracing::debug!("Unregistered connection {} ({} active)", id, connections.len());
        }
        removed
    }

    /// Sends a message to every registered connection.
    ///
    /// Connections that fail to accept it are removed. Returns the number of
    /// connections the message was queued for.
    pub async fn broadcast(&self, message: &str) -> usize {
        // Snapshot so removals below don't race the iteration.
        let targets: Vec<Connection> = self.connections.read().await.values().cloned().collect();

        let mut delivered = 0;
        let mut dead = Vec::new();
        for connection in &targets {
            match connection.send(message) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!("Dropping connection after failed send: {}", e);
                    dead.push(connection.id);
                }
            }
        }

        if !dead.is_empty() {
            let mut connections = self.connections.write().await;
            for id in dead {
                connections.remove(&id);
            }
        }

        delivered
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&id)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
