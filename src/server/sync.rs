//! Live sync of todo state over WebSocket.
//!
//! [`SyncHub`] pairs the record store with the connection registry. Every
//! mutation goes through the hub, which applies it and broadcasts the change
//! while still holding the store's write lock. A new client is attached
//! under the read lock: it gets the snapshot and is registered before any
//! other mutation can land, so each change reaches it exactly once, either
//! inside the `init` snapshot or as a later broadcast.
//!
//! ```text
//! Client              handle_socket              SyncHub
//!   │                      │                        │
//!   ├─ Upgrade ───────────>│                        │
//!   │                      ├─ attach() ────────────>│ read lock
//!   │<─ {"type":"init"} ───┤<─ snapshot + register ─┤
//!   │                      │                        │
//!   │                      │      create/update/delete (write lock)
//!   │<─ {"type":"create"} ─┤<─ broadcast ───────────┤
//!   │                      │                        │
//!   ├─ Close ─────────────>├─ detach() ────────────>│
//! ```

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use uuid::Uuid;

use super::registry::{Connection, ConnectionId, ConnectionRegistry, TransportError};
use super::store::{StoreError, TodoStore};
use super::AppState;
use crate::models::{Todo, TodoDraft};
use crate::protocol::ServerMessage;

/// Applies mutations and fans the resulting changes out to clients.
pub struct SyncHub {
    store: Arc<TodoStore>,
    registry: Arc<ConnectionRegistry>,
}

impl SyncHub {
    /// Creates a hub with an empty store and no connections.
    pub fn new() -> Self {
        Self::with_parts(
            Arc::new(TodoStore::new()),
            Arc::new(ConnectionRegistry::new()),
        )
    }

    pub fn with_parts(store: Arc<TodoStore>, registry: Arc<ConnectionRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn store(&self) -> &TodoStore {
        &self.store
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Creates a record and broadcasts `create`.
    pub async fn create(&self, draft: TodoDraft) -> Todo {
        let mut table = self.store.write().await;
        let todo = table.create(draft);
        tracing::info!("Created todo {}", todo.id);

        self.publish(&ServerMessage::Create { todo: todo.clone() })
            .await;
        todo
    }

    /// Retitles a record and broadcasts `update`. Nothing is sent on failure.
    pub async fn update(&self, id: Uuid, title: impl Into<String>) -> Result<Todo, StoreError> {
        let mut table = self.store.write().await;
        let todo = table.update(id, title)?;
        tracing::info!("Updated todo {}", todo.id);

        self.publish(&ServerMessage::Update { todo: todo.clone() })
            .await;
        Ok(todo)
    }

    /// Removes a record and broadcasts `delete`. Nothing is sent on failure.
    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut table = self.store.write().await;
        table.delete(id)?;
        tracing::info!("Deleted todo {}", id);

        self.publish(&ServerMessage::Delete { id }).await;
        Ok(())
    }

    /// Sends the current snapshot to `connection`, then registers it.
    ///
    /// Returns the number of records in the snapshot.
    pub async fn attach(&self, connection: Connection) -> Result<usize, TransportError> {
        let table = self.store.read().await;
        let todos = table.list();
        let count = todos.len();

        let init = ServerMessage::Init { todos }
            .encode()
            .map_err(|e| TransportError::Encode(e.to_string()))?;
        connection.send(init)?;

        let id = connection.id();
        self.registry.register(connection).await;
        drop(table);

        tracing::info!("Connection {} attached with {} todo(s)", id, count);
        Ok(count)
    }

    /// Removes a connection from the broadcast set.
    pub async fn detach(&self, id: ConnectionId) {
        if self.registry.unregister(id).await {
            tracing::info!("Connection {} detached", id);
        }
    }

    /// Must be called with the store's write guard held so that broadcasts
    /// leave in the order mutations were applied.
    async fn publish(&self, message: &ServerMessage) {
        let text = match message.encode() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to encode {} message: {}", message.kind(), e);
                return;
            }
        };

        let delivered = self.registry.broadcast(&text).await;
        tracing::debug!(
            "Broadcast {} to {} connection(s)",
            message.kind(),
            delivered
        );
    }
}

impl Default for SyncHub {
    fn default() -> Self {
        Self::new()
    }
}

/// `GET /ws` upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    tracing::debug!("WebSocket connection requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub))
}

/// Drives one client connection from attach to detach.
///
/// A writer task drains the connection's outbox to the socket. A reader task
/// consumes and discards inbound frames until the peer closes. Whichever
/// finishes first tears down the other.
pub async fn handle_socket(socket: WebSocket, hub: Arc<SyncHub>) {
    let (mut sender, mut receiver) = socket.split();
    let (connection, mut outbox) = hub.registry().open();
    let id = connection.id();

    if let Err(e) = hub.attach(connection).await {
        tracing::warn!("Failed to attach connection {}: {}", id, e);
        return;
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(text) = outbox.recv().await {
            if let Err(e) = sender.send(Message::Text(text.into())).await {
                tracing::debug!("Write to connection {} failed: {}", id, e);
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Close(_)) => break,
                Ok(_) => {
                    // Inbound messages carry no commands.
                    tracing::trace!("Ignoring inbound frame on connection {}", id);
                }
                Err(e) => {
                    tracing::debug!("Read from connection {} failed: {}", id, e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.detach(id).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::Receiver;

    fn decode_next(rx: &mut Receiver<String>) -> ServerMessage {
        let text = rx.try_recv().expect("expected a queued message");
        ServerMessage::decode(&text).unwrap()
    }

    async fn attached(hub: &SyncHub) -> (ConnectionId, Receiver<String>) {
        let (connection, rx) = hub.registry().open();
        let id = connection.id();
        hub.attach(connection).await.unwrap();
        (id, rx)
    }

    #[tokio::test]
    async fn test_attach_sends_snapshot_then_changes() {
        let hub = SyncHub::new();
        let a = hub.create(TodoDraft::new("a")).await;
        let b = hub.create(TodoDraft::new("b")).await;

        let (_, mut rx) = attached(&hub).await;

        match decode_next(&mut rx) {
            ServerMessage::Init { todos } => {
                assert_eq!(todos.len(), 2);
                assert!(todos.contains(&a));
                assert!(todos.contains(&b));
            }
            other => panic!("Expected init, got {:?}", other),
        }

        let c = hub.create(TodoDraft::new("c")).await;
        let a2 = hub.update(a.id, "a2").await.unwrap();
        hub.delete(b.id).await.unwrap();

        assert_eq!(decode_next(&mut rx), ServerMessage::Create { todo: c });
        assert_eq!(decode_next(&mut rx), ServerMessage::Update { todo: a2 });
        assert_eq!(decode_next(&mut rx), ServerMessage::Delete { id: b.id });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_mutation_is_not_broadcast() {
        let hub = SyncHub::new();
        let (_, mut rx) = attached(&hub).await;
        decode_next(&mut rx);

        let missing = Uuid::nil();
        assert_eq!(
            hub.update(missing, "x").await,
            Err(StoreError::NotFound(missing))
        );
        assert_eq!(hub.delete(missing).await, Err(StoreError::NotFound(missing)));

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_detach_stops_delivery() {
        let hub = SyncHub::new();
        let (id, mut rx) = attached(&hub).await;
        decode_next(&mut rx);

        hub.detach(id).await;
        hub.create(TodoDraft::new("unseen")).await;

        assert!(rx.try_recv().is_err());
        assert!(hub.registry().is_empty().await);
    }

    #[tokio::test]
    async fn test_dead_client_does_not_fail_mutation() {
        let hub = SyncHub::new();
        let (dead_id, dead_rx) = attached(&hub).await;
        let (_, mut live_rx) = attached(&hub).await;
        decode_next(&mut live_rx);
        drop(dead_rx);

        let todo = hub.create(TodoDraft::new("still works")).await;

        assert_eq!(hub.store().get(todo.id).await.unwrap(), todo);
        assert_eq!(
            decode_next(&mut live_rx),
            ServerMessage::Create { todo }
        );
        assert!(!hub.registry().contains(dead_id).await);
    }

    #[tokio::test]
    async fn test_lagging_client_is_dropped_without_failing_mutation() {
        let hub = SyncHub::with_parts(
            Arc::new(TodoStore::new()),
            Arc::new(ConnectionRegistry::with_capacity(2)),
        );
        let (stalled_id, _stalled_rx) = attached(&hub).await;

        // init plus one change fill the outbox; the next change overflows it.
        hub.create(TodoDraft::new("first")).await;
        let second = hub.create(TodoDraft::new("second")).await;

        assert_eq!(hub.store().get(second.id).await.unwrap(), second);
        assert!(!hub.registry().contains(stalled_id).await);
    }

    #[tokio::test]
    async fn test_attach_to_closed_connection_fails() {
        let hub = SyncHub::new();
        let (connection, rx) = hub.registry().open();
        let id = connection.id();
        drop(rx);

        assert_eq!(
            hub.attach(connection).await,
            Err(TransportError::Closed(id))
        );
        assert!(!hub.registry().contains(id).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_attach_during_writes_sees_each_change_once() {
        let hub = Arc::new(SyncHub::new());

        let writer = {
            let hub = Arc::clone(&hub);
            tokio::spawn(async move {
                for i in 0..200 {
                    hub.create(TodoDraft::new(format!("todo {}", i))).await;
                }
            })
        };

        tokio::task::yield_now().await;
        let (_, mut rx) = attached(&hub).await;
        writer.await.unwrap();

        let mut seen = std::collections::HashSet::new();
        while let Ok(text) = rx.try_recv() {
            match ServerMessage::decode(&text).unwrap() {
                ServerMessage::Init { todos } => {
                    for todo in todos {
                        assert!(seen.insert(todo.id));
                    }
                }
                ServerMessage::Create { todo } => assert!(seen.insert(todo.id)),
                other => panic!("Unexpected message {:?}", other),
            }
        }

        assert_eq!(seen.len(), 200);
    }
}
