//! End-to-end tests: real server on a loopback port, driven over HTTP and
//! WebSocket by the crate's own client.

use std::time::Duration;

use reqwest::StatusCode;
use todo_sync::client::{ClientError, SyncListener, TodoClient, TodoTools, NOT_FOUND_MESSAGE};
use todo_sync::models::{Todo, TodoDraft};
use todo_sync::protocol::ServerMessage;
use todo_sync::server::{router, AppState};
use uuid::Uuid;

const WAIT: Duration = Duration::from_secs(5);

async fn spawn_server() -> (String, AppState) {
    let state = AppState::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

async fn next(listener: &mut SyncListener) -> ServerMessage {
    tokio::time::timeout(WAIT, listener.next_message())
        .await
        .expect("timed out waiting for sync message")
        .unwrap()
        .expect("connection closed")
}

async fn expect_init(listener: &mut SyncListener) -> Vec<Todo> {
    match next(listener).await {
        ServerMessage::Init { todos } => todos,
        other => panic!("Expected init, got {:?}", other),
    }
}

async fn wait_for_connections(state: &AppState, expected: usize) {
    tokio::time::timeout(WAIT, async {
        while state.hub.registry().len().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("registry never reached expected size");
}

#[tokio::test]
async fn test_create_is_broadcast_to_connected_client() {
    let (url, _state) = spawn_server().await;
    let client = TodoClient::new(&url).unwrap();
    let mut listener = SyncListener::connect(&url).await.unwrap();
    assert!(expect_init(&mut listener).await.is_empty());

    let created = client.create("buy milk").await.unwrap();

    assert_eq!(created.title, "buy milk");
    assert_eq!(next(&mut listener).await, ServerMessage::Create { todo: created });
}

#[tokio::test]
async fn test_snapshot_then_ordered_changes() {
    let (url, _state) = spawn_server().await;
    let client = TodoClient::new(&url).unwrap();

    let mut existing = Vec::new();
    for title in ["one", "two", "three"] {
        existing.push(client.create(title).await.unwrap());
    }

    let mut listener = SyncListener::connect(&url).await.unwrap();
    let snapshot = expect_init(&mut listener).await;
    assert_eq!(snapshot.len(), 3);
    for todo in &existing {
        assert!(snapshot.contains(todo));
    }

    let four = client.create("four").await.unwrap();
    let renamed = client.update(&existing[0].id.to_string(), "uno").await.unwrap();
    client.delete(&existing[1].id.to_string()).await.unwrap();

    assert_eq!(next(&mut listener).await, ServerMessage::Create { todo: four });
    assert_eq!(next(&mut listener).await, ServerMessage::Update { todo: renamed });
    assert_eq!(
        next(&mut listener).await,
        ServerMessage::Delete { id: existing[1].id }
    );
}

#[tokio::test]
async fn test_every_client_receives_broadcast() {
    let (url, state) = spawn_server().await;
    let client = TodoClient::new(&url).unwrap();
    let mut first = SyncListener::connect(&url).await.unwrap();
    let mut second = SyncListener::connect(&url).await.unwrap();
    expect_init(&mut first).await;
    expect_init(&mut second).await;
    wait_for_connections(&state, 2).await;

    let todo = client.create("shared").await.unwrap();

    let expected = ServerMessage::Create { todo };
    assert_eq!(next(&mut first).await, expected);
    assert_eq!(next(&mut second).await, expected);
}

#[tokio::test]
async fn test_update_missing_is_404_without_broadcast() {
    let (url, _state) = spawn_server().await;
    let client = TodoClient::new(&url).unwrap();
    let mut listener = SyncListener::connect(&url).await.unwrap();
    expect_init(&mut listener).await;

    let response = reqwest::Client::new()
        .put(format!(
            "{}/api/todos/00000000-0000-0000-0000-000000000000",
            url
        ))
        .json(&serde_json::json!({"title": "ghost"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"detail": "Todo not found"}));

    // The next message must be for this create, not the failed update.
    let todo = client.create("after").await.unwrap();
    assert_eq!(next(&mut listener).await, ServerMessage::Create { todo });
}

#[tokio::test]
async fn test_colliding_id_is_replaced() {
    let (url, _state) = spawn_server().await;
    let client = TodoClient::new(&url).unwrap();
    let original = client.create("original").await.unwrap();
    let mut listener = SyncListener::connect(&url).await.unwrap();
    expect_init(&mut listener).await;

    let duplicate = client
        .create_draft(&TodoDraft::new("duplicate").with_id(original.id))
        .await
        .unwrap();

    assert_ne!(duplicate.id, original.id);
    assert_eq!(
        client.get(&original.id.to_string()).await.unwrap(),
        original
    );
    assert_eq!(client.list().await.unwrap().len(), 2);
    assert_eq!(
        next(&mut listener).await,
        ServerMessage::Create { todo: duplicate }
    );
}

#[tokio::test]
async fn test_inbound_messages_are_ignored() {
    let (url, _state) = spawn_server().await;
    let client = TodoClient::new(&url).unwrap();
    let mut listener = SyncListener::connect(&url).await.unwrap();
    expect_init(&mut listener).await;

    listener
        .send_text(r#"{"type":"delete","id":"anything"}"#)
        .await
        .unwrap();
    listener.send_text("not even json").await.unwrap();

    let todo = client.create("still connected").await.unwrap();
    assert_eq!(next(&mut listener).await, ServerMessage::Create { todo });
}

#[tokio::test]
async fn test_disconnect_unregisters() {
    let (url, state) = spawn_server().await;
    let client = TodoClient::new(&url).unwrap();

    let mut leaving = SyncListener::connect(&url).await.unwrap();
    let mut staying = SyncListener::connect(&url).await.unwrap();
    expect_init(&mut leaving).await;
    expect_init(&mut staying).await;
    wait_for_connections(&state, 2).await;

    leaving.close().await.unwrap();
    wait_for_connections(&state, 1).await;

    let todo = client.create("after disconnect").await.unwrap();
    assert_eq!(next(&mut staying).await, ServerMessage::Create { todo });
}

#[tokio::test]
async fn test_client_maps_status_errors() {
    let (url, _state) = spawn_server().await;
    let client = TodoClient::new(&url).unwrap();

    let missing = Uuid::nil().to_string();
    assert!(client.get(&missing).await.unwrap_err().is_not_found());
    assert!(client.update(&missing, "x").await.unwrap_err().is_not_found());
    assert!(client.delete(&missing).await.unwrap_err().is_not_found());

    match client.get("not-a-uuid").await {
        Err(ClientError::Status { status, .. }) => {
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY)
        }
        other => panic!("Expected 422 status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_tools_round_trip() {
    let (url, _state) = spawn_server().await;
    let tools = TodoTools::new(TodoClient::new(&url).unwrap());

    assert_eq!(tools.list_todos().await.unwrap(), "No todos found.");

    let added = tools.add_todo("water plants").await.unwrap();
    assert!(added.starts_with("Added todo: ["));
    assert!(added.contains("water plants (ID: "));

    let todo = tools.client().list().await.unwrap().remove(0);
    let id = todo.id.to_string();
    assert_eq!(tools.get_todo(&id).await.unwrap(), todo.to_string());
    assert_eq!(tools.list_todos().await.unwrap(), todo.to_string());

    let updated = tools.update_todo(&id, "water all plants").await.unwrap();
    assert!(updated.starts_with("Updated todo: "));
    assert!(updated.contains("water all plants"));

    assert_eq!(
        tools.delete_todo(&id).await.unwrap(),
        "Todo deleted successfully."
    );
    assert_eq!(tools.get_todo(&id).await.unwrap(), NOT_FOUND_MESSAGE);
    assert_eq!(tools.update_todo(&id, "x").await.unwrap(), NOT_FOUND_MESSAGE);
    assert_eq!(tools.delete_todo(&id).await.unwrap(), NOT_FOUND_MESSAGE);

    // Anything but a 404 is still an error.
    assert!(tools.get_todo("not-a-uuid").await.is_err());
}

#[tokio::test]
async fn test_requests_carry_client_headers() {
    // A bare listener captures the raw request the client sends.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let capture = tokio::spawn(async move {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 4096];
        let n = socket.read(&mut buf).await.unwrap();
        let request = String::from_utf8_lossy(&buf[..n]).to_lowercase();

        let body = "[]";
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        request
    });

    let client = TodoClient::new(&url).unwrap();
    assert!(client.list().await.unwrap().is_empty());

    let request = capture.await.unwrap();
    assert!(request.starts_with("get /api/todos http/1.1"));
    assert!(request.contains("user-agent: todo-app/1.0"));
    assert!(request.contains("content-type: application/json"));
}
