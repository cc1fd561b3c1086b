//! Named todo actions for an external agent.
//!
//! Each action returns a short human-readable result. A missing todo is an
//! answer ("Todo not found."), not an error; every other failure propagates.

use super::error::ClientError;
use super::http::TodoClient;

/// Result text for actions that target a missing todo.
pub const NOT_FOUND_MESSAGE: &str = "Todo not found.";

/// Agent-facing wrapper around [`TodoClient`].
#[derive(Debug, Clone)]
pub struct TodoTools {
    client: TodoClient,
}

impl TodoTools {
    pub fn new(client: TodoClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &TodoClient {
        &self.client
    }

    /// List all todo items.
    pub async fn list_todos(&self) -> Result<String, ClientError> {
        let todos = self.client.list().await?;
        if todos.is_empty() {
            return Ok("No todos found.".to_string());
        }

        Ok(todos
            .iter()
            .map(|todo| todo.to_string())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Add a new todo item.
    pub async fn add_todo(&self, title: &str) -> Result<String, ClientError> {
        let todo = self.client.create(title).await?;
        Ok(format!("Added todo: {}", todo))
    }

    /// Get details of a specific todo item.
    pub async fn get_todo(&self, todo_id: &str) -> Result<String, ClientError> {
        not_found_as_message(self.client.get(todo_id).await.map(|todo| todo.to_string()))
    }

    /// Update a todo item's title.
    pub async fn update_todo(&self, todo_id: &str, title: &str) -> Result<String, ClientError> {
        not_found_as_message(
            self.client
                .update(todo_id, title)
                .await
                .map(|todo| format!("Updated todo: {}", todo)),
        )
    }

    /// Delete a todo item.
    pub async fn delete_todo(&self, todo_id: &str) -> Result<String, ClientError> {
        not_found_as_message(
            self.client
                .delete(todo_id)
                .await
                .map(|()| "Todo deleted successfully.".to_string()),
        )
    }
}

fn not_found_as_message(result: Result<String, ClientError>) -> Result<String, ClientError> {
    match result {
        Err(ClientError::NotFound) => Ok(NOT_FOUND_MESSAGE.to_string()),
        other => other,
    }
}
