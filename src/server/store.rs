//! In-memory record store for todos.
//!
//! [`TodoTable`] holds the records and implements the operations.
//! [`TodoStore`] wraps it in an async `RwLock` so request handlers and
//! connection tasks can share it. Callers that must pair a mutation with a
//! follow-up action (the sync hub broadcasts while still holding the write
//! guard) take the guard explicitly via [`TodoStore::write`].

use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::models::{Todo, TodoDraft};

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No record with this id exists.
    #[error("Todo not found: {0}")]
    NotFound(Uuid),
}

/// The authoritative set of todo records, keyed by id.
#[derive(Debug, Default)]
pub struct TodoTable {
    todos: HashMap<Uuid, Todo>,
}

impl TodoTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.todos.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    /// Returns every record, oldest first.
    pub fn list(&self) -> Vec<Todo> {
        let mut todos: Vec<Todo> = self.todos.values().cloned().collect();
        todos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        todos
    }

    pub fn get(&self, id: Uuid) -> Result<Todo, StoreError> {
        self.todos.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    /// Inserts a new record.
    ///
    /// A supplied id that is already taken is replaced with a fresh one; the
    /// caller is not told. `created_at` defaults to now.
    pub fn create(&mut self, draft: TodoDraft) -> Todo {
        let mut id = draft.id.unwrap_or_else(Uuid::new_v4);
        while self.todos.contains_key(&id) {
            tracing::debug!("Todo id {} already taken, generating a new one", id);
            id = Uuid::new_v4();
        }

        let todo = Todo {
            id,
            title: draft.title,
            created_at: draft.created_at.unwrap_or_else(Utc::now),
        };
        self.todos.insert(id, todo.clone());
        todo
    }

    /// Replaces the title of an existing record, keeping its id and
    /// creation time.
    pub fn update(&mut self, id: Uuid, title: impl Into<String>) -> Result<Todo, StoreError> {
        let existing = self.todos.get(&id).ok_or(StoreError::NotFound(id))?;

        let todo = Todo {
            id,
            title: title.into(),
            created_at: existing.created_at,
        };
        self.todos.insert(id, todo.clone());
        Ok(todo)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.todos
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

/// Shared, lock-guarded handle to the [`TodoTable`].
#[derive(Debug, Default)]
pub struct TodoStore {
    table: RwLock<TodoTable>,
}

impl TodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires shared access. Mutations wait until the guard is dropped.
    pub async fn read(&self) -> RwLockReadGuard<'_, TodoTable> {
        self.table.read().await
    }

    /// Acquires exclusive access.
    pub async fn write(&self) -> RwLockWriteGuard<'_, TodoTable> {
        self.table.write().await
    }

    pub async fn list(&self) -> Vec<Todo> {
        self.read().await.list()
    }

    pub async fn get(&self, id: Uuid) -> Result<Todo, StoreError> {
        self.read().await.get(id)
    }

    // Mutations in normal operation go through `SyncHub`, which broadcasts them.

    #[cfg(test)]
    pub async fn create(&self, draft: TodoDraft) -> Todo {
        self.write().await.create(draft)
    }

    #[cfg(test)]
    pub async fn update(&self, id: Uuid, title: impl Into<String>) -> Result<Todo, StoreError> {
        self.write().await.update(id, title)
    }

    #[cfg(test)]
    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.write().await.delete(id)
    }
}
