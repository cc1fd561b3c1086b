//! REST handlers for `/api/todos`.
//!
//! Reads go straight to the store. Mutations go through the [`SyncHub`] so
//! that connected clients hear about them.
//!
//! [`SyncHub`]: super::sync::SyncHub

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use super::store::StoreError;
use super::AppState;
use crate::models::{Todo, TodoDraft};

/// Errors returned by the REST handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The referenced todo does not exist (404)
    NotFound,
    /// The request body or path could not be decoded (422)
    Validation(String),
}

/// Error body, `{"detail": "..."}`.
#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Todo not found".to_string()),
            ApiError::Validation(detail) => (StatusCode::UNPROCESSABLE_ENTITY, detail),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ApiError::NotFound,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

/// Delete confirmation body.
#[derive(Serialize)]
pub struct MessageResponse {
    message: &'static str,
}

/// `GET /api/todos`
pub async fn list_todos(State(state): State<AppState>) -> Json<Vec<Todo>> {
    Json(state.hub.store().list().await)
}

/// `POST /api/todos`
pub async fn create_todo(
    State(state): State<AppState>,
    body: Result<Json<TodoDraft>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    let Json(draft) = body?;
    Ok(Json(state.hub.create(draft).await))
}

/// `GET /api/todos/{id}`
pub async fn get_todo(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Todo>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.hub.store().get(id).await?))
}

/// `PUT /api/todos/{id}`
///
/// Only the title is applied; `id` and `created_at` in the body are ignored.
pub async fn update_todo(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<TodoDraft>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    let Path(id) = path?;
    let Json(draft) = body?;
    Ok(Json(state.hub.update(id, draft.title).await?))
}

/// `DELETE /api/todos/{id}`
pub async fn delete_todo(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(id) = path?;
    state.hub.delete(id).await?;
    Ok(Json(MessageResponse {
        message: "Todo deleted successfully",
    }))
}
