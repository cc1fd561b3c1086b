//! HTTP client for the `/api/todos` endpoints.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::ClientError;
use crate::models::{Todo, TodoDraft};

/// User-Agent sent with every request.
pub const USER_AGENT: &str = "todo-app/1.0";

/// Body returned by a successful delete.
#[derive(Debug, Deserialize)]
struct DeleteResponse {
    #[allow(dead_code)]
    message: String,
}

/// Typed client for the todo REST API.
#[derive(Debug, Clone)]
pub struct TodoClient {
    server_url: String,
    http: reqwest::Client,
}

impl TodoClient {
    /// Creates a client for the server at `server_url` (e.g. `http://localhost:8000`).
    pub fn new(server_url: impl Into<String>) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Returns the server URL.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub async fn list(&self) -> Result<Vec<Todo>, ClientError> {
        self.request(Method::GET, "/api/todos", None::<&()>).await
    }

    pub async fn create(&self, title: &str) -> Result<Todo, ClientError> {
        self.create_draft(&TodoDraft::new(title)).await
    }

    /// Creates a todo, passing through a client-chosen id or timestamp.
    pub async fn create_draft(&self, draft: &TodoDraft) -> Result<Todo, ClientError> {
        self.request(Method::POST, "/api/todos", Some(draft)).await
    }

    pub async fn get(&self, id: &str) -> Result<Todo, ClientError> {
        self.request(Method::GET, &Self::todo_path(id), None::<&()>)
            .await
    }

    pub async fn update(&self, id: &str, title: &str) -> Result<Todo, ClientError> {
        let draft = TodoDraft::new(title);
        self.request(Method::PUT, &Self::todo_path(id), Some(&draft))
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let _: DeleteResponse = self
            .request(Method::DELETE, &Self::todo_path(id), None::<&()>)
            .await?;
        Ok(())
    }

    fn todo_path(id: &str) -> String {
        format!("/api/todos/{}", urlencoding::encode(id))
    }

    /// Sends a request and decodes a JSON response.
    ///
    /// 404 maps to [`ClientError::NotFound`]; any other non-2xx status to
    /// [`ClientError::Status`].
    async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.server_url, path);
        tracing::debug!("{} {}", method, url);

        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        Ok(response.json().await?)
    }
}
