//! `reqwest` implementation of [`TodoApi`]

use crate::api::{ApiFuture, ApiResult, TodoApi};
use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::types::{OrderEntry, Subtask, SubtaskId, SubtaskPatch, Todo, TodoId, TodoPatch};
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

#[derive(Serialize)]
struct NewTodo {
    text: String,
    date: NaiveDate,
}

#[derive(Serialize)]
struct NewSubtask {
    text: String,
}

#[derive(Serialize)]
struct TodoOrder {
    todos: Vec<OrderEntry<TodoId>>,
}

#[derive(Serialize)]
struct SubtaskOrder {
    subtasks: Vec<OrderEntry<SubtaskId>>,
}

/// HTTP client for the todo service
///
/// Cheap to clone: the underlying connection pool is shared.
#[derive(Clone, Debug)]
pub struct HttpTodoApi {
    client: Client,
    base_url: Arc<str>,
}

impl HttpTodoApi {
    /// Create a client for an explicit base URL
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidBaseUrl`] if `base_url` is not an absolute http(s) URL
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::from_config(&ClientConfig::new(base_url))
    }

    /// Create a client from a [`ClientConfig`]
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidBaseUrl`] if the configured URL is unusable
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        let parsed = Url::parse(&config.base_url)
            .map_err(|e| TransportError::InvalidBaseUrl(format!("{}: {e}", config.base_url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TransportError::InvalidBaseUrl(config.base_url.clone()));
        }

        Ok(Self {
            client: Client::new(),
            base_url: Arc::from(config.base_url.as_str()),
        })
    }

    /// Create a client with the base URL from `DAYBOOK_API_URL`
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidBaseUrl`] if the variable holds an unusable URL
    pub fn from_env() -> Result<Self, TransportError> {
        Self::from_config(&ClientConfig::from_env())
    }

    /// Base URL requests are sent to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Send a request and turn non-2xx answers into [`TransportError::Status`]
async fn send(request: RequestBuilder, operation: &'static str) -> ApiResult<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        tracing::debug!(operation, status = status.as_u16(), "todo service responded");
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    tracing::warn!(operation, status = status.as_u16(), "todo service rejected request");
    Err(TransportError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Send a request and decode the JSON body
async fn fetch<T: DeserializeOwned>(request: RequestBuilder, operation: &'static str) -> ApiResult<T> {
    send(request, operation)
        .await?
        .json::<T>()
        .await
        .map_err(|e| TransportError::ResponseParseFailed(e.to_string()))
}

/// Send a request whose response body is irrelevant
async fn execute(request: RequestBuilder, operation: &'static str) -> ApiResult<()> {
    send(request, operation).await.map(|_| ())
}

impl TodoApi for HttpTodoApi {
    fn list_todos(&self, date: Option<NaiveDate>) -> ApiFuture<Vec<Todo>> {
        let mut request = self.client.get(self.url("/todos"));
        if let Some(date) = date {
            request = request.query(&[("date", date.to_string())]);
        }
        Box::pin(fetch(request, "list_todos"))
    }

    fn create_todo(&self, text: String, date: NaiveDate) -> ApiFuture<Todo> {
        let request = self
            .client
            .post(self.url("/todos"))
            .json(&NewTodo { text, date });
        Box::pin(fetch(request, "create_todo"))
    }

    fn update_todo(&self, id: TodoId, patch: TodoPatch) -> ApiFuture<Todo> {
        let request = self
            .client
            .patch(self.url(&format!("/todos/{id}")))
            .json(&patch);
        Box::pin(fetch(request, "update_todo"))
    }

    fn delete_todo(&self, id: TodoId) -> ApiFuture<()> {
        let request = self.client.delete(self.url(&format!("/todos/{id}")));
        Box::pin(execute(request, "delete_todo"))
    }

    fn create_subtask(&self, todo_id: TodoId, text: String) -> ApiFuture<Subtask> {
        let request = self
            .client
            .post(self.url(&format!("/todos/{todo_id}/subtasks")))
            .json(&NewSubtask { text });
        Box::pin(fetch(request, "create_subtask"))
    }

    fn update_subtask(
        &self,
        todo_id: TodoId,
        subtask_id: SubtaskId,
        patch: SubtaskPatch,
    ) -> ApiFuture<Subtask> {
        let request = self
            .client
            .patch(self.url(&format!("/todos/{todo_id}/subtasks/{subtask_id}")))
            .json(&patch);
        Box::pin(fetch(request, "update_subtask"))
    }

    fn delete_subtask(&self, todo_id: TodoId, subtask_id: SubtaskId) -> ApiFuture<()> {
        let request = self
            .client
            .delete(self.url(&format!("/todos/{todo_id}/subtasks/{subtask_id}")));
        Box::pin(execute(request, "delete_subtask"))
    }

    fn reorder_todos(&self, entries: Vec<OrderEntry<TodoId>>) -> ApiFuture<()> {
        let request = self
            .client
            .put(self.url("/todos/reorder"))
            .json(&TodoOrder { todos: entries });
        Box::pin(execute(request, "reorder_todos"))
    }

    fn reorder_subtasks(
        &self,
        todo_id: TodoId,
        entries: Vec<OrderEntry<SubtaskId>>,
    ) -> ApiFuture<()> {
        let request = self
            .client
            .put(self.url(&format!("/todos/{todo_id}/subtasks/reorder")))
            .json(&SubtaskOrder { subtasks: entries });
        Box::pin(execute(request, "reorder_subtasks"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let api = HttpTodoApi::new("http://localhost:4000/").unwrap();
        assert_eq!(api.base_url(), "http://localhost:4000");
        assert_eq!(api.url("/todos/3"), "http://localhost:4000/todos/3");
    }

    #[test]
    fn test_rejects_relative_url() {
        assert!(matches!(
            HttpTodoApi::new("todos.local"),
            Err(TransportError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        assert!(matches!(
            HttpTodoApi::new("ftp://todos.local"),
            Err(TransportError::InvalidBaseUrl(_))
        ));
    }
}
