//! # Daybook Client
//!
//! Data model and remote store client for the Daybook todo service.
//!
//! The service exposes plain JSON CRUD endpoints for todos, their subtasks and
//! their ordering. [`TodoApi`] is the seam the synchronization core talks to;
//! [`HttpTodoApi`] is the production implementation over `reqwest`.
//!
//! ## Example
//!
//! ```no_run
//! use daybook_client::{HttpTodoApi, TodoApi};
//!
//! # async fn example() -> Result<(), daybook_client::TransportError> {
//! let api = HttpTodoApi::from_env()?;
//! let today = chrono::Local::now().date_naive();
//! let todos = api.list_todos(Some(today)).await?;
//! println!("{} todos today", todos.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use api::{ApiFuture, ApiResult, TodoApi};
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use error::TransportError;
pub use http::HttpTodoApi;
pub use types::{OrderEntry, Subtask, SubtaskId, SubtaskPatch, Todo, TodoId, TodoPatch};
