//! The remote store contract used by the synchronization core

use crate::error::TransportError;
use crate::types::{OrderEntry, Subtask, SubtaskId, SubtaskPatch, Todo, TodoId, TodoPatch};
use chrono::NaiveDate;
use std::future::Future;
use std::pin::Pin;

/// Result of a remote store call
pub type ApiResult<T> = Result<T, TransportError>;

/// Boxed future returned by every [`TodoApi`] call
pub type ApiFuture<T> = Pin<Box<dyn Future<Output = ApiResult<T>> + Send>>;

/// CRUD operations against the todo service
///
/// Implementations are stateless transports: every call either yields a
/// decoded payload or a [`TransportError`]. No retries, no caching and no
/// validation happen at this layer. Returned futures own everything they need,
/// so they can be moved into effects.
pub trait TodoApi: Send + Sync {
    /// List the todos of one day, or every todo when `date` is `None`
    fn list_todos(&self, date: Option<NaiveDate>) -> ApiFuture<Vec<Todo>>;

    /// Create a todo on `date`; the server assigns `id` and `order_index`
    fn create_todo(&self, text: String, date: NaiveDate) -> ApiFuture<Todo>;

    /// Apply a partial update to a todo
    fn update_todo(&self, id: TodoId, patch: TodoPatch) -> ApiFuture<Todo>;

    /// Delete a todo together with its subtasks
    fn delete_todo(&self, id: TodoId) -> ApiFuture<()>;

    /// Append a subtask to a todo
    fn create_subtask(&self, todo_id: TodoId, text: String) -> ApiFuture<Subtask>;

    /// Apply a partial update to a subtask
    fn update_subtask(
        &self,
        todo_id: TodoId,
        subtask_id: SubtaskId,
        patch: SubtaskPatch,
    ) -> ApiFuture<Subtask>;

    /// Delete a subtask
    fn delete_subtask(&self, todo_id: TodoId, subtask_id: SubtaskId) -> ApiFuture<()>;

    /// Persist a complete new ordering of todos
    fn reorder_todos(&self, entries: Vec<OrderEntry<TodoId>>) -> ApiFuture<()>;

    /// Persist a complete new ordering of one todo's subtasks
    fn reorder_subtasks(
        &self,
        todo_id: TodoId,
        entries: Vec<OrderEntry<SubtaskId>>,
    ) -> ApiFuture<()>;

    /// Set only the completion flag of a todo
    fn update_todo_completion(&self, id: TodoId, completed: bool) -> ApiFuture<Todo> {
        self.update_todo(id, TodoPatch::completed(completed))
    }
}
