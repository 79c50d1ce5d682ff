//! In-memory todo service for fast, deterministic tests
//!
//! [`InMemoryTodoApi`] behaves like the real service (server-assigned ids,
//! append-at-end ordering, 404 for unknown entities) and adds knobs the real
//! one lacks: per-operation failure injection, latency injection and a log of
//! every call it received.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use chrono::NaiveDate;
use daybook_client::{
    ApiFuture, ApiResult, OrderEntry, Subtask, SubtaskId, SubtaskPatch, Todo, TodoApi, TodoId,
    TodoPatch, TransportError,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Kind of request, used to target failures and latency
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `GET /todos`
    ListTodos,
    /// `POST /todos`
    CreateTodo,
    /// `PATCH /todos/{id}`
    UpdateTodo,
    /// `DELETE /todos/{id}`
    DeleteTodo,
    /// `POST /todos/{id}/subtasks`
    CreateSubtask,
    /// `PATCH /todos/{id}/subtasks/{id}`
    UpdateSubtask,
    /// `DELETE /todos/{id}/subtasks/{id}`
    DeleteSubtask,
    /// `PUT /todos/reorder`
    ReorderTodos,
    /// `PUT /todos/{id}/subtasks/reorder`
    ReorderSubtasks,
}

/// A request as received by the fake service
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiCall {
    /// List todos, optionally filtered by date
    ListTodos(Option<NaiveDate>),
    /// Create a todo
    CreateTodo {
        /// Text
        text: String,
        /// Day
        date: NaiveDate,
    },
    /// Patch a todo
    UpdateTodo {
        /// Target
        id: TodoId,
        /// Changes
        patch: TodoPatch,
    },
    /// Delete a todo
    DeleteTodo(TodoId),
    /// Create a subtask
    CreateSubtask {
        /// Parent
        todo_id: TodoId,
        /// Text
        text: String,
    },
    /// Patch a subtask
    UpdateSubtask {
        /// Parent
        todo_id: TodoId,
        /// Target
        subtask_id: SubtaskId,
        /// Changes
        patch: SubtaskPatch,
    },
    /// Delete a subtask
    DeleteSubtask {
        /// Parent
        todo_id: TodoId,
        /// Target
        subtask_id: SubtaskId,
    },
    /// Persist a todo ordering
    ReorderTodos(Vec<OrderEntry<TodoId>>),
    /// Persist a subtask ordering
    ReorderSubtasks {
        /// Parent
        todo_id: TodoId,
        /// New ordering
        entries: Vec<OrderEntry<SubtaskId>>,
    },
}

impl ApiCall {
    /// The operation this call belongs to
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::ListTodos(_) => Operation::ListTodos,
            Self::CreateTodo { .. } => Operation::CreateTodo,
            Self::UpdateTodo { .. } => Operation::UpdateTodo,
            Self::DeleteTodo(_) => Operation::DeleteTodo,
            Self::CreateSubtask { .. } => Operation::CreateSubtask,
            Self::UpdateSubtask { .. } => Operation::UpdateSubtask,
            Self::DeleteSubtask { .. } => Operation::DeleteSubtask,
            Self::ReorderTodos(_) => Operation::ReorderTodos,
            Self::ReorderSubtasks { .. } => Operation::ReorderSubtasks,
        }
    }
}

#[derive(Debug)]
struct Failure {
    error: TransportError,
    /// `None` fails forever
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct Inner {
    todos: Vec<Todo>,
    last_todo_id: i64,
    last_subtask_id: i64,
    calls: Vec<ApiCall>,
    failures: HashMap<Operation, Failure>,
    latency: HashMap<Operation, Duration>,
    date_latency: HashMap<NaiveDate, Duration>,
    omit_subtasks: bool,
}

impl Inner {
    /// Log the call and decide how long to wait and whether to fail
    fn admit(&mut self, call: ApiCall) -> (Duration, Option<TransportError>) {
        let operation = call.operation();
        let mut delay = self.latency.get(&operation).copied().unwrap_or_default();
        if let ApiCall::ListTodos(Some(date)) = &call {
            delay += self.date_latency.get(date).copied().unwrap_or_default();
        }
        self.calls.push(call);

        let mut exhausted = false;
        let error = self.failures.get_mut(&operation).map(|failure| {
            if let Some(remaining) = failure.remaining.as_mut() {
                *remaining = remaining.saturating_sub(1);
                exhausted = *remaining == 0;
            }
            failure.error.clone()
        });
        if exhausted {
            self.failures.remove(&operation);
        }

        (delay, error)
    }

    fn todo_mut(&mut self, id: TodoId) -> ApiResult<&mut Todo> {
        self.todos
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found(&format!("todo {id}")))
    }

    fn respond(&self, todo: &Todo) -> Todo {
        let mut todo = todo.clone();
        if self.omit_subtasks {
            todo.subtasks = None;
        }
        todo
    }
}

fn not_found(what: &str) -> TransportError {
    TransportError::Status {
        status: 404,
        message: format!("{what} not found"),
    }
}

fn next_index(indices: impl Iterator<Item = i64>) -> i64 {
    indices.max().map_or(0, |max| max + 1)
}

/// In-memory todo service
///
/// Clones share the same data, so a test can keep one handle for inspection
/// while the code under test owns another.
///
/// # Example
///
/// ```
/// use daybook_testing::{InMemoryTodoApi, Operation};
/// use daybook_client::TodoApi;
/// use chrono::NaiveDate;
///
/// # async fn example() {
/// let api = InMemoryTodoApi::new();
/// let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
///
/// api.create_todo("Laundry".to_string(), date).await.unwrap();
/// api.fail_next(Operation::CreateTodo);
/// assert!(api.create_todo("Dishes".to_string(), date).await.is_err());
///
/// assert_eq!(api.todos().len(), 1);
/// assert_eq!(api.count(Operation::CreateTodo), 2);
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryTodoApi {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryTodoApi {
    /// Create an empty service
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service pre-populated with `todos`
    #[must_use]
    pub fn with_todos(todos: Vec<Todo>) -> Self {
        let api = Self::new();
        api.seed(todos);
        api
    }

    /// Add todos as if they had been created earlier
    ///
    /// Id counters move past the seeded ids so new entities never collide.
    pub fn seed(&self, todos: Vec<Todo>) {
        let mut inner = self.inner.lock().unwrap();
        for todo in todos {
            inner.last_todo_id = inner.last_todo_id.max(todo.id.get());
            let max_subtask = todo.subtasks().iter().map(|s| s.id.get()).max().unwrap_or(0);
            inner.last_subtask_id = inner.last_subtask_id.max(max_subtask);
            inner.todos.push(todo);
        }
    }

    /// Every stored todo, in storage order
    #[must_use]
    pub fn todos(&self) -> Vec<Todo> {
        self.inner.lock().unwrap().todos.clone()
    }

    /// A stored todo by id
    #[must_use]
    pub fn todo(&self, id: TodoId) -> Option<Todo> {
        self.inner
            .lock()
            .unwrap()
            .todos
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    /// Every call received so far, in arrival order
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Number of calls received for one operation
    #[must_use]
    pub fn count(&self, operation: Operation) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Forget the call log
    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    /// Fail every call of `operation` with a 500 until cleared
    pub fn fail(&self, operation: Operation) {
        self.fail_with(operation, injected_failure(), None);
    }

    /// Fail only the next call of `operation` with a 500
    pub fn fail_next(&self, operation: Operation) {
        self.fail_with(operation, injected_failure(), Some(1));
    }

    /// Fail `operation` with `error`, `times` times or forever when `None`
    pub fn fail_with(&self, operation: Operation, error: TransportError, times: Option<usize>) {
        if times == Some(0) {
            return;
        }
        self.inner.lock().unwrap().failures.insert(
            operation,
            Failure {
                error,
                remaining: times,
            },
        );
    }

    /// Remove every injected failure
    pub fn clear_failures(&self) {
        self.inner.lock().unwrap().failures.clear();
    }

    /// Delay every call of `operation`
    pub fn set_latency(&self, operation: Operation, delay: Duration) {
        self.inner.lock().unwrap().latency.insert(operation, delay);
    }

    /// Delay listing the todos of one specific day
    pub fn set_date_latency(&self, date: NaiveDate, delay: Duration) {
        self.inner.lock().unwrap().date_latency.insert(date, delay);
    }

    /// Answer todo updates without the `subtasks` field
    pub fn omit_subtasks_in_responses(&self, omit: bool) {
        self.inner.lock().unwrap().omit_subtasks = omit;
    }

    /// Shared entry for every request: log, wait, maybe fail, then answer
    fn request<T, F>(&self, call: ApiCall, answer: F) -> ApiFuture<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Inner) -> ApiResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let (delay, error) = inner.lock().unwrap().admit(call);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if let Some(error) = error {
                return Err(error);
            }
            let mut guard = inner.lock().unwrap();
            answer(&mut guard)
        })
    }
}

fn injected_failure() -> TransportError {
    TransportError::Status {
        status: 500,
        message: "injected failure".to_string(),
    }
}

impl TodoApi for InMemoryTodoApi {
    fn list_todos(&self, date: Option<NaiveDate>) -> ApiFuture<Vec<Todo>> {
        self.request(ApiCall::ListTodos(date), move |inner| {
            Ok(inner
                .todos
                .iter()
                .filter(|t| date.is_none_or(|d| t.date == d))
                .cloned()
                .collect())
        })
    }

    fn create_todo(&self, text: String, date: NaiveDate) -> ApiFuture<Todo> {
        let call = ApiCall::CreateTodo {
            text: text.clone(),
            date,
        };
        self.request(call, move |inner| {
            inner.last_todo_id += 1;
            let order_index = next_index(
                inner
                    .todos
                    .iter()
                    .filter(|t| t.date == date)
                    .map(|t| t.order_index),
            );
            let todo = Todo {
                id: TodoId::new(inner.last_todo_id),
                text,
                date,
                completed: false,
                order_index,
                subtasks: Some(Vec::new()),
            };
            inner.todos.push(todo.clone());
            Ok(todo)
        })
    }

    fn update_todo(&self, id: TodoId, patch: TodoPatch) -> ApiFuture<Todo> {
        let call = ApiCall::UpdateTodo {
            id,
            patch: patch.clone(),
        };
        self.request(call, move |inner| {
            let todo = inner.todo_mut(id)?;
            if let Some(completed) = patch.completed {
                todo.completed = completed;
            }
            let todo = todo.clone();
            Ok(inner.respond(&todo))
        })
    }

    fn delete_todo(&self, id: TodoId) -> ApiFuture<()> {
        self.request(ApiCall::DeleteTodo(id), move |inner| {
            let before = inner.todos.len();
            inner.todos.retain(|t| t.id != id);
            if inner.todos.len() == before {
                return Err(not_found(&format!("todo {id}")));
            }
            Ok(())
        })
    }

    fn create_subtask(&self, todo_id: TodoId, text: String) -> ApiFuture<Subtask> {
        let call = ApiCall::CreateSubtask {
            todo_id,
            text: text.clone(),
        };
        self.request(call, move |inner| {
            inner.last_subtask_id += 1;
            let id = SubtaskId::new(inner.last_subtask_id);
            let todo = inner.todo_mut(todo_id)?;
            let order_index = next_index(todo.subtasks().iter().map(|s| s.order_index));
            let subtask = Subtask {
                id,
                text,
                completed: false,
                order_index,
            };
            todo.subtasks_mut().push(subtask.clone());
            Ok(subtask)
        })
    }

    fn update_subtask(
        &self,
        todo_id: TodoId,
        subtask_id: SubtaskId,
        patch: SubtaskPatch,
    ) -> ApiFuture<Subtask> {
        let call = ApiCall::UpdateSubtask {
            todo_id,
            subtask_id,
            patch: patch.clone(),
        };
        self.request(call, move |inner| {
            let subtask = inner
                .todo_mut(todo_id)?
                .subtask_mut(subtask_id)
                .ok_or_else(|| not_found(&format!("subtask {subtask_id}")))?;
            if let Some(completed) = patch.completed {
                subtask.completed = completed;
            }
            if let Some(text) = patch.text {
                subtask.text = text;
            }
            Ok(subtask.clone())
        })
    }

    fn delete_subtask(&self, todo_id: TodoId, subtask_id: SubtaskId) -> ApiFuture<()> {
        let call = ApiCall::DeleteSubtask {
            todo_id,
            subtask_id,
        };
        self.request(call, move |inner| {
            let subtasks = inner.todo_mut(todo_id)?.subtasks_mut();
            let before = subtasks.len();
            subtasks.retain(|s| s.id != subtask_id);
            if subtasks.len() == before {
                return Err(not_found(&format!("subtask {subtask_id}")));
            }
            Ok(())
        })
    }

    fn reorder_todos(&self, entries: Vec<OrderEntry<TodoId>>) -> ApiFuture<()> {
        self.request(ApiCall::ReorderTodos(entries.clone()), move |inner| {
            for entry in entries {
                inner.todo_mut(entry.id)?.order_index = entry.order_index;
            }
            Ok(())
        })
    }

    fn reorder_subtasks(
        &self,
        todo_id: TodoId,
        entries: Vec<OrderEntry<SubtaskId>>,
    ) -> ApiFuture<()> {
        let call = ApiCall::ReorderSubtasks {
            todo_id,
            entries: entries.clone(),
        };
        self.request(call, move |inner| {
            let todo = inner.todo_mut(todo_id)?;
            for entry in entries {
                todo.subtask_mut(entry.id)
                    .ok_or_else(|| not_found(&format!("subtask {}", entry.id)))?
                    .order_index = entry.order_index;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[tokio::test]
    async fn assigns_ids_and_appends_order() {
        let api = InMemoryTodoApi::new();

        let first = api.create_todo("a".to_string(), day()).await.unwrap();
        let second = api.create_todo("b".to_string(), day()).await.unwrap();

        assert_eq!(first.id, TodoId::new(1));
        assert_eq!(second.id, TodoId::new(2));
        assert_eq!(second.order_index, first.order_index + 1);
    }

    #[tokio::test]
    async fn lists_only_the_requested_day() {
        let api = InMemoryTodoApi::new();
        let other = day().succ_opt().unwrap();
        api.create_todo("a".to_string(), day()).await.unwrap();
        api.create_todo("b".to_string(), other).await.unwrap();

        assert_eq!(api.list_todos(Some(other)).await.unwrap().len(), 1);
        assert_eq!(api.list_todos(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn fail_next_fails_once() {
        let api = InMemoryTodoApi::new();
        api.fail_next(Operation::ListTodos);

        assert!(api.list_todos(None).await.is_err());
        assert!(api.list_todos(None).await.is_ok());
        assert_eq!(api.count(Operation::ListTodos), 2);
    }

    #[tokio::test]
    async fn fail_with_counts_down() {
        let api = InMemoryTodoApi::new();
        api.fail_with(Operation::ListTodos, TransportError::RequestFailed("offline".into()), Some(2));

        assert!(api.list_todos(None).await.is_err());
        assert!(api.list_todos(None).await.is_err());
        assert!(api.list_todos(None).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_entities_are_not_found() {
        let api = InMemoryTodoApi::new();

        let err = api.delete_todo(TodoId::new(42)).await.unwrap_err();

        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn seeding_moves_id_counters() {
        let api = InMemoryTodoApi::with_todos(vec![Todo {
            id: TodoId::new(10),
            text: "seeded".to_string(),
            date: day(),
            completed: false,
            order_index: 4,
            subtasks: Some(vec![Subtask {
                id: SubtaskId::new(20),
                text: "step".to_string(),
                completed: false,
                order_index: 0,
            }]),
        }]);

        let todo = api.create_todo("new".to_string(), day()).await.unwrap();
        let subtask = api
            .create_subtask(TodoId::new(10), "next".to_string())
            .await
            .unwrap();

        assert_eq!(todo.id, TodoId::new(11));
        assert_eq!(todo.order_index, 5);
        assert_eq!(subtask.id, SubtaskId::new(21));
        assert_eq!(subtask.order_index, 1);
    }

    #[tokio::test]
    async fn reorder_rewrites_order_index() {
        let api = InMemoryTodoApi::new();
        let a = api.create_todo("a".to_string(), day()).await.unwrap();
        let b = api.create_todo("b".to_string(), day()).await.unwrap();

        api.reorder_todos(vec![OrderEntry::new(b.id, 0), OrderEntry::new(a.id, 1)])
            .await
            .unwrap();

        assert_eq!(api.todo(a.id).unwrap().order_index, 1);
        assert_eq!(api.todo(b.id).unwrap().order_index, 0);
    }
}
