//! Async facade over the day store.
//!
//! The view layer talks to a [`Planner`] instead of the store. Optimistic
//! operations return once their whole cascade has settled; pessimistic ones
//! wait for the outcome answering their correlation id and hand the server's
//! entity (or error) back to the caller.

use crate::config::Config;
use crate::error::PlannerError;
use crate::reducer::{DayEnvironment, DayReducer};
use crate::types::{DayAction, DayState};
use chrono::NaiveDate;
use daybook_client::{HttpTodoApi, Subtask, SubtaskId, Todo, TodoApi, TodoId};
use daybook_core::environment::{Clock, SystemClock};
use daybook_runtime::Store;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Store specialised to the day planner
pub type DayStore = Store<DayState, DayAction, DayEnvironment, DayReducer>;

/// Entry point for the view layer
#[derive(Clone)]
pub struct Planner {
    store: DayStore,
    clock: Arc<dyn Clock>,
    outcome_timeout: Duration,
}

impl Planner {
    /// Build a planner over an arbitrary todo service and clock
    #[must_use]
    pub fn new(api: Arc<dyn TodoApi>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        let env = DayEnvironment::new(api, Arc::clone(&clock));
        let store = Store::with_config(DayState::new(), DayReducer::new(), env, config.store_config());

        Self {
            store,
            clock,
            outcome_timeout: config.outcome_timeout(),
        }
    }

    /// Build a planner talking HTTP to the configured service
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Transport`] if the base URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self, PlannerError> {
        let api = HttpTodoApi::from_config(&config.client_config())?;
        tracing::info!(base_url = api.base_url(), "Using todo service");
        Ok(Self::new(Arc::new(api), Arc::new(SystemClock), config))
    }

    /// The underlying store, for observers
    #[must_use]
    pub const fn store(&self) -> &DayStore {
        &self.store
    }

    // ========== Loading ==========

    /// Fetch a day and make it the active one
    ///
    /// A failed fetch is not an error: the previous list stays and the
    /// failure is recorded in [`DayState::last_error`].
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Store`] if the store is shutting down or the
    /// fetch does not settle within the outcome timeout.
    pub async fn load(&self, date: NaiveDate) -> Result<(), PlannerError> {
        self.settle(DayAction::LoadDay { date }).await
    }

    /// Re-fetch the active day, if any
    ///
    /// # Errors
    ///
    /// Same as [`Planner::load`].
    pub async fn refresh(&self) -> Result<(), PlannerError> {
        self.settle(DayAction::Refresh).await
    }

    /// Fetch todo counts for the given days
    ///
    /// # Errors
    ///
    /// Same as [`Planner::load`].
    pub async fn load_counts(&self, dates: Vec<NaiveDate>) -> Result<(), PlannerError> {
        self.settle(DayAction::LoadCounts { dates }).await
    }

    // ========== Todos ==========

    /// Create a todo on the active day
    ///
    /// Returns `Ok(None)` without contacting the service when `text` is blank.
    ///
    /// # Errors
    ///
    /// - [`PlannerError::NoActiveDate`] if no day has been loaded
    /// - [`PlannerError::Transport`] if the service rejected the request
    /// - [`PlannerError::Store`] if no outcome arrived in time
    pub async fn add_todo(&self, text: &str) -> Result<Option<Todo>, PlannerError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        if self.store.state(|s| s.active_date).await.is_none() {
            return Err(PlannerError::NoActiveDate);
        }

        let request_id = Uuid::new_v4();
        let outcome = self
            .request(
                request_id,
                DayAction::AddTodo {
                    request_id,
                    text: text.to_string(),
                },
            )
            .await?;

        match outcome {
            DayAction::TodoCreated { todo, .. } => Ok(Some(todo)),
            DayAction::TodoCreateFailed { error, .. } => Err(error.into()),
            other => Err(PlannerError::UnexpectedOutcome(other.name())),
        }
    }

    /// Flip a todo's completion
    ///
    /// Unknown ids are ignored. A rejected update is rolled back, not
    /// reported.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Store`] if the store is shutting down or the
    /// update does not settle in time.
    pub async fn toggle_todo(&self, id: TodoId) -> Result<(), PlannerError> {
        let Some(current) = self.store.state(|s| s.todo(id).map(|t| t.completed)).await else {
            tracing::debug!(todo_id = %id, "Ignoring toggle of unknown todo");
            return Ok(());
        };
        self.settle(DayAction::ToggleTodo { id, current }).await
    }

    /// Delete a todo once the service agrees
    ///
    /// Returns `Ok(false)` without contacting the service when the todo is
    /// not in the current list.
    ///
    /// # Errors
    ///
    /// - [`PlannerError::Transport`] if the service rejected the request
    /// - [`PlannerError::Store`] if no outcome arrived in time
    pub async fn remove_todo(&self, id: TodoId) -> Result<bool, PlannerError> {
        if self.store.state(|s| s.todo(id).is_none()).await {
            return Ok(false);
        }

        let request_id = Uuid::new_v4();
        match self.request(request_id, DayAction::RemoveTodo { request_id, id }).await? {
            DayAction::TodoRemoved { .. } => Ok(true),
            DayAction::TodoRemoveFailed { error, .. } => Err(error.into()),
            other => Err(PlannerError::UnexpectedOutcome(other.name())),
        }
    }

    /// Show a todo in the detail view, or clear the selection
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Store`] if the store is shutting down.
    pub async fn select_todo(&self, id: Option<TodoId>) -> Result<(), PlannerError> {
        self.store.send(DayAction::SelectTodo { id }).await?;
        Ok(())
    }

    // ========== Subtasks ==========

    /// Append a subtask to a todo
    ///
    /// Returns `Ok(None)` without contacting the service when `text` is blank.
    ///
    /// # Errors
    ///
    /// - [`PlannerError::Transport`] if the service rejected the request
    /// - [`PlannerError::Store`] if no outcome arrived in time
    pub async fn add_subtask(&self, todo_id: TodoId, text: &str) -> Result<Option<Subtask>, PlannerError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let request_id = Uuid::new_v4();
        let action = DayAction::AddSubtask {
            request_id,
            todo_id,
            text: text.to_string(),
        };
        match self.request(request_id, action).await? {
            DayAction::SubtaskCreated { subtask, .. } => Ok(Some(subtask)),
            DayAction::SubtaskCreateFailed { error, .. } => Err(error.into()),
            other => Err(PlannerError::UnexpectedOutcome(other.name())),
        }
    }

    /// Flip a subtask's completion, completing the parent when it was the
    /// last open one
    ///
    /// Returns after the roll-up request, if any, has settled too.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Store`] if the store is shutting down or the
    /// cascade does not settle in time.
    pub async fn toggle_subtask(&self, todo_id: TodoId, subtask_id: SubtaskId) -> Result<(), PlannerError> {
        let current = self
            .store
            .state(|s| s.todo(todo_id).and_then(|t| t.subtask(subtask_id)).map(|st| st.completed))
            .await;
        let Some(current) = current else {
            tracing::debug!(todo_id = %todo_id, subtask_id = %subtask_id, "Ignoring toggle of unknown subtask");
            return Ok(());
        };

        self.settle(DayAction::ToggleSubtask {
            todo_id,
            subtask_id,
            current,
        })
        .await
    }

    /// Change a subtask's text once the service agrees
    ///
    /// Returns `Ok(None)` without contacting the service when `text` is blank.
    ///
    /// # Errors
    ///
    /// - [`PlannerError::Transport`] if the service rejected the request
    /// - [`PlannerError::Store`] if no outcome arrived in time
    pub async fn edit_subtask(
        &self,
        todo_id: TodoId,
        subtask_id: SubtaskId,
        text: &str,
    ) -> Result<Option<Subtask>, PlannerError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let request_id = Uuid::new_v4();
        let action = DayAction::EditSubtask {
            request_id,
            todo_id,
            subtask_id,
            text: text.to_string(),
        };
        match self.request(request_id, action).await? {
            DayAction::SubtaskEdited { subtask, .. } => Ok(Some(subtask)),
            DayAction::SubtaskEditFailed { error, .. } => Err(error.into()),
            other => Err(PlannerError::UnexpectedOutcome(other.name())),
        }
    }

    /// Delete a subtask once the service agrees
    ///
    /// Returns `Ok(false)` without contacting the service when the subtask is
    /// not known locally.
    ///
    /// # Errors
    ///
    /// - [`PlannerError::Transport`] if the service rejected the request
    /// - [`PlannerError::Store`] if no outcome arrived in time
    pub async fn remove_subtask(&self, todo_id: TodoId, subtask_id: SubtaskId) -> Result<bool, PlannerError> {
        let known = self
            .store
            .state(|s| s.todo(todo_id).and_then(|t| t.subtask(subtask_id)).is_some())
            .await;
        if !known {
            return Ok(false);
        }

        let request_id = Uuid::new_v4();
        let action = DayAction::RemoveSubtask {
            request_id,
            todo_id,
            subtask_id,
        };
        match self.request(request_id, action).await? {
            DayAction::SubtaskRemoved { .. } => Ok(true),
            DayAction::SubtaskRemoveFailed { error, .. } => Err(error.into()),
            other => Err(PlannerError::UnexpectedOutcome(other.name())),
        }
    }

    // ========== Reordering ==========

    /// Drop todo `from` onto the position of todo `to`
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Store`] if the store is shutting down or the
    /// reorder does not settle in time.
    pub async fn reorder_todos(&self, from: TodoId, to: TodoId) -> Result<(), PlannerError> {
        self.settle(DayAction::ReorderTodos { from, to }).await
    }

    /// Drop subtask `from` onto the position of subtask `to` within one todo
    ///
    /// # Errors
    ///
    /// Same as [`Planner::reorder_todos`].
    pub async fn reorder_subtasks(
        &self,
        todo_id: TodoId,
        from: SubtaskId,
        to: SubtaskId,
    ) -> Result<(), PlannerError> {
        self.settle(DayAction::ReorderSubtasks { todo_id, from, to }).await
    }

    // ========== Reading ==========

    /// Copy of the current state
    pub async fn snapshot(&self) -> DayState {
        self.store.state(Clone::clone).await
    }

    /// The selected todo, resolved against the current list
    pub async fn selected_todo(&self) -> Option<Todo> {
        self.store.state(|s| s.selected_todo().cloned()).await
    }

    /// Today's date according to the planner's clock
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Stop accepting intents and wait for in-flight requests
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Store`] if requests are still running when the
    /// configured shutdown timeout expires.
    pub async fn shutdown(&self) -> Result<(), PlannerError> {
        self.store.shutdown(self.store.default_shutdown_timeout()).await?;
        Ok(())
    }

    /// Send an intent and wait until it and everything it triggered is done
    async fn settle(&self, action: DayAction) -> Result<(), PlannerError> {
        let mut handle = self.store.send(action).await?;
        handle.wait_with_timeout(self.outcome_timeout).await?;
        Ok(())
    }

    /// Send an intent and wait for the outcome carrying `request_id`
    async fn request(&self, request_id: Uuid, action: DayAction) -> Result<DayAction, PlannerError> {
        tracing::debug!(%request_id, action = action.name(), "Sending request");
        let outcome = self
            .store
            .send_and_wait_for(action, |a| a.answers(request_id), self.outcome_timeout)
            .await?;
        Ok(outcome)
    }
}

impl std::fmt::Debug for Planner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planner")
            .field("outcome_timeout", &self.outcome_timeout)
            .finish_non_exhaustive()
    }
}
