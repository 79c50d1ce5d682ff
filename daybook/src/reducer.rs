//! Reconciliation of the day list with the todo service.
//!
//! Every user operation is a two-phase commit: the intent applies its
//! speculative change and describes the request, the outcome applies the
//! server's answer or the inverse of the speculative change. Nothing here
//! performs I/O; requests are returned as [`Effect`]s for the store to run.

use crate::reorder::{self, ReorderPlan};
use crate::types::{DayAction, DayState, PendingToggle, Rollup};
use chrono::NaiveDate;
use daybook_client::{
    OrderEntry, Subtask, SubtaskId, SubtaskPatch, Todo, TodoApi, TodoId, TransportError,
};
use daybook_core::environment::Clock;
use daybook_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

type Effects = SmallVec<[Effect<DayAction>; 4]>;

/// Dependencies of the day reducer
#[derive(Clone)]
pub struct DayEnvironment {
    /// Todo service
    pub api: Arc<dyn TodoApi>,
    /// Time source for sync timestamps and "today"
    pub clock: Arc<dyn Clock>,
}

impl DayEnvironment {
    /// Create an environment from its parts
    #[must_use]
    pub fn new(api: Arc<dyn TodoApi>, clock: Arc<dyn Clock>) -> Self {
        Self { api, clock }
    }
}

impl std::fmt::Debug for DayEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DayEnvironment").finish_non_exhaustive()
    }
}

/// Reducer keeping [`DayState`] consistent with the todo service
#[derive(Clone, Copy, Debug, Default)]
pub struct DayReducer;

impl DayReducer {
    /// Create a new reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    // ========== Loading ==========

    fn load(state: &mut DayState, date: NaiveDate, env: &DayEnvironment) -> Effects {
        state.is_loading = true;
        let generation = state.next_generation();
        tracing::debug!(%date, generation, "Loading day");

        let request = env.api.list_todos(Some(date));
        smallvec![Effect::task(async move {
            match request.await {
                Ok(todos) => DayAction::DayLoaded {
                    date,
                    generation,
                    todos,
                },
                Err(error) => DayAction::DayLoadFailed {
                    date,
                    generation,
                    error,
                },
            }
        })]
    }

    fn day_loaded(
        state: &mut DayState,
        date: NaiveDate,
        generation: u64,
        todos: Vec<Todo>,
        env: &DayEnvironment,
    ) {
        if !state.is_current_generation(generation) {
            tracing::debug!(%date, generation, current = state.generation(), "Discarding stale day");
            return;
        }

        state.todos = todos;
        state.sort();
        state.active_date = Some(date);
        state.is_loading = false;
        state.last_error = None;
        state.last_synced_at = Some(env.clock.now());

        let count = state.todos.len();
        if let Some(tracked) = state.counts.get_mut(&date) {
            *tracked = count;
        }

        if let Some(id) = state.selected {
            if state.todo(id).is_none() {
                tracing::debug!(todo_id = %id, "Selected todo is gone, clearing selection");
                state.selected = None;
            }
        }

        tracing::info!(%date, count, "Day loaded");
    }

    fn day_load_failed(state: &mut DayState, date: NaiveDate, generation: u64, error: &TransportError) {
        if !state.is_current_generation(generation) {
            tracing::debug!(%date, generation, "Discarding stale load failure");
            return;
        }

        state.is_loading = false;
        state.last_error = Some(error.to_string());
        tracing::warn!(%date, error = %error, "Failed to load day");
    }

    // ========== Todos ==========

    fn add_todo(state: &DayState, request_id: Uuid, text: String, env: &DayEnvironment) -> Effects {
        if text.trim().is_empty() {
            tracing::debug!("Ignoring todo with empty text");
            return SmallVec::new();
        }
        let Some(date) = state.active_date else {
            tracing::warn!("Cannot add a todo before a day is loaded");
            return SmallVec::new();
        };

        let request = env.api.create_todo(text, date);
        smallvec![Effect::task(async move {
            match request.await {
                Ok(todo) => DayAction::TodoCreated { request_id, todo },
                Err(error) => DayAction::TodoCreateFailed { request_id, error },
            }
        })]
    }

    fn todo_created(state: &mut DayState, todo: Todo, env: &DayEnvironment) {
        tracing::debug!(todo_id = %todo.id, date = %todo.date, "Todo created");

        if let Some(count) = state.counts.get_mut(&todo.date) {
            *count += 1;
        }

        // The user may have switched days while the request was in flight
        if state.active_date != Some(todo.date) || state.todo(todo.id).is_some() {
            return;
        }

        state.todos.push(todo);
        state.todos.sort_by_key(|t| t.order_index);
        state.last_synced_at = Some(env.clock.now());
    }

    fn toggle_todo(state: &mut DayState, id: TodoId, current: bool, env: &DayEnvironment) -> Effects {
        let Some(todo) = state.todo_mut(id) else {
            tracing::debug!(todo_id = %id, "Ignoring toggle of unknown todo");
            return SmallVec::new();
        };
        todo.completed = !current;
        // The user decides from here on
        if state.rollups.get(&id) == Some(&Rollup::Optimistic) {
            state.rollups.remove(&id);
        }

        let request = env.api.update_todo_completion(id, !current);
        smallvec![Effect::task(async move {
            match request.await {
                Ok(todo) => DayAction::TodoToggled { todo },
                Err(error) => DayAction::TodoToggleFailed { id, current, error },
            }
        })]
    }

    fn remove_todo(request_id: Uuid, id: TodoId, env: &DayEnvironment) -> Effects {
        let request = env.api.delete_todo(id);
        smallvec![Effect::task(async move {
            match request.await {
                Ok(()) => DayAction::TodoRemoved { request_id, id },
                Err(error) => DayAction::TodoRemoveFailed {
                    request_id,
                    id,
                    error,
                },
            }
        })]
    }

    fn todo_removed(state: &mut DayState, id: TodoId) {
        if let Some(position) = state.todos.iter().position(|t| t.id == id) {
            let removed = state.todos.remove(position);
            if let Some(count) = state.counts.get_mut(&removed.date) {
                *count = count.saturating_sub(1);
            }
        }
        if state.selected == Some(id) {
            state.selected = None;
        }
        state.rollups.remove(&id);
        tracing::debug!(todo_id = %id, "Todo removed");
    }

    fn select_todo(state: &mut DayState, id: Option<TodoId>) {
        match id {
            Some(id) if state.todo(id).is_none() => {
                tracing::debug!(todo_id = %id, "Ignoring selection of unknown todo");
            },
            _ => state.selected = id,
        }
    }

    // ========== Subtasks ==========

    fn add_subtask(request_id: Uuid, todo_id: TodoId, text: String, env: &DayEnvironment) -> Effects {
        if text.trim().is_empty() {
            tracing::debug!(todo_id = %todo_id, "Ignoring subtask with empty text");
            return SmallVec::new();
        }

        let request = env.api.create_subtask(todo_id, text);
        smallvec![Effect::task(async move {
            match request.await {
                Ok(subtask) => DayAction::SubtaskCreated {
                    request_id,
                    todo_id,
                    subtask,
                },
                Err(error) => DayAction::SubtaskCreateFailed {
                    request_id,
                    todo_id,
                    error,
                },
            }
        })]
    }

    fn subtask_created(state: &mut DayState, todo_id: TodoId, subtask: Subtask) {
        let Some(todo) = state.todo_mut(todo_id) else {
            return;
        };
        if todo.subtask(subtask.id).is_none() {
            todo.subtasks_mut().push(subtask);
            todo.sort_subtasks();
        }
    }

    fn toggle_subtask(
        state: &mut DayState,
        todo_id: TodoId,
        subtask_id: SubtaskId,
        current: bool,
        env: &DayEnvironment,
    ) -> Effects {
        let Some(todo) = state.todo_mut(todo_id) else {
            tracing::debug!(todo_id = %todo_id, "Ignoring subtask toggle of unknown todo");
            return SmallVec::new();
        };
        let Some(subtask) = todo.subtask_mut(subtask_id) else {
            tracing::debug!(todo_id = %todo_id, subtask_id = %subtask_id, "Ignoring toggle of unknown subtask");
            return SmallVec::new();
        };
        let shown = subtask.completed;
        subtask.completed = !current;

        state
            .pending_toggles
            .entry(subtask_id)
            .or_insert(PendingToggle {
                confirmed: shown,
                in_flight: 0,
            })
            .in_flight += 1;

        // Roll-up on the locally shown set
        Self::follow_shown_subtasks(state, todo_id);

        let request = env
            .api
            .update_subtask(todo_id, subtask_id, SubtaskPatch::completed(!current));
        smallvec![Effect::task(async move {
            match request.await {
                Ok(subtask) => DayAction::SubtaskToggled { todo_id, subtask },
                Err(error) => DayAction::SubtaskToggleFailed {
                    todo_id,
                    subtask_id,
                    current,
                    error,
                },
            }
        })]
    }

    /// Count one toggle of `subtask_id` as answered
    ///
    /// Returns true while other toggles of the same subtask are in flight.
    fn settle_toggle(state: &mut DayState, subtask_id: SubtaskId, confirmed: Option<bool>) -> bool {
        let Some(pending) = state.pending_toggles.get_mut(&subtask_id) else {
            return false;
        };
        pending.in_flight = pending.in_flight.saturating_sub(1);
        if let Some(confirmed) = confirmed {
            pending.confirmed = confirmed;
        }
        if pending.in_flight > 0 {
            return true;
        }
        state.pending_toggles.remove(&subtask_id);
        false
    }

    /// Keep an optimistic roll-up in line with the subtasks shown
    ///
    /// Completes the parent when every shown subtask is completed and undoes a
    /// roll-up the server has not been asked for once that stops being true.
    /// A parent the server completed is never reopened.
    fn follow_shown_subtasks(state: &mut DayState, todo_id: TodoId) {
        let rollup = state.rollups.get(&todo_id).copied();
        let Some(todo) = state.todo_mut(todo_id) else {
            return;
        };
        let shows_all_completed = todo.all_subtasks_completed();

        match rollup {
            None if shows_all_completed && !todo.completed => {
                todo.completed = true;
                state.rollups.insert(todo_id, Rollup::Optimistic);
            },
            Some(Rollup::Optimistic) if !shows_all_completed => {
                todo.completed = false;
                state.rollups.remove(&todo_id);
            },
            _ => {},
        }
    }

    /// Ask the server to complete the parent once its confirmed subtasks allow it
    fn reconcile_rollup(state: &mut DayState, todo_id: TodoId, env: &DayEnvironment) -> Effects {
        if state.todo(todo_id).is_none() {
            state.rollups.remove(&todo_id);
            return SmallVec::new();
        }
        Self::follow_shown_subtasks(state, todo_id);

        if state.rollups.get(&todo_id) != Some(&Rollup::Optimistic)
            || !state.confirmed_all_subtasks_completed(todo_id)
        {
            return SmallVec::new();
        }

        state.rollups.insert(todo_id, Rollup::Sending);
        tracing::debug!(todo_id = %todo_id, "All subtasks completed, completing todo");

        let request = env.api.update_todo_completion(todo_id, true);
        smallvec![Effect::task(async move {
            match request.await {
                Ok(todo) => DayAction::RollupConfirmed { todo },
                Err(error) => DayAction::RollupFailed { todo_id, error },
            }
        })]
    }

    fn subtask_toggled(state: &mut DayState, todo_id: TodoId, subtask: Subtask, env: &DayEnvironment) -> Effects {
        let still_pending = Self::settle_toggle(state, subtask.id, Some(subtask.completed));
        let Some(todo) = state.todo_mut(todo_id) else {
            return SmallVec::new();
        };
        if still_pending {
            // A later toggle of the same subtask owns the shown flag
            let subtask_id = subtask.id;
            let shown = todo.subtask(subtask_id).map(|s| s.completed);
            merge_subtask(todo, subtask);
            if let (Some(local), Some(shown)) = (todo.subtask_mut(subtask_id), shown) {
                local.completed = shown;
            }
        } else {
            merge_subtask(todo, subtask);
        }

        Self::reconcile_rollup(state, todo_id, env)
    }

    fn rollup_confirmed(state: &mut DayState, todo: Todo, env: &DayEnvironment) {
        state.rollups.remove(&todo.id);
        let Some(local) = state.todo_mut(todo.id) else {
            return;
        };
        // Subtasks stay as merged by the subtask update
        let subtasks = local.subtasks.take();
        *local = todo;
        if subtasks.is_some() {
            local.subtasks = subtasks;
        }
        local.sort_subtasks();
        state.last_synced_at = Some(env.clock.now());
    }

    fn rollup_failed(state: &mut DayState, todo_id: TodoId) {
        state.rollups.remove(&todo_id);
        if let Some(todo) = state.todo_mut(todo_id) {
            todo.completed = false;
        }
    }

    fn subtask_toggle_failed(
        state: &mut DayState,
        todo_id: TodoId,
        subtask_id: SubtaskId,
        current: bool,
        env: &DayEnvironment,
    ) -> Effects {
        let confirmed = state
            .pending_toggles
            .get(&subtask_id)
            .map_or(current, |pending| pending.confirmed);
        if !Self::settle_toggle(state, subtask_id, None) {
            if let Some(subtask) = state.todo_mut(todo_id).and_then(|t| t.subtask_mut(subtask_id)) {
                subtask.completed = confirmed;
            }
        }

        Self::reconcile_rollup(state, todo_id, env)
    }

    fn edit_subtask(
        request_id: Uuid,
        todo_id: TodoId,
        subtask_id: SubtaskId,
        text: String,
        env: &DayEnvironment,
    ) -> Effects {
        if text.trim().is_empty() {
            tracing::debug!(todo_id = %todo_id, subtask_id = %subtask_id, "Ignoring empty subtask text");
            return SmallVec::new();
        }

        let request = env
            .api
            .update_subtask(todo_id, subtask_id, SubtaskPatch::text(text));
        smallvec![Effect::task(async move {
            match request.await {
                Ok(subtask) => DayAction::SubtaskEdited {
                    request_id,
                    todo_id,
                    subtask,
                },
                Err(error) => DayAction::SubtaskEditFailed {
                    request_id,
                    todo_id,
                    subtask_id,
                    error,
                },
            }
        })]
    }

    fn remove_subtask(
        request_id: Uuid,
        todo_id: TodoId,
        subtask_id: SubtaskId,
        env: &DayEnvironment,
    ) -> Effects {
        let request = env.api.delete_subtask(todo_id, subtask_id);
        smallvec![Effect::task(async move {
            match request.await {
                Ok(()) => DayAction::SubtaskRemoved {
                    request_id,
                    todo_id,
                    subtask_id,
                },
                Err(error) => DayAction::SubtaskRemoveFailed {
                    request_id,
                    todo_id,
                    subtask_id,
                    error,
                },
            }
        })]
    }

    fn subtask_removed(state: &mut DayState, todo_id: TodoId, subtask_id: SubtaskId) {
        if let Some(subtasks) = state.todo_mut(todo_id).and_then(|t| t.subtasks.as_mut()) {
            subtasks.retain(|s| s.id != subtask_id);
        }
    }

    // ========== Reordering ==========

    fn reorder_todos(state: &mut DayState, from: TodoId, to: TodoId, env: &DayEnvironment) -> Effects {
        let Some(ReorderPlan { previous, entries }) = reorder::move_item(&mut state.todos, from, to)
        else {
            tracing::debug!(from = %from, to = %to, "Reorder is a no-op");
            return SmallVec::new();
        };

        let request = env.api.reorder_todos(entries.clone());
        smallvec![Effect::task(async move {
            match request.await {
                Ok(()) => DayAction::TodosReordered { entries },
                Err(error) => DayAction::TodosReorderFailed { previous, error },
            }
        })]
    }

    fn reorder_subtasks(
        state: &mut DayState,
        todo_id: TodoId,
        from: SubtaskId,
        to: SubtaskId,
        env: &DayEnvironment,
    ) -> Effects {
        let plan = state
            .todo_mut(todo_id)
            .and_then(|t| t.subtasks.as_mut())
            .and_then(|subtasks| reorder::move_item(subtasks, from, to));
        let Some(ReorderPlan { previous, entries }) = plan else {
            tracing::debug!(todo_id = %todo_id, from = %from, to = %to, "Subtask reorder is a no-op");
            return SmallVec::new();
        };

        let request = env.api.reorder_subtasks(todo_id, entries.clone());
        smallvec![Effect::task(async move {
            match request.await {
                Ok(()) => DayAction::SubtasksReordered { todo_id, entries },
                Err(error) => DayAction::SubtasksReorderFailed {
                    todo_id,
                    previous,
                    error,
                },
            }
        })]
    }

    fn restore_subtask_order(state: &mut DayState, todo_id: TodoId, previous: &[OrderEntry<SubtaskId>]) {
        if let Some(subtasks) = state.todo_mut(todo_id).and_then(|t| t.subtasks.as_mut()) {
            reorder::restore(subtasks, previous);
        }
    }

    // ========== Week counts ==========

    fn load_counts(dates: Vec<NaiveDate>, env: &DayEnvironment) -> Effects {
        if dates.is_empty() {
            return SmallVec::new();
        }

        let requests: Vec<_> = dates.iter().map(|&date| env.api.list_todos(Some(date))).collect();
        smallvec![Effect::task(async move {
            match try_join_all(requests).await {
                Ok(lists) => DayAction::CountsLoaded {
                    counts: dates
                        .into_iter()
                        .zip(lists.iter().map(Vec::len))
                        .collect::<BTreeMap<_, _>>(),
                },
                Err(error) => DayAction::CountsLoadFailed { error },
            }
        })]
    }

    fn record_failure(state: &mut DayState, operation: &'static str, error: &TransportError) {
        tracing::warn!(operation, error = %error, "Request failed");
        state.last_error = Some(error.to_string());
    }
}

/// Replace a subtask by id with the server's copy
fn merge_subtask(todo: &mut Todo, subtask: Subtask) {
    if let Some(local) = todo.subtask_mut(subtask.id) {
        *local = subtask;
        todo.sort_subtasks();
    }
}

impl Reducer for DayReducer {
    type State = DayState;
    type Action = DayAction;
    type Environment = DayEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Loading ==========
            DayAction::LoadDay { date } => Self::load(state, date, env),

            DayAction::Refresh => match state.active_date {
                Some(date) => Self::load(state, date, env),
                None => {
                    tracing::debug!("Nothing to refresh, no day loaded");
                    SmallVec::new()
                },
            },

            DayAction::DayLoaded {
                date,
                generation,
                todos,
            } => {
                Self::day_loaded(state, date, generation, todos, env);
                SmallVec::new()
            },

            DayAction::DayLoadFailed {
                date,
                generation,
                error,
            } => {
                Self::day_load_failed(state, date, generation, &error);
                SmallVec::new()
            },

            // ========== Todos ==========
            DayAction::AddTodo { request_id, text } => Self::add_todo(state, request_id, text, env),

            DayAction::TodoCreated { todo, .. } => {
                Self::todo_created(state, todo, env);
                SmallVec::new()
            },

            DayAction::TodoCreateFailed { error, .. } => {
                Self::record_failure(state, "create_todo", &error);
                SmallVec::new()
            },

            DayAction::ToggleTodo { id, current } => Self::toggle_todo(state, id, current, env),

            DayAction::TodoToggled { todo } => {
                if let Some(local) = state.todo_mut(todo.id) {
                    local.absorb(todo);
                    state.last_synced_at = Some(env.clock.now());
                }
                SmallVec::new()
            },

            DayAction::TodoToggleFailed { id, current, error } => {
                if let Some(todo) = state.todo_mut(id) {
                    todo.completed = current;
                }
                Self::record_failure(state, "toggle_todo", &error);
                SmallVec::new()
            },

            DayAction::RemoveTodo { request_id, id } => Self::remove_todo(request_id, id, env),

            DayAction::TodoRemoved { id, .. } => {
                Self::todo_removed(state, id);
                SmallVec::new()
            },

            DayAction::TodoRemoveFailed { error, .. } => {
                Self::record_failure(state, "delete_todo", &error);
                SmallVec::new()
            },

            DayAction::SelectTodo { id } => {
                Self::select_todo(state, id);
                SmallVec::new()
            },

            // ========== Subtasks ==========
            DayAction::AddSubtask {
                request_id,
                todo_id,
                text,
            } => Self::add_subtask(request_id, todo_id, text, env),

            DayAction::SubtaskCreated {
                todo_id, subtask, ..
            } => {
                Self::subtask_created(state, todo_id, subtask);
                SmallVec::new()
            },

            DayAction::SubtaskCreateFailed { error, .. } => {
                Self::record_failure(state, "create_subtask", &error);
                SmallVec::new()
            },

            DayAction::ToggleSubtask {
                todo_id,
                subtask_id,
                current,
            } => Self::toggle_subtask(state, todo_id, subtask_id, current, env),

            DayAction::SubtaskToggled { todo_id, subtask } => {
                Self::subtask_toggled(state, todo_id, subtask, env)
            },

            DayAction::SubtaskToggleFailed {
                todo_id,
                subtask_id,
                current,
                error,
            } => {
                Self::record_failure(state, "toggle_subtask", &error);
                Self::subtask_toggle_failed(state, todo_id, subtask_id, current, env)
            },

            DayAction::RollupConfirmed { todo } => {
                Self::rollup_confirmed(state, todo, env);
                SmallVec::new()
            },

            DayAction::RollupFailed { todo_id, error } => {
                Self::rollup_failed(state, todo_id);
                Self::record_failure(state, "complete_todo", &error);
                SmallVec::new()
            },

            DayAction::EditSubtask {
                request_id,
                todo_id,
                subtask_id,
                text,
            } => Self::edit_subtask(request_id, todo_id, subtask_id, text, env),

            DayAction::SubtaskEdited {
                todo_id, subtask, ..
            } => {
                if let Some(todo) = state.todo_mut(todo_id) {
                    merge_subtask(todo, subtask);
                }
                SmallVec::new()
            },

            DayAction::SubtaskEditFailed { error, .. } => {
                Self::record_failure(state, "edit_subtask", &error);
                SmallVec::new()
            },

            DayAction::RemoveSubtask {
                request_id,
                todo_id,
                subtask_id,
            } => Self::remove_subtask(request_id, todo_id, subtask_id, env),

            DayAction::SubtaskRemoved {
                todo_id,
                subtask_id,
                ..
            } => {
                Self::subtask_removed(state, todo_id, subtask_id);
                SmallVec::new()
            },

            DayAction::SubtaskRemoveFailed { error, .. } => {
                Self::record_failure(state, "delete_subtask", &error);
                SmallVec::new()
            },

            // ========== Reordering ==========
            DayAction::ReorderTodos { from, to } => Self::reorder_todos(state, from, to, env),

            DayAction::TodosReordered { entries } => {
                tracing::debug!(count = entries.len(), "Todo order persisted");
                state.last_synced_at = Some(env.clock.now());
                SmallVec::new()
            },

            DayAction::TodosReorderFailed { previous, error } => {
                reorder::restore(&mut state.todos, &previous);
                Self::record_failure(state, "reorder_todos", &error);
                SmallVec::new()
            },

            DayAction::ReorderSubtasks { todo_id, from, to } => {
                Self::reorder_subtasks(state, todo_id, from, to, env)
            },

            DayAction::SubtasksReordered { todo_id, entries } => {
                tracing::debug!(todo_id = %todo_id, count = entries.len(), "Subtask order persisted");
                state.last_synced_at = Some(env.clock.now());
                SmallVec::new()
            },

            DayAction::SubtasksReorderFailed {
                todo_id,
                previous,
                error,
            } => {
                Self::restore_subtask_order(state, todo_id, &previous);
                Self::record_failure(state, "reorder_subtasks", &error);
                SmallVec::new()
            },

            // ========== Week counts ==========
            DayAction::LoadCounts { dates } => Self::load_counts(dates, env),

            DayAction::CountsLoaded { counts } => {
                tracing::debug!(days = counts.len(), "Counts loaded");
                state.counts = counts;
                SmallVec::new()
            },

            DayAction::CountsLoadFailed { error } => {
                Self::record_failure(state, "load_counts", &error);
                SmallVec::new()
            },
        }
    }
}
