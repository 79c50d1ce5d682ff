//! State and actions of the day planner.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use daybook_client::{OrderEntry, Subtask, SubtaskId, Todo, TodoId, TransportError};
use daybook_macros::{Action, State};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Client-side working copy of one day of todos.
///
/// Only one day is live at a time. Switching days replaces `todos` wholesale
/// once the new day has been fetched; nothing is merged across dates.
#[derive(State, Clone, Debug, Default, PartialEq)]
pub struct DayState {
    /// Day the list belongs to, set once a load succeeds
    pub active_date: Option<NaiveDate>,
    /// Todos of `active_date`, in display order
    pub todos: Vec<Todo>,
    /// Id of the todo shown in the detail view
    pub selected: Option<TodoId>,
    /// A load request is outstanding
    pub is_loading: bool,
    /// Token of the latest load request; older responses are stale
    #[generation]
    pub load_generation: u64,
    /// Number of todos per day for the week overview
    pub counts: BTreeMap<NaiveDate, usize>,
    /// Most recent failure, for display
    pub last_error: Option<String>,
    /// When the list last matched the server
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Subtasks with toggle requests the server has not answered yet
    pub pending_toggles: BTreeMap<SubtaskId, PendingToggle>,
    /// Parents completed by roll-up before the server agreed
    pub rollups: BTreeMap<TodoId, Rollup>,
}

/// Toggles of one subtask still in flight
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingToggle {
    /// Completion the server last confirmed
    pub confirmed: bool,
    /// Requests not yet answered
    pub in_flight: u32,
}

/// Progress of a completion roll-up on a parent todo
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rollup {
    /// Completed locally because every subtask shows completed
    Optimistic,
    /// The confirmed subtasks are all completed and the update is in flight
    Sending,
}

impl DayState {
    /// Create an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a todo of the active day
    #[must_use]
    pub fn todo(&self, id: TodoId) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    /// Look up a todo of the active day for mutation
    pub fn todo_mut(&mut self, id: TodoId) -> Option<&mut Todo> {
        self.todos.iter_mut().find(|t| t.id == id)
    }

    /// The selected todo, resolved against the live list
    ///
    /// Always reflects the latest confirmed or optimistic state of the entity.
    #[must_use]
    pub fn selected_todo(&self) -> Option<&Todo> {
        self.selected.and_then(|id| self.todo(id))
    }

    /// Whether the subtasks of `id` are all completed as far as the server knows
    ///
    /// Subtasks with toggles in flight count with their last confirmed
    /// completion rather than the optimistic one shown.
    #[must_use]
    pub fn confirmed_all_subtasks_completed(&self, id: TodoId) -> bool {
        let Some(todo) = self.todo(id) else {
            return false;
        };
        let subtasks = todo.subtasks();
        !subtasks.is_empty()
            && subtasks.iter().all(|s| {
                self.pending_toggles
                    .get(&s.id)
                    .map_or(s.completed, |pending| pending.confirmed)
            })
    }

    /// Ids of the todos in display order
    #[must_use]
    pub fn todo_ids(&self) -> Vec<TodoId> {
        self.todos.iter().map(|t| t.id).collect()
    }

    /// Sort todos and their subtasks by `order_index`, ties keeping their order
    pub fn sort(&mut self) {
        self.todos.sort_by_key(|t| t.order_index);
        for todo in &mut self.todos {
            todo.sort_subtasks();
        }
    }
}

/// The seven days (Monday first) of the week containing `date`
#[must_use]
pub fn week_of(date: NaiveDate) -> Vec<NaiveDate> {
    let offset = u64::from(date.weekday().num_days_from_monday());
    let Some(monday) = date.checked_sub_days(Days::new(offset)) else {
        return vec![date];
    };
    monday.iter_days().take(7).collect()
}

/// Every input the planner reducer understands.
///
/// User-facing operations come in pairs: an `#[intent]` that applies the
/// optimistic change and issues the request, and `#[outcome]`s that confirm or
/// roll back once the server has answered. Operations whose result is handed
/// back to the caller carry a `request_id` for correlation.
#[derive(Action, Clone, Debug, PartialEq)]
pub enum DayAction {
    // ========== Loading ==========
    /// Fetch the todos of `date` and make it the active day
    #[intent]
    LoadDay {
        /// Day to show
        date: NaiveDate,
    },

    /// Reload the active day
    #[intent]
    Refresh,

    /// The server returned the todos of a day
    #[outcome]
    DayLoaded {
        /// Requested day
        date: NaiveDate,
        /// Load token the request was issued under
        generation: u64,
        /// Todos as returned by the server
        todos: Vec<Todo>,
    },

    /// Fetching a day failed
    #[outcome]
    DayLoadFailed {
        /// Requested day
        date: NaiveDate,
        /// Load token the request was issued under
        generation: u64,
        /// Cause
        error: TransportError,
    },

    // ========== Todos ==========
    /// Create a todo on the active day
    #[intent]
    AddTodo {
        /// Correlation id
        request_id: Uuid,
        /// Todo text
        text: String,
    },

    /// The server created a todo
    #[outcome]
    TodoCreated {
        /// Correlation id
        request_id: Uuid,
        /// Created todo
        todo: Todo,
    },

    /// Creating a todo failed
    #[outcome]
    TodoCreateFailed {
        /// Correlation id
        request_id: Uuid,
        /// Cause
        error: TransportError,
    },

    /// Flip the completion of a todo
    #[intent]
    ToggleTodo {
        /// Target
        id: TodoId,
        /// Completion as the user saw it before toggling
        current: bool,
    },

    /// The server confirmed a todo toggle
    #[outcome]
    TodoToggled {
        /// Authoritative todo
        todo: Todo,
    },

    /// Toggling a todo failed
    #[outcome]
    TodoToggleFailed {
        /// Target
        id: TodoId,
        /// Completion to restore
        current: bool,
        /// Cause
        error: TransportError,
    },

    /// Delete a todo
    #[intent]
    RemoveTodo {
        /// Correlation id
        request_id: Uuid,
        /// Target
        id: TodoId,
    },

    /// The server deleted a todo
    #[outcome]
    TodoRemoved {
        /// Correlation id
        request_id: Uuid,
        /// Deleted todo
        id: TodoId,
    },

    /// Deleting a todo failed
    #[outcome]
    TodoRemoveFailed {
        /// Correlation id
        request_id: Uuid,
        /// Target
        id: TodoId,
        /// Cause
        error: TransportError,
    },

    /// Show a todo in the detail view, or close it
    #[intent]
    SelectTodo {
        /// Todo to show
        id: Option<TodoId>,
    },

    // ========== Subtasks ==========
    /// Append a subtask to a todo
    #[intent]
    AddSubtask {
        /// Correlation id
        request_id: Uuid,
        /// Parent
        todo_id: TodoId,
        /// Subtask text
        text: String,
    },

    /// The server created a subtask
    #[outcome]
    SubtaskCreated {
        /// Correlation id
        request_id: Uuid,
        /// Parent
        todo_id: TodoId,
        /// Created subtask
        subtask: Subtask,
    },

    /// Creating a subtask failed
    #[outcome]
    SubtaskCreateFailed {
        /// Correlation id
        request_id: Uuid,
        /// Parent
        todo_id: TodoId,
        /// Cause
        error: TransportError,
    },

    /// Flip the completion of a subtask
    #[intent]
    ToggleSubtask {
        /// Parent
        todo_id: TodoId,
        /// Target
        subtask_id: SubtaskId,
        /// Completion as the user saw it before toggling
        current: bool,
    },

    /// The server confirmed a subtask toggle
    #[outcome]
    SubtaskToggled {
        /// Parent
        todo_id: TodoId,
        /// Authoritative subtask
        subtask: Subtask,
    },

    /// Toggling a subtask failed
    #[outcome]
    SubtaskToggleFailed {
        /// Parent
        todo_id: TodoId,
        /// Target
        subtask_id: SubtaskId,
        /// Completion to restore
        current: bool,
        /// Cause
        error: TransportError,
    },

    /// The server completed a parent whose subtasks are all done
    #[outcome]
    RollupConfirmed {
        /// Authoritative parent
        todo: Todo,
    },

    /// Completing the parent failed
    #[outcome]
    RollupFailed {
        /// Parent
        todo_id: TodoId,
        /// Cause
        error: TransportError,
    },

    /// Change the text of a subtask
    #[intent]
    EditSubtask {
        /// Correlation id
        request_id: Uuid,
        /// Parent
        todo_id: TodoId,
        /// Target
        subtask_id: SubtaskId,
        /// New text
        text: String,
    },

    /// The server updated a subtask's text
    #[outcome]
    SubtaskEdited {
        /// Correlation id
        request_id: Uuid,
        /// Parent
        todo_id: TodoId,
        /// Authoritative subtask
        subtask: Subtask,
    },

    /// Editing a subtask failed
    #[outcome]
    SubtaskEditFailed {
        /// Correlation id
        request_id: Uuid,
        /// Parent
        todo_id: TodoId,
        /// Target
        subtask_id: SubtaskId,
        /// Cause
        error: TransportError,
    },

    /// Delete a subtask
    #[intent]
    RemoveSubtask {
        /// Correlation id
        request_id: Uuid,
        /// Parent
        todo_id: TodoId,
        /// Target
        subtask_id: SubtaskId,
    },

    /// The server deleted a subtask
    #[outcome]
    SubtaskRemoved {
        /// Correlation id
        request_id: Uuid,
        /// Parent
        todo_id: TodoId,
        /// Deleted subtask
        subtask_id: SubtaskId,
    },

    /// Deleting a subtask failed
    #[outcome]
    SubtaskRemoveFailed {
        /// Correlation id
        request_id: Uuid,
        /// Parent
        todo_id: TodoId,
        /// Target
        subtask_id: SubtaskId,
        /// Cause
        error: TransportError,
    },

    // ========== Reordering ==========
    /// Drop the todo `from` onto the position of the todo `to`
    #[intent]
    ReorderTodos {
        /// Dragged todo
        from: TodoId,
        /// Todo it was dropped onto
        to: TodoId,
    },

    /// The server stored the new todo order
    #[outcome]
    TodosReordered {
        /// Persisted order
        entries: Vec<OrderEntry<TodoId>>,
    },

    /// Persisting the todo order failed
    #[outcome]
    TodosReorderFailed {
        /// Order to restore
        previous: Vec<OrderEntry<TodoId>>,
        /// Cause
        error: TransportError,
    },

    /// Drop the subtask `from` onto the position of the subtask `to`
    #[intent]
    ReorderSubtasks {
        /// Parent
        todo_id: TodoId,
        /// Dragged subtask
        from: SubtaskId,
        /// Subtask it was dropped onto
        to: SubtaskId,
    },

    /// The server stored the new subtask order
    #[outcome]
    SubtasksReordered {
        /// Parent
        todo_id: TodoId,
        /// Persisted order
        entries: Vec<OrderEntry<SubtaskId>>,
    },

    /// Persisting the subtask order failed
    #[outcome]
    SubtasksReorderFailed {
        /// Parent
        todo_id: TodoId,
        /// Order to restore
        previous: Vec<OrderEntry<SubtaskId>>,
        /// Cause
        error: TransportError,
    },

    // ========== Week counts ==========
    /// Count the todos of several days
    #[intent]
    LoadCounts {
        /// Days to count
        dates: Vec<NaiveDate>,
    },

    /// The server returned the todos of every requested day
    #[outcome]
    CountsLoaded {
        /// Todos per day
        counts: BTreeMap<NaiveDate, usize>,
    },

    /// Counting failed for at least one day
    #[outcome]
    CountsLoadFailed {
        /// Cause
        error: TransportError,
    },
}

impl DayAction {
    /// Correlation id of request/response actions
    #[must_use]
    pub const fn request_id(&self) -> Option<Uuid> {
        match self {
            Self::AddTodo { request_id, .. }
            | Self::TodoCreated { request_id, .. }
            | Self::TodoCreateFailed { request_id, .. }
            | Self::RemoveTodo { request_id, .. }
            | Self::TodoRemoved { request_id, .. }
            | Self::TodoRemoveFailed { request_id, .. }
            | Self::AddSubtask { request_id, .. }
            | Self::SubtaskCreated { request_id, .. }
            | Self::SubtaskCreateFailed { request_id, .. }
            | Self::EditSubtask { request_id, .. }
            | Self::SubtaskEdited { request_id, .. }
            | Self::SubtaskEditFailed { request_id, .. }
            | Self::RemoveSubtask { request_id, .. }
            | Self::SubtaskRemoved { request_id, .. }
            | Self::SubtaskRemoveFailed { request_id, .. } => Some(*request_id),
            _ => None,
        }
    }

    /// True for the outcome answering the request `request_id`
    #[must_use]
    pub fn answers(&self, request_id: Uuid) -> bool {
        self.is_outcome() && self.request_id() == Some(request_id)
    }
}
