//! Wire and domain types shared by the client and the synchronization core

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned identifier of a todo
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(i64);

impl TodoId {
    /// Creates a `TodoId` from its raw value
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-assigned identifier of a subtask, unique within its parent todo
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubtaskId(i64);

impl SubtaskId {
    /// Creates a `SubtaskId` from its raw value
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SubtaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered child step of a [`Todo`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    /// Identifier within the parent
    pub id: SubtaskId,
    /// Display text
    pub text: String,
    /// Whether the step is done
    pub completed: bool,
    /// Position among siblings (ascending)
    pub order_index: i64,
}

/// A task belonging to one calendar day
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Server-assigned identifier
    pub id: TodoId,
    /// Display text
    pub text: String,
    /// Calendar day, `YYYY-MM-DD` on the wire
    pub date: NaiveDate,
    /// Whether the todo is done
    pub completed: bool,
    /// Position among the todos of the same date (ascending)
    pub order_index: i64,
    /// Ordered sub-steps; `None` when the server omitted them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<Subtask>>,
}

impl Todo {
    /// Subtasks as a slice, empty when absent
    #[must_use]
    pub fn subtasks(&self) -> &[Subtask] {
        self.subtasks.as_deref().unwrap_or_default()
    }

    /// Mutable subtask collection, created empty if absent
    pub fn subtasks_mut(&mut self) -> &mut Vec<Subtask> {
        self.subtasks.get_or_insert_with(Vec::new)
    }

    /// Looks up a subtask by id
    #[must_use]
    pub fn subtask(&self, id: SubtaskId) -> Option<&Subtask> {
        self.subtasks().iter().find(|s| s.id == id)
    }

    /// Looks up a subtask by id for mutation
    pub fn subtask_mut(&mut self, id: SubtaskId) -> Option<&mut Subtask> {
        self.subtasks.as_mut()?.iter_mut().find(|s| s.id == id)
    }

    /// True when the todo has at least one subtask and every one is completed
    #[must_use]
    pub fn all_subtasks_completed(&self) -> bool {
        let subtasks = self.subtasks();
        !subtasks.is_empty() && subtasks.iter().all(|s| s.completed)
    }

    /// Sorts subtasks by `order_index`, keeping ties in their current order
    pub fn sort_subtasks(&mut self) {
        if let Some(subtasks) = self.subtasks.as_mut() {
            subtasks.sort_by_key(|s| s.order_index);
        }
    }

    /// Replaces this todo with the server's copy
    ///
    /// The server is authoritative for every field it returns. Subtasks the
    /// response omitted are kept from the local copy.
    pub fn absorb(&mut self, server: Todo) {
        let local_subtasks = self.subtasks.take();
        *self = server;
        if self.subtasks.is_none() {
            self.subtasks = local_subtasks;
        }
        self.sort_subtasks();
    }
}

/// Typed partial update of a todo
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPatch {
    /// New completion flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    /// Patch setting only the completion flag
    #[must_use]
    pub const fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
        }
    }
}

/// Typed partial update of a subtask
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskPatch {
    /// New completion flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// New display text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl SubtaskPatch {
    /// Patch setting only the completion flag
    #[must_use]
    pub const fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            text: None,
        }
    }

    /// Patch setting only the text
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            completed: None,
            text: Some(text.into()),
        }
    }
}

/// One element of a reorder request: an entity and its new position
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEntry<I> {
    /// Entity identifier
    pub id: I,
    /// New position
    pub order_index: i64,
}

impl<I> OrderEntry<I> {
    /// Creates an order entry
    #[must_use]
    pub const fn new(id: I, order_index: i64) -> Self {
        Self { id, order_index }
    }
}
