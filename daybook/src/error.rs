//! Errors surfaced to callers of the [`crate::Planner`].

use daybook_client::TransportError;
use daybook_runtime::StoreError;
use thiserror::Error;

/// Errors returned by planner operations
///
/// Load failures and failed optimistic updates never show up here: they are
/// rolled back, logged and recorded in `DayState::last_error`. Operations
/// that only change state after the server agreed (create, edit, delete)
/// report their transport failure to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlannerError {
    /// The todo service rejected or never answered the request
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The store refused the action or the outcome did not arrive in time
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A todo can only be created once a day has been loaded
    #[error("No active date: load a day before adding todos")]
    NoActiveDate,

    /// The request was answered by an action of the wrong kind
    #[error("Unexpected outcome: {0}")]
    UnexpectedOutcome(&'static str),
}
