//! Daybook - a date-organized todo planner kept in sync with a remote service
//!
//! One calendar day of todos is held locally and shown immediately; every
//! change the user makes is reconciled with the todo service behind it.
//!
//! - **Optimistic updates**: completion toggles and reorders apply at once and
//!   are rolled back if the service rejects them
//! - **Pessimistic updates**: creates, edits and deletes wait for the service
//! - **Completion roll-up**: completing the last open subtask completes its todo
//! - **Stale-response guard**: only the most recent day load may land
//!
//! # Architecture
//!
//! ```text
//! View layer ──intent──▶ Planner ──send──▶ Store ──▶ DayReducer
//!                                                     │   (mutates DayState,
//!                                                     │    returns effects)
//!                                                     ▼
//!                                              TodoApi request
//!                                                     │
//!        outcome action (confirm or roll back) ◀──────┘
//! ```
//!
//! Each operation is a pair of actions: an *intent* that applies the
//! speculative change and describes the request, and an *outcome* that
//! either confirms the change with the server's copy or reverts it.
//!
//! # Usage
//!
//! ```ignore
//! let planner = Planner::from_config(&Config::from_env())?;
//! planner.load(planner.today()).await?;
//! if let Some(todo) = planner.add_todo("Water the plants").await? {
//!     planner.toggle_todo(todo.id).await?;
//! }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod planner;
pub mod reducer;
pub mod reorder;
pub mod types;

pub use config::Config;
pub use error::PlannerError;
pub use planner::{DayStore, Planner};
pub use reducer::{DayEnvironment, DayReducer};
pub use reorder::{ReorderPlan, move_item, restore};
pub use types::{DayAction, DayState, PendingToggle, Rollup, week_of};
