//! # Daybook Testing
//!
//! Testing utilities and helpers for Daybook.
//!
//! This crate provides:
//! - Mock implementations of Environment traits
//! - [`InMemoryTodoApi`], a scriptable in-memory todo service
//! - Given/When/Then reducer tests and effect assertions
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```ignore
//! use daybook_testing::{test_clock, InMemoryTodoApi};
//!
//! #[tokio::test]
//! async fn test_add_todo() {
//!     let api = InMemoryTodoApi::new();
//!     let planner = Planner::new(Arc::new(api.clone()), Arc::new(test_clock()), config);
//!
//!     planner.load(date).await?;
//!     planner.add_todo("Water plants").await?;
//!
//!     assert_eq!(api.todos().len(), 1);
//! }
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use daybook_core::environment::Clock;

pub mod todo_api;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, NaiveDate, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible. `today()` is
    /// the UTC date of that time so it does not depend on the host time zone.
    ///
    /// # Example
    ///
    /// ```
    /// use daybook_testing::mocks::FixedClock;
    /// use daybook_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }

        fn today(&self) -> NaiveDate {
            self.time.date_naive()
        }
    }

    /// Create a default fixed clock for tests (2025-03-14 09:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-03-14T09:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Test helpers and utilities.
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Install a test-friendly tracing subscriber
    ///
    /// Output goes through the libtest capture, filtered by `RUST_LOG`
    /// (default `debug`). Safe to call from every test: only the first call
    /// installs the subscriber.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use chrono::NaiveDate;
    use daybook_client::{Subtask, SubtaskId, Todo, TodoId};
    use proptest::prelude::*;

    /// Non-decreasing `order_index` keys, one per step, with gaps and ties
    ///
    /// A step of 0 repeats the previous key, the way a backend that defaults
    /// the field does.
    fn keys(steps: Vec<i64>) -> Vec<i64> {
        steps
            .into_iter()
            .scan(0_i64, |key, step| {
                *key += step;
                Some(*key)
            })
            .collect()
    }

    /// A list of `len` todos on `date` with distinct ids, sorted by `order_index`
    ///
    /// Ids are shuffled relative to positions so that id order and display
    /// order disagree. Keys may repeat or skip values.
    pub fn todos_on(date: NaiveDate, len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<Todo>> {
        len.prop_flat_map(|n| {
            (
                Just((1..=n as i64).collect::<Vec<_>>()).prop_shuffle(),
                proptest::collection::vec(0_i64..3, n),
            )
        })
        .prop_map(move |(ids, steps)| {
            ids.into_iter()
                .zip(keys(steps))
                .map(|(id, order_index)| Todo {
                    id: TodoId::new(id),
                    text: format!("todo {id}"),
                    date,
                    completed: false,
                    order_index,
                    subtasks: None,
                })
                .collect()
        })
    }

    /// A subtask list of the given size with distinct ids and arbitrary completion
    ///
    /// Sorted by `order_index`; keys may repeat or skip values.
    pub fn subtasks(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<Subtask>> {
        proptest::collection::vec((any::<bool>(), 0_i64..3), len).prop_map(|drawn| {
            let (flags, steps): (Vec<_>, Vec<_>) = drawn.into_iter().unzip();
            flags
                .into_iter()
                .zip(keys(steps))
                .enumerate()
                .map(|(position, (completed, order_index))| Subtask {
                    id: SubtaskId::new(position as i64 + 100),
                    text: format!("step {position}"),
                    completed,
                    order_index,
                })
                .collect()
        })
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions, run_effects};
pub use todo_api::{ApiCall, InMemoryTodoApi, Operation};
