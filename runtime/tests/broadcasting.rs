//! Integration tests for Store action broadcasting
//!
//! Covers the request-response pattern built on `send_and_wait_for`: callers
//! tag an intent with a correlation id and wait for the outcome echoing it.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use daybook_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use daybook_runtime::{Store, StoreConfig, StoreError};
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum TestAction {
    /// Ask the fake server something; it answers after `delay_ms`
    Request { id: u64, accept: bool, delay_ms: u64 },
    /// Server accepted the request
    Accepted { id: u64 },
    /// Server rejected the request
    Rejected { id: u64, reason: String },
    /// Follow-up request issued after an acceptance
    FollowUp { id: u64 },
    /// Follow-up completed
    FollowUpDone { id: u64 },
}

impl TestAction {
    fn answers(&self, request: u64) -> bool {
        matches!(
            self,
            Self::Accepted { id } | Self::Rejected { id, .. } if *id == request
        )
    }
}

#[derive(Debug, Clone, Default)]
struct TestState {
    accepted: Vec<u64>,
    rejected: Vec<u64>,
    followed_up: Vec<u64>,
}

#[derive(Clone)]
struct TestEnvironment;

#[derive(Clone)]
struct TestReducer;

impl Reducer for TestReducer {
    type State = TestState;
    type Action = TestAction;
    type Environment = TestEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TestAction::Request {
                id,
                accept,
                delay_ms,
            } => smallvec![Effect::task(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                if accept {
                    TestAction::Accepted { id }
                } else {
                    TestAction::Rejected {
                        id,
                        reason: "rejected".to_string(),
                    }
                }
            })],

            TestAction::Accepted { id } => {
                state.accepted.push(id);
                smallvec![Effect::task(async move { TestAction::FollowUp { id } })]
            },

            TestAction::Rejected { id, .. } => {
                state.rejected.push(id);
                SmallVec::new()
            },

            TestAction::FollowUp { id } => smallvec![Effect::task(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                TestAction::FollowUpDone { id }
            })],

            TestAction::FollowUpDone { id } => {
                state.followed_up.push(id);
                SmallVec::new()
            },
        }
    }
}

type TestStore = Store<TestState, TestAction, TestEnvironment, TestReducer>;

fn new_store() -> TestStore {
    Store::new(TestState::default(), TestReducer, TestEnvironment)
}

fn request(id: u64, accept: bool, delay_ms: u64) -> TestAction {
    TestAction::Request {
        id,
        accept,
        delay_ms,
    }
}

// ============================================================================
// Tests
// ============================================================================

/// The outcome carrying the caller's id is returned
#[tokio::test]
async fn test_outcome_is_matched_by_correlation_id() {
    let store = new_store();

    let outcome = store
        .send_and_wait_for(request(7, true, 5), |a| a.answers(7), Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(outcome, TestAction::Accepted { id: 7 });
}

/// When the outcome is returned its state change is already visible
#[tokio::test]
async fn test_outcome_is_applied_before_it_is_returned() {
    let store = new_store();

    store
        .send_and_wait_for(request(1, false, 0), |a| a.answers(1), Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(store.state(|s| s.rejected.clone()).await, vec![1]);
}

/// Overlapping requests each receive their own outcome, in any order
#[tokio::test]
async fn test_overlapping_requests_do_not_cross() {
    let store = new_store();

    let slow = tokio::spawn({
        let store = store.clone();
        async move {
            store
                .send_and_wait_for(request(1, true, 80), |a| a.answers(1), Duration::from_secs(1))
                .await
        }
    });
    let fast = tokio::spawn({
        let store = store.clone();
        async move {
            store
                .send_and_wait_for(request(2, false, 5), |a| a.answers(2), Duration::from_secs(1))
                .await
        }
    });

    assert!(matches!(fast.await.unwrap().unwrap(), TestAction::Rejected { id: 2, .. }));
    assert_eq!(slow.await.unwrap().unwrap(), TestAction::Accepted { id: 1 });
}

/// No matching outcome within the deadline is a timeout
#[tokio::test]
async fn test_missing_outcome_times_out() {
    let store = new_store();

    let result = store
        .send_and_wait_for(request(3, true, 200), |a| a.answers(3), Duration::from_millis(30))
        .await;

    assert_eq!(result.unwrap_err(), StoreError::Timeout);
}

/// Only actions produced by effects are broadcast, never the intent itself
#[tokio::test]
async fn test_intents_are_not_broadcast() {
    let store = new_store();
    let mut rx = store.subscribe_actions();

    let mut handle = store.send(request(4, true, 0)).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    let mut seen = Vec::new();
    while let Ok(action) = rx.try_recv() {
        seen.push(action);
    }
    assert_eq!(
        seen,
        vec![
            TestAction::Accepted { id: 4 },
            TestAction::FollowUp { id: 4 },
            TestAction::FollowUpDone { id: 4 },
        ]
    );
}

/// The handle of the intent covers follow-ups triggered by its outcome
#[tokio::test]
async fn test_handle_covers_follow_ups() {
    let store = new_store();

    let mut handle = store.send(request(5, true, 10)).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    assert_eq!(store.state(|s| s.followed_up.clone()).await, vec![5]);
    assert_eq!(store.pending_effects(), 0);
}

/// A slow observer loses old actions but later requests still resolve
#[tokio::test]
async fn test_lagging_observer_does_not_block_requests() {
    let store: TestStore = Store::with_config(
        TestState::default(),
        TestReducer,
        TestEnvironment,
        StoreConfig::default().with_broadcast_capacity(2),
    );
    let mut idle = store.subscribe_actions();

    for id in 0..4 {
        store
            .send_and_wait_for(request(id, true, 0), move |a| a.answers(id), Duration::from_secs(1))
            .await
            .unwrap();
    }

    assert!(matches!(
        idle.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_))
    ));
}

/// After shutdown no request is accepted
#[tokio::test]
async fn test_requests_rejected_after_shutdown() {
    let store = new_store();
    store.shutdown(Duration::from_secs(1)).await.unwrap();

    let result = store
        .send_and_wait_for(request(9, true, 0), |a| a.answers(9), Duration::from_secs(1))
        .await;

    assert_eq!(result.unwrap_err(), StoreError::ShutdownInProgress);
}

/// Shutdown waits for requests already in flight
#[tokio::test]
async fn test_shutdown_drains_in_flight_requests() {
    let store = new_store();
    let mut rx = store.subscribe_actions();
    store.send(request(6, true, 30)).await.unwrap();

    store.shutdown(Duration::from_secs(1)).await.unwrap();

    assert_eq!(store.pending_effects(), 0);
    // Outcomes arriving once shutdown has begun are dropped, unseen
    assert!(store.state(|s| s.accepted.is_empty()).await);
    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}
