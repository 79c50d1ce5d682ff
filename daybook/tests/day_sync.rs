//! Planner integration tests: loading, todos, selection and week counts
//!
//! Drives the full store against the in-memory todo service.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::NaiveDate;
use daybook::{Config, DayAction, Planner, PlannerError, week_of};
use daybook_client::{Todo, TodoId, TransportError};
use daybook_testing::{InMemoryTodoApi, Operation, helpers::init_tracing, test_clock};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Fixtures
// ============================================================================

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
}

fn todo(id: i64, date: NaiveDate) -> Todo {
    Todo {
        id: TodoId::new(id),
        text: format!("todo {id}"),
        date,
        completed: false,
        order_index: id,
        subtasks: Some(vec![]),
    }
}

fn planner(api: &InMemoryTodoApi) -> Planner {
    init_tracing();
    Planner::new(Arc::new(api.clone()), Arc::new(test_clock()), &Config::default())
}

async fn loaded(api: &InMemoryTodoApi) -> Planner {
    let planner = planner(api);
    planner.load(day()).await.unwrap();
    planner
}

fn ids(todos: &[Todo]) -> Vec<i64> {
    todos.iter().map(|t| t.id.get()).collect()
}

// ============================================================================
// Loading
// ============================================================================

#[tokio::test]
async fn load_makes_the_day_active() {
    let api = InMemoryTodoApi::with_todos(vec![
        todo(2, day()),
        todo(1, day()),
        todo(3, day().succ_opt().unwrap()),
    ]);
    let planner = loaded(&api).await;

    let state = planner.snapshot().await;
    assert_eq!(state.active_date, Some(day()));
    assert_eq!(ids(&state.todos), vec![1, 2]);
    assert!(!state.is_loading);
    assert!(state.last_synced_at.is_some());
}

#[tokio::test]
async fn failed_load_keeps_previous_day() {
    let api = InMemoryTodoApi::with_todos(vec![todo(1, day())]);
    let planner = loaded(&api).await;
    api.fail(Operation::ListTodos);

    planner.load(day().succ_opt().unwrap()).await.unwrap();

    let state = planner.snapshot().await;
    assert_eq!(state.active_date, Some(day()));
    assert_eq!(ids(&state.todos), vec![1]);
    assert!(!state.is_loading);
    assert!(state.last_error.is_some());
}

#[tokio::test]
async fn stale_load_does_not_overwrite_newer_day() {
    let monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let api = InMemoryTodoApi::with_todos(vec![todo(1, monday), todo(2, day())]);
    api.set_date_latency(monday, Duration::from_millis(200));
    let planner = planner(&api);

    let slow = tokio::spawn({
        let planner = planner.clone();
        async move { planner.load(monday).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    planner.load(day()).await.unwrap();
    slow.await.unwrap().unwrap();

    let state = planner.snapshot().await;
    assert_eq!(state.active_date, Some(day()));
    assert_eq!(ids(&state.todos), vec![2]);
}

#[tokio::test]
async fn refresh_picks_up_server_changes() {
    let api = InMemoryTodoApi::with_todos(vec![todo(1, day())]);
    let planner = loaded(&api).await;
    api.seed(vec![todo(5, day())]);

    planner.refresh().await.unwrap();

    assert_eq!(ids(&planner.snapshot().await.todos), vec![1, 5]);
}

#[tokio::test]
async fn observers_see_loaded_day() {
    let api = InMemoryTodoApi::with_todos(vec![todo(1, day())]);
    let planner = planner(&api);
    let mut actions = planner.store().subscribe_actions();

    planner.load(day()).await.unwrap();

    let action = actions.recv().await.unwrap();
    assert!(matches!(action, DayAction::DayLoaded { date, .. } if date == day()));
}

// ============================================================================
// Todos
// ============================================================================

#[tokio::test]
async fn added_todo_survives_a_reload() {
    let api = InMemoryTodoApi::new();
    let planner = loaded(&api).await;

    let created = planner.add_todo("Water the plants").await.unwrap().unwrap();
    assert_eq!(created.date, day());

    let fresh = loaded(&api).await;
    let todos = fresh.snapshot().await.todos;
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].text, "Water the plants");
    assert_eq!(todos[0].date, day());
}

#[tokio::test]
async fn added_todo_is_appended_locally() {
    let api = InMemoryTodoApi::with_todos(vec![todo(1, day())]);
    let planner = loaded(&api).await;

    let created = planner.add_todo("Dishes").await.unwrap().unwrap();

    let state = planner.snapshot().await;
    assert_eq!(state.todos.last().unwrap().id, created.id);
    assert_eq!(state.todos.len(), 2);
}

#[tokio::test]
async fn failed_create_is_reported() {
    let api = InMemoryTodoApi::new();
    let planner = loaded(&api).await;
    api.fail(Operation::CreateTodo);

    let result = planner.add_todo("Dishes").await;

    assert!(matches!(
        result,
        Err(PlannerError::Transport(TransportError::Status { status: 500, .. }))
    ));
    assert!(planner.snapshot().await.todos.is_empty());
}

#[tokio::test]
async fn toggle_shows_before_server_answers() {
    let api = InMemoryTodoApi::with_todos(vec![todo(1, day())]);
    api.set_latency(Operation::UpdateTodo, Duration::from_millis(200));
    let planner = loaded(&api).await;

    let pending = tokio::spawn({
        let planner = planner.clone();
        async move { planner.toggle_todo(TodoId::new(1)).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(planner.snapshot().await.todos[0].completed);
    assert!(!api.todo(TodoId::new(1)).unwrap().completed);

    pending.await.unwrap().unwrap();
    assert!(planner.snapshot().await.todos[0].completed);
    assert!(api.todo(TodoId::new(1)).unwrap().completed);
}

#[tokio::test]
async fn failed_toggle_reverts() {
    let api = InMemoryTodoApi::with_todos(vec![todo(1, day())]);
    let planner = loaded(&api).await;
    api.fail(Operation::UpdateTodo);

    planner.toggle_todo(TodoId::new(1)).await.unwrap();

    let state = planner.snapshot().await;
    assert!(!state.todos[0].completed);
    assert!(state.last_error.is_some());
}

#[tokio::test]
async fn toggle_keeps_subtasks_the_response_omits() {
    let mut seeded = todo(1, day());
    seeded.subtasks = Some(vec![daybook_client::Subtask {
        id: daybook_client::SubtaskId::new(1),
        text: "step".to_string(),
        completed: false,
        order_index: 0,
    }]);
    let api = InMemoryTodoApi::with_todos(vec![seeded]);
    api.omit_subtasks_in_responses(true);
    let planner = loaded(&api).await;

    planner.toggle_todo(TodoId::new(1)).await.unwrap();

    let state = planner.snapshot().await;
    assert!(state.todos[0].completed);
    assert_eq!(state.todos[0].subtasks().len(), 1);
}

#[tokio::test]
async fn delete_waits_for_the_server() {
    let api = InMemoryTodoApi::with_todos(vec![todo(1, day()), todo(2, day())]);
    api.set_latency(Operation::DeleteTodo, Duration::from_millis(200));
    let planner = loaded(&api).await;

    let pending = tokio::spawn({
        let planner = planner.clone();
        async move { planner.remove_todo(TodoId::new(1)).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(ids(&planner.snapshot().await.todos), vec![1, 2]);

    assert!(pending.await.unwrap().unwrap());
    assert_eq!(ids(&planner.snapshot().await.todos), vec![2]);
}

#[tokio::test]
async fn failed_delete_keeps_the_todo() {
    let api = InMemoryTodoApi::with_todos(vec![todo(1, day())]);
    let planner = loaded(&api).await;
    api.fail(Operation::DeleteTodo);

    let result = planner.remove_todo(TodoId::new(1)).await;

    assert!(matches!(result, Err(PlannerError::Transport(_))));
    assert_eq!(ids(&planner.snapshot().await.todos), vec![1]);
}

// ============================================================================
// Selection
// ============================================================================

#[tokio::test]
async fn removing_selected_todo_clears_selection() {
    let api = InMemoryTodoApi::with_todos(vec![todo(1, day()), todo(2, day())]);
    let planner = loaded(&api).await;
    planner.select_todo(Some(TodoId::new(1))).await.unwrap();

    planner.remove_todo(TodoId::new(1)).await.unwrap();

    assert_eq!(planner.selected_todo().await, None);
    assert_eq!(planner.snapshot().await.selected, None);
}

#[tokio::test]
async fn removing_other_todo_keeps_selection() {
    let api = InMemoryTodoApi::with_todos(vec![todo(1, day()), todo(2, day())]);
    let planner = loaded(&api).await;
    planner.select_todo(Some(TodoId::new(2))).await.unwrap();

    planner.remove_todo(TodoId::new(1)).await.unwrap();

    assert_eq!(planner.selected_todo().await.unwrap().id, TodoId::new(2));
}

#[tokio::test]
async fn selection_follows_server_copy() {
    let api = InMemoryTodoApi::with_todos(vec![todo(1, day())]);
    let planner = loaded(&api).await;
    planner.select_todo(Some(TodoId::new(1))).await.unwrap();

    planner.toggle_todo(TodoId::new(1)).await.unwrap();

    assert!(planner.selected_todo().await.unwrap().completed);
}

// ============================================================================
// Week counts
// ============================================================================

#[tokio::test]
async fn counts_cover_the_week() {
    let monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let api = InMemoryTodoApi::with_todos(vec![todo(1, monday), todo(2, day()), todo(3, day())]);
    let planner = loaded(&api).await;

    planner.load_counts(week_of(day())).await.unwrap();

    let counts = planner.snapshot().await.counts;
    assert_eq!(counts.len(), 7);
    assert_eq!(counts[&monday], 1);
    assert_eq!(counts[&day()], 2);
    assert_eq!(counts.values().sum::<usize>(), 3);
}

#[tokio::test]
async fn counts_follow_creates_and_deletes() {
    let api = InMemoryTodoApi::with_todos(vec![todo(1, day())]);
    let planner = loaded(&api).await;
    planner.load_counts(week_of(day())).await.unwrap();

    planner.add_todo("Dishes").await.unwrap();
    assert_eq!(planner.snapshot().await.counts[&day()], 2);

    planner.remove_todo(TodoId::new(1)).await.unwrap();
    assert_eq!(planner.snapshot().await.counts[&day()], 1);
}

#[tokio::test]
async fn failed_counts_leave_previous_values() {
    let api = InMemoryTodoApi::with_todos(vec![todo(1, day())]);
    let planner = loaded(&api).await;
    planner.load_counts(vec![day()]).await.unwrap();
    api.fail_next(Operation::ListTodos);

    planner.load_counts(vec![day()]).await.unwrap();

    assert_eq!(planner.snapshot().await.counts[&day()], 1);
}
