//! Tests for #[derive(State)] macro

use daybook_macros::State;

#[derive(State, Clone, Debug, Default)]
struct ListState {
    pub items: Vec<String>,
    #[generation]
    pub load_generation: u64,
}

#[derive(State, Clone, Debug)]
#[allow(dead_code)]
struct PlainState {
    pub count: i32,
}

#[test]
fn test_generation_starts_at_field_value() {
    let state = ListState::default();
    assert_eq!(state.generation(), 0);
}

#[test]
fn test_next_generation_advances() {
    let mut state = ListState::default();
    assert_eq!(state.next_generation(), 1);
    assert_eq!(state.next_generation(), 2);
    assert_eq!(state.generation(), 2);
}

#[test]
fn test_older_generation_is_stale() {
    let mut state = ListState::default();
    let first = state.next_generation();
    let second = state.next_generation();

    assert!(!state.is_current_generation(first));
    assert!(state.is_current_generation(second));
}

#[test]
fn test_generation_wraps() {
    let mut state = ListState {
        items: Vec::new(),
        load_generation: u64::MAX,
    };
    assert_eq!(state.next_generation(), 0);
}

#[test]
fn test_struct_without_generation_compiles() {
    let state = PlainState { count: 3 };
    assert_eq!(state.count, 3);
}
