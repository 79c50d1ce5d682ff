//! Tests for #[derive(Action)] macro

use daybook_macros::Action;

#[derive(Action, Clone, Debug, PartialEq)]
#[allow(dead_code)]
enum SyncAction {
    #[intent]
    AddTodo {
        text: String,
    },

    #[intent]
    Refresh,

    #[intent]
    Select(Option<u64>),

    #[outcome]
    TodoCreated {
        id: u64,
        text: String,
    },

    #[outcome]
    LoadFailed(String),

    Tick,
}

#[test]
fn test_is_intent() {
    let action = SyncAction::AddTodo {
        text: "Water plants".to_string(),
    };
    assert!(action.is_intent());
    assert!(!action.is_outcome());
}

#[test]
fn test_is_outcome() {
    let action = SyncAction::TodoCreated {
        id: 1,
        text: "Water plants".to_string(),
    };
    assert!(!action.is_intent());
    assert!(action.is_outcome());
}

#[test]
fn test_unit_and_tuple_variants() {
    assert!(SyncAction::Refresh.is_intent());
    assert!(SyncAction::Select(Some(3)).is_intent());
    assert!(SyncAction::LoadFailed("offline".to_string()).is_outcome());
}

#[test]
fn test_unmarked_variant_is_neither() {
    assert!(!SyncAction::Tick.is_intent());
    assert!(!SyncAction::Tick.is_outcome());
}

#[test]
fn test_name() {
    assert_eq!(SyncAction::Refresh.name(), "Refresh");
    assert_eq!(SyncAction::Select(None).name(), "Select");
    assert_eq!(SyncAction::Tick.name(), "Tick");
    assert_eq!(
        SyncAction::TodoCreated {
            id: 9,
            text: String::new(),
        }
        .name(),
        "TodoCreated"
    );
}
