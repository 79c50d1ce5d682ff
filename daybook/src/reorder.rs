//! Drag-and-drop reordering of sibling groups.
//!
//! A move is planned and applied locally in one step; the resulting
//! [`ReorderPlan`] carries both the complete new ordering to persist and the
//! ordering to restore if persisting fails. Reorders are all-or-nothing.

use daybook_client::{OrderEntry, Subtask, SubtaskId, Todo, TodoId};

/// An entity that lives in an ordered sibling group
pub trait Ordered {
    /// Identifier type
    type Id: Copy + Eq;

    /// Identifier of this entity
    fn id(&self) -> Self::Id;

    /// Current position key
    fn order_index(&self) -> i64;

    /// Overwrite the position key
    fn set_order_index(&mut self, order_index: i64);
}

impl Ordered for Todo {
    type Id = TodoId;

    fn id(&self) -> TodoId {
        self.id
    }

    fn order_index(&self) -> i64 {
        self.order_index
    }

    fn set_order_index(&mut self, order_index: i64) {
        self.order_index = order_index;
    }
}

impl Ordered for Subtask {
    type Id = SubtaskId;

    fn id(&self) -> SubtaskId {
        self.id
    }

    fn order_index(&self) -> i64 {
        self.order_index
    }

    fn set_order_index(&mut self, order_index: i64) {
        self.order_index = order_index;
    }
}

/// Result of a move: what to persist and what to restore on failure
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReorderPlan<I> {
    /// Ordering before the move, with the original `order_index` values
    pub previous: Vec<OrderEntry<I>>,
    /// Complete new ordering, `order_index` equal to the 0-based position
    pub entries: Vec<OrderEntry<I>>,
}

/// Snapshot of the current ordering
pub fn order_of<T: Ordered>(items: &[T]) -> Vec<OrderEntry<T::Id>> {
    items
        .iter()
        .map(|item| OrderEntry::new(item.id(), item.order_index()))
        .collect()
}

/// Move the item `from` to the position currently held by `to`
///
/// Returns `None` and leaves `items` untouched when either id is missing or
/// when `from == to`. Otherwise removes the item at its old index, inserts it
/// at the new one and renumbers every item with its position.
pub fn move_item<T: Ordered>(items: &mut Vec<T>, from: T::Id, to: T::Id) -> Option<ReorderPlan<T::Id>> {
    if from == to {
        return None;
    }
    let old_index = items.iter().position(|item| item.id() == from)?;
    let new_index = items.iter().position(|item| item.id() == to)?;

    let previous = order_of(items);

    let item = items.remove(old_index);
    items.insert(new_index, item);

    let mut position = 0_i64;
    for item in items.iter_mut() {
        item.set_order_index(position);
        position += 1;
    }

    Some(ReorderPlan {
        previous,
        entries: order_of(items),
    })
}

/// Put back an ordering captured before a move
///
/// Items named in `previous` return to the position they held in it, with
/// their old `order_index`; ties between keys do not matter. Items unknown to
/// it (created after the move) follow in their current order and keep their
/// key. Entity content is left as it is now.
pub fn restore<T: Ordered>(items: &mut [T], previous: &[OrderEntry<T::Id>]) {
    let position_before = |id: T::Id| {
        previous
            .iter()
            .position(|entry| entry.id == id)
            .unwrap_or(previous.len())
    };
    items.sort_by_key(|item| position_before(item.id()));

    for item in items.iter_mut() {
        if let Some(entry) = previous.iter().find(|entry| entry.id == item.id()) {
            item.set_order_index(entry.order_index);
        }
    }
}
