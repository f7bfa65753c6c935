use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::ServiceError;
use crate::database::models::Category;
use crate::database::store::{CategoryStore, StoreError};

/// Drag-and-drop state of the category list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging { id: i32, origin: usize },
    Over { id: i32, origin: usize, target: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DragEvent {
    Start { id: i32 },
    Over { target: i32 },
    Drop,
    Cancel,
}

/// Drives a drag gesture over an ordered list of ids.
#[derive(Debug, Clone)]
pub struct DragMachine {
    order: Vec<i32>,
    state: DragState,
}

impl DragMachine {
    pub fn new(order: Vec<i32>) -> Self {
        Self { order, state: DragState::Idle }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn order(&self) -> &[i32] {
        &self.order
    }

    /// Apply one event. Returns the new ordering when a drop moved something.
    /// Events that make no sense in the current state are ignored.
    pub fn handle(&mut self, event: DragEvent) -> Option<Vec<i32>> {
        let (next, moved) = match (self.state, event) {
            (DragState::Idle, DragEvent::Start { id }) => match self.position(id) {
                Some(origin) => (DragState::Dragging { id, origin }, None),
                None => (DragState::Idle, None),
            },
            (DragState::Dragging { id, origin } | DragState::Over { id, origin, .. }, DragEvent::Over { target }) => {
                if self.position(target).is_some() {
                    (DragState::Over { id, origin, target }, None)
                } else {
                    (DragState::Dragging { id, origin }, None)
                }
            }
            (DragState::Over { id, target, .. }, DragEvent::Drop) => (DragState::Idle, reorder(&self.order, id, target)),
            (DragState::Dragging { .. } | DragState::Over { .. }, DragEvent::Drop | DragEvent::Cancel) => {
                (DragState::Idle, None)
            }
            (state, _) => (state, None),
        };
        self.state = next;
        if let Some(order) = &moved {
            self.order = order.clone();
        }
        moved
    }

    fn position(&self, id: i32) -> Option<usize> {
        self.order.iter().position(|&x| x == id)
    }
}

/// Move `dragged` into the slot currently held by `target`.
///
/// `None` when either id is missing or nothing would move.
pub fn reorder(ids: &[i32], dragged: i32, target: i32) -> Option<Vec<i32>> {
    if dragged == target {
        return None;
    }
    let from = ids.iter().position(|&id| id == dragged)?;
    let to = ids.iter().position(|&id| id == target)?;
    let mut order = ids.to_vec();
    let moved = order.remove(from);
    order.insert(to, moved);
    Some(order)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReorderRequest {
    Move { dragged_id: i32, target_id: i32 },
    Events { events: Vec<DragEvent> },
}

#[derive(Clone)]
pub struct CategoryService {
    store: Arc<dyn CategoryStore>,
}

impl CategoryService {
    pub fn new(store: Arc<dyn CategoryStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Category>, ServiceError> {
        Ok(self.store.list_categories().await?)
    }

    /// Replay the gesture over the stored order and persist the outcome.
    pub async fn reorder(&self, request: ReorderRequest) -> Result<Vec<Category>, ServiceError> {
        let categories = self.store.list_categories().await?;
        let mut machine = DragMachine::new(categories.iter().map(|c| c.id).collect());

        let events = match request {
            ReorderRequest::Move { dragged_id, target_id } => {
                for id in [dragged_id, target_id] {
                    if !machine.order().contains(&id) {
                        return Err(StoreError::NotFound(format!("category {}", id)).into());
                    }
                }
                vec![DragEvent::Start { id: dragged_id }, DragEvent::Over { target: target_id }, DragEvent::Drop]
            }
            ReorderRequest::Events { events } => events,
        };

        let mut final_order = None;
        for event in events {
            if let Some(order) = machine.handle(event) {
                final_order = Some(order);
            }
        }
        let Some(order) = final_order else {
            return Ok(categories);
        };

        let changed: Vec<(i32, i32)> = order
            .iter()
            .enumerate()
            .map(|(position, id)| (*id, position as i32))
            .filter(|(id, position)| categories.iter().any(|c| c.id == *id && c.position != *position))
            .collect();
        self.store.set_positions(&changed).await?;
        info!(changed = changed.len(), "categories reordered");

        Ok(self.store.list_categories().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;

    #[test]
    fn reorder_moves_into_target_slot() {
        assert_eq!(reorder(&[1, 2, 3, 4], 1, 3), Some(vec![2, 3, 1, 4]));
        assert_eq!(reorder(&[1, 2, 3, 4], 4, 2), Some(vec![1, 4, 2, 3]));
        assert_eq!(reorder(&[1, 2, 3], 2, 2), None);
        assert_eq!(reorder(&[1, 2, 3], 9, 2), None);
    }

    #[test]
    fn machine_walks_through_a_drag() {
        let mut machine = DragMachine::new(vec![1, 2, 3]);
        assert_eq!(machine.handle(DragEvent::Start { id: 3 }), None);
        assert_eq!(machine.state(), DragState::Dragging { id: 3, origin: 2 });
        assert_eq!(machine.handle(DragEvent::Over { target: 1 }), None);
        assert_eq!(machine.state(), DragState::Over { id: 3, origin: 2, target: 1 });
        assert_eq!(machine.handle(DragEvent::Drop), Some(vec![3, 1, 2]));
        assert_eq!(machine.state(), DragState::Idle);
        assert_eq!(machine.order(), &[3, 1, 2]);
    }

    #[test]
    fn cancel_and_stray_events_leave_order_alone() {
        let mut machine = DragMachine::new(vec![1, 2, 3]);
        assert_eq!(machine.handle(DragEvent::Drop), None);
        assert_eq!(machine.handle(DragEvent::Start { id: 9 }), None);
        assert_eq!(machine.state(), DragState::Idle);

        machine.handle(DragEvent::Start { id: 1 });
        machine.handle(DragEvent::Over { target: 3 });
        assert_eq!(machine.handle(DragEvent::Cancel), None);
        assert_eq!(machine.state(), DragState::Idle);
        assert_eq!(machine.order(), &[1, 2, 3]);

        // Dropping without hovering a target is a cancel.
        machine.handle(DragEvent::Start { id: 1 });
        assert_eq!(machine.handle(DragEvent::Drop), None);
        assert_eq!(machine.order(), &[1, 2, 3]);
    }

    #[tokio::test]
    async fn reorder_persists_dense_positions() {
        let service = CategoryService::new(Arc::new(MemoryStore::seeded()));
        let categories = service.reorder(ReorderRequest::Move { dragged_id: 4, target_id: 2 }).await.unwrap();
        let order: Vec<_> = categories.iter().map(|c| (c.id, c.position)).collect();
        assert_eq!(order, vec![(1, 0), (4, 1), (2, 2), (3, 3)]);
    }

    #[tokio::test]
    async fn reorder_unknown_category_is_not_found() {
        let service = CategoryService::new(Arc::new(MemoryStore::seeded()));
        let err = service.reorder(ReorderRequest::Move { dragged_id: 42, target_id: 1 }).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn cancelled_gesture_changes_nothing() {
        let service = CategoryService::new(Arc::new(MemoryStore::seeded()));
        let request = ReorderRequest::Events {
            events: vec![DragEvent::Start { id: 1 }, DragEvent::Over { target: 4 }, DragEvent::Cancel],
        };
        let categories = service.reorder(request).await.unwrap();
        let ids: Vec<_> = categories.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }
}
