//! Operations, operation actors and undo entries

use crate::state_machine::{PropertyValue, StateId};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

pub type OperationType = i32;

/// Well-known operation type codes
pub mod operation_type {
    use super::OperationType;

    pub const NOTHING: OperationType = 0;
    pub const ADD: OperationType = 100;
    pub const INSERT: OperationType = 200;
    pub const MOVE: OperationType = 300;
    pub const REMOVE: OperationType = 400;
    pub const DELETE: OperationType = 500;
    pub const STATE_CHANGE: OperationType = 600;
    pub const SELECT_POINT: OperationType = 700;
    pub const DESELECT_POINT: OperationType = 800;
    pub const MODE_CHANGE: OperationType = 1500;
}

/// Data carried by an operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OperationPayload {
    Empty,
    /// Move a state machine's cursor at `time_step` to `state_id`
    StateChange { state_id: StateId, time_step: usize },
    /// Point edit at `index`
    Point { index: usize, position: [f64; 3] },
    Properties(BTreeMap<String, PropertyValue>),
}

/// A command executed against an [`OperationActor`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub op_type: OperationType,
    pub payload: OperationPayload,
}

impl Operation {
    pub fn new(op_type: OperationType, payload: OperationPayload) -> Self {
        Self { op_type, payload }
    }

    pub fn state_change(state_id: StateId, time_step: usize) -> Self {
        Self::new(
            operation_type::STATE_CHANGE,
            OperationPayload::StateChange {
                state_id,
                time_step,
            },
        )
    }

    pub fn point(op_type: OperationType, index: usize, position: [f64; 3]) -> Self {
        Self::new(op_type, OperationPayload::Point { index, position })
    }
}

/// Anything that can carry out an operation
pub trait OperationActor {
    fn execute_operation(&mut self, operation: &Operation);
}

pub type ActorRef = Rc<RefCell<dyn OperationActor>>;
pub type WeakActor = Weak<RefCell<dyn OperationActor>>;

/// Current object/group event ids used to group undo entries
///
/// Increments are requested first and applied later, so everything caused by
/// one input event shares an object id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventIdCounter {
    object_event_id: u64,
    group_event_id: u64,
    increment_object: bool,
    increment_group: bool,
}

impl EventIdCounter {
    pub fn object_event_id(&self) -> u64 {
        self.object_event_id
    }

    pub fn group_event_id(&self) -> u64 {
        self.group_event_id
    }

    pub fn request_object_increment(&mut self) {
        self.increment_object = true;
    }

    pub fn request_group_increment(&mut self) {
        self.increment_group = true;
    }

    /// Apply pending increments
    pub fn execute_increment(&mut self) {
        if self.increment_object {
            self.object_event_id += 1;
            self.increment_object = false;
        }
        if self.increment_group {
            self.group_event_id += 1;
            self.increment_group = false;
        }
    }
}

/// An undo entry: forward and inverse operation for one actor
pub struct OperationEvent {
    destination: WeakActor,
    operation: Operation,
    undo_operation: Operation,
    object_event_id: u64,
    group_event_id: u64,
    description: String,
}

impl OperationEvent {
    pub fn new(
        destination: &ActorRef,
        operation: Operation,
        undo_operation: Operation,
        object_event_id: u64,
        group_event_id: u64,
    ) -> Self {
        Self {
            destination: Rc::downgrade(destination),
            operation,
            undo_operation,
            object_event_id,
            group_event_id,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn undo_operation(&self) -> &Operation {
        &self.undo_operation
    }

    pub fn object_event_id(&self) -> u64 {
        self.object_event_id
    }

    pub fn group_event_id(&self) -> u64 {
        self.group_event_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_destination_alive(&self) -> bool {
        self.destination.strong_count() > 0
    }

    pub(crate) fn execute_undo(&self) {
        self.execute(&self.undo_operation);
    }

    pub(crate) fn execute_redo(&self) {
        self.execute(&self.operation);
    }

    /// Dropped actors and actors busy higher up the stack are skipped.
    fn execute(&self, operation: &Operation) {
        let Some(actor) = self.destination.upgrade() else {
            tracing::debug!(
                "Operation actor of '{}' no longer exists, skipping",
                self.description
            );
            return;
        };
        match actor.try_borrow_mut() {
            Ok(mut actor) => actor.execute_operation(operation),
            Err(_) => tracing::warn!(
                "Operation actor of '{}' is busy, operation {} skipped",
                self.description,
                operation.op_type
            ),
        }
    }
}

impl std::fmt::Debug for OperationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationEvent")
            .field("operation", &self.operation)
            .field("undo_operation", &self.undo_operation)
            .field("object_event_id", &self.object_event_id)
            .field("group_event_id", &self.group_event_id)
            .field("description", &self.description)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<OperationType>,
    }

    impl OperationActor for Recorder {
        fn execute_operation(&mut self, operation: &Operation) {
            self.seen.push(operation.op_type);
        }
    }

    #[test]
    fn test_counter_applies_requested_increments() {
        let mut ids = EventIdCounter::default();
        ids.execute_increment();
        assert_eq!(ids.object_event_id(), 0);

        ids.request_object_increment();
        ids.request_object_increment();
        ids.execute_increment();
        assert_eq!(ids.object_event_id(), 1);
        assert_eq!(ids.group_event_id(), 0);

        ids.request_group_increment();
        ids.execute_increment();
        assert_eq!(ids.group_event_id(), 1);
    }

    #[test]
    fn test_event_executes_against_actor() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let actor: ActorRef = recorder.clone();
        let event = OperationEvent::new(
            &actor,
            Operation::new(operation_type::ADD, OperationPayload::Empty),
            Operation::new(operation_type::REMOVE, OperationPayload::Empty),
            1,
            0,
        );

        event.execute_undo();
        event.execute_redo();
        assert_eq!(
            recorder.borrow().seen,
            vec![operation_type::REMOVE, operation_type::ADD]
        );
    }

    #[test]
    fn test_dropped_actor_is_skipped() {
        let actor: ActorRef = Rc::new(RefCell::new(Recorder::default()));
        let event = OperationEvent::new(
            &actor,
            Operation::new(operation_type::ADD, OperationPayload::Empty),
            Operation::new(operation_type::REMOVE, OperationPayload::Empty),
            1,
            0,
        );
        drop(actor);

        assert!(!event.is_destination_alive());
        event.execute_undo();
    }
}
