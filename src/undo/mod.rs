//! Undo module - operation log driven by state machine execution
//!
//! State machines and interaction code record [`OperationEvent`]s (a forward
//! and an inverse [`Operation`] bound to an [`OperationActor`]). The
//! [`UndoController`] owns the undo model and the object/group event id
//! counters that decide which entries belong together.

pub mod limited_linear;
pub mod operation;

pub use limited_linear::LimitedLinearUndo;
pub use operation::{
    ActorRef, EventIdCounter, Operation, OperationActor, OperationEvent, OperationPayload,
    OperationType, WeakActor, operation_type,
};

/// Undo model plus event id bookkeeping
#[derive(Debug, Default)]
pub struct UndoController {
    model: LimitedLinearUndo,
    ids: EventIdCounter,
}

impl UndoController {
    pub fn new(limit: usize) -> Self {
        Self {
            model: LimitedLinearUndo::new(limit),
            ids: EventIdCounter::default(),
        }
    }

    pub fn set_operation_event(&mut self, event: OperationEvent) -> bool {
        self.model.set_operation_event(event)
    }

    pub fn undo(&mut self) -> bool {
        self.model.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.model.redo()
    }

    pub fn undo_fine(&mut self, fine: bool) -> bool {
        self.model.undo_fine(fine)
    }

    pub fn redo_fine(&mut self, fine: bool) -> bool {
        self.model.redo_fine(fine)
    }

    pub fn model(&self) -> &LimitedLinearUndo {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut LimitedLinearUndo {
        &mut self.model
    }

    pub fn ids(&self) -> &EventIdCounter {
        &self.ids
    }

    pub fn ids_mut(&mut self) -> &mut EventIdCounter {
        &mut self.ids
    }

    pub fn undo_limit(&self) -> usize {
        self.model.limit()
    }

    pub fn set_undo_limit(&mut self, limit: usize) {
        self.model.set_limit(limit);
    }

    /// Drop both stacks; event ids keep counting
    pub fn clear(&mut self) {
        self.model.clear();
    }
}
