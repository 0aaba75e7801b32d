//! The contract between the dispatcher and the machines it drives

use crate::event::StateEvent;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Selection mode of an interactor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InteractorMode {
    #[default]
    Deselected,
    Selected,
    Subselected,
}

impl InteractorMode {
    pub fn is_selected(&self) -> bool {
        !matches!(self, InteractorMode::Deselected)
    }
}

/// Anything the dispatcher can offer a state event to
///
/// Listeners only ever see `handle_event`; interactors are additionally
/// ranked by `can_handle_event` and tracked by `mode`.
pub trait StateEventHandler {
    /// Returns true when the event was consumed
    fn handle_event(&mut self, event: &StateEvent) -> bool;

    /// Relevance in `[0, 1]`; must be cheap and free of side effects
    fn can_handle_event(&self, event: &StateEvent) -> f32;

    fn mode(&self) -> InteractorMode {
        InteractorMode::Deselected
    }

    /// Pattern name, used in log messages
    fn type_name(&self) -> &str;
}

pub type HandlerRef = Rc<RefCell<dyn StateEventHandler>>;

/// Identity comparison that ignores vtable pointers
pub fn same_handler(a: &HandlerRef, b: &HandlerRef) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

pub(crate) fn position_of(list: &[HandlerRef], handler: &HandlerRef) -> Option<usize> {
    list.iter().position(|h| same_handler(h, handler))
}
