//! Transition representation

use crate::event::EventId;
use crate::state_machine::{Action, StateId, StateIndex};
use serde::Serialize;

/// A directed edge leaving a state
///
/// `next_state` stays `None` until the owning pattern connects its
/// transitions; afterwards it indexes a state of the same pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub name: String,
    pub event_id: EventId,
    pub next_state_id: StateId,
    #[serde(skip)]
    pub(crate) next_state: Option<StateIndex>,
    pub actions: Vec<Action>,
}

impl Transition {
    pub fn new(name: impl Into<String>, event_id: EventId, next_state_id: StateId) -> Self {
        Self {
            name: name.into(),
            event_id,
            next_state_id,
            next_state: None,
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn add_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Resolved target, `None` before connection
    pub fn next_state(&self) -> Option<StateIndex> {
        self.next_state
    }

    pub fn is_connected(&self) -> bool {
        self.next_state.is_some()
    }

    /// Get display label for the transition
    pub fn display_label(&self) -> String {
        if self.name.is_empty() {
            format!("event {}", self.event_id)
        } else {
            format!("{} ({})", self.name, self.event_id)
        }
    }
}
