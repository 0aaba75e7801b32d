//! State representation

use crate::event::EventId;
use crate::state_machine::Transition;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

pub type StateId = i32;

/// Position of a state inside its pattern's state arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StateIndex(pub usize);

impl fmt::Display for StateIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named node of a pattern holding at most one transition per event id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct State {
    pub name: String,
    pub id: StateId,
    transitions: HashMap<EventId, Transition>,
}

impl State {
    pub fn new(name: impl Into<String>, id: StateId) -> Self {
        Self {
            name: name.into(),
            id,
            transitions: HashMap::new(),
        }
    }

    /// Add a transition; returns false and keeps the existing one when the
    /// event id is already taken on this state.
    pub fn add_transition(&mut self, transition: Transition) -> bool {
        if self.transitions.contains_key(&transition.event_id) {
            return false;
        }
        self.transitions.insert(transition.event_id, transition);
        true
    }

    pub fn transition(&self, event_id: EventId) -> Option<&Transition> {
        self.transitions.get(&event_id)
    }

    pub fn is_valid_event(&self, event_id: EventId) -> bool {
        self.transition(event_id).is_some()
    }

    /// Transitions ordered by event id
    pub fn transitions(&self) -> Vec<&Transition> {
        let mut transitions: Vec<&Transition> = self.transitions.values().collect();
        transitions.sort_by_key(|t| t.event_id);
        transitions
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Ids of every state this one can move to
    pub fn next_state_ids(&self) -> BTreeSet<StateId> {
        self.transitions.values().map(|t| t.next_state_id).collect()
    }

    /// Bind every transition's target id to an arena index.
    ///
    /// `resolve` maps a state id of the same pattern to its index. On the
    /// first unknown target the offending id is returned and the state is
    /// left partially connected; callers discard the whole pattern then.
    pub fn connect_transitions(
        &mut self,
        resolve: impl Fn(StateId) -> Option<StateIndex>,
    ) -> Result<(), StateId> {
        for transition in self.transitions.values_mut() {
            match resolve(transition.next_state_id) {
                Some(index) => transition.next_state = Some(index),
                None => return Err(transition.next_state_id),
            }
        }
        Ok(())
    }

    /// Get a short display string
    pub fn display_short(&self) -> String {
        format!("{} [{}]", self.name, self.id)
    }
}
