//! Named, fully connected state graphs
//!
//! A pattern owns its states in an arena. Transitions refer to their targets
//! by [`StateIndex`], so the graph can be shared read-only by every machine
//! of the same type without reference cycles.

use crate::state_machine::{State, StateId, StateIndex};
use crate::{Error, Result};
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct StateMachinePattern {
    name: String,
    states: Vec<State>,
    index: HashMap<StateId, StateIndex>,
    start: StateIndex,
    reachable: BTreeSet<StateIndex>,
}

impl StateMachinePattern {
    /// Connect and validate a set of states into a pattern.
    ///
    /// Fails on an empty state set, duplicate state ids or names, an unknown
    /// start id, or any transition whose target id is not part of `states`.
    pub fn from_states(
        name: impl Into<String>,
        mut states: Vec<State>,
        start_id: StateId,
    ) -> Result<Self> {
        let name = name.into();
        if states.is_empty() {
            return Err(Error::malformed(&name, "pattern has no states"));
        }

        let mut index = HashMap::with_capacity(states.len());
        let mut names = HashSet::new();
        for (position, state) in states.iter().enumerate() {
            if index.insert(state.id, StateIndex(position)).is_some() {
                return Err(Error::malformed(
                    &name,
                    format!("duplicate state id {}", state.id),
                ));
            }
            if !state.name.is_empty() && !names.insert(state.name.as_str()) {
                return Err(Error::malformed(
                    &name,
                    format!("duplicate state name '{}'", state.name),
                ));
            }
        }

        let start = *index.get(&start_id).ok_or_else(|| {
            Error::malformed(&name, format!("start state id {} is not defined", start_id))
        })?;

        let mut reachable = BTreeSet::new();
        walk(&mut states, &index, start, &mut reachable)
            .map_err(|message| Error::malformed(&name, message))?;

        // States the walk never reached still must not dangle.
        for (position, state) in states.iter_mut().enumerate() {
            if reachable.contains(&StateIndex(position)) {
                continue;
            }
            let state_name = state.name.clone();
            state
                .connect_transitions(|id| index.get(&id).copied())
                .map_err(|target| {
                    Error::malformed(&name, dangling_message(&state_name, target))
                })?;
        }

        Ok(Self {
            name,
            states,
            index,
            start,
            reachable,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_index(&self) -> StateIndex {
        self.start
    }

    pub fn start_state(&self) -> &State {
        &self.states[self.start.0]
    }

    /// Arena lookup; indices handed out by this pattern are always valid
    pub fn state(&self, index: StateIndex) -> Option<&State> {
        self.states.get(index.0)
    }

    pub fn index_of(&self, id: StateId) -> Option<StateIndex> {
        self.index.get(&id).copied()
    }

    pub fn state_by_id(&self, id: StateId) -> Option<&State> {
        self.index_of(id).and_then(|index| self.state(index))
    }

    pub fn states(&self) -> impl Iterator<Item = (StateIndex, &State)> {
        self.states
            .iter()
            .enumerate()
            .map(|(position, state)| (StateIndex(position), state))
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.states.iter().map(State::transition_count).sum()
    }

    pub fn is_reachable(&self, index: StateIndex) -> bool {
        self.reachable.contains(&index)
    }

    /// States that cannot be entered from the start state
    pub fn unreachable_states(&self) -> Vec<&State> {
        self.states()
            .filter(|(index, _)| !self.reachable.contains(index))
            .map(|(_, state)| state)
            .collect()
    }
}

fn dangling_message(state_name: &str, target: StateId) -> String {
    format!(
        "state '{}' has a transition to undefined state id {}",
        state_name, target
    )
}

/// Depth-first walk from `start`, connecting each state once.
///
/// Uses an explicit worklist; `history` records visited states so cycles
/// terminate.
fn walk(
    states: &mut [State],
    index: &HashMap<StateId, StateIndex>,
    start: StateIndex,
    history: &mut BTreeSet<StateIndex>,
) -> std::result::Result<(), String> {
    let mut pending = vec![start];
    while let Some(at) = pending.pop() {
        if !history.insert(at) {
            continue;
        }

        let state = &mut states[at.0];
        let state_name = state.name.clone();
        state
            .connect_transitions(|id| index.get(&id).copied())
            .map_err(|target| dangling_message(&state_name, target))?;

        pending.extend(
            state
                .transitions()
                .iter()
                .filter_map(|t| t.next_state())
                .filter(|next| !history.contains(next)),
        );
    }
    Ok(())
}
