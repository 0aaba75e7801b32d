//! Event module - raw input events, state events and the event mapper
//!
//! Platform adapters deliver [`InputEvent`]s. The [`EventMapper`] translates
//! them into [`StateEvent`]s carrying a semantic event id, which the
//! dispatcher routes to state machines.

use serde::{Deserialize, Serialize};

pub mod mapper;

pub use mapper::{EventMapper, EventMapperAddOn};

pub type EventId = i32;

/// A low-level input occurrence as delivered by a platform adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub event_type: i32,
    pub button: i32,
    pub button_state: i32,
    pub key: i32,
    pub display_position: Option<[f64; 2]>,
    pub world_position: Option<[f64; 3]>,
    /// Name of the view/render window that produced the event
    pub sender: Option<String>,
}

impl InputEvent {
    pub fn new(event_type: i32, button: i32, button_state: i32, key: i32) -> Self {
        Self {
            event_type,
            button,
            button_state,
            key,
            display_position: None,
            world_position: None,
            sender: None,
        }
    }

    pub fn with_display_position(mut self, position: [f64; 2]) -> Self {
        self.display_position = Some(position);
        self
    }

    pub fn with_world_position(mut self, position: [f64; 3]) -> Self {
        self.world_position = Some(position);
        self
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Attribute tuple used for table lookups
    pub fn signature(&self) -> (i32, i32, i32, i32) {
        (self.event_type, self.button, self.button_state, self.key)
    }
}

/// A normalized event routed through the interaction core
///
/// Created per dispatch and dropped once the dispatch returns.
#[derive(Debug, Clone, PartialEq)]
pub struct StateEvent {
    id: EventId,
    event: Option<InputEvent>,
}

impl StateEvent {
    pub fn new(id: EventId) -> Self {
        Self { id, event: None }
    }

    pub fn with_input(id: EventId, event: InputEvent) -> Self {
        Self {
            id,
            event: Some(event),
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn input(&self) -> Option<&InputEvent> {
        self.event.as_ref()
    }
}

/// One row of an event table: input attribute tuple to event id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescription {
    pub name: String,
    pub id: EventId,
    pub event_type: i32,
    pub button: i32,
    pub button_state: i32,
    pub key: i32,
}

impl EventDescription {
    pub fn signature(&self) -> (i32, i32, i32, i32) {
        (self.event_type, self.button, self.button_state, self.key)
    }

    pub fn matches(&self, event: &InputEvent) -> bool {
        self.signature() == event.signature()
    }
}
