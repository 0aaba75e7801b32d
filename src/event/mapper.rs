//! Raw input to event id translation

use crate::behavior::BehaviorDocument;
use crate::behavior::constants::event_type;
use crate::event::{EventDescription, EventId, InputEvent, StateEvent};
use crate::interaction::GlobalInteraction;
use crate::Result;
use std::collections::{HashMap, HashSet};
use std::path::Path;

type Signature = (i32, i32, i32, i32);

/// Translator for input devices the event table does not cover
pub trait EventMapperAddOn {
    fn name(&self) -> &str;

    /// Event id for `event`, or `None` to let the next translator try
    fn map_event(&mut self, event: &InputEvent) -> Option<EventId>;
}

/// Translates input events into state events and hands them to a dispatcher
#[derive(Default)]
pub struct EventMapper {
    descriptions: Vec<EventDescription>,
    by_signature: HashMap<Signature, usize>,
    style: Option<String>,
    add_ons: Vec<Box<dyn EventMapperAddOn>>,
    loaded_sources: HashSet<String>,
}

impl EventMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let document = BehaviorDocument::from_file(&canonical)?;
        Ok(self.load_document(&document))
    }

    pub fn load_str(&mut self, source_name: &str, text: &str) -> Result<usize> {
        let document = BehaviorDocument::parse(source_name, text)?;
        Ok(self.load_document(&document))
    }

    /// Add the event table of a document; returns the number of new rows.
    ///
    /// A source is only read once. Rows whose input tuple is already mapped
    /// are ignored with a warning.
    pub fn load_document(&mut self, document: &BehaviorDocument) -> usize {
        if !self.loaded_sources.insert(document.source_name.clone()) {
            tracing::info!("Event table of {} already loaded", document.source_name);
            return 0;
        }
        for diagnostic in document.diagnostics.iter().filter(|d| d.scope == "events") {
            diagnostic.log(&document.source_name);
        }
        if let Some(style) = &document.style
            && self.style.is_none()
        {
            self.style = Some(style.clone());
        }

        let added = document
            .events
            .iter()
            .filter(|description| self.add_description((*description).clone()))
            .count();
        tracing::info!(
            "Loaded {} event description(s) from {}",
            added,
            document.source_name
        );
        added
    }

    /// Add one table row; false if its input tuple is already mapped
    pub fn add_description(&mut self, description: EventDescription) -> bool {
        let signature = description.signature();
        if let Some(&existing) = self.by_signature.get(&signature) {
            tracing::warn!(
                "Event '{}' duplicates the input of '{}', keeping the first",
                description.name,
                self.descriptions[existing].name
            );
            return false;
        }
        self.by_signature.insert(signature, self.descriptions.len());
        self.descriptions.push(description);
        true
    }

    pub fn add_add_on(&mut self, add_on: Box<dyn EventMapperAddOn>) {
        tracing::debug!("Event mapper add-on '{}' registered", add_on.name());
        self.add_ons.push(add_on);
    }

    pub fn remove_add_on(&mut self, name: &str) -> bool {
        let before = self.add_ons.len();
        self.add_ons.retain(|a| a.name() != name);
        self.add_ons.len() != before
    }

    pub fn add_on_count(&self) -> usize {
        self.add_ons.len()
    }

    pub fn descriptions(&self) -> &[EventDescription] {
        &self.descriptions
    }

    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    pub fn event_id_by_name(&self, name: &str) -> Option<EventId> {
        self.descriptions
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.id)
    }

    /// Add-ons in registration order first, then the table
    pub fn translate(&mut self, event: &InputEvent) -> Option<EventId> {
        for add_on in &mut self.add_ons {
            if let Some(id) = add_on.map_event(event) {
                tracing::trace!("Add-on '{}' mapped input to event {}", add_on.name(), id);
                return Some(id);
            }
        }
        self.by_signature
            .get(&event.signature())
            .map(|&index| self.descriptions[index].id)
    }

    /// Translate and dispatch; unmapped input is dropped and returns false
    pub fn map_event(&mut self, event: &InputEvent, dispatcher: &GlobalInteraction) -> bool {
        let Some(id) = self.translate(event) else {
            tracing::trace!("No event id for input {:?}", event.signature());
            return false;
        };
        Self::dispatch(event, id, dispatcher)
    }

    /// Dispatch an input whose event id is already known
    pub fn map_posted_event(
        &self,
        event: &InputEvent,
        id: EventId,
        dispatcher: &GlobalInteraction,
    ) -> bool {
        Self::dispatch(event, id, dispatcher)
    }

    /// Re-translate a state event, e.g. after modifiers changed
    pub fn refresh_state_event(&mut self, state_event: &StateEvent) -> StateEvent {
        let refreshed = state_event
            .input()
            .and_then(|input| self.translate(input).map(|id| (id, input.clone())));
        match refreshed {
            Some((id, input)) => StateEvent::with_input(id, input),
            None => state_event.clone(),
        }
    }

    fn dispatch(event: &InputEvent, id: EventId, dispatcher: &GlobalInteraction) -> bool {
        if starts_object_event(event.event_type) {
            dispatcher.request_object_increment();
        }
        dispatcher.execute_increment();
        dispatcher.handle_event(&StateEvent::with_input(id, event.clone()))
    }
}

/// Moves and releases continue the current object event; user events are
/// posted from inside one.
fn starts_object_event(kind: i32) -> bool {
    !matches!(
        kind,
        event_type::MOUSE_MOVE | event_type::MOUSE_BUTTON_RELEASE | event_type::USER
    )
}

impl std::fmt::Debug for EventMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let add_ons: Vec<&str> = self.add_ons.iter().map(|a| a.name()).collect();
        f.debug_struct("EventMapper")
            .field("descriptions", &self.descriptions.len())
            .field("style", &self.style)
            .field("add_ons", &add_ons)
            .finish()
    }
}
