//! Behavior module - reading declarative behavior descriptions
//!
//! A behavior source is an XML document holding any number of named state
//! machine patterns and event tables. Reading is tolerant: problems inside a
//! pattern or an event entry are collected as [`LoadDiagnostic`]s and the
//! rest of the document is still read. Only a document that is not
//! well-formed XML fails as a whole.

use crate::event::{EventDescription, EventId};
use crate::state_machine::{Action, PropertyValue, StateId};
use crate::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Serialize;
use std::path::Path;

pub mod constants;

/// Severity of a load diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A problem found while loading a behavior source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadDiagnostic {
    pub severity: Severity,
    /// Pattern name, `events`, or the source name for document-level issues
    pub scope: String,
    pub message: String,
}

impl LoadDiagnostic {
    pub fn warning(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            scope: scope.into(),
            message: message.into(),
        }
    }

    pub fn error(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            scope: scope.into(),
            message: message.into(),
        }
    }

    /// Forward the diagnostic to the tracing subscriber
    pub fn log(&self, source_name: &str) {
        match self.severity {
            Severity::Warning => {
                tracing::warn!("{} [{}]: {}", source_name, self.scope, self.message)
            }
            Severity::Error => {
                tracing::error!("{} [{}]: {}", source_name, self.scope, self.message)
            }
        }
    }
}

/// A transition as written in the source, target not yet resolved
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionDecl {
    pub name: String,
    pub event_id: EventId,
    pub next_state_id: StateId,
    pub actions: Vec<Action>,
}

/// A state as written in the source
#[derive(Debug, Clone, PartialEq)]
pub struct StateDecl {
    pub name: String,
    pub id: StateId,
    pub start: bool,
    pub transitions: Vec<TransitionDecl>,
}

/// A named pattern as written in the source
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatternDecl {
    pub name: String,
    pub states: Vec<StateDecl>,
    /// Structural errors found while reading; a pattern with errors is never registered
    pub errors: Vec<String>,
}

/// Everything read from one behavior source
#[derive(Debug, Clone, Default)]
pub struct BehaviorDocument {
    pub source_name: String,
    pub style: Option<String>,
    pub patterns: Vec<PatternDecl>,
    pub events: Vec<EventDescription>,
    pub diagnostics: Vec<LoadDiagnostic>,
}

impl BehaviorDocument {
    /// Read a behavior description from a string
    pub fn parse(source_name: impl Into<String>, text: &str) -> Result<Self> {
        let source_name = source_name.into();
        let mut builder = DocumentBuilder::new(source_name.clone());
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        loop {
            let event = reader.read_event().map_err(|e| {
                Error::behavior_parse(
                    &source_name,
                    format!("at byte {}: {}", reader.buffer_position(), e),
                )
            })?;
            match event {
                Event::Start(element) => builder.start(&element)?,
                Event::Empty(element) => builder.empty(&element)?,
                Event::End(element) => {
                    let name = String::from_utf8_lossy(element.name().as_ref()).to_ascii_lowercase();
                    builder.end(&name);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        builder.finish()
    }

    /// Read a behavior description file; the path doubles as source name
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::parse(path.display().to_string(), &text)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

fn element_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.name().as_ref()).to_ascii_lowercase()
}

/// Attributes of one element with lower-cased keys
struct Attributes(Vec<(String, String)>);

impl Attributes {
    fn read(element: &BytesStart<'_>) -> Result<Self> {
        let mut pairs = Vec::new();
        for attr in element.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
            let value = attr.unescape_value()?.into_owned();
            pairs.push((key, value));
        }
        Ok(Self(pairs))
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn name(&self) -> String {
        self.get("name").unwrap_or_default().to_string()
    }

    fn int(&self, key: &str) -> std::result::Result<i32, String> {
        let raw = self
            .get(key)
            .ok_or_else(|| format!("missing attribute '{}'", key))?;
        constants::parse_int(raw).ok_or_else(|| format!("attribute '{}' is not an integer: {:?}", key, raw))
    }

    /// Literal or named constant
    fn code(&self, key: &str) -> std::result::Result<i32, String> {
        let raw = self
            .get(key)
            .ok_or_else(|| format!("missing attribute '{}'", key))?;
        constants::resolve(raw).map_err(|e| format!("{} in '{}'", e, key))
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }
}

struct DocumentBuilder {
    doc: BehaviorDocument,
    pattern: Option<PatternDecl>,
    state: Option<StateDecl>,
    transition: Option<TransitionDecl>,
    action: Option<Action>,
    in_events: bool,
    /// Open elements inside an ignored subtree
    skip_depth: usize,
}

impl DocumentBuilder {
    fn new(source_name: String) -> Self {
        Self {
            doc: BehaviorDocument {
                source_name,
                ..Default::default()
            },
            pattern: None,
            state: None,
            transition: None,
            action: None,
            in_events: false,
            skip_depth: 0,
        }
    }

    fn start(&mut self, element: &BytesStart<'_>) -> Result<()> {
        if self.skip_depth > 0 {
            self.skip_depth += 1;
            return Ok(());
        }
        self.open(element)
    }

    fn empty(&mut self, element: &BytesStart<'_>) -> Result<()> {
        if self.skip_depth > 0 {
            return Ok(());
        }
        self.open(element)?;
        if self.skip_depth > 0 {
            // an empty ignored element has nothing to close
            self.skip_depth = 0;
            return Ok(());
        }
        self.close(&element_name(element));
        Ok(())
    }

    fn end(&mut self, name: &str) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return;
        }
        self.close(name);
    }

    fn pattern_error(&mut self, message: String) {
        if let Some(pattern) = &mut self.pattern {
            pattern.errors.push(message);
        }
    }

    fn open(&mut self, element: &BytesStart<'_>) -> Result<()> {
        let name = element_name(element);
        let attrs = Attributes::read(element)?;

        match name.as_str() {
            "events" => {
                self.in_events = true;
                if let Some(style) = attrs.get("style") {
                    self.doc.style = Some(style.to_string());
                }
            }
            "event" if self.in_events => self.open_event(&attrs),
            "statemachine" => {
                if self.pattern.is_some() {
                    self.doc.diagnostics.push(LoadDiagnostic::warning(
                        &self.doc.source_name,
                        "nested stateMachine element ignored",
                    ));
                    self.skip_depth = 1;
                    return Ok(());
                }
                let pattern_name = attrs.name();
                let mut pattern = PatternDecl {
                    name: pattern_name,
                    ..Default::default()
                };
                if pattern.name.is_empty() {
                    pattern.errors.push("pattern has no name".to_string());
                }
                self.pattern = Some(pattern);
            }
            "state" if self.pattern.is_some() => {
                let id = match attrs.int("id") {
                    Ok(id) => id,
                    Err(message) => {
                        self.pattern_error(format!("state '{}': {}", attrs.name(), message));
                        -1
                    }
                };
                self.state = Some(StateDecl {
                    name: attrs.name(),
                    id,
                    start: attrs.flag("start_state"),
                    transitions: Vec::new(),
                });
            }
            "transition" if self.state.is_some() => {
                let event_id = attrs.int("event_id");
                let next_state_id = attrs.int("next_state_id");
                let (event_id, next_state_id) = match (event_id, next_state_id) {
                    (Ok(event_id), Ok(next_state_id)) => (event_id, next_state_id),
                    (Err(message), _) | (_, Err(message)) => {
                        self.pattern_error(format!("transition '{}': {}", attrs.name(), message));
                        (-1, -1)
                    }
                };
                self.transition = Some(TransitionDecl {
                    name: attrs.name(),
                    event_id,
                    next_state_id,
                    actions: Vec::new(),
                });
            }
            "action" if self.transition.is_some() => {
                let id = match attrs.int("id") {
                    Ok(id) => id,
                    Err(message) => {
                        self.pattern_error(format!("action: {}", message));
                        -1
                    }
                };
                self.action = Some(Action::new(id));
            }
            "intparameter" | "floatparameter" | "doubleparameter" | "boolparameter"
            | "stringparameter"
                if self.action.is_some() =>
            {
                self.open_parameter(&name, &attrs);
            }
            "state" | "transition" | "action" | "event" => {
                self.doc.diagnostics.push(LoadDiagnostic::warning(
                    &self.doc.source_name,
                    format!("<{}> outside of its parent element ignored", name),
                ));
            }
            _ => {}
        }
        Ok(())
    }

    fn open_event(&mut self, attrs: &Attributes) {
        let parsed = (|| {
            Ok::<_, String>(EventDescription {
                name: attrs.name(),
                id: attrs.int("id")?,
                event_type: attrs.code("type")?,
                button: attrs.code("button")?,
                button_state: attrs.code("buttonstate")?,
                key: attrs.code("key")?,
            })
        })();

        match parsed {
            Ok(description) => self.doc.events.push(description),
            Err(message) => self.doc.diagnostics.push(LoadDiagnostic::warning(
                "events",
                format!("event '{}' skipped: {}", attrs.name(), message),
            )),
        }
    }

    fn open_parameter(&mut self, kind: &str, attrs: &Attributes) {
        let name = attrs.name();
        let raw = attrs.get("value").unwrap_or_default();
        let value = match kind {
            "intparameter" => raw.trim().parse::<i64>().ok().map(PropertyValue::Int),
            "floatparameter" | "doubleparameter" => {
                raw.trim().parse::<f64>().ok().map(PropertyValue::Float)
            }
            "boolparameter" => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(PropertyValue::Bool(true)),
                "false" | "0" => Some(PropertyValue::Bool(false)),
                _ => None,
            },
            _ => Some(PropertyValue::String(raw.to_string())),
        };

        match (value, &mut self.action) {
            (Some(value), Some(action)) if !name.is_empty() => {
                action.properties.insert(name, value);
            }
            _ => {
                let scope = self
                    .pattern
                    .as_ref()
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                self.doc.diagnostics.push(LoadDiagnostic::warning(
                    scope,
                    format!("parameter '{}' with value {:?} skipped", name, raw),
                ));
            }
        }
    }

    fn close(&mut self, name: &str) {
        match name {
            "events" => self.in_events = false,
            "action" => {
                if let (Some(action), Some(transition)) = (self.action.take(), &mut self.transition) {
                    transition.actions.push(action);
                }
            }
            "transition" => {
                if let (Some(transition), Some(state)) = (self.transition.take(), &mut self.state) {
                    state.transitions.push(transition);
                }
            }
            "state" => {
                if let (Some(state), Some(pattern)) = (self.state.take(), &mut self.pattern) {
                    pattern.states.push(state);
                }
            }
            "statemachine" => {
                if let Some(pattern) = self.pattern.take() {
                    for error in &pattern.errors {
                        self.doc
                            .diagnostics
                            .push(LoadDiagnostic::error(&pattern.name, error.clone()));
                    }
                    self.doc.patterns.push(pattern);
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> Result<BehaviorDocument> {
        if self.pattern.is_some() {
            return Err(Error::behavior_parse(
                &self.doc.source_name,
                "unterminated stateMachine element",
            ));
        }
        tracing::debug!(
            "Read {} patterns and {} event descriptions from {}",
            self.doc.patterns.len(),
            self.doc.events.len(),
            self.doc.source_name
        );
        Ok(self.doc)
    }
}
