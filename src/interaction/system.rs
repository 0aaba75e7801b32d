//! Start-up wiring of factory, event mapper and dispatcher

use crate::behavior::BehaviorDocument;
use crate::config::Config;
use crate::event::{EventMapper, InputEvent};
use crate::interaction::GlobalInteraction;
use crate::state_machine::{Behavior, LoadReport, StateMachine, StateMachineFactory};
use crate::Result;
use std::path::Path;

/// Everything an application needs to turn raw input into machine steps
#[derive(Debug)]
pub struct InteractionSystem {
    factory: StateMachineFactory,
    mapper: EventMapper,
    dispatcher: GlobalInteraction,
    undo_enabled: bool,
    reports: Vec<LoadReport>,
}

impl Default for InteractionSystem {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl InteractionSystem {
    /// Build from configuration. Behavior files that cannot be read are
    /// logged and skipped.
    pub fn from_config(config: &Config) -> Self {
        let mut system = Self {
            factory: StateMachineFactory::new(),
            mapper: EventMapper::new(),
            dispatcher: GlobalInteraction::from_config(&config.dispatch, &config.undo),
            undo_enabled: config.undo.enabled,
            reports: Vec::new(),
        };

        for path in &config.behavior.files {
            if let Err(e) = system.load_behavior_file(path) {
                tracing::error!("Failed to load behavior file {}: {}", path.display(), e);
            }
        }
        system
    }

    /// Load patterns and the event table of one file
    pub fn load_behavior_file(&mut self, path: impl AsRef<Path>) -> Result<&LoadReport> {
        let path = path.as_ref();
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let document = BehaviorDocument::from_file(&canonical)?;
        Ok(self.load_document(&document))
    }

    pub fn load_behavior_str(&mut self, source_name: &str, text: &str) -> Result<&LoadReport> {
        let document = BehaviorDocument::parse(source_name, text)?;
        Ok(self.load_document(&document))
    }

    fn load_document(&mut self, document: &BehaviorDocument) -> &LoadReport {
        let report = self.factory.load_document(document);
        self.mapper.load_document(document);
        self.reports.push(report);
        &self.reports[self.reports.len() - 1]
    }

    /// New machine attached to this system's dispatcher
    pub fn create_machine<B: Behavior>(
        &self,
        pattern_name: &str,
        behavior: B,
    ) -> Result<StateMachine<B>> {
        let mut machine = self.factory.create(pattern_name, behavior)?;
        machine.set_dispatcher(&self.dispatcher);
        machine.enable_undo(self.undo_enabled);
        Ok(machine)
    }

    /// Translate raw input and dispatch it
    pub fn map_event(&mut self, event: &InputEvent) -> bool {
        self.mapper.map_event(event, &self.dispatcher)
    }

    pub fn factory(&self) -> &StateMachineFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut StateMachineFactory {
        &mut self.factory
    }

    pub fn mapper(&self) -> &EventMapper {
        &self.mapper
    }

    pub fn mapper_mut(&mut self) -> &mut EventMapper {
        &mut self.mapper
    }

    pub fn dispatcher(&self) -> &GlobalInteraction {
        &self.dispatcher
    }

    pub fn load_reports(&self) -> &[LoadReport] {
        &self.reports
    }
}
