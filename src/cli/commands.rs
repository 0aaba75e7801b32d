//! CLI command implementations
//!
//! This module contains the implementation for each CLI command.

use crate::behavior::BehaviorDocument;
use crate::state_machine::StateMachineFactory;
use crate::Result;
use std::path::Path;

/// Read a behavior file into a fresh factory
fn load_factory(file: &Path) -> Result<StateMachineFactory> {
    tracing::info!("Loading behavior file: {:?}", file);
    let mut factory = StateMachineFactory::new();
    factory.load_file(file)?;
    Ok(factory)
}

/// Validate command implementation
pub mod validate {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::cli::output::{ValidationOutput, output_json, output_validation_table};
    use crate::event::EventMapper;
    use crate::state_machine::analyze;

    /// Execute the validate command
    pub fn execute(file: &Path, output: OutputFormat) -> Result<()> {
        tracing::info!("Validating behavior file: {:?}", file);
        let document = BehaviorDocument::from_file(file)?;
        let mut factory = StateMachineFactory::new();
        let load = factory.load_document(&document);
        let mut mapper = EventMapper::new();
        mapper.load_document(&document);

        let patterns = factory
            .pattern_names()
            .iter()
            .filter_map(|name| factory.pattern(name))
            .map(|pattern| analyze(&pattern))
            .collect();
        let result = ValidationOutput {
            events: mapper.descriptions().to_vec(),
            patterns,
            load,
        };

        match output {
            OutputFormat::Json => output_json(&mut std::io::stdout(), &result)?,
            OutputFormat::Table => output_validation_table(&mut std::io::stdout(), &result)?,
        }

        crate::ensure!(
            !result.load.has_rejections(),
            "{} pattern(s) rejected",
            result.load.rejected.len()
        );
        Ok(())
    }
}

/// Dot command implementation
pub mod dot {
    use super::*;
    use crate::Error;

    /// Execute the dot command
    pub fn execute(file: &Path, pattern_name: &str) -> Result<()> {
        let factory = load_factory(file)?;
        let pattern = factory
            .pattern(pattern_name)
            .ok_or_else(|| Error::UnknownPattern(pattern_name.to_string()))?;

        print!("{}", crate::state_machine::to_dot(&pattern));
        Ok(())
    }
}

/// Replay command implementation
pub mod replay {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::cli::output::{ReplayOutput, ReplayStep, output_json, output_replay_table};
    use crate::event::{EventId, StateEvent};
    use crate::interaction::GlobalInteraction;
    use crate::state_machine::{ActionContext, ActionId, Behavior};
    use crate::Config;

    /// Accepts every action so the walk only depends on the pattern
    struct AcceptAll;

    impl Behavior for AcceptAll {
        fn execute_action(&mut self, _ctx: &mut ActionContext<'_>) -> bool {
            true
        }
    }

    /// Run the events through one machine and collect each step
    pub fn run(
        config: &Config,
        factory: &StateMachineFactory,
        pattern_name: &str,
        events: &[EventId],
    ) -> Result<ReplayOutput> {
        let dispatcher = GlobalInteraction::from_config(&config.dispatch, &config.undo);
        let mut machine = factory
            .create(pattern_name, AcceptAll)?
            .with_dispatcher(&dispatcher);
        machine.enable_undo(config.undo.enabled);

        let mut steps = Vec::with_capacity(events.len());
        for &event_id in events {
            let from = machine.current_state();
            let from_name = from.name.clone();
            let actions: Vec<ActionId> = from
                .transition(event_id)
                .map(|t| t.actions.iter().map(|a| a.id).collect())
                .unwrap_or_default();

            dispatcher.request_object_increment();
            dispatcher.execute_increment();
            let handled = machine.handle_event(&StateEvent::new(event_id));
            steps.push(ReplayStep {
                event_id,
                from: from_name,
                to: machine.current_state().name.clone(),
                handled,
                actions: if handled { actions } else { Vec::new() },
            });
        }

        Ok(ReplayOutput {
            pattern: pattern_name.to_string(),
            steps,
            final_state: machine.current_state().name.clone(),
            undo_history: dispatcher.undo_descriptions(),
        })
    }

    /// Execute the replay command
    pub fn execute(
        config: &Config,
        file: &Path,
        pattern_name: &str,
        events: &[EventId],
        output: OutputFormat,
    ) -> Result<()> {
        let factory = load_factory(file)?;
        let result = run(config, &factory, pattern_name, events)?;

        match output {
            OutputFormat::Json => output_json(&mut std::io::stdout(), &result),
            OutputFormat::Table => output_replay_table(&mut std::io::stdout(), &result),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        const SOURCE: &str = r#"
<behavior>
  <stateMachine name="toggle">
    <state name="Idle" id="0" start_state="true">
      <transition name="arm" event_id="10" next_state_id="1">
        <action id="1"/>
      </transition>
    </state>
    <state name="Armed" id="1">
      <transition name="disarm" event_id="11" next_state_id="0">
        <action id="2"/>
      </transition>
    </state>
  </stateMachine>
</behavior>"#;

        #[test]
        fn test_replay_walks_pattern() {
            let mut factory = StateMachineFactory::new();
            factory.load_str("inline", SOURCE).unwrap();

            let result = run(&Config::default(), &factory, "toggle", &[10, 10, 11]).unwrap();
            let handled: Vec<bool> = result.steps.iter().map(|s| s.handled).collect();

            assert_eq!(handled, vec![true, false, true]);
            assert_eq!(result.steps[0].actions, vec![1]);
            assert!(result.steps[1].actions.is_empty());
            assert_eq!(result.final_state, "Idle");
            assert_eq!(result.undo_history.len(), 2);
        }

        #[test]
        fn test_replay_unknown_pattern() {
            let factory = StateMachineFactory::new();
            assert!(run(&Config::default(), &factory, "missing", &[1]).is_err());
        }
    }
}
