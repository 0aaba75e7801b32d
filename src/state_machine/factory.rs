//! Pattern registry
//!
//! The factory turns pattern declarations into validated, connected
//! [`StateMachinePattern`]s and hands out the start state or a fresh
//! machine per pattern name. The first registration of a name wins.

use crate::behavior::{BehaviorDocument, LoadDiagnostic, PatternDecl, Severity, StateDecl};
use crate::state_machine::{Behavior, State, StateMachine, StateMachinePattern, Transition};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Outcome of loading one behavior source into the factory
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub source_name: String,
    pub registered: Vec<String>,
    pub rejected: Vec<String>,
    pub ignored_duplicates: Vec<String>,
    pub already_loaded: bool,
    pub diagnostics: Vec<LoadDiagnostic>,
}

impl LoadReport {
    pub fn has_rejections(&self) -> bool {
        !self.rejected.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}

#[derive(Debug, Default)]
pub struct StateMachineFactory {
    patterns: HashMap<String, Arc<StateMachinePattern>>,
    order: Vec<String>,
    loaded_sources: HashSet<String>,
}

impl StateMachineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and register a behavior description file.
    ///
    /// The canonical path identifies the source, so loading it again is a
    /// no-op.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<LoadReport> {
        let path = path.as_ref();
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let document = BehaviorDocument::from_file(&canonical)?;
        Ok(self.load_document(&document))
    }

    pub fn load_str(&mut self, source_name: &str, text: &str) -> Result<LoadReport> {
        let document = BehaviorDocument::parse(source_name, text)?;
        Ok(self.load_document(&document))
    }

    /// Register every valid pattern of a parsed document.
    ///
    /// Malformed patterns are reported and skipped; they never abort the
    /// rest of the load.
    pub fn load_document(&mut self, document: &BehaviorDocument) -> LoadReport {
        let mut report = LoadReport {
            source_name: document.source_name.clone(),
            ..Default::default()
        };
        if !self.loaded_sources.insert(document.source_name.clone()) {
            tracing::info!("{} already loaded, skipping", document.source_name);
            report.already_loaded = true;
            return report;
        }

        report.diagnostics = document.diagnostics.clone();
        for diagnostic in document.diagnostics.iter().filter(|d| d.scope != "events") {
            diagnostic.log(&document.source_name);
        }

        for decl in &document.patterns {
            if !decl.errors.is_empty() {
                tracing::warn!(
                    "{}: pattern '{}' rejected with {} error(s)",
                    document.source_name,
                    decl.name,
                    decl.errors.len()
                );
                report.rejected.push(decl.name.clone());
                continue;
            }
            if self.patterns.contains_key(&decl.name) {
                let diagnostic = LoadDiagnostic::warning(
                    &decl.name,
                    "a pattern with this name is already registered, keeping the first",
                );
                diagnostic.log(&document.source_name);
                report.diagnostics.push(diagnostic);
                report.ignored_duplicates.push(decl.name.clone());
                continue;
            }

            let mut diagnostics = Vec::new();
            match build_pattern(decl, &mut diagnostics) {
                Ok(pattern) => {
                    report.registered.push(pattern.name().to_string());
                    self.register_pattern(pattern);
                }
                Err(err) => {
                    diagnostics.push(LoadDiagnostic::error(&decl.name, err.to_string()));
                    report.rejected.push(decl.name.clone());
                }
            }
            for diagnostic in &diagnostics {
                diagnostic.log(&document.source_name);
            }
            report.diagnostics.extend(diagnostics);
        }

        tracing::info!(
            "Loaded {}: {} pattern(s) registered, {} rejected",
            document.source_name,
            report.registered.len(),
            report.rejected.len()
        );
        report
    }

    /// Register an already built pattern; false if the name is taken
    pub fn register_pattern(&mut self, pattern: StateMachinePattern) -> bool {
        let name = pattern.name().to_string();
        if self.patterns.contains_key(&name) {
            tracing::warn!("Pattern '{}' already registered, keeping the first", name);
            return false;
        }
        self.patterns.insert(name.clone(), Arc::new(pattern));
        self.order.push(name);
        true
    }

    /// Start state of a pattern, `None` when no such pattern exists
    pub fn start_state(&self, pattern_name: &str) -> Option<&State> {
        self.patterns
            .get(pattern_name)
            .map(|pattern| pattern.start_state())
    }

    pub fn pattern(&self, pattern_name: &str) -> Option<Arc<StateMachinePattern>> {
        self.patterns.get(pattern_name).cloned()
    }

    /// Names in registration order
    pub fn pattern_names(&self) -> &[String] {
        &self.order
    }

    pub fn contains(&self, pattern_name: &str) -> bool {
        self.patterns.contains_key(pattern_name)
    }

    pub fn is_loaded(&self, source_name: &str) -> bool {
        self.loaded_sources.contains(source_name)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// New machine of the named pattern, positioned on its start state
    pub fn create<B: Behavior>(&self, pattern_name: &str, behavior: B) -> Result<StateMachine<B>> {
        let pattern = self
            .pattern(pattern_name)
            .ok_or_else(|| Error::UnknownPattern(pattern_name.to_string()))?;
        Ok(StateMachine::new(pattern, behavior))
    }
}

/// Build and connect one declared pattern.
///
/// Warnings for recoverable problems go to `diagnostics`; anything that
/// makes the pattern unusable is returned as an error.
pub fn build_pattern(
    decl: &PatternDecl,
    diagnostics: &mut Vec<LoadDiagnostic>,
) -> Result<StateMachinePattern> {
    let first = decl
        .states
        .first()
        .ok_or_else(|| Error::malformed(&decl.name, "pattern has no states"))?;

    let starts: Vec<&StateDecl> = decl.states.iter().filter(|s| s.start).collect();
    let start_id = match starts.as_slice() {
        [] => {
            diagnostics.push(LoadDiagnostic::warning(
                &decl.name,
                format!("no start state marked, using '{}'", first.name),
            ));
            first.id
        }
        [start] => start.id,
        _ => {
            let names: Vec<&str> = starts.iter().map(|s| s.name.as_str()).collect();
            return Err(Error::malformed(
                &decl.name,
                format!("more than one start state: {}", names.join(", ")),
            ));
        }
    };

    let mut states = Vec::with_capacity(decl.states.len());
    for state_decl in &decl.states {
        let mut state = State::new(&state_decl.name, state_decl.id);
        for transition_decl in &state_decl.transitions {
            let mut transition = Transition::new(
                &transition_decl.name,
                transition_decl.event_id,
                transition_decl.next_state_id,
            );
            transition.actions = transition_decl.actions.clone();
            if !state.add_transition(transition) {
                diagnostics.push(LoadDiagnostic::warning(
                    &decl.name,
                    format!(
                        "state '{}' already has a transition for event {}, '{}' skipped",
                        state_decl.name, transition_decl.event_id, transition_decl.name
                    ),
                ));
            }
        }
        states.push(state);
    }

    let pattern = StateMachinePattern::from_states(&decl.name, states, start_id)?;
    for state in pattern.unreachable_states() {
        diagnostics.push(LoadDiagnostic::warning(
            &decl.name,
            format!("state '{}' is unreachable from the start state", state.name),
        ));
    }
    Ok(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

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
      <transition name="again" event_id="11" next_state_id="1"/>
    </state>
  </stateMachine>
  <stateMachine name="broken">
    <state name="A" id="0" start_state="true">
      <transition name="lost" event_id="1" next_state_id="99"/>
    </state>
  </stateMachine>
</behavior>
"#;

    #[test]
    fn test_load_registers_valid_and_rejects_broken() {
        let mut factory = StateMachineFactory::new();
        let report = factory.load_str("inline", SOURCE).unwrap();

        assert_eq!(report.registered, vec!["toggle"]);
        assert_eq!(report.rejected, vec!["broken"]);
        assert!(factory.start_state("broken").is_none());
        assert_eq!(factory.start_state("toggle").unwrap().name, "Idle");
    }

    #[test]
    fn test_duplicate_transition_keeps_first() {
        let mut factory = StateMachineFactory::new();
        let report = factory.load_str("inline", SOURCE).unwrap();

        let pattern = factory.pattern("toggle").unwrap();
        let armed = pattern.state_by_id(1).unwrap();
        assert_eq!(armed.transition(11).unwrap().name, "disarm");
        assert!(report.warning_count() >= 1);
    }

    #[test]
    fn test_same_source_loads_once() {
        let mut factory = StateMachineFactory::new();
        factory.load_str("inline", SOURCE).unwrap();
        let again = factory.load_str("inline", SOURCE).unwrap();

        assert!(again.already_loaded);
        assert!(again.registered.is_empty());
        assert!(factory.is_loaded("inline"));
    }

    #[test]
    fn test_first_pattern_name_wins() {
        let mut factory = StateMachineFactory::new();
        factory.load_str("first", SOURCE).unwrap();
        let other = r#"
<behavior>
  <stateMachine name="toggle">
    <state name="Other" id="5" start_state="true"/>
  </stateMachine>
</behavior>"#;
        let report = factory.load_str("second", other).unwrap();

        assert_eq!(report.ignored_duplicates, vec!["toggle"]);
        assert_eq!(factory.start_state("toggle").unwrap().name, "Idle");
        assert_eq!(factory.pattern_names(), &["toggle".to_string()]);
    }

    #[test]
    fn test_start_state_rules() {
        let mut factory = StateMachineFactory::new();
        let source = r#"
<behavior>
  <stateMachine name="implicit">
    <state name="First" id="3"/>
    <state name="Second" id="4"/>
  </stateMachine>
  <stateMachine name="ambiguous">
    <state name="A" id="0" start_state="true"/>
    <state name="B" id="1" start_state="true"/>
  </stateMachine>
</behavior>"#;
        let report = factory.load_str("starts", source).unwrap();

        assert_eq!(factory.start_state("implicit").unwrap().name, "First");
        assert_eq!(report.rejected, vec!["ambiguous"]);
    }

    #[test]
    fn test_create_unknown_pattern() {
        let factory = StateMachineFactory::new();
        let err = factory.create("missing", ()).unwrap_err();
        assert!(matches!(err, Error::UnknownPattern(name) if name == "missing"));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SOURCE.as_bytes()).unwrap();

        let mut factory = StateMachineFactory::new();
        let report = factory.load_file(file.path()).unwrap();
        assert_eq!(report.registered, vec!["toggle"]);
        assert!(factory.load_file(file.path()).unwrap().already_loaded);
        assert!(factory.load_file("/nonexistent/behavior.xml").is_err());
    }
}
