//! State machine module - patterns, the pattern registry and the interpreter
//!
//! Patterns are loaded once and shared read-only; every [`StateMachine`]
//! only keeps its own current state per time step.

pub mod action;
pub mod analyzer;
pub mod factory;
pub mod graph;
pub mod machine;
pub mod pattern;
pub mod state;
pub mod transition;

// Re-export key types
pub use action::{Action, ActionId, PropertyValue, action_id};
pub use analyzer::{PatternReport, PatternShape, analyze};
pub use factory::{LoadReport, StateMachineFactory, build_pattern};
pub use graph::{GraphStats, PatternGraph};
pub use machine::{
    ActionContext, ActionHandler, BASE_RELEVANCE, Behavior, BuiltinAction, MAX_TIME_STEPS, StateCursor,
    StateMachine,
};
pub use pattern::StateMachinePattern;
pub use state::{State, StateId, StateIndex};
pub use transition::Transition;

/// Render a pattern as Graphviz DOT
pub fn to_dot(pattern: &StateMachinePattern) -> String {
    PatternGraph::from_pattern(pattern).to_dot()
}
