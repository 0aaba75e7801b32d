//! State machine interpreter
//!
//! A [`StateMachine`] walks a shared [`StateMachinePattern`]. Each transition
//! runs its actions through a two-tier table: handlers registered on the
//! machine (built-ins included) first, then the [`Behavior`] fallback.

use crate::event::StateEvent;
use crate::interaction::{GlobalInteraction, InteractorMode, StateEventHandler, WeakDispatcher};
use crate::state_machine::{Action, ActionId, State, StateIndex, StateMachinePattern, action_id};
use crate::undo::{ActorRef, Operation, OperationActor, OperationEvent, OperationPayload};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// Relevance reported by default when the current state knows the event
pub const BASE_RELEVANCE: f32 = 0.5;

/// Upper bound on per-machine time steps
pub const MAX_TIME_STEPS: usize = 1 << 20;

/// Type-specific part of an interaction: fallback actions and relevance
pub trait Behavior: 'static {
    /// Called for action ids with no registered handler
    fn execute_action(&mut self, ctx: &mut ActionContext<'_>) -> bool {
        tracing::warn!(
            "{}: no handler for action {}",
            ctx.machine_type(),
            ctx.action().id
        );
        false
    }

    /// Relevance in `[0, 1]` while the machine sits in `state`
    fn can_handle_event(&self, state: &State, event: &StateEvent) -> f32 {
        if state.is_valid_event(event.id()) {
            BASE_RELEVANCE
        } else {
            0.0
        }
    }
}

impl Behavior for () {}

/// A callable bound to an action id
pub trait ActionHandler<B> {
    fn execute(&mut self, behavior: &mut B, ctx: &mut ActionContext<'_>) -> bool;
}

impl<B, F> ActionHandler<B> for F
where
    F: FnMut(&mut B, &mut ActionContext<'_>) -> bool,
{
    fn execute(&mut self, behavior: &mut B, ctx: &mut ActionContext<'_>) -> bool {
        self(behavior, ctx)
    }
}

/// Actions every machine understands without registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinAction {
    DoNothing,
    SetMode(InteractorMode),
}

impl BuiltinAction {
    fn for_id(id: ActionId) -> Option<Self> {
        match id {
            action_id::DO_NOTHING => Some(BuiltinAction::DoNothing),
            action_id::MODE_DESELECT => Some(BuiltinAction::SetMode(InteractorMode::Deselected)),
            action_id::MODE_SELECT => Some(BuiltinAction::SetMode(InteractorMode::Selected)),
            action_id::MODE_SUBSELECT => Some(BuiltinAction::SetMode(InteractorMode::Subselected)),
            _ => None,
        }
    }

    fn execute(self, ctx: &mut ActionContext<'_>) -> bool {
        if let BuiltinAction::SetMode(mode) = self {
            ctx.set_mode(mode);
        }
        true
    }
}

enum ActionEntry<B> {
    Builtin(BuiltinAction),
    Handler(Box<dyn ActionHandler<B>>),
}

/// What an action sees while it runs
pub struct ActionContext<'a> {
    action: &'a Action,
    event: &'a StateEvent,
    machine_type: &'a str,
    time_step: usize,
    mode: &'a mut InteractorMode,
    dispatcher: Option<&'a GlobalInteraction>,
}

impl<'a> ActionContext<'a> {
    pub fn action(&self) -> &Action {
        self.action
    }

    pub fn event(&self) -> &StateEvent {
        self.event
    }

    pub fn machine_type(&self) -> &str {
        self.machine_type
    }

    pub fn time_step(&self) -> usize {
        self.time_step
    }

    pub fn mode(&self) -> InteractorMode {
        *self.mode
    }

    pub fn set_mode(&mut self, mode: InteractorMode) {
        if *self.mode != mode {
            tracing::debug!("{}: mode {:?} -> {:?}", self.machine_type, self.mode, mode);
        }
        *self.mode = mode;
    }

    /// Dispatcher the machine is attached to, if it is still alive
    pub fn dispatcher(&self) -> Option<&GlobalInteraction> {
        self.dispatcher
    }

    /// Record an undo entry stamped with the current event ids.
    ///
    /// Returns false when the machine has no dispatcher.
    pub fn record_operation(
        &self,
        actor: &ActorRef,
        operation: Operation,
        undo_operation: Operation,
        description: impl Into<String>,
    ) -> bool {
        let Some(dispatcher) = self.dispatcher else {
            return false;
        };
        let event = OperationEvent::new(
            actor,
            operation,
            undo_operation,
            dispatcher.object_event_id(),
            dispatcher.group_event_id(),
        )
        .with_description(description);
        dispatcher.set_operation_event(event)
    }

    /// Dispatch a follow-up event through the dispatcher
    pub fn post_event(&self, event: &StateEvent) -> bool {
        match self.dispatcher {
            Some(dispatcher) => dispatcher.handle_event(event),
            None => false,
        }
    }
}

/// Current state per time step; the undo actor of a machine
#[derive(Debug)]
pub struct StateCursor {
    pattern: Arc<StateMachinePattern>,
    states: Vec<StateIndex>,
}

impl StateCursor {
    fn new(pattern: Arc<StateMachinePattern>) -> Self {
        let start = pattern.start_index();
        Self {
            pattern,
            states: vec![start],
        }
    }

    fn get(&self, time_step: usize) -> StateIndex {
        self.states
            .get(time_step)
            .copied()
            .unwrap_or_else(|| self.pattern.start_index())
    }

    fn set(&mut self, time_step: usize, index: StateIndex) {
        if self.grow(time_step) {
            self.states[time_step] = index;
        }
    }

    /// New slots start in the start state. False when `time_step` is
    /// beyond [`MAX_TIME_STEPS`].
    fn grow(&mut self, time_step: usize) -> bool {
        if time_step >= MAX_TIME_STEPS {
            tracing::warn!(
                "{}: time step {} exceeds the limit of {}",
                self.pattern.name(),
                time_step,
                MAX_TIME_STEPS
            );
            return false;
        }
        if time_step >= self.states.len() {
            let start = self.pattern.start_index();
            self.states.resize(time_step + 1, start);
        }
        true
    }

    pub fn time_steps(&self) -> usize {
        self.states.len()
    }
}

impl OperationActor for StateCursor {
    fn execute_operation(&mut self, operation: &Operation) {
        let OperationPayload::StateChange {
            state_id,
            time_step,
        } = operation.payload
        else {
            tracing::debug!(
                "{}: ignoring operation {}",
                self.pattern.name(),
                operation.op_type
            );
            return;
        };
        match self.pattern.index_of(state_id) {
            Some(index) => self.set(time_step, index),
            None => tracing::warn!(
                "{}: cannot restore unknown state id {}",
                self.pattern.name(),
                state_id
            ),
        }
    }
}

/// An instance of an interaction pattern
pub struct StateMachine<B: Behavior = ()> {
    pattern: Arc<StateMachinePattern>,
    cursor: Rc<RefCell<StateCursor>>,
    time_step: usize,
    actions: HashMap<ActionId, ActionEntry<B>>,
    behavior: B,
    mode: InteractorMode,
    undo_enabled: bool,
    dispatcher: Option<WeakDispatcher>,
}

impl<B: Behavior> StateMachine<B> {
    pub fn new(pattern: Arc<StateMachinePattern>, behavior: B) -> Self {
        let actions = [
            action_id::DO_NOTHING,
            action_id::MODE_DESELECT,
            action_id::MODE_SELECT,
            action_id::MODE_SUBSELECT,
        ]
        .into_iter()
        .filter_map(|id| BuiltinAction::for_id(id).map(|b| (id, ActionEntry::Builtin(b))))
        .collect();

        Self {
            cursor: Rc::new(RefCell::new(StateCursor::new(Arc::clone(&pattern)))),
            pattern,
            time_step: 0,
            actions,
            behavior,
            mode: InteractorMode::Deselected,
            undo_enabled: true,
            dispatcher: None,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: &GlobalInteraction) -> Self {
        self.set_dispatcher(dispatcher);
        self
    }

    pub fn set_dispatcher(&mut self, dispatcher: &GlobalInteraction) {
        self.dispatcher = Some(dispatcher.downgrade());
    }

    /// Bind a closure to an action id, replacing any earlier entry
    pub fn register_action<F>(&mut self, id: ActionId, handler: F)
    where
        F: FnMut(&mut B, &mut ActionContext<'_>) -> bool + 'static,
    {
        self.register_handler(id, Box::new(handler));
    }

    pub fn register_handler(&mut self, id: ActionId, handler: Box<dyn ActionHandler<B>>) {
        if self.actions.insert(id, ActionEntry::Handler(handler)).is_some() {
            tracing::debug!("{}: action {} handler replaced", self.pattern.name(), id);
        }
    }

    pub fn has_action(&self, id: ActionId) -> bool {
        self.actions.contains_key(&id)
    }

    pub fn enable_undo(&mut self, enabled: bool) {
        self.undo_enabled = enabled;
    }

    pub fn is_undo_enabled(&self) -> bool {
        self.undo_enabled
    }

    pub fn pattern(&self) -> &Arc<StateMachinePattern> {
        &self.pattern
    }

    pub fn type_name(&self) -> &str {
        self.pattern.name()
    }

    pub fn time_step(&self) -> usize {
        self.time_step
    }

    /// Select a time step; slots up to it are created in the start state.
    ///
    /// Returns false and keeps the current time step when `time_step` is
    /// beyond [`MAX_TIME_STEPS`].
    pub fn update_time_step(&mut self, time_step: usize) -> bool {
        if !self.cursor.borrow_mut().grow(time_step) {
            return false;
        }
        self.time_step = time_step;
        true
    }

    pub fn time_step_count(&self) -> usize {
        self.cursor.borrow().time_steps()
    }

    pub fn reset_to_start_state(&mut self) {
        let start = self.pattern.start_index();
        self.cursor.borrow_mut().set(self.time_step, start);
    }

    pub fn current_state_index(&self) -> StateIndex {
        self.cursor.borrow().get(self.time_step)
    }

    pub fn current_state(&self) -> &State {
        let index = self.current_state_index();
        self.pattern
            .state(index)
            .unwrap_or_else(|| self.pattern.start_state())
    }

    pub fn mode(&self) -> InteractorMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: InteractorMode) {
        self.mode = mode;
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }

    /// Undo actor moving this machine between states
    pub fn state_actor(&self) -> ActorRef {
        self.cursor.clone()
    }

    pub fn into_shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    /// Fire the transition for `event` from the current state.
    ///
    /// All actions run in order even after one fails. The state only
    /// advances, and is only recorded for undo, when every action succeeded.
    pub fn handle_event(&mut self, event: &StateEvent) -> bool {
        let pattern = Arc::clone(&self.pattern);
        let current = self.current_state_index();
        let Some(state) = pattern.state(current) else {
            return false;
        };
        let Some(transition) = state.transition(event.id()) else {
            tracing::trace!(
                "{}: state {} has no transition for event {}",
                pattern.name(),
                state.display_short(),
                event.id()
            );
            return false;
        };
        let Some(next) = transition.next_state() else {
            tracing::warn!(
                "{}: transition {} is not connected",
                pattern.name(),
                transition.display_label()
            );
            return false;
        };

        let dispatcher = self.dispatcher.as_ref().and_then(WeakDispatcher::upgrade);
        let mut ok = true;
        for action in &transition.actions {
            let mut ctx = ActionContext {
                action,
                event,
                machine_type: pattern.name(),
                time_step: self.time_step,
                mode: &mut self.mode,
                dispatcher: dispatcher.as_ref(),
            };
            let executed = match self.actions.get_mut(&action.id) {
                Some(ActionEntry::Builtin(builtin)) => builtin.execute(&mut ctx),
                Some(ActionEntry::Handler(handler)) => handler.execute(&mut self.behavior, &mut ctx),
                None => self.behavior.execute_action(&mut ctx),
            };
            if !executed {
                tracing::warn!(
                    "{}: action {} of {} failed",
                    pattern.name(),
                    action.id,
                    transition.display_label()
                );
                ok = false;
            }
        }
        if !ok {
            return false;
        }

        let Some(target) = pattern.state(next) else {
            return false;
        };
        if self.undo_enabled
            && let Some(dispatcher) = &dispatcher
        {
            let actor = self.state_actor();
            let entry = OperationEvent::new(
                &actor,
                Operation::state_change(target.id, self.time_step),
                Operation::state_change(state.id, self.time_step),
                dispatcher.object_event_id(),
                dispatcher.group_event_id(),
            )
            .with_description(format!(
                "{}: {} -> {} on {}",
                pattern.name(),
                state.name,
                target.name,
                transition.display_label()
            ));
            dispatcher.set_operation_event(entry);
        }

        tracing::debug!(
            "{}: {} -> {} on event {}",
            pattern.name(),
            state.display_short(),
            target.display_short(),
            event.id()
        );
        self.cursor.borrow_mut().set(self.time_step, next);
        true
    }

    pub fn can_handle_event(&self, event: &StateEvent) -> f32 {
        self.behavior
            .can_handle_event(self.current_state(), event)
            .clamp(0.0, 1.0)
    }
}

impl<B: Behavior> StateEventHandler for StateMachine<B> {
    fn handle_event(&mut self, event: &StateEvent) -> bool {
        StateMachine::handle_event(self, event)
    }

    fn can_handle_event(&self, event: &StateEvent) -> f32 {
        StateMachine::can_handle_event(self, event)
    }

    fn mode(&self) -> InteractorMode {
        self.mode
    }

    fn type_name(&self) -> &str {
        self.pattern.name()
    }
}

impl<B: Behavior> std::fmt::Debug for StateMachine<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("type", &self.pattern.name())
            .field("current", &self.current_state_index())
            .field("time_step", &self.time_step)
            .field("mode", &self.mode)
            .field("undo_enabled", &self.undo_enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::Transition;

    #[derive(Default)]
    struct Recorder {
        fired: Vec<ActionId>,
        refuse: Option<ActionId>,
    }

    impl Behavior for Recorder {
        fn execute_action(&mut self, ctx: &mut ActionContext<'_>) -> bool {
            let id = ctx.action().id;
            self.fired.push(id);
            self.refuse != Some(id)
        }
    }

    fn toggle() -> Arc<StateMachinePattern> {
        let mut idle = State::new("Idle", 0);
        idle.add_transition(Transition::new("arm", 10, 1).with_action(Action::new(1)));
        let mut armed = State::new("Armed", 1);
        armed.add_transition(
            Transition::new("disarm", 11, 0)
                .with_action(Action::new(2))
                .with_action(Action::new(3)),
        );
        Arc::new(StateMachinePattern::from_states("toggle", vec![idle, armed], 0).unwrap())
    }

    #[test]
    fn test_transitions_fire_actions_in_order() {
        let mut machine = StateMachine::new(toggle(), Recorder::default());

        assert!(machine.handle_event(&StateEvent::new(10)));
        assert_eq!(machine.current_state().name, "Armed");
        assert!(machine.handle_event(&StateEvent::new(11)));
        assert_eq!(machine.current_state().name, "Idle");
        assert_eq!(machine.behavior().fired, vec![1, 2, 3]);
    }

    #[test]
    fn test_unknown_event_is_silent() {
        let mut machine = StateMachine::new(toggle(), Recorder::default());

        assert!(!machine.handle_event(&StateEvent::new(11)));
        assert_eq!(machine.current_state().name, "Idle");
        assert!(machine.behavior().fired.is_empty());
    }

    #[test]
    fn test_failed_action_keeps_state_but_runs_rest() {
        let recorder = Recorder {
            refuse: Some(2),
            ..Default::default()
        };
        let mut machine = StateMachine::new(toggle(), recorder);
        machine.handle_event(&StateEvent::new(10));

        assert!(!machine.handle_event(&StateEvent::new(11)));
        assert_eq!(machine.current_state().name, "Armed");
        assert_eq!(machine.behavior().fired, vec![1, 2, 3]);
    }

    #[test]
    fn test_registered_handler_takes_precedence() {
        let mut machine = StateMachine::new(toggle(), Recorder::default());
        machine.register_action(1, |recorder: &mut Recorder, _ctx: &mut ActionContext<'_>| {
            recorder.fired.push(100);
            true
        });

        assert!(machine.handle_event(&StateEvent::new(10)));
        assert_eq!(machine.behavior().fired, vec![100]);
    }

    #[test]
    fn test_builtin_mode_actions() {
        let mut idle = State::new("Idle", 0);
        idle.add_transition(
            Transition::new("pick", 1, 1).with_action(Action::new(action_id::MODE_SELECT)),
        );
        let mut picked = State::new("Picked", 1);
        picked.add_transition(
            Transition::new("drop", 2, 0)
                .with_action(Action::new(action_id::DO_NOTHING))
                .with_action(Action::new(action_id::MODE_DESELECT)),
        );
        let pattern =
            Arc::new(StateMachinePattern::from_states("picker", vec![idle, picked], 0).unwrap());
        let mut machine = StateMachine::new(pattern, ());

        assert!(machine.handle_event(&StateEvent::new(1)));
        assert_eq!(machine.mode(), InteractorMode::Selected);
        assert!(machine.handle_event(&StateEvent::new(2)));
        assert_eq!(machine.mode(), InteractorMode::Deselected);
    }

    #[test]
    fn test_unhandled_action_fails_by_default() {
        let mut machine = StateMachine::new(toggle(), ());
        assert!(!machine.handle_event(&StateEvent::new(10)));
        assert_eq!(machine.current_state().name, "Idle");
    }

    #[test]
    fn test_time_steps_grow_from_start_state() {
        let mut machine = StateMachine::new(toggle(), Recorder::default());
        machine.handle_event(&StateEvent::new(10));

        machine.update_time_step(3);
        assert_eq!(machine.time_step_count(), 4);
        assert_eq!(machine.current_state().name, "Idle");

        machine.update_time_step(0);
        assert_eq!(machine.current_state().name, "Armed");
        assert_eq!(machine.time_step_count(), 4);

        machine.reset_to_start_state();
        assert_eq!(machine.current_state().name, "Idle");
    }

    #[test]
    fn test_time_step_beyond_limit_rejected() {
        let mut machine = StateMachine::new(toggle(), Recorder::default());
        machine.update_time_step(2);

        assert!(!machine.update_time_step(usize::MAX));
        assert!(!machine.update_time_step(MAX_TIME_STEPS));
        assert_eq!(machine.time_step(), 2);
        assert_eq!(machine.time_step_count(), 3);

        machine
            .state_actor()
            .borrow_mut()
            .execute_operation(&Operation::state_change(1, usize::MAX));
        assert_eq!(machine.time_step_count(), 3);
    }

    #[test]
    fn test_default_relevance() {
        let machine = StateMachine::new(toggle(), ());
        assert_eq!(machine.can_handle_event(&StateEvent::new(10)), BASE_RELEVANCE);
        assert_eq!(machine.can_handle_event(&StateEvent::new(11)), 0.0);
    }

    #[test]
    fn test_cursor_restores_state_change() {
        let machine = StateMachine::new(toggle(), Recorder::default());
        machine
            .state_actor()
            .borrow_mut()
            .execute_operation(&Operation::state_change(1, 0));
        assert_eq!(machine.current_state().name, "Armed");
    }
}
