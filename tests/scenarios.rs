//! End-to-end interaction scenarios driven through the public API

use interaction_fsm::behavior::constants::{button, event_type, key};
use interaction_fsm::event::{EventId, InputEvent, StateEvent};
use interaction_fsm::interaction::{
    HandlerRef, InteractorMode, NotificationPolicy, StateEventHandler,
};
use interaction_fsm::state_machine::{
    ActionContext, ActionId, Behavior, PropertyValue, StateMachineFactory,
};
use interaction_fsm::undo::{ActorRef, Operation, OperationActor, OperationPayload, operation_type};
use interaction_fsm::{Config, GlobalInteraction, InteractionSystem};
use proptest::prelude::*;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

const BEHAVIOR: &str = include_str!("../resources/StateMachine.xml");

fn factory() -> StateMachineFactory {
    let mut factory = StateMachineFactory::new();
    let report = factory.load_str("StateMachine.xml", BEHAVIOR).unwrap();
    assert!(!report.has_rejections(), "{:?}", report.diagnostics);
    factory
}

/// Accepts every action and remembers which ones ran
#[derive(Debug, Default)]
struct Recorder {
    fired: Vec<ActionId>,
}

impl Behavior for Recorder {
    fn execute_action(&mut self, ctx: &mut ActionContext<'_>) -> bool {
        self.fired.push(ctx.action().id);
        true
    }
}

/// Interactor with a constant relevance that logs every offer
struct Fixed {
    name: &'static str,
    relevance: f32,
    consumes: bool,
    log: Rc<RefCell<Vec<&'static str>>>,
}

impl Fixed {
    fn shared(
        name: &'static str,
        relevance: f32,
        consumes: bool,
        log: &Rc<RefCell<Vec<&'static str>>>,
    ) -> HandlerRef {
        Rc::new(RefCell::new(Fixed {
            name,
            relevance,
            consumes,
            log: Rc::clone(log),
        }))
    }
}

impl StateEventHandler for Fixed {
    fn handle_event(&mut self, _event: &StateEvent) -> bool {
        self.log.borrow_mut().push(self.name);
        self.consumes
    }

    fn can_handle_event(&self, _event: &StateEvent) -> f32 {
        self.relevance
    }

    fn type_name(&self) -> &str {
        self.name
    }
}

/// Listener counting what it sees
#[derive(Default)]
struct Counter {
    seen: Vec<EventId>,
}

impl StateEventHandler for Counter {
    fn handle_event(&mut self, event: &StateEvent) -> bool {
        self.seen.push(event.id());
        false
    }

    fn can_handle_event(&self, _event: &StateEvent) -> f32 {
        0.0
    }

    fn type_name(&self) -> &str {
        "counter"
    }
}

#[test]
fn test_toggle_fires_actions_in_order() {
    let factory = factory();
    let mut machine = factory.create("toggle", Recorder::default()).unwrap();

    assert!(machine.handle_event(&StateEvent::new(10)));
    assert_eq!(machine.current_state().name, "Armed");
    assert!(machine.handle_event(&StateEvent::new(11)));

    assert_eq!(machine.behavior().fired, vec![1, 2]);
    assert_eq!(machine.current_state().name, "Idle");
}

#[test]
fn test_unknown_event_leaves_machine_untouched() {
    let factory = factory();
    let mut machine = factory.create("toggle", Recorder::default()).unwrap();

    assert!(!machine.handle_event(&StateEvent::new(11)));
    assert_eq!(machine.current_state().name, "Idle");
    assert!(machine.behavior().fired.is_empty());
}

#[test]
fn test_inform_one_offers_only_most_relevant() {
    let dispatcher = GlobalInteraction::new(NotificationPolicy::InformOne);
    let log = Rc::new(RefCell::new(Vec::new()));
    dispatcher.add_interactor(Fixed::shared("low", 0.3, true, &log));
    dispatcher.add_interactor(Fixed::shared("high", 0.8, true, &log));

    assert!(dispatcher.handle_event(&StateEvent::new(1)));
    assert_eq!(*log.borrow(), vec!["high"]);
}

#[test]
fn test_dangling_target_rejects_pattern() {
    let mut factory = StateMachineFactory::new();
    let report = factory
        .load_str(
            "broken.xml",
            r#"<behavior>
                 <stateMachine name="broken">
                   <state name="A" id="0" start_state="true">
                     <transition name="away" event_id="1" next_state_id="99"/>
                   </state>
                 </stateMachine>
               </behavior>"#,
        )
        .unwrap();

    assert_eq!(report.rejected, vec!["broken".to_string()]);
    assert!(factory.start_state("broken").is_none());
    assert!(factory.create("broken", ()).is_err());
}

#[test]
fn test_first_registered_pattern_wins() {
    let mut factory = factory();
    let report = factory
        .load_str(
            "override.xml",
            r#"<behavior>
                 <stateMachine name="toggle">
                   <state name="Only" id="0" start_state="true"/>
                 </stateMachine>
               </behavior>"#,
        )
        .unwrap();

    assert_eq!(report.ignored_duplicates, vec!["toggle".to_string()]);
    let toggle = factory.pattern("toggle").unwrap();
    assert_eq!(toggle.state_count(), 2);
    assert_eq!(factory.start_state("toggle").map(|s| s.name.as_str()), Some("Idle"));
}

#[test]
fn test_reloading_same_source_is_a_no_op() {
    let mut factory = factory();
    let before = factory.len();
    let report = factory.load_str("StateMachine.xml", BEHAVIOR).unwrap();

    assert!(report.already_loaded);
    assert_eq!(factory.len(), before);
}

#[test]
fn test_every_transition_resolves() {
    let factory = factory();
    for name in factory.pattern_names() {
        let pattern = factory.pattern(name).unwrap();
        for (_, state) in pattern.states() {
            for transition in state.transitions() {
                let next = transition.next_state().unwrap();
                assert!(pattern.state(next).is_some(), "{} in {}", transition.name, name);
            }
        }
    }
}

#[test]
fn test_listeners_see_every_event() {
    let dispatcher = GlobalInteraction::default();
    let counter = Rc::new(RefCell::new(Counter::default()));
    let log = Rc::new(RefCell::new(Vec::new()));
    dispatcher.add_listener(counter.clone());
    dispatcher.add_interactor(Fixed::shared("eager", 1.0, true, &log));

    for id in [1, 2, 3] {
        assert!(dispatcher.handle_event(&StateEvent::new(id)));
    }
    assert_eq!(counter.borrow().seen, vec![1, 2, 3]);
    assert_eq!(log.borrow().len(), 3);
}

#[test]
fn test_selected_interactor_asked_first() {
    let factory = factory();
    let dispatcher = GlobalInteraction::new(NotificationPolicy::InformOne);
    let first = factory
        .create("selectable", ())
        .unwrap()
        .with_dispatcher(&dispatcher)
        .into_shared();
    let second = factory
        .create("selectable", ())
        .unwrap()
        .with_dispatcher(&dispatcher)
        .into_shared();
    let first_ref: HandlerRef = first.clone();
    let second_ref: HandlerRef = second.clone();
    dispatcher.add_interactor(first_ref.clone());
    dispatcher.add_interactor(second_ref.clone());

    // Equal relevance keeps registration order
    assert!(dispatcher.handle_event(&StateEvent::new(1)));
    assert_eq!(first.borrow().mode(), InteractorMode::Selected);
    assert_eq!(second.borrow().current_state().name, "Deselected");
    assert!(dispatcher.is_selected(&first_ref));

    assert!(dispatcher.handle_event(&StateEvent::new(2)));
    assert_eq!(first.borrow().current_state().name, "Selected");

    // Leaving the selected mode drops the interactor from the selection
    assert!(dispatcher.handle_event(&StateEvent::new(14)));
    assert_eq!(first.borrow().current_state().name, "Deselected");
    assert!(!dispatcher.is_selected(&first_ref));
    assert!(!dispatcher.is_selected(&second_ref));
}

#[test]
fn test_candidates_ranked_by_relevance() {
    let dispatcher = GlobalInteraction::new(NotificationPolicy::InformMultiple);
    let log = Rc::new(RefCell::new(Vec::new()));
    dispatcher.add_interactor(Fixed::shared("weak", 0.2, false, &log));
    dispatcher.add_interactor(Fixed::shared("strong", 0.9, false, &log));
    dispatcher.add_interactor(Fixed::shared("silent", 0.0, true, &log));
    dispatcher.add_interactor(Fixed::shared("middle", 0.5, false, &log));

    assert!(!dispatcher.handle_event(&StateEvent::new(7)));
    assert_eq!(*log.borrow(), vec!["strong", "middle", "weak"]);
    assert_eq!(dispatcher.candidate_relevances(), vec![0.9, 0.5, 0.2]);
}

#[test]
fn test_inform_multiple_stops_at_first_consumer() {
    let dispatcher = GlobalInteraction::new(NotificationPolicy::InformMultiple);
    let log = Rc::new(RefCell::new(Vec::new()));
    dispatcher.add_interactor(Fixed::shared("picky", 0.9, false, &log));
    dispatcher.add_interactor(Fixed::shared("taker", 0.6, true, &log));
    dispatcher.add_interactor(Fixed::shared("never", 0.3, true, &log));

    assert!(dispatcher.handle_event(&StateEvent::new(7)));
    assert_eq!(*log.borrow(), vec!["picky", "taker"]);
    assert!(dispatcher.has_next_candidate());
}

#[test]
fn test_mapped_input_drives_machine_and_undo() {
    let mut system = InteractionSystem::from_config(&Config::default());
    system.load_behavior_str("StateMachine.xml", BEHAVIOR).unwrap();
    let machine = system
        .create_machine("pointset", Recorder::default())
        .unwrap()
        .into_shared();
    system.dispatcher().add_interactor(machine.clone());

    let shift_press = InputEvent::new(
        event_type::MOUSE_BUTTON_PRESS,
        button::LEFT,
        button::SHIFT,
        key::NONE,
    );
    let delete = InputEvent::new(event_type::KEY_PRESS, button::NO_BUTTON, button::NO_BUTTON, key::DELETE);

    assert!(system.map_event(&shift_press));
    assert!(system.map_event(&shift_press));
    assert!(system.map_event(&delete));
    assert_eq!(machine.borrow().behavior().fired, vec![10, 10, 100]);
    assert_eq!(machine.borrow().current_state().name, "Editing");

    let dispatcher = system.dispatcher();
    assert_eq!(dispatcher.undo_descriptions().len(), 3);

    assert!(dispatcher.undo());
    assert!(dispatcher.undo());
    assert!(dispatcher.undo());
    assert_eq!(machine.borrow().current_state().name, "Start");
    assert!(!dispatcher.undo());

    assert!(dispatcher.redo());
    assert_eq!(machine.borrow().current_state().name, "Editing");
}

/// Domain value edited by an action and restored by undo
#[derive(Debug, Default)]
struct Store {
    value: i64,
}

impl OperationActor for Store {
    fn execute_operation(&mut self, operation: &Operation) {
        if let OperationPayload::Properties(props) = &operation.payload
            && let Some(PropertyValue::Int(value)) = props.get("value")
        {
            self.value = *value;
        }
    }
}

fn set_value(value: i64) -> Operation {
    Operation::new(
        operation_type::MODE_CHANGE,
        OperationPayload::Properties(BTreeMap::from([(
            "value".to_string(),
            PropertyValue::Int(value),
        )])),
    )
}

/// Behavior whose arm action edits a [`Store`] and chains another event
struct Editing {
    store: Rc<RefCell<Store>>,
    recorded: Option<bool>,
    chained: Option<bool>,
}

impl Behavior for Editing {}

#[test]
fn test_action_edits_undone_with_state_change() {
    let dispatcher = GlobalInteraction::new(NotificationPolicy::InformOne);
    let store = Rc::new(RefCell::new(Store::default()));
    let mut machine = factory()
        .create(
            "toggle",
            Editing {
                store: store.clone(),
                recorded: None,
                chained: None,
            },
        )
        .unwrap()
        .with_dispatcher(&dispatcher);
    machine.register_action(1, |editing: &mut Editing, ctx: &mut ActionContext<'_>| {
        let actor: ActorRef = editing.store.clone();
        editing.store.borrow_mut().value = 7;
        editing.recorded = Some(ctx.record_operation(&actor, set_value(7), set_value(0), "set 7"));
        editing.chained = Some(ctx.post_event(&StateEvent::new(99)));
        true
    });
    let machine = machine.into_shared();
    dispatcher.add_interactor(machine.clone());

    dispatcher.request_object_increment();
    dispatcher.execute_increment();
    assert!(dispatcher.handle_event(&StateEvent::new(10)));
    assert_eq!(machine.borrow().current_state().name, "Armed");
    assert_eq!(machine.borrow().behavior().recorded, Some(true));
    // interactors are busy with event 10, so event 99 goes nowhere
    assert_eq!(machine.borrow().behavior().chained, Some(false));
    assert_eq!(store.borrow().value, 7);

    let descriptions = dispatcher.undo_descriptions();
    assert_eq!(descriptions.len(), 2);
    assert_eq!(descriptions[1], "set 7");

    assert!(dispatcher.undo_fine(true));
    assert_eq!(machine.borrow().current_state().name, "Idle");
    assert_eq!(store.borrow().value, 0);
    assert!(dispatcher.undo_descriptions().is_empty());

    assert!(dispatcher.redo_fine(true));
    assert_eq!(machine.borrow().current_state().name, "Armed");
    assert_eq!(store.borrow().value, 7);
}

#[test]
fn test_action_context_without_dispatcher() {
    let store: ActorRef = Rc::new(RefCell::new(Store::default()));
    let results = Rc::new(RefCell::new(Vec::new()));
    let mut machine = factory().create("toggle", ()).unwrap();
    let seen = results.clone();
    machine.register_action(1, move |_: &mut (), ctx: &mut ActionContext<'_>| {
        seen.borrow_mut().push(ctx.record_operation(&store, set_value(1), set_value(0), "set 1"));
        seen.borrow_mut().push(ctx.post_event(&StateEvent::new(11)));
        true
    });

    assert!(machine.handle_event(&StateEvent::new(10)));
    assert_eq!(machine.current_state().name, "Armed");
    assert_eq!(*results.borrow(), vec![false, false]);
}

#[test]
fn test_unmapped_input_is_dropped() {
    let mut system = InteractionSystem::default();
    system.load_behavior_str("StateMachine.xml", BEHAVIOR).unwrap();
    let right_press = InputEvent::new(
        event_type::MOUSE_BUTTON_PRESS,
        button::RIGHT,
        button::NO_BUTTON,
        key::NONE,
    );

    assert!(!system.map_event(&right_press));
    assert_eq!(system.dispatcher().object_event_id(), 0);
}

#[test]
fn test_undo_limit_evicts_oldest() {
    let factory = factory();
    let dispatcher = GlobalInteraction::default();
    dispatcher.set_undo_limit(2);
    let mut machine = factory.create("toggle", Recorder::default()).unwrap();
    machine.set_dispatcher(&dispatcher);
    machine.enable_undo(true);

    for id in [10, 11, 10] {
        dispatcher.request_object_increment();
        dispatcher.execute_increment();
        assert!(machine.handle_event(&StateEvent::new(id)));
    }

    let history = dispatcher.undo_descriptions();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|entry| entry.starts_with("toggle:")));
}

#[test]
fn test_undo_after_machine_dropped() {
    let factory = factory();
    let dispatcher = GlobalInteraction::default();
    {
        let mut machine = factory.create("toggle", Recorder::default()).unwrap();
        machine.set_dispatcher(&dispatcher);
        machine.enable_undo(true);
        assert!(machine.handle_event(&StateEvent::new(10)));
    }

    dispatcher.undo();
    assert!(dispatcher.undo_descriptions().is_empty());
}

proptest! {
    #[test]
    fn prop_same_events_same_walk(events in prop::collection::vec(
        prop::sample::select(vec![1, 2, 3, 4, 12, 14]),
        0..40,
    )) {
        let factory = factory();
        let mut left = factory.create("pointset", Recorder::default()).unwrap();
        let mut right = factory.create("pointset", Recorder::default()).unwrap();

        for id in events {
            let event = StateEvent::new(id);
            prop_assert_eq!(left.handle_event(&event), right.handle_event(&event));
            prop_assert_eq!(left.current_state_index(), right.current_state_index());
        }
        prop_assert_eq!(&left.behavior().fired, &right.behavior().fired);
    }
}
