//! The event dispatcher
//!
//! [`GlobalInteraction`] is an explicitly constructed handle; clones share
//! the same dispatcher. Machines keep a [`WeakDispatcher`] so the dispatcher
//! and its handlers never keep each other alive.

use crate::config::{DispatchConfig, UndoConfig};
use crate::event::StateEvent;
use crate::interaction::focus::FocusManager;
use crate::interaction::handler::{HandlerRef, InteractorMode, position_of, same_handler};
use crate::undo::{OperationEvent, UndoController};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// How unselected interactors are offered an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPolicy {
    /// Only the most relevant interactor
    #[default]
    InformOne,
    /// Descending relevance until one consumes the event
    InformMultiple,
}

#[derive(Clone)]
struct Candidate {
    relevance: f32,
    handler: HandlerRef,
}

#[derive(Clone, Copy)]
enum Registry {
    Listeners,
    Interactors,
    Selected,
}

enum PendingChange {
    AddListener(HandlerRef),
    RemoveListener(HandlerRef),
    AddInteractor(HandlerRef),
    RemoveInteractor(HandlerRef),
    Select(HandlerRef),
    Deselect(HandlerRef),
}

struct Inner {
    listeners: RefCell<Vec<HandlerRef>>,
    interactors: RefCell<Vec<HandlerRef>>,
    selected: RefCell<Vec<HandlerRef>>,
    pending_listeners: RefCell<Vec<PendingChange>>,
    pending_interactors: RefCell<Vec<PendingChange>>,
    in_listener_loop: Cell<bool>,
    in_interactor_loop: Cell<bool>,
    candidates: RefCell<Vec<Candidate>>,
    cursor: Cell<usize>,
    policy: Cell<NotificationPolicy>,
    relevance_threshold: Cell<f32>,
    undo: RefCell<UndoController>,
    focus: RefCell<FocusManager<String>>,
}

/// Clears a loop flag when the loop ends, even on early return
struct LoopGuard<'a>(&'a Cell<bool>);

impl<'a> LoopGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Routes state events to listeners and interactors
#[derive(Clone)]
pub struct GlobalInteraction {
    inner: Rc<Inner>,
}

/// Non-owning dispatcher handle held by machines
#[derive(Clone, Default)]
pub struct WeakDispatcher(Weak<Inner>);

impl WeakDispatcher {
    pub fn upgrade(&self) -> Option<GlobalInteraction> {
        self.0.upgrade().map(|inner| GlobalInteraction { inner })
    }
}

impl std::fmt::Debug for WeakDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WeakDispatcher(alive: {})", self.0.strong_count() > 0)
    }
}

impl Default for GlobalInteraction {
    fn default() -> Self {
        Self::new(NotificationPolicy::default())
    }
}

impl GlobalInteraction {
    pub fn new(policy: NotificationPolicy) -> Self {
        Self {
            inner: Rc::new(Inner {
                listeners: RefCell::new(Vec::new()),
                interactors: RefCell::new(Vec::new()),
                selected: RefCell::new(Vec::new()),
                pending_listeners: RefCell::new(Vec::new()),
                pending_interactors: RefCell::new(Vec::new()),
                in_listener_loop: Cell::new(false),
                in_interactor_loop: Cell::new(false),
                candidates: RefCell::new(Vec::new()),
                cursor: Cell::new(0),
                policy: Cell::new(policy),
                relevance_threshold: Cell::new(0.0),
                undo: RefCell::new(UndoController::default()),
                focus: RefCell::new(FocusManager::new(true)),
            }),
        }
    }

    pub fn from_config(dispatch: &DispatchConfig, undo: &UndoConfig) -> Self {
        let dispatcher = Self::new(dispatch.policy);
        dispatcher.set_relevance_threshold(dispatch.relevance_threshold);
        dispatcher.set_undo_limit(undo.limit);
        dispatcher
    }

    pub fn downgrade(&self) -> WeakDispatcher {
        WeakDispatcher(Rc::downgrade(&self.inner))
    }

    pub fn policy(&self) -> NotificationPolicy {
        self.inner.policy.get()
    }

    pub fn set_policy(&self, policy: NotificationPolicy) {
        self.inner.policy.set(policy);
    }

    pub fn relevance_threshold(&self) -> f32 {
        self.inner.relevance_threshold.get()
    }

    pub fn set_relevance_threshold(&self, threshold: f32) {
        self.inner.relevance_threshold.set(threshold);
    }

    // Listeners
    //
    // Changes requested while the matching loop runs are queued and applied
    // after it. Their return value is computed against the registry with
    // the already queued changes applied.

    /// Returns false if the listener is already registered
    pub fn add_listener(&self, listener: HandlerRef) -> bool {
        if self.inner.in_listener_loop.get() {
            if self.is_member(Registry::Listeners, &listener) {
                return false;
            }
            return self.defer(&self.inner.pending_listeners, PendingChange::AddListener(listener));
        }
        self.apply_change(PendingChange::AddListener(listener))
    }

    pub fn remove_listener(&self, listener: &HandlerRef) -> bool {
        if self.inner.in_listener_loop.get() {
            if !self.is_member(Registry::Listeners, listener) {
                return false;
            }
            return self.defer(
                &self.inner.pending_listeners,
                PendingChange::RemoveListener(listener.clone()),
            );
        }
        self.apply_change(PendingChange::RemoveListener(listener.clone()))
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    pub fn is_listener(&self, handler: &HandlerRef) -> bool {
        position_of(&self.inner.listeners.borrow(), handler).is_some()
    }

    // Interactors

    /// Register an interactor; one that is already selected joins the
    /// selected set as well.
    pub fn add_interactor(&self, interactor: HandlerRef) -> bool {
        if self.inner.in_interactor_loop.get() {
            if self.is_member(Registry::Interactors, &interactor) {
                return false;
            }
            return self.defer(
                &self.inner.pending_interactors,
                PendingChange::AddInteractor(interactor),
            );
        }
        self.apply_change(PendingChange::AddInteractor(interactor))
    }

    /// Unregister an interactor and drop it from the selected set
    pub fn remove_interactor(&self, interactor: &HandlerRef) -> bool {
        if self.inner.in_interactor_loop.get() {
            if !self.is_member(Registry::Interactors, interactor) {
                return false;
            }
            return self.defer(
                &self.inner.pending_interactors,
                PendingChange::RemoveInteractor(interactor.clone()),
            );
        }
        self.apply_change(PendingChange::RemoveInteractor(interactor.clone()))
    }

    pub fn interactor_count(&self) -> usize {
        self.inner.interactors.borrow().len()
    }

    pub fn is_interactor(&self, handler: &HandlerRef) -> bool {
        position_of(&self.inner.interactors.borrow(), handler).is_some()
    }

    /// Only registered interactors can be selected
    pub fn add_to_selected_interactors(&self, interactor: &HandlerRef) -> bool {
        if self.inner.in_interactor_loop.get() {
            if !self.is_member(Registry::Interactors, interactor)
                || self.is_member(Registry::Selected, interactor)
            {
                return false;
            }
            return self.defer(
                &self.inner.pending_interactors,
                PendingChange::Select(interactor.clone()),
            );
        }
        self.apply_change(PendingChange::Select(interactor.clone()))
    }

    pub fn remove_from_selected_interactors(&self, interactor: &HandlerRef) -> bool {
        if self.inner.in_interactor_loop.get() {
            if !self.is_member(Registry::Selected, interactor) {
                return false;
            }
            return self.defer(
                &self.inner.pending_interactors,
                PendingChange::Deselect(interactor.clone()),
            );
        }
        self.apply_change(PendingChange::Deselect(interactor.clone()))
    }

    fn defer(&self, queue: &RefCell<Vec<PendingChange>>, change: PendingChange) -> bool {
        queue.borrow_mut().push(change);
        true
    }

    /// Membership once the queued changes are applied
    fn is_member(&self, registry: Registry, handler: &HandlerRef) -> bool {
        let inner = &self.inner;
        let (list, queue) = match registry {
            Registry::Listeners => (&inner.listeners, &inner.pending_listeners),
            Registry::Interactors => (&inner.interactors, &inner.pending_interactors),
            Registry::Selected => (&inner.selected, &inner.pending_interactors),
        };
        let mut member = position_of(&list.borrow(), handler).is_some();
        for change in queue.borrow().iter() {
            member = match (registry, change) {
                (Registry::Listeners, PendingChange::AddListener(h))
                | (Registry::Interactors, PendingChange::AddInteractor(h))
                | (Registry::Selected, PendingChange::Select(h))
                    if same_handler(h, handler) =>
                {
                    true
                }
                (Registry::Listeners, PendingChange::RemoveListener(h))
                | (Registry::Interactors | Registry::Selected, PendingChange::RemoveInteractor(h))
                | (Registry::Selected, PendingChange::Deselect(h))
                    if same_handler(h, handler) =>
                {
                    false
                }
                _ => member,
            };
        }
        member
    }

    pub fn selected_interactors(&self) -> Vec<HandlerRef> {
        self.inner.selected.borrow().clone()
    }

    pub fn is_selected(&self, handler: &HandlerRef) -> bool {
        position_of(&self.inner.selected.borrow(), handler).is_some()
    }

    fn apply_change(&self, change: PendingChange) -> bool {
        let inner = &self.inner;
        match change {
            PendingChange::AddListener(handler) => {
                insert_unique(&mut inner.listeners.borrow_mut(), handler)
            }
            PendingChange::RemoveListener(handler) => {
                remove_handler(&mut inner.listeners.borrow_mut(), &handler)
            }
            PendingChange::AddInteractor(handler) => {
                let selected = handler.try_borrow().is_ok_and(|h| h.mode().is_selected());
                if !insert_unique(&mut inner.interactors.borrow_mut(), handler.clone()) {
                    return false;
                }
                if selected {
                    insert_unique(&mut inner.selected.borrow_mut(), handler);
                }
                true
            }
            PendingChange::RemoveInteractor(handler) => {
                remove_handler(&mut inner.selected.borrow_mut(), &handler);
                remove_handler(&mut inner.interactors.borrow_mut(), &handler)
            }
            PendingChange::Select(handler) => {
                if position_of(&inner.interactors.borrow(), &handler).is_none() {
                    tracing::debug!("Cannot select an interactor that is not registered");
                    return false;
                }
                insert_unique(&mut inner.selected.borrow_mut(), handler)
            }
            PendingChange::Deselect(handler) => {
                remove_handler(&mut inner.selected.borrow_mut(), &handler)
            }
        }
    }

    fn apply_pending(&self, queue: &RefCell<Vec<PendingChange>>) {
        let changes: Vec<PendingChange> = queue.borrow_mut().drain(..).collect();
        for change in changes {
            self.apply_change(change);
        }
    }

    fn is_pending_removal(&self, handler: &HandlerRef) -> bool {
        self.inner
            .pending_listeners
            .borrow()
            .iter()
            .any(|change| matches!(change, PendingChange::RemoveListener(h) if same_handler(h, handler)))
    }

    // Dispatch

    /// Dispatch one event.
    ///
    /// Listeners see every event. Selected interactors get first refusal;
    /// only when none consumes the event are unselected interactors asked,
    /// ranked by relevance. Returns true when an interactor consumed it.
    pub fn handle_event(&self, event: &StateEvent) -> bool {
        tracing::debug!("Dispatching event {}", event.id());
        self.inform_listeners(event);

        if self.inner.in_interactor_loop.get() {
            tracing::warn!(
                "Nested dispatch of event {} while interactors are being asked, skipped",
                event.id()
            );
            return false;
        }

        if self.ask_selected(event) {
            return true;
        }
        self.ask_all_interactors(event)
    }

    fn inform_listeners(&self, event: &StateEvent) {
        if self.inner.in_listener_loop.get() {
            tracing::warn!(
                "Nested dispatch of event {} while listeners are being informed, listeners skipped",
                event.id()
            );
            return;
        }

        {
            let _guard = LoopGuard::enter(&self.inner.in_listener_loop);
            let listeners = self.inner.listeners.borrow().clone();
            for listener in &listeners {
                if self.is_pending_removal(listener) {
                    continue;
                }
                match listener.try_borrow_mut() {
                    Ok(mut listener) => {
                        listener.handle_event(event);
                    }
                    Err(_) => tracing::warn!(
                        "Listener is busy, event {} not delivered to it",
                        event.id()
                    ),
                }
            }
        }
        self.apply_pending(&self.inner.pending_listeners);
    }

    fn ask_selected(&self, event: &StateEvent) -> bool {
        let selected = self.inner.selected.borrow().clone();
        if selected.is_empty() {
            return false;
        }

        let mut handled = false;
        {
            let _guard = LoopGuard::enter(&self.inner.in_interactor_loop);
            for interactor in &selected {
                let Ok(mut handler) = interactor.try_borrow_mut() else {
                    tracing::warn!("Selected interactor is busy, skipped for event {}", event.id());
                    continue;
                };
                if handler.handle_event(event) {
                    handled = true;
                }
                let mode = handler.mode();
                let name = handler.type_name().to_string();
                drop(handler);
                if !mode.is_selected() {
                    tracing::debug!("{} deselected itself", name);
                    self.remove_from_selected_interactors(interactor);
                }
            }
        }
        self.apply_pending(&self.inner.pending_interactors);
        handled
    }

    fn ask_all_interactors(&self, event: &StateEvent) -> bool {
        self.fill_candidates(event);

        let handled = {
            let _guard = LoopGuard::enter(&self.inner.in_interactor_loop);
            match self.policy() {
                NotificationPolicy::InformOne => self.ask_current_interactor(event),
                NotificationPolicy::InformMultiple => {
                    let mut handled = false;
                    while self.has_next_candidate() {
                        if self.ask_current_interactor(event) {
                            handled = true;
                            break;
                        }
                    }
                    handled
                }
            }
        };
        self.apply_pending(&self.inner.pending_interactors);
        handled
    }

    /// Rank every unselected interactor above the threshold.
    ///
    /// Ties keep registration order.
    fn fill_candidates(&self, event: &StateEvent) {
        let interactors = self.inner.interactors.borrow().clone();
        let selected = self.inner.selected.borrow().clone();
        let threshold = self.relevance_threshold();

        let mut candidates: Vec<Candidate> = Vec::new();
        for interactor in interactors {
            if position_of(&selected, &interactor).is_some() {
                continue;
            }
            let relevance = match interactor.try_borrow() {
                Ok(handler) => handler.can_handle_event(event).clamp(0.0, 1.0),
                Err(_) => continue,
            };
            if relevance > threshold {
                candidates.push(Candidate {
                    relevance,
                    handler: interactor,
                });
            }
        }
        candidates.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));

        *self.inner.candidates.borrow_mut() = candidates;
        self.inner.cursor.set(0);
    }

    /// Offer the event to the next ranked candidate of the last dispatch.
    ///
    /// Lets callers step through lower ranked candidates explicitly, e.g.
    /// to click through stacked objects. Returns false when none is left.
    pub fn ask_current_interactor(&self, event: &StateEvent) -> bool {
        let candidate = {
            let candidates = self.inner.candidates.borrow();
            candidates
                .get(self.inner.cursor.get())
                .map(|c| c.handler.clone())
        };
        let Some(interactor) = candidate else {
            return false;
        };
        self.inner.cursor.set(self.inner.cursor.get() + 1);

        let Ok(mut handler) = interactor.try_borrow_mut() else {
            tracing::warn!("Interactor is busy, skipped for event {}", event.id());
            return false;
        };
        let handled = handler.handle_event(event);
        let mode = handler.mode();
        drop(handler);

        if mode.is_selected() {
            self.add_to_selected_interactors(&interactor);
        }
        handled
    }

    pub fn has_next_candidate(&self) -> bool {
        self.inner.cursor.get() < self.inner.candidates.borrow().len()
    }

    /// Relevance of the ranked candidates of the last dispatch
    pub fn candidate_relevances(&self) -> Vec<f32> {
        self.inner
            .candidates
            .borrow()
            .iter()
            .map(|c| c.relevance)
            .collect()
    }

    // Undo

    /// Record an undo entry; returns false while the undo model is busy
    pub fn set_operation_event(&self, event: OperationEvent) -> bool {
        match self.inner.undo.try_borrow_mut() {
            Ok(mut undo) => undo.set_operation_event(event),
            Err(_) => {
                tracing::warn!("Undo model busy, '{}' not recorded", event.description());
                false
            }
        }
    }

    pub fn undo(&self) -> bool {
        self.with_undo(|undo| undo.undo())
    }

    pub fn redo(&self) -> bool {
        self.with_undo(|undo| undo.redo())
    }

    pub fn undo_fine(&self, fine: bool) -> bool {
        self.with_undo(|undo| undo.undo_fine(fine))
    }

    pub fn redo_fine(&self, fine: bool) -> bool {
        self.with_undo(|undo| undo.redo_fine(fine))
    }

    pub fn undo_limit(&self) -> usize {
        self.inner.undo.borrow().undo_limit()
    }

    pub fn set_undo_limit(&self, limit: usize) {
        self.with_undo(|undo| {
            undo.set_undo_limit(limit);
            true
        });
    }

    pub fn undo_descriptions(&self) -> Vec<String> {
        self.inner.undo.borrow().model().undo_descriptions()
    }

    pub fn redo_descriptions(&self) -> Vec<String> {
        self.inner.undo.borrow().model().redo_descriptions()
    }

    pub fn object_event_id(&self) -> u64 {
        self.inner.undo.borrow().ids().object_event_id()
    }

    pub fn group_event_id(&self) -> u64 {
        self.inner.undo.borrow().ids().group_event_id()
    }

    pub fn request_object_increment(&self) {
        self.inner.undo.borrow_mut().ids_mut().request_object_increment();
    }

    pub fn request_group_increment(&self) {
        self.inner.undo.borrow_mut().ids_mut().request_group_increment();
    }

    pub fn execute_increment(&self) {
        self.inner.undo.borrow_mut().ids_mut().execute_increment();
    }

    /// Run `f` against the undo controller unless it is already in use
    pub fn with_undo(&self, f: impl FnOnce(&mut UndoController) -> bool) -> bool {
        match self.inner.undo.try_borrow_mut() {
            Ok(mut undo) => f(&mut undo),
            Err(_) => {
                tracing::warn!("Undo requested while the undo model is busy, skipped");
                false
            }
        }
    }

    // Focus

    pub fn add_focus_element(&self, element: impl Into<String>) -> bool {
        self.inner.focus.borrow_mut().add_element(element.into())
    }

    pub fn remove_focus_element(&self, element: &str) -> bool {
        self.inner.focus.borrow_mut().remove_element(&element.to_string())
    }

    pub fn focus(&self) -> Option<String> {
        self.inner.focus.borrow().focused().cloned()
    }

    pub fn with_focus<T>(&self, f: impl FnOnce(&mut FocusManager<String>) -> T) -> T {
        f(&mut self.inner.focus.borrow_mut())
    }
}

impl std::fmt::Debug for GlobalInteraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalInteraction")
            .field("policy", &self.policy())
            .field("listeners", &self.listener_count())
            .field("interactors", &self.interactor_count())
            .field("selected", &self.inner.selected.borrow().len())
            .finish()
    }
}

fn insert_unique(list: &mut Vec<HandlerRef>, handler: HandlerRef) -> bool {
    if position_of(list, &handler).is_some() {
        return false;
    }
    list.push(handler);
    true
}

fn remove_handler(list: &mut Vec<HandlerRef>, handler: &HandlerRef) -> bool {
    match position_of(list, handler) {
        Some(position) => {
            list.remove(position);
            true
        }
        None => false,
    }
}

/// Select state of an interactor outside a dispatch
pub fn mode_of(handler: &HandlerRef) -> Option<InteractorMode> {
    handler.try_borrow().ok().map(|h| h.mode())
}
