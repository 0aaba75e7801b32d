//! Interaction module - event dispatch, selection, focus and bootstrap
//!
//! [`GlobalInteraction`] routes each [`StateEvent`](crate::event::StateEvent)
//! to listeners and interactors. [`InteractionSystem`] wires a factory, an
//! event mapper and a dispatcher together from a [`Config`](crate::Config).

pub mod focus;
pub mod global;
pub mod handler;
pub mod system;

pub use focus::FocusManager;
pub use global::{GlobalInteraction, NotificationPolicy, WeakDispatcher, mode_of};
pub use handler::{HandlerRef, InteractorMode, StateEventHandler, same_handler};
pub use system::InteractionSystem;
