//! Interaction FSM
//!
//! An event-driven interaction core: declarative state machine patterns,
//! an interpreter running one machine per interaction, a dispatcher that
//! routes events to listeners and competing interactors, and a bounded
//! linear undo log fed by the same dispatch path.
//!
//! This library provides functionality for:
//! - Reading behavior descriptions (patterns and event tables) from XML
//! - Validating and sharing patterns through a registry
//! - Translating raw input into state events
//! - Dispatching events by selection and relevance
//! - Recording state changes and domain operations for undo/redo
//!
//! ```no_run
//! use interaction_fsm::{Config, InteractionSystem};
//!
//! let system = InteractionSystem::from_config(&Config::default());
//! let machine = system.create_machine("pointset", ()).map(|m| m.into_shared());
//! ```

pub mod behavior;
pub mod cli;
pub mod config;
pub mod error;
pub mod event;
pub mod interaction;
pub mod state_machine;
pub mod undo;

pub use config::Config;
pub use error::{Error, Result};
pub use interaction::{GlobalInteraction, InteractionSystem};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize logging with the given log level
///
/// Logs go to stderr so command output on stdout stays clean.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize logging into a file, appending
pub fn init_file_logging(level: &str, path: &std::path::Path) -> Result<()> {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file)),
        )
        .init();
    Ok(())
}
