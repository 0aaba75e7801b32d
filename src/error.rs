//! This module defines all error types used throughout the crate.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// IO errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Low-level XML reader errors
    #[error("XML error: {0}")]
    Xml(String),

    /// A behavior source could not be read as a whole
    #[error("Behavior parsing error in {source_name}: {message}")]
    BehaviorParse {
        source_name: String,
        message: String,
    },

    /// A single pattern failed validation and was not registered
    #[error("Malformed pattern '{pattern}': {message}")]
    MalformedPattern { pattern: String, message: String },

    /// No pattern registered under the requested name
    #[error("Unknown interaction pattern: {0}")]
    UnknownPattern(String),

    /// A named constant in an event description is not known
    #[error("Unknown constant: {0}")]
    UnknownConstant(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Configuration parsing error in {file:?}: {message}")]
    ConfigParse { file: PathBuf, message: String },

    /// Generic error with custom message
    #[error("{0}")]
    Custom(String),

    /// Wrapped anyhow errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a custom error with a message
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Create a behavior parse error for the named source
    pub fn behavior_parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BehaviorParse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a malformed pattern error
    pub fn malformed(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Check if the error rejected a single pattern rather than a whole source
    pub fn is_pattern_local(&self) -> bool {
        matches!(self, Error::MalformedPattern { .. })
    }
}

// Implement From traits for common external error types

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigParse {
            file: PathBuf::from("unknown"),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Custom(format!("JSON error: {}", err))
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(err.to_string())
    }
}

// Helper macros for creating errors

/// Create a custom error with formatting
#[macro_export]
macro_rules! custom_error {
    ($($arg:tt)*) => {
        $crate::error::Error::Custom(format!($($arg)*))
    };
}

/// Bail with a custom error message
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::custom_error!($($arg)*))
    };
}

/// Ensure a condition is true or return error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($($arg)*);
        }
    };
}
