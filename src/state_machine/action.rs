//! Action descriptors attached to transitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type ActionId = i32;

/// Action ids every machine understands without registration
pub mod action_id {
    use super::ActionId;

    pub const DO_NOTHING: ActionId = 0;
    pub const MODE_DESELECT: ActionId = 1100;
    pub const MODE_SELECT: ActionId = 1101;
    pub const MODE_SUBSELECT: ActionId = 1102;
}

/// Typed value of an action parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(v) => write!(f, "{}", v),
            PropertyValue::Float(v) => write!(f, "{}", v),
            PropertyValue::Bool(v) => write!(f, "{}", v),
            PropertyValue::String(v) => write!(f, "{:?}", v),
        }
    }
}

/// An action executed when its transition fires
///
/// Immutable once the owning pattern is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Action {
    pub fn new(id: ActionId) -> Self {
        Self {
            id,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn int_property(&self, name: &str) -> Option<i64> {
        match self.property(name)? {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer parameters are widened, so `intParameter` values read here too.
    pub fn float_property(&self, name: &str) -> Option<f64> {
        match self.property(name)? {
            PropertyValue::Float(v) => Some(*v),
            PropertyValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn bool_property(&self, name: &str) -> Option<bool> {
        match self.property(name)? {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn string_property(&self, name: &str) -> Option<&str> {
        match self.property(name)? {
            PropertyValue::String(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_properties() {
        let action = Action::new(7)
            .with_property("count", PropertyValue::Int(3))
            .with_property("scale", PropertyValue::Float(0.5))
            .with_property("snap", PropertyValue::Bool(true))
            .with_property("label", PropertyValue::String("seed".to_string()));

        assert_eq!(action.int_property("count"), Some(3));
        assert_eq!(action.float_property("count"), Some(3.0));
        assert_eq!(action.float_property("scale"), Some(0.5));
        assert_eq!(action.bool_property("snap"), Some(true));
        assert_eq!(action.string_property("label"), Some("seed"));
        assert_eq!(action.int_property("label"), None);
        assert_eq!(action.property("missing"), None);
    }

    #[test]
    fn test_property_display() {
        assert_eq!(PropertyValue::Int(4).to_string(), "4");
        assert_eq!(
            PropertyValue::String("a".to_string()).to_string(),
            "\"a\""
        );
    }
}
