//! Type Inference
//!
//! Maps a document node (and the key it sits under) to a [`FieldType`].
//! Lists are typed from their first element only; mixed lists are not
//! detected. Nulls and empty lists fall back to untyped values.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::NamingConfig;
use super::names;
use crate::document::{Mapping, Node};

/// Abstract type of a generated field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    /// Untyped value (null, unknown list element)
    AnyUntyped,
    ListOf(Box<FieldType>),
    /// Empty mapping
    OptionalAny,
    /// Reference to a record generated in the same batch
    RecordRef(String),
}

impl FieldType {
    /// The record this type refers to, looking through lists
    pub fn record_ref(&self) -> Option<&str> {
        match self {
            FieldType::RecordRef(name) => Some(name),
            FieldType::ListOf(inner) => inner.record_ref(),
            _ => None,
        }
    }

    /// Whether this is a bare record reference (no list indirection)
    pub fn is_direct_ref(&self) -> bool {
        matches!(self, FieldType::RecordRef(_))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => write!(f, "String"),
            FieldType::Integer => write!(f, "Integer"),
            FieldType::Float => write!(f, "Float"),
            FieldType::Boolean => write!(f, "Boolean"),
            FieldType::AnyUntyped => write!(f, "AnyUntyped"),
            FieldType::ListOf(inner) => write!(f, "ListOf({inner})"),
            FieldType::OptionalAny => write!(f, "OptionalAny"),
            FieldType::RecordRef(name) => write!(f, "RecordRef({name})"),
        }
    }
}

/// Infer the type of `value` stored under `key`
pub fn infer_field_type(value: &Node, key: &str, naming: &NamingConfig) -> FieldType {
    match value {
        Node::String(_) => FieldType::String,
        Node::Integer(_) => FieldType::Integer,
        Node::Float(_) => FieldType::Float,
        Node::Bool(_) => FieldType::Boolean,
        Node::Mapping(map) if map.is_empty() => FieldType::OptionalAny,
        Node::Mapping(_) => FieldType::RecordRef(names::record_name(key, naming)),
        Node::Sequence(items) => match items.first() {
            None => FieldType::ListOf(Box::new(FieldType::AnyUntyped)),
            Some(Node::Mapping(map)) if !map.is_empty() => FieldType::ListOf(Box::new(
                FieldType::RecordRef(names::list_record_name(key, naming)),
            )),
            Some(first) => FieldType::ListOf(Box::new(infer_element_type(first, key, naming))),
        },
        Node::Null => FieldType::AnyUntyped,
    }
}

fn infer_element_type(first: &Node, key: &str, naming: &NamingConfig) -> FieldType {
    match first {
        // A list of empty mappings carries no shape
        Node::Mapping(_) => FieldType::OptionalAny,
        other => infer_field_type(other, key, naming),
    }
}

/// The mapping that types a list-of-record field.
///
/// Follows first elements through nested lists; `None` when the innermost
/// first element is not a non-empty mapping.
pub fn list_element_mapping(value: &Node) -> Option<&Mapping> {
    match value {
        Node::Sequence(items) => match items.first()? {
            Node::Mapping(map) if !map.is_empty() => Some(map),
            nested @ Node::Sequence(_) => list_element_mapping(nested),
            _ => None,
        },
        _ => None,
    }
}
