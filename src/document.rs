//! Document Normalization
//!
//! Converts a parsed YAML document into a closed [`Node`] tree. Tagged values
//! are unwrapped, scalar keys are stringified, and mapping order is kept so
//! generated output follows the document's declaration order.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_yaml::Value;

use crate::error::{GenError, Result};
use crate::writer;

/// Ordered mapping from key to node
pub type Mapping = IndexMap<String, Node>;

/// Contents written by [`write_default_document`]
pub const DEFAULT_DOCUMENT: &str = "# Generated settings.yaml\n\nmode: \"development\"\n";

/// A normalized document node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Node>),
    Mapping(Mapping),
}

impl Node {
    /// The mapping held by this node, if it is one
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Short name of the node kind, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "boolean",
            Node::Integer(_) => "integer",
            Node::Float(_) => "float",
            Node::String(_) => "string",
            Node::Sequence(_) => "sequence",
            Node::Mapping(_) => "mapping",
        }
    }
}

/// A loaded settings document
#[derive(Debug, Clone)]
pub struct Document {
    /// Where the document was read from
    pub path: PathBuf,
    /// Top-level mapping
    pub root: Mapping,
}

impl Document {
    /// Read and normalize the document at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GenError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let text = fs::read_to_string(path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => GenError::InputNotFound {
                path: path.to_path_buf(),
            },
            _ => GenError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;

        Self::parse(&text, path)
    }

    /// Parse document text; `path` is only used for error context
    pub fn parse(text: &str, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let value: Value =
            serde_yaml::from_str(text).map_err(|e| GenError::from_yaml(path, &e))?;

        let root = match normalize(value).map_err(|message| GenError::parse(path, message))? {
            Node::Mapping(map) => map,
            // An empty file parses as null
            Node::Null => Mapping::new(),
            other => {
                return Err(GenError::parse(
                    path,
                    format!("top-level value must be a mapping, found {}", other.kind()),
                ))
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }
}

/// Normalize a YAML value into a [`Node`]
pub fn normalize(value: Value) -> std::result::Result<Node, String> {
    Ok(match value {
        Value::Null => Node::Null,
        Value::Bool(b) => Node::Bool(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Node::Integer(i)
            } else if let Some(u) = n.as_u64() {
                // Out of i64 range
                Node::Float(u as f64)
            } else {
                Node::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Node::String(s),
        Value::Sequence(items) => Node::Sequence(
            items
                .into_iter()
                .map(normalize)
                .collect::<std::result::Result<Vec<_>, _>>()?,
        ),
        Value::Mapping(map) => {
            let mut out = Mapping::with_capacity(map.len());
            for (key, value) in map {
                let key = normalize_key(key)?;
                if out.contains_key(&key) {
                    return Err(format!("duplicate mapping key `{key}`"));
                }
                out.insert(key, normalize(value)?);
            }
            Node::Mapping(out)
        }
        Value::Tagged(tagged) => normalize(tagged.value)?,
    })
}

fn normalize_key(key: Value) -> std::result::Result<String, String> {
    match key {
        Value::String(s) => Ok(s),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok("null".to_string()),
        Value::Tagged(tagged) => normalize_key(tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => {
            Err("mapping keys must be scalars".to_string())
        }
    }
}

/// Create a minimal settings document when none exists.
///
/// Returns `true` when the file was created.
pub fn write_default_document(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(false);
    }
    writer::write_atomic(path, DEFAULT_DOCUMENT.as_bytes())?;
    Ok(true)
}
