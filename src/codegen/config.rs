//! Codegen Configuration
//!
//! Two tiers:
//! - NamingConfig: how document keys become record names (language-agnostic)
//! - RenderProfile: how field types and derives are rendered as Rust
//!
//! Inference itself is config-free apart from naming.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::infer::FieldType;

// =============================================================================
// Naming
// =============================================================================

/// Naming configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Words kept upper-case in record names (e.g., "API" turns `api_keys` into `APIKeys`)
    pub acronyms: HashSet<String>,

    /// Singularize the key of a list-of-mapping field (`items` -> `Item`)
    pub singularize_list_items: bool,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            acronyms: HashSet::new(),
            singularize_list_items: true,
        }
    }
}

// =============================================================================
// Render Profile
// =============================================================================

/// Rust rendering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderProfile {
    /// Derives applied to every generated struct
    pub derives: Vec<String>,

    /// Type mappings for inferred field types
    pub types: TypeMappings,
}

impl Default for RenderProfile {
    fn default() -> Self {
        Self {
            derives: ["Debug", "Clone", "PartialEq", "Serialize", "Deserialize"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            types: TypeMappings::default(),
        }
    }
}

/// Type mappings for document scalars and containers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeMappings {
    pub string: String,
    pub integer: String,
    pub float: String,
    pub boolean: String,
    /// Untyped value (nulls, empty lists)
    pub any: String,
    /// List wrapper; `{}` is replaced with the element type
    pub list: String,
    /// Optional wrapper; `{}` is replaced with the inner type
    pub optional: String,
    /// Indirection used for recursive record fields
    pub boxed: String,
}

impl Default for TypeMappings {
    fn default() -> Self {
        Self {
            string: "String".to_string(),
            integer: "i64".to_string(),
            float: "f64".to_string(),
            boolean: "bool".to_string(),
            any: "serde_yaml::Value".to_string(),
            list: "Vec<{}>".to_string(),
            optional: "Option<{}>".to_string(),
            boxed: "Box<{}>".to_string(),
        }
    }
}

impl RenderProfile {
    /// Render a field type as Rust type text
    pub fn render_type(&self, field_type: &FieldType, boxed: bool) -> String {
        let rendered = match field_type {
            FieldType::String => self.types.string.clone(),
            FieldType::Integer => self.types.integer.clone(),
            FieldType::Float => self.types.float.clone(),
            FieldType::Boolean => self.types.boolean.clone(),
            FieldType::AnyUntyped => self.types.any.clone(),
            FieldType::OptionalAny => self.types.optional.replace("{}", &self.types.any),
            FieldType::ListOf(inner) => self.types.list.replace("{}", &self.render_type(inner, false)),
            FieldType::RecordRef(name) => name.clone(),
        };

        if boxed {
            self.types.boxed.replace("{}", &rendered)
        } else {
            rendered
        }
    }

    /// The `#[derive(...)]` line
    pub fn derive_line(&self) -> String {
        format!("#[derive({})]", self.derives.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_scalar_and_container_types() {
        let profile = RenderProfile::default();
        assert_eq!(profile.render_type(&FieldType::Integer, false), "i64");
        assert_eq!(
            profile.render_type(&FieldType::ListOf(Box::new(FieldType::String)), false),
            "Vec<String>"
        );
        assert_eq!(
            profile.render_type(&FieldType::OptionalAny, false),
            "Option<serde_yaml::Value>"
        );
        assert_eq!(
            profile.render_type(&FieldType::RecordRef("Node".to_string()), true),
            "Box<Node>"
        );
    }

    #[test]
    fn test_custom_integer_mapping() {
        let mut profile = RenderProfile::default();
        profile.types.integer = "u32".to_string();
        assert_eq!(
            profile.render_type(&FieldType::ListOf(Box::new(FieldType::Integer)), false),
            "Vec<u32>"
        );
    }

    #[test]
    fn test_derive_line() {
        let profile = RenderProfile::default();
        assert_eq!(
            profile.derive_line(),
            "#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]"
        );
    }
}
