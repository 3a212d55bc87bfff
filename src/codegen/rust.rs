//! Rust Code Emitter
//!
//! Renders records as serde-deserializable structs. The emitter only sees
//! [`RecordDefinition`]s and the [`RenderProfile`]; naming and inference are
//! settled before emission.

use std::collections::{BTreeSet, HashSet};

use super::config::RenderProfile;
use super::names;
use super::records::{RecordDefinition, RecordSet};
use crate::graph::{recursive_fields, RecursiveField};

/// Header comment of every generated unit
pub const HEADER: &str = "//! Generated from the settings document - DO NOT EDIT\n\
//!\n\
//! Regenerate with `settingsgen generate`.\n";

/// Reference declarations of every generated unit
pub const IMPORTS: &str = "use serde::{Deserialize, Serialize};\n";

// =============================================================================
// Public API
// =============================================================================

/// A field as it will appear in source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedField {
    /// Identifier written in source (may carry `r#`)
    pub ident: String,
    /// Document key
    pub key: String,
    /// Whether a `#[serde(rename)]` attribute is emitted
    pub rename: bool,
    /// Rendered Rust type
    pub type_text: String,
}

/// Emit the whole unit: header, imports, then one struct per record in
/// dependency order.
pub fn emit_unit(records: &RecordSet, profile: &RenderProfile) -> String {
    let boxed = recursive_fields(records.records());
    let mut output = String::new();

    output.push_str(HEADER);
    output.push('\n');
    output.push_str(IMPORTS);

    for record in records.ordered() {
        output.push('\n');
        output.push_str(&emit_record(record, &boxed, profile));
    }

    output
}

/// Emit a single record as a struct
pub fn emit_record(
    record: &RecordDefinition,
    boxed: &BTreeSet<RecursiveField>,
    profile: &RenderProfile,
) -> String {
    let mut output = String::new();

    output.push_str(&format!("/// {}\n", record.name));
    output.push_str(&profile.derive_line());
    output.push('\n');
    output.push_str(&format!("pub struct {} {{\n", record.name));

    for field in render_fields(record, boxed, profile) {
        if field.rename {
            output.push_str(&format!(
                "    #[serde(rename = \"{}\")]\n",
                escape_str(&field.key)
            ));
        }
        output.push_str(&format!("    pub {}: {},\n", field.ident, field.type_text));
    }

    output.push_str("}\n");
    output
}

/// Resolve identifiers and types for every field of `record`
pub fn render_fields(
    record: &RecordDefinition,
    boxed: &BTreeSet<RecursiveField>,
    profile: &RenderProfile,
) -> Vec<RenderedField> {
    let mut used: HashSet<String> = HashSet::new();

    record
        .fields
        .iter()
        .map(|field| {
            let mut resolved = names::field_ident(&field.key);
            let base = resolved.bare().to_string();
            let mut suffix = 2;
            while !used.insert(resolved.ident.clone()) {
                resolved.ident = format!("{base}_{suffix}");
                suffix += 1;
            }

            let is_boxed = boxed.contains(&RecursiveField {
                record: record.name.clone(),
                key: field.key.clone(),
            });

            RenderedField {
                rename: resolved.needs_rename(),
                type_text: profile.render_type(&field.field_type, is_boxed),
                ident: resolved.ident,
                key: resolved.key,
            }
        })
        .collect()
}

// =============================================================================
// Helper Utilities
// =============================================================================

fn escape_str(s: &str) -> String {
    s.chars().flat_map(char::escape_default).collect()
}
