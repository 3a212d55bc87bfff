//! Code Generation
//!
//! Turns a settings document into Rust source.
//!
//! Architecture:
//! - Inference: each document value gets a [`FieldType`]
//! - Records: breadth-first discovery of nested mappings into [`RecordDefinition`]s
//! - Emitter: renders the [`RecordSet`] in dependency order
//!
//! The key constraint: the emitter NEVER reads the document - only records.

pub mod config;
pub mod infer;
pub mod names;
pub mod records;
pub mod rust;

pub use config::{NamingConfig, RenderProfile, TypeMappings};
pub use infer::{infer_field_type, FieldType};
pub use records::{generate_records, RecordDefinition, RecordField, RecordSet};

use tracing::debug;

use crate::document::Document;
use crate::signature::StructuralSignature;

/// Candidate output of one generation pass
#[derive(Debug, Clone)]
pub struct GeneratedOutput {
    /// Complete source text of the unit
    pub code: String,
    pub records: RecordSet,
    /// Signature of `code`
    pub signature: StructuralSignature,
}

impl GeneratedOutput {
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

/// Generate the candidate unit for `document`
pub fn generate_code(
    document: &Document,
    root_name: &str,
    naming: &NamingConfig,
    profile: &RenderProfile,
) -> GeneratedOutput {
    let records = generate_records(&document.root, root_name, naming);
    let code = rust::emit_unit(&records, profile);
    let signature = StructuralSignature::from_records(&records, profile);

    debug!(
        path = %document.path.display(),
        records = records.len(),
        bytes = code.len(),
        "Rendered candidate unit"
    );

    GeneratedOutput {
        code,
        records,
        signature,
    }
}
