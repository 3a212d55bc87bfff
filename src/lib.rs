//! Settings Type Generator
//!
//! Derives Rust record types from a YAML settings document and keeps a
//! generated source file in sync with it, rewriting the file only when the
//! structure of the types actually changed.
//!
//! ## Features
//!
//! - **Type Inference**: Scalars, lists and nested mappings become typed fields
//! - **Record Discovery**: Nested mappings become named structs, emitted dependencies first
//! - **Structural Diffing**: Comment and formatting edits never trigger a rewrite
//! - **Atomic Writes**: The previous file survives any failed write
//! - **Signature Manifest**: A checksummed summary persisted next to the output
//!
//! ## Architecture
//!
//! ```text
//! settings.yaml
//!   └─ document    (YAML -> Node tree)
//!       └─ codegen (inference, records, emitter)
//!           ├─ graph     (ordering, cycle boxing)
//!           └─ signature (structural summary)
//!               └─ diff  (write decision)
//!                   └─ writer -> src/settings_types.rs
//!                               src/settings_types.rs.signature.json
//! ```
//!
//! ## Example
//!
//! ```no_run
//! let changed = settingsgen::generate("settings.yaml", "src/settings_types.rs")?;
//! # Ok::<(), settingsgen::GenError>(())
//! ```

pub mod checksum;
pub mod codegen;
pub mod config;
pub mod diff;
pub mod document;
pub mod error;
pub mod generator;
pub mod graph;
pub mod settings;
pub mod signature;
pub mod writer;

pub use checksum::Checksum;
pub use codegen::{FieldType, NamingConfig, RecordDefinition, RecordSet, RenderProfile};
pub use config::SettingsgenConfig;
pub use diff::{diff_signatures, should_write, ChangeKind, SignatureDiff};
pub use document::{Document, Node};
pub use error::{GenError, Result};
pub use generator::{
    generate, EventSink, GenerationEvent, GenerationOutcome, Generator, GeneratorConfig, TracingSink,
};
pub use graph::DependencyGraph;
pub use signature::{SignatureManifest, StructuralSignature};
