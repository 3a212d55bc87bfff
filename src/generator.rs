//! Generation pipeline
//!
//! Load the document, render the candidate unit, compare its signature with
//! the persisted unit and write only when the structure changed.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::codegen::{generate_code, GeneratedOutput, NamingConfig, RenderProfile};
use crate::diff::{diff_signatures, should_write, SignatureDiff};
use crate::document::Document;
use crate::error::Result;
use crate::signature::{
    load_previous, manifest_path, PreviousUnit, SignatureManifest, SignatureSource, StructuralSignature,
};
use crate::writer;

// =============================================================================
// Configuration
// =============================================================================

/// Everything one generation run needs
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Name of the record generated for the top-level mapping
    pub root_name: String,
    pub naming: NamingConfig,
    pub profile: RenderProfile,
    /// Write and trust `<output>.signature.json`
    pub manifest: bool,
}

impl GeneratorConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            ..Self::default()
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("settings.yaml"),
            output: PathBuf::from("src/settings_types.rs"),
            root_name: "RootSchema".to_string(),
            naming: NamingConfig::default(),
            profile: RenderProfile::default(),
            manifest: true,
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// Notable things that happen during a run
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    /// The unit was (re)written
    Written {
        output: PathBuf,
        records: usize,
        diff: SignatureDiff,
    },
    /// The candidate matched the persisted unit structurally
    Skipped { output: PathBuf },
    ManifestWritten { path: PathBuf },
}

impl fmt::Display for GenerationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationEvent::Written { output, records, diff } => write!(
                f,
                "Updated {} ({} records, {})",
                output.display(),
                records,
                diff.summary()
            ),
            GenerationEvent::Skipped { output } => {
                write!(f, "No changes detected, {} left untouched", output.display())
            }
            GenerationEvent::ManifestWritten { path } => {
                write!(f, "Wrote signature manifest {}", path.display())
            }
        }
    }
}

/// Receiver of generation events
pub trait EventSink {
    fn emit(&self, event: &GenerationEvent);
}

/// Forwards events to `tracing`: `info` on write, `warn` on skip
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &GenerationEvent) {
        match event {
            GenerationEvent::Written { output, records, diff } => {
                info!(
                    output = %output.display(),
                    records = *records,
                    changes = diff.changes.len(),
                    "{}",
                    event
                );
            }
            GenerationEvent::Skipped { output } => {
                warn!(output = %output.display(), "{}", event);
            }
            GenerationEvent::ManifestWritten { path } => {
                debug!(path = %path.display(), "{}", event);
            }
        }
    }
}

// =============================================================================
// Generator
// =============================================================================

/// Result of a run (or a dry run)
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// Whether the unit was, or would be, written
    pub changed: bool,
    pub diff: SignatureDiff,
    pub output: PathBuf,
    pub record_count: usize,
    /// Candidate source text
    pub code: String,
    /// Signature of `code`
    pub signature: StructuralSignature,
    /// Text of the persisted unit, if any
    pub previous: Option<String>,
    /// Where the previous signature came from
    pub previous_source: Option<SignatureSource>,
}

/// Runs generation with an explicit configuration and event sink
pub struct Generator {
    config: GeneratorConfig,
    sink: Box<dyn EventSink>,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            sink: Box::new(TracingSink),
        }
    }

    /// Replace the default [`TracingSink`]
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate, writing the unit (and manifest) when the structure changed
    pub fn run(&self) -> Result<GenerationOutcome> {
        let (generated, previous) = self.prepare()?;
        let outcome = self.outcome(generated, previous);
        let output = &self.config.output;

        if !outcome.changed {
            self.sink.emit(&GenerationEvent::Skipped {
                output: output.clone(),
            });

            // The unit on disk is kept, so its manifest must describe that text
            if self.config.manifest && outcome.previous_source == Some(SignatureSource::Scanned) {
                if let Some(previous) = &outcome.previous {
                    self.write_manifest(&outcome.signature, previous)?;
                }
            }
            return Ok(outcome);
        }

        writer::write_atomic(output, outcome.code.as_bytes())?;
        self.sink.emit(&GenerationEvent::Written {
            output: output.clone(),
            records: outcome.record_count,
            diff: outcome.diff.clone(),
        });

        if self.config.manifest {
            self.write_manifest(&outcome.signature, &outcome.code)?;
        }

        Ok(outcome)
    }

    fn write_manifest(&self, signature: &StructuralSignature, unit: &str) -> Result<()> {
        let path = manifest_path(&self.config.output);
        SignatureManifest::new(signature.clone(), unit).save(&path)?;
        self.sink.emit(&GenerationEvent::ManifestWritten { path });
        Ok(())
    }

    /// Compute the outcome without touching the filesystem
    pub fn check(&self) -> Result<GenerationOutcome> {
        let (generated, previous) = self.prepare()?;
        Ok(self.outcome(generated, previous))
    }

    fn prepare(&self) -> Result<(GeneratedOutput, Option<PreviousUnit>)> {
        let document = Document::load(&self.config.input)?;
        let generated = generate_code(
            &document,
            &self.config.root_name,
            &self.config.naming,
            &self.config.profile,
        );
        let previous = load_previous(&self.config.output, self.config.manifest)?;
        Ok((generated, previous))
    }

    fn outcome(&self, generated: GeneratedOutput, previous: Option<PreviousUnit>) -> GenerationOutcome {
        let old = previous.as_ref().map(|p| &p.signature);
        let changed = should_write(old, &generated.signature);
        let diff = diff_signatures(old, &generated.signature);

        debug!(
            changed,
            changes = diff.changes.len(),
            source = ?previous.as_ref().map(|p| p.source),
            "Compared signatures"
        );

        GenerationOutcome {
            changed,
            diff,
            output: self.config.output.clone(),
            record_count: generated.record_count(),
            code: generated.code,
            signature: generated.signature,
            previous_source: previous.as_ref().map(|p| p.source),
            previous: previous.map(|p| p.text),
        }
    }
}

/// Generate `output` from `input` with default settings.
///
/// Returns `true` when the unit was written, `false` when the persisted unit
/// already had the same structure.
pub fn generate(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<bool> {
    let config = GeneratorConfig::new(input.as_ref(), output.as_ref());
    Ok(Generator::new(config).run()?.changed)
}
