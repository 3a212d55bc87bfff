//! Golden Tests for Settings Generation
//!
//! Runs the generator end to end against the documents in `tests/fixtures`.

use std::fs;
use std::path::{Path, PathBuf};

use settingsgen::codegen::{generate_code, NamingConfig, RenderProfile};
use settingsgen::signature::{manifest_path, SignatureManifest};
use settingsgen::{
    generate, ChangeKind, Document, GenError, Generator, GeneratorConfig, StructuralSignature,
};
use tempfile::TempDir;

fn fixtures_path() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").leak()
}

fn fixture(name: &str) -> PathBuf {
    fixtures_path().join(name)
}

fn emit(name: &str) -> String {
    let document = Document::load(fixture(name)).unwrap();
    generate_code(&document, "RootSchema", &NamingConfig::default(), &RenderProfile::default()).code
}

// =============================================================================
// Emission
// =============================================================================

#[test]
fn test_service_matches_golden_output() {
    let expected = fs::read_to_string(fixture("service.rs.golden")).unwrap();
    assert_eq!(emit("service.yaml"), expected);
}

#[test]
fn test_recursive_records_are_boxed_only_in_direct_cycles() {
    let code = emit("recursive.yaml");

    assert!(code.contains("pub struct Node {\n    pub value: i64,\n    pub next: Box<Next>,\n}\n"));
    assert!(code.contains("pub struct Next {\n    pub node: Box<Node>,\n}\n"));
    assert!(code.contains("pub struct Tree {\n    pub children: Vec<Children>,\n}\n"));
    assert!(code.contains("pub struct Children {\n    pub tree: Tree,\n}\n"));
}

#[test]
fn test_scanner_agrees_with_generator_on_fixtures() {
    for name in ["service.yaml", "recursive.yaml"] {
        let document = Document::load(fixture(name)).unwrap();
        let output = generate_code(
            &document,
            "RootSchema",
            &NamingConfig::default(),
            &RenderProfile::default(),
        );
        assert_eq!(
            StructuralSignature::from_source(&output.code),
            output.signature,
            "signature mismatch for {name}"
        );
    }
}

// =============================================================================
// Write Decisions
// =============================================================================

#[test]
fn test_generate_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("settings_types.rs");

    assert!(generate(fixture("service.yaml"), &output).unwrap());
    assert!(!generate(fixture("service.yaml"), &output).unwrap());

    let expected = fs::read_to_string(fixture("service.rs.golden")).unwrap();
    assert_eq!(fs::read_to_string(&output).unwrap(), expected);

    let manifest = SignatureManifest::load(&manifest_path(&output)).unwrap();
    assert!(manifest.describes(&expected));
}

#[test]
fn test_structural_edit_is_reported_and_written() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("settings.yaml");
    let output = dir.path().join("settings_types.rs");

    let original = fs::read_to_string(fixture("service.yaml")).unwrap();
    fs::write(&input, &original).unwrap();
    assert!(generate(&input, &output).unwrap());

    fs::write(
        &input,
        original
            .replace("  port: 5432\n", "  port: \"5432\"\n")
            .replace("extra: ~\n", "extra: ~\ncache:\n  ttl: 60\n"),
    )
    .unwrap();

    let generator = Generator::new(GeneratorConfig::new(&input, &output));
    let pending = generator.check().unwrap();
    assert!(pending.changed);
    assert_eq!(pending.diff.count(ChangeKind::MemberRetyped), 1);
    assert_eq!(pending.diff.count(ChangeKind::RecordAdded), 1);
    assert_eq!(pending.diff.count(ChangeKind::MemberAdded), 1);

    let outcome = generator.run().unwrap();
    assert!(outcome.changed);
    let unit = fs::read_to_string(&output).unwrap();
    assert!(unit.contains("pub struct Cache {\n    pub ttl: i64,\n}\n"));
    assert!(unit.contains("    pub port: String,\n"));
}

#[test]
fn test_cosmetic_edits_never_rewrite() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("settings.yaml");
    let output = dir.path().join("settings_types.rs");

    let original = fs::read_to_string(fixture("service.yaml")).unwrap();
    fs::write(&input, &original).unwrap();
    assert!(generate(&input, &output).unwrap());

    // Values change, structure does not
    fs::write(
        &input,
        original
            .replace("# Service settings", "# Staging")
            .replace("localhost", "db.internal")
            .replace("port: 5432", "port: 6543"),
    )
    .unwrap();
    assert!(!generate(&input, &output).unwrap());
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_missing_input() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.rs");

    let err = generate(fixture("does-not-exist.yaml"), &output).unwrap_err();
    assert!(matches!(err, GenError::InputNotFound { .. }));
    assert!(!output.exists());
}

#[test]
fn test_syntax_error_reports_location() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.rs");

    let err = generate(fixture("invalid.yaml"), &output).unwrap_err();
    match err {
        GenError::Parse { path, line, .. } => {
            assert!(path.ends_with("invalid.yaml"));
            assert!(line.is_some());
        }
        other => panic!("Expected Parse, got {:?}", other),
    }
    assert!(!output.exists());
}

#[test]
fn test_non_mapping_root_is_rejected() {
    let dir = TempDir::new().unwrap();
    let err = generate(fixture("scalar_root.yaml"), dir.path().join("out.rs")).unwrap_err();
    assert!(matches!(err, GenError::Parse { .. }));
}
