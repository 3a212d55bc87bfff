//! Structural Signatures
//!
//! A comparison-only summary of a generated unit: the paths it imports, and
//! for every struct its derives and the member names with their type text. Signatures come
//! from three places that agree for the same unit:
//!
//! - directly from a [`RecordSet`] (the candidate output)
//! - from the companion manifest written next to the unit
//! - from the unit's source text, via a lexical scanner that ignores comments,
//!   whitespace and declaration order (used when the manifest is missing or
//!   stale)

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::checksum::Checksum;
use crate::codegen::config::RenderProfile;
use crate::codegen::records::RecordSet;
use crate::codegen::rust::{render_fields, IMPORTS};
use crate::error::{GenError, Result};
use crate::graph::recursive_fields;
use crate::writer;

/// Current manifest format
pub const MANIFEST_FORMAT: u32 = 2;

// =============================================================================
// Signature Types
// =============================================================================

/// Members of one record type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSignature {
    /// Member names, sorted
    pub members: Vec<String>,
    /// Member name -> declared type text (whitespace-free)
    pub member_types: BTreeMap<String, String>,
    /// Derived trait paths (whitespace-free)
    #[serde(default)]
    pub derives: BTreeSet<String>,
}

impl RecordSignature {
    pub fn new<I, K, T>(members: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: AsRef<str>,
    {
        let member_types: BTreeMap<String, String> = members
            .into_iter()
            .map(|(name, ty)| (name.into(), strip_whitespace(ty.as_ref())))
            .collect();
        Self {
            members: member_types.keys().cloned().collect(),
            member_types,
            derives: BTreeSet::new(),
        }
    }

    pub fn with_derives<I, S>(mut self, derives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.derives = derives
            .into_iter()
            .map(|d| strip_whitespace(d.as_ref()))
            .filter(|d| !d.is_empty())
            .collect();
        self
    }
}

/// Structural summary of a generated unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralSignature {
    /// Imported paths, one per imported item
    pub imports: BTreeSet<String>,
    /// Record name -> members
    pub records: BTreeMap<String, RecordSignature>,
}

impl StructuralSignature {
    /// Signature of the unit that would be emitted for `records`
    pub fn from_records(records: &RecordSet, profile: &RenderProfile) -> Self {
        let boxed = recursive_fields(records.records());
        let imports = scan_imports(&mask_strings(&strip_comments(IMPORTS)));

        let records = records
            .records()
            .values()
            .map(|record| {
                let members = render_fields(record, &boxed, profile)
                    .into_iter()
                    .map(|f| (f.key, f.type_text));
                let signature = RecordSignature::new(members).with_derives(&profile.derives);
                (record.name.clone(), signature)
            })
            .collect();

        Self { imports, records }
    }

    /// Scan generated source text
    pub fn from_source(source: &str) -> Self {
        let clean = strip_comments(source);
        let masked = mask_strings(&clean);

        Self {
            imports: scan_imports(&masked),
            records: scan_structs(&clean, &masked),
        }
    }

    pub fn record_names(&self) -> BTreeSet<&str> {
        self.records.keys().map(String::as_str).collect()
    }
}

// =============================================================================
// Manifest
// =============================================================================

/// Companion manifest persisted next to a generated unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureManifest {
    pub format: u32,
    pub generated_at: DateTime<Utc>,
    /// Checksum of the unit the signature describes
    pub source_checksum: Checksum,
    pub signature: StructuralSignature,
}

impl SignatureManifest {
    pub fn new(signature: StructuralSignature, source: &str) -> Self {
        Self {
            format: MANIFEST_FORMAT,
            generated_at: Utc::now(),
            source_checksum: Checksum::from_content(source),
            signature,
        }
    }

    /// Load a manifest; missing or unreadable manifests yield `None`
    pub fn load(path: &Path) -> Option<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read signature manifest");
                return None;
            }
        };

        match serde_json::from_str::<Self>(&text) {
            Ok(manifest) if manifest.format == MANIFEST_FORMAT => Some(manifest),
            Ok(manifest) => {
                warn!(path = %path.display(), format = manifest.format, "Unsupported manifest format");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt signature manifest");
                None
            }
        }
    }

    /// Atomically write the manifest as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        writer::write_atomic(path, json.as_bytes())
    }

    /// Whether this manifest describes exactly `source`
    pub fn describes(&self, source: &str) -> bool {
        self.source_checksum.verify(source)
    }
}

/// Path of the manifest that accompanies `output`
pub fn manifest_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().unwrap_or_default().to_os_string();
    name.push(".signature.json");
    output.with_file_name(name)
}

/// Where a previous signature was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureSource {
    Manifest,
    Scanned,
}

/// The persisted unit found at the output path
#[derive(Debug, Clone)]
pub struct PreviousUnit {
    pub text: String,
    pub signature: StructuralSignature,
    pub source: SignatureSource,
}

/// Read the unit currently at `output`.
///
/// Returns `None` when there is no unit (missing or empty file). The manifest
/// is trusted only when its checksum matches the unit; otherwise the unit is
/// scanned.
pub fn load_previous(output: &Path, use_manifest: bool) -> Result<Option<PreviousUnit>> {
    let text = match fs::read_to_string(output) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(GenError::Read {
                path: output.to_path_buf(),
                source,
            })
        }
    };

    if text.trim().is_empty() {
        return Ok(None);
    }

    if use_manifest {
        let path = manifest_path(output);
        match SignatureManifest::load(&path) {
            Some(manifest) if manifest.describes(&text) => {
                debug!(path = %path.display(), "Using signature manifest");
                return Ok(Some(PreviousUnit {
                    text,
                    signature: manifest.signature,
                    source: SignatureSource::Manifest,
                }));
            }
            Some(_) => {
                warn!(output = %output.display(), "Generated unit was edited since its manifest was written; scanning source");
            }
            None => {
                debug!(output = %output.display(), "No usable manifest; scanning source");
            }
        }
    }

    let signature = StructuralSignature::from_source(&text);
    Ok(Some(PreviousUnit {
        text,
        signature,
        source: SignatureSource::Scanned,
    }))
}

// =============================================================================
// Source Scanner
// =============================================================================

fn use_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\buse\s+([^;]+);").expect("valid use regex"))
}

fn struct_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bstruct\s+(\w+)[^{;(]*\{").expect("valid struct regex")
    })
}

fn field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^(?:pub(?:\s*\([^)]*\))?\s+)?(?:r#)?(\w+)\s*:(.+)$")
            .expect("valid field regex")
    })
}

fn derive_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"#\s*\[\s*derive\s*\(([^)]*)\)\s*\]").expect("valid derive regex")
    })
}

fn rename_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\brename\s*=\s*"((?:[^"\\]|\\.)*)""#).expect("valid rename regex")
    })
}

/// Remove `//` and (nested) `/* */` comments, keeping string literals
fn strip_comments(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                out.push(c);
                while let Some(s) = chars.next() {
                    out.push(s);
                    match s {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                out.push(escaped);
                            }
                        }
                        '"' => break,
                        _ => {}
                    }
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut depth = 1;
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '/' && next == '*' {
                        depth += 1;
                        prev = '\0';
                    } else if prev == '*' && next == '/' {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                        prev = '\0';
                    } else {
                        prev = next;
                    }
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}

/// Blank out string literal contents byte-for-byte so offsets stay aligned
fn mask_strings(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in src.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                out.push('"');
                continue;
            }
            out.extend(std::iter::repeat(' ').take(c.len_utf8()));
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
    }

    out
}

fn scan_imports(masked: &str) -> BTreeSet<String> {
    let mut imports = BTreeSet::new();
    for caps in use_regex().captures_iter(masked) {
        expand_use_tree("", &caps[1], &mut imports);
    }
    imports
}

/// Flatten a use tree (`a::{b, c::{d, e}}`) into individual paths
fn expand_use_tree(prefix: &str, tree: &str, out: &mut BTreeSet<String>) {
    let tree = normalize_path(tree);
    if tree.is_empty() {
        return;
    }

    match (tree.find('{'), tree.rfind('}')) {
        (Some(open), Some(close)) if open < close => {
            let head = format!("{prefix}{}", &tree[..open]);
            let inner = &tree[open + 1..close];
            for range in top_level_ranges(inner, ',') {
                expand_use_tree(&head, &inner[range], out);
            }
        }
        _ => {
            let path = format!("{prefix}{tree}");
            let path = path.strip_suffix("::self").unwrap_or(&path);
            out.insert(path.to_string());
        }
    }
}

fn normalize_path(path: &str) -> String {
    path.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" ::", "::")
        .replace(":: ", "::")
        .replace("{ ", "{")
        .replace(" }", "}")
}

fn scan_structs(clean: &str, masked: &str) -> BTreeMap<String, RecordSignature> {
    let mut records = BTreeMap::new();

    for caps in struct_regex().captures_iter(masked) {
        let Some(whole) = caps.get(0) else { continue };
        let body_start = whole.end();
        let Some(body_end) = matching_brace(masked, body_start) else {
            continue;
        };

        let body_clean = &clean[body_start..body_end];
        let body_masked = &masked[body_start..body_end];
        let members = top_level_ranges(body_masked, ',')
            .into_iter()
            .filter_map(|range| scan_field(&body_clean[range.clone()], &body_masked[range]));

        // Attributes between the previous item and this struct
        let preamble_start = masked[..whole.start()]
            .rfind(|c: char| c == '}' || c == ';')
            .map_or(0, |i| i + 1);
        let derives = scan_derives(&masked[preamble_start..whole.start()]);

        records.insert(
            caps[1].to_string(),
            RecordSignature::new(members).with_derives(derives),
        );
    }

    records
}

fn scan_derives(preamble: &str) -> Vec<String> {
    derive_regex()
        .captures_iter(preamble)
        .flat_map(|caps| {
            caps[1]
                .split(',')
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Parse one `#[attrs] pub name: Type` segment into (member name, type text)
fn scan_field(clean: &str, masked: &str) -> Option<(String, String)> {
    let mut pos = 0;
    let mut rename = None;

    loop {
        let rest = &masked[pos..];
        let trimmed = rest.trim_start();
        pos += rest.len() - trimmed.len();
        if !trimmed.starts_with("#[") {
            break;
        }
        let end = pos + matching_bracket(trimmed)?;
        if let Some(caps) = rename_regex().captures(&clean[pos..end]) {
            rename = Some(unescape(&caps[1]));
        }
        pos = end;
    }

    let caps = field_regex().captures(clean[pos..].trim())?;
    let name = rename.unwrap_or_else(|| caps[1].to_string());
    Some((name, caps[2].to_string()))
}

/// Offset just past the `]` closing the attribute that starts `s`
fn matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Offset of the `}` closing a body that starts at `start` (just past `{`)
fn matching_brace(s: &str, start: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in s[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Ranges of `s` separated by `sep` outside any bracket pair
fn top_level_ranges(s: &str, sep: char) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth -= 1,
            c if c == sep && depth == 0 => {
                ranges.push(start..i);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    ranges.push(start..s.len());

    ranges
        .into_iter()
        .filter(|r| !s[r.clone()].trim().is_empty())
        .collect()
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let hex: String = chars
                    .by_ref()
                    .skip_while(|c| *c == '{')
                    .take_while(|c| *c != '}')
                    .collect();
                if let Some(decoded) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(decoded);
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::config::NamingConfig;
    use crate::codegen::records::generate_records;
    use crate::codegen::rust::emit_unit;
    use crate::document::Document;

    const SAMPLE: &str = r#"//! header
use serde::{Deserialize, Serialize};

/// Database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub host: String,
    pub port: i64,
}

/* block /* nested */ comment */
pub struct RootSchema {
    #[serde(rename = "max-conn")]
    pub max_conn: Vec< i64 >,
    pub r#type: Option<serde_yaml::Value>,
    pub database: Database, // trailing
}
"#;

    #[test]
    fn test_scan_imports_and_members() {
        let sig = StructuralSignature::from_source(SAMPLE);

        let imports: Vec<_> = sig.imports.iter().cloned().collect();
        assert_eq!(imports, vec!["serde::Deserialize", "serde::Serialize"]);

        let db = &sig.records["Database"];
        assert_eq!(db.members, vec!["host", "port"]);
        assert_eq!(db.member_types["port"], "i64");

        let root = &sig.records["RootSchema"];
        assert_eq!(root.members, vec!["database", "max-conn", "type"]);
        assert_eq!(root.member_types["max-conn"], "Vec<i64>");
        assert_eq!(root.member_types["type"], "Option<serde_yaml::Value>");
    }

    #[test]
    fn test_scan_ignores_comments_and_formatting() {
        let reformatted = SAMPLE
            .replace("//! header", "//! a completely different header")
            .replace("pub port: i64,", "pub   port :   i64 , // the port")
            .replace("use serde::{Deserialize, Serialize};", "use serde::{\n    Serialize,\n    Deserialize,\n};");
        assert_eq!(
            StructuralSignature::from_source(SAMPLE),
            StructuralSignature::from_source(&reformatted)
        );
    }

    #[test]
    fn test_scan_ignores_declaration_order() {
        let (head, rest) = SAMPLE.split_at(SAMPLE.find("/// Database").unwrap());
        let (database, root) = rest.split_at(rest.find("/* block").unwrap());
        let swapped = format!("{head}{root}\n{database}");
        assert_eq!(
            StructuralSignature::from_source(SAMPLE),
            StructuralSignature::from_source(&swapped)
        );
    }

    #[test]
    fn test_strings_do_not_confuse_scanner() {
        let src = "pub struct A {\n    #[serde(rename = \"use x; // not a comment\")]\n    pub use_x: String,\n}\n";
        let sig = StructuralSignature::from_source(src);
        assert!(sig.imports.is_empty());
        assert_eq!(sig.records["A"].members, vec!["use x; // not a comment"]);
    }

    #[test]
    fn test_from_records_matches_scanned_output() {
        let doc = Document::parse(
            "mode: dev\nmax-conn: 3\ntype: x\nname: \"caf\u{e9}\"\nkl\u{e9}: 1\ndatabase: {host: a, port: 1}\nitems: [{id: 1}]\nnode: {next: {node: {v: 1}}}\nmeta: {}\n",
            "mem.yaml",
        )
        .unwrap();
        let records = generate_records(&doc.root, "RootSchema", &NamingConfig::default());
        let profile = RenderProfile::default();

        let direct = StructuralSignature::from_records(&records, &profile);
        let scanned = StructuralSignature::from_source(&emit_unit(&records, &profile));
        assert_eq!(direct, scanned);
        assert_eq!(direct.records["Node"].member_types["next"], "Box<Next>");
    }

    #[test]
    fn test_scan_reads_derives_per_struct() {
        let sig = StructuralSignature::from_source(SAMPLE);
        let derives: Vec<_> = sig.records["Database"].derives.iter().cloned().collect();
        assert_eq!(
            derives,
            vec!["Clone", "Debug", "Deserialize", "PartialEq", "Serialize"]
        );
        assert!(sig.records["RootSchema"].derives.is_empty());

        let split = SAMPLE.replace(
            "#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]",
            "#[derive(Debug, Clone)]\n#[derive(\n    PartialEq,\n    Serialize, Deserialize,\n)]",
        );
        assert_eq!(
            StructuralSignature::from_source(&split),
            StructuralSignature::from_source(SAMPLE)
        );
    }

    #[test]
    fn test_from_records_tracks_profile_derives() {
        let doc = Document::parse("database: {host: a}\n", "mem.yaml").unwrap();
        let records = generate_records(&doc.root, "RootSchema", &NamingConfig::default());
        let mut profile = RenderProfile::default();
        profile.derives.push("Default".to_string());

        let direct = StructuralSignature::from_records(&records, &profile);
        assert!(direct.records["Database"].derives.contains("Default"));
        assert_eq!(
            direct,
            StructuralSignature::from_source(&emit_unit(&records, &profile))
        );
    }

    #[test]
    fn test_expand_nested_use_tree() {
        let mut out = BTreeSet::new();
        expand_use_tree("", "std::{collections::{BTreeMap, HashMap}, fmt::{self}, io}", &mut out);
        let paths: Vec<_> = out.into_iter().collect();
        assert_eq!(
            paths,
            vec!["std::collections::BTreeMap", "std::collections::HashMap", "std::fmt", "std::io"]
        );
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r#"a\"b\\c\u{e9}"#), "a\"b\\c\u{e9}");
    }

    #[test]
    fn test_manifest_path() {
        assert_eq!(
            manifest_path(Path::new("src/settings_types.rs")),
            PathBuf::from("src/settings_types.rs.signature.json")
        );
    }

    #[test]
    fn test_load_previous_prefers_matching_manifest() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("types.rs");
        fs::write(&output, SAMPLE).unwrap();

        // No manifest: scanned
        let prev = load_previous(&output, true).unwrap().unwrap();
        assert_eq!(prev.source, SignatureSource::Scanned);

        // Matching manifest: trusted
        let mut signature = StructuralSignature::from_source(SAMPLE);
        signature.imports.insert("marker::FromManifest".to_string());
        SignatureManifest::new(signature.clone(), SAMPLE)
            .save(&manifest_path(&output))
            .unwrap();
        let prev = load_previous(&output, true).unwrap().unwrap();
        assert_eq!(prev.source, SignatureSource::Manifest);
        assert_eq!(prev.signature, signature);

        // Hand edit makes the manifest stale
        fs::write(&output, format!("// edited\n{SAMPLE}")).unwrap();
        let prev = load_previous(&output, true).unwrap().unwrap();
        assert_eq!(prev.source, SignatureSource::Scanned);
        assert!(!prev.signature.imports.contains("marker::FromManifest"));

        // Manifest ignored when disabled
        let prev = load_previous(&output, false).unwrap().unwrap();
        assert_eq!(prev.source, SignatureSource::Scanned);
    }

    #[test]
    fn test_load_previous_missing_or_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("types.rs");
        assert!(load_previous(&output, true).unwrap().is_none());

        fs::write(&output, "  \n").unwrap();
        assert!(load_previous(&output, true).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_manifest_falls_back_to_scan() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("types.rs");
        fs::write(&output, SAMPLE).unwrap();
        fs::write(manifest_path(&output), "{not json").unwrap();

        let prev = load_previous(&output, true).unwrap().unwrap();
        assert_eq!(prev.source, SignatureSource::Scanned);
        assert_eq!(prev.signature, StructuralSignature::from_source(SAMPLE));
    }
}
