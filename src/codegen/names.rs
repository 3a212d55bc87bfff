//! Name Resolution
//!
//! Derives record type names and field identifiers from document keys.
//! Every function here is a pure function of its inputs, so the same document
//! always produces the same names.
//!
//! - Record names: PascalCase of the key (`database_config` -> `DatabaseConfig`)
//! - List element records: singularized first (`items` -> `Item`)
//! - Field identifiers: snake_case, keyword-escaped, with a serde rename when
//!   the identifier no longer matches the key

use std::sync::OnceLock;

use regex::Regex;

use super::config::NamingConfig;

/// Type names the generated unit itself relies on
const RESERVED_TYPE_NAMES: &[&str] = &[
    "String", "Vec", "Option", "Box", "Value", "Result", "Serialize", "Deserialize", "Self",
];

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "try", "gen",
];

/// Keywords that cannot be written as raw identifiers
const NON_RAW_KEYWORDS: &[&str] = &["self", "Self", "super", "crate"];

// =============================================================================
// Record Names
// =============================================================================

/// Record type name for a mapping stored under `key`
pub fn record_name(key: &str, naming: &NamingConfig) -> String {
    let mut name = to_pascal_case(key, naming);

    if !name.starts_with(is_ident_start) {
        name.insert_str(0, "Record");
    }
    if RESERVED_TYPE_NAMES.contains(&name.as_str()) {
        name.push_str("Record");
    }
    name
}

/// Record type name for the elements of a list stored under `key`
pub fn list_record_name(key: &str, naming: &NamingConfig) -> String {
    if naming.singularize_list_items {
        record_name(&singularize(key), naming)
    } else {
        record_name(key, naming)
    }
}

/// Convert a key to PascalCase, respecting configured acronyms
pub fn to_pascal_case(s: &str, naming: &NamingConfig) -> String {
    s.split(|c: char| !is_word_char(c))
        .filter(|word| !word.is_empty())
        .map(|word| case_word(word, naming))
        .collect()
}

fn case_word(word: &str, naming: &NamingConfig) -> String {
    let upper = word.to_uppercase();
    if naming.acronyms.contains(&upper) {
        return upper;
    }

    // SCREAMING words are lowered; camelCase humps are kept
    let is_all_caps = !word.chars().any(|c| c.is_lowercase());
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => {
            let mut result: String = first.to_uppercase().collect();
            if is_all_caps {
                result.extend(chars.flat_map(char::to_lowercase));
            } else {
                result.extend(chars);
            }
            result
        }
    }
}

/// Best-effort English singular of the trailing word of `key`
pub fn singularize(key: &str) -> String {
    let lower = key.to_lowercase();
    let strip = |n: usize| key[..key.len() - n].to_string();

    if key.len() <= 2 || !key.is_ascii() {
        return key.to_string();
    }
    if lower.ends_with("ies") && key.len() > 3 {
        return format!("{}y", strip(3));
    }
    if ["sses", "shes", "ches", "xes", "zzes"].iter().any(|s| lower.ends_with(s)) {
        return strip(2);
    }
    if ["ss", "us", "is"].iter().any(|s| lower.ends_with(s)) {
        return key.to_string();
    }
    if lower.ends_with('s') {
        return strip(1);
    }
    key.to_string()
}

// =============================================================================
// Field Identifiers
// =============================================================================

/// Rust identifier chosen for a document key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIdent {
    /// Identifier as written in source (may carry `r#`)
    pub ident: String,
    /// The document key the field deserializes from
    pub key: String,
}

impl FieldIdent {
    /// Identifier without the raw prefix
    pub fn bare(&self) -> &str {
        self.ident.strip_prefix("r#").unwrap_or(&self.ident)
    }

    /// Whether a `#[serde(rename)]` is needed to keep the document key
    pub fn needs_rename(&self) -> bool {
        self.bare() != self.key
    }
}

/// Derive the field identifier for `key`
pub fn field_ident(key: &str) -> FieldIdent {
    let mut ident = to_snake_case(key);
    if ident.is_empty() {
        ident = "field".to_string();
    }
    if !ident.starts_with(is_ident_start) {
        ident.insert(0, '_');
    }

    let ident = if NON_RAW_KEYWORDS.contains(&ident.as_str()) {
        format!("{ident}_")
    } else if RUST_KEYWORDS.contains(&ident.as_str()) {
        format!("r#{ident}")
    } else {
        ident
    };

    FieldIdent {
        ident,
        key: key.to_string(),
    }
}

/// Convert to snake_case; any run of characters that cannot continue an
/// identifier (underscores included) becomes one underscore
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;
    let mut pending_sep = false;

    for c in s.chars() {
        if !is_word_char(c) {
            pending_sep = !result.is_empty();
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower {
            pending_sep = true;
        }
        if pending_sep {
            result.push('_');
            pending_sep = false;
        }
        result.extend(c.to_lowercase());
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
    }

    result
}

fn xid_start_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\p{XID_Start}$").expect("valid XID_Start regex"))
}

fn xid_continue_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\p{XID_Continue}$").expect("valid XID_Continue regex"))
}

fn is_ident_start(c: char) -> bool {
    xid_start_regex().is_match(c.encode_utf8(&mut [0; 4]))
}

/// Identifier character that is not an underscore
fn is_word_char(c: char) -> bool {
    c != '_' && xid_continue_regex().is_match(c.encode_utf8(&mut [0; 4]))
}
