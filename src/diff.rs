//! Signature diffing
//!
//! Compares the structural signatures of the persisted and candidate units and
//! decides whether the candidate is worth writing.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use similar::TextDiff;

use crate::signature::{RecordSignature, StructuralSignature};

/// Kind of structural change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    ImportAdded,
    ImportRemoved,
    RecordAdded,
    RecordRemoved,
    MemberAdded,
    MemberRemoved,
    /// A member kept its name but its declared type changed
    MemberRetyped,
    /// A record's derived traits changed
    DerivesChanged,
}

impl ChangeKind {
    fn marker(&self) -> char {
        match self {
            ChangeKind::ImportAdded | ChangeKind::RecordAdded | ChangeKind::MemberAdded => '+',
            ChangeKind::ImportRemoved | ChangeKind::RecordRemoved | ChangeKind::MemberRemoved => '-',
            ChangeKind::MemberRetyped | ChangeKind::DerivesChanged => '~',
        }
    }
}

/// A single detected change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureChange {
    pub kind: ChangeKind,
    /// Import path, record name, or `Record.member`
    pub path: String,
    pub old_type: Option<String>,
    pub new_type: Option<String>,
}

impl SignatureChange {
    fn new(kind: ChangeKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            old_type: None,
            new_type: None,
        }
    }
}

impl fmt::Display for SignatureChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.marker(), self.path)?;
        match (&self.old_type, &self.new_type) {
            (Some(old), Some(new)) => write!(f, ": {} -> {}", old, new),
            (None, Some(ty)) | (Some(ty), None) => write!(f, ": {}", ty),
            (None, None) => Ok(()),
        }
    }
}

/// Result of comparing two signatures
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureDiff {
    /// No previous unit existed
    pub initial: bool,
    pub changes: Vec<SignatureChange>,
}

impl SignatureDiff {
    /// Whether the candidate should replace the persisted unit
    pub fn is_meaningful(&self) -> bool {
        self.initial || !self.changes.is_empty()
    }

    /// Count of changes of one kind
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.iter().filter(|c| c.kind == kind).count()
    }

    pub fn summary(&self) -> String {
        if self.initial {
            return "no previous unit".to_string();
        }
        if self.changes.is_empty() {
            return "no structural changes".to_string();
        }
        format!("{} structural changes", self.changes.len())
    }
}

/// Itemize the differences between `old` and `new`
pub fn diff_signatures(old: Option<&StructuralSignature>, new: &StructuralSignature) -> SignatureDiff {
    let Some(old) = old else {
        return SignatureDiff {
            initial: true,
            changes: Vec::new(),
        };
    };

    let mut changes = Vec::new();

    for import in new.imports.difference(&old.imports) {
        changes.push(SignatureChange::new(ChangeKind::ImportAdded, import));
    }
    for import in old.imports.difference(&new.imports) {
        changes.push(SignatureChange::new(ChangeKind::ImportRemoved, import));
    }

    let old_names = old.record_names();
    let new_names = new.record_names();

    for name in new_names.difference(&old_names) {
        changes.push(SignatureChange::new(ChangeKind::RecordAdded, *name));
    }
    for name in old_names.difference(&new_names) {
        changes.push(SignatureChange::new(ChangeKind::RecordRemoved, *name));
    }
    for name in old_names.intersection(&new_names) {
        diff_members(name, &old.records[*name], &new.records[*name], &mut changes);
    }

    SignatureDiff {
        initial: false,
        changes,
    }
}

fn diff_members(
    record: &str,
    old: &RecordSignature,
    new: &RecordSignature,
    changes: &mut Vec<SignatureChange>,
) {
    if old.derives != new.derives {
        changes.push(SignatureChange {
            old_type: join(&old.derives),
            new_type: join(&new.derives),
            ..SignatureChange::new(ChangeKind::DerivesChanged, record)
        });
    }

    let old_members: BTreeSet<&String> = old.member_types.keys().collect();
    let new_members: BTreeSet<&String> = new.member_types.keys().collect();

    for member in new_members.difference(&old_members) {
        changes.push(SignatureChange {
            new_type: new.member_types.get(*member).cloned(),
            ..SignatureChange::new(ChangeKind::MemberAdded, format!("{record}.{member}"))
        });
    }
    for member in old_members.difference(&new_members) {
        changes.push(SignatureChange {
            old_type: old.member_types.get(*member).cloned(),
            ..SignatureChange::new(ChangeKind::MemberRemoved, format!("{record}.{member}"))
        });
    }
    for member in old_members.intersection(&new_members) {
        let old_type = &old.member_types[*member];
        let new_type = &new.member_types[*member];
        if old_type != new_type {
            changes.push(SignatureChange {
                old_type: Some(old_type.clone()),
                new_type: Some(new_type.clone()),
                ..SignatureChange::new(ChangeKind::MemberRetyped, format!("{record}.{member}"))
            });
        }
    }
}

fn join(derives: &BTreeSet<String>) -> Option<String> {
    (!derives.is_empty()).then(|| derives.iter().cloned().collect::<Vec<_>>().join(", "))
}

/// Decide whether the candidate unit should be written
pub fn should_write(old: Option<&StructuralSignature>, new: &StructuralSignature) -> bool {
    let Some(old) = old else {
        return true;
    };

    if old.imports != new.imports {
        return true;
    }
    if old.record_names() != new.record_names() {
        return true;
    }

    old.records.iter().any(|(name, old_record)| {
        new.records.get(name).is_some_and(|new_record| {
            old_record.member_types != new_record.member_types
                || old_record.derives != new_record.derives
        })
    })
}

/// Line-based unified diff between two texts; empty when they are equal
pub fn unified_text_diff(old: &str, new: &str, old_label: &str, new_label: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(old_label, new_label)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(imports: &[&str], records: &[(&str, &[(&str, &str)])]) -> StructuralSignature {
        StructuralSignature {
            imports: imports.iter().map(|s| s.to_string()).collect(),
            records: records
                .iter()
                .map(|(name, members)| {
                    (name.to_string(), RecordSignature::new(members.iter().copied()))
                })
                .collect(),
        }
    }

    fn base() -> StructuralSignature {
        sig(
            &["serde::Deserialize", "serde::Serialize"],
            &[
                ("Database", &[("host", "String"), ("port", "i64")]),
                ("RootSchema", &[("database", "Database"), ("mode", "String")]),
            ],
        )
    }

    fn assert_agrees(old: Option<&StructuralSignature>, new: &StructuralSignature, expected: bool) {
        assert_eq!(should_write(old, new), expected);
        assert_eq!(diff_signatures(old, new).is_meaningful(), expected);
    }

    #[test]
    fn test_no_previous_unit() {
        assert_agrees(None, &base(), true);
        assert!(diff_signatures(None, &base()).initial);
    }

    #[test]
    fn test_identical_signatures() {
        assert_agrees(Some(&base()), &base(), false);
        assert_eq!(diff_signatures(Some(&base()), &base()).summary(), "no structural changes");
    }

    #[test]
    fn test_import_change() {
        let mut new = base();
        new.imports.insert("std::collections::HashMap".to_string());
        assert_agrees(Some(&base()), &new, true);
        assert_eq!(diff_signatures(Some(&base()), &new).count(ChangeKind::ImportAdded), 1);
        assert_eq!(diff_signatures(Some(&new), &base()).count(ChangeKind::ImportRemoved), 1);
    }

    #[test]
    fn test_record_added_and_removed() {
        let mut new = base();
        new.records.insert("Cache".to_string(), RecordSignature::new([("ttl", "i64")]));
        assert_agrees(Some(&base()), &new, true);

        let diff = diff_signatures(Some(&base()), &new);
        assert_eq!(diff.changes, vec![SignatureChange::new(ChangeKind::RecordAdded, "Cache")]);

        let diff = diff_signatures(Some(&new), &base());
        assert_eq!(diff.count(ChangeKind::RecordRemoved), 1);
    }

    #[test]
    fn test_record_rename_is_meaningful() {
        let renamed = sig(
            &["serde::Deserialize", "serde::Serialize"],
            &[
                ("Db", &[("host", "String"), ("port", "i64")]),
                ("RootSchema", &[("database", "Db"), ("mode", "String")]),
            ],
        );
        assert_agrees(Some(&base()), &renamed, true);
    }

    #[test]
    fn test_member_retyped() {
        let new = sig(
            &["serde::Deserialize", "serde::Serialize"],
            &[
                ("Database", &[("host", "String"), ("port", "String")]),
                ("RootSchema", &[("database", "Database"), ("mode", "String")]),
            ],
        );
        assert_agrees(Some(&base()), &new, true);

        let diff = diff_signatures(Some(&base()), &new);
        assert_eq!(diff.changes.len(), 1);
        assert_eq!(diff.changes[0].kind, ChangeKind::MemberRetyped);
        assert_eq!(diff.changes[0].to_string(), "~ Database.port: i64 -> String");
    }

    #[test]
    fn test_member_added_and_removed() {
        let new = sig(
            &["serde::Deserialize", "serde::Serialize"],
            &[
                ("Database", &[("host", "String"), ("user", "String")]),
                ("RootSchema", &[("database", "Database"), ("mode", "String")]),
            ],
        );
        assert_agrees(Some(&base()), &new, true);

        let diff = diff_signatures(Some(&base()), &new);
        assert_eq!(diff.count(ChangeKind::MemberAdded), 1);
        assert_eq!(diff.count(ChangeKind::MemberRemoved), 1);
    }

    #[test]
    fn test_derives_change_is_meaningful() {
        let mut new = base();
        if let Some(db) = new.records.get_mut("Database") {
            *db = RecordSignature::new([("host", "String"), ("port", "i64")])
                .with_derives(["Debug", "Default"]);
        }
        assert_agrees(Some(&base()), &new, true);

        let diff = diff_signatures(Some(&base()), &new);
        assert_eq!(diff.changes.len(), 1);
        assert_eq!(diff.changes[0].kind, ChangeKind::DerivesChanged);
        assert_eq!(diff.changes[0].to_string(), "~ Database: Debug, Default");
    }

    #[test]
    fn test_unified_text_diff() {
        let text = unified_text_diff("a\nb\nc\n", "a\nx\nc\n", "old", "new");
        assert!(text.starts_with("--- old\n+++ new\n@@"));
        assert!(text.contains("-b\n"));
        assert!(text.contains("+x\n"));
        assert!(text.contains(" a\n"));
    }

    #[test]
    fn test_unified_text_diff_identical() {
        assert!(unified_text_diff("a\n", "a\n", "old", "new").is_empty());
    }
}
