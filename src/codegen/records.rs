//! Record Discovery
//!
//! Breadth-first walk from the root mapping. Every non-empty nested mapping
//! (and the first element of every list of mappings) becomes a record named
//! after its key. The first structure registered under a name owns it; later
//! structures mapping to the same name are skipped.

use std::collections::{BTreeSet, VecDeque};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::NamingConfig;
use super::infer::{infer_field_type, list_element_mapping, FieldType};
use super::names;
use crate::document::{Mapping, Node};
use crate::graph::{extract_dependencies, DependencyGraph};

/// A single typed field of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordField {
    /// Document key
    pub key: String,
    pub field_type: FieldType,
}

/// A named record type with fields in document order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDefinition {
    pub name: String,
    pub fields: Vec<RecordField>,
}

impl RecordDefinition {
    /// Records named by this record's own fields, through lists
    pub fn references(&self) -> BTreeSet<String> {
        self.fields
            .iter()
            .filter_map(|f| f.field_type.record_ref())
            .map(str::to_string)
            .collect()
    }

    fn same_keys(&self, map: &Mapping) -> bool {
        self.fields.len() == map.len() && self.fields.iter().all(|f| map.contains_key(&f.key))
    }
}

/// All records discovered from one document, with their dependency graph
#[derive(Debug, Clone)]
pub struct RecordSet {
    root: String,
    records: IndexMap<String, RecordDefinition>,
    /// Transitive key-derived dependencies, for reporting
    graph: DependencyGraph,
    /// Direct references of the registered definitions, for ordering
    references: DependencyGraph,
}

impl RecordSet {
    /// Name of the root record
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn get(&self, name: &str) -> Option<&RecordDefinition> {
        self.records.get(name)
    }

    /// Records in discovery order
    pub fn records(&self) -> &IndexMap<String, RecordDefinition> {
        &self.records
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in dependency order (dependencies first)
    pub fn ordered(&self) -> Vec<&RecordDefinition> {
        crate::graph::topo_order(&self.references)
            .iter()
            .filter_map(|name| self.records.get(name))
            .collect()
    }
}

/// Discover every record reachable from `root`
pub fn generate_records(root: &Mapping, root_name: &str, naming: &NamingConfig) -> RecordSet {
    let mut records: IndexMap<String, RecordDefinition> = IndexMap::new();
    let mut graph = DependencyGraph::new();
    let mut queue: VecDeque<(String, &Mapping)> = VecDeque::new();
    queue.push_back((root_name.to_string(), root));

    while let Some((name, map)) = queue.pop_front() {
        if let Some(existing) = records.get(&name) {
            if !existing.same_keys(map) {
                debug!(record = %name, "Record already defined with a different shape; keeping the first");
            }
            continue;
        }

        let fields = map
            .iter()
            .map(|(key, value)| RecordField {
                key: key.clone(),
                field_type: infer_field_type(value, key, naming),
            })
            .collect();

        graph.add_record(&name, extract_dependencies(map, naming));
        records.insert(
            name.clone(),
            RecordDefinition {
                name: name.clone(),
                fields,
            },
        );

        for (key, value) in map {
            match value {
                Node::Mapping(nested) if !nested.is_empty() => {
                    queue.push_back((names::record_name(key, naming), nested));
                }
                Node::Sequence(_) => {
                    if let Some(element) = list_element_mapping(value) {
                        queue.push_back((names::list_record_name(key, naming), element));
                    }
                }
                _ => {}
            }
        }
    }

    let mut references = DependencyGraph::new();
    for record in records.values() {
        references.add_record(&record.name, record.references());
    }

    debug!(
        records = records.len(),
        edges = graph.edge_count(),
        direct_edges = references.edge_count(),
        "Discovered records"
    );

    RecordSet {
        root: root_name.to_string(),
        records,
        graph,
        references,
    }
}
