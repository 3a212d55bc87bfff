//! Record Dependency Graph
//!
//! Edges run from a record to every record name reachable through its nested
//! mapping and list-of-mapping fields. Edge targets may name records that
//! were never registered (their parent lost a first-wins name collision);
//! the orderer only emits registered names.

pub mod analysis;

pub use analysis::{recursive_fields, topo_order, RecursiveField};

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::codegen::config::NamingConfig;
use crate::codegen::infer::list_element_mapping;
use crate::codegen::names;
use crate::document::{Mapping, Node};

/// Dependency graph over record names
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Primary graph structure
    graph: DiGraph<String, ()>,

    /// Node index lookup: record name -> NodeIndex
    node_indices: HashMap<String, NodeIndex>,

    /// Registered records and their dependency sets, in registration order
    deps: IndexMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record with its dependency set
    pub fn add_record(&mut self, name: &str, dependencies: BTreeSet<String>) {
        let from = self.node(name);
        for dep in &dependencies {
            let to = self.node(dep);
            self.graph.update_edge(from, to, ());
        }
        self.deps.insert(name.to_string(), dependencies);
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(idx) = self.node_indices.get(name) {
            return *idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.node_indices.insert(name.to_string(), idx);
        idx
    }

    /// Dependencies of a registered record
    pub fn dependencies(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.deps.get(name)
    }

    /// Registered record names in registration order
    pub fn records(&self) -> impl Iterator<Item = &String> {
        self.deps.keys()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.deps.contains_key(name)
    }

    pub fn record_count(&self) -> usize {
        self.deps.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether first-wins naming produced a cycle
    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Export the graph to GraphViz DOT format
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph RecordGraph {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=rounded, fontname=\"Helvetica\", fontsize=10];\n\n");

        for name in self.records() {
            output.push_str(&format!("  \"{name}\";\n"));
        }
        output.push('\n');

        for edge in self.graph.edge_references() {
            let source = &self.graph[edge.source()];
            let target = &self.graph[edge.target()];
            // Only edges between registered records
            if self.contains(source) && self.contains(target) {
                output.push_str(&format!("  \"{source}\" -> \"{target}\";\n"));
            }
        }

        output.push_str("}\n");
        output
    }
}

/// Record names referenced by `map`, transitively.
///
/// Nested mappings contribute their own name and recurse; list-of-mapping
/// fields contribute the element record name and recurse into the first
/// element. Empty mappings are not records.
pub fn extract_dependencies(map: &Mapping, naming: &NamingConfig) -> BTreeSet<String> {
    let mut dependencies = BTreeSet::new();
    collect_dependencies(map, naming, &mut dependencies);
    dependencies
}

fn collect_dependencies(map: &Mapping, naming: &NamingConfig, out: &mut BTreeSet<String>) {
    for (key, value) in map {
        match value {
            Node::Mapping(nested) if !nested.is_empty() => {
                out.insert(names::record_name(key, naming));
                collect_dependencies(nested, naming, out);
            }
            Node::Sequence(_) => {
                if let Some(element) = list_element_mapping(value) {
                    out.insert(names::list_record_name(key, naming));
                    collect_dependencies(element, naming, out);
                }
            }
            _ => {}
        }
    }
}
