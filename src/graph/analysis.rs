//! Record Graph Analysis
//!
//! Dependency-first ordering of registered records, and detection of record
//! fields that need boxing because they close a cycle.

use std::collections::{BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;

use super::DependencyGraph;
use crate::codegen::records::RecordDefinition;

// =============================================================================
// Topological Order
// =============================================================================

/// Order registered records so every dependency precedes its dependents.
///
/// Depth-first post-order, starting from each record in registration order and
/// visiting dependencies in name order. Nodes are marked on entry, so cycles
/// terminate (members of a cycle then appear in visit order). Unregistered
/// dependency names are walked through but never emitted.
pub fn topo_order(graph: &DependencyGraph) -> Vec<String> {
    let mut order = Vec::with_capacity(graph.record_count());
    let mut visited = HashSet::new();

    for name in graph.records() {
        visit(graph, name, &mut visited, &mut order);
    }

    order
}

fn visit<'a>(
    graph: &'a DependencyGraph,
    name: &'a str,
    visited: &mut HashSet<&'a str>,
    order: &mut Vec<String>,
) {
    if !visited.insert(name) {
        return;
    }

    let Some(dependencies) = graph.dependencies(name) else {
        return;
    };
    for dep in dependencies {
        visit(graph, dep, visited, order);
    }
    order.push(name.to_string());
}

// =============================================================================
// Recursive Fields
// =============================================================================

/// A record field whose direct reference closes a cycle
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecursiveField {
    /// Record containing the field
    pub record: String,
    /// Document key of the field
    pub key: String,
}

/// Fields that must be boxed for the generated types to have a finite size.
///
/// Only direct record references count; list fields already allocate. A field
/// is recursive when its target is in the same strongly connected component
/// as the record holding it (self references included).
pub fn recursive_fields(records: &IndexMap<String, RecordDefinition>) -> BTreeSet<RecursiveField> {
    let mut graph: DiGraph<&str, &str> = DiGraph::new();
    let mut indices = HashMap::new();
    for name in records.keys() {
        indices.insert(name.as_str(), graph.add_node(name.as_str()));
    }

    for (name, record) in records {
        for field in &record.fields {
            if !field.field_type.is_direct_ref() {
                continue;
            }
            let target = field.field_type.record_ref().and_then(|t| indices.get(t));
            if let Some(target) = target {
                graph.add_edge(indices[name.as_str()], *target, field.key.as_str());
            }
        }
    }

    let mut component = HashMap::new();
    for (id, scc) in kosaraju_scc(&graph).into_iter().enumerate() {
        for idx in scc {
            component.insert(idx, id);
        }
    }

    graph
        .edge_references()
        .filter(|e| component.get(&e.source()) == component.get(&e.target()))
        .map(|e| RecursiveField {
            record: graph[e.source()].to_string(),
            key: e.weight().to_string(),
        })
        .collect()
}
