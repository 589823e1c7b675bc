//! # Sequence Graph
//!
//! Typed single-pattern graphs and the builder that compiles raw records
//! into them.
//!
//! All data structures use `BTreeMap` for deterministic ordering.
//! Graphs are immutable once built; activation state lives in the engines.

use crate::loader::RawPatternGraph;
use crate::types::{Edge, Node, NodeId, NodeKind, PatternName, SeqraError};
use std::collections::BTreeMap;

// =============================================================================
// SEQUENCE GRAPH
// =============================================================================

/// One pattern compiled into an executable graph.
///
/// Invariants (enforced at build):
/// - Exactly one START and one END node
/// - Every edge endpoint exists in the node map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceGraph {
    name: PatternName,
    nodes: BTreeMap<NodeId, Node>,
    edges: Vec<Edge>,
    /// Adjacency: node -> ordered (successor, bypass) pairs.
    successors: BTreeMap<NodeId, Vec<(NodeId, bool)>>,
    start: NodeId,
    end: NodeId,
}

impl SequenceGraph {
    /// The pattern name.
    #[must_use]
    pub fn name(&self) -> &PatternName {
        &self.name
    }

    /// Lookup a node by id.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All nodes in deterministic order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All edges in compiler order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Successors of a node, in edge order.
    #[must_use]
    pub fn successors(&self, id: &NodeId) -> &[(NodeId, bool)] {
        self.successors.get(id).map_or(&[], Vec::as_slice)
    }

    /// The START node id.
    #[must_use]
    pub fn start(&self) -> &NodeId {
        &self.start
    }

    /// The END node id.
    #[must_use]
    pub fn end(&self) -> &NodeId {
        &self.end
    }

    /// Total node count.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total edge count.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Compiles one raw pattern graph into a typed `SequenceGraph`.
pub struct SequenceGraphBuilder;

impl SequenceGraphBuilder {
    /// Build a sequence graph from raw compiler records.
    ///
    /// Raw kinds map as follows: START/END/INTERMEDIATE pass through; SLOT
    /// and CONSTRUCTION_REF both become `Element`. A SLOT's element type is
    /// its `pos` category; a CONSTRUCTION_REF's element type is the name of
    /// the referenced pattern, with the role resolved here, at build time.
    ///
    /// Fails fast on a missing or duplicated START/END, unknown raw kinds,
    /// and dangling edge endpoints. Never silently builds with empty ids.
    pub fn build(name: &PatternName, raw: &RawPatternGraph) -> Result<SequenceGraph, SeqraError> {
        raw.validate(name.as_str())?;

        let mut nodes = BTreeMap::new();
        let mut start: Option<NodeId> = None;
        let mut end: Option<NodeId> = None;

        for (local_id, raw_node) in &raw.nodes {
            let id = NodeId::new(local_id.clone());
            let node = match raw_node.kind.as_str() {
                "START" => {
                    if start.is_some() {
                        return Err(SeqraError::InvalidPattern(
                            name.as_str().to_string(),
                            "more than one START node".to_string(),
                        ));
                    }
                    start = Some(id.clone());
                    Node::routing(id, NodeKind::Start, Some(name.clone()))
                }
                "END" => {
                    if end.is_some() {
                        return Err(SeqraError::InvalidPattern(
                            name.as_str().to_string(),
                            "more than one END node".to_string(),
                        ));
                    }
                    end = Some(id.clone());
                    Node::routing(id, NodeKind::End, Some(name.clone()))
                }
                "INTERMEDIATE" => Node::routing(id, NodeKind::Intermediate, Some(name.clone())),
                "SLOT" => {
                    let pos = raw_node.pos.clone().ok_or_else(|| {
                        SeqraError::InvalidPattern(
                            name.as_str().to_string(),
                            format!("SLOT node '{local_id}' has no pos category"),
                        )
                    })?;
                    Node::element(id, name.clone(), pos, raw_node.element_value.clone())
                }
                "CONSTRUCTION_REF" => {
                    let referenced = raw_node.construction_name.clone().ok_or_else(|| {
                        SeqraError::InvalidPattern(
                            name.as_str().to_string(),
                            format!("CONSTRUCTION_REF node '{local_id}' has no construction_name"),
                        )
                    })?;
                    let role = raw_node
                        .role
                        .clone()
                        .or_else(|| role_from_id_suffix(local_id, &referenced));
                    Node::construction_ref(id, name.clone(), PatternName::new(referenced), role)
                }
                other => {
                    return Err(SeqraError::InvalidPattern(
                        name.as_str().to_string(),
                        format!("unknown node kind '{other}' on node '{local_id}'"),
                    ));
                }
            };
            nodes.insert(node.id.clone(), node);
        }

        let start = start.ok_or_else(|| SeqraError::MissingStart(name.as_str().to_string()))?;
        let end = end.ok_or_else(|| SeqraError::MissingEnd(name.as_str().to_string()))?;

        let mut edges = Vec::with_capacity(raw.edges.len());
        let mut successors: BTreeMap<NodeId, Vec<(NodeId, bool)>> = BTreeMap::new();
        for raw_edge in &raw.edges {
            let from = NodeId::new(raw_edge.from.clone());
            let to = NodeId::new(raw_edge.to.clone());
            if !nodes.contains_key(&from) || !nodes.contains_key(&to) {
                return Err(SeqraError::DanglingEdge {
                    pattern: name.as_str().to_string(),
                    from: raw_edge.from.clone(),
                    to: raw_edge.to.clone(),
                });
            }
            successors
                .entry(from.clone())
                .or_default()
                .push((to.clone(), raw_edge.bypass));
            edges.push(Edge::new(from, to, raw_edge.bypass));
        }

        Ok(SequenceGraph {
            name: name.clone(),
            nodes,
            edges,
            successors,
            start,
            end,
        })
    }
}

/// Derive a role from the `Name:role` id-suffix convention.
///
/// The compiler historically encoded roles in construction-ref node ids
/// (`NP:subject`). An explicit `role` field takes precedence; this fallback
/// keeps older compiled output working without stringly-typed parsing
/// anywhere downstream.
fn role_from_id_suffix(local_id: &str, referenced: &str) -> Option<String> {
    let rest = local_id.strip_prefix(referenced)?;
    let role = rest.strip_prefix(':')?;
    if role.is_empty() {
        None
    } else {
        Some(role.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
