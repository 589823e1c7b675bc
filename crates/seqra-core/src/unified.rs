//! # Unified Sequence Graph
//!
//! Merges many single-pattern graphs into one graph:
//! - One shared global START feeding every pattern's entry points
//! - Each pattern's END replaced by a shared completion (Pattern) node
//! - Explicit cross-pattern edges wiring each completion node to every
//!   element that listens for that pattern's name
//!
//! Recursive composition is thereby expressed as *static* graph structure:
//! when a pattern completes, firing its completion node synchronously feeds
//! every waiting reference to it, within the same propagation pass.
//!
//! A unified graph is built once per full pattern set. Changing the set is
//! an explicit rebuild, never incremental mutation.

use crate::graph::SequenceGraph;
use crate::primitives::MAX_PATTERNS;
use crate::types::{Edge, Node, NodeId, NodeKind, PatternName, SeqraError};
use std::collections::{BTreeMap, BTreeSet};

/// Id of the shared global start node.
const GLOBAL_START: &str = "START";

// =============================================================================
// UNIFIED GRAPH
// =============================================================================

/// The merged, fully-wired graph over a closed pattern set.
#[derive(Debug, Clone)]
pub struct UnifiedSequenceGraph {
    global_start: NodeId,
    nodes: BTreeMap<NodeId, Node>,
    edges: Vec<Edge>,
    successors: BTreeMap<NodeId, Vec<(NodeId, bool)>>,
    /// pattern -> completion node id.
    completions: BTreeMap<PatternName, NodeId>,
    /// pattern -> entry markers: (first node, reached-via-bypass) pairs
    /// that the original local START pointed at.
    entries: BTreeMap<PatternName, Vec<(NodeId, bool)>>,
    /// pattern -> element nodes listening for its completion.
    listeners: BTreeMap<PatternName, Vec<NodeId>>,
}

impl UnifiedSequenceGraph {
    /// The global start node id.
    #[must_use]
    pub fn global_start(&self) -> &NodeId {
        &self.global_start
    }

    /// Lookup a node by (namespaced) id.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All nodes in deterministic order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All edges, including cross-pattern edges.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Successors of a node, in wiring order.
    #[must_use]
    pub fn successors(&self, id: &NodeId) -> &[(NodeId, bool)] {
        self.successors.get(id).map_or(&[], Vec::as_slice)
    }

    /// The completion node id of a pattern.
    #[must_use]
    pub fn completion_of(&self, pattern: &PatternName) -> Option<&NodeId> {
        self.completions.get(pattern)
    }

    /// All (pattern, completion node) pairs.
    pub fn completions(&self) -> impl Iterator<Item = (&PatternName, &NodeId)> {
        self.completions.iter()
    }

    /// Entry markers of a pattern: the nodes its local START pointed at.
    #[must_use]
    pub fn entries_of(&self, pattern: &PatternName) -> &[(NodeId, bool)] {
        self.entries.get(pattern).map_or(&[], Vec::as_slice)
    }

    /// Element nodes listening for a pattern's completion.
    #[must_use]
    pub fn listeners_of(&self, pattern: &PatternName) -> &[NodeId] {
        self.listeners.get(pattern).map_or(&[], Vec::as_slice)
    }

    /// Pattern names in the set, in deterministic order.
    pub fn pattern_names(&self) -> impl Iterator<Item = &PatternName> {
        self.completions.keys()
    }

    /// Number of patterns merged into this graph.
    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.completions.len()
    }

    /// Total node count (global start + completion + namespaced nodes).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total edge count, including cross-pattern edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Merges single-pattern graphs into one `UnifiedSequenceGraph`.
pub struct UnifiedSequenceGraphBuilder;

impl UnifiedSequenceGraphBuilder {
    /// Build the unified graph over a closed pattern set.
    ///
    /// Per pattern: the local START is not materialized (its outgoing edges
    /// become entry markers wired from the shared global START), the local
    /// END is replaced by the pattern's completion node, and every other
    /// node id is namespaced. After all patterns are processed, each
    /// completion node is wired to every listener registered for its name.
    ///
    /// Fails fast on duplicate pattern names and on construction references
    /// naming patterns absent from the set.
    pub fn build(graphs: &[SequenceGraph]) -> Result<UnifiedSequenceGraph, SeqraError> {
        if graphs.len() > MAX_PATTERNS {
            return Err(SeqraError::InvalidPattern(
                "<set>".to_string(),
                format!("pattern set exceeds {MAX_PATTERNS} patterns"),
            ));
        }

        let names: BTreeSet<&PatternName> = graphs.iter().map(SequenceGraph::name).collect();
        if names.len() != graphs.len() {
            return Err(SeqraError::InvalidPattern(
                "<set>".to_string(),
                "duplicate pattern names in set".to_string(),
            ));
        }

        let global_start = NodeId::new(GLOBAL_START);
        let mut nodes = BTreeMap::new();
        nodes.insert(
            global_start.clone(),
            Node::routing(global_start.clone(), NodeKind::Start, None),
        );

        let mut edges = Vec::new();
        let mut completions = BTreeMap::new();
        let mut entries: BTreeMap<PatternName, Vec<(NodeId, bool)>> = BTreeMap::new();
        let mut listeners: BTreeMap<PatternName, Vec<NodeId>> = BTreeMap::new();

        for graph in graphs {
            let name = graph.name();
            let completion = NodeId::completion(name);
            nodes.insert(
                completion.clone(),
                Node::routing(completion.clone(), NodeKind::Pattern, Some(name.clone())),
            );
            completions.insert(name.clone(), completion.clone());

            // Maps a local id into unified-graph space. START and END have
            // no namespaced counterpart.
            let map_id = |local: &NodeId| -> NodeId {
                if local == graph.end() {
                    completion.clone()
                } else {
                    NodeId::scoped(name, local.as_str())
                }
            };

            for node in graph.nodes() {
                if node.id == *graph.start() || node.id == *graph.end() {
                    continue;
                }
                let mut unified = node.clone();
                unified.id = map_id(&node.id);
                if unified.kind == NodeKind::Element {
                    if let Some(element_type) = &unified.element_type {
                        let target = PatternName::new(element_type.clone());
                        if names.contains(&target) {
                            listeners.entry(target).or_default().push(unified.id.clone());
                        } else if let Some(reference) = &unified.reference {
                            return Err(SeqraError::UnknownConstruction(
                                reference.pattern.as_str().to_string(),
                            ));
                        }
                    }
                }
                nodes.insert(unified.id.clone(), unified);
            }

            for edge in graph.edges() {
                if edge.from == *graph.start() {
                    let to = map_id(&edge.to);
                    entries
                        .entry(name.clone())
                        .or_default()
                        .push((to.clone(), edge.bypass));
                    edges.push(Edge::new(global_start.clone(), to, edge.bypass));
                } else {
                    edges.push(Edge::new(map_id(&edge.from), map_id(&edge.to), edge.bypass));
                }
            }
        }

        // Cross-pattern wiring: completing P synchronously feeds every
        // element waiting for P.
        for (pattern, waiting) in &listeners {
            if let Some(completion) = completions.get(pattern) {
                for listener in waiting {
                    edges.push(Edge::new(completion.clone(), listener.clone(), false));
                }
            }
        }

        let mut successors: BTreeMap<NodeId, Vec<(NodeId, bool)>> = BTreeMap::new();
        for edge in &edges {
            successors
                .entry(edge.from.clone())
                .or_default()
                .push((edge.to.clone(), edge.bypass));
        }

        Ok(UnifiedSequenceGraph {
            global_start,
            nodes,
            edges,
            successors,
            completions,
            entries,
            listeners,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
