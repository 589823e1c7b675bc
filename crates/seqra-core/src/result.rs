//! # Result Graph Builder
//!
//! Reconstructs a parse forest from the unified engine's event log.
//!
//! The log is the sole input: completions become interior nodes, element
//! firings become leaves, and reference firings become parent-child edges
//! carrying roles. Attachment is time-based: an event attaches to the
//! nearest completion of its owning pattern at or after the event's tick, so
//! re-matched patterns keep distinct spans.
//!
//! Reconstruction is best-effort and total: orphaned events (firings whose
//! pattern never completed afterwards) are skipped, a second parent claim on
//! one child is warned about and skipped, and nothing here returns an error.
//!
//! Forest nodes live in one arena indexed by `usize`, so sharing and cycles
//! in the source log cannot produce ownership cycles here.

use crate::types::{ParseEvent, PatternName, Tick};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// FOREST STRUCTURE
// =============================================================================

/// One node of the parse forest: a completed pattern instance or a matched
/// input token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseTreeNode {
    /// Arena index of this node.
    pub id: usize,
    /// Pattern name for interior nodes; token category for terminals.
    pub label: String,
    /// Whether this is a matched input token.
    pub terminal: bool,
    /// Tick of the earliest input that contributed to this node.
    pub start: Tick,
    /// Tick at which the node fired or completed.
    pub end: Tick,
    /// The matched token value. Terminals only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// The grammatical role this node plays in its parent, if declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Children, ordered by start tick then arena index.
    pub children: Vec<usize>,
}

/// An arena-backed parse forest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseForest {
    nodes: Vec<ParseTreeNode>,
    /// Parentless completions, most recent first.
    roots: Vec<usize>,
}

impl ParseForest {
    /// All nodes, indexed by arena id.
    #[must_use]
    pub fn nodes(&self) -> &[ParseTreeNode] {
        &self.nodes
    }

    /// Lookup a node by arena id.
    #[must_use]
    pub fn node(&self, id: usize) -> Option<&ParseTreeNode> {
        self.nodes.get(id)
    }

    /// Root node ids, most recently completed first.
    #[must_use]
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Whether the forest has no nodes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total node count, terminals included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Builds a `ParseForest` from an event log.
pub struct ResultGraphBuilder;

impl ResultGraphBuilder {
    /// Reconstruct the parse forest for the given log.
    ///
    /// Single pass over the log in occurrence order, then attachment and
    /// span computation. Duplicate events (same identity at the same tick)
    /// collapse into one node. Never fails: malformed fragments of the log
    /// degrade to skipped events, not errors.
    #[must_use]
    pub fn build(events: &[ParseEvent]) -> ParseForest {
        let mut arena: Vec<ParseTreeNode> = Vec::new();
        // pattern -> (completion tick, arena id), ascending by tick. The
        // log appends completions in tick order, so pushes stay sorted.
        let mut completions: BTreeMap<PatternName, Vec<(Tick, usize)>> = BTreeMap::new();
        let mut seen_completions: BTreeSet<(PatternName, Tick)> = BTreeSet::new();

        for event in events {
            if let ParseEvent::PatternCompleted { time, pattern } = event {
                if !seen_completions.insert((pattern.clone(), *time)) {
                    continue;
                }
                let id = arena.len();
                arena.push(ParseTreeNode {
                    id,
                    label: pattern.as_str().to_string(),
                    terminal: false,
                    start: *time,
                    end: *time,
                    value: None,
                    role: None,
                    children: Vec::new(),
                });
                completions.entry(pattern.clone()).or_default().push((*time, id));
            }
        }

        // child arena id -> parent arena id. One parent per node.
        let mut parents: BTreeMap<usize, usize> = BTreeMap::new();
        let mut seen_elements: BTreeSet<(PatternName, String, Tick)> = BTreeSet::new();
        let mut seen_refs: BTreeSet<(PatternName, PatternName, Tick)> = BTreeSet::new();

        for event in events {
            match event {
                ParseEvent::PatternCompleted { .. } => {}
                ParseEvent::ElementFired {
                    time,
                    pattern,
                    node,
                    element_type,
                    value,
                } => {
                    let key = (pattern.clone(), node.as_str().to_string(), *time);
                    if !seen_elements.insert(key) {
                        continue;
                    }
                    // A firing with no later completion of its pattern is a
                    // partial match; it leaves no trace in the forest.
                    let Some(parent) = nearest_completion(&completions, pattern, *time) else {
                        continue;
                    };
                    let id = arena.len();
                    arena.push(ParseTreeNode {
                        id,
                        label: element_type.clone(),
                        terminal: true,
                        start: *time,
                        end: *time,
                        value: Some(value.clone()),
                        role: None,
                        children: Vec::new(),
                    });
                    arena[parent].children.push(id);
                    parents.insert(id, parent);
                }
                ParseEvent::ConstructionRefFired {
                    time,
                    pattern,
                    node: _,
                    child,
                    role,
                } => {
                    let key = (pattern.clone(), child.clone(), *time);
                    if !seen_refs.insert(key) {
                        continue;
                    }
                    // The child completed at this exact tick.
                    let Some(child_id) = completion_at(&completions, child, *time) else {
                        continue;
                    };
                    let Some(parent) = nearest_completion(&completions, pattern, *time) else {
                        continue;
                    };
                    if parent == child_id {
                        continue;
                    }
                    if let Some(existing) = parents.get(&child_id) {
                        warn_double_parent(child, *existing, parent);
                        continue;
                    }
                    arena[parent].children.push(child_id);
                    parents.insert(child_id, parent);
                    arena[child_id].role = role.clone();
                }
            }
        }

        // Span computation: a completion starts where its earliest child
        // starts. Terminal starts are fixed at creation, and a nested
        // completion always precedes its parent in the arena (the log is in
        // occurrence order), so one forward pass suffices.
        for id in 0..arena.len() {
            if arena[id].terminal {
                continue;
            }
            let start = arena[id]
                .children
                .iter()
                .filter_map(|&c| arena.get(c).map(|n| n.start))
                .min();
            if let Some(start) = start {
                arena[id].start = start;
            }
        }

        // Deterministic child order: by start tick, then arena id.
        let spans: Vec<(Tick, usize)> = arena.iter().map(|n| (n.start, n.id)).collect();
        for node in &mut arena {
            node.children.sort_by_key(|&c| spans[c]);
        }

        let mut roots: Vec<usize> = arena
            .iter()
            .filter(|n| !n.terminal && !parents.contains_key(&n.id))
            .map(|n| n.id)
            .collect();
        roots.sort_by(|a, b| arena[*b].end.cmp(&arena[*a].end).then(a.cmp(b)));

        ParseForest {
            nodes: arena,
            roots,
        }
    }
}

/// Nearest completion of `pattern` at or after `time`.
fn nearest_completion(
    completions: &BTreeMap<PatternName, Vec<(Tick, usize)>>,
    pattern: &PatternName,
    time: Tick,
) -> Option<usize> {
    completions
        .get(pattern)?
        .iter()
        .find(|(tick, _)| *tick >= time)
        .map(|(_, id)| *id)
}

/// The completion of `pattern` at exactly `time`, if any.
fn completion_at(
    completions: &BTreeMap<PatternName, Vec<(Tick, usize)>>,
    pattern: &PatternName,
    time: Tick,
) -> Option<usize> {
    completions
        .get(pattern)?
        .iter()
        .find(|(tick, _)| *tick == time)
        .map(|(_, id)| *id)
}

/// Structured warning for a child claimed by two parents.
///
/// Uses stderr logging for CORE (no external dependencies).
/// The app layer should configure proper tracing if needed.
#[inline]
fn warn_double_parent(child: &PatternName, existing: usize, rejected: usize) {
    eprintln!(
        "{{\"level\":\"warn\",\"target\":\"seqra_core::result\",\"message\":\"completion of '{}' already attached to node {}; ignoring second parent {}\"}}",
        child.as_str(),
        existing,
        rejected
    );
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeId;

    fn fired(time: u64, pattern: &str, node: &str, ty: &str, value: &str) -> ParseEvent {
        ParseEvent::ElementFired {
            time: Tick::new(time),
            pattern: PatternName::new(pattern),
            node: NodeId::new(node),
            element_type: ty.to_string(),
            value: value.to_string(),
        }
    }

    fn completed(time: u64, pattern: &str) -> ParseEvent {
        ParseEvent::PatternCompleted {
            time: Tick::new(time),
            pattern: PatternName::new(pattern),
        }
    }

    fn ref_fired(time: u64, pattern: &str, node: &str, child: &str, role: Option<&str>) -> ParseEvent {
        ParseEvent::ConstructionRefFired {
            time: Tick::new(time),
            pattern: PatternName::new(pattern),
            node: NodeId::new(node),
            child: PatternName::new(child),
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn empty_log_yields_empty_forest() {
        let forest = ResultGraphBuilder::build(&[]);
        assert!(forest.is_empty());
        assert!(forest.roots().is_empty());
    }

    #[test]
    fn flat_pattern_collects_its_terminals() {
        let forest = ResultGraphBuilder::build(&[
            fired(1, "NP", "NP::det", "DET", "the"),
            fired(2, "NP", "NP::noun", "NOUN", "cat"),
            completed(2, "NP"),
        ]);

        assert_eq!(forest.roots().len(), 1);
        let root = forest.node(forest.roots()[0]).expect("root");
        assert_eq!(root.label, "NP");
        assert_eq!(root.start, Tick::new(1));
        assert_eq!(root.end, Tick::new(2));
        assert_eq!(root.children.len(), 2);

        let values: Vec<&str> = root
            .children
            .iter()
            .filter_map(|&c| forest.node(c)?.value.as_deref())
            .collect();
        assert_eq!(values, vec!["the", "cat"]);
    }

    #[test]
    fn nested_completion_attaches_child_with_role() {
        let forest = ResultGraphBuilder::build(&[
            fired(1, "NP", "NP::det", "DET", "the"),
            fired(2, "NP", "NP::noun", "NOUN", "cat"),
            completed(2, "NP"),
            ref_fired(2, "S", "S::NP:subject", "NP", Some("subject")),
            fired(3, "S", "S::verb", "VERB", "sleeps"),
            completed(3, "S"),
        ]);

        assert_eq!(forest.roots().len(), 1);
        let root = forest.node(forest.roots()[0]).expect("root");
        assert_eq!(root.label, "S");
        // S spans the whole sentence through its NP child.
        assert_eq!(root.start, Tick::new(1));
        assert_eq!(root.end, Tick::new(3));

        let np = root
            .children
            .iter()
            .filter_map(|&c| forest.node(c))
            .find(|n| n.label == "NP")
            .expect("np child");
        assert_eq!(np.role.as_deref(), Some("subject"));
        assert_eq!(np.children.len(), 2);
    }

    #[test]
    fn rematched_pattern_keeps_distinct_spans() {
        let forest = ResultGraphBuilder::build(&[
            fired(1, "NP", "NP::det", "DET", "the"),
            fired(2, "NP", "NP::noun", "NOUN", "cat"),
            completed(2, "NP"),
            fired(3, "NP", "NP::det", "DET", "a"),
            fired(4, "NP", "NP::noun", "NOUN", "dog"),
            completed(4, "NP"),
        ]);

        assert_eq!(forest.roots().len(), 2);
        // Most recent completion first.
        let newest = forest.node(forest.roots()[0]).expect("newest");
        let oldest = forest.node(forest.roots()[1]).expect("oldest");
        assert_eq!((newest.start, newest.end), (Tick::new(3), Tick::new(4)));
        assert_eq!((oldest.start, oldest.end), (Tick::new(1), Tick::new(2)));
        assert_eq!(newest.children.len(), 2);
        assert_eq!(oldest.children.len(), 2);
    }

    #[test]
    fn partial_match_leaves_no_trace() {
        // DET fired but NP never completed.
        let forest = ResultGraphBuilder::build(&[fired(1, "NP", "NP::det", "DET", "the")]);
        assert!(forest.is_empty());
    }

    #[test]
    fn duplicate_events_collapse() {
        let forest = ResultGraphBuilder::build(&[
            fired(1, "NP", "NP::det", "DET", "the"),
            fired(1, "NP", "NP::det", "DET", "the"),
            fired(2, "NP", "NP::noun", "NOUN", "cat"),
            completed(2, "NP"),
            completed(2, "NP"),
        ]);

        assert_eq!(forest.roots().len(), 1);
        let root = forest.node(forest.roots()[0]).expect("root");
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn second_parent_claim_is_skipped() {
        // Two parents both claim the NP completed at tick 2. Only the first
        // claim in log order wins.
        let forest = ResultGraphBuilder::build(&[
            fired(1, "NP", "NP::det", "DET", "the"),
            fired(2, "NP", "NP::noun", "NOUN", "cat"),
            completed(2, "NP"),
            ref_fired(2, "S", "S::NP:subject", "NP", Some("subject")),
            ref_fired(2, "Q", "Q::NP:topic", "NP", Some("topic")),
            fired(3, "S", "S::verb", "VERB", "sleeps"),
            completed(3, "S"),
            fired(4, "Q", "Q::mark", "PUNCT", "?"),
            completed(4, "Q"),
        ]);

        let np_parents: Vec<&ParseTreeNode> = forest
            .nodes()
            .iter()
            .filter(|n| n.children.iter().any(|&c| forest.node(c).is_some_and(|x| x.label == "NP")))
            .collect();
        assert_eq!(np_parents.len(), 1);
        assert_eq!(np_parents[0].label, "S");
    }

    #[test]
    fn terminals_attach_to_nearest_following_completion() {
        // The stray DET at tick 1 never paired with a NOUN; it still
        // attaches to the next NP completion, which is best-effort by
        // construction.
        let forest = ResultGraphBuilder::build(&[
            fired(1, "NP", "NP::det", "DET", "the"),
            fired(5, "NP", "NP::det", "DET", "a"),
            fired(6, "NP", "NP::noun", "NOUN", "dog"),
            completed(6, "NP"),
        ]);

        assert_eq!(forest.roots().len(), 1);
        let root = forest.node(forest.roots()[0]).expect("root");
        assert_eq!(root.start, Tick::new(1));
        assert_eq!(root.children.len(), 3);
    }

    #[test]
    fn children_ordered_by_start_tick() {
        let forest = ResultGraphBuilder::build(&[
            fired(2, "NP", "NP::noun", "NOUN", "cat"),
            fired(1, "NP", "NP::det", "DET", "the"),
            completed(2, "NP"),
        ]);

        let root = forest.node(forest.roots()[0]).expect("root");
        let starts: Vec<Tick> = root
            .children
            .iter()
            .filter_map(|&c| forest.node(c).map(|n| n.start))
            .collect();
        assert_eq!(starts, vec![Tick::new(1), Tick::new(2)]);
    }

    #[test]
    fn forest_serializes_to_json() {
        let forest = ResultGraphBuilder::build(&[
            fired(1, "NP", "NP::det", "DET", "the"),
            fired(2, "NP", "NP::noun", "NOUN", "cat"),
            completed(2, "NP"),
        ]);

        let json = serde_json::to_string(&forest).expect("serialize");
        let back: ParseForest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.node_count(), forest.node_count());
        assert_eq!(back.roots(), forest.roots());
    }
}
