//! # Core Type Definitions
//!
//! This module contains all core types for the Seqra activation engine:
//! - Graph identifiers (`PatternName`, `NodeId`, `Tick`)
//! - Graph structure (`Node`, `NodeKind`, `Edge`, `PatternRef`)
//! - Stream input (`Token`)
//! - Engine output (`ActivationResult`, `ParseEvent`)
//! - Error types (`SeqraError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Use saturating arithmetic for counters to prevent overflow

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// The name of a construction (a compiled grammar pattern).
///
/// Pattern names double as synthetic token types: when a pattern completes,
/// its name is re-injected as an input so that construction references can
/// fire on it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatternName(pub String);

impl PatternName {
    /// Create a new pattern name from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the pattern name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PatternName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a node within a sequence graph.
///
/// Single-pattern graphs use the raw ids produced by the pattern compiler.
/// The unified graph namespaces every id (`<pattern>::<local>`) and allocates
/// one completion id (`PATTERN:<name>`) per pattern, so ids stay unique after
/// merging.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a new node id from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Create a namespaced id for a node owned by a pattern.
    #[must_use]
    pub fn scoped(pattern: &PatternName, local: &str) -> Self {
        Self(format!("{}::{}", pattern.as_str(), local))
    }

    /// Create the completion-node id for a pattern.
    #[must_use]
    pub fn completion(pattern: &PatternName) -> Self {
        Self(format!("PATTERN:{}", pattern.as_str()))
    }

    /// Get the node id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Logical clock value.
///
/// The clock is incremented exactly once per input token; everything that
/// happens while processing that token (firings, completions, synthetic
/// inputs) shares the same tick. Uses saturating arithmetic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Tick(pub u64);

impl Tick {
    /// Create a new tick with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The tick following this one, saturating at `u64::MAX`.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Get the raw tick value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

// =============================================================================
// GRAPH STRUCTURE
// =============================================================================

/// The kind of a node in a sequence graph.
///
/// Routing kinds (everything except `Element`) fire immediately upon
/// activation and propagate without consuming input. `Element` nodes become
/// passive listeners once activated and wait for a matching token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    /// Entry point of a graph. Exactly one per single-pattern graph.
    Start,
    /// Exit point of a single-pattern graph. Exactly one per graph.
    End,
    /// Completion node of a pattern inside the unified graph. Firing it
    /// means the pattern completed at the current tick.
    Pattern,
    /// Structural routing node with no input requirement.
    Intermediate,
    /// Expected input: a token category, optionally with an exact value,
    /// or a reference to another pattern's completion.
    Element,
}

impl NodeKind {
    /// Routing nodes fire immediately on activation; elements wait for input.
    #[must_use]
    pub const fn is_routing(self) -> bool {
        !matches!(self, Self::Element)
    }
}

/// Structured reference from an element node to another pattern.
///
/// Produced at graph-build time, replacing the raw format's `Name:role`
/// id-suffix convention, so nothing downstream parses strings for roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRef {
    /// The referenced pattern's name.
    pub pattern: PatternName,
    /// The grammatical role the referenced pattern plays in its parent.
    pub role: Option<String>,
}

/// A node in a sequence graph.
///
/// Nodes are immutable once built. Activation state (active flag, firing
/// history) lives in the engine, never on the node, so graphs can be shared
/// without mutable aliasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// The node identifier, unique within its graph.
    pub id: NodeId,
    /// The node kind.
    pub kind: NodeKind,
    /// The owning pattern. `None` only for the unified graph's global start.
    pub pattern: Option<PatternName>,
    /// Expected token category, or referenced pattern name. Element only.
    pub element_type: Option<String>,
    /// Optional exact-match value filter. Element only.
    pub element_value: Option<String>,
    /// Structured construction reference. Element only, and only for
    /// elements that listen for another pattern's completion.
    pub reference: Option<PatternRef>,
}

impl Node {
    /// Create a routing node (Start/End/Pattern/Intermediate).
    #[must_use]
    pub fn routing(id: NodeId, kind: NodeKind, pattern: Option<PatternName>) -> Self {
        Self {
            id,
            kind,
            pattern,
            element_type: None,
            element_value: None,
            reference: None,
        }
    }

    /// Create an element node expecting a token category.
    #[must_use]
    pub fn element(
        id: NodeId,
        pattern: PatternName,
        element_type: impl Into<String>,
        element_value: Option<String>,
    ) -> Self {
        Self {
            id,
            kind: NodeKind::Element,
            pattern: Some(pattern),
            element_type: Some(element_type.into()),
            element_value,
            reference: None,
        }
    }

    /// Create an element node referencing another pattern's completion.
    #[must_use]
    pub fn construction_ref(
        id: NodeId,
        pattern: PatternName,
        referenced: PatternName,
        role: Option<String>,
    ) -> Self {
        Self {
            id,
            kind: NodeKind::Element,
            pattern: Some(pattern),
            element_type: Some(referenced.as_str().to_string()),
            element_value: None,
            reference: Some(PatternRef {
                pattern: referenced,
                role,
            }),
        }
    }

    /// Whether this element's filter accepts the given value.
    ///
    /// A `None` filter is a wildcard. Non-element nodes accept nothing.
    #[must_use]
    pub fn accepts(&self, value: &str) -> bool {
        if self.kind != NodeKind::Element {
            return false;
        }
        match &self.element_value {
            None => true,
            Some(filter) => filter == value,
        }
    }
}

/// A directed edge between two nodes.
///
/// `bypass` marks a path usable without the optional element normally
/// required, modeling optional grammar slots. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node id.
    pub from: NodeId,
    /// Target node id.
    pub to: NodeId,
    /// Whether this edge skips an optional element.
    pub bypass: bool,
}

impl Edge {
    /// Create a new edge.
    #[must_use]
    pub fn new(from: NodeId, to: NodeId, bypass: bool) -> Self {
        Self { from, to, bypass }
    }
}

// =============================================================================
// STREAM INPUT
// =============================================================================

/// One unit of engine input: a typed, valued token.
///
/// Tokens are produced upstream (tokenizer/tagger); the engine only sees
/// `(element_type, value)` pairs in stream order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The token category (e.g. a part-of-speech tag).
    #[serde(rename = "type")]
    pub element_type: String,
    /// The token's surface value.
    pub value: String,
}

impl Token {
    /// Create a new token.
    #[must_use]
    pub fn new(element_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            element_type: element_type.into(),
            value: value.into(),
        }
    }
}

// =============================================================================
// ENGINE OUTPUT
// =============================================================================

/// Per-token output of an activation engine.
///
/// A fresh value is produced for every processed token; it never borrows
/// engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ActivationResult {
    /// Every node that fired at this tick, as (owning pattern, node) pairs,
    /// in firing order.
    pub fired: Vec<(PatternName, NodeId)>,
    /// Patterns that completed at this tick, deduplicated, in completion
    /// order.
    pub completed: Vec<PatternName>,
    /// Element nodes listening after this tick, in deterministic order.
    pub active: Vec<(PatternName, NodeId)>,
}

impl ActivationResult {
    /// Create a new empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completion, keeping the completed list deduplicated.
    pub fn record_completion(&mut self, pattern: PatternName) {
        if !self.completed.contains(&pattern) {
            self.completed.push(pattern);
        }
    }
}

/// One entry in the append-only parse-event log.
///
/// The event log is the sole input to parse-forest reconstruction; it must
/// carry everything the result builder needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseEvent {
    /// An element node fired on a stream token.
    ElementFired {
        /// Tick at which the element fired.
        time: Tick,
        /// The pattern that owns the element.
        pattern: PatternName,
        /// The element node id.
        node: NodeId,
        /// The matched token category.
        element_type: String,
        /// The matched token value.
        value: String,
    },
    /// A pattern's completion node fired.
    PatternCompleted {
        /// Tick at which the pattern completed.
        time: Tick,
        /// The completed pattern.
        pattern: PatternName,
    },
    /// A construction-reference element fired on another pattern's
    /// completion, within the same tick.
    ConstructionRefFired {
        /// Tick at which the reference fired.
        time: Tick,
        /// The referencing (parent) pattern.
        pattern: PatternName,
        /// The referencing element node id.
        node: NodeId,
        /// The completed (child) pattern.
        child: PatternName,
        /// The child's grammatical role within the parent, if declared.
        role: Option<String>,
    },
}

impl ParseEvent {
    /// The tick at which this event occurred.
    #[must_use]
    pub fn time(&self) -> Tick {
        match self {
            Self::ElementFired { time, .. }
            | Self::PatternCompleted { time, .. }
            | Self::ConstructionRefFired { time, .. } => *time,
        }
    }

    /// The pattern this event belongs to.
    #[must_use]
    pub fn pattern(&self) -> &PatternName {
        match self {
            Self::ElementFired { pattern, .. }
            | Self::PatternCompleted { pattern, .. }
            | Self::ConstructionRefFired { pattern, .. } => pattern,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Seqra engine.
///
/// - No silent failures on malformed pattern graphs
/// - Unmatched tokens and value-filter misses are NOT errors
/// - The core never panics; all errors are recoverable
#[derive(Debug, Error)]
pub enum SeqraError {
    /// A compiled pattern graph has no START node.
    #[error("construction '{0}' has no START node")]
    MissingStart(String),

    /// A compiled pattern graph has no END node.
    #[error("construction '{0}' has no END node")]
    MissingEnd(String),

    /// An edge references a node id absent from the node map.
    #[error("construction '{pattern}' has a dangling edge: {from} -> {to}")]
    DanglingEdge {
        /// The construction containing the edge.
        pattern: String,
        /// The edge source id.
        from: String,
        /// The edge target id.
        to: String,
    },

    /// A compiled pattern graph is structurally invalid.
    #[error("invalid construction '{0}': {1}")]
    InvalidPattern(String, String),

    /// A construction reference names a pattern absent from the set.
    #[error("construction reference to unknown pattern '{0}'")]
    UnknownConstruction(String),

    /// Same-tick propagation exceeded its budget; the pattern set contains
    /// a self-referential (cyclic) construction.
    #[error("cyclic construction detected: {0}")]
    CyclicConstruction(String),

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_saturating_next() {
        let tick = Tick::new(u64::MAX);
        assert_eq!(tick.next().value(), u64::MAX);
    }

    #[test]
    fn tick_normal_next() {
        assert_eq!(Tick::new(0).next(), Tick::new(1));
    }

    #[test]
    fn scoped_and_completion_ids() {
        let np = PatternName::new("NP");
        assert_eq!(NodeId::scoped(&np, "n1").as_str(), "NP::n1");
        assert_eq!(NodeId::completion(&np).as_str(), "PATTERN:NP");
    }

    #[test]
    fn routing_kinds() {
        assert!(NodeKind::Start.is_routing());
        assert!(NodeKind::End.is_routing());
        assert!(NodeKind::Pattern.is_routing());
        assert!(NodeKind::Intermediate.is_routing());
        assert!(!NodeKind::Element.is_routing());
    }

    #[test]
    fn element_wildcard_accepts_any_value() {
        let node = Node::element(NodeId::new("n1"), PatternName::new("P"), "WORD", None);
        assert!(node.accepts("hello"));
        assert!(node.accepts("dog"));
    }

    #[test]
    fn element_filter_exact_match_only() {
        let node = Node::element(
            NodeId::new("n1"),
            PatternName::new("P"),
            "WORD",
            Some("cat".to_string()),
        );
        assert!(node.accepts("cat"));
        assert!(!node.accepts("dog"));
    }

    #[test]
    fn routing_node_accepts_nothing() {
        let node = Node::routing(NodeId::new("s"), NodeKind::Start, None);
        assert!(!node.accepts("anything"));
    }

    #[test]
    fn construction_ref_carries_structured_role() {
        let node = Node::construction_ref(
            NodeId::new("NP:subject"),
            PatternName::new("S"),
            PatternName::new("NP"),
            Some("subject".to_string()),
        );
        assert_eq!(node.element_type.as_deref(), Some("NP"));
        let reference = node.reference.expect("reference");
        assert_eq!(reference.pattern.as_str(), "NP");
        assert_eq!(reference.role.as_deref(), Some("subject"));
    }

    #[test]
    fn activation_result_deduplicates_completions() {
        let mut result = ActivationResult::new();
        result.record_completion(PatternName::new("NP"));
        result.record_completion(PatternName::new("NP"));
        assert_eq!(result.completed.len(), 1);
    }

    #[test]
    fn token_deserializes_compiler_shape() {
        let token: Token = serde_json::from_str(r#"{"type":"WORD","value":"hello"}"#)
            .expect("token json");
        assert_eq!(token, Token::new("WORD", "hello"));
    }
}
