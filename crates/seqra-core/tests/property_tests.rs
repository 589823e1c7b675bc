//! # Property-Based Tests
//!
//! Verification tests using proptest.
//!
//! These tests ensure determinism and correctness invariants of the
//! activation engines and the result builder.

use proptest::collection::vec;
use proptest::prelude::*;
use seqra_core::{
    ActivationEngine, ParseEvent, PatternName, RawPatternGraph, ResultGraphBuilder,
    SequenceGraph, SequenceGraphBuilder, Tick, UnifiedActivationEngine,
    UnifiedSequenceGraphBuilder,
};
use std::collections::BTreeSet;

// =============================================================================
// FIXTURES
// =============================================================================

fn build_graph(name: &str, json: &str) -> SequenceGraph {
    let raw: RawPatternGraph = serde_json::from_str(json).expect("raw");
    SequenceGraphBuilder::build(&PatternName::new(name), &raw).expect("build")
}

/// NP = DET NOUN
fn np() -> SequenceGraph {
    build_graph(
        "NP",
        r#"{
            "nodes": {
                "start": {"type": "START"},
                "det": {"type": "SLOT", "pos": "DET"},
                "noun": {"type": "SLOT", "pos": "NOUN"},
                "end": {"type": "END"}
            },
            "edges": [
                {"from": "start", "to": "det"},
                {"from": "det", "to": "noun"},
                {"from": "noun", "to": "end"}
            ]
        }"#,
    )
}

/// S = NP:subject VERB
fn s() -> SequenceGraph {
    build_graph(
        "S",
        r#"{
            "nodes": {
                "start": {"type": "START"},
                "NP:subject": {"type": "CONSTRUCTION_REF", "construction_name": "NP"},
                "verb": {"type": "SLOT", "pos": "VERB"},
                "end": {"type": "END"}
            },
            "edges": [
                {"from": "start", "to": "NP:subject"},
                {"from": "NP:subject", "to": "verb"},
                {"from": "verb", "to": "end"}
            ]
        }"#,
    )
}

/// Arbitrary tokens over the grammar's vocabulary plus noise.
fn token_strategy() -> impl Strategy<Value = (String, String)> {
    let types = prop::sample::select(vec!["DET", "NOUN", "VERB", "ADJ", "PUNCT"]);
    let values = prop::sample::select(vec!["the", "a", "cat", "dog", "runs", "sleeps", "?"]);
    (types, values).prop_map(|(t, v)| (t.to_string(), v.to_string()))
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Same pattern set and token stream produce identical results.
    #[test]
    fn determinism_identical_input_produces_identical_output(
        tokens in vec(token_strategy(), 0..40)
    ) {
        let mut engine1 = ActivationEngine::with_graphs(vec![np(), s()]).expect("engine");
        let mut engine2 = ActivationEngine::with_graphs(vec![np(), s()]).expect("engine");

        for (ty, value) in &tokens {
            let r1 = engine1.process_input(ty, value).expect("process");
            let r2 = engine2.process_input(ty, value).expect("process");
            prop_assert_eq!(r1.fired, r2.fired);
            prop_assert_eq!(r1.completed, r2.completed);
            prop_assert_eq!(r1.active, r2.active);
        }
    }

    /// Acyclic pattern sets never error, whatever the stream.
    #[test]
    fn arbitrary_streams_never_error(tokens in vec(token_strategy(), 0..60)) {
        let mut engine = ActivationEngine::with_graphs(vec![np(), s()]).expect("engine");

        for (ty, value) in &tokens {
            prop_assert!(engine.process_input(ty, value).is_ok());
        }
    }

    /// The clock counts exactly one tick per external token.
    #[test]
    fn clock_counts_external_tokens(tokens in vec(token_strategy(), 0..40)) {
        let mut engine = ActivationEngine::with_graphs(vec![np(), s()]).expect("engine");

        for (ty, value) in &tokens {
            engine.process_input(ty, value).expect("process");
        }
        prop_assert_eq!(engine.clock(), Tick::new(tokens.len() as u64));
    }

    /// Both engines agree on which patterns complete at each tick.
    #[test]
    fn engines_agree_on_completions(tokens in vec(token_strategy(), 0..40)) {
        let mut multi = ActivationEngine::with_graphs(vec![np(), s()]).expect("multi");
        let unified_graph = UnifiedSequenceGraphBuilder::build(&[np(), s()]).expect("unified");
        let mut unified = UnifiedActivationEngine::new(unified_graph).expect("engine");

        for (ty, value) in &tokens {
            let m = multi.process_input(ty, value).expect("multi");
            let u = unified.process_input(ty, value).expect("unified");

            let m_completed: BTreeSet<_> = m.completed.into_iter().collect();
            let u_completed: BTreeSet<_> = u.completed.into_iter().collect();
            prop_assert_eq!(m_completed, u_completed);
        }
    }

    /// N full matches produce exactly N completions.
    #[test]
    fn repeated_matches_all_complete(n in 1usize..20) {
        let mut engine = ActivationEngine::with_graphs(vec![np()]).expect("engine");

        let mut completions = 0usize;
        for _ in 0..n {
            engine.process_input("DET", "the").expect("det");
            let result = engine.process_input("NOUN", "cat").expect("noun");
            completions += result.completed.len();
        }
        prop_assert_eq!(completions, n);
    }

    /// Result building is total and bounded by the log it reads.
    #[test]
    fn forest_is_total_and_bounded(tokens in vec(token_strategy(), 0..60)) {
        let unified_graph = UnifiedSequenceGraphBuilder::build(&[np(), s()]).expect("unified");
        let mut engine = UnifiedActivationEngine::new(unified_graph).expect("engine");

        for (ty, value) in &tokens {
            engine.process_input(ty, value).expect("process");
        }

        let forest = ResultGraphBuilder::build(engine.events());
        prop_assert!(forest.node_count() <= engine.events().len());

        // Every root is a completion with in-range children.
        for &root in forest.roots() {
            let node = forest.node(root).expect("root in arena");
            prop_assert!(!node.terminal);
            for &child in &node.children {
                prop_assert!(forest.node(child).is_some());
                prop_assert!(forest.node(child).expect("child").start >= node.start);
            }
        }
    }

    /// Replaying a log prefix yields a forest no larger than the full log's.
    #[test]
    fn forest_grows_monotonically(tokens in vec(token_strategy(), 1..40)) {
        let unified_graph = UnifiedSequenceGraphBuilder::build(&[np(), s()]).expect("unified");
        let mut engine = UnifiedActivationEngine::new(unified_graph).expect("engine");

        for (ty, value) in &tokens {
            engine.process_input(ty, value).expect("process");
        }

        let events: Vec<ParseEvent> = engine.events().to_vec();
        let full = ResultGraphBuilder::build(&events);
        for cut in 0..events.len() {
            let partial = ResultGraphBuilder::build(&events[..cut]);
            prop_assert!(partial.node_count() <= full.node_count());
        }
    }
}
