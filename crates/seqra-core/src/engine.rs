//! # Activation Engine (multi-graph)
//!
//! The runtime for a set of independent single-pattern graphs.
//!
//! Per-node state machine: INACTIVE -> ACTIVE (listening) -> FIRED
//! (timestamp appended) -> INACTIVE; back to ACTIVE only via explicit
//! reactivation. Routing nodes fire the moment they are activated; element
//! nodes wait for a matching token.
//!
//! Recursive composition across graphs is driven by an explicit worklist of
//! synthetic tokens: when a graph completes, its pattern name is re-injected
//! as a (name, name) token within the same tick, so graphs referencing it by
//! name can fire without an extra external token and without call-stack
//! recursion. A depth budget converts cyclic constructions into errors.
//!
//! All iteration orders are deterministic: graphs by registration order,
//! listeners by (graph index, node id).

use crate::graph::SequenceGraph;
use crate::primitives::{MAX_COMPLETION_DEPTH, MAX_PROPAGATION_STEPS};
use crate::types::{ActivationResult, NodeId, PatternName, SeqraError, Tick};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// =============================================================================
// NODE STATE
// =============================================================================

/// Volatile per-node activation state, private to one engine instance.
///
/// Kept apart from the immutable graph so engine and graph never share
/// mutable structure.
#[derive(Debug, Clone, Default)]
struct NodeState {
    /// Whether the node is currently listening (elements) or pending
    /// (never true for routing nodes, which fire immediately).
    active: bool,
    /// Append-only firing history. Never cleared during a run.
    history: Vec<Tick>,
}

// =============================================================================
// ACTIVATION ENGINE
// =============================================================================

/// Incremental matcher over independently-registered sequence graphs.
#[derive(Debug, Default)]
pub struct ActivationEngine {
    /// Registered graphs, in registration order. This order is the
    /// deterministic fan-out order for token dispatch.
    graphs: Vec<SequenceGraph>,
    /// Per-graph node state, parallel to `graphs`.
    states: Vec<BTreeMap<NodeId, NodeState>>,
    /// Listener index: element type -> active (graph index, node id) pairs.
    /// Maintained incrementally: insert on activation, remove on fire.
    index: BTreeMap<String, BTreeSet<(usize, NodeId)>>,
    /// Logical clock, incremented once per external token.
    clock: Tick,
}

impl ActivationEngine {
    /// Create an engine with no registered graphs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a graph. Call `initialize` after the last registration.
    pub fn register(&mut self, graph: SequenceGraph) {
        self.graphs.push(graph);
        self.states.push(BTreeMap::new());
    }

    /// Create an engine over the given graphs and initialize it.
    pub fn with_graphs(graphs: Vec<SequenceGraph>) -> Result<Self, SeqraError> {
        let mut engine = Self::new();
        for graph in graphs {
            engine.register(graph);
        }
        engine.initialize()?;
        Ok(engine)
    }

    /// Reset all state, then activate and propagate every graph's START.
    ///
    /// Leaves every first element of every pattern listening. Idempotent;
    /// also serves as a full reset between runs.
    pub fn initialize(&mut self) -> Result<(), SeqraError> {
        self.clock = Tick::new(0);
        self.index.clear();
        for state in &mut self.states {
            state.clear();
        }

        let mut fired = Vec::new();
        let mut steps = 0usize;
        for gi in 0..self.graphs.len() {
            let start = self.graphs[gi].start().clone();
            self.activate_and_propagate(gi, start, &mut fired, &mut steps)?;
        }
        Ok(())
    }

    /// The current logical clock value.
    #[must_use]
    pub fn clock(&self) -> Tick {
        self.clock
    }

    /// Firing history of one node, for inspection. Empty if never fired.
    #[must_use]
    pub fn node_history(&self, pattern: &PatternName, id: &NodeId) -> &[Tick] {
        let Some(gi) = self.graphs.iter().position(|g| g.name() == pattern) else {
            return &[];
        };
        self.states[gi]
            .get(id)
            .map_or(&[], |state| state.history.as_slice())
    }

    /// Process one input token.
    ///
    /// Advances the clock by one, fires every still-active listener whose
    /// filter accepts the value, propagates, and re-injects completed
    /// pattern names as synthetic tokens within the same tick. Tokens with
    /// no listener are a silent no-op.
    pub fn process_input(
        &mut self,
        element_type: &str,
        value: &str,
    ) -> Result<ActivationResult, SeqraError> {
        self.clock = self.clock.next();

        let mut result = ActivationResult::new();
        let mut steps = 0usize;
        let mut completed_graphs: BTreeSet<usize> = BTreeSet::new();

        // Worklist of (type, value, depth): the external token plus the
        // synthetic completion tokens it triggers, all at this tick.
        let mut tokens: VecDeque<(String, String, usize)> = VecDeque::new();
        tokens.push_back((element_type.to_string(), value.to_string(), 0));

        while let Some((token_type, token_value, depth)) = tokens.pop_front() {
            if depth > MAX_COMPLETION_DEPTH {
                return Err(SeqraError::CyclicConstruction(format!(
                    "completion chain exceeded depth {MAX_COMPLETION_DEPTH} at tick {}",
                    self.clock.value()
                )));
            }

            // Snapshot candidates: firing mutates the index.
            let candidates: Vec<(usize, NodeId)> = self
                .index
                .get(&token_type)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default();

            for (gi, id) in candidates {
                let still_active = self.states[gi].get(&id).is_some_and(|s| s.active);
                if !still_active {
                    continue;
                }
                let Some(node) = self.graphs[gi].node(&id) else {
                    continue;
                };
                // A value mismatch is not an error; the node keeps
                // listening for a later exact match.
                if !node.accepts(&token_value) {
                    continue;
                }
                self.fire_element(gi, &id, &token_type, &mut result.fired, &mut steps)?;
                self.propagate_successors(gi, &id, &mut result.fired, &mut steps)?;
            }

            // Completion scan, in registration order: any graph whose END
            // fired at this exact tick completed. Reactivate its START so
            // it can match again (history is kept), and re-inject its name
            // as a synthetic token for graphs that reference it.
            for gi in 0..self.graphs.len() {
                if completed_graphs.contains(&gi) {
                    continue;
                }
                let end = self.graphs[gi].end().clone();
                let end_fired_now = self.states[gi]
                    .get(&end)
                    .and_then(|s| s.history.last())
                    .copied()
                    == Some(self.clock);
                if !end_fired_now {
                    continue;
                }

                completed_graphs.insert(gi);
                let name = self.graphs[gi].name().clone();
                result.record_completion(name.clone());

                let start = self.graphs[gi].start().clone();
                self.activate_and_propagate(gi, start, &mut result.fired, &mut steps)?;

                let synthetic = name.as_str().to_string();
                tokens.push_back((synthetic.clone(), synthetic, depth + 1));
            }
        }

        result.active = self.active_listeners();
        Ok(result)
    }

    /// Currently-active listeners, ordered by element type, then
    /// (graph index, node id).
    #[must_use]
    pub fn active_listeners(&self) -> Vec<(PatternName, NodeId)> {
        let mut active = Vec::new();
        for set in self.index.values() {
            for (gi, id) in set {
                active.push((self.graphs[*gi].name().clone(), id.clone()));
            }
        }
        active
    }

    // =========================================================================
    // INTERNAL: FIRING AND PROPAGATION
    // =========================================================================

    /// Fire an element node: timestamp, deactivate, unindex.
    fn fire_element(
        &mut self,
        gi: usize,
        id: &NodeId,
        element_type: &str,
        fired: &mut Vec<(PatternName, NodeId)>,
        steps: &mut usize,
    ) -> Result<(), SeqraError> {
        self.count_step(steps)?;
        let clock = self.clock;
        let state = self.states[gi].entry(id.clone()).or_default();
        state.history.push(clock);
        state.active = false;
        if let Some(set) = self.index.get_mut(element_type) {
            set.remove(&(gi, id.clone()));
        }
        fired.push((self.graphs[gi].name().clone(), id.clone()));
        Ok(())
    }

    /// Propagate from a just-fired node to its successors.
    fn propagate_successors(
        &mut self,
        gi: usize,
        from: &NodeId,
        fired: &mut Vec<(PatternName, NodeId)>,
        steps: &mut usize,
    ) -> Result<(), SeqraError> {
        let seeds: Vec<NodeId> = self.graphs[gi]
            .successors(from)
            .iter()
            .map(|(to, _)| to.clone())
            .collect();
        for seed in seeds {
            self.activate_and_propagate(gi, seed, fired, steps)?;
        }
        Ok(())
    }

    /// Activate one node and propagate iteratively.
    ///
    /// Routing nodes fire immediately (same tick) and push their own
    /// successors; element nodes become passive listeners. No recursion:
    /// an explicit queue plus the per-tick step budget bound the walk.
    fn activate_and_propagate(
        &mut self,
        gi: usize,
        seed: NodeId,
        fired: &mut Vec<(PatternName, NodeId)>,
        steps: &mut usize,
    ) -> Result<(), SeqraError> {
        let mut worklist: VecDeque<NodeId> = VecDeque::new();
        worklist.push_back(seed);

        while let Some(id) = worklist.pop_front() {
            let Some(node) = self.graphs[gi].node(&id) else {
                continue;
            };
            if node.kind.is_routing() {
                self.count_step(steps)?;
                let clock = self.clock;
                let state = self.states[gi].entry(id.clone()).or_default();
                state.history.push(clock);
                state.active = false;
                fired.push((self.graphs[gi].name().clone(), id.clone()));
                for (to, _) in self.graphs[gi].successors(&id) {
                    worklist.push_back(to.clone());
                }
            } else {
                // Element: becomes an active listener, waiting for input.
                let element_type = node.element_type.clone();
                let state = self.states[gi].entry(id.clone()).or_default();
                if !state.active {
                    state.active = true;
                    if let Some(element_type) = element_type {
                        self.index
                            .entry(element_type)
                            .or_default()
                            .insert((gi, id.clone()));
                    }
                }
            }
        }
        Ok(())
    }

    /// Count one firing against the per-tick budget.
    fn count_step(&self, steps: &mut usize) -> Result<(), SeqraError> {
        *steps += 1;
        if *steps > MAX_PROPAGATION_STEPS {
            return Err(SeqraError::CyclicConstruction(format!(
                "propagation exceeded {MAX_PROPAGATION_STEPS} steps at tick {}",
                self.clock.value()
            )));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
