//! # Unified Activation Engine
//!
//! The runtime for one `UnifiedSequenceGraph`, plus the append-only parse
//! event log that result-graph construction replays later.
//!
//! Unlike the multi-graph engine, recursive composition here needs no
//! synthetic tokens: cross-pattern edges are static graph structure, so a
//! completion node firing propagates directly into every element waiting
//! for that pattern. The special rule at that boundary: a completion only
//! feeds listeners that are ALREADY active. An inactive reference element is
//! left untouched, because its own pattern has not progressed far enough to
//! expect a child there.
//!
//! Every element firing, completion, and reference firing is appended to the
//! event log in occurrence order.

use crate::primitives::MAX_PROPAGATION_STEPS;
use crate::types::{
    ActivationResult, NodeId, NodeKind, ParseEvent, PatternName, SeqraError, Tick,
};
use crate::unified::UnifiedSequenceGraph;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// =============================================================================
// NODE STATE
// =============================================================================

/// Volatile per-node activation state.
#[derive(Debug, Clone, Default)]
struct NodeState {
    active: bool,
    history: Vec<Tick>,
}

/// One pending propagation hop.
///
/// `completed` is set when the hop leaves a completion node, because the
/// target element must then fire on the completion (if active) instead of
/// merely activating.
#[derive(Debug)]
struct Hop {
    target: NodeId,
    completed: Option<PatternName>,
}

// =============================================================================
// UNIFIED ACTIVATION ENGINE
// =============================================================================

/// Incremental matcher over one unified graph, with an event log.
#[derive(Debug)]
pub struct UnifiedActivationEngine {
    graph: UnifiedSequenceGraph,
    states: BTreeMap<NodeId, NodeState>,
    /// Element type -> active listener node ids.
    index: BTreeMap<String, BTreeSet<NodeId>>,
    clock: Tick,
    /// Append-only log of everything that fired, in occurrence order.
    events: Vec<ParseEvent>,
}

impl UnifiedActivationEngine {
    /// Create an engine over the given graph and initialize it.
    pub fn new(graph: UnifiedSequenceGraph) -> Result<Self, SeqraError> {
        let mut engine = Self {
            graph,
            states: BTreeMap::new(),
            index: BTreeMap::new(),
            clock: Tick::new(0),
            events: Vec::new(),
        };
        engine.initialize()?;
        Ok(engine)
    }

    /// Reset all state and the event log, then propagate from the global
    /// START, leaving every pattern's first elements listening.
    pub fn initialize(&mut self) -> Result<(), SeqraError> {
        self.clock = Tick::new(0);
        self.states.clear();
        self.index.clear();
        self.events.clear();

        let mut result = ActivationResult::new();
        let mut steps = 0usize;
        let mut worklist = VecDeque::new();
        worklist.push_back(Hop {
            target: self.graph.global_start().clone(),
            completed: None,
        });
        self.run(worklist, &mut result, &mut steps)
    }

    /// The underlying unified graph.
    #[must_use]
    pub fn graph(&self) -> &UnifiedSequenceGraph {
        &self.graph
    }

    /// The current logical clock value.
    #[must_use]
    pub fn clock(&self) -> Tick {
        self.clock
    }

    /// The full event log, in occurrence order.
    #[must_use]
    pub fn events(&self) -> &[ParseEvent] {
        &self.events
    }

    /// Process one input token.
    ///
    /// Advances the clock, fires matching listeners, and propagates through
    /// completion nodes into active references, all within this tick. Every
    /// firing is appended to the event log.
    pub fn process_input(
        &mut self,
        element_type: &str,
        value: &str,
    ) -> Result<ActivationResult, SeqraError> {
        self.clock = self.clock.next();

        let mut result = ActivationResult::new();
        let mut steps = 0usize;
        let mut worklist: VecDeque<Hop> = VecDeque::new();

        // Snapshot candidates: firing mutates the index.
        let candidates: Vec<NodeId> = self
            .index
            .get(element_type)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();

        for id in candidates {
            if !self.is_active(&id) {
                continue;
            }
            let Some(node) = self.graph.node(&id) else {
                continue;
            };
            if !node.accepts(value) {
                continue;
            }
            let Some(pattern) = node.pattern.clone() else {
                continue;
            };

            self.fire_element(&id, element_type, &mut steps)?;
            self.events.push(ParseEvent::ElementFired {
                time: self.clock,
                pattern: pattern.clone(),
                node: id.clone(),
                element_type: element_type.to_string(),
                value: value.to_string(),
            });
            result.fired.push((pattern, id.clone()));

            for (to, _) in self.graph.successors(&id) {
                worklist.push_back(Hop {
                    target: to.clone(),
                    completed: None,
                });
            }
        }

        self.run(worklist, &mut result, &mut steps)?;
        result.active = self.active_listeners();
        Ok(result)
    }

    /// Currently-active listeners, ordered by element type, then node id.
    #[must_use]
    pub fn active_listeners(&self) -> Vec<(PatternName, NodeId)> {
        let mut active = Vec::new();
        for set in self.index.values() {
            for id in set {
                let Some(node) = self.graph.node(id) else {
                    continue;
                };
                if let Some(pattern) = &node.pattern {
                    active.push((pattern.clone(), id.clone()));
                }
            }
        }
        active
    }

    // =========================================================================
    // INTERNAL: PROPAGATION
    // =========================================================================

    /// Drain the propagation worklist.
    ///
    /// Routing nodes fire and push their successors; completion nodes fire,
    /// reactivate their pattern's entries, and push completion hops toward
    /// their listeners; elements either activate (plain hop) or fire on a
    /// completion (completion hop, active listeners only).
    fn run(
        &mut self,
        mut worklist: VecDeque<Hop>,
        result: &mut ActivationResult,
        steps: &mut usize,
    ) -> Result<(), SeqraError> {
        while let Some(Hop { target: id, completed }) = worklist.pop_front() {
            let Some(node) = self.graph.node(&id) else {
                continue;
            };
            let kind = node.kind;

            if kind == NodeKind::Pattern {
                let Some(pattern) = node.pattern.clone() else {
                    continue;
                };
                self.fire_routing(&id, steps)?;
                self.events.push(ParseEvent::PatternCompleted {
                    time: self.clock,
                    pattern: pattern.clone(),
                });
                result.record_completion(pattern.clone());
                result.fired.push((pattern.clone(), id.clone()));

                // The pattern can match again from scratch.
                for (entry, _) in self.graph.entries_of(&pattern).to_vec() {
                    worklist.push_back(Hop {
                        target: entry,
                        completed: None,
                    });
                }
                // Feed elements waiting for this pattern's completion.
                for (to, _) in self.graph.successors(&id).to_vec() {
                    worklist.push_back(Hop {
                        target: to,
                        completed: Some(pattern.clone()),
                    });
                }
            } else if kind.is_routing() {
                self.fire_routing(&id, steps)?;
                for (to, _) in self.graph.successors(&id).to_vec() {
                    worklist.push_back(Hop {
                        target: to,
                        completed: None,
                    });
                }
            } else if let Some(child) = completed {
                // A completion reached this reference element. Only an
                // active reference consumes it; an inactive one means the
                // parent pattern is not at this position yet.
                if !self.is_active(&id) {
                    continue;
                }
                let Some(pattern) = node.pattern.clone() else {
                    continue;
                };
                let element_type = node.element_type.clone().unwrap_or_default();
                let role = node.reference.as_ref().and_then(|r| r.role.clone());

                self.fire_element(&id, &element_type, steps)?;
                self.events.push(ParseEvent::ConstructionRefFired {
                    time: self.clock,
                    pattern: pattern.clone(),
                    node: id.clone(),
                    child,
                    role,
                });
                result.fired.push((pattern, id.clone()));

                for (to, _) in self.graph.successors(&id).to_vec() {
                    worklist.push_back(Hop {
                        target: to,
                        completed: None,
                    });
                }
            } else {
                // Plain activation: become a listener.
                let element_type = node.element_type.clone();
                let state = self.states.entry(id.clone()).or_default();
                if !state.active {
                    state.active = true;
                    if let Some(element_type) = element_type {
                        self.index.entry(element_type).or_default().insert(id);
                    }
                }
            }
        }
        Ok(())
    }

    fn is_active(&self, id: &NodeId) -> bool {
        self.states.get(id).is_some_and(|s| s.active)
    }

    /// Fire a routing or completion node: timestamp and deactivate.
    fn fire_routing(&mut self, id: &NodeId, steps: &mut usize) -> Result<(), SeqraError> {
        self.count_step(steps)?;
        let clock = self.clock;
        let state = self.states.entry(id.clone()).or_default();
        state.history.push(clock);
        state.active = false;
        Ok(())
    }

    /// Fire an element node: timestamp, deactivate, unindex.
    fn fire_element(
        &mut self,
        id: &NodeId,
        element_type: &str,
        steps: &mut usize,
    ) -> Result<(), SeqraError> {
        self.count_step(steps)?;
        let clock = self.clock;
        let state = self.states.entry(id.clone()).or_default();
        state.history.push(clock);
        state.active = false;
        if let Some(set) = self.index.get_mut(element_type) {
            set.remove(id);
        }
        Ok(())
    }

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
