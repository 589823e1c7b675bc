//! # seqra-core
//!
//! The deterministic Sequence-Graph Activation Engine - THE LOGIC.
//!
//! This crate turns compiled grammar patterns into executable sequence
//! graphs, matches typed token streams against them incrementally, detects
//! pattern completions (including recursive composition of patterns out of
//! patterns), and reconstructs a parse forest from the resulting event log.
//!
//! ## Pipeline
//!
//! - `loader` → raw compiled-pattern records from storage
//! - `graph` / `unified` → executable sequence graphs
//! - `engine` / `unified_engine` → incremental activation over token streams
//! - `result` → parse-forest reconstruction from the event log
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Owns all activation state; graphs themselves are immutable once built
//! - Is deterministic: identical pattern sets and token streams yield
//!   identical results, byte for byte
//! - Has NO async, NO network dependencies (pure Rust)
//! - Bounds every loop by an innate primitive; cyclic constructions become
//!   errors, never hangs

// =============================================================================
// MODULES
// =============================================================================

pub mod engine;
pub mod graph;
pub mod loader;
pub mod primitives;
pub mod result;
pub mod types;
pub mod unified;
pub mod unified_engine;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    ActivationResult, Edge, Node, NodeId, NodeKind, ParseEvent, PatternName, PatternRef,
    SeqraError, Tick, Token,
};

// =============================================================================
// RE-EXPORTS: Loading and Graph Construction
// =============================================================================

pub use loader::{
    DirectoryLoader, MemoryLoader, PatternGraphLoader, RawEdge, RawNode, RawPatternGraph,
};

pub use graph::{SequenceGraph, SequenceGraphBuilder};
pub use unified::{UnifiedSequenceGraph, UnifiedSequenceGraphBuilder};

// =============================================================================
// RE-EXPORTS: Activation Engines
// =============================================================================

pub use engine::ActivationEngine;
pub use unified_engine::UnifiedActivationEngine;

// =============================================================================
// RE-EXPORTS: Result Graphs
// =============================================================================

pub use result::{ParseForest, ParseTreeNode, ResultGraphBuilder};
