//! # Innate Primitives
//!
//! Hardcoded runtime constants for the Seqra engine.
//!
//! These bounds are compiled into the binary and are immutable at runtime.
//! Every loop in the engine is computationally bounded by one of them.

/// Maximum number of node firings within a single tick.
///
/// Same-tick propagation is cyclic when a construction (transitively)
/// listens for its own completion. The engine counts firings per tick and
/// raises `SeqraError::CyclicConstruction` at this budget instead of
/// looping forever.
pub const MAX_PROPAGATION_STEPS: usize = 10_000;

/// Maximum depth of synthetic-token re-injection within a single tick.
///
/// The multi-graph engine re-injects each completed pattern's name as a
/// synthetic token. A chain of completions deeper than this is treated as
/// a cyclic construction.
pub const MAX_COMPLETION_DEPTH: usize = 64;

/// Maximum number of patterns in one unified graph.
///
/// The unified build wires every completion node to every listener for its
/// name; this bound keeps the build quadratic-in-the-small.
pub const MAX_PATTERNS: usize = 10_000;

/// Maximum length for pattern names and node ids.
///
/// Longer identifiers are rejected by the loader. This prevents memory
/// exhaustion from malformed compiler output.
pub const MAX_IDENTIFIER_LENGTH: usize = 256;

/// Maximum length for token and filter values.
pub const MAX_VALUE_LENGTH: usize = 65536;

/// Maximum file size for a compiled pattern file (16 MB).
///
/// Validated before reading; a single construction never legitimately
/// approaches this.
pub const MAX_PATTERN_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Maximum tree depth rendered by text output.
///
/// Rendering must survive cyclic or degenerate structures; depth capping is
/// half of that guarantee.
pub const MAX_RENDER_DEPTH: usize = 64;

/// Maximum number of lines emitted by text output.
pub const MAX_RENDER_LINES: usize = 10_000;
