//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::render;
use seqra_core::{
    ActivationEngine, DirectoryLoader, PatternGraphLoader, PatternName, ResultGraphBuilder,
    SeqraError, SequenceGraph, SequenceGraphBuilder, Token, UnifiedActivationEngine,
    UnifiedSequenceGraphBuilder,
};
use std::io::Read;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for token input (100 MB).
///
/// This prevents memory exhaustion from malicious or accidental large files.
const MAX_TOKEN_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), SeqraError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| SeqraError::IoError(format!("Cannot read file metadata: {e}")))?;

    if metadata.len() > max_size {
        return Err(SeqraError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an input file path.
///
/// Canonicalizes the path (resolving symlinks and "..") and ensures it is a
/// regular file, so "../../../etc/passwd"-style arguments fail here rather
/// than deeper in the stack.
fn validate_file_path(path: &Path) -> Result<PathBuf, SeqraError> {
    let canonical = path.canonicalize().map_err(|e| {
        SeqraError::IoError(format!("Invalid file path '{}': {e}", path.display()))
    })?;

    if !canonical.is_file() {
        return Err(SeqraError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

// =============================================================================
// PATTERN SET LOADING
// =============================================================================

/// Load and build every pattern in the directory, in name order.
fn load_pattern_set(dir: &Path) -> Result<Vec<SequenceGraph>, SeqraError> {
    let loader = DirectoryLoader::new(dir)?;
    let names = loader.list()?;

    let mut graphs = Vec::with_capacity(names.len());
    for name in &names {
        let raw = loader.load(name)?;
        graphs.push(SequenceGraphBuilder::build(&PatternName::new(name), &raw)?);
    }
    tracing::debug!(count = graphs.len(), dir = %dir.display(), "pattern set loaded");
    Ok(graphs)
}

// =============================================================================
// PATTERNS COMMAND
// =============================================================================

/// List compiled patterns.
///
/// A pattern that fails to load or build is reported in place; the listing
/// continues, so one broken file never hides the rest of the set.
pub fn cmd_patterns(dir: &Path, json_mode: bool) -> Result<(), SeqraError> {
    let loader = DirectoryLoader::new(dir)?;
    let names = loader.list()?;

    let mut entries = Vec::with_capacity(names.len());
    for name in &names {
        let built = loader
            .load(name)
            .and_then(|raw| SequenceGraphBuilder::build(&PatternName::new(name), &raw));
        entries.push((name.clone(), built));
    }

    if json_mode {
        let output: Vec<_> = entries
            .iter()
            .map(|(name, built)| match built {
                Ok(g) => serde_json::json!({
                    "name": name,
                    "nodes": g.node_count(),
                    "edges": g.edge_count(),
                }),
                Err(e) => serde_json::json!({
                    "name": name,
                    "error": e.to_string(),
                }),
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Seqra Pattern Set");
    println!("=================");
    println!("Directory: {}", dir.display());
    println!();
    if entries.is_empty() {
        println!("(no compiled patterns)");
        return Ok(());
    }
    for (name, built) in &entries {
        match built {
            Ok(g) => println!(
                "{:<24} {:>4} nodes {:>4} edges",
                name,
                g.node_count(),
                g.edge_count()
            ),
            Err(e) => println!("{name:<24} ERROR: {e}"),
        }
    }

    Ok(())
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Inspect one built graph, or the unified graph over the whole set.
pub fn cmd_inspect(
    dir: &Path,
    json_mode: bool,
    name: Option<&str>,
    unified: bool,
) -> Result<(), SeqraError> {
    if unified {
        return inspect_unified(dir, json_mode);
    }
    let Some(name) = name else {
        return Err(SeqraError::InvalidPattern(
            "<args>".to_string(),
            "inspect requires --name or --unified".to_string(),
        ));
    };

    let loader = DirectoryLoader::new(dir)?;
    let raw = loader.load(name)?;
    let graph = SequenceGraphBuilder::build(&PatternName::new(name), &raw)?;

    if json_mode {
        let nodes: Vec<_> = graph.nodes().collect();
        let output = serde_json::json!({
            "name": graph.name().as_str(),
            "start": graph.start().as_str(),
            "end": graph.end().as_str(),
            "nodes": nodes,
            "edges": graph.edges(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Pattern: {}", graph.name().as_str());
    println!("========={}", "=".repeat(graph.name().as_str().len()));
    println!();
    println!("Nodes:");
    for node in graph.nodes() {
        let detail = match (&node.element_type, &node.element_value) {
            (Some(ty), Some(value)) => format!(" {ty} = \"{value}\""),
            (Some(ty), None) => format!(" {ty}"),
            _ => String::new(),
        };
        println!("  {:<20} {:?}{}", node.id.as_str(), node.kind, detail);
    }
    println!();
    println!("Edges:");
    for edge in graph.edges() {
        let marker = if edge.bypass { " (bypass)" } else { "" };
        println!("  {} -> {}{}", edge.from.as_str(), edge.to.as_str(), marker);
    }

    Ok(())
}

/// Inspect the unified graph over the whole pattern set.
fn inspect_unified(dir: &Path, json_mode: bool) -> Result<(), SeqraError> {
    let graphs = load_pattern_set(dir)?;
    let unified = UnifiedSequenceGraphBuilder::build(&graphs)?;

    if json_mode {
        let patterns: Vec<_> = unified
            .pattern_names()
            .map(|name| {
                serde_json::json!({
                    "name": name.as_str(),
                    "entries": unified.entries_of(name).len(),
                    "listeners": unified.listeners_of(name).len(),
                })
            })
            .collect();
        let output = serde_json::json!({
            "patterns": unified.pattern_count(),
            "nodes": unified.node_count(),
            "edges": unified.edge_count(),
            "per_pattern": patterns,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Unified Sequence Graph");
    println!("======================");
    println!("Patterns: {}", unified.pattern_count());
    println!("Nodes:    {}", unified.node_count());
    println!("Edges:    {}", unified.edge_count());
    println!();
    for name in unified.pattern_names() {
        println!(
            "{:<24} {:>2} entries {:>2} listeners",
            name.as_str(),
            unified.entries_of(name).len(),
            unified.listeners_of(name).len()
        );
    }

    Ok(())
}

// =============================================================================
// PARSE COMMAND
// =============================================================================

/// Parse a token stream against the pattern set and print the forest.
///
/// The unified engine is the default; `--engine multi` runs the stream
/// through the multi-graph engine instead, which yields per-token results
/// but keeps no event log (and therefore no forest).
pub fn cmd_parse(
    dir: &Path,
    json_mode: bool,
    file: Option<&Path>,
    format: &str,
    engine_kind: &str,
    show_events: bool,
) -> Result<(), SeqraError> {
    let graphs = load_pattern_set(dir)?;
    let text = read_input(file)?;
    let tokens = parse_tokens(&text, format)?;

    match engine_kind {
        "unified" => parse_unified(graphs, &tokens, json_mode, show_events),
        "multi" => parse_multi(graphs, &tokens, json_mode),
        other => Err(SeqraError::InvalidPattern(
            "<args>".to_string(),
            format!("unknown engine '{other}' (expected unified or multi)"),
        )),
    }
}

/// Unified-engine parse: event log and reconstructed forest.
fn parse_unified(
    graphs: Vec<SequenceGraph>,
    tokens: &[Token],
    json_mode: bool,
    show_events: bool,
) -> Result<(), SeqraError> {
    let unified = UnifiedSequenceGraphBuilder::build(&graphs)?;
    let mut engine = UnifiedActivationEngine::new(unified)?;

    for token in tokens {
        engine.process_input(&token.element_type, &token.value)?;
    }
    let forest = ResultGraphBuilder::build(engine.events());

    if json_mode {
        let mut output = serde_json::json!({
            "tokens": tokens.len(),
            "forest": forest,
        });
        if show_events {
            output["events"] = serde_json::to_value(engine.events())
                .map_err(|e| SeqraError::SerializationError(e.to_string()))?;
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Tokens processed: {}", tokens.len());
    println!();
    if show_events {
        println!("Events:");
        print!("{}", render::render_events(engine.events()));
        println!();
    }
    println!("Parse forest:");
    print!("{}", render::render_forest(&forest));

    Ok(())
}

/// Multi-graph-engine parse: per-token completions, no forest.
fn parse_multi(
    graphs: Vec<SequenceGraph>,
    tokens: &[Token],
    json_mode: bool,
) -> Result<(), SeqraError> {
    let mut engine = ActivationEngine::with_graphs(graphs)?;

    let mut ticks = Vec::with_capacity(tokens.len());
    for token in tokens {
        let result = engine.process_input(&token.element_type, &token.value)?;
        ticks.push((engine.clock(), token.clone(), result));
    }

    if json_mode {
        let output: Vec<_> = ticks
            .iter()
            .map(|(tick, token, result)| {
                serde_json::json!({
                    "tick": tick.value(),
                    "token": token,
                    "fired": result.fired.len(),
                    "completed": result.completed,
                    "active": result.active.len(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Tokens processed: {}", ticks.len());
    println!();
    for (tick, token, result) in &ticks {
        let completed = if result.completed.is_empty() {
            "-".to_string()
        } else {
            result
                .completed
                .iter()
                .map(seqra_core::PatternName::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "@{} {} \"{}\"  fired {:>2}  active {:>2}  completed: {}",
            tick.value(),
            token.element_type,
            token.value,
            result.fired.len(),
            result.active.len(),
            completed
        );
    }

    Ok(())
}

/// Read token input from a file or stdin.
fn read_input(file: Option<&Path>) -> Result<String, SeqraError> {
    match file {
        Some(path) => {
            let path = validate_file_path(path)?;
            validate_file_size(&path, MAX_TOKEN_FILE_SIZE)?;
            std::fs::read_to_string(&path).map_err(|e| {
                SeqraError::IoError(format!("cannot read '{}': {e}", path.display()))
            })
        }
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| SeqraError::IoError(format!("cannot read stdin: {e}")))?;
            Ok(text)
        }
    }
}

/// Parse token input.
///
/// `json` is an array of `{"type": ..., "value": ...}` objects; `text` is
/// one `TYPE value` pair per line, blank lines skipped.
fn parse_tokens(text: &str, format: &str) -> Result<Vec<Token>, SeqraError> {
    match format {
        "json" => serde_json::from_str(text)
            .map_err(|e| SeqraError::SerializationError(format!("malformed token JSON: {e}"))),
        "text" => {
            let mut tokens = Vec::new();
            for (number, line) in text.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let Some((ty, value)) = line.split_once(char::is_whitespace) else {
                    return Err(SeqraError::SerializationError(format!(
                        "line {}: expected 'TYPE value'",
                        number + 1
                    )));
                };
                tokens.push(Token::new(ty, value.trim_start()));
            }
            Ok(tokens)
        }
        other => Err(SeqraError::SerializationError(format!(
            "unknown token format '{other}' (expected json or text)"
        ))),
    }
}

// =============================================================================
// TESTS
// =============================================================================
