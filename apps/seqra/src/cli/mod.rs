//! # Seqra CLI Module
//!
//! This module implements the CLI interface for Seqra.
//!
//! ## Available Commands
//!
//! - `patterns` - List compiled patterns in the pattern directory
//! - `inspect` - Show one built graph, or the unified graph
//! - `parse` - Run a token stream through the engine and print the forest

mod commands;

use clap::{Parser, Subcommand};
use seqra_core::SeqraError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Seqra - Sequence-Graph Activation Engine
///
/// Matches typed token streams against compiled grammar patterns,
/// incrementally, and reconstructs the parse forest.
#[derive(Parser, Debug)]
#[command(name = "seqra")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the compiled-pattern directory (overrides config)
    #[arg(short = 'P', long, global = true)]
    pub patterns: Option<PathBuf>,

    /// Path to the configuration file
    #[arg(short = 'C', long, global = true, default_value = "seqra.toml")]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List compiled patterns
    Patterns,

    /// Inspect a built sequence graph
    Inspect {
        /// Pattern name to inspect
        #[arg(short, long)]
        name: Option<String>,

        /// Inspect the unified graph over the whole pattern set
        #[arg(short, long)]
        unified: bool,
    },

    /// Parse a token stream against the pattern set
    Parse {
        /// Path to the token file (stdin when omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Input format (json, text)
        #[arg(short = 't', long)]
        format: Option<String>,

        /// Engine to run (unified, multi)
        #[arg(short, long, default_value = "unified")]
        engine: String,

        /// Also print the raw parse-event log (unified engine only)
        #[arg(long)]
        events: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), SeqraError> {
    let config = crate::config::AppConfig::load_or_default(&cli.config)?;
    let patterns_dir = cli
        .patterns
        .unwrap_or_else(|| config.patterns_dir.clone());
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Patterns) => cmd_patterns(&patterns_dir, json_mode),
        Some(Commands::Inspect { name, unified }) => {
            cmd_inspect(&patterns_dir, json_mode, name.as_deref(), unified)
        }
        Some(Commands::Parse {
            file,
            format,
            engine,
            events,
        }) => {
            let format = format.unwrap_or_else(|| config.parse.format.clone());
            cmd_parse(
                &patterns_dir,
                json_mode,
                file.as_deref(),
                &format,
                &engine,
                events,
            )
        }
        None => {
            // No subcommand - list patterns by default
            cmd_patterns(&patterns_dir, json_mode)
        }
    }
}
