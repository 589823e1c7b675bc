//! # Seqra - Sequence-Graph Activation Engine
//!
//! The main binary for the Seqra incremental pattern matcher.
//!
//! This application provides:
//! - Pattern directory inspection (compiled grammar graphs)
//! - Token-stream parsing with parse-forest output
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │              apps/seqra (THE BINARY)             │
//! │                                                  │
//! │   ┌─────────────┐       ┌───────────────────┐   │
//! │   │    CLI      │       │  Config (toml)    │   │
//! │   │   (clap)    │       │  seqra.toml       │   │
//! │   └──────┬──────┘       └─────────┬─────────┘   │
//! │          │                        │             │
//! │          └───────────┬────────────┘             │
//! │                      ▼                          │
//! │              ┌──────────────┐                   │
//! │              │  seqra-core  │                   │
//! │              │ (THE LOGIC)  │                   │
//! │              └──────────────┘                   │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # List compiled patterns
//! seqra patterns
//!
//! # Inspect one pattern or the unified graph
//! seqra inspect -n NP
//! seqra inspect --unified
//!
//! # Parse a token stream
//! seqra parse -f tokens.json
//! seqra parse -f sentence.txt -t text --events
//! ```

mod cli;
mod config;
mod render;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Initialize tracing — SEQRA_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("SEQRA_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "seqra=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Seqra startup banner.
fn print_banner() {
    println!(
        r#"
  ███████╗███████╗ ██████╗ ██████╗  █████╗
  ██╔════╝██╔════╝██╔═══██╗██╔══██╗██╔══██╗
  ███████╗█████╗  ██║   ██║██████╔╝███████║
  ╚════██║██╔══╝  ██║▄▄ ██║██╔══██╗██╔══██║
  ███████║███████╗╚██████╔╝██║  ██║██║  ██║
  ╚══════╝╚══════╝ ╚══▀▀═╝ ╚═╝  ╚═╝╚═╝  ╚═╝

  Sequence-Graph Activation Engine v{}

  Deterministic • Incremental • Bounded
"#,
        env!("CARGO_PKG_VERSION")
    );
}
