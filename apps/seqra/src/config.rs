//! # Application Configuration
//!
//! Optional `seqra.toml` configuration. Everything has a default; a missing
//! config file is not an error. CLI flags override config values.
//!
//! ```toml
//! patterns_dir = "patterns"
//!
//! [parse]
//! format = "json"
//! ```

use seqra_core::SeqraError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Maximum configuration file size (64 KB). Anything larger is not a config.
const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Directory of compiled `<name>.json` pattern files.
    pub patterns_dir: PathBuf,
    /// Parse-command defaults.
    pub parse: ParseConfig,
}

/// Defaults for the `parse` command.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseConfig {
    /// Default token input format: "json" or "text".
    pub format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            patterns_dir: PathBuf::from("patterns"),
            parse: ParseConfig::default(),
        }
    }
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the given path, falling back to defaults when
    /// the file does not exist. A file that exists but fails to parse is an
    /// error; silently ignoring a broken config would mask typos.
    pub fn load_or_default(path: &Path) -> Result<Self, SeqraError> {
        if !path.is_file() {
            return Ok(Self::default());
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| SeqraError::IoError(format!("cannot read config metadata: {e}")))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(SeqraError::SerializationError(format!(
                "config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            SeqraError::IoError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        toml::from_str(&text).map_err(|e| {
            SeqraError::SerializationError(format!(
                "malformed config '{}': {e}",
                path.display()
            ))
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
