//! # Pattern Graph Loader
//!
//! Raw compiled-pattern records and the storage boundary for loading them.
//!
//! The pattern *compiler* (out of scope) turns BNF-like text into the
//! node/edge JSON consumed here. This module:
//! - Defines the raw record shapes (`RawPatternGraph`, `RawNode`, `RawEdge`)
//! - Validates identifiers and sizes before anything is built
//! - Loads raw graphs by construction name via `PatternGraphLoader`
//!
//! Raw records are treated as already validated by the compiler except for
//! the structural checks applied at build time (START/END presence, dangling
//! edges).

use crate::primitives::{MAX_IDENTIFIER_LENGTH, MAX_PATTERN_FILE_SIZE, MAX_VALUE_LENGTH};
use crate::SeqraError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// =============================================================================
// RAW RECORDS
// =============================================================================

/// One compiled pattern graph, as emitted by the pattern compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPatternGraph {
    /// Node records keyed by local node id.
    pub nodes: BTreeMap<String, RawNode>,
    /// Edge records in compiler order.
    pub edges: Vec<RawEdge>,
}

/// One raw node record.
///
/// `type` is one of START, END, INTERMEDIATE, SLOT, CONSTRUCTION_REF.
/// SLOT carries `pos` (the expected token category) and optionally
/// `element_value`; CONSTRUCTION_REF carries `construction_name` and
/// optionally `role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNode {
    /// The raw node kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Token category for SLOT nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    /// Referenced pattern name for CONSTRUCTION_REF nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub construction_name: Option<String>,
    /// Optional exact-match value filter for SLOT nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_value: Option<String>,
    /// Optional explicit role for CONSTRUCTION_REF nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// One raw edge record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEdge {
    /// Source local node id.
    pub from: String,
    /// Target local node id.
    pub to: String,
    /// Whether this edge skips an optional element.
    #[serde(default)]
    pub bypass: bool,
}

impl RawPatternGraph {
    /// Validate identifier and value lengths.
    ///
    /// Structural checks (START/END presence, dangling edges) are the
    /// builder's job; this only rejects records that could exhaust memory
    /// or smuggle path separators into storage lookups.
    pub fn validate(&self, name: &str) -> Result<(), SeqraError> {
        validate_construction_name(name)?;
        for (id, node) in &self.nodes {
            if id.is_empty() || id.len() > MAX_IDENTIFIER_LENGTH {
                return Err(SeqraError::InvalidPattern(
                    name.to_string(),
                    format!("node id '{id}' exceeds identifier limits"),
                ));
            }
            if let Some(value) = &node.element_value {
                if value.len() > MAX_VALUE_LENGTH {
                    return Err(SeqraError::InvalidPattern(
                        name.to_string(),
                        format!("element value on node '{id}' exceeds {MAX_VALUE_LENGTH} bytes"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Validate a construction name before it is used as a storage key.
///
/// Rejects empty/oversized names and anything containing a path separator,
/// preventing traversal out of the patterns directory.
pub fn validate_construction_name(name: &str) -> Result<(), SeqraError> {
    if name.is_empty() || name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(SeqraError::InvalidPattern(
            name.to_string(),
            "construction name exceeds identifier limits".to_string(),
        ));
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(SeqraError::InvalidPattern(
            name.to_string(),
            "construction name must not contain path separators".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// LOADER TRAIT
// =============================================================================

/// The storage boundary for compiled pattern graphs.
///
/// Implementations are thin data access: no interpretation, no caching of
/// built graphs. Everything returned is a raw record the builders check.
pub trait PatternGraphLoader {
    /// Load one raw pattern graph by construction name.
    fn load(&self, name: &str) -> Result<RawPatternGraph, SeqraError>;

    /// List all construction names available in storage, sorted.
    fn list(&self) -> Result<Vec<String>, SeqraError>;
}

// =============================================================================
// DIRECTORY LOADER
// =============================================================================

/// Loads compiled patterns from a directory of `<name>.json` files.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    dir: PathBuf,
}

impl DirectoryLoader {
    /// Create a loader rooted at the given directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, SeqraError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(SeqraError::IoError(format!(
                "patterns path '{}' is not a directory",
                dir.display()
            )));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Validate file size before reading.
    fn validate_file_size(path: &Path) -> Result<(), SeqraError> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| SeqraError::IoError(format!("cannot read file metadata: {e}")))?;
        if metadata.len() > MAX_PATTERN_FILE_SIZE {
            return Err(SeqraError::SerializationError(format!(
                "file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_PATTERN_FILE_SIZE
            )));
        }
        Ok(())
    }
}

impl PatternGraphLoader for DirectoryLoader {
    fn load(&self, name: &str) -> Result<RawPatternGraph, SeqraError> {
        validate_construction_name(name)?;
        let path = self.dir.join(format!("{name}.json"));
        if !path.is_file() {
            return Err(SeqraError::UnknownConstruction(name.to_string()));
        }
        Self::validate_file_size(&path)?;

        let bytes = std::fs::read(&path)
            .map_err(|e| SeqraError::IoError(format!("cannot read '{}': {e}", path.display())))?;
        let raw: RawPatternGraph = serde_json::from_slice(&bytes).map_err(|e| {
            SeqraError::SerializationError(format!("malformed pattern '{name}': {e}"))
        })?;
        raw.validate(name)?;
        Ok(raw)
    }

    fn list(&self) -> Result<Vec<String>, SeqraError> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| SeqraError::IoError(format!("cannot list patterns: {e}")))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SeqraError::IoError(e.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

// =============================================================================
// MEMORY LOADER
// =============================================================================

/// In-memory loader for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    patterns: BTreeMap<String, RawPatternGraph>,
}

impl MemoryLoader {
    /// Create a new empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw pattern graph under the given name.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        raw: RawPatternGraph,
    ) -> Result<(), SeqraError> {
        let name = name.into();
        raw.validate(&name)?;
        self.patterns.insert(name, raw);
        Ok(())
    }
}

impl PatternGraphLoader for MemoryLoader {
    fn load(&self, name: &str) -> Result<RawPatternGraph, SeqraError> {
        self.patterns
            .get(name)
            .cloned()
            .ok_or_else(|| SeqraError::UnknownConstruction(name.to_string()))
    }

    fn list(&self) -> Result<Vec<String>, SeqraError> {
        Ok(self.patterns.keys().cloned().collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
