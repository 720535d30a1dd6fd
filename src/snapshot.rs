//! JSON snapshot of already-extracted sources.
//!
//! A snapshot is what an external extractor hands over: the source list in
//! load order, each with its files and entities. It feeds the same
//! [`populate`] stage as any other [`Extractor`].
//!
//! ```json
//! { "sources": [
//!   { "name": "Base", "baseline": true,
//!     "files": [ { "path": "common/traits/00_traits.txt",
//!                  "entities": [ { "name": "brave" } ] } ] },
//!   { "name": "A", "dependencies": ["Base"], "error": "archive is corrupt" } ] }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extract::{
    ExtractError, ExtractedFile, ExtractedSource, Extractor, Population, SourceManifest, populate,
};
use crate::model::{BuildError, Category};

// ---------------------------------------------------------------------------
// Format
// ---------------------------------------------------------------------------

/// Top-level snapshot document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    /// Sources in load order.
    #[serde(default)]
    pub sources: Vec<SnapshotSource>,
}

/// One source and what was extracted from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotSource {
    /// Unique source name.
    pub name: String,
    /// Whether this is the baseline source.
    #[serde(default)]
    pub baseline: bool,
    /// Declared dependency names.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Extracted files.
    #[serde(default)]
    pub files: Vec<ExtractedFile>,
    /// Set when upstream extraction of this source failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error loading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The file could not be read.
    #[error("could not read snapshot {}", .path.display())]
    Read {
        /// Snapshot path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not a valid snapshot.
    #[error("{origin}: invalid snapshot: {source}")]
    Parse {
        /// Where the document came from.
        origin: String,
        /// Underlying JSON error, with line and column.
        #[source]
        source: serde_json::Error,
    },
}

impl Snapshot {
    /// Read and parse a snapshot file.
    ///
    /// # Errors
    /// Returns [`SnapshotError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse_from(&contents, &path.display().to_string())
    }

    /// Parse a snapshot from a JSON string.
    ///
    /// # Errors
    /// Returns [`SnapshotError::Parse`] on invalid JSON or unknown fields.
    pub fn parse(json: &str) -> Result<Self, SnapshotError> {
        Self::parse_from(json, "<input>")
    }

    fn parse_from(json: &str, origin: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(json).map_err(|source| SnapshotError::Parse {
            origin: origin.to_owned(),
            source,
        })
    }

    /// Manifests for every source, in load order.
    #[must_use]
    pub fn manifests(&self) -> Vec<SourceManifest> {
        self.sources
            .iter()
            .map(|source| SourceManifest {
                name: source.name.clone(),
                dependencies: source.dependencies.clone(),
                baseline: source.baseline,
            })
            .collect()
    }

    /// An extractor serving this snapshot's files.
    #[must_use]
    pub fn extractor(&self) -> SnapshotExtractor<'_> {
        SnapshotExtractor {
            by_name: self
                .sources
                .iter()
                .map(|source| (source.name.as_str(), source))
                .collect(),
        }
    }

    /// Populate a load order from this snapshot.
    ///
    /// # Errors
    /// Returns [`BuildError`] on structural problems (see [`populate`]).
    pub fn populate(&self, categories: Vec<Category>) -> Result<Population, BuildError> {
        populate(&self.manifests(), categories, &self.extractor())
    }
}

// ---------------------------------------------------------------------------
// SnapshotExtractor
// ---------------------------------------------------------------------------

/// [`Extractor`] backed by a parsed [`Snapshot`].
#[derive(Debug)]
pub struct SnapshotExtractor<'a> {
    by_name: HashMap<&'a str, &'a SnapshotSource>,
}

impl Extractor for SnapshotExtractor<'_> {
    fn extract(&self, manifest: &SourceManifest) -> Result<ExtractedSource, ExtractError> {
        let Some(source) = self.by_name.get(manifest.name.as_str()) else {
            return Err(ExtractError::Missing {
                name: manifest.name.clone(),
            });
        };
        if let Some(reason) = &source.error {
            return Err(ExtractError::Failed {
                name: manifest.name.clone(),
                reason: reason.clone(),
            });
        }
        Ok(ExtractedSource {
            files: source.files.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
