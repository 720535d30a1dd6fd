//! Population stage: turn per-source extraction results into a frozen
//! [`LoadOrder`].
//!
//! Extraction of each source is independent, so [`populate`] fans out over
//! the rayon pool and joins every result before the builder sees any of
//! them. The check pipeline therefore never observes a half-populated load
//! order.
//!
//! A source whose extraction fails is kept (other sources may still name it
//! as a dependency) but contributes no files. The failure is returned in
//! [`Population::failures`] instead of aborting its siblings.

use std::collections::BTreeSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    Alert, AlertBuilder, AlertKind, BuildError, Category, CategoryId, EntityTier, FileId,
    LoadOrder, LoadOrderBuilder, PathKey, Severity,
};

// ---------------------------------------------------------------------------
// Inputs and outputs of an extractor
// ---------------------------------------------------------------------------

/// What is known about a source before its files are read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceManifest {
    /// Unique source name.
    pub name: String,
    /// Declared dependency names, unresolved.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Whether this is the baseline source.
    #[serde(default)]
    pub baseline: bool,
}

impl SourceManifest {
    /// A regular source.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            baseline: false,
        }
    }

    /// The baseline source.
    #[must_use]
    pub fn baseline(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            baseline: true,
        }
    }
}

/// Everything extracted from one source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractedSource {
    /// Files in discovery order.
    #[serde(default)]
    pub files: Vec<ExtractedFile>,
}

/// One extracted file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractedFile {
    /// Path inside the source.
    pub path: PathKey,
    /// Category name. When absent, the first category whose directory and
    /// pattern accept `path` is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Named entities in file order.
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    /// Problems the parser hit.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ParseDiagnostic>,
}

/// A named entity and how deeply it is nested.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractedEntity {
    /// Entity name.
    pub name: String,
    /// Top-level group or nested member.
    #[serde(default)]
    pub tier: EntityTier,
}

/// A parse failure inside one file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParseDiagnostic {
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
    /// Parser message.
    pub message: String,
}

impl ParseDiagnostic {
    /// Text used in the resulting parse-error alert.
    #[must_use]
    pub fn alert_message(&self) -> String {
        format!(
            "Failure at line {}:{} due to: {}",
            self.line, self.column, self.message
        )
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Why one source could not be extracted.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The extractor has no data for this source.
    #[error("no extracted data for source '{name}'")]
    Missing {
        /// Source name.
        name: String,
    },

    /// Extraction ran and failed.
    #[error("extracting source '{name}' failed: {reason}")]
    Failed {
        /// Source name.
        name: String,
        /// What went wrong.
        reason: String,
    },

    /// Two extracted files normalize to the same path key.
    #[error("source '{name}' lists '{path}' more than once")]
    DuplicatePath {
        /// Source name.
        name: String,
        /// The repeated key.
        path: PathKey,
    },
}

/// Produces the files and entities of one source.
///
/// Called concurrently for different sources; implementations must not
/// rely on call order.
pub trait Extractor: Sync {
    /// Extract `source`.
    ///
    /// # Errors
    /// Returns [`ExtractError`] when the source cannot be read or parsed as
    /// a whole. Per-file parse problems go in
    /// [`ExtractedFile::diagnostics`] instead.
    fn extract(&self, source: &SourceManifest) -> Result<ExtractedSource, ExtractError>;
}

// ---------------------------------------------------------------------------
// populate
// ---------------------------------------------------------------------------

/// A source whose extraction failed.
#[derive(Debug)]
pub struct ExtractFailure {
    /// Source name.
    pub source: String,
    /// The failure.
    pub error: ExtractError,
}

/// Result of [`populate`].
#[derive(Debug)]
pub struct Population {
    /// The frozen load order.
    pub order: LoadOrder,
    /// One parse-error alert per file diagnostic.
    pub parse_alerts: Vec<Alert>,
    /// Sources that contribute nothing because extraction failed.
    pub failures: Vec<ExtractFailure>,
}

/// Extract every manifest in parallel, then build the load order in
/// manifest order.
///
/// A source whose extraction lists the same path key twice is treated as a
/// failed extraction: it is kept without files and reported in
/// [`Population::failures`].
///
/// # Errors
/// Returns [`BuildError`] for load-order problems: duplicate source or
/// category names, or not exactly one baseline manifest.
pub fn populate<E>(
    manifests: &[SourceManifest],
    categories: Vec<Category>,
    extractor: &E,
) -> Result<Population, BuildError>
where
    E: Extractor + ?Sized,
{
    let mut builder = LoadOrderBuilder::new(categories)?;

    let extracted: Vec<Result<ExtractedSource, ExtractError>> = manifests
        .par_iter()
        .map(|manifest| extractor.extract(manifest))
        .collect();

    let mut failures = Vec::new();
    let mut diagnostics: Vec<(FileId, ParseDiagnostic)> = Vec::new();

    for (manifest, result) in manifests.iter().zip(extracted) {
        let source = if manifest.baseline {
            if !manifest.dependencies.is_empty() {
                tracing::warn!(
                    source = %manifest.name,
                    "baseline declares dependencies; ignoring them"
                );
            }
            builder.baseline(manifest.name.as_str())?
        } else {
            builder.add_source(manifest.name.as_str(), manifest.dependencies.iter().cloned())?
        };

        let extracted = match result.and_then(|e| reject_repeated_paths(&manifest.name, e)) {
            Ok(extracted) => extracted,
            Err(error) => {
                tracing::warn!(
                    source = %manifest.name,
                    %error,
                    "extraction failed; source contributes no files"
                );
                failures.push(ExtractFailure {
                    source: manifest.name.clone(),
                    error,
                });
                continue;
            }
        };

        for file in extracted.files {
            let Some(category) = assign_category(&builder, &file) else {
                tracing::debug!(
                    source = %manifest.name,
                    path = %file.path,
                    "no category for file; skipped"
                );
                continue;
            };
            let id = builder.add_file(source, file.path, category)?;
            for entity in file.entities {
                builder.add_definition(id, entity.name, entity.tier);
            }
            diagnostics.extend(file.diagnostics.into_iter().map(|d| (id, d)));
        }
    }

    let order = builder.build()?;
    let parse_alerts = diagnostics
        .into_iter()
        .map(|(file, diagnostic)| {
            let category = order.category(order.file(file).category()).name();
            AlertBuilder::new(&order, Severity::Error, AlertKind::ParseError, category)
                .files([file])
                .message(diagnostic.alert_message())
                .build()
        })
        .collect();

    tracing::debug!(
        sources = order.sources().len(),
        files = order.files().len(),
        definitions = order.definitions().len(),
        failures = failures.len(),
        "populated load order"
    );

    Ok(Population {
        order,
        parse_alerts,
        failures,
    })
}

fn reject_repeated_paths(
    name: &str,
    extracted: ExtractedSource,
) -> Result<ExtractedSource, ExtractError> {
    {
        let mut seen = BTreeSet::new();
        for file in &extracted.files {
            if !seen.insert(&file.path) {
                return Err(ExtractError::DuplicatePath {
                    name: name.to_owned(),
                    path: file.path.clone(),
                });
            }
        }
    }
    Ok(extracted)
}

fn assign_category(builder: &LoadOrderBuilder, file: &ExtractedFile) -> Option<CategoryId> {
    match &file.category {
        Some(name) => builder.category_by_name(name),
        None => builder
            .categories()
            .iter()
            .position(|category| category.matches(&file.path))
            .map(CategoryId::from_index),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
