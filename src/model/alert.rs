//! Findings reported to the user.
//!
//! An [`Alert`] is immutable once built. [`AlertBuilder`] is the only
//! constructor and always sorts the involved files by
//! `(path key, source name)`, so output is stable no matter in which order
//! files were discovered.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::category::Severity;
use super::load_order::LoadOrder;
use super::types::{FileId, PathKey};

// ---------------------------------------------------------------------------
// AlertKind
// ---------------------------------------------------------------------------

/// What caused an alert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    /// The extractor could not parse a file.
    ParseError,
    /// Non-dependent sources ship a file with the same path.
    FileConflict,
    /// Distinct files define the same name in one category.
    NameConflict,
    /// An overriding file dropped a definition its dependency had.
    SilentlyDeleted,
}

impl AlertKind {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::FileConflict => "File conflict",
            Self::NameConflict => "Name conflict",
            Self::SilentlyDeleted => "Missing definition",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Alert
// ---------------------------------------------------------------------------

/// One file involved in an alert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFile {
    /// Arena index of the file in the checked load order.
    pub file: FileId,
    /// Path key of the file.
    pub path: PathKey,
    /// Name of the source that owns the file.
    pub source: String,
}

impl fmt::Display for AlertFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" in \"{}\"", self.path, self.source)
    }
}

/// A single finding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    severity: Severity,
    kind: AlertKind,
    category: String,
    files: Vec<AlertFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    entity: Option<String>,
    message: String,
}

impl Alert {
    /// How serious the finding is.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// What caused it.
    #[must_use]
    pub const fn kind(&self) -> AlertKind {
        self.kind
    }

    /// Name of the category involved.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Involved files, sorted by path key then source name.
    #[must_use]
    pub fn files(&self) -> &[AlertFile] {
        &self.files
    }

    /// Definition name, for name conflicts and silent deletions.
    #[must_use]
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// User-facing detail.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} - {}",
            self.severity.as_str().to_ascii_uppercase(),
            self.kind,
            self.message
        )?;
        write!(f, "The offending files are:")?;
        for file in &self.files {
            write!(f, "\n\t{file}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AlertBuilder
// ---------------------------------------------------------------------------

/// Assembles an [`Alert`] against a load order.
#[derive(Debug)]
pub struct AlertBuilder<'a> {
    order: &'a LoadOrder,
    severity: Severity,
    kind: AlertKind,
    category: String,
    files: Vec<FileId>,
    entity: Option<String>,
    message: String,
}

impl<'a> AlertBuilder<'a> {
    /// Start an alert about `category`.
    #[must_use]
    pub fn new(
        order: &'a LoadOrder,
        severity: Severity,
        kind: AlertKind,
        category: impl Into<String>,
    ) -> Self {
        Self {
            order,
            severity,
            kind,
            category: category.into(),
            files: Vec::new(),
            entity: None,
            message: String::new(),
        }
    }

    /// Add involved files. Duplicates are collapsed.
    #[must_use]
    pub fn files(mut self, files: impl IntoIterator<Item = FileId>) -> Self {
        self.files.extend(files);
        self
    }

    /// Name the definition involved.
    #[must_use]
    pub fn entity(mut self, name: impl Into<String>) -> Self {
        self.entity = Some(name.into());
        self
    }

    /// Set the user-facing message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Resolve file names, sort, and freeze.
    #[must_use]
    pub fn build(self) -> Alert {
        let order = self.order;
        let mut files: Vec<AlertFile> = self
            .files
            .into_iter()
            .map(|id| {
                let file = order.file(id);
                AlertFile {
                    file: id,
                    path: file.path().clone(),
                    source: order.source(file.source()).name().to_owned(),
                }
            })
            .collect();
        files.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then_with(|| a.source.cmp(&b.source))
                .then_with(|| a.file.cmp(&b.file))
        });
        files.dedup_by_key(|f| f.file);

        Alert {
            severity: self.severity,
            kind: self.kind,
            category: self.category,
            files,
            entity: self.entity,
            message: self.message,
        }
    }
}
