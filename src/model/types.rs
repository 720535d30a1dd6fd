//! Core identity types for the load-order model.
//!
//! Arena indices ([`SourceId`], [`FileId`], [`DefinitionId`], [`CategoryId`])
//! and the normalized cross-source file identity [`PathKey`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Arena indices
// ---------------------------------------------------------------------------

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Position of the entry in its arena.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_index(index: usize) -> Self {
                Self(u32::try_from(index).unwrap_or_else(|_| {
                    panic!(concat!(stringify!($name), " arena overflow at {}"), index)
                }))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Index of a [`Source`](super::load_order::Source) in a load order.
    SourceId,
    "source"
);
arena_id!(
    /// Index of a [`SourceFile`](super::load_order::SourceFile) in a load order.
    FileId,
    "file"
);
arena_id!(
    /// Index of a [`Definition`](super::load_order::Definition) in a load order.
    DefinitionId,
    "definition"
);
arena_id!(
    /// Index of a [`Category`](super::category::Category) in a load order.
    CategoryId,
    "category"
);

// ---------------------------------------------------------------------------
// PathKey
// ---------------------------------------------------------------------------

/// Normalized relative path of a file inside its source.
///
/// Two files in different sources collide iff their keys are equal.
/// Normalization turns `\` into `/`, collapses repeated separators, and
/// strips leading `./` and `/` segments. Comparison is case-sensitive.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathKey(String);

impl PathKey {
    /// Normalize a raw relative path into a key.
    ///
    /// # Errors
    /// Returns an error if nothing remains after normalization.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let normalized = raw
            .split(['/', '\\'])
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect::<Vec<_>>()
            .join("/");
        if normalized.is_empty() {
            return Err(ValidationError {
                kind: ErrorKind::PathKey,
                value: raw.to_owned(),
                reason: "path must name a file below the source root".to_owned(),
            });
        }
        Ok(Self(normalized))
    }

    /// Return the normalized key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory part of the key (empty for files at the source root).
    #[must_use]
    pub fn parent(&self) -> &str {
        self.0.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    /// Final path segment.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit_once('/').map_or(self.0.as_str(), |(_, name)| name)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PathKey {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PathKey {
    type Error = ValidationError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<PathKey> for String {
    fn from(key: PathKey) -> Self {
        key.0
    }
}

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Which kind of value failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A [`PathKey`].
    PathKey,
    /// A [`Severity`](super::category::Severity) name.
    Severity,
    /// A [`MergeBehaviour`](super::category::MergeBehaviour) name.
    MergeBehaviour,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathKey => write!(f, "path key"),
            Self::Severity => write!(f, "severity"),
            Self::MergeBehaviour => write!(f, "merge behaviour"),
        }
    }
}

/// A value could not be parsed into one of the model's validated types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}': {reason}")]
pub struct ValidationError {
    /// What was being validated.
    pub kind: ErrorKind,
    /// The rejected input.
    pub value: String,
    /// Why it was rejected.
    pub reason: String,
}
