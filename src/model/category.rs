//! Category policy model.
//!
//! A [`Category`] groups files that share parsing and merge rules. Each
//! category carries a default [`MergeBehaviour`] that decides whether
//! same-named definitions in distinct files are a reportable conflict, and
//! a [`NamingStrategy`] that decides which extracted entities count as
//! definitions at all.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::types::{ErrorKind, PathKey, ValidationError};

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// How serious a finding is, in ascending order.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    /// Nothing to act on.
    Trivial,
    /// Worth knowing, usually intended.
    #[default]
    Info,
    /// Works, but is poor practice.
    BadStyle,
    /// Likely to misbehave at runtime.
    Warning,
    /// Will misbehave at runtime.
    Error,
    /// The load order cannot work at all.
    Critical,
}

impl Severity {
    /// Every severity, ascending.
    pub const ALL: [Self; 6] = [
        Self::Trivial,
        Self::Info,
        Self::BadStyle,
        Self::Warning,
        Self::Error,
        Self::Critical,
    ];

    /// Stable kebab-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trivial => "trivial",
            Self::Info => "info",
            Self::BadStyle => "bad-style",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|severity| severity.as_str() == wanted)
            .ok_or_else(|| ValidationError {
                kind: ErrorKind::Severity,
                value: s.to_owned(),
                reason: "expected one of: trivial, info, bad-style, warning, error, critical"
                    .to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// MergeBehaviour
// ---------------------------------------------------------------------------

/// How the game combines same-named definitions of one category that live
/// in distinctly named files.
///
/// Policies are totally ordered by [`rank`](Self::rank). Only
/// [`MergeBehaviour::NoOp`] is exempt from conflict reporting; everything
/// ranked above it reports with its [`default_severity`](Self::default_severity).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeBehaviour {
    /// Definitions are file-local; conflict resolution does not apply.
    NoOp,
    /// Same-named groups are merged together.
    MergeGroups,
    /// Definitions merge in a complex but well-understood way.
    PartialComplex,
    /// The last definition loaded replaces all others.
    ReplaceLast,
    /// The first definition loaded wins; later ones are ignored.
    IgnoreExtras,
    /// Nobody knows yet whether duplicates are safe.
    UnknownSafety,
    /// Duplicates are considered unsafe.
    Unsafe,
    /// Definitions merge in a complex way that may not be intended.
    PartialComplexMaybe,
    /// Duplicates are an error with unpredictable results.
    FailOnDuplicate,
    /// Defining the same name twice is not a valid operation.
    Invalid,
}

impl MergeBehaviour {
    /// Every policy, ascending by rank.
    pub const ALL: [Self; 10] = [
        Self::NoOp,
        Self::MergeGroups,
        Self::PartialComplex,
        Self::ReplaceLast,
        Self::IgnoreExtras,
        Self::UnknownSafety,
        Self::Unsafe,
        Self::PartialComplexMaybe,
        Self::FailOnDuplicate,
        Self::Invalid,
    ];

    /// Position in the total policy order.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::NoOp => 0,
            Self::MergeGroups => 1,
            Self::PartialComplex => 2,
            Self::ReplaceLast => 3,
            Self::IgnoreExtras => 4,
            Self::UnknownSafety => 5,
            Self::Unsafe => 6,
            Self::PartialComplexMaybe => 7,
            Self::FailOnDuplicate => 8,
            Self::Invalid => 9,
        }
    }

    /// Severity of a name conflict under this policy.
    #[must_use]
    pub const fn default_severity(self) -> Severity {
        match self {
            Self::NoOp => Severity::Trivial,
            Self::MergeGroups | Self::PartialComplex | Self::ReplaceLast | Self::IgnoreExtras => {
                Severity::Info
            }
            Self::UnknownSafety | Self::Unsafe | Self::PartialComplexMaybe => Severity::Warning,
            Self::FailOnDuplicate | Self::Invalid => Severity::Error,
        }
    }

    /// User-facing explanation appended to name-conflict messages.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::NoOp => "These are file-local; conflict resolution doesn't apply.",
            Self::MergeGroups => "These groups will be merged.",
            Self::PartialComplex => "This will cause complex merging behaviour.",
            Self::ReplaceLast => "The last one replaces all others.",
            Self::IgnoreExtras => "All but the first will be ignored.",
            Self::UnknownSafety => {
                "This is not known to be safe and may have unexpected effects."
            }
            Self::Unsafe => "This is considered unsafe and may unexpectedly fail.",
            Self::PartialComplexMaybe => {
                "This will cause complex merging behaviour that may or may not be intended."
            }
            Self::FailOnDuplicate => "This is an error and will cause unpredictable results.",
            Self::Invalid => "This is not a valid operation.",
        }
    }

    /// Stable kebab-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoOp => "no-op",
            Self::MergeGroups => "merge-groups",
            Self::PartialComplex => "partial-complex",
            Self::ReplaceLast => "replace-last",
            Self::IgnoreExtras => "ignore-extras",
            Self::UnknownSafety => "unknown-safety",
            Self::Unsafe => "unsafe",
            Self::PartialComplexMaybe => "partial-complex-maybe",
            Self::FailOnDuplicate => "fail-on-duplicate",
            Self::Invalid => "invalid",
        }
    }

    /// Whether same-named definitions under this policy are worth reporting.
    #[must_use]
    pub fn is_reportable(self) -> bool {
        self > Self::NoOp
    }
}

impl PartialOrd for MergeBehaviour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeBehaviour {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for MergeBehaviour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeBehaviour {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|behaviour| behaviour.as_str() == wanted)
            .ok_or_else(|| ValidationError {
                kind: ErrorKind::MergeBehaviour,
                value: s.to_owned(),
                reason: "unknown merge behaviour".to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// EntityTier / NamingStrategy
// ---------------------------------------------------------------------------

/// Nesting level at which an extractor found an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityTier {
    /// A top-level block.
    #[default]
    Group,
    /// An entry nested inside a top-level block.
    Member,
}

/// How definitions are named inside a category's files.
///
/// Extraction itself happens outside this crate; the strategy decides which
/// extracted entities are tracked and which policy applies to each tier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NamingStrategy {
    /// Top-level block keys are the names.
    #[default]
    TopLevel,
    /// Keys nested one level down are the names. Under a merge-groups
    /// policy the top-level groups are tracked as well.
    SecondLevel,
    /// Keys with a well-known prefix, at any depth.
    PrefixAnyLevel,
    /// The value of `field` inside each top-level block.
    IdField {
        /// Name of the identifying field.
        field: String,
    },
    /// The value of `field` inside each second-level block.
    SecondLevelIdField {
        /// Name of the identifying field.
        field: String,
    },
    /// The value of `field` in blocks at any depth.
    AnyLevelIdField {
        /// Name of the identifying field.
        field: String,
    },
}

impl NamingStrategy {
    /// Policy for an entity at `tier`, or `None` if this strategy does not
    /// track entities at that tier.
    #[must_use]
    pub fn behaviour_for(
        &self,
        tier: EntityTier,
        default: MergeBehaviour,
    ) -> Option<MergeBehaviour> {
        match (self, tier) {
            (Self::TopLevel | Self::IdField { .. }, EntityTier::Group)
            | (Self::SecondLevelIdField { .. }, EntityTier::Member)
            | (Self::PrefixAnyLevel | Self::AnyLevelIdField { .. }, _) => Some(default),
            (Self::SecondLevel, EntityTier::Group) => {
                (default == MergeBehaviour::MergeGroups).then_some(MergeBehaviour::MergeGroups)
            }
            (Self::SecondLevel, EntityTier::Member) => {
                if default == MergeBehaviour::MergeGroups {
                    Some(MergeBehaviour::ReplaceLast)
                } else {
                    Some(default)
                }
            }
            (Self::TopLevel | Self::IdField { .. }, EntityTier::Member)
            | (Self::SecondLevelIdField { .. }, EntityTier::Group) => None,
        }
    }

    /// Identifying field for the id-field strategies.
    #[must_use]
    pub fn id_field(&self) -> Option<&str> {
        match self {
            Self::IdField { field }
            | Self::SecondLevelIdField { field }
            | Self::AnyLevelIdField { field } => Some(field),
            Self::TopLevel | Self::SecondLevel | Self::PrefixAnyLevel => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Default file pattern for categories that do not set one.
pub const DEFAULT_PATTERN: &str = "*.txt";

/// Default text encoding label.
pub const DEFAULT_ENCODING: &str = "windows-1252";

/// A group of files sharing parsing and merge rules.
#[derive(Clone, Debug)]
pub struct Category {
    name: String,
    directory: String,
    pattern: glob::Pattern,
    merge: MergeBehaviour,
    naming: NamingStrategy,
    reserved: BTreeSet<String>,
    encoding: String,
}

impl Category {
    /// A category living in `directory` with the given default policy.
    ///
    /// Uses [`DEFAULT_PATTERN`], [`NamingStrategy::TopLevel`], no reserved
    /// names and [`DEFAULT_ENCODING`].
    pub fn new(name: impl Into<String>, directory: &str, merge: MergeBehaviour) -> Self {
        Self {
            name: name.into(),
            directory: normalize_directory(directory),
            pattern: default_pattern(),
            merge,
            naming: NamingStrategy::default(),
            reserved: BTreeSet::new(),
            encoding: DEFAULT_ENCODING.to_owned(),
        }
    }

    /// Replace the file-name pattern.
    ///
    /// # Errors
    /// Returns an error if `pattern` is not a valid glob.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, glob::PatternError> {
        self.pattern = glob::Pattern::new(pattern)?;
        Ok(self)
    }

    /// Replace the naming strategy.
    #[must_use]
    pub fn with_naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    /// Add names that must never be treated as definitions.
    #[must_use]
    pub fn with_reserved<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(names.into_iter().map(Into::into));
        self
    }

    /// Replace the encoding label.
    #[must_use]
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Category name, unique within a load order.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory (relative to a source root) that holds this category's files.
    #[must_use]
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// File-name glob.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Default policy for definitions in this category.
    #[must_use]
    pub const fn merge_behaviour(&self) -> MergeBehaviour {
        self.merge
    }

    /// How definitions are named.
    #[must_use]
    pub const fn naming(&self) -> &NamingStrategy {
        &self.naming
    }

    /// Text encoding label. Informational only.
    #[must_use]
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Explicitly reserved names.
    pub fn reserved_names(&self) -> impl Iterator<Item = &str> {
        self.reserved.iter().map(String::as_str)
    }

    /// Whether `name` must be ignored. The empty name is always reserved.
    #[must_use]
    pub fn is_reserved(&self, name: &str) -> bool {
        name.is_empty() || self.reserved.contains(name)
    }

    /// Whether a file at `path` belongs to this category: it must sit
    /// directly in [`directory`](Self::directory) and match the pattern.
    #[must_use]
    pub fn matches(&self, path: &PathKey) -> bool {
        path.parent() == self.directory && self.pattern.matches(path.file_name())
    }

    /// Policy for an entity at `tier`, or `None` if it is not tracked.
    #[must_use]
    pub fn behaviour_for(&self, tier: EntityTier) -> Option<MergeBehaviour> {
        self.naming.behaviour_for(tier, self.merge)
    }
}

fn normalize_directory(directory: &str) -> String {
    directory
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn default_pattern() -> glob::Pattern {
    glob::Pattern::new(DEFAULT_PATTERN).unwrap_or_default()
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
