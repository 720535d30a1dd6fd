//! Checker configuration (`modclash.toml`).
//!
//! Defines report thresholds and the category table. Categories come from a
//! built-in preset (Crusader Kings II by default) overlaid with any
//! `[[category]]` entries in the file: an entry with a preset category's
//! name replaces it, any other entry is appended.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::model::category::{DEFAULT_ENCODING, DEFAULT_PATTERN};
use crate::model::{Category, MergeBehaviour, NamingStrategy, Severity};

/// Built-in Crusader Kings II category table.
const CKII_PRESET: &str = include_str!("../presets/ckii.toml");

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "modclash.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level checker configuration.
///
/// Missing fields use defaults. Missing file → all defaults (no error).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModclashConfig {
    /// Built-in category table to start from.
    #[serde(default)]
    pub preset: Preset,

    /// Report thresholds.
    #[serde(default)]
    pub report: ReportConfig,

    /// Extra or replacement categories, in `[[category]]` tables.
    #[serde(default, rename = "category")]
    pub categories: Vec<CategoryConfig>,
}

// ---------------------------------------------------------------------------
// Preset
// ---------------------------------------------------------------------------

/// Built-in category table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Crusader Kings II.
    #[default]
    Ckii,
    /// Start from an empty table.
    None,
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ckii => write!(f, "ckii"),
            Self::None => write!(f, "none"),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PresetFile {
    #[serde(rename = "category")]
    categories: Vec<CategoryConfig>,
}

impl Preset {
    /// Category entries of this preset.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] if the embedded table is malformed.
    pub fn categories(self) -> Result<Vec<CategoryConfig>, ConfigError> {
        let text = match self {
            Self::Ckii => CKII_PRESET,
            Self::None => return Ok(Vec::new()),
        };
        let file: PresetFile = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: None,
            message: format!("built-in preset '{self}': {}", e.message()),
        })?;
        Ok(file.categories)
    }
}

// ---------------------------------------------------------------------------
// ReportConfig
// ---------------------------------------------------------------------------

/// Which alerts are shown and which fail the run.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Alerts below this severity are hidden (default: `"info"`).
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,

    /// The CLI exits non-zero when any alert reaches this severity
    /// (default: `"error"`).
    #[serde(default = "default_fail_on")]
    pub fail_on: Severity,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            min_severity: default_min_severity(),
            fail_on: default_fail_on(),
        }
    }
}

const fn default_min_severity() -> Severity {
    Severity::Info
}

const fn default_fail_on() -> Severity {
    Severity::Error
}

// ---------------------------------------------------------------------------
// CategoryConfig
// ---------------------------------------------------------------------------

/// One `[[category]]` entry.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryConfig {
    /// Unique category name.
    pub name: String,

    /// Directory holding the category's files, relative to a source root.
    pub directory: String,

    /// File-name glob (default: `"*.txt"`).
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Default policy (default: `"unknown-safety"`).
    #[serde(default = "default_merge")]
    pub merge: MergeBehaviour,

    /// Naming strategy (default: `{ kind = "top-level" }`).
    #[serde(default)]
    pub naming: NamingStrategy,

    /// Names that are never definitions.
    #[serde(default)]
    pub reserved: Vec<String>,

    /// Text encoding label (default: `"windows-1252"`).
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

fn default_pattern() -> String {
    DEFAULT_PATTERN.to_owned()
}

const fn default_merge() -> MergeBehaviour {
    MergeBehaviour::UnknownSafety
}

fn default_encoding() -> String {
    DEFAULT_ENCODING.to_owned()
}

impl CategoryConfig {
    /// Build the runtime [`Category`].
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidPattern`] if `pattern` is not a valid glob.
    pub fn to_category(&self) -> Result<Category, ConfigError> {
        Category::new(self.name.as_str(), &self.directory, self.merge)
            .with_pattern(&self.pattern)
            .map(|category| {
                category
                    .with_naming(self.naming.clone())
                    .with_reserved(self.reserved.iter().cloned())
                    .with_encoding(self.encoding.as_str())
            })
            .map_err(|source| ConfigError::InvalidPattern {
                category: self.name.clone(),
                pattern: self.pattern.clone(),
                source,
            })
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading or interpreting a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("{}: could not read file: {source}", .path.display())]
    Read {
        /// The path being loaded.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid TOML or unknown fields.
    #[error("{}", located(.path.as_deref(), .message))]
    Parse {
        /// The path being loaded, if any.
        path: Option<PathBuf>,
        /// Human-readable message with line-level detail when possible.
        message: String,
    },

    /// A category pattern is not a valid glob.
    #[error("category '{category}': invalid pattern '{pattern}'")]
    InvalidPattern {
        /// Category name.
        category: String,
        /// The rejected pattern.
        pattern: String,
        /// Underlying glob error.
        #[source]
        source: glob::PatternError,
    },

    /// Two `[[category]]` entries in the file share a name.
    #[error("category '{name}' is configured more than once")]
    DuplicateCategory {
        /// The repeated name.
        name: String,
    },
}

fn located(path: Option<&Path>, message: &str) -> String {
    match path {
        Some(path) => format!("{}: {message}", path.display()),
        None => format!("config error: {message}"),
    }
}

impl ModclashConfig {
    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_owned(),
                    source,
                });
            }
        };
        Self::parse(&contents).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: Some(path.to_owned()),
                message,
            },
            other => other,
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError::Parse {
                path: None,
                message,
            }
        })
    }

    /// The effective category table: the preset overlaid with the file's
    /// own entries.
    ///
    /// # Errors
    /// Returns [`ConfigError`] on duplicate names within the file, invalid
    /// glob patterns, or a malformed preset.
    pub fn categories(&self) -> Result<Vec<Category>, ConfigError> {
        let mut seen = HashSet::with_capacity(self.categories.len());
        for entry in &self.categories {
            if !seen.insert(entry.name.as_str()) {
                return Err(ConfigError::DuplicateCategory {
                    name: entry.name.clone(),
                });
            }
        }

        let mut table = self.preset.categories()?;
        for entry in &self.categories {
            match table.iter_mut().find(|existing| existing.name == entry.name) {
                Some(existing) => existing.clone_from(entry),
                None => table.push(entry.clone()),
            }
        }
        table.iter().map(CategoryConfig::to_category).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityTier, PathKey};

    #[test]
    fn defaults_all_fields() {
        let cfg = ModclashConfig::default();
        assert_eq!(cfg.preset, Preset::Ckii);
        assert_eq!(cfg.report.min_severity, Severity::Info);
        assert_eq!(cfg.report.fail_on, Severity::Error);
        assert!(cfg.categories.is_empty());
    }

    #[test]
    fn parse_empty_string() {
        assert_eq!(ModclashConfig::parse("").unwrap(), ModclashConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let cfg = ModclashConfig::parse(
            r#"
preset = "none"

[report]
min_severity = "warning"
fail_on = "critical"

[[category]]
name = "traits"
directory = "common/traits"
pattern = "*.txt"
merge = "fail-on-duplicate"
naming = { kind = "top-level" }
reserved = ["slots"]
encoding = "utf-8"

[[category]]
name = "events"
directory = "events"
merge = "unsafe"
naming = { kind = "id-field", field = "id" }
"#,
        )
        .unwrap();

        assert_eq!(cfg.preset, Preset::None);
        assert_eq!(cfg.report.min_severity, Severity::Warning);
        assert_eq!(cfg.report.fail_on, Severity::Critical);
        assert_eq!(cfg.categories.len(), 2);
        assert_eq!(cfg.categories[0].reserved, vec!["slots"]);
        assert_eq!(cfg.categories[0].encoding, "utf-8");
        assert_eq!(
            cfg.categories[1].naming,
            NamingStrategy::IdField {
                field: "id".to_owned()
            }
        );
        assert_eq!(cfg.categories[1].pattern, "*.txt");

        let categories = cfg.categories().unwrap();
        assert_eq!(categories.len(), 2);
        assert!(categories[0].is_reserved("slots"));
        assert!(categories[0].matches(&PathKey::new("common/traits/00.txt").unwrap()));
    }

    #[test]
    fn parse_partial_category_uses_defaults() {
        let cfg = ModclashConfig::parse(
            r#"
[[category]]
name = "misc"
directory = "common/misc"
"#,
        )
        .unwrap();
        let entry = &cfg.categories[0];
        assert_eq!(entry.pattern, DEFAULT_PATTERN);
        assert_eq!(entry.merge, MergeBehaviour::UnknownSafety);
        assert_eq!(entry.naming, NamingStrategy::TopLevel);
        assert_eq!(entry.encoding, DEFAULT_ENCODING);
    }

    #[test]
    fn parse_rejects_unknown_top_level_field() {
        let err = ModclashConfig::parse("colour = \"red\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn parse_rejects_unknown_nested_field() {
        let err = ModclashConfig::parse("[report]\nloud = true\n").unwrap_err();
        assert!(err.to_string().contains("loud"), "{err}");
    }

    #[test]
    fn parse_rejects_invalid_severity() {
        assert!(ModclashConfig::parse("[report]\nfail_on = \"doom\"\n").is_err());
    }

    #[test]
    fn parse_includes_line_number_on_error() {
        let toml = "[report]\nmin_severity = \"info\"\nfail_on = 42\n";
        let err = ModclashConfig::parse(toml).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let cfg = ModclashConfig::parse(
            r#"
preset = "none"
[[category]]
name = "broken"
directory = "x"
pattern = "[unclosed"
"#,
        )
        .unwrap();
        let err = cfg.categories().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidPattern { ref category, .. } if category == "broken"
        ));
    }

    #[test]
    fn duplicate_entries_are_rejected() {
        let cfg = ModclashConfig::parse(
            r#"
[[category]]
name = "a"
directory = "x"
[[category]]
name = "a"
directory = "y"
"#,
        )
        .unwrap();
        assert!(matches!(
            cfg.categories().unwrap_err(),
            ConfigError::DuplicateCategory { .. }
        ));
    }

    #[test]
    fn ckii_preset_is_valid() {
        let categories = ModclashConfig::default().categories().unwrap();
        assert!(categories.len() > 60);

        let cultures = categories.iter().find(|c| c.name() == "cultures").unwrap();
        assert_eq!(cultures.directory(), "common/cultures");
        assert!(cultures.is_reserved("graphical_cultures"));
        assert_eq!(
            cultures.behaviour_for(EntityTier::Group),
            Some(MergeBehaviour::MergeGroups)
        );

        let portraits = categories.iter().find(|c| c.name() == "portraits").unwrap();
        assert!(portraits.matches(&PathKey::new("interface/portraits/a.gfx").unwrap()));
        assert!(portraits.matches(&PathKey::new("interface/portraits/a.gui").unwrap()));
        assert!(!portraits.matches(&PathKey::new("interface/portraits/a.txt").unwrap()));
    }

    #[test]
    fn file_entries_override_preset() {
        let cfg = ModclashConfig::parse(
            r#"
[[category]]
name = "traits"
directory = "common/traits"
merge = "replace-last"

[[category]]
name = "my_mod_stuff"
directory = "common/my_mod_stuff"
"#,
        )
        .unwrap();
        let categories = cfg.categories().unwrap();
        let preset_len = Preset::Ckii.categories().unwrap().len();
        assert_eq!(categories.len(), preset_len + 1);
        let traits = categories.iter().find(|c| c.name() == "traits").unwrap();
        assert_eq!(traits.merge_behaviour(), MergeBehaviour::ReplaceLast);
        assert_eq!(categories.last().unwrap().name(), "my_mod_stuff");
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let cfg = ModclashConfig::load(Path::new("/nonexistent/modclash.toml")).unwrap();
        assert_eq!(cfg, ModclashConfig::default());
    }

    #[test]
    fn load_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[report]\nfail_on = \"warning\"\n").unwrap();
        let cfg = ModclashConfig::load(&path).unwrap();
        assert_eq!(cfg.report.fail_on, Severity::Warning);
    }

    #[test]
    fn load_invalid_file_shows_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not valid [[[toml").unwrap();
        let err = ModclashConfig::load(&path).unwrap_err();
        match &err {
            ConfigError::Parse { path: Some(p), .. } => assert_eq!(p, &path),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().starts_with(&path.display().to_string()));
    }

    #[test]
    fn preset_display() {
        assert_eq!(Preset::Ckii.to_string(), "ckii");
        assert_eq!(Preset::None.to_string(), "none");
    }
}
