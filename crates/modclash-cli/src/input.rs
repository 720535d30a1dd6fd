//! Shared input handling: config + snapshot → populated load order.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use modclash::config::CONFIG_FILE_NAME;
use modclash::extract::ExtractFailure;
use modclash::{ModclashConfig, Population, Snapshot};

use crate::format::OutputFormat;

/// Arguments every command takes.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Snapshot of extracted sources (JSON)
    pub snapshot: PathBuf,

    /// Configuration file; a missing file means defaults
    #[arg(long, short, env = "MODCLASH_CONFIG", default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Output format: text or json
    #[arg(long, short, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Everything a command needs.
pub struct Loaded {
    pub config: ModclashConfig,
    pub population: Population,
}

/// Read the config and snapshot and populate the load order.
pub fn load(args: &InputArgs) -> Result<Loaded> {
    let config = ModclashConfig::load(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    let categories = config
        .categories()
        .with_context(|| format!("building category table from {}", args.config.display()))?;

    let snapshot = Snapshot::load(&args.snapshot)?;
    let population = snapshot
        .populate(categories)
        .with_context(|| format!("building load order from {}", args.snapshot.display()))?;

    Ok(Loaded { config, population })
}

/// Serializable view of an extraction failure.
#[derive(Serialize)]
pub struct FailureView<'a> {
    pub source: &'a str,
    pub error: String,
}

impl<'a> From<&'a ExtractFailure> for FailureView<'a> {
    fn from(failure: &'a ExtractFailure) -> Self {
        Self {
            source: &failure.source,
            error: failure.error.to_string(),
        }
    }
}

/// Print extraction failures to stderr (text mode).
pub fn print_failures(failures: &[ExtractFailure]) {
    for failure in failures {
        eprintln!("warning: {}; it is checked as if empty", failure.error);
    }
}
