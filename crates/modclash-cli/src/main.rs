use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod check;
mod deps;
mod format;
mod input;
mod shadows;
mod telemetry;

/// Override and conflict checker for game mod load orders
///
/// Reads a JSON snapshot of already-extracted mods ("sources") and reports
/// which files and definitions collide between mods that do not depend on
/// each other. A mod that depends on another is expected to override it;
/// that is not reported.
///
/// QUICK START:
///
///   modclash check snapshot.json
///   modclash check snapshot.json --format json --min-severity warning
///   modclash deps snapshot.json
///   modclash shadows snapshot.json
///
/// Categories and report thresholds come from modclash.toml (see
/// --config); without one the built-in Crusader Kings II table is used.
#[derive(Parser)]
#[command(name = "modclash")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(
    after_help = "See 'modclash <command> --help' for more information on a specific command."
)]
struct Cli {
    /// Log output format on stderr: text or json (filter with MODCLASH_LOG)
    #[arg(long, global = true, default_value_t = telemetry::LogFormat::Text)]
    log_format: telemetry::LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report conflicts, silent deletions and parse errors
    ///
    /// Exits with status 1 when any alert reaches the configured
    /// `report.fail_on` severity (default: error).
    Check(check::CheckArgs),

    /// Show each source's transitive dependencies and dependers
    Deps(input::InputArgs),

    /// Show every file overridden by a dependent source
    Shadows(input::InputArgs),
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    telemetry::init(cli.log_format);

    match cli.command {
        Commands::Check(ref args) => check::run(args),
        Commands::Deps(ref args) => deps::run(args).map(|()| ExitCode::SUCCESS),
        Commands::Shadows(ref args) => shadows::run(args).map(|()| ExitCode::SUCCESS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_accepts_overrides() {
        let cli = Cli::try_parse_from([
            "modclash",
            "check",
            "snap.json",
            "--format",
            "json",
            "--min-severity",
            "warning",
            "--fail-on",
            "critical",
        ])
        .unwrap();
        let Commands::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert_eq!(args.input.format, format::OutputFormat::Json);
        assert_eq!(args.min_severity, Some(modclash::Severity::Warning));
        assert_eq!(args.fail_on, Some(modclash::Severity::Critical));
    }

    #[test]
    fn rejects_unknown_severity() {
        assert!(
            Cli::try_parse_from(["modclash", "check", "snap.json", "--min-severity", "loud"])
                .is_err()
        );
    }
}
