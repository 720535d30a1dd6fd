//! `modclash check`: run the full pipeline and print alerts.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use modclash::check::{self, Summary};
use modclash::{Alert, Severity};

use crate::format::OutputFormat;
use crate::input::{self, FailureView, InputArgs};

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Hide alerts below this severity (overrides `report.min_severity`)
    #[arg(long, value_name = "SEVERITY")]
    pub min_severity: Option<Severity>,

    /// Exit non-zero when an alert reaches this severity (overrides
    /// `report.fail_on`)
    #[arg(long, value_name = "SEVERITY")]
    pub fail_on: Option<Severity>,
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    alerts: &'a [Alert],
    failures: Vec<FailureView<'a>>,
    summary: Summary,
    failed: bool,
}

pub fn run(args: &CheckArgs) -> Result<ExitCode> {
    let loaded = input::load(&args.input)?;
    let population = &loaded.population;
    let min_severity = args
        .min_severity
        .unwrap_or(loaded.config.report.min_severity);
    let fail_on = args.fail_on.unwrap_or(loaded.config.report.fail_on);

    let mut report = check::run_population(population);

    // Decided on every alert, shown or not.
    let failed = report.max_severity().is_some_and(|max| max >= fail_on);
    report.retain_min_severity(min_severity);

    match args.input.format {
        OutputFormat::Json => {
            let output = CheckOutput {
                alerts: &report.alerts,
                failures: population.failures.iter().map(FailureView::from).collect(),
                summary: report.summary(),
                failed,
            };
            println!("{}", args.input.format.serialize(&output)?);
        }
        OutputFormat::Text => {
            input::print_failures(&population.failures);
            for alert in &report.alerts {
                println!("{alert}\n");
            }
            print_summary(&report.summary(), min_severity);
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_summary(summary: &Summary, min_severity: Severity) {
    if summary.alerts == 0 {
        println!("No alerts at or above {min_severity}.");
        return;
    }
    let kinds: Vec<String> = summary
        .by_kind
        .iter()
        .map(|(kind, count)| format!("{count} {}", kind.label().to_lowercase()))
        .collect();
    println!(
        "{} alert(s) at or above {min_severity}: {}",
        summary.alerts,
        kinds.join(", ")
    );
}
