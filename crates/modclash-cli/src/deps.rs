//! `modclash deps`: print the resolved dependency closure.

use std::collections::BTreeSet;

use anyhow::Result;
use serde::Serialize;

use modclash::LoadOrder;
use modclash::check::resolve_dependencies;
use modclash::model::SourceId;

use crate::format::OutputFormat;
use crate::input::{self, FailureView, InputArgs};

#[derive(Serialize)]
struct SourceDeps<'a> {
    source: &'a str,
    baseline: bool,
    declared: &'a [String],
    dependencies: Vec<&'a str>,
    dependers: Vec<&'a str>,
}

#[derive(Serialize)]
struct DepsOutput<'a> {
    sources: Vec<SourceDeps<'a>>,
    failures: Vec<FailureView<'a>>,
}

pub fn run(args: &InputArgs) -> Result<()> {
    let loaded = input::load(args)?;
    let order = &loaded.population.order;
    let graph = resolve_dependencies(order);

    let sources: Vec<SourceDeps<'_>> = order
        .sources()
        .iter()
        .map(|source| SourceDeps {
            source: source.name(),
            baseline: source.is_baseline(),
            declared: source.dependencies(),
            dependencies: names(order, graph.closure(source.id())),
            dependers: names(order, graph.dependers_of(source.id())),
        })
        .collect();

    match args.format {
        OutputFormat::Json => {
            let output = DepsOutput {
                sources,
                failures: loaded
                    .population
                    .failures
                    .iter()
                    .map(FailureView::from)
                    .collect(),
            };
            println!("{}", args.format.serialize(&output)?);
        }
        OutputFormat::Text => {
            input::print_failures(&loaded.population.failures);
            for entry in &sources {
                let marker = if entry.baseline { " (baseline)" } else { "" };
                println!("{}{marker}", entry.source);
                println!("  depends on:     {}", list(&entry.dependencies));
                println!("  depended on by: {}", list(&entry.dependers));
                let unresolved: Vec<&str> = entry
                    .declared
                    .iter()
                    .map(String::as_str)
                    .filter(|name| order.source_by_name(name).is_none())
                    .collect();
                if !unresolved.is_empty() {
                    println!("  not loaded:     {}", unresolved.join(", "));
                }
            }
        }
    }
    Ok(())
}

fn names<'a>(order: &'a LoadOrder, ids: &BTreeSet<SourceId>) -> Vec<&'a str> {
    let mut names: Vec<&str> = ids.iter().map(|id| order.source(*id).name()).collect();
    names.sort_unstable();
    names
}

fn list(names: &[&str]) -> String {
    if names.is_empty() {
        "(none)".to_owned()
    } else {
        names.join(", ")
    }
}
