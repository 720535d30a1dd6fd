//! `modclash shadows`: print every overridden file and what overrides it.

use anyhow::Result;
use serde::Serialize;

use modclash::LoadOrder;
use modclash::check::{resolve_dependencies, resolve_shadowing};
use modclash::model::FileId;

use crate::format::OutputFormat;
use crate::input::{self, InputArgs};

#[derive(Serialize)]
struct FileRef<'a> {
    path: &'a str,
    source: &'a str,
}

#[derive(Serialize)]
struct ShadowedFile<'a> {
    file: FileRef<'a>,
    shadowed_by: Vec<FileRef<'a>>,
}

pub fn run(args: &InputArgs) -> Result<()> {
    let loaded = input::load(args)?;
    let order = &loaded.population.order;
    let graph = resolve_dependencies(order);
    let shadows = resolve_shadowing(order, &graph).map;

    let entries: Vec<ShadowedFile<'_>> = shadows
        .shadowed_files()
        .map(|(file, by)| ShadowedFile {
            file: file_ref(order, file),
            shadowed_by: by.iter().map(|f| file_ref(order, *f)).collect(),
        })
        .collect();

    match args.format {
        OutputFormat::Json => println!("{}", args.format.serialize(&entries)?),
        OutputFormat::Text => {
            input::print_failures(&loaded.population.failures);
            if entries.is_empty() {
                println!("No file is overridden.");
            }
            for entry in &entries {
                println!("\"{}\" in \"{}\"", entry.file.path, entry.file.source);
                for by in &entry.shadowed_by {
                    println!("  overridden by \"{}\" in \"{}\"", by.path, by.source);
                }
            }
        }
    }
    Ok(())
}

fn file_ref(order: &LoadOrder, id: FileId) -> FileRef<'_> {
    let file = order.file(id);
    FileRef {
        path: file.path().as_str(),
        source: order.source(file.source()).name(),
    }
}
