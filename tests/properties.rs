//! Property tests for dependency closure, shadowing, and report determinism.
//!
//! Load orders are generated from a small pool of paths and names so that
//! collisions, overrides and cycles show up often.

#![allow(clippy::all, clippy::pedantic, clippy::nursery)]

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use modclash::check::{self, resolve_dependencies, resolve_shadowing};
use modclash::model::{
    AlertKind, Category, EntityTier, FileId, LoadOrder, LoadOrderBuilder, MergeBehaviour, PathKey,
    SourceId,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const MAX_MODS: usize = 5;
const PATHS: [&str; 3] = [
    "common/traits/a.txt",
    "common/traits/b.txt",
    "common/traits/c.txt",
];
const NAMES: [&str; 4] = ["brave", "craven", "shy", "wroth"];

/// Path index to the names defined in that file.
type Files = BTreeMap<usize, Vec<usize>>;

#[derive(Clone, Debug)]
struct ModInput {
    deps: Vec<usize>,
    files: Files,
}

#[derive(Clone, Debug)]
struct LoadInput {
    base: Files,
    mods: Vec<ModInput>,
}

fn dep_name(index: usize) -> String {
    match index {
        i if i < MAX_MODS => format!("m{i}"),
        i if i == MAX_MODS => "Base".to_owned(),
        _ => "ghost".to_owned(),
    }
}

fn arb_files() -> impl Strategy<Value = Files> {
    prop::collection::btree_map(0..PATHS.len(), prop::collection::vec(0..NAMES.len(), 0..4), 0..3)
}

fn arb_mod() -> impl Strategy<Value = ModInput> {
    (prop::collection::vec(0..MAX_MODS + 2, 0..3), arb_files())
        .prop_map(|(deps, files)| ModInput { deps, files })
}

fn arb_load() -> impl Strategy<Value = LoadInput> {
    (arb_files(), prop::collection::vec(arb_mod(), 0..=MAX_MODS))
        .prop_map(|(base, mods)| LoadInput { base, mods })
}

/// A load plus a permutation of its mods.
fn arb_load_and_shuffle() -> impl Strategy<Value = (LoadInput, Vec<usize>)> {
    arb_load().prop_flat_map(|load| {
        let order: Vec<usize> = (0..load.mods.len()).collect();
        (Just(load), Just(order).prop_shuffle())
    })
}

fn add_files(builder: &mut LoadOrderBuilder, source: SourceId, files: &Files) {
    let traits = builder.category_by_name("traits").unwrap();
    for (path, names) in files {
        let file = builder
            .add_file(source, PathKey::new(PATHS[*path]).unwrap(), traits)
            .unwrap();
        for name in names {
            builder.add_definition(file, NAMES[*name], EntityTier::Group);
        }
    }
}

fn build(load: &LoadInput, sequence: &[usize]) -> LoadOrder {
    let mut builder = LoadOrderBuilder::new(vec![Category::new(
        "traits",
        "common/traits",
        MergeBehaviour::FailOnDuplicate,
    )])
    .unwrap();
    let base = builder.baseline("Base").unwrap();
    add_files(&mut builder, base, &load.base);
    for &index in sequence {
        let input = &load.mods[index];
        let source = builder
            .add_source(format!("m{index}"), input.deps.iter().map(|d| dep_name(*d)))
            .unwrap();
        add_files(&mut builder, source, &input.files);
    }
    builder.build().unwrap()
}

fn in_order(load: &LoadInput) -> LoadOrder {
    build(load, &(0..load.mods.len()).collect::<Vec<_>>())
}

/// Rendered alerts as a multiset, independent of arena indices.
fn rendered(order: &LoadOrder) -> Vec<String> {
    let mut alerts: Vec<String> = check::run(order)
        .alerts
        .iter()
        .map(ToString::to_string)
        .collect();
    alerts.sort();
    alerts
}

// ---------------------------------------------------------------------------
// Dependency closure
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn closure_never_contains_self(load in arb_load()) {
        let order = in_order(&load);
        let graph = resolve_dependencies(&order);
        for source in order.sources() {
            prop_assert!(!graph.closure(source.id()).contains(&source.id()));
        }
    }

    #[test]
    fn baseline_is_in_every_other_closure(load in arb_load()) {
        let order = in_order(&load);
        let graph = resolve_dependencies(&order);
        let baseline = order.baseline();
        for source in order.sources() {
            if source.id() == baseline {
                prop_assert!(graph.closure(baseline).is_empty());
            } else {
                prop_assert!(graph.closure(source.id()).contains(&baseline));
            }
        }
    }

    #[test]
    fn closure_is_transitive(load in arb_load()) {
        let order = in_order(&load);
        let graph = resolve_dependencies(&order);
        for source in order.sources() {
            let closure = graph.closure(source.id());
            for dep in closure {
                for indirect in graph.closure(*dep) {
                    prop_assert!(
                        *indirect == source.id() || closure.contains(indirect),
                        "{} reaches {} through {}",
                        source.name(),
                        order.source(*indirect).name(),
                        order.source(*dep).name()
                    );
                }
            }
        }
    }

    #[test]
    fn dependers_invert_closure(load in arb_load()) {
        let order = in_order(&load);
        let graph = resolve_dependencies(&order);
        for a in order.sources() {
            for b in order.sources() {
                prop_assert_eq!(
                    graph.closure(a.id()).contains(&b.id()),
                    graph.dependers_of(b.id()).contains(&a.id())
                );
            }
        }
    }

    #[test]
    fn closure_ignores_load_position((load, shuffle) in arb_load_and_shuffle()) {
        let names = |order: &LoadOrder| -> BTreeMap<String, BTreeSet<String>> {
            let graph = resolve_dependencies(order);
            order
                .sources()
                .iter()
                .map(|s| {
                    let deps = graph
                        .closure(s.id())
                        .iter()
                        .map(|d| order.source(*d).name().to_owned())
                        .collect();
                    (s.name().to_owned(), deps)
                })
                .collect()
        };
        prop_assert_eq!(names(&in_order(&load)), names(&build(&load, &shuffle)));
    }
}

// ---------------------------------------------------------------------------
// Shadowing
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn every_file_is_in_exactly_one_partition(load in arb_load()) {
        let order = in_order(&load);
        let graph = resolve_dependencies(&order);
        let map = resolve_shadowing(&order, &graph).map;

        let unshadowed: BTreeSet<FileId> = map.unshadowed_files().collect();
        let shadowed: BTreeSet<FileId> = map.shadowed_files().map(|(f, _)| f).collect();
        prop_assert!(unshadowed.is_disjoint(&shadowed));
        prop_assert_eq!(unshadowed.len() + shadowed.len(), order.files().len());
    }

    #[test]
    fn shadowers_share_path_and_depend_on_owner(load in arb_load()) {
        let order = in_order(&load);
        let graph = resolve_dependencies(&order);
        let map = resolve_shadowing(&order, &graph).map;

        for (file, by) in map.shadowed_files() {
            let owner = order.file(file);
            prop_assert!(!by.is_empty());
            for other in by {
                let other = order.file(*other);
                prop_assert_eq!(other.path(), owner.path());
                prop_assert!(graph.is_dependency(other.source(), owner.source()));
            }
        }
    }

    #[test]
    fn every_definition_has_exactly_one_fate(load in arb_load()) {
        let order = in_order(&load);
        let graph = resolve_dependencies(&order);
        let result = resolve_shadowing(&order, &graph);
        let unshadowed: BTreeSet<_> = result.map.unshadowed_definitions().collect();

        let mut deleted = 0;
        for definition in order.definitions() {
            let id = definition.id();
            let fates = [
                unshadowed.contains(&id),
                result.map.is_definition_shadowed(id),
                result.map.is_silently_deleted(id),
            ];
            prop_assert_eq!(fates.iter().filter(|f| **f).count(), 1);
            if result.map.is_silently_deleted(id) {
                deleted += 1;
                prop_assert!(result.map.is_file_shadowed(definition.file()));
            }
        }
        prop_assert_eq!(deleted, result.alerts.len());
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn repeated_runs_are_identical(load in arb_load()) {
        let order = in_order(&load);
        prop_assert_eq!(check::run(&order).alerts, check::run(&order).alerts);
    }

    #[test]
    fn alerts_ignore_load_position((load, shuffle) in arb_load_and_shuffle()) {
        prop_assert_eq!(rendered(&in_order(&load)), rendered(&build(&load, &shuffle)));
    }

    #[test]
    fn alert_files_are_sorted_and_never_alone(load in arb_load()) {
        let order = in_order(&load);
        for alert in check::run(&order).alerts {
            let keys: Vec<_> = alert.files().iter().map(|f| (&f.path, &f.source)).collect();
            let mut sorted = keys.clone();
            sorted.sort();
            prop_assert_eq!(&keys, &sorted);
            prop_assert!(alert.files().len() >= 2, "{alert}");

            if alert.kind() == AlertKind::FileConflict {
                let sources: BTreeSet<_> = alert.files().iter().map(|f| &f.source).collect();
                let paths: BTreeSet<_> = alert.files().iter().map(|f| &f.path).collect();
                prop_assert_eq!(sources.len(), alert.files().len());
                prop_assert_eq!(paths.len(), 1);
            }
        }
    }
}
