//! CLASSIFY step of the check pipeline.
//!
//! Two independent passes, both grouping through ordered maps so alert
//! order follows the group key:
//!
//! - **File conflicts** key every file of the load by path and look at which
//!   sources ship it. Compatibility patches are removed from each group
//!   before deciding (see [`clean_group`]).
//! - **Name conflicts** key the *unshadowed* definitions by name, then by
//!   category, and consult the category policy.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{
    Alert, AlertBuilder, AlertKind, CategoryId, DefinitionId, FileId, LoadOrder, PathKey,
    Severity, SourceId,
};

use super::deps::DependencyGraph;
use super::shadow::ShadowMap;

/// Message attached to every file conflict.
pub const FILE_CONFLICT_MESSAGE: &str = "File name conflict between non-dependent sources.";

// ---------------------------------------------------------------------------
// File conflicts
// ---------------------------------------------------------------------------

/// Report path keys shipped by sources that do not depend on each other.
///
/// Files sharing a key may carry different categories when an extractor
/// names them explicitly. The alert takes the category of the involved file
/// loaded first.
#[must_use]
pub fn file_conflicts(order: &LoadOrder, graph: &DependencyGraph) -> Vec<Alert> {
    let mut by_path: BTreeMap<&PathKey, Vec<FileId>> = BTreeMap::new();
    for file in order.files() {
        by_path.entry(file.path()).or_default().push(file.id());
    }

    let baseline = order.baseline();
    let mut alerts = Vec::new();
    for (path, files) in by_path {
        if files.len() < 2 {
            continue;
        }
        let members: Vec<SourceId> = files.iter().map(|f| order.file(*f).source()).collect();
        let cleaned = clean_group(&members, baseline, graph);
        let reportable =
            cleaned.len() > 2 || (cleaned.len() > 1 && !cleaned.contains(&baseline));
        if !reportable {
            tracing::trace!(
                %path,
                members = members.len(),
                kept = cleaned.len(),
                "file collision suppressed"
            );
            continue;
        }

        let involved: Vec<FileId> = files
            .iter()
            .copied()
            .filter(|f| cleaned.contains(&order.file(*f).source()))
            .collect();
        // Lowest file id, i.e. the file added to the load order first.
        let category = order.category(order.file(involved[0]).category()).name();
        alerts.push(
            AlertBuilder::new(order, Severity::Warning, AlertKind::FileConflict, category)
                .files(involved)
                .message(FILE_CONFLICT_MESSAGE)
                .build(),
        );
    }
    alerts
}

/// Drop every non-baseline member that another member depends on.
///
/// The decision for each member looks at the whole original group, so
/// removing one patch target never rescues another. The baseline is never
/// dropped.
#[must_use]
pub fn clean_group(
    members: &[SourceId],
    baseline: SourceId,
    graph: &DependencyGraph,
) -> BTreeSet<SourceId> {
    members
        .iter()
        .copied()
        .filter(|&member| {
            member == baseline
                || !members
                    .iter()
                    .any(|&other| other != member && graph.is_dependency(other, member))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Name conflicts
// ---------------------------------------------------------------------------

/// Report names defined in more than one surviving file of a category.
#[must_use]
pub fn name_conflicts(order: &LoadOrder, shadows: &ShadowMap) -> Vec<Alert> {
    let mut by_name: BTreeMap<&str, BTreeMap<CategoryId, Vec<DefinitionId>>> = BTreeMap::new();
    for id in shadows.unshadowed_definitions() {
        by_name
            .entry(order.definition(id).name())
            .or_default()
            .entry(order.definition_category(id))
            .or_default()
            .push(id);
    }

    let mut alerts = Vec::new();
    for (name, categories) in by_name {
        for (category, definitions) in categories {
            if definitions.len() < 2 {
                continue;
            }
            let files: BTreeSet<FileId> = definitions
                .iter()
                .map(|d| order.definition(*d).file())
                .collect();
            if files.len() < 2 {
                continue;
            }

            // Group order is definition order, so the first definition in
            // load order decides the policy.
            let behaviour = order.definition(definitions[0]).behaviour();
            if !behaviour.is_reportable() {
                continue;
            }

            let category = order.category(category).name();
            alerts.push(
                AlertBuilder::new(
                    order,
                    behaviour.default_severity(),
                    AlertKind::NameConflict,
                    category,
                )
                .files(files)
                .entity(name)
                .message(format!(
                    "An instance of type {category} with name \"{name}\" is defined in multiple distinct files.\n{}",
                    behaviour.description()
                ))
                .build(),
            );
        }
    }
    alerts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
