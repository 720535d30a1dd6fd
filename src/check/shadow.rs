//! SHADOW step of the check pipeline.
//!
//! By the loading convention "dependents override dependencies", a file is
//! shadowed when some source that transitively depends on its owner ships a
//! file with the same path key. A definition inside a shadowed file is
//! shadowed when an equivalent definition (same category and name) exists
//! somewhere among those dependers; if none exists, the overriding file
//! dropped it and a silently-deleted alert is raised.
//!
//! ```text
//! Base: common/traits/00.txt { brave, craven }
//! A (deps Base): common/traits/00.txt { brave }
//!
//! files:        Base:00.txt shadowed by {A:00.txt}; A:00.txt unshadowed
//! definitions:  Base:brave shadowed by {A:brave}
//!               Base:craven silently deleted
//! ```
//!
//! When several dependers could override, all of them are kept: load order
//! between them is not declared, so any one may win at runtime.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::model::{
    Alert, AlertBuilder, AlertKind, CategoryId, DefinitionId, FileId, LoadOrder, Severity,
};

use super::deps::DependencyGraph;

// ---------------------------------------------------------------------------
// ShadowMap
// ---------------------------------------------------------------------------

/// Partition of files and definitions into shadowed and unshadowed.
///
/// Silently deleted definitions belong to neither side.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShadowMap {
    unshadowed_files: BTreeSet<FileId>,
    file_shadowers: BTreeMap<FileId, BTreeSet<FileId>>,
    unshadowed_definitions: BTreeSet<DefinitionId>,
    definition_shadowers: BTreeMap<DefinitionId, BTreeSet<DefinitionId>>,
    deleted_definitions: BTreeSet<DefinitionId>,
}

impl ShadowMap {
    /// Files nothing can override.
    pub fn unshadowed_files(&self) -> impl Iterator<Item = FileId> + '_ {
        self.unshadowed_files.iter().copied()
    }

    /// Shadowed files with the files overriding them.
    pub fn shadowed_files(&self) -> impl Iterator<Item = (FileId, &BTreeSet<FileId>)> + '_ {
        self.file_shadowers.iter().map(|(file, by)| (*file, by))
    }

    /// Whether a dependent source overrides `file`.
    #[must_use]
    pub fn is_file_shadowed(&self, file: FileId) -> bool {
        self.file_shadowers.contains_key(&file)
    }

    /// Files overriding `file`, if it is shadowed.
    #[must_use]
    pub fn file_shadowers(&self, file: FileId) -> Option<&BTreeSet<FileId>> {
        self.file_shadowers.get(&file)
    }

    /// Definitions that survive into the effective configuration untouched.
    pub fn unshadowed_definitions(&self) -> impl Iterator<Item = DefinitionId> + '_ {
        self.unshadowed_definitions.iter().copied()
    }

    /// Shadowed definitions with their equivalents among the dependers.
    pub fn shadowed_definitions(
        &self,
    ) -> impl Iterator<Item = (DefinitionId, &BTreeSet<DefinitionId>)> + '_ {
        self.definition_shadowers.iter().map(|(def, by)| (*def, by))
    }

    /// Whether an equivalent definition in a depender overrides `definition`.
    #[must_use]
    pub fn is_definition_shadowed(&self, definition: DefinitionId) -> bool {
        self.definition_shadowers.contains_key(&definition)
    }

    /// Definitions overriding `definition`, if it is shadowed.
    #[must_use]
    pub fn definition_shadowers(
        &self,
        definition: DefinitionId,
    ) -> Option<&BTreeSet<DefinitionId>> {
        self.definition_shadowers.get(&definition)
    }

    /// Whether `definition` was dropped by an overriding file.
    #[must_use]
    pub fn is_silently_deleted(&self, definition: DefinitionId) -> bool {
        self.deleted_definitions.contains(&definition)
    }

    /// Count of unshadowed definitions.
    #[must_use]
    pub fn unshadowed_definition_count(&self) -> usize {
        self.unshadowed_definitions.len()
    }
}

/// Output of [`resolve_shadowing`].
#[derive(Clone, Debug, Default)]
pub struct ShadowResult {
    /// The partitions.
    pub map: ShadowMap,
    /// One silently-deleted alert per vanished definition.
    pub alerts: Vec<Alert>,
}

// ---------------------------------------------------------------------------
// resolve_shadowing
// ---------------------------------------------------------------------------

/// Partition every file and definition of `order` using `graph`.
#[must_use]
pub fn resolve_shadowing(order: &LoadOrder, graph: &DependencyGraph) -> ShadowResult {
    let mut map = ShadowMap::default();

    // Files.
    for file in order.files() {
        let dependers = graph.dependers_of(file.source());
        let by: BTreeSet<FileId> = dependers
            .iter()
            .filter_map(|depender| order.source(*depender).file_by_path(file.path()))
            .collect();
        if by.is_empty() {
            map.unshadowed_files.insert(file.id());
        } else {
            map.file_shadowers.insert(file.id(), by);
        }
    }

    // Definitions.
    let mut equivalents: HashMap<(CategoryId, &str), Vec<DefinitionId>> = HashMap::new();
    for definition in order.definitions() {
        equivalents
            .entry((order.definition_category(definition.id()), definition.name()))
            .or_default()
            .push(definition.id());
    }

    let mut alerts = Vec::new();
    for source in order.sources() {
        let dependers = graph.dependers_of(source.id());
        if dependers.is_empty() {
            map.unshadowed_definitions
                .extend(source.definitions().iter().copied());
            continue;
        }

        for &id in source.definitions() {
            let definition = order.definition(id);
            let Some(overriding_files) = map.file_shadowers.get(&definition.file()) else {
                map.unshadowed_definitions.insert(id);
                continue;
            };

            let category = order.definition_category(id);
            let by: BTreeSet<DefinitionId> = equivalents
                .get(&(category, definition.name()))
                .into_iter()
                .flatten()
                .copied()
                .filter(|other| dependers.contains(&order.definition_source(*other)))
                .collect();

            if by.is_empty() {
                let category_name = order.category(category).name();
                let involved =
                    std::iter::once(definition.file()).chain(overriding_files.iter().copied());
                alerts.push(
                    AlertBuilder::new(
                        order,
                        Severity::Warning,
                        AlertKind::SilentlyDeleted,
                        category_name,
                    )
                    .files(involved)
                    .entity(definition.name())
                    .message(format!(
                        "An instance of type {category_name} with name \"{}\" was deleted in some overriding file(s).",
                        definition.name()
                    ))
                    .build(),
                );
                map.deleted_definitions.insert(id);
            } else {
                map.definition_shadowers.insert(id, by);
            }
        }
    }

    tracing::debug!(
        unshadowed_files = map.unshadowed_files.len(),
        shadowed_files = map.file_shadowers.len(),
        unshadowed_definitions = map.unshadowed_definitions.len(),
        shadowed_definitions = map.definition_shadowers.len(),
        silently_deleted = alerts.len(),
        "resolved shadowing"
    );

    ShadowResult { map, alerts }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::check::deps::resolve_dependencies;
    use crate::model::{Category, EntityTier, LoadOrderBuilder, MergeBehaviour, PathKey, SourceId};

    struct Fixture {
        builder: LoadOrderBuilder,
        sources: HashMap<&'static str, SourceId>,
    }

    impl Fixture {
        /// Base plus `A` depending on it.
        fn new() -> Self {
            let mut builder = LoadOrderBuilder::new(vec![Category::new(
                "traits",
                "common/traits",
                MergeBehaviour::FailOnDuplicate,
            )])
            .unwrap();
            let base = builder.baseline("Base").unwrap();
            let a = builder.add_source("A", ["Base"]).unwrap();
            Self {
                builder,
                sources: HashMap::from([("Base", base), ("A", a)]),
            }
        }

        fn source(&mut self, name: &'static str, deps: &[&str]) {
            let id = self.builder.add_source(name, deps.iter().copied()).unwrap();
            self.sources.insert(name, id);
        }

        fn file(&mut self, source: &str, path: &str, names: &[&str]) -> FileId {
            let category = self.builder.category_by_name("traits").unwrap();
            let file = self
                .builder
                .add_file(self.sources[source], PathKey::new(path).unwrap(), category)
                .unwrap();
            for name in names {
                self.builder.add_definition(file, *name, EntityTier::Group);
            }
            file
        }

        fn resolve(self) -> (LoadOrder, ShadowResult) {
            let order = self.builder.build().unwrap();
            let result = resolve_shadowing(&order, &resolve_dependencies(&order));
            (order, result)
        }
    }

    fn def(order: &LoadOrder, source: &str, name: &str) -> DefinitionId {
        let source = order.source_by_name(source).unwrap();
        order
            .source(source)
            .definitions()
            .iter()
            .copied()
            .find(|id| order.definition(*id).name() == name)
            .unwrap()
    }

    #[test]
    fn file_without_dependers_is_unshadowed() {
        let mut fx = Fixture::new();
        let a = fx.file("A", "common/traits/00.txt", &["brave"]);
        let (_, result) = fx.resolve();

        assert!(!result.map.is_file_shadowed(a));
        assert!(result.map.unshadowed_files().any(|f| f == a));
        assert!(result.alerts.is_empty());
    }

    #[test]
    fn overridden_file_and_kept_definition_are_shadowed() {
        let mut fx = Fixture::new();
        let base = fx.file("Base", "common/traits/00.txt", &["brave"]);
        let a = fx.file("A", "common/traits/00.txt", &["brave"]);
        let (order, result) = fx.resolve();

        assert_eq!(result.map.file_shadowers(base), Some(&BTreeSet::from([a])));
        let base_brave = def(&order, "Base", "brave");
        let a_brave = def(&order, "A", "brave");
        assert_eq!(
            result.map.definition_shadowers(base_brave),
            Some(&BTreeSet::from([a_brave]))
        );
        assert!(result.map.unshadowed_definitions().any(|d| d == a_brave));
        assert!(!result.map.unshadowed_definitions().any(|d| d == base_brave));
        assert!(result.alerts.is_empty());
    }

    #[test]
    fn dropped_definition_is_silently_deleted() {
        let mut fx = Fixture::new();
        let base = fx.file("Base", "common/traits/00.txt", &["brave", "craven"]);
        let a = fx.file("A", "common/traits/00.txt", &["brave"]);
        let (order, result) = fx.resolve();

        assert_eq!(result.alerts.len(), 1);
        let alert = &result.alerts[0];
        assert_eq!(alert.kind(), AlertKind::SilentlyDeleted);
        assert_eq!(alert.severity(), Severity::Warning);
        assert_eq!(alert.entity(), Some("craven"));
        assert_eq!(alert.category(), "traits");
        assert_eq!(
            alert.message(),
            "An instance of type traits with name \"craven\" was deleted in some overriding file(s)."
        );
        // Same path, so sorted by source name: A before Base.
        let files: Vec<_> = alert.files().iter().map(|f| f.file).collect();
        assert_eq!(files, vec![a, base]);

        let craven = def(&order, "Base", "craven");
        assert!(result.map.is_silently_deleted(craven));
        assert!(!result.map.is_definition_shadowed(craven));
        assert!(!result.map.unshadowed_definitions().any(|d| d == craven));
    }

    #[test]
    fn definition_moved_to_another_depender_file_is_shadowed() {
        let mut fx = Fixture::new();
        fx.file("Base", "common/traits/00.txt", &["brave"]);
        fx.file("A", "common/traits/00.txt", &[]);
        fx.file("A", "common/traits/01.txt", &["brave"]);
        let (order, result) = fx.resolve();

        assert!(result.alerts.is_empty());
        assert!(result.map.is_definition_shadowed(def(&order, "Base", "brave")));
    }

    #[test]
    fn definition_in_unshadowed_file_survives_even_with_dependers() {
        let mut fx = Fixture::new();
        fx.file("Base", "common/traits/00.txt", &["brave"]);
        fx.file("A", "common/traits/01.txt", &["brave"]);
        let (_, result) = fx.resolve();

        assert!(result.alerts.is_empty());
        assert_eq!(result.map.unshadowed_definition_count(), 2);
    }

    #[test]
    fn equivalents_outside_dependers_do_not_shadow() {
        let mut fx = Fixture::new();
        fx.source("B", &["Base"]);
        fx.source("C", &["A"]);
        fx.file("A", "common/traits/00.txt", &["brave"]);
        fx.file("C", "common/traits/00.txt", &[]);
        // B defines it too, but B does not depend on A.
        fx.file("B", "common/traits/05.txt", &["brave"]);
        let (order, result) = fx.resolve();

        assert_eq!(result.alerts.len(), 1);
        assert!(result.map.is_silently_deleted(def(&order, "A", "brave")));
    }

    #[test]
    fn all_overriding_dependers_are_kept() {
        let mut fx = Fixture::new();
        fx.source("B", &["Base"]);
        let base = fx.file("Base", "common/traits/00.txt", &["brave"]);
        let a = fx.file("A", "common/traits/00.txt", &["brave"]);
        let b = fx.file("B", "common/traits/00.txt", &["brave"]);
        let (order, result) = fx.resolve();

        assert_eq!(result.map.file_shadowers(base), Some(&BTreeSet::from([a, b])));
        assert_eq!(
            result
                .map
                .definition_shadowers(def(&order, "Base", "brave"))
                .map(BTreeSet::len),
            Some(2)
        );
    }
}
