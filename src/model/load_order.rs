//! The frozen load order: an arena of sources, files, definitions and
//! categories.
//!
//! Everything references everything else by index ([`SourceId`],
//! [`FileId`], [`DefinitionId`], [`CategoryId`]), so a file knows its owning
//! source and a source knows its files without any ownership cycle.
//! [`LoadOrderBuilder`] is the only way to populate an arena; once
//! [`build`](LoadOrderBuilder::build) returns, the load order is immutable.
//!
//! Looking up an id that did not come from the same load order panics.
//! That is a caller bug, not a data problem.

use std::collections::{BTreeMap, HashMap, HashSet};

use thiserror::Error;

use super::category::{Category, EntityTier, MergeBehaviour};
use super::types::{CategoryId, DefinitionId, FileId, PathKey, SourceId};

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A configuration bundle (a mod, or the unmodified base game).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Source {
    id: SourceId,
    name: String,
    dependencies: Vec<String>,
    baseline: bool,
    files: Vec<FileId>,
    files_by_path: BTreeMap<PathKey, FileId>,
    definitions: Vec<DefinitionId>,
}

impl Source {
    /// Arena index.
    #[must_use]
    pub const fn id(&self) -> SourceId {
        self.id
    }

    /// Unique source name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared dependency names, as written. They may not resolve.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Whether this is the baseline source.
    #[must_use]
    pub const fn is_baseline(&self) -> bool {
        self.baseline
    }

    /// Files in insertion order.
    #[must_use]
    pub fn files(&self) -> &[FileId] {
        &self.files
    }

    /// The file with the given key, if this source has one.
    #[must_use]
    pub fn file_by_path(&self, path: &PathKey) -> Option<FileId> {
        self.files_by_path.get(path).copied()
    }

    /// All definitions across this source's files, in insertion order.
    #[must_use]
    pub fn definitions(&self) -> &[DefinitionId] {
        &self.definitions
    }
}

/// One file inside a source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    id: FileId,
    source: SourceId,
    path: PathKey,
    category: CategoryId,
    definitions: Vec<DefinitionId>,
}

impl SourceFile {
    /// Arena index.
    #[must_use]
    pub const fn id(&self) -> FileId {
        self.id
    }

    /// Owning source.
    #[must_use]
    pub const fn source(&self) -> SourceId {
        self.source
    }

    /// Cross-source identity.
    #[must_use]
    pub const fn path(&self) -> &PathKey {
        &self.path
    }

    /// Category the file belongs to.
    #[must_use]
    pub const fn category(&self) -> CategoryId {
        self.category
    }

    /// Definitions found in this file, in extraction order.
    #[must_use]
    pub fn definitions(&self) -> &[DefinitionId] {
        &self.definitions
    }
}

/// A named entity found in a file.
///
/// The category is not stored: it is always the owning file's category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Definition {
    id: DefinitionId,
    file: FileId,
    name: String,
    behaviour: MergeBehaviour,
}

impl Definition {
    /// Arena index.
    #[must_use]
    pub const fn id(&self) -> DefinitionId {
        self.id
    }

    /// Owning file.
    #[must_use]
    pub const fn file(&self) -> FileId {
        self.file
    }

    /// Name as it appears in the file.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Policy in force for this particular definition.
    #[must_use]
    pub const fn behaviour(&self) -> MergeBehaviour {
        self.behaviour
    }
}

// ---------------------------------------------------------------------------
// LoadOrder
// ---------------------------------------------------------------------------

/// An immutable, fully populated list of sources.
#[derive(Clone, Debug)]
pub struct LoadOrder {
    categories: Vec<Category>,
    sources: Vec<Source>,
    files: Vec<SourceFile>,
    definitions: Vec<Definition>,
    baseline: SourceId,
}

impl LoadOrder {
    /// The baseline source.
    #[must_use]
    pub const fn baseline(&self) -> SourceId {
        self.baseline
    }

    /// Sources in load order.
    #[must_use]
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Every file, grouped by source in load order.
    #[must_use]
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Every definition, grouped by source in load order.
    #[must_use]
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// Configured categories.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Look up a source.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this load order.
    #[must_use]
    pub fn source(&self, id: SourceId) -> &Source {
        &self.sources[id.index()]
    }

    /// Look up a file.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this load order.
    #[must_use]
    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.index()]
    }

    /// Look up a definition.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this load order.
    #[must_use]
    pub fn definition(&self, id: DefinitionId) -> &Definition {
        &self.definitions[id.index()]
    }

    /// Look up a category.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this load order.
    #[must_use]
    pub fn category(&self, id: CategoryId) -> &Category {
        &self.categories[id.index()]
    }

    /// Find a source by name.
    #[must_use]
    pub fn source_by_name(&self, name: &str) -> Option<SourceId> {
        self.sources
            .iter()
            .find(|source| source.name == name)
            .map(Source::id)
    }

    /// Find a category by name.
    #[must_use]
    pub fn category_by_name(&self, name: &str) -> Option<CategoryId> {
        self.categories
            .iter()
            .position(|category| category.name() == name)
            .map(CategoryId::from_index)
    }

    /// Category of a definition (its file's category).
    #[must_use]
    pub fn definition_category(&self, id: DefinitionId) -> CategoryId {
        self.file(self.definition(id).file).category
    }

    /// Source owning a definition.
    #[must_use]
    pub fn definition_source(&self, id: DefinitionId) -> SourceId {
        self.file(self.definition(id).file).source
    }

    /// Two definitions are equivalent iff they share category and name.
    #[must_use]
    pub fn equivalent(&self, a: DefinitionId, b: DefinitionId) -> bool {
        self.definition_category(a) == self.definition_category(b)
            && self.definition(a).name == self.definition(b).name
    }
}

// ---------------------------------------------------------------------------
// BuildError
// ---------------------------------------------------------------------------

/// Errors raised while populating a [`LoadOrder`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Two sources share a name.
    #[error("source '{name}' is loaded more than once")]
    DuplicateSource {
        /// The repeated name.
        name: String,
    },

    /// One source contains two files with the same key.
    #[error("source '{source_name}' contains '{path}' more than once")]
    DuplicateFile {
        /// Owning source.
        source_name: String,
        /// The repeated key.
        path: PathKey,
    },

    /// No baseline source was declared.
    #[error("no baseline source was declared")]
    MissingBaseline,

    /// A second baseline was declared.
    #[error("baseline already declared as '{existing}', cannot also use '{name}'")]
    DuplicateBaseline {
        /// The baseline already in place.
        existing: String,
        /// The rejected second baseline.
        name: String,
    },

    /// Two configured categories share a name.
    #[error("category '{name}' is configured more than once")]
    DuplicateCategory {
        /// The repeated name.
        name: String,
    },
}

// ---------------------------------------------------------------------------
// LoadOrderBuilder
// ---------------------------------------------------------------------------

/// Populates a [`LoadOrder`] exactly once.
#[derive(Debug)]
pub struct LoadOrderBuilder {
    order: LoadOrder,
    has_baseline: bool,
    names: HashMap<String, SourceId>,
}

impl LoadOrderBuilder {
    /// Start an empty load order over the given categories.
    ///
    /// # Errors
    /// Returns [`BuildError::DuplicateCategory`] if two categories share a name.
    pub fn new(categories: Vec<Category>) -> Result<Self, BuildError> {
        let mut seen = HashSet::with_capacity(categories.len());
        for category in &categories {
            if !seen.insert(category.name()) {
                return Err(BuildError::DuplicateCategory {
                    name: category.name().to_owned(),
                });
            }
        }
        Ok(Self {
            order: LoadOrder {
                categories,
                sources: Vec::new(),
                files: Vec::new(),
                definitions: Vec::new(),
                baseline: SourceId::from_index(0),
            },
            has_baseline: false,
            names: HashMap::new(),
        })
    }

    /// Declare the baseline source. It never has declared dependencies.
    ///
    /// # Errors
    /// Fails if a baseline already exists or the name is taken.
    pub fn baseline(&mut self, name: impl Into<String>) -> Result<SourceId, BuildError> {
        let name = name.into();
        if self.has_baseline {
            return Err(BuildError::DuplicateBaseline {
                existing: self.order.source(self.order.baseline).name.clone(),
                name,
            });
        }
        let id = self.push_source(name, Vec::new(), true)?;
        self.order.baseline = id;
        self.has_baseline = true;
        Ok(id)
    }

    /// Add a regular source with its declared dependency names.
    ///
    /// # Errors
    /// Returns [`BuildError::DuplicateSource`] if the name is taken.
    pub fn add_source<I, S>(
        &mut self,
        name: impl Into<String>,
        dependencies: I,
    ) -> Result<SourceId, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dependencies = dependencies.into_iter().map(Into::into).collect();
        self.push_source(name.into(), dependencies, false)
    }

    fn push_source(
        &mut self,
        name: String,
        dependencies: Vec<String>,
        baseline: bool,
    ) -> Result<SourceId, BuildError> {
        if self.names.contains_key(&name) {
            return Err(BuildError::DuplicateSource { name });
        }
        let id = SourceId::from_index(self.order.sources.len());
        self.names.insert(name.clone(), id);
        self.order.sources.push(Source {
            id,
            name,
            dependencies,
            baseline,
            files: Vec::new(),
            files_by_path: BTreeMap::new(),
            definitions: Vec::new(),
        });
        Ok(id)
    }

    /// Look up a source added so far.
    #[must_use]
    pub fn source_by_name(&self, name: &str) -> Option<SourceId> {
        self.names.get(name).copied()
    }

    /// Look up a configured category by name.
    #[must_use]
    pub fn category_by_name(&self, name: &str) -> Option<CategoryId> {
        self.order.category_by_name(name)
    }

    /// Configured categories.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.order.categories
    }

    /// Add a file to `source`.
    ///
    /// # Errors
    /// Returns [`BuildError::DuplicateFile`] if the source already has a
    /// file with this key.
    ///
    /// # Panics
    /// Panics if `source` or `category` was not issued by this builder.
    pub fn add_file(
        &mut self,
        source: SourceId,
        path: PathKey,
        category: CategoryId,
    ) -> Result<FileId, BuildError> {
        assert!(
            category.index() < self.order.categories.len(),
            "{category} is not configured in this load order"
        );
        let id = FileId::from_index(self.order.files.len());
        let owner = &mut self.order.sources[source.index()];
        if owner.files_by_path.contains_key(&path) {
            return Err(BuildError::DuplicateFile {
                source_name: owner.name.clone(),
                path,
            });
        }
        owner.files_by_path.insert(path.clone(), id);
        owner.files.push(id);
        self.order.files.push(SourceFile {
            id,
            source,
            path,
            category,
            definitions: Vec::new(),
        });
        Ok(id)
    }

    /// Add a definition found at `tier` in `file`.
    ///
    /// Returns `None` when the category's reserved-name filter rejects the
    /// name or its naming strategy does not track that tier.
    ///
    /// # Panics
    /// Panics if `file` was not issued by this builder.
    pub fn add_definition(
        &mut self,
        file: FileId,
        name: impl Into<String>,
        tier: EntityTier,
    ) -> Option<DefinitionId> {
        let name = name.into();
        let (source, category) = {
            let owner = &self.order.files[file.index()];
            (owner.source, owner.category)
        };
        let category = &self.order.categories[category.index()];
        if category.is_reserved(&name) {
            return None;
        }
        let behaviour = category.behaviour_for(tier)?;

        let id = DefinitionId::from_index(self.order.definitions.len());
        self.order.definitions.push(Definition {
            id,
            file,
            name,
            behaviour,
        });
        self.order.files[file.index()].definitions.push(id);
        self.order.sources[source.index()].definitions.push(id);
        Some(id)
    }

    /// Freeze the load order.
    ///
    /// # Errors
    /// Returns [`BuildError::MissingBaseline`] if no baseline was declared.
    pub fn build(self) -> Result<LoadOrder, BuildError> {
        if !self.has_baseline {
            return Err(BuildError::MissingBaseline);
        }
        Ok(self.order)
    }
}
