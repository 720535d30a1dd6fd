//! DEPENDENCY step of the check pipeline.
//!
//! Computes, for every source, the set of sources it transitively depends on
//! and the inverse (who transitively depends on it).
//!
//! # Rules
//!
//! - Declared names that match no loaded source are dropped silently.
//! - Cycles are tolerated: each traversal keeps a visited set.
//! - A source never appears in its own closure.
//! - The baseline is in the closure of every other source, declared or not.

use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::model::{LoadOrder, SourceId};

// ---------------------------------------------------------------------------
// DependencyGraph
// ---------------------------------------------------------------------------

/// Transitive dependency closure of a load order, and its inverse.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    closure: Vec<BTreeSet<SourceId>>,
    dependers: Vec<BTreeSet<SourceId>>,
}

impl DependencyGraph {
    /// Every source `source` transitively depends on, excluding itself.
    ///
    /// # Panics
    /// Panics if `source` is not part of the resolved load order.
    #[must_use]
    pub fn closure(&self, source: SourceId) -> &BTreeSet<SourceId> {
        &self.closure[source.index()]
    }

    /// Every source that transitively depends on `source`.
    ///
    /// # Panics
    /// Panics if `source` is not part of the resolved load order.
    #[must_use]
    pub fn dependers_of(&self, source: SourceId) -> &BTreeSet<SourceId> {
        &self.dependers[source.index()]
    }

    /// Whether `depender` transitively depends on `dependee`.
    #[must_use]
    pub fn is_dependency(&self, depender: SourceId, dependee: SourceId) -> bool {
        self.closure
            .get(depender.index())
            .is_some_and(|deps| deps.contains(&dependee))
    }

    /// Number of sources covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.closure.len()
    }

    /// Whether no sources are covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.closure.is_empty()
    }
}

// ---------------------------------------------------------------------------
// resolve_dependencies
// ---------------------------------------------------------------------------

/// Resolve declared dependency names into transitive closures.
///
/// Breadth-first per source, O(sources × edges) overall.
#[must_use]
pub fn resolve_dependencies(order: &LoadOrder) -> DependencyGraph {
    let by_name: HashMap<&str, SourceId> = order
        .sources()
        .iter()
        .map(|source| (source.name(), source.id()))
        .collect();
    let baseline = order.baseline();

    let closure: Vec<BTreeSet<SourceId>> = order
        .sources()
        .iter()
        .map(|source| {
            let start = source.id();
            let mut visited = BTreeSet::new();
            let mut queue = VecDeque::from([start]);

            while let Some(next) = queue.pop_front() {
                for name in order.source(next).dependencies() {
                    let Some(&dependee) = by_name.get(name.as_str()) else {
                        continue;
                    };
                    if dependee != start && visited.insert(dependee) {
                        queue.push_back(dependee);
                    }
                }
            }

            if start != baseline {
                visited.insert(baseline);
            }
            visited
        })
        .collect();

    let mut dependers = vec![BTreeSet::new(); closure.len()];
    for (index, deps) in closure.iter().enumerate() {
        let depender = order.sources()[index].id();
        for dependee in deps {
            dependers[dependee.index()].insert(depender);
        }
    }

    tracing::debug!(
        sources = closure.len(),
        edges = closure.iter().map(BTreeSet::len).sum::<usize>(),
        "resolved dependency closure"
    );

    DependencyGraph { closure, dependers }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
