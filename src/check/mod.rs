//! Override and conflict detection over a frozen [`LoadOrder`].
//!
//! Implements the deps → shadow → classify pipeline. Each step is a separate
//! module and a pure function of its inputs:
//!
//! - **deps**: Resolve declared dependency names into transitive closures
//!   and their inverse ([`DependencyGraph`]).
//! - **shadow**: Partition files and definitions into shadowed and
//!   unshadowed ([`ShadowMap`]); report definitions that vanished from an
//!   overriding file.
//! - **classify**: Report file collisions between non-dependent sources and
//!   name collisions among surviving definitions.
//!
//! # Determinism guarantee
//!
//! The same load order always yields the same report, alert order included:
//!
//! - Every grouping goes through ordered maps keyed by path, name or id.
//! - Alert files are sorted by path key, then source name.
//! - Nothing depends on hash iteration order or on the order in which
//!   dependency names were declared.
//!
//! # Errors
//!
//! None. Unresolvable dependency names and cycles are tolerated; every
//! finding is an [`Alert`].

pub mod classify;
pub mod deps;
pub mod shadow;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::instrument;

use crate::extract::Population;
use crate::model::{Alert, AlertKind, LoadOrder, Severity};

pub use classify::{clean_group, file_conflicts, name_conflicts};
pub use deps::{DependencyGraph, resolve_dependencies};
pub use shadow::{ShadowMap, ShadowResult, resolve_shadowing};

// ---------------------------------------------------------------------------
// CheckReport
// ---------------------------------------------------------------------------

/// Everything one check run produced.
#[derive(Clone, Debug)]
pub struct CheckReport {
    /// Silently deleted definitions, then file conflicts by path, then name
    /// conflicts by name and category.
    pub alerts: Vec<Alert>,
    /// Dependency closure used for the run.
    pub graph: DependencyGraph,
    /// Shadow partitions used for the run.
    pub shadows: ShadowMap,
}

impl CheckReport {
    /// Highest severity among the alerts, if any.
    #[must_use]
    pub fn max_severity(&self) -> Option<Severity> {
        self.alerts.iter().map(Alert::severity).max()
    }

    /// Number of alerts per kind. Kinds with no alerts are absent.
    #[must_use]
    pub fn count_by_kind(&self) -> BTreeMap<AlertKind, usize> {
        let mut counts = BTreeMap::new();
        for alert in &self.alerts {
            *counts.entry(alert.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// Drop alerts below `min`, keeping the order of the rest.
    pub fn retain_min_severity(&mut self, min: Severity) {
        self.alerts.retain(|alert| alert.severity() >= min);
    }

    /// Summary line counts, for serialized output.
    #[must_use]
    pub fn summary(&self) -> Summary {
        Summary {
            alerts: self.alerts.len(),
            max_severity: self.max_severity(),
            by_kind: self.count_by_kind(),
        }
    }
}

/// Aggregate view of a report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Total alerts.
    pub alerts: usize,
    /// Highest severity present.
    pub max_severity: Option<Severity>,
    /// Alerts per kind.
    pub by_kind: BTreeMap<AlertKind, usize>,
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Run the full pipeline over `order`.
#[instrument(
    name = "check",
    skip_all,
    fields(
        sources = order.sources().len(),
        files = order.files().len(),
        definitions = order.definitions().len(),
    )
)]
#[must_use]
pub fn run(order: &LoadOrder) -> CheckReport {
    let graph = resolve_dependencies(order);
    let ShadowResult { map, mut alerts } = resolve_shadowing(order, &graph);
    alerts.extend(file_conflicts(order, &graph));
    alerts.extend(name_conflicts(order, &map));

    tracing::debug!(alerts = alerts.len(), "check finished");
    CheckReport {
        alerts,
        graph,
        shadows: map,
    }
}

/// Run the pipeline over a populated load order and put the population's
/// parse-error alerts in front of the pipeline's own.
#[must_use]
pub fn run_population(population: &Population) -> CheckReport {
    let mut report = run(&population.order);
    report
        .alerts
        .splice(0..0, population.parse_alerts.iter().cloned());
    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
