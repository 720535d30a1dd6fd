//! modclash library crate.
//!
//! Detects overrides and conflicts among layered, dependency-ordered game
//! mods ("sources"). A [`LoadOrder`] is populated once through
//! [`extract::populate`] (or built directly with [`LoadOrderBuilder`]) and
//! then handed to [`check::run`], which never fails: every finding is an
//! [`Alert`].
//!
//! The `modclash` binary lives in `crates/modclash-cli`; this crate exposes
//! everything it uses so integration tests can drive the engine directly.

pub mod check;
pub mod config;
pub mod extract;
pub mod model;
pub mod snapshot;

pub use check::{CheckReport, DependencyGraph, ShadowMap};
pub use config::{ConfigError, ModclashConfig};
pub use extract::{Extractor, Population, SourceManifest, populate};
pub use model::{
    Alert, AlertKind, BuildError, Category, LoadOrder, LoadOrderBuilder, MergeBehaviour, Severity,
};
pub use snapshot::{Snapshot, SnapshotError};
