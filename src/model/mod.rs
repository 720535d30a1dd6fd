//! Load-order data model: identities, categories, the arena, and alerts.

pub mod alert;
pub mod category;
pub mod load_order;
pub mod types;

pub use alert::{Alert, AlertBuilder, AlertFile, AlertKind};
pub use category::{Category, EntityTier, MergeBehaviour, NamingStrategy, Severity};
pub use load_order::{BuildError, Definition, LoadOrder, LoadOrderBuilder, Source, SourceFile};
pub use types::{CategoryId, DefinitionId, FileId, PathKey, SourceId, ValidationError};
