/// State management module
///
/// This module handles all persistent catalog state, including:
/// - Database connection, schema and queries (catalog.rs)
/// - Shared data structures (data.rs)
/// - User-facing settings persisted as JSON (settings.rs)

pub mod catalog;
pub mod data;
pub mod settings;

pub use catalog::CatalogStore;
pub use data::{CatalogEntry, EntryId, KindCounts, NewCatalogEntry};
pub use settings::{CatalogSettings, ThumbnailSettings};
