//! Photo catalog ingestion and persistence.
//!
//! Point a [`CatalogEngine`] at a folder and it scans it, classifies every
//! file by extension, renders thumbnails for camera RAW files and records
//! everything in a SQLite catalog that can be filtered by media group.
//!
//! ```no_run
//! use media_catalog::{CatalogEngine, CatalogSettings, CatalogStore, FileExtensionGroup};
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = CatalogStore::create_in(Path::new("/tmp/my-catalog"))?;
//! let engine = CatalogEngine::new(store, CatalogSettings::default());
//!
//! let report = engine.ingest(Path::new("/Volumes/Card/DCIM"))?.wait().await?;
//! println!("{} files, {} failures", report.counts.total(), report.failed.len());
//!
//! let photos = engine.select_ids_where(FileExtensionGroup::Photos)?;
//! println!("{} photos", photos.len());
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod logging;
pub mod raw;
pub mod scan;
pub mod state;

pub use engine::{CatalogEngine, EngineState, FileFailure, IngestHandle, IngestReport, IngestedFile};
pub use error::{EngineError, IngestError, ScanError, SettingsError, StoreError, ThumbnailError};
pub use raw::ThumbnailGenerator;
pub use scan::{classify, FileExtensionGroup, MediaKind, PathScanner};
pub use state::{CatalogEntry, CatalogSettings, CatalogStore, EntryId, KindCounts, NewCatalogEntry};
