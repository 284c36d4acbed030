/// Shared data structures for the catalog
///
/// These structs represent the data model that flows between
/// the database layer, the ingestion engine and the UI layer.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::scan::classify::{extension_of, MediaKind};

/// Database id of a catalog entry
pub type EntryId = i64;

/// A single file in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Unique database ID
    pub id: EntryId,
    /// Base name without extension (e.g., "DSC_0001")
    pub name: String,
    /// Lowercased extension (e.g., "nef"), empty if the file has none
    pub file_type: String,
    /// Full path to the source file at ingestion time
    pub original_path: PathBuf,
    /// Path to the generated JPEG thumbnail (RAW files only)
    pub thumbnail_path: Option<PathBuf>,
    /// File creation time, or modification time where creation is unavailable
    pub created_at: Option<DateTime<Utc>>,
}

impl CatalogEntry {
    pub fn kind(&self) -> MediaKind {
        MediaKind::from_extension(&self.file_type)
    }
}

/// A catalog row before the store assigns its id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCatalogEntry {
    pub name: String,
    pub file_type: String,
    pub original_path: PathBuf,
    pub thumbnail_path: Option<PathBuf>,
    pub created_at: Option<DateTime<Utc>>,
}

impl NewCatalogEntry {
    /// Describe a source file, deriving name and type from its path
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            name,
            file_type: extension_of(path),
            original_path: path.to_path_buf(),
            thumbnail_path: None,
            created_at: None,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail_path: Option<PathBuf>) -> Self {
        self.thumbnail_path = thumbnail_path;
        self
    }

    pub fn with_created_at(mut self, created_at: Option<DateTime<Utc>>) -> Self {
        self.created_at = created_at;
        self
    }

    /// The stored entry this becomes once it has an id
    pub fn into_entry(self, id: EntryId) -> CatalogEntry {
        CatalogEntry {
            id,
            name: self.name,
            file_type: self.file_type,
            original_path: self.original_path,
            thumbnail_path: self.thumbnail_path,
            created_at: self.created_at,
        }
    }
}

/// Number of files ingested per media kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    counts: BTreeMap<MediaKind, usize>,
}

impl KindCounts {
    pub fn get(&self, kind: MediaKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, kind: MediaKind) {
        *self.counts.entry(kind).or_insert(0) += 1;
    }

    /// Number of files across every kind
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Kinds with a non-zero count
    pub fn iter(&self) -> impl Iterator<Item = (MediaKind, usize)> + '_ {
        self.counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(kind, count)| (*kind, *count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_from_path() {
        let entry = NewCatalogEntry::from_path(Path::new("/photos/2022/IMG_0042.CR2"));
        assert_eq!(entry.name, "IMG_0042");
        assert_eq!(entry.file_type, "cr2");
        assert_eq!(entry.original_path, PathBuf::from("/photos/2022/IMG_0042.CR2"));
        assert_eq!(entry.thumbnail_path, None);
    }

    #[test]
    fn test_kind_counts() {
        let mut counts = KindCounts::default();
        counts.increment(MediaKind::RawPhoto);
        counts.increment(MediaKind::RawPhoto);
        counts.increment(MediaKind::Other);

        assert_eq!(counts.get(MediaKind::RawPhoto), 2);
        assert_eq!(counts.get(MediaKind::Jpeg), 0);
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.iter().count(), 2);
    }
}
