/// Ingestion orchestration
///
/// The engine owns an open catalog and runs ingestion passes over a folder:
/// scan, classify, thumbnail (RAW only), insert. A pass runs on tokio's
/// blocking pool so the caller (typically a UI event loop) is never blocked,
/// and its result is delivered once, to whoever started it, through the
/// returned `IngestHandle`.
///
/// Per-file failures never abort a pass. They are collected in the
/// `IngestReport` next to the files that were cataloged.
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::{EngineError, IngestError, StoreError};
use crate::raw::ThumbnailGenerator;
use crate::scan::{classify, FileExtensionGroup, MediaKind, PathScanner};
use crate::state::{CatalogEntry, CatalogSettings, CatalogStore, EntryId, KindCounts, NewCatalogEntry};

/// Where the engine is in its pass lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Scanning,
    Classifying,
    Ingesting,
    Completed,
}

impl EngineState {
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            EngineState::Scanning | EngineState::Classifying | EngineState::Ingesting
        )
    }
}

/// A file that made it into the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedFile {
    pub id: EntryId,
    pub path: PathBuf,
    pub kind: MediaKind,
    pub thumbnail_path: Option<PathBuf>,
}

/// A per-file failure absorbed by the pass
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: IngestError,
}

/// Result of one ingestion pass
#[derive(Debug)]
pub struct IngestReport {
    pub root: PathBuf,
    /// Final per-kind counts of cataloged files
    pub counts: KindCounts,
    pub succeeded: Vec<IngestedFile>,
    /// Every per-file error. A file whose thumbnail failed is listed here
    /// and in `succeeded`, since it was still cataloged.
    pub failed: Vec<FileFailure>,
    /// Filter group active when the pass completed
    pub group: FileExtensionGroup,
    /// Ids in `group`, ascending
    pub filtered_ids: Vec<EntryId>,
    pub cancelled: bool,
}

impl IngestReport {
    /// The cataloged file for a source path, if any
    pub fn file(&self, path: &Path) -> Option<&IngestedFile> {
        self.succeeded.iter().find(|file| file.path == path)
    }
}

/// Handle on a running pass
#[derive(Debug)]
pub struct IngestHandle {
    cancel: CancellationToken,
    done: oneshot::Receiver<IngestReport>,
}

impl IngestHandle {
    /// Ask the pass to stop before its next file
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the pass to complete
    pub async fn wait(self) -> Result<IngestReport, EngineError> {
        self.done.await.map_err(|_| EngineError::WorkerLost)
    }
}

struct Shared {
    store: Mutex<CatalogStore>,
    state: Mutex<EngineState>,
    counts: Mutex<KindCounts>,
    settings: Mutex<CatalogSettings>,
}

/// Owns a catalog and ingests folders into it
pub struct CatalogEngine {
    shared: Arc<Shared>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CatalogEngine {
    pub fn new(store: CatalogStore, settings: CatalogSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                store: Mutex::new(store),
                state: Mutex::new(EngineState::Idle),
                counts: Mutex::new(KindCounts::default()),
                settings: Mutex::new(settings),
            }),
        }
    }

    /// Start an ingestion pass over `root`
    ///
    /// The catalog is cleared and counts reset before the folder is
    /// scanned. Only one pass may run at a time: starting another while one
    /// is in flight fails with `EngineError::Busy`. Must be called from
    /// within a tokio runtime.
    pub fn ingest(&self, root: &Path) -> Result<IngestHandle, EngineError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| EngineError::NoRuntime)?;

        {
            let mut state = lock(&self.shared.state);
            if state.is_busy() {
                return Err(EngineError::Busy);
            }
            *state = EngineState::Scanning;
        }
        *lock(&self.shared.counts) = KindCounts::default();

        let settings = self.settings();
        let cancel = CancellationToken::new();
        let (tx, done) = oneshot::channel();

        let pass = Pass {
            shared: Arc::clone(&self.shared),
            root: root.to_path_buf(),
            settings,
            cancel: cancel.clone(),
        };
        runtime.spawn_blocking(move || {
            let report = pass.run();
            // The caller may have dropped the handle; nothing else to notify
            let _ = tx.send(report);
        });

        Ok(IngestHandle { cancel, done })
    }

    pub fn state(&self) -> EngineState {
        *lock(&self.shared.state)
    }

    /// Snapshot of the per-kind counts; final only once a pass completed
    pub fn counts(&self) -> KindCounts {
        lock(&self.shared.counts).clone()
    }

    pub fn count(&self, kind: MediaKind) -> usize {
        lock(&self.shared.counts).get(kind)
    }

    pub fn settings(&self) -> CatalogSettings {
        lock(&self.shared.settings).clone()
    }

    /// Whether the next pass scans subfolders
    pub fn set_recursive(&self, recursive: bool) {
        lock(&self.shared.settings).recursive = recursive;
    }

    pub fn active_group(&self) -> FileExtensionGroup {
        lock(&self.shared.settings).active_group
    }

    pub fn set_active_group(&self, group: FileExtensionGroup) {
        lock(&self.shared.settings).active_group = group;
    }

    /// Ids in the active filter group
    pub fn filtered_ids(&self) -> Result<Vec<EntryId>, StoreError> {
        let group = self.active_group();
        lock(&self.shared.store).select_ids_where(group)
    }

    pub fn select_ids_where(&self, group: FileExtensionGroup) -> Result<Vec<EntryId>, StoreError> {
        lock(&self.shared.store).select_ids_where(group)
    }

    pub fn get_by_id(&self, id: EntryId) -> Result<Option<CatalogEntry>, StoreError> {
        lock(&self.shared.store).get_by_id(id)
    }

    /// The `index`-th entry of the active filter group
    pub fn get_by_index(&self, index: usize) -> Result<Option<CatalogEntry>, StoreError> {
        let group = self.active_group();
        lock(&self.shared.store).get_by_index(group, index)
    }

    pub fn missing_originals(&self) -> Result<Vec<EntryId>, StoreError> {
        lock(&self.shared.store).missing_originals()
    }

    /// Close the catalog at the end of a session
    ///
    /// Fails with `Busy` while a pass is still running.
    pub fn shutdown(self) -> Result<(), EngineError> {
        if self.state().is_busy() {
            return Err(EngineError::Busy);
        }
        let shared = Arc::try_unwrap(self.shared).map_err(|_| EngineError::Busy)?;
        let store = shared.store.into_inner().unwrap_or_else(PoisonError::into_inner);
        store.close()?;
        Ok(())
    }
}

impl std::fmt::Debug for CatalogEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogEngine")
            .field("state", &self.state())
            .field("store", &*lock(&self.shared.store))
            .finish()
    }
}

/// One ingestion pass, run on the blocking pool
struct Pass {
    shared: Arc<Shared>,
    root: PathBuf,
    settings: CatalogSettings,
    cancel: CancellationToken,
}

impl Pass {
    fn set_state(&self, state: EngineState) {
        *lock(&self.shared.state) = state;
    }

    fn run(self) -> IngestReport {
        // Marks the pass completed even if something below panics
        let _completion = CompletionGuard(Arc::clone(&self.shared));

        tracing::info!(
            root = %self.root.display(),
            recursive = self.settings.recursive,
            "starting ingestion pass"
        );

        let mut report = IngestReport {
            root: self.root.clone(),
            counts: KindCounts::default(),
            succeeded: Vec::new(),
            failed: Vec::new(),
            group: FileExtensionGroup::All,
            filtered_ids: Vec::new(),
            cancelled: false,
        };

        let (catalog_dir, thumbnails_dir) = {
            let mut store = lock(&self.shared.store);
            if let Err(err) = store.clear() {
                tracing::warn!(error = %err, "could not clear catalog; pass aborted");
                report.failed.push(FileFailure {
                    path: store.path().to_path_buf(),
                    error: err.into(),
                });
                return report;
            }
            (store.catalog_dir().to_path_buf(), store.thumbnails_dir().to_path_buf())
        };

        let scanner = PathScanner::new().exclude(&catalog_dir);
        let generator = ThumbnailGenerator::new(self.settings.thumbnail);

        for item in scanner.scan(&self.root, self.settings.recursive) {
            if self.cancel.is_cancelled() {
                tracing::info!("ingestion pass cancelled");
                report.cancelled = true;
                break;
            }

            let path = match item {
                Ok(path) => path,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable entry");
                    let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                    report.failed.push(FileFailure {
                        path,
                        error: err.into(),
                    });
                    continue;
                }
            };

            self.ingest_file(&path, &generator, &thumbnails_dir, &mut report);
            self.set_state(EngineState::Scanning);
        }

        report.group = lock(&self.shared.settings).active_group;
        match lock(&self.shared.store).select_ids_where(report.group) {
            Ok(ids) => report.filtered_ids = ids,
            Err(err) => {
                tracing::warn!(error = %err, "could not list filtered ids");
                report.failed.push(FileFailure {
                    path: self.root.clone(),
                    error: err.into(),
                });
            }
        }
        report.counts = lock(&self.shared.counts).clone();

        tracing::info!(
            cataloged = report.succeeded.len(),
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "ingestion pass complete"
        );

        report
    }

    fn ingest_file(
        &self,
        path: &Path,
        generator: &ThumbnailGenerator,
        thumbnails_dir: &Path,
        report: &mut IngestReport,
    ) {
        self.set_state(EngineState::Classifying);
        let (kind, _) = classify(path);

        self.set_state(EngineState::Ingesting);
        let thumbnail_path = if kind.is_raw() {
            match generator.generate(path, thumbnails_dir) {
                Ok(thumbnail) => Some(thumbnail),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "thumbnail generation failed");
                    report.failed.push(FileFailure {
                        path: path.to_path_buf(),
                        error: err.into(),
                    });
                    None
                }
            }
        } else {
            None
        };

        let entry = NewCatalogEntry::from_path(path)
            .with_thumbnail(thumbnail_path.clone())
            .with_created_at(creation_date(path));

        let inserted = lock(&self.shared.store).insert(&entry);
        match inserted {
            Ok(id) => {
                lock(&self.shared.counts).increment(kind);
                tracing::debug!(id, path = %path.display(), %kind, "cataloged file");
                report.succeeded.push(IngestedFile {
                    id,
                    path: path.to_path_buf(),
                    kind,
                    thumbnail_path,
                });
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to catalog file");
                // No row references it, so don't leave the thumbnail behind
                if let Some(thumbnail) = &thumbnail_path {
                    let _ = std::fs::remove_file(thumbnail);
                }
                report.failed.push(FileFailure {
                    path: path.to_path_buf(),
                    error: err.into(),
                });
            }
        }
    }
}

struct CompletionGuard(Arc<Shared>);

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        *lock(&self.0.state) = EngineState::Completed;
    }
}

/// Creation time, falling back to modification time
fn creation_date(path: &Path) -> Option<DateTime<Utc>> {
    let metadata = std::fs::metadata(path).ok()?;
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn engine(dir: &TempDir) -> CatalogEngine {
        let store = CatalogStore::create_in(&dir.path().join("catalog")).unwrap();
        CatalogEngine::new(store, CatalogSettings::default())
    }

    #[test]
    fn test_ingest_outside_runtime_is_rejected() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        assert!(matches!(engine.ingest(dir.path()), Err(EngineError::NoRuntime)));
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[tokio::test]
    async fn test_concurrent_ingest_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.jpg"), b"jpeg").unwrap();
        let engine = engine(&dir);

        // Hold the catalog so the first pass cannot finish yet
        let held = lock(&engine.shared.store);
        let first = engine.ingest(dir.path()).unwrap();
        assert!(engine.state().is_busy());
        assert!(matches!(engine.ingest(dir.path()), Err(EngineError::Busy)));
        drop(held);

        let report = first.wait().await.unwrap();
        assert_eq!(report.counts.get(MediaKind::Jpeg), 1);
        assert_eq!(engine.state(), EngineState::Completed);

        // A finished engine accepts the next pass
        let second = engine.ingest(dir.path()).unwrap();
        assert_eq!(second.wait().await.unwrap().succeeded.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_pass_reports_and_completes() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            std::fs::write(dir.path().join(format!("{}.png", i)), b"png").unwrap();
        }
        let engine = engine(&dir);

        let held = lock(&engine.shared.store);
        let handle = engine.ingest(dir.path()).unwrap();
        handle.cancel();
        drop(held);

        let report = handle.wait().await.unwrap();
        assert!(report.cancelled);
        assert!(report.succeeded.is_empty());
        assert_eq!(engine.state(), EngineState::Completed);
    }

    #[tokio::test]
    async fn test_shutdown_after_pass() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        engine.ingest(dir.path()).unwrap().wait().await.unwrap();
        engine.shutdown().unwrap();
    }

    #[test]
    fn test_creation_date_of_missing_file() {
        assert_eq!(creation_date(Path::new("/no/such/file.jpg")), None);
    }
}
