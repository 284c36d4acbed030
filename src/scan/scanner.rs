/// Folder traversal for ingestion
///
/// Produces candidate file paths under a root folder. Recursive scans walk
/// the whole tree with walkdir; flat scans list only the root's children.
/// Entries that fail to read are yielded as errors so the caller can log
/// and skip them without stopping the scan.
use crate::error::ScanError;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Finder sentinel file, never cataloged
pub const DS_STORE: &str = ".DS_Store";

/// Directory extensions treated as opaque packages (not descended into)
pub const PACKAGE_EXTENSIONS: &[&str] = &[
    "app", "bundle", "framework", "plugin", "kext",
    "photoslibrary", "fcpbundle", "xcodeproj", "pkg", "lrdata",
];

/// Walks folders and yields file paths
#[derive(Debug, Clone, Default)]
pub struct PathScanner {
    excluded: Vec<PathBuf>,
}

impl PathScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never yield anything at or below `path` (used for the catalog's own folder)
    pub fn exclude(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.excluded.push(path);
        self
    }

    /// Start a scan of `root`
    ///
    /// The returned iterator is lazy; calling `scan` again with the same
    /// arguments restarts from scratch. Yielded paths are absolute.
    pub fn scan(&self, root: &Path, recursive: bool) -> ScanIter {
        let state = match fs::canonicalize(root) {
            Ok(root) if recursive => ScanState::Walk(
                WalkDir::new(root)
                    .follow_links(false)
                    .sort_by_file_name()
                    .into_iter(),
            ),
            Ok(root) => ScanState::Flat { root, entries: None },
            Err(source) => ScanState::Failed(Some(ScanError::Io {
                path: root.to_path_buf(),
                source,
            })),
        };

        ScanIter {
            state,
            excluded: self.excluded.clone(),
        }
    }
}

enum ScanState {
    Walk(walkdir::IntoIter),
    Flat {
        root: PathBuf,
        entries: Option<fs::ReadDir>,
    },
    Failed(Option<ScanError>),
    Done,
}

/// Lazy sequence of scanned file paths
pub struct ScanIter {
    state: ScanState,
    excluded: Vec<PathBuf>,
}

impl ScanIter {
    fn is_excluded(&self, path: &Path) -> bool {
        self.excluded.iter().any(|ex| path.starts_with(ex))
    }

    fn next_walk(&mut self) -> Option<Result<PathBuf, ScanError>> {
        loop {
            let ScanState::Walk(walker) = &mut self.state else {
                return None;
            };
            let entry = match walker.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(ScanError::Walk(err))),
            };

            // The root itself is exempt from the hidden/package rules
            if entry.depth() == 0 {
                continue;
            }

            let is_dir = entry.file_type().is_dir();
            let skip = is_hidden(entry.path())
                || (is_dir && is_package(entry.path()))
                || self.is_excluded(entry.path());

            if skip {
                if is_dir {
                    if let ScanState::Walk(walker) = &mut self.state {
                        walker.skip_current_dir();
                    }
                }
                continue;
            }

            // Symlinks are reported as symlinks (not followed), so they never match
            if entry.file_type().is_file() {
                return Some(Ok(entry.into_path()));
            }
        }
    }

    fn next_flat(&mut self) -> Option<Result<PathBuf, ScanError>> {
        loop {
            let ScanState::Flat { root, entries } = &mut self.state else {
                return None;
            };

            if entries.is_none() {
                match fs::read_dir(&*root) {
                    Ok(read_dir) => *entries = Some(read_dir),
                    Err(source) => {
                        let path = root.clone();
                        self.state = ScanState::Done;
                        return Some(Err(ScanError::Io { path, source }));
                    }
                }
            }

            let read_dir = entries.as_mut()?;
            let entry = match read_dir.next()? {
                Ok(entry) => entry,
                Err(source) => {
                    return Some(Err(ScanError::Io {
                        path: root.clone(),
                        source,
                    }))
                }
            };

            let path = entry.path();
            if entry.file_name() == DS_STORE || self.is_excluded(&path) {
                continue;
            }

            // Resolve symlinks so a link to a folder is still treated as a folder
            match fs::metadata(&path) {
                Ok(meta) if meta.is_file() => return Some(Ok(path)),
                Ok(_) => continue,
                Err(source) => return Some(Err(ScanError::Io { path, source })),
            }
        }
    }
}

impl Iterator for ScanIter {
    type Item = Result<PathBuf, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.state {
            ScanState::Walk(_) => self.next_walk(),
            ScanState::Flat { .. } => self.next_flat(),
            ScanState::Failed(err) => {
                let err = err.take();
                self.state = ScanState::Done;
                err.map(Err)
            }
            ScanState::Done => None,
        }
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

fn is_package(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            PACKAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs::File;
    use tempfile::TempDir;

    fn names(paths: impl IntoIterator<Item = PathBuf>) -> BTreeSet<String> {
        paths
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        File::create(root.join("a.arw")).unwrap();
        File::create(root.join("b.jpg")).unwrap();
        File::create(root.join(DS_STORE)).unwrap();
        File::create(root.join(".hidden.png")).unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        File::create(root.join("sub/c.nef")).unwrap();
        fs::create_dir(root.join(".secret")).unwrap();
        File::create(root.join(".secret/d.jpg")).unwrap();
        fs::create_dir(root.join("Photos.photoslibrary")).unwrap();
        File::create(root.join("Photos.photoslibrary/e.heic")).unwrap();
        dir
    }

    #[test]
    fn test_flat_scan_excludes_directories_and_ds_store() {
        let dir = fixture();
        let found: Vec<PathBuf> = PathScanner::new()
            .scan(dir.path(), false)
            .collect::<Result<_, _>>()
            .unwrap();

        assert!(found.iter().all(|p| p.is_file()));
        let found = names(found);
        assert!(!found.contains(DS_STORE));
        assert!(!found.contains("sub"));
        assert!(found.contains("a.arw"));
        assert!(found.contains("b.jpg"));
        assert!(!found.contains("c.nef"));
    }

    #[test]
    fn test_recursive_scan_skips_hidden_and_packages() {
        let dir = fixture();
        let found: Vec<PathBuf> = PathScanner::new()
            .scan(dir.path(), true)
            .collect::<Result<_, _>>()
            .unwrap();

        let expected: BTreeSet<String> =
            ["a.arw", "b.jpg", "c.nef"].iter().map(|s| s.to_string()).collect();
        assert_eq!(names(found.clone()), expected);
        assert!(found.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn test_scan_is_restartable() {
        let dir = fixture();
        let scanner = PathScanner::new();
        let first: BTreeSet<_> = scanner.scan(dir.path(), true).filter_map(Result::ok).collect();
        let second: BTreeSet<_> = scanner.scan(dir.path(), true).filter_map(Result::ok).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_excluded_folder_is_pruned() {
        let dir = fixture();
        fs::create_dir(dir.path().join("catalog")).unwrap();
        File::create(dir.path().join("catalog/thumb.jpg")).unwrap();

        let scanner = PathScanner::new().exclude(dir.path().join("catalog"));
        let found = names(scanner.scan(dir.path(), true).filter_map(Result::ok));
        assert!(!found.contains("thumb.jpg"));
        assert!(found.contains("a.arw"));
    }

    #[test]
    fn test_missing_root_yields_single_error() {
        let dir = TempDir::new().unwrap();
        let mut iter = PathScanner::new().scan(&dir.path().join("nope"), true);
        assert!(matches!(iter.next(), Some(Err(ScanError::Io { .. }))));
        assert!(iter.next().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_recursive_scan_does_not_follow_symlink_loops() {
        let dir = fixture();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("sub/loop")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("a.arw"), dir.path().join("link.arw")).unwrap();

        let found: Vec<PathBuf> = PathScanner::new()
            .scan(dir.path(), true)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(found.len(), 3);
        assert!(!names(found).contains("link.arw"));
    }
}
