use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, Type, Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OpenFlags, OptionalExtension, Row};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::data::{CatalogEntry, EntryId, NewCatalogEntry};
use super::settings::CATALOG_FILE;
use crate::error::StoreError;
use crate::scan::classify::{photo_extensions, VIDEO_EXTENSIONS};
use crate::scan::FileExtensionGroup;

/// Thumbnail folder next to the schema file
pub const THUMBNAILS_DIR: &str = "thumbnails";

const SELECT_COLUMNS: &str = "Id, Name, Type, OriginalPath, ThumbnailPath, CreationDate";

/// The CatalogStore manages the SQLite catalog database.
/// It stores one row per ingested file and owns the thumbnails folder
/// that sits next to the database file.
pub struct CatalogStore {
    conn: Connection,
    db_path: PathBuf,
    thumbnails_dir: PathBuf,
}

impl CatalogStore {
    /// Create a new catalog at `db_path`.
    ///
    /// Fails with `AlreadyExists` if anything is already at that path; the
    /// existing file is left untouched. If schema creation fails the new
    /// file is removed again.
    pub fn create(db_path: &Path) -> Result<Self, StoreError> {
        let io_error = |source| StoreError::Io {
            path: db_path.to_path_buf(),
            source,
        };

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        // Claim the path atomically so a concurrent create cannot clobber it
        match OpenOptions::new().write(true).create_new(true).open(db_path) {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(db_path.to_path_buf()))
            }
            Err(source) => return Err(io_error(source)),
        }

        let created = Connection::open(db_path)
            .map_err(StoreError::from)
            .and_then(|mut conn| {
                Self::init_schema(&mut conn)?;
                Ok(conn)
            });

        let conn = match created {
            Ok(conn) => conn,
            Err(err) => {
                let _ = fs::remove_file(db_path);
                return Err(err);
            }
        };

        let store = Self::with_connection(conn, db_path)?;
        fs::create_dir_all(&store.thumbnails_dir).map_err(|source| StoreError::Io {
            path: store.thumbnails_dir.clone(),
            source,
        })?;

        tracing::info!(path = %store.db_path.display(), "created catalog");
        Ok(store)
    }

    /// Open an existing catalog at `db_path`
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if !db_path.is_file() {
            return Err(StoreError::NotFound(db_path.to_path_buf()));
        }

        // Same as the default flags, minus CREATE
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(db_path, flags)?;

        let has_files_table = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'Files'",
            [],
            |row| row.get::<_, i64>(0),
        );
        match has_files_table {
            Ok(1) => {}
            Ok(_) => return Err(StoreError::NotACatalog(db_path.to_path_buf())),
            Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::NotADatabase => {
                return Err(StoreError::NotACatalog(db_path.to_path_buf()))
            }
            Err(err) => return Err(err.into()),
        }

        let store = Self::with_connection(conn, db_path)?;
        fs::create_dir_all(&store.thumbnails_dir).map_err(|source| StoreError::Io {
            path: store.thumbnails_dir.clone(),
            source,
        })?;

        tracing::info!(path = %store.db_path.display(), "opened catalog");
        Ok(store)
    }

    /// Create a catalog inside `dir` using the standard file name
    pub fn create_in(dir: &Path) -> Result<Self, StoreError> {
        Self::create(&dir.join(CATALOG_FILE))
    }

    /// Open the catalog inside `dir`
    pub fn open_in(dir: &Path) -> Result<Self, StoreError> {
        Self::open(&dir.join(CATALOG_FILE))
    }

    /// Wrap an open connection; `db_path` must exist so it can be made absolute
    fn with_connection(conn: Connection, db_path: &Path) -> Result<Self, StoreError> {
        let db_path = fs::canonicalize(db_path).map_err(|source| StoreError::Io {
            path: db_path.to_path_buf(),
            source,
        })?;
        let thumbnails_dir = db_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(THUMBNAILS_DIR);

        Ok(Self {
            conn,
            db_path,
            thumbnails_dir,
        })
    }

    /// Create the Files table and its index in a single transaction
    fn init_schema(conn: &mut Connection) -> Result<(), StoreError> {
        let tx = conn.transaction()?;

        tx.execute(
            "CREATE TABLE Files (
                Id              INTEGER PRIMARY KEY AUTOINCREMENT,
                Name            TEXT NOT NULL,
                Type            TEXT NOT NULL,
                OriginalPath    TEXT NOT NULL,
                ThumbnailPath   TEXT,
                CreationDate    TEXT
            )",
            [],
        )?;

        // Group filters are all predicates over Type
        tx.execute("CREATE INDEX idx_files_type ON Files(Type)", [])?;

        tx.commit()?;
        Ok(())
    }

    /// Get the path to the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Folder that holds this catalog's thumbnails
    pub fn thumbnails_dir(&self) -> &Path {
        &self.thumbnails_dir
    }

    /// Folder that holds the database file and the thumbnails folder
    pub fn catalog_dir(&self) -> &Path {
        self.db_path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Add a file to the catalog and return its new id
    pub fn insert(&self, entry: &NewCatalogEntry) -> Result<EntryId, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO Files (Name, Type, OriginalPath, ThumbnailPath, CreationDate)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;

        stmt.execute(params![
            entry.name,
            entry.file_type,
            path_to_sql(&entry.original_path),
            entry.thumbnail_path.as_deref().map(path_to_sql),
            entry
                .created_at
                .map(|date| date.to_rfc3339_opts(SecondsFormat::Nanos, true)),
        ])?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Look up one entry by id
    pub fn get_by_id(&self, id: EntryId) -> Result<Option<CatalogEntry>, StoreError> {
        let sql = format!("SELECT {} FROM Files WHERE Id = ?1", SELECT_COLUMNS);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let entry = stmt.query_row([id], entry_from_row).optional()?;
        Ok(entry)
    }

    /// The `index`-th entry (ascending id) among those in `group`
    pub fn get_by_index(
        &self,
        group: FileExtensionGroup,
        index: usize,
    ) -> Result<Option<CatalogEntry>, StoreError> {
        // No group can hold more than i64::MAX rows
        let Ok(offset) = i64::try_from(index) else {
            return Ok(None);
        };
        let (predicate, mut values) = group_predicate(group);
        values.push(Value::Integer(offset));

        let sql = format!(
            "SELECT {} FROM Files WHERE {} ORDER BY Id LIMIT 1 OFFSET ?",
            SELECT_COLUMNS, predicate
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let entry = stmt
            .query_row(params_from_iter(values), entry_from_row)
            .optional()?;
        Ok(entry)
    }

    /// Ids of every entry in `group`, ascending
    pub fn select_ids_where(&self, group: FileExtensionGroup) -> Result<Vec<EntryId>, StoreError> {
        let (predicate, values) = group_predicate(group);
        let sql = format!("SELECT Id FROM Files WHERE {} ORDER BY Id", predicate);

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let ids = stmt
            .query_map(params_from_iter(values), |row| row.get(0))?
            .collect::<Result<Vec<EntryId>, _>>()?;
        Ok(ids)
    }

    /// Number of entries in `group`
    pub fn count(&self, group: FileExtensionGroup) -> Result<usize, StoreError> {
        let (predicate, values) = group_predicate(group);
        let sql = format!("SELECT COUNT(*) FROM Files WHERE {}", predicate);

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let count: i64 = stmt.query_row(params_from_iter(values), |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Remove every entry and every generated thumbnail
    ///
    /// Ids are never reused afterwards (AUTOINCREMENT).
    pub fn clear(&mut self) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM Files", [])?;
        tx.commit()?;

        let io_error = |path: &Path, source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        match fs::read_dir(&self.thumbnails_dir) {
            Ok(entries) => {
                for entry in entries {
                    let entry = entry.map_err(|e| io_error(self.thumbnails_dir.as_path(), e))?;
                    let path = entry.path();
                    if path.is_file() {
                        fs::remove_file(&path).map_err(|e| io_error(&path, e))?;
                    }
                }
            }
            // Nothing of ours to purge if the folder is gone or was replaced
            Err(_) if !self.thumbnails_dir.is_dir() => {}
            Err(err) => return Err(io_error(self.thumbnails_dir.as_path(), err)),
        }

        tracing::debug!(removed, "cleared catalog");
        Ok(removed)
    }

    /// Ids of entries whose original file no longer exists on disk
    ///
    /// Entries are reported, not changed.
    pub fn missing_originals(&self) -> Result<Vec<EntryId>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT Id, OriginalPath FROM Files ORDER BY Id")?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, EntryId>(0)?, row.get::<_, StoredPath>(1)?.0)))?
            .collect::<Result<Vec<_>, _>>()?;

        let missing: Vec<EntryId> = rows
            .into_iter()
            .filter(|(_, path)| !path.exists())
            .map(|(id, _)| id)
            .collect();

        if !missing.is_empty() {
            tracing::warn!(count = missing.len(), "catalog entries point at missing files");
        }

        Ok(missing)
    }

    /// Close the connection, reporting any error SQLite raises on close
    pub fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, err)| StoreError::from(err))
    }
}

/// Static WHERE clause for a group plus the extension values it binds
fn group_predicate(group: FileExtensionGroup) -> (String, Vec<Value>) {
    let text = |ext: &str| Value::Text(ext.to_string());

    match group {
        FileExtensionGroup::All => ("1 = 1".to_string(), Vec::new()),
        FileExtensionGroup::Photos => {
            let values: Vec<Value> = photo_extensions().map(text).collect();
            (format!("Type IN ({})", placeholders(values.len())), values)
        }
        FileExtensionGroup::Videos => {
            let values: Vec<Value> = VIDEO_EXTENSIONS.iter().copied().map(text).collect();
            (format!("Type IN ({})", placeholders(values.len())), values)
        }
        FileExtensionGroup::Others => {
            let values: Vec<Value> = photo_extensions()
                .chain(VIDEO_EXTENSIONS.iter().copied())
                .map(text)
                .collect();
            (format!("Type NOT IN ({})", placeholders(values.len())), values)
        }
    }
}

/// "?, ?, ?" for `count` bound parameters
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Paths go in as TEXT when they are valid UTF-8 and as the raw OS bytes
/// (BLOB) otherwise, so a file name is never altered on the way in.
fn path_to_sql(path: &Path) -> Value {
    match path.to_str() {
        Some(text) => Value::Text(text.to_string()),
        None => Value::Blob(path_bytes(path)),
    }
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(bytes))
}

// Only unix paths can be arbitrary bytes
#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

/// A path column read back from either storage class
struct StoredPath(PathBuf);

impl FromSql for StoredPath {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(_) => value.as_str().map(|text| StoredPath(PathBuf::from(text))),
            ValueRef::Blob(bytes) => Ok(StoredPath(path_from_bytes(bytes))),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<CatalogEntry> {
    let created_at = match row.get::<_, Option<String>>(5)? {
        Some(text) => Some(
            DateTime::parse_from_rfc3339(&text)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?
                .with_timezone(&Utc),
        ),
        None => None,
    };

    Ok(CatalogEntry {
        id: row.get(0)?,
        name: row.get(1)?,
        file_type: row.get(2)?,
        original_path: row.get::<_, StoredPath>(3)?.0,
        thumbnail_path: row.get::<_, Option<StoredPath>>(4)?.map(|stored| stored.0),
        created_at,
    })
}

// Implement Debug for better error messages
impl std::fmt::Debug for CatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogStore")
            .field("db_path", &self.db_path)
            .field("thumbnails_dir", &self.thumbnails_dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn new_store() -> (TempDir, CatalogStore) {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::create_in(dir.path()).unwrap();
        (dir, store)
    }

    fn entry(path: &str) -> NewCatalogEntry {
        NewCatalogEntry::from_path(Path::new(path))
    }

    #[test]
    fn test_create_makes_schema_and_thumbnails_dir() {
        let (dir, store) = new_store();
        assert!(dir.path().join(CATALOG_FILE).is_file());
        assert!(dir.path().join(THUMBNAILS_DIR).is_dir());
        let canonical = dir.path().canonicalize().unwrap();
        assert_eq!(store.path(), canonical.join(CATALOG_FILE));
        assert_eq!(store.thumbnails_dir(), canonical.join(THUMBNAILS_DIR));
        assert_eq!(store.count(FileExtensionGroup::All).unwrap(), 0);
    }

    #[test]
    fn test_create_over_existing_file_fails_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CATALOG_FILE);
        fs::write(&path, b"precious bytes").unwrap();

        let err = CatalogStore::create(&path).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(fs::read(&path).unwrap(), b"precious bytes");
    }

    #[test]
    fn test_create_over_existing_catalog_fails() {
        let (dir, store) = new_store();
        store.insert(&entry("/p/a.arw")).unwrap();
        store.close().unwrap();
        let before = fs::read(dir.path().join(CATALOG_FILE)).unwrap();

        let err = CatalogStore::create_in(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(fs::read(dir.path().join(CATALOG_FILE)).unwrap(), before);

        let reopened = CatalogStore::open_in(dir.path()).unwrap();
        assert_eq!(reopened.count(FileExtensionGroup::All).unwrap(), 1);
    }

    #[test]
    fn test_open_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = CatalogStore::open_in(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(!dir.path().join(CATALOG_FILE).exists());
    }

    #[test]
    fn test_open_foreign_file_is_not_a_catalog() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "this is not sqlite, just plain text\n".repeat(64)).unwrap();
        assert!(matches!(
            CatalogStore::open(&path),
            Err(StoreError::NotACatalog(_))
        ));

        let other_db = dir.path().join("other.sqlite");
        Connection::open(&other_db)
            .unwrap()
            .execute("CREATE TABLE Things (Id INTEGER)", [])
            .unwrap();
        assert!(matches!(
            CatalogStore::open(&other_db),
            Err(StoreError::NotACatalog(_))
        ));
    }

    #[test]
    fn test_insert_then_get_round_trip() {
        let (_dir, store) = new_store();
        let new_entry = entry("/photos/DSC_0001.NEF")
            .with_thumbnail(Some(PathBuf::from("/cat/thumbnails/DSC_0001.jpg")))
            .with_created_at(Some(Utc.with_ymd_and_hms(2022, 6, 5, 10, 30, 0).unwrap()));

        let id = store.insert(&new_entry).unwrap();
        let fetched = store.get_by_id(id).unwrap().unwrap();

        assert_eq!(fetched, new_entry.into_entry(id));
        assert_eq!(fetched.name, "DSC_0001");
        assert_eq!(fetched.file_type, "nef");
    }

    #[test]
    fn test_get_by_id_absent() {
        let (_dir, store) = new_store();
        assert_eq!(store.get_by_id(42).unwrap(), None);
    }

    #[test]
    fn test_values_are_bound_not_interpolated() {
        let (_dir, store) = new_store();
        let nasty = entry("/tmp/it's'); DROP TABLE Files; --.jpg");
        let id = store.insert(&nasty).unwrap();

        assert_eq!(store.get_by_id(id).unwrap().unwrap().original_path, nasty.original_path);
        assert_eq!(store.count(FileExtensionGroup::All).unwrap(), 1);
    }

    #[test]
    fn test_select_all_is_ascending_and_idempotent() {
        let (_dir, store) = new_store();
        let ids: Vec<EntryId> = ["/a.arw", "/b.jpg", "/c.txt", "/d.gif"]
            .iter()
            .map(|p| store.insert(&entry(p)).unwrap())
            .collect();

        let first = store.select_ids_where(FileExtensionGroup::All).unwrap();
        let second = store.select_ids_where(FileExtensionGroup::All).unwrap();
        assert_eq!(first, ids);
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_group_filters() {
        let (_dir, store) = new_store();
        let raw = store.insert(&entry("/a.ARW")).unwrap();
        let jpg = store.insert(&entry("/b.jpeg")).unwrap();
        let gif = store.insert(&entry("/c.gif")).unwrap();
        let mov = store.insert(&entry("/d.mov")).unwrap();
        let txt = store.insert(&entry("/e.unknownext")).unwrap();
        let bare = store.insert(&entry("/README")).unwrap();

        assert_eq!(store.select_ids_where(FileExtensionGroup::Photos).unwrap(), vec![raw, jpg]);
        assert_eq!(store.select_ids_where(FileExtensionGroup::Videos).unwrap(), vec![gif, mov]);
        assert_eq!(store.select_ids_where(FileExtensionGroup::Others).unwrap(), vec![txt, bare]);
        assert_eq!(store.count(FileExtensionGroup::Photos).unwrap(), 2);
    }

    #[test]
    fn test_get_by_index_within_group() {
        let (_dir, store) = new_store();
        store.insert(&entry("/a.txt")).unwrap();
        let b = store.insert(&entry("/b.png")).unwrap();
        let c = store.insert(&entry("/c.webp")).unwrap();

        let photos = FileExtensionGroup::Photos;
        assert_eq!(store.get_by_index(photos, 0).unwrap().unwrap().id, b);
        assert_eq!(store.get_by_index(photos, 1).unwrap().unwrap().id, c);
        assert_eq!(store.get_by_index(photos, 2).unwrap(), None);
        assert_eq!(store.get_by_index(FileExtensionGroup::All, 2).unwrap().unwrap().id, c);
    }

    #[test]
    fn test_get_by_index_past_i64_range_is_none() {
        let (_dir, store) = new_store();
        store.insert(&entry("/a.jpg")).unwrap();

        assert_eq!(store.get_by_index(FileExtensionGroup::All, usize::MAX).unwrap(), None);
        assert_eq!(store.get_by_index(FileExtensionGroup::Photos, usize::MAX).unwrap(), None);
    }

    // Linux file systems accept any bytes in a name; macOS ones do not
    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_paths_round_trip() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (dir, store) = new_store();
        let original = dir.path().join(OsStr::from_bytes(b"caf\xe9.jpg"));
        fs::write(&original, b"jpeg").unwrap();
        let thumbnail = store.thumbnails_dir().join(OsStr::from_bytes(b"caf\xe9.jpg"));
        assert!(original.to_str().is_none());

        let new_entry = NewCatalogEntry::from_path(&original).with_thumbnail(Some(thumbnail));
        let id = store.insert(&new_entry).unwrap();

        assert_eq!(store.get_by_id(id).unwrap().unwrap(), new_entry.into_entry(id));
        assert!(store.missing_originals().unwrap().is_empty());
        assert_eq!(store.select_ids_where(FileExtensionGroup::Photos).unwrap(), vec![id]);
    }

    #[test]
    fn test_catalog_path_is_canonicalized() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("sub").join("..").join("cat");
        let store = CatalogStore::create_in(&nested).unwrap();

        let expected = dir.path().canonicalize().unwrap().join("cat");
        assert_eq!(store.catalog_dir(), expected);
        assert_eq!(store.thumbnails_dir(), expected.join(THUMBNAILS_DIR));
        store.close().unwrap();

        let reopened = CatalogStore::open_in(&nested).unwrap();
        assert_eq!(reopened.path(), expected.join(CATALOG_FILE));
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_catalog_path_gives_absolute_thumbnails() {
        let dir = TempDir::new().unwrap();
        // Reach the temp dir relative to the working directory
        let cwd = std::env::current_dir().unwrap();
        let up: PathBuf = cwd.components().skip(1).map(|_| "..").collect();
        let relative = up.join(dir.path().strip_prefix("/").unwrap()).join("cat");
        assert!(relative.is_relative());

        let store = CatalogStore::create_in(&relative).unwrap();
        assert!(store.path().is_absolute());
        assert!(store.thumbnails_dir().is_absolute());

        let id = store
            .insert(&entry("/a.arw").with_thumbnail(Some(store.thumbnails_dir().join("a.jpg"))))
            .unwrap();
        let stored = store.get_by_id(id).unwrap().unwrap();
        assert!(stored.thumbnail_path.unwrap().is_absolute());
    }

    #[test]
    fn test_clear_removes_rows_and_thumbnails_without_reusing_ids() {
        let (_dir, mut store) = new_store();
        let first = store.insert(&entry("/a.arw")).unwrap();
        fs::write(store.thumbnails_dir().join("a.jpg"), b"jpeg").unwrap();

        assert_eq!(store.clear().unwrap(), 1);
        assert!(store.select_ids_where(FileExtensionGroup::All).unwrap().is_empty());
        assert!(!store.thumbnails_dir().join("a.jpg").exists());

        let next = store.insert(&entry("/a.arw")).unwrap();
        assert!(next > first);
    }

    #[test]
    fn test_clear_tolerates_replaced_thumbnails_dir() {
        let (_dir, mut store) = new_store();
        store.insert(&entry("/a.jpg")).unwrap();
        fs::remove_dir(store.thumbnails_dir()).unwrap();
        fs::write(store.thumbnails_dir(), b"not a folder").unwrap();

        assert_eq!(store.clear().unwrap(), 1);
        assert!(store.thumbnails_dir().is_file());
    }

    #[test]
    fn test_missing_originals_reports_without_mutating() {
        let (dir, store) = new_store();
        let present = dir.path().join("here.jpg");
        fs::write(&present, b"x").unwrap();

        store.insert(&NewCatalogEntry::from_path(&present)).unwrap();
        let gone = store.insert(&entry("/definitely/not/here.jpg")).unwrap();

        assert_eq!(store.missing_originals().unwrap(), vec![gone]);
        assert_eq!(store.count(FileExtensionGroup::All).unwrap(), 2);
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(3), "?, ?, ?");
        assert_eq!(placeholders(0), "");
    }
}
