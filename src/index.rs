//! Persisted index of cached repositories
//!
//! One [`CachedRepository`] row per URL. The index is what `has` and `add`
//! consult; the directory layout alone is not trusted, since a directory can
//! be left behind by a crash or belong to a colliding URL.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::repository::VcsKind;

/// File name of the index inside the cache root.
pub const INDEX_FILE: &str = "repositories.json";

/// A repository mirrored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRepository {
    pub id: Uuid,
    /// Fetch/clone URL, unique across the index.
    pub url: String,
    #[serde(rename = "type")]
    pub vcs: VcsKind,
    /// Absolute filesystem location.
    pub location: PathBuf,
    /// When the entry was added.
    pub created_at: DateTime<Utc>,
    /// Time of the last fetch or pull.
    pub updated_at: DateTime<Utc>,
}

impl CachedRepository {
    pub fn new(url: &str, vcs: VcsKind, location: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            url: url.to_string(),
            vcs,
            location,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rows with a nil id are treated as not committed.
    pub fn is_committed(&self) -> bool {
        !self.id.is_nil()
    }
}

/// Storage for [`CachedRepository`] rows.
pub trait RepoIndex: Send + Sync {
    /// Look up the row for `url`.
    fn get(&self, url: &str) -> Result<Option<CachedRepository>>;

    /// Insert a new row; fails with `AlreadyExists` if the URL is present.
    fn insert(&self, record: CachedRepository) -> Result<()>;

    /// Set `updated_at` of the row for `url`.
    fn touch(&self, url: &str, at: DateTime<Utc>) -> Result<()>;

    /// All rows, ordered by URL.
    fn list(&self) -> Result<Vec<CachedRepository>>;
}

type Rows = BTreeMap<String, CachedRepository>;

fn lock_rows<'a>(rows: &'a Mutex<Rows>) -> Result<std::sync::MutexGuard<'a, Rows>> {
    rows.lock().map_err(|_| Error::LockPoisoned {
        context: "repository index".to_string(),
    })
}

fn insert_row(rows: &mut Rows, record: CachedRepository) -> Result<()> {
    if rows.contains_key(&record.url) {
        return Err(Error::AlreadyExists { url: record.url });
    }
    rows.insert(record.url.clone(), record);
    Ok(())
}

fn touch_row(rows: &mut Rows, url: &str, at: DateTime<Utc>) -> Result<()> {
    match rows.get_mut(url) {
        Some(row) => {
            row.updated_at = at;
            Ok(())
        }
        None => Err(Error::UncachedRepository {
            url: url.to_string(),
        }),
    }
}

/// Index kept in memory only. Used by tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    rows: Mutex<Rows>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepoIndex for MemoryIndex {
    fn get(&self, url: &str) -> Result<Option<CachedRepository>> {
        Ok(lock_rows(&self.rows)?.get(url).cloned())
    }

    fn insert(&self, record: CachedRepository) -> Result<()> {
        insert_row(&mut *lock_rows(&self.rows)?, record)
    }

    fn touch(&self, url: &str, at: DateTime<Utc>) -> Result<()> {
        touch_row(&mut *lock_rows(&self.rows)?, url, at)
    }

    fn list(&self) -> Result<Vec<CachedRepository>> {
        Ok(lock_rows(&self.rows)?.values().cloned().collect())
    }
}

/// Index persisted as a JSON document.
///
/// Every mutation rewrites the file through a temporary file in the same
/// directory followed by a rename, so readers never observe a half-written
/// index. Several handles (or processes) may share one file: each operation
/// holds an advisory lock on `<file>.lock` and re-reads the document first,
/// so a mutation never drops rows written through another handle.
#[derive(Debug)]
pub struct FileIndex {
    path: PathBuf,
    lock_path: PathBuf,
    rows: Mutex<Rows>,
}

impl FileIndex {
    /// Open the index at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut lock_name = path.clone().into_os_string();
        lock_name.push(".lock");
        let rows = load_rows(&path)?;

        Ok(Self {
            path,
            lock_path: PathBuf::from(lock_name),
            rows: Mutex::new(rows),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_file(&self) -> Result<File> {
        if let Some(dir) = self.lock_path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?;
        Ok(file)
    }

    /// Reload the rows under a shared lock and run `f` on them.
    fn read<T>(&self, f: impl FnOnce(&Rows) -> T) -> Result<T> {
        let mut rows = lock_rows(&self.rows)?;
        let lock = self.lock_file()?;
        lock.lock_shared()?;
        *rows = load_rows(&self.path)?;
        Ok(f(&rows))
    }

    /// Reload the rows under an exclusive lock, apply `f` and persist.
    ///
    /// The in-memory rows are only replaced once the file is written.
    fn update(&self, f: impl FnOnce(&mut Rows) -> Result<()>) -> Result<()> {
        let mut rows = lock_rows(&self.rows)?;
        let lock = self.lock_file()?;
        lock.lock_exclusive()?;
        let mut fresh = load_rows(&self.path)?;
        f(&mut fresh)?;
        self.persist(&fresh)?;
        *rows = fresh;
        Ok(())
    }

    fn persist(&self, rows: &Rows) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let records: Vec<&CachedRepository> = rows.values().collect();
        let json = serde_json::to_vec_pretty(&records)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

fn load_rows(path: &Path) -> Result<Rows> {
    if !path.exists() {
        return Ok(Rows::new());
    }
    let raw = fs::read_to_string(path)?;
    let records: Vec<CachedRepository> = serde_json::from_str(&raw).map_err(|e| Error::Index {
        message: format!("{} is corrupt: {}", path.display(), e),
    })?;
    Ok(records
        .into_iter()
        .map(|record| (record.url.clone(), record))
        .collect())
}

impl RepoIndex for FileIndex {
    fn get(&self, url: &str) -> Result<Option<CachedRepository>> {
        self.read(|rows| rows.get(url).cloned())
    }

    fn insert(&self, record: CachedRepository) -> Result<()> {
        self.update(|rows| insert_row(rows, record))
    }

    fn touch(&self, url: &str, at: DateTime<Utc>) -> Result<()> {
        self.update(|rows| touch_row(rows, url, at))
    }

    fn list(&self) -> Result<Vec<CachedRepository>> {
        self.read(|rows| rows.values().cloned().collect())
    }
}
