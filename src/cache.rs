//! The repository cache
//!
//! Mirrors remote repositories below a cache root and tracks them in a
//! persisted [`RepoIndex`]. Per URL the cache moves through
//! `Unknown -> Cloning -> Present`; a failed clone is cleaned up and the URL
//! goes back to `Unknown`.
//!
//! ## Locking
//!
//! Every resolved repository path has its own `RwLock` in a sharded lock
//! table. `add`, `fetch` and `pull` hold the write lock for the whole
//! check-clone-persist (or fetch-touch) sequence, so two requests for the
//! same never-seen URL result in exactly one clone. Content reads hold the
//! read lock and can run in parallel with each other, but never with a
//! writer on the same path.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info, warn};
use rayon::prelude::*;

use crate::content::RepoContent;
use crate::error::{Error, Result};
use crate::index::{CachedRepository, FileIndex, RepoIndex, INDEX_FILE};
use crate::path;
use crate::process::Deadline;
use crate::repository::{FetchOutcome, GitBackend, VcsBackend};

/// Upper bound for a single clone.
pub const CLONE_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound for fetch, pull and content reads.
pub const GIT_TIMEOUT: Duration = Duration::from_secs(60);

const LOCK_SHARDS: usize = 16;

/// Timeouts applied by the cache.
#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    pub clone_timeout: Duration,
    pub git_timeout: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            clone_timeout: CLONE_TIMEOUT,
            git_timeout: GIT_TIMEOUT,
        }
    }
}

/// What `add` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The repository was cloned and recorded.
    Cloned,
    /// The remote has no commits yet; it was recorded anyway.
    Empty,
    /// The URL was already cached, nothing happened.
    AlreadyCached,
}

/// Whether `update_all` fetches or pulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Fetch,
    Pull,
}

/// Per-repository result of `update_all`.
#[derive(Debug)]
pub struct UpdateReport {
    pub url: String,
    pub result: Result<FetchOutcome>,
}

/// Lock table keyed by resolved repository path.
///
/// Entries nobody holds are pruned from a shard whenever it is visited, so
/// the table only tracks locks in use.
struct PathLocks {
    shards: Vec<Mutex<HashMap<PathBuf, Arc<RwLock<()>>>>>,
}

impl PathLocks {
    fn new() -> Self {
        Self {
            shards: (0..LOCK_SHARDS).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    fn get(&self, path: &Path) -> Result<Arc<RwLock<()>>> {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        let shard = &self.shards[(hasher.finish() as usize) % self.shards.len()];
        let mut locks = shard.lock().map_err(|_| Error::LockPoisoned {
            context: "cache lock table".to_string(),
        })?;
        // only the shard guard hands out clones, so a count of one is idle
        locks.retain(|key, lock| key.as_path() == path || Arc::strong_count(lock) > 1);
        Ok(Arc::clone(locks.entry(path.to_path_buf()).or_default()))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.lock().map(|locks| locks.len()).unwrap_or_default())
            .sum()
    }
}

fn poisoned(path: &Path) -> Error {
    Error::LockPoisoned {
        context: format!("repository lock for {}", path.display()),
    }
}

struct Inner {
    root: PathBuf,
    backend: Box<dyn VcsBackend>,
    index: Box<dyn RepoIndex>,
    locks: PathLocks,
    options: CacheOptions,
}

/// Cache of mirrored repositories.
///
/// Cheap to clone; all clones share the same index and lock table.
/// Construct it once at startup and hand it to every consumer.
#[derive(Clone)]
pub struct RepoCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RepoCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoCache")
            .field("root", &self.inner.root)
            .field("options", &self.inner.options)
            .finish()
    }
}

impl RepoCache {
    /// Open the cache at `root` with the git backend and the on-disk index.
    ///
    /// The root is created if needed. Fails if it cannot be used.
    pub fn open(root: impl Into<PathBuf>, options: CacheOptions) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let index = FileIndex::open(root.join(INDEX_FILE))?;
        Self::with_parts(root, Box::new(GitBackend), Box::new(index), options)
    }

    /// Assemble a cache from explicit parts.
    pub fn with_parts(
        root: impl Into<PathBuf>,
        backend: Box<dyn VcsBackend>,
        index: Box<dyn RepoIndex>,
        options: CacheOptions,
    ) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        if !root.is_dir() {
            return Err(Error::Config {
                message: format!("cache root {} is not a directory", root.display()),
            });
        }

        Ok(Self {
            inner: Arc::new(Inner {
                root,
                backend,
                index,
                locks: PathLocks::new(),
                options,
            }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn options(&self) -> CacheOptions {
        self.inner.options
    }

    /// Cache location of `url`, whether or not it is cached.
    pub fn resolve(&self, url: &str) -> Result<PathBuf> {
        path::resolve(&self.inner.root, url)
    }

    /// True iff the index holds a committed row for `url`.
    pub fn has(&self, url: &str) -> Result<bool> {
        Ok(self
            .inner
            .index
            .get(url)?
            .is_some_and(|record| record.is_committed()))
    }

    /// Add `url` to the cache, cloning it if needed.
    ///
    /// Idempotent: adding a cached URL is a no-op. Fails with
    /// `CacheConflict` if the target directory exists without being
    /// tracked, and leaves that directory alone.
    pub fn add(&self, url: &str) -> Result<AddOutcome> {
        let path = self.resolve(url)?;
        let lock = self.inner.locks.get(&path)?;
        let _guard = lock.write().map_err(|_| poisoned(&path))?;

        if self.has(url)? {
            debug!("{} is already cached", url);
            return Ok(AddOutcome::AlreadyCached);
        }

        if path.exists() {
            error!("repo cache folder conflict for {}, {}", url, path.display());
            return Err(Error::CacheConflict {
                url: url.to_string(),
                path,
            });
        }
        fs::create_dir_all(&path)?;

        info!("cloning {} into {}", url, path.display());
        let deadline = Deadline::after(self.inner.options.clone_timeout);
        let outcome = match self.inner.backend.clone_repo(url, &path, deadline) {
            Ok(()) => AddOutcome::Cloned,
            Err(e) if e.is_empty_remote() => {
                warn!("{} has no commits yet, caching it anyway", url);
                AddOutcome::Empty
            }
            Err(e) => {
                discard(&path, &e);
                return Err(e);
            }
        };

        let record = CachedRepository::new(url, self.inner.backend.kind(), path.clone());
        if let Err(e) = self.inner.index.insert(record) {
            discard(&path, &e);
            return Err(e);
        }

        Ok(outcome)
    }

    /// Like `add`, but a URL that is already cached is an error.
    pub fn register(&self, url: &str) -> Result<AddOutcome> {
        if self.has(url)? {
            return Err(Error::AlreadyExists {
                url: url.to_string(),
            });
        }
        match self.add(url)? {
            // lost the race against a concurrent add of the same URL
            AddOutcome::AlreadyCached => Err(Error::AlreadyExists {
                url: url.to_string(),
            }),
            outcome => Ok(outcome),
        }
    }

    /// Location of a cached repository.
    pub fn location(&self, url: &str) -> Result<PathBuf> {
        if !self.has(url)? {
            return Err(Error::UncachedRepository {
                url: url.to_string(),
            });
        }
        self.resolve(url)
    }

    /// The index row of a cached repository.
    pub fn record(&self, url: &str) -> Result<CachedRepository> {
        self.inner
            .index
            .get(url)?
            .filter(CachedRepository::is_committed)
            .ok_or_else(|| Error::UncachedRepository {
                url: url.to_string(),
            })
    }

    /// All cached repositories.
    pub fn list(&self) -> Result<Vec<CachedRepository>> {
        self.inner.index.list()
    }

    /// Bytes used on disk by a cached repository.
    pub fn size(&self, url: &str) -> Result<u64> {
        self.read(url, |path| self.inner.backend.size(path))
    }

    /// Fetch a cached repository from its remote.
    pub fn fetch(&self, url: &str) -> Result<FetchOutcome> {
        self.update(url, UpdateMode::Fetch)
    }

    /// Pull the latest changes of a cached repository.
    pub fn pull(&self, url: &str) -> Result<FetchOutcome> {
        self.update(url, UpdateMode::Pull)
    }

    fn update(&self, url: &str, mode: UpdateMode) -> Result<FetchOutcome> {
        let path = self.location(url)?;
        let lock = self.inner.locks.get(&path)?;
        let _guard = lock.write().map_err(|_| poisoned(&path))?;

        let deadline = Deadline::after(self.inner.options.git_timeout);
        let outcome = match mode {
            UpdateMode::Fetch => self.inner.backend.fetch(&path, deadline)?,
            UpdateMode::Pull => self.inner.backend.pull(&path, deadline)?,
        };
        match outcome {
            FetchOutcome::AlreadyUpToDate => debug!("{} is already up to date", url),
            FetchOutcome::Updated => info!("updated {}", url),
        }

        self.inner.index.touch(url, Utc::now())?;
        Ok(outcome)
    }

    /// Fetch or pull every cached repository in parallel.
    ///
    /// A failure for one repository does not stop the others.
    pub fn update_all(&self, mode: UpdateMode) -> Result<Vec<UpdateReport>> {
        let records = self.list()?;
        Ok(records
            .par_iter()
            .map(|record| {
                let result = self.update(&record.url, mode);
                if let Err(e) = &result {
                    warn!("could not update {}: {}", record.url, e);
                }
                UpdateReport {
                    url: record.url.clone(),
                    result,
                }
            })
            .collect())
    }

    /// Run `f` on the checkout of `url` while holding its read lock.
    pub fn read<T>(&self, url: &str, f: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
        let path = self.location(url)?;
        let lock = self.inner.locks.get(&path)?;
        let _guard = lock.read().map_err(|_| poisoned(&path))?;
        f(&path)
    }

    /// Run `f` with a content accessor for `url` while holding its read lock.
    pub fn with_content<T>(
        &self,
        url: &str,
        f: impl FnOnce(&RepoContent) -> Result<T>,
    ) -> Result<T> {
        let timeout = self.inner.options.git_timeout;
        self.read(url, |path| f(&RepoContent::new(path, timeout)))
    }
}

/// Best-effort removal of a partially created checkout.
fn discard(path: &Path, cause: &Error) {
    if let Err(rmdir) = fs::remove_dir_all(path) {
        error!(
            "couldn't remove dir after failed clone: path={}, rmdir={}, cause={}",
            path.display(),
            rmdir,
            cause
        );
    }
}
