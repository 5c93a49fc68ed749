//! Store-level locking and document persistence.
//!
//! Every operation that reads and rewrites store documents holds a
//! [`StoreLock`] for its whole duration: exclusive for mutations, shared for
//! reads. Changed documents are gathered into a [`WriteBatch`], serialized
//! up front, written to temporary siblings and renamed into place.

use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::CONFIG_FILE;
use crate::errors::{StoreError, StoreResult};

/// Paths of every document inside a store directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tickets_dir(&self) -> PathBuf {
        self.root.join("tickets")
    }

    pub fn construct_dir(&self) -> PathBuf {
        self.root.join("construct")
    }

    pub fn index_path(&self) -> PathBuf {
        self.tickets_dir().join("index.json")
    }

    pub fn reservations_path(&self) -> PathBuf {
        self.tickets_dir().join("reservations.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.tickets_dir().join(".lock")
    }

    pub fn ticket_path(&self, id: &str) -> PathBuf {
        self.tickets_dir().join(format!("{id}.json"))
    }

    pub fn pipeline_path(&self) -> PathBuf {
        self.construct_dir().join("pipeline.json")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Fail with `StoreMissing` unless the store directory exists.
    pub fn require(&self) -> StoreResult<()> {
        if self.exists() {
            Ok(())
        } else {
            Err(StoreError::StoreMissing {
                path: self.root.clone(),
            })
        }
    }

    /// Exclusive lock on this store, creating `tickets/` if needed.
    pub fn lock_exclusive(&self) -> StoreResult<StoreLock> {
        self.require()?;
        self.ensure_tickets_dir()?;
        StoreLock::exclusive(&self.lock_path())
    }

    /// Shared lock on this store.
    pub fn lock_shared(&self) -> StoreResult<StoreLock> {
        self.require()?;
        self.ensure_tickets_dir()?;
        StoreLock::shared(&self.lock_path())
    }

    fn ensure_tickets_dir(&self) -> StoreResult<()> {
        let dir = self.tickets_dir();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))
    }
}

/// Advisory lock on a store's lock file. Released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Block until no other holder has the lock.
    pub fn exclusive(path: &Path) -> StoreResult<Self> {
        let file = open_lock_file(path)?;
        FileExt::lock_exclusive(&file).map_err(|source| StoreError::Lock {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(lock = %path.display(), "exclusive store lock acquired");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Block until no exclusive holder has the lock.
    pub fn shared(path: &Path) -> StoreResult<Self> {
        let file = open_lock_file(path)?;
        FileExt::lock_shared(&file).map_err(|source| StoreError::Lock {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(lock = %self.path.display(), error = %e, "failed to release store lock");
        }
    }
}

fn open_lock_file(path: &Path) -> StoreResult<File> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))
}

/// Read and parse a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<T> {
    let content = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| StoreError::json(path, e))
}

/// Like [`read_json`], but a missing file yields `None`.
pub fn read_json_if_exists<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}

/// Documents staged for one atomic-from-the-caller's-view commit.
#[derive(Debug, Default)]
pub struct WriteBatch {
    staged: Vec<(PathBuf, Vec<u8>)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize `value` now; nothing touches disk until [`commit`](Self::commit).
    pub fn stage<T: Serialize>(&mut self, path: PathBuf, value: &T) -> StoreResult<()> {
        let mut bytes = serde_json::to_vec_pretty(value).map_err(|e| StoreError::json(&path, e))?;
        bytes.push(b'\n');
        self.staged.retain(|(p, _)| p != &path);
        self.staged.push((path, bytes));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Write every staged document to a temporary sibling, then rename all
    /// of them into place. If any temporary write fails, no target changes.
    pub fn commit(self) -> StoreResult<()> {
        let mut written: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(self.staged.len());
        for (path, bytes) in &self.staged {
            let tmp = temp_sibling(path);
            if let Err(e) = fs::write(&tmp, bytes) {
                for (_, tmp) in &written {
                    let _ = fs::remove_file(tmp);
                }
                return Err(StoreError::io(&tmp, e));
            }
            written.push((path.clone(), tmp));
        }
        for (path, tmp) in &written {
            fs::rename(tmp, path).map_err(|e| StoreError::io(path, e))?;
        }
        debug!(documents = written.len(), "write batch committed");
        Ok(())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
