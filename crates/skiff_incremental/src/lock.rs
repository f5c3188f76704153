//! Exclusive lock on a build root, shared between processes.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

use fs2::FileExt as _;

use crate::error::BuildError;

/// Holds the build lock until dropped.
///
/// Two builds writing the same build-info file would otherwise race: the last
/// writer wins and the loser's outputs may not match the persisted snapshot.
#[derive(Debug)]
pub struct BuildLock {
    file: File,
    path: PathBuf,
    // fs2 locks are per process on Unix; the mutex excludes other threads.
    _guard: MutexGuard<'static, ()>,
}

impl BuildLock {
    /// Blocks until the lock at `path` is acquired, creating the file if needed.
    pub fn acquire(path: &Path) -> Result<Self, BuildError> {
        let lock_err = |source| BuildError::Lock {
            path: path.display().to_string(),
            source,
        };
        let guard = process_lock_for_path(path)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(lock_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .map_err(lock_err)?;
        file.lock_exclusive().map_err(lock_err)?;
        tracing::debug!(target: "skiff.incremental", path = %path.display(), "build lock acquired");

        Ok(Self {
            file,
            path: path.to_path_buf(),
            _guard: guard,
        })
    }

    /// Returns the lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn process_lock_for_path(path: &Path) -> &'static Mutex<()> {
    static PROCESS_LOCKS: OnceLock<Mutex<HashMap<PathBuf, &'static Mutex<()>>>> = OnceLock::new();
    let locks = PROCESS_LOCKS.get_or_init(|| Mutex::new(HashMap::new()));

    let mut map = locks
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(existing) = map.get(path) {
        return existing;
    }
    let mutex: &'static Mutex<()> = Box::leak(Box::new(Mutex::new(())));
    map.insert(path.to_path_buf(), mutex);
    mutex
}
