//! Filesystem access for the build engine.
//!
//! The engine only sees project-relative, forward-slash paths. [`RealFs`]
//! maps them onto a project directory and writes atomically; [`MemoryFs`]
//! keeps everything in memory for tests and counts writes.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// File operations used by a build.
pub trait FileSystem: Send + Sync {
    /// Reads the whole file.
    fn read_file(&self, path: &str) -> io::Result<Vec<u8>>;
    /// Replaces the file's contents, creating parent directories as needed.
    fn write_file(&self, path: &str, bytes: &[u8]) -> io::Result<()>;
    /// Returns `true` if a regular file exists at `path`.
    fn exists(&self, path: &str) -> bool;
    /// Deletes a file. Deleting a missing file is not an error.
    fn remove_file(&self, path: &str) -> io::Result<()>;
}

/// The host filesystem, rooted at a project directory.
#[derive(Debug, Clone)]
pub struct RealFs {
    root: PathBuf,
}

impl RealFs {
    /// Creates a filesystem that resolves paths against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the host path for a project-relative path.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// Returns the project directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileSystem for RealFs {
    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path))
    }

    fn write_file(&self, path: &str, bytes: &[u8]) -> io::Result<()> {
        atomic_write(&self.resolve(path), bytes)
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn remove_file(&self, path: &str) -> io::Result<()> {
        match fs::remove_file(self.resolve(path)) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writes `bytes` to `path` through a temporary sibling and a rename, so
/// readers see either the old or the new contents, never a partial file.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Err(io::Error::other("path has no parent"));
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    fs::create_dir_all(parent)?;

    let (tmp_path, mut file) = open_unique_tmp_file(path, parent)?;
    let write_result = file.write_all(bytes).and_then(|()| file.sync_all());
    drop(file);
    if let Err(err) = write_result {
        remove_tmp(&tmp_path);
        return Err(err);
    }

    if cfg!(windows) && path.exists() {
        // `rename` does not replace an existing file on Windows.
        if let Err(err) = fs::remove_file(path) {
            if err.kind() != io::ErrorKind::NotFound {
                remove_tmp(&tmp_path);
                return Err(err);
            }
        }
    }
    match fs::rename(&tmp_path, path) {
        Ok(()) => Ok(()),
        Err(err) => {
            remove_tmp(&tmp_path);
            Err(err)
        }
    }
}

fn open_unique_tmp_file(dest: &Path, parent: &Path) -> io::Result<(PathBuf, fs::File)> {
    let file_name = dest
        .file_name()
        .ok_or_else(|| io::Error::other("destination path has no file name"))?;
    let pid = std::process::id();
    loop {
        let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(format!(".tmp.{pid}.{counter}"));
        let tmp_path = parent.join(tmp_name);
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}

fn remove_tmp(tmp_path: &Path) {
    if let Err(err) = fs::remove_file(tmp_path) {
        if err.kind() != io::ErrorKind::NotFound {
            tracing::debug!(
                target: "skiff.incremental",
                path = %tmp_path.display(),
                error = %err,
                "failed to remove temporary file"
            );
        }
    }
}

/// An in-memory filesystem.
///
/// Counts successful writes and can be told to fail writes to specific paths,
/// which makes emit failure handling and idempotence observable in tests.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    failing: Mutex<BTreeSet<String>>,
    writes: AtomicUsize,
}

impl MemoryFs {
    /// Creates an empty filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filesystem holding the given text files.
    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let fs = Self::new();
        for (path, text) in files {
            fs.set(path, text);
        }
        fs
    }

    /// Sets a file's contents without counting a write.
    pub fn set(&self, path: &str, text: &str) {
        lock(&self.files).insert(path.to_string(), text.as_bytes().to_vec());
    }

    /// Deletes a file without counting a write.
    pub fn delete(&self, path: &str) {
        lock(&self.files).remove(path);
    }

    /// Returns a file's contents.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.files).get(path).cloned()
    }

    /// Returns a file's contents as text.
    pub fn get_text(&self, path: &str) -> Option<String> {
        self.get(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Returns every path in sorted order.
    pub fn paths(&self) -> Vec<String> {
        lock(&self.files).keys().cloned().collect()
    }

    /// Returns the number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Resets the write counter.
    pub fn reset_write_count(&self) {
        self.writes.store(0, Ordering::Relaxed);
    }

    /// Makes every write to `path` fail until [`clear_failures`](Self::clear_failures).
    pub fn fail_writes_to(&self, path: &str) {
        lock(&self.failing).insert(path.to_string());
    }

    /// Lets all writes succeed again.
    pub fn clear_failures(&self) {
        lock(&self.failing).clear();
    }
}

impl FileSystem for MemoryFs {
    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        self.get(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{path}: not found")))
    }

    fn write_file(&self, path: &str, bytes: &[u8]) -> io::Result<()> {
        if lock(&self.failing).contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{path}: write refused"),
            ));
        }
        lock(&self.files).insert(path.to_string(), bytes.to_vec());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        lock(&self.files).contains_key(path)
    }

    fn remove_file(&self, path: &str) -> io::Result<()> {
        lock(&self.files).remove(path);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("nested").join("a.js");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn real_fs_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let fs = RealFs::new(dir.path());
        fs.write_file("src/a.ts", b"export const a = 1;").unwrap();
        assert!(fs.exists("src/a.ts"));
        assert!(!fs.exists("src"));
        assert_eq!(fs.read_file("src/a.ts").unwrap(), b"export const a = 1;");
        fs.remove_file("src/a.ts").unwrap();
        fs.remove_file("src/a.ts").unwrap();
        assert!(!fs.exists("src/a.ts"));
    }

    #[test]
    fn real_fs_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = RealFs::new(dir.path()).read_file("nope.ts").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn memory_fs_counts_writes_only() {
        let fs = MemoryFs::with_files([("a.ts", "a")]);
        assert_eq!(fs.write_count(), 0);
        fs.write_file("a.js", b"js").unwrap();
        assert_eq!(fs.write_count(), 1);
        assert_eq!(fs.get_text("a.js").as_deref(), Some("js"));
        fs.reset_write_count();
        assert_eq!(fs.write_count(), 0);
    }

    #[test]
    fn memory_fs_injected_failures() {
        let fs = MemoryFs::new();
        fs.fail_writes_to("b.js");
        assert!(fs.write_file("b.js", b"x").is_err());
        assert!(!fs.exists("b.js"));
        assert_eq!(fs.write_count(), 0);
        fs.clear_failures();
        fs.write_file("b.js", b"x").unwrap();
        assert!(fs.exists("b.js"));
    }
}
