//! Asynchronous filesystem boundary.
//!
//! Views never block on disk access. They await the boxed futures returned by
//! a [`FileSystem`] implementation, which lets any single-threaded executor
//! drive them.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future returned by filesystem operations.
pub type IoFuture<'a, T> = Pin<Box<dyn Future<Output = io::Result<T>> + 'a>>;

/// Filesystem collaborator.
pub trait FileSystem {
    /// Reads a UTF-8 file.
    fn read<'a>(&'a self, path: &'a Path) -> IoFuture<'a, String>;

    /// Replaces the contents of a file, creating it if needed.
    fn write<'a>(&'a self, path: &'a Path, text: &'a str) -> IoFuture<'a, ()>;

    /// Returns whether a file exists.
    fn exists<'a>(&'a self, path: &'a Path) -> IoFuture<'a, bool>;
}

/// Completes after yielding to the executor once.
struct YieldOnce {
    yielded: bool,
}

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// In-memory filesystem.
///
/// Operations can be made to yield before completing (`set_latency`) and
/// individual failures can be injected, which makes interleavings between
/// saves, external changes and teardown reproducible.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RefCell<HashMap<PathBuf, String>>,
    latency: Cell<bool>,
    early_reads: Cell<bool>,
    failing_reads: RefCell<HashSet<PathBuf>>,
    fail_next_write: Cell<Option<io::ErrorKind>>,
    writes: Cell<usize>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a file without going through `write`.
    pub fn insert(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files.borrow_mut().insert(path.into(), text.into());
    }

    /// Deletes a file. Returns whether it existed.
    pub fn remove(&self, path: &Path) -> bool {
        self.files.borrow_mut().remove(path).is_some()
    }

    /// Returns the stored content of a file.
    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files.borrow().get(path).cloned()
    }

    /// When enabled, every operation yields once before completing.
    pub fn set_latency(&self, enabled: bool) {
        self.latency.set(enabled);
    }

    /// When enabled, reads return the content as of the moment they start,
    /// even if a write lands before they complete.
    pub fn set_early_reads(&self, enabled: bool) {
        self.early_reads.set(enabled);
    }

    /// Makes reads of `path` fail with `PermissionDenied` until cleared.
    pub fn fail_reads(&self, path: impl Into<PathBuf>, failing: bool) {
        let path = path.into();
        if failing {
            self.failing_reads.borrow_mut().insert(path);
        } else {
            self.failing_reads.borrow_mut().remove(&path);
        }
    }

    /// Makes the next write fail with `kind`.
    pub fn fail_next_write(&self, kind: io::ErrorKind) {
        self.fail_next_write.set(Some(kind));
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    fn lookup(&self, path: &Path) -> io::Result<String> {
        if self.failing_reads.borrow().contains(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read denied"));
        }
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    async fn settle(&self) {
        if self.latency.get() {
            YieldOnce { yielded: false }.await;
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn read<'a>(&'a self, path: &'a Path) -> IoFuture<'a, String> {
        Box::pin(async move {
            let early = self.early_reads.get().then(|| self.lookup(path));
            self.settle().await;
            early.unwrap_or_else(|| self.lookup(path))
        })
    }

    fn write<'a>(&'a self, path: &'a Path, text: &'a str) -> IoFuture<'a, ()> {
        Box::pin(async move {
            self.settle().await;
            if let Some(kind) = self.fail_next_write.take() {
                return Err(io::Error::new(kind, "write failed"));
            }
            self.files
                .borrow_mut()
                .insert(path.to_path_buf(), text.to_string());
            self.writes.set(self.writes.get() + 1);
            Ok(())
        })
    }

    fn exists<'a>(&'a self, path: &'a Path) -> IoFuture<'a, bool> {
        Box::pin(async move {
            self.settle().await;
            Ok(self.files.borrow().contains_key(path))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_round_trip() {
        let fs = MemoryFileSystem::new();
        let path = Path::new("/w/a.txt");

        assert!(!fs.exists(path).await.unwrap());
        fs.write(path, "hello").await.unwrap();
        assert!(fs.exists(path).await.unwrap());
        assert_eq!(fs.read(path).await.unwrap(), "hello");
        assert_eq!(fs.write_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let fs = MemoryFileSystem::new();
        let err = fs.read(Path::new("/nope")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let fs = MemoryFileSystem::new();
        let path = Path::new("/w/a.txt");
        fs.insert(path, "x");

        fs.fail_reads(path, true);
        assert_eq!(
            fs.read(path).await.unwrap_err().kind(),
            io::ErrorKind::PermissionDenied
        );
        fs.fail_reads(path, false);
        assert!(fs.read(path).await.is_ok());

        fs.fail_next_write(io::ErrorKind::Other);
        assert!(fs.write(path, "y").await.is_err());
        assert!(fs.write(path, "y").await.is_ok());
        assert_eq!(fs.contents(path).as_deref(), Some("y"));
    }
}
