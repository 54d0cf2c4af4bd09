//! Disk access through tokio's blocking pool.

use paneview_core::fs::{FileSystem, IoFuture};
use std::io;
use std::path::Path;

/// [`FileSystem`] backed by `tokio::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for TokioFileSystem {
    fn read<'a>(&'a self, path: &'a Path) -> IoFuture<'a, String> {
        Box::pin(tokio::fs::read_to_string(path))
    }

    fn write<'a>(&'a self, path: &'a Path, text: &'a str) -> IoFuture<'a, ()> {
        Box::pin(tokio::fs::write(path, text))
    }

    fn exists<'a>(&'a self, path: &'a Path) -> IoFuture<'a, bool> {
        Box::pin(async move {
            match tokio::fs::metadata(path).await {
                Ok(_) => Ok(true),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e),
            }
        })
    }
}
