//! Error types surfaced by views and configuration loading.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The filesystem operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    Read,
    Write,
    Stat,
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IoOp::Read => "read",
            IoOp::Write => "write",
            IoOp::Stat => "stat",
        })
    }
}

/// Errors returned by view operations.
#[derive(Debug, Error)]
pub enum ViewError {
    /// A read, write or stat on the backing file failed.
    #[error("failed to {op} {}: {source}", .path.display())]
    Io {
        op: IoOp,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `save` was called on a view with no backing file.
    #[error("view has no backing file; use save_as")]
    NoPath,

    /// The view was destroyed before the operation completed.
    #[error("view was destroyed")]
    Destroyed,
}

impl ViewError {
    pub(crate) fn io(op: IoOp, path: impl Into<PathBuf>, source: io::Error) -> Self {
        ViewError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Returns the failed operation for I/O errors.
    pub fn io_op(&self) -> Option<IoOp> {
        match self {
            ViewError::Io { op, .. } => Some(*op),
            _ => None,
        }
    }
}

/// Errors from loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings: {0}")]
    Io(#[from] io::Error),

    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_message() {
        let err = ViewError::io(
            IoOp::Write,
            "/tmp/x.txt",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "failed to write /tmp/x.txt: denied");
        assert_eq!(err.io_op(), Some(IoOp::Write));
        assert_eq!(ViewError::NoPath.io_op(), None);
    }
}
