//! Committed file contents as diff references.

use paneview_core::diff::{compute_hunks, Hunk, RevisionSource};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// [`RevisionSource`] reading `HEAD` through the `git` binary.
///
/// Lookups are synchronous, so references are loaded ahead of time with
/// [`refresh`](Self::refresh) and cached per path. A path that is not tracked
/// is cached as such and yields no hunks.
#[derive(Debug, Default)]
pub struct GitRevisions {
    references: RefCell<HashMap<PathBuf, Option<String>>>,
}

impl GitRevisions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the committed content of `path`. Returns whether it is tracked.
    pub async fn refresh(&self, path: &Path) -> bool {
        let reference = show_head(path).await;
        let tracked = reference.is_some();
        self.references
            .borrow_mut()
            .insert(path.to_path_buf(), reference);
        tracked
    }

    /// Drops the cached reference of `path`.
    pub fn forget(&self, path: &Path) {
        self.references.borrow_mut().remove(path);
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        matches!(self.references.borrow().get(path), Some(Some(_)))
    }
}

impl RevisionSource for GitRevisions {
    fn line_diffs(&self, path: &Path, text: &str) -> Option<Vec<Hunk>> {
        let references = self.references.borrow();
        let reference = references.get(path)?.as_deref()?;
        Some(compute_hunks(reference, text))
    }
}

/// Runs `git show HEAD:./<name>` from the file's directory.
async fn show_head(path: &Path) -> Option<String> {
    let dir = path.parent()?;
    let name = path.file_name()?.to_string_lossy();

    let output = match Command::new("git")
        .arg("show")
        .arg(format!("HEAD:./{}", name))
        .current_dir(dir)
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            log::warn!("failed to run git for {}: {}", path.display(), e);
            return None;
        }
    };

    if !output.status.success() {
        log::debug!(
            "{} has no committed revision: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return None;
    }
    match String::from_utf8(output.stdout) {
        Ok(text) => Some(text),
        Err(_) => {
            log::debug!("{} is not UTF-8 at HEAD", path.display());
            None
        }
    }
}
