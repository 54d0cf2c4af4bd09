//! Paneview Host - Runtime collaborators for paneview views.
//!
//! Implements the I/O traits of `paneview-core` on top of tokio, notify and
//! the `git` binary. Everything here runs on a tokio current-thread runtime
//! inside a `LocalSet`, because views are single-threaded.

pub mod fs;
pub mod git;
pub mod pump;
pub mod watcher;

pub use fs::TokioFileSystem;
pub use git::GitRevisions;
pub use watcher::NotifyWatcher;

use paneview_core::config::Settings;
use paneview_core::surface::SurfaceFactory;
use paneview_core::view::EditorContext;
use paneview_core::watch::FileEvent;
use std::rc::Rc;
use tokio::sync::mpsc;

/// Builds a context that reads and writes the real disk and watches it with
/// notify. File events arrive on the returned receiver; feed it to
/// [`pump::run`].
pub fn disk_context(
    surfaces: Rc<dyn SurfaceFactory>,
    settings: Settings,
) -> notify::Result<(EditorContext, mpsc::UnboundedReceiver<FileEvent>)> {
    let (watcher, events) = NotifyWatcher::new()?;
    let ctx = EditorContext::new(Rc::new(TokioFileSystem::new()), Rc::new(watcher), surfaces, settings);
    Ok((ctx, events))
}
