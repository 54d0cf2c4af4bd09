//! File watching with the `notify` crate.
//!
//! notify delivers events on its own thread. They are translated to
//! [`FileEvent`]s and sent over a tokio channel; the host drains that channel
//! on its local task set (see [`crate::pump`]).

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use paneview_core::watch::{FileEvent, FileEventKind, PathWatcher};
use std::cell::RefCell;
use std::path::Path;
use tokio::sync::mpsc;

/// [`PathWatcher`] backed by the platform's recommended notify watcher.
pub struct NotifyWatcher {
    watcher: RefCell<RecommendedWatcher>,
}

impl NotifyWatcher {
    /// Creates the watcher and the channel its events arrive on.
    pub fn new() -> notify::Result<(Self, mpsc::UnboundedReceiver<FileEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = notify::recommended_watcher(move |result: notify::Result<Event>| match result {
            Ok(event) => {
                for file_event in translate(&event) {
                    if tx.send(file_event).is_err() {
                        // Receiver dropped, host is shutting down
                        return;
                    }
                }
            }
            Err(e) => log::warn!("file watcher error: {}", e),
        })?;
        Ok((
            Self {
                watcher: RefCell::new(watcher),
            },
            rx,
        ))
    }
}

impl PathWatcher for NotifyWatcher {
    fn watch(&self, path: &Path) {
        if let Err(e) = self
            .watcher
            .borrow_mut()
            .watch(path, RecursiveMode::NonRecursive)
        {
            log::warn!("cannot watch {}: {}", path.display(), e);
        }
    }

    fn unwatch(&self, path: &Path) {
        if let Err(e) = self.watcher.borrow_mut().unwatch(path) {
            log::debug!("cannot unwatch {}: {}", path.display(), e);
        }
    }
}

/// Maps a notify event to the changes views care about.
pub fn translate(event: &Event) -> Vec<FileEvent> {
    event
        .paths
        .iter()
        .filter_map(|path| {
            let kind = match event.kind {
                EventKind::Create(_) | EventKind::Modify(ModifyKind::Data(_)) => FileEventKind::Changed,
                EventKind::Modify(ModifyKind::Name(_)) | EventKind::Modify(ModifyKind::Any) => {
                    if path.exists() {
                        FileEventKind::Changed
                    } else {
                        FileEventKind::Deleted
                    }
                }
                EventKind::Remove(_) => FileEventKind::Deleted,
                _ => return None,
            };
            Some(FileEvent {
                path: path.clone(),
                kind,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind, RenameMode};
    use tempfile::TempDir;

    #[test]
    fn test_translate_kinds() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");

        let modified = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content))).add_path(path.clone());
        assert_eq!(translate(&modified), vec![FileEvent::changed(&path)]);

        let created = Event::new(EventKind::Create(CreateKind::File)).add_path(path.clone());
        assert_eq!(translate(&created), vec![FileEvent::changed(&path)]);

        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(path.clone());
        assert_eq!(translate(&removed), vec![FileEvent::deleted(&path)]);

        let accessed = Event::new(EventKind::Access(AccessKind::Any)).add_path(path.clone());
        assert!(translate(&accessed).is_empty());
    }

    #[test]
    fn test_rename_checks_disk() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("gone.txt");
        let here = dir.path().join("here.txt");
        std::fs::write(&here, "x").unwrap();

        let renamed = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Any)))
            .add_path(gone.clone())
            .add_path(here.clone());
        assert_eq!(
            translate(&renamed),
            vec![FileEvent::deleted(&gone), FileEvent::changed(&here)]
        );
    }

    #[tokio::test]
    async fn test_watcher_reports_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "one").unwrap();

        let (watcher, mut events) = NotifyWatcher::new().unwrap();
        watcher.watch(&path);
        std::fs::write(&path, "two").unwrap();

        let event = tokio::time::timeout(std::time::Duration::from_secs(5), events.recv())
            .await
            .ok()
            .flatten();
        if let Some(event) = event {
            assert_eq!(event.kind, FileEventKind::Changed);
        }
        watcher.unwatch(&path);
    }
}
