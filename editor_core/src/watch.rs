//! Routing of on-disk change notifications to the views showing a file.
//!
//! A [`PathWatcher`] backend observes paths (the host crate wraps `notify`).
//! Views register with the [`FileWatchHub`]; the host forwards every
//! [`FileEvent`] to [`FileWatchHub::dispatch`], which reconciles the views one
//! at a time.

use crate::event::Subscription;
use crate::view::{ChangeOutcome, View, WeakView};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

/// What happened to a watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Changed,
    Deleted,
}

/// A change notification for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: FileEventKind,
}

impl FileEvent {
    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: FileEventKind::Changed,
        }
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: FileEventKind::Deleted,
        }
    }
}

/// Backend that observes individual paths.
pub trait PathWatcher {
    fn watch(&self, path: &Path);
    fn unwatch(&self, path: &Path);
}

/// Backend that records which paths are watched and never produces events
/// itself. Events are injected through [`FileWatchHub::dispatch`].
#[derive(Debug, Default)]
pub struct ManualWatcher {
    watched: RefCell<BTreeSet<PathBuf>>,
}

impl ManualWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.watched.borrow().contains(path)
    }

    pub fn watched(&self) -> Vec<PathBuf> {
        self.watched.borrow().iter().cloned().collect()
    }
}

impl PathWatcher for ManualWatcher {
    fn watch(&self, path: &Path) {
        self.watched.borrow_mut().insert(path.to_path_buf());
    }

    fn unwatch(&self, path: &Path) {
        self.watched.borrow_mut().remove(path);
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct SaveState {
    in_flight: u32,
    generation: u64,
}

struct HubState {
    backend: Rc<dyn PathWatcher>,
    views: RefCell<HashMap<PathBuf, Vec<(u64, WeakView)>>>,
    saves: RefCell<HashMap<PathBuf, SaveState>>,
    next_id: Cell<u64>,
}

impl HubState {
    fn remove(&self, path: &Path, id: u64) {
        let emptied = {
            let mut views = self.views.borrow_mut();
            let Some(list) = views.get_mut(path) else {
                return;
            };
            list.retain(|(entry, _)| *entry != id);
            if list.is_empty() {
                views.remove(path);
                true
            } else {
                false
            }
        };
        if emptied {
            log::debug!("unwatching {}", path.display());
            self.backend.unwatch(path);
        }
    }
}

/// Fan-out of file events to views.
pub struct FileWatchHub {
    state: Rc<HubState>,
}

impl fmt::Debug for FileWatchHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileWatchHub")
            .field("paths", &self.state.views.borrow().len())
            .finish()
    }
}

impl FileWatchHub {
    pub fn new(backend: Rc<dyn PathWatcher>) -> Self {
        Self {
            state: Rc::new(HubState {
                backend,
                views: RefCell::new(HashMap::new()),
                saves: RefCell::new(HashMap::new()),
                next_id: Cell::new(1),
            }),
        }
    }

    /// Routes events for `path` to `view` until the subscription is dropped.
    /// The backend watches a path while at least one view is registered.
    pub fn subscribe(&self, path: &Path, view: &View) -> Subscription {
        let id = self.state.next_id.get();
        self.state.next_id.set(id + 1);

        let first = {
            let mut views = self.state.views.borrow_mut();
            let list = views.entry(path.to_path_buf()).or_default();
            list.push((id, view.downgrade()));
            list.len() == 1
        };
        if first {
            log::debug!("watching {}", path.display());
            self.state.backend.watch(path);
        }

        let state: Weak<HubState> = Rc::downgrade(&self.state);
        let path = path.to_path_buf();
        Subscription::new(move || {
            if let Some(state) = state.upgrade() {
                state.remove(&path, id);
            }
        })
    }

    /// Marks a write to `path` as in flight until the guard is dropped.
    ///
    /// Every view showing `path` treats change events as echoes of that
    /// write while the guard lives, whichever view started it.
    pub fn begin_save(&self, path: &Path) -> SaveGuard {
        {
            let mut saves = self.state.saves.borrow_mut();
            let save = saves.entry(path.to_path_buf()).or_default();
            save.in_flight += 1;
            save.generation += 1;
        }
        SaveGuard {
            state: Rc::downgrade(&self.state),
            path: path.to_path_buf(),
        }
    }

    /// True while a write to `path` is in flight.
    pub fn is_saving(&self, path: &Path) -> bool {
        self.state
            .saves
            .borrow()
            .get(path)
            .is_some_and(|save| save.in_flight > 0)
    }

    /// Number of writes ever started on `path`. A reconciliation read that
    /// sees this move may have raced a save.
    pub fn save_generation(&self, path: &Path) -> u64 {
        self.state
            .saves
            .borrow()
            .get(path)
            .map_or(0, |save| save.generation)
    }

    /// Number of views registered for `path`.
    pub fn subscriber_count(&self, path: &Path) -> usize {
        self.state.views.borrow().get(path).map_or(0, Vec::len)
    }

    /// Delivers `event` to every live view registered for its path, awaiting
    /// each reconciliation before starting the next. Returns the outcomes.
    pub async fn dispatch(&self, event: &FileEvent) -> Vec<ChangeOutcome> {
        let views: Vec<View> = self
            .state
            .views
            .borrow()
            .get(&event.path)
            .map(|list| list.iter().filter_map(|(_, view)| view.upgrade()).collect())
            .unwrap_or_default();
        log::trace!("{:?} {} -> {} views", event.kind, event.path.display(), views.len());

        let mut outcomes = Vec::with_capacity(views.len());
        for view in views {
            outcomes.push(view.handle_file_event(event.kind).await);
        }
        outcomes
    }
}

/// In-flight write marker returned by [`FileWatchHub::begin_save`].
#[must_use = "the save guard ends when dropped"]
pub struct SaveGuard {
    state: Weak<HubState>,
    path: PathBuf,
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            if let Some(save) = state.saves.borrow_mut().get_mut(&self.path) {
                save.in_flight = save.in_flight.saturating_sub(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::view::{EditorContext, View};

    #[tokio::test]
    async fn test_backend_watches_while_views_are_registered() {
        let fs = Rc::new(MemoryFileSystem::new());
        fs.insert("/w/a.txt", "a");
        let backend = Rc::new(ManualWatcher::new());
        let ctx = EditorContext::headless(fs, backend.clone());
        let path = Path::new("/w/a.txt");

        let first = View::open(&ctx, Some(path.to_path_buf())).await.unwrap();
        let second = first.split().unwrap();
        assert!(backend.is_watching(path));
        assert_eq!(ctx.watchers.subscriber_count(path), 2);

        first.destroy();
        assert!(backend.is_watching(path));
        second.destroy();
        assert!(!backend.is_watching(path));
        assert_eq!(ctx.watchers.subscriber_count(path), 0);
    }

    #[tokio::test]
    async fn test_dispatch_reaches_views_of_path_only() {
        let fs = Rc::new(MemoryFileSystem::new());
        fs.insert("/w/a.txt", "a");
        fs.insert("/w/b.txt", "b");
        let ctx = EditorContext::headless(fs.clone(), Rc::new(ManualWatcher::new()));

        let a = View::open(&ctx, Some("/w/a.txt".into())).await.unwrap();
        let b = View::open(&ctx, Some("/w/b.txt".into())).await.unwrap();

        fs.insert("/w/a.txt", "a2");
        let outcomes = ctx.watchers.dispatch(&FileEvent::changed("/w/a.txt")).await;

        assert_eq!(outcomes, vec![ChangeOutcome::Resynced]);
        assert_eq!(a.text(), "a2");
        assert_eq!(b.text(), "b");
    }

    #[test]
    fn test_save_guard_covers_path_until_dropped() {
        let hub = FileWatchHub::new(Rc::new(ManualWatcher::new()));
        let path = Path::new("/w/a.txt");
        assert!(!hub.is_saving(path));
        assert_eq!(hub.save_generation(path), 0);

        let first = hub.begin_save(path);
        let second = hub.begin_save(path);
        assert!(hub.is_saving(path));
        assert!(!hub.is_saving(Path::new("/w/b.txt")));

        drop(first);
        assert!(hub.is_saving(path));
        drop(second);
        assert!(!hub.is_saving(path));
        assert_eq!(hub.save_generation(path), 2);
    }
}
