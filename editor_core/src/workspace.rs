//! Tracking of the editors open in the host workspace.
//!
//! The host reports pane items as they are added and activated. Items are
//! recognized as editors by capability ([`PaneItem::as_text_editor`]), so the
//! host can mix its own item types freely. Only the center container is
//! tracked.

use crate::event::{Emitter, Subscription};
use crate::session::SessionRecord;
use crate::view::View;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Dock locations of the host workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    Center,
    Left,
    Right,
    Bottom,
}

/// Anything the host can put in a pane.
pub trait PaneItem {
    fn title(&self) -> String;

    /// Returns the editor view behind this item, if it is one.
    fn as_text_editor(&self) -> Option<View> {
        None
    }

    fn serialize(&self) -> Option<SessionRecord> {
        None
    }

    fn should_prompt_to_save(&self) -> bool {
        false
    }

    fn allowed_locations(&self) -> Vec<Container> {
        vec![Container::Center]
    }

    fn destroy(&self);
}

impl PaneItem for View {
    fn title(&self) -> String {
        View::title(self)
    }

    fn as_text_editor(&self) -> Option<View> {
        Some(self.clone())
    }

    fn serialize(&self) -> Option<SessionRecord> {
        Some(View::serialize(self))
    }

    fn should_prompt_to_save(&self) -> bool {
        View::should_prompt_to_save(self)
    }

    fn allowed_locations(&self) -> Vec<Container> {
        View::allowed_locations(self)
    }

    fn destroy(&self) {
        View::destroy(self)
    }
}

struct Tracked {
    view: View,
    _destroyed: Subscription,
}

#[derive(Default)]
struct WorkspaceState {
    editors: RefCell<Vec<Tracked>>,
    active: RefCell<Option<View>>,
    active_changed: Emitter<Option<View>>,
    added: Emitter<View>,
}

impl WorkspaceState {
    fn remove(&self, id: u64) {
        let removed: Vec<Tracked> = {
            let mut editors = self.editors.borrow_mut();
            let (gone, kept): (Vec<Tracked>, Vec<Tracked>) = std::mem::take(&mut *editors)
                .into_iter()
                .partition(|tracked| tracked.view.id() == id);
            *editors = kept;
            gone
        };
        if removed.is_empty() {
            return;
        }
        log::trace!("editor {} left the workspace", id);

        let was_active = self.active.borrow().as_ref().is_some_and(|view| view.id() == id);
        if was_active {
            *self.active.borrow_mut() = None;
            self.active_changed.emit(&None);
        }
        drop(removed);
    }
}

/// Registry of the editors in the center container.
#[derive(Clone, Default)]
pub struct WorkspaceRegistry {
    state: Rc<WorkspaceState>,
}

impl fmt::Debug for WorkspaceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceRegistry")
            .field("editors", &self.state.editors.borrow().len())
            .field("active", &self.state.active.borrow().as_ref().map(View::id))
            .finish()
    }
}

impl WorkspaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host callback: `item` was added to `container`.
    pub fn did_add_item(&self, item: &dyn PaneItem, container: Container) {
        if container != Container::Center {
            return;
        }
        if let Some(view) = item.as_text_editor() {
            self.track(view);
        }
    }

    fn track(&self, view: View) -> bool {
        if view.is_destroyed() {
            return false;
        }
        let known = self
            .state
            .editors
            .borrow()
            .iter()
            .any(|tracked| tracked.view == view);
        if known {
            return false;
        }

        let weak: Weak<WorkspaceState> = Rc::downgrade(&self.state);
        let id = view.id();
        let destroyed = view.on_did_destroy(move |_| {
            if let Some(state) = weak.upgrade() {
                state.remove(id);
            }
        });
        self.state.editors.borrow_mut().push(Tracked {
            view: view.clone(),
            _destroyed: destroyed,
        });
        log::trace!("editor {} joined the workspace", id);
        self.state.added.emit(&view);
        true
    }

    /// Host callback: `item` became the active item of `container`.
    ///
    /// Observers are notified only when the new or the previous active item
    /// is an editor.
    pub fn did_change_active_item(&self, item: Option<&dyn PaneItem>, container: Container) {
        if container != Container::Center {
            return;
        }
        let editor = item
            .and_then(|item| item.as_text_editor())
            .filter(|view| !view.is_destroyed());
        let unchanged = *self.state.active.borrow() == editor;
        if unchanged {
            return;
        }
        if let Some(view) = &editor {
            self.track(view.clone());
        }

        *self.state.active.borrow_mut() = editor.clone();
        self.state.active_changed.emit(&editor);
    }

    pub fn active_editor(&self) -> Option<View> {
        self.state.active.borrow().clone()
    }

    /// Live editors in the order they were added.
    pub fn editors(&self) -> Vec<View> {
        self.state
            .editors
            .borrow()
            .iter()
            .map(|tracked| tracked.view.clone())
            .collect()
    }

    /// Session records of every editor.
    pub fn serialize(&self) -> Vec<SessionRecord> {
        self.editors().iter().map(View::serialize).collect()
    }

    /// Calls `callback` with the active editor now and on every change.
    pub fn observe_active(&self, callback: impl Fn(&Option<View>) + 'static) -> Subscription {
        callback(&self.active_editor());
        self.state.active_changed.subscribe(callback)
    }

    /// Calls `callback` for every current editor and every future one.
    pub fn observe_all(&self, callback: impl Fn(&View) + 'static) -> Subscription {
        for view in self.editors() {
            callback(&view);
        }
        self.state.added.subscribe(callback)
    }

    pub fn on_did_change_active(&self, callback: impl Fn(&Option<View>) + 'static) -> Subscription {
        self.state.active_changed.subscribe(callback)
    }

    pub fn on_did_add(&self, callback: impl Fn(&View) + 'static) -> Subscription {
        self.state.added.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::view::EditorContext;
    use crate::watch::ManualWatcher;
    use std::cell::Cell;

    struct Terminal;

    impl PaneItem for Terminal {
        fn title(&self) -> String {
            "terminal".to_string()
        }

        fn destroy(&self) {}
    }

    fn context() -> EditorContext {
        EditorContext::headless(Rc::new(MemoryFileSystem::new()), Rc::new(ManualWatcher::new()))
    }

    #[test]
    fn test_only_center_editors_are_tracked() {
        let ctx = context();
        let workspace = WorkspaceRegistry::new();
        let view = View::untitled(&ctx);

        workspace.did_add_item(&Terminal, Container::Center);
        workspace.did_add_item(&view, Container::Left);
        assert!(workspace.editors().is_empty());

        workspace.did_add_item(&view, Container::Center);
        workspace.did_add_item(&view, Container::Center);
        assert_eq!(workspace.editors(), vec![view]);
    }

    #[test]
    fn test_observe_all_sees_current_and_future() {
        let ctx = context();
        let workspace = WorkspaceRegistry::new();
        let first = View::untitled(&ctx);
        workspace.did_add_item(&first, Container::Center);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let _sub = {
            let seen = seen.clone();
            workspace.observe_all(move |view| seen.borrow_mut().push(view.id()))
        };
        let second = View::untitled(&ctx);
        workspace.did_add_item(&second, Container::Center);

        assert_eq!(*seen.borrow(), vec![first.id(), second.id()]);
    }

    #[test]
    fn test_active_notifications_only_involve_editors() {
        let ctx = context();
        let workspace = WorkspaceRegistry::new();
        let view = View::untitled(&ctx);
        let calls = Rc::new(Cell::new(0));
        let _sub = {
            let calls = calls.clone();
            workspace.observe_active(move |_| calls.set(calls.get() + 1))
        };
        assert_eq!(calls.get(), 1);

        workspace.did_change_active_item(Some(&Terminal), Container::Center);
        assert_eq!(calls.get(), 1);

        workspace.did_change_active_item(Some(&view), Container::Center);
        assert_eq!(calls.get(), 2);
        assert_eq!(workspace.active_editor(), Some(view.clone()));
        assert_eq!(workspace.editors(), vec![view.clone()]);

        workspace.did_change_active_item(Some(&view), Container::Center);
        assert_eq!(calls.get(), 2);

        workspace.did_change_active_item(Some(&Terminal), Container::Center);
        assert_eq!(calls.get(), 3);
        assert_eq!(workspace.active_editor(), None);

        workspace.did_change_active_item(None, Container::Center);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_destroyed_editors_leave_workspace() {
        let ctx = context();
        let workspace = WorkspaceRegistry::new();
        let view = View::untitled(&ctx);
        workspace.did_add_item(&view, Container::Center);
        workspace.did_change_active_item(Some(&view), Container::Center);

        let active = Rc::new(RefCell::new(Vec::new()));
        let _sub = {
            let active = active.clone();
            workspace.on_did_change_active(move |view| active.borrow_mut().push(view.is_some()))
        };

        PaneItem::destroy(&view);

        assert!(workspace.editors().is_empty());
        assert_eq!(workspace.active_editor(), None);
        assert_eq!(*active.borrow(), vec![false]);
        assert!(ctx.registry.is_empty());
    }

    #[test]
    fn test_pane_item_capabilities() {
        let ctx = context();
        let view = View::untitled(&ctx);
        let item: &dyn PaneItem = &view;

        assert_eq!(item.title(), "untitled");
        assert!(item.as_text_editor().is_some());
        assert_eq!(item.allowed_locations(), vec![Container::Center]);
        assert!(!item.should_prompt_to_save());
        assert!(item.serialize().is_some_and(|record| record.filepath.is_none()));

        assert!(Terminal.as_text_editor().is_none());
        assert!(Terminal.serialize().is_none());
    }
}
