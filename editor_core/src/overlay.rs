//! Gutter decorations for uncommitted changes.
//!
//! A [`DiffOverlay`] follows one view: whenever the buffer stops changing or
//! the view moves to another path it asks its [`RevisionSource`] for hunks and
//! replaces the decorations on the view's surface. The
//! [`DiffOverlayManager`] gives every editor of a workspace its own overlay.

use crate::config::Config;
use crate::diff::{decorations, next_hunk_row, previous_hunk_row, Hunk, RevisionSource};
use crate::event::{CompositeSubscription, Subscription};
use crate::registry::HolderId;
use crate::surface::{BufferPosition, Decoration, DecorationId};
use crate::view::{View, WeakView};
use crate::workspace::WorkspaceRegistry;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

struct OverlayState {
    view: WeakView,
    revisions: Rc<dyn RevisionSource>,
    config: Rc<Config>,
    hunks: RefCell<Vec<Hunk>>,
    decorations: RefCell<Vec<Decoration>>,
    decoration_ids: RefCell<Vec<DecorationId>>,
    subscriptions: CompositeSubscription,
    disposed: Cell<bool>,
}

impl OverlayState {
    fn update(&self) {
        if self.disposed.get() {
            return;
        }
        let Some(view) = self.view.upgrade().filter(|view| !view.is_destroyed()) else {
            return;
        };

        let limit = self.config.settings().max_buffer_length_to_diff;
        let model = view.model();
        let hunks = match view.path() {
            Some(_) if model.len_bytes() > limit => {
                log::debug!("not diffing {}: {} bytes", model.identity(), model.len_bytes());
                Vec::new()
            }
            Some(path) => self
                .revisions
                .line_diffs(&path, &model.text())
                .unwrap_or_default(),
            None => Vec::new(),
        };
        log::trace!("{} hunks in {}", hunks.len(), model.identity());

        let next = decorations(&hunks);
        let previous = std::mem::take(&mut *self.decoration_ids.borrow_mut());
        let ids = view.surface().delta_decorations(&previous, &next);
        *self.decoration_ids.borrow_mut() = ids;
        *self.decorations.borrow_mut() = next;
        *self.hunks.borrow_mut() = hunks;
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.subscriptions.dispose();
        let ids = std::mem::take(&mut *self.decoration_ids.borrow_mut());
        if let Some(view) = self.view.upgrade().filter(|view| !view.is_destroyed()) {
            view.surface().delta_decorations(&ids, &[]);
        }
        self.hunks.borrow_mut().clear();
        self.decorations.borrow_mut().clear();
    }
}

/// Diff decorations and hunk navigation for one view.
#[derive(Clone)]
pub struct DiffOverlay {
    state: Rc<OverlayState>,
}

impl fmt::Debug for DiffOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffOverlay")
            .field("hunks", &self.state.hunks.borrow().len())
            .field("disposed", &self.state.disposed.get())
            .finish()
    }
}

impl DiffOverlay {
    /// Starts decorating `view`. Decorations are computed right away and
    /// again after every stop-changing, path change or settings change.
    pub fn attach(view: &View, revisions: Rc<dyn RevisionSource>, config: Rc<Config>) -> Self {
        let state = Rc::new(OverlayState {
            view: view.downgrade(),
            revisions,
            config: Rc::clone(&config),
            hunks: RefCell::new(Vec::new()),
            decorations: RefCell::new(Vec::new()),
            decoration_ids: RefCell::new(Vec::new()),
            subscriptions: CompositeSubscription::new(),
            disposed: Cell::new(false),
        });

        let weak = Rc::downgrade(&state);
        state.subscriptions.add(view.on_did_stop_changing(updater(&weak)));
        state.subscriptions.add(view.on_did_change_path(updater(&weak)));
        state.subscriptions.add(view.on_did_destroy({
            let weak = Weak::clone(&weak);
            move |_| {
                if let Some(state) = weak.upgrade() {
                    state.dispose();
                }
            }
        }));
        // Fires immediately, which performs the first update.
        state.subscriptions.add(config.observe(updater(&weak)));

        Self { state }
    }

    /// Recomputes hunks and decorations now.
    pub fn update_diffs(&self) {
        self.state.update();
    }

    /// Hunks of the last update, ordered by position in the buffer.
    pub fn hunks(&self) -> Vec<Hunk> {
        self.state.hunks.borrow().clone()
    }

    /// Decorations applied by the last update.
    pub fn decorations(&self) -> Vec<Decoration> {
        self.state.decorations.borrow().clone()
    }

    /// Moves the cursor to the next hunk. Returns false if there is none.
    pub fn move_to_next_diff(&self) -> bool {
        self.move_cursor(next_hunk_row)
    }

    /// Moves the cursor to the previous hunk. Returns false if there is none.
    pub fn move_to_previous_diff(&self) -> bool {
        self.move_cursor(previous_hunk_row)
    }

    fn move_cursor(&self, find: fn(u32, &[Hunk], bool) -> Option<u32>) -> bool {
        let Some(view) = self.state.view.upgrade().filter(|view| !view.is_destroyed()) else {
            return false;
        };
        let wrap = self.state.config.settings().wrap_around_on_move_to_diff;
        let cursor_line = view.cursor_position().row + 1;
        let row = find(cursor_line, &self.state.hunks.borrow(), wrap);
        match row {
            Some(row) => {
                view.set_cursor_position(BufferPosition::new(row, 0));
                true
            }
            None => false,
        }
    }

    /// Removes the decorations and stops following the view.
    pub fn dispose(&self) {
        self.state.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.state.disposed.get()
    }
}

fn updater<E: 'static>(weak: &Weak<OverlayState>) -> impl Fn(&E) + 'static {
    let weak = Weak::clone(weak);
    move |_| {
        if let Some(state) = weak.upgrade() {
            state.update();
        }
    }
}

struct ManagerState {
    overlays: RefCell<HashMap<HolderId, (DiffOverlay, Subscription)>>,
    revisions: Rc<dyn RevisionSource>,
    config: Rc<Config>,
}

impl ManagerState {
    fn add(self: &Rc<Self>, view: &View) {
        if view.is_destroyed() || self.overlays.borrow().contains_key(&view.id()) {
            return;
        }
        let overlay = DiffOverlay::attach(view, Rc::clone(&self.revisions), Rc::clone(&self.config));
        let weak = Rc::downgrade(self);
        let id = view.id();
        let cleanup = view.on_did_destroy(move |_| {
            if let Some(state) = weak.upgrade() {
                let removed = state.overlays.borrow_mut().remove(&id);
                drop(removed);
            }
        });
        self.overlays.borrow_mut().insert(id, (overlay, cleanup));
    }
}

/// Keeps one [`DiffOverlay`] per editor of a workspace.
pub struct DiffOverlayManager {
    workspace: WorkspaceRegistry,
    state: Rc<ManagerState>,
    _observer: Subscription,
}

impl fmt::Debug for DiffOverlayManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffOverlayManager")
            .field("overlays", &self.state.overlays.borrow().len())
            .finish()
    }
}

impl DiffOverlayManager {
    /// Attaches an overlay to every current and future editor of `workspace`.
    pub fn install(
        workspace: &WorkspaceRegistry,
        revisions: Rc<dyn RevisionSource>,
        config: Rc<Config>,
    ) -> Self {
        let state = Rc::new(ManagerState {
            overlays: RefCell::new(HashMap::new()),
            revisions,
            config,
        });
        let weak = Rc::downgrade(&state);
        let observer = workspace.observe_all(move |view| {
            if let Some(state) = weak.upgrade() {
                state.add(view);
            }
        });
        Self {
            workspace: workspace.clone(),
            state,
            _observer: observer,
        }
    }

    pub fn overlay(&self, view: &View) -> Option<DiffOverlay> {
        self.state
            .overlays
            .borrow()
            .get(&view.id())
            .map(|(overlay, _)| overlay.clone())
    }

    /// Recomputes every overlay, e.g. after the reference revisions changed.
    pub fn refresh(&self) {
        let overlays: Vec<DiffOverlay> = self
            .state
            .overlays
            .borrow()
            .values()
            .map(|(overlay, _)| overlay.clone())
            .collect();
        for overlay in overlays {
            overlay.update_diffs();
        }
    }

    /// Moves the cursor of the active editor to its next hunk.
    pub fn move_to_next_diff(&self) -> bool {
        self.active_overlay()
            .is_some_and(|overlay| overlay.move_to_next_diff())
    }

    /// Moves the cursor of the active editor to its previous hunk.
    pub fn move_to_previous_diff(&self) -> bool {
        self.active_overlay()
            .is_some_and(|overlay| overlay.move_to_previous_diff())
    }

    fn active_overlay(&self) -> Option<DiffOverlay> {
        self.workspace
            .active_editor()
            .and_then(|view| self.overlay(&view))
    }

    pub fn len(&self) -> usize {
        self.state.overlays.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::diff::StaticRevisions;
    use crate::fs::MemoryFileSystem;
    use crate::surface::{DecorationClass, HeadlessSurfaceFactory};
    use crate::view::EditorContext;
    use crate::watch::ManualWatcher;
    use crate::workspace::Container;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    const REFERENCE: &str = "a\nb\nc\nd\ne\nf\ng\nh\n";

    struct Fixture {
        fs: Rc<MemoryFileSystem>,
        surfaces: Rc<HeadlessSurfaceFactory>,
        revisions: Rc<StaticRevisions>,
        ctx: EditorContext,
    }

    impl Fixture {
        fn new() -> Self {
            let fs = Rc::new(MemoryFileSystem::new());
            let surfaces = Rc::new(HeadlessSurfaceFactory::new());
            let ctx = EditorContext::new(
                fs.clone(),
                Rc::new(ManualWatcher::new()),
                surfaces.clone(),
                Settings::default(),
            );
            let revisions = Rc::new(StaticRevisions::new());
            revisions.set("/w/a.txt", REFERENCE);
            fs.insert("/w/a.txt", REFERENCE);
            Self {
                fs,
                surfaces,
                revisions,
                ctx,
            }
        }

        async fn open(&self) -> View {
            View::open(&self.ctx, Some(PathBuf::from("/w/a.txt"))).await.unwrap()
        }

        fn attach(&self, view: &View) -> DiffOverlay {
            DiffOverlay::attach(view, self.revisions.clone(), Rc::clone(&self.ctx.config))
        }
    }

    #[tokio::test]
    async fn test_decorations_follow_stop_changing() {
        let fx = Fixture::new();
        let view = fx.open().await;
        let overlay = fx.attach(&view);
        assert!(overlay.hunks().is_empty());

        view.set_text("a\nB\nc\nd\ne\nf\ng\nh\nnew\n");
        assert!(overlay.hunks().is_empty());
        view.tick(Instant::now() + Duration::from_secs(1));

        let classes: Vec<_> = overlay.decorations().iter().map(|d| d.class).collect();
        assert_eq!(classes, vec![DecorationClass::LineModified, DecorationClass::LineAdded]);
        let surface = fx.surfaces.last().unwrap();
        assert_eq!(surface.decorations(), overlay.decorations());
    }

    #[tokio::test]
    async fn test_removed_first_lines_anchor_at_top() {
        let fx = Fixture::new();
        let view = fx.open().await;
        let overlay = fx.attach(&view);

        view.set_text("c\nd\ne\nf\ng\nh\n");
        overlay.update_diffs();

        let decorations = overlay.decorations();
        assert_eq!(decorations.len(), 1);
        assert_eq!(decorations[0].start_row, 0);
        assert_eq!(decorations[0].class, DecorationClass::PreviousLineRemoved);
    }

    #[tokio::test]
    async fn test_oversized_buffer_gets_no_decorations() {
        let fx = Fixture::new();
        fx.ctx.config.update(|s| s.max_buffer_length_to_diff = 8);
        let view = fx.open().await;
        let overlay = fx.attach(&view);

        view.set_text("completely different and long");
        overlay.update_diffs();
        assert!(overlay.hunks().is_empty());

        // Raising the limit recomputes immediately.
        fx.ctx.config.update(|s| s.max_buffer_length_to_diff = 1024);
        assert_eq!(overlay.hunks().len(), 1);
    }

    #[tokio::test]
    async fn test_untracked_and_untitled_views_have_no_hunks() {
        let fx = Fixture::new();
        fx.fs.insert("/w/other.txt", "x");
        let other = View::open(&fx.ctx, Some("/w/other.txt".into())).await.unwrap();
        let untitled = View::untitled(&fx.ctx);
        untitled.set_text("x");

        assert!(fx.attach(&other).hunks().is_empty());
        assert!(fx.attach(&untitled).hunks().is_empty());
    }

    #[tokio::test]
    async fn test_navigation_wraps_around() {
        let fx = Fixture::new();
        let view = fx.open().await;
        let overlay = fx.attach(&view);
        view.set_text("a\nB\nc\nd\ne\nF\ng\nh\n");
        overlay.update_diffs();

        view.set_cursor_position(BufferPosition::new(3, 0));
        assert!(overlay.move_to_next_diff());
        assert_eq!(view.cursor_position().row, 5);
        assert!(overlay.move_to_next_diff());
        assert_eq!(view.cursor_position().row, 1);
        assert!(overlay.move_to_previous_diff());
        assert_eq!(view.cursor_position().row, 5);

        fx.ctx.config.update(|s| s.wrap_around_on_move_to_diff = false);
        assert!(!overlay.move_to_next_diff());
        assert_eq!(view.cursor_position().row, 5);
    }

    #[tokio::test]
    async fn test_save_as_recomputes_for_new_path() {
        let fx = Fixture::new();
        let view = View::untitled(&fx.ctx);
        let overlay = fx.attach(&view);
        view.set_text("a\nb\n");
        fx.revisions.set("/w/b.txt", "a\n");

        view.save_as("/w/b.txt").await.unwrap();
        assert_eq!(overlay.hunks(), vec![Hunk::new(1, 0, 2, 1)]);
    }

    #[tokio::test]
    async fn test_dispose_clears_surface() {
        let fx = Fixture::new();
        let view = fx.open().await;
        view.set_text("x\n");
        let overlay = fx.attach(&view);
        let surface = fx.surfaces.last().unwrap();
        assert!(!surface.decorations().is_empty());

        overlay.dispose();
        assert!(surface.decorations().is_empty());
        assert!(overlay.is_disposed());
    }

    #[tokio::test]
    async fn test_manager_tracks_workspace_editors() {
        let fx = Fixture::new();
        let workspace = WorkspaceRegistry::new();
        let first = fx.open().await;
        workspace.did_add_item(&first, Container::Center);

        let manager = DiffOverlayManager::install(&workspace, fx.revisions.clone(), Rc::clone(&fx.ctx.config));
        let second = first.split().unwrap();
        workspace.did_add_item(&second, Container::Center);
        assert_eq!(manager.len(), 2);

        first.set_text("a\nb\nc\nd\ne\nf\ng\nH\n");
        manager.refresh();
        workspace.did_change_active_item(Some(&first), Container::Center);
        assert!(manager.move_to_next_diff());
        assert_eq!(first.cursor_position().row, 7);

        first.destroy();
        assert_eq!(manager.len(), 1);
        assert!(manager.overlay(&first).is_none());
        assert!(!manager.move_to_previous_diff());
    }
}
