//! Editor views.
//!
//! A [`View`] is one editing surface over a shared [`TextModel`]. It owns the
//! baseline the buffer is compared against (the last content known to be on
//! disk), the backing path, the surface handle and every subscription it
//! made. Several views may show the same model (split panes); each keeps its
//! own baseline.
//!
//! All async operations re-check liveness after every await, so a view that
//! is destroyed while I/O is in flight is never mutated afterwards.

use crate::config::{Config, Settings, SurfaceOptions};
use crate::debounce::Debounce;
use crate::error::{IoOp, ViewError};
use crate::event::{CompositeSubscription, Emitter, Subscription};
use crate::fs::FileSystem;
use crate::language::{GrammarInfo, Language};
use crate::model::{DocumentId, TextModel};
use crate::registry::{HolderId, ModelHolder, ModelRegistry};
use crate::session::SessionRecord;
use crate::surface::{BufferPosition, EditorSurface, HeadlessSurfaceFactory, SurfaceFactory};
use crate::watch::{FileEventKind, FileWatchHub, PathWatcher};
use crate::workspace::{Container, WorkspaceRegistry};
use std::cell::{Cell, RefCell};
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

/// Collaborators shared by every view of a workspace.
#[derive(Clone)]
pub struct EditorContext {
    pub registry: Rc<ModelRegistry>,
    pub fs: Rc<dyn FileSystem>,
    pub watchers: Rc<FileWatchHub>,
    pub surfaces: Rc<dyn SurfaceFactory>,
    pub config: Rc<Config>,
}

impl EditorContext {
    pub fn new(
        fs: Rc<dyn FileSystem>,
        watcher: Rc<dyn PathWatcher>,
        surfaces: Rc<dyn SurfaceFactory>,
        settings: Settings,
    ) -> Self {
        Self {
            registry: Rc::new(ModelRegistry::new()),
            fs,
            watchers: Rc::new(FileWatchHub::new(watcher)),
            surfaces,
            config: Rc::new(Config::new(settings)),
        }
    }

    /// Context with headless surfaces and default settings.
    pub fn headless(fs: Rc<dyn FileSystem>, watcher: Rc<dyn PathWatcher>) -> Self {
        Self::new(fs, watcher, Rc::new(HeadlessSurfaceFactory::new()), Settings::default())
    }
}

/// Observable lifecycle state of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// A reconciliation read is in flight.
    Loading,
    Clean,
    Dirty,
    Saving,
    Destroyed,
}

/// Result of reconciling a view with an on-disk change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// The view is writing the file; the event is its own echo.
    StaleWriteIgnored,
    /// Disk content equals the baseline, or the view has no path.
    Unchanged,
    /// The view was clean; buffer and baseline now match disk.
    Resynced,
    /// The view was dirty; only the baseline moved.
    BaselineUpdated,
    /// The file is gone; the view now counts as modified.
    Deleted,
    /// Disk could not be read; nothing changed.
    ReadFailed,
    /// The view was destroyed before reconciliation finished.
    Destroyed,
}

/// Payload of the did-save event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveEvent {
    pub path: PathBuf,
}

#[derive(Default)]
struct ViewEvents {
    modified: Emitter<bool>,
    title: Emitter<String>,
    path: Emitter<Option<PathBuf>>,
    grammar: Emitter<GrammarInfo>,
    cursor: Emitter<BufferPosition>,
    stop_changing: Emitter<()>,
    saved: Emitter<SaveEvent>,
    destroyed: Emitter<()>,
}

impl ViewEvents {
    fn clear(&self) {
        self.modified.clear();
        self.title.clear();
        self.path.clear();
        self.grammar.clear();
        self.cursor.clear();
        self.stop_changing.clear();
        self.saved.clear();
        self.destroyed.clear();
    }
}

/// Counts an in-flight operation for as long as it lives.
struct InFlight<'a>(&'a Cell<u32>);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a Cell<u32>) -> Self {
        counter.set(counter.get() + 1);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

struct ViewInner {
    id: HolderId,
    self_ref: Weak<ViewInner>,
    ctx: EditorContext,
    model: RefCell<Rc<TextModel>>,
    surface: Rc<dyn EditorSurface>,
    /// `None` once the backing file was deleted.
    saved_text: RefCell<Option<String>>,
    filepath: RefCell<Option<PathBuf>>,
    saving: Cell<u32>,
    loading: Cell<u32>,
    /// Language of the model left behind by a rekey.
    language_before_rekey: Cell<Option<Language>>,
    destroyed: Cell<bool>,
    reported_modified: Cell<bool>,
    debounce: RefCell<Debounce>,
    subscriptions: CompositeSubscription,
    model_subscriptions: CompositeSubscription,
    file_watch: RefCell<Subscription>,
    events: ViewEvents,
}

impl ViewInner {
    fn model(&self) -> Rc<TextModel> {
        Rc::clone(&self.model.borrow())
    }

    fn check_live(&self) -> Result<(), ViewError> {
        if self.destroyed.get() {
            Err(ViewError::Destroyed)
        } else {
            Ok(())
        }
    }

    fn path(&self) -> Option<PathBuf> {
        self.filepath.borrow().clone()
    }

    fn is_modified(&self) -> bool {
        let model = self.model();
        match &*self.saved_text.borrow() {
            Some(saved) => !model.text_eq(saved),
            None => true,
        }
    }

    /// Emits modified-changed if the modified state moved since the last
    /// notification.
    fn refresh_modified(&self) {
        if self.destroyed.get() {
            return;
        }
        let modified = self.is_modified();
        if self.reported_modified.replace(modified) != modified {
            log::trace!("view {} modified={}", self.id, modified);
            self.events.modified.emit(&modified);
        }
    }

    fn set_baseline(&self, baseline: Option<String>) {
        *self.saved_text.borrow_mut() = baseline;
        self.refresh_modified();
    }

    /// Subscribes to content and language changes of `model`, dropping the
    /// subscriptions on the previous one.
    fn bind_model(&self, model: &TextModel) {
        self.model_subscriptions.clear();

        let weak = Weak::clone(&self.self_ref);
        self.model_subscriptions.add(model.on_did_change_content(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.debounce.borrow_mut().touch(Instant::now());
                inner.refresh_modified();
            }
        }));

        let weak = Weak::clone(&self.self_ref);
        self.model_subscriptions.add(model.on_did_change_language(move |language| {
            if let Some(inner) = weak.upgrade() {
                inner.events.grammar.emit(&language.grammar());
            }
        }));
    }

    /// Points the file watch at the current path.
    fn watch_path(&self) {
        let next = match (self.path(), self.self_ref.upgrade()) {
            (Some(path), Some(inner)) => self.ctx.watchers.subscribe(&path, &View { inner }),
            _ => Subscription::empty(),
        };
        // Subscribe before releasing the old watch so an unchanged path is
        // never unwatched in between.
        let previous = std::mem::replace(&mut *self.file_watch.borrow_mut(), next);
        drop(previous);
    }

    fn set_path(&self, path: Option<PathBuf>) {
        *self.filepath.borrow_mut() = path.clone();
        self.watch_path();
        self.events.path.emit(&path);
        self.events.title.emit(&title_of(path.as_deref()));
    }
}

impl ModelHolder for ViewInner {
    fn holder_id(&self) -> HolderId {
        self.id
    }

    fn replace_model(&self, model: Rc<TextModel>) {
        if self.destroyed.get() {
            return;
        }
        let previous = std::mem::replace(&mut *self.model.borrow_mut(), Rc::clone(&model));
        self.language_before_rekey.set(Some(previous.language()));
        self.bind_model(&model);
        self.surface.set_model(&model);
    }

    fn did_rekey(&self, previous: &DocumentId, baseline: &str) {
        if self.destroyed.get() {
            return;
        }
        let model = self.model();
        log::debug!("view {} moved from {} to {}", self.id, previous, model.identity());
        *self.saved_text.borrow_mut() = Some(baseline.to_string());
        self.set_path(model.identity().path().map(Path::to_path_buf));
        if self.language_before_rekey.take() != Some(model.language()) {
            self.events.grammar.emit(&model.language().grammar());
        }
        self.refresh_modified();
    }

    fn did_save(&self, baseline: &str) {
        if self.destroyed.get() {
            return;
        }
        self.set_baseline(Some(baseline.to_string()));
    }

    fn will_reload(&self, baseline: &str) {
        if self.destroyed.get() || self.is_modified() {
            return;
        }
        *self.saved_text.borrow_mut() = Some(baseline.to_string());
    }
}

impl Drop for ViewInner {
    fn drop(&mut self) {
        if self.destroyed.get() {
            return;
        }
        log::debug!("view {} dropped without destroy", self.id);
        let model = self.model();
        self.ctx.registry.detach(&model, self.id);
        self.surface.dispose();
    }
}

fn title_of(path: Option<&Path>) -> String {
    path.and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string())
}

/// Handle to an editor view. Clones refer to the same view.
#[derive(Clone)]
pub struct View {
    inner: Rc<ViewInner>,
}

/// Non-owning handle to a view.
#[derive(Clone)]
pub struct WeakView {
    inner: Weak<ViewInner>,
}

impl WeakView {
    pub fn upgrade(&self) -> Option<View> {
        self.inner.upgrade().map(|inner| View { inner })
    }
}

impl PartialEq for View {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for View {}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("id", &self.inner.id)
            .field("path", &self.inner.filepath.borrow())
            .field("state", &self.state())
            .finish()
    }
}

impl View {
    /// Opens `path` (or a fresh untitled buffer).
    ///
    /// A missing file yields an empty, clean document that will be created
    /// on first save. Any other read error is returned.
    pub async fn open(ctx: &EditorContext, path: Option<PathBuf>) -> Result<View, ViewError> {
        let Some(path) = path else {
            return Ok(Self::untitled(ctx));
        };

        let baseline = match ctx.fs.read(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("{} does not exist yet", path.display());
                String::new()
            }
            Err(e) => {
                log::error!("failed to open {}: {}", path.display(), e);
                return Err(ViewError::io(IoOp::Read, path, e));
            }
        };

        let model = ctx.registry.get(DocumentId::Path(path.clone()), &baseline);
        Ok(Self::bind(ctx, model, Some(baseline), Some(path)))
    }

    /// Creates a view over a new, empty untitled model.
    pub fn untitled(ctx: &EditorContext) -> View {
        let model = ctx.registry.get(ctx.registry.untitled_id(), "");
        Self::bind(ctx, model, Some(String::new()), None)
    }

    /// Builds a view over `model` and attaches it to the registry.
    fn bind(
        ctx: &EditorContext,
        model: Rc<TextModel>,
        baseline: Option<String>,
        path: Option<PathBuf>,
    ) -> View {
        let options = SurfaceOptions::from_settings(&ctx.config.settings());
        let surface = ctx.surfaces.create(&model, &options);
        let inner = Rc::new_cyclic(|self_ref| ViewInner {
            id: ctx.registry.next_holder_id(),
            self_ref: Weak::clone(self_ref),
            ctx: ctx.clone(),
            model: RefCell::new(Rc::clone(&model)),
            surface,
            saved_text: RefCell::new(baseline),
            filepath: RefCell::new(path),
            saving: Cell::new(0),
            loading: Cell::new(0),
            language_before_rekey: Cell::new(None),
            destroyed: Cell::new(false),
            reported_modified: Cell::new(false),
            debounce: RefCell::new(Debounce::new()),
            subscriptions: CompositeSubscription::new(),
            model_subscriptions: CompositeSubscription::new(),
            file_watch: RefCell::new(Subscription::empty()),
            events: ViewEvents::default(),
        });

        let holder: Rc<dyn ModelHolder> = inner.clone();
        if !ctx.registry.attach(&model, &holder) {
            log::warn!("view {} bound to unregistered model {}", inner.id, model.identity());
        }
        inner.bind_model(&model);

        let weak = Rc::downgrade(&inner);
        inner.subscriptions.add(ctx.config.observe(move |settings| {
            if let Some(inner) = weak.upgrade() {
                inner.surface.update_options(&SurfaceOptions::from_settings(settings));
            }
        }));

        inner.watch_path();
        inner.reported_modified.set(inner.is_modified());
        log::debug!("view {} bound to {}", inner.id, model.identity());
        View { inner }
    }

    pub fn id(&self) -> HolderId {
        self.inner.id
    }

    pub fn downgrade(&self) -> WeakView {
        WeakView {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// The model currently displayed.
    pub fn model(&self) -> Rc<TextModel> {
        self.inner.model()
    }

    pub fn surface(&self) -> Rc<dyn EditorSurface> {
        Rc::clone(&self.inner.surface)
    }

    pub fn state(&self) -> ViewState {
        let inner = &self.inner;
        if inner.destroyed.get() {
            ViewState::Destroyed
        } else if inner.saving.get() > 0 {
            ViewState::Saving
        } else if inner.loading.get() > 0 {
            ViewState::Loading
        } else if inner.is_modified() {
            ViewState::Dirty
        } else {
            ViewState::Clean
        }
    }

    /// True when the buffer differs from the baseline, or there is no
    /// baseline because the file was deleted.
    pub fn is_modified(&self) -> bool {
        self.inner.is_modified()
    }

    pub fn is_saving(&self) -> bool {
        self.inner.saving.get() > 0
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// The last content known to be on disk.
    pub fn saved_text(&self) -> Option<String> {
        self.inner.saved_text.borrow().clone()
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.inner.path()
    }

    pub fn text(&self) -> String {
        self.model().text()
    }

    pub fn set_text(&self, text: &str) {
        self.model().set_text(text);
    }

    /// Inserts `text` at a 0-based position.
    pub fn insert(&self, position: BufferPosition, text: &str) {
        let model = self.model();
        let offset = model.offset_at(position.row as usize, position.column as usize);
        model.insert(offset, text);
    }

    /// Writes the buffer to the backing file and makes it the new baseline.
    ///
    /// Returns the text that was written. On failure the baseline is kept, so
    /// the view stays modified.
    pub async fn save(&self) -> Result<String, ViewError> {
        let inner = &self.inner;
        inner.check_live()?;
        let path = inner.path().ok_or(ViewError::NoPath)?;
        let snapshot = inner.model().text();

        log::debug!("saving {}", path.display());
        let written = {
            let _saving = InFlight::enter(&inner.saving);
            let _guard = inner.ctx.watchers.begin_save(&path);
            inner.ctx.fs.write(&path, &snapshot).await
        };
        inner.check_live()?;
        if let Err(source) = written {
            log::error!("failed to save {}: {}", path.display(), source);
            return Err(ViewError::io(IoOp::Write, path, source));
        }

        if inner.path().as_deref() != Some(path.as_path()) {
            log::warn!("{} was moved while saving; keeping baseline", path.display());
            return Ok(snapshot);
        }

        inner.set_baseline(Some(snapshot.clone()));
        let model = inner.model();
        for holder in inner.ctx.registry.holders(&model) {
            if holder.holder_id() != inner.id {
                holder.did_save(&snapshot);
            }
        }
        inner.events.saved.emit(&SaveEvent { path });
        Ok(snapshot)
    }

    /// Writes the buffer to `path` and moves the view (and every sibling on
    /// the same model) to that identity.
    ///
    /// If the write fails nothing about the view's identity changes.
    pub async fn save_as(&self, path: impl Into<PathBuf>) -> Result<String, ViewError> {
        let path = path.into();
        let inner = &self.inner;
        inner.check_live()?;
        if inner.path().as_deref() == Some(path.as_path()) {
            return self.save().await;
        }

        let snapshot = inner.model().text();
        log::debug!("saving {} as {}", inner.model().identity(), path.display());
        let written = {
            let _saving = InFlight::enter(&inner.saving);
            let _guard = inner.ctx.watchers.begin_save(&path);
            inner.ctx.fs.write(&path, &snapshot).await
        };
        inner.check_live()?;
        if let Err(source) = written {
            log::error!("failed to save as {}: {}", path.display(), source);
            return Err(ViewError::io(IoOp::Write, path, source));
        }

        // Every holder, this view included, is re-pointed and adopts the new
        // path and baseline in `did_rekey`.
        let model = inner.model();
        inner
            .ctx
            .registry
            .rekey(&model, DocumentId::Path(path.clone()), &snapshot);
        inner.events.saved.emit(&SaveEvent { path });
        Ok(snapshot)
    }

    /// Reconciles the view with a change of its backing file.
    ///
    /// Clean views take the disk content; dirty views keep their buffer and
    /// only move the baseline. Read failures are logged and leave the view
    /// untouched.
    pub async fn handle_file_event(&self, kind: FileEventKind) -> ChangeOutcome {
        let inner = &self.inner;
        if inner.destroyed.get() {
            return ChangeOutcome::Destroyed;
        }
        let Some(path) = inner.path() else {
            return ChangeOutcome::Unchanged;
        };
        // Saves are tracked per path, so a sibling's write guards this view too.
        let watchers = &inner.ctx.watchers;
        if inner.saving.get() > 0 || watchers.is_saving(&path) {
            return ChangeOutcome::StaleWriteIgnored;
        }

        if kind == FileEventKind::Deleted {
            return self.mark_deleted(&path);
        }

        let generation = watchers.save_generation(&path);
        let read = {
            let _loading = InFlight::enter(&inner.loading);
            inner.ctx.fs.read(&path).await
        };
        if inner.destroyed.get() {
            return ChangeOutcome::Destroyed;
        }
        // A write that started while reading makes the read stale.
        if inner.saving.get() > 0
            || watchers.is_saving(&path)
            || watchers.save_generation(&path) != generation
        {
            return ChangeOutcome::StaleWriteIgnored;
        }
        if inner.path().as_deref() != Some(path.as_path()) {
            log::debug!("{} was moved during reconciliation", path.display());
            return ChangeOutcome::Unchanged;
        }

        let disk = match read {
            Ok(disk) => disk,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return self.mark_deleted(&path),
            Err(e) => {
                log::warn!("failed to reconcile {}: {}", path.display(), e);
                return ChangeOutcome::ReadFailed;
            }
        };

        if inner.saved_text.borrow().as_deref() == Some(disk.as_str()) {
            return ChangeOutcome::Unchanged;
        }

        if inner.is_modified() {
            log::debug!("{} changed on disk under unsaved edits", path.display());
            inner.set_baseline(Some(disk));
            ChangeOutcome::BaselineUpdated
        } else {
            log::debug!("reloading {}", path.display());
            let model = inner.model();
            // Baselines first, so the content change below never reports dirty
            // here or in a clean sibling.
            for holder in inner.ctx.registry.holders(&model) {
                if holder.holder_id() != inner.id {
                    holder.will_reload(&disk);
                }
            }
            *inner.saved_text.borrow_mut() = Some(disk.clone());
            if !model.text_eq(&disk) {
                model.set_text(&disk);
            }
            inner.refresh_modified();
            ChangeOutcome::Resynced
        }
    }

    fn mark_deleted(&self, path: &Path) -> ChangeOutcome {
        log::debug!("{} was deleted", path.display());
        self.inner.set_baseline(None);
        ChangeOutcome::Deleted
    }

    /// Snapshot for session restore.
    pub fn serialize(&self) -> SessionRecord {
        let model = self.model();
        let mut record = SessionRecord::new(
            self.path(),
            model.language().id(),
            self.inner.surface.save_view_state(),
            self.saved_text().unwrap_or_default(),
        );
        if self.is_modified() {
            record.current_text = Some(model.text());
        }
        record
    }

    /// Rebuilds a view from a session record.
    ///
    /// Returns `Ok(None)` when the file is gone and the record holds no
    /// unsaved edits. An existing file becomes the baseline; unsaved edits
    /// from the record win over it for the buffer.
    pub async fn deserialize(
        ctx: &EditorContext,
        record: &SessionRecord,
    ) -> Result<Option<View>, ViewError> {
        let language = Language::from_id(&record.language);

        let Some(path) = record.filepath.clone() else {
            let buffer = record.current_text.as_deref().unwrap_or(&record.text);
            let model = ctx.registry.get(ctx.registry.untitled_id(), buffer);
            model.set_language(language);
            let view = Self::bind(ctx, model, Some(record.text.clone()), None);
            view.inner.surface.restore_view_state(&record.view_state);
            return Ok(Some(view));
        };

        let exists = ctx
            .fs
            .exists(&path)
            .await
            .map_err(|e| ViewError::io(IoOp::Stat, path.clone(), e))?;
        if !exists && record.current_text.is_none() {
            log::debug!("not restoring {}: file is gone", path.display());
            return Ok(None);
        }

        let baseline = if exists {
            match ctx.fs.read(&path).await {
                Ok(disk) => Some(disk),
                Err(e) => {
                    log::warn!("failed to read {} on restore: {}", path.display(), e);
                    Some(record.text.clone())
                }
            }
        } else {
            None
        };

        let identity = DocumentId::Path(path.clone());
        let fresh = !ctx.registry.contains(&identity);
        let buffer = record
            .current_text
            .as_deref()
            .or(baseline.as_deref())
            .unwrap_or_default();
        let model = ctx.registry.get(identity, buffer);
        if fresh {
            model.set_language(language);
        }

        let view = Self::bind(ctx, model, baseline, Some(path));
        view.inner.surface.restore_view_state(&record.view_state);
        Ok(Some(view))
    }

    /// True when closing this view would lose edits: it is modified and no
    /// other view shows the same model.
    pub fn should_prompt_to_save(&self) -> bool {
        if self.is_destroyed() || !self.is_modified() {
            return false;
        }
        !self.inner.ctx.registry.is_shared(&self.model())
    }

    /// Opens a sibling view on the same model.
    pub fn split(&self) -> Result<View, ViewError> {
        self.inner.check_live()?;
        let view = Self::bind(&self.inner.ctx, self.model(), self.saved_text(), self.path());
        view.inner
            .surface
            .set_cursor_position(self.inner.surface.cursor_position());
        Ok(view)
    }

    /// Tears the view down. Later calls do nothing.
    pub fn destroy(&self) {
        let inner = &self.inner;
        if inner.destroyed.replace(true) {
            return;
        }
        let model = inner.model();
        log::debug!("destroying view {} ({})", inner.id, model.identity());

        inner.debounce.borrow_mut().cancel();
        let watch = std::mem::replace(&mut *inner.file_watch.borrow_mut(), Subscription::empty());
        drop(watch);
        inner.subscriptions.dispose();
        inner.model_subscriptions.dispose();
        inner.ctx.registry.detach(&model, inner.id);
        inner.surface.dispose();

        inner.events.destroyed.emit(&());
        inner.events.clear();
    }

    /// File name, or `untitled`.
    pub fn title(&self) -> String {
        title_of(self.inner.filepath.borrow().as_deref())
    }

    /// Title disambiguated against other open editors with the same file
    /// name: the directory segments they all share are dropped and the rest
    /// is appended. The last directory segment is always kept.
    pub fn long_title(&self, workspace: &WorkspaceRegistry) -> String {
        let title = self.title();
        if self.path().is_none() {
            return title;
        }

        let mut mine = None;
        let mut same_name: Vec<Vec<OsString>> = Vec::new();
        for view in workspace.editors() {
            if view.path().is_none() || view.title() != title {
                continue;
            }
            let segments: Vec<OsString> = view
                .directory_path()
                .map(|dir| dir.components().map(|c| c.as_os_str().to_os_string()).collect())
                .unwrap_or_default();
            if view == *self {
                mine = Some(segments.clone());
            }
            same_name.push(segments);
        }
        let Some(mine) = mine else {
            return title;
        };
        if same_name.len() == 1 {
            return title;
        }

        let common = (0..mine.len())
            .find(|&i| {
                same_name
                    .iter()
                    .any(|segments| segments.len() == i + 1 || segments.get(i) != Some(&mine[i]))
            })
            .unwrap_or(0);
        let rest: PathBuf = mine[common..].iter().collect();
        format!("{} \u{2014} {}", title, rest.display())
    }

    pub fn file_name(&self) -> Option<String> {
        self.path()
            .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
    }

    pub fn directory_path(&self) -> Option<PathBuf> {
        self.path()
            .and_then(|path| path.parent().map(Path::to_path_buf))
    }

    pub fn uri(&self) -> Option<String> {
        self.path().map(|path| format!("file://{}", path.display()))
    }

    pub fn default_location(&self) -> Container {
        Container::Center
    }

    pub fn allowed_locations(&self) -> Vec<Container> {
        vec![Container::Center]
    }

    /// Cursor position, 0-based.
    pub fn cursor_position(&self) -> BufferPosition {
        self.inner.surface.cursor_position().into()
    }

    pub fn set_cursor_position(&self, position: BufferPosition) {
        self.inner.surface.set_cursor_position(position.into());
        self.did_move_cursor();
    }

    /// Reports a cursor move made by the engine itself.
    pub fn did_move_cursor(&self) {
        if self.is_destroyed() {
            return;
        }
        let position = self.cursor_position();
        self.inner.events.cursor.emit(&position);
    }

    pub fn focus(&self) {
        self.inner.surface.focus();
    }

    /// Runs a built-in engine action such as `actions.find`.
    pub fn run_action(&self, id: &str) -> bool {
        let ran = self.inner.surface.run_action(id);
        if !ran {
            log::warn!("unknown editor action {}", id);
        }
        ran
    }

    pub fn language(&self) -> Language {
        self.model().language()
    }

    /// Switches the grammar of the model, which notifies every view on it.
    pub fn set_language(&self, language: Language) {
        self.model().set_language(language);
    }

    pub fn grammar(&self) -> GrammarInfo {
        self.language().grammar()
    }

    /// Fires stop-changing if the configured quiet period has elapsed since
    /// the last edit. Returns whether it fired.
    pub fn tick(&self, now: Instant) -> bool {
        if self.is_destroyed() {
            return false;
        }
        let delay = Duration::from_millis(self.inner.ctx.config.settings().stop_changing_delay_ms);
        let ready = self.inner.debounce.borrow_mut().take_ready(now, delay);
        if ready {
            self.inner.events.stop_changing.emit(&());
        }
        ready
    }

    pub fn on_did_change_modified(&self, callback: impl Fn(&bool) + 'static) -> Subscription {
        self.inner.events.modified.subscribe(callback)
    }

    pub fn on_did_change_title(&self, callback: impl Fn(&String) + 'static) -> Subscription {
        self.inner.events.title.subscribe(callback)
    }

    pub fn on_did_change_path(&self, callback: impl Fn(&Option<PathBuf>) + 'static) -> Subscription {
        self.inner.events.path.subscribe(callback)
    }

    pub fn on_did_change_grammar(&self, callback: impl Fn(&GrammarInfo) + 'static) -> Subscription {
        self.inner.events.grammar.subscribe(callback)
    }

    pub fn on_did_change_cursor_position(
        &self,
        callback: impl Fn(&BufferPosition) + 'static,
    ) -> Subscription {
        self.inner.events.cursor.subscribe(callback)
    }

    pub fn on_did_stop_changing(&self, callback: impl Fn(&()) + 'static) -> Subscription {
        self.inner.events.stop_changing.subscribe(callback)
    }

    pub fn on_did_save(&self, callback: impl Fn(&SaveEvent) + 'static) -> Subscription {
        self.inner.events.saved.subscribe(callback)
    }

    pub fn on_did_destroy(&self, callback: impl Fn(&()) + 'static) -> Subscription {
        self.inner.events.destroyed.subscribe_once(callback)
    }
}
