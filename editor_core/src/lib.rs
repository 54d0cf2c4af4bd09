//! Paneview Core - Document models, view lifecycle and diff overlay.
//!
//! This crate holds the logic that lets a host workspace manage editor
//! surfaces backed by an external editing engine: one shared model per
//! document, views with correct dirty tracking under external changes,
//! save-as re-keying, and gutter decorations for uncommitted changes.
//!
//! It has no dependency on any runtime, windowing or rendering system. I/O
//! and the editor widget are reached through traits ([`FileSystem`],
//! [`PathWatcher`], [`EditorSurface`]) that hosts implement.

pub mod buffer;
pub mod config;
pub mod debounce;
pub mod diff;
pub mod error;
pub mod event;
pub mod fs;
pub mod language;
pub mod model;
pub mod overlay;
pub mod registry;
pub mod session;
pub mod surface;
pub mod view;
pub mod watch;
pub mod workspace;

pub use buffer::TextBuffer;
pub use config::{Config, EditorPreferences, Settings, SurfaceOptions};
pub use diff::{compute_hunks, Hunk, HunkKind, RevisionSource, StaticRevisions};
pub use error::{ConfigError, IoOp, ViewError};
pub use event::{CompositeSubscription, Emitter, Subscription};
pub use fs::{FileSystem, IoFuture, MemoryFileSystem};
pub use language::{GrammarInfo, Language};
pub use model::{DocumentId, TextModel};
pub use overlay::{DiffOverlay, DiffOverlayManager};
pub use registry::{HolderId, ModelHolder, ModelRegistry};
pub use session::SessionRecord;
pub use surface::{
    BufferPosition, Decoration, DecorationClass, EditorSurface, EnginePosition, HeadlessSurface,
    HeadlessSurfaceFactory, SurfaceFactory,
};
pub use view::{ChangeOutcome, EditorContext, SaveEvent, View, ViewState, WeakView};
pub use watch::{FileEvent, FileEventKind, FileWatchHub, ManualWatcher, PathWatcher, SaveGuard};
pub use workspace::{Container, PaneItem, WorkspaceRegistry};
