//! The editor widget boundary.
//!
//! Rendering, tokenization and keybindings live in an external engine. A view
//! talks to its widget through [`EditorSurface`]; hosts plug their engine in
//! with a [`SurfaceFactory`]. [`HeadlessSurface`] is a recording implementation
//! for hosts without a widget.

use crate::config::SurfaceOptions;
use crate::model::TextModel;
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

/// Handle for an applied decoration.
pub type DecorationId = u64;

/// Engine-side cursor position. Both fields are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnginePosition {
    pub line_number: u32,
    pub column: u32,
}

impl EnginePosition {
    pub fn new(line_number: u32, column: u32) -> Self {
        Self {
            line_number,
            column,
        }
    }
}

/// Host-side cursor position. Both fields are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferPosition {
    pub row: u32,
    pub column: u32,
}

impl BufferPosition {
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

impl From<EnginePosition> for BufferPosition {
    fn from(pos: EnginePosition) -> Self {
        Self {
            row: pos.line_number.saturating_sub(1),
            column: pos.column.saturating_sub(1),
        }
    }
}

impl From<BufferPosition> for EnginePosition {
    fn from(pos: BufferPosition) -> Self {
        Self {
            line_number: pos.row + 1,
            column: pos.column + 1,
        }
    }
}

/// Gutter style of a whole-line decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecorationClass {
    LineAdded,
    LineModified,
    LineRemoved,
    PreviousLineRemoved,
}

impl DecorationClass {
    /// CSS class the engine attaches to the line gutter.
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::LineAdded => "git-line-added",
            Self::LineModified => "git-line-modified",
            Self::LineRemoved => "git-line-removed",
            Self::PreviousLineRemoved => "git-previous-line-removed",
        }
    }
}

/// A declarative whole-line decoration over rows `start_row..=end_row`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoration {
    pub start_row: u32,
    pub end_row: u32,
    pub class: DecorationClass,
}

/// What a view needs from its editor widget.
pub trait EditorSurface {
    /// Displays `model`.
    fn set_model(&self, model: &Rc<TextModel>);

    fn cursor_position(&self) -> EnginePosition;

    fn set_cursor_position(&self, position: EnginePosition);

    fn focus(&self);

    /// Removes the decorations in `old` and applies `new`, returning their ids.
    fn delta_decorations(&self, old: &[DecorationId], new: &[Decoration]) -> Vec<DecorationId>;

    /// Runs a built-in engine action. Returns false for unknown ids.
    fn run_action(&self, id: &str) -> bool;

    /// Opaque state (scroll, cursor, folding) for session restore.
    fn save_view_state(&self) -> Value;

    fn restore_view_state(&self, state: &Value);

    fn update_options(&self, options: &SurfaceOptions);

    fn dispose(&self);
}

/// Creates a surface per view.
pub trait SurfaceFactory {
    fn create(&self, model: &Rc<TextModel>, options: &SurfaceOptions) -> Rc<dyn EditorSurface>;
}

/// Built-in actions a headless surface accepts.
pub const HEADLESS_ACTIONS: &[&str] = &["actions.find", "editor.action.gotoLine"];

/// Surface without rendering. Keeps cursor, decorations and options in memory.
#[derive(Debug)]
pub struct HeadlessSurface {
    model: RefCell<Weak<TextModel>>,
    cursor: Cell<EnginePosition>,
    decorations: RefCell<BTreeMap<DecorationId, Decoration>>,
    next_decoration: Cell<DecorationId>,
    options: RefCell<SurfaceOptions>,
    actions: RefCell<Vec<String>>,
    focused: Cell<bool>,
    disposed: Cell<bool>,
}

impl HeadlessSurface {
    pub fn new(model: &Rc<TextModel>, options: &SurfaceOptions) -> Self {
        Self {
            model: RefCell::new(Rc::downgrade(model)),
            cursor: Cell::new(EnginePosition::new(1, 1)),
            decorations: RefCell::new(BTreeMap::new()),
            next_decoration: Cell::new(1),
            options: RefCell::new(options.clone()),
            actions: RefCell::new(Vec::new()),
            focused: Cell::new(false),
            disposed: Cell::new(false),
        }
    }

    /// Returns the live decorations in row order.
    pub fn decorations(&self) -> Vec<Decoration> {
        let mut decorations: Vec<Decoration> = self.decorations.borrow().values().copied().collect();
        decorations.sort_by_key(|d| (d.start_row, d.end_row));
        decorations
    }

    pub fn options(&self) -> SurfaceOptions {
        self.options.borrow().clone()
    }

    /// Action ids that ran successfully, oldest first.
    pub fn actions(&self) -> Vec<String> {
        self.actions.borrow().clone()
    }

    /// Returns the displayed model, if it is still alive.
    pub fn model(&self) -> Option<Rc<TextModel>> {
        self.model.borrow().upgrade()
    }

    pub fn is_focused(&self) -> bool {
        self.focused.get()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    fn clamp(&self, position: EnginePosition) -> EnginePosition {
        let Some(model) = self.model() else {
            return EnginePosition::new(1, 1);
        };
        let lines = model.line_count().max(1) as u32;
        let line_number = position.line_number.clamp(1, lines);
        let max_column = model.line_len((line_number - 1) as usize) as u32 + 1;
        EnginePosition::new(line_number, position.column.clamp(1, max_column))
    }
}

impl EditorSurface for HeadlessSurface {
    fn set_model(&self, model: &Rc<TextModel>) {
        *self.model.borrow_mut() = Rc::downgrade(model);
        self.cursor.set(self.clamp(self.cursor.get()));
    }

    fn cursor_position(&self) -> EnginePosition {
        self.cursor.get()
    }

    fn set_cursor_position(&self, position: EnginePosition) {
        self.cursor.set(self.clamp(position));
    }

    fn focus(&self) {
        self.focused.set(true);
    }

    fn delta_decorations(&self, old: &[DecorationId], new: &[Decoration]) -> Vec<DecorationId> {
        let mut decorations = self.decorations.borrow_mut();
        for id in old {
            decorations.remove(id);
        }
        new.iter()
            .map(|decoration| {
                let id = self.next_decoration.get();
                self.next_decoration.set(id + 1);
                decorations.insert(id, *decoration);
                id
            })
            .collect()
    }

    fn run_action(&self, id: &str) -> bool {
        if !HEADLESS_ACTIONS.contains(&id) {
            return false;
        }
        self.actions.borrow_mut().push(id.to_string());
        true
    }

    fn save_view_state(&self) -> Value {
        let cursor = self.cursor.get();
        json!({
            "cursorState": {
                "lineNumber": cursor.line_number,
                "column": cursor.column,
            }
        })
    }

    fn restore_view_state(&self, state: &Value) {
        let cursor = &state["cursorState"];
        let (Some(line), Some(column)) = (cursor["lineNumber"].as_u64(), cursor["column"].as_u64()) else {
            return;
        };
        self.set_cursor_position(EnginePosition::new(line as u32, column as u32));
    }

    fn update_options(&self, options: &SurfaceOptions) {
        *self.options.borrow_mut() = options.clone();
    }

    fn dispose(&self) {
        self.disposed.set(true);
        self.decorations.borrow_mut().clear();
    }
}

/// Factory for [`HeadlessSurface`]. Keeps every surface it created so hosts
/// and tests can inspect them.
#[derive(Debug, Default)]
pub struct HeadlessSurfaceFactory {
    created: RefCell<Vec<Rc<HeadlessSurface>>>,
}

impl HeadlessSurfaceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surfaces created so far, oldest first.
    pub fn surfaces(&self) -> Vec<Rc<HeadlessSurface>> {
        self.created.borrow().clone()
    }

    /// The most recently created surface.
    pub fn last(&self) -> Option<Rc<HeadlessSurface>> {
        self.created.borrow().last().cloned()
    }
}

impl SurfaceFactory for HeadlessSurfaceFactory {
    fn create(&self, model: &Rc<TextModel>, options: &SurfaceOptions) -> Rc<dyn EditorSurface> {
        let surface = Rc::new(HeadlessSurface::new(model, options));
        self.created.borrow_mut().push(Rc::clone(&surface));
        surface
    }
}
