//! Settings consumed by views and the diff overlay.
//!
//! Settings are plain serde structs with per-field defaults, so a partial
//! JSON file only overrides what it names.

use crate::error::ConfigError;
use crate::event::{Emitter, Subscription};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::Path;

/// Default size cutoff for diffing, in bytes.
pub const MAX_BUFFER_LENGTH_TO_DIFF: usize = 2 * 1024 * 1024;

/// Default quiet period before a view reports that it stopped changing.
pub const STOP_CHANGING_DELAY_MS: u64 = 300;

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Engine theme id (`vs`, `vs-dark`, `hc-black`).
    pub theme: String,
    /// Whether the engine renders a minimap.
    pub minimap: bool,
    /// Comma separated extensions the host should open with this editor.
    pub extensions: String,
    /// Whether hunk navigation wraps around the ends of the file.
    pub wrap_around_on_move_to_diff: bool,
    /// Buffers longer than this (bytes) get no diff decorations.
    pub max_buffer_length_to_diff: usize,
    /// Debounce delay for the stop-changing signal.
    pub stop_changing_delay_ms: u64,
    /// Display preferences shared with the host's own editors.
    pub editor: EditorPreferences,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "vs".to_string(),
            minimap: true,
            extensions: String::new(),
            wrap_around_on_move_to_diff: true,
            max_buffer_length_to_diff: MAX_BUFFER_LENGTH_TO_DIFF,
            stop_changing_delay_ms: STOP_CHANGING_DELAY_MS,
            editor: EditorPreferences::default(),
        }
    }
}

/// Editor display preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorPreferences {
    pub show_invisibles: bool,
    pub show_line_numbers: bool,
    pub auto_indent: bool,
    pub show_indent_guide: bool,
    pub soft_wrap: bool,
    pub line_height: f32,
    pub font_size: f32,
}

impl Default for EditorPreferences {
    fn default() -> Self {
        Self {
            show_invisibles: false,
            show_line_numbers: true,
            auto_indent: true,
            show_indent_guide: false,
            soft_wrap: false,
            line_height: 1.5,
            font_size: 14.0,
        }
    }
}

impl Settings {
    /// Parses settings from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("no settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the configured extensions, trimmed, without empty entries.
    pub fn extension_list(&self) -> Vec<&str> {
        self.extensions
            .split(',')
            .map(str::trim)
            .filter(|ext| !ext.is_empty())
            .collect()
    }

    /// Returns true when the host should open `path` with this editor.
    pub fn handles_path(&self, path: &Path) -> bool {
        let name = path.to_string_lossy();
        self.extension_list().iter().any(|ext| name.ends_with(ext))
    }
}

/// Whitespace rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderWhitespace {
    Boundary,
    None,
}

/// Options pushed to an editor surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceOptions {
    pub render_whitespace: RenderWhitespace,
    pub line_numbers: bool,
    pub auto_indent: bool,
    pub render_indent_guides: bool,
    pub word_wrap: bool,
    pub line_height: f32,
    pub font_size: f32,
    pub minimap: bool,
    pub scroll_beyond_last_line: bool,
    pub automatic_layout: bool,
}

impl SurfaceOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        let editor = &settings.editor;
        Self {
            render_whitespace: if editor.show_invisibles {
                RenderWhitespace::Boundary
            } else {
                RenderWhitespace::None
            },
            line_numbers: editor.show_line_numbers,
            auto_indent: editor.auto_indent,
            render_indent_guides: editor.show_indent_guide,
            word_wrap: editor.soft_wrap,
            line_height: editor.line_height,
            font_size: editor.font_size,
            minimap: settings.minimap,
            scroll_beyond_last_line: false,
            automatic_layout: true,
        }
    }
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Live settings with change notification.
#[derive(Debug, Default)]
pub struct Config {
    settings: RefCell<Settings>,
    changed: Emitter<Settings>,
}

impl Config {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RefCell::new(settings),
            changed: Emitter::new(),
        }
    }

    /// Returns a snapshot of the current settings.
    pub fn settings(&self) -> Settings {
        self.settings.borrow().clone()
    }

    /// Replaces the settings and notifies observers if anything changed.
    pub fn set(&self, settings: Settings) {
        if *self.settings.borrow() == settings {
            return;
        }
        *self.settings.borrow_mut() = settings.clone();
        self.changed.emit(&settings);
    }

    /// Applies `f` to a copy of the settings and stores the result.
    pub fn update(&self, f: impl FnOnce(&mut Settings)) {
        let mut settings = self.settings();
        f(&mut settings);
        self.set(settings);
    }

    /// Calls `callback` with the current settings now and after every change.
    pub fn observe(&self, callback: impl Fn(&Settings) + 'static) -> Subscription {
        callback(&self.settings());
        self.changed.subscribe(callback)
    }
}
