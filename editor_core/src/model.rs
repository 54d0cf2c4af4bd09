//! Shared text models and the identities they are cached under.

use crate::buffer::TextBuffer;
use crate::event::{Emitter, Subscription};
use crate::language::Language;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::path::{Path, PathBuf};

/// Key under which a text model is cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentId {
    /// A document backed by a file.
    Path(PathBuf),
    /// An unsaved buffer, identified by a registry-issued token.
    Untitled(u64),
}

impl DocumentId {
    /// Returns the backing path, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Untitled(_) => None,
        }
    }

    pub fn is_untitled(&self) -> bool {
        matches!(self, Self::Untitled(_))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Untitled(token) => write!(f, "untitled-{}", token),
        }
    }
}

/// Notification sent after every content mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentChange {
    /// Model version after the change.
    pub version: u64,
}

/// The single shared buffer for one document identity.
///
/// Models are created and disposed by the
/// [`ModelRegistry`](crate::registry::ModelRegistry) only. Views mutate them
/// through `&self` methods; siblings learn about changes through
/// [`on_did_change_content`](Self::on_did_change_content).
pub struct TextModel {
    identity: DocumentId,
    buffer: RefCell<TextBuffer>,
    language: Cell<Language>,
    version: Cell<u64>,
    disposed: Cell<bool>,
    content_changed: Emitter<ContentChange>,
    language_changed: Emitter<Language>,
}

impl fmt::Debug for TextModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextModel")
            .field("identity", &self.identity)
            .field("language", &self.language.get())
            .field("version", &self.version.get())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}

impl TextModel {
    pub(crate) fn new(identity: DocumentId, text: &str, language: Language) -> Self {
        Self {
            identity,
            buffer: RefCell::new(TextBuffer::from_text(text)),
            language: Cell::new(language),
            version: Cell::new(1),
            disposed: Cell::new(false),
            content_changed: Emitter::new(),
            language_changed: Emitter::new(),
        }
    }

    pub fn identity(&self) -> &DocumentId {
        &self.identity
    }

    /// Returns the full content.
    pub fn text(&self) -> String {
        self.buffer.borrow().text()
    }

    /// Compares the content against `text`.
    pub fn text_eq(&self, text: &str) -> bool {
        self.buffer.borrow().eq_text(text)
    }

    /// Content length in UTF-8 bytes.
    pub fn len_bytes(&self) -> usize {
        self.buffer.borrow().len_bytes()
    }

    pub fn line_count(&self) -> usize {
        self.buffer.borrow().len_lines()
    }

    /// Length of a 0-indexed line in characters.
    pub fn line_len(&self, line: usize) -> usize {
        self.buffer.borrow().line_len_chars(line)
    }

    /// Returns a 0-indexed line without its line break.
    pub fn line(&self, line: usize) -> Option<String> {
        self.buffer.borrow().line(line)
    }

    /// Replaces the whole content.
    pub fn set_text(&self, text: &str) {
        if self.disposed.get() {
            log::warn!("set_text on disposed model {}", self.identity);
            return;
        }
        self.buffer.borrow_mut().set_text(text);
        self.changed();
    }

    /// Inserts `text` at a character index.
    pub fn insert(&self, char_idx: usize, text: &str) {
        if self.disposed.get() || text.is_empty() {
            return;
        }
        self.buffer.borrow_mut().insert(char_idx, text);
        self.changed();
    }

    /// Removes the characters in `start..end`.
    pub fn remove(&self, start: usize, end: usize) {
        if self.disposed.get() || start >= end {
            return;
        }
        self.buffer.borrow_mut().remove(start, end);
        self.changed();
    }

    /// Converts a 0-indexed (line, column) pair to a character index.
    pub fn offset_at(&self, line: usize, column: usize) -> usize {
        self.buffer.borrow().line_col_to_char(line, column)
    }

    fn changed(&self) {
        let version = self.version.get() + 1;
        self.version.set(version);
        self.content_changed.emit(&ContentChange { version });
    }

    pub fn language(&self) -> Language {
        self.language.get()
    }

    /// Switches the grammar. Listeners are notified only on an actual change.
    pub fn set_language(&self, language: Language) {
        if self.disposed.get() || self.language.get() == language {
            return;
        }
        self.language.set(language);
        self.language_changed.emit(&language);
    }

    /// Monotonic version, bumped on every content mutation.
    pub fn version(&self) -> u64 {
        self.version.get()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    pub fn on_did_change_content(&self, callback: impl Fn(&ContentChange) + 'static) -> Subscription {
        self.content_changed.subscribe(callback)
    }

    pub fn on_did_change_language(&self, callback: impl Fn(&Language) + 'static) -> Subscription {
        self.language_changed.subscribe(callback)
    }

    /// Releases the buffer and every listener.
    pub(crate) fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        log::debug!("disposing model {}", self.identity);
        *self.buffer.borrow_mut() = TextBuffer::new();
        self.content_changed.clear();
        self.language_changed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_mutations_bump_version_and_notify() {
        let model = TextModel::new(DocumentId::Untitled(1), "abc", Language::PlainText);
        let versions = Rc::new(RefCell::new(Vec::new()));
        let _sub = {
            let versions = versions.clone();
            model.on_did_change_content(move |change| versions.borrow_mut().push(change.version))
        };

        model.insert(3, "def");
        model.remove(0, 1);
        model.set_text("xyz");

        assert_eq!(model.text(), "xyz");
        assert_eq!(*versions.borrow(), vec![2, 3, 4]);
    }

    #[test]
    fn test_language_change_only_on_difference() {
        let model = TextModel::new(DocumentId::Untitled(1), "", Language::PlainText);
        let count = Rc::new(Cell::new(0));
        let _sub = {
            let count = count.clone();
            model.on_did_change_language(move |_| count.set(count.get() + 1))
        };

        model.set_language(Language::Rust);
        model.set_language(Language::Rust);
        assert_eq!(count.get(), 1);
        assert_eq!(model.language(), Language::Rust);
    }

    #[test]
    fn test_dispose_releases_content() {
        let model = TextModel::new(DocumentId::Path("/tmp/a.rs".into()), "fn main() {}", Language::Rust);
        model.dispose();
        assert!(model.is_disposed());
        assert_eq!(model.text(), "");

        model.set_text("ignored");
        assert_eq!(model.text(), "");
    }

    #[test]
    fn test_document_id_display() {
        assert_eq!(DocumentId::Untitled(4).to_string(), "untitled-4");
        assert_eq!(DocumentId::Path("/a/b.txt".into()).path(), Some(Path::new("/a/b.txt")));
    }
}
