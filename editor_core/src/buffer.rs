//! Rope-backed text storage for document models.

use ropey::Rope;

/// A text buffer backed by a rope data structure.
/// Provides efficient text operations for large files.
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    rope: Rope,
}

impl TextBuffer {
    /// Creates a new empty text buffer.
    pub fn new() -> Self {
        Self { rope: Rope::new() }
    }

    /// Creates a text buffer holding `text`.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// Replaces the whole content.
    pub fn set_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
    }

    /// Returns the total number of characters in the buffer.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns the length of the content in UTF-8 bytes.
    pub fn len_bytes(&self) -> usize {
        self.rope.len_bytes()
    }

    /// Returns the total number of lines in the buffer.
    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Inserts a string at the given character index, clamped to the end.
    pub fn insert(&mut self, char_idx: usize, text: &str) {
        let idx = char_idx.min(self.len_chars());
        self.rope.insert(idx, text);
    }

    /// Removes text in the given character range.
    pub fn remove(&mut self, start: usize, end: usize) {
        let start = start.min(self.len_chars());
        let end = end.min(self.len_chars());
        if start < end {
            self.rope.remove(start..end);
        }
    }

    /// Returns the length of a line in characters (excluding the line break).
    pub fn line_len_chars(&self, line: usize) -> usize {
        if line >= self.len_lines() {
            return 0;
        }
        let slice = self.rope.line(line);
        let len = slice.len_chars();
        if len > 0 && slice.char(len - 1) == '\n' {
            if len > 1 && slice.char(len - 2) == '\r' {
                return len - 2;
            }
            return len - 1;
        }
        len
    }

    /// Converts a 0-indexed (line, column) pair to a character index.
    pub fn line_col_to_char(&self, line: usize, col: usize) -> usize {
        if line >= self.len_lines() {
            return self.len_chars();
        }
        self.rope.line_to_char(line) + col.min(self.line_len_chars(line))
    }

    /// Returns the line at the given index without its line break.
    pub fn line(&self, line: usize) -> Option<String> {
        if line >= self.len_lines() {
            return None;
        }
        let mut s = self.rope.line(line).to_string();
        if s.ends_with('\n') {
            s.pop();
            if s.ends_with('\r') {
                s.pop();
            }
        }
        Some(s)
    }

    /// Compares the content against `text` without materializing the rope.
    pub fn eq_text(&self, text: &str) -> bool {
        self.rope == text
    }

    /// Returns the entire buffer as a string.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer() {
        let buf = TextBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.len_lines(), 1); // Empty buffer has 1 line
    }

    #[test]
    fn test_insert_and_remove() {
        let mut buf = TextBuffer::new();
        buf.insert(0, "hello");
        buf.insert(100, " world");
        assert_eq!(buf.text(), "hello world");

        buf.remove(5, 11);
        assert_eq!(buf.text(), "hello");
    }

    #[test]
    fn test_set_text_replaces_content() {
        let mut buf = TextBuffer::from_text("one\ntwo");
        buf.set_text("three");
        assert_eq!(buf.text(), "three");
        assert_eq!(buf.len_lines(), 1);
    }

    #[test]
    fn test_line_operations() {
        let buf = TextBuffer::from_text("line1\r\nline2\nline3");
        assert_eq!(buf.len_lines(), 3);
        assert_eq!(buf.line(0).as_deref(), Some("line1"));
        assert_eq!(buf.line(1).as_deref(), Some("line2"));
        assert_eq!(buf.line_len_chars(0), 5);
        assert_eq!(buf.line(3), None);
    }

    #[test]
    fn test_position_conversion() {
        let buf = TextBuffer::from_text("abc\ndefgh");
        assert_eq!(buf.line_col_to_char(1, 2), 6);
        assert_eq!(buf.line_col_to_char(0, 10), 3);
    }

    #[test]
    fn test_eq_text() {
        let buf = TextBuffer::from_text("same");
        assert!(buf.eq_text("same"));
        assert!(!buf.eq_text("different"));
    }
}
