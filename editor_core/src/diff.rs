//! Line diffs between a reference revision and a live buffer.
//!
//! Hunks follow the zero-context convention of `git diff -U0`: starts are
//! 1-based, and an empty side points at the line *before* the change (0 when
//! the change is at the top of the file).

use crate::surface::{Decoration, DecorationClass};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One region of difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
}

impl Hunk {
    pub fn new(old_start: u32, old_lines: u32, new_start: u32, new_lines: u32) -> Self {
        Self {
            old_start,
            old_lines,
            new_start,
            new_lines,
        }
    }

    pub fn kind(&self) -> HunkKind {
        HunkKind::of(self)
    }

    /// 0-based row navigation jumps to.
    pub fn start_row(&self) -> u32 {
        self.new_start.saturating_sub(1)
    }
}

/// Decoration category of a hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HunkKind {
    Added,
    Removed,
    Modified,
}

impl HunkKind {
    pub fn of(hunk: &Hunk) -> Self {
        if hunk.old_lines == 0 && hunk.new_lines > 0 {
            HunkKind::Added
        } else if hunk.new_lines == 0 && hunk.old_lines > 0 {
            HunkKind::Removed
        } else {
            HunkKind::Modified
        }
    }
}

/// Source of reference revisions.
pub trait RevisionSource {
    /// Hunks of `text` against the committed revision of `path`, or `None`
    /// when the path is not tracked.
    fn line_diffs(&self, path: &Path, text: &str) -> Option<Vec<Hunk>>;
}

/// Reference texts kept in memory.
#[derive(Debug, Default)]
pub struct StaticRevisions {
    references: std::cell::RefCell<HashMap<PathBuf, String>>,
}

impl StaticRevisions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the committed text of `path`.
    pub fn set(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.references.borrow_mut().insert(path.into(), text.into());
    }

    /// Stops tracking `path`.
    pub fn forget(&self, path: &Path) {
        self.references.borrow_mut().remove(path);
    }
}

impl RevisionSource for StaticRevisions {
    fn line_diffs(&self, path: &Path, text: &str) -> Option<Vec<Hunk>> {
        let references = self.references.borrow();
        references.get(path).map(|reference| compute_hunks(reference, text))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Equal,
    Delete,
    Insert,
}

/// Computes the hunks turning `reference` into `buffer`, ordered by
/// `new_start`.
pub fn compute_hunks(reference: &str, buffer: &str) -> Vec<Hunk> {
    let old: Vec<&str> = reference.lines().collect();
    let new: Vec<&str> = buffer.lines().collect();

    // Trim the common prefix and suffix; Myers only runs on the middle.
    let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let script = shortest_edit(old_mid, new_mid);
    group_hunks(&script, prefix as u32)
}

/// Myers' O(ND) shortest edit script.
fn shortest_edit(a: &[&str], b: &[&str]) -> Vec<Edit> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    if n == 0 {
        return vec![Edit::Insert; b.len()];
    }
    if m == 0 {
        return vec![Edit::Delete; a.len()];
    }

    let max = n + m;
    let offset = max as usize;
    let mut v = vec![0isize; 2 * offset + 2];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'search: for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let idx = (k + max) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    let mut script = Vec::with_capacity(a.len() + b.len());
    let (mut x, mut y) = (n, m);
    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let prev_k = if k == -d || (k != d && v[(k - 1 + max) as usize] < v[(k + 1 + max) as usize]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[(prev_k + max) as usize];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            script.push(Edit::Equal);
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            script.push(if x == prev_x { Edit::Insert } else { Edit::Delete });
        }
        x = prev_x;
        y = prev_y;
    }
    script.reverse();
    script
}

/// Folds an edit script into zero-context hunks. `base` is the number of
/// lines skipped before the script starts.
fn group_hunks(script: &[Edit], base: u32) -> Vec<Hunk> {
    let mut hunks = Vec::new();
    let (mut old_line, mut new_line) = (base, base);
    let mut i = 0;

    while i < script.len() {
        if script[i] == Edit::Equal {
            old_line += 1;
            new_line += 1;
            i += 1;
            continue;
        }

        let (old_at, new_at) = (old_line, new_line);
        let (mut deleted, mut inserted) = (0u32, 0u32);
        while i < script.len() && script[i] != Edit::Equal {
            match script[i] {
                Edit::Delete => deleted += 1,
                Edit::Insert => inserted += 1,
                Edit::Equal => {}
            }
            i += 1;
        }
        old_line += deleted;
        new_line += inserted;

        hunks.push(Hunk {
            old_start: if deleted == 0 { old_at } else { old_at + 1 },
            old_lines: deleted,
            new_start: if inserted == 0 { new_at } else { new_at + 1 },
            new_lines: inserted,
        });
    }
    hunks
}

/// Decoration for one hunk.
pub fn decoration_for(hunk: &Hunk) -> Decoration {
    let start_row = hunk.new_start.saturating_sub(1);
    match hunk.kind() {
        HunkKind::Removed if hunk.new_start == 0 => Decoration {
            start_row: 0,
            end_row: 0,
            class: DecorationClass::PreviousLineRemoved,
        },
        HunkKind::Removed => Decoration {
            start_row,
            end_row: start_row,
            class: DecorationClass::LineRemoved,
        },
        kind => Decoration {
            start_row,
            end_row: (start_row + hunk.new_lines).saturating_sub(1).max(start_row),
            class: if kind == HunkKind::Added {
                DecorationClass::LineAdded
            } else {
                DecorationClass::LineModified
            },
        },
    }
}

/// Decorations for a hunk list, in the same order.
pub fn decorations(hunks: &[Hunk]) -> Vec<Decoration> {
    hunks.iter().map(decoration_for).collect()
}

/// Row of the nearest hunk starting after `cursor_line` (1-based).
///
/// With `wrap`, falls back to the first hunk of the file.
pub fn next_hunk_row(cursor_line: u32, hunks: &[Hunk], wrap: bool) -> Option<u32> {
    let next = hunks
        .iter()
        .filter(|hunk| hunk.new_start > cursor_line)
        .map(Hunk::start_row)
        .min();
    match next {
        Some(row) => Some(row),
        None if wrap => hunks.iter().map(Hunk::start_row).min(),
        None => None,
    }
}

/// Row of the nearest hunk starting before `cursor_line` (1-based).
///
/// With `wrap`, falls back to the last hunk of the file.
pub fn previous_hunk_row(cursor_line: u32, hunks: &[Hunk], wrap: bool) -> Option<u32> {
    let previous = hunks
        .iter()
        .filter(|hunk| hunk.new_start < cursor_line)
        .map(Hunk::start_row)
        .max();
    match previous {
        Some(row) => Some(row),
        None if wrap => hunks.iter().map(Hunk::start_row).max(),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(new_start: u32) -> Hunk {
        Hunk::new(new_start, 1, new_start, 1)
    }

    #[test]
    fn test_identical_texts_have_no_hunks() {
        assert!(compute_hunks("a\nb\nc\n", "a\nb\nc\n").is_empty());
        assert!(compute_hunks("", "").is_empty());
    }

    #[test]
    fn test_added_lines() {
        let hunks = compute_hunks("a\nb\n", "a\nx\ny\nb\n");
        assert_eq!(hunks, vec![Hunk::new(1, 0, 2, 2)]);
        assert_eq!(hunks[0].kind(), HunkKind::Added);
    }

    #[test]
    fn test_removed_lines() {
        let hunks = compute_hunks("a\nb\nc\nd\n", "a\nd\n");
        assert_eq!(hunks, vec![Hunk::new(2, 2, 1, 0)]);
        assert_eq!(hunks[0].kind(), HunkKind::Removed);
    }

    #[test]
    fn test_removed_at_top_points_before_first_line() {
        let hunks = compute_hunks("a\nb\nc\n", "c\n");
        assert_eq!(hunks, vec![Hunk::new(1, 2, 0, 0)]);
        let decoration = decoration_for(&hunks[0]);
        assert_eq!(decoration.start_row, 0);
        assert_eq!(decoration.class, DecorationClass::PreviousLineRemoved);
    }

    #[test]
    fn test_modified_and_multiple_hunks() {
        let reference = "one\ntwo\nthree\nfour\nfive\nsix\n";
        let buffer = "one\nTWO\nthree\nfour\nfive\nsix\nseven\n";
        let hunks = compute_hunks(reference, buffer);

        assert_eq!(hunks, vec![Hunk::new(2, 1, 2, 1), Hunk::new(6, 0, 7, 1)]);
        assert_eq!(hunks[0].kind(), HunkKind::Modified);
        assert_eq!(hunks[1].kind(), HunkKind::Added);
    }

    #[test]
    fn test_everything_replaced() {
        let hunks = compute_hunks("a\nb\n", "c\nd\ne\n");
        let old_total: u32 = hunks.iter().map(|h| h.old_lines).sum();
        let new_total: u32 = hunks.iter().map(|h| h.new_lines).sum();
        assert_eq!(old_total, 2);
        assert_eq!(new_total, 3);
    }

    #[test]
    fn test_new_file_against_empty_reference() {
        let hunks = compute_hunks("", "a\nb\n");
        assert_eq!(hunks, vec![Hunk::new(0, 0, 1, 2)]);
    }

    #[test]
    fn test_classification() {
        assert_eq!(HunkKind::of(&Hunk::new(3, 0, 4, 4)), HunkKind::Added);
        assert_eq!(HunkKind::of(&Hunk::new(3, 2, 2, 0)), HunkKind::Removed);
        assert_eq!(HunkKind::of(&Hunk::new(3, 2, 3, 5)), HunkKind::Modified);
    }

    #[test]
    fn test_decoration_rows() {
        let added = decoration_for(&Hunk::new(3, 0, 4, 4));
        assert_eq!((added.start_row, added.end_row), (3, 6));
        assert_eq!(added.class, DecorationClass::LineAdded);

        let modified = decoration_for(&Hunk::new(2, 1, 2, 1));
        assert_eq!((modified.start_row, modified.end_row), (1, 1));
        assert_eq!(modified.class, DecorationClass::LineModified);

        // A removal reported after line 1 anchors at row 0, never row -1.
        let removed = decoration_for(&Hunk::new(2, 2, 1, 0));
        assert_eq!((removed.start_row, removed.end_row), (0, 0));
        assert_eq!(removed.class, DecorationClass::LineRemoved);
    }

    #[test]
    fn test_next_hunk_wraps_to_first() {
        let hunks = [at(3), at(10), at(20)];
        assert_eq!(next_hunk_row(25, &hunks, true), Some(2));
        assert_eq!(next_hunk_row(25, &hunks, false), None);
        assert_eq!(next_hunk_row(3, &hunks, false), Some(9));
        assert_eq!(next_hunk_row(1, &hunks, false), Some(2));
    }

    #[test]
    fn test_previous_hunk_wraps_to_last() {
        let hunks = [at(3), at(10), at(20)];
        assert_eq!(previous_hunk_row(1, &hunks, true), Some(19));
        assert_eq!(previous_hunk_row(1, &hunks, false), None);
        assert_eq!(previous_hunk_row(20, &hunks, false), Some(9));
        assert_eq!(previous_hunk_row(25, &hunks, false), Some(19));
    }

    #[test]
    fn test_navigation_without_hunks() {
        assert_eq!(next_hunk_row(1, &[], true), None);
        assert_eq!(previous_hunk_row(1, &[], true), None);
    }

    #[test]
    fn test_navigation_ignores_hunk_order() {
        let hunks = [at(20), at(3), at(10)];
        assert_eq!(next_hunk_row(4, &hunks, false), Some(9));
        assert_eq!(previous_hunk_row(15, &hunks, false), Some(9));
    }

    #[test]
    fn test_static_revisions() {
        let revisions = StaticRevisions::new();
        let path = Path::new("/w/a.txt");
        assert!(revisions.line_diffs(path, "x").is_none());

        revisions.set(path, "a\n");
        assert_eq!(revisions.line_diffs(path, "a\nb\n"), Some(vec![Hunk::new(1, 0, 2, 1)]));

        revisions.forget(path);
        assert!(revisions.line_diffs(path, "a\n").is_none());
    }
}
