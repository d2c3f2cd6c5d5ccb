use std::ops::Range;

/// A single edit in byte offsets: `[start, old_end)` became `[start, new_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEdit {
    pub start: usize,
    pub old_end: usize,
    pub new_end: usize,
}

impl TextEdit {
    /// Edit replacing `range` with `replacement_len` bytes.
    pub fn replace(range: &Range<usize>, replacement_len: usize) -> Self {
        Self {
            start: range.start,
            old_end: range.end,
            new_end: range.start + replacement_len,
        }
    }

    /// Byte delta (positive for insertion, negative for deletion).
    pub fn delta(&self) -> i64 {
        self.new_end as i64 - self.old_end as i64
    }

    /// Zero-length edits insert content without deleting anything.
    pub fn is_insertion_only(&self) -> bool {
        self.start == self.old_end
    }

    /// Apply this edit's delta to a position at or after `old_end`.
    pub fn shift(&self, position: usize) -> usize {
        apply_delta(position, self.delta())
    }
}

/// Apply a signed delta to a byte position, saturating at zero.
fn apply_delta(position: usize, delta: i64) -> usize {
    (position as i64).saturating_add(delta).max(0) as usize
}

/// Reconstruct a single merged edit from a character-level diff.
///
/// Returns None if texts are identical. All changes are merged into one edit
/// `[first_change_start, last_change_end_old)` → `[first_change_start, last_change_end_new)`.
pub fn reconstruct_merged_edit(old_text: &str, new_text: &str) -> Option<TextEdit> {
    use similar::{ChangeTag, TextDiff};

    if old_text == new_text {
        return None;
    }

    // NOTE: from_chars() keeps char granularity; byte positions are tracked via .len()
    let diff = TextDiff::from_chars(old_text, new_text);

    let mut first_change_start: Option<usize> = None;
    let mut last_old_end: usize = 0;
    let mut last_new_end: usize = 0;
    let mut old_byte = 0;
    let mut new_byte = 0;

    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Equal => {
                old_byte += change.value().len();
                new_byte += change.value().len();
            }
            ChangeTag::Delete => {
                first_change_start.get_or_insert(old_byte);
                old_byte += change.value().len();
                last_old_end = old_byte;
                last_new_end = new_byte;
            }
            ChangeTag::Insert => {
                first_change_start.get_or_insert(old_byte);
                new_byte += change.value().len();
                last_old_end = old_byte;
                last_new_end = new_byte;
            }
        }
    }

    // start is shared by both texts (identical prefix); old_end/new_end are
    // the positions right after the last change in their own text.
    first_change_start.map(|start| TextEdit {
        start,
        old_end: last_old_end,
        new_end: last_new_end,
    })
}

/// The smallest contiguous replacement turning one text into another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    /// Replaced range, in old-text coordinates
    pub range: Range<usize>,
    pub replacement: String,
}

/// Trim the common head and tail of `old` and `new`.
///
/// Returns None when the texts are equal. Trimming stops at char boundaries
/// so both the range and the replacement slice valid UTF-8.
pub fn minimal_change(old: &str, new: &str) -> Option<TextChange> {
    if old == new {
        return None;
    }

    let head = old
        .char_indices()
        .zip(new.chars())
        .find(|((_, a), b)| a != b)
        .map(|((index, _), _)| index)
        .unwrap_or_else(|| old.len().min(new.len()));
    // head is a char boundary of both texts because the prefixes are identical

    let max_tail = old.len().min(new.len()) - head;
    let tail = old[head..]
        .chars()
        .rev()
        .zip(new[head..].chars().rev())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a.len_utf8())
        .scan(0usize, |total, len| {
            *total += len;
            (*total <= max_tail).then_some(*total)
        })
        .last()
        .unwrap_or(0);

    Some(TextChange {
        range: head..old.len() - tail,
        replacement: new[head..new.len() - tail].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merged_edit_for_insertion() {
        let edit = reconstruct_merged_edit("hello world", "hello big world").unwrap();
        assert_eq!(edit.start, 6);
        assert_eq!(edit.old_end, 6);
        assert_eq!(edit.new_end, 10);
        assert!(edit.is_insertion_only());
        assert_eq!(edit.delta(), 4);
    }

    #[test]
    fn test_merged_edit_for_deletion() {
        let edit = reconstruct_merged_edit("abcdef", "abef").unwrap();
        assert_eq!(edit.start, 2);
        assert_eq!(edit.old_end, 4);
        assert_eq!(edit.new_end, 2);
    }

    #[test]
    fn test_merged_edit_identical() {
        assert!(reconstruct_merged_edit("same", "same").is_none());
    }

    #[test]
    fn test_minimal_change_replacement() {
        let change = minimal_change("id = 1", "id = 42").unwrap();
        assert_eq!(change.range, 5..6);
        assert_eq!(change.replacement, "42");
    }

    #[test]
    fn test_minimal_change_repeated_chars() {
        // head and tail must not overlap
        let change = minimal_change("aa", "a").unwrap();
        assert_eq!(change.range, 1..2);
        assert_eq!(change.replacement, "");

        let change = minimal_change("a", "aaa").unwrap();
        assert_eq!(change.range, 1..1);
        assert_eq!(change.replacement, "aa");
    }

    #[test]
    fn test_minimal_change_multibyte() {
        let change = minimal_change("café au lait", "cafè au lait").unwrap();
        assert_eq!(&"café au lait"[change.range.clone()], "é");
        assert_eq!(change.replacement, "è");
    }

    #[test]
    fn test_minimal_change_equal() {
        assert!(minimal_change("x", "x").is_none());
    }
}
