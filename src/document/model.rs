use std::ops::Range;
use std::sync::{Arc, RwLock, Weak};

use super::marker::{MarkerState, RangeMarker};
use crate::error::{InjectionError, InjectionResult, LockResultExt};
use crate::host::HostDocument;
use crate::text::{TextEdit, reconstruct_merged_edit};

/// In-memory host document with a modification stamp and range markers.
pub struct TextDocument {
    state: RwLock<DocumentText>,
}

struct DocumentText {
    text: Arc<str>,
    stamp: u64,
    markers: Vec<Weak<MarkerState>>,
}

impl DocumentText {
    fn apply(&mut self, edit: &TextEdit, text: String) {
        self.text = Arc::from(text);
        self.stamp += 1;
        self.markers.retain(|weak| match weak.upgrade() {
            Some(marker) => {
                marker.apply_edit(edit);
                true
            }
            None => false,
        });
    }
}

impl TextDocument {
    pub fn new(text: impl Into<String>) -> Self {
        let text: String = text.into();
        Self {
            state: RwLock::new(DocumentText {
                text: Arc::from(text),
                stamp: 0,
                markers: Vec::new(),
            }),
        }
    }

    /// Replace `range` with `replacement`, moving every live marker.
    pub fn replace(&self, range: Range<usize>, replacement: &str) -> InjectionResult<()> {
        let mut state = self
            .state
            .write()
            .recover_poison("TextDocument::replace");

        let text = &state.text;
        if range.start > range.end
            || range.end > text.len()
            || !text.is_char_boundary(range.start)
            || !text.is_char_boundary(range.end)
        {
            return Err(InjectionError::invalid_range(
                &range,
                format!("outside document of length {}", text.len()),
            ));
        }

        let mut updated = String::with_capacity(text.len() - range.len() + replacement.len());
        updated.push_str(&text[..range.start]);
        updated.push_str(replacement);
        updated.push_str(&text[range.end..]);

        let edit = TextEdit::replace(&range, replacement.len());
        state.apply(&edit, updated);
        Ok(())
    }

    /// Replace the whole text; markers follow the merged diff of old and new.
    pub fn set_text(&self, new_text: impl Into<String>) {
        let new_text: String = new_text.into();
        let mut state = self
            .state
            .write()
            .recover_poison("TextDocument::set_text");
        if let Some(edit) = reconstruct_merged_edit(&state.text, &new_text) {
            state.apply(&edit, new_text);
        }
    }

    /// Number of markers still referenced by someone.
    pub fn live_marker_count(&self) -> usize {
        let state = self
            .state
            .read()
            .recover_poison("TextDocument::live_marker_count");
        state
            .markers
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

impl HostDocument for TextDocument {
    fn text(&self) -> Arc<str> {
        self.state.read().recover_poison("TextDocument::text").text.clone()
    }

    fn modification_stamp(&self) -> u64 {
        self.state
            .read()
            .recover_poison("TextDocument::modification_stamp")
            .stamp
    }

    fn create_range_marker(
        &self,
        range: Range<usize>,
        greedy_left: bool,
        greedy_right: bool,
    ) -> RangeMarker {
        let marker = RangeMarker::new(range, greedy_left, greedy_right);
        let mut state = self
            .state
            .write()
            .recover_poison("TextDocument::create_range_marker");
        state.markers.retain(|weak| weak.strong_count() > 0);
        state.markers.push(marker.downgrade());
        marker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_bumps_stamp_and_moves_markers() {
        let doc = TextDocument::new("let q = \"select 1\";");
        let marker = doc.create_range_marker(9..17, true, true);
        assert_eq!(doc.modification_stamp(), 0);

        doc.replace(0..3, "const").unwrap();

        assert_eq!(&*doc.text(), "const q = \"select 1\";");
        assert_eq!(doc.modification_stamp(), 1);
        assert_eq!(marker.range(), 11..19);
        assert_eq!(&doc.text()[marker.range()], "select 1");
    }

    #[test]
    fn test_replace_rejects_out_of_bounds_range() {
        let doc = TextDocument::new("abc");
        let result = doc.replace(2..10, "x");
        assert!(matches!(result, Err(InjectionError::InvalidRange { .. })));
        assert_eq!(doc.modification_stamp(), 0, "failed edits must not bump the stamp");
    }

    #[test]
    fn test_replace_rejects_split_character() {
        let doc = TextDocument::new("é");
        assert!(doc.replace(1..2, "e").is_err());
    }

    #[test]
    fn test_set_text_uses_merged_edit() {
        let doc = TextDocument::new("x = \"a\"; y = \"b\";");
        let second = doc.create_range_marker(14..15, true, true);

        doc.set_text("x = \"aaa\"; y = \"b\";");

        assert_eq!(&doc.text()[second.range()], "b");
    }

    #[test]
    fn test_set_text_with_identical_text_keeps_stamp() {
        let doc = TextDocument::new("same");
        doc.set_text("same");
        assert_eq!(doc.modification_stamp(), 0);
    }

    #[test]
    fn test_dropped_markers_are_forgotten() {
        let doc = TextDocument::new("abcdef");
        let kept = doc.create_range_marker(0..1, false, false);
        {
            let _dropped = doc.create_range_marker(2..3, false, false);
            assert_eq!(doc.live_marker_count(), 2);
        }
        assert_eq!(doc.live_marker_count(), 1);
        assert!(kept.is_valid());
    }
}
