use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::text::TextEdit;

#[derive(Debug)]
pub(crate) struct MarkerState {
    start: AtomicUsize,
    end: AtomicUsize,
    valid: AtomicBool,
    greedy_left: bool,
    greedy_right: bool,
}

/// Handle to a host range that follows edits of its document.
///
/// The document keeps a weak reference to the state and moves it on every
/// edit; handles only read it. Greedy sides absorb insertions made exactly at
/// that side. An edit that deletes the whole range and more invalidates it.
#[derive(Debug, Clone)]
pub struct RangeMarker {
    state: Arc<MarkerState>,
}

impl RangeMarker {
    pub(crate) fn new(range: Range<usize>, greedy_left: bool, greedy_right: bool) -> Self {
        Self {
            state: Arc::new(MarkerState {
                start: AtomicUsize::new(range.start),
                end: AtomicUsize::new(range.end),
                valid: AtomicBool::new(true),
                greedy_left,
                greedy_right,
            }),
        }
    }

    /// A marker that no document tracks; it keeps its range forever.
    pub fn detached(range: Range<usize>) -> Self {
        Self::new(range, false, false)
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<MarkerState> {
        Arc::downgrade(&self.state)
    }

    pub fn start(&self) -> usize {
        self.state.start.load(Ordering::Acquire)
    }

    pub fn end(&self) -> usize {
        self.state.end.load(Ordering::Acquire)
    }

    pub fn range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    pub fn is_valid(&self) -> bool {
        self.state.valid.load(Ordering::Acquire)
    }

    pub fn invalidate(&self) {
        self.state.valid.store(false, Ordering::Release);
    }

    /// True when both handles refer to the same tracked range.
    pub fn same_marker(&self, other: &RangeMarker) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl MarkerState {
    /// Move the marker through one edit.
    pub(crate) fn apply_edit(&self, edit: &TextEdit) {
        if !self.valid.load(Ordering::Acquire) {
            return;
        }
        let start = self.start.load(Ordering::Acquire);
        let end = self.end.load(Ordering::Acquire);
        let deletes = edit.start < edit.old_end;

        if deletes && edit.start <= start && edit.old_end >= end {
            if edit.start == start && edit.old_end == end && start < end {
                // Exact replacement of the marked text
                self.end.store(edit.new_end, Ordering::Release);
            } else {
                self.valid.store(false, Ordering::Release);
            }
            return;
        }

        let new_start = if edit.old_end <= start {
            if edit.is_insertion_only() && edit.start == start && self.greedy_left {
                start
            } else {
                edit.shift(start)
            }
        } else if edit.start < start {
            if self.greedy_left {
                edit.start
            } else {
                edit.new_end
            }
        } else {
            start
        };

        let new_end = if edit.start >= end {
            if edit.is_insertion_only() && edit.start == end && self.greedy_right {
                edit.shift(end)
            } else {
                end
            }
        } else if edit.old_end > end {
            if self.greedy_right {
                edit.new_end
            } else {
                edit.start
            }
        } else {
            edit.shift(end)
        };

        self.start.store(new_start, Ordering::Release);
        self.end.store(new_end.max(new_start), Ordering::Release);
    }
}
