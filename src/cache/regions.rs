//! Known injected host regions of one file.

use std::ops::Range;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::document::RangeMarker;

/// Ordered, non-overlapping host ranges that currently carry an injection.
///
/// Readers iterate a snapshot; writers replace the list copy-on-write.
pub struct InjectedRegions {
    markers: ArcSwap<Vec<RangeMarker>>,
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a == b || (a.start < b.end && b.start < a.end)
}

impl InjectedRegions {
    pub fn new() -> Self {
        Self {
            markers: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Record a region, replacing every region it overlaps.
    pub fn insert(&self, marker: &RangeMarker) {
        self.markers.rcu(|current| {
            let range = marker.range();
            let mut next: Vec<RangeMarker> = Vec::with_capacity(current.len() + 1);
            let mut placed = false;
            for existing in current.iter() {
                if existing.same_marker(marker) || overlaps(&existing.range(), &range) {
                    continue;
                }
                if !placed && existing.start() > range.start {
                    next.push(marker.clone());
                    placed = true;
                }
                next.push(existing.clone());
            }
            if !placed {
                next.push(marker.clone());
            }
            next
        });
    }

    /// Drop regions whose marker was invalidated; returns how many were dropped.
    pub fn remove_invalid(&self) -> usize {
        let before = self.markers.load().len();
        self.markers.rcu(|current| {
            current
                .iter()
                .filter(|marker| marker.is_valid())
                .cloned()
                .collect::<Vec<_>>()
        });
        before.saturating_sub(self.markers.load().len())
    }

    /// True when `offset` lies in a valid region (`start <= offset < end`).
    pub fn contains(&self, offset: usize) -> bool {
        self.markers.load().iter().any(|marker| {
            marker.is_valid() && marker.start() <= offset && offset < marker.end()
        })
    }

    pub fn snapshot(&self) -> Arc<Vec<RangeMarker>> {
        self.markers.load_full()
    }

    pub fn len(&self) -> usize {
        self.markers.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.load().is_empty()
    }
}

impl Default for InjectedRegions {
    fn default() -> Self {
        Self::new()
    }
}
