use std::ops::Range;

/// A range is proper when it does not run backwards.
pub fn is_proper(range: &Range<usize>) -> bool {
    range.start <= range.end
}

/// Intersection of two ranges; touching ranges intersect in an empty range.
///
/// Returns None when the ranges are disjoint.
pub fn intersection(a: &Range<usize>, b: &Range<usize>) -> Option<Range<usize>> {
    let start = a.start.max(b.start);
    let end = a.end.min(b.end);
    (start <= end).then_some(start..end)
}

/// Closed-interval intersection test (`[a.start, a.end]` against `[b.start, b.end]`).
pub fn intersects(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start <= b.end && b.start <= a.end
}
