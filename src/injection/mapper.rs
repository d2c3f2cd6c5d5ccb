use std::ops::Range;
use std::sync::Arc;

use super::Shred;
use crate::text::minimal_change;

/// Replacement for one shred's host text since the shred was recorded.
///
/// `range` is relative to the recorded host text of the shred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShredChange {
    pub shred_index: usize,
    pub range: Range<usize>,
    pub replacement: String,
}

/// Bidirectional offset mapping between a host document and the decoded
/// buffer of one virtual document.
///
/// Host positions come from the shreds' live markers, so host offsets stay
/// meaningful while the host is edited.
#[derive(Debug, Clone)]
pub struct OffsetTranslator {
    shreds: Arc<[Shred]>,
}

impl OffsetTranslator {
    pub fn new(shreds: Arc<[Shred]>) -> Self {
        Self { shreds }
    }

    pub fn shreds(&self) -> &[Shred] {
        &self.shreds
    }

    fn live(&self) -> impl Iterator<Item = (usize, &Shred)> {
        self.shreds
            .iter()
            .enumerate()
            .filter(|(_, shred)| shred.host_marker().is_valid())
    }

    /// Decoded offset for a host offset.
    ///
    /// Offsets outside every shred clamp to the nearest body boundary: the
    /// end of the previous body or the start of the next one, whichever is
    /// closer in the host (the next one on a tie).
    pub fn host_to_injected(&self, host_offset: usize) -> usize {
        // (host end, body end) of the previous shred
        let mut previous: Option<(usize, usize)> = None;
        for (_, shred) in self.live() {
            let host_range = shred.host_range();
            let body = shred.body_range();
            if host_offset < host_range.start {
                return match previous {
                    Some((host_end, body_end))
                        if host_offset - host_end < host_range.start - host_offset =>
                    {
                        body_end
                    }
                    _ => body.start,
                };
            }
            if host_offset <= host_range.end {
                let relative = host_offset - shred.host_start();
                return body.start + shred.offsets().decoded_for_host(relative);
            }
            previous = Some((host_range.end, body.end));
        }
        previous.map_or(0, |(_, body_end)| body_end)
    }

    /// Host offset for a decoded offset.
    ///
    /// Prefix offsets map to the body's host start, suffix offsets to its host
    /// end, offsets inside an escape to the host position of the escape.
    pub fn injected_to_host(&self, decoded_offset: usize) -> usize {
        let mut last_end = None;
        for (_, shred) in self.live() {
            let range = shred.range();
            if decoded_offset > range.end {
                last_end = Some(shred.host_range().end);
                continue;
            }
            let body = shred.body_range();
            let host_range = shred.host_range();
            return if decoded_offset < body.start {
                host_range.start
            } else if decoded_offset > body.end {
                host_range.end
            } else {
                shred.host_start() + shred.offsets().resolve_backward(decoded_offset - body.start)
            };
        }
        last_end.unwrap_or(0)
    }

    /// True when one shred, or a chain of adjacent shreds, covers
    /// `[start, end]` in host coordinates.
    pub fn contains_range(&self, start: usize, end: usize) -> bool {
        let mut covered: Option<Range<usize>> = None;
        for (_, shred) in self.live() {
            let host_range = shred.host_range();
            covered = match covered {
                None if host_range.start <= start && start <= host_range.end => Some(host_range),
                Some(current) if current.end == host_range.start => {
                    Some(current.start..host_range.end)
                }
                Some(current) => Some(current),
                None => None,
            };
            if covered.as_ref().is_some_and(|range| end <= range.end) {
                return true;
            }
        }
        false
    }

    /// Per shred, the smallest replacement turning its recorded host text
    /// into its current text; None for unchanged shreds. A shred whose marker
    /// was invalidated reports the deletion of its whole recorded text.
    pub fn minimal_edit_sequence(&self, host_text: &str) -> Vec<Option<ShredChange>> {
        self.shreds
            .iter()
            .enumerate()
            .map(|(shred_index, shred)| {
                let recorded = shred.recorded_text();
                let current = shred
                    .host_marker()
                    .is_valid()
                    .then(|| host_text.get(shred.host_range()))
                    .flatten();
                match current {
                    Some(current) => {
                        minimal_change(recorded, current).map(|change| ShredChange {
                            shred_index,
                            range: change.range,
                            replacement: change.replacement,
                        })
                    }
                    None => (!recorded.is_empty()).then(|| ShredChange {
                        shred_index,
                        range: 0..recorded.len(),
                        replacement: String::new(),
                    }),
                }
            })
            .collect()
    }
}
