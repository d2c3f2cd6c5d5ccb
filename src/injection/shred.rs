use std::fmt;
use std::ops::Range;
use std::sync::{Arc, Weak};

use super::offsets::OffsetTable;
use super::virtual_document::VirtualDocument;
use crate::document::RangeMarker;
use crate::host::{ElementId, InjectionHost};

/// One host range placed into the decoded buffer with its framing.
///
/// `range` covers `prefix`, the decoded fragment and `suffix` in the decoded
/// buffer. `range_inside_host` is the decoded part of the host element,
/// relative to the element start as it was when the shred was built; the
/// marker follows the same range through later host edits.
#[derive(Clone)]
pub struct Shred {
    host: Weak<dyn InjectionHost>,
    host_id: ElementId,
    host_marker: RangeMarker,
    prefix: String,
    suffix: String,
    range: Range<usize>,
    range_inside_host: Range<usize>,
    recorded_text: String,
    offsets: Arc<OffsetTable>,
}

pub(crate) struct ShredParts {
    pub host: Weak<dyn InjectionHost>,
    pub host_id: ElementId,
    pub host_marker: RangeMarker,
    pub prefix: String,
    pub suffix: String,
    pub range: Range<usize>,
    pub range_inside_host: Range<usize>,
    pub recorded_text: String,
    pub offsets: OffsetTable,
}

impl Shred {
    pub(crate) fn new(parts: ShredParts) -> Self {
        Self {
            host: parts.host,
            host_id: parts.host_id,
            host_marker: parts.host_marker,
            prefix: parts.prefix,
            suffix: parts.suffix,
            range: parts.range,
            range_inside_host: parts.range_inside_host,
            recorded_text: parts.recorded_text,
            offsets: Arc::new(parts.offsets),
        }
    }

    /// The host element, while the host tree that produced it is alive.
    pub fn host(&self) -> Option<Arc<dyn InjectionHost>> {
        self.host.upgrade()
    }

    pub fn host_id(&self) -> ElementId {
        self.host_id
    }

    pub fn host_marker(&self) -> &RangeMarker {
        &self.host_marker
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Range in the decoded buffer, framing included.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Decoded fragment range in the decoded buffer, framing excluded.
    pub fn body_range(&self) -> Range<usize> {
        self.range.start + self.prefix.len()..self.range.end - self.suffix.len()
    }

    pub fn range_inside_host(&self) -> Range<usize> {
        self.range_inside_host.clone()
    }

    /// Raw host text of the fragment when the shred was built.
    pub fn recorded_text(&self) -> &str {
        &self.recorded_text
    }

    pub fn offsets(&self) -> &OffsetTable {
        &self.offsets
    }

    /// Current absolute host range of the fragment.
    pub fn host_range(&self) -> Range<usize> {
        self.host_marker.range()
    }

    /// Current absolute start of the host element.
    pub fn host_start(&self) -> usize {
        self.host_marker
            .start()
            .saturating_sub(self.range_inside_host.start)
    }

    /// Absolute host offset of a decoded offset relative to the body start.
    pub(crate) fn host_offset(&self, relative: usize) -> Option<usize> {
        self.offsets
            .host(relative)
            .map(|offset| self.host_start() + offset)
    }

    pub fn is_valid(&self) -> bool {
        self.host_marker.is_valid() && self.host.strong_count() > 0
    }
}

impl fmt::Debug for Shred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shred")
            .field("host", &self.host_id)
            .field("prefix", &self.prefix)
            .field("suffix", &self.suffix)
            .field("range", &self.range)
            .field("range_inside_host", &self.range_inside_host)
            .field("host_range", &self.host_marker.range())
            .finish()
    }
}

/// One injection result: a virtual document and the shreds it was built from.
#[derive(Clone)]
pub struct Place {
    pub document: Arc<VirtualDocument>,
    pub shreds: Arc<[Shred]>,
}

impl Place {
    pub fn language(&self) -> &str {
        self.document.language()
    }

    pub fn host_ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.shreds.iter().map(Shred::host_id)
    }

    /// True when a shred's host range intersects `range` (closed ends).
    pub fn intersects(&self, range: &Range<usize>) -> bool {
        self.shreds
            .iter()
            .any(|shred| crate::text::intersects(&shred.host_range(), range))
    }
}

impl fmt::Debug for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Place")
            .field("document", &self.document.url().as_str())
            .field("language", &self.language())
            .field("shreds", &self.shreds)
            .finish()
    }
}
