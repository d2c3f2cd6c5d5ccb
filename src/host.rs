//! Host side of an injection: the document that contains fragments and the
//! syntax tree whose elements can host them.
//!
//! Elements are addressed by [`ElementId`] so caches can keep side tables
//! keyed by id instead of pointing back into the host tree.

mod elements;
pub mod outline;
pub mod syntax;

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use url::Url;

use crate::document::RangeMarker;
use crate::escaper::Escaper;

pub use elements::HostElement;
pub use outline::{OutlineHostFile, OutlineHostFileBuilder};
pub use syntax::SyntaxHostFile;

/// Index of an element inside one host file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A host element able to contain an embedded fragment.
pub trait InjectionHost: Send + Sync {
    fn id(&self) -> ElementId;

    /// Absolute range of the element in its host document.
    fn text_range(&self) -> Range<usize>;

    /// Fresh codec for the element's text. One escaper serves one placement.
    fn create_escaper(&self) -> Box<dyn Escaper>;
}

/// Text storage of a host file.
pub trait HostDocument: Send + Sync {
    fn text(&self) -> Arc<str>;

    /// Monotonic edit counter.
    fn modification_stamp(&self) -> u64;

    /// Track `range` across future edits of this document.
    fn create_range_marker(
        &self,
        range: Range<usize>,
        greedy_left: bool,
        greedy_right: bool,
    ) -> RangeMarker;
}

/// Navigation over a host syntax tree.
///
/// Element ranges describe the document at the time the tree was built.
pub trait HostFile: Send + Sync {
    fn url(&self) -> &Url;

    fn document(&self) -> &dyn HostDocument;

    fn root(&self) -> ElementId;

    /// Deepest element whose range contains `offset` (half-open).
    fn element_at(&self, offset: usize) -> Option<ElementId>;

    fn parent(&self, element: ElementId) -> Option<ElementId>;

    fn text_range(&self, element: ElementId) -> Option<Range<usize>>;

    fn kind(&self, element: ElementId) -> Option<&str>;

    fn injection_host(&self, element: ElementId) -> Option<Arc<dyn InjectionHost>>;

    /// False for in-memory copies that do not correspond to a file on disk.
    fn is_physical(&self) -> bool {
        true
    }

    /// Whether a non-physical file is backed by an original physical file.
    fn has_original(&self) -> bool {
        false
    }
}
