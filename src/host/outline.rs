use std::ops::Range;
use std::sync::Arc;

use url::Url;

use super::elements::ElementTable;
use super::{ElementId, HostDocument, HostFile, InjectionHost};
use crate::escaper::EscaperKind;

/// Host file described by an explicit element outline.
///
/// Useful for hosts that have no tree-sitter grammar and for tests:
///
/// ```
/// use std::sync::Arc;
/// use utsushi::document::TextDocument;
/// use utsushi::escaper::EscaperKind;
/// use utsushi::host::{HostFile, OutlineHostFile};
///
/// let doc = Arc::new(TextDocument::new(r#"query("SELECT 1")"#));
/// let url = url::Url::parse("file:///project/main.rs").unwrap();
/// let mut builder = OutlineHostFile::builder(url, doc);
/// let call = builder.element(builder.root(), 0..17, "call");
/// let literal = builder.host(call, 6..16, "string", EscaperKind::Backslash);
/// let file = builder.build();
///
/// assert_eq!(file.element_at(8), Some(literal));
/// assert!(file.injection_host(literal).is_some());
/// ```
pub struct OutlineHostFile {
    url: Url,
    document: Arc<dyn HostDocument>,
    elements: ElementTable,
    physical: bool,
    has_original: bool,
}

pub struct OutlineHostFileBuilder {
    url: Url,
    document: Arc<dyn HostDocument>,
    elements: ElementTable,
    physical: bool,
    has_original: bool,
}

impl OutlineHostFile {
    /// Start an outline whose root spans the whole document.
    pub fn builder(url: Url, document: Arc<dyn HostDocument>) -> OutlineHostFileBuilder {
        let len = document.text().len();
        OutlineHostFileBuilder {
            url,
            document,
            elements: ElementTable::new(0..len, "file"),
            physical: true,
            has_original: false,
        }
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn document_arc(&self) -> Arc<dyn HostDocument> {
        Arc::clone(&self.document)
    }
}

impl OutlineHostFileBuilder {
    pub fn root(&self) -> ElementId {
        ElementId(0)
    }

    /// Add a plain element under `parent`.
    pub fn element(&mut self, parent: ElementId, range: Range<usize>, kind: &str) -> ElementId {
        self.elements.push(parent, range, kind, None)
    }

    /// Add an injection host under `parent`.
    pub fn host(
        &mut self,
        parent: ElementId,
        range: Range<usize>,
        kind: &str,
        escaper: EscaperKind,
    ) -> ElementId {
        self.elements.push(parent, range, kind, Some(escaper))
    }

    /// Mark the file as an in-memory copy.
    pub fn non_physical(mut self, has_original: bool) -> Self {
        self.physical = false;
        self.has_original = has_original;
        self
    }

    pub fn build(mut self) -> OutlineHostFile {
        self.elements.sort_children();
        OutlineHostFile {
            url: self.url,
            document: self.document,
            elements: self.elements,
            physical: self.physical,
            has_original: self.has_original,
        }
    }
}

impl HostFile for OutlineHostFile {
    fn url(&self) -> &Url {
        &self.url
    }

    fn document(&self) -> &dyn HostDocument {
        self.document.as_ref()
    }

    fn root(&self) -> ElementId {
        ElementId(0)
    }

    fn element_at(&self, offset: usize) -> Option<ElementId> {
        self.elements.element_at(offset)
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.elements.parent(element)
    }

    fn text_range(&self, element: ElementId) -> Option<Range<usize>> {
        self.elements.text_range(element)
    }

    fn kind(&self, element: ElementId) -> Option<&str> {
        self.elements.kind(element)
    }

    fn injection_host(&self, element: ElementId) -> Option<Arc<dyn InjectionHost>> {
        self.elements.injection_host(element)
    }

    fn is_physical(&self) -> bool {
        self.physical
    }

    fn has_original(&self) -> bool {
        self.has_original
    }
}
