use std::ops::Range;
use std::sync::Arc;

use super::{ElementId, InjectionHost};
use crate::escaper::{Escaper, EscaperKind};

/// Injection host backed by a fixed range and a configured escaper.
#[derive(Debug)]
pub struct HostElement {
    id: ElementId,
    range: Range<usize>,
    escaper: EscaperKind,
}

impl HostElement {
    pub fn new(id: ElementId, range: Range<usize>, escaper: EscaperKind) -> Self {
        Self { id, range, escaper }
    }

    pub fn escaper_kind(&self) -> EscaperKind {
        self.escaper
    }
}

impl InjectionHost for HostElement {
    fn id(&self) -> ElementId {
        self.id
    }

    fn text_range(&self) -> Range<usize> {
        self.range.clone()
    }

    fn create_escaper(&self) -> Box<dyn Escaper> {
        self.escaper.create()
    }
}

#[derive(Debug)]
struct ElementData {
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    range: Range<usize>,
    kind: String,
    host: Option<Arc<HostElement>>,
}

/// Flat element storage shared by the host file implementations.
///
/// Element 0 is the root. Children are kept sorted by start offset.
#[derive(Debug)]
pub(super) struct ElementTable {
    elements: Vec<ElementData>,
}

impl ElementTable {
    pub(super) fn new(root_range: Range<usize>, root_kind: &str) -> Self {
        Self {
            elements: vec![ElementData {
                parent: None,
                children: Vec::new(),
                range: root_range,
                kind: root_kind.to_string(),
                host: None,
            }],
        }
    }

    pub(super) fn len(&self) -> usize {
        self.elements.len()
    }

    /// Append an element; `escaper` turns it into an injection host.
    pub(super) fn push(
        &mut self,
        parent: ElementId,
        range: Range<usize>,
        kind: &str,
        escaper: Option<EscaperKind>,
    ) -> ElementId {
        let id = ElementId(self.elements.len());
        self.elements.push(ElementData {
            parent: Some(parent),
            children: Vec::new(),
            range: range.clone(),
            kind: kind.to_string(),
            host: escaper.map(|kind| Arc::new(HostElement::new(id, range, kind))),
        });
        if let Some(parent) = self.elements.get_mut(parent.0) {
            parent.children.push(id);
        }
        id
    }

    pub(super) fn sort_children(&mut self) {
        let starts: Vec<(usize, usize)> = self
            .elements
            .iter()
            .map(|element| (element.range.start, element.range.end))
            .collect();
        for element in &mut self.elements {
            element
                .children
                .sort_by_key(|child| (starts[child.0].0, std::cmp::Reverse(starts[child.0].1)));
        }
    }

    pub(super) fn element_at(&self, offset: usize) -> Option<ElementId> {
        let root = self.elements.first()?;
        if !(root.range.start <= offset && offset < root.range.end) {
            return None;
        }
        let mut current = ElementId(0);
        'descend: loop {
            for child in &self.elements[current.0].children {
                let range = &self.elements[child.0].range;
                if range.start <= offset && offset < range.end {
                    current = *child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    pub(super) fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.elements.get(element.0)?.parent
    }

    pub(super) fn text_range(&self, element: ElementId) -> Option<Range<usize>> {
        self.elements.get(element.0).map(|data| data.range.clone())
    }

    pub(super) fn kind(&self, element: ElementId) -> Option<&str> {
        self.elements.get(element.0).map(|data| data.kind.as_str())
    }

    pub(super) fn injection_host(&self, element: ElementId) -> Option<Arc<dyn InjectionHost>> {
        let host = self.elements.get(element.0)?.host.clone()?;
        Some(host as Arc<dyn InjectionHost>)
    }
}
