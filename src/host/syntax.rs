use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use tree_sitter::Tree;
use url::Url;

use super::elements::ElementTable;
use super::{ElementId, HostDocument, HostFile, InjectionHost};
use crate::escaper::EscaperKind;

/// Host file built from a tree-sitter parse of the host document.
///
/// Every node becomes an element. Nodes whose kind appears in `hosts` become
/// injection hosts using the mapped escaper.
pub struct SyntaxHostFile {
    url: Url,
    document: Arc<dyn HostDocument>,
    elements: ElementTable,
}

impl SyntaxHostFile {
    pub fn new(
        url: Url,
        document: Arc<dyn HostDocument>,
        tree: &Tree,
        hosts: &HashMap<String, EscaperKind>,
    ) -> Self {
        let root = tree.root_node();
        let mut elements = ElementTable::new(root.byte_range(), root.kind());

        // Pre-order walk; `parents` mirrors the cursor depth
        let mut cursor = tree.walk();
        let mut parents = vec![ElementId(0)];
        if cursor.goto_first_child() {
            loop {
                let node = cursor.node();
                let parent = parents.last().copied().unwrap_or(ElementId(0));
                let escaper = hosts.get(node.kind()).copied();
                let id = elements.push(parent, node.byte_range(), node.kind(), escaper);

                if cursor.goto_first_child() {
                    parents.push(id);
                    continue;
                }
                if cursor.goto_next_sibling() {
                    continue;
                }
                // Climb until a sibling exists or the root is reached
                let mut finished = true;
                while cursor.goto_parent() {
                    parents.pop();
                    if parents.is_empty() {
                        break;
                    }
                    if cursor.goto_next_sibling() {
                        finished = false;
                        break;
                    }
                }
                if finished {
                    break;
                }
            }
        }

        log::debug!(
            target: "utsushi::host",
            "Built {} elements for {}",
            elements.len(),
            url
        );

        Self {
            url,
            document,
            elements,
        }
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }
}

impl HostFile for SyntaxHostFile {
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
}
