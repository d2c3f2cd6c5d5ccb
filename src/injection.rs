//! Injected fragments: shreds, the registrar session that builds them, leaf
//! patching, offset translation and virtual documents.
//!
//! ```text
//! policy ─▶ Registrar ─▶ decoded buffer ─▶ parser ─▶ patch_leaves
//!                                                        │
//!            HighlightToken ◀─ project_tokens ◀─ VirtualDocument ─▶ OffsetTranslator
//! ```

mod mapper;
mod offsets;
mod patch;
mod registrar;
mod shred;
mod tokens;
mod virtual_document;
mod virtual_uri;

use std::ops::Range;
use std::sync::Arc;

use crate::host::{ElementId, HostFile, InjectionHost};

pub use mapper::{OffsetTranslator, ShredChange};
pub use offsets::OffsetTable;
pub use registrar::Registrar;
pub use shred::{Place, Shred};
pub use tokens::HighlightToken;
pub use virtual_document::{HostEdit, InjectedElement, VirtualDocument};
pub use virtual_uri::VirtualDocumentUri;

pub(crate) use patch::host_view;
pub(crate) use shred::ShredParts;
pub(crate) use virtual_document::DocumentContent;

/// One host range to inject, with the text framing it in the decoded buffer.
#[derive(Clone)]
pub struct Placement {
    pub prefix: String,
    pub suffix: String,
    pub host: Arc<dyn InjectionHost>,
    /// Relative to the host element start
    pub range_inside_host: Range<usize>,
}

impl Placement {
    pub fn new(host: Arc<dyn InjectionHost>, range_inside_host: Range<usize>) -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
            host,
            range_inside_host,
        }
    }

    /// Place the whole host element.
    pub fn whole(host: Arc<dyn InjectionHost>) -> Self {
        let len = host.text_range().len();
        Self::new(host, 0..len)
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }
}

/// One virtual document to build: a language and its placements in order.
#[derive(Clone)]
pub struct InjectionRequest {
    pub language: String,
    pub placements: Vec<Placement>,
}

impl InjectionRequest {
    pub fn new(language: impl Into<String>, placements: Vec<Placement>) -> Self {
        Self {
            language: language.into(),
            placements,
        }
    }
}

/// Decides what to inject into a host element.
///
/// Called once per cache miss. Closures with the same signature implement it.
pub trait InjectionPolicy: Send + Sync {
    fn discover(&self, file: &dyn HostFile, element: ElementId) -> Vec<InjectionRequest>;
}

impl<F> InjectionPolicy for F
where
    F: Fn(&dyn HostFile, ElementId) -> Vec<InjectionRequest> + Send + Sync,
{
    fn discover(&self, file: &dyn HostFile, element: ElementId) -> Vec<InjectionRequest> {
        self(file, element)
    }
}
