//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::ops::Range;
use std::sync::Arc;

use url::Url;
use utsushi::document::TextDocument;
use utsushi::escaper::EscaperKind;
use utsushi::host::{HostDocument, OutlineHostFile};
use utsushi::language::{PlainTextLexer, PlainTextParser};
use utsushi::{
    ElementId, HostFile, InjectionCache, InjectionPolicy, InjectionRequest, InjectionSettings,
    LanguageRegistry, Placement,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Byte range of the first occurrence of `needle` in `source`.
pub fn find(source: &str, needle: &str) -> Range<usize> {
    let start = source
        .find(needle)
        .unwrap_or_else(|| panic!("{needle:?} not found in {source:?}"));
    start..start + needle.len()
}

/// A host document whose listed literals are backslash-escaped hosts under
/// the file root.
pub struct Fixture {
    pub document: Arc<TextDocument>,
    pub file: OutlineHostFile,
    pub hosts: Vec<ElementId>,
}

impl Fixture {
    pub fn new(source: &str, literals: &[&str]) -> Self {
        let document = Arc::new(TextDocument::new(source));
        Self::over(document, literals)
    }

    /// Rebuild the outline against the current text of `document`.
    pub fn over(document: Arc<TextDocument>, literals: &[&str]) -> Self {
        let text = document.text();
        let url = Url::parse("file:///project/src/main.rs").unwrap();
        let mut builder =
            OutlineHostFile::builder(url, Arc::clone(&document) as Arc<dyn HostDocument>);
        let root = builder.root();
        let mut searched = 0;
        let hosts = literals
            .iter()
            .map(|literal| {
                let range = find(&text[searched..], literal);
                let range = searched + range.start..searched + range.end;
                searched = range.end;
                builder.host(root, range, "string", EscaperKind::Backslash)
            })
            .collect();
        Self {
            document,
            file: builder.build(),
            hosts,
        }
    }
}

/// Inject `language` into every host element, whole.
pub fn whole_host_policy(language: &'static str) -> Arc<dyn InjectionPolicy> {
    Arc::new(move |file: &dyn HostFile, element: ElementId| {
        file.injection_host(element)
            .map(|host| vec![InjectionRequest::new(language, vec![Placement::whole(host)])])
            .unwrap_or_default()
    })
}

/// Registry with the plain-text parser and lexer registered as `language`.
pub fn plain_registry(language: &str) -> Arc<LanguageRegistry> {
    let registry = Arc::new(LanguageRegistry::new());
    registry.register_parser(language, Arc::new(PlainTextParser));
    registry.register_lexer(language, Arc::new(PlainTextLexer));
    registry
}

pub fn plain_cache(policy: Arc<dyn InjectionPolicy>, settings: InjectionSettings) -> InjectionCache {
    InjectionCache::new(plain_registry("sql"), policy, settings)
}
