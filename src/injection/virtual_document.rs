use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard};

use ulid::Ulid;
use url::Url;

use super::mapper::OffsetTranslator;
use super::tokens::{HighlightToken, project_tokens};
use super::virtual_uri::VirtualDocumentUri;
use super::Shred;
use crate::error::{InjectionError, InjectionResult, LockResultExt};
use crate::host::ElementId;
use crate::language::InjectedLexer;
use crate::syntax::{NodeId, SyntaxTree};

/// Snapshot of an injected leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedElement {
    pub node: NodeId,
    pub kind: String,
    /// Host view text of the leaf
    pub text: String,
    /// Parsed (decoded) text of the leaf
    pub decoded_text: String,
    /// Range in decoded coordinates
    pub range: Range<usize>,
}

/// A replacement in the host document derived from an edit of the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEdit {
    pub host: ElementId,
    /// Absolute host range
    pub range: Range<usize>,
    pub replacement: String,
}

pub(crate) struct DocumentContent {
    pub shreds: Arc<[Shred]>,
    pub tree: SyntaxTree,
    pub view: String,
    pub decoded: String,
    pub one_line: bool,
}

struct DocumentState {
    shreds: Arc<[Shred]>,
    tree: Arc<SyntaxTree>,
    text: Arc<str>,
    decoded: Arc<str>,
    one_line: bool,
    tokens: Option<Arc<[HighlightToken]>>,
    generation: u64,
    disposed: bool,
}

/// An injected fragment presented as a standalone document.
///
/// `text()` is the host view (prefix, raw host text and suffix per shred);
/// `decoded_text()` is the buffer the tree was parsed from. Offsets exchanged
/// with the translator are decoded offsets.
pub struct VirtualDocument {
    id: Ulid,
    url: Url,
    host_url: Url,
    language: String,
    state: Mutex<DocumentState>,
}

impl VirtualDocument {
    pub(crate) fn new(host_url: &Url, language: &str, content: DocumentContent) -> Self {
        let id = Ulid::new();
        let url = VirtualDocumentUri::new(host_url, language, id).to_url();
        Self {
            id,
            url,
            host_url: host_url.clone(),
            language: language.to_string(),
            state: Mutex::new(DocumentState {
                shreds: content.shreds,
                tree: Arc::new(content.tree),
                text: Arc::from(content.view),
                decoded: Arc::from(content.decoded),
                one_line: content.one_line,
                tokens: None,
                generation: 0,
                disposed: false,
            }),
        }
    }

    fn state(&self, context: &str) -> MutexGuard<'_, DocumentState> {
        self.state.lock().recover_poison(context)
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn host_url(&self) -> &Url {
        &self.host_url
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn shreds(&self) -> Arc<[Shred]> {
        Arc::clone(&self.state("VirtualDocument::shreds").shreds)
    }

    /// Host view text.
    pub fn text(&self) -> Arc<str> {
        Arc::clone(&self.state("VirtualDocument::text").text)
    }

    /// Decoded buffer the tree was parsed from.
    pub fn decoded_text(&self) -> Arc<str> {
        Arc::clone(&self.state("VirtualDocument::decoded_text").decoded)
    }

    pub fn is_one_line(&self) -> bool {
        self.state("VirtualDocument::is_one_line").one_line
    }

    /// Number of times the content was replaced in place.
    pub fn generation(&self) -> u64 {
        self.state("VirtualDocument::generation").generation
    }

    /// Run `f` over a snapshot of the tree. The document is not locked while
    /// `f` runs, so it may call back into this document.
    pub fn with_tree<R>(&self, f: impl FnOnce(&SyntaxTree) -> R) -> R {
        let tree = Arc::clone(&self.state("VirtualDocument::with_tree").tree);
        f(&tree)
    }

    pub fn translator(&self) -> OffsetTranslator {
        OffsetTranslator::new(self.shreds())
    }

    pub fn host_to_injected(&self, host_offset: usize) -> usize {
        self.translator().host_to_injected(host_offset)
    }

    pub fn injected_to_host(&self, decoded_offset: usize) -> usize {
        self.translator().injected_to_host(decoded_offset)
    }

    pub fn contains_range(&self, start: usize, end: usize) -> bool {
        self.translator().contains_range(start, end)
    }

    /// Leaf at a decoded offset.
    pub fn element_at(&self, decoded_offset: usize) -> Option<InjectedElement> {
        let tree = Arc::clone(&self.state("VirtualDocument::element_at").tree);
        let leaf = tree.leaf_at_offset(decoded_offset)?;
        Some(InjectedElement {
            node: leaf,
            kind: tree.kind(leaf).to_string(),
            text: tree.leaf_text(leaf)?.to_string(),
            decoded_text: tree.original_text(leaf)?.to_string(),
            range: tree.text_range(leaf)?,
        })
    }

    /// Valid until disposed or until a shred loses its host or its marker.
    pub fn is_valid(&self) -> bool {
        let state = self.state("VirtualDocument::is_valid");
        !state.disposed && state.shreds.iter().all(Shred::is_valid)
    }

    /// Not disposed and every shred marker still tracks host text.
    ///
    /// Unlike [`is_valid`](Self::is_valid) this ignores whether the host
    /// elements are alive: a reparse of the host file replaces them while the
    /// document can still take the rebuilt content in place.
    pub fn is_reusable(&self) -> bool {
        let state = self.state("VirtualDocument::is_reusable");
        !state.disposed
            && state
                .shreds
                .iter()
                .all(|shred| shred.host_marker().is_valid())
    }

    pub fn dispose(&self) {
        self.state("VirtualDocument::dispose").disposed = true;
    }

    /// Replace shreds and, when the text changed, the tree below the root.
    pub(crate) fn replace_content(&self, content: DocumentContent) {
        let mut state = self.state("VirtualDocument::replace_content");
        if *state.decoded != *content.decoded || *state.text != *content.view {
            Arc::make_mut(&mut state.tree).replace_children(content.tree);
            state.text = Arc::from(content.view);
            state.decoded = Arc::from(content.decoded);
        }
        state.shreds = content.shreds;
        state.one_line = content.one_line;
        state.tokens = None;
        state.generation += 1;
    }

    /// Highlight tokens in host coordinates, computed once per content.
    pub fn tokens_with(&self, lexer: &dyn InjectedLexer) -> Arc<[HighlightToken]> {
        let (decoded, shreds) = {
            let state = self.state("VirtualDocument::tokens");
            if let Some(tokens) = &state.tokens {
                return Arc::clone(tokens);
            }
            (Arc::clone(&state.decoded), Arc::clone(&state.shreds))
        };

        let lexed = lexer.tokenize(&decoded, &self.host_url);
        let projected: Arc<[HighlightToken]> = project_tokens(&lexed, &shreds).into();

        let mut state = self.state("VirtualDocument::tokens");
        // Content may have been replaced while lexing
        if Arc::ptr_eq(&state.shreds, &shreds) {
            state.tokens = Some(Arc::clone(&projected));
        }
        projected
    }

    /// Cached highlight tokens, if any were computed for the current content.
    pub fn cached_tokens(&self) -> Option<Arc<[HighlightToken]>> {
        self.state("VirtualDocument::cached_tokens").tokens.clone()
    }

    /// Decoded range is inside the prefix or the suffix of one shred.
    pub fn is_in_prefix_suffix(&self, range: Range<usize>) -> bool {
        self.shreds().iter().any(|shred| {
            let body = shred.body_range();
            let prefix = shred.range().start..body.start;
            let suffix = body.end..shred.range().end;
            [prefix, suffix].iter().any(|framing| {
                !framing.is_empty() && framing.start <= range.start && range.end <= framing.end
            })
        })
    }

    /// A selection `[start, end)` in decoded coordinates already reaches both
    /// edges of the fragment, so growing it further leaves the injection.
    pub fn selection_overflows_fragment(&self, start: usize, end: usize) -> bool {
        let translator = self.translator();
        let len = self.decoded_text().len();

        let start_overflows = start == 0
            || translator.host_to_injected(translator.injected_to_host(start - 1)) == start;
        let end_overflows = end >= len
            || translator.host_to_injected(translator.injected_to_host(end + 1)) == end;
        start_overflows && end_overflows
    }

    /// Decompose an edited view text into host replacements.
    ///
    /// Edits are returned in ascending host order; apply them from last to
    /// first. An edit touching prefix or suffix text fails with
    /// [`InjectionError::FramingEdited`].
    pub fn host_edits(&self, new_text: &str) -> InjectionResult<Vec<HostEdit>> {
        use similar::{ChangeTag, TextDiff};

        let (old_text, shreds) = {
            let state = self.state("VirtualDocument::host_edits");
            (Arc::clone(&state.text), Arc::clone(&state.shreds))
        };

        // View range of every shred body, with its host range
        let mut bodies = Vec::with_capacity(shreds.len());
        let mut view_offset = 0;
        for shred in shreds.iter() {
            let start = view_offset + shred.prefix().len();
            let end = start + shred.recorded_text().len();
            bodies.push((start..end, shred));
            view_offset = end + shred.suffix().len();
        }

        let diff = TextDiff::from_chars(old_text.as_ref(), new_text);
        let mut edits: Vec<HostEdit> = Vec::new();
        let mut pending: Option<(Range<usize>, String)> = None;
        let mut old_offset = 0;

        let mut flush = |pending: &mut Option<(Range<usize>, String)>| -> InjectionResult<()> {
            let Some((range, replacement)) = pending.take() else {
                return Ok(());
            };
            let (body, shred) = bodies
                .iter()
                .find(|(body, _)| body.start <= range.start && range.end <= body.end)
                .ok_or(InjectionError::FramingEdited {
                    offset: range.start,
                })?;
            let host_start = shred.host_range().start;
            edits.push(HostEdit {
                host: shred.host_id(),
                range: host_start + (range.start - body.start)..host_start + (range.end - body.start),
                replacement,
            });
            Ok(())
        };

        for change in diff.iter_all_changes() {
            let value = change.value();
            match change.tag() {
                ChangeTag::Equal => {
                    flush(&mut pending)?;
                    old_offset += value.len();
                }
                ChangeTag::Delete => {
                    let (range, _) =
                        pending.get_or_insert_with(|| (old_offset..old_offset, String::new()));
                    range.end += value.len();
                    old_offset += value.len();
                }
                ChangeTag::Insert => {
                    let (_, replacement) =
                        pending.get_or_insert_with(|| (old_offset..old_offset, String::new()));
                    replacement.push_str(value);
                }
            }
        }
        flush(&mut pending)?;
        drop(flush);

        Ok(edits)
    }
}

impl std::fmt::Debug for VirtualDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualDocument")
            .field("url", &self.url.as_str())
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}
