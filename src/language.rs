//! Parsers and lexers for injected languages.
//!
//! The engine never bundles grammars. Callers register an [`InjectedParser`]
//! and optionally an [`InjectedLexer`] per language id in a
//! [`LanguageRegistry`]; two adapters ship with the crate:
//!
//! - [`PlainTextParser`] / [`PlainTextLexer`]: words, punctuation, whitespace
//! - [`TreeSitterParser`] / [`TreeSitterLexer`]: any tree-sitter grammar

mod plain;
mod registry;
mod treesitter;

use std::ops::Range;

use url::Url;

use crate::cancel::Cancellation;
use crate::error::InjectionResult;
use crate::syntax::SyntaxTree;

pub use plain::{PlainTextLexer, PlainTextParser};
pub use registry::LanguageRegistry;
pub use treesitter::{TreeSitterLexer, TreeSitterParser};

/// Leaf kind used for whitespace by the shipped adapters.
pub const WHITE_SPACE: &str = "WHITE_SPACE";

/// Parses a decoded buffer into a tree whose leaves partition the buffer.
pub trait InjectedParser: Send + Sync {
    fn parse(&self, text: &str, cancel: &Cancellation) -> InjectionResult<SyntaxTree>;
}

/// A classified token of a decoded buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexToken {
    pub kind: String,
    pub range: Range<usize>,
}

/// Tokenizes a decoded buffer for presentation.
///
/// `context` is the host file the buffer was injected into.
pub trait InjectedLexer: Send + Sync {
    fn tokenize(&self, text: &str, context: &Url) -> Vec<LexToken>;
}
