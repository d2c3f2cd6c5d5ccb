use std::ops::Range;

use url::Url;

use super::{InjectedLexer, InjectedParser, LexToken, WHITE_SPACE};
use crate::cancel::Cancellation;
use crate::error::InjectionResult;
use crate::syntax::{SyntaxTree, TreeBuilder};

/// Splits text into whitespace runs, word runs and single punctuation chars.
fn scan(text: &str) -> Vec<(&'static str, Range<usize>)> {
    fn class(c: char) -> &'static str {
        if c.is_whitespace() {
            WHITE_SPACE
        } else if c.is_alphanumeric() || c == '_' {
            "WORD"
        } else {
            "PUNCT"
        }
    }

    let mut tokens: Vec<(&'static str, Range<usize>)> = Vec::new();
    for (offset, c) in text.char_indices() {
        let kind = class(c);
        let end = offset + c.len_utf8();
        match tokens.last_mut() {
            Some((last, range)) if *last == kind && kind != "PUNCT" => range.end = end,
            _ => tokens.push((kind, offset..end)),
        }
    }
    tokens
}

/// Flat parser: a `FILE` root over word, punctuation and whitespace leaves.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextParser;

impl InjectedParser for PlainTextParser {
    fn parse(&self, text: &str, cancel: &Cancellation) -> InjectionResult<SyntaxTree> {
        cancel.check()?;
        let mut builder = TreeBuilder::new();
        builder.start_node("FILE")?;
        for (kind, range) in scan(text) {
            builder.token(kind, &text[range], kind == WHITE_SPACE)?;
        }
        builder.finish_node()?;
        builder.finish()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextLexer;

impl InjectedLexer for PlainTextLexer {
    fn tokenize(&self, text: &str, _context: &Url) -> Vec<LexToken> {
        scan(text)
            .into_iter()
            .map(|(kind, range)| LexToken {
                kind: kind.to_string(),
                range,
            })
            .collect()
    }
}
