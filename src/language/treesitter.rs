use std::sync::Mutex;

use tree_sitter::{Language, Parser, Tree};
use url::Url;

use super::{InjectedLexer, InjectedParser, LexToken, WHITE_SPACE};
use crate::cancel::Cancellation;
use crate::error::{InjectionError, InjectionResult, LockResultExt};
use crate::syntax::{SyntaxTree, TreeBuilder};

/// Small pool of tree-sitter parsers for one grammar.
struct ParserPool {
    language_id: String,
    language: Language,
    available: Mutex<Vec<Parser>>,
}

impl ParserPool {
    fn new(language_id: &str, language: Language) -> Self {
        Self {
            language_id: language_id.to_string(),
            language,
            available: Mutex::new(Vec::new()),
        }
    }

    /// Acquire a parser, from the pool if available, otherwise created
    fn acquire(&self) -> InjectionResult<Parser> {
        if let Some(parser) = self
            .available
            .lock()
            .recover_poison("ParserPool::acquire")
            .pop()
        {
            return Ok(parser);
        }
        let mut parser = Parser::new();
        parser.set_language(&self.language).map_err(|err| {
            log::warn!(
                target: "utsushi::language",
                "Grammar for {} rejected: {}",
                self.language_id,
                err
            );
            InjectionError::parser_not_found(&self.language_id)
        })?;
        Ok(parser)
    }

    fn release(&self, parser: Parser) {
        self.available
            .lock()
            .recover_poison("ParserPool::release")
            .push(parser);
    }

    fn parse(&self, text: &str) -> InjectionResult<Tree> {
        let mut parser = self.acquire()?;
        let tree = parser.parse(text, None);
        self.release(parser);
        tree.ok_or_else(|| {
            InjectionError::malformed_tree(format!("{} parser produced no tree", self.language_id))
        })
    }
}

fn gap_kind(gap: &str) -> &'static str {
    if gap.chars().all(char::is_whitespace) {
        WHITE_SPACE
    } else {
        "TEXT"
    }
}

/// Parser adapter for a tree-sitter grammar.
///
/// The result has a `FILE` root over the tree-sitter tree. Text not covered by
/// any tree-sitter leaf (whitespace, extras) becomes `WHITE_SPACE` or `TEXT`
/// leaves so leaves partition the buffer.
pub struct TreeSitterParser {
    pool: ParserPool,
}

impl TreeSitterParser {
    pub fn new(language_id: &str, language: Language) -> Self {
        Self {
            pool: ParserPool::new(language_id, language),
        }
    }
}

impl InjectedParser for TreeSitterParser {
    fn parse(&self, text: &str, cancel: &Cancellation) -> InjectionResult<SyntaxTree> {
        cancel.check()?;
        let tree = self.pool.parse(text)?;
        cancel.check()?;

        let mut builder = TreeBuilder::new();
        builder.start_node("FILE")?;
        let mut position = 0;
        let mut cursor = tree.walk();

        'walk: loop {
            let node = cursor.node();
            if node.child_count() == 0 {
                let range = node.byte_range();
                if range.start > position {
                    let gap = &text[position..range.start];
                    builder.token(gap_kind(gap), gap, gap_kind(gap) == WHITE_SPACE)?;
                }
                if !range.is_empty() {
                    builder.token(node.kind(), &text[range.clone()], false)?;
                }
                position = position.max(range.end);
            } else {
                builder.start_node(node.kind())?;
                cursor.goto_first_child();
                continue;
            }

            loop {
                if cursor.goto_next_sibling() {
                    continue 'walk;
                }
                if !cursor.goto_parent() {
                    break 'walk;
                }
                builder.finish_node()?;
            }
        }

        if position < text.len() {
            let gap = &text[position..];
            builder.token(gap_kind(gap), gap, gap_kind(gap) == WHITE_SPACE)?;
        }
        builder.finish_node()?;
        builder.finish()
    }
}

/// Lexer adapter: tree-sitter leaves become tokens of their node kind.
pub struct TreeSitterLexer {
    pool: ParserPool,
}

impl TreeSitterLexer {
    pub fn new(language_id: &str, language: Language) -> Self {
        Self {
            pool: ParserPool::new(language_id, language),
        }
    }
}

impl InjectedLexer for TreeSitterLexer {
    fn tokenize(&self, text: &str, context: &Url) -> Vec<LexToken> {
        let tree = match self.pool.parse(text) {
            Ok(tree) => tree,
            Err(err) => {
                log::debug!(target: "utsushi::language", "No tokens for {}: {}", context, err);
                return Vec::new();
            }
        };

        let mut tokens = Vec::new();
        let mut cursor = tree.walk();
        'walk: loop {
            if cursor.goto_first_child() {
                continue;
            }
            let node = cursor.node();
            if !node.byte_range().is_empty() {
                tokens.push(LexToken {
                    kind: node.kind().to_string(),
                    range: node.byte_range(),
                });
            }
            loop {
                if cursor.goto_next_sibling() {
                    continue 'walk;
                }
                if !cursor.goto_parent() {
                    break 'walk;
                }
            }
        }
        tokens
    }
}
