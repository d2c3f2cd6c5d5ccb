use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tree_sitter::Language;

use super::{InjectedLexer, InjectedParser, TreeSitterLexer, TreeSitterParser};
use crate::error::LockResultExt;

/// Registry of parsers and lexers by language id
#[derive(Clone, Default)]
pub struct LanguageRegistry {
    parsers: Arc<Mutex<HashMap<String, Arc<dyn InjectedParser>>>>,
    lexers: Arc<Mutex<HashMap<String, Arc<dyn InjectedLexer>>>>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parser with the given ID
    pub fn register_parser(&self, language_id: impl Into<String>, parser: Arc<dyn InjectedParser>) {
        self.parsers
            .lock()
            .recover_poison("registry::register_parser")
            .insert(language_id.into(), parser);
    }

    /// Register a lexer with the given ID
    pub fn register_lexer(&self, language_id: impl Into<String>, lexer: Arc<dyn InjectedLexer>) {
        self.lexers
            .lock()
            .recover_poison("registry::register_lexer")
            .insert(language_id.into(), lexer);
    }

    /// Register a tree-sitter grammar as both parser and lexer
    pub fn register_tree_sitter(&self, language_id: &str, language: Language) {
        self.register_parser(
            language_id,
            Arc::new(TreeSitterParser::new(language_id, language.clone())),
        );
        self.register_lexer(
            language_id,
            Arc::new(TreeSitterLexer::new(language_id, language)),
        );
    }

    /// Get the parser for a language
    pub fn parser(&self, language_id: &str) -> Option<Arc<dyn InjectedParser>> {
        self.parsers
            .lock()
            .recover_poison("registry::parser")
            .get(language_id)
            .cloned()
    }

    /// Get the lexer for a language
    pub fn lexer(&self, language_id: &str) -> Option<Arc<dyn InjectedLexer>> {
        self.lexers
            .lock()
            .recover_poison("registry::lexer")
            .get(language_id)
            .cloned()
    }

    /// Check if a parser is registered for the language
    pub fn contains(&self, language_id: &str) -> bool {
        self.parsers
            .lock()
            .recover_poison("registry::contains")
            .contains_key(language_id)
    }

    /// Get all language IDs with a parser
    pub fn language_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .parsers
            .lock()
            .recover_poison("registry::language_ids")
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}
