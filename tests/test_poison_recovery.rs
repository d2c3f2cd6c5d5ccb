//! Tests for poison lock recovery mechanisms

use std::sync::Arc;
use std::thread;

use utsushi::error::InjectionResult;
use utsushi::language::PlainTextParser;
use utsushi::syntax::SyntaxTree;
use utsushi::{Cancellation, InjectedParser, LanguageRegistry};

/// Panics when the registry drops it, which happens while the map is locked.
struct PanicOnDrop;

impl Drop for PanicOnDrop {
    fn drop(&mut self) {
        if !thread::panicking() {
            panic!("Intentional panic to poison the lock");
        }
    }
}

impl InjectedParser for PanicOnDrop {
    fn parse(&self, text: &str, cancel: &Cancellation) -> InjectionResult<SyntaxTree> {
        PlainTextParser.parse(text, cancel)
    }
}

#[test]
fn test_registry_recovers_from_poisoned_lock() {
    let registry = Arc::new(LanguageRegistry::new());
    registry.register_parser("sql", Arc::new(PanicOnDrop));

    let registry_clone = registry.clone();
    let handle = thread::spawn(move || {
        // Replacing the parser drops the old one inside the lock
        registry_clone.register_parser("sql", Arc::new(PlainTextParser));
    });
    assert!(handle.join().is_err(), "replacement should have panicked");

    assert!(registry.contains("sql"));
    assert_eq!(registry.language_ids(), vec!["sql".to_string()]);
    let parser = registry.parser("sql").expect("recovered parser");
    let tree = parser.parse("select 1", &Cancellation::new()).unwrap();
    assert_eq!(tree.text(), "select 1");
}
