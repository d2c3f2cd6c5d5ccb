//! Injected-language virtual documents.
//!
//! Fragments of a host document written in another language are decoded into
//! one buffer, parsed, and exposed as a [`VirtualDocument`] whose leaves line
//! up with the host text. Offsets translate both ways and results are cached
//! per host element until the host document changes.

pub mod cache;
pub mod cancel;
pub mod config;
pub mod document;
pub mod error;
pub mod escaper;
pub mod host;
pub mod injection;
pub mod language;
pub mod syntax;
pub mod text;

pub use cache::InjectionCache;
pub use cancel::Cancellation;
pub use config::InjectionSettings;
pub use error::{InjectionError, InjectionResult};
pub use host::{ElementId, HostDocument, HostFile, InjectionHost};
pub use injection::{
    HighlightToken, InjectionPolicy, InjectionRequest, OffsetTranslator, Place, Placement,
    Registrar, Shred, VirtualDocument,
};
pub use language::{InjectedLexer, InjectedParser, LanguageRegistry};
