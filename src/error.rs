//! Error handling types for utsushi
//!
//! Two disjoint classes exist: contract/invariant violations, which abort the
//! in-progress injection session, and cooperative cancellation, which is not a
//! defect and must travel through every wrapping path untouched.

use std::ops::Range;
use std::sync::PoisonError;
use thiserror::Error;

/// Error type for injection operations
#[derive(Debug, Error)]
pub enum InjectionError {
    /// The environment asked the current computation to stop
    #[error("Injection cancelled")]
    Cancelled,

    /// A range passed by a caller is malformed or lies outside its owner
    #[error("Invalid range {start}..{end}: {message}")]
    InvalidRange {
        start: usize,
        end: usize,
        message: String,
    },

    /// The registrar was driven out of state order
    #[error("Invalid injection state: {message}")]
    InvalidState { message: String },

    /// No parser is registered for the requested language
    #[error("Parser not found for language: {language}")]
    ParserNotFound { language: String },

    /// No lexer is registered for the requested language
    #[error("Lexer not found for language: {language}")]
    LexerNotFound { language: String },

    /// Leaf texts no longer add up to the text they were parsed from
    #[error("Malformed injected tree: {message}")]
    MalformedTree { message: String },

    /// An escaper broke the monotonic/end-of-range mapping contract
    #[error("Escaper contract violated: {message}")]
    EscaperContract { message: String },

    /// An edit in injected coordinates touched prefix or suffix text
    #[error("Edit at injected offset {offset} touches prefix/suffix text")]
    FramingEdited { offset: usize },

    /// A failure inside an injection session, with diagnostics
    #[error("Injection of '{language}' into {host_file} failed (hosts: {hosts}): {source}")]
    Session {
        language: String,
        host_file: String,
        hosts: String,
        #[source]
        source: Box<InjectionError>,
    },
}

/// Result type for injection operations
pub type InjectionResult<T> = Result<T, InjectionError>;

/// Helper trait to convert PoisonError into a recovered guard
pub trait LockResultExt<T> {
    /// Recover from a poisoned lock, logging which operation triggered it.
    fn recover_poison(self, context: &str) -> T;
}

impl<T> LockResultExt<T> for Result<T, PoisonError<T>> {
    fn recover_poison(self, context: &str) -> T {
        match self {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!(
                    target: "utsushi::lock_recovery",
                    "Recovered from poisoned lock in {}",
                    context
                );
                poisoned.into_inner()
            }
        }
    }
}

/// Helper functions for common error patterns
impl InjectionError {
    /// Create an invalid range error
    pub fn invalid_range(range: &Range<usize>, message: impl Into<String>) -> Self {
        InjectionError::InvalidRange {
            start: range.start,
            end: range.end,
            message: message.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        InjectionError::InvalidState {
            message: message.into(),
        }
    }

    /// Create a parser not found error
    pub fn parser_not_found(language: impl Into<String>) -> Self {
        InjectionError::ParserNotFound {
            language: language.into(),
        }
    }

    /// Create a lexer not found error
    pub fn lexer_not_found(language: impl Into<String>) -> Self {
        InjectionError::LexerNotFound {
            language: language.into(),
        }
    }

    /// Create a malformed tree error
    pub fn malformed_tree(message: impl Into<String>) -> Self {
        InjectionError::MalformedTree {
            message: message.into(),
        }
    }

    /// Create an escaper contract error
    pub fn escaper_contract(message: impl Into<String>) -> Self {
        InjectionError::EscaperContract {
            message: message.into(),
        }
    }

    /// True for cooperative cancellation, including when nested in a session error.
    pub fn is_cancellation(&self) -> bool {
        match self {
            InjectionError::Cancelled => true,
            InjectionError::Session { source, .. } => source.is_cancellation(),
            _ => false,
        }
    }

    /// Attach session diagnostics (language, host file, host elements).
    ///
    /// Cancellation is returned unchanged so callers can keep propagating it.
    pub fn with_session_context(
        self,
        language: &str,
        host_file: &str,
        hosts: impl FnOnce() -> String,
    ) -> Self {
        match self {
            InjectionError::Cancelled => InjectionError::Cancelled,
            already @ InjectionError::Session { .. } => already,
            other => InjectionError::Session {
                language: language.to_string(),
                host_file: host_file.to_string(),
                hosts: hosts(),
                source: Box::new(other),
            },
        }
    }
}
