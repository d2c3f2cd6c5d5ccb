//! Codecs between raw host text and the decoded text handed to parsers.
//!
//! All offsets an escaper deals with are relative to the start of its host
//! element. Mapping must be monotonic non-decreasing in the decoded offset,
//! and the decoded length must map to the end of the decoded host range.

mod backslash;

use std::ops::Range;

use serde::{Deserialize, Serialize};

pub use backslash::Backslash;

pub trait Escaper: Send {
    /// Append the decoded form of `host_text[range_inside_host]` to `out`.
    ///
    /// Returns false when decoding stopped early; the escaper then maps the
    /// decoded length to the position where it stopped.
    fn decode(&mut self, host_text: &str, range_inside_host: Range<usize>, out: &mut String)
    -> bool;

    /// Host offset of a decoded offset, None inside an escape expansion.
    fn offset_in_host(&self, decoded_offset: usize, range_inside_host: &Range<usize>)
    -> Option<usize>;

    /// Part of the host text that may be decoded at all.
    fn relevant_text_range(&self, host_text: &str) -> Range<usize>;

    fn is_one_line(&self) -> bool;
}

/// Shipped escaper implementations, selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscaperKind {
    Verbatim,
    Backslash,
}

impl EscaperKind {
    pub fn create(self) -> Box<dyn Escaper> {
        match self {
            EscaperKind::Verbatim => Box::new(Verbatim),
            EscaperKind::Backslash => Box::new(Backslash::default()),
        }
    }
}

/// Identity codec: decoded text is the host text.
#[derive(Debug, Default, Clone, Copy)]
pub struct Verbatim;

impl Escaper for Verbatim {
    fn decode(
        &mut self,
        host_text: &str,
        range_inside_host: Range<usize>,
        out: &mut String,
    ) -> bool {
        match host_text.get(range_inside_host) {
            Some(text) => {
                out.push_str(text);
                true
            }
            None => false,
        }
    }

    fn offset_in_host(
        &self,
        decoded_offset: usize,
        range_inside_host: &Range<usize>,
    ) -> Option<usize> {
        let offset = range_inside_host.start + decoded_offset;
        (offset <= range_inside_host.end).then_some(offset)
    }

    fn relevant_text_range(&self, host_text: &str) -> Range<usize> {
        0..host_text.len()
    }

    fn is_one_line(&self) -> bool {
        false
    }
}
