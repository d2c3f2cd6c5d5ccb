use std::ops::Range;

use super::Shred;
use crate::host::ElementId;
use crate::language::LexToken;

/// A lexer token attributed to one host element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightToken {
    pub kind: String,
    pub host: ElementId,
    /// Absolute host range
    pub range: Range<usize>,
}

/// Map tokens of the decoded buffer onto host ranges.
///
/// Parts of a token inside prefix or suffix text are dropped. A token crossing
/// a shred end yields one highlight per shred body it touches.
pub(crate) fn project_tokens(tokens: &[LexToken], shreds: &[Shred]) -> Vec<HighlightToken> {
    let mut projected = Vec::new();
    let mut active = 0;

    for token in tokens {
        while active < shreds.len() && token.range.start >= shreds[active].range().end {
            active += 1;
        }

        for shred in shreds.iter().skip(active) {
            if shred.range().start >= token.range.end {
                break;
            }
            if !shred.host_marker().is_valid() {
                continue;
            }
            let body = shred.body_range();
            let start = token.range.start.max(body.start);
            let end = token.range.end.min(body.end);
            if start >= end {
                continue;
            }

            let offsets = shred.offsets();
            let host_start = shred.host_start();
            let range = host_start + offsets.resolve_backward(start - body.start)
                ..host_start + offsets.resolve_forward(end - body.start);
            if range.is_empty() {
                continue;
            }
            projected.push(HighlightToken {
                kind: token.kind.clone(),
                host: shred.host_id(),
                range,
            });
        }
    }

    log::trace!(
        target: "utsushi::tokens",
        "Projected {} lexer tokens to {} host tokens",
        tokens.len(),
        projected.len()
    );
    projected
}
