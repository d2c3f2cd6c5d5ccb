use std::ops::Range;

use super::Escaper;

/// C-style string literal escapes.
///
/// Understands `\n \t \r \0 \\ \" \'` and `\u{XXXX}`. Anything else stops
/// decoding. Surrounding matching quotes are not part of the relevant range.
#[derive(Debug, Default)]
pub struct Backslash {
    /// Host offset of every decoded byte, plus one entry for the decoded end
    source_offsets: Vec<Option<usize>>,
}

impl Backslash {
    fn record(&mut self, decoded: char, host_offset: usize) {
        self.source_offsets.push(Some(host_offset));
        // Interior bytes of a multi-byte char have no host position of their own
        self.source_offsets
            .extend(std::iter::repeat_n(None, decoded.len_utf8() - 1));
    }
}

/// Decode one escape at the start of `text`, returning the char and the
/// number of host bytes it consumed.
fn decode_escape(text: &str) -> Option<(char, usize)> {
    let mut chars = text.strip_prefix('\\')?.chars();
    let decoded = match chars.next()? {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        '\\' => '\\',
        '"' => '"',
        '\'' => '\'',
        'u' => {
            let body = text.get(2..)?.strip_prefix('{')?;
            let close = body.find('}')?;
            let digits = &body[..close];
            if digits.is_empty() || digits.len() > 6 {
                return None;
            }
            let value = u32::from_str_radix(digits, 16).ok()?;
            return char::from_u32(value).map(|c| (c, "\\u{".len() + close + 1));
        }
        _ => return None,
    };
    Some((decoded, 2))
}

impl Escaper for Backslash {
    fn decode(
        &mut self,
        host_text: &str,
        range_inside_host: Range<usize>,
        out: &mut String,
    ) -> bool {
        self.source_offsets.clear();
        let Some(text) = host_text.get(range_inside_host.clone()) else {
            self.source_offsets.push(Some(range_inside_host.start));
            return false;
        };

        let mut position = 0;
        while position < text.len() {
            let rest = &text[position..];
            let host_offset = range_inside_host.start + position;
            let (decoded, consumed) = if rest.starts_with('\\') {
                match decode_escape(rest) {
                    Some(escape) => escape,
                    None => {
                        self.source_offsets.push(Some(host_offset));
                        return false;
                    }
                }
            } else {
                let Some(c) = rest.chars().next() else {
                    break;
                };
                (c, c.len_utf8())
            };
            self.record(decoded, host_offset);
            out.push(decoded);
            position += consumed;
        }

        self.source_offsets.push(Some(range_inside_host.end));
        true
    }

    fn offset_in_host(
        &self,
        decoded_offset: usize,
        _range_inside_host: &Range<usize>,
    ) -> Option<usize> {
        self.source_offsets.get(decoded_offset).copied().flatten()
    }

    fn relevant_text_range(&self, host_text: &str) -> Range<usize> {
        let bytes = host_text.as_bytes();
        match (bytes.first(), bytes.last()) {
            (Some(&open), Some(&close))
                if bytes.len() >= 2 && open == close && (open == b'"' || open == b'\'') =>
            {
                1..bytes.len() - 1
            }
            _ => 0..bytes.len(),
        }
    }

    fn is_one_line(&self) -> bool {
        true
    }
}
