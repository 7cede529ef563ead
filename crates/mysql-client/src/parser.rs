//! Placeholder scanner for SQL text.
//!
//! [`SqlParser`] walks a statement once, left to right, and reports every
//! parameter placeholder that is not inside a string literal, a quoted
//! identifier or a comment. It does not understand SQL grammar beyond that.
//!
//! Recognised placeholders:
//!
//! - `@name`, where `name` is made of letters, digits, `_`, `.` and `$`
//! - `?`
//!
//! `@@system_variable` and quoted user variables such as `` @`x` `` are
//! skipped.

use crate::error::Result;

/// Receives placeholder callbacks from [`SqlParser::parse`].
///
/// Offsets are byte offsets into the parsed text.
pub trait ParseHandler {
    /// A named placeholder `@name` spans `sql[index..index + length]`,
    /// including the `@`.
    fn on_named_parameter(&mut self, index: usize, length: usize) -> Result<()>;

    /// A positional placeholder `?` sits at `sql[index]`.
    fn on_positional_parameter(&mut self, index: usize) -> Result<()>;
}

/// Single-pass placeholder scanner.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlParser;

impl SqlParser {
    /// Scan `sql`, invoking `handler` for each placeholder in order.
    ///
    /// Stops at the first error returned by the handler.
    pub fn parse<H: ParseHandler>(sql: &str, handler: &mut H) -> Result<()> {
        let bytes = sql.as_bytes();
        let len = bytes.len();
        let mut i = 0;

        while i < len {
            match bytes[i] {
                quote @ (b'\'' | b'"') => i = skip_quoted(bytes, i, quote, true),
                b'`' => i = skip_quoted(bytes, i, b'`', false),
                b'-' if bytes.get(i + 1) == Some(&b'-')
                    && bytes.get(i + 2).is_none_or(u8::is_ascii_whitespace) =>
                {
                    i = skip_line(bytes, i);
                }
                b'#' => i = skip_line(bytes, i),
                b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
                b'?' => {
                    handler.on_positional_parameter(i)?;
                    i += 1;
                }
                b'@' => match bytes.get(i + 1) {
                    // @@system.variable
                    Some(b'@') => i = skip_identifier(bytes, i + 2),
                    // @`quoted user variable`
                    Some(&quote @ (b'\'' | b'"' | b'`')) => {
                        i = skip_quoted(bytes, i + 1, quote, quote != b'`');
                    }
                    _ => {
                        let end = skip_identifier(bytes, i + 1);
                        if end > i + 1 {
                            handler.on_named_parameter(i, end - i)?;
                        }
                        i = end.max(i + 1);
                    }
                },
                _ => i += 1,
            }
        }

        Ok(())
    }
}

fn is_identifier_byte(b: u8) -> bool {
    // Non-ASCII bytes belong to multi-byte UTF-8 letters.
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'$') || b >= 0x80
}

fn skip_identifier(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && is_identifier_byte(bytes[i]) {
        i += 1;
    }
    i
}

/// Returns the offset just past the closing quote, or the end of input for
/// an unterminated literal. A doubled quote is an escaped quote.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8, backslash_escapes: bool) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if backslash_escapes && b == b'\\' {
            i += 2;
            continue;
        }
        if b == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn skip_line(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |pos| start + pos + 1)
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |pos| start + 2 + pos + 2)
}
