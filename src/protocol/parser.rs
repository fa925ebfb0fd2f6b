//! Incremental RESP Parser
//!
//! The parser works on a byte buffer that may hold a partial message.
//! It returns either:
//! - `Ok(Some((value, consumed)))` - a complete value, `consumed` bytes were used
//! - `Ok(None)` - the message is incomplete, read more bytes and retry
//! - `Err(ParseError)` - the bytes can never form a valid value
//!
//! The caller owns the buffer: it appends network data, calls `parse()`,
//! and advances the buffer by `consumed` on success. See
//! [`crate::protocol::codec`] for the stream-level wrapper.

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use std::num::ParseIntError;
use thiserror::Error;

/// Errors that can occur during RESP parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Unknown type prefix byte
    #[error("unknown type prefix: {0:#04x}")]
    UnknownPrefix(u8),

    /// Invalid integer format
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Invalid UTF-8 in a simple string or error message
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array count is negative
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (missing CRLF, etc.)
    #[error("{0}")]
    ProtocolError(String),

    /// The message exceeds maximum allowed size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum length of a CRLF-terminated line (simple string, error,
/// integer, or a bulk/array header), excluding the prefix and CRLF
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Maximum number of elements in an array
pub const MAX_ARRAY_LEN: i64 = 1024 * 1024;

/// Maximum array nesting depth (prevent stack overflow)
pub const MAX_NESTING_DEPTH: usize = 32;

/// Upper bound on the element capacity reserved up front for an array.
const MAX_PREALLOC: usize = 1024;

/// An incremental RESP parser.
///
/// # Example
///
/// ```
/// use redlite::protocol::{RespParser, RespValue};
/// use bytes::Bytes;
///
/// let mut parser = RespParser::new();
/// let (value, consumed) = parser
///     .parse(b"*1\r\n$4\r\nPING\r\n")
///     .unwrap()
///     .unwrap();
/// assert_eq!(consumed, 14);
/// assert_eq!(value, RespValue::array(vec![RespValue::bulk_string(Bytes::from("PING"))]));
/// ```
#[derive(Debug, Default)]
pub struct RespParser {
    /// Current nesting depth (for array parsing)
    depth: usize,
}

impl RespParser {
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    /// Attempts to parse one RESP value from the front of `buf`.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        self.depth = 0;
        self.parse_value(buf)
    }

    fn parse_value(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }

        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::ProtocolError(format!(
                "maximum nesting depth exceeded: {}",
                MAX_NESTING_DEPTH
            )));
        }

        match buf[0] {
            prefix::SIMPLE_STRING => {
                Ok(parse_text_line(buf)?.map(|(s, n)| (RespValue::SimpleString(s), n)))
            }
            prefix::ERROR => Ok(parse_text_line(buf)?.map(|(s, n)| (RespValue::Error(s), n))),
            prefix::INTEGER => Ok(parse_int_line(buf)?.map(|(i, n)| (RespValue::Integer(i), n))),
            prefix::BULK_STRING => self.parse_bulk_string(buf),
            prefix::ARRAY => self.parse_array(buf),
            other => Err(ParseError::UnknownPrefix(other)),
        }
    }

    /// Parses a bulk string: `$<length>\r\n<data>\r\n`
    fn parse_bulk_string(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        debug_assert!(buf[0] == prefix::BULK_STRING);

        let (length, data_start) = match parse_int_line(buf)? {
            Some(header) => header,
            None => return Ok(None),
        };

        if length == -1 {
            return Ok(Some((RespValue::BulkString(None), data_start)));
        }

        if length < 0 {
            return Err(ParseError::InvalidBulkLength(length));
        }

        let length = length as usize;

        if length > MAX_BULK_SIZE {
            return Err(ParseError::MessageTooLarge {
                size: length,
                max: MAX_BULK_SIZE,
            });
        }

        let total_needed = data_start + length + 2;
        if buf.len() < total_needed {
            return Ok(None);
        }

        if &buf[data_start + length..total_needed] != CRLF {
            return Err(ParseError::ProtocolError(
                "bulk string missing trailing CRLF".to_string(),
            ));
        }

        let data = Bytes::copy_from_slice(&buf[data_start..data_start + length]);

        Ok(Some((RespValue::BulkString(Some(data)), total_needed)))
    }

    /// Parses an array: `*<count>\r\n<elements...>`
    fn parse_array(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        debug_assert!(buf[0] == prefix::ARRAY);

        let (count, mut consumed) = match parse_int_line(buf)? {
            Some(header) => header,
            None => return Ok(None),
        };

        if count < 0 {
            return Err(ParseError::InvalidArrayLength(count));
        }

        if count > MAX_ARRAY_LEN {
            return Err(ParseError::MessageTooLarge {
                size: count as usize,
                max: MAX_ARRAY_LEN as usize,
            });
        }

        let count = count as usize;
        let mut elements = Vec::with_capacity(count.min(MAX_PREALLOC));

        self.depth += 1;
        for _ in 0..count {
            match self.parse_value(&buf[consumed..]) {
                Ok(Some((value, element_consumed))) => {
                    elements.push(value);
                    consumed += element_consumed;
                }
                other => {
                    self.depth -= 1;
                    return other.map(|_| None);
                }
            }
        }
        self.depth -= 1;

        Ok(Some((RespValue::Array(elements), consumed)))
    }
}

/// Reads the CRLF-terminated line after the prefix byte as UTF-8.
///
/// Returns the text and the total bytes consumed, prefix and CRLF included.
/// Only the first `MAX_LINE_LENGTH + 2` bytes are searched for the CRLF, so
/// an unterminated line fails once that much has been buffered.
fn parse_text_line(buf: &[u8]) -> ParseResult<Option<(String, usize)>> {
    let window = &buf[1..buf.len().min(1 + MAX_LINE_LENGTH + 2)];
    match find_crlf(window) {
        Some(pos) => {
            let s = std::str::from_utf8(&buf[1..1 + pos])
                .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
            Ok(Some((s.to_string(), 1 + pos + 2)))
        }
        None if window.len() == MAX_LINE_LENGTH + 2 => Err(ParseError::MessageTooLarge {
            size: buf.len() - 1,
            max: MAX_LINE_LENGTH,
        }),
        None => Ok(None),
    }
}

/// Reads the line after the prefix byte as a base-10 signed 64-bit integer.
fn parse_int_line(buf: &[u8]) -> ParseResult<Option<(i64, usize)>> {
    match parse_text_line(buf)? {
        Some((s, consumed)) => {
            let n: i64 = s
                .parse()
                .map_err(|e: ParseIntError| ParseError::InvalidInteger(format!("{s:?} ({e})")))?;
            Ok(Some((n, consumed)))
        }
        None => Ok(None),
    }
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
pub(crate) fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Parses a single RESP message from bytes with a fresh parser.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_string() {
        let (value, consumed) = parse_message(b"+OK\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::SimpleString("OK".to_string()));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_parse_simple_string_incomplete() {
        assert!(parse_message(b"+OK").unwrap().is_none());
        assert!(parse_message(b"+OK\r").unwrap().is_none());
    }

    #[test]
    fn test_parse_error() {
        let (value, consumed) = parse_message(b"-ERR unknown command\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Error("ERR unknown command".to_string()));
        assert_eq!(consumed, 22);
    }

    #[test]
    fn test_parse_integer() {
        let (value, consumed) = parse_message(b":1000\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Integer(1000));
        assert_eq!(consumed, 7);

        let (value, _) = parse_message(b":-42\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Integer(-42));
    }

    #[test]
    fn test_parse_integer_bounds() {
        let input = format!(":{}\r\n", i64::MIN);
        let (value, _) = parse_message(input.as_bytes()).unwrap().unwrap();
        assert_eq!(value, RespValue::Integer(i64::MIN));

        let overflow = b":9223372036854775808\r\n";
        assert!(matches!(
            parse_message(overflow),
            Err(ParseError::InvalidInteger(_))
        ));
    }

    #[test]
    fn test_parse_invalid_integer() {
        assert!(matches!(
            parse_message(b":not_a_number\r\n"),
            Err(ParseError::InvalidInteger(_))
        ));
    }

    #[test]
    fn test_parse_bulk_string() {
        let (value, consumed) = parse_message(b"$5\r\nhello\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::bulk_string(Bytes::from("hello")));
        assert_eq!(consumed, 11);
    }

    #[test]
    fn test_parse_null_bulk_string() {
        let (value, consumed) = parse_message(b"$-1\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::null());
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_parse_empty_bulk_string() {
        let (value, consumed) = parse_message(b"$0\r\n\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::bulk_string(Bytes::new()));
        assert_ne!(value, RespValue::null());
        assert_eq!(consumed, 6);
    }

    #[test]
    fn test_parse_bulk_string_incomplete() {
        assert!(parse_message(b"$5\r\nhel").unwrap().is_none());
        assert!(parse_message(b"$5\r\nhello").unwrap().is_none());
        assert!(parse_message(b"$5").unwrap().is_none());
    }

    #[test]
    fn test_parse_bulk_string_missing_crlf() {
        assert!(matches!(
            parse_message(b"$3\r\nfoobar\r\n"),
            Err(ParseError::ProtocolError(_))
        ));
    }

    #[test]
    fn test_parse_bulk_string_bad_length() {
        assert_eq!(
            parse_message(b"$-2\r\n"),
            Err(ParseError::InvalidBulkLength(-2))
        );
        assert!(matches!(
            parse_message(b"$abc\r\n"),
            Err(ParseError::InvalidInteger(_))
        ));
    }

    #[test]
    fn test_parse_bulk_string_too_large() {
        let input = format!("${}\r\n", MAX_BULK_SIZE + 1);
        assert!(matches!(
            parse_message(input.as_bytes()),
            Err(ParseError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_unterminated_line_too_long() {
        let mut input = vec![b'+'];
        input.extend(std::iter::repeat(b'a').take(MAX_LINE_LENGTH + 1));
        assert!(parse_message(&input).unwrap().is_none());

        input.push(b'a');
        assert_eq!(
            parse_message(&input),
            Err(ParseError::MessageTooLarge {
                size: MAX_LINE_LENGTH + 2,
                max: MAX_LINE_LENGTH,
            })
        );

        let mut header = vec![b'$'];
        header.extend(std::iter::repeat(b'1').take(MAX_LINE_LENGTH + 2));
        assert!(matches!(
            parse_message(&header),
            Err(ParseError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_line_at_length_limit() {
        let text = "a".repeat(MAX_LINE_LENGTH);
        let input = format!("+{}\r\n", text);
        let (value, consumed) = parse_message(input.as_bytes()).unwrap().unwrap();
        assert_eq!(value, RespValue::SimpleString(text));
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_parse_array_too_long() {
        let input = format!("*{}\r\n", MAX_ARRAY_LEN + 1);
        assert!(matches!(
            parse_message(input.as_bytes()),
            Err(ParseError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_binary_safe_bulk_string() {
        let (value, _) = parse_message(b"$7\r\nhel\x00\r\no\r\n").unwrap().unwrap();
        assert_eq!(
            value,
            RespValue::bulk_string(Bytes::from(&b"hel\x00\r\no"[..]))
        );
    }

    #[test]
    fn test_parse_array() {
        let input = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
        let (value, consumed) = parse_message(input).unwrap().unwrap();
        assert_eq!(
            value,
            RespValue::Array(vec![
                RespValue::bulk_string(Bytes::from("GET")),
                RespValue::bulk_string(Bytes::from("name")),
            ])
        );
        assert_eq!(consumed, 23);
    }

    #[test]
    fn test_parse_array_incomplete() {
        assert!(parse_message(b"*2\r\n$3\r\nGET\r\n").unwrap().is_none());
        assert!(parse_message(b"*2\r\n$3\r\nGET\r\n$4\r\nna").unwrap().is_none());
    }

    #[test]
    fn test_parse_empty_array() {
        let (value, consumed) = parse_message(b"*0\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Array(vec![]));
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_parse_negative_array_rejected() {
        assert_eq!(
            parse_message(b"*-1\r\n"),
            Err(ParseError::InvalidArrayLength(-1))
        );
    }

    #[test]
    fn test_parse_nested_array() {
        let input = b"*2\r\n:1\r\n*2\r\n:2\r\n:3\r\n";
        let (value, _) = parse_message(input).unwrap().unwrap();
        assert_eq!(
            value,
            RespValue::Array(vec![
                RespValue::Integer(1),
                RespValue::Array(vec![RespValue::Integer(2), RespValue::Integer(3)]),
            ])
        );
    }

    #[test]
    fn test_element_error_aborts_array() {
        let input = b"*2\r\n$3\r\nGET\r\n!bad\r\n";
        assert_eq!(parse_message(input), Err(ParseError::UnknownPrefix(b'!')));
    }

    #[test]
    fn test_nesting_depth_limit() {
        let input = "*1\r\n".repeat(MAX_NESTING_DEPTH + 2) + ":1\r\n";
        assert!(matches!(
            parse_message(input.as_bytes()),
            Err(ParseError::ProtocolError(_))
        ));
    }

    #[test]
    fn test_parser_reusable_after_incomplete() {
        let mut parser = RespParser::new();
        assert!(parser.parse(b"*1\r\n*1\r\n").unwrap().is_none());
        let (value, _) = parser.parse(b":5\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Integer(5));
    }

    #[test]
    fn test_unknown_prefix() {
        assert_eq!(
            parse_message(b"@invalid\r\n"),
            Err(ParseError::UnknownPrefix(b'@'))
        );
    }

    #[test]
    fn test_roundtrip_scalars() {
        let values = [
            RespValue::simple_string("OK"),
            RespValue::error("ERR boom"),
            RespValue::integer(-17),
            RespValue::bulk_string(Bytes::from_static(b"\x00\xffbin")),
            RespValue::bulk_string(Bytes::new()),
            RespValue::null(),
        ];
        for original in values {
            let serialized = original.serialize().unwrap();
            let (parsed, consumed) = parse_message(&serialized).unwrap().unwrap();
            assert_eq!(parsed, original);
            assert_eq!(consumed, serialized.len());
        }
    }

    #[test]
    fn test_parse_set_command() {
        let input = b"*3\r\n$3\r\nSET\r\n$8\r\nuser:101\r\n$3\r\nAda\r\n";
        let (value, _) = parse_message(input).unwrap().unwrap();
        assert_eq!(
            value,
            RespValue::Array(vec![
                RespValue::bulk_string(Bytes::from("SET")),
                RespValue::bulk_string(Bytes::from("user:101")),
                RespValue::bulk_string(Bytes::from("Ada")),
            ])
        );
    }
}
