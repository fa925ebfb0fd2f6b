//! RESP Data Types
//!
//! This module defines the values exchanged on the wire.
//!
//! ## Protocol Format
//!
//! Each value starts with a type prefix byte:
//! - `+` Simple String
//! - `-` Error
//! - `:` Integer
//! - `$` Bulk String
//! - `*` Array
//!
//! All lines are terminated with CRLF (`\r\n`).
//!
//! ## Examples
//!
//! Simple String: `+OK\r\n`
//! Error: `-ERR unknown command\r\n`
//! Integer: `:1000\r\n`
//! Bulk String: `$5\r\nhello\r\n`
//! Null Bulk String: `$-1\r\n`
//! Array: `*2\r\n$3\r\nGET\r\n$4\r\nname\r\n`

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use thiserror::Error;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// Errors raised while serializing a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Replies are composed of flat scalars only
    #[error("nested arrays cannot be encoded")]
    NestedArray,
}

/// Represents a value in the RESP protocol.
///
/// Used both for decoded requests and for outgoing replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Non-binary-safe status line. Format: `+<string>\r\n`
    SimpleString(String),

    /// Error line. Format: `-<error message>\r\n`
    Error(String),

    /// 64-bit signed integer. Format: `:<integer>\r\n`
    Integer(i64),

    /// Binary-safe string. Format: `$<length>\r\n<data>\r\n`
    ///
    /// `None` is the null bulk string `$-1\r\n`, which is a different
    /// wire state from the empty string `$0\r\n\r\n`.
    BulkString(Option<Bytes>),

    /// Ordered sequence of values. Format: `*<count>\r\n<element1>...`
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Creates a new simple string response.
    ///
    /// # Example
    /// ```
    /// use redlite::protocol::types::RespValue;
    /// let ok = RespValue::simple_string("OK");
    /// ```
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Creates a new error response.
    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    /// Creates a new bulk string response.
    ///
    /// # Example
    /// ```
    /// use redlite::protocol::types::RespValue;
    /// use bytes::Bytes;
    /// let bulk = RespValue::bulk_string(Bytes::from("hello"));
    /// assert_eq!(bulk.serialize().unwrap(), b"$5\r\nhello\r\n");
    /// ```
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(Some(data.into()))
    }

    /// Creates the null bulk string.
    pub fn null() -> Self {
        RespValue::BulkString(None)
    }

    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    /// Common response for successful operations
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    /// Common response for PING
    pub fn pong() -> Self {
        RespValue::SimpleString("PONG".to_string())
    }

    /// Serializes the value to bytes for sending over the wire.
    pub fn serialize(&self) -> Result<Vec<u8>, EncodeError> {
        let mut buf = BytesMut::new();
        self.serialize_into(&mut buf)?;
        Ok(buf.to_vec())
    }

    /// Serializes the value into an existing buffer.
    ///
    /// Array elements must be scalars. On error nothing is written.
    pub fn serialize_into(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        match self {
            RespValue::Array(values) => {
                if values.iter().any(|v| matches!(v, RespValue::Array(_))) {
                    return Err(EncodeError::NestedArray);
                }
                write_header(buf, prefix::ARRAY, values.len() as i64);
                for value in values {
                    value.serialize_scalar(buf)?;
                }
                Ok(())
            }
            scalar => scalar.serialize_scalar(buf),
        }
    }

    fn serialize_scalar(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        match self {
            RespValue::SimpleString(s) => write_simple_string(buf, s),
            RespValue::Error(s) => write_error(buf, s),
            RespValue::Integer(n) => write_integer(buf, *n),
            RespValue::BulkString(data) => write_bulk(buf, data.as_deref()),
            RespValue::Array(_) => return Err(EncodeError::NestedArray),
        }
        Ok(())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Attempts to extract the inner bytes of a non-null bulk string.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            RespValue::BulkString(Some(b)) => Some(b),
            _ => None,
        }
    }

    /// Consumes self and returns the inner array if this is an Array variant.
    pub fn into_array(self) -> Option<Vec<RespValue>> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }
}

/// Writes `+<s>\r\n`.
pub fn write_simple_string(buf: &mut BytesMut, s: &str) {
    buf.put_u8(prefix::SIMPLE_STRING);
    buf.extend_from_slice(s.as_bytes());
    buf.extend_from_slice(CRLF);
}

/// Writes `-<s>\r\n`.
pub fn write_error(buf: &mut BytesMut, s: &str) {
    buf.put_u8(prefix::ERROR);
    buf.extend_from_slice(s.as_bytes());
    buf.extend_from_slice(CRLF);
}

/// Writes `:<n>\r\n`.
pub fn write_integer(buf: &mut BytesMut, n: i64) {
    write_header(buf, prefix::INTEGER, n);
}

/// Writes a bulk string, or `$-1\r\n` for `None`.
pub fn write_bulk(buf: &mut BytesMut, data: Option<&[u8]>) {
    match data {
        Some(data) => {
            write_header(buf, prefix::BULK_STRING, data.len() as i64);
            buf.extend_from_slice(data);
            buf.extend_from_slice(CRLF);
        }
        None => write_header(buf, prefix::BULK_STRING, -1),
    }
}

fn write_header(buf: &mut BytesMut, prefix: u8, n: i64) {
    buf.put_u8(prefix);
    buf.extend_from_slice(n.to_string().as_bytes());
    buf.extend_from_slice(CRLF);
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "\"{}\"", s),
            RespValue::Error(s) => write!(f, "(error) {}", s),
            RespValue::Integer(n) => write!(f, "(integer) {}", n),
            RespValue::BulkString(Some(data)) => {
                if let Ok(s) = std::str::from_utf8(data) {
                    write!(f, "\"{}\"", s)
                } else {
                    write!(f, "(binary data, {} bytes)", data.len())
                }
            }
            RespValue::BulkString(None) => write!(f, "(nil)"),
            RespValue::Array(values) => {
                if values.is_empty() {
                    write!(f, "(empty array)")
                } else {
                    writeln!(f)?;
                    for (i, v) in values.iter().enumerate() {
                        writeln!(f, "{}) {}", i + 1, v)?;
                    }
                    Ok(())
                }
            }
        }
    }
}
