//! Stream-level RESP Codec
//!
//! [`RespStream`] wraps any async byte stream and exposes "read one value"
//! and "write one value" on top of the incremental [`RespParser`].
//!
//! ## Buffer Management
//!
//! TCP is a stream protocol: a read may return half a command, or two
//! commands at once. Incoming bytes accumulate in a `BytesMut` buffer and
//! the parser is retried after every read until a full value is available.
//! Outgoing bytes go through a `BufWriter` and only hit the socket on
//! [`RespStream::flush`].

use crate::protocol::parser::{find_crlf, ParseError, RespParser};
use crate::protocol::types::{self, EncodeError, RespValue, CRLF};
use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::trace;

/// Initial read buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Errors produced by [`RespStream`].
///
/// `Closed`, `UnexpectedEof` and `Io` are transport errors: the peer is
/// gone or the socket is broken. `Protocol` means the bytes were
/// malformed but the stream itself is still usable.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The peer closed the stream between two values
    #[error("stream closed")]
    Closed,

    /// The peer closed the stream in the middle of a value
    #[error("unexpected end of stream")]
    UnexpectedEof,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input
    #[error("protocol error: {0}")]
    Protocol(#[from] ParseError),

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
}

impl CodecError {
    /// Returns true if the connection cannot be used any more.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CodecError::Closed | CodecError::UnexpectedEof | CodecError::Io(_)
        )
    }
}

/// A RESP value reader/writer over an async byte stream.
#[derive(Debug)]
pub struct RespStream<S> {
    stream: BufWriter<S>,

    /// Bytes read from the stream but not yet decoded
    buffer: BytesMut,

    /// Scratch space for encoding replies
    out: BytesMut,

    parser: RespParser,

    /// Set after a protocol error in the middle of a line: input is
    /// dropped up to and including the next CRLF.
    discarding: bool,
}

impl<S> RespStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            out: BytesMut::new(),
            parser: RespParser::new(),
            discarding: false,
        }
    }

    /// Decodes exactly one value from the stream.
    ///
    /// On a protocol error the buffered input is discarded along with the
    /// rest of the offending line, so the next call starts at a fresh line
    /// from the peer.
    pub async fn read_value(&mut self) -> Result<RespValue, CodecError> {
        loop {
            if let Some(value) = self.try_parse()? {
                return Ok(value);
            }
            self.read_more_data().await?;
        }
    }

    fn try_parse(&mut self) -> Result<Option<RespValue>, CodecError> {
        if self.discarding && !self.skip_to_line_end() {
            return Ok(None);
        }

        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.parser.parse(&self.buffer) {
            Ok(Some((value, consumed))) => {
                self.buffer.advance(consumed);
                trace!(
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Parsed value"
                );
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.discarding = !self.buffer.ends_with(CRLF);
                self.drop_buffered();
                Err(CodecError::Protocol(e))
            }
        }
    }

    /// Drops input through the next CRLF. Returns true once it was found.
    fn skip_to_line_end(&mut self) -> bool {
        match find_crlf(&self.buffer) {
            Some(pos) => {
                self.buffer.advance(pos + CRLF.len());
                self.discarding = false;
                true
            }
            None => {
                self.drop_buffered();
                false
            }
        }
    }

    /// Clears the read buffer, keeping a trailing `\r` that may start a
    /// CRLF split across two reads.
    fn drop_buffered(&mut self) {
        let split_crlf = self.discarding && self.buffer.last() == Some(&b'\r');
        self.buffer.clear();
        if split_crlf {
            self.buffer.put_u8(b'\r');
        }
    }

    async fn read_more_data(&mut self) -> Result<(), CodecError> {
        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            return if self.buffer.is_empty() {
                Err(CodecError::Closed)
            } else {
                Err(CodecError::UnexpectedEof)
            };
        }

        trace!(bytes = n, "Read data");
        Ok(())
    }

    /// Encodes a value into the write buffer. Call [`flush`](Self::flush)
    /// to send it.
    pub async fn write_value(&mut self, value: &RespValue) -> Result<(), CodecError> {
        self.out.clear();
        value.serialize_into(&mut self.out)?;
        self.write_out().await
    }

    pub async fn write_simple_string(&mut self, s: &str) -> Result<(), CodecError> {
        self.out.clear();
        types::write_simple_string(&mut self.out, s);
        self.write_out().await
    }

    pub async fn write_error(&mut self, s: &str) -> Result<(), CodecError> {
        self.out.clear();
        types::write_error(&mut self.out, s);
        self.write_out().await
    }

    pub async fn write_integer(&mut self, n: i64) -> Result<(), CodecError> {
        self.out.clear();
        types::write_integer(&mut self.out, n);
        self.write_out().await
    }

    /// Writes a bulk string, or the null bulk string for `None`.
    pub async fn write_bulk(&mut self, data: Option<&[u8]>) -> Result<(), CodecError> {
        self.out.clear();
        types::write_bulk(&mut self.out, data);
        self.write_out().await
    }

    async fn write_out(&mut self) -> Result<(), CodecError> {
        self.stream.write_all(&self.out).await?;
        trace!(bytes = self.out.len(), "Buffered reply");
        Ok(())
    }

    /// Flushes buffered replies to the underlying stream.
    pub async fn flush(&mut self) -> Result<(), CodecError> {
        self.stream.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parser::MAX_LINE_LENGTH;
    use bytes::Bytes;
    use std::io;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_read_value_across_partial_reads() {
        let mock = Builder::new()
            .read(b"*2\r\n$3\r\nGE")
            .read(b"T\r\n$4\r\nna")
            .read(b"me\r\n")
            .build();
        let mut stream = RespStream::new(mock);

        let value = stream.read_value().await.unwrap();
        assert_eq!(
            value,
            RespValue::array(vec![
                RespValue::bulk_string(Bytes::from("GET")),
                RespValue::bulk_string(Bytes::from("name")),
            ])
        );
        assert!(matches!(
            stream.read_value().await,
            Err(CodecError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_read_back_to_back_values() {
        let mock = Builder::new().read(b":1\r\n:2\r\n").build();
        let mut stream = RespStream::new(mock);

        assert_eq!(stream.read_value().await.unwrap(), RespValue::integer(1));
        assert_eq!(stream.read_value().await.unwrap(), RespValue::integer(2));
        assert!(matches!(
            stream.read_value().await,
            Err(CodecError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_truncated_value_is_unexpected_eof() {
        let mock = Builder::new().read(b"$5\r\nhel").build();
        let mut stream = RespStream::new(mock);

        let err = stream.read_value().await.unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedEof));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_unterminated_line_is_bounded() {
        let mut flood = vec![b'+'];
        flood.extend(std::iter::repeat(b'a').take(MAX_LINE_LENGTH + 16 * 1024));
        let mock = Builder::new()
            .read(&flood)
            .read(b"aaaa\r\n+OK\r\n")
            .build();
        let mut stream = RespStream::new(mock);

        let err = stream.read_value().await.unwrap_err();
        assert!(matches!(
            err,
            CodecError::Protocol(ParseError::MessageTooLarge { .. })
        ));
        assert!(!err.is_transport());
        assert!(stream.buffer.len() <= 1);

        // The rest of the oversized line is skipped, not reported again
        assert_eq!(stream.read_value().await.unwrap(), RespValue::ok());
    }

    #[tokio::test]
    async fn test_bad_line_split_across_reads_reported_once() {
        let mock = Builder::new()
            .read(b"hel")
            .read(b"lo\r")
            .read(b"\n:7\r\n")
            .build();
        let mut stream = RespStream::new(mock);

        let err = stream.read_value().await.unwrap_err();
        assert!(matches!(
            err,
            CodecError::Protocol(ParseError::UnknownPrefix(b'h'))
        ));
        assert_eq!(stream.read_value().await.unwrap(), RespValue::integer(7));
        assert!(matches!(
            stream.read_value().await,
            Err(CodecError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_read_error_is_transport() {
        let mock = Builder::new()
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let mut stream = RespStream::new(mock);

        let err = stream.read_value().await.unwrap_err();
        assert!(matches!(err, CodecError::Io(_)));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_protocol_error_discards_buffer() {
        let mock = Builder::new()
            .read(b"?garbage\r\n")
            .read(b"+OK\r\n")
            .build();
        let mut stream = RespStream::new(mock);

        let err = stream.read_value().await.unwrap_err();
        assert!(matches!(
            err,
            CodecError::Protocol(ParseError::UnknownPrefix(b'?'))
        ));
        assert!(!err.is_transport());

        assert_eq!(stream.read_value().await.unwrap(), RespValue::ok());
    }

    #[tokio::test]
    async fn test_write_scalars_and_flush() {
        let mock = Builder::new()
            .write(b"+PONG\r\n-ERR no\r\n:-2\r\n$3\r\nbar\r\n$-1\r\n")
            .build();
        let mut stream = RespStream::new(mock);

        stream.write_simple_string("PONG").await.unwrap();
        stream.write_error("ERR no").await.unwrap();
        stream.write_integer(-2).await.unwrap();
        stream.write_bulk(Some(&b"bar"[..])).await.unwrap();
        stream.write_bulk(None).await.unwrap();
        stream.flush().await.unwrap();
    }

    #[tokio::test]
    async fn test_write_nested_array_is_encode_error() {
        let mock = Builder::new().build();
        let mut stream = RespStream::new(mock);

        let nested = RespValue::array(vec![RespValue::array(vec![])]);
        let err = stream.write_value(&nested).await.unwrap_err();
        assert!(matches!(err, CodecError::Encode(EncodeError::NestedArray)));
        assert!(!err.is_transport());
    }
}
