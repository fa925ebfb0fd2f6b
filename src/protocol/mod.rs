//! RESP Protocol Implementation
//!
//! This module implements the wire format spoken by the server.
//!
//! ## Modules
//!
//! - `types`: The `RespValue` enum and serialization
//! - `parser`: Incremental parser over a byte buffer
//! - `codec`: Reads and writes whole values on an async stream
//!
//! ## Example
//!
//! ```
//! use redlite::protocol::{parse_message, RespValue};
//! use bytes::Bytes;
//!
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (value, consumed) = parse_message(data).unwrap().unwrap();
//! assert_eq!(consumed, data.len());
//!
//! let response = RespValue::bulk_string(Bytes::from("Ada"));
//! assert_eq!(response.serialize().unwrap(), b"$3\r\nAda\r\n");
//! ```

pub mod codec;
pub mod parser;
pub mod types;

pub use codec::{CodecError, RespStream};
pub use parser::{parse_message, ParseError, ParseResult, RespParser};
pub use types::{EncodeError, RespValue};
