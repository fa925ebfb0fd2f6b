//! Usage errors reported back to clients.
//!
//! The `Display` text of each variant is exactly the error line sent on the
//! wire (without the `-` prefix).

use crate::protocol::RespValue;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The request was not a non-empty array with a bulk string name
    #[error("ERR protocol error: {0}")]
    Protocol(String),

    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    /// An argument was not a non-null bulk string
    #[error("ERR invalid argument type for '{0}' command")]
    InvalidArgument(&'static str),

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpireTime(&'static str),

    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,
}

impl From<CommandError> for RespValue {
    fn from(err: CommandError) -> Self {
        RespValue::Error(err.to_string())
    }
}
