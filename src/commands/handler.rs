//! Command Handler
//!
//! Turns one decoded request into one reply.
//!
//! ## Supported Commands
//!
//! - `PING [message]` - Test connection
//! - `ECHO message` - Echo message
//! - `SET key value [EX seconds | PX milliseconds]` - Set a key
//! - `GET key` - Get a key's value
//! - `DEL key [key ...]` - Delete keys
//! - `EXPIRE key seconds` - Set expiry on an existing key
//! - `TTL key` - Get remaining TTL in seconds
//!
//! Every handler validates its own arguments and answers with an error
//! reply instead of failing the connection.

use crate::commands::error::CommandError;
use crate::protocol::RespValue;
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

type CommandResult = Result<RespValue, CommandError>;

/// Handles commands by dispatching them to the storage engine.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    /// Creates a new command handler with the given storage engine.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Executes a command and returns the reply.
    ///
    /// `command` should be an array of bulk strings: the command name
    /// followed by its arguments. Anything else yields an error reply.
    pub fn execute(&self, command: RespValue) -> RespValue {
        self.try_execute(command).unwrap_or_else(RespValue::from)
    }

    fn try_execute(&self, command: RespValue) -> CommandResult {
        let args = command
            .into_array()
            .ok_or_else(|| CommandError::Protocol("expected an array".to_string()))?;

        let (name, args) = args
            .split_first()
            .ok_or_else(|| CommandError::Protocol("empty command".to_string()))?;

        let cmd_name = match name {
            RespValue::BulkString(Some(name)) => String::from_utf8_lossy(name).to_uppercase(),
            _ => {
                return Err(CommandError::Protocol(
                    "command name must be a bulk string".to_string(),
                ))
            }
        };

        self.dispatch(&cmd_name, args)
    }

    fn dispatch(&self, cmd: &str, args: &[RespValue]) -> CommandResult {
        match cmd {
            "PING" => self.cmd_ping(args),
            "ECHO" => self.cmd_echo(args),
            "SET" => self.cmd_set(args),
            "GET" => self.cmd_get(args),
            "DEL" => self.cmd_del(args),
            "EXPIRE" => self.cmd_expire(args),
            "TTL" => self.cmd_ttl(args),
            _ => Err(CommandError::UnknownCommand(cmd.to_string())),
        }
    }

    // ========================================================================
    // Server commands
    // ========================================================================

    fn cmd_ping(&self, args: &[RespValue]) -> CommandResult {
        match args {
            [] => Ok(RespValue::pong()),
            [msg] => Ok(RespValue::bulk_string(bulk("ping", msg)?.clone())),
            _ => Err(CommandError::WrongArity("ping")),
        }
    }

    fn cmd_echo(&self, args: &[RespValue]) -> CommandResult {
        match args {
            [msg] => Ok(RespValue::bulk_string(bulk("echo", msg)?.clone())),
            _ => Err(CommandError::WrongArity("echo")),
        }
    }

    // ========================================================================
    // String commands
    // ========================================================================

    fn cmd_set(&self, args: &[RespValue]) -> CommandResult {
        let (key, value, options) = match args {
            [key, value, options @ ..] => (bulk("set", key)?, bulk("set", value)?, options),
            _ => return Err(CommandError::WrongArity("set")),
        };

        let ttl = match options {
            [] => None,
            [opt, amount] => {
                let opt = bulk("set", opt)?;
                let to_duration: fn(u64) -> Duration = if opt.eq_ignore_ascii_case(b"EX") {
                    Duration::from_secs
                } else if opt.eq_ignore_ascii_case(b"PX") {
                    Duration::from_millis
                } else {
                    return Err(CommandError::Syntax);
                };

                let amount = parse_integer(bulk("set", amount)?)
                    .filter(|n| *n > 0)
                    .ok_or(CommandError::InvalidExpireTime("set"))?;
                Some(to_duration(amount as u64))
            }
            _ => return Err(CommandError::Syntax),
        };

        match ttl {
            Some(ttl) => self.storage.set_with_ttl(key.clone(), value.clone(), ttl),
            None => self.storage.set(key.clone(), value.clone()),
        }

        Ok(RespValue::ok())
    }

    fn cmd_get(&self, args: &[RespValue]) -> CommandResult {
        let key = match args {
            [key] => bulk("get", key)?,
            _ => return Err(CommandError::WrongArity("get")),
        };

        Ok(match self.storage.get(key) {
            Some(value) => RespValue::bulk_string(value),
            None => RespValue::null(),
        })
    }

    fn cmd_del(&self, args: &[RespValue]) -> CommandResult {
        if args.is_empty() {
            return Err(CommandError::WrongArity("del"));
        }

        let keys = args
            .iter()
            .map(|arg| bulk("del", arg).cloned())
            .collect::<Result<Vec<Bytes>, _>>()?;

        let deleted = self.storage.delete_many(&keys);
        Ok(RespValue::integer(deleted as i64))
    }

    // ========================================================================
    // Key commands
    // ========================================================================

    fn cmd_expire(&self, args: &[RespValue]) -> CommandResult {
        let (key, seconds) = match args {
            [key, seconds] => (bulk("expire", key)?, bulk("expire", seconds)?),
            _ => return Err(CommandError::WrongArity("expire")),
        };

        let seconds = parse_integer(seconds)
            .filter(|s| *s >= 0)
            .ok_or(CommandError::NotAnInteger)?;

        let updated = self
            .storage
            .expire(key, Duration::from_secs(seconds as u64));
        Ok(RespValue::integer(updated as i64))
    }

    fn cmd_ttl(&self, args: &[RespValue]) -> CommandResult {
        let key = match args {
            [key] => bulk("ttl", key)?,
            _ => return Err(CommandError::WrongArity("ttl")),
        };

        Ok(RespValue::integer(self.storage.ttl(key).as_reply()))
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Extracts the bytes of a non-null bulk string argument.
fn bulk<'a>(cmd: &'static str, value: &'a RespValue) -> Result<&'a Bytes, CommandError> {
    value.as_bytes().ok_or(CommandError::InvalidArgument(cmd))
}

/// Parses a base-10 signed integer argument.
fn parse_integer(raw: &[u8]) -> Option<i64> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}
