//! Connection Handler Module
//!
//! This module handles individual client connections.
//! Each client gets its own task that runs in a loop,
//! reading commands and sending replies.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Reading                 │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Decode one value        │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Execute command         │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Encode reply + flush    │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Closed: client disconnects or I/O error, no reply
//! ```
//!
//! Malformed input does not close the connection: the client gets an
//! `ERR protocol error` reply and the loop goes back to reading.

use crate::commands::{CommandError, CommandHandler};
use crate::protocol::{CodecError, RespStream, RespValue};
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, trace, warn};

/// Handles a single client connection.
pub struct ConnectionHandler<S> {
    stream: RespStream<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// The command handler (shares the storage engine)
    command_handler: CommandHandler,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, addr: SocketAddr, command_handler: CommandHandler) -> Self {
        Self {
            stream: RespStream::new(stream),
            addr,
            command_handler,
        }
    }

    /// Runs the connection loop until the client goes away.
    ///
    /// Returns `Ok(())` when the client closed the stream between two
    /// commands, and an error for any other transport failure.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(ConnectionError::Codec(CodecError::Io(io_err)))
                if io_err.kind() == io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            let reply = match self.stream.read_value().await {
                Ok(command) => {
                    trace!(client = %self.addr, "Executing command");
                    let reply = self.command_handler.execute(command);
                    if reply.is_error() {
                        debug!(client = %self.addr, reply = %reply, "Command rejected");
                    }
                    reply
                }
                Err(CodecError::Closed) => return Ok(()),
                Err(CodecError::Protocol(e)) => {
                    warn!(client = %self.addr, error = %e, "Protocol error");
                    RespValue::from(CommandError::Protocol(e.to_string()))
                }
                Err(e) => return Err(e.into()),
            };

            self.send_response(&reply).await?;
        }
    }

    async fn send_response(&mut self, response: &RespValue) -> Result<(), ConnectionError> {
        self.stream.write_value(response).await?;
        self.stream.flush().await?;
        Ok(())
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Transport failure or a reply that could not be encoded
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Handles a client connection to completion.
///
/// Transport errors are logged, never propagated: one client cannot take
/// the server down.
pub async fn handle_connection<S>(stream: S, addr: SocketAddr, command_handler: CommandHandler)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler);
    if let Err(e) = handler.run().await {
        debug!(client = %addr, error = %e, "Connection ended with error");
    }
}
