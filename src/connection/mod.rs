//! Connection Handler Module
//!
//! Each accepted client gets its own async task running a
//! [`ConnectionHandler`]. All tasks share one storage engine through their
//! [`CommandHandler`](crate::commands::CommandHandler).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (main.rs)                                │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept() + spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ RespStream  │───>│ Execute cmd │───>│ RespStream  │      │
//! │  │ read_value  │    │             │    │ write+flush │      │
//! │  └─────────────┘    └─────────────┘    └─────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Requests on one connection are answered strictly in order.
//! Several requests may arrive in a single TCP segment.
//!
//! ## Example
//!
//! ```ignore
//! use redlite::connection::handle_connection;
//! use redlite::commands::CommandHandler;
//! use redlite::storage::StorageEngine;
//! use std::sync::Arc;
//!
//! let storage = Arc::new(StorageEngine::new());
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! let handler = CommandHandler::new(Arc::clone(&storage));
//! tokio::spawn(handle_connection(stream, addr, handler));
//! ```

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler};
