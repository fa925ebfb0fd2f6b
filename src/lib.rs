//! # redlite - A Small In-Memory Key-Value Server
//!
//! redlite speaks the RESP wire protocol, so `redis-cli` and most Redis
//! client libraries can talk to it. It supports a deliberately small
//! command set over plain binary-safe string values, with per-key expiry.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              redlite                                │
//! │                                                                     │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐              │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │              │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │              │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘              │
//! │                            │                  │                     │
//! │                            ▼                  ▼                     │
//! │                     ┌─────────────┐    ┌──────────────────────┐     │
//! │                     │ RespStream  │    │    StorageEngine     │     │
//! │                     │ (RESP codec)│    │ RwLock<HashMap<..>>  │     │
//! │                     └─────────────┘    └──────────────────────┘     │
//! │                                               ▲                     │
//! │                                               │                     │
//! │                                    ┌──────────┴──────────┐          │
//! │                                    │   ExpirySweeper     │          │
//! │                                    │ (Background task)   │          │
//! │                                    └─────────────────────┘          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use redlite::storage::{ExpiryConfig, ExpirySweeper, StorageEngine};
//! use redlite::commands::CommandHandler;
//! use redlite::connection::handle_connection;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = Arc::new(StorageEngine::new());
//!     let _sweeper = ExpirySweeper::start(Arc::clone(&storage), ExpiryConfig::default());
//!
//!     let listener = TcpListener::bind("127.0.0.1:6379").await.unwrap();
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         let handler = CommandHandler::new(Arc::clone(&storage));
//!         tokio::spawn(handle_connection(stream, addr, handler));
//!     }
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING [message]`
//! - `ECHO message`
//! - `SET key value [EX seconds | PX milliseconds]`
//! - `GET key`
//! - `DEL key [key ...]`
//! - `EXPIRE key seconds`
//! - `TTL key`
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP value model, parser and stream codec
//! - [`storage`]: The shared store, its clock and the expiry sweeper
//! - [`commands`]: Command dispatch and client-facing errors
//! - [`connection`]: Per-client read/execute/reply loop
//! - [`config`]: Command-line configuration
//!
//! ## Lazy + Active Expiry
//!
//! Keys with a TTL are expired in two ways:
//! 1. **Lazy**: reads treat an expired entry as absent
//! 2. **Active**: a background task periodically removes expired entries
//!
//! `DEL` and `EXPIRE` only look at presence in the map, so a key that has
//! expired but not yet been swept still counts for them.

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod storage;

pub use commands::CommandHandler;
pub use config::Config;
pub use connection::handle_connection;
pub use protocol::{ParseError, RespStream, RespValue};
pub use storage::{ExpiryConfig, ExpirySweeper, StorageEngine};

/// The default port (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host
pub const DEFAULT_HOST: &str = "127.0.0.1";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
