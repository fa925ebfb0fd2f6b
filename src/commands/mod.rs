//! Command Handler Module
//!
//! This module implements the command processing layer.
//! It receives decoded requests, executes them against the storage engine,
//! and returns the reply to send.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  RESP Codec     │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Validate     │
//! │  - Dispatch     │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StorageEngine   │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `PING`, `ECHO`
//! - `SET`, `GET`, `DEL`
//! - `EXPIRE`, `TTL`

pub mod error;
pub mod handler;

pub use error::CommandError;
pub use handler::CommandHandler;
