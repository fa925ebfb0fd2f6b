//! Storage Engine Module
//!
//! This module provides the key-value store, its time source and the
//! background expiry sweeper.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │            StorageEngine             │
//! │   RwLock<HashMap<Bytes, Entry>>      │
//! └──────────────────────────────────────┘
//!           ▲                   ▲
//!           │                   │
//!   connection tasks   ┌────────┴────────┐
//!                      │  ExpirySweeper  │
//!                      │ (Tokio task)    │
//!                      └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use redlite::storage::{StorageEngine, TtlStatus};
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let engine = StorageEngine::new();
//!
//! engine.set(Bytes::from("name"), Bytes::from("Ada"));
//! assert_eq!(engine.get(b"name"), Some(Bytes::from("Ada")));
//!
//! engine.set_with_ttl(
//!     Bytes::from("session"),
//!     Bytes::from("token123"),
//!     Duration::from_secs(3600),
//! );
//! assert!(matches!(engine.ttl(b"session"), TtlStatus::Seconds(_)));
//! ```

pub mod clock;
pub mod engine;
pub mod expiry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Entry, StorageEngine, TtlStatus, NO_EXPIRY};
pub use expiry::{ExpiryConfig, ExpirySweeper, DEFAULT_SWEEP_INTERVAL};
