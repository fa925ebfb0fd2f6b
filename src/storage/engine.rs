//! Thread-Safe Storage Engine with Expiry Support
//!
//! This module implements the key-value store behind the server.
//!
//! ## Design Decisions
//!
//! 1. **One Lock**: The whole map sits behind a single `RwLock`. Readers
//!    (`get`, `ttl`) share it; writers (`set`, `delete_many`, `expire`, the
//!    sweeper) take it exclusively.
//! 2. **Absolute Expiry**: Each entry stores its expiry as Unix
//!    milliseconds, `0` meaning "never".
//! 3. **Lazy Expiry**: Reads treat an expired entry as missing but leave it
//!    in the map. Only the sweeper (see [`super::expiry`]) removes it.
//! 4. **Presence-Only Writes**: `delete_many` and `expire` look at whether the
//!    key is physically in the map and ignore its expiry. An
//!    expired-but-unswept key is still counted by `DEL` and revived by
//!    `EXPIRE`.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │            StorageEngine             │
//! │  ┌────────────────────────────────┐  │
//! │  │ RwLock<HashMap<Bytes, Entry>>  │  │
//! │  └────────────────────────────────┘  │
//! │  clock: Arc<dyn Clock>               │
//! └──────────────────────────────────────┘
//! ```
//!
//! Lock guards never live across an `.await`; every method is synchronous.

use crate::storage::clock::{Clock, SystemClock};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Expiry value meaning "never expires".
pub const NO_EXPIRY: i64 = 0;

/// Represents a stored value with its expiry time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The actual value stored
    pub value: Bytes,
    /// Absolute expiry in Unix milliseconds, [`NO_EXPIRY`] for none
    pub expires_at: i64,
}

impl Entry {
    pub fn new(value: Bytes, expires_at: i64) -> Self {
        Self { value, expires_at }
    }

    /// Checks if this entry has expired as of `now_ms`.
    #[inline]
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at != NO_EXPIRY && now_ms >= self.expires_at
    }
}

/// Result of a TTL query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlStatus {
    /// The key is missing or has expired
    NotFound,
    /// The key exists without an expiry
    NoExpiry,
    /// Whole seconds left before the key expires
    Seconds(u64),
}

impl TtlStatus {
    /// The integer sent back for `TTL`: `-2`, `-1` or the seconds left.
    pub fn as_reply(self) -> i64 {
        match self {
            TtlStatus::NotFound => -2,
            TtlStatus::NoExpiry => -1,
            TtlStatus::Seconds(secs) => secs as i64,
        }
    }
}

/// The storage engine.
///
/// Wrap it in an `Arc` and hand a clone to every connection and to the
/// sweeper. All operations are thread-safe.
///
/// # Example
///
/// ```
/// use redlite::storage::StorageEngine;
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let engine = StorageEngine::new();
///
/// engine.set(Bytes::from("name"), Bytes::from("Ada"));
/// assert_eq!(engine.get(b"name"), Some(Bytes::from("Ada")));
///
/// engine.set_with_ttl(Bytes::from("session"), Bytes::from("abc123"), Duration::from_secs(60));
/// ```
#[derive(Debug)]
pub struct StorageEngine {
    data: RwLock<HashMap<Bytes, Entry>>,
    clock: Arc<dyn Clock>,
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates a new storage engine on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a new storage engine reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            clock,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Bytes, Entry>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Bytes, Entry>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Sets a key-value pair without expiry, replacing any existing entry.
    pub fn set(&self, key: Bytes, value: Bytes) {
        self.write().insert(key, Entry::new(value, NO_EXPIRY));
    }

    /// Sets a key-value pair that expires after `ttl`.
    ///
    /// A `ttl` shorter than one millisecond means no expiry.
    pub fn set_with_ttl(&self, key: Bytes, value: Bytes, ttl: Duration) {
        let ttl_ms = duration_ms(ttl);
        let expires_at = if ttl_ms > 0 {
            self.now_ms().saturating_add(ttl_ms)
        } else {
            NO_EXPIRY
        };
        self.write().insert(key, Entry::new(value, expires_at));
    }

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired. Expired
    /// entries are left in place for the sweeper.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.get_entry(key).map(|entry| entry.value)
    }

    /// Gets the full entry for a key, with the same expiry rules as [`get`](Self::get).
    pub fn get_entry(&self, key: &[u8]) -> Option<Entry> {
        let now = self.now_ms();
        let data = self.read();
        data.get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .cloned()
    }

    /// Deletes keys under one lock, whether expired or not.
    ///
    /// Returns the number of keys that were physically removed.
    pub fn delete_many(&self, keys: &[Bytes]) -> u64 {
        let mut data = self.write();
        let mut deleted = 0;
        for key in keys {
            if data.remove(&key[..]).is_some() {
                deleted += 1;
            }
        }
        deleted
    }

    /// Sets the expiry of an existing key to `now + ttl`.
    ///
    /// Returns `false` without creating anything if the key is not in the
    /// map. The expiry of the stored entry is not checked first.
    pub fn expire(&self, key: &[u8], ttl: Duration) -> bool {
        let expires_at = self.now_ms().saturating_add(duration_ms(ttl)).max(1);
        match self.write().get_mut(key) {
            Some(entry) => {
                entry.expires_at = expires_at;
                true
            }
            None => false,
        }
    }

    /// Returns the remaining time to live of a key.
    pub fn ttl(&self, key: &[u8]) -> TtlStatus {
        let now = self.now_ms();
        let data = self.read();
        match data.get(key) {
            None => TtlStatus::NotFound,
            Some(entry) if entry.expires_at == NO_EXPIRY => TtlStatus::NoExpiry,
            Some(entry) => {
                let remaining = entry.expires_at - now;
                if remaining <= 0 {
                    TtlStatus::NotFound
                } else {
                    TtlStatus::Seconds((remaining / 1000) as u64)
                }
            }
        }
    }

    /// Removes every expired entry in one pass under the write lock.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.now_ms();
        let mut data = self.write();
        let before = data.len();
        data.retain(|_, entry| !entry.is_expired_at(now));
        before - data.len()
    }

    /// Number of entries in the map, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
