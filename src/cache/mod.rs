//! In-memory cache map: the request-path source of truth for reads.
//!
//! Mirrors `ssplus-cache-me`'s `cache.cpp`: a single shared map guarded by
//! one reader-preferring lock, entries distinguishing "no expiry", "known
//! absent sentinel", and "expires at timestamp" via the `expires_at` field.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Sentinel `expires_at` recorded when a backing-store probe found nothing,
/// so repeated reads of the same missing key don't re-probe the store.
pub const SENTINEL_EXPIRES_AT: u64 = 1;

/// A single cache entry as held in the `CacheMap`.
///
/// `expires_at` is overloaded: `0` means "lives until deleted", `1` means
/// "known-absent sentinel", anything greater is an absolute millisecond
/// deadline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entry {
    pub value: String,
    pub expires_at: u64,
}

impl Entry {
    pub fn new(value: impl Into<String>, expires_at: u64) -> Self {
        Entry {
            value: value.into(),
            expires_at,
        }
    }

    /// The sentinel entry recorded for a confirmed-absent key.
    pub fn sentinel() -> Self {
        Entry {
            value: String::new(),
            expires_at: SENTINEL_EXPIRES_AT,
        }
    }

    /// `true` iff this is the zero-value entry returned for an unmapped key.
    pub fn empty(&self) -> bool {
        self.value.is_empty() && self.expires_at == 0
    }

    /// `true` iff this entry (sentinel or real) represents a recorded probe
    /// result rather than "never looked up".
    pub fn cached(&self) -> bool {
        self.expires_at != 0 || !self.value.is_empty()
    }

    /// `true` iff `expires_at` names a real deadline that has passed.
    pub fn expired(&self, now: u64) -> bool {
        self.expires_at > SENTINEL_EXPIRES_AT && self.expires_at <= now
    }

    /// `true` iff this entry is the known-absent sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.expires_at == SENTINEL_EXPIRES_AT
    }

    /// The `expires_at` value as it should be reported to external callers:
    /// the internal sentinel value `1` never leaves the process.
    pub fn external_expires_at(&self) -> u64 {
        if self.expires_at == SENTINEL_EXPIRES_AT {
            0
        } else {
            self.expires_at
        }
    }
}

/// Shared, thread-safe map from cache key to `Entry`.
#[derive(Clone)]
pub struct CacheMap {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
}

impl Default for CacheMap {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheMap {
    pub fn new() -> Self {
        CacheMap {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the entry for `key`, or the empty entry if unmapped.
    pub fn get(&self, key: &str) -> Entry {
        let guard = self.inner.read().expect("cache map lock poisoned");
        guard.get(key).cloned().unwrap_or_default()
    }

    /// Inserts or overwrites the entry for `key`. Returns the previously
    /// stored entry, if any.
    pub fn set(&self, key: impl Into<String>, entry: Entry) -> Option<Entry> {
        let mut guard = self.inner.write().expect("cache map lock poisoned");
        guard.insert(key.into(), entry)
    }

    /// Removes the mapping for `key`. Returns 1 if a mapping existed, 0
    /// otherwise.
    pub fn delete(&self, key: &str) -> usize {
        let mut guard = self.inner.write().expect("cache map lock poisoned");
        guard.remove(key).is_some() as usize
    }

    /// Number of entries currently held (used by tests and diagnostics).
    pub fn len(&self) -> usize {
        self.inner.read().expect("cache map lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
