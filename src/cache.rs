//! Raw response cache keyed by canonical query.
//!
//! The cache is a speed-of-first-paint optimization, not a source of truth:
//! an engine reads it once at construction to publish something before the
//! first network round lands, and every live response overwrites the entry
//! for its window. Entries carry no TTL.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Mutex;
use std::time::SystemTime;

use crate::error::CacheError;

/// Key/value store mapping a canonical query to the last raw response body
/// for that exact page window.
pub trait ResponseCache: Debug + Send + Sync {
    /// Latest bytes for a key, if any. Staleness is acceptable by design.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store the latest bytes for a key, overwriting any prior entry.
    /// A concurrent read sees either the old or the fully new value.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), CacheError>;
}

/// Unbounded in-memory cache.
///
/// No eviction: acceptable because the query-space one app session visits
/// is small.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

#[derive(Debug)]
struct CacheEntry {
    bytes: Vec<u8>,
    written_at: SystemTime,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache state poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// When the entry for `key` was last written.
    pub fn written_at(&self, key: &str) -> Option<SystemTime> {
        self.entries
            .lock()
            .expect("cache state poisoned")
            .get(key)
            .map(|entry| entry.written_at)
    }
}

impl ResponseCache for MemoryCache {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let entries = self.entries.lock().expect("cache state poisoned");
        Ok(entries.get(key).map(|entry| entry.bytes.clone()))
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().expect("cache state poisoned");
        entries.insert(
            key.to_string(),
            CacheEntry {
                bytes: bytes.to_vec(),
                written_at: SystemTime::now(),
            },
        );
        Ok(())
    }
}
