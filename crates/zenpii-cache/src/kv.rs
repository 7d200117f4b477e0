//! Key-value store wrapper with automatic serialization.

use crate::CacheError;
use once_cell::sync::Lazy;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

struct Entry {
    bytes: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

type Store = Arc<RwLock<HashMap<String, Entry>>>;

static STORES: Lazy<Mutex<HashMap<String, Store>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn poisoned<E>(_: E) -> CacheError {
    CacheError::StoreError("store lock poisoned".to_string())
}

/// Type-safe cache over an in-process key-value store.
///
/// Provides automatic JSON serialization for any type that implements
/// `Serialize` and `DeserializeOwned`. Cloning a `Cache` yields another
/// handle to the same store.
#[derive(Clone)]
pub struct Cache {
    name: String,
    store: Store,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").field("name", &self.name).finish()
    }
}

impl Cache {
    /// Open a named store. Handles with the same name share data.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let cache = Cache::open("checkout");
    /// ```
    pub fn open(name: &str) -> Self {
        let mut stores = match STORES.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let store = stores.entry(name.to_string()).or_default().clone();
        Self {
            name: name.to_string(),
            store,
        }
    }

    /// A private store not shared with any other handle. Used by tests.
    pub fn isolated() -> Self {
        Self {
            name: "isolated".to_string(),
            store: Store::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a value from the cache.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let pending: Option<PendingRedirect> = cache.get("pending:sess_abc")?;
    /// ```
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get_raw(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Set a value with no expiry.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.put(key, serde_json::to_vec(value)?, None)
    }

    /// Set a value that expires after `ttl`.
    pub fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.put(key, serde_json::to_vec(value)?, Some(Instant::now() + ttl))
    }

    /// Write `value` only if the stored value still serializes to `expected`.
    ///
    /// `expected = None` means the key must be absent. Returns whether the
    /// write happened. Any existing expiry is kept.
    pub fn compare_and_swap<T: Serialize>(
        &self,
        key: &str,
        expected: Option<&T>,
        value: &T,
    ) -> Result<bool, CacheError> {
        let expected = expected.map(serde_json::to_vec).transpose()?;
        let bytes = serde_json::to_vec(value)?;
        let now = Instant::now();

        let mut store = self.store.write().map_err(poisoned)?;
        let current = store.get(key).filter(|e| e.is_live(now));
        let expires_at = current.and_then(|e| e.expires_at);
        let matches = match (current, &expected) {
            (Some(entry), Some(expected)) => &entry.bytes == expected,
            (None, None) => true,
            _ => false,
        };
        if matches {
            store.insert(key.to_string(), Entry { bytes, expires_at });
        }
        Ok(matches)
    }

    /// Delete a value from the cache.
    pub fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.write().map_err(poisoned)?.remove(key);
        Ok(())
    }

    /// Check if a live key exists in the cache.
    pub fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get_raw(key)?.is_some())
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Instant::now();
        let mut store = self.store.write().map_err(poisoned)?;
        let before = store.len();
        store.retain(|_, e| e.is_live(now));
        let removed = before - store.len();
        if removed > 0 {
            tracing::debug!(store = %self.name, removed, "purged expired cache entries");
        }
        Ok(removed)
    }

    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let store = self.store.read().map_err(poisoned)?;
        Ok(store
            .get(key)
            .filter(|e| e.is_live(Instant::now()))
            .map(|e| e.bytes.clone()))
    }

    fn put(&self, key: &str, bytes: Vec<u8>, expires_at: Option<Instant>) -> Result<(), CacheError> {
        self.store
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), Entry { bytes, expires_at });
        Ok(())
    }
}

/// Helper to build cache keys with namespacing.
///
/// # Example
///
/// ```rust,ignore
/// let key = cache_key!("pending", correlation_id);
/// // Returns "pending:sess_abc"
/// ```
#[macro_export]
macro_rules! cache_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}
