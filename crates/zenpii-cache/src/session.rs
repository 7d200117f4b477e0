//! Versioned sessions on top of the key-value store.

use crate::{Cache, CacheError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

/// Maximum retry attempts for optimistic concurrency control.
const MAX_UPDATE_RETRIES: u32 = 3;

/// A unique session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new session ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new cryptographically secure session ID.
    pub fn generate() -> Self {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        use rand::Rng;

        let bytes: [u8; 18] = rand::thread_rng().gen();
        Self(format!("sess_{}", URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Get the session ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Session data stored in the cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionData<T> {
    pub id: SessionId,
    pub data: T,
    /// Version for optimistic concurrency control.
    pub version: u64,
    /// When the session was created (Unix timestamp).
    pub created_at: u64,
    /// When the session was last written (Unix timestamp).
    pub last_accessed: u64,
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Typed, versioned records under a key prefix.
///
/// # Example
///
/// ```rust,ignore
/// use zenpii_cache::{Cache, Session, SessionId};
///
/// let pending = Session::<PendingRedirect>::new(Cache::open("checkout"), "pending");
/// let id = SessionId::generate();
/// pending.set(&id, &record)?;
///
/// let record = pending.modify(&id, |r| r.status = Status::Completed)?;
/// ```
pub struct Session<T> {
    cache: Cache,
    prefix: String,
    ttl: Option<Duration>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Clone for Session<T> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            prefix: self.prefix.clone(),
            ttl: self.ttl,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T> Session<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Create a session manager storing records as `{prefix}:{id}`.
    pub fn new(cache: Cache, prefix: impl Into<String>) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
            ttl: None,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Expire records `ttl` after their first write.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Get session data if it exists.
    pub fn get(&self, id: &SessionId) -> Result<Option<T>, CacheError> {
        Ok(self.get_versioned(id)?.map(|s| s.data))
    }

    /// Get full session data including version.
    pub fn get_versioned(&self, id: &SessionId) -> Result<Option<SessionData<T>>, CacheError> {
        self.cache.get::<SessionData<T>>(&self.session_key(id))
    }

    /// Set session data (unconditional write).
    ///
    /// On stores with a TTL, expired records are dropped first.
    pub fn set(&self, id: &SessionId, data: &T) -> Result<(), CacheError> {
        if self.ttl.is_some() {
            self.cache.purge_expired()?;
        }
        let key = self.session_key(id);
        let current = self.cache.get::<SessionData<T>>(&key)?;
        let now = unix_now();
        let session_data = SessionData {
            id: id.clone(),
            data: data.clone(),
            version: current.as_ref().map(|s| s.version + 1).unwrap_or(1),
            created_at: current.as_ref().map(|s| s.created_at).unwrap_or(now),
            last_accessed: now,
        };
        match (current.is_none(), self.ttl) {
            (true, Some(ttl)) => self.cache.set_with_ttl(&key, &session_data, ttl),
            _ => self.cache.set(&key, &session_data),
        }
    }

    /// Delete a session.
    pub fn delete(&self, id: &SessionId) -> Result<(), CacheError> {
        self.cache.delete(&self.session_key(id))
    }

    /// Check if a session exists.
    pub fn exists(&self, id: &SessionId) -> Result<bool, CacheError> {
        self.cache.exists(&self.session_key(id))
    }

    /// Modify an existing record with optimistic concurrency control.
    ///
    /// Returns `CacheError::NotFound` if the record is absent or expired.
    pub fn modify<F>(&self, id: &SessionId, f: F) -> Result<T, CacheError>
    where
        F: Fn(&mut T),
    {
        self.write_with(id, || None, |data| {
            f(data);
            true
        })?
        .ok_or_else(|| CacheError::NotFound(self.session_key(id)))
    }

    /// Modify an existing record only if `f` accepts it.
    ///
    /// `f` sees the latest stored version and returns whether to write it.
    /// Returns `Ok(None)` when `f` declined, so a guarded transition is won
    /// by exactly one caller.
    pub fn try_modify<F>(&self, id: &SessionId, f: F) -> Result<Option<T>, CacheError>
    where
        F: Fn(&mut T) -> bool,
    {
        self.write_with(id, || None, f)
    }

    /// Like [`Session::modify`], starting from `T::default()` when absent.
    pub fn update<F>(&self, id: &SessionId, f: F) -> Result<T, CacheError>
    where
        T: Default,
        F: Fn(&mut T),
    {
        self.write_with(id, || Some(T::default()), |data| {
            f(data);
            true
        })?
        .ok_or_else(|| CacheError::NotFound(self.session_key(id)))
    }

    fn write_with<S, F>(&self, id: &SessionId, seed: S, f: F) -> Result<Option<T>, CacheError>
    where
        S: Fn() -> Option<T>,
        F: Fn(&mut T) -> bool,
    {
        let key = self.session_key(id);

        for _attempt in 0..MAX_UPDATE_RETRIES {
            let current = self.cache.get::<SessionData<T>>(&key)?;
            let now = unix_now();

            let next = match &current {
                Some(existing) => {
                    let mut data = existing.data.clone();
                    if !f(&mut data) {
                        return Ok(None);
                    }
                    SessionData {
                        id: id.clone(),
                        data,
                        version: existing.version + 1,
                        created_at: existing.created_at,
                        last_accessed: now,
                    }
                }
                None => {
                    let mut data = seed().ok_or_else(|| CacheError::NotFound(key.clone()))?;
                    if !f(&mut data) {
                        return Ok(None);
                    }
                    SessionData {
                        id: id.clone(),
                        data,
                        version: 1,
                        created_at: now,
                        last_accessed: now,
                    }
                }
            };

            if self.cache.compare_and_swap(&key, current.as_ref(), &next)? {
                if let (None, Some(ttl)) = (&current, self.ttl) {
                    self.cache.set_with_ttl(&key, &next, ttl)?;
                }
                return Ok(Some(next.data));
            }
            tracing::debug!(key = %key, "session changed underneath update, retrying");
        }

        Err(CacheError::ConcurrentModification(
            "max retries exceeded".to_string(),
        ))
    }

    fn session_key(&self, id: &SessionId) -> String {
        crate::cache_key!(self.prefix.as_str(), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        hits: u32,
    }

    fn session() -> Session<Counter> {
        Session::new(Cache::isolated(), "counter")
    }

    #[test]
    fn test_session_id_new() {
        let id = SessionId::new("abc123");
        assert_eq!(id.as_str(), "abc123");
    }

    #[test]
    fn test_session_id_display() {
        let id = SessionId::new("display-test");
        assert_eq!(format!("{}", id), "display-test");
    }

    #[test]
    fn test_session_id_generate_format() {
        let id = SessionId::generate();
        let s = id.as_str();

        assert!(s.starts_with("sess_"));
        // 18 bytes base64 = 24 chars, plus "sess_"
        assert_eq!(s.len(), 29);
    }

    #[test]
    fn test_session_id_generate_uniqueness() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn test_session_id_serialization() {
        let id = SessionId::new("serialize-me");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""serialize-me""#);
        let deserialized: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, id);
    }

    #[test]
    fn test_set_bumps_version() {
        let s = session();
        let id = SessionId::new("a");
        s.set(&id, &Counter { hits: 1 }).unwrap();
        s.set(&id, &Counter { hits: 2 }).unwrap();
        let stored = s.get_versioned(&id).unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.data.hits, 2);
    }

    #[test]
    fn test_update_creates_from_default() {
        let s = session();
        let id = SessionId::new("b");
        assert_eq!(s.update(&id, |c| c.hits += 1).unwrap().hits, 1);
        assert_eq!(s.update(&id, |c| c.hits += 1).unwrap().hits, 2);
        assert_eq!(s.get_versioned(&id).unwrap().unwrap().version, 2);
    }

    #[test]
    fn test_modify_requires_existing() {
        let s = session();
        let id = SessionId::new("c");
        assert!(matches!(s.modify(&id, |c| c.hits += 1), Err(CacheError::NotFound(_))));
        s.set(&id, &Counter { hits: 5 }).unwrap();
        assert_eq!(s.modify(&id, |c| c.hits += 1).unwrap().hits, 6);
    }

    #[test]
    fn test_try_modify_is_won_once() {
        let s = session();
        let id = SessionId::new("f");
        s.set(&id, &Counter { hits: 0 }).unwrap();

        let claim = |c: &mut Counter| {
            if c.hits > 0 {
                return false;
            }
            c.hits = 1;
            true
        };
        assert_eq!(s.try_modify(&id, claim).unwrap(), Some(Counter { hits: 1 }));
        assert_eq!(s.try_modify(&id, claim).unwrap(), None);
        assert_eq!(s.get_versioned(&id).unwrap().unwrap().version, 2);
        assert!(matches!(
            s.try_modify(&SessionId::new("missing"), claim),
            Err(CacheError::NotFound(_))
        ));
    }

    #[test]
    fn test_ttl_applies_to_new_records() {
        let s = session().with_ttl(Duration::ZERO);
        let id = SessionId::new("d");
        s.set(&id, &Counter { hits: 1 }).unwrap();
        assert!(!s.exists(&id).unwrap());
    }

    #[test]
    fn test_set_drops_expired_records() {
        let cache = Cache::isolated();
        let short = Session::<Counter>::new(cache.clone(), "counter").with_ttl(Duration::ZERO);
        let long = Session::<Counter>::new(cache.clone(), "counter").with_ttl(Duration::from_secs(60));

        short.set(&SessionId::new("old"), &Counter::default()).unwrap();
        long.set(&SessionId::new("new"), &Counter::default()).unwrap();

        assert_eq!(cache.purge_expired().unwrap(), 0);
        assert!(long.exists(&SessionId::new("new")).unwrap());
    }

    #[test]
    fn test_delete() {
        let s = session();
        let id = SessionId::new("e");
        s.set(&id, &Counter::default()).unwrap();
        s.delete(&id).unwrap();
        assert_eq!(s.get(&id).unwrap(), None);
    }
}
