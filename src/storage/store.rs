//! Thread-Safe JSON Key-Value Store
//!
//! This module implements the core store: a mapping from top-level key to
//! a nested JSON document, paired with a mapping from the same key to its
//! expiration metadata.
//!
//! ## Design Decisions
//!
//! 1. **Paired maps, one lock**: a key exists in the value map if and only
//!    if it exists in the expiration map. Both maps live behind a single
//!    `RwLock`, and every mutation holds the write lock for its whole
//!    duration, so the pairing can never be observed torn.
//! 2. **Lazy Expiry**: reads check the entry's deadline themselves; eviction
//!    happens in the request-driven sweeper (`storage::expiry`).
//! 3. **Whole-document writes**: a put replaces the entire value and its
//!    metadata. There is no update-in-place for nested sub-values.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  KeyStore                    │
//! │  ┌────────────────────────────────────────┐  │
//! │  │              RwLock<Inner>             │  │
//! │  │   values:      key -> JSON document    │  │
//! │  │   expirations: key -> created_at, ttl  │  │
//! │  └────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! One request task reads (shared lock) while another puts or deletes
//! (exclusive lock); the lock is never held across an await point.

use crate::storage::expiry::{ttl_or_default, Expiration};
use crate::storage::path;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;
use thiserror::Error;

/// Errors a store operation can fail with.
///
/// All of them are request-scoped: they are reported to the caller inside
/// the JSON reply envelope and never tear down anything beyond the single
/// request. `Display` renders the exact message the wire contract carries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Write payload was not a JSON object with at least one field
    #[error("Invalid json format. Please provide valid json")]
    InvalidPayload,

    /// Missing key, expired key, or a path that resolved to nothing
    #[error("Not found path")]
    NotFound,

    /// Delete of a key that is not tracked
    #[error("Key not found")]
    KeyNotFound,

    /// Delete with more than one path segment
    #[error("Invalid delete key")]
    InvalidDeleteKey,
}

impl StoreError {
    /// Stable numeric code carried in the error reply envelope.
    pub fn code(&self) -> u8 {
        match self {
            StoreError::InvalidPayload => 1,
            StoreError::NotFound => 2,
            StoreError::KeyNotFound | StoreError::InvalidDeleteKey => 3,
        }
    }
}

/// The paired maps. Only ever touched with the enclosing lock held.
#[derive(Debug, Default)]
struct Inner {
    values: Map<String, Value>,
    expirations: HashMap<String, Expiration>,
}

impl Inner {
    /// Removes `key` from both maps; the single removal primitive shared
    /// by explicit deletes and the sweeper.
    fn remove_entry(&mut self, key: &str) -> bool {
        if self.values.contains_key(key) && self.expirations.contains_key(key) {
            self.values.remove(key);
            self.expirations.remove(key);
            true
        } else {
            false
        }
    }
}

/// The main store shared by all connection tasks.
///
/// # Thread Safety
///
/// Designed to be wrapped in an `Arc` and shared across request tasks.
/// All operations are thread-safe.
///
/// # Example
///
/// ```
/// use stashkv::storage::KeyStore;
/// use serde_json::json;
///
/// let store = KeyStore::new();
///
/// store.put("user", r#"{"name": "Alice", "tags": ["a", "b"]}"#, Some("10m")).unwrap();
///
/// assert_eq!(store.get(&["user", "name"]).unwrap(), json!("Alice"));
/// assert_eq!(store.get(&["user", "tags", "2"]).unwrap(), json!("b"));
///
/// store.delete(&["user"]).unwrap();
/// assert!(store.get(&["user"]).is_err());
/// ```
pub struct KeyStore {
    inner: RwLock<Inner>,

    /// Statistics: total put operations
    put_count: AtomicU64,

    /// Statistics: total get operations
    get_count: AtomicU64,

    /// Statistics: total delete operations
    delete_count: AtomicU64,

    /// Statistics: keys removed because they expired
    expired_count: AtomicU64,
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("keys", &self.len())
            .field("put_count", &self.put_count.load(Ordering::Relaxed))
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            put_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
            delete_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    /// Stores `raw_json` under `key`, replacing any previous entry.
    ///
    /// `ttl_spec` is a duration string (`"2h30m"`, `"10ms"`); an absent or
    /// unparseable spec silently falls back to the 2 hour default rather
    /// than failing the write. The payload must be a JSON object with at
    /// least one top-level field, otherwise [`StoreError::InvalidPayload`]
    /// is returned and nothing changes.
    pub fn put(&self, key: &str, raw_json: &str, ttl_spec: Option<&str>) -> Result<(), StoreError> {
        self.put_count.fetch_add(1, Ordering::Relaxed);

        let ttl = ttl_or_default(ttl_spec);
        let parsed: Map<String, Value> =
            serde_json::from_str(raw_json).map_err(|_| StoreError::InvalidPayload)?;
        if parsed.is_empty() {
            return Err(StoreError::InvalidPayload);
        }

        let mut inner = self.inner.write().unwrap();
        inner.values.insert(key.to_string(), Value::Object(parsed));
        inner
            .expirations
            .insert(key.to_string(), Expiration::starting_now(ttl));
        Ok(())
    }

    /// Looks up a value by path. `segments[0]` is the top-level key.
    ///
    /// Fails with [`StoreError::NotFound`] when the key is untracked or
    /// expired, or when the path resolves to nothing. The expiry check and
    /// the resolution run under one read-lock acquisition, so a concurrent
    /// delete cannot be observed halfway.
    pub fn get(&self, segments: &[&str]) -> Result<Value, StoreError> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let Some(top) = segments.first() else {
            return Err(StoreError::NotFound);
        };

        let inner = self.inner.read().unwrap();
        let tracked = inner.expirations.get(*top).ok_or(StoreError::NotFound)?;
        if tracked.is_expired() {
            return Err(StoreError::NotFound);
        }

        // The map of top-level keys is itself the root object the path
        // walks, so single-segment lookups and deep paths share one code
        // path.
        path::resolve(&inner.values, segments)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    /// Removes a top-level key from both maps.
    ///
    /// Exactly one segment must be supplied; nested deletion is
    /// unsupported and fails with [`StoreError::InvalidDeleteKey`] even
    /// when the nested path exists.
    pub fn delete(&self, segments: &[&str]) -> Result<(), StoreError> {
        self.delete_count.fetch_add(1, Ordering::Relaxed);

        let [key] = segments else {
            return Err(StoreError::InvalidDeleteKey);
        };

        let mut inner = self.inner.write().unwrap();
        if inner.remove_entry(key) {
            Ok(())
        } else {
            Err(StoreError::KeyNotFound)
        }
    }

    /// Key and expiry deadline for every tracked entry, collected under
    /// the read lock. Input for a sweep pass.
    pub fn expiration_snapshot(&self) -> Vec<(String, Instant)> {
        let inner = self.inner.read().unwrap();
        inner
            .expirations
            .iter()
            .map(|(key, exp)| (key.clone(), exp.deadline()))
            .collect()
    }

    /// Removes the given keys from both maps under one write-lock
    /// acquisition. Returns how many were actually present and removed.
    pub fn remove_expired(&self, keys: &[String]) -> usize {
        let mut inner = self.inner.write().unwrap();
        let mut removed = 0;
        for key in keys {
            if inner.remove_entry(key) {
                removed += 1;
            }
        }
        drop(inner);

        if removed > 0 {
            self.expired_count.fetch_add(removed as u64, Ordering::Relaxed);
        }
        removed
    }

    /// Number of tracked keys (including not-yet-swept expired ones).
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns operation statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            keys: self.len() as u64,
            put_ops: self.put_count.load(Ordering::Relaxed),
            get_ops: self.get_count.load(Ordering::Relaxed),
            delete_ops: self.delete_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy)]
pub struct StoreStats {
    /// Number of keys currently tracked
    pub keys: u64,
    /// Total put operations
    pub put_ops: u64,
    /// Total get operations
    pub get_ops: u64,
    /// Total delete operations
    pub delete_ops: u64,
    /// Total keys removed by expiry
    pub expired: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_put_then_get_roundtrip() {
        let store = KeyStore::new();
        store
            .put("user", r#"{"name": "Alice", "age": 30}"#, Some("1h"))
            .unwrap();

        assert_eq!(
            store.get(&["user"]).unwrap(),
            json!({"name": "Alice", "age": 30})
        );
    }

    #[test]
    fn test_get_missing_key() {
        let store = KeyStore::new();
        assert_eq!(store.get(&["nope"]), Err(StoreError::NotFound));
    }

    #[test]
    fn test_get_after_delete() {
        let store = KeyStore::new();
        store.put("k", r#"{"a": 1}"#, None).unwrap();
        store.delete(&["k"]).unwrap();
        assert_eq!(store.get(&["k"]), Err(StoreError::NotFound));
    }

    #[test]
    fn test_put_overwrites_value_and_metadata() {
        let store = KeyStore::new();
        store.put("k", r#"{"a": 1}"#, Some("1h")).unwrap();
        store.put("k", r#"{"b": 2}"#, Some("2h")).unwrap();

        assert_eq!(store.get(&["k"]).unwrap(), json!({"b": 2}));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_invalid_json_leaves_prior_value() {
        let store = KeyStore::new();
        store.put("k", r#"{"a": 1}"#, None).unwrap();

        assert_eq!(
            store.put("k", "not valid json", None),
            Err(StoreError::InvalidPayload)
        );
        assert_eq!(store.get(&["k"]).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_rejects_non_object_payloads() {
        let store = KeyStore::new();
        assert_eq!(store.put("k", "{}", None), Err(StoreError::InvalidPayload));
        assert_eq!(
            store.put("k", "[1, 2, 3]", None),
            Err(StoreError::InvalidPayload)
        );
        assert_eq!(
            store.put("k", r#""just a string""#, None),
            Err(StoreError::InvalidPayload)
        );
        assert_eq!(store.put("k", "42", None), Err(StoreError::InvalidPayload));
        assert!(store.is_empty());
    }

    #[test]
    fn test_path_lookup_into_nested_value() {
        let store = KeyStore::new();
        store.put("a", r#"{"b": {"c": 5}}"#, None).unwrap();
        assert_eq!(store.get(&["a", "b", "c"]).unwrap(), json!(5));
        assert_eq!(store.get(&["a", "b", "missing"]), Err(StoreError::NotFound));
    }

    #[test]
    fn test_path_lookup_into_list() {
        let store = KeyStore::new();
        store.put("a", r#"{"list": [10, 20, 30]}"#, None).unwrap();

        assert_eq!(store.get(&["a", "list", "2"]).unwrap(), json!(20));
        assert_eq!(store.get(&["a", "list", "0"]), Err(StoreError::NotFound));
        assert_eq!(store.get(&["a", "list", "4"]), Err(StoreError::NotFound));
    }

    #[test]
    fn test_expired_key_reads_as_missing() {
        let store = KeyStore::new();
        store.put("k", r#"{"a": 1}"#, Some("10ms")).unwrap();
        assert!(store.get(&["k"]).is_ok());

        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(store.get(&["k"]), Err(StoreError::NotFound));
        // Lazy expiry: the entry is still tracked until a sweep runs
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_invalid_ttl_falls_back_to_default() {
        let store = KeyStore::new();
        store.put("k", r#"{"a": 1}"#, Some("not-a-duration")).unwrap();
        // Would be instantly expired if the bad spec were taken literally
        assert!(store.get(&["k"]).is_ok());
    }

    #[test]
    fn test_delete_requires_single_segment() {
        let store = KeyStore::new();
        store.put("a", r#"{"b": 1}"#, None).unwrap();

        // Nested deletion is refused even though a.b exists
        assert_eq!(
            store.delete(&["a", "b"]),
            Err(StoreError::InvalidDeleteKey)
        );
        assert!(store.get(&["a", "b"]).is_ok());
    }

    #[test]
    fn test_delete_missing_key() {
        let store = KeyStore::new();
        assert_eq!(store.delete(&["ghost"]), Err(StoreError::KeyNotFound));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(StoreError::InvalidPayload.code(), 1);
        assert_eq!(StoreError::NotFound.code(), 2);
        assert_eq!(StoreError::KeyNotFound.code(), 3);
        assert_eq!(StoreError::InvalidDeleteKey.code(), 3);
    }

    #[test]
    fn test_expiration_snapshot_and_remove() {
        let store = KeyStore::new();
        store.put("a", r#"{"x": 1}"#, Some("1h")).unwrap();
        store.put("b", r#"{"y": 2}"#, Some("1h")).unwrap();

        let snapshot = store.expiration_snapshot();
        assert_eq!(snapshot.len(), 2);

        let removed = store.remove_expired(&["a".to_string(), "ghost".to_string()]);
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(&["b"]).is_ok());
    }

    #[test]
    fn test_stats_track_operations() {
        let store = KeyStore::new();
        store.put("k", r#"{"a": 1}"#, None).unwrap();
        let _ = store.get(&["k"]);
        let _ = store.get(&["missing"]);
        store.delete(&["k"]).unwrap();

        let stats = store.stats();
        assert_eq!(stats.put_ops, 1);
        assert_eq!(stats.get_ops, 2);
        assert_eq!(stats.delete_ops, 1);
        assert_eq!(stats.keys, 0);
    }

    #[test]
    fn test_concurrent_put_and_get_never_tear() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(KeyStore::new());
        let mut handles = vec![];

        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for j in 0..200 {
                    let key = format!("key-{}", j % 10);
                    store
                        .put(&key, &format!(r#"{{"writer": {i}, "seq": {j}}}"#), Some("1h"))
                        .unwrap();
                    match store.get(&[key.as_str()]) {
                        // A read sees a complete document or nothing;
                        // value and metadata are paired under one lock.
                        Ok(value) => {
                            let obj = value.as_object().unwrap();
                            assert!(obj.contains_key("writer"));
                            assert!(obj.contains_key("seq"));
                        }
                        Err(e) => assert_eq!(e, StoreError::NotFound),
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 10);
    }

    #[test]
    fn test_concurrent_delete_and_get() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(KeyStore::new());
        for i in 0..100 {
            store.put(&format!("k{i}"), r#"{"v": 1}"#, None).unwrap();
        }

        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..100 {
                    let key = format!("k{i}");
                    // Either a full hit or a clean miss
                    match store.get(&[key.as_str()]) {
                        Ok(value) => assert_eq!(value, json!({"v": 1})),
                        Err(e) => assert_eq!(e, StoreError::NotFound),
                    }
                }
            })
        };
        let deleter = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..100 {
                    let key = format!("k{i}");
                    let _ = store.delete(&[key.as_str()]);
                }
            })
        };

        reader.join().unwrap();
        deleter.join().unwrap();
        assert!(store.is_empty());
    }
}
