//! In-memory [`StateStore`] implementation.
//!
//! Used by unit tests and single-process experiments. Matches Redis
//! semantics where the trait depends on them (lock expiry, negative list
//! indices).

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::store::StateStore;

#[derive(Default)]
struct Inner {
    strings: HashMap<String, StringEntry>,
    counters: HashMap<String, i64>,
    hashes: HashMap<String, HashMap<String, String>>,
    lists: HashMap<String, VecDeque<String>>,
}

struct StringEntry {
    #[allow(dead_code)]
    value: String,
    expires_at: Option<Instant>,
}

impl StringEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }
}

/// Process-local store with Redis-compatible semantics.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

/// Normalizes a Redis-style index range against a list length.
/// Returns `None` when the range selects nothing.
fn normalize_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let mut start = if start < 0 { len + start } else { start };
    let mut stop = if stop < 0 { len + stop } else { stop };
    if start < 0 {
        start = 0;
    }
    if stop >= len {
        stop = len - 1;
    }
    if len == 0 || start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let now = Instant::now();
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let occupied = inner
            .strings
            .get(key)
            .map(|entry| !entry.is_expired(now))
            .unwrap_or(false);
        if occupied {
            return Ok(false);
        }
        inner.strings.insert(
            key.to_string(),
            StringEntry {
                value: value.to_string(),
                expires_at: now.checked_add(ttl),
            },
        );
        Ok(true)
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let counter = inner.counters.entry(key.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        Ok(inner
            .hashes
            .get(key)
            .and_then(|hash| hash.get(field))
            .cloned())
    }

    async fn hash_values(&self, key: &str) -> StoreResult<Vec<String>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        Ok(inner
            .hashes
            .get(key)
            .map(|hash| hash.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_push_back(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner
            .lists
            .entry(key.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }

    async fn list_pop_front(&self, key: &str) -> StoreResult<Option<String>> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        Ok(inner.lists.get_mut(key).and_then(|list| list.pop_front()))
    }

    async fn list_range(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        let Some(list) = inner.lists.get(key) else {
            return Ok(Vec::new());
        };
        let Some((start, stop)) = normalize_range(list.len(), start, stop) else {
            return Ok(Vec::new());
        };
        Ok(list.iter().skip(start).take(stop - start + 1).cloned().collect())
    }

    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> StoreResult<()> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let Some(list) = inner.lists.get_mut(key) else {
            return Ok(());
        };
        match normalize_range(list.len(), start, stop) {
            Some((start, stop)) => {
                let kept: VecDeque<String> = list
                    .iter()
                    .skip(start)
                    .take(stop - start + 1)
                    .cloned()
                    .collect();
                *list = kept;
            }
            None => list.clear(),
        }
        Ok(())
    }

    async fn list_len(&self, key: &str) -> StoreResult<u64> {
        let inner = self.inner.lock().expect("memory store poisoned");
        Ok(inner.lists.get(key).map(|list| list.len() as u64).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_nx_ex_acquires_once() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(3600);
        assert!(store.set_nx_ex("sale_lock:a", "processed", ttl).await.unwrap());
        assert!(!store.set_nx_ex("sale_lock:a", "processed", ttl).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_nx_ex_reacquires_after_expiry() {
        let store = MemoryStore::new();
        // Zero TTL expires immediately.
        assert!(store
            .set_nx_ex("lock", "v", Duration::ZERO)
            .await
            .unwrap());
        assert!(store
            .set_nx_ex("lock", "v", Duration::from_secs(1))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_incr_monotonic() {
        let store = MemoryStore::new();
        assert_eq!(store.incr("count").await.unwrap(), 1);
        assert_eq!(store.incr("count").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_hash_replace() {
        let store = MemoryStore::new();
        store.hash_set("inv", "1", "a").await.unwrap();
        store.hash_set("inv", "1", "b").await.unwrap();
        assert_eq!(store.hash_get("inv", "1").await.unwrap(), Some("b".into()));
        assert_eq!(store.hash_values("inv").await.unwrap(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_list_fifo() {
        let store = MemoryStore::new();
        store.list_push_back("q", "first").await.unwrap();
        store.list_push_back("q", "second").await.unwrap();
        assert_eq!(store.list_pop_front("q").await.unwrap(), Some("first".into()));
        assert_eq!(store.list_pop_front("q").await.unwrap(), Some("second".into()));
        assert_eq!(store.list_pop_front("q").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_trim_keeps_tail() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.list_push_back("h", &i.to_string()).await.unwrap();
        }
        // Keep the most recent 3 (Redis LTRIM key -3 -1).
        store.list_trim("h", -3, -1).await.unwrap();
        assert_eq!(
            store.list_range("h", 0, -1).await.unwrap(),
            vec!["2", "3", "4"]
        );
        assert_eq!(store.list_len("h").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_list_range_negative_window() {
        let store = MemoryStore::new();
        for i in 0..4 {
            store.list_push_back("h", &i.to_string()).await.unwrap();
        }
        assert_eq!(store.list_range("h", -2, -1).await.unwrap(), vec!["2", "3"]);
        assert!(store.list_range("h", 5, 9).await.unwrap().is_empty());
    }
}
