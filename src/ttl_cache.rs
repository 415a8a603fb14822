//! Bounded TTL cache for remote lookup memoization.
//!
//! Entries expire lazily: the read that finds a stale entry evicts it.
//! The size bound is LRU; the upstream behavior this reproduces had no
//! capacity limit at all, so the bound here is a hardening addition.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(600);
pub const DEFAULT_CAPACITY: usize = 1024;

struct Entry<V> {
    value: V,
    stored_at: Instant,
    last_access: u64,
}

struct Inner<K, V> {
    map: HashMap<K, Entry<V>>,
    // Monotonic access counter, drives LRU eviction.
    tick: u64,
}

/// Process-wide cache shared by concurrent tasks; all access goes through
/// the inner mutex, so a completed `set` is visible to any later `get`.
///
/// Negative results are cacheable by choosing an `Option` value type: a
/// stored `None` is a hit, distinct from an absent key.
pub struct TtlCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    ttl: Duration,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be positive");
        Self {
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                tick: 0,
            }),
            ttl,
            capacity,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock().unwrap();
        inner.tick += 1;
        let tick = inner.tick;

        let expired = match inner.map.get_mut(key) {
            None => return None,
            Some(entry) => {
                if entry.stored_at.elapsed() > self.ttl {
                    true
                } else {
                    entry.last_access = tick;
                    return Some(entry.value.clone());
                }
            }
        };

        if expired {
            inner.map.remove(key);
        }
        None
    }

    pub fn set(&self, key: K, value: V) {
        let mut inner = self.inner.lock().unwrap();
        inner.tick += 1;
        let tick = inner.tick;

        if !inner.map.contains_key(&key) && inner.map.len() >= self.capacity {
            Self::evict_one(&mut inner);
        }

        inner.map.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
                last_access: tick,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the least recently accessed entry.
    fn evict_one(inner: &mut Inner<K, V>) {
        let victim = inner
            .map
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(k, _)| k.clone());
        if let Some(key) = victim {
            inner.map.remove(&key);
        }
    }
}
