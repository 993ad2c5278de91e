//! Bounded, lock-guarded memo caches.
//!
//! Both the parse cache and the result cache are a [`BoundedCache`]: a map
//! plus an insertion-order queue behind one `Mutex`. Lookups, inserts and
//! evictions all take the same lock, so a hit can never observe an entry
//! that eviction is halfway through removing.
//!
//! Computation happens outside the lock. A key being computed is marked
//! pending; other callers asking for that key wait on a `Condvar` until it
//! lands, while callers asking for other keys proceed in parallel.
//!
//! Eviction is strict insertion order (oldest key out). There is no TTL;
//! entries are keyed by content hash, so a stale entry is impossible.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use codevet_types::CheckKind;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Default number of entries per cache.
pub const DEFAULT_CAPACITY: usize = 100;

/// SHA-256 of a source text.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn of(text: &str) -> Self {
        Self(Sha256::digest(text.as_bytes()).into())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash(")?;
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "…)")
    }
}

/// Result cache key: what was checked, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub hash: ContentHash,
    pub kind: CheckKind,
}

impl CacheKey {
    pub fn new(text: &str, kind: CheckKind) -> Self {
        Self {
            hash: ContentHash::of(text),
            kind,
        }
    }
}

/// Counters for one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub len: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct Inner<K, V> {
    entries: HashMap<K, V>,
    order: VecDeque<K>,
    /// Keys some caller is computing right now.
    pending: HashSet<K>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Fixed-capacity key/value store with insertion-order eviction.
pub struct BoundedCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    /// Signalled whenever a pending key is settled.
    settled: Condvar,
    capacity: usize,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                pending: HashSet::new(),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            settled: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    // Every mutation below completes before anything can unwind, so a
    // poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();
        match inner.entries.get(key).cloned() {
            Some(value) => {
                inner.hits += 1;
                Some(value)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let mut inner = self.lock();
        Self::insert_locked(&mut inner, self.capacity, key, value);
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// `compute` runs without the lock. Concurrent callers asking for the
    /// same key wait for the first computation instead of repeating it;
    /// callers with other keys are not blocked. If `compute` panics the key
    /// is released and the next caller computes it.
    ///
    /// `compute` must not ask this cache for the same key, or it waits on
    /// itself.
    pub fn get_or_insert_with(&self, key: K, compute: impl FnOnce() -> V) -> V {
        let mut inner = self.lock();
        loop {
            if let Some(value) = inner.entries.get(&key).cloned() {
                inner.hits += 1;
                tracing::debug!(?key, "cache hit");
                return value;
            }
            if !inner.pending.contains(&key) {
                break;
            }
            inner = self
                .settled
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
        inner.misses += 1;
        inner.pending.insert(key.clone());
        drop(inner);

        let claim = Claim { cache: self, key: &key };
        let value = compute();
        {
            let mut inner = self.lock();
            Self::insert_locked(&mut inner, self.capacity, key.clone(), value.clone());
        }
        drop(claim);
        value
    }

    fn settle(&self, key: &K) {
        self.lock().pending.remove(key);
        self.settled.notify_all();
    }

    fn insert_locked(inner: &mut Inner<K, V>, capacity: usize, key: K, value: V) {
        if inner.entries.contains_key(&key) {
            inner.entries.insert(key, value);
            return;
        }
        while inner.entries.len() >= capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
            inner.evictions += 1;
            tracing::trace!(key = ?oldest, "cache eviction");
        }
        inner.order.push_back(key.clone());
        inner.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            len: inner.entries.len(),
            capacity: self.capacity,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
        }
    }
}

/// Releases a pending key on every exit from a computation, unwinding
/// included.
struct Claim<'a, K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    cache: &'a BoundedCache<K, V>,
    key: &'a K,
}

impl<K, V> Drop for Claim<'_, K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    fn drop(&mut self) {
        self.cache.settle(self.key);
    }
}

impl<K, V> fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
