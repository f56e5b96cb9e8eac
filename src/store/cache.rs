//! Cache primitives backing selector-like reads.
//!
//! Two disciplines are provided:
//! - [`LruCache`]: a bounded map for hot-path single-entity lookups keyed by
//!   a derived key such as `context_uuid#outcome_id`.
//! - [`DeepMemo`]: value-equality memoization for derived collections whose
//!   inputs are rebuilt on every read but whose logical value rarely changes.
//!
//! Neither exposes a manual invalidation API; invalidation derives purely
//! from input change.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Arc;

/// Builds the derived key for per-context outcome lookups.
pub fn outcome_cache_key(context_uuid: &str, outcome_id: &str) -> String {
    format!("{context_uuid}#{outcome_id}")
}

/// Bounded least-recently-used cache.
///
/// Capacity is enforced on insert; reads refresh recency. Not thread-safe on
/// its own, callers wrap it in the store's lock.
#[derive(Debug)]
pub struct LruCache<K: Eq + Hash + Clone, V: Clone> {
    capacity: usize,
    entries: HashMap<K, V>,
    order: VecDeque<K>,
}

impl<K: Eq + Hash + Clone, V: Clone> LruCache<K, V> {
    /// Creates a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Looks up a key, refreshing its recency on hit.
    pub fn get(&mut self, key: &K) -> Option<V> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.touch(key);
        self.entries.get(key).cloned()
    }

    /// Inserts or replaces a value, evicting the least-recently-used entry
    /// when over capacity.
    pub fn put(&mut self, key: K, value: V) {
        if self.entries.insert(key.clone(), value).is_some() {
            self.touch(&key);
        } else {
            self.order.push_back(key);
            if self.entries.len() > self.capacity {
                if let Some(evicted) = self.order.pop_front() {
                    self.entries.remove(&evicted);
                }
            }
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
            self.order.push_back(key.clone());
        }
    }
}

/// Value-equality memoization cell.
///
/// `memoize` compares a freshly computed value against the last committed one
/// and hands back the previously shared allocation when they are equal, so
/// downstream consumers holding the `Arc` observe a stable reference for a
/// stable logical value.
#[derive(Debug, Default)]
pub struct DeepMemo<T: PartialEq> {
    last: Option<Arc<T>>,
}

impl<T: PartialEq> DeepMemo<T> {
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Commits `fresh` unless it equals the stored value, in which case the
    /// stored allocation is returned unchanged.
    pub fn memoize(&mut self, fresh: T) -> Arc<T> {
        if let Some(last) = &self.last {
            if **last == fresh {
                return Arc::clone(last);
            }
        }
        let next = Arc::new(fresh);
        self.last = Some(Arc::clone(&next));
        next
    }
}
