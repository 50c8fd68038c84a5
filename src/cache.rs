//! Memoizing caches owned by a registry instance
//!
//! Every cache follows read-compute-insert under one lock, so concurrent first
//! use never double-compiles. Invalidation is whole-cache only.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use regex::Regex;

/// Mutex-guarded memo map
#[derive(Debug)]
pub struct Memo<K, V> {
    entries: Mutex<HashMap<K, V>>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash, V: Clone> Memo<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, computing and storing it on a miss
    ///
    /// Failures are returned and not cached.
    pub fn get_or_try_insert_with<Q, E>(
        &self,
        key: &Q,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        let mut entries = self.lock();
        if let Some(value) = entries.get(key) {
            return Ok(value.clone());
        }
        let value = compute()?;
        entries.insert(key.to_owned(), value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, V>> {
        // entries are only ever inserted whole, so a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mutex-guarded lazily computed single value
#[derive(Debug)]
pub struct Slot<V> {
    value: Mutex<Option<V>>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }
}

impl<V: Clone> Slot<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_try_init<E>(&self, compute: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        let mut slot = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = slot.as_ref() {
            return Ok(value.clone());
        }
        let value = compute()?;
        *slot = Some(value.clone());
        Ok(value)
    }

    pub fn is_set(&self) -> bool {
        self.value.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    pub fn clear(&self) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Compiled regexes keyed by their pattern string
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: Memo<String, Regex>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regex(&self, pattern: &str) -> Result<Regex, regex::Error> {
        self.compiled
            .get_or_try_insert_with(pattern, || Regex::new(pattern))
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    pub fn clear(&self) {
        self.compiled.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_memo_computes_once() {
        let memo: Memo<String, usize> = Memo::new();
        let calls = Cell::new(0);
        for _ in 0..3 {
            let v = memo
                .get_or_try_insert_with("a", || {
                    calls.set(calls.get() + 1);
                    Ok::<_, ()>(7)
                })
                .unwrap();
            assert_eq!(v, 7);
        }
        assert_eq!(calls.get(), 1);
        memo.clear();
        assert!(memo.is_empty());
    }

    #[test]
    fn test_memo_does_not_cache_failures() {
        let memo: Memo<String, usize> = Memo::new();
        assert!(memo.get_or_try_insert_with("a", || Err("boom")).is_err());
        assert_eq!(memo.get_or_try_insert_with("a", || Ok::<_, &str>(1)), Ok(1));
    }

    #[test]
    fn test_slot_clear_recomputes() {
        let slot: Slot<u32> = Slot::new();
        assert_eq!(slot.get_or_try_init(|| Ok::<_, ()>(1)), Ok(1));
        assert_eq!(slot.get_or_try_init(|| Ok::<_, ()>(2)), Ok(1));
        slot.clear();
        assert!(!slot.is_set());
        assert_eq!(slot.get_or_try_init(|| Ok::<_, ()>(2)), Ok(2));
    }

    #[test]
    fn test_pattern_cache_reuses_compiled_regex() {
        let cache = PatternCache::new();
        assert!(cache.regex("^a+$").unwrap().is_match("aaa"));
        cache.regex("^a+$").unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.regex("(").is_err());
        assert_eq!(cache.len(), 1);
    }
}
