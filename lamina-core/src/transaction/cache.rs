//! Per-transaction write buffer over one shared cache
//!
//! Writes are held back until [`TransactionalCache::commit`], so concurrent
//! transactions never observe uncommitted values. Reads go straight to the
//! shared cache (they do not see this transaction's own pending writes), and
//! every miss is remembered: on commit a remembered miss that was never
//! written becomes an explicit removal, so a value written by someone else in
//! the meantime is not left behind as stale.

use crate::cache::{Cache, SharedCache};
use crate::error::CacheResult;
use crate::key::CacheKey;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

pub struct TransactionalCache<V> {
    delegate: SharedCache<V>,
    clear_on_commit: bool,
    entries_to_add_on_commit: IndexMap<CacheKey, Arc<V>>,
    entries_missed_in_cache: HashSet<CacheKey>,
}

impl<V: Send + Sync + 'static> TransactionalCache<V> {
    pub fn new(delegate: SharedCache<V>) -> Self {
        Self {
            delegate,
            clear_on_commit: false,
            entries_to_add_on_commit: IndexMap::new(),
            entries_missed_in_cache: HashSet::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.delegate.id()
    }

    pub fn delegate(&self) -> &SharedCache<V> {
        &self.delegate
    }

    /// Number of writes waiting for commit
    pub fn pending(&self) -> usize {
        self.entries_to_add_on_commit.len()
    }

    /// True when nothing would happen on commit
    pub fn is_clean(&self) -> bool {
        !self.clear_on_commit
            && self.entries_to_add_on_commit.is_empty()
            && self.entries_missed_in_cache.is_empty()
    }

    /// Read from the shared cache, remembering misses
    ///
    /// While a clear is pending the shared cache's contents are already
    /// stale for this transaction, so the lookup reports a miss.
    pub fn get_object(&mut self, key: &CacheKey) -> CacheResult<Option<Arc<V>>> {
        let value = self.delegate.get(key)?;
        if value.is_none() {
            self.entries_missed_in_cache.insert(key.clone());
        }
        if self.clear_on_commit {
            Ok(None)
        } else {
            Ok(value)
        }
    }

    /// Buffer a write; the last write for a key wins and sets its flush position
    pub fn put_object(&mut self, key: CacheKey, value: Arc<V>) {
        self.entries_to_add_on_commit.shift_remove(&key);
        self.entries_to_add_on_commit.insert(key, value);
    }

    /// Clear the shared cache on commit and drop everything buffered so far
    pub fn clear(&mut self) {
        self.clear_on_commit = true;
        self.entries_to_add_on_commit.clear();
    }

    pub fn commit(&mut self) -> CacheResult<()> {
        if self.clear_on_commit {
            self.delegate.clear();
        }
        self.flush_pending_entries()?;
        log::debug!(
            "committed cache {}: {} writes, {} misses, clear={}",
            self.id(),
            self.entries_to_add_on_commit.len(),
            self.entries_missed_in_cache.len(),
            self.clear_on_commit
        );
        self.reset();
        Ok(())
    }

    /// Discard all buffered state without changing the shared cache
    pub fn rollback(&mut self) {
        self.release_missed_entries();
        self.reset();
    }

    fn reset(&mut self) {
        self.clear_on_commit = false;
        self.entries_to_add_on_commit.clear();
        self.entries_missed_in_cache.clear();
    }

    fn flush_pending_entries(&mut self) -> CacheResult<()> {
        for (key, value) in &self.entries_to_add_on_commit {
            self.delegate.put(key.clone(), value.clone())?;
        }
        for key in &self.entries_missed_in_cache {
            if !self.entries_to_add_on_commit.contains_key(key) {
                self.delegate.remove(key);
            }
        }
        Ok(())
    }

    fn release_missed_entries(&self) {
        for key in &self.entries_missed_in_cache {
            self.delegate.release(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PerpetualCache;

    fn key(i: i64) -> CacheKey {
        CacheKey::from_parts(vec![i])
    }

    fn shared() -> SharedCache<String> {
        Arc::new(PerpetualCache::<String>::new("tx").unwrap())
    }

    fn value(s: &str) -> Arc<String> {
        Arc::new(s.to_string())
    }

    #[test]
    fn test_writes_hidden_until_commit() {
        let delegate = shared();
        let mut tx = TransactionalCache::new(delegate.clone());
        tx.put_object(key(1), value("a"));

        assert!(delegate.get(&key(1)).unwrap().is_none());
        tx.commit().unwrap();
        assert_eq!(delegate.get(&key(1)).unwrap(), Some(value("a")));
        assert!(tx.is_clean());
    }

    #[test]
    fn test_reads_do_not_see_own_pending_writes() {
        let mut tx = TransactionalCache::new(shared());
        tx.put_object(key(1), value("a"));
        assert!(tx.get_object(&key(1)).unwrap().is_none());
    }

    #[test]
    fn test_rollback_leaves_delegate_untouched() {
        let delegate = shared();
        delegate.put(key(1), value("before")).unwrap();

        let mut tx = TransactionalCache::new(delegate.clone());
        tx.put_object(key(1), value("after"));
        tx.put_object(key(2), value("new"));
        tx.get_object(&key(3)).unwrap();
        tx.clear();
        tx.rollback();

        assert_eq!(delegate.size(), 1);
        assert_eq!(delegate.get(&key(1)).unwrap(), Some(value("before")));
        assert!(tx.is_clean());
    }

    #[test]
    fn test_miss_becomes_removal_on_commit() {
        let delegate = shared();
        let mut tx = TransactionalCache::new(delegate.clone());
        assert!(tx.get_object(&key(1)).unwrap().is_none());

        // another transaction commits a value for the same key
        delegate.put(key(1), value("concurrent")).unwrap();

        tx.commit().unwrap();
        assert!(delegate.get(&key(1)).unwrap().is_none());
    }

    #[test]
    fn test_written_miss_is_kept() {
        let delegate = shared();
        let mut tx = TransactionalCache::new(delegate.clone());
        tx.get_object(&key(1)).unwrap();
        tx.put_object(key(1), value("computed"));
        tx.commit().unwrap();

        assert_eq!(delegate.get(&key(1)).unwrap(), Some(value("computed")));
    }

    #[test]
    fn test_clear_on_commit() {
        let delegate = shared();
        delegate.put(key(1), value("old")).unwrap();

        let mut tx = TransactionalCache::new(delegate.clone());
        tx.put_object(key(2), value("dropped"));
        tx.clear();
        assert_eq!(tx.pending(), 0);
        assert!(tx.get_object(&key(1)).unwrap().is_none());

        tx.put_object(key(3), value("kept"));
        tx.commit().unwrap();

        assert!(delegate.get(&key(1)).unwrap().is_none());
        assert!(delegate.get(&key(2)).unwrap().is_none());
        assert_eq!(delegate.get(&key(3)).unwrap(), Some(value("kept")));
    }

    #[test]
    fn test_last_write_wins_and_sets_order() {
        let delegate = shared();
        let mut tx = TransactionalCache::new(delegate.clone());
        tx.put_object(key(1), value("first"));
        tx.put_object(key(2), value("second"));
        tx.put_object(key(1), value("third"));

        let order: Vec<_> = tx.entries_to_add_on_commit.keys().cloned().collect();
        assert_eq!(order, vec![key(2), key(1)]);

        tx.commit().unwrap();
        assert_eq!(delegate.get(&key(1)).unwrap(), Some(value("third")));
    }
}
