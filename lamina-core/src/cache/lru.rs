//! LRU (Least Recently Used) eviction decorator
//!
//! Tracks key recency in a private index while values stay in the wrapped
//! cache. Both reads and writes count as a use. The index is a HashMap for
//! lookups plus a doubly-linked list over a slab of nodes, so touch and evict
//! are O(1).

use super::traits::Cache;
use crate::error::CacheResult;
use crate::key::CacheKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Default number of keys tracked before evicting
pub const DEFAULT_CAPACITY: usize = 1024;

/// Node in the recency list
struct RecencyNode {
    key: CacheKey,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Recency order over keys, most recent at the head
struct RecencyIndex {
    capacity: usize,
    map: HashMap<CacheKey, usize>,
    nodes: Vec<Option<RecencyNode>>,
    head: Option<usize>,
    tail: Option<usize>,
    free_list: Vec<usize>,
}

impl RecencyIndex {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::new(),
            nodes: Vec::new(),
            head: None,
            tail: None,
            free_list: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    /// Detach a node from the list without freeing it
    fn unlink(&mut self, idx: usize) {
        let (prev_idx, next_idx) = match &self.nodes[idx] {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev_idx {
            Some(prev_idx) => {
                if let Some(prev_node) = &mut self.nodes[prev_idx] {
                    prev_node.next = next_idx;
                }
            }
            None => self.head = next_idx,
        }

        match next_idx {
            Some(next_idx) => {
                if let Some(next_node) = &mut self.nodes[next_idx] {
                    next_node.prev = prev_idx;
                }
            }
            None => self.tail = prev_idx,
        }
    }

    /// Attach a detached node at the head
    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = old_head;
        }

        if let Some(old_head_idx) = old_head {
            if let Some(old_head_node) = &mut self.nodes[old_head_idx] {
                old_head_node.prev = Some(idx);
            }
        }

        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    /// Get a node index, either from free list or by allocating new
    fn allocate(&mut self, key: CacheKey) -> usize {
        let node = RecencyNode { key, prev: None, next: None };
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx] = Some(node);
            idx
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    /// Mark `key` as most recently used, inserting it if untracked
    fn touch(&mut self, key: &CacheKey) {
        match self.map.get(key).copied() {
            Some(idx) => {
                if self.head != Some(idx) {
                    self.unlink(idx);
                    self.push_front(idx);
                }
            }
            None => {
                let idx = self.allocate(key.clone());
                self.push_front(idx);
                self.map.insert(key.clone(), idx);
            }
        }
    }

    /// Mark `key` as most recently used only if it is already tracked
    fn refresh(&mut self, key: &CacheKey) {
        if self.map.contains_key(key) {
            self.touch(key);
        }
    }

    fn forget(&mut self, key: &CacheKey) {
        if let Some(idx) = self.map.remove(key) {
            self.unlink(idx);
            self.nodes[idx] = None;
            self.free_list.push(idx);
        }
    }

    /// Remove and return the least recently used key if over capacity
    fn evict_eldest(&mut self) -> Option<CacheKey> {
        if self.len() <= self.capacity {
            return None;
        }
        let tail_idx = self.tail?;
        self.unlink(tail_idx);
        let node = self.nodes[tail_idx].take()?;
        self.map.remove(&node.key);
        self.free_list.push(tail_idx);
        Some(node.key)
    }

    fn clear(&mut self) {
        self.map.clear();
        self.nodes.clear();
        self.free_list.clear();
        self.head = None;
        self.tail = None;
    }
}

/// LRU eviction decorator
pub struct LruCache<V> {
    delegate: Box<dyn Cache<V>>,
    index: Mutex<RecencyIndex>,
}

impl<V: Send + Sync + 'static> LruCache<V> {
    /// Create a new LRU decorator with the default capacity
    pub fn new(delegate: Box<dyn Cache<V>>) -> Self {
        Self::with_capacity(delegate, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(delegate: Box<dyn Cache<V>>, capacity: usize) -> Self {
        Self { delegate, index: Mutex::new(RecencyIndex::new(capacity)) }
    }

    /// Change the bound; a shrink is applied one eviction per later put
    pub fn set_capacity(&self, capacity: usize) {
        self.index.lock().capacity = capacity;
    }

    pub fn capacity(&self) -> usize {
        self.index.lock().capacity
    }
}

impl<V: Send + Sync + 'static> Cache<V> for LruCache<V> {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: Arc<V>) -> CacheResult<()> {
        self.delegate.put(key.clone(), value)?;
        let eldest = {
            let mut index = self.index.lock();
            index.touch(&key);
            index.evict_eldest()
        };
        if let Some(eldest) = eldest {
            log::trace!("lru cache {} evicting {}", self.id(), eldest);
            self.delegate.remove(&eldest);
        }
        Ok(())
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<Arc<V>>> {
        self.index.lock().refresh(key);
        self.delegate.get(key)
    }

    fn remove(&self, key: &CacheKey) -> Option<Arc<V>> {
        self.index.lock().forget(key);
        self.delegate.remove(key)
    }

    fn clear(&self) {
        self.delegate.clear();
        self.index.lock().clear();
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn release(&self, key: &CacheKey) {
        self.delegate.release(key)
    }
}
