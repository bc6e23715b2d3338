//! Bounded caches with least-recently-used eviction.

use std::{collections::HashMap, hash::Hash};

const NIL: usize = usize::MAX;

#[derive(Debug, Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

/// Ordered hash map with O(1) lookup-and-touch and eviction from the front.
///
/// Entries live in a slab threaded by an intrusive doubly linked list; the
/// list head is the least recently used entry.
#[derive(Debug, Clone)]
pub struct LruCache<K, V> {
    index: HashMap<K, usize>,
    nodes: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    max_size: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache holding at most `max_size` entries. Zero means unbounded.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            index: HashMap::new(),
            nodes: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            max_size,
        }
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Reports whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Maximum number of entries retained.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Changes the bound and evicts immediately if needed.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.evict_overflow();
    }

    /// Reports whether `key` is cached without touching it.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Reads `key` without touching it.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<&V> {
        let slot = *self.index.get(key)?;
        self.nodes[slot].as_ref().map(|node| &node.value)
    }

    /// Reads `key` and marks it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let slot = *self.index.get(key)?;
        self.touch(slot);
        self.nodes[slot].as_ref().map(|node| &node.value)
    }

    /// Mutable access to `key`, marking it most recently used.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let slot = *self.index.get(key)?;
        self.touch(slot);
        self.nodes[slot].as_mut().map(|node| &mut node.value)
    }

    /// Inserts or replaces `key`, returning the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&slot) = self.index.get(&key) {
            self.touch(slot);
            return self.nodes[slot]
                .as_mut()
                .map(|node| std::mem::replace(&mut node.value, value));
        }
        let node = Node {
            key: key.clone(),
            value,
            prev: self.tail,
            next: NIL,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.link_back(slot);
        let _ = self.index.insert(key, slot);
        self.evict_overflow();
        None
    }

    /// Returns the value for `key`, computing and inserting it when absent.
    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
        let slot = match self.index.get(&key) {
            Some(&slot) => {
                self.touch(slot);
                slot
            }
            None => {
                let _ = self.insert(key.clone(), make());
                match self.index.get(&key) {
                    Some(&slot) => slot,
                    None => unreachable!("freshly inserted key is the newest entry"),
                }
            }
        };
        match self.nodes[slot].as_mut() {
            Some(node) => &mut node.value,
            None => unreachable!("indexed slot is vacant"),
        }
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let slot = self.index.remove(key)?;
        self.unlink(slot);
        self.free.push(slot);
        self.nodes[slot].take().map(|node| node.value)
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_front(&mut self) -> Option<(K, V)> {
        if self.head == NIL {
            return None;
        }
        let slot = self.head;
        self.unlink(slot);
        self.free.push(slot);
        let node = self.nodes[slot].take()?;
        let _ = self.index.remove(&node.key);
        Some((node.key, node.value))
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.index.clear();
        self.nodes.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    /// Visits entries from least to most recently used.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.nodes.get(cursor)?.as_ref()?;
            cursor = node.next;
            Some((&node.key, &node.value))
        })
    }

    /// Removes every entry for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &V) -> bool) {
        let doomed: Vec<K> = self
            .iter()
            .filter(|(key, value)| !keep(key, value))
            .map(|(key, _)| key.clone())
            .collect();
        for key in doomed {
            let _ = self.remove(&key);
        }
    }

    fn evict_overflow(&mut self) {
        if self.max_size == 0 {
            return;
        }
        while self.index.len() > self.max_size {
            if self.pop_front().is_none() {
                break;
            }
        }
    }

    fn touch(&mut self, slot: usize) {
        if self.tail == slot {
            return;
        }
        self.unlink(slot);
        self.link_back(slot);
    }

    fn link_back(&mut self, slot: usize) {
        let previous_tail = self.tail;
        if let Some(node) = self.nodes[slot].as_mut() {
            node.prev = previous_tail;
            node.next = NIL;
        }
        if previous_tail == NIL {
            self.head = slot;
        } else if let Some(node) = self.nodes[previous_tail].as_mut() {
            node.next = slot;
        }
        self.tail = slot;
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = match self.nodes[slot].as_ref() {
            Some(node) => (node.prev, node.next),
            None => return,
        };
        if prev == NIL {
            self.head = next;
        } else if let Some(node) = self.nodes[prev].as_mut() {
            node.next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else if let Some(node) = self.nodes[next].as_mut() {
            node.prev = prev;
        }
    }
}

/// LRU cache whose entries also expire after a period without access.
///
/// Time is supplied by the caller as milliseconds so that expiry is
/// reproducible in tests.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    entries: LruCache<K, (u64, V)>,
    time_to_live: u64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache with the given time-to-live and size bound.
    #[must_use]
    pub fn new(time_to_live: u64, max_size: usize) -> Self {
        Self {
            entries: LruCache::new(max_size),
            time_to_live,
        }
    }

    /// Time-to-live in milliseconds.
    #[must_use]
    pub const fn time_to_live(&self) -> u64 {
        self.time_to_live
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reports whether `key` is cached.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    /// Reads `key` and refreshes its access stamp.
    pub fn get(&mut self, key: &K, now: u64) -> Option<&V> {
        let entry = self.entries.get_mut(key)?;
        entry.0 = now;
        Some(&entry.1)
    }

    /// Reads `key` without refreshing it.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.peek(key).map(|(_, value)| value)
    }

    /// Inserts `value` stamped with `now`.
    pub fn insert(&mut self, key: K, value: V, now: u64) -> Option<V> {
        self.entries.insert(key, (now, value)).map(|(_, value)| value)
    }

    /// Returns the value for `key`, computing it when absent.
    pub fn get_or_insert_with(&mut self, key: K, now: u64, make: impl FnOnce() -> V) -> &mut V {
        let entry = self.entries.get_or_insert_with(key, || (now, make()));
        entry.0 = now;
        &mut entry.1
    }

    /// Removes `key`.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    /// Drops every entry last touched more than the time-to-live before `now`.
    pub fn cleanup(&mut self, now: u64) {
        let time_to_live = self.time_to_live;
        self.entries
            .retain(|_, (stamp, _)| now.saturating_sub(*stamp) <= time_to_live);
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Visits entries from least to most recently used.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.entries.iter().map(|(key, (_, value))| (key, value))
    }
}
