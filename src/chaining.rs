//! Separate chaining over singly linked overflow lists.

use alloc::boxed::Box;

use crate::hash::mix;
use crate::raw::SlotBuf;
use crate::raw::prefetch_read;
use crate::table::INITIAL_CAPACITY;
use crate::table::Table;
use crate::table::threshold;

struct Node {
    key: u64,
    value: u64,
    next: Option<Box<Node>>,
}

/// The correctness and memory-usage baseline: a bucket array of singly
/// linked overflow lists.
///
/// Removal is structural (the node is unlinked and freed), so no tombstones
/// or rehashing exist here, and the load factor may exceed 100%. Growth
/// reallocates only the bucket array; existing nodes are relinked into their
/// new buckets, never recreated.
pub struct ChainingTable {
    heads: SlotBuf<Option<Box<Node>>>,
    capacity: usize,
    len: usize,
    load_factor: u64,
}

impl ChainingTable {
    /// Creates an empty table with the default load factor (100%).
    pub fn new() -> Self {
        Self::with_load_factor(100)
    }

    /// Creates an empty table growing once `len` reaches
    /// `capacity * load_percent / 100`. Values above 100 are meaningful
    /// here: chains simply run longer.
    pub fn with_load_factor(load_percent: u64) -> Self {
        ChainingTable {
            heads: SlotBuf::new(INITIAL_CAPACITY),
            capacity: INITIAL_CAPACITY,
            len: 0,
            load_factor: load_percent,
        }
    }

    #[inline(always)]
    fn mask(&self) -> usize {
        self.capacity - 1
    }

    #[inline(always)]
    fn bucket(&self, key: u64) -> usize {
        (mix(key) as usize) & self.mask()
    }

    fn grow(&mut self) {
        let mut old = core::mem::replace(&mut self.heads, SlotBuf::new(self.capacity * 2));
        self.capacity *= 2;
        for head in old.iter_mut() {
            let mut chain = head.take();
            while let Some(mut node) = chain {
                chain = node.next.take();
                let index = (mix(node.key) as usize) & self.mask();
                node.next = self.heads[index].take();
                self.heads[index] = Some(node);
            }
        }
    }

    /// Unlinks and returns the node carrying `key`, if present.
    fn unlink(chain: &mut Option<Box<Node>>, key: u64) -> Option<Box<Node>> {
        if chain.as_ref().is_some_and(|node| node.key == key) {
            let mut node = chain.take()?;
            *chain = node.next.take();
            return Some(node);
        }
        match chain {
            Some(node) => Self::unlink(&mut node.next, key),
            None => None,
        }
    }
}

impl Default for ChainingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ChainingTable {
    fn drop(&mut self) {
        // The bucket array does not own the nodes through Drop; tear the
        // chains down iteratively so long chains cannot overflow the stack.
        self.clear();
    }
}

impl Table for ChainingTable {
    fn insert(&mut self, key: u64, value: u64) {
        if self.len >= threshold(self.capacity, self.load_factor) {
            self.grow();
        }
        let index = self.bucket(key);
        let node = Box::new(Node {
            key,
            value,
            next: self.heads[index].take(),
        });
        self.heads[index] = Some(node);
        self.len += 1;
    }

    fn find(&self, key: u64, probes: &mut u64) -> u64 {
        let mut cur = self.heads[self.bucket(key)].as_deref();
        while let Some(node) = cur {
            *probes += 1;
            if node.key == key {
                return node.value;
            }
            cur = node.next.as_deref();
        }
        panic!("find: key not present");
    }

    fn contains(&self, key: u64, probes: &mut u64) -> bool {
        let mut cur = self.heads[self.bucket(key)].as_deref();
        while let Some(node) = cur {
            *probes += 1;
            if node.key == key {
                return true;
            }
            cur = node.next.as_deref();
        }
        false
    }

    fn erase(&mut self, key: u64) {
        let index = self.bucket(key);
        if Self::unlink(&mut self.heads[index], key).is_none() {
            panic!("erase: key not present");
        }
        self.len -= 1;
    }

    fn index_for(&self, key: u64) -> u64 {
        self.bucket(key) as u64
    }

    fn prefetch(&self, key: u64) -> u64 {
        let index = self.bucket(key);
        if let Some(node) = &self.heads[index] {
            prefetch_read(&**node as *const Node);
        }
        index as u64
    }

    fn find_indexed(&self, key: u64, handle: u64, probes: &mut u64) -> u64 {
        let mut cur = self.heads[handle as usize].as_deref();
        while let Some(node) = cur {
            *probes += 1;
            if node.key == key {
                return node.value;
            }
            cur = node.next.as_deref();
        }
        panic!("find_indexed: key not present");
    }

    fn clear(&mut self) {
        self.len = 0;
        for head in self.heads.iter_mut() {
            let mut chain = head.take();
            while let Some(mut node) = chain {
                chain = node.next.take();
            }
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn memory_usage(&self) -> usize {
        self.heads.allocated_bytes() + self.len * size_of::<Node>() + size_of::<Self>()
    }

    fn sum_all_values(&self) -> u64 {
        let mut sum = 0u64;
        for head in self.heads.iter() {
            let mut cur = head.as_deref();
            while let Some(node) = cur {
                sum = sum.wrapping_add(node.value);
                cur = node.next.as_deref();
            }
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_and_chain_walks() {
        let mut t = ChainingTable::new();
        for k in 0..200u64 {
            t.insert(k, k * 2);
        }
        let mut probes = 0;
        for k in 0..200u64 {
            assert_eq!(t.find(k, &mut probes), k * 2);
        }
        assert!(probes >= 200, "each find examines at least one node");
    }

    #[test]
    fn erase_unlinks_any_position() {
        // Load factor 500 keeps the table at 8 buckets for 30 keys, so the
        // chains are long and head/middle/tail unlinks all occur.
        let mut t = ChainingTable::with_load_factor(500);
        for k in 0..30u64 {
            t.insert(k, k);
        }
        for k in [0u64, 29, 15, 7, 22] {
            t.erase(k);
        }
        assert_eq!(t.len(), 25);
        let mut probes = 0;
        for k in 0..30u64 {
            let expect = !matches!(k, 0 | 29 | 15 | 7 | 22);
            assert_eq!(t.contains(k, &mut probes), expect);
        }
    }

    #[test]
    #[should_panic(expected = "erase: key not present")]
    fn erase_missing_key_panics() {
        let mut t = ChainingTable::new();
        t.insert(3, 3);
        t.erase(4);
    }

    #[test]
    fn growth_relinks_every_node() {
        let mut t = ChainingTable::new();
        for k in 0..500u64 {
            t.insert(k, k + 1);
        }
        assert!(t.capacity > INITIAL_CAPACITY);
        let mut probes = 0;
        for k in 0..500u64 {
            assert_eq!(t.find(k, &mut probes), k + 1);
        }
        assert_eq!(t.sum_all_values(), (1..=500).sum());
    }

    #[test]
    fn memory_tracks_node_count() {
        let mut t = ChainingTable::new();
        let empty = t.memory_usage();
        for k in 0..8u64 {
            t.insert(k, k);
        }
        assert_eq!(t.memory_usage(), empty + 8 * size_of::<Node>());
        for k in 0..8u64 {
            t.erase(k);
        }
        assert_eq!(t.memory_usage(), empty);
    }

    #[test]
    fn clear_drops_long_chains() {
        let mut t = ChainingTable::with_load_factor(1000);
        for k in 0..2000u64 {
            t.insert(k, k);
        }
        t.clear();
        assert_eq!(t.len(), 0);
        let mut probes = 0;
        assert!(!t.contains(0, &mut probes));
    }
}
