//! Quadratic probing with tombstones and periodic in-place rehash.

use crate::hash::mix;
use crate::raw::ByteInit;
use crate::raw::SlotBuf;
use crate::raw::prefetch_read;
use crate::table::DELETED_KEY;
use crate::table::EMPTY_KEY;
use crate::table::INITIAL_CAPACITY;
use crate::table::Table;
use crate::table::threshold;

#[derive(Clone, Copy)]
#[repr(C)]
struct Slot {
    key: u64,
    value: u64,
}

// SAFETY: both words are plain integers; all-ones is (EMPTY_KEY, EMPTY_KEY).
unsafe impl ByteInit for Slot {
    const INIT: u8 = 0xFF;
}

/// Quadratic probing: the k-th step advances by k extra slots, tracing the
/// triangular offsets 1, 3, 6, 10, ... from the home slot.
///
/// With power-of-two capacities the triangular sequence visits every slot, so
/// an insert into a non-full table always lands. Deletion is tombstone-based
/// with the same deletion-factor rehash as the double-hashing variant.
pub struct QuadraticTable {
    slots: SlotBuf<Slot>,
    capacity: usize,
    len: usize,
    deleted: usize,
    load_factor: u64,
    deletion_factor: u64,
}

impl QuadraticTable {
    /// Creates an empty table with the default load factor (75%) and
    /// deletion factor (50%).
    pub fn new() -> Self {
        Self::with_factors(75, 50)
    }

    /// Creates an empty table with explicit integer-percent load and
    /// deletion factors.
    pub fn with_factors(load_percent: u64, deletion_percent: u64) -> Self {
        QuadraticTable {
            slots: SlotBuf::new(INITIAL_CAPACITY),
            capacity: INITIAL_CAPACITY,
            len: 0,
            deleted: 0,
            load_factor: load_percent,
            deletion_factor: deletion_percent,
        }
    }

    #[inline(always)]
    fn mask(&self) -> usize {
        self.capacity - 1
    }

    fn reinsert_all(&mut self, new_capacity: usize) {
        let old = core::mem::replace(&mut self.slots, SlotBuf::new(new_capacity));
        self.capacity = new_capacity;
        self.len = 0;
        self.deleted = 0;
        for slot in old.iter() {
            if slot.key < DELETED_KEY {
                self.insert(slot.key, slot.value);
            }
        }
    }
}

impl Default for QuadraticTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Table for QuadraticTable {
    fn insert(&mut self, key: u64, value: u64) {
        if self.len >= threshold(self.capacity, self.load_factor) {
            self.reinsert_all(self.capacity * 2);
        }
        let mut index = (mix(key) as usize) & self.mask();
        let mut dist = 0;
        while self.slots[index].key < DELETED_KEY {
            dist += 1;
            index = (index + dist) & self.mask();
        }
        self.slots[index] = Slot { key, value };
        self.len += 1;
    }

    fn find(&self, key: u64, probes: &mut u64) -> u64 {
        let mut index = (mix(key) as usize) & self.mask();
        let mut dist = 0;
        loop {
            if self.slots[index].key == key {
                return self.slots[index].value;
            }
            *probes += 1;
            dist += 1;
            index = (index + dist) & self.mask();
        }
    }

    fn contains(&self, key: u64, probes: &mut u64) -> bool {
        let mut index = (mix(key) as usize) & self.mask();
        let mut dist = 0;
        let mut steps = 0;
        while self.slots[index].key < EMPTY_KEY {
            if steps == self.capacity {
                return false;
            }
            steps += 1;
            if self.slots[index].key == key {
                return true;
            }
            *probes += 1;
            dist += 1;
            index = (index + dist) & self.mask();
        }
        false
    }

    fn erase(&mut self, key: u64) {
        let mut index = (mix(key) as usize) & self.mask();
        let mut dist = 0;
        loop {
            if self.slots[index].key == key {
                self.slots[index].key = DELETED_KEY;
                self.len -= 1;
                self.deleted += 1;
                if self.deleted >= threshold(self.capacity, self.deletion_factor) {
                    self.reinsert_all(self.capacity);
                }
                return;
            }
            dist += 1;
            index = (index + dist) & self.mask();
        }
    }

    fn index_for(&self, key: u64) -> u64 {
        ((mix(key) as usize) & self.mask()) as u64
    }

    fn prefetch(&self, key: u64) -> u64 {
        let index = self.index_for(key);
        // SAFETY: `index` is masked below capacity.
        prefetch_read(unsafe { self.slots.as_ptr().add(index as usize) });
        index
    }

    fn find_indexed(&self, key: u64, handle: u64, probes: &mut u64) -> u64 {
        let mut index = handle as usize;
        let mut dist = 0;
        loop {
            if self.slots[index].key == key {
                return self.slots[index].value;
            }
            *probes += 1;
            dist += 1;
            index = (index + dist) & self.mask();
        }
    }

    fn clear(&mut self) {
        self.len = 0;
        self.deleted = 0;
        self.slots.reset();
    }

    fn len(&self) -> usize {
        self.len
    }

    fn memory_usage(&self) -> usize {
        self.slots.allocated_bytes() + size_of::<Self>()
    }

    fn sum_all_values(&self) -> u64 {
        let mut sum = 0u64;
        for slot in self.slots.iter() {
            if slot.key < DELETED_KEY {
                sum = sum.wrapping_add(slot.value);
            }
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Triangular offsets over a power-of-two capacity must visit every slot
    /// before repeating; insertion correctness relies on it.
    #[test]
    fn triangular_sequence_covers_power_of_two() {
        for cap in [8usize, 64, 1024] {
            let mask = cap - 1;
            let mut seen = alloc::vec![false; cap];
            let mut index = 0usize;
            seen[0] = true;
            for dist in 1..cap {
                index = (index + dist) & mask;
                seen[index] = true;
            }
            assert!(seen.iter().all(|&s| s), "capacity {cap} not covered");
        }
    }

    #[test]
    fn roundtrip_through_growth() {
        let mut t = QuadraticTable::new();
        for k in 0..500u64 {
            t.insert(k, k ^ 0xABCD);
        }
        let mut probes = 0;
        for k in 0..500u64 {
            assert_eq!(t.find(k, &mut probes), k ^ 0xABCD);
        }
    }

    #[test]
    fn rehash_triggers_at_deletion_threshold() {
        let mut t = QuadraticTable::with_factors(75, 50);
        for k in 0..24u64 {
            t.insert(k, k);
        }
        let capacity = t.capacity;
        for k in 0..20u64 {
            t.erase(k);
        }
        assert_eq!(t.capacity, capacity);
        assert!(t.deleted < threshold(capacity, 50));
        let mut probes = 0;
        for k in 20..24u64 {
            assert!(t.contains(k, &mut probes));
        }
    }

    #[test]
    fn find_indexed_matches_find() {
        let mut t = QuadraticTable::new();
        for k in 0..200u64 {
            t.insert(k, k + 3);
        }
        for k in 0..200u64 {
            let mut a = 0;
            let mut b = 0;
            let direct = t.find(k, &mut a);
            let resumed = t.find_indexed(k, t.prefetch(k), &mut b);
            assert_eq!(direct, resumed);
            assert_eq!(a, b);
        }
    }
}
