//! Basic linear probing with tombstone deletion.

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

/// Linear probing, step 1, with tombstones.
///
/// Erase marks the slot [`DELETED_KEY`]; insertion reuses the first tombstone
/// or empty slot it scans past. Tombstones are never reclaimed in bulk — see
/// [`LinearRehashTable`](crate::linear_rehash::LinearRehashTable) for the
/// variant that rehashes them away.
pub struct LinearTable {
    slots: SlotBuf<Slot>,
    capacity: usize,
    len: usize,
    load_factor: u64,
}

impl LinearTable {
    /// Creates an empty table with the default load factor (75%).
    pub fn new() -> Self {
        Self::with_load_factor(75)
    }

    /// Creates an empty table growing once `len` reaches
    /// `capacity * load_percent / 100`.
    pub fn with_load_factor(load_percent: u64) -> Self {
        LinearTable {
            slots: SlotBuf::new(INITIAL_CAPACITY),
            capacity: INITIAL_CAPACITY,
            len: 0,
            load_factor: load_percent,
        }
    }

    #[inline(always)]
    fn mask(&self) -> usize {
        self.capacity - 1
    }

    fn grow(&mut self) {
        let old = core::mem::replace(&mut self.slots, SlotBuf::new(self.capacity * 2));
        self.capacity *= 2;
        self.len = 0;
        for slot in old.iter() {
            if slot.key < DELETED_KEY {
                self.insert(slot.key, slot.value);
            }
        }
    }
}

impl Default for LinearTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Table for LinearTable {
    fn insert(&mut self, key: u64, value: u64) {
        if self.len >= threshold(self.capacity, self.load_factor) {
            self.grow();
        }
        let mut index = (mix(key) as usize) & self.mask();
        while self.slots[index].key < DELETED_KEY {
            index = (index + 1) & self.mask();
        }
        self.slots[index] = Slot { key, value };
        self.len += 1;
    }

    fn find(&self, key: u64, probes: &mut u64) -> u64 {
        let mut index = (mix(key) as usize) & self.mask();
        loop {
            if self.slots[index].key == key {
                return self.slots[index].value;
            }
            *probes += 1;
            index = (index + 1) & self.mask();
        }
    }

    fn contains(&self, key: u64, probes: &mut u64) -> bool {
        let mut index = (mix(key) as usize) & self.mask();
        let mut dist = 0;
        // Tombstones keep the scan alive, so the walk must be bounded by
        // capacity to terminate on a fully tombstoned table.
        while self.slots[index].key < EMPTY_KEY {
            if dist == self.capacity {
                return false;
            }
            dist += 1;
            if self.slots[index].key == key {
                return true;
            }
            *probes += 1;
            index = (index + 1) & self.mask();
        }
        false
    }

    fn erase(&mut self, key: u64) {
        let mut index = (mix(key) as usize) & self.mask();
        loop {
            if self.slots[index].key == key {
                self.slots[index].key = DELETED_KEY;
                self.len -= 1;
                return;
            }
            index = (index + 1) & self.mask();
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
        loop {
            if self.slots[index].key == key {
                return self.slots[index].value;
            }
            *probes += 1;
            index = (index + 1) & self.mask();
        }
    }

    fn clear(&mut self) {
        self.len = 0;
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

    #[test]
    fn insert_find_roundtrip() {
        let mut t = LinearTable::new();
        for k in 0..64u64 {
            t.insert(k, k * 3);
        }
        assert_eq!(t.len(), 64);
        let mut probes = 0;
        for k in 0..64u64 {
            assert_eq!(t.find(k, &mut probes), k * 3);
        }
    }

    #[test]
    fn tombstone_is_reused_by_insert() {
        let mut t = LinearTable::with_load_factor(90);
        for k in 0..5u64 {
            t.insert(k, k);
        }
        let mem_before = t.memory_usage();
        t.erase(2);
        t.insert(2, 99);
        // Reusing the tombstone means no growth was needed.
        assert_eq!(t.memory_usage(), mem_before);
        let mut probes = 0;
        assert_eq!(t.find(2, &mut probes), 99);
    }

    #[test]
    fn contains_terminates_when_heavily_tombstoned() {
        let mut t = LinearTable::with_load_factor(90);
        for k in 0..7u64 {
            t.insert(k, k);
        }
        for k in 0..7u64 {
            t.erase(k);
        }
        let mut probes = 0;
        assert!(!t.contains(1000, &mut probes));
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn erase_then_absent() {
        let mut t = LinearTable::new();
        for k in 0..32u64 {
            t.insert(k, k);
        }
        for k in (0..32u64).step_by(2) {
            t.erase(k);
        }
        assert_eq!(t.len(), 16);
        let mut probes = 0;
        for k in 0..32u64 {
            assert_eq!(t.contains(k, &mut probes), k % 2 == 1);
        }
    }

    #[test]
    fn find_indexed_matches_find() {
        let mut t = LinearTable::new();
        for k in 0..100u64 {
            t.insert(k, k + 7);
        }
        for k in 0..100u64 {
            let handle = t.prefetch(k);
            assert_eq!(handle, t.index_for(k));
            let mut probes = 0;
            assert_eq!(t.find_indexed(k, handle, &mut probes), k + 7);
        }
    }

    #[test]
    fn clear_retains_capacity() {
        let mut t = LinearTable::new();
        for k in 0..100u64 {
            t.insert(k, k);
        }
        let mem = t.memory_usage();
        t.clear();
        assert_eq!(t.len(), 0);
        assert_eq!(t.memory_usage(), mem);
        let mut probes = 0;
        assert!(!t.contains(5, &mut probes));
    }
}
