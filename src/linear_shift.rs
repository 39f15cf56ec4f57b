//! Tombstone-free linear probing with backward-shift deletion.

use crate::hash::mix;
use crate::raw::ByteInit;
use crate::raw::SlotBuf;
use crate::raw::prefetch_read;
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

/// Linear probing without tombstones.
///
/// Plain linear probing relies on there being no gap between a key's home
/// slot and wherever it ended up, so erase cannot simply empty a slot: it
/// empties the target, then lifts out and reinserts every entry in the
/// contiguous occupied run that follows, closing any gap a displaced key
/// depended on.
pub struct LinearShiftTable {
    slots: SlotBuf<Slot>,
    capacity: usize,
    len: usize,
    load_factor: u64,
}

impl LinearShiftTable {
    /// Creates an empty table with the default load factor (75%).
    pub fn new() -> Self {
        Self::with_load_factor(75)
    }

    /// Creates an empty table growing once `len` reaches
    /// `capacity * load_percent / 100`.
    pub fn with_load_factor(load_percent: u64) -> Self {
        LinearShiftTable {
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
            if slot.key < EMPTY_KEY {
                self.insert(slot.key, slot.value);
            }
        }
    }

    /// Reinserts the contiguous occupied run following a just-emptied slot.
    fn fix_up(&mut self, index: usize) {
        let mut next = (index + 1) & self.mask();
        while self.slots[next].key < EMPTY_KEY {
            let Slot { key, value } = self.slots[next];
            self.slots[next].key = EMPTY_KEY;
            self.len -= 1;
            self.insert(key, value);
            next = (next + 1) & self.mask();
        }
    }
}

impl Default for LinearShiftTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Table for LinearShiftTable {
    fn insert(&mut self, key: u64, value: u64) {
        if self.len >= threshold(self.capacity, self.load_factor) {
            self.grow();
        }
        let mut index = (mix(key) as usize) & self.mask();
        while self.slots[index].key < EMPTY_KEY {
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
                self.slots[index].key = EMPTY_KEY;
                self.len -= 1;
                self.fix_up(index);
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
            if slot.key < EMPTY_KEY {
                sum = sum.wrapping_add(slot.value);
            }
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every live key must remain reachable with no empty slot between its
    /// home and its position.
    fn assert_no_gaps(t: &LinearShiftTable, live: &[u64]) {
        let mut probes = 0;
        for &k in live {
            assert!(t.contains(k, &mut probes), "key {k} lost after shift");
        }
    }

    #[test]
    fn erase_shifts_displaced_entries_back() {
        let mut t = LinearShiftTable::with_load_factor(90);
        // Enough keys in a small table to force displacement chains.
        let keys: alloc::vec::Vec<u64> = (0..60).collect();
        for &k in &keys {
            t.insert(k, k * 2);
        }
        for (i, &k) in keys.iter().enumerate() {
            t.erase(k);
            assert_no_gaps(&t, &keys[i + 1..]);
        }
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn no_tombstones_means_fast_miss() {
        let mut t = LinearShiftTable::new();
        for k in 0..16u64 {
            t.insert(k, k);
        }
        for k in 0..16u64 {
            t.erase(k);
        }
        // With every slot empty again, a miss terminates on the first probe.
        let mut probes = 0;
        assert!(!t.contains(999, &mut probes));
        assert_eq!(probes, 0);
    }

    #[test]
    fn interleaved_churn_roundtrip() {
        let mut t = LinearShiftTable::new();
        for k in 0..128u64 {
            t.insert(k, k + 1);
        }
        for k in (0..128u64).step_by(3) {
            t.erase(k);
        }
        let mut probes = 0;
        for k in 0..128u64 {
            if k % 3 == 0 {
                assert!(!t.contains(k, &mut probes));
            } else {
                assert_eq!(t.find(k, &mut probes), k + 1);
            }
        }
    }
}
