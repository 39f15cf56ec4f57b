//! Robin Hood hashing with backward-shift deletion, homes recomputed.

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

/// Robin Hood placement (as [`RobinHoodTable`](crate::robin_hood::RobinHoodTable))
/// with true backward-shift deletion instead of hole punching.
///
/// After emptying the erased slot, the following entries are pulled one slot
/// backward for as long as they are displaced from their (recomputed) home
/// slots, so runs stay gap-free and the distance invariant holds exactly.
/// `contains` still uses the historical `max_probe` bound, which remains
/// correct — just no longer tight — once shifts move entries closer to home.
pub struct RobinHoodShiftTable {
    slots: SlotBuf<Slot>,
    capacity: usize,
    len: usize,
    max_probe: u64,
    load_factor: u64,
}

impl RobinHoodShiftTable {
    /// Creates an empty table with the default load factor (75%).
    pub fn new() -> Self {
        Self::with_load_factor(75)
    }

    /// Creates an empty table growing once `len` reaches
    /// `capacity * load_percent / 100`.
    pub fn with_load_factor(load_percent: u64) -> Self {
        RobinHoodShiftTable {
            slots: SlotBuf::new(INITIAL_CAPACITY),
            capacity: INITIAL_CAPACITY,
            len: 0,
            max_probe: 0,
            load_factor: load_percent,
        }
    }

    #[inline(always)]
    fn mask(&self) -> usize {
        self.capacity - 1
    }

    #[inline(always)]
    fn home(&self, key: u64) -> usize {
        (mix(key) as usize) & self.mask()
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

    /// Pulls displaced successors backward into the slot just emptied.
    fn shift_back(&mut self, mut index: usize) {
        loop {
            self.slots[index].key = EMPTY_KEY;
            let next = (index + 1) & self.mask();
            let next_key = self.slots[next].key;
            if next_key == EMPTY_KEY || self.home(next_key) == next {
                return;
            }
            self.slots[index] = self.slots[next];
            index = next;
        }
    }
}

impl Default for RobinHoodShiftTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Table for RobinHoodShiftTable {
    fn insert(&mut self, mut key: u64, mut value: u64) {
        if self.len >= threshold(self.capacity, self.load_factor) {
            self.grow();
        }
        let mut index = self.home(key);
        let mut dist: u64 = 0;
        self.len += 1;
        loop {
            if self.slots[index].key == EMPTY_KEY {
                self.slots[index] = Slot { key, value };
                self.max_probe = self.max_probe.max(dist);
                return;
            }
            let occupant_home = self.home(self.slots[index].key);
            let occupant_dist =
                ((index + self.capacity - occupant_home) & self.mask()) as u64;
            if occupant_dist < dist {
                core::mem::swap(&mut key, &mut self.slots[index].key);
                core::mem::swap(&mut value, &mut self.slots[index].value);
                self.max_probe = self.max_probe.max(dist);
                dist = occupant_dist;
            }
            dist += 1;
            index = (index + 1) & self.mask();
        }
    }

    fn find(&self, key: u64, probes: &mut u64) -> u64 {
        let mut index = self.home(key);
        loop {
            if self.slots[index].key == key {
                return self.slots[index].value;
            }
            *probes += 1;
            index = (index + 1) & self.mask();
        }
    }

    fn contains(&self, key: u64, probes: &mut u64) -> bool {
        let mut index = self.home(key);
        let mut dist = 0;
        while dist <= self.max_probe {
            if self.slots[index].key == key {
                return true;
            }
            *probes += 1;
            dist += 1;
            index = (index + 1) & self.mask();
        }
        false
    }

    fn erase(&mut self, key: u64) {
        let mut index = self.home(key);
        loop {
            if self.slots[index].key == key {
                self.len -= 1;
                self.shift_back(index);
                return;
            }
            index = (index + 1) & self.mask();
        }
    }

    fn index_for(&self, key: u64) -> u64 {
        self.home(key) as u64
    }

    fn prefetch(&self, key: u64) -> u64 {
        let index = self.home(key);
        // SAFETY: `index` is masked below capacity.
        prefetch_read(unsafe { self.slots.as_ptr().add(index) });
        index as u64
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
        self.max_probe = 0;
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

    /// After any erase, no occupied slot may have an empty slot between it
    /// and its home.
    fn assert_runs_gap_free(t: &RobinHoodShiftTable) {
        for index in 0..t.capacity {
            let key = t.slots[index].key;
            if key == EMPTY_KEY {
                continue;
            }
            let mut walk = t.home(key);
            while walk != index {
                assert_ne!(
                    t.slots[walk].key, EMPTY_KEY,
                    "gap between home and slot for key {key}"
                );
                walk = (walk + 1) & t.mask();
            }
        }
    }

    #[test]
    fn shift_closes_gaps() {
        let mut t = RobinHoodShiftTable::with_load_factor(90);
        for k in 0..200u64 {
            t.insert(k, k);
        }
        for k in (0..200u64).step_by(3) {
            t.erase(k);
            assert_runs_gap_free(&t);
        }
        let mut probes = 0;
        for k in 0..200u64 {
            assert_eq!(t.contains(k, &mut probes), k % 3 != 0);
        }
    }

    #[test]
    fn entries_at_home_are_not_pulled() {
        let mut t = RobinHoodShiftTable::new();
        for k in 0..32u64 {
            t.insert(k, k);
        }
        for k in 0..32u64 {
            t.erase(k);
            assert_runs_gap_free(&t);
        }
        assert_eq!(t.len(), 0);
        assert!(t.slots.iter().all(|s| s.key == EMPTY_KEY));
    }

    #[test]
    fn roundtrip_through_growth() {
        let mut t = RobinHoodShiftTable::new();
        for k in 0..300u64 {
            t.insert(k, k ^ 0x5A5A);
        }
        let mut probes = 0;
        for k in 0..300u64 {
            assert_eq!(t.find(k, &mut probes), k ^ 0x5A5A);
        }
    }
}
