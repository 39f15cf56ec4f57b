//! Robin Hood hashing with each entry's home slot stored alongside it.

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
    desired: u64,
    key: u64,
    value: u64,
}

// SAFETY: all three words are plain integers; all-ones keys the slot EMPTY.
unsafe impl ByteInit for Slot {
    const INIT: u8 = 0xFF;
}

/// Robin Hood hashing that stores each occupant's home index in its slot.
///
/// The stored home removes the hash recomputation from the insertion swap
/// decision, and it makes true backward-shift deletion cheap: after emptying
/// the erased slot, successors are pulled backward while their stored home
/// differs from their current slot. Runs therefore never contain gaps, so
/// `contains` may terminate early at the first empty slot or at the first
/// occupant whose displacement is smaller than the query's current distance.
pub struct RobinHoodDesiredTable {
    slots: SlotBuf<Slot>,
    capacity: usize,
    len: usize,
    load_factor: u64,
}

impl RobinHoodDesiredTable {
    /// Creates an empty table with the default load factor (75%).
    pub fn new() -> Self {
        Self::with_load_factor(75)
    }

    /// Creates an empty table growing once `len` reaches
    /// `capacity * load_percent / 100`.
    pub fn with_load_factor(load_percent: u64) -> Self {
        RobinHoodDesiredTable {
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
                // Stored homes are capacity-relative; reinsertion recomputes
                // them for the doubled mask.
                self.insert(slot.key, slot.value);
            }
        }
    }

    /// Pulls successors backward while their stored home shows displacement.
    fn shift_back(&mut self, mut index: usize) {
        loop {
            self.slots[index].key = EMPTY_KEY;
            let next = (index + 1) & self.mask();
            if self.slots[next].key == EMPTY_KEY {
                return;
            }
            if self.slots[next].desired as usize == next {
                return;
            }
            self.slots[index] = self.slots[next];
            index = next;
        }
    }
}

impl Default for RobinHoodDesiredTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Table for RobinHoodDesiredTable {
    fn insert(&mut self, mut key: u64, mut value: u64) {
        if self.len >= threshold(self.capacity, self.load_factor) {
            self.grow();
        }
        let mut desired = ((mix(key) as usize) & self.mask()) as u64;
        let mut index = desired as usize;
        let mut dist: u64 = 0;
        self.len += 1;
        loop {
            if self.slots[index].key == EMPTY_KEY {
                self.slots[index] = Slot {
                    desired,
                    key,
                    value,
                };
                return;
            }
            let occupant_desired = self.slots[index].desired;
            let occupant_dist =
                ((index + self.capacity - occupant_desired as usize) & self.mask()) as u64;
            if occupant_dist < dist {
                core::mem::swap(&mut key, &mut self.slots[index].key);
                core::mem::swap(&mut value, &mut self.slots[index].value);
                self.slots[index].desired = desired;
                desired = occupant_desired;
                dist = occupant_dist;
            }
            dist += 1;
            index = (index + 1) & self.mask();
        }
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
        let mut dist: u64 = 0;
        loop {
            if self.slots[index].key == EMPTY_KEY {
                return false;
            }
            if self.slots[index].key == key {
                return true;
            }
            // A richer occupant here means the query, were it present, would
            // have evicted it during insertion.
            let occupant_dist =
                ((index + self.capacity - self.slots[index].desired as usize) & self.mask()) as u64;
            if occupant_dist < dist {
                return false;
            }
            *probes += 1;
            dist += 1;
            index = (index + 1) & self.mask();
        }
    }

    fn erase(&mut self, key: u64) {
        let mut index = (mix(key) as usize) & self.mask();
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
