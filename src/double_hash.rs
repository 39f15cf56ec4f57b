//! Double hashing with tombstones and periodic in-place rehash.

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

/// Derives the probe step from the high hash bits, forced odd so it is
/// coprime to the power-of-two capacity and the sequence visits every slot.
#[inline(always)]
fn hash_to_step(hash: u64) -> u64 {
    (hash >> 32) | 1
}

/// Double hashing: the step between probes is a second hash of the key
/// rather than a fixed stride, which removes secondary clustering.
///
/// The handle returned by `index_for`/`prefetch` is the *full hash*, not a
/// slot index — `find_indexed` needs the high bits to recover the step.
pub struct DoubleHashTable {
    slots: SlotBuf<Slot>,
    capacity: usize,
    len: usize,
    deleted: usize,
    load_factor: u64,
    deletion_factor: u64,
}

impl DoubleHashTable {
    /// Creates an empty table with the default load factor (75%) and
    /// deletion factor (50%).
    pub fn new() -> Self {
        Self::with_factors(75, 50)
    }

    /// Creates an empty table with explicit integer-percent load and
    /// deletion factors.
    pub fn with_factors(load_percent: u64, deletion_percent: u64) -> Self {
        DoubleHashTable {
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

impl Default for DoubleHashTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Table for DoubleHashTable {
    fn insert(&mut self, key: u64, value: u64) {
        if self.len >= threshold(self.capacity, self.load_factor) {
            self.reinsert_all(self.capacity * 2);
        }
        let hash = mix(key);
        let mut index = (hash as usize) & self.mask();
        if self.slots[index].key < DELETED_KEY {
            // Only derive the step once the home slot is taken.
            let step = hash_to_step(hash) as usize;
            while self.slots[index].key < DELETED_KEY {
                index = (index + step) & self.mask();
            }
        }
        self.slots[index] = Slot { key, value };
        self.len += 1;
    }

    fn find(&self, key: u64, probes: &mut u64) -> u64 {
        let hash = mix(key);
        let mut index = (hash as usize) & self.mask();
        let step = hash_to_step(hash) as usize;
        loop {
            if self.slots[index].key == key {
                return self.slots[index].value;
            }
            *probes += 1;
            index = (index + step) & self.mask();
        }
    }

    fn contains(&self, key: u64, probes: &mut u64) -> bool {
        let hash = mix(key);
        let mut index = (hash as usize) & self.mask();
        let step = hash_to_step(hash) as usize;
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
            index = (index + step) & self.mask();
        }
        false
    }

    fn erase(&mut self, key: u64) {
        let hash = mix(key);
        let mut index = (hash as usize) & self.mask();
        let step = hash_to_step(hash) as usize;
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
            index = (index + step) & self.mask();
        }
    }

    fn index_for(&self, key: u64) -> u64 {
        mix(key)
    }

    fn prefetch(&self, key: u64) -> u64 {
        let hash = mix(key);
        let index = (hash as usize) & self.mask();
        // SAFETY: `index` is masked below capacity.
        prefetch_read(unsafe { self.slots.as_ptr().add(index) });
        hash
    }

    fn find_indexed(&self, key: u64, handle: u64, probes: &mut u64) -> u64 {
        let mut index = (handle as usize) & self.mask();
        let step = hash_to_step(handle) as usize;
        loop {
            if self.slots[index].key == key {
                return self.slots[index].value;
            }
            *probes += 1;
            index = (index + step) & self.mask();
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
