//! Linear probing with a 4-wide vector-accelerated lookup path.

use crate::hash::mix;
use crate::raw::SlotBuf;
use crate::raw::prefetch_read;
use crate::simd::GROUP;
use crate::simd::match4;
use crate::table::DELETED_KEY;
use crate::table::EMPTY_KEY;
use crate::table::INITIAL_CAPACITY;
use crate::table::Table;
use crate::table::threshold;

/// Tombstone-based linear probing whose `find` tests four slots per step.
///
/// Keys and values live in split arrays so a probe group of four keys is one
/// 256-bit load. Placement and removal are identical to
/// [`LinearTable`](crate::linear::LinearTable); only the lookup path is
/// vectorized. `index_for` aligns the starting index down to a multiple of
/// four so every group load is naturally aligned to the scan width.
pub struct LinearSimdTable {
    keys: SlotBuf<u64>,
    values: SlotBuf<u64>,
    capacity: usize,
    len: usize,
    load_factor: u64,
}

impl LinearSimdTable {
    /// Creates an empty table with the default load factor (75%).
    pub fn new() -> Self {
        Self::with_load_factor(75)
    }

    /// Creates an empty table growing once `len` reaches
    /// `capacity * load_percent / 100`.
    pub fn with_load_factor(load_percent: u64) -> Self {
        LinearSimdTable {
            keys: SlotBuf::new(INITIAL_CAPACITY),
            values: SlotBuf::new(INITIAL_CAPACITY),
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
        let old_keys = core::mem::replace(&mut self.keys, SlotBuf::new(self.capacity * 2));
        let old_values = core::mem::replace(&mut self.values, SlotBuf::new(self.capacity * 2));
        self.capacity *= 2;
        self.len = 0;
        for (&key, &value) in old_keys.iter().zip(old_values.iter()) {
            if key < DELETED_KEY {
                self.insert(key, value);
            }
        }
    }

    /// Scans groups of four from `index` (a multiple of four) until the key's
    /// lane is found. Capacity is a power of two of at least eight, so a
    /// group never runs off the end of the array.
    #[inline(always)]
    fn find_from_group(&self, key: u64, mut index: usize, probes: &mut u64) -> u64 {
        loop {
            // SAFETY: `index` is group-aligned and masked below capacity, so
            // `index + 3` is in bounds.
            if let Some(lane) = unsafe { match4(self.keys.as_ptr().add(index), key) } {
                return self.values[index + lane];
            }
            *probes += GROUP as u64;
            index = (index + GROUP) & self.mask();
        }
    }
}

impl Default for LinearSimdTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Table for LinearSimdTable {
    fn insert(&mut self, key: u64, value: u64) {
        if self.len >= threshold(self.capacity, self.load_factor) {
            self.grow();
        }
        let mut index = (mix(key) as usize) & self.mask();
        while self.keys[index] < DELETED_KEY {
            index = (index + 1) & self.mask();
        }
        self.keys[index] = key;
        self.values[index] = value;
        self.len += 1;
    }

    fn find(&self, key: u64, probes: &mut u64) -> u64 {
        let index = (mix(key) as usize) & self.mask() & !(GROUP - 1);
        self.find_from_group(key, index, probes)
    }

    fn contains(&self, key: u64, probes: &mut u64) -> bool {
        let mut index = (mix(key) as usize) & self.mask();
        let mut dist = 0;
        while self.keys[index] < EMPTY_KEY {
            if dist == self.capacity {
                return false;
            }
            dist += 1;
            if self.keys[index] == key {
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
            if self.keys[index] == key {
                self.keys[index] = DELETED_KEY;
                self.len -= 1;
                return;
            }
            index = (index + 1) & self.mask();
        }
    }

    fn index_for(&self, key: u64) -> u64 {
        ((mix(key) as usize) & self.mask() & !(GROUP - 1)) as u64
    }

    fn prefetch(&self, key: u64) -> u64 {
        let index = self.index_for(key) as usize;
        // Hints on the same cache line coalesce; touching both ends of the
        // group covers a straddle.
        // SAFETY: `index` is group-aligned and masked below capacity.
        unsafe {
            prefetch_read(self.keys.as_ptr().add(index));
            prefetch_read(self.keys.as_ptr().add(index + GROUP - 1));
            prefetch_read(self.values.as_ptr().add(index));
            prefetch_read(self.values.as_ptr().add(index + GROUP - 1));
        }
        index as u64
    }

    fn find_indexed(&self, key: u64, handle: u64, probes: &mut u64) -> u64 {
        self.find_from_group(key, handle as usize, probes)
    }

    fn clear(&mut self) {
        self.len = 0;
        self.keys.reset();
    }

    fn len(&self) -> usize {
        self.len
    }

    fn memory_usage(&self) -> usize {
        self.keys.allocated_bytes() + self.values.allocated_bytes() + size_of::<Self>()
    }

    fn sum_all_values(&self) -> u64 {
        let mut sum = 0u64;
        for (&key, &value) in self.keys.iter().zip(self.values.iter()) {
            if key < DELETED_KEY {
                sum = sum.wrapping_add(value);
            }
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_find_matches_inserted_values() {
        let mut t = LinearSimdTable::new();
        for k in 0..256u64 {
            t.insert(k, k.wrapping_mul(0x1234_5678));
        }
        let mut probes = 0;
        for k in 0..256u64 {
            assert_eq!(t.find(k, &mut probes), k.wrapping_mul(0x1234_5678));
        }
    }

    #[test]
    fn index_for_is_group_aligned() {
        let mut t = LinearSimdTable::new();
        for k in 0..64u64 {
            t.insert(k, k);
        }
        for k in 0..64u64 {
            assert_eq!(t.index_for(k) % GROUP as u64, 0);
        }
    }

    #[test]
    fn probes_counted_per_group() {
        let mut t = LinearSimdTable::new();
        for k in 0..64u64 {
            t.insert(k, k);
        }
        let mut probes = 0;
        for k in 0..64u64 {
            t.find(k, &mut probes);
        }
        assert_eq!(probes % GROUP as u64, 0);
    }

    #[test]
    fn find_indexed_from_prefetch_handle() {
        let mut t = LinearSimdTable::new();
        for k in 0..128u64 {
            t.insert(k, k + 9);
        }
        for k in 0..128u64 {
            let handle = t.prefetch(k);
            let mut probes = 0;
            assert_eq!(t.find_indexed(k, handle, &mut probes), k + 9);
        }
    }

    #[test]
    fn tombstoned_keys_are_absent() {
        let mut t = LinearSimdTable::new();
        for k in 0..64u64 {
            t.insert(k, k);
        }
        for k in 0..32u64 {
            t.erase(k);
        }
        let mut probes = 0;
        for k in 0..64u64 {
            assert_eq!(t.contains(k, &mut probes), k >= 32);
        }
        assert_eq!(t.len(), 32);
    }
}
