//! Classic Robin Hood hashing with recomputed probe distances.

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

/// Swap-based Robin Hood hashing.
///
/// Insertion walks the linear probe sequence comparing its own displacement
/// against each occupant's distance from *its* home slot (recomputed from the
/// hash, not stored). Whenever the incoming entry is poorer — displaced
/// further — the two swap and insertion continues carrying the evictee. This
/// caps the variance of probe lengths.
///
/// Erase simply empties the slot, which punches holes into runs, so lookups
/// cannot stop at the first empty slot: `contains` instead walks exactly
/// `max_probe + 1` steps, where `max_probe` is the largest displacement any
/// insertion has ever produced. `max_probe` never decreases.
pub struct RobinHoodTable {
    slots: SlotBuf<Slot>,
    capacity: usize,
    len: usize,
    max_probe: u64,
    load_factor: u64,
}

impl RobinHoodTable {
    /// Creates an empty table with the default load factor (75%).
    pub fn new() -> Self {
        Self::with_load_factor(75)
    }

    /// Creates an empty table growing once `len` reaches
    /// `capacity * load_percent / 100`.
    pub fn with_load_factor(load_percent: u64) -> Self {
        RobinHoodTable {
            slots: SlotBuf::new(INITIAL_CAPACITY),
            capacity: INITIAL_CAPACITY,
            len: 0,
            max_probe: 0,
            load_factor: load_percent,
        }
    }

    /// Largest displacement produced by any insertion so far.
    pub fn max_probe(&self) -> u64 {
        self.max_probe
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
}

impl Default for RobinHoodTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Table for RobinHoodTable {
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
        // Deletion holes can sit inside a run, so an empty slot does not
        // prove absence; only exceeding the historical bound does.
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
                self.slots[index].key = EMPTY_KEY;
                self.len -= 1;
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

    #[test]
    fn roundtrip_and_bounded_contains() {
        let mut t = RobinHoodTable::new();
        for k in 0..300u64 {
            t.insert(k, k * 5);
        }
        let mut probes = 0;
        for k in 0..300u64 {
            assert_eq!(t.find(k, &mut probes), k * 5);
        }
        // Every positive lookup must finish within the advertised bound.
        for k in 0..300u64 {
            let mut p = 0;
            assert!(t.contains(k, &mut p));
            assert!(p <= t.max_probe() + 1, "probe {p} > bound for key {k}");
        }
    }

    #[test]
    fn max_probe_is_monotone() {
        let mut t = RobinHoodTable::with_load_factor(90);
        let mut last = 0;
        for k in 0..400u64 {
            t.insert(k, k);
            let bound = t.max_probe();
            assert!(bound >= last, "max_probe decreased: {last} -> {bound}");
            last = bound;
        }
    }

    #[test]
    fn displacement_variance_is_bounded_by_invariant() {
        // After a dense fill, no occupant may sit further from home than an
        // empty-slot claimant would have: verify by recomputing distances.
        let mut t = RobinHoodTable::with_load_factor(90);
        for k in 0..900u64 {
            t.insert(k, k);
        }
        for index in 0..t.capacity {
            let key = t.slots[index].key;
            if key == EMPTY_KEY {
                continue;
            }
            let dist = ((index + t.capacity - t.home(key)) & t.mask()) as u64;
            assert!(dist <= t.max_probe());
        }
    }

    #[test]
    fn contains_after_erase_hole() {
        let mut t = RobinHoodTable::new();
        for k in 0..64u64 {
            t.insert(k, k);
        }
        // Punch holes; remaining keys must still be found despite empty
        // slots inside their runs.
        for k in (0..64u64).step_by(2) {
            t.erase(k);
        }
        let mut probes = 0;
        for k in 0..64u64 {
            assert_eq!(t.contains(k, &mut probes), k % 2 == 1);
        }
    }

    #[test]
    fn clear_resets_probe_bound() {
        let mut t = RobinHoodTable::with_load_factor(90);
        for k in 0..500u64 {
            t.insert(k, k);
        }
        t.clear();
        assert_eq!(t.max_probe(), 0);
        assert_eq!(t.len(), 0);
        let mut probes = 0;
        assert!(!t.contains(1, &mut probes));
        assert_eq!(probes, 1);
    }
}
