//! Two-choice hashing with small inline buckets, scalar probing.

use crate::hash::mix;
use crate::hash::mix2;
use crate::raw::ByteInit;
use crate::raw::SlotBuf;
use crate::raw::prefetch_read;
use crate::table::EMPTY_KEY;
use crate::table::INITIAL_CAPACITY;
use crate::table::Table;

#[derive(Clone, Copy)]
#[repr(C)]
struct Bucket<const B: usize> {
    keys: [u64; B],
    values: [u64; B],
}

// SAFETY: the bucket is plain integer arrays; all-ones keys every lane EMPTY.
unsafe impl<const B: usize> ByteInit for Bucket<B> {
    const INIT: u8 = 0xFF;
}

impl<const B: usize> Bucket<B> {
    /// Occupied lanes, counted by scanning for the first empty lane. Valid
    /// because erase compacts lanes into a dense prefix.
    #[inline(always)]
    fn fill(&self) -> usize {
        let mut n = 0;
        while n < B && self.keys[n] < EMPTY_KEY {
            n += 1;
        }
        n
    }

    /// Removes lane `i`, shifting later lanes left to keep the prefix dense.
    #[inline(always)]
    fn remove(&mut self, i: usize) {
        for j in i..B - 1 {
            self.keys[j] = self.keys[j + 1];
            self.values[j] = self.values[j + 1];
        }
        self.keys[B - 1] = EMPTY_KEY;
    }
}

/// Two-way bucketized hashing with `B`-wide inline buckets.
///
/// Two independent mixes pick two candidate buckets; insertion takes the
/// emptier one (ties favor the first). There is no load factor: the table
/// doubles only when an insert finds both candidates full, then retries.
/// Erase compacts the bucket so occupancy is always a dense prefix, which is
/// what lets insertion count a bucket's fill by scanning for the first empty
/// lane.
pub struct TwoWayTable<const B: usize = 4> {
    buckets: SlotBuf<Bucket<B>>,
    capacity: usize,
    len: usize,
}

impl<const B: usize> TwoWayTable<B> {
    /// Creates an empty table.
    pub fn new() -> Self {
        TwoWayTable {
            buckets: SlotBuf::new(INITIAL_CAPACITY),
            capacity: INITIAL_CAPACITY,
            len: 0,
        }
    }

    #[inline(always)]
    fn mask(&self) -> usize {
        self.capacity - 1
    }

    #[inline(always)]
    fn candidates(&self, key: u64) -> (usize, usize) {
        (
            (mix(key) as usize) & self.mask(),
            (mix2(key) as usize) & self.mask(),
        )
    }

    fn grow(&mut self) {
        let old = core::mem::replace(&mut self.buckets, SlotBuf::new(self.capacity * 2));
        self.capacity *= 2;
        self.len = 0;
        for bucket in old.iter() {
            for lane in 0..B {
                if bucket.keys[lane] == EMPTY_KEY {
                    break;
                }
                self.insert(bucket.keys[lane], bucket.values[lane]);
            }
        }
    }
}

impl<const B: usize> Default for TwoWayTable<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const B: usize> Table for TwoWayTable<B> {
    fn insert(&mut self, key: u64, value: u64) {
        let (index_1, index_2) = self.candidates(key);
        let n_1 = self.buckets[index_1].fill();
        let n_2 = self.buckets[index_2].fill();
        if n_1 == B && n_2 == B {
            self.grow();
            self.insert(key, value);
            return;
        }
        let (index, lane) = if n_1 <= n_2 {
            (index_1, n_1)
        } else {
            (index_2, n_2)
        };
        self.buckets[index].keys[lane] = key;
        self.buckets[index].values[lane] = value;
        self.len += 1;
    }

    fn find(&self, key: u64, probes: &mut u64) -> u64 {
        let (index_1, index_2) = self.candidates(key);
        let bucket_1 = &self.buckets[index_1];
        let bucket_2 = &self.buckets[index_2];
        for i in 0..B {
            if bucket_1.keys[i] == key {
                return bucket_1.values[i];
            }
            *probes += 1;
            if bucket_2.keys[i] == key {
                return bucket_2.values[i];
            }
            *probes += 1;
        }
        panic!("find: key not present");
    }

    fn contains(&self, key: u64, probes: &mut u64) -> bool {
        let (index_1, index_2) = self.candidates(key);
        let bucket_1 = &self.buckets[index_1];
        let bucket_2 = &self.buckets[index_2];
        for i in 0..B {
            if bucket_1.keys[i] == EMPTY_KEY && bucket_2.keys[i] == EMPTY_KEY {
                return false;
            }
            if bucket_1.keys[i] == key {
                return true;
            }
            *probes += 1;
            if bucket_2.keys[i] == key {
                return true;
            }
            *probes += 1;
        }
        false
    }

    fn erase(&mut self, key: u64) {
        let (index_1, index_2) = self.candidates(key);
        for i in 0..B {
            if self.buckets[index_1].keys[i] == key {
                self.buckets[index_1].remove(i);
                self.len -= 1;
                return;
            }
            if self.buckets[index_2].keys[i] == key {
                self.buckets[index_2].remove(i);
                self.len -= 1;
                return;
            }
        }
        panic!("erase: key not present");
    }

    fn index_for(&self, key: u64) -> u64 {
        ((mix(key) as usize) & self.mask()) as u64
    }

    /// Hints both candidate buckets.
    ///
    /// Quirk kept from the measured design: both candidate indices here are
    /// derived from [`mix`], while every lookup derives the second candidate
    /// from [`mix2`] — so the second hint can touch the wrong line. Only
    /// hint quality is affected, never correctness.
    fn prefetch(&self, key: u64) -> u64 {
        let index_1 = (mix(key) as usize) & self.mask();
        let index_2 = (mix(key) as usize) & self.mask();
        // SAFETY: both indices are masked below capacity.
        unsafe {
            prefetch_read(self.buckets.as_ptr().add(index_1));
            prefetch_read(self.buckets.as_ptr().add(index_2));
        }
        index_1 as u64
    }

    fn find_indexed(&self, key: u64, handle: u64, probes: &mut u64) -> u64 {
        let index_1 = handle as usize;
        let index_2 = (mix2(key) as usize) & self.mask();
        let bucket_1 = &self.buckets[index_1];
        let bucket_2 = &self.buckets[index_2];
        for i in 0..B {
            if bucket_1.keys[i] == key {
                return bucket_1.values[i];
            }
            *probes += 1;
            if bucket_2.keys[i] == key {
                return bucket_2.values[i];
            }
            *probes += 1;
        }
        panic!("find_indexed: key not present");
    }

    fn clear(&mut self) {
        self.len = 0;
        self.buckets.reset();
    }

    fn len(&self) -> usize {
        self.len
    }

    fn memory_usage(&self) -> usize {
        self.buckets.allocated_bytes() + size_of::<Self>()
    }

    fn sum_all_values(&self) -> u64 {
        let mut sum = 0u64;
        for bucket in self.buckets.iter() {
            for lane in 0..B {
                if bucket.keys[lane] == EMPTY_KEY {
                    break;
                }
                sum = sum.wrapping_add(bucket.values[lane]);
            }
        }
        sum
    }
}
