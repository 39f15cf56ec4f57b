//! Two-choice bucketized hashing with 4-wide vector bucket probes.

use crate::hash::mix;
use crate::hash::mix2;
use crate::raw::ByteInit;
use crate::raw::SlotBuf;
use crate::raw::prefetch_read;
use crate::simd::GROUP;
use crate::simd::match4;
use crate::table::EMPTY_KEY;
use crate::table::INITIAL_CAPACITY;
use crate::table::Table;

/// One 256-bit-wide bucket: four key lanes and four value lanes, aligned so
/// the key lanes are a single naturally aligned vector load.
#[derive(Clone, Copy)]
#[repr(C, align(32))]
struct Bucket {
    keys: [u64; GROUP],
    values: [u64; GROUP],
}

// SAFETY: the bucket is plain integer arrays; all-ones keys every lane EMPTY.
unsafe impl ByteInit for Bucket {
    const INIT: u8 = 0xFF;
}

impl Bucket {
    /// Lowest lane holding `key`, via one vector compare.
    #[inline(always)]
    fn lane_of(&self, key: u64) -> Option<usize> {
        // SAFETY: `keys` is exactly four readable lanes.
        unsafe { match4(self.keys.as_ptr(), key) }
    }

    /// Occupied lanes; the first EMPTY lane is the fill count because erase
    /// keeps occupancy a dense prefix.
    #[inline(always)]
    fn fill(&self) -> usize {
        self.lane_of(EMPTY_KEY).unwrap_or(GROUP)
    }

    /// Removes lane `i`, shifting later lanes left.
    #[inline(always)]
    fn remove(&mut self, i: usize) {
        for j in i..GROUP - 1 {
            self.keys[j] = self.keys[j + 1];
            self.values[j] = self.values[j + 1];
        }
        self.keys[GROUP - 1] = EMPTY_KEY;
    }
}

/// The vector-accelerated sibling of [`TwoWayTable`](crate::two_way::TwoWayTable),
/// fixed at 4-wide buckets.
///
/// Identical placement, growth, and compaction policy; the difference is that
/// every bucket probe — match, fill count, lane pick — is one 256-bit
/// equality compare plus a trailing-zeros scan of the lane mask.
pub struct TwoWaySimdTable {
    buckets: SlotBuf<Bucket>,
    capacity: usize,
    len: usize,
}

impl TwoWaySimdTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        TwoWaySimdTable {
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
            for lane in 0..GROUP {
                if bucket.keys[lane] == EMPTY_KEY {
                    break;
                }
                self.insert(bucket.keys[lane], bucket.values[lane]);
            }
        }
    }
}

impl Default for TwoWaySimdTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Table for TwoWaySimdTable {
    fn insert(&mut self, key: u64, value: u64) {
        let (index_1, index_2) = self.candidates(key);
        let n_1 = self.buckets[index_1].fill();
        let n_2 = self.buckets[index_2].fill();
        if n_1 == GROUP && n_2 == GROUP {
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
        let index_1 = (mix(key) as usize) & self.mask();
        if let Some(lane) = self.buckets[index_1].lane_of(key) {
            return self.buckets[index_1].values[lane];
        }
        *probes += 1;
        let index_2 = (mix2(key) as usize) & self.mask();
        if let Some(lane) = self.buckets[index_2].lane_of(key) {
            return self.buckets[index_2].values[lane];
        }
        panic!("find: key not present");
    }

    fn contains(&self, key: u64, probes: &mut u64) -> bool {
        let index_1 = (mix(key) as usize) & self.mask();
        if self.buckets[index_1].lane_of(key).is_some() {
            return true;
        }
        *probes += 1;
        let index_2 = (mix2(key) as usize) & self.mask();
        self.buckets[index_2].lane_of(key).is_some()
    }

    fn erase(&mut self, key: u64) {
        let (index_1, index_2) = self.candidates(key);
        if let Some(lane) = self.buckets[index_1].lane_of(key) {
            self.buckets[index_1].remove(lane);
            self.len -= 1;
            return;
        }
        if let Some(lane) = self.buckets[index_2].lane_of(key) {
            self.buckets[index_2].remove(lane);
            self.len -= 1;
            return;
        }
        panic!("erase: key not present");
    }

    fn index_for(&self, key: u64) -> u64 {
        ((mix(key) as usize) & self.mask()) as u64
    }

    /// Hints both candidate buckets.
    ///
    /// Quirk kept from the measured design: the hints touch the first
    /// candidate's key lanes and the second candidate's *value* lanes, each
    /// twice. Hints on the same cache line coalesce, so this mostly works
    /// out; only hint quality is affected, never correctness.
    fn prefetch(&self, key: u64) -> u64 {
        let (index_1, index_2) = self.candidates(key);
        // SAFETY: both indices are masked below capacity.
        unsafe {
            prefetch_read(self.buckets.as_ptr().add(index_1).cast::<u64>());
            prefetch_read(
                self.buckets
                    .as_ptr()
                    .add(index_2)
                    .cast::<u64>()
                    .add(GROUP),
            );
            prefetch_read(self.buckets.as_ptr().add(index_1).cast::<u64>());
            prefetch_read(
                self.buckets
                    .as_ptr()
                    .add(index_2)
                    .cast::<u64>()
                    .add(GROUP),
            );
        }
        index_1 as u64
    }

    fn find_indexed(&self, key: u64, handle: u64, probes: &mut u64) -> u64 {
        let index_1 = handle as usize;
        if let Some(lane) = self.buckets[index_1].lane_of(key) {
            return self.buckets[index_1].values[lane];
        }
        *probes += 1;
        let index_2 = (mix2(key) as usize) & self.mask();
        if let Some(lane) = self.buckets[index_2].lane_of(key) {
            return self.buckets[index_2].values[lane];
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
            for lane in 0..GROUP {
                if bucket.keys[lane] == EMPTY_KEY {
                    break;
                }
                sum = sum.wrapping_add(bucket.values[lane]);
            }
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_through_growth() {
        let mut t = TwoWaySimdTable::new();
        for k in 0..500u64 {
            t.insert(k, k.rotate_left(17));
        }
        let mut probes = 0;
        for k in 0..500u64 {
            assert_eq!(t.find(k, &mut probes), k.rotate_left(17));
        }
        assert_eq!(t.len(), 500);
    }

    #[test]
    fn fill_counts_dense_prefix() {
        let mut b = Bucket {
            keys: [EMPTY_KEY; GROUP],
            values: [0; GROUP],
        };
        assert_eq!(b.fill(), 0);
        for lane in 0..GROUP {
            b.keys[lane] = lane as u64;
            assert_eq!(b.fill(), lane + 1);
        }
    }

    #[test]
    fn remove_compacts_lanes() {
        let mut b = Bucket {
            keys: [10, 20, 30, EMPTY_KEY],
            values: [1, 2, 3, 0],
        };
        b.remove(0);
        assert_eq!(b.keys[..2], [20, 30]);
        assert_eq!(b.values[..2], [2, 3]);
        assert_eq!(b.fill(), 2);
    }

    #[test]
    fn erase_then_absent() {
        let mut t = TwoWaySimdTable::new();
        for k in 0..200u64 {
            t.insert(k, k);
        }
        for k in (0..200u64).step_by(2) {
            t.erase(k);
        }
        let mut probes = 0;
        for k in 0..200u64 {
            assert_eq!(t.contains(k, &mut probes), k % 2 == 1);
        }
        assert_eq!(t.len(), 100);
    }

    #[test]
    fn matches_scalar_sibling() {
        use crate::two_way::TwoWayTable;

        let mut simd = TwoWaySimdTable::new();
        let mut scalar: TwoWayTable<4> = TwoWayTable::new();
        for k in 0..300u64 {
            simd.insert(k, k * 13);
            scalar.insert(k, k * 13);
        }
        // Same hash pair, same policy: both tables agree on every answer.
        let mut probes = 0;
        for k in 0..300u64 {
            assert_eq!(
                simd.find(k, &mut probes),
                scalar.find(k, &mut probes)
            );
        }
        assert_eq!(simd.sum_all_values(), scalar.sum_all_values());
    }

    #[test]
    fn find_indexed_from_prefetch_handle() {
        let mut t = TwoWaySimdTable::new();
        for k in 0..100u64 {
            t.insert(k, k + 2);
        }
        for k in 0..100u64 {
            let handle = t.prefetch(k);
            assert_eq!(handle, t.index_for(k));
            let mut probes = 0;
            assert_eq!(t.find_indexed(k, handle, &mut probes), k + 2);
        }
    }
}
