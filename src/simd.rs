//! Four-wide key matching used by the vector-accelerated tables.
//!
//! The algorithmic contract is fixed regardless of the code path taken: a
//! group of four consecutive `u64` keys is compared against one needle, and
//! the *lowest* matching lane wins. On x86-64 with AVX2 this is a 256-bit
//! equality compare, a byte movemask, and a trailing-zero count scaled down
//! by the lane width; everywhere else a scalar loop produces the identical
//! answer.

/// Lanes tested per probe group.
pub(crate) const GROUP: usize = 4;

cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))] {
        /// Returns the lowest lane in `keys[0..4]` equal to `key`, if any.
        ///
        /// # Safety
        ///
        /// `keys` must be valid for reading four consecutive `u64`s. No
        /// alignment is required; the load is unaligned.
        #[inline(always)]
        pub(crate) unsafe fn match4(keys: *const u64, key: u64) -> Option<usize> {
            use core::arch::x86_64::*;
            // SAFETY: caller guarantees four readable lanes; `loadu`
            // tolerates any alignment.
            unsafe {
                let group = _mm256_loadu_si256(keys as *const __m256i);
                let needle = _mm256_set1_epi64x(key as i64);
                let cmp = _mm256_cmpeq_epi64(group, needle);
                let mask = _mm256_movemask_epi8(cmp);
                if mask == 0 {
                    None
                } else {
                    // Eight mask bits per 64-bit lane; the trailing-zero
                    // count picks the lowest matching lane.
                    Some((mask.trailing_zeros() >> 3) as usize)
                }
            }
        }
    } else {
        /// Returns the lowest lane in `keys[0..4]` equal to `key`, if any.
        ///
        /// # Safety
        ///
        /// `keys` must be valid for reading four consecutive `u64`s.
        #[inline(always)]
        pub(crate) unsafe fn match4(keys: *const u64, key: u64) -> Option<usize> {
            for lane in 0..GROUP {
                // SAFETY: caller guarantees four readable lanes.
                if unsafe { *keys.add(lane) } == key {
                    return Some(lane);
                }
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_each_lane() {
        let keys = [10u64, 20, 30, 40];
        for (lane, &k) in keys.iter().enumerate() {
            // SAFETY: `keys` has exactly four lanes.
            assert_eq!(unsafe { match4(keys.as_ptr(), k) }, Some(lane));
        }
        // SAFETY: as above.
        assert_eq!(unsafe { match4(keys.as_ptr(), 50) }, None);
    }

    #[test]
    fn lowest_lane_wins_ties() {
        let keys = [7u64, 7, 7, 7];
        // SAFETY: `keys` has exactly four lanes.
        assert_eq!(unsafe { match4(keys.as_ptr(), 7) }, Some(0));

        let keys = [1u64, 9, 9, 2];
        // SAFETY: as above.
        assert_eq!(unsafe { match4(keys.as_ptr(), 9) }, Some(1));
    }

    #[test]
    fn matches_sentinels_like_any_key() {
        let keys = [u64::MAX, 3, u64::MAX - 1, 4];
        // SAFETY: `keys` has exactly four lanes.
        unsafe {
            assert_eq!(match4(keys.as_ptr(), u64::MAX), Some(0));
            assert_eq!(match4(keys.as_ptr(), u64::MAX - 1), Some(2));
        }
    }
}
