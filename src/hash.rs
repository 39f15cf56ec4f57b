//! The fixed avalanche mix every table derives its slot indices from.
//!
//! Determinism matters here: growth and in-place rehashing both rely on a key
//! hashing to the same value every time it is mixed, so the mix carries no
//! per-table or per-process state.

/// Mixes a 64-bit key into a 64-bit pseudo-random value.
///
/// Squirrel3-style avalanche: three large-odd-constant multiply/add stages
/// interleaved with shift-xors. Not cryptographic; just cheap and well
/// distributed over the low bits, which is all masked indexing looks at.
#[inline(always)]
#[must_use]
pub const fn mix(key: u64) -> u64 {
    const BIT_NOISE1: u64 = 0x9E3779B185EBCA87;
    const BIT_NOISE2: u64 = 0xC2B2AE3D27D4EB4F;
    const BIT_NOISE3: u64 = 0x27D4EB2F165667C5;

    let mut at = key;
    at = at.wrapping_mul(BIT_NOISE1);
    at ^= at >> 8;
    at = at.wrapping_add(BIT_NOISE2);
    at ^= at << 8;
    at = at.wrapping_mul(BIT_NOISE3);
    at ^= at >> 8;
    at
}

/// Second, independent mix used by the two-way tables for their alternate
/// candidate bucket. Same avalanche shape as [`mix`] over a distinct constant
/// triple so the two index streams stay uncorrelated.
#[inline(always)]
#[must_use]
pub const fn mix2(key: u64) -> u64 {
    const BIT_NOISE1: u64 = 0xBF58476D1CE4E5B9;
    const BIT_NOISE2: u64 = 0x94D049BB133111EB;
    const BIT_NOISE3: u64 = 0xFF51AFD7ED558CCD;

    let mut at = key;
    at = at.wrapping_mul(BIT_NOISE1);
    at ^= at >> 8;
    at = at.wrapping_add(BIT_NOISE2);
    at ^= at << 8;
    at = at.wrapping_mul(BIT_NOISE3);
    at ^= at >> 8;
    at
}
