//! A laboratory of `u64 -> u64` hash table designs behind one trait.
//!
//! Every table in this crate implements [`Table`], the same fixed-width
//! contract: insert, probe-counted lookup, membership, erase, and the split
//! `index_for`/`prefetch`/`find_indexed` path for software-pipelined batches
//! of dependent lookups. All tables share the same deterministic 64-bit mix
//! ([`hash::mix`], plus [`hash::mix2`] where a second independent choice is
//! needed), power-of-two capacities, and the all-ones key sentinels — so any
//! difference you measure between two tables is the collision-resolution
//! strategy, not incidental plumbing.
//!
//! The designs:
//!
//! - [`chaining::ChainingTable`]: linked overflow lists, the baseline.
//! - [`linear::LinearTable`]: linear probing, tombstones, no rehash.
//! - [`linear_rehash::LinearRehashTable`]: linear probing that rehashes in
//!   place once tombstones pass a deletion threshold.
//! - [`linear_shift::LinearShiftTable`]: linear probing with backward-shift
//!   deletion, no tombstones at all.
//! - [`linear_simd::LinearSimdTable`]: linear probing over split key/value
//!   arrays, probing four keys per step with a vector compare.
//! - [`quadratic::QuadraticTable`]: triangular-increment quadratic probing.
//! - [`double_hash::DoubleHashTable`]: a second hash-derived odd step.
//! - [`robin_hood::RobinHoodTable`]: Robin Hood insertion, hole-punch erase,
//!   misses bounded by the historical maximum displacement.
//! - [`robin_hood_shift::RobinHoodShiftTable`]: Robin Hood insertion with
//!   backward-shift deletion.
//! - [`robin_hood_desired::RobinHoodDesiredTable`]: Robin Hood with each
//!   entry's home slot stored beside it, enabling cheap shifts and
//!   displacement-ordered early exits on misses.
//! - [`two_way::TwoWayTable`]: two hash choices over small inline buckets.
//! - [`two_way_simd::TwoWaySimdTable`]: the same, with 4-wide vector bucket
//!   probes.
//!
//! Keys are bare `u64` with the top two values ([`EMPTY_KEY`],
//! [`DELETED_KEY`]) reserved as sentinels; callers must not insert them.
//! Lookups of absent keys are a caller error — see [`Table`] for exactly how
//! each operation treats them.

#![warn(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod chaining;
pub mod double_hash;
pub mod hash;
pub mod linear;
pub mod linear_rehash;
pub mod linear_shift;
pub mod linear_simd;
pub mod quadratic;
mod raw;
pub mod robin_hood;
pub mod robin_hood_desired;
pub mod robin_hood_shift;
mod simd;
pub mod table;
pub mod two_way;
pub mod two_way_simd;

pub use chaining::ChainingTable;
pub use double_hash::DoubleHashTable;
pub use hash::mix;
pub use hash::mix2;
pub use linear::LinearTable;
pub use linear_rehash::LinearRehashTable;
pub use linear_shift::LinearShiftTable;
pub use linear_simd::LinearSimdTable;
pub use quadratic::QuadraticTable;
pub use robin_hood::RobinHoodTable;
pub use robin_hood_desired::RobinHoodDesiredTable;
pub use robin_hood_shift::RobinHoodShiftTable;
pub use table::DELETED_KEY;
pub use table::EMPTY_KEY;
pub use table::Table;
pub use two_way::TwoWayTable;
pub use two_way_simd::TwoWaySimdTable;
