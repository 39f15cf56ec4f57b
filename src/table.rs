//! The shared contract every table variant implements.

/// Key value reserved to mark an empty slot.
///
/// All-ones so a freshly 0xFF-filled slot array reads as entirely empty, and
/// so "occupied" is the single comparison `key < DELETED_KEY`.
pub const EMPTY_KEY: u64 = u64::MAX;

/// Key value reserved to mark a tombstoned slot in the variants that use
/// tombstone deletion.
pub const DELETED_KEY: u64 = u64::MAX - 1;

/// Initial slot-array capacity for every variant.
pub const INITIAL_CAPACITY: usize = 8;

/// Slot count at which a table with `capacity` slots and an integer-percent
/// factor crosses its growth (or tombstone-rehash) threshold.
#[inline(always)]
pub(crate) fn threshold(capacity: usize, percent: u64) -> usize {
    ((capacity as u128 * percent as u128) / 100) as usize
}

/// A fixed-key-width hash table storing `u64 -> u64`.
///
/// All variants implement this contract independently so a caller can drive
/// any of them polymorphically. Keys live in the full `u64` domain minus the
/// two reserved sentinels: [`EMPTY_KEY`] and [`DELETED_KEY`] must never be
/// supplied as real keys. Values are unrestricted.
///
/// # Preconditions
///
/// For performance, several operations trust the caller instead of checking:
///
/// - [`insert`](Table::insert) assumes the key is not already present.
/// - [`find`](Table::find), [`find_indexed`](Table::find_indexed), and
///   [`erase`](Table::erase) assume the key *is* present. Variants whose
///   search space is structurally finite (chaining, two-way buckets) panic if
///   the assumption is violated; open-addressing variants probe forever.
/// - [`contains`](Table::contains) has no precondition and always terminates.
///
/// # Probe counters
///
/// `find`/`contains`/`find_indexed` take a `probes` accumulator that is
/// incremented once per slot comparison examined before the answer (the
/// vector variants add their group width per group tested). Callers use it to
/// report probe-length statistics; the tables never read it.
///
/// # Handles
///
/// [`index_for`](Table::index_for) returns the primary candidate location for
/// a key without searching, and [`prefetch`](Table::prefetch) additionally
/// hints the corresponding cache line(s); both return an opaque handle
/// accepted by [`find_indexed`](Table::find_indexed). A handle is valid only
/// until the next structural mutation (growth or rehash) — stale handles make
/// `find_indexed` undefined in the same way as an absent key.
pub trait Table {
    /// Inserts `key` with `value`, growing first if the load-factor threshold
    /// is reached. Assumes `key` is not present.
    fn insert(&mut self, key: u64, value: u64);

    /// Returns the value stored for `key`. Assumes `key` is present.
    fn find(&self, key: u64, probes: &mut u64) -> u64;

    /// Returns whether `key` is present. Bounded; always terminates.
    fn contains(&self, key: u64, probes: &mut u64) -> bool;

    /// Removes `key`. Assumes `key` is present. Tombstone variants may
    /// trigger an in-place rehash once enough deletions accumulate.
    fn erase(&mut self, key: u64);

    /// Primary candidate location for `key`, without searching.
    fn index_for(&self, key: u64) -> u64;

    /// Hints the cache line(s) `key` likely lives on and returns the same
    /// handle as [`index_for`](Table::index_for).
    fn prefetch(&self, key: u64) -> u64;

    /// Like [`find`](Table::find), but resumes from a handle previously
    /// returned by `index_for`/`prefetch` instead of recomputing the hash.
    fn find_indexed(&self, key: u64, handle: u64, probes: &mut u64) -> u64;

    /// Removes every entry, retaining the current capacity.
    fn clear(&mut self);

    /// Number of live entries. Never counts tombstones.
    fn len(&self) -> usize;

    /// Whether the table holds no live entries.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current heap footprint in bytes, including the table header itself.
    fn memory_usage(&self) -> usize;

    /// Sums the values of every live entry, visiting each exactly once.
    ///
    /// Doubles as a correctness check and a structure-aware full-scan
    /// benchmark.
    fn sum_all_values(&self) -> u64;
}
