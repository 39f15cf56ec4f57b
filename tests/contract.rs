//! One end-to-end scenario, run against every table variant.
//!
//! Each table implements the shared contract independently, so the same
//! insert/find/erase/reinsert churn must behave identically on all of them.

use probe_lab::ChainingTable;
use probe_lab::DoubleHashTable;
use probe_lab::LinearRehashTable;
use probe_lab::LinearShiftTable;
use probe_lab::LinearSimdTable;
use probe_lab::LinearTable;
use probe_lab::QuadraticTable;
use probe_lab::RobinHoodDesiredTable;
use probe_lab::RobinHoodShiftTable;
use probe_lab::RobinHoodTable;
use probe_lab::Table;
use probe_lab::TwoWaySimdTable;
use probe_lab::TwoWayTable;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

const N: u64 = 1024;

fn churn_scenario<T: Table>(mut table: T) {
    assert!(table.is_empty());

    // Insert in shuffled order, with the values a permutation of the keys,
    // so placement tracks neither key nor value order.
    let mut rng = SmallRng::seed_from_u64(0x5EED);
    let mut keys: Vec<u64> = (0..N).collect();
    keys.shuffle(&mut rng);
    let mut values: Vec<u64> = (0..N).collect();
    values.shuffle(&mut rng);
    for &k in &keys {
        table.insert(k, values[k as usize]);
    }
    assert_eq!(table.len(), N as usize);
    assert!(!table.is_empty());

    let mut probes = 0;
    for k in 0..N {
        assert_eq!(table.find(k, &mut probes), values[k as usize]);
        assert!(table.contains(k, &mut probes));
    }

    // The pipelined path answers the same as the direct path.
    for k in 0..N {
        let handle = table.prefetch(k);
        assert_eq!(handle, table.index_for(k));
        assert_eq!(table.find_indexed(k, handle, &mut probes), values[k as usize]);
    }

    // Misses from a disjoint key range always come back negative.
    for k in N..N + 100 {
        assert!(!table.contains(k, &mut probes));
    }

    // A permutation of 0..N sums to N(N-1)/2 no matter where entries landed.
    assert_eq!(table.sum_all_values(), N * (N - 1) / 2);

    // Drain completely, in a different shuffled order.
    keys.shuffle(&mut rng);
    for &k in &keys {
        table.erase(k);
    }
    assert_eq!(table.len(), 0);
    assert!(table.is_empty());
    assert_eq!(table.sum_all_values(), 0);
    for k in 0..N {
        assert!(!table.contains(k, &mut probes));
    }

    // A drained table accepts a fresh, disjoint generation of keys.
    for k in N..2 * N {
        table.insert(k, k);
    }
    assert_eq!(table.len(), N as usize);
    for k in N..2 * N {
        assert_eq!(table.find(k, &mut probes), k);
    }
    assert_eq!(table.sum_all_values(), (N..2 * N).sum());

    // Clear is idempotent and leaves a usable table.
    table.clear();
    table.clear();
    assert_eq!(table.len(), 0);
    assert!(!table.contains(N, &mut probes));
    table.insert(42, 43);
    assert_eq!(table.find(42, &mut probes), 43);
    assert!(table.memory_usage() > 0);
}

macro_rules! contract_tests {
    ($($name:ident => $table:expr;)*) => {
        $(
            #[test]
            fn $name() {
                churn_scenario($table);
            }
        )*
    };
}

contract_tests! {
    chaining => ChainingTable::new();
    chaining_overloaded => ChainingTable::with_load_factor(500);
    linear => LinearTable::new();
    linear_half_full => LinearTable::with_load_factor(50);
    linear_rehash => LinearRehashTable::new();
    linear_shift => LinearShiftTable::new();
    linear_simd => LinearSimdTable::new();
    quadratic => QuadraticTable::new();
    double_hash => DoubleHashTable::new();
    robin_hood => RobinHoodTable::new();
    robin_hood_crowded => RobinHoodTable::with_load_factor(90);
    robin_hood_shift => RobinHoodShiftTable::new();
    robin_hood_desired => RobinHoodDesiredTable::new();
    two_way_narrow => TwoWayTable::<2>::new();
    two_way => TwoWayTable::<4>::new();
    two_way_wide => TwoWayTable::<8>::new();
    two_way_simd => TwoWaySimdTable::new();
}
