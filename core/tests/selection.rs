//! Weighted random selection: convergence, sentinels and properties.

use std::collections::BTreeMap;

use proptest::prelude::*;
use relocation_core::{
    rng::SubsystemRng,
    selection::{draw_binary, select_from_map, select_weighted, total_weight},
};

#[test]
fn frequencies_converge_to_weights() {
    const DRAWS: usize = 60_000;
    let mut rng = SubsystemRng::new(0xC0FFEE, 1);
    let candidates = [(0usize, 1.0), (1, 2.0), (2, 3.0)];

    let mut counts = [0usize; 3];
    for _ in 0..DRAWS {
        let key = select_weighted(&candidates, &mut rng).expect("positive total");
        counts[key] += 1;
    }

    let expected = [1.0 / 6.0, 2.0 / 6.0, 3.0 / 6.0];
    for (i, count) in counts.iter().enumerate() {
        let observed = *count as f64 / DRAWS as f64;
        assert!(
            (observed - expected[i]).abs() < 0.01,
            "key {i}: observed {observed:.4}, expected {:.4}", expected[i]
        );
    }
}

#[test]
fn zero_total_returns_none() {
    let mut rng = SubsystemRng::new(7, 0);
    assert_eq!(select_weighted(&[(1u32, 0.0), (2, 0.0)], &mut rng), None);
    assert_eq!(select_weighted::<u32>(&[], &mut rng), None);

    let map: BTreeMap<u32, f64> = [(10, 0.0), (20, 0.0)].into_iter().collect();
    assert_eq!(select_from_map(&map, &mut rng), None);
}

#[test]
fn negative_and_nan_weights_count_as_zero() {
    let candidates = [(1u32, -5.0), (2, f64::NAN), (3, 2.0)];
    assert_eq!(total_weight(&candidates), 2.0);

    let mut rng = SubsystemRng::new(11, 0);
    for _ in 0..200 {
        assert_eq!(select_weighted(&candidates, &mut rng), Some(3));
    }
}

#[test]
fn binary_draw_respects_certain_outcomes() {
    let mut rng = SubsystemRng::new(3, 3);
    for _ in 0..500 {
        assert!(draw_binary(1.0, &mut rng));
        assert!(!draw_binary(0.0, &mut rng));
    }
}

#[test]
fn same_seed_same_draws() {
    let weights: BTreeMap<u32, f64> = (1..=10).map(|k| (k, f64::from(k))).collect();
    let mut a = SubsystemRng::new(99, 4);
    let mut b = SubsystemRng::new(99, 4);
    let draws_a: Vec<_> = (0..100).map(|_| select_from_map(&weights, &mut a)).collect();
    let draws_b: Vec<_> = (0..100).map(|_| select_from_map(&weights, &mut b)).collect();
    assert_eq!(draws_a, draws_b);
}

proptest! {
    #[test]
    fn selected_key_always_has_positive_weight(
        weights in proptest::collection::vec(0.0f64..10.0, 1..30),
        seed in any::<u64>(),
    ) {
        let candidates: Vec<(usize, f64)> = weights.iter().copied().enumerate().collect();
        let mut rng = SubsystemRng::new(seed, 0);
        match select_weighted(&candidates, &mut rng) {
            Some(key) => prop_assert!(weights[key] > 0.0),
            None => prop_assert!(weights.iter().all(|w| *w <= 0.0)),
        }
    }
}
