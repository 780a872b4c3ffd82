//! Deterministic network, reservoir and forcing fixtures.
//!
//! Every generator takes a seed and draws from a [`ChaCha8Rng`], so a
//! failing property test reproduces from its seed alone.

use hydroute_reservoir::ReservoirRecord;
use hydroute_topology::{DrainageRecord, SINK_INDEX};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Cells `0 → 1 → … → n-1 → sink`, every reach `reach_length` metres.
pub fn chain(n: usize, reach_length: f64) -> Vec<DrainageRecord> {
    (0..n)
        .map(|i| DrainageRecord {
            downstream: if i + 1 < n { (i + 1) as i64 } else { SINK_INDEX },
            reach_length,
        })
        .collect()
}

/// A random drainage forest of `n` cells.
///
/// Each cell drains to a higher index or, with probability
/// `sink_probability`, to the sink; the last cell always drains to the
/// sink. Reach lengths are uniform in `[0, max_reach)` metres.
pub fn random_forest(
    seed: u64,
    n: usize,
    sink_probability: f64,
    max_reach: f64,
) -> Vec<DrainageRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let remaining = n - i - 1;
            let downstream = if remaining == 0 || rng.random::<f64>() < sink_probability {
                SINK_INDEX
            } else {
                // Mostly short hops, so the forest has depth.
                let hop = rng.random_range(1..=remaining.min(4));
                (i + hop) as i64
            };
            DrainageRecord {
                downstream,
                reach_length: rng.random::<f64>() * max_reach,
            }
        })
        .collect()
}

/// Random irrigation neighbours: each cell picks another cell with
/// probability `p`, otherwise `-1`.
pub fn random_neighbours(seed: u64, n: usize, p: f64) -> Vec<i64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            if n > 1 && rng.random::<f64>() < p {
                let other = rng.random_range(0..n - 1);
                (if other >= i { other + 1 } else { other }) as i64
            } else {
                -1
            }
        })
        .collect()
}

/// Sparse daily runoff in mm: about one cell-day in `1/wet_fraction` is
/// wet, with depth uniform in `[0, max_mm)`.
pub fn random_runoff(
    seed: u64,
    days: usize,
    n: usize,
    wet_fraction: f64,
    max_mm: f64,
) -> Vec<Vec<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..days)
        .map(|_| {
            (0..n)
                .map(|_| {
                    if rng.random::<f64>() < wet_fraction {
                        rng.random::<f64>() * max_mm
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

/// Constant daily value for every cell.
pub fn constant(days: usize, n: usize, value: f64) -> Vec<Vec<f64>> {
    vec![vec![value; n]; days]
}

/// A dam commissioned in `commission_year` with the given capacity
/// (litres) and main purpose code.
pub fn dam(commission_year: i32, capacity: f64, main_purpose: i32) -> ReservoirRecord {
    ReservoirRecord {
        commission_year,
        capacity,
        surface_area: 1.0,
        installed_capacity: 0,
        height: 30,
        purpose: [main_purpose, 0, 0, 0, 0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_ends_in_sink() {
        let c = chain(3, 1.0);
        assert_eq!(c[0].downstream, 1);
        assert_eq!(c[2].downstream, SINK_INDEX);
    }

    #[test]
    fn forest_only_points_downhill() {
        for (i, r) in random_forest(7, 50, 0.1, 1e5).iter().enumerate() {
            assert!(r.downstream == SINK_INDEX || r.downstream as usize > i);
        }
    }

    #[test]
    fn generators_are_deterministic() {
        assert_eq!(random_runoff(3, 4, 5, 0.5, 10.0), random_runoff(3, 4, 5, 0.5, 10.0));
        let n = random_neighbours(9, 20, 0.5);
        assert!(n.iter().enumerate().all(|(i, &x)| x != i as i64));
    }
}
