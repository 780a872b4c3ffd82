//! Checkpointing at day k and restarting gives the same state as never
//! stopping.

use std::sync::Arc;

use hydroute_checkpoint::{
    read_checkpoint, state_hash, write_checkpoint, CheckpointError, FORMAT_VERSION,
};
use hydroute_engine::{CellParams, Forcing, RoutingConfig, SerialRouter};
use hydroute_queue::{Instantaneous, LinearSplit};
use hydroute_test_utils::fixtures::{chain, dam, random_forest, random_neighbours, random_runoff};
use hydroute_topology::{IrrigationNetwork, RiverNetwork};
use proptest::prelude::*;

struct Scenario {
    network: RiverNetwork,
    irrigation: IrrigationNetwork,
    cells: Vec<CellParams>,
    forcing: Forcing,
}

fn scenario(seed: u64, n: usize, days: usize) -> Scenario {
    let network = RiverNetwork::build(&random_forest(seed, n, 0.2, 150_000.0), &[], None).unwrap();
    let irrigation = IrrigationNetwork::build(&random_neighbours(seed, n, 0.3), &[], None).unwrap();
    let cells = (0..n)
        .map(|i| CellParams {
            area: 1e7,
            lake_capacity: if i % 3 == 0 { 2e8 } else { 0.0 },
            reservoir: match i % 5 {
                1 => Some(dam(1980, 4e8, 2)),
                3 => Some(dam(1980, 9e8, 1)),
                _ => None,
            },
        })
        .collect();
    let forcing = Forcing {
        first_year: 1999,
        runoff: random_runoff(seed, days, n, 0.5, 12.0),
        demand: Some(random_runoff(seed.rotate_left(7), days, n, 0.4, 2e6)),
    };
    Scenario {
        network,
        irrigation,
        cells,
        forcing,
    }
}

fn router(s: &Scenario) -> SerialRouter {
    SerialRouter::new(&s.network, &s.irrigation, &s.cells, &RoutingConfig::default()).unwrap()
}

fn restart_matches(seed: u64, n: usize, days: usize, k: usize) {
    let s = scenario(seed, n, days);
    let mut straight = router(&s);
    let full = straight.run(&s.forcing, 0..days).unwrap();

    let mut first = router(&s);
    first.run(&s.forcing, 0..k).unwrap();
    let mut bytes = Vec::new();
    write_checkpoint(&mut bytes, first.domain()).unwrap();

    let mut resumed = router(&s);
    let report = read_checkpoint(&mut bytes.as_slice(), resumed.domain_mut()).unwrap();
    assert!(report.queue_resets.is_empty());
    assert_eq!(state_hash(resumed.domain()), state_hash(first.domain()));

    let rest = resumed.run(&s.forcing, k..days).unwrap();
    assert_eq!(rest.discharge, full.discharge[k..].to_vec());
    assert_eq!(state_hash(resumed.domain()), state_hash(straight.domain()));
}

#[test]
fn restart_across_year_boundary() {
    restart_matches(42, 25, 500, 365 + 17);
}

#[test]
fn restart_mid_month() {
    restart_matches(7, 12, 120, 45);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn restart_at_any_day(seed in any::<u64>(), k in 0usize..100) {
        restart_matches(seed, 10, 100, k);
    }
}

#[test]
fn writing_twice_gives_identical_bytes() {
    let s = scenario(3, 8, 40);
    let mut r = router(&s);
    r.run(&s.forcing, 0..40).unwrap();
    let mut a = Vec::new();
    let mut b = Vec::new();
    write_checkpoint(&mut a, r.domain()).unwrap();
    write_checkpoint(&mut b, r.domain()).unwrap();
    assert_eq!(a, b);
    assert_eq!(&a[..4], b"HRCK");
    assert_eq!(a[4], FORMAT_VERSION);
}

fn chain_router(reach: f64, strategy_is_instant: bool) -> SerialRouter {
    let network = RiverNetwork::build(&chain(3, reach), &[], None).unwrap();
    let cells = vec![
        CellParams {
            area: 1.0,
            lake_capacity: 0.0,
            reservoir: None,
        };
        3
    ];
    let config = RoutingConfig {
        transfer: if strategy_is_instant {
            Arc::new(Instantaneous)
        } else {
            Arc::new(LinearSplit::default())
        },
        ..RoutingConfig::default()
    };
    SerialRouter::new(&network, &IrrigationNetwork::disconnected(3), &cells, &config).unwrap()
}

#[test]
fn changed_queue_length_resets_queue() {
    let forcing = Forcing {
        first_year: 2000,
        runoff: vec![vec![5.0; 3]; 2],
        demand: None,
    };
    let mut old = chain_router(200_000.0, true);
    old.run(&forcing, 0..2).unwrap();
    let mut bytes = Vec::new();
    write_checkpoint(&mut bytes, old.domain()).unwrap();

    let mut new = chain_router(200_000.0, false);
    let report = read_checkpoint(&mut bytes.as_slice(), new.domain_mut()).unwrap();
    assert_eq!(report.queue_resets.len(), 3);
    assert_eq!(report.river_discarded, 0.0);
    assert!(new.domain().cells().iter().all(|c| c.queue.sum() == 0.0));
}

#[test]
fn reset_queues_drop_their_river_water() {
    let wet = Forcing {
        first_year: 2000,
        runoff: vec![vec![5.0; 3]; 2],
        demand: None,
    };
    let mut old = chain_router(200_000.0, false);
    old.run(&wet, 0..2).unwrap();
    let in_transit: f64 = old.domain().cells().iter().map(|c| c.river).sum();
    assert!(in_transit > 0.0);
    let mut bytes = Vec::new();
    write_checkpoint(&mut bytes, old.domain()).unwrap();

    let mut new = chain_router(200_000.0, true);
    let report = read_checkpoint(&mut bytes.as_slice(), new.domain_mut()).unwrap();
    assert_eq!(report.queue_resets.len(), 3);
    assert!((report.river_discarded - in_transit).abs() < 1e-9);
    for cell in new.domain().cells() {
        assert_eq!(cell.river, 0.0);
        assert_eq!(cell.queue.in_transit(), 0.0);
    }

    let dry = Forcing {
        first_year: 2000,
        runoff: vec![vec![0.0; 3]; 400],
        demand: None,
    };
    new.run(&dry, 0..400).unwrap();
    assert_eq!(new.domain().total_water(), 0.0);
}

#[test]
fn header_and_magic_are_checked() {
    let s = scenario(1, 6, 5);
    let r = router(&s);
    let mut bytes = Vec::new();
    write_checkpoint(&mut bytes, r.domain()).unwrap();

    let mut other = router(&scenario(1, 7, 5));
    assert!(matches!(
        read_checkpoint(&mut bytes.as_slice(), other.domain_mut()),
        Err(CheckpointError::HeaderMismatch {
            field: "cell count",
            ..
        })
    ));

    let mut bad = bytes.clone();
    bad[0] = b'X';
    let mut same = router(&s);
    assert!(matches!(
        read_checkpoint(&mut bad.as_slice(), same.domain_mut()),
        Err(CheckpointError::InvalidMagic)
    ));

    let mut versioned = bytes.clone();
    versioned[4] = FORMAT_VERSION + 1;
    assert!(matches!(
        read_checkpoint(&mut versioned.as_slice(), same.domain_mut()),
        Err(CheckpointError::UnsupportedVersion { .. })
    ));

    let before = state_hash(same.domain());
    let truncated = &bytes[..bytes.len() - 3];
    assert!(matches!(
        read_checkpoint(&mut &truncated[..], same.domain_mut()),
        Err(CheckpointError::Io(_))
    ));
    assert_eq!(state_hash(same.domain()), before);
}
