//! Three cells in a row, instantaneous reaches, one routing iteration per
//! day: an impulse advances one cell per day.

use std::sync::Arc;

use hydroute_engine::{run_parallel, CellParams, Forcing, RoutingConfig, SerialRouter};
use hydroute_queue::Instantaneous;
use hydroute_test_utils::fixtures::chain;
use hydroute_topology::{IrrigationNetwork, RiverNetwork};

type Setup = (RiverNetwork, IrrigationNetwork, Vec<CellParams>, RoutingConfig, Forcing);

fn setup() -> Setup {
    let network = RiverNetwork::build(&chain(3, 0.0), &[], None).unwrap();
    let irrigation = IrrigationNetwork::disconnected(3);
    let cells = vec![
        CellParams {
            area: 1.0,
            lake_capacity: 0.0,
            reservoir: None,
        };
        3
    ];
    let config = RoutingConfig {
        substeps_per_day: 1,
        transfer: Arc::new(Instantaneous),
        ..RoutingConfig::default()
    };
    let mut runoff = vec![vec![0.0; 3]; 6];
    runoff[0][0] = 100.0;
    let forcing = Forcing {
        first_year: 2000,
        runoff,
        demand: None,
    };
    (network, irrigation, cells, config, forcing)
}

#[test]
fn impulse_reaches_outlet_on_day_three() {
    let (network, irrigation, cells, config, forcing) = setup();
    let mut router = SerialRouter::new(&network, &irrigation, &cells, &config).unwrap();
    let out = router.run(&forcing, 0..6).unwrap();
    let at_c: Vec<f64> = out.discharge.iter().map(|day| day[2]).collect();
    assert_eq!(at_c, vec![0.0, 0.0, 100.0, 0.0, 0.0, 0.0]);
    let at_b: Vec<f64> = out.discharge.iter().map(|day| day[1]).collect();
    assert_eq!(at_b, vec![0.0, 100.0, 0.0, 0.0, 0.0, 0.0]);
    assert_eq!(out.sink_outflow[3], 100.0);
}

#[test]
fn queues_empty_after_day_four() {
    let (network, irrigation, cells, config, forcing) = setup();
    let mut router = SerialRouter::new(&network, &irrigation, &cells, &config).unwrap();
    router.run(&forcing, 0..4).unwrap();
    for cell in router.domain().cells() {
        assert_eq!(cell.queue.sum(), 0.0);
        assert_eq!(cell.river, 0.0);
    }
    assert_eq!(router.domain().total_water(), 0.0);
}

#[test]
fn parallel_run_matches_serial() {
    let (network, irrigation, cells, config, forcing) = setup();
    let mut router = SerialRouter::new(&network, &irrigation, &cells, &config).unwrap();
    let serial = router.run(&forcing, 0..6).unwrap();
    let parallel = run_parallel(&network, &irrigation, &cells, &config, 3, &forcing).unwrap();
    assert_eq!(parallel.discharge, serial.discharge);
}
