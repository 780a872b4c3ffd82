//! Splitting the cells over several workers does not change a single bit
//! of the result.

use hydroute_engine::{
    run_parallel, CellParams, Forcing, MonthlyOutput, RoutingConfig, SerialRouter,
};
use hydroute_test_utils::fixtures::{dam, random_forest, random_neighbours, random_runoff};
use hydroute_topology::{IrrigationNetwork, RiverNetwork};
use proptest::prelude::*;

type Scenario = (RiverNetwork, IrrigationNetwork, Vec<CellParams>, Forcing);

fn scenario(seed: u64, n: usize, days: usize) -> Scenario {
    let network =
        RiverNetwork::build(&random_forest(seed, n, 0.2, 120_000.0), &[], None).unwrap();
    let irrigation = IrrigationNetwork::build(&random_neighbours(seed, n, 0.3), &[], None).unwrap();
    let cells = (0..n)
        .map(|i| CellParams {
            area: 2.5e7,
            lake_capacity: if i % 4 == 0 { 1e9 } else { 0.0 },
            reservoir: (i % 9 == 4).then(|| dam(1990, 5e9, 2)),
        })
        .collect();
    let forcing = Forcing {
        first_year: 2000,
        runoff: random_runoff(seed, days, n, 0.4, 15.0),
        demand: Some(random_runoff(!seed, days, n, 0.3, 1e7)),
    };
    (network, irrigation, cells, forcing)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10))]

    #[test]
    fn discharge_is_independent_of_worker_count(
        seed in any::<u64>(),
        n in 4usize..40,
        workers in 2usize..5,
    ) {
        let (network, irrigation, cells, forcing) = scenario(seed, n, 90);
        let config = RoutingConfig::default();
        let mut router = SerialRouter::new(&network, &irrigation, &cells, &config).unwrap();
        let serial = router.run(&forcing, 0..forcing.days()).unwrap();
        let parallel = run_parallel(&network, &irrigation, &cells, &config, workers, &forcing).unwrap();

        for (day, (a, b)) in serial.discharge.iter().zip(&parallel.discharge).enumerate() {
            let a: Vec<u64> = a.iter().map(|v| v.to_bits()).collect();
            let b: Vec<u64> = b.iter().map(|v| v.to_bits()).collect();
            prop_assert_eq!(a, b, "day {}", day);
        }
        let states: Vec<_> = parallel.domains.iter().flat_map(|d| d.cells().iter().cloned()).collect();
        prop_assert_eq!(router.domain().cells(), &states[..]);
        let key = |m: &MonthlyOutput| (m.year, m.month, m.node);
        let mut a = serial.monthly;
        let mut b = parallel.monthly;
        a.sort_by_key(key);
        b.sort_by_key(key);
        prop_assert_eq!(a, b);
    }
}
