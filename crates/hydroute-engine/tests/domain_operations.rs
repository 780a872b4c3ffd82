//! Neighbour withdrawal, reservoir coupling and failure propagation on a
//! single routing domain.

use std::sync::Arc;

use hydroute_core::{Month, NodeId, RoutingError, WorkerRank};
use hydroute_engine::{CellParams, RoutingConfig, RoutingDomain};
use hydroute_exchange::{ExchangePlan, LocalExchange};
use hydroute_queue::Instantaneous;
use hydroute_reservoir::ReservoirRecord;
use hydroute_test_utils::fixtures::dam;
use hydroute_test_utils::FailingExchange;
use hydroute_topology::{DrainageRecord, IrrigationNetwork, LinkTable, Partition, RiverNetwork};

struct Rig {
    domain: RoutingDomain,
    river: LocalExchange,
    request: LocalExchange,
    deliver: LocalExchange,
    network: RiverNetwork,
}

fn local(links: &LinkTable, n: usize) -> LocalExchange {
    let p = Partition::contiguous(n, 1).unwrap();
    LocalExchange::new(ExchangePlan::new(links, &p, WorkerRank(0)).unwrap()).unwrap()
}

/// Every cell drains straight to the sink.
fn rig(neighbours: &[i64], reservoirs: &[Option<ReservoirRecord>]) -> Rig {
    rig_draining(neighbours, reservoirs, &vec![-1; neighbours.len()])
}

fn rig_draining(
    neighbours: &[i64],
    reservoirs: &[Option<ReservoirRecord>],
    downstream: &[i64],
) -> Rig {
    let n = neighbours.len();
    let records: Vec<DrainageRecord> = downstream
        .iter()
        .map(|&d| DrainageRecord {
            downstream: d,
            reach_length: 0.0,
        })
        .collect();
    let network = RiverNetwork::build(&records, &[], None).unwrap();
    let irrigation = IrrigationNetwork::build(neighbours, &[], None).unwrap();
    let cells: Vec<CellParams> = reservoirs
        .iter()
        .map(|r| CellParams {
            area: 1.0,
            lake_capacity: 0.0,
            reservoir: *r,
        })
        .collect();
    let config = RoutingConfig {
        substeps_per_day: 1,
        transfer: Arc::new(Instantaneous),
        ..RoutingConfig::default()
    };
    let partition = Partition::contiguous(n, 1).unwrap();
    let domain =
        RoutingDomain::new(&network, &irrigation, &partition, WorkerRank(0), &cells, &config)
            .unwrap();
    Rig {
        domain,
        river: local(network.links(), n),
        request: local(irrigation.forward(), n),
        deliver: local(irrigation.back(), n),
        network,
    }
}

#[test]
fn neighbour_covers_deficit() {
    let mut r = rig(&[1, -1], &[None, None]);
    r.domain
        .request_neighbour_water(&[50.0, 0.0], &mut r.request)
        .unwrap();
    assert_eq!(r.domain.cells()[0].deficit, 50.0);
    assert_eq!(r.domain.cells()[1].demand, 50.0);

    let report = r
        .domain
        .drain_day(&[0.0, 1000.0], Month::JANUARY, &mut r.river)
        .unwrap();
    assert_eq!(report.withdrawal, 50.0);
    let received = r.domain.deliver_neighbour_water(&mut r.deliver).unwrap();
    assert_eq!(received, vec![50.0, 0.0]);
    assert_eq!(r.domain.cells()[0].withdrawal, 50.0);
    assert_eq!(r.domain.cells()[1].withdrawal, 0.0);
    assert_eq!(r.domain.cells()[0].month.neighbour_withdrawal, 50.0);
}

#[test]
fn short_neighbour_shares_proportionally() {
    let mut r = rig(&[2, 2, -1], &[None, None, None]);
    r.domain
        .request_neighbour_water(&[30.0, 10.0, 0.0], &mut r.request)
        .unwrap();
    r.domain
        .drain_day(&[0.0, 0.0, 20.0], Month::JANUARY, &mut r.river)
        .unwrap();
    let received = r.domain.deliver_neighbour_water(&mut r.deliver).unwrap();
    assert!((received[0] - 15.0).abs() < 1e-12);
    assert!((received[1] - 5.0).abs() < 1e-12);
    assert!(r.domain.cells()[2].withdrawal.abs() < 1e-12);
}

#[test]
fn yesterday_outflow_is_used_locally_first() {
    let mut r = rig(&[1, -1], &[None, None]);
    r.domain
        .drain_day(&[40.0, 0.0], Month::JANUARY, &mut r.river)
        .unwrap();
    r.domain
        .drain_day(&[0.0, 0.0], Month::JANUARY, &mut r.river)
        .unwrap();
    assert_eq!(r.domain.cells()[0].outflow_yesterday, 40.0);
    r.domain
        .request_neighbour_water(&[100.0, 0.0], &mut r.request)
        .unwrap();
    assert_eq!(r.domain.cells()[0].deficit, 60.0);
    assert_eq!(r.domain.cells()[0].demand, 40.0);
}

#[test]
fn dam_releases_running_mean_inflow_before_history_exists() {
    let mut r = rig_draining(&[-1, -1], &[Some(dam(1950, 1e6, 1)), None], &[1, -1]);
    r.domain.begin_year(2000);
    let mut left = 0.0;
    for runoff in [5000.0, 0.0, 20000.0] {
        let report = r
            .domain
            .drain_day(&[runoff, 0.0], Month::JANUARY, &mut r.river)
            .unwrap();
        left += report.sink_outflow;
    }
    let cell = &r.domain.cells()[0];
    let stored = cell.reservoir.as_ref().unwrap().storage();
    assert!((stored - (20000.0 - 25000.0 / 3.0)).abs() < 1e-9);
    assert!((r.domain.total_water() + left - 25000.0).abs() < 1e-9);
}

#[test]
fn dam_on_sink_cell_holds_its_water() {
    let mut r = rig(&[-1], &[Some(dam(1950, 1e6, 1))]);
    r.domain.begin_year(2000);
    for _ in 0..3 {
        let report = r
            .domain
            .drain_day(&[5000.0], Month::JANUARY, &mut r.river)
            .unwrap();
        assert_eq!(report.sink_outflow, 0.0);
    }
    let stored = r.domain.cells()[0].reservoir.as_ref().unwrap().storage();
    assert_eq!(stored, 15000.0);
}

#[test]
fn uncommissioned_dam_is_bypassed() {
    let mut r = rig(&[-1], &[Some(dam(2010, 1e6, 1))]);
    r.domain.begin_year(2000);
    r.domain
        .drain_day(&[5000.0], Month::JANUARY, &mut r.river)
        .unwrap();
    assert_eq!(r.domain.cells()[0].reservoir.as_ref().unwrap().storage(), 0.0);
    assert_eq!(r.domain.cells()[0].river, 5000.0);
    assert!(matches!(
        r.domain.supply_from_reservoir(NodeId::new(0), 1.0),
        Err(RoutingError::NoReservoir { .. })
    ));
}

#[test]
fn reservoir_supply_and_errors() {
    let mut r = rig(&[-1, -1], &[Some(dam(1950, 1e9, 2)), None]);
    r.domain.cells_mut()[0]
        .reservoir
        .as_mut()
        .unwrap()
        .state_mut()
        .buffer[0] = 300.0;
    let got = r.domain.supply_from_reservoir(NodeId::new(0), 200.0).unwrap();
    assert_eq!(got, 200.0);
    assert_eq!(r.domain.cells()[0].month.reservoir_supply, 200.0);
    assert!(matches!(
        r.domain.supply_from_reservoir(NodeId::new(1), 1.0),
        Err(RoutingError::NoReservoir { .. })
    ));
    assert!(matches!(
        r.domain.supply_from_reservoir(NodeId::new(7), 1.0),
        Err(RoutingError::NotOwned { .. })
    ));
}

#[test]
fn surface_spill_goes_to_lake() {
    let mut r = rig(&[-1], &[Some(dam(1950, 1e6, 1))]);
    // 1 km² of surface: 1 mm is 1e6 litres.
    let flux = r.domain.update_reservoir_surface(&[2.0], &[0.0]).unwrap();
    assert_eq!(flux.precipitation, 2e6);
    assert_eq!(flux.spill, 1e6);
    assert_eq!(r.domain.cells()[0].lake, 1e6);
}

#[test]
fn month_end_reports_every_cell() {
    let mut r = rig(&[-1, -1], &[Some(dam(1950, 1e9, 1)), None]);
    for _ in 0..31 {
        r.domain
            .drain_day(&[1.0, 2.0], Month::JANUARY, &mut r.river)
            .unwrap();
    }
    let out = r.domain.end_of_month(Month::JANUARY, 2000);
    assert_eq!(out.len(), 2);
    assert!(out[0].reservoir_storage.is_some());
    assert!(out[1].reservoir_storage.is_none());
    assert_eq!(out[1].inflow, 62.0);
    assert_eq!(r.domain.cells()[1].month.days, 0);
    r.domain.end_of_year(2000);
}

#[test]
fn exchange_failure_aborts_the_day() {
    let mut r = rig(&[-1, -1], &[None, None]);
    let p = Partition::contiguous(2, 1).unwrap();
    let plan = ExchangePlan::new(r.network.links(), &p, WorkerRank(0)).unwrap();
    let mut failing = FailingExchange::new(plan, 0).unwrap();
    let err = r
        .domain
        .drain_day(&[1.0, 1.0], Month::JANUARY, &mut failing)
        .unwrap_err();
    assert!(matches!(err, RoutingError::Exchange(_)));
}
