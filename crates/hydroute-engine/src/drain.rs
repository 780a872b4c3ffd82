//! The daily routing step.
//!
//! One model day is split into `substeps_per_day` iterations. Before the
//! first, the day's runoff enters each cell's reservoir or lake and every
//! operating reservoir makes its release. Each iteration then
//!
//! 1. releases the weighted queue sum of every reach,
//! 2. exchanges those releases so each cell learns its routed inflow,
//! 3. passes inflow through reservoir and lake (fill, then spill),
//! 4. adds lake outflow `kr/n · S · (S/Smax)^1.5` unless the cell is a sink,
//! 5. withdraws this iteration's share of the demand, and
//! 6. pushes what remains into the cell's own reach queue.
//!
//! Demand left unmet after the last iteration is drawn from the lake.
//!
//! Lakes and dams on sink cells hold their water: only what spills over
//! capacity leaves, and a sink dam's irrigation buffer still ages.

use hydroute_core::{settle_river, settle_storage, Month, NodeId, RoutingError, StorageKind};
use hydroute_exchange::Exchange;

use crate::domain::RoutingDomain;
use crate::output::DayReport;

impl RoutingDomain {
    /// Route one day of runoff (mm per owned cell).
    ///
    /// `exchange` must run the river graph for this domain's partition and
    /// every worker must call this in lockstep. An exchange failure is
    /// fatal: the domain is left mid-day.
    pub fn drain_day(
        &mut self,
        runoff_mm: &[f64],
        month: Month,
        exchange: &mut dyn Exchange,
    ) -> Result<DayReport, RoutingError> {
        self.check_input("runoff", runoff_mm)?;
        let count = self.substeps_per_day();
        let n = f64::from(count);
        let kr = self.lake_outflow_coefficient() / n;
        let epsilon = self.epsilon();
        let year = self.year();
        let len = self.len();
        let mut report = DayReport {
            discharge: vec![0.0; len],
            outflow: vec![0.0; len],
            ..DayReport::default()
        };
        let mut mean_storage = vec![0.0; len];

        // ── Runoff and reservoir release ────────────────────────
        for (i, cell) in self.cells.iter_mut().enumerate() {
            let water = runoff_mm[i] * cell.area;
            cell.withdrawal = 0.0;
            cell.month.inflow += water;
            match &mut cell.reservoir {
                Some(r) if Self::dam_active(year, r) => {
                    r.record_inflow(water);
                    cell.lake += r.fill(water);
                    let release = if cell.downstream.is_sink() {
                        r.hold_release()
                    } else {
                        r.daily_release(month)
                    };
                    cell.lake += release.to_river;
                }
                _ => cell.lake += water,
            }
        }

        // ── Sub-daily iterations ────────────────────────────────
        let first = self.range().start;
        for _ in 0..count {
            for (cell, out) in self.cells.iter_mut().zip(&mut self.outflow) {
                *out = cell.queue.weighted_sum();
                cell.river -= *out;
            }
            exchange.exchange(&self.outflow, &mut self.inflow)?;

            for (i, cell) in self.cells.iter_mut().enumerate() {
                let node = NodeId::new((first + i) as u32);
                let out = self.outflow[i];
                report.outflow[i] += out;
                if cell.downstream.is_sink() {
                    report.sink_outflow += out;
                }

                let mut fin = self.inflow[i];
                report.discharge[i] += fin;
                cell.month.inflow += fin;
                if let Some(r) = &mut cell.reservoir {
                    if Self::dam_active(year, r) {
                        r.record_inflow(fin);
                        fin = r.fill(fin);
                    }
                }

                cell.lake += fin;
                fin = 0.0;
                if cell.lake > cell.lake_max {
                    fin = cell.lake - cell.lake_max;
                    cell.lake = cell.lake_max;
                }
                if cell.lake_max > 0.0 && cell.lake > 0.0 && !cell.downstream.is_sink() {
                    let fill = cell.lake / cell.lake_max;
                    let lake_out = (kr * cell.lake * fill * fill.sqrt()).min(cell.lake);
                    cell.lake -= lake_out;
                    fin += lake_out;
                }
                cell.lake = settle_storage(
                    cell.lake,
                    cell.lake_max,
                    cell.lake_max,
                    epsilon,
                    StorageKind::Lake,
                    node,
                );

                let share = cell.demand / n;
                let taken = share.min(fin);
                fin -= taken;
                cell.withdrawal += taken;

                cell.river += fin;
                cell.queue.push(fin);
                cell.river =
                    settle_river(cell.river, cell.queue.in_transit(), out + fin, epsilon, node);
                mean_storage[i] += cell.river + cell.lake;
            }
        }

        // ── Unmet demand and bookkeeping ────────────────────────
        for (i, cell) in self.cells.iter_mut().enumerate() {
            let unmet = (cell.demand - cell.withdrawal).max(0.0);
            let from_lake = unmet.min(cell.lake);
            cell.lake -= from_lake;
            cell.withdrawal += from_lake;

            report.withdrawal += cell.withdrawal;
            report.unmet_demand += unmet - from_lake;
            cell.outflow_yesterday = report.outflow[i];
            cell.month.outflow += report.outflow[i];
            cell.month.discharge += report.discharge[i];
            cell.month.storage += mean_storage[i] / n;
            cell.month.local_withdrawal += cell.withdrawal;
            cell.month.days += 1;
        }
        report.storage = self.storage();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hydroute_core::WorkerRank;
    use hydroute_exchange::{ExchangePlan, LocalExchange};
    use hydroute_queue::Instantaneous;
    use hydroute_topology::{DrainageRecord, IrrigationNetwork, Partition, RiverNetwork};

    use super::*;
    use crate::config::RoutingConfig;
    use crate::domain::CellParams;

    fn single(
        records: &[DrainageRecord],
        cells: &[CellParams],
        substeps: u32,
    ) -> (RoutingDomain, LocalExchange) {
        let network = RiverNetwork::build(records, &[], None).unwrap();
        let irrigation = IrrigationNetwork::disconnected(records.len());
        let partition = Partition::contiguous(records.len(), 1).unwrap();
        let config = RoutingConfig {
            substeps_per_day: substeps,
            transfer: Arc::new(Instantaneous),
            ..RoutingConfig::default()
        };
        let domain =
            RoutingDomain::new(&network, &irrigation, &partition, WorkerRank(0), cells, &config)
                .unwrap();
        let plan = ExchangePlan::new(network.links(), &partition, WorkerRank(0)).unwrap();
        (domain, LocalExchange::new(plan).unwrap())
    }

    fn sink() -> DrainageRecord {
        DrainageRecord {
            downstream: -1,
            reach_length: 0.0,
        }
    }

    fn cell(area: f64, lake_capacity: f64) -> CellParams {
        CellParams {
            area,
            lake_capacity,
            reservoir: None,
        }
    }

    #[test]
    fn runoff_without_lake_leaves_through_sink_next_substep() {
        let (mut d, mut ex) = single(&[sink()], &[cell(1.0, 0.0)], 2);
        let r = d.drain_day(&[10.0], Month::JANUARY, &mut ex).unwrap();
        assert_eq!(r.sink_outflow, 10.0);
        assert_eq!(d.total_water(), 0.0);
    }

    #[test]
    fn lake_releases_slowly() {
        let records = [
            DrainageRecord {
                downstream: 1,
                reach_length: 0.0,
            },
            sink(),
        ];
        let (mut d, mut ex) = single(&records, &[cell(1.0, 1000.0), cell(1.0, 0.0)], 8);
        d.drain_day(&[500.0, 0.0], Month::JANUARY, &mut ex).unwrap();
        let lake = d.cells()[0].lake;
        assert!(lake > 499.0 && lake < 500.0);
        let mass = d.total_water();
        let left = d.drain_day(&[0.0, 0.0], Month::JANUARY, &mut ex).unwrap();
        assert!(left.sink_outflow > 0.0);
        assert!((mass - d.total_water() - left.sink_outflow).abs() < 1e-9);
    }

    #[test]
    fn sink_lake_only_loses_its_spill() {
        let (mut d, mut ex) = single(&[sink()], &[cell(1.0, 1000.0)], 8);
        let r = d.drain_day(&[500.0], Month::JANUARY, &mut ex).unwrap();
        assert_eq!(d.cells()[0].lake, 500.0);
        assert_eq!(r.sink_outflow, 0.0);

        let r = d.drain_day(&[700.0], Month::JANUARY, &mut ex).unwrap();
        assert_eq!(d.cells()[0].lake, 1000.0);
        assert_eq!(r.sink_outflow, 200.0);
        assert_eq!(d.total_water(), 1000.0);
    }

    #[test]
    fn lake_spills_above_capacity() {
        let (mut d, mut ex) = single(&[sink()], &[cell(1.0, 100.0)], 1);
        d.drain_day(&[300.0], Month::JANUARY, &mut ex).unwrap();
        assert!(d.cells()[0].lake <= 100.0);
        assert!(d.cells()[0].river >= 200.0);
    }

    #[test]
    fn withdrawal_capped_by_available_water() {
        // A quarter of the demand per iteration; only the first sees water.
        let (mut d, mut ex) = single(&[sink()], &[cell(1.0, 0.0)], 4);
        d.set_withdrawal_demand(&[100.0]).unwrap();
        let r = d.drain_day(&[40.0], Month::JANUARY, &mut ex).unwrap();
        assert_eq!(r.withdrawal, 25.0);
        assert_eq!(r.unmet_demand, 75.0);
        assert_eq!(r.sink_outflow, 15.0);
    }

    #[test]
    fn unmet_demand_drawn_from_lake() {
        let (mut d, mut ex) = single(&[sink()], &[cell(1.0, 1e6)], 1);
        d.drain_day(&[1000.0], Month::JANUARY, &mut ex).unwrap();
        d.set_withdrawal_demand(&[50.0]).unwrap();
        let r = d.drain_day(&[0.0], Month::JANUARY, &mut ex).unwrap();
        assert!((r.withdrawal - 50.0).abs() < 1e-9);
        assert_eq!(r.unmet_demand, 0.0);
    }

    #[test]
    fn negative_runoff_is_rejected() {
        let (mut d, mut ex) = single(&[sink()], &[cell(1.0, 0.0)], 1);
        let err = d.drain_day(&[-1.0], Month::JANUARY, &mut ex).unwrap_err();
        assert!(matches!(err, RoutingError::InvalidInput { node, .. } if node == NodeId::new(0)));
    }

    #[test]
    fn wrong_runoff_length_is_rejected() {
        let (mut d, mut ex) = single(&[sink()], &[cell(1.0, 0.0)], 1);
        assert!(matches!(
            d.drain_day(&[1.0, 2.0], Month::JANUARY, &mut ex),
            Err(RoutingError::InputLength { expected: 1, found: 2, .. })
        ));
    }
}
