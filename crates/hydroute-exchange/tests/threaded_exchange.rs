//! Threaded exchange agrees bit-for-bit with the single-worker transport.

use std::thread;

use hydroute_core::{NodeId, WorkerRank};
use hydroute_exchange::{ChannelFabric, Exchange, ExchangePlan, LocalExchange};
use hydroute_topology::{LinkTable, Partition};
use proptest::prelude::*;

/// Every node drains to a higher index or nowhere.
fn forest(picks: &[f64]) -> LinkTable {
    let n = picks.len();
    let targets: Vec<Option<NodeId>> = picks
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let remaining = n - i - 1;
            (remaining > 0 && p > 0.15)
                .then(|| NodeId::new((i + 1 + (p * remaining as f64) as usize % remaining) as u32))
        })
        .collect();
    LinkTable::from_targets(&targets)
}

fn outflow(round: usize, node: usize) -> f64 {
    ((round * 31 + node * 17) % 23) as f64 * 0.1 + 1e-3 * node as f64
}

fn serial(links: &LinkTable, rounds: usize) -> Vec<Vec<f64>> {
    let p = Partition::contiguous(links.len(), 1).unwrap();
    let mut ex = LocalExchange::new(ExchangePlan::new(links, &p, WorkerRank(0)).unwrap()).unwrap();
    (0..rounds)
        .map(|r| {
            let out: Vec<f64> = (0..links.len()).map(|i| outflow(r, i)).collect();
            let mut inflow = vec![0.0; links.len()];
            ex.exchange(&out, &mut inflow).unwrap();
            inflow
        })
        .collect()
}

fn threaded(links: &LinkTable, workers: usize, rounds: usize) -> Vec<Vec<f64>> {
    let p = Partition::contiguous(links.len(), workers).unwrap();
    let plans = p
        .ranks()
        .map(|r| ExchangePlan::new(links, &p, r).unwrap())
        .collect();
    let endpoints = ChannelFabric::connect(plans).unwrap();
    let pieces: Vec<Vec<Vec<f64>>> = thread::scope(|s| {
        let handles: Vec<_> = endpoints
            .into_iter()
            .map(|mut ex| {
                s.spawn(move || {
                    let range = ex.plan().range();
                    (0..rounds)
                        .map(|r| {
                            let out: Vec<f64> = range.clone().map(|i| outflow(r, i)).collect();
                            let mut inflow = vec![0.0; range.len()];
                            ex.exchange(&out, &mut inflow).unwrap();
                            inflow
                        })
                        .collect()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    (0..rounds)
        .map(|r| pieces.iter().flat_map(|w| w[r].iter().copied()).collect())
        .collect()
}

#[test]
fn confluence_across_three_workers() {
    let links = LinkTable::from_targets(&[
        Some(NodeId::new(5)),
        Some(NodeId::new(5)),
        Some(NodeId::new(5)),
        Some(NodeId::new(5)),
        Some(NodeId::new(5)),
        None,
    ]);
    assert_eq!(threaded(&links, 3, 4), serial(&links, 4));
}

#[test]
fn more_workers_than_nodes() {
    let links = forest(&[0.9, 0.5, 0.0]);
    assert_eq!(threaded(&links, 5, 3), serial(&links, 3));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_partition_matches_serial(
        picks in prop::collection::vec(0.0f64..1.0, 1..40),
        workers in 1usize..5,
    ) {
        let links = forest(&picks);
        let expected = serial(&links, 5);
        let got = threaded(&links, workers, 5);
        for (a, b) in expected.iter().zip(&got) {
            for (x, y) in a.iter().zip(b) {
                prop_assert_eq!(x.to_bits(), y.to_bits());
            }
        }
    }
}
