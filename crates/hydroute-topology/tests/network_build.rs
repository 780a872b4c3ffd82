//! Building networks from raw drainage input.

use hydroute_core::{Downstream, NodeId};
use hydroute_queue::{Instantaneous, LinearSplit};
use hydroute_topology::{DrainageRecord, Partition, RiverNetwork, TopologyError};
use proptest::prelude::*;

/// Random forest: every cell drains to a higher index or the sink.
fn forest() -> impl Strategy<Value = Vec<DrainageRecord>> {
    (1usize..60).prop_flat_map(|n| {
        prop::collection::vec((0.0f64..1.0, 1_000.0f64..80_000.0), n).prop_map(move |raw| {
            raw.iter()
                .enumerate()
                .map(|(i, &(pick, len))| {
                    let remaining = n - i - 1;
                    let downstream = if remaining == 0 || pick < 0.2 {
                        -1
                    } else {
                        (i + 1 + (pick * remaining as f64) as usize % remaining) as i64
                    };
                    DrainageRecord {
                        downstream,
                        reach_length: len,
                    }
                })
                .collect()
        })
    })
}

#[test]
fn transfer_functions_follow_reach_length() {
    let records = [
        DrainageRecord {
            downstream: 1,
            reach_length: 5_000.0,
        },
        DrainageRecord {
            downstream: -1,
            reach_length: 60_000.0,
        },
    ];
    let net = RiverNetwork::build(&records, &[], None).unwrap();
    let tf = net
        .transfer_functions(&LinearSplit::default(), 8, 0..net.len())
        .unwrap();
    assert!(tf[1].ncoeff() > tf[0].ncoeff());
    let unit = net.transfer_functions(&Instantaneous, 8, 0..2).unwrap();
    assert!(unit.iter().all(|t| t.ncoeff() == 1));

    let tail = net
        .transfer_functions(&LinearSplit::default(), 8, 1..2)
        .unwrap();
    assert_eq!(tail, vec![tf[1].clone()]);
    assert!(matches!(
        net.transfer_functions(&Instantaneous, 8, 0..3),
        Err(TopologyError::LengthMismatch { found: 3, .. })
    ));
    assert!(matches!(
        net.transfer_functions(&Instantaneous, 0, 0..2),
        Err(TopologyError::Transfer { cell, .. }) if cell == NodeId::new(0)
    ));
}

#[test]
fn error_is_reported_for_first_bad_cell() {
    let records = [
        DrainageRecord {
            downstream: -1,
            reach_length: 1.0,
        },
        DrainageRecord {
            downstream: 7,
            reach_length: 1.0,
        },
    ];
    match RiverNetwork::build(&records, &[], None) {
        Err(TopologyError::InvalidDownstream { cell, raw, .. }) => {
            assert_eq!(cell, NodeId::new(1));
            assert_eq!(raw, 7);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

proptest! {
    #[test]
    fn random_forests_are_acyclic_and_reach_sinks(records in forest()) {
        let net = RiverNetwork::build(&records, &[], None).unwrap();
        let order = net.topological_order();
        prop_assert_eq!(order.len(), records.len());
        let mut position = vec![0usize; records.len()];
        for (p, node) in order.iter().enumerate() {
            position[node.index()] = p;
        }
        for node in order {
            if let Downstream::Node(d) = net.downstream(*node) {
                prop_assert!(position[node.index()] < position[d.index()]);
            }
            let outlet = net.outlet_of(*node);
            prop_assert_eq!(net.downstream(outlet), Downstream::Sink);
        }
    }

    #[test]
    fn partition_covers_every_cell_once(records in forest(), workers in 1usize..6) {
        let net = RiverNetwork::build(&records, &[], None).unwrap();
        let p = Partition::contiguous(net.len(), workers).unwrap();
        let total: usize = p.ranks().map(|r| p.range(r).len()).sum();
        prop_assert_eq!(total, net.len());
    }
}
