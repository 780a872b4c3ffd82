//! Precompiled routing of edge values for one worker.
//!
//! For every locally owned destination the plan reserves a contiguous run
//! of slots, one per incoming edge, ordered by ascending source index.
//! Local sources write their slots directly; remote sources arrive in one
//! packet per peer whose layout both sides derive from the same global
//! link table, so no indices travel over the wire.

use std::ops::Range;

use indexmap::IndexMap;

use hydroute_core::{ExchangeError, NodeId, WorkerRank};
use hydroute_topology::{LinkTable, Partition};

/// Static exchange layout for one worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangePlan {
    rank: WorkerRank,
    workers: usize,
    range: Range<usize>,
    /// `slot_offsets[d]..slot_offsets[d + 1]` are the slots of local node `d`.
    slot_offsets: Vec<usize>,
    /// `(local source, slot)` for edges that stay on this worker.
    local: Vec<(usize, usize)>,
    /// Per peer, the local sources to send, in packet order.
    outbound: IndexMap<WorkerRank, Vec<usize>>,
    /// Per peer, the slot each packet position lands in.
    inbound: IndexMap<WorkerRank, Vec<usize>>,
}

/// An edge between two workers' ranges.
struct Crossing {
    dest: usize,
    src: usize,
    /// Position of `src` among the sources of `dest`.
    position: usize,
}

/// Edges from `from` into `to`, in packet order.
fn crossing_edges(links: &LinkTable, from: &Range<usize>, to: &Range<usize>) -> Vec<Crossing> {
    let mut edges = Vec::new();
    for dest in to.clone() {
        let sources = links.sources(NodeId::new(dest as u32));
        for (position, src) in sources.iter().enumerate() {
            if from.contains(&src.index()) {
                edges.push(Crossing {
                    dest,
                    src: src.index(),
                    position,
                });
            }
        }
    }
    edges
}

impl ExchangePlan {
    /// Compile the plan of worker `rank`.
    pub fn new(
        links: &LinkTable,
        partition: &Partition,
        rank: WorkerRank,
    ) -> Result<Self, ExchangeError> {
        if links.len() != partition.len() {
            return Err(ExchangeError::FabricInit {
                reason: format!(
                    "link table has {} nodes but partition covers {}",
                    links.len(),
                    partition.len()
                ),
            });
        }
        if rank.index() >= partition.workers() {
            return Err(ExchangeError::FabricInit {
                reason: format!(
                    "rank {rank} outside partition of {} workers",
                    partition.workers()
                ),
            });
        }
        let range = partition.range(rank);
        let start = range.start;

        let mut slot_offsets = Vec::with_capacity(range.len() + 1);
        slot_offsets.push(0);
        for d in range.clone() {
            let fan_in = links.sources(NodeId::new(d as u32)).len();
            slot_offsets.push(slot_offsets[slot_offsets.len() - 1] + fan_in);
        }
        let slot_of = |e: &Crossing| slot_offsets[e.dest - start] + e.position;

        let local = crossing_edges(links, &range, &range)
            .iter()
            .map(|e| (e.src - start, slot_of(e)))
            .collect();

        let mut outbound = IndexMap::new();
        let mut inbound = IndexMap::new();
        for peer in partition.ranks().filter(|&r| r != rank) {
            let theirs = partition.range(peer);
            let send = crossing_edges(links, &range, &theirs)
                .iter()
                .map(|e| e.src - start)
                .collect();
            let recv = crossing_edges(links, &theirs, &range)
                .iter()
                .map(slot_of)
                .collect();
            outbound.insert(peer, send);
            inbound.insert(peer, recv);
        }

        Ok(Self {
            rank,
            workers: partition.workers(),
            range,
            slot_offsets,
            local,
            outbound,
            inbound,
        })
    }

    /// The worker this plan belongs to.
    pub fn rank(&self) -> WorkerRank {
        self.rank
    }

    /// Total number of workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Global node range owned by this worker.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Number of locally owned nodes.
    pub fn local_len(&self) -> usize {
        self.range.len()
    }

    /// Number of incoming edge slots.
    pub fn slot_count(&self) -> usize {
        self.slot_offsets[self.slot_offsets.len() - 1]
    }

    /// Local sources whose values go to `peer`, in packet order.
    pub fn outbound(&self, peer: WorkerRank) -> &[usize] {
        self.outbound.get(&peer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Slots filled by `peer`'s packet, in packet order.
    pub fn inbound(&self, peer: WorkerRank) -> &[usize] {
        self.inbound.get(&peer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every other worker, ascending.
    pub fn peers(&self) -> impl Iterator<Item = WorkerRank> + '_ {
        self.outbound.keys().copied()
    }

    /// Check caller buffers against the plan.
    pub fn check_buffers(&self, outflow: &[f64], inflow: &[f64]) -> Result<(), ExchangeError> {
        for found in [outflow.len(), inflow.len()] {
            if found != self.local_len() {
                return Err(ExchangeError::LengthMismatch {
                    peer: None,
                    expected: self.local_len(),
                    found,
                });
            }
        }
        Ok(())
    }

    /// Write local-to-local edge values into `slots`.
    pub fn scatter_local(&self, outflow: &[f64], slots: &mut [f64]) {
        for &(src, slot) in &self.local {
            slots[slot] = outflow[src];
        }
    }

    /// Values `peer` expects from this worker this round.
    pub fn pack(&self, peer: WorkerRank, outflow: &[f64]) -> Vec<f64> {
        self.outbound(peer).iter().map(|&src| outflow[src]).collect()
    }

    /// Place a packet from `peer` into `slots`.
    pub fn unpack(
        &self,
        peer: WorkerRank,
        values: &[f64],
        slots: &mut [f64],
    ) -> Result<(), ExchangeError> {
        let targets = self.inbound(peer);
        if targets.len() != values.len() {
            return Err(ExchangeError::LengthMismatch {
                peer: Some(peer),
                expected: targets.len(),
                found: values.len(),
            });
        }
        for (&slot, &v) in targets.iter().zip(values) {
            slots[slot] = v;
        }
        Ok(())
    }

    /// Sum each node's slots, in ascending source order.
    pub fn gather(&self, slots: &[f64], inflow: &mut [f64]) {
        for (d, out) in inflow.iter_mut().enumerate() {
            let mut total = 0.0;
            for &v in &slots[self.slot_offsets[d]..self.slot_offsets[d + 1]] {
                total += v;
            }
            *out = total;
        }
    }
}
