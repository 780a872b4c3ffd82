//! Static assignment of contiguous node ranges to workers.

use std::ops::Range;

use hydroute_core::{NodeId, WorkerRank};

use crate::error::TopologyError;

/// Contiguous ownership ranges, one per worker.
///
/// Worker `r` owns `starts[r]..starts[r + 1]`. Ownership never changes
/// during a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    starts: Vec<usize>,
}

impl Partition {
    /// Split `n` nodes evenly over `workers`; the first `n % workers`
    /// ranks get one extra node.
    pub fn contiguous(n: usize, workers: usize) -> Result<Self, TopologyError> {
        if workers == 0 {
            return Err(TopologyError::InvalidPartition {
                reason: "worker count must be at least 1".into(),
            });
        }
        let base = n / workers;
        let extra = n % workers;
        let sizes: Vec<usize> = (0..workers)
            .map(|r| base + usize::from(r < extra))
            .collect();
        Self::from_sizes(&sizes)
    }

    /// Partition with explicit per-worker sizes. Empty ranges are allowed.
    pub fn from_sizes(sizes: &[usize]) -> Result<Self, TopologyError> {
        if sizes.is_empty() {
            return Err(TopologyError::InvalidPartition {
                reason: "worker count must be at least 1".into(),
            });
        }
        let mut starts = Vec::with_capacity(sizes.len() + 1);
        let mut at = 0usize;
        starts.push(at);
        for &s in sizes {
            at += s;
            starts.push(at);
        }
        if at > u32::MAX as usize {
            return Err(TopologyError::InvalidPartition {
                reason: format!("{at} nodes exceed the node index range"),
            });
        }
        log::debug!("partitioned {at} nodes over {} workers", sizes.len());
        Ok(Self { starts })
    }

    /// Number of workers.
    pub fn workers(&self) -> usize {
        self.starts.len() - 1
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.starts[self.starts.len() - 1]
    }

    /// `true` if no worker owns anything.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Global index range owned by `rank`.
    pub fn range(&self, rank: WorkerRank) -> Range<usize> {
        self.starts[rank.index()]..self.starts[rank.index() + 1]
    }

    /// Worker owning `node`.
    pub fn owner(&self, node: NodeId) -> WorkerRank {
        let i = node.index();
        // Last start <= i; empty ranges share a start, take the last.
        let rank = self.starts.partition_point(|&s| s <= i) - 1;
        WorkerRank(rank.min(self.workers() - 1) as u32)
    }

    /// All ranks in order.
    pub fn ranks(&self) -> impl Iterator<Item = WorkerRank> {
        (0..self.workers() as u32).map(WorkerRank)
    }
}
