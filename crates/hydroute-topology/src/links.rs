//! Compressed adjacency for directed cell graphs.

use hydroute_core::NodeId;

/// Forward and reverse adjacency of a directed graph over `0..n`.
///
/// Both directions are stored in CSR form. Reverse lists (the sources
/// feeding a node) are sorted by ascending source index; the exchange
/// layer relies on that order for reproducible summation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkTable {
    out_offsets: Vec<u32>,
    out_targets: Vec<NodeId>,
    in_offsets: Vec<u32>,
    in_sources: Vec<NodeId>,
}

fn csr(n: usize, edges: &[(NodeId, NodeId)]) -> (Vec<u32>, Vec<NodeId>) {
    let mut offsets = vec![0u32; n + 1];
    for (from, _) in edges {
        offsets[from.index() + 1] += 1;
    }
    for i in 0..n {
        offsets[i + 1] += offsets[i];
    }
    let mut cursor: Vec<u32> = offsets[..n].to_vec();
    let mut values = vec![NodeId::new(0); edges.len()];
    for &(from, to) in edges {
        let at = &mut cursor[from.index()];
        values[*at as usize] = to;
        *at += 1;
    }
    (offsets, values)
}

impl LinkTable {
    /// Build from an edge list over `n` nodes.
    ///
    /// Edges keep their relative order in the forward lists; reverse
    /// lists are sorted by source.
    pub fn from_edges(n: usize, edges: &[(NodeId, NodeId)]) -> Self {
        let (out_offsets, out_targets) = csr(n, edges);
        let mut reversed: Vec<(NodeId, NodeId)> = edges.iter().map(|&(a, b)| (b, a)).collect();
        reversed.sort_by_key(|&(to, from)| (to, from));
        let (in_offsets, in_sources) = csr(n, &reversed);
        Self {
            out_offsets,
            out_targets,
            in_offsets,
            in_sources,
        }
    }

    /// Build from at most one target per node.
    pub fn from_targets(targets: &[Option<NodeId>]) -> Self {
        let edges: Vec<(NodeId, NodeId)> = targets
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.map(|t| (NodeId::new(i as u32), t)))
            .collect();
        Self::from_edges(targets.len(), &edges)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.out_offsets.len() - 1
    }

    /// `true` if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.out_targets.len()
    }

    /// Nodes `node` sends to.
    pub fn targets(&self, node: NodeId) -> &[NodeId] {
        let i = node.index();
        &self.out_targets[self.out_offsets[i] as usize..self.out_offsets[i + 1] as usize]
    }

    /// Nodes sending to `node`, ascending.
    pub fn sources(&self, node: NodeId) -> &[NodeId] {
        let i = node.index();
        &self.in_sources[self.in_offsets[i] as usize..self.in_offsets[i + 1] as usize]
    }

    /// The same graph with every edge reversed.
    pub fn mirror(&self) -> Self {
        let edges: Vec<(NodeId, NodeId)> = (0..self.len())
            .flat_map(|i| {
                let from = NodeId::new(i as u32);
                self.targets(from).iter().map(move |&to| (to, from))
            })
            .collect();
        Self::from_edges(self.len(), &edges)
    }
}
