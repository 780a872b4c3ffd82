//! Drainage and irrigation networks.

use std::ops::Range;

use hydroute_core::{Downstream, GridCoord, NodeId};
use hydroute_queue::{TransferFunction, TransferStrategy};

use crate::error::TopologyError;
use crate::links::LinkTable;

/// Raw target index meaning "drains to the ocean or an inland sink".
pub const SINK_INDEX: i64 = -1;

/// One line of drainage input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrainageRecord {
    /// Index of the downstream cell, or [`SINK_INDEX`].
    pub downstream: i64,
    /// River length through the cell in metres.
    pub reach_length: f64,
}

/// Maps raw input indices onto grid cells.
///
/// Drainage files may index a larger source grid than the simulated one.
/// Entry `raw` holds the grid cell of source index `raw`, or `-1` when
/// that source cell is not simulated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexTranslation {
    table: Vec<i64>,
}

enum Resolved {
    Target(i64),
    Untranslated,
    OutOfTable,
}

impl IndexTranslation {
    /// Wrap a translation table.
    pub fn new(table: Vec<i64>) -> Self {
        Self { table }
    }

    /// Number of source indices covered.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// `true` if the table covers nothing.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn resolve(&self, raw: i64) -> Resolved {
        match usize::try_from(raw).ok().and_then(|i| self.table.get(i)) {
            None => Resolved::OutOfTable,
            Some(&t) if t < 0 => Resolved::Untranslated,
            Some(&t) => Resolved::Target(t),
        }
    }
}

/// Shared per-cell validation context.
struct CellInput<'a> {
    n: usize,
    coords: &'a [GridCoord],
    translation: Option<&'a IndexTranslation>,
}

impl CellInput<'_> {
    fn coord(&self, cell: NodeId) -> Option<GridCoord> {
        self.coords.get(cell.index()).copied()
    }

    /// Resolve a raw target to a node, the sink (`None`), or an error.
    fn target(&self, cell: NodeId, raw: i64) -> Result<Option<NodeId>, TopologyError> {
        if raw == SINK_INDEX {
            return Ok(None);
        }
        let invalid = || TopologyError::InvalidDownstream {
            cell,
            coord: self.coord(cell),
            raw,
        };
        let index = match self.translation {
            Some(t) => match t.resolve(raw) {
                Resolved::Target(i) => i,
                Resolved::Untranslated => {
                    return Err(TopologyError::UntranslatedIndex {
                        cell,
                        coord: self.coord(cell),
                        raw,
                    })
                }
                Resolved::OutOfTable => return Err(invalid()),
            },
            None => raw,
        };
        usize::try_from(index)
            .ok()
            .and_then(|i| NodeId::checked(i, self.n))
            .map(Some)
            .ok_or_else(invalid)
    }
}

fn check_len(what: &'static str, expected: usize, found: usize) -> Result<(), TopologyError> {
    if expected == found {
        Ok(())
    } else {
        Err(TopologyError::LengthMismatch {
            what,
            expected,
            found,
        })
    }
}

// ── River network ───────────────────────────────────────────────

/// The validated, acyclic drainage graph.
#[derive(Clone, Debug, PartialEq)]
pub struct RiverNetwork {
    downstream: Vec<Downstream>,
    reach_length: Vec<f64>,
    coords: Vec<GridCoord>,
    links: LinkTable,
    order: Vec<NodeId>,
    outlet: Vec<NodeId>,
}

impl RiverNetwork {
    /// Validate drainage records and build the network.
    ///
    /// `coords` is used for diagnostics only and may be empty; otherwise
    /// it must hold one coordinate per record.
    pub fn build(
        records: &[DrainageRecord],
        coords: &[GridCoord],
        translation: Option<&IndexTranslation>,
    ) -> Result<Self, TopologyError> {
        let n = records.len();
        if n > u32::MAX as usize {
            return Err(TopologyError::LengthMismatch {
                what: "drainage records",
                expected: u32::MAX as usize,
                found: n,
            });
        }
        if !coords.is_empty() {
            check_len("cell coordinates", n, coords.len())?;
        }
        let input = CellInput {
            n,
            coords,
            translation,
        };

        let mut targets = Vec::with_capacity(n);
        for (i, record) in records.iter().enumerate() {
            let cell = NodeId::new(i as u32);
            if !record.reach_length.is_finite() || record.reach_length < 0.0 {
                return Err(TopologyError::InvalidReachLength {
                    cell,
                    coord: input.coord(cell),
                    length: record.reach_length,
                });
            }
            let target = input.target(cell, record.downstream)?;
            if target == Some(cell) {
                return Err(TopologyError::Cycle {
                    cell,
                    coord: input.coord(cell),
                });
            }
            targets.push(target);
        }

        let links = LinkTable::from_targets(&targets);
        let order = topological_order(&links).map_err(|cell| TopologyError::Cycle {
            cell,
            coord: input.coord(cell),
        })?;

        let downstream: Vec<Downstream> = targets
            .iter()
            .map(|t| t.map_or(Downstream::Sink, Downstream::Node))
            .collect();
        let mut outlet: Vec<NodeId> = (0..n as u32).map(NodeId::new).collect();
        for &node in order.iter().rev() {
            if let Downstream::Node(d) = downstream[node.index()] {
                outlet[node.index()] = outlet[d.index()];
            }
        }

        let sinks = downstream.iter().filter(|d| d.is_sink()).count();
        log::debug!("drainage network: {n} cells, {sinks} outlets");

        Ok(Self {
            downstream,
            reach_length: records.iter().map(|r| r.reach_length).collect(),
            coords: coords.to_vec(),
            links,
            order,
            outlet,
        })
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.downstream.len()
    }

    /// `true` if the network has no cells.
    pub fn is_empty(&self) -> bool {
        self.downstream.is_empty()
    }

    /// Validate a raw index against this network.
    pub fn node(&self, index: usize) -> Option<NodeId> {
        NodeId::checked(index, self.len())
    }

    /// Where `node` drains to.
    pub fn downstream(&self, node: NodeId) -> Downstream {
        self.downstream[node.index()]
    }

    /// River length through `node` in metres.
    pub fn reach_length(&self, node: NodeId) -> f64 {
        self.reach_length[node.index()]
    }

    /// Coordinate of `node`, if coordinates were supplied.
    pub fn coord(&self, node: NodeId) -> Option<GridCoord> {
        self.coords.get(node.index()).copied()
    }

    /// Forward and upstream adjacency.
    pub fn links(&self) -> &LinkTable {
        &self.links
    }

    /// Cells draining directly into `node`, ascending.
    pub fn upstream(&self, node: NodeId) -> &[NodeId] {
        self.links.sources(node)
    }

    /// All cells, every cell before the cell it drains into.
    pub fn topological_order(&self) -> &[NodeId] {
        &self.order
    }

    /// The last cell on the path from `node` to its sink.
    pub fn outlet_of(&self, node: NodeId) -> NodeId {
        self.outlet[node.index()]
    }

    /// Derive the transfer functions of the reaches in `nodes`.
    ///
    /// `substeps_per_day` is the routing iteration count the queues will
    /// be stepped with.
    pub fn transfer_functions(
        &self,
        strategy: &dyn TransferStrategy,
        substeps_per_day: u32,
        nodes: Range<usize>,
    ) -> Result<Vec<TransferFunction>, TopologyError> {
        if nodes.start > nodes.end || nodes.end > self.len() {
            return Err(TopologyError::LengthMismatch {
                what: "transfer node range",
                expected: self.len(),
                found: nodes.end,
            });
        }
        let first = nodes.start;
        let functions = self.reach_length[nodes]
            .iter()
            .enumerate()
            .map(|(i, &len)| {
                strategy
                    .coefficients(len, substeps_per_day)
                    .map_err(|source| TopologyError::Transfer {
                        cell: NodeId::new((first + i) as u32),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if log::log_enabled!(log::Level::Debug) {
            let longest = functions.iter().map(TransferFunction::ncoeff).max();
            log::debug!(
                "{} transfer functions at {substeps_per_day} sub-steps, longest queue {}",
                strategy.name(),
                longest.unwrap_or(0)
            );
        }
        Ok(functions)
    }
}

/// Kahn's algorithm. On failure returns the lowest node left unordered.
fn topological_order(links: &LinkTable) -> Result<Vec<NodeId>, NodeId> {
    let n = links.len();
    let mut pending: Vec<usize> = (0..n)
        .map(|i| links.sources(NodeId::new(i as u32)).len())
        .collect();
    let mut order: Vec<NodeId> = (0..n as u32)
        .map(NodeId::new)
        .filter(|&node| pending[node.index()] == 0)
        .collect();
    let mut next = 0;
    while next < order.len() {
        let node = order[next];
        next += 1;
        for &to in links.targets(node) {
            pending[to.index()] -= 1;
            if pending[to.index()] == 0 {
                order.push(to);
            }
        }
    }
    if order.len() == n {
        return Ok(order);
    }
    let stuck = pending.iter().position(|&p| p > 0).unwrap_or(0);
    Err(NodeId::new(stuck as u32))
}

// ── Irrigation network ──────────────────────────────────────────

/// Which neighbour each cell may draw irrigation water from.
///
/// `forward` carries requests from a cell to its neighbour; `back`
/// is its mirror and carries delivered water back to the requesters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IrrigationNetwork {
    neighbour: Vec<Option<NodeId>>,
    forward: LinkTable,
    back: LinkTable,
}

impl IrrigationNetwork {
    /// Validate neighbour indices and build both directions.
    ///
    /// A cell naming itself, or [`SINK_INDEX`], has no neighbour.
    pub fn build(
        neighbours: &[i64],
        coords: &[GridCoord],
        translation: Option<&IndexTranslation>,
    ) -> Result<Self, TopologyError> {
        let n = neighbours.len();
        if !coords.is_empty() {
            check_len("cell coordinates", n, coords.len())?;
        }
        let input = CellInput {
            n,
            coords,
            translation,
        };
        let neighbour = neighbours
            .iter()
            .enumerate()
            .map(|(i, &raw)| {
                let cell = NodeId::new(i as u32);
                input
                    .target(cell, raw)
                    .map(|t| t.filter(|&t| t != cell))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let forward = LinkTable::from_targets(&neighbour);
        let back = forward.mirror();
        log::debug!(
            "irrigation network: {} of {n} cells draw from a neighbour",
            forward.edge_count()
        );
        Ok(Self {
            neighbour,
            forward,
            back,
        })
    }

    /// A network where no cell draws from a neighbour.
    pub fn disconnected(n: usize) -> Self {
        let neighbour = vec![None; n];
        let forward = LinkTable::from_targets(&neighbour);
        let back = forward.mirror();
        Self {
            neighbour,
            forward,
            back,
        }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.neighbour.len()
    }

    /// `true` if the network has no cells.
    pub fn is_empty(&self) -> bool {
        self.neighbour.is_empty()
    }

    /// The neighbour `node` draws from.
    pub fn neighbour(&self, node: NodeId) -> Option<NodeId> {
        self.neighbour[node.index()]
    }

    /// Cells drawing from `node`, ascending.
    pub fn requesters(&self, node: NodeId) -> &[NodeId] {
        self.forward.sources(node)
    }

    /// Request direction.
    pub fn forward(&self) -> &LinkTable {
        &self.forward
    }

    /// Delivery direction.
    pub fn back(&self) -> &LinkTable {
        &self.back
    }
}
