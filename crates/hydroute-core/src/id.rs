//! Strongly-typed handles for nodes, workers, and downstream targets.

use std::fmt;

/// Handle to a node (grid cell) in the global routing grid.
///
/// A `NodeId` is the contiguous index of the cell in the global grid.
/// Handles are only handed out by a network after its bounds have been
/// checked, so code holding a `NodeId` obtained from a network never needs
/// to re-validate it against that network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Wrap a raw index.
    ///
    /// Prefer the checked constructors on the network types; this is
    /// meant for code that already iterates over a validated range.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Build a handle from `index` if it lies below `len`.
    pub fn checked(index: usize, len: usize) -> Option<Self> {
        if index < len {
            u32::try_from(index).ok().map(Self)
        } else {
            None
        }
    }

    /// The global grid index of this node.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The raw `u32` value.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rank of a parallel routing worker.
///
/// Workers own disjoint contiguous partitions of the node arena. Rank 0
/// owns the lowest node indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerRank(pub u32);

impl WorkerRank {
    /// The rank as a `usize` index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for WorkerRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for WorkerRank {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Where the water leaving a cell goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Downstream {
    /// Another node of the grid.
    Node(NodeId),
    /// Ocean or inland terminus. Water arriving here leaves the model.
    Sink,
}

impl Downstream {
    /// The downstream node, or `None` for the sink.
    pub fn node(self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(id),
            Self::Sink => None,
        }
    }

    /// Whether this target is the sink.
    pub fn is_sink(self) -> bool {
        matches!(self, Self::Sink)
    }
}

impl fmt::Display for Downstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => write!(f, "node {id}"),
            Self::Sink => write!(f, "sink"),
        }
    }
}

/// Geographic coordinate of a cell centre, in decimal degrees.
///
/// Only used for diagnostics: fatal topology errors name the coordinate
/// of the offending cell.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GridCoord {
    /// Longitude in degrees east.
    pub lon: f64,
    /// Latitude in degrees north.
    pub lat: f64,
}

impl GridCoord {
    /// Create a coordinate.
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.lat < 0.0 { 'S' } else { 'N' };
        let ew = if self.lon < 0.0 { 'W' } else { 'E' };
        write!(
            f,
            "{:.2}{ns} {:.2}{ew}",
            self.lat.abs(),
            self.lon.abs()
        )
    }
}
