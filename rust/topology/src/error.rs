// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for kernel operations.

use crate::keys::*;

/// Result type alias for kernel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or querying the kernel.
///
/// Every variant except the `*NotFound` family is a geometry defect: the
/// classifier assumes valid topology, so callers treat them as fatal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Vertex key not found in the arena.
    #[error("vertex not found: {0:?}")]
    VertexNotFound(VertexKey),

    /// Edge key not found in the arena.
    #[error("edge not found: {0:?}")]
    EdgeNotFound(EdgeKey),

    /// Directed edge key not found in the arena.
    #[error("directed edge not found: {0:?}")]
    DirectedEdgeNotFound(DirectedEdgeKey),

    /// Wire key not found in the arena.
    #[error("wire not found: {0:?}")]
    WireNotFound(WireKey),

    /// Face key not found in the arena.
    #[error("face not found: {0:?}")]
    FaceNotFound(FaceKey),

    /// An edge needs two distinct vertices.
    #[error("edge endpoints coincide: {0:?}")]
    DegenerateEdge(VertexKey),

    /// A wire needs at least three edges.
    #[error("wire has {0} edges, at least 3 are required")]
    DegenerateWire(usize),

    /// Consecutive directed edges do not share a vertex.
    #[error("wire edges are not sequential: edge {0} terminal does not match edge {1} origin")]
    DisconnectedWire(usize, usize),

    /// The last directed edge does not return to the first origin.
    #[error("wire is not closed")]
    OpenWire,

    /// A wire vertex lies off the best-fit plane.
    #[error("wire is not planar: vertex {index} is {distance:.4} off plane (tolerance {tolerance})")]
    NonPlanarWire {
        index: usize,
        distance: f64,
        tolerance: f64,
    },

    /// A hole wire does not lie in the plane of its face's outer wire.
    #[error("hole wire {0:?} is not coplanar with its outer wire")]
    NonCoplanarHole(WireKey),

    /// A hole wire is wound against its face's outer wire.
    #[error("hole wire {0:?} is wound opposite to its outer wire")]
    HoleWinding(WireKey),

    /// A shell must have at least one face.
    #[error("shell must have at least one face")]
    EmptyShell,

    /// Some shell faces cannot be reached from the others through shared edges.
    #[error("shell is not connected: {unreached} of {total} faces unreachable")]
    DisconnectedShell { unreached: usize, total: usize },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}
