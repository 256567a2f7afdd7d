// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for the envelope kernel.
//!
//! The [`TopologyArena`] is the central owner of all kernel data. Every entity
//! (vertex, edge, directed edge, wire, face, shell) lives inside a slot map
//! with stable, generational keys. Upward adjacency indices (edge → directed
//! edges → wires → faces) replace the parent back-pointers
//! a pointer-based model would need, so an edge split only rewrites a few
//! small key lists.
//!
//! Entities are deduplicated on insertion: vertices within tolerance, edges
//! per unordered vertex pair, directed edges per ordered pair, wires per
//! cyclic directed-edge sequence, faces per (outer, holes), shells per face
//! set. Use the `get_*` methods in [`crate::construction`] to obtain them.

use nalgebra::{Point3, Vector3};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

use crate::keys::*;
use crate::spatial::SpatialGrid;

/// Default vertex-merge tolerance (model length units).
pub const DEFAULT_VERTEX_TOLERANCE: f64 = 0.01;

/// Default plane-fit tolerance for wires and holes.
pub const DEFAULT_PLANAR_TOLERANCE: f64 = 0.01;

/// Default spatial grid cell size.
pub const DEFAULT_GRID_CELL: f64 = 1.0;

/// Tolerances governing dedup and planarity checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Two points closer than this are the same vertex.
    pub vertex: f64,
    /// Maximum distance of a wire vertex from the wire's plane.
    pub planar: f64,
    /// Spatial grid cell size; clamped to at least `2 × vertex`.
    pub grid_cell: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            vertex: DEFAULT_VERTEX_TOLERANCE,
            planar: DEFAULT_PLANAR_TOLERANCE,
            grid_cell: DEFAULT_GRID_CELL,
        }
    }
}

/// Data stored for a vertex.
#[derive(Debug, Clone)]
pub struct VertexData {
    pub point: Point3<f64>,
}

/// Data stored for an edge: an unordered pair of distinct vertices.
#[derive(Debug, Clone)]
pub struct EdgeData {
    pub v0: VertexKey,
    pub v1: VertexKey,
    /// Cached `|v1 - v0|`.
    pub length: f64,
}

/// Data stored for a directed edge.
#[derive(Debug, Clone)]
pub struct DirectedEdgeData {
    pub edge: EdgeKey,
    /// `false` traverses `v0 → v1`, `true` traverses `v1 → v0`.
    pub inverted: bool,
}

/// Data stored for a wire: a closed, planar cycle of directed edges.
#[derive(Debug, Clone)]
pub struct WireData {
    pub directed_edges: Vec<DirectedEdgeKey>,
    /// Unit plane normal, oriented by the traversal direction.
    pub normal: Vector3<f64>,
}

/// Data stored for a face: one outer wire and zero or more holes.
#[derive(Debug, Clone)]
pub struct FaceData {
    pub outer_wire: WireKey,
    pub hole_wires: Vec<WireKey>,
}

/// Data stored for a shell: an edge-connected set of faces.
#[derive(Debug, Clone)]
pub struct ShellData {
    pub faces: Vec<FaceKey>,
    /// `true` when every edge of the shell is used by exactly two faces.
    pub closed: bool,
}

/// The central arena that owns all kernel entities and their indices.
///
/// # Example
///
/// ```
/// use tbd_lite_topology::TopologyArena;
///
/// let mut arena = TopologyArena::new();
/// let a = arena.get_vertex([0.0, 0.0, 0.0]);
/// let b = arena.get_vertex([0.005, 0.0, 0.0]);
///
/// assert_eq!(a, b);
/// assert_eq!(arena.vertex_count(), 1);
/// ```
#[derive(Debug)]
pub struct TopologyArena {
    pub(crate) tolerance: Tolerance,

    // Entity storage
    pub(crate) vertices: SlotMap<VertexKey, VertexData>,
    pub(crate) edges: SlotMap<EdgeKey, EdgeData>,
    pub(crate) directed_edges: SlotMap<DirectedEdgeKey, DirectedEdgeData>,
    pub(crate) wires: SlotMap<WireKey, WireData>,
    pub(crate) faces: SlotMap<FaceKey, FaceData>,
    pub(crate) shells: SlotMap<ShellKey, ShellData>,

    // Upward adjacency: child → parents
    pub(crate) edge_to_directed: FxHashMap<EdgeKey, FxHashSet<DirectedEdgeKey>>,
    pub(crate) directed_to_wires: FxHashMap<DirectedEdgeKey, FxHashSet<WireKey>>,
    pub(crate) wire_to_faces: FxHashMap<WireKey, FxHashSet<FaceKey>>,

    // Identity indices
    pub(crate) edge_index: FxHashMap<(VertexKey, VertexKey), EdgeKey>,
    pub(crate) directed_index: FxHashMap<(VertexKey, VertexKey), DirectedEdgeKey>,
    pub(crate) face_index: FxHashMap<(WireKey, Vec<WireKey>), FaceKey>,
    pub(crate) shell_index: FxHashMap<Vec<FaceKey>, ShellKey>,

    // Spatial indices
    pub(crate) vertex_grid: SpatialGrid<VertexKey>,
    pub(crate) edge_grid: SpatialGrid<EdgeKey>,

    /// Vertices that sat within tolerance of an edge but could not be placed
    /// on it unambiguously.
    pub(crate) unresolved: Vec<(VertexKey, EdgeKey)>,
}

impl TopologyArena {
    /// Creates a new, empty arena with default tolerances.
    pub fn new() -> Self {
        Self::with_tolerance(Tolerance::default())
    }

    /// Creates a new, empty arena with the given tolerances.
    pub fn with_tolerance(tolerance: Tolerance) -> Self {
        let cell = tolerance.grid_cell.max(2.0 * tolerance.vertex).max(1e-9);
        let tolerance = Tolerance {
            grid_cell: cell,
            ..tolerance
        };

        Self {
            tolerance,

            vertices: SlotMap::with_key(),
            edges: SlotMap::with_key(),
            directed_edges: SlotMap::with_key(),
            wires: SlotMap::with_key(),
            faces: SlotMap::with_key(),
            shells: SlotMap::with_key(),

            edge_to_directed: FxHashMap::default(),
            directed_to_wires: FxHashMap::default(),
            wire_to_faces: FxHashMap::default(),

            edge_index: FxHashMap::default(),
            directed_index: FxHashMap::default(),
            face_index: FxHashMap::default(),
            shell_index: FxHashMap::default(),

            vertex_grid: SpatialGrid::new(cell),
            edge_grid: SpatialGrid::new(cell),

            unresolved: Vec::new(),
        }
    }

    /// Returns the tolerances in effect.
    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    // --- Vertex accessors ---

    /// Returns the vertex data for the given key, or `None` if not found.
    pub fn vertex(&self, key: VertexKey) -> Option<&VertexData> {
        self.vertices.get(key)
    }

    /// Returns the number of vertices in the arena.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    // --- Edge accessors ---

    /// Returns the number of edges in the arena.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Looks up the edge joining two vertices, in either order.
    pub fn find_edge(&self, a: VertexKey, b: VertexKey) -> Option<EdgeKey> {
        self.edge_index.get(&unordered(a, b)).copied()
    }

    // --- Directed edge accessors ---

    /// Returns the number of directed edges in the arena.
    pub fn directed_edge_count(&self) -> usize {
        self.directed_edges.len()
    }

    // --- Wire accessors ---

    /// Returns the number of wires in the arena.
    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    // --- Face accessors ---

    /// Returns the number of faces in the arena.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    // --- Shell accessors ---

    /// Returns the shell data for the given key, or `None` if not found.
    pub fn shell(&self, key: ShellKey) -> Option<&ShellData> {
        self.shells.get(key)
    }

    /// Returns the number of shells in the arena.
    pub fn shell_count(&self) -> usize {
        self.shells.len()
    }

    /// Vertices left unsplit because their position along an edge was
    /// ambiguous, paired with the edge they were near.
    pub fn unresolved_vertices(&self) -> &[(VertexKey, EdgeKey)] {
        &self.unresolved
    }

    // --- Adjacency index helpers ---

    pub(crate) fn link_edge_directed(&mut self, edge: EdgeKey, directed: DirectedEdgeKey) {
        self.edge_to_directed.entry(edge).or_default().insert(directed);
    }

    pub(crate) fn link_directed_wire(&mut self, directed: DirectedEdgeKey, wire: WireKey) {
        self.directed_to_wires.entry(directed).or_default().insert(wire);
    }

    pub(crate) fn link_wire_face(&mut self, wire: WireKey, face: FaceKey) {
        self.wire_to_faces.entry(wire).or_default().insert(face);
    }

}

impl Default for TopologyArena {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical (min, max) ordering of a vertex pair.
pub(crate) fn unordered(a: VertexKey, b: VertexKey) -> (VertexKey, VertexKey) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}
