// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Traversal methods for navigating the kernel hierarchy.
//!
//! Supports both downward traversal (shell → faces → wires → edges →
//! vertices) and upward traversal (edge → directed edges → wires → faces)
//! via the adjacency index. Every method that collects from a hash set sorts
//! its output so callers see a stable order.

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::arena::TopologyArena;
use crate::keys::*;

/// How a wire bounds the face it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum WireRole {
    Outer,
    Hole,
}

/// One use of an edge by a face, through one of the face's wires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeLink {
    pub face: FaceKey,
    pub wire: WireKey,
    pub role: WireRole,
    /// `(origin, terminal)` of the directed edge the wire traverses.
    pub traversal: (VertexKey, VertexKey),
}

// =============================================================================
// Downward traversal: extract sub-topologies
// =============================================================================

impl TopologyArena {
    /// Returns the `(v0, v1)` vertex keys of an edge.
    pub fn edge_vertices(&self, key: EdgeKey) -> Option<(VertexKey, VertexKey)> {
        self.edges.get(key).map(|e| (e.v0, e.v1))
    }

    /// Returns `(origin, terminal)` of a directed edge.
    pub fn directed_edge_endpoints(&self, key: DirectedEdgeKey) -> Option<(VertexKey, VertexKey)> {
        let directed = self.directed_edges.get(key)?;
        let edge = self.edges.get(directed.edge)?;
        if directed.inverted {
            Some((edge.v1, edge.v0))
        } else {
            Some((edge.v0, edge.v1))
        }
    }

    /// Returns the vertex keys of a wire in traversal order (one per edge,
    /// the origin of each directed edge).
    pub fn wire_vertices(&self, key: WireKey) -> Option<Vec<VertexKey>> {
        let wire = self.wires.get(key)?;
        wire.directed_edges
            .iter()
            .map(|&dk| self.directed_edge_endpoints(dk).map(|(origin, _)| origin))
            .collect()
    }

    /// Returns the edge keys of a wire in traversal order.
    pub fn wire_edges(&self, key: WireKey) -> Option<Vec<EdgeKey>> {
        let wire = self.wires.get(key)?;
        wire.directed_edges
            .iter()
            .map(|&dk| self.directed_edges.get(dk).map(|d| d.edge))
            .collect()
    }

    /// Checks that consecutive directed edges of a wire connect, including the
    /// last back to the first.
    pub fn wire_is_closed(&self, key: WireKey) -> bool {
        let Some(wire) = self.wires.get(key) else {
            return false;
        };
        if wire.directed_edges.len() < 3 {
            return false;
        }

        let ends: Option<Vec<_>> = wire
            .directed_edges
            .iter()
            .map(|&dk| self.directed_edge_endpoints(dk))
            .collect();
        let Some(ends) = ends else {
            return false;
        };

        (0..ends.len()).all(|i| ends[i].1 == ends[(i + 1) % ends.len()].0)
    }

    /// Returns the wires of a face, outer wire first.
    pub fn face_wires(&self, key: FaceKey) -> Option<Vec<WireKey>> {
        let face = self.faces.get(key)?;
        let mut wires = Vec::with_capacity(1 + face.hole_wires.len());
        wires.push(face.outer_wire);
        wires.extend_from_slice(&face.hole_wires);
        Some(wires)
    }

    /// Returns all unique edge keys in a face.
    pub fn face_edges(&self, key: FaceKey) -> Option<FxHashSet<EdgeKey>> {
        let mut set = FxHashSet::default();
        for wk in self.face_wires(key)? {
            if let Some(edges) = self.wire_edges(wk) {
                set.extend(edges);
            }
        }
        Some(set)
    }

    // =========================================================================
    // Upward traversal: find parents via adjacency index
    // =========================================================================

    /// Returns the directed edges built over an edge.
    pub fn edge_directed_edges(&self, key: EdgeKey) -> Vec<DirectedEdgeKey> {
        sorted(self.edge_to_directed.get(&key))
    }

    /// Returns wires that traverse a given directed edge.
    pub fn directed_edge_wires(&self, key: DirectedEdgeKey) -> Vec<WireKey> {
        sorted(self.directed_to_wires.get(&key))
    }

    /// Returns faces that use a given wire, as outer boundary or hole.
    pub fn wire_faces(&self, key: WireKey) -> Vec<FaceKey> {
        sorted(self.wire_to_faces.get(&key))
    }

    /// Returns every (face, wire) use of an edge, sorted by face then wire.
    ///
    /// A wire shared by two faces (an opening's outer wire is also its
    /// parent's hole) yields one link per face, each with its own role.
    pub fn edge_links(&self, key: EdgeKey) -> Vec<EdgeLink> {
        let mut links = Vec::new();
        for dk in self.edge_directed_edges(key) {
            let Some(traversal) = self.directed_edge_endpoints(dk) else {
                continue;
            };
            for wk in self.directed_edge_wires(dk) {
                for fk in self.wire_faces(wk) {
                    let Some(face) = self.faces.get(fk) else {
                        continue;
                    };
                    let role = if face.outer_wire == wk {
                        WireRole::Outer
                    } else {
                        WireRole::Hole
                    };
                    links.push(EdgeLink {
                        face: fk,
                        wire: wk,
                        role,
                        traversal,
                    });
                }
            }
        }
        links.sort_by(|a, b| a.face.cmp(&b.face).then(a.wire.cmp(&b.wire)));
        links
    }

    /// Returns the faces linked to an edge, without duplicates, sorted.
    pub fn edge_faces(&self, key: EdgeKey) -> Vec<FaceKey> {
        let mut faces: Vec<FaceKey> = self.edge_links(key).iter().map(|l| l.face).collect();
        faces.dedup();
        faces
    }

    /// Returns, in slot order, every edge used by at least `min_faces`
    /// distinct faces.
    pub fn edges_shared_by(&self, min_faces: usize) -> Vec<EdgeKey> {
        self.edges
            .keys()
            .filter(|&ek| self.edge_faces(ek).len() >= min_faces)
            .collect()
    }
}

fn sorted<K: Copy + Ord>(set: Option<&FxHashSet<K>>) -> Vec<K> {
    let mut out: Vec<K> = set.map(|s| s.iter().copied().collect()).unwrap_or_default();
    out.sort();
    out
}
