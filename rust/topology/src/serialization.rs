// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON snapshot of a kernel arena.
//!
//! Slot map keys are replaced by sequential ids in slot order, so two arenas
//! built from the same input produce the same document. The snapshot is
//! write-only; it exists for debugging and audit trails.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::arena::*;
use crate::error::{Error, Result};

/// Serializable representation of the full kernel arena.
#[derive(Debug, Serialize)]
pub struct ArenaSnapshot {
    pub tolerance: ToleranceSnapshot,
    pub vertices: Vec<VertexSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
    pub wires: Vec<WireSnapshot>,
    pub faces: Vec<FaceSnapshot>,
    pub shells: Vec<ShellSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct ToleranceSnapshot {
    pub vertex: f64,
    pub planar: f64,
    pub grid_cell: f64,
}

#[derive(Debug, Serialize)]
pub struct VertexSnapshot {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Serialize)]
pub struct EdgeSnapshot {
    pub id: usize,
    pub v0: usize,
    pub v1: usize,
    pub length: f64,
}

/// A wire as its edge ids plus one `inverted` flag per edge.
#[derive(Debug, Serialize)]
pub struct WireSnapshot {
    pub id: usize,
    pub edges: Vec<usize>,
    pub inverted: Vec<bool>,
    pub normal: [f64; 3],
}

#[derive(Debug, Serialize)]
pub struct FaceSnapshot {
    pub id: usize,
    pub outer_wire: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hole_wires: Vec<usize>,
}

#[derive(Debug, Serialize)]
pub struct ShellSnapshot {
    pub id: usize,
    pub faces: Vec<usize>,
    pub closed: bool,
}

impl TopologyArena {
    /// Serializes the arena to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        let snapshot = self.to_snapshot()?;
        serde_json::to_string_pretty(&snapshot).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Creates a serializable snapshot of the arena.
    pub fn to_snapshot(&self) -> Result<ArenaSnapshot> {
        let mut vertex_ids = FxHashMap::default();
        let mut edge_ids = FxHashMap::default();
        let mut wire_ids = FxHashMap::default();
        let mut face_ids = FxHashMap::default();

        let vertices: Vec<VertexSnapshot> = self
            .vertices
            .iter()
            .enumerate()
            .map(|(i, (k, v))| {
                vertex_ids.insert(k, i);
                VertexSnapshot {
                    id: i,
                    x: v.point.x,
                    y: v.point.y,
                    z: v.point.z,
                }
            })
            .collect();

        let mut edges = Vec::with_capacity(self.edges.len());
        for (i, (k, e)) in self.edges.iter().enumerate() {
            edge_ids.insert(k, i);
            edges.push(EdgeSnapshot {
                id: i,
                v0: *vertex_ids.get(&e.v0).ok_or(Error::VertexNotFound(e.v0))?,
                v1: *vertex_ids.get(&e.v1).ok_or(Error::VertexNotFound(e.v1))?,
                length: e.length,
            });
        }

        let mut wires = Vec::with_capacity(self.wires.len());
        for (i, (k, w)) in self.wires.iter().enumerate() {
            wire_ids.insert(k, i);
            let mut ids = Vec::with_capacity(w.directed_edges.len());
            let mut inverted = Vec::with_capacity(w.directed_edges.len());
            for &dk in &w.directed_edges {
                let directed = self
                    .directed_edges
                    .get(dk)
                    .ok_or(Error::DirectedEdgeNotFound(dk))?;
                ids.push(
                    *edge_ids
                        .get(&directed.edge)
                        .ok_or(Error::EdgeNotFound(directed.edge))?,
                );
                inverted.push(directed.inverted);
            }
            wires.push(WireSnapshot {
                id: i,
                edges: ids,
                inverted,
                normal: [w.normal.x, w.normal.y, w.normal.z],
            });
        }

        let mut faces = Vec::with_capacity(self.faces.len());
        for (i, (k, f)) in self.faces.iter().enumerate() {
            face_ids.insert(k, i);
            let wire_id = |wk| wire_ids.get(&wk).copied().ok_or(Error::WireNotFound(wk));
            faces.push(FaceSnapshot {
                id: i,
                outer_wire: wire_id(f.outer_wire)?,
                hole_wires: f
                    .hole_wires
                    .iter()
                    .map(|&hw| wire_id(hw))
                    .collect::<Result<_>>()?,
            });
        }

        let mut shells = Vec::with_capacity(self.shells.len());
        for (i, (_, s)) in self.shells.iter().enumerate() {
            shells.push(ShellSnapshot {
                id: i,
                faces: s
                    .faces
                    .iter()
                    .map(|&fk| face_ids.get(&fk).copied().ok_or(Error::FaceNotFound(fk)))
                    .collect::<Result<_>>()?,
                closed: s.closed,
            });
        }

        Ok(ArenaSnapshot {
            tolerance: ToleranceSnapshot {
                vertex: self.tolerance.vertex,
                planar: self.tolerance.planar,
                grid_cell: self.tolerance.grid_cell,
            },
            vertices,
            edges,
            wires,
            faces,
            shells,
        })
    }
}
