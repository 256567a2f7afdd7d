// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Edge splitting.
//!
//! When a vertex lands on the open segment of an existing edge, the edge is
//! replaced by two halves. Every directed edge over the old edge is replaced
//! by two directed halves in traversal order, and every wire that used it gets
//! both halves spliced in at the same position. Nothing outside the arena
//! holds the old keys, so the rewrite is local to a few index lists.

use crate::arena::*;
use crate::error::{Error, Result};
use crate::keys::*;
use crate::spatial::{point_segment_relation, OnSegment};

impl TopologyArena {
    /// Splits every edge whose open segment passes within tolerance of
    /// `vertex`.
    pub(crate) fn split_edges_at(&mut self, vertex: VertexKey) {
        let point = self.vertices[vertex].point;
        let tol = self.tolerance.vertex;

        let mut candidates = self.edge_grid.candidates_near(&point);
        candidates.sort();

        for ek in candidates {
            let Some(edge) = self.edges.get(ek) else {
                continue;
            };
            if edge.v0 == vertex || edge.v1 == vertex {
                continue;
            }
            let a = self.vertices[edge.v0].point;
            let b = self.vertices[edge.v1].point;

            match point_segment_relation(&point, &a, &b, tol) {
                OnSegment::Interior(_) => {
                    if let Err(err) = self.split_edge(ek, vertex) {
                        tracing::warn!(?ek, ?vertex, %err, "edge split failed");
                    }
                }
                OnSegment::Ambiguous => {
                    tracing::warn!(
                        ?ek,
                        ?vertex,
                        x = point.x,
                        y = point.y,
                        z = point.z,
                        "vertex near edge end cannot be placed on it; left unsplit"
                    );
                    self.unresolved.push((vertex, ek));
                }
                OnSegment::Off => {}
            }
        }
    }

    /// Replaces `edge` by the two halves meeting at `vertex`.
    ///
    /// Returns `(v0 → vertex, vertex → v1)` edges. Directed edges and wires
    /// that referenced the old edge are migrated in place, preserving
    /// direction and order. The old edge key becomes invalid.
    pub fn split_edge(&mut self, edge: EdgeKey, vertex: VertexKey) -> Result<(EdgeKey, EdgeKey)> {
        let old = self.edges.get(edge).cloned().ok_or(Error::EdgeNotFound(edge))?;
        if !self.vertices.contains_key(vertex) {
            return Err(Error::VertexNotFound(vertex));
        }
        if vertex == old.v0 || vertex == old.v1 {
            return Err(Error::DegenerateEdge(vertex));
        }

        // Retire the old edge first so neither half can resolve to it.
        self.edge_index.remove(&unordered(old.v0, old.v1));

        let first = self.get_edge(old.v0, vertex)?;
        let second = self.get_edge(vertex, old.v1)?;

        let mut directed: Vec<DirectedEdgeKey> = self
            .edge_to_directed
            .remove(&edge)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();
        directed.sort();

        for dk in directed {
            let Some(data) = self.directed_edges.get(dk).cloned() else {
                continue;
            };
            let (origin, terminal) = if data.inverted {
                (old.v1, old.v0)
            } else {
                (old.v0, old.v1)
            };
            self.directed_index.remove(&(origin, terminal));

            let head = self.get_directed_edge(origin, vertex)?;
            let tail = self.get_directed_edge(vertex, terminal)?;

            let mut wires: Vec<WireKey> = self
                .directed_to_wires
                .remove(&dk)
                .map(|set| set.into_iter().collect())
                .unwrap_or_default();
            wires.sort();

            for wk in wires {
                if let Some(wire) = self.wires.get_mut(wk) {
                    let mut rebuilt = Vec::with_capacity(wire.directed_edges.len() + 1);
                    for &existing in &wire.directed_edges {
                        if existing == dk {
                            rebuilt.push(head);
                            rebuilt.push(tail);
                        } else {
                            rebuilt.push(existing);
                        }
                    }
                    wire.directed_edges = rebuilt;
                }
                self.link_directed_wire(head, wk);
                self.link_directed_wire(tail, wk);
                debug_assert!(self.wire_is_closed(wk));
            }

            self.directed_edges.remove(dk);
        }

        self.edges.remove(edge);
        tracing::trace!(?edge, ?vertex, ?first, ?second, "split edge");
        Ok((first, second))
    }
}
