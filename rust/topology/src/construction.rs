// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Get-or-create constructors for kernel entities.
//!
//! Every constructor first looks for an existing entity with the same
//! identity and returns it; only otherwise does it validate and insert a new
//! one. Referenced sub-entities must already be registered.

use std::collections::VecDeque;

use nalgebra::Point3;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::arena::*;
use crate::error::{Error, Result};
use crate::geometry::plane_normal;
use crate::keys::*;
use crate::spatial::{point_segment_relation, within_tolerance, OnSegment};

impl TopologyArena {
    /// Returns the vertex within tolerance of `coords`, creating it if none
    /// exists.
    ///
    /// A newly created vertex that lies on the open segment of an existing
    /// edge splits that edge (see [`TopologyArena::split_edge`]).
    pub fn get_vertex(&mut self, coords: [f64; 3]) -> VertexKey {
        let point = Point3::from(coords);
        if let Some(existing) = self.find_vertex(&point) {
            return existing;
        }

        let key = self.vertices.insert(VertexData { point });
        self.vertex_grid.insert_point(key, &point);
        self.split_edges_at(key);
        key
    }

    /// Returns the closest vertex within tolerance of `point`, if any.
    pub fn find_vertex(&self, point: &Point3<f64>) -> Option<VertexKey> {
        let tol = self.tolerance.vertex;
        let mut best: Option<(VertexKey, f64)> = None;

        for vk in self.vertex_grid.candidates_near(point) {
            let Some(v) = self.vertices.get(vk) else {
                continue;
            };
            if !within_tolerance(&v.point, point, tol) {
                continue;
            }
            let dist_sq = (v.point - point).norm_squared();
            if best.map_or(true, |(_, d)| dist_sq < d) {
                best = Some((vk, dist_sq));
            }
        }

        best.map(|(k, _)| k)
    }

    /// Returns the edge joining two vertices, creating it if needed.
    pub fn get_edge(&mut self, v0: VertexKey, v1: VertexKey) -> Result<EdgeKey> {
        let p0 = self.vertex(v0).ok_or(Error::VertexNotFound(v0))?.point;
        let p1 = self.vertex(v1).ok_or(Error::VertexNotFound(v1))?.point;
        if v0 == v1 {
            return Err(Error::DegenerateEdge(v0));
        }

        if let Some(existing) = self.find_edge(v0, v1) {
            return Ok(existing);
        }

        let key = self.edges.insert(EdgeData {
            v0,
            v1,
            length: (p1 - p0).norm(),
        });
        self.edge_index.insert(unordered(v0, v1), key);
        self.edge_grid.insert_segment(key, &p0, &p1);
        Ok(key)
    }

    /// Returns the directed edge traversing `origin → terminal`, creating it
    /// (and its undirected edge) if needed.
    pub fn get_directed_edge(
        &mut self,
        origin: VertexKey,
        terminal: VertexKey,
    ) -> Result<DirectedEdgeKey> {
        if let Some(&existing) = self.directed_index.get(&(origin, terminal)) {
            return Ok(existing);
        }

        let edge = self.get_edge(origin, terminal)?;
        let inverted = self.edges[edge].v0 != origin;

        let key = self.directed_edges.insert(DirectedEdgeData { edge, inverted });
        self.directed_index.insert((origin, terminal), key);
        self.link_edge_directed(edge, key);
        Ok(key)
    }

    /// Returns the wire tracing the closed vertex loop, creating it if needed.
    ///
    /// The loop is implicitly closed (the last vertex connects back to the
    /// first). Existing vertices lying on a loop segment are spliced into the
    /// loop, ordered along the segment, so the wire follows edges that have
    /// already been split. A rotated copy of a registered loop returns the
    /// registered wire.
    pub fn get_wire(&mut self, vertices: &[VertexKey]) -> Result<WireKey> {
        for &vk in vertices {
            if !self.vertices.contains_key(vk) {
                return Err(Error::VertexNotFound(vk));
            }
        }

        let mut ring = self.splice_on_segment_vertices(vertices);
        ring.dedup();
        while ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        if ring.len() < 3 {
            return Err(Error::DegenerateWire(ring.len()));
        }

        // Planarity first, so a bad loop leaves no directed edges behind.
        let points: Vec<Point3<f64>> = ring.iter().map(|&vk| self.vertices[vk].point).collect();
        self.check_planarity(&points)?;

        let mut directed = Vec::with_capacity(ring.len());
        for i in 0..ring.len() {
            directed.push(self.get_directed_edge(ring[i], ring[(i + 1) % ring.len()])?);
        }
        self.get_wire_from_directed_edges(&directed)
    }

    /// Returns the wire made of the given directed edges, creating it if
    /// needed.
    ///
    /// The edges must be sequential (each terminal is the next origin),
    /// closed, at least three, and planar.
    pub fn get_wire_from_directed_edges(
        &mut self,
        directed: &[DirectedEdgeKey],
    ) -> Result<WireKey> {
        let mut ends = Vec::with_capacity(directed.len());
        for &dk in directed {
            ends.push(
                self.directed_edge_endpoints(dk)
                    .ok_or(Error::DirectedEdgeNotFound(dk))?,
            );
        }
        if directed.len() < 3 {
            return Err(Error::DegenerateWire(directed.len()));
        }
        for i in 0..ends.len() - 1 {
            if ends[i].1 != ends[i + 1].0 {
                return Err(Error::DisconnectedWire(i, i + 1));
            }
        }
        if ends[ends.len() - 1].1 != ends[0].0 {
            return Err(Error::OpenWire);
        }

        let points: Vec<Point3<f64>> = ends
            .iter()
            .map(|&(origin, _)| self.vertices[origin].point)
            .collect();
        let normal = self.check_planarity(&points)?;

        if let Some(existing) = self.find_wire(directed) {
            return Ok(existing);
        }
        Ok(self.insert_wire(directed.to_vec(), normal))
    }

    /// Returns the face bounded by `outer` with the given holes, creating it
    /// if needed.
    ///
    /// Holes must be coplanar with the outer wire and wound the same way.
    pub fn get_face(&mut self, outer: WireKey, holes: &[WireKey]) -> Result<FaceKey> {
        let outer_normal = self.wires.get(outer).ok_or(Error::WireNotFound(outer))?.normal;
        let outer_origin = self
            .wire_points(outer)
            .and_then(|pts| pts.first().copied())
            .ok_or(Error::WireNotFound(outer))?;

        for &hole in holes {
            let hole_normal = self.wires.get(hole).ok_or(Error::WireNotFound(hole))?.normal;
            let points = self.wire_points(hole).unwrap_or_default();
            if points
                .iter()
                .any(|p| (p - outer_origin).dot(&outer_normal).abs() > self.tolerance.planar)
            {
                return Err(Error::NonCoplanarHole(hole));
            }
            if hole_normal.dot(&outer_normal) <= 0.0 {
                return Err(Error::HoleWinding(hole));
            }
        }

        let mut sorted_holes = holes.to_vec();
        sorted_holes.sort();
        sorted_holes.dedup();
        let identity = (outer, sorted_holes);
        if let Some(&existing) = self.face_index.get(&identity) {
            return Ok(existing);
        }

        let key = self.faces.insert(FaceData {
            outer_wire: outer,
            hole_wires: identity.1.clone(),
        });
        self.link_wire_face(outer, key);
        for &hole in &identity.1 {
            self.link_wire_face(hole, key);
        }
        self.face_index.insert(identity, key);
        Ok(key)
    }

    /// Returns the shell made of the given faces, creating it if needed.
    ///
    /// Every face must be reachable from every other through shared edges.
    pub fn get_shell(&mut self, faces: &[FaceKey]) -> Result<ShellKey> {
        if faces.is_empty() {
            return Err(Error::EmptyShell);
        }
        for &fk in faces {
            if !self.faces.contains_key(fk) {
                return Err(Error::FaceNotFound(fk));
            }
        }

        let mut members = faces.to_vec();
        members.sort();
        members.dedup();
        if let Some(&existing) = self.shell_index.get(&members) {
            return Ok(existing);
        }

        let reached = self.reachable_faces(&members);
        if reached < members.len() {
            return Err(Error::DisconnectedShell {
                unreached: members.len() - reached,
                total: members.len(),
            });
        }

        let mut edge_use: FxHashMap<EdgeKey, usize> = FxHashMap::default();
        for &fk in &members {
            for ek in self.face_edges(fk).unwrap_or_default() {
                *edge_use.entry(ek).or_insert(0) += 1;
            }
        }
        let closed = !edge_use.is_empty() && edge_use.values().all(|&n| n == 2);

        let key = self.shells.insert(ShellData {
            faces: members.clone(),
            closed,
        });
        self.shell_index.insert(members, key);
        Ok(key)
    }

    /// Partitions faces into groups connected through shared edges.
    ///
    /// Groups appear in the order of their first face in `faces`; faces keep
    /// their input order within a group.
    pub fn connected_face_groups(&self, faces: &[FaceKey]) -> Vec<Vec<FaceKey>> {
        let edge_faces = self.edge_face_map(faces);
        let mut group_of: FxHashMap<FaceKey, usize> = FxHashMap::default();
        let mut group_count = 0;

        for &start in faces {
            if group_of.contains_key(&start) || !self.faces.contains_key(start) {
                continue;
            }
            let group = group_count;
            group_count += 1;
            group_of.insert(start, group);

            let mut queue = VecDeque::from([start]);
            while let Some(fk) = queue.pop_front() {
                for ek in self.face_edges(fk).unwrap_or_default() {
                    for &neighbour in edge_faces.get(&ek).into_iter().flatten() {
                        if !group_of.contains_key(&neighbour) {
                            group_of.insert(neighbour, group);
                            queue.push_back(neighbour);
                        }
                    }
                }
            }
        }

        let mut groups = vec![Vec::new(); group_count];
        let mut placed = FxHashSet::default();
        for &fk in faces {
            if let Some(&g) = group_of.get(&fk) {
                if placed.insert(fk) {
                    groups[g].push(fk);
                }
            }
        }
        groups
    }

    // --- internals ---

    /// Counts the faces reachable from the first member through shared edges.
    fn reachable_faces(&self, members: &[FaceKey]) -> usize {
        let edge_faces = self.edge_face_map(members);
        let mut seen: FxHashSet<FaceKey> = FxHashSet::default();
        let mut queue = VecDeque::new();
        seen.insert(members[0]);
        queue.push_back(members[0]);

        while let Some(fk) = queue.pop_front() {
            for ek in self.face_edges(fk).unwrap_or_default() {
                for &neighbour in edge_faces.get(&ek).into_iter().flatten() {
                    if seen.insert(neighbour) {
                        queue.push_back(neighbour);
                    }
                }
            }
        }
        seen.len()
    }

    fn edge_face_map(&self, faces: &[FaceKey]) -> FxHashMap<EdgeKey, Vec<FaceKey>> {
        let mut map: FxHashMap<EdgeKey, Vec<FaceKey>> = FxHashMap::default();
        for &fk in faces {
            for ek in self.face_edges(fk).unwrap_or_default() {
                map.entry(ek).or_default().push(fk);
            }
        }
        map
    }

    /// Inserts, between consecutive loop vertices, every registered vertex
    /// lying on the open segment joining them.
    fn splice_on_segment_vertices(&self, vertices: &[VertexKey]) -> Vec<VertexKey> {
        let tol = self.tolerance.vertex;
        let n = vertices.len();
        let mut ring = Vec::with_capacity(n);

        for i in 0..n {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            ring.push(a);
            if a == b {
                continue;
            }

            let pa = self.vertices[a].point;
            let pb = self.vertices[b].point;
            let mut between: Vec<(f64, VertexKey)> = self
                .vertex_grid
                .candidates_along(&pa, &pb)
                .into_iter()
                .filter(|&vk| vk != a && vk != b)
                .filter_map(|vk| {
                    let p = self.vertices.get(vk)?.point;
                    match point_segment_relation(&p, &pa, &pb, tol) {
                        OnSegment::Interior(t) => Some((t, vk)),
                        _ => None,
                    }
                })
                .collect();
            between.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));
            ring.extend(between.into_iter().map(|(_, vk)| vk));
        }

        ring
    }

    /// Validates planarity and returns the traversal-oriented unit normal.
    fn check_planarity(&self, points: &[Point3<f64>]) -> Result<nalgebra::Vector3<f64>> {
        let normal = plane_normal(points).ok_or(Error::DegenerateWire(points.len()))?;
        let origin = points[0];
        for (index, p) in points.iter().enumerate() {
            let distance = (p - origin).dot(&normal).abs();
            if distance > self.tolerance.planar {
                return Err(Error::NonPlanarWire {
                    index,
                    distance,
                    tolerance: self.tolerance.planar,
                });
            }
        }
        Ok(normal)
    }

    /// Finds a registered wire with the same cyclic directed-edge sequence.
    fn find_wire(&self, directed: &[DirectedEdgeKey]) -> Option<WireKey> {
        let first = *directed.first()?;
        let mut candidates: Vec<WireKey> = self
            .directed_to_wires
            .get(&first)?
            .iter()
            .copied()
            .collect();
        candidates.sort();

        candidates.into_iter().find(|&wk| {
            let existing = &self.wires[wk].directed_edges;
            existing.len() == directed.len()
                && existing.iter().enumerate().any(|(offset, &dk)| {
                    dk == first
                        && (0..directed.len())
                            .all(|i| existing[(offset + i) % existing.len()] == directed[i])
                })
        })
    }

    fn insert_wire(
        &mut self,
        directed: Vec<DirectedEdgeKey>,
        normal: nalgebra::Vector3<f64>,
    ) -> WireKey {
        let key = self.wires.insert(WireData {
            directed_edges: directed.clone(),
            normal,
        });
        for dk in directed {
            self.link_directed_wire(dk, key);
        }
        key
    }
}

/// Builds a planar rectangular face from four corner coordinates.
///
/// Returns `(face, wire)`.
pub fn make_rectangle(
    arena: &mut TopologyArena,
    corners: [[f64; 3]; 4],
) -> Result<(FaceKey, WireKey)> {
    let vertices: Vec<VertexKey> = corners.iter().map(|&c| arena.get_vertex(c)).collect();
    let wire = arena.get_wire(&vertices)?;
    let face = arena.get_face(wire, &[])?;
    Ok((face, wire))
}
