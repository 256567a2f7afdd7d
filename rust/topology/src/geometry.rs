// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometric queries on kernel entities.
//!
//! Computes lengths, directions, plane normals and areas of planar polygons
//! with nalgebra, without an external geometry kernel.

use nalgebra::{Point3, Vector3};

use crate::arena::TopologyArena;
use crate::keys::*;

/// Newell's polygon normal, unnormalised; its length is twice the area.
///
/// Works for any planar polygon (convex or concave). The direction follows
/// the right-hand rule relative to the vertex order.
pub fn newell_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut normal = Vector3::zeros();
    let n = points.len();

    for i in 0..n {
        let curr = points[i];
        let next = points[(i + 1) % n];

        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }

    normal
}

/// Best-fit plane normal of a closed loop, as a unit vector.
///
/// Uses the largest cross product of consecutive edge vectors, oriented to
/// agree with the Newell normal so it follows the loop's winding. Returns
/// `None` when every vertex is collinear.
pub fn plane_normal(points: &[Point3<f64>]) -> Option<Vector3<f64>> {
    let n = points.len();
    if n < 3 {
        return None;
    }

    let mut best = Vector3::zeros();
    let mut best_norm = 0.0;
    for i in 0..n {
        let e0 = points[(i + 1) % n] - points[i];
        let e1 = points[(i + 2) % n] - points[(i + 1) % n];
        let cross = e0.cross(&e1);
        let norm = cross.norm();
        if norm > best_norm {
            best = cross;
            best_norm = norm;
        }
    }

    if best_norm < 1e-12 {
        return None;
    }

    let normal = best / best_norm;
    if newell_normal(points).dot(&normal) < 0.0 {
        Some(-normal)
    } else {
        Some(normal)
    }
}

/// Area of a planar polygon.
pub fn polygon_area(points: &[Point3<f64>]) -> f64 {
    newell_normal(points).norm() / 2.0
}

impl TopologyArena {
    /// Returns the position of a vertex.
    pub fn vertex_point(&self, key: VertexKey) -> Option<Point3<f64>> {
        self.vertices.get(key).map(|v| v.point)
    }

    /// Returns the cached length of an edge.
    pub fn edge_length(&self, key: EdgeKey) -> Option<f64> {
        self.edges.get(key).map(|e| e.length)
    }

    /// Returns the unit direction of an edge, from `v0` to `v1`.
    pub fn edge_direction(&self, key: EdgeKey) -> Option<Vector3<f64>> {
        let edge = self.edges.get(key)?;
        let p0 = self.vertex_point(edge.v0)?;
        let p1 = self.vertex_point(edge.v1)?;
        (p1 - p0).try_normalize(1e-12)
    }

    /// Returns the positions of a wire's vertices in traversal order.
    pub fn wire_points(&self, key: WireKey) -> Option<Vec<Point3<f64>>> {
        self.wire_vertices(key)?
            .into_iter()
            .map(|vk| self.vertex_point(vk))
            .collect()
    }

    /// Returns the cached unit normal of a wire.
    pub fn wire_normal(&self, key: WireKey) -> Option<Vector3<f64>> {
        self.wires.get(key).map(|w| w.normal)
    }

    /// Returns the unit normal of a face (that of its outer wire).
    pub fn face_normal(&self, key: FaceKey) -> Option<Vector3<f64>> {
        let face = self.faces.get(key)?;
        self.wire_normal(face.outer_wire)
    }

    /// Area enclosed by a wire.
    pub fn wire_area(&self, key: WireKey) -> Option<f64> {
        Some(polygon_area(&self.wire_points(key)?))
    }

    /// Area of a face, with hole areas subtracted.
    pub fn face_area(&self, key: FaceKey) -> Option<f64> {
        let face = self.faces.get(key)?;
        let mut total = self.wire_area(face.outer_wire)?;
        for &hole in &face.hole_wires {
            total -= self.wire_area(hole)?;
        }
        Some(total.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construction::make_rectangle;
    use approx::assert_relative_eq;

    #[test]
    fn edge_length_and_direction() {
        let mut arena = TopologyArena::new();
        let v0 = arena.get_vertex([0.0, 0.0, 0.0]);
        let v1 = arena.get_vertex([3.0, 4.0, 0.0]);
        let edge = arena.get_edge(v0, v1).unwrap();

        assert_relative_eq!(arena.edge_length(edge).unwrap(), 5.0);
        let dir = arena.edge_direction(edge).unwrap();
        assert_relative_eq!(dir.x, 0.6);
        assert_relative_eq!(dir.y, 0.8);
    }

    #[test]
    fn plane_normal_follows_winding() {
        let ccw = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        assert_relative_eq!(plane_normal(&ccw).unwrap().z, 1.0);

        let cw: Vec<_> = ccw.iter().rev().copied().collect();
        assert_relative_eq!(plane_normal(&cw).unwrap().z, -1.0);
    }

    #[test]
    fn plane_normal_of_concave_loop() {
        // L-shape: one reflex vertex must not flip the normal.
        let l = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        assert_relative_eq!(plane_normal(&l).unwrap().z, 1.0);
        assert_relative_eq!(polygon_area(&l), 3.0);
    }

    #[test]
    fn collinear_points_have_no_plane() {
        let line = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        assert!(plane_normal(&line).is_none());
    }

    #[test]
    fn face_normal_xz_plane() {
        let mut arena = TopologyArena::new();
        let (face, _) = make_rectangle(
            &mut arena,
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
        )
        .unwrap();
        let normal = arena.face_normal(face).unwrap();

        assert_relative_eq!(normal.x, 0.0, epsilon = 1e-10);
        assert_relative_eq!(normal.y, -1.0, epsilon = 1e-10);
        assert_relative_eq!(normal.z, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn face_area_with_hole() {
        let mut arena = TopologyArena::new();
        let outer: Vec<_> = [[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [10.0, 10.0, 0.0], [0.0, 10.0, 0.0]]
            .iter()
            .map(|&c| arena.get_vertex(c))
            .collect();
        let hole: Vec<_> = [[4.0, 4.0, 0.0], [6.0, 4.0, 0.0], [6.0, 6.0, 0.0], [4.0, 6.0, 0.0]]
            .iter()
            .map(|&c| arena.get_vertex(c))
            .collect();
        let ow = arena.get_wire(&outer).unwrap();
        let hw = arena.get_wire(&hole).unwrap();
        let face = arena.get_face(ow, &[hw]).unwrap();

        assert_relative_eq!(arena.face_area(face).unwrap(), 96.0, epsilon = 1e-10);
    }
}
