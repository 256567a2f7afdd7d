// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial hashing and the tolerance predicates shared by every dedup path.
//!
//! A [`SpatialGrid`] divides space into cubic cells. Points are binned into a
//! single cell; segments are binned into every cell touched by samples taken
//! each half cell along their length. Because the cell size is at least twice
//! the vertex tolerance, a 3x3x3 neighbourhood query around a point finds every
//! vertex within tolerance and every segment passing within tolerance.

use std::hash::Hash;

use nalgebra::Point3;
use rustc_hash::{FxHashMap, FxHashSet};

type Cell = (i64, i64, i64);

/// Returns `true` when two points are the same vertex: `|a - b|² < tol²`.
///
/// This is the only coincidence test in the kernel.
#[inline]
pub fn within_tolerance(a: &Point3<f64>, b: &Point3<f64>, tol: f64) -> bool {
    (a - b).norm_squared() < tol * tol
}

/// Position of a point relative to a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OnSegment {
    /// Not within tolerance of the segment, or coincident with an end.
    Off,
    /// On the open segment; `t` is the distance from the segment start.
    Interior(f64),
    /// Within tolerance of the segment line, but its projection falls within
    /// tolerance of an end it does not coincide with.
    Ambiguous,
}

/// Classifies `p` against the segment `a → b`.
pub fn point_segment_relation(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    tol: f64,
) -> OnSegment {
    if within_tolerance(p, a, tol) || within_tolerance(p, b, tol) {
        return OnSegment::Off;
    }

    let ab = b - a;
    let length = ab.norm();
    if length < tol {
        return OnSegment::Off;
    }

    let dir = ab / length;
    let t = (p - a).dot(&dir);
    if t < -tol || t > length + tol {
        return OnSegment::Off;
    }

    let foot = a + dir * t.clamp(0.0, length);
    if !within_tolerance(p, &foot, tol) {
        return OnSegment::Off;
    }

    if t <= tol || t >= length - tol {
        OnSegment::Ambiguous
    } else {
        OnSegment::Interior(t)
    }
}

/// A spatial hash grid over keys of type `K`.
///
/// Removed keys are never purged from the grid; callers skip stale keys when
/// they resolve candidates against the arena.
#[derive(Debug)]
pub struct SpatialGrid<K> {
    cell_size: f64,
    grid: FxHashMap<Cell, Vec<K>>,
}

impl<K: Copy + Eq + Hash> SpatialGrid<K> {
    /// Creates an empty grid with the given cell size.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            grid: FxHashMap::default(),
        }
    }

    /// Returns the cell size.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Bins a key at a single point.
    pub fn insert_point(&mut self, key: K, p: &Point3<f64>) {
        let cell = self.cell_of(p);
        self.grid.entry(cell).or_default().push(key);
    }

    /// Bins a key along a segment.
    pub fn insert_segment(&mut self, key: K, a: &Point3<f64>, b: &Point3<f64>) {
        for cell in self.segment_cells(a, b) {
            self.grid.entry(cell).or_default().push(key);
        }
    }

    /// Returns every key binned in the 3x3x3 neighbourhood of `p`, without
    /// duplicates, in first-seen order.
    pub fn candidates_near(&self, p: &Point3<f64>) -> Vec<K> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for cell in neighbourhood(self.cell_of(p)) {
            if let Some(keys) = self.grid.get(&cell) {
                for &k in keys {
                    if seen.insert(k) {
                        out.push(k);
                    }
                }
            }
        }
        out
    }

    /// Returns every key binned near the segment `a → b`.
    pub fn candidates_along(&self, a: &Point3<f64>, b: &Point3<f64>) -> Vec<K> {
        let mut cells = FxHashSet::default();
        for cell in self.segment_cells(a, b) {
            cells.extend(neighbourhood(cell));
        }

        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for cell in cells {
            if let Some(keys) = self.grid.get(&cell) {
                for &k in keys {
                    if seen.insert(k) {
                        out.push(k);
                    }
                }
            }
        }
        out
    }

    fn cell_of(&self, p: &Point3<f64>) -> Cell {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
            (p.z / self.cell_size).floor() as i64,
        )
    }

    fn segment_cells(&self, a: &Point3<f64>, b: &Point3<f64>) -> FxHashSet<Cell> {
        let step = self.cell_size * 0.5;
        let length = (b - a).norm();
        let samples = (length / step).ceil().max(1.0) as usize;

        let mut cells = FxHashSet::default();
        for i in 0..=samples {
            let t = i as f64 / samples as f64;
            cells.insert(self.cell_of(&(a + (b - a) * t)));
        }
        cells
    }
}

fn neighbourhood((cx, cy, cz): Cell) -> impl Iterator<Item = Cell> {
    (-1..=1).flat_map(move |dx| {
        (-1..=1).flat_map(move |dy| (-1..=1).map(move |dz| (cx + dx, cy + dy, cz + dz)))
    })
}
