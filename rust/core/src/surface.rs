// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface records fed to the core by the host model.
//!
//! Polygons are in absolute coordinates, wound counter-clockwise when seen
//! from outside, so the right-hand normal points outward. Deratability and
//! boundary conditions are decided by the host before ingestion.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceType {
    Floor,
    Wall,
    #[serde(alias = "roofceiling", alias = "roof", alias = "ceiling")]
    RoofCeiling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubSurfaceKind {
    FixedWindow,
    OperableWindow,
    Door,
    GlassDoor,
    OverheadDoor,
    Skylight,
    TubularDaylightDome,
    TubularDaylightDiffuser,
}

/// What lies on the other side of a surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundaryCondition {
    Outdoors,
    Ground,
    Adiabatic,
    /// Interzone surface facing `adjacent`.
    Surface { adjacent: String },
    OtherSideCoefficients,
}

impl BoundaryCondition {
    pub fn is_ground(&self) -> bool {
        matches!(self, BoundaryCondition::Ground)
    }

    pub fn is_outdoors(&self) -> bool {
        matches!(self, BoundaryCondition::Outdoors)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerKind {
    /// Resistance-only material [m²·K/W].
    Massless { resistance: f64 },
    /// Conductivity [W/m·K] and thickness [m].
    Standard { conductivity: f64, thickness: f64 },
}

/// The construction layer that absorbs bridging losses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsulatingLayer {
    /// Position of the layer within its construction.
    pub index: usize,
    pub material: String,
    #[serde(flatten)]
    pub kind: LayerKind,
}

impl InsulatingLayer {
    pub fn massless(index: usize, material: impl Into<String>, resistance: f64) -> Self {
        Self {
            index,
            material: material.into(),
            kind: LayerKind::Massless { resistance },
        }
    }

    pub fn standard(
        index: usize,
        material: impl Into<String>,
        conductivity: f64,
        thickness: f64,
    ) -> Self {
        Self {
            index,
            material: material.into(),
            kind: LayerKind::Standard {
                conductivity,
                thickness,
            },
        }
    }

    /// Thermal resistance [m²·K/W].
    pub fn resistance(&self) -> f64 {
        match self.kind {
            LayerKind::Massless { resistance } => resistance,
            LayerKind::Standard {
                conductivity,
                thickness,
            } => {
                if conductivity > 0.0 {
                    thickness / conductivity
                } else {
                    0.0
                }
            }
        }
    }
}

/// A counted point thermal bridge, e.g. beams penetrating the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointBridge {
    #[serde(alias = "id")]
    pub khi: String,
    #[serde(default = "one")]
    pub count: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSurfaceRecord {
    pub id: String,
    pub kind: SubSurfaceKind,
    pub vertices: Vec<[f64; 3]>,
}

impl SubSurfaceRecord {
    /// Lowest vertex elevation.
    pub fn min_elevation(&self) -> f64 {
        self.vertices
            .iter()
            .map(|v| v[2])
            .fold(f64::INFINITY, f64::min)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadingRecord {
    pub id: String,
    pub vertices: Vec<[f64; 3]>,
}

/// One opaque envelope (or interior) surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceRecord {
    pub id: String,
    pub surface_type: SurfaceType,
    pub vertices: Vec<[f64; 3]>,
    #[serde(default)]
    pub sub_surfaces: Vec<SubSurfaceRecord>,
    pub boundary: BoundaryCondition,
    #[serde(default)]
    pub deratable: bool,
    /// Whether the surface's own space is conditioned.
    #[serde(default)]
    pub conditioned: bool,
    #[serde(default)]
    pub story: Option<String>,
    #[serde(default)]
    pub space: Option<String>,
    #[serde(default)]
    pub space_type: Option<String>,
    #[serde(default)]
    pub construction: Option<String>,
    /// Opaque area net of openings; the kernel face area when absent.
    #[serde(default)]
    pub net_area: Option<f64>,
    #[serde(default)]
    pub gross_area: Option<f64>,
    #[serde(default)]
    pub layer: Option<InsulatingLayer>,
    /// Total construction resistance including films [m²·K/W].
    #[serde(default)]
    pub assembly_resistance: Option<f64>,
    #[serde(default)]
    pub point_bridges: Vec<PointBridge>,
}

impl SurfaceRecord {
    /// A bare record with the given geometry; every optional field empty.
    pub fn new(
        id: impl Into<String>,
        surface_type: SurfaceType,
        boundary: BoundaryCondition,
        vertices: Vec<[f64; 3]>,
    ) -> Self {
        Self {
            id: id.into(),
            surface_type,
            vertices,
            sub_surfaces: Vec::new(),
            boundary,
            deratable: false,
            conditioned: false,
            story: None,
            space: None,
            space_type: None,
            construction: None,
            net_area: None,
            gross_area: None,
            layer: None,
            assembly_resistance: None,
            point_bridges: Vec::new(),
        }
    }

    /// `true` when the surface faces itself through an interzone boundary.
    pub fn is_self_adjacent(&self) -> bool {
        matches!(&self.boundary, BoundaryCondition::Surface { adjacent } if *adjacent == self.id)
    }
}
