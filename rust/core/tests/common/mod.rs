// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A 4 × 4 × 3 m single-zone room, wound counter-clockwise from outside.

#![allow(dead_code)]

use tbd_lite_core::{
    BoundaryCondition, Input, InsulatingLayer, SubSurfaceKind, SubSurfaceRecord, SurfaceRecord,
    SurfaceType,
};

pub const REGULAR: &str = "regular (BETBG)";

pub fn surface(id: &str, surface_type: SurfaceType, vertices: [[f64; 3]; 4]) -> SurfaceRecord {
    let mut record = SurfaceRecord::new(
        id,
        surface_type,
        BoundaryCondition::Outdoors,
        vertices.to_vec(),
    );
    record.deratable = true;
    record.conditioned = true;
    record.space = Some("Room".into());
    record.story = Some("Level 1".into());
    record.layer = Some(InsulatingLayer::massless(1, "insulation", 2.0));
    record
}

pub fn window(id: &str, vertices: [[f64; 3]; 4]) -> SubSurfaceRecord {
    SubSurfaceRecord {
        id: id.into(),
        kind: SubSurfaceKind::FixedWindow,
        vertices: vertices.to_vec(),
    }
}

/// Floor, roof and four walls; no openings.
pub fn bare_room() -> Input {
    Input {
        surfaces: vec![
            surface(
                "floor",
                SurfaceType::Floor,
                [[0.0, 0.0, 0.0], [0.0, 4.0, 0.0], [4.0, 4.0, 0.0], [4.0, 0.0, 0.0]],
            ),
            surface(
                "roof",
                SurfaceType::RoofCeiling,
                [[0.0, 0.0, 3.0], [4.0, 0.0, 3.0], [4.0, 4.0, 3.0], [0.0, 4.0, 3.0]],
            ),
            surface(
                "south",
                SurfaceType::Wall,
                [[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [4.0, 0.0, 3.0], [0.0, 0.0, 3.0]],
            ),
            surface(
                "east",
                SurfaceType::Wall,
                [[4.0, 0.0, 0.0], [4.0, 4.0, 0.0], [4.0, 4.0, 3.0], [4.0, 0.0, 3.0]],
            ),
            surface(
                "north",
                SurfaceType::Wall,
                [[4.0, 4.0, 0.0], [0.0, 4.0, 0.0], [0.0, 4.0, 3.0], [4.0, 4.0, 3.0]],
            ),
            surface(
                "west",
                SurfaceType::Wall,
                [[0.0, 4.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 3.0], [0.0, 4.0, 3.0]],
            ),
        ],
        shades: vec![],
    }
}

/// The bare room with a 2 × 1 m window centred in the south wall.
pub fn room() -> Input {
    let mut input = bare_room();
    record_mut(&mut input, "south").sub_surfaces = vec![window(
        "window",
        [[1.0, 0.0, 1.0], [3.0, 0.0, 1.0], [3.0, 0.0, 2.0], [1.0, 0.0, 2.0]],
    )];
    input
}

pub fn record_mut<'a>(input: &'a mut Input, id: &str) -> &'a mut SurfaceRecord {
    input
        .surfaces
        .iter_mut()
        .find(|s| s.id == id)
        .unwrap_or_else(|| panic!("no surface {id}"))
}
