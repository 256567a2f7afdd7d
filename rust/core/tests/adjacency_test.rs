// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use approx::assert_relative_eq;
use common::{bare_room, record_mut, room, surface, window, REGULAR};
use tbd_lite_core::{
    process, BoundaryCondition, Category, DiagnosticKind, EdgeReport, Input, Options, Outcome,
    PsiSet, Registry, ShadingRecord, SurfaceType,
};

fn run(input: &Input) -> Outcome {
    process(input, &Registry::with_default(REGULAR), &Options::default()).unwrap()
}

fn edge_between<'a>(outcome: &'a Outcome, a: [f64; 3], b: [f64; 3]) -> &'a EdgeReport {
    outcome
        .edges
        .iter()
        .find(|e| (e.v0 == a && e.v1 == b) || (e.v0 == b && e.v1 == a))
        .unwrap_or_else(|| panic!("no edge between {a:?} and {b:?}"))
}

#[test]
fn corner_window_derates_the_neighbouring_wall() {
    let mut input = bare_room();
    record_mut(&mut input, "south").sub_surfaces = vec![window(
        "corner window",
        [[0.0, 0.0, 1.0], [2.0, 0.0, 1.0], [2.0, 0.0, 2.0], [0.0, 0.0, 2.0]],
    )];
    let outcome = run(&input);

    // The south-west corner is split at the window sill and head.
    let shared = edge_between(&outcome, [0.0, 0.0, 1.0], [0.0, 0.0, 2.0]);
    assert!(shared.surfaces.iter().any(|s| s == "corner window"));
    assert_eq!(shared.category, Category::Cornerconvex);
    assert_relative_eq!(shared.psi, 0.45);
    assert_eq!(shared.shares.keys().collect::<Vec<_>>(), vec!["west"]);
    assert_relative_eq!(shared.shares["west"], 0.45, epsilon = 1e-9);

    let below = edge_between(&outcome, [0.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
    assert_eq!(below.category, Category::Cornerconvex);
    assert_eq!(below.shares.len(), 2);

    assert_eq!(outcome.category_count(Category::Cornerconvex), 6);
    assert_eq!(outcome.category_count(Category::Fenestration), 3);
}

#[test]
fn adiabatic_neighbour_makes_party_edges() {
    let mut input = room();
    let east = record_mut(&mut input, "east");
    east.boundary = BoundaryCondition::Adiabatic;
    east.deratable = false;
    east.layer = None;
    let outcome = run(&input);

    assert_eq!(outcome.category_count(Category::Party), 4);
    assert_eq!(outcome.category_count(Category::Cornerconvex), 2);
    assert_eq!(outcome.category_count(Category::Rimjoist), 3);
    assert_eq!(outcome.category_count(Category::Parapet), 3);
    assert!(outcome.surface("east").is_none());

    for edge in outcome.edges.iter().filter(|e| e.category == Category::Party) {
        assert!(!edge.shares.contains_key("east"));
        assert_eq!(edge.shares.len(), 1);
    }
}

#[test]
fn self_adjacent_surface_is_never_a_party_wall() {
    let mut input = room();
    let east = record_mut(&mut input, "east");
    east.boundary = BoundaryCondition::Surface {
        adjacent: "east".into(),
    };
    east.deratable = false;
    let outcome = run(&input);

    assert_eq!(outcome.category_count(Category::Party), 0);
    assert_eq!(outcome.category_count(Category::Transition), 4);
    assert_eq!(outcome.diagnostic_count(DiagnosticKind::SelfAdjacency), 4);
}

#[test]
fn ground_floor_makes_grade_edges() {
    let mut input = room();
    record_mut(&mut input, "floor").boundary = BoundaryCondition::Ground;
    let outcome = run(&input);

    assert_eq!(outcome.category_count(Category::Grade), 4);
    assert_eq!(outcome.category_count(Category::Rimjoist), 0);
}

#[test]
fn shading_slab_makes_a_balcony() {
    let mut input = room();
    input.shades.push(ShadingRecord {
        id: "slab".into(),
        vertices: vec![
            [0.0, -1.5, 0.0],
            [4.0, -1.5, 0.0],
            [4.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
        ],
    });
    let outcome = run(&input);

    let edge = edge_between(&outcome, [0.0, 0.0, 0.0], [4.0, 0.0, 0.0]);
    assert_eq!(edge.category, Category::Balcony);
    assert!(edge.surfaces.iter().any(|s| s == "slab"));
    assert!(!edge.shares.contains_key("slab"));
    assert_eq!(outcome.category_count(Category::Balcony), 1);
}

#[test]
fn adjoining_windows_are_skipped() {
    let mut input = bare_room();
    record_mut(&mut input, "south").sub_surfaces = vec![
        window(
            "left",
            [[1.0, 0.0, 1.0], [2.0, 0.0, 1.0], [2.0, 0.0, 2.0], [1.0, 0.0, 2.0]],
        ),
        window(
            "right",
            [[2.0, 0.0, 1.0], [3.0, 0.0, 1.0], [3.0, 0.0, 2.0], [2.0, 0.0, 2.0]],
        ),
    ];
    let outcome = run(&input);

    let mullion = edge_between(&outcome, [2.0, 0.0, 1.0], [2.0, 0.0, 2.0]);
    assert!(mullion.skipped);
    assert!(mullion.shares.is_empty());
    assert_eq!(outcome.diagnostic_count(DiagnosticKind::AmbiguousOpenings), 1);
}

/// A complete set with the given fenestration values on top.
fn set_with(name: &str, fenestration: &[(Category, f64)], balcony: f64) -> PsiSet {
    let mut set = PsiSet::new(name)
        .with(Category::Rimjoist, 0.5)
        .with(Category::Parapet, 0.45)
        .with(Category::Corner, 0.45)
        .with(Category::Balcony, balcony)
        .with(Category::Party, 0.45)
        .with(Category::Grade, 0.45);
    for &(category, psi) in fenestration {
        set = set.with(category, psi);
    }
    set
}

#[test]
fn split_fenestration_set_gives_head_sill_and_jamb() {
    let mut registry = Registry::with_default("split");
    registry.add_set(set_with(
        "split",
        &[
            (Category::Head, 0.3),
            (Category::Sill, 0.25),
            (Category::Jamb, 0.2),
        ],
        0.5,
    ));
    let outcome = process(&room(), &registry, &Options::default()).unwrap();

    let sill = edge_between(&outcome, [1.0, 0.0, 1.0], [3.0, 0.0, 1.0]);
    assert_eq!(sill.category, Category::Sill);
    assert_relative_eq!(sill.psi, 0.25);

    let head = edge_between(&outcome, [1.0, 0.0, 2.0], [3.0, 0.0, 2.0]);
    assert_eq!(head.category, Category::Head);
    assert_relative_eq!(head.psi, 0.3);

    for (a, b) in [
        ([1.0, 0.0, 1.0], [1.0, 0.0, 2.0]),
        ([3.0, 0.0, 1.0], [3.0, 0.0, 2.0]),
    ] {
        let jamb = edge_between(&outcome, a, b);
        assert_eq!(jamb.category, Category::Jamb);
        assert_relative_eq!(jamb.psi, 0.2);
    }
    assert_eq!(outcome.category_count(Category::Fenestration), 0);
}

#[test]
fn inside_corner_is_concave() {
    let input = Input {
        surfaces: vec![
            surface(
                "east facing",
                SurfaceType::Wall,
                [[0.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 4.0, 3.0], [0.0, 0.0, 3.0]],
            ),
            surface(
                "north facing",
                SurfaceType::Wall,
                [[4.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 3.0], [4.0, 0.0, 3.0]],
            ),
        ],
        shades: vec![],
    };
    let outcome = run(&input);

    assert_eq!(outcome.edges.len(), 1);
    assert_eq!(outcome.category_count(Category::Cornerconcave), 1);
    assert_eq!(outcome.category_count(Category::Cornerconvex), 0);
    let corner = edge_between(&outcome, [0.0, 0.0, 0.0], [0.0, 0.0, 3.0]);
    assert_relative_eq!(corner.psi, 0.45);
}

#[test]
fn free_edges_are_not_classified() {
    let input = Input {
        surfaces: vec![surface(
            "lone",
            SurfaceType::Wall,
            [[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [4.0, 0.0, 3.0], [0.0, 0.0, 3.0]],
        )],
        shades: vec![],
    };
    let outcome = run(&input);

    assert!(outcome.edges.is_empty());
    assert_relative_eq!(outcome.surface("lone").unwrap().heat_loss, 0.0);
}

#[test]
fn most_conductive_category_wins_on_a_shared_edge() {
    // A door on the floor line under a balcony slab: balcony, parapet,
    // rimjoist and fenestration all fire on the threshold.
    let mut input = bare_room();
    record_mut(&mut input, "south").sub_surfaces = vec![window(
        "door",
        [[1.0, 0.0, 0.0], [3.0, 0.0, 0.0], [3.0, 0.0, 1.0], [1.0, 0.0, 1.0]],
    )];
    input.shades.push(ShadingRecord {
        id: "slab".into(),
        vertices: vec![
            [0.0, -1.5, 0.0],
            [4.0, -1.5, 0.0],
            [4.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
        ],
    });
    let mut registry = Registry::with_default("balconies");
    registry.add_set(set_with(
        "balconies",
        &[(Category::Fenestration, 0.5)],
        0.8,
    ));
    let outcome = process(&input, &registry, &Options::default()).unwrap();

    let threshold = edge_between(&outcome, [1.0, 0.0, 0.0], [3.0, 0.0, 0.0]);
    assert_eq!(threshold.category, Category::Balcony);
    assert_relative_eq!(threshold.psi, 0.8);
    for id in ["floor", "south", "door", "slab"] {
        assert!(threshold.surfaces.iter().any(|s| s == id), "{id} not linked");
    }
    // The door derates the floor, not its own wall.
    assert_eq!(threshold.shares.keys().collect::<Vec<_>>(), vec!["floor"]);
}
