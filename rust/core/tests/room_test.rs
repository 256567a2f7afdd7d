// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use approx::assert_relative_eq;
use common::{room, REGULAR};
use tbd_lite_core::{process, Category, Options, Registry};

#[test]
fn single_room_with_window() {
    let outcome = process(&room(), &Registry::with_default(REGULAR), &Options::default()).unwrap();

    assert_eq!(outcome.edges.len(), 16);
    assert_eq!(outcome.category_count(Category::Cornerconvex), 4);
    assert_eq!(outcome.category_count(Category::Rimjoist), 4);
    assert_eq!(outcome.category_count(Category::Parapet), 4);
    assert_eq!(outcome.category_count(Category::Fenestration), 4);
    assert_eq!(outcome.category_count(Category::Transition), 0);
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);

    for edge in &outcome.edges {
        let expected = match edge.category {
            Category::Cornerconvex | Category::Parapet => 0.45,
            Category::Rimjoist => 0.5,
            Category::Fenestration => 0.35,
            other => panic!("unexpected category {other}"),
        };
        assert_relative_eq!(edge.psi, expected);
    }

    // rimjoist 4 × 0.5 / 2 + parapet 4 × 0.45 / 2 + corners 2 × 3 × 0.45 / 2
    // + window perimeter 6 × 0.35
    let south = outcome.surface("south").unwrap();
    assert_relative_eq!(south.heat_loss, 5.35, epsilon = 1e-9);
    assert_relative_eq!(south.point_loss, 0.0);
    assert_eq!(south.edges.len(), 8);

    let derated = south.derated.as_ref().unwrap();
    assert!(derated.layer.resistance() < 2.0);
    assert_relative_eq!(derated.requested_u, 0.5 + 5.35 / 10.0, epsilon = 1e-9);
    assert_relative_eq!(derated.layer.resistance(), 1.0 / 1.035, epsilon = 1e-9);
    assert_eq!(derated.residual_loss, 0.0);
}

#[test]
fn window_edges_are_assigned_to_the_parent_wall() {
    let outcome = process(&room(), &Registry::with_default(REGULAR), &Options::default()).unwrap();

    let window_edges: Vec<_> = outcome
        .edges
        .iter()
        .filter(|e| e.surfaces.iter().any(|s| s == "window"))
        .collect();
    assert_eq!(window_edges.len(), 4);
    for edge in window_edges {
        assert_eq!(edge.category, Category::Fenestration);
        assert_eq!(edge.shares.keys().collect::<Vec<_>>(), vec!["south"]);
    }
}

#[test]
fn envelope_forms_one_closed_shell() {
    let outcome = process(&room(), &Registry::with_default(REGULAR), &Options::default()).unwrap();
    assert_eq!(outcome.shells.len(), 1);
    assert_eq!(outcome.shells[0].faces, 7);
    assert!(outcome.shells[0].closed);
}

#[test]
fn allocated_loss_is_conserved() {
    let outcome = process(&room(), &Registry::with_default(REGULAR), &Options::default()).unwrap();

    let from_edges: f64 = outcome.edges.iter().map(|e| e.heat_loss()).sum();
    let from_shares: f64 = outcome.edges.iter().flat_map(|e| e.shares.values()).sum();
    assert_relative_eq!(from_edges, 22.7, epsilon = 1e-9);
    assert_relative_eq!(from_shares, from_edges, epsilon = 1e-9);
    assert_relative_eq!(outcome.total_heat_loss(), from_edges, epsilon = 1e-9);
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let registry = Registry::with_default(REGULAR);
    let parallel = Options {
        parallel: true,
        ..Options::default()
    };
    let sequential = Options {
        parallel: false,
        ..Options::default()
    };

    let a = process(&room(), &registry, &parallel).unwrap().to_json().unwrap();
    let b = process(&room(), &registry, &sequential).unwrap().to_json().unwrap();
    let c = process(&room(), &registry, &parallel).unwrap().to_json().unwrap();
    assert_eq!(a, b);
    assert_eq!(a, c);
}

#[test]
fn non_bridging_default_leaves_layers_untouched() {
    let outcome = process(&room(), &Registry::new(), &Options::default()).unwrap();

    assert_eq!(outcome.edges.len(), 16);
    assert_relative_eq!(outcome.total_heat_loss(), 0.0);
    for surface in outcome.surfaces.values() {
        assert_relative_eq!(surface.derated.as_ref().unwrap().layer.resistance(), 2.0);
    }
}

#[test]
fn outcome_serialises_to_json() {
    let outcome = process(&room(), &Registry::with_default(REGULAR), &Options::default()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&outcome.to_json().unwrap()).unwrap();

    assert!(json["surfaces"]["south"]["heat_loss"].as_f64().unwrap() > 0.0);
    assert_eq!(json["edges"].as_array().unwrap().len(), 16);
    assert_eq!(json["edges"][0]["provenance"]["scope"]["level"], "building");
}
