// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Edge classification.
//!
//! Every kernel edge that touches at least one deratable surface is sorted
//! into a thermal bridge category. The faces meeting at the edge are placed
//! around it by polar angle, the rules below each propose a candidate, and
//! the most conductive candidate is assigned.
//!
//! | rule | fires when the edge links |
//! |---|---|
//! | grade | a ground-facing surface and an outdoor wall |
//! | balcony | a shade and a deratable floor or wall |
//! | parapet | two deratable surfaces among wall/roof, floor/wall, floor/roof |
//! | rimjoist | a deratable wall and a conditioned, above-grade floor |
//! | fenestration | an opening (head, sill or jamb when the set splits them) |
//! | corner | two deratable walls that are not coplanar |
//! | party | one deratable surface and one adiabatic surface |
//! | transition | nothing else |

use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_4, PI, TAU};

use nalgebra::{Point3, Vector3};
use serde::Serialize;
use smallvec::SmallVec;
use tbd_lite_topology::{EdgeKey, EdgeLink, FaceKey, TopologyArena, WireRole};

use crate::config::Options;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::ingest::{FaceTag, Ingested, Owner};
use crate::model::Input;
use crate::psi::Category;
use crate::registry::{EdgeScope, Provenance, Registry, Scope};
use crate::surface::{BoundaryCondition, SurfaceRecord, SurfaceType};

/// Tolerance on `|n × up|` for an opening lying flat.
const FLAT_OPENING: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Vertical,
    Horizontal,
    Oblique,
}

/// A face meeting an edge, placed around the edge axis.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedFace {
    pub face: FaceKey,
    pub tag: FaceTag,
    pub role: WireRole,
    /// Angle from the reference vector to `polar`, about the edge axis, in
    /// `[0, 2π)`.
    pub angle: f64,
    /// In-plane unit vector from the edge into the face material.
    pub polar: Vector3<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub category: Category,
    pub value: f64,
    pub provenance: Provenance,
}

pub type Candidates = SmallVec<[Candidate; 4]>;

#[derive(Debug, Clone)]
pub struct ClassifiedEdge {
    pub edge: EdgeKey,
    pub length: f64,
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub orientation: Orientation,
    /// One entry per face, sorted by angle.
    pub links: Vec<LinkedFace>,
    pub candidates: Candidates,
    pub assignment: Option<Candidate>,
}

/// The most conductive candidate; the first one wins ties.
pub fn select_conductance(candidates: &[Candidate]) -> Option<&Candidate> {
    let mut best: Option<&Candidate> = None;
    for candidate in candidates {
        if best.map_or(true, |b| candidate.value > b.value) {
            best = Some(candidate);
        }
    }
    best
}

/// Classifies every shared edge touching a deratable surface, in kernel
/// edge order.
pub fn classify(
    input: &Input,
    ingested: &Ingested,
    registry: &Registry,
    options: &Options,
    diagnostics: &mut Diagnostics,
) -> Vec<ClassifiedEdge> {
    let ctx = Context {
        input,
        ingested,
        registry,
    };
    let edges: Vec<EdgeKey> = ingested.arena.edges_shared_by(2);
    let run = |edge: &EdgeKey| ctx.classify_edge(*edge);

    #[cfg(not(target_arch = "wasm32"))]
    let results: Vec<_> = {
        use rayon::prelude::*;
        if options.parallel {
            edges.par_iter().map(run).collect()
        } else {
            edges.iter().map(run).collect()
        }
    };

    #[cfg(target_arch = "wasm32")]
    let results: Vec<_> = {
        let _ = options.parallel;
        edges.iter().map(run).collect()
    };

    let mut classified = Vec::new();
    for (edge, notes) in results.into_iter().flatten() {
        diagnostics.extend(notes);
        classified.push(edge);
    }

    let mut counts: BTreeMap<Category, usize> = BTreeMap::new();
    for edge in &classified {
        if let Some(assignment) = &edge.assignment {
            *counts.entry(assignment.category).or_insert(0) += 1;
        }
    }
    tracing::debug!(?counts, "Edge categories");
    tracing::info!(
        edges = edges.len(),
        classified = classified.len(),
        "Classified edges"
    );
    classified
}

struct Context<'a> {
    input: &'a Input,
    ingested: &'a Ingested,
    registry: &'a Registry,
}

/// An opaque surface at the edge.
struct Opaque<'a> {
    link: &'a LinkedFace,
    record: &'a SurfaceRecord,
    deratable: bool,
}

impl Opaque<'_> {
    fn is(&self, surface_type: SurfaceType) -> bool {
        self.record.surface_type == surface_type
    }
}

/// An opening at the edge, with its parent record.
struct Opening<'a> {
    link: &'a LinkedFace,
    parent: &'a SurfaceRecord,
}

impl<'a> Context<'a> {
    fn classify_edge(&self, edge: EdgeKey) -> Option<(ClassifiedEdge, Vec<Diagnostic>)> {
        let arena = &self.ingested.arena;
        let (k0, k1) = arena.edge_vertices(edge)?;
        let v0 = arena.vertex_point(k0)?;
        let v1 = arena.vertex_point(k1)?;
        let length = arena.edge_length(edge)?;
        let axis = arena.edge_direction(edge)?;

        let orientation = orientation(&v0, &v1, arena.tolerance().vertex);
        let reference = reference_vector(orientation, &axis);

        let mut links: Vec<LinkedFace> = Vec::new();
        for link in arena.edge_links(edge) {
            let Some(&tag) = self.ingested.tag(link.face) else {
                continue;
            };
            let Some(linked) = place(arena, &link, tag, &axis, &reference) else {
                continue;
            };
            // The outer wire speaks for a face that uses the edge twice.
            match links.iter_mut().find(|l| l.face == link.face) {
                Some(existing) if existing.role == WireRole::Hole && link.role == WireRole::Outer => {
                    *existing = linked
                }
                Some(_) => {}
                None => links.push(linked),
            }
        }
        links.sort_by(|a, b| a.angle.total_cmp(&b.angle).then(a.face.cmp(&b.face)));
        if links.len() < 2 {
            return None;
        }

        let mut opaque: Vec<Opaque<'_>> = Vec::new();
        let mut openings: Vec<Opening<'_>> = Vec::new();
        let mut shades = 0usize;
        let mut scope = EdgeScope::default();
        for link in &links {
            match link.tag.owner {
                Owner::Surface => {
                    let record = self.input.surfaces.get(link.tag.index)?;
                    let deratable = self.ingested.surfaces.get(link.tag.index)?.deratable;
                    scope.surfaces.insert(record.id.clone());
                    add_zone(&mut scope, record);
                    opaque.push(Opaque {
                        link,
                        record,
                        deratable,
                    });
                }
                Owner::SubSurface { parent } => {
                    let parent = self.input.surfaces.get(parent)?;
                    let sub = parent.sub_surfaces.get(link.tag.index)?;
                    scope.surfaces.insert(sub.id.clone());
                    add_zone(&mut scope, parent);
                    openings.push(Opening { link, parent });
                }
                Owner::Shading => {
                    let shade = self.input.shades.get(link.tag.index)?;
                    scope.surfaces.insert(shade.id.clone());
                    shades += 1;
                }
            }
        }

        let deratable: Vec<&Opaque<'_>> = opaque.iter().filter(|o| o.deratable).collect();
        if deratable.is_empty() {
            return None;
        }

        let mut notes = Vec::new();
        let mut candidates = Candidates::new();
        let registry = self.registry;
        let propose = |category: Category, candidates: &mut Candidates| {
            if let Some(resolved) = registry.resolve(category, &scope) {
                candidates.push(Candidate {
                    category: resolved.category,
                    value: resolved.value,
                    provenance: resolved.provenance,
                });
            }
        };

        // grade
        if opaque.iter().any(|o| o.record.boundary.is_ground())
            && opaque
                .iter()
                .any(|o| o.is(SurfaceType::Wall) && o.record.boundary.is_outdoors())
        {
            propose(Category::Grade, &mut candidates);
        }

        // balcony
        if shades > 0
            && deratable
                .iter()
                .any(|o| o.is(SurfaceType::Floor) || o.is(SurfaceType::Wall))
        {
            propose(Category::Balcony, &mut candidates);
        }

        // parapet
        let walls = deratable.iter().filter(|o| o.is(SurfaceType::Wall)).count();
        let roofs = deratable.iter().filter(|o| o.is(SurfaceType::RoofCeiling)).count();
        let floors = deratable.iter().filter(|o| o.is(SurfaceType::Floor)).count();
        if (walls > 0 && roofs > 0) || (floors > 0 && walls > 0) || (floors > 0 && roofs > 0) {
            propose(Category::Parapet, &mut candidates);
        }

        // rimjoist
        if walls > 0
            && opaque.iter().any(|o| {
                o.is(SurfaceType::Floor)
                    && o.record.conditioned
                    && !o.record.boundary.is_ground()
            })
        {
            propose(Category::Rimjoist, &mut candidates);
        }

        // fenestration
        if let Some(opening) = openings.first() {
            let normal = opening.link.tag.normal;
            let category = if normal.cross(&Vector3::z()).norm() < FLAT_OPENING {
                Category::Jamb
            } else if orientation == Orientation::Horizontal {
                if opening.link.polar.z < 0.0 {
                    Category::Head
                } else {
                    Category::Sill
                }
            } else {
                Category::Jamb
            };
            propose(category, &mut candidates);
            tracing::trace!(parent = %opening.parent.id, ?category, "fenestration edge");
        }

        // corner
        let corner_walls: Vec<&&Opaque<'_>> = deratable
            .iter()
            .filter(|o| o.is(SurfaceType::Wall))
            .take(2)
            .collect();
        if let [w1, w2] = corner_walls.as_slice() {
            let delta = (w2.link.angle - w1.link.angle).abs();
            if (delta - PI).abs() >= FRAC_PI_4 {
                let a = w1.link.tag.normal.dot(&w2.link.polar);
                let b = w1.link.polar.dot(&w2.link.tag.normal);
                if a > 0.0 && b > 0.0 {
                    propose(Category::Cornerconcave, &mut candidates);
                } else if a < 0.0 && b < 0.0 {
                    propose(Category::Cornerconvex, &mut candidates);
                }
            }
        }

        // party
        let others: Vec<&Opaque<'_>> = opaque.iter().filter(|o| !o.deratable).collect();
        if let ([own], [other]) = (deratable.as_slice(), others.as_slice()) {
            if let Some(id) = [own, other]
                .iter()
                .find(|o| o.record.is_self_adjacent())
                .map(|o| o.record.id.clone())
            {
                notes.push(Diagnostic::new(
                    DiagnosticKind::SelfAdjacency,
                    id,
                    "surface is adjacent to itself; edge left as transition pending confirmation",
                ));
            } else if matches!(other.record.boundary, BoundaryCondition::Adiabatic) {
                propose(Category::Party, &mut candidates);
            }
        }

        if candidates.is_empty() {
            propose(Category::Transition, &mut candidates);
        }

        for (edge_override, value) in registry.edge_overrides_for(&scope.surfaces) {
            let candidate = Candidate {
                category: edge_override.category,
                value,
                provenance: Provenance::new(Scope::Edge, edge_override.set.clone()),
            };
            match candidates
                .iter_mut()
                .find(|c| family(c.category) == family(candidate.category))
            {
                Some(slot) => *slot = candidate,
                None => candidates.push(candidate),
            }
        }
        if candidates.len() > 1 {
            candidates.retain(|c| c.category != Category::Transition || c.provenance.scope == Scope::Edge);
        }

        let assignment = select_conductance(&candidates).cloned();
        Some((
            ClassifiedEdge {
                edge,
                length,
                v0,
                v1,
                orientation,
                links,
                candidates,
                assignment,
            },
            notes,
        ))
    }
}

fn add_zone(scope: &mut EdgeScope, record: &SurfaceRecord) {
    scope.spaces.extend(record.space.iter().cloned());
    scope.space_types.extend(record.space_type.iter().cloned());
    scope.stories.extend(record.story.iter().cloned());
}

/// Head, sill and jamb belong to fenestration; both corner senses to corner.
fn family(category: Category) -> Category {
    match category {
        c if c.is_fenestration() => Category::Fenestration,
        Category::Cornerconcave | Category::Cornerconvex => Category::Corner,
        other => other,
    }
}

pub fn orientation(v0: &Point3<f64>, v1: &Point3<f64>, tol: f64) -> Orientation {
    if (v0.x - v1.x).abs() < tol && (v0.y - v1.y).abs() < tol {
        Orientation::Vertical
    } else if (v0.z - v1.z).abs() < tol {
        Orientation::Horizontal
    } else {
        Orientation::Oblique
    }
}

/// North for vertical edges, zenith otherwise, projected normal to the axis.
pub fn reference_vector(orientation: Orientation, axis: &Vector3<f64>) -> Vector3<f64> {
    let up = match orientation {
        Orientation::Vertical => Vector3::y(),
        Orientation::Horizontal | Orientation::Oblique => Vector3::z(),
    };
    (up - axis * up.dot(axis))
        .try_normalize(1e-9)
        .or_else(|| axis.cross(&Vector3::x()).try_normalize(1e-9))
        .unwrap_or_else(Vector3::y)
}

/// Signed angle from `reference` to `polar` about `axis`, in `[0, 2π)`.
pub fn polar_angle(reference: &Vector3<f64>, polar: &Vector3<f64>, axis: &Vector3<f64>) -> f64 {
    let angle = reference.cross(polar).dot(axis).atan2(reference.dot(polar));
    if angle < 0.0 {
        angle + TAU
    } else {
        angle
    }
}

/// Places one face use of an edge around the edge axis.
fn place(
    arena: &TopologyArena,
    link: &EdgeLink,
    tag: FaceTag,
    axis: &Vector3<f64>,
    reference: &Vector3<f64>,
) -> Option<LinkedFace> {
    let normal = arena.wire_normal(link.wire)?;
    let (origin, terminal) = link.traversal;
    let along = (arena.vertex_point(terminal)? - arena.vertex_point(origin)?).try_normalize(1e-12)?;

    // A wire encloses the side left of its travel; hole material is outside.
    let mut polar = normal.cross(&along);
    if link.role == WireRole::Hole {
        polar = -polar;
    }
    let polar = polar.try_normalize(1e-12)?;

    Some(LinkedFace {
        face: link.face,
        tag,
        role: link.role,
        angle: polar_angle(reference, &polar, axis),
        polar,
    })
}
