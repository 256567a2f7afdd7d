// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface ingestion: host records into one shared kernel.
//!
//! Each opaque surface becomes a face whose holes are its sub-surfaces; each
//! sub-surface also becomes a face of its own, bounded by the hole wire.
//! Shading surfaces are plain faces. Every face is tagged with the record it
//! came from so the classifier can get back to surface properties.

use nalgebra::Vector3;
use rustc_hash::{FxHashMap, FxHashSet};
use tbd_lite_topology::{FaceKey, ShellKey, TopologyArena, VertexKey, WireKey};

use crate::config::Options;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::{Error, Result};
use crate::model::Input;

/// The record a face was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Surface,
    /// A sub-surface of `input.surfaces[parent]`.
    SubSurface { parent: usize },
    Shading,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceTag {
    pub owner: Owner,
    /// Index into `input.surfaces`, the parent's `sub_surfaces`, or
    /// `input.shades`, depending on the owner.
    pub index: usize,
    /// Outward unit normal.
    pub normal: Vector3<f64>,
}

/// Per-surface ingestion result, parallel to `input.surfaces`.
#[derive(Debug, Clone)]
pub struct IngestedSurface {
    pub face: FaceKey,
    pub net_area: f64,
    /// Deratability after layer checks.
    pub deratable: bool,
    /// Opening faces, parallel to the record's `sub_surfaces`.
    pub openings: Vec<FaceKey>,
}

#[derive(Debug)]
pub struct Ingested {
    pub arena: TopologyArena,
    pub tags: FxHashMap<FaceKey, FaceTag>,
    pub surfaces: Vec<IngestedSurface>,
    pub shades: Vec<FaceKey>,
    pub shells: Vec<ShellKey>,
}

impl Ingested {
    pub fn tag(&self, face: FaceKey) -> Option<&FaceTag> {
        self.tags.get(&face)
    }
}

/// Builds the kernel from the input records.
///
/// Geometry defects are fatal. A deratable surface without a usable
/// insulating layer is demoted with a diagnostic.
pub fn ingest(input: &Input, options: &Options, diagnostics: &mut Diagnostics) -> Result<Ingested> {
    check_ids(input)?;

    let mut arena = TopologyArena::with_tolerance(options.tolerance());
    let mut tags: FxHashMap<FaceKey, FaceTag> = FxHashMap::default();
    let mut surfaces = Vec::with_capacity(input.surfaces.len());

    for (index, record) in input.surfaces.iter().enumerate() {
        check_polygon(&record.id, &record.vertices)?;
        for sub in &record.sub_surfaces {
            check_polygon(&sub.id, &sub.vertices)?;
        }

        let outer = build_wire(&mut arena, &record.id, &record.vertices)?;

        // Lowest openings first.
        let mut order: Vec<usize> = (0..record.sub_surfaces.len()).collect();
        order.sort_by(|&a, &b| {
            let (sa, sb) = (&record.sub_surfaces[a], &record.sub_surfaces[b]);
            sa.min_elevation()
                .total_cmp(&sb.min_elevation())
                .then(a.cmp(&b))
        });
        let mut holes: Vec<(usize, WireKey)> = Vec::with_capacity(order.len());
        for i in order {
            let sub = &record.sub_surfaces[i];
            holes.push((i, build_wire(&mut arena, &sub.id, &sub.vertices)?));
        }

        let hole_wires: Vec<WireKey> = holes.iter().map(|&(_, w)| w).collect();
        let face = arena
            .get_face(outer, &hole_wires)
            .map_err(|source| geometry(&record.id, source))?;
        tag_face(
            &arena,
            &mut tags,
            face,
            &record.id,
            FaceTag {
                owner: Owner::Surface,
                index,
                normal: Vector3::zeros(),
            },
        )?;

        holes.sort_by_key(|&(i, _)| i);
        let mut openings = Vec::with_capacity(holes.len());
        for (i, wire) in holes {
            let sub = &record.sub_surfaces[i];
            let opening = arena
                .get_face(wire, &[])
                .map_err(|source| geometry(&sub.id, source))?;
            tag_face(
                &arena,
                &mut tags,
                opening,
                &sub.id,
                FaceTag {
                    owner: Owner::SubSurface { parent: index },
                    index: i,
                    normal: Vector3::zeros(),
                },
            )?;
            openings.push(opening);
        }

        let mut deratable = record.deratable;
        if deratable && record.layer.as_ref().map_or(true, |l| l.resistance() <= 0.0) {
            deratable = false;
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::MissingLayer,
                record.id.clone(),
                "deratable surface has no insulating layer; treated as non-deratable",
            ));
        }

        let net_area = match record.net_area {
            Some(area) if area > 0.0 => area,
            _ => arena.face_area(face).unwrap_or(0.0),
        };

        surfaces.push(IngestedSurface {
            face,
            net_area,
            deratable,
            openings,
        });
    }

    let mut shades = Vec::with_capacity(input.shades.len());
    for (index, record) in input.shades.iter().enumerate() {
        check_polygon(&record.id, &record.vertices)?;
        let wire = build_wire(&mut arena, &record.id, &record.vertices)?;
        let face = arena
            .get_face(wire, &[])
            .map_err(|source| geometry(&record.id, source))?;
        tag_face(
            &arena,
            &mut tags,
            face,
            &record.id,
            FaceTag {
                owner: Owner::Shading,
                index,
                normal: Vector3::zeros(),
            },
        )?;
        shades.push(face);
    }

    let envelope: Vec<FaceKey> = surfaces
        .iter()
        .flat_map(|s| std::iter::once(s.face).chain(s.openings.iter().copied()))
        .collect();
    let mut shells = Vec::new();
    for group in arena.connected_face_groups(&envelope) {
        let shell = arena.get_shell(&group)?;
        tracing::debug!(
            faces = group.len(),
            closed = arena.shell(shell).map_or(false, |s| s.closed),
            "Assembled shell"
        );
        shells.push(shell);
    }

    for &(vertex, edge) in arena.unresolved_vertices() {
        let subject = arena
            .vertex_point(vertex)
            .map(|p| format!("({:.3}, {:.3}, {:.3})", p.x, p.y, p.z))
            .unwrap_or_default();
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::UnresolvedVertex,
            subject,
            format!("vertex lies near the end of edge {edge:?} and was not spliced into it"),
        ));
    }

    tracing::info!(
        surfaces = surfaces.len(),
        openings = surfaces.iter().map(|s| s.openings.len()).sum::<usize>(),
        shades = shades.len(),
        vertices = arena.vertex_count(),
        edges = arena.edge_count(),
        directed_edges = arena.directed_edge_count(),
        wires = arena.wire_count(),
        faces = arena.face_count(),
        shells = arena.shell_count(),
        "Ingested envelope"
    );

    Ok(Ingested {
        arena,
        tags,
        surfaces,
        shades,
        shells,
    })
}

fn check_ids(input: &Input) -> Result<()> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let ids = input
        .surfaces
        .iter()
        .flat_map(|s| std::iter::once(&s.id).chain(s.sub_surfaces.iter().map(|sub| &sub.id)))
        .chain(input.shades.iter().map(|s| &s.id));
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(Error::DuplicateSurface(id.clone()));
        }
    }
    Ok(())
}

fn check_polygon(id: &str, vertices: &[[f64; 3]]) -> Result<()> {
    if vertices.len() < 3 {
        return Err(Error::InvalidSurface {
            id: id.to_string(),
            reason: format!("{} vertices, at least 3 required", vertices.len()),
        });
    }
    if vertices.iter().flatten().any(|c| !c.is_finite()) {
        return Err(Error::InvalidSurface {
            id: id.to_string(),
            reason: "non-finite vertex coordinate".to_string(),
        });
    }
    Ok(())
}

fn build_wire(arena: &mut TopologyArena, id: &str, vertices: &[[f64; 3]]) -> Result<WireKey> {
    let keys: Vec<VertexKey> = vertices.iter().map(|&c| arena.get_vertex(c)).collect();
    arena.get_wire(&keys).map_err(|source| geometry(id, source))
}

fn geometry(id: &str, source: tbd_lite_topology::Error) -> Error {
    Error::Geometry {
        id: id.to_string(),
        source,
    }
}

fn tag_face(
    arena: &TopologyArena,
    tags: &mut FxHashMap<FaceKey, FaceTag>,
    face: FaceKey,
    id: &str,
    mut tag: FaceTag,
) -> Result<()> {
    if tags.contains_key(&face) {
        return Err(Error::InvalidSurface {
            id: id.to_string(),
            reason: "coincides with another surface".to_string(),
        });
    }
    tag.normal = arena
        .face_normal(face)
        .ok_or(tbd_lite_topology::Error::FaceNotFound(face))?;
    tags.insert(face, tag);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{
        BoundaryCondition, InsulatingLayer, SubSurfaceKind, SubSurfaceRecord, SurfaceRecord,
        SurfaceType,
    };
    use approx::assert_relative_eq;

    fn wall(id: &str, vertices: Vec<[f64; 3]>) -> SurfaceRecord {
        let mut record = SurfaceRecord::new(id, SurfaceType::Wall, BoundaryCondition::Outdoors, vertices);
        record.deratable = true;
        record.layer = Some(InsulatingLayer::massless(1, "R-2", 2.0));
        record
    }

    fn south() -> SurfaceRecord {
        wall(
            "south",
            vec![[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [4.0, 0.0, 3.0], [0.0, 0.0, 3.0]],
        )
    }

    fn window(id: &str, z0: f64, z1: f64) -> SubSurfaceRecord {
        SubSurfaceRecord {
            id: id.into(),
            kind: SubSurfaceKind::FixedWindow,
            vertices: vec![[1.0, 0.0, z0], [3.0, 0.0, z0], [3.0, 0.0, z1], [1.0, 0.0, z1]],
        }
    }

    fn input(surfaces: Vec<SurfaceRecord>) -> Input {
        Input {
            surfaces,
            shades: vec![],
        }
    }

    #[test]
    fn openings_become_holes_and_faces() {
        let mut record = south();
        record.sub_surfaces = vec![window("upper", 2.0, 2.5), window("lower", 0.5, 1.5)];
        let mut diagnostics = Diagnostics::default();
        let ingested = ingest(&input(vec![record]), &Options::default(), &mut diagnostics).unwrap();

        let surface = &ingested.surfaces[0];
        assert_eq!(surface.openings.len(), 2);
        assert_relative_eq!(surface.net_area, 12.0 - 1.0 - 2.0, epsilon = 1e-9);

        let wires = ingested.arena.face_wires(surface.face).unwrap();
        assert_eq!(wires.len(), 3);

        let upper = ingested.tag(surface.openings[0]).unwrap();
        assert_eq!(upper.owner, Owner::SubSurface { parent: 0 });
        assert_eq!(upper.index, 0);
        assert_relative_eq!(upper.normal.y, -1.0, epsilon = 1e-9);
        assert_relative_eq!(upper.normal.x.abs() + upper.normal.z.abs(), 0.0, epsilon = 1e-9);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn duplicate_ids_are_fatal() {
        let mut record = south();
        record.sub_surfaces = vec![window("south", 1.0, 2.0)];
        let err = ingest(&input(vec![record]), &Options::default(), &mut Diagnostics::default())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateSurface(id) if id == "south"));
    }

    #[test]
    fn short_polygons_are_fatal() {
        let record = wall("sliver", vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        let err = ingest(&input(vec![record]), &Options::default(), &mut Diagnostics::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSurface { .. }));
    }

    #[test]
    fn reversed_opening_is_fatal() {
        let mut record = south();
        let mut w = window("w", 1.0, 2.0);
        w.vertices.reverse();
        record.sub_surfaces = vec![w];
        let err = ingest(&input(vec![record]), &Options::default(), &mut Diagnostics::default())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Geometry {
                source: tbd_lite_topology::Error::HoleWinding(_),
                ..
            }
        ));
    }

    #[test]
    fn missing_layer_demotes() {
        let mut record = south();
        record.layer = None;
        let mut diagnostics = Diagnostics::default();
        let ingested = ingest(&input(vec![record]), &Options::default(), &mut diagnostics).unwrap();

        assert!(!ingested.surfaces[0].deratable);
        assert_eq!(diagnostics.count(DiagnosticKind::MissingLayer), 1);
    }

    #[test]
    fn explicit_net_area_wins() {
        let mut record = south();
        record.net_area = Some(10.0);
        let ingested =
            ingest(&input(vec![record]), &Options::default(), &mut Diagnostics::default()).unwrap();
        assert_eq!(ingested.surfaces[0].net_area, 10.0);
    }

    #[test]
    fn adjoining_surfaces_share_a_shell() {
        let east = wall(
            "east",
            vec![[4.0, 0.0, 0.0], [4.0, 4.0, 0.0], [4.0, 4.0, 3.0], [4.0, 0.0, 3.0]],
        );
        let far = wall(
            "far",
            vec![[10.0, 0.0, 0.0], [14.0, 0.0, 0.0], [14.0, 0.0, 3.0], [10.0, 0.0, 3.0]],
        );
        let ingested = ingest(
            &input(vec![south(), east, far]),
            &Options::default(),
            &mut Diagnostics::default(),
        )
        .unwrap();

        assert_eq!(ingested.shells.len(), 2);
        let first = ingested.arena.shell(ingested.shells[0]).unwrap();
        assert_eq!(first.faces.len(), 2);
        assert!(!first.closed);
    }
}
