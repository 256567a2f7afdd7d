// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Loss allocation.
//!
//! Each classified edge carries `psi × length` [W/K]. That loss is shared
//! between the deratable surfaces it links, in proportion to their
//! insulating layer resistance. Point bridges are added per surface.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::classify::ClassifiedEdge;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::ingest::{Ingested, Owner};
use crate::model::Input;
use crate::psi::Category;
use crate::registry::{Provenance, Registry};

/// One classified edge as reported to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeReport {
    pub category: Category,
    /// Linear conductance [W/K·m].
    pub psi: f64,
    pub length: f64,
    /// Linked surface, opening and shade ids, in angular order.
    pub surfaces: Vec<String>,
    /// Loss taken by each deratable surface [W/K].
    pub shares: BTreeMap<String, f64>,
    pub v0: [f64; 3],
    pub v1: [f64; 3],
    pub provenance: Provenance,
    /// Edge linking several openings; not allocated.
    pub skipped: bool,
}

impl EdgeReport {
    /// `psi × length` [W/K].
    pub fn heat_loss(&self) -> f64 {
        self.psi * self.length
    }
}

/// Loss accumulated on one surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceLoss {
    /// Sum of edge shares [W/K].
    pub edge_loss: f64,
    /// Sum of point bridges [W/K].
    pub point_loss: f64,
    /// Indices into [`Allocation::edges`].
    pub edges: Vec<usize>,
}

impl SurfaceLoss {
    pub fn total(&self) -> f64 {
        self.edge_loss + self.point_loss
    }
}

#[derive(Debug, Clone, Default)]
pub struct Allocation {
    pub edges: Vec<EdgeReport>,
    /// Parallel to `input.surfaces`.
    pub losses: Vec<SurfaceLoss>,
}

pub fn allocate(
    input: &Input,
    ingested: &Ingested,
    registry: &Registry,
    classified: &[ClassifiedEdge],
    diagnostics: &mut Diagnostics,
) -> Allocation {
    let mut losses = vec![SurfaceLoss::default(); input.surfaces.len()];
    let mut edges = Vec::with_capacity(classified.len());

    for edge in classified {
        let Some(assignment) = &edge.assignment else {
            continue;
        };

        let mut ids = Vec::with_capacity(edge.links.len());
        let mut opaque: Vec<usize> = Vec::new();
        let mut openings: Vec<usize> = Vec::new();
        for link in &edge.links {
            match link.tag.owner {
                Owner::Surface => {
                    opaque.push(link.tag.index);
                    ids.push(input.surfaces[link.tag.index].id.clone());
                }
                Owner::SubSurface { parent } => {
                    openings.push(parent);
                    ids.push(input.surfaces[parent].sub_surfaces[link.tag.index].id.clone());
                }
                Owner::Shading => ids.push(input.shades[link.tag.index].id.clone()),
            }
        }

        let index = edges.len();
        let mut report = EdgeReport {
            category: assignment.category,
            psi: assignment.value,
            length: edge.length,
            surfaces: ids,
            shares: BTreeMap::new(),
            v0: [edge.v0.x, edge.v0.y, edge.v0.z],
            v1: [edge.v1.x, edge.v1.y, edge.v1.z],
            provenance: assignment.provenance.clone(),
            skipped: false,
        };

        if openings.len() > 1 {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::AmbiguousOpenings,
                report.surfaces.join(", "),
                format!("edge links {} openings; not derated", openings.len()),
            ));
            report.skipped = true;
            edges.push(report);
            continue;
        }

        let mut deratable: Vec<usize> = opaque
            .iter()
            .copied()
            .filter(|&i| ingested.surfaces[i].deratable)
            .collect();

        // An opening derates its neighbour rather than its own parent.
        if let [parent] = openings.as_slice() {
            if deratable.contains(parent) && deratable.iter().any(|i| i != parent) {
                deratable.retain(|i| i != parent);
            }
        }

        let total = report.heat_loss();
        if total > 0.0 && !deratable.is_empty() {
            let weights: Vec<f64> = deratable
                .iter()
                .map(|&i| {
                    input.surfaces[i]
                        .layer
                        .as_ref()
                        .map_or(0.0, |l| l.resistance())
                })
                .collect();
            for (&i, share) in deratable.iter().zip(proportional(total, &weights)) {
                losses[i].edge_loss += share;
                losses[i].edges.push(index);
                *report
                    .shares
                    .entry(input.surfaces[i].id.clone())
                    .or_insert(0.0) += share;
            }
        }

        edges.push(report);
    }

    for (i, record) in input.surfaces.iter().enumerate() {
        let bridges: Vec<_> = record
            .point_bridges
            .iter()
            .chain(registry.point_bridges(&record.id))
            .collect();
        if bridges.is_empty() {
            continue;
        }
        if !ingested.surfaces[i].deratable {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::IgnoredPointBridge,
                record.id.clone(),
                "point bridges on a non-deratable surface are ignored",
            ));
            continue;
        }
        for bridge in bridges {
            match registry.khi(&bridge.khi) {
                Some(value) => losses[i].point_loss += f64::from(bridge.count) * value,
                None => diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnknownKhi,
                    record.id.clone(),
                    format!("point bridge '{}' is not defined; ignored", bridge.khi),
                )),
            }
        }
    }

    tracing::info!(
        edges = edges.len(),
        skipped = edges.iter().filter(|e| e.skipped).count(),
        heat_loss = losses.iter().map(SurfaceLoss::total).sum::<f64>(),
        "Allocated bridging losses"
    );

    Allocation { edges, losses }
}

/// Splits `total` in proportion to `weights`; evenly when they sum to zero.
fn proportional(total: f64, weights: &[f64]) -> Vec<f64> {
    let sum: f64 = weights.iter().map(|w| w.max(0.0)).sum();
    if sum > 0.0 {
        weights.iter().map(|w| total * w.max(0.0) / sum).collect()
    } else {
        let even = total / weights.len().max(1) as f64;
        vec![even; weights.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn shares_follow_resistance() {
        let shares = proportional(3.0, &[2.0, 1.0]);
        assert_relative_eq!(shares[0], 2.0);
        assert_relative_eq!(shares[1], 1.0);
    }

    #[test]
    fn zero_weights_split_evenly() {
        let shares = proportional(3.0, &[0.0, 0.0, 0.0]);
        assert_eq!(shares, vec![1.0, 1.0, 1.0]);
        assert!(proportional(1.0, &[]).is_empty());
    }

    #[test]
    fn surface_loss_total() {
        let loss = SurfaceLoss {
            edge_loss: 1.5,
            point_loss: 2.0,
            edges: vec![0, 3],
        };
        assert_relative_eq!(loss.total(), 3.5);
    }
}
