// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end processing of one envelope.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::allocate::{allocate, Allocation, EdgeReport};
use crate::classify::classify;
use crate::config::Options;
use crate::derate::{derate, uprate, Derated, Uprated};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::Result;
use crate::ingest::{ingest, Ingested};
use crate::psi::Category;
use crate::registry::Registry;
use crate::surface::{ShadingRecord, SurfaceRecord};

/// Surfaces and shades of one building.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Input {
    pub surfaces: Vec<SurfaceRecord>,
    #[serde(default)]
    pub shades: Vec<ShadingRecord>,
}

impl Input {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Result for one deratable surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceResult {
    /// Total bridging loss [W/K].
    pub heat_loss: f64,
    pub edge_loss: f64,
    pub point_loss: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derated: Option<Derated>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uprated: Option<Uprated>,
    /// Assembly U-factor [W/m²·K] before derating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assembly_u_before: Option<f64>,
    /// Assembly U-factor after derating, residual loss included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assembly_u_after: Option<f64>,
    /// Indices into [`Outcome::edges`].
    pub edges: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShellSummary {
    pub faces: usize,
    pub closed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub surfaces: BTreeMap<String, SurfaceResult>,
    pub edges: Vec<EdgeReport>,
    pub shells: Vec<ShellSummary>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Outcome {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn surface(&self, id: &str) -> Option<&SurfaceResult> {
        self.surfaces.get(id)
    }

    /// Number of reported edges assigned `category`.
    pub fn category_count(&self, category: Category) -> usize {
        self.edges.iter().filter(|e| e.category == category).count()
    }

    /// Number of diagnostics of the given kind.
    pub fn diagnostic_count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    /// Sum of every surface's bridging loss [W/K].
    pub fn total_heat_loss(&self) -> f64 {
        self.surfaces.values().map(|s| s.heat_loss).sum()
    }
}

/// Detects, classifies and allocates thermal bridges, then derates the
/// insulating layer of every deratable surface.
///
/// A missing or incomplete building default set and geometry defects are
/// fatal; everything else is reported in [`Outcome::diagnostics`].
pub fn process(input: &Input, registry: &Registry, options: &Options) -> Result<Outcome> {
    tracing::info!(
        surfaces = input.surfaces.len(),
        shades = input.shades.len(),
        default_set = registry.default_set(),
        "Processing envelope"
    );
    registry.check_default()?;

    let mut diagnostics = Diagnostics::default();
    let ingested = ingest(input, options, &mut diagnostics)?;

    let mut registry = registry.clone();
    registry.validate(input, &mut diagnostics)?;

    let classified = classify(input, &ingested, &registry, options, &mut diagnostics);
    let allocation = allocate(input, &ingested, &registry, &classified, &mut diagnostics);
    let uprated = uprate_groups(input, &ingested, &allocation, options, &mut diagnostics);

    let mut surfaces = BTreeMap::new();
    for (i, record) in input.surfaces.iter().enumerate() {
        let ingested_surface = &ingested.surfaces[i];
        if !ingested_surface.deratable {
            continue;
        }
        let Some(layer) = record.layer.as_ref() else {
            continue;
        };
        let loss = &allocation.losses[i];
        let area = ingested_surface.net_area;

        let base = uprated[i].as_ref().map_or(layer, |u| &u.layer);
        let derated = derate(base, loss.total(), area);
        if derated.residual_loss > 0.0 {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::ResidualLoss,
                record.id.clone(),
                format!(
                    "layer '{}' pinned at its physical bound; {:.3} W/K not represented",
                    derated.layer.material, derated.residual_loss
                ),
            ));
        }

        let (assembly_u_before, assembly_u_after) = match record.assembly_resistance {
            Some(total) if total > 0.0 => {
                let other = (total - layer.resistance()).max(0.0);
                let residual_u = if area > 0.0 {
                    derated.residual_loss / area
                } else {
                    0.0
                };
                (
                    Some(1.0 / total),
                    Some(1.0 / (other + derated.layer.resistance()) + residual_u),
                )
            }
            _ => (None, None),
        };

        surfaces.insert(
            record.id.clone(),
            SurfaceResult {
                heat_loss: loss.total(),
                edge_loss: loss.edge_loss,
                point_loss: loss.point_loss,
                derated: Some(derated),
                uprated: uprated[i].clone(),
                assembly_u_before,
                assembly_u_after,
                edges: loss.edges.clone(),
            },
        );
    }

    let shells = ingested
        .shells
        .iter()
        .filter_map(|&key| ingested.arena.shell(key))
        .map(|shell| ShellSummary {
            faces: shell.faces.len(),
            closed: shell.closed,
        })
        .collect();

    tracing::info!(
        derated = surfaces.len(),
        edges = allocation.edges.len(),
        diagnostics = diagnostics.len(),
        "Derated envelope"
    );

    Ok(Outcome {
        surfaces,
        edges: allocation.edges,
        shells,
        diagnostics: diagnostics.into_vec(),
    })
}

/// Solves each uprating target once per construction group.
///
/// Surfaces without a construction form a group of their own.
fn uprate_groups(
    input: &Input,
    ingested: &Ingested,
    allocation: &Allocation,
    options: &Options,
    diagnostics: &mut Diagnostics,
) -> Vec<Option<Uprated>> {
    let mut uprated = vec![None; input.surfaces.len()];

    for target in &options.uprate {
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, record) in input.surfaces.iter().enumerate() {
            if record.surface_type == target.surface_type
                && ingested.surfaces[i].deratable
                && record.layer.is_some()
            {
                let key = record.construction.as_deref().unwrap_or(&record.id);
                groups.entry(key).or_default().push(i);
            }
        }

        for (key, members) in groups {
            let Some(layer) = members
                .first()
                .and_then(|&i| input.surfaces[i].layer.as_ref())
            else {
                continue;
            };
            let first = &input.surfaces[members[0]];
            let other = first
                .assembly_resistance
                .map_or(0.0, |total| (total - layer.resistance()).max(0.0));
            let loss: f64 = members.iter().map(|&i| allocation.losses[i].total()).sum();
            let area: f64 = members.iter().map(|&i| ingested.surfaces[i].net_area).sum();

            match uprate(layer, target.target_u, other, loss, area) {
                Ok(result) => {
                    tracing::debug!(
                        construction = key,
                        members = members.len(),
                        resistance = result.layer.resistance(),
                        "Uprated construction"
                    );
                    for &i in &members {
                        uprated[i] = Some(result.clone());
                    }
                }
                Err(infeasible) => diagnostics.push(Diagnostic::new(
                    DiagnosticKind::InfeasibleUprate,
                    key,
                    infeasible.to_string(),
                )),
            }
        }
    }

    uprated
}
