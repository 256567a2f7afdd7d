// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Insulating layer derating and uprating.
//!
//! Derating folds a surface's bridging loss into its insulating layer:
//! `U' = 1/R + loss/area`, then the layer is resized to `R' = 1/U'`.
//! Uprating runs the other way, solving for the layer that still meets an
//! assembly target once it has been derated.
//!
//! Layers never leave their physical bounds. When a bound binds, the loss
//! the layer cannot represent is reported as a residual.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::surface::{InsulatingLayer, LayerKind, SurfaceType};

/// Lowest resistance of a massless layer [m²·K/W].
pub const MIN_RESISTANCE: f64 = 0.001;

/// Thinnest standard layer [m].
pub const MIN_THICKNESS: f64 = 0.003;

/// Most conductive standard layer [W/m·K].
pub const MAX_CONDUCTIVITY: f64 = 3.0;

/// Residual losses below this [W/K] are rounding noise.
const RESIDUAL_EPSILON: f64 = 1e-6;

/// Assembly U-factor target [W/m²·K] for one surface type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UprateTarget {
    pub surface_type: SurfaceType,
    pub target_u: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Derated {
    pub layer: InsulatingLayer,
    /// Layer conductance that would carry the full loss [W/m²·K].
    pub requested_u: f64,
    /// Layer conductance actually achieved.
    pub realized_u: f64,
    /// Loss the bounded layer cannot represent [W/K].
    pub residual_loss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Uprated {
    pub layer: InsulatingLayer,
    /// Target assembly U-factor, bridging included [W/m²·K].
    pub requested_u: f64,
    /// Assembly U-factor once the resized layer is derated.
    pub realized_u: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("bridging ({bridging_u:.3} W/m2.K) leaves no layer able to meet the {target_u:.3} W/m2.K target")]
pub struct Infeasible {
    pub target_u: f64,
    pub bridging_u: f64,
}

/// Derates `layer` for `heat_loss` [W/K] spread over `area` [m²].
pub fn derate(layer: &InsulatingLayer, heat_loss: f64, area: f64) -> Derated {
    let r = layer.resistance();
    if r <= 0.0 || area <= 0.0 || heat_loss <= 0.0 {
        let u = if r > 0.0 { 1.0 / r } else { 0.0 };
        return Derated {
            layer: layer.clone(),
            requested_u: u,
            realized_u: u,
            residual_loss: 0.0,
        };
    }

    let requested_u = 1.0 / r + heat_loss / area;
    let fitted = fit_layer(layer, 1.0 / requested_u);
    let realized_u = 1.0 / fitted.resistance();

    let residual = (requested_u - realized_u) * area;
    Derated {
        layer: fitted,
        requested_u,
        realized_u,
        residual_loss: if residual > RESIDUAL_EPSILON { residual } else { 0.0 },
    }
}

/// Resizes `layer` so that, once [`derate`] folds `heat_loss` over `area`
/// back in, an assembly with `other_resistance` outside the layer meets
/// `target_u`.
///
/// The layer must reach `U_L = 1/(1/target − other)` after derating, so its
/// base conductance is `U_L − loss/area`. The realized U-factor comes from
/// derating the resized layer and keeps any residual the bounds leave.
pub fn uprate(
    layer: &InsulatingLayer,
    target_u: f64,
    other_resistance: f64,
    heat_loss: f64,
    area: f64,
) -> Result<Uprated, Infeasible> {
    let bridging_u = if area > 0.0 { heat_loss / area } else { 0.0 };
    if target_u <= 0.0 {
        return Err(Infeasible {
            target_u,
            bridging_u,
        });
    }

    let other = other_resistance.max(0.0);
    let layer_r = 1.0 / target_u - other;
    let layer_u = if layer_r > 0.0 {
        1.0 / layer_r
    } else {
        f64::INFINITY
    };
    if layer_u <= bridging_u {
        return Err(Infeasible {
            target_u,
            bridging_u,
        });
    }

    let needed = (1.0 / (layer_u - bridging_u)).max(MIN_RESISTANCE);
    let fitted = fit_layer(layer, needed);

    let derated = derate(&fitted, heat_loss, area);
    let residual_u = if area > 0.0 {
        derated.residual_loss / area
    } else {
        0.0
    };
    let realized_u = 1.0 / (other + derated.layer.resistance()) + residual_u;

    Ok(Uprated {
        layer: fitted,
        requested_u: target_u,
        realized_u,
    })
}

/// Sets a layer to resistance `r`, within bounds. `r` must be positive.
fn fit_layer(layer: &InsulatingLayer, r: f64) -> InsulatingLayer {
    let kind = match layer.kind {
        LayerKind::Massless { .. } => LayerKind::Massless {
            resistance: r.max(MIN_RESISTANCE),
        },
        LayerKind::Standard { conductivity, .. } => {
            let mut conductivity = conductivity.min(MAX_CONDUCTIVITY);
            let mut thickness = r * conductivity;
            if thickness < MIN_THICKNESS {
                thickness = MIN_THICKNESS;
                conductivity = (thickness / r).min(MAX_CONDUCTIVITY);
            }
            LayerKind::Standard {
                conductivity,
                thickness,
            }
        }
    };
    InsulatingLayer {
        index: layer.index,
        material: layer.material.clone(),
        kind,
    }
}
