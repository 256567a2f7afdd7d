// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # TBD-Lite Core
//!
//! Major thermal bridge detection for building envelopes, and derating of
//! the insulation that has to make up for them.
//!
//! ## Overview
//!
//! - **Ingestion**: host surface records become faces of one shared
//!   [`tbd_lite_topology`] kernel, openings as holes and as faces of their own
//! - **Classification**: every edge touching a deratable surface is placed
//!   in a thermal bridge category (rimjoist, parapet, fenestration, corner,
//!   balcony, party, grade, joint, transition)
//! - **Resolution**: PSI values come from a scoped registry of conductance
//!   sets (building, story, space type, space, surface, edge)
//! - **Allocation**: each edge's `psi × length` is shared among the surfaces
//!   it links, and point bridges are added
//! - **Derating**: each surface's insulating layer absorbs its loss, within
//!   physical bounds; optional uprating sizes layers to meet a target first
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tbd_lite_core::{process, Input, Options, Registry};
//!
//! let input = Input::from_json(&std::fs::read_to_string("model.json")?)?;
//! let registry = Registry::with_default("regular (BETBG)");
//! let outcome = process(&input, &registry, &Options::from_env())?;
//!
//! for (id, surface) in &outcome.surfaces {
//!     println!("{id}: {:.2} W/K", surface.heat_loss);
//! }
//! ```

pub mod allocate;
pub mod classify;
pub mod config;
pub mod derate;
pub mod diagnostics;
pub mod error;
pub mod ingest;
pub mod model;
pub mod psi;
pub mod registry;
pub mod surface;

pub use allocate::{EdgeReport, SurfaceLoss};
pub use classify::{select_conductance, Candidate, ClassifiedEdge, Orientation};
pub use config::Options;
pub use derate::{derate, uprate, Derated, Infeasible, UprateTarget, Uprated};
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use error::{Error, Result};
pub use model::{process, Input, Outcome, ShellSummary, SurfaceResult};
pub use psi::{Category, KhiPoint, PsiSet};
pub use registry::{EdgeOverride, EdgeScope, Provenance, Registry, Scope};
pub use surface::{
    BoundaryCondition, InsulatingLayer, LayerKind, PointBridge, ShadingRecord, SubSurfaceKind,
    SubSurfaceRecord, SurfaceRecord, SurfaceType,
};
