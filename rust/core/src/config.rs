// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run options, from code, JSON or environment variables.

use serde::{Deserialize, Serialize};
use tbd_lite_topology::arena::{
    Tolerance, DEFAULT_GRID_CELL, DEFAULT_PLANAR_TOLERANCE, DEFAULT_VERTEX_TOLERANCE,
};

use crate::derate::UprateTarget;
use crate::error::Result;

/// Run options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Two points closer than this are the same vertex.
    pub vertex_tolerance: f64,
    /// Maximum distance of a polygon vertex from its plane.
    pub planar_tolerance: f64,
    /// Spatial index cell size.
    pub grid_cell: f64,
    /// Classify edges on the rayon thread pool.
    pub parallel: bool,
    /// Uprating targets, one per surface type.
    pub uprate: Vec<UprateTarget>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            vertex_tolerance: DEFAULT_VERTEX_TOLERANCE,
            planar_tolerance: DEFAULT_PLANAR_TOLERANCE,
            grid_cell: DEFAULT_GRID_CELL,
            parallel: true,
            uprate: Vec::new(),
        }
    }
}

impl Options {
    /// Parses options from JSON; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load options from environment variables.
    ///
    /// Reads `TBD_VERTEX_TOLERANCE`, `TBD_PLANAR_TOLERANCE`, `TBD_GRID_CELL`
    /// and `TBD_PARALLEL`; unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Options::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str, default: f64| {
            lookup(key)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v > 0.0)
                .unwrap_or(default)
        };

        Self {
            vertex_tolerance: number("TBD_VERTEX_TOLERANCE", defaults.vertex_tolerance),
            planar_tolerance: number("TBD_PLANAR_TOLERANCE", defaults.planar_tolerance),
            grid_cell: number("TBD_GRID_CELL", defaults.grid_cell),
            parallel: lookup("TBD_PARALLEL")
                .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" | "on" => Some(true),
                    "0" | "false" | "no" | "off" => Some(false),
                    _ => None,
                })
                .unwrap_or(defaults.parallel),
            uprate: defaults.uprate,
        }
    }

    /// Kernel tolerances.
    pub fn tolerance(&self) -> Tolerance {
        Tolerance {
            vertex: self.vertex_tolerance,
            planar: self.planar_tolerance,
            grid_cell: self.grid_cell,
        }
    }
}
