// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fatal errors.
//!
//! Anything returned here aborts the run before a single surface result is
//! produced. Recoverable issues are [`crate::diagnostics::Diagnostic`]s.

use thiserror::Error;

use crate::psi::Category;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("topology error: {0}")]
    Topology(#[from] tbd_lite_topology::Error),

    #[error("surface {id}: {source}")]
    Geometry {
        id: String,
        #[source]
        source: tbd_lite_topology::Error,
    },

    #[error("invalid surface {id}: {reason}")]
    InvalidSurface { id: String, reason: String },

    #[error("duplicate surface id: {0}")]
    DuplicateSurface(String),

    #[error("unknown conductance set: {0}")]
    UnknownSet(String),

    #[error("conductance set {set} is incomplete: missing {missing:?}")]
    IncompleteSet { set: String, missing: Vec<Category> },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
