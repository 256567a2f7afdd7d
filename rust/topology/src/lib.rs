// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # TBD-Lite Topology
//!
//! Tolerance-deduplicated mesh kernel for building envelopes.
//!
//! Independently modelled polygons are merged into one canonical topology:
//! vertices within tolerance collapse, edges are unique per vertex pair, and
//! a vertex landing on an existing edge splits it so that every face sharing
//! that line ends up sharing the same edges. Entities live in slot maps with
//! upward adjacency indices, which is what lets the thermal bridge classifier
//! ask "which faces meet at this edge, and how".

pub mod arena;
pub mod construction;
pub mod error;
pub mod geometry;
pub mod keys;
pub mod serialization;
pub mod spatial;
mod split;
pub mod traversal;

pub use arena::{TopologyArena, Tolerance};
pub use construction::make_rectangle;
pub use error::{Error, Result};
pub use keys::{DirectedEdgeKey, EdgeKey, FaceKey, ShellKey, VertexKey, WireKey};
pub use spatial::{point_segment_relation, within_tolerance, OnSegment};
pub use traversal::{EdgeLink, WireRole};
