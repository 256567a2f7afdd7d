// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key types for arena-based storage.
//!
//! Every kernel entity gets a type-safe generational key from
//! `slotmap::SlotMap`. A key removed by an edge split never aliases the
//! entity that later reuses its slot.

use slotmap::new_key_type;

new_key_type! {
    /// Key for a vertex (tolerance-unique point).
    pub struct VertexKey;

    /// Key for an edge (unordered vertex pair).
    pub struct EdgeKey;

    /// Key for a directed edge (edge plus traversal direction).
    pub struct DirectedEdgeKey;

    /// Key for a wire (closed planar loop of directed edges).
    pub struct WireKey;

    /// Key for a face (outer wire plus holes).
    pub struct FaceKey;

    /// Key for a shell (edge-connected set of faces).
    pub struct ShellKey;
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn removed_key_does_not_alias_its_slot() {
        let mut edges: SlotMap<EdgeKey, u32> = SlotMap::with_key();
        let split = edges.insert(1);
        edges.remove(split);
        let reused = edges.insert(2);

        assert_ne!(split, reused);
        assert!(edges.get(split).is_none());
        assert_eq!(edges[reused], 2);
    }
}
