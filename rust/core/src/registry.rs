// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conductance set registry and scoped overrides.
//!
//! The registry is a base set plus a flat list of overrides, each tagged with
//! the scope it applies to. Resolution is a pure function of a category and
//! the scopes an edge belongs to:
//!
//! 1. the finest scope level with a matching override that defines the
//!    category wins (surface > space > space type > story);
//! 2. several matching overrides at that level resolve to the most
//!    conductive value;
//! 3. otherwise the building default applies.
//!
//! Edge overrides are kept apart: they target a single edge through the
//! surfaces it links, and the classifier applies them to its candidates.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::{Error, Result};
use crate::model::Input;
use crate::psi::{builtin_khis, builtin_sets, Category, KhiPoint, PsiSet, NON_BRIDGING};
use crate::surface::PointBridge;

/// Where an override applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "level", content = "id", rename_all = "snake_case")]
pub enum Scope {
    Building,
    Story(String),
    SpaceType(String),
    Space(String),
    Surface(String),
    Edge,
}

impl Scope {
    /// Higher is finer.
    pub fn rank(&self) -> u8 {
        match self {
            Scope::Building => 0,
            Scope::Story(_) => 1,
            Scope::SpaceType(_) => 2,
            Scope::Space(_) => 3,
            Scope::Surface(_) => 4,
            Scope::Edge => 5,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Building => write!(f, "building"),
            Scope::Story(id) => write!(f, "story {id}"),
            Scope::SpaceType(id) => write!(f, "space type {id}"),
            Scope::Space(id) => write!(f, "space {id}"),
            Scope::Surface(id) => write!(f, "surface {id}"),
            Scope::Edge => write!(f, "edge"),
        }
    }
}

/// Which scope and set supplied a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub scope: Scope,
    pub set: String,
}

impl Provenance {
    pub fn new(scope: Scope, set: impl Into<String>) -> Self {
        Self {
            scope,
            set: set.into(),
        }
    }
}

/// A resolved conductance.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Effective category (a head resolved through an aggregate
    /// `fenestration` value reads `fenestration`).
    pub category: Category,
    pub value: f64,
    pub provenance: Provenance,
}

/// The scopes an edge belongs to, through the surfaces it links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeScope {
    pub surfaces: BTreeSet<String>,
    pub spaces: BTreeSet<String>,
    pub space_types: BTreeSet<String>,
    pub stories: BTreeSet<String>,
}

impl EdgeScope {
    pub fn contains(&self, scope: &Scope) -> bool {
        match scope {
            Scope::Building | Scope::Edge => true,
            Scope::Story(id) => self.stories.contains(id),
            Scope::SpaceType(id) => self.space_types.contains(id),
            Scope::Space(id) => self.spaces.contains(id),
            Scope::Surface(id) => self.surfaces.contains(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    pub scope: Scope,
    pub set: String,
}

/// Assigns `category` from `set` to every edge linking all `surfaces`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EdgeOverride {
    #[serde(rename = "psi")]
    pub set: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub surfaces: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Registry {
    sets: BTreeMap<String, PsiSet>,
    khis: BTreeMap<String, f64>,
    default_set: String,
    overrides: Vec<Override>,
    edge_overrides: Vec<EdgeOverride>,
    point_bridges: BTreeMap<String, Vec<PointBridge>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Built-in library with the non-bridging default.
    pub fn new() -> Self {
        Self {
            sets: builtin_sets()
                .into_iter()
                .map(|s| (s.name.clone(), s))
                .collect(),
            khis: builtin_khis().into_iter().map(|k| (k.id, k.value)).collect(),
            default_set: NON_BRIDGING.to_string(),
            overrides: Vec::new(),
            edge_overrides: Vec::new(),
            point_bridges: BTreeMap::new(),
        }
    }

    /// Built-in library with `name` as the building default.
    pub fn with_default(name: impl Into<String>) -> Self {
        Self {
            default_set: name.into(),
            ..Self::new()
        }
    }

    /// Parses a customisation document on top of the built-in library.
    ///
    /// ```
    /// use tbd_lite_core::registry::Registry;
    ///
    /// let registry = Registry::from_json(r#"{
    ///     "psis": [{ "id": "tweak", "rimjoist": 0.2 }],
    ///     "building": { "psi": "regular (BETBG)" },
    ///     "spaces": [{ "id": "Office", "psi": "tweak" }]
    /// }"#).unwrap();
    /// assert_eq!(registry.default_set(), "regular (BETBG)");
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: Document = serde_json::from_str(json)?;
        let mut registry = Self::new();

        for set in doc.psis {
            registry.add_set(set);
        }
        for khi in doc.khis {
            registry.add_khi(khi);
        }
        if let Some(building) = doc.building {
            registry.default_set = building.psi;
        }
        for entry in doc.stories {
            registry.add_override(Scope::Story(entry.id), entry.psi);
        }
        for entry in doc.spacetypes {
            registry.add_override(Scope::SpaceType(entry.id), entry.psi);
        }
        for entry in doc.spaces {
            registry.add_override(Scope::Space(entry.id), entry.psi);
        }
        for entry in doc.surfaces {
            if let Some(psi) = entry.psi {
                registry.add_override(Scope::Surface(entry.id.clone()), psi);
            }
            if !entry.khis.is_empty() {
                registry.point_bridges.insert(entry.id, entry.khis);
            }
        }
        for edge in doc.edges {
            registry.add_edge_override(edge);
        }

        tracing::debug!(
            sets = registry.sets.len(),
            khis = registry.khis.len(),
            overrides = registry.overrides.len(),
            edge_overrides = registry.edge_overrides.len(),
            default = %registry.default_set,
            "Loaded conductance registry"
        );
        Ok(registry)
    }

    pub fn add_set(&mut self, set: PsiSet) {
        self.sets.insert(set.name.clone(), set);
    }

    pub fn add_khi(&mut self, khi: KhiPoint) {
        self.khis.insert(khi.id, khi.value);
    }

    pub fn add_override(&mut self, scope: Scope, set: impl Into<String>) {
        self.overrides.push(Override {
            scope,
            set: set.into(),
        });
    }

    pub fn add_edge_override(&mut self, edge: EdgeOverride) {
        self.edge_overrides.push(edge);
    }

    pub fn default_set(&self) -> &str {
        &self.default_set
    }

    pub fn set(&self, name: &str) -> Option<&PsiSet> {
        self.sets.get(name)
    }

    pub fn khi(&self, id: &str) -> Option<f64> {
        self.khis.get(id).copied()
    }

    pub fn overrides(&self) -> &[Override] {
        &self.overrides
    }

    pub fn edge_overrides(&self) -> &[EdgeOverride] {
        &self.edge_overrides
    }

    /// Point bridges attached to a surface through the customisation document.
    pub fn point_bridges(&self, surface: &str) -> &[PointBridge] {
        self.point_bridges
            .get(surface)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Fails unless the building default exists and is complete.
    pub fn check_default(&self) -> Result<()> {
        let set = self
            .sets
            .get(&self.default_set)
            .ok_or_else(|| Error::UnknownSet(self.default_set.clone()))?;
        if !set.is_complete() {
            return Err(Error::IncompleteSet {
                set: set.name.clone(),
                missing: set.missing(),
            });
        }
        Ok(())
    }

    /// Checks the default, then drops every override that names an unknown
    /// set, scope id or category, recording a diagnostic for each.
    pub fn validate(&mut self, input: &Input, diagnostics: &mut Diagnostics) -> Result<()> {
        self.check_default()?;

        let mut surfaces = BTreeSet::new();
        let mut spaces = BTreeSet::new();
        let mut space_types = BTreeSet::new();
        let mut stories = BTreeSet::new();
        for record in &input.surfaces {
            surfaces.insert(record.id.as_str());
            surfaces.extend(record.sub_surfaces.iter().map(|s| s.id.as_str()));
            spaces.extend(record.space.as_deref());
            space_types.extend(record.space_type.as_deref());
            stories.extend(record.story.as_deref());
        }
        surfaces.extend(input.shades.iter().map(|s| s.id.as_str()));

        let sets = &self.sets;
        self.overrides.retain(|o| {
            if !sets.contains_key(&o.set) {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnknownSet,
                    o.scope.to_string(),
                    format!("override set '{}' is not defined; ignored", o.set),
                ));
                return false;
            }
            let known = match &o.scope {
                Scope::Building | Scope::Edge => true,
                Scope::Story(id) => stories.contains(id.as_str()),
                Scope::SpaceType(id) => space_types.contains(id.as_str()),
                Scope::Space(id) => spaces.contains(id.as_str()),
                Scope::Surface(id) => surfaces.contains(id.as_str()),
            };
            if !known {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnknownScope,
                    o.scope.to_string(),
                    format!("no {} in the model; override '{}' ignored", o.scope, o.set),
                ));
            }
            known
        });

        self.edge_overrides.retain(|e| {
            let subject = e.surfaces.join(", ");
            let Some(set) = sets.get(&e.set) else {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnknownSet,
                    subject,
                    format!("edge override set '{}' is not defined; ignored", e.set),
                ));
                return false;
            };
            if set.get(e.category).is_none() {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnknownCategory,
                    subject,
                    format!("set '{}' does not define '{}'; edge override ignored", e.set, e.category),
                ));
                return false;
            }
            if let Some(unknown) = e.surfaces.iter().find(|id| !surfaces.contains(id.as_str())) {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnknownScope,
                    subject,
                    format!("no surface {unknown} in the model; edge override ignored"),
                ));
                return false;
            }
            true
        });

        self.point_bridges.retain(|id, _| {
            let known = surfaces.contains(id.as_str());
            if !known {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnknownScope,
                    format!("surface {id}"),
                    "point bridges attached to an unknown surface; ignored",
                ));
            }
            known
        });

        Ok(())
    }

    /// Resolves a category for an edge.
    ///
    /// Returns `None` when no scope, the default included, defines it.
    pub fn resolve(&self, category: Category, scope: &EdgeScope) -> Option<Resolved> {
        let mut levels: Vec<u8> = self.overrides.iter().map(|o| o.scope.rank()).collect();
        levels.sort_unstable_by(|a, b| b.cmp(a));
        levels.dedup();

        for level in levels {
            let mut best: Option<Resolved> = None;
            for o in self
                .overrides
                .iter()
                .filter(|o| o.scope.rank() == level && scope.contains(&o.scope))
            {
                let Some((effective, value)) =
                    self.sets.get(&o.set).and_then(|s| s.lookup(category))
                else {
                    continue;
                };
                if best.as_ref().map_or(true, |b| value > b.value) {
                    best = Some(Resolved {
                        category: effective,
                        value,
                        provenance: Provenance::new(o.scope.clone(), o.set.clone()),
                    });
                }
            }
            if best.is_some() {
                return best;
            }
        }

        let (effective, value) = self.sets.get(&self.default_set)?.lookup(category)?;
        Some(Resolved {
            category: effective,
            value,
            provenance: Provenance::new(Scope::Building, self.default_set.clone()),
        })
    }

    /// Edge overrides matching an edge that links every listed surface.
    pub fn edge_overrides_for<'a>(
        &'a self,
        linked: &'a BTreeSet<String>,
    ) -> impl Iterator<Item = (&'a EdgeOverride, f64)> + 'a {
        self.edge_overrides.iter().filter_map(move |e| {
            if e.surfaces.is_empty() || !e.surfaces.iter().all(|s| linked.contains(s)) {
                return None;
            }
            let value = self.sets.get(&e.set)?.get(e.category)?;
            Some((e, value))
        })
    }
}

// --- customisation document ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Document {
    psis: Vec<PsiSet>,
    khis: Vec<KhiPoint>,
    building: Option<BuildingEntry>,
    stories: Vec<ScopeEntry>,
    spacetypes: Vec<ScopeEntry>,
    spaces: Vec<ScopeEntry>,
    surfaces: Vec<SurfaceEntry>,
    edges: Vec<EdgeOverride>,
}

#[derive(Debug, Deserialize)]
struct BuildingEntry {
    psi: String,
}

#[derive(Debug, Deserialize)]
struct ScopeEntry {
    id: String,
    psi: String,
}

#[derive(Debug, Deserialize)]
struct SurfaceEntry {
    id: String,
    #[serde(default)]
    psi: Option<String>,
    #[serde(default)]
    khis: Vec<PointBridge>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{BoundaryCondition, SurfaceRecord, SurfaceType};

    fn scope(surfaces: &[&str], spaces: &[&str], stories: &[&str]) -> EdgeScope {
        EdgeScope {
            surfaces: surfaces.iter().map(|s| s.to_string()).collect(),
            spaces: spaces.iter().map(|s| s.to_string()).collect(),
            space_types: BTreeSet::new(),
            stories: stories.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn input() -> Input {
        let mut wall = SurfaceRecord::new("w1", SurfaceType::Wall, BoundaryCondition::Outdoors, vec![]);
        wall.space = Some("Office".into());
        wall.story = Some("Level 1".into());
        Input {
            surfaces: vec![wall],
            shades: vec![],
        }
    }

    #[test]
    fn default_resolution() {
        let registry = Registry::with_default("regular (BETBG)");
        let r = registry.resolve(Category::Rimjoist, &EdgeScope::default()).unwrap();
        assert_eq!(r.value, 0.5);
        assert_eq!(r.provenance, Provenance::new(Scope::Building, "regular (BETBG)"));
    }

    #[test]
    fn finest_scope_wins() {
        let mut registry = Registry::with_default("regular (BETBG)");
        registry.add_override(Scope::Story("Level 1".into()), "poor (BETBG)");
        registry.add_override(Scope::Space("Office".into()), "efficient (BETBG)");

        let s = scope(&["w1"], &["Office"], &["Level 1"]);
        let r = registry.resolve(Category::Parapet, &s).unwrap();
        assert_eq!(r.value, 0.2);
        assert_eq!(r.provenance.scope, Scope::Space("Office".into()));

        let s = scope(&["w1"], &["Lobby"], &["Level 1"]);
        assert_eq!(registry.resolve(Category::Parapet, &s).unwrap().value, 0.8);
    }

    #[test]
    fn overlapping_overrides_take_the_more_conductive() {
        let mut registry = Registry::with_default("regular (BETBG)");
        registry.add_override(Scope::Space("A".into()), "efficient (BETBG)");
        registry.add_override(Scope::Space("B".into()), "poor (BETBG)");

        let r = registry
            .resolve(Category::Cornerconvex, &scope(&[], &["A", "B"], &[]))
            .unwrap();
        assert_eq!(r.value, 0.85);
        assert_eq!(r.provenance.set, "poor (BETBG)");
    }

    #[test]
    fn partial_override_defers_to_coarser_scope() {
        let mut registry = Registry::with_default("regular (BETBG)");
        registry.add_set(PsiSet::new("rim only").with(Category::Rimjoist, 0.1));
        registry.add_override(Scope::Surface("w1".into()), "rim only");

        let s = scope(&["w1"], &[], &[]);
        assert_eq!(registry.resolve(Category::Rimjoist, &s).unwrap().value, 0.1);
        let r = registry.resolve(Category::Parapet, &s).unwrap();
        assert_eq!(r.value, 0.45);
        assert_eq!(r.provenance.scope, Scope::Building);
    }

    #[test]
    fn missing_or_incomplete_default_is_fatal() {
        let registry = Registry::with_default("nope");
        assert!(matches!(registry.check_default(), Err(Error::UnknownSet(_))));

        let mut registry = Registry::with_default("partial");
        registry.add_set(PsiSet::new("partial").with(Category::Rimjoist, 0.5));
        assert!(matches!(
            registry.check_default(),
            Err(Error::IncompleteSet { .. })
        ));
    }

    #[test]
    fn validation_drops_bad_overrides() {
        let json = r#"{
            "building": { "psi": "regular (BETBG)" },
            "spaces": [{ "id": "Office", "psi": "missing set" },
                       { "id": "Nowhere", "psi": "poor (BETBG)" }],
            "stories": [{ "id": "Level 1", "psi": "poor (BETBG)" }],
            "psis": [{ "id": "rims only", "rimjoist": 0.3 }],
            "edges": [{ "psi": "regular (BETBG)", "type": "head", "surfaces": ["w1"] },
                      { "psi": "rims only", "type": "parapet", "surfaces": ["w1"] },
                      { "psi": "regular (BETBG)", "type": "joint", "surfaces": ["w1"] }]
        }"#;
        let mut registry = Registry::from_json(json).unwrap();
        let mut diagnostics = Diagnostics::default();
        registry.validate(&input(), &mut diagnostics).unwrap();

        assert_eq!(registry.overrides().len(), 1);
        assert_eq!(registry.overrides()[0].scope, Scope::Story("Level 1".into()));
        // Head falls back to the set's fenestration value.
        let kept: Vec<_> = registry.edge_overrides().iter().map(|e| e.category).collect();
        assert_eq!(kept, vec![Category::Head, Category::Joint]);
        assert_eq!(diagnostics.count(DiagnosticKind::UnknownSet), 1);
        assert_eq!(diagnostics.count(DiagnosticKind::UnknownScope), 1);
        assert_eq!(diagnostics.count(DiagnosticKind::UnknownCategory), 1);
    }

    #[test]
    fn edge_overrides_match_linked_surfaces() {
        let mut registry = Registry::with_default("regular (BETBG)");
        registry.add_edge_override(EdgeOverride {
            set: "regular (BETBG)".into(),
            category: Category::Joint,
            surfaces: vec!["a".into(), "b".into()],
        });

        let linked: BTreeSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let hits: Vec<_> = registry.edge_overrides_for(&linked).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1, 0.2);

        let linked: BTreeSet<String> = ["a"].iter().map(|s| s.to_string()).collect();
        assert_eq!(registry.edge_overrides_for(&linked).count(), 0);
    }

    #[test]
    fn edge_override_falls_back_to_generic_corner() {
        let mut registry = Registry::with_default("regular (BETBG)");
        registry.add_set(PsiSet::new("corners").with(Category::Corner, 0.6));
        registry.add_edge_override(EdgeOverride {
            set: "corners".into(),
            category: Category::Cornerconvex,
            surfaces: vec!["w1".into()],
        });
        let mut diagnostics = Diagnostics::default();
        registry.validate(&input(), &mut diagnostics).unwrap();

        assert!(diagnostics.is_empty());
        let linked: BTreeSet<String> = ["w1".to_string()].into_iter().collect();
        let hits: Vec<_> = registry.edge_overrides_for(&linked).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.category, Category::Cornerconvex);
        assert_eq!(hits[0].1, 0.6);
    }

    #[test]
    fn khis_and_surface_point_bridges_from_json() {
        let registry = Registry::from_json(
            r#"{ "khis": [{ "id": "beam", "point": 0.9 }],
                 "surfaces": [{ "id": "w1", "khis": [{ "id": "beam", "count": 2 }] }] }"#,
        )
        .unwrap();
        assert_eq!(registry.khi("beam"), Some(0.9));
        assert_eq!(registry.khi("regular (BETBG)"), Some(2.0));
        assert_eq!(registry.point_bridges("w1")[0].count, 2);
        assert!(registry.point_bridges("w2").is_empty());
    }
}
