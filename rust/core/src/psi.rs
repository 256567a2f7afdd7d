// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Thermal bridge categories and conductance sets.
//!
//! A [`PsiSet`] maps categories to linear conductances [W/K·m]; a
//! [`KhiPoint`] is a point conductance [W/K]. The built-in library carries
//! the BETBG and Quebec code sets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Thermal bridge category of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Rimjoist,
    Parapet,
    Fenestration,
    Head,
    Sill,
    Jamb,
    Corner,
    Cornerconcave,
    Cornerconvex,
    Balcony,
    Party,
    Grade,
    Joint,
    Transition,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Rimjoist => "rimjoist",
            Category::Parapet => "parapet",
            Category::Fenestration => "fenestration",
            Category::Head => "head",
            Category::Sill => "sill",
            Category::Jamb => "jamb",
            Category::Corner => "corner",
            Category::Cornerconcave => "cornerconcave",
            Category::Cornerconvex => "cornerconvex",
            Category::Balcony => "balcony",
            Category::Party => "party",
            Category::Grade => "grade",
            Category::Joint => "joint",
            Category::Transition => "transition",
        }
    }

    pub fn is_fenestration(self) -> bool {
        matches!(
            self,
            Category::Fenestration | Category::Head | Category::Sill | Category::Jamb
        )
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named category → PSI mapping.
///
/// Sets may be partial; a partial set is only usable below building scope,
/// where missing categories defer to the enclosing scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsiSet {
    #[serde(rename = "id")]
    pub name: String,
    #[serde(flatten)]
    pub values: BTreeMap<Category, f64>,
}

impl PsiSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, category: Category, psi: f64) -> Self {
        self.values.insert(category, psi);
        self
    }

    /// Effective `(category, psi)` for a requested category.
    ///
    /// Concave and convex corners fall back to a generic `corner` value and
    /// keep their own label. Head, sill and jamb fall back to the aggregate
    /// `fenestration` value and are relabelled. `transition` is always 0.
    pub fn lookup(&self, category: Category) -> Option<(Category, f64)> {
        if let Some(&psi) = self.values.get(&category) {
            return Some((category, psi));
        }
        match category {
            Category::Transition => Some((Category::Transition, 0.0)),
            Category::Cornerconcave | Category::Cornerconvex => self
                .values
                .get(&Category::Corner)
                .map(|&psi| (category, psi)),
            Category::Head | Category::Sill | Category::Jamb => self
                .values
                .get(&Category::Fenestration)
                .map(|&psi| (Category::Fenestration, psi)),
            _ => None,
        }
    }

    /// PSI for a category, with the fallbacks of [`PsiSet::lookup`].
    pub fn get(&self, category: Category) -> Option<f64> {
        self.lookup(category).map(|(_, psi)| psi)
    }

    /// `true` when head, sill and jamb are all defined explicitly.
    pub fn splits_fenestration(&self) -> bool {
        [Category::Head, Category::Sill, Category::Jamb]
            .iter()
            .all(|c| self.values.contains_key(c))
    }

    /// Mandatory categories this set cannot supply.
    pub fn missing(&self) -> Vec<Category> {
        let mut missing = Vec::new();
        for category in [Category::Rimjoist, Category::Parapet] {
            if self.get(category).is_none() {
                missing.push(category);
            }
        }
        if !self.values.contains_key(&Category::Fenestration) && !self.splits_fenestration() {
            missing.push(Category::Fenestration);
        }
        for category in [
            Category::Cornerconcave,
            Category::Cornerconvex,
            Category::Balcony,
            Category::Party,
            Category::Grade,
        ] {
            if self.get(category).is_none() {
                missing.push(category);
            }
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

/// A named point conductance [W/K].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KhiPoint {
    pub id: String,
    #[serde(alias = "point")]
    pub value: f64,
}

pub const NON_BRIDGING: &str = "(non thermal bridging)";

/// Built-in PSI sets.
pub fn builtin_sets() -> Vec<PsiSet> {
    // (name, rimjoist, parapet, fenestration, corner, balcony, party, grade, joint)
    const TABLE: [(&str, [f64; 8]); 6] = [
        ("poor (BETBG)", [1.000, 0.800, 0.500, 0.850, 1.000, 0.850, 0.850, 0.300]),
        ("regular (BETBG)", [0.500, 0.450, 0.350, 0.450, 0.500, 0.450, 0.450, 0.200]),
        ("efficient (BETBG)", [0.200, 0.200, 0.200, 0.200, 0.200, 0.200, 0.200, 0.100]),
        ("code (Quebec)", [0.300, 0.325, 0.200, 0.300, 0.500, 0.450, 0.450, 0.200]),
        ("uncompliant (Quebec)", [0.850, 0.800, 0.500, 0.850, 1.000, 0.850, 0.850, 0.500]),
        (NON_BRIDGING, [0.0; 8]),
    ];
    const COLUMNS: [Category; 8] = [
        Category::Rimjoist,
        Category::Parapet,
        Category::Fenestration,
        Category::Corner,
        Category::Balcony,
        Category::Party,
        Category::Grade,
        Category::Joint,
    ];

    TABLE
        .iter()
        .map(|(name, row)| {
            COLUMNS
                .iter()
                .zip(row)
                .fold(PsiSet::new(*name), |set, (&c, &psi)| set.with(c, psi))
        })
        .collect()
}

/// Built-in KHI points.
pub fn builtin_khis() -> Vec<KhiPoint> {
    [
        ("poor (BETBG)", 4.0),
        ("regular (BETBG)", 2.0),
        ("efficient (BETBG)", 1.0),
        ("code (Quebec)", 2.0),
        ("uncompliant (Quebec)", 4.0),
        (NON_BRIDGING, 0.0),
    ]
    .into_iter()
    .map(|(id, value)| KhiPoint {
        id: id.to_string(),
        value,
    })
    .collect()
}
