// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Recoverable issues collected during a run.
//!
//! Each entry is logged through `tracing` when it is recorded and returned
//! with the outcome, so a host can decide whether a result with warnings is
//! acceptable.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Edge linking two or more openings; skipped for derating.
    AmbiguousOpenings,
    /// Vertex near an edge end that could not be placed on the edge.
    UnresolvedVertex,
    /// Deratable surface without a usable insulating layer.
    MissingLayer,
    /// Override naming a conductance set that does not exist.
    UnknownSet,
    /// Override naming a story, space, space type or surface not in the model.
    UnknownScope,
    /// Edge override naming a category its set does not define.
    UnknownCategory,
    /// Point bridge naming an undefined KHI.
    UnknownKhi,
    /// Point bridges on a surface that is not deratable.
    IgnoredPointBridge,
    /// Surface adjacent to itself; never treated as a party wall.
    SelfAdjacency,
    /// Derating pinned a layer to a physical bound.
    ResidualLoss,
    /// Bridging alone exceeds an uprating target.
    InfeasibleUprate,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::SelfAdjacency | DiagnosticKind::IgnoredPointBridge => Severity::Info,
            _ => Severity::Warning,
        }
    }
}

/// A recoverable issue tied to a surface, edge or configuration entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: kind.severity(),
            kind,
            subject: Some(subject.into()),
            message: message.into(),
        }
    }
}

/// Ordered diagnostic log.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Records a diagnostic and logs it.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        let subject = diagnostic.subject.as_deref().unwrap_or("-");
        match diagnostic.severity {
            Severity::Warning => tracing::warn!(
                kind = ?diagnostic.kind,
                subject = %subject,
                "{}",
                diagnostic.message
            ),
            Severity::Info => tracing::info!(
                kind = ?diagnostic.kind,
                subject = %subject,
                "{}",
                diagnostic.message
            ),
        }
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.push(diagnostic);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries of the given kind.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
