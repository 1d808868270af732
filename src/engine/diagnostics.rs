//! Non-fatal engine diagnostics.
//!
//! The schema evolves independently of this crate, so nothing the server sends
//! is allowed to abort reading, selection or normalization. Whatever cannot be
//! used is dropped and recorded here instead, and the same event is logged.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Group value is not an object or has no usable rendering kind.
    MalformedGroup,
    MalformedDefinition,
    MalformedOption,
    /// More than one rendering kind present; the others were ignored.
    MultipleKinds,
    /// Satellite group with no root to merge into.
    OrphanSatellite,
    /// No attribute id could be found for a selection.
    UnresolvedAttribute,
    /// Selected id no longer exists in the schema.
    StaleSelection,
    RejectedSelection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub attribute: String,
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn new(kind: DiagnosticKind, attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic { kind, attribute: attribute.into(), message: message.into() }
    }

    /// Record a diagnostic and log it at `warn`.
    pub(crate) fn warn(kind: DiagnosticKind, attribute: &str, message: impl Into<String>) -> Self {
        let d = Diagnostic::new(kind, attribute, message);
        tracing::warn!(kind = ?d.kind, attribute = %d.attribute, "{}", d.message);
        d
    }

    /// Record a diagnostic and log it at `debug`.
    pub(crate) fn debug(kind: DiagnosticKind, attribute: &str, message: impl Into<String>) -> Self {
        let d = Diagnostic::new(kind, attribute, message);
        tracing::debug!(kind = ?d.kind, attribute = %d.attribute, "{}", d.message);
        d
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] \"{}\": {}", self.kind, self.attribute, self.message)
    }
}
