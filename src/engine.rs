//! Selection engine.
//!
//! This module is the entry point for everything between a raw attribute
//! schema and the filter payload sent to the pricing and booking endpoints.
//! It is split into focused submodules under `src/engine/`.
//!
//! ## How the parts work together
//!
//! ```text
//! raw schema ── parse ──▶ ParsedSchema          (reader.rs)
//!                              │
//! rules (all) ─────────────────┼─ Catalog::new   (catalog.rs)
//!                              │   - hide satellites, merge into roots
//!                              │   - build choice lists per rule
//!                              v
//!                       SelectionStore          (store.rs)
//!                              │
//! user pick ── choose ─────────┤                (cascade.rs)
//!                              │   - overwrite, reset unreachable dependents
//!                              │   - derived filters recomputed
//!                              v
//!             validate / is_ready               (validate.rs)
//!             normalize ──▶ Vec<FilterEntry>    (normalize.rs)
//! ```
//!
//! Nothing here performs I/O or fails hard. Input that cannot be used is
//! dropped and reported as a `Diagnostic` (diagnostics.rs), and the rest of
//! the schema keeps working.
//!
//! ## Logging
//!
//! Dropped schema data is logged at `warn`, state transitions at `debug`,
//! through `tracing`.

#[path = "engine/cascade.rs"]
mod cascade;
#[path = "engine/catalog.rs"]
mod catalog;
#[path = "engine/diagnostics.rs"]
mod diagnostics;
#[path = "engine/normalize.rs"]
mod normalize;
#[path = "engine/reader.rs"]
mod reader;
#[path = "engine/store.rs"]
mod store;
#[path = "engine/validate.rs"]
mod validate;

pub use cascade::{
    Dependents, DependentsFn, RevealedLevel, Transition, auto_select, choose, effective_segments, revealed,
    standard_dependents,
};
pub use catalog::{Attribute, Catalog};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use normalize::{normalize, normalize_with_diagnostics, rebuild};
pub use reader::{ParsedSchema, parse};
pub use store::{Pick, SelectionStore};
pub use validate::{ValidationReport, is_ready, required_attributes, validate};

pub(crate) use reader::parse_segment;
