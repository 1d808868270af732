//! Selection state store.
//!
//! One store exists per active service-details session. It owns the catalog
//! the selections were made against, so replacing the schema means building a
//! new store: old selections can never leak into a new schema.
//!
//! The store accepts any well-formed selection; dependent resets live in the
//! cascade resolver and required fields in the validator. What the store does
//! guarantee:
//!
//! - every selection gets a fresh, non-decreasing timestamp,
//! - `serviceSegments` only ever touches the selected-segment slot,
//! - the filter list is re-derived after every successful `select`.

use chrono::Utc;

use super::catalog::Catalog;
use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::normalize::normalize_with_diagnostics;
use crate::{FilterEntry, SATELLITE_KEY, SEGMENT_KEY, SelectedData, Selection, SelectionSet, Segment};

/// Rejected picks kept for inspection; older ones are dropped first.
const MAX_REJECTED: usize = 32;

/// What `select` accepts: a bare option id or a full selection record.
#[derive(Debug, Clone, PartialEq)]
pub enum Pick {
    Id(String),
    Selection(Selection),
}

impl From<&str> for Pick {
    fn from(id: &str) -> Self {
        Pick::Id(id.to_string())
    }
}

impl From<String> for Pick {
    fn from(id: String) -> Self {
        Pick::Id(id)
    }
}

impl From<Selection> for Pick {
    fn from(selection: Selection) -> Self {
        Pick::Selection(selection)
    }
}

#[derive(Debug, Clone)]
pub struct SelectionStore {
    catalog: Catalog,
    selections: SelectionSet,
    segment: Option<Selection>,
    /// Segments read back from the pricing endpoint, replacing schema segments.
    priced_segments: Option<Vec<Segment>>,
    filters: Vec<FilterEntry>,
    filter_diagnostics: Vec<Diagnostic>,
    rejected: Vec<Diagnostic>,
    last_timestamp: i64,
}

impl SelectionStore {
    /// Create an empty store for `catalog`.
    pub fn new(catalog: Catalog) -> Self {
        SelectionStore {
            catalog,
            selections: SelectionSet::new(),
            segment: None,
            priced_segments: None,
            filters: Vec::new(),
            filter_diagnostics: Vec::new(),
            rejected: Vec::new(),
            last_timestamp: 0,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Record a selection for `attribute`.
    ///
    /// `display_value` overrides the selection's value; `option_data` is kept
    /// as the selection's data. When no value is given the display text of the
    /// data is used. Returns `false` for the reserved satellite key.
    pub fn select(
        &mut self,
        attribute: &str,
        pick: impl Into<Pick>,
        display_value: Option<&str>,
        option_data: Option<SelectedData>,
    ) -> bool {
        if attribute == SATELLITE_KEY {
            self.reject(attribute, "the empty key is a satellite and cannot be selected");
            return false;
        }

        let mut selection = match pick.into() {
            Pick::Id(id) => Selection::new(id, display_value.unwrap_or_default()),
            Pick::Selection(mut selection) => {
                if let Some(value) = display_value {
                    selection.value = value.to_string();
                }
                selection
            }
        };
        if let Some(data) = option_data {
            selection.data = Some(data);
        }
        if selection.value.is_empty() {
            if let Some(data) = &selection.data {
                selection.value = data.display().to_string();
            }
        }
        selection.timestamp = self.next_timestamp();

        tracing::debug!(attribute, id = %selection.id, value = %selection.value, "select");

        if attribute == SEGMENT_KEY {
            self.segment = Some(selection);
        } else {
            self.selections.insert(attribute, selection);
        }
        self.refresh();
        true
    }

    /// Select an empty id for `attribute`.
    pub(crate) fn clear(&mut self, attribute: &str) {
        self.select(attribute, "", None, None);
    }

    /// Drop every selection, the segment slot and any priced segments.
    pub fn clear_all(&mut self) {
        self.selections.clear();
        self.segment = None;
        self.priced_segments = None;
        self.refresh();
    }

    /// Selection for `attribute`; `serviceSegments` reads the segment slot.
    pub fn get(&self, attribute: &str) -> Option<&Selection> {
        if attribute == SEGMENT_KEY { self.segment.as_ref() } else { self.selections.get(attribute) }
    }

    /// Read-only snapshot of the general selections.
    pub fn current(&self) -> &SelectionSet {
        &self.selections
    }

    /// The selected segment, unless cleared.
    pub fn selected_segment(&self) -> Option<&Selection> {
        self.segment.as_ref().filter(|s| !s.is_cleared())
    }

    /// Derived filter list for the current selections.
    pub fn filters(&self) -> &[FilterEntry] {
        &self.filters
    }

    pub fn priced_segments(&self) -> Option<&[Segment]> {
        self.priced_segments.as_deref()
    }

    /// Store segments returned by the pricing endpoint.
    ///
    /// A selected segment missing from the new list is cleared.
    pub fn apply_priced_segments(&mut self, segments: Vec<Segment>) {
        let stale = self.selected_segment().is_some_and(|s| !segments.iter().any(|seg| seg.id == s.id));
        tracing::debug!(count = segments.len(), stale, "priced segments applied");
        self.priced_segments = Some(segments);
        if stale {
            self.clear(SEGMENT_KEY);
        }
    }

    pub(crate) fn drop_priced_segments(&mut self) {
        self.priced_segments = None;
    }

    pub(crate) fn reject(&mut self, attribute: &str, message: impl Into<String>) {
        if self.rejected.len() == MAX_REJECTED {
            self.rejected.remove(0);
        }
        self.rejected.push(Diagnostic::debug(DiagnosticKind::RejectedSelection, attribute, message));
    }

    /// Catalog, rejected-selection and filter diagnostics, in that order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.catalog.diagnostics().iter().chain(&self.rejected).chain(&self.filter_diagnostics)
    }

    fn refresh(&mut self) {
        let (filters, diagnostics) = normalize_with_diagnostics(&self.selections, &self.catalog);
        self.filters = filters;
        self.filter_diagnostics = diagnostics;
    }

    fn next_timestamp(&mut self) -> i64 {
        self.last_timestamp = Utc::now().timestamp_millis().max(self.last_timestamp);
        self.last_timestamp
    }
}
