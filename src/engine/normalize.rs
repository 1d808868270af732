//! Selection -> wire payload.
//!
//! The segment-pricing and booking endpoints take a flat list of
//! `{attribute_id, option_id, attribute_name, option_name}` entries. Only
//! top-level attributes are sent: nested picks and segments travel as
//! separate sub-state.

use super::catalog::Catalog;
use super::diagnostics::{Diagnostic, DiagnosticKind};
use crate::{FilterEntry, NOT_APPLICABLE, SATELLITE_KEY, SEGMENT_KEY, SelectedData, Selection, SelectionSet};

/// Filter entries for `selections`, in insertion order.
pub fn normalize(selections: &SelectionSet, catalog: &Catalog) -> Vec<FilterEntry> {
    normalize_with_diagnostics(selections, catalog).0
}

/// Like [`normalize`], also returning what was dropped and why.
pub fn normalize_with_diagnostics(selections: &SelectionSet, catalog: &Catalog) -> (Vec<FilterEntry>, Vec<Diagnostic>) {
    let mut entries = Vec::with_capacity(selections.len());
    let mut diagnostics = Vec::new();

    for (name, selection) in selections.iter() {
        if name == SEGMENT_KEY || name == SATELLITE_KEY || selection.is_cleared() {
            continue;
        }
        if catalog.is_dependent(name) || catalog.is_pricing_only(name) {
            continue;
        }

        let Some((attribute, attribute_id)) =
            catalog.attribute(name).and_then(|a| Some((a, a.attribute_id.as_deref()?)))
        else {
            diagnostics.push(Diagnostic::debug(
                DiagnosticKind::UnresolvedAttribute,
                name,
                "no attribute id in the current schema",
            ));
            continue;
        };

        let choice = attribute.choice(&selection.id);
        let option_id = if selection.id == NOT_APPLICABLE {
            String::new()
        } else if choice.is_some() {
            selection.id.clone()
        } else {
            diagnostics.push(Diagnostic::debug(
                DiagnosticKind::StaleSelection,
                name,
                format!("option `{}` is not in the current schema", selection.id),
            ));
            continue;
        };

        let option_name = if !selection.value.is_empty() {
            selection.value.clone()
        } else if let Some(choice) = choice {
            choice.name.clone()
        } else {
            selection.data.as_ref().map(|d| d.display().to_string()).unwrap_or_default()
        };

        entries.push(FilterEntry {
            attribute_id: attribute_id.to_string(),
            option_id,
            attribute_name: name.to_string(),
            option_name,
        });
    }

    (entries, diagnostics)
}

/// Selections that normalize back to `filters`.
pub fn rebuild(filters: &[FilterEntry], catalog: &Catalog) -> SelectionSet {
    let mut selections = SelectionSet::new();
    for entry in filters {
        let id = if entry.option_id.is_empty() { NOT_APPLICABLE } else { entry.option_id.as_str() };
        let mut selection = Selection::new(id, entry.option_name.as_str());
        if let Some(choice) = catalog.attribute(&entry.attribute_name).and_then(|a| a.choice(id)) {
            selection = selection.with_data(SelectedData::Choice(choice.clone()));
        }
        selections.insert(entry.attribute_name.as_str(), selection);
    }
    selections
}
