//! Required-field validation.

use serde::Serialize;

use super::cascade::revealed_level;
use super::catalog::Catalog;
use crate::{SATELLITE_KEY, SelectionSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    /// Required names without a live selection, in required-list order.
    pub missing: Vec<String>,
    pub errors: Vec<String>,
}

/// Names of the required visible attributes, in catalog order.
///
/// An attribute is required when any of its definitions, or of a satellite
/// merged into it, is flagged required.
pub fn required_attributes(catalog: &Catalog) -> Vec<String> {
    catalog.attributes().iter().filter(|a| a.required).map(|a| a.name.clone()).collect()
}

/// Check that every name in `required` has a live selection.
///
/// A selection is live when its id exists among the attribute's choices, or,
/// for a dependent label, in the level its live parent currently reveals. Ids
/// the schema no longer knows count as unselected. Names unknown to the
/// catalog only need a non-empty id.
pub fn validate(catalog: &Catalog, selections: &SelectionSet, required: &[String]) -> ValidationReport {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| name.as_str() != SATELLITE_KEY)
        .filter(|name| !is_live(catalog, selections, name))
        .cloned()
        .collect();

    ValidationReport {
        is_valid: missing.is_empty(),
        errors: missing.iter().map(|name| format!("{name} is required")).collect(),
        missing,
    }
}

/// True when the schema is usable at all and `report` has nothing missing.
pub fn is_ready(catalog: &Catalog, report: &ValidationReport) -> bool {
    catalog.is_supported() && report.is_valid
}

fn is_live(catalog: &Catalog, selections: &SelectionSet, name: &str) -> bool {
    let Some(id) = selections.selected_id(name) else {
        return false;
    };
    if let Some(attribute) = catalog.attribute(name) {
        attribute.choice(id).is_some()
    } else if catalog.is_dependent(name) {
        revealed_level(catalog, selections, name).is_some_and(|level| level.option(id).is_some())
    } else {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Selection;
    use serde_json::json;

    fn catalog() -> Catalog {
        Catalog::from_schema(&json!({
            "A": { "list": [{ "id": "a", "required": true, "options": { "all": [
                { "id": "x", "value": "X", "options": { "Depth": [{ "id": "d1", "value": "1" }] } },
                { "id": "w", "value": "W", "weight": 1, "options": { "Depth": [{ "id": "d2", "value": "2" }] } },
            ]}}]},
            "B": { "dropdown": [{ "id": "b", "is_required": 1, "options": { "all": [{ "id": "y", "value": "Y" }] } }] },
            "C": { "search": [{ "id": "c", "options": { "all": [{ "id": "z", "value": "Z" }] } }] },
        }))
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn required_follows_definition_flags() {
        assert_eq!(required_attributes(&catalog()), names(&["A", "B"]));
    }

    #[test]
    fn missing_required_is_reported_in_order() {
        let catalog = catalog();
        let mut selections = SelectionSet::new();
        selections.insert("A", Selection::new("x", "X"));

        let report = validate(&catalog, &selections, &names(&["A", "B"]));
        assert!(!report.is_valid);
        assert_eq!(report.missing, names(&["B"]));
        assert_eq!(report.errors, names(&["B is required"]));
    }

    #[test]
    fn stale_and_cleared_ids_count_as_unselected() {
        let catalog = catalog();
        let mut selections = SelectionSet::new();
        selections.insert("A", Selection::new("gone", "Gone"));
        selections.insert("B", Selection::new("", ""));
        selections.insert("Depth", Selection::new("d9", "9"));

        let report = validate(&catalog, &selections, &names(&["A", "B", "Depth"]));
        assert_eq!(report.missing, names(&["A", "B", "Depth"]));

        selections.insert("A", Selection::new("x", "X"));
        selections.insert("Depth", Selection::new("d1", "1"));
        let report = validate(&catalog, &selections, &names(&["Depth"]));
        assert!(report.is_valid);
    }

    #[test]
    fn dependent_must_be_under_the_live_parent() {
        let catalog = catalog();
        let mut selections = SelectionSet::new();
        selections.insert("A", Selection::new("x", "X"));
        selections.insert("Depth", Selection::new("d2", "2"));
        let report = validate(&catalog, &selections, &names(&["Depth"]));
        assert_eq!(report.missing, names(&["Depth"]), "d2 only exists under w");

        selections.insert("A", Selection::new("w", "W"));
        assert!(validate(&catalog, &selections, &names(&["Depth"])).is_valid);

        selections.insert("A", Selection::new("", ""));
        assert!(!validate(&catalog, &selections, &names(&["Depth"])).is_valid, "no live parent");
    }

    #[test]
    fn unknown_names_need_any_id_and_satellite_is_ignored() {
        let catalog = catalog();
        let mut selections = SelectionSet::new();
        selections.insert("Extra", Selection::new("anything", ""));
        let report = validate(&catalog, &selections, &names(&["Extra", ""]));
        assert!(report.is_valid);
        assert!(is_ready(&catalog, &report));
    }

    #[test]
    fn unsupported_schema_is_never_ready() {
        let catalog = Catalog::from_schema(&json!({}));
        let report = validate(&catalog, &SelectionSet::new(), &[]);
        assert!(report.is_valid);
        assert!(!is_ready(&catalog, &report));
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = validate(&catalog(), &SelectionSet::new(), &names(&["A"]));
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value, json!({ "isValid": false, "missing": ["A"], "errors": ["A is required"] }));
    }
}
