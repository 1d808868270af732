//! Schema catalog.
//!
//! The catalog is the *static* side of a service-details session: it binds the
//! parsed groups to the cascade rule registry once, so that selection,
//! validation and normalization never have to consult rules or raw shapes.
//!
//! Building a catalog:
//!
//! 1. Pick a rule for every named group (highest priority match).
//! 2. Hide satellite groups claimed by a matched root, and the reserved empty
//!    key in every case.
//! 3. Build each visible attribute's choice list with its rule.
//! 4. Index dependent labels (nested option groups), pricing-only names and
//!    segment availability.
//!
//! ## Invariants
//!
//! - `attributes` keeps schema order and never contains a satellite.
//! - A dependent label that is also a top-level attribute is treated as the
//!   attribute.

use serde_json::Value;
use std::collections::HashSet;

use super::cascade::DependentsFn;
use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::reader::{ParsedSchema, parse};
use crate::rules::{CascadeRule, default_rules, rule_for};
use crate::{AttributeGroup, AttributeOption, GroupKind, SATELLITE_KEY};

/// A visible attribute with its resolved choice list.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub kind: GroupKind,
    /// Wire id: first definition of the authoritative kind.
    pub attribute_id: Option<String>,
    pub required: bool,
    /// Choices in weight order.
    pub choices: Vec<AttributeOption>,
    /// Name of the rule that built this attribute.
    pub rule: &'static str,
    pub canonical: &'static [&'static str],
    pub(crate) dependents: DependentsFn,
}

impl Attribute {
    pub fn choice(&self, id: &str) -> Option<&AttributeOption> {
        self.choices.iter().find(|c| c.id == id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    groups: Vec<AttributeGroup>,
    attributes: Vec<Attribute>,
    /// Every option reachable under each nested label, across all choices.
    dependents: Vec<(String, Vec<AttributeOption>)>,
    pricing_only: HashSet<String>,
    has_segments: bool,
    diagnostics: Vec<Diagnostic>,
}

impl Catalog {
    /// Bind a parsed schema to `rules`.
    ///
    /// When no rule in `rules` matches a group, the built-in catch-all is used.
    pub fn new(schema: ParsedSchema, rules: &[CascadeRule]) -> Self {
        let ParsedSchema { groups, mut diagnostics } = schema;

        let fallback = default_rules().last();
        let mut matched: Vec<(usize, &CascadeRule)> = Vec::new();
        let mut claimed: HashSet<&str> = HashSet::new();

        for (idx, group) in groups.iter().enumerate() {
            if group.name() == SATELLITE_KEY {
                continue;
            }
            let Some(rule) = rule_for(rules, group.name()).or(fallback) else {
                continue;
            };
            claimed.extend(rule.satellites.iter().copied().filter(|s| *s != group.name()));
            matched.push((idx, rule));
        }

        if groups.iter().any(|g| g.name() == SATELLITE_KEY) && !claimed.contains(SATELLITE_KEY) {
            diagnostics.push(Diagnostic::warn(
                DiagnosticKind::OrphanSatellite,
                SATELLITE_KEY,
                "empty-key group has no root to merge into",
            ));
        }

        let mut attributes = Vec::with_capacity(matched.len());
        let mut pricing_only = HashSet::new();

        for (idx, rule) in matched {
            let group = &groups[idx];
            if claimed.contains(group.name()) {
                tracing::debug!(attribute = %group.name(), "group merged as satellite");
                continue;
            }

            let satellites: Vec<&AttributeGroup> =
                rule.satellites.iter().filter_map(|s| groups.iter().find(|g| g.name() == *s)).collect();
            let choices = (rule.choices)(group, &satellites);

            tracing::debug!(attribute = %group.name(), rule = rule.name, choices = choices.len(), "attribute bound");

            pricing_only.extend(rule.pricing_only.iter().map(|s| s.to_string()));
            attributes.push(Attribute {
                name: group.name().to_string(),
                kind: group.kind(),
                attribute_id: group.attribute_id().map(str::to_string),
                required: group.is_required() || satellites.iter().any(|s| s.is_required()),
                choices,
                rule: rule.name,
                canonical: rule.canonical,
                dependents: rule.dependents,
            });
        }

        let mut dependents: Vec<(String, Vec<AttributeOption>)> = Vec::new();
        for attribute in &attributes {
            index_levels(&attribute.choices, &mut dependents);
        }
        let has_segments = attributes.iter().flat_map(|a| &a.choices).any(AttributeOption::has_segments);

        Catalog { groups, attributes, dependents, pricing_only, has_segments, diagnostics }
    }

    /// Parse `raw` and bind it to the built-in rules.
    pub fn from_schema(raw: &Value) -> Self {
        Self::from_schema_with_rules(raw, default_rules())
    }

    /// Parse `raw` and bind it to a caller-supplied registry.
    pub fn from_schema_with_rules(raw: &Value, rules: &[CascadeRule]) -> Self {
        Self::new(parse(raw), rules)
    }

    /// Visible attributes in schema order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Every parsed group, satellites included.
    pub fn groups(&self) -> &[AttributeGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&AttributeGroup> {
        self.groups.iter().find(|g| g.name() == name)
    }

    /// True when at least one attribute survived parsing.
    pub fn is_supported(&self) -> bool {
        !self.attributes.is_empty()
    }

    /// True for nested option-group labels that are not attributes themselves.
    pub fn is_dependent(&self, name: &str) -> bool {
        self.attribute(name).is_none() && self.dependents.iter().any(|(label, _)| label == name)
    }

    /// Every option that can appear under a dependent label.
    pub fn dependent_options(&self, label: &str) -> &[AttributeOption] {
        self.dependents.iter().find(|(l, _)| l == label).map(|(_, opts)| opts.as_slice()).unwrap_or_default()
    }

    /// Pricing-only sub-selections are only excluded when something in the
    /// schema carries segments.
    pub fn is_pricing_only(&self, name: &str) -> bool {
        self.has_segments && self.pricing_only.contains(name)
    }

    pub fn has_segments(&self) -> bool {
        self.has_segments
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

fn index_levels(options: &[AttributeOption], index: &mut Vec<(String, Vec<AttributeOption>)>) {
    for option in options {
        for level in &option.levels {
            match index.iter_mut().find(|(label, _)| *label == level.label) {
                Some((_, known)) => {
                    for o in &level.options {
                        if !known.iter().any(|k| k.id == o.id) {
                            known.push(o.clone());
                        }
                    }
                }
                None => index.push((level.label.clone(), level.options.clone())),
            }
            index_levels(&level.options, index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ac_schema() -> Value {
        json!({
            "Type of AC": { "list": [
                { "id": "ac2", "name": "window", "weight": 2,
                  "options": { "No. of Service": [{ "id": "svc2", "value": "2" }] } },
            ]},
            "": { "list": [
                { "id": "ac1", "name": "split", "weight": 1, "required": true,
                  "options": { "No. of Service": [{ "id": "svc1", "value": "1" }, { "id": "svc2", "value": "2" }] },
                  "serviceSegments": [{ "id": "seg1", "segment_name": "Jet" }] },
            ]},
            "Brand": { "dropdown": [
                { "id": "brand", "options": { "All": [{ "id": "lg", "value": "LG" }] } },
            ]},
        })
    }

    #[test]
    fn satellite_is_merged_and_hidden() {
        let catalog = Catalog::from_schema(&ac_schema());
        let names: Vec<&str> = catalog.attributes().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Type of AC", "Brand"]);

        let ac = catalog.attribute("Type of AC").unwrap();
        assert_eq!(ac.rule, "type of ac (merge root)");
        assert_eq!(ac.choices.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), vec!["ac1", "ac2"]);
        assert!(ac.required, "required flag of the satellite counts for its root");
        assert_eq!(ac.attribute_id.as_deref(), Some("ac2"));
        assert!(catalog.group(SATELLITE_KEY).is_some());
        assert!(catalog.attribute(SATELLITE_KEY).is_none());
    }

    #[test]
    fn dependents_are_indexed_once_per_id() {
        let catalog = Catalog::from_schema(&ac_schema());
        assert!(catalog.is_dependent("No. of Service"));
        assert!(!catalog.is_dependent("Brand"));
        let ids: Vec<&str> = catalog.dependent_options("No. of Service").iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["svc1", "svc2"]);
        assert!(catalog.has_segments());
        assert!(catalog.is_pricing_only("No. of Service"));
    }

    #[test]
    fn orphan_satellite_is_hidden_and_reported() {
        let raw = json!({
            "": { "list": [{ "id": "x", "options": { "a": [{ "id": "1" }] } }] },
            "Brand": { "list": [{ "id": "b", "options": { "a": [{ "id": "1" }] } }] },
        });
        let catalog = Catalog::from_schema(&raw);
        assert_eq!(catalog.attributes().len(), 1);
        assert!(catalog.diagnostics().iter().any(|d| d.kind == DiagnosticKind::OrphanSatellite));
        assert!(!catalog.is_pricing_only("No. of Service"));
    }

    #[test]
    fn attributes_follow_server_order() {
        let raw: Value = serde_json::from_str(
            r#"{
                "Zeta": { "list": [{ "id": "z", "options": { "All": [{ "id": "1", "value": "one" }] } }] },
                "Alpha": { "list": [{ "id": "a", "options": { "All": [{ "id": "2", "value": "two" }] } }] }
            }"#,
        )
        .unwrap();
        let catalog = Catalog::from_schema(&raw);
        let names: Vec<&str> = catalog.attributes().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn custom_registry_falls_back_to_catch_all() {
        let rules = vec![cascade_rule! {
            name: "brand as definitions",
            pattern: exact!("Brand"),
            choices: crate::rules::definitions_as_choices,
        }];
        let raw = json!({
            "Brand": { "list": [{ "id": "b", "name": "Bosch", "options": { "a": [{ "id": "1" }] } }] },
            "Colour": { "list": [{ "id": "c", "options": { "a": [{ "id": "red", "value": "Red" }] } }] },
        });
        let catalog = Catalog::from_schema_with_rules(&raw, &rules);
        assert_eq!(catalog.attribute("Brand").unwrap().choices[0].name, "Bosch");
        assert_eq!(catalog.attribute("Colour").unwrap().choices[0].id, "red");
    }

    #[test]
    fn all_malformed_schema_is_unsupported() {
        let catalog = Catalog::from_schema(&json!({ "A": 1, "B": { "list": [] } }));
        assert!(!catalog.is_supported());
        assert_eq!(catalog.diagnostics().len(), 2);
    }
}
