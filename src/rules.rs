//! Cascade rules.
//!
//! A rule tells the catalog how to turn one attribute group into a choice
//! list and how selections under it reveal or reset dependents. Rules are
//! plain data built with `cascade_rule!`; a vertical that needs different
//! behavior registers its own rule instead of branching in shared code.
//!
//! Matching picks the highest `priority` rule whose pattern accepts the
//! attribute name; ties keep registry order. The catch-all `default` rule has
//! priority 0 and must stay last.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::engine::DependentsFn;
use crate::{AttributeGroup, AttributeOption};

pub(crate) mod ac {
    pub(crate) mod rules;

    #[cfg(test)]
    mod tests;
}

/// Builds the choice list of a root group, given any satellite groups merged
/// into it.
pub type ChoiceBuilder = fn(&AttributeGroup, &[&AttributeGroup]) -> Vec<AttributeOption>;

/// How a rule selects the attribute names it applies to.
#[derive(Debug, Clone, Copy)]
pub enum AttributePattern {
    /// Matches every attribute.
    Any,
    /// Exact, case-sensitive attribute name.
    Exact(&'static str),
    /// Regular expression over the attribute name (created via `regex!`).
    Regex(&'static Regex),
    /// Arbitrary predicate over the attribute name.
    Predicate(fn(&str) -> bool),
}

impl AttributePattern {
    pub fn matches(&self, attribute: &str) -> bool {
        match self {
            AttributePattern::Any => true,
            AttributePattern::Exact(name) => *name == attribute,
            AttributePattern::Regex(re) => re.is_match(attribute),
            AttributePattern::Predicate(p) => p(attribute),
        }
    }
}

/// A named cascade rule.
pub struct CascadeRule {
    pub name: &'static str,
    pub pattern: AttributePattern,
    /// Group names merged into the matched root and hidden on their own.
    pub satellites: &'static [&'static str],
    pub choices: ChoiceBuilder,
    /// Decides which dependents a new choice reveals and which it resets.
    pub dependents: DependentsFn,
    /// Preferred choice names for auto-selection, matched case-insensitively.
    pub canonical: &'static [&'static str],
    /// Sub-selections that only feed pricing and never reach the filter list.
    pub pricing_only: &'static [&'static str],
    /// Priority for deterministic tie-breaking (higher = preferred).
    pub priority: u16,
}

impl std::fmt::Debug for CascadeRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CascadeRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("satellites", &self.satellites)
            .field("choices", &"<function>")
            .field("priority", &self.priority)
            .finish()
    }
}

impl CascadeRule {
    pub fn applies_to(&self, attribute: &str) -> bool {
        self.pattern.matches(attribute)
    }

    /// Run this rule's dependents resolver.
    pub fn resolve_dependents(
        &self,
        previous: Option<&AttributeOption>,
        next: &AttributeOption,
        selections: &crate::SelectionSet,
        segment: Option<&crate::Selection>,
    ) -> crate::Dependents {
        (self.dependents)(previous, next, selections, segment)
    }
}

/// Pick the rule for `attribute`: highest priority first, registry order on
/// ties.
pub(crate) fn rule_for<'r>(rules: &'r [CascadeRule], attribute: &str) -> Option<&'r CascadeRule> {
    let mut best: Option<&CascadeRule> = None;
    for rule in rules.iter().filter(|r| r.applies_to(attribute)) {
        if best.is_none_or(|b| rule.priority > b.priority) {
            best = Some(rule);
        }
    }
    best
}

static DEFAULT_RULES: Lazy<Vec<CascadeRule>> = Lazy::new(|| {
    let mut rules = ac::rules::get();
    rules.push(rule_default());
    rules
});

/// The built-in registry: every vertical rule followed by the catch-all.
pub fn default_rules() -> &'static [CascadeRule] {
    &DEFAULT_RULES
}

fn rule_default() -> CascadeRule {
    cascade_rule! {
        name: "default (definition options)",
        pattern: AttributePattern::Any,
        choices: flatten_options,
    }
}

/// Choice list made of every definition's options, definition by definition.
pub fn flatten_options(root: &AttributeGroup, satellites: &[&AttributeGroup]) -> Vec<AttributeOption> {
    std::iter::once(root)
        .chain(satellites.iter().copied())
        .flat_map(|g| g.definitions())
        .flat_map(|d| d.options.iter().cloned())
        .collect()
}

/// Choice list where each definition is itself a choice: its option groups
/// become nested levels and its segments stay attached.
pub fn definitions_as_choices(root: &AttributeGroup, satellites: &[&AttributeGroup]) -> Vec<AttributeOption> {
    let mut choices: Vec<AttributeOption> = std::iter::once(root)
        .chain(satellites.iter().copied())
        .flat_map(|g| g.definitions().iter().map(move |d| (g.name(), d)))
        .map(|(group, d)| AttributeOption {
            id: d.id.clone(),
            name: d.name.clone(),
            weight: d.weight,
            label: group.to_string(),
            levels: d.levels.clone(),
            segments: d.segments.clone(),
        })
        .collect();
    choices.sort_by_key(|c| c.weight);
    choices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rule_is_last_and_catches_everything() {
        let rules = default_rules();
        let last = rules.last().unwrap();
        assert!(matches!(last.pattern, AttributePattern::Any));
        assert_eq!(rule_for(rules, "Brand").unwrap().name, last.name);
    }

    #[test]
    fn higher_priority_rule_wins() {
        let rules = vec![
            cascade_rule! { name: "low", pattern: exact!("Brand"), choices: flatten_options },
            cascade_rule! { name: "high", pattern: re!("(?i)^brand$"), priority: 5, choices: flatten_options },
            cascade_rule! {
                name: "tie",
                pattern: pred!(|n| n.starts_with('B')),
                priority: 5,
                choices: flatten_options,
            },
        ];
        assert_eq!(rule_for(&rules, "Brand").unwrap().name, "high");
        assert_eq!(rule_for(&rules, "brand").unwrap().name, "high");
        assert!(rule_for(&rules, "Colour").is_none());
    }
}
