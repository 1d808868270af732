//! Cascade resolution.
//!
//! A choice under an attribute can reveal further choices: nested option
//! groups (second level, e.g. "No. of Service") and segments (third level).
//! Changing a choice must drop whatever the old choice revealed and the new
//! one does not.
//!
//! ```text
//! Type of AC ── split ──┬─ No. of Service ── 1 ── (segments of "1")
//!                       └─ serviceSegments ── Jet, Deep
//!            └─ window ─── No. of Service ── 2
//! ```
//!
//! The selection tree is always walked from the catalog: a top-level
//! selection is live when its id is one of the attribute's choices, and a
//! nested selection is live when its id is in the level its live parent
//! reveals. Missing levels are simply absent, never an error.
//!
//! Which dependents a new choice resets is decided by the attribute's rule
//! (`CascadeRule::dependents`, normally [`standard_dependents`]).

use super::catalog::{Attribute, Catalog};
use super::store::{Pick, SelectionStore};
use crate::{AttributeOption, OptionLevel, SEGMENT_KEY, SelectedData, Selection, SelectionSet, Segment};

/// Dependents resolver signature shared by every cascade rule.
pub type DependentsFn = fn(Option<&AttributeOption>, &AttributeOption, &SelectionSet, Option<&Selection>) -> Dependents;

/// What a new choice reveals and which current selections it invalidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependents {
    /// Labels revealed by the new choice, plus `serviceSegments` when it can
    /// lead to segments.
    pub reveal: Vec<String>,
    /// Selections to clear, `serviceSegments` included.
    pub reset: Vec<String>,
    /// Every segment id reachable under the new choice.
    pub segments: Vec<String>,
}

/// Result of a successful [`choose`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub attribute: String,
    /// Empty when the attribute was cleared.
    pub option_id: String,
    pub reveal: Vec<String>,
    pub reset: Vec<String>,
}

/// A nested level made visible by a live selection.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealedLevel {
    /// Attribute or label whose choice revealed this level.
    pub parent: String,
    pub label: String,
    pub options: Vec<AttributeOption>,
    pub selected: Option<String>,
}

/// Default dependents policy.
///
/// Reveals every level of `next`. Resets, recursively, every selection made
/// under a level of `previous` that `next` cannot reach, and the segment when
/// `next` offers segments of its own that do not include it.
pub fn standard_dependents(
    previous: Option<&AttributeOption>,
    next: &AttributeOption,
    selections: &SelectionSet,
    segment: Option<&Selection>,
) -> Dependents {
    let mut reveal: Vec<String> = next.levels.iter().map(|l| l.label.clone()).collect();
    let mut segments = Vec::new();
    collect_segment_ids(next, &mut segments);
    if !segments.is_empty() {
        reveal.push(SEGMENT_KEY.to_string());
    }

    let mut reset = Vec::new();
    if let Some(previous) = previous {
        collect_resets(previous, Some(next), selections, &mut reset);
    }
    if !segments.is_empty() && segment.is_some_and(|s| !s.is_cleared() && !segments.contains(&s.id)) {
        reset.push(SEGMENT_KEY.to_string());
    }

    Dependents { reveal, reset, segments }
}

fn collect_segment_ids(option: &AttributeOption, out: &mut Vec<String>) {
    for segment in &option.segments {
        if !out.contains(&segment.id) {
            out.push(segment.id.clone());
        }
    }
    for level in &option.levels {
        for child in &level.options {
            collect_segment_ids(child, out);
        }
    }
}

/// Labels selected under `previous` that `next` (if any) no longer reaches.
fn collect_resets(
    previous: &AttributeOption,
    next: Option<&AttributeOption>,
    selections: &SelectionSet,
    out: &mut Vec<String>,
) {
    for level in &previous.levels {
        let Some(selected) = selections.selected_id(&level.label) else {
            continue;
        };
        let kept = next.and_then(|n| n.level(&level.label)).and_then(|l| l.option(selected));
        if kept.is_none() && !out.contains(&level.label) {
            out.push(level.label.clone());
        }
        if let Some(old_child) = level.option(selected) {
            collect_resets(old_child, kept, selections, out);
        }
    }
}

/// Choose `option_id` for `attribute`.
///
/// `attribute` may be a top-level attribute, a revealed dependent label or
/// `serviceSegments`. An empty id clears the attribute and whatever it
/// revealed. Unknown attributes or ids leave the store untouched and return
/// `None`.
pub fn choose(store: &mut SelectionStore, attribute: &str, option_id: &str) -> Option<Transition> {
    if attribute == SEGMENT_KEY {
        return choose_segment(store, option_id);
    }

    let (dependents, level_options, previous) = if let Some(attr) = store.catalog().attribute(attribute) {
        let previous = store.current().get(attribute).and_then(|s| attr.choice(&s.id).or(s.choice())).cloned();
        (attr.dependents, attr.choices.clone(), previous)
    } else if let Some((dependents, parent)) = find_parent(store, attribute) {
        let level = parent.level(attribute).map(|l| l.options.clone()).unwrap_or_default();
        let previous = store.current().selected_id(attribute).and_then(|id| level.iter().find(|o| o.id == id)).cloned();
        (dependents, level, previous)
    } else {
        store.reject(attribute, "attribute is neither in the schema nor revealed by a current selection");
        return None;
    };

    if option_id.is_empty() {
        let mut reset = Vec::new();
        if let Some(previous) = &previous {
            collect_resets(previous, None, store.current(), &mut reset);
        }
        store.clear(attribute);
        for label in &reset {
            store.clear(label);
        }
        settle_segments(store, &mut reset);
        return Some(Transition {
            attribute: attribute.to_string(),
            option_id: String::new(),
            reveal: Vec::new(),
            reset,
        });
    }

    let Some(next) = level_options.into_iter().find(|o| o.id == option_id) else {
        store.reject(attribute, format!("option `{option_id}` is not available"));
        return None;
    };

    let Dependents { reveal, mut reset, .. } =
        dependents(previous.as_ref(), &next, store.current(), store.get(SEGMENT_KEY));

    let name = next.name.clone();
    store.select(attribute, Pick::Id(next.id.clone()), Some(&name), Some(SelectedData::Choice(next)));
    for label in &reset {
        store.clear(label);
    }
    settle_segments(store, &mut reset);

    tracing::debug!(attribute, option_id, ?reveal, ?reset, "choice applied");
    Some(Transition { attribute: attribute.to_string(), option_id: option_id.to_string(), reveal, reset })
}

fn choose_segment(store: &mut SelectionStore, segment_id: &str) -> Option<Transition> {
    if segment_id.is_empty() {
        store.clear(SEGMENT_KEY);
        return Some(Transition {
            attribute: SEGMENT_KEY.to_string(),
            option_id: String::new(),
            reveal: Vec::new(),
            reset: Vec::new(),
        });
    }

    let Some(segment) = effective_segments(store).into_iter().find(|s| s.id == segment_id) else {
        store.reject(SEGMENT_KEY, format!("segment `{segment_id}` is not available for the current choices"));
        return None;
    };
    let name = segment.segment_name.clone();
    store.select(SEGMENT_KEY, Pick::Id(segment.id.clone()), Some(&name), Some(SelectedData::Segment(segment)));

    Some(Transition {
        attribute: SEGMENT_KEY.to_string(),
        option_id: segment_id.to_string(),
        reveal: Vec::new(),
        reset: Vec::new(),
    })
}

/// After a non-segment change: priced segments are out of date, and a
/// selected segment the new tree cannot offer is cleared.
fn settle_segments(store: &mut SelectionStore, reset: &mut Vec<String>) {
    store.drop_priced_segments();
    let Some(selected) = store.selected_segment().map(|s| s.id.clone()) else {
        return;
    };
    if !effective_segments(store).iter().any(|s| s.id == selected) {
        store.clear(SEGMENT_KEY);
        if !reset.iter().any(|r| r == SEGMENT_KEY) {
            reset.push(SEGMENT_KEY.to_string());
        }
    }
}

/// Live top-level choices, in catalog order.
fn live_roots<'c>(
    catalog: &'c Catalog,
    selections: &SelectionSet,
) -> impl Iterator<Item = (&'c Attribute, &'c AttributeOption)> {
    catalog.attributes().iter().filter_map(move |attr| Some((attr, attr.choice(selections.selected_id(&attr.name)?)?)))
}

/// Live child of `option` under `label`.
fn live_child<'o>(option: &'o AttributeOption, label: &str, selections: &SelectionSet) -> Option<&'o AttributeOption> {
    option.level(label)?.option(selections.selected_id(label)?)
}

/// `option` or its live descendant that has a level labelled `label`.
fn parent_of<'o>(option: &'o AttributeOption, label: &str, selections: &SelectionSet) -> Option<&'o AttributeOption> {
    if option.level(label).is_some() {
        return Some(option);
    }
    option.levels.iter().find_map(|l| parent_of(live_child(option, &l.label, selections)?, label, selections))
}

/// The live option that reveals `label`, with the dependents policy of its
/// root attribute.
fn find_parent(store: &SelectionStore, label: &str) -> Option<(DependentsFn, AttributeOption)> {
    let selections = store.current();
    live_roots(store.catalog(), selections)
        .find_map(|(attr, root)| Some((attr.dependents, parent_of(root, label, selections)?.clone())))
}

/// The level labelled `label` as revealed by the live selections, if any.
pub(crate) fn revealed_level<'c>(
    catalog: &'c Catalog,
    selections: &SelectionSet,
    label: &str,
) -> Option<&'c OptionLevel> {
    live_roots(catalog, selections).find_map(|(_, root)| parent_of(root, label, selections)?.level(label))
}

/// Segments offered for the current choices.
///
/// Priced segments win when present. Otherwise the deepest live choice that
/// carries segments provides them, falling back to its ancestors.
pub fn effective_segments(store: &SelectionStore) -> Vec<Segment> {
    if let Some(priced) = store.priced_segments() {
        return priced.to_vec();
    }

    fn deepest<'o>(option: &'o AttributeOption, selections: &SelectionSet) -> Option<&'o [Segment]> {
        option
            .levels
            .iter()
            .find_map(|l| deepest(live_child(option, &l.label, selections)?, selections))
            .or_else(|| (!option.segments.is_empty()).then_some(option.segments.as_slice()))
    }

    let selections = store.current();
    live_roots(store.catalog(), selections)
        .find_map(|(_, root)| deepest(root, selections))
        .map(<[Segment]>::to_vec)
        .unwrap_or_default()
}

/// Nested levels revealed by the current live choices, parents first.
pub fn revealed(store: &SelectionStore) -> Vec<RevealedLevel> {
    fn walk(parent: &str, option: &AttributeOption, selections: &SelectionSet, out: &mut Vec<RevealedLevel>) {
        for level in &option.levels {
            let child = live_child(option, &level.label, selections);
            out.push(RevealedLevel {
                parent: parent.to_string(),
                label: level.label.clone(),
                options: level.options.clone(),
                selected: child.map(|c| c.id.clone()),
            });
            if let Some(child) = child {
                walk(&level.label, child, selections, out);
            }
        }
    }

    let mut out = Vec::new();
    for (attr, root) in live_roots(store.catalog(), store.current()) {
        walk(&attr.name, root, store.current(), &mut out);
    }
    out
}

/// Opt-in default selection.
///
/// For every attribute without a live selection, pick the first choice whose
/// name contains one of `tokens` (then the attribute rule's canonical tokens),
/// else the first by weight; then do the same for every level it reveals and
/// finally for the segments. Existing selections are never replaced.
pub fn auto_select(store: &mut SelectionStore, tokens: &[String]) -> Vec<Transition> {
    let mut transitions = Vec::new();

    let plans: Vec<(String, Vec<String>)> = store
        .catalog()
        .attributes()
        .iter()
        .map(|a| (a.name.clone(), tokens.iter().cloned().chain(a.canonical.iter().map(|t| t.to_string())).collect()))
        .collect();

    for (name, preferred) in &plans {
        let root = match live_root(store, name) {
            Some(root) => root,
            None => {
                let Some(attr) = store.catalog().attribute(name) else {
                    continue;
                };
                let Some(pick) = prefer(&attr.choices, preferred, |o| o.name.as_str()).cloned() else {
                    continue;
                };
                match choose(store, name, &pick.id) {
                    Some(transition) => transitions.push(transition),
                    None => continue,
                }
                pick
            }
        };
        auto_select_levels(store, &root, preferred, &mut transitions);
    }

    if store.selected_segment().is_none() {
        let segments = effective_segments(store);
        if let Some(pick) = prefer(&segments, tokens, |s| s.segment_name.as_str()) {
            transitions.extend(choose_segment(store, &pick.id));
        }
    }

    transitions
}

fn live_root(store: &SelectionStore, name: &str) -> Option<AttributeOption> {
    live_roots(store.catalog(), store.current()).find(|(attr, _)| attr.name == name).map(|(_, root)| root.clone())
}

fn auto_select_levels(
    store: &mut SelectionStore,
    option: &AttributeOption,
    preferred: &[String],
    out: &mut Vec<Transition>,
) {
    for level in &option.levels {
        let child = match live_child(option, &level.label, store.current()).cloned() {
            Some(child) => child,
            None => {
                let Some(pick) = prefer(&level.options, preferred, |o| o.name.as_str()).cloned() else {
                    continue;
                };
                match choose(store, &level.label, &pick.id) {
                    Some(transition) => out.push(transition),
                    None => continue,
                }
                pick
            }
        };
        auto_select_levels(store, &child, preferred, out);
    }
}

/// First item whose name contains a token (tokens in order, case-insensitive),
/// else the first item.
fn prefer<'i, T>(items: &'i [T], tokens: &[String], name: impl Fn(&T) -> &str) -> Option<&'i T> {
    tokens
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .find_map(|t| items.iter().find(|i| name(i).to_lowercase().contains(&t)))
        .or_else(|| items.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Catalog;
    use serde_json::{Value, json};

    fn schema() -> Value {
        json!({
            "Service": { "list": [{
                "id": "service",
                "options": { "Kind": [
                    { "id": "p1", "value": "Repair", "weight": 1,
                      "options": {
                        "Visits": [
                            { "id": "v1", "value": "1", "weight": 1,
                              "serviceSegments": [{ "id": "s-deep", "segment_name": "Deep" }] },
                            { "id": "v2", "value": "2", "weight": 2 },
                        ],
                        "Parts": [{ "id": "pt1", "value": "OEM" }],
                      },
                      "serviceSegments": [
                          { "id": "s-basic", "segment_name": "Basic" },
                          { "id": "s-jet", "segment_name": "Jet" },
                      ] },
                    { "id": "p2", "value": "Install", "weight": 2,
                      "options": { "Visits": [{ "id": "v2", "value": "2" }] },
                      "serviceSegments": [{ "id": "s-jet", "segment_name": "Jet" }] },
                    { "id": "p3", "value": "Inspect", "weight": 3 },
                ]}
            }]}
        })
    }

    fn store() -> SelectionStore {
        SelectionStore::new(Catalog::from_schema(&schema()))
    }

    #[test]
    fn switching_parent_clears_unreachable_dependents() {
        let mut store = store();
        choose(&mut store, "Service", "p1").unwrap();
        choose(&mut store, "Visits", "v1").unwrap();
        choose(&mut store, "Parts", "pt1").unwrap();

        let t = choose(&mut store, "Service", "p3").unwrap();
        assert_eq!(t.reset, vec!["Visits", "Parts"]);
        assert!(store.get("Visits").unwrap().is_cleared());
        assert!(store.get("Parts").unwrap().is_cleared());
        assert_eq!(store.get("Service").unwrap().id, "p3");
    }

    #[test]
    fn reachable_dependents_survive_a_switch() {
        let mut store = store();
        choose(&mut store, "Service", "p1").unwrap();
        choose(&mut store, "Visits", "v2").unwrap();
        choose(&mut store, "Parts", "pt1").unwrap();

        let t = choose(&mut store, "Service", "p2").unwrap();
        assert_eq!(t.reset, vec!["Parts"]);
        assert_eq!(store.current().selected_id("Visits"), Some("v2"));
        assert_eq!(t.reveal, vec!["Visits", SEGMENT_KEY]);
    }

    #[test]
    fn segment_follows_the_deepest_live_choice() {
        let mut store = store();
        choose(&mut store, "Service", "p1").unwrap();
        let ids = |s: &SelectionStore| effective_segments(s).into_iter().map(|s| s.id).collect::<Vec<_>>();
        assert_eq!(ids(&store), vec!["s-basic", "s-jet"]);

        choose(&mut store, "Visits", "v1").unwrap();
        assert_eq!(ids(&store), vec!["s-deep"]);

        choose(&mut store, SEGMENT_KEY, "s-deep").unwrap();
        let t = choose(&mut store, "Visits", "v2").unwrap();
        assert_eq!(t.reset, vec![SEGMENT_KEY]);
        assert!(store.selected_segment().is_none());
    }

    #[test]
    fn segment_kept_when_still_offered() {
        let mut store = store();
        choose(&mut store, "Service", "p1").unwrap();
        choose(&mut store, SEGMENT_KEY, "s-jet").unwrap();
        choose(&mut store, "Service", "p2").unwrap();
        assert_eq!(store.selected_segment().unwrap().id, "s-jet");

        choose(&mut store, "Service", "p3").unwrap();
        assert!(store.selected_segment().is_none());
    }

    #[test]
    fn unknown_ids_and_hidden_levels_are_rejected() {
        let mut store = store();
        assert!(choose(&mut store, "Service", "nope").is_none());
        assert!(choose(&mut store, "Visits", "v1").is_none(), "level not revealed yet");
        assert!(choose(&mut store, SEGMENT_KEY, "s-jet").is_none());
        choose(&mut store, "Service", "p2").unwrap();
        assert!(choose(&mut store, "Visits", "v1").is_none(), "v1 only exists under p1");
        assert!(store.current().get("Visits").is_none());
    }

    #[test]
    fn empty_id_clears_attribute_and_descendants() {
        let mut store = store();
        choose(&mut store, "Service", "p1").unwrap();
        choose(&mut store, "Visits", "v1").unwrap();
        choose(&mut store, SEGMENT_KEY, "s-deep").unwrap();

        let t = choose(&mut store, "Service", "").unwrap();
        assert_eq!(t.reset, vec!["Visits", SEGMENT_KEY]);
        assert!(store.get("Service").unwrap().is_cleared());
        assert!(revealed(&store).is_empty());
    }

    #[test]
    fn revealed_lists_nested_levels() {
        let mut store = store();
        choose(&mut store, "Service", "p1").unwrap();
        choose(&mut store, "Visits", "v1").unwrap();
        let levels = revealed(&store);
        let summary: Vec<(&str, &str, Option<&str>)> =
            levels.iter().map(|l| (l.parent.as_str(), l.label.as_str(), l.selected.as_deref())).collect();
        assert_eq!(summary, vec![("Service", "Visits", Some("v1")), ("Service", "Parts", None)]);
    }

    #[test]
    fn auto_select_prefers_tokens_then_weight() {
        let mut store = store();
        auto_select(&mut store, &["install".to_string()]);
        assert_eq!(store.current().selected_id("Service"), Some("p2"));
        assert_eq!(store.current().selected_id("Visits"), Some("v2"));
        assert_eq!(store.selected_segment().unwrap().id, "s-jet");

        let mut store = self::store();
        auto_select(&mut store, &[]);
        assert_eq!(store.current().selected_id("Service"), Some("p1"));
        assert_eq!(store.current().selected_id("Parts"), Some("pt1"));
        assert_eq!(store.current().selected_id("Visits"), Some("v1"));
        assert_eq!(store.selected_segment().unwrap().id, "s-deep");
    }

    #[test]
    fn auto_select_keeps_user_choices() {
        let mut store = store();
        choose(&mut store, "Service", "p3").unwrap();
        let transitions = auto_select(&mut store, &[]);
        assert!(transitions.is_empty());
        assert_eq!(store.current().selected_id("Service"), Some("p3"));
    }

    #[test]
    fn standard_dependents_reports_reveal_and_reset() {
        let catalog = Catalog::from_schema(&schema());
        let attr = catalog.attribute("Service").unwrap();
        let (p1, p3) = (attr.choice("p1").unwrap(), attr.choice("p3").unwrap());

        let mut selections = SelectionSet::new();
        selections.insert("Visits", Selection::new("v1", "1"));
        let segment = Selection::new("s-deep", "Deep");

        let deps = standard_dependents(Some(p1), p3, &selections, Some(&segment));
        assert!(deps.reveal.is_empty());
        assert_eq!(deps.reset, vec!["Visits"]);

        let p2 = attr.choice("p2").unwrap();
        let deps = standard_dependents(Some(p1), p2, &selections, Some(&segment));
        assert_eq!(deps.reset, vec!["Visits", SEGMENT_KEY]);

        let deps = standard_dependents(None, p1, &selections, Some(&segment));
        assert_eq!(deps.reveal, vec!["Visits", "Parts", SEGMENT_KEY]);
        assert!(deps.reset.is_empty());
        assert_eq!(deps.segments, vec!["s-basic", "s-jet", "s-deep"]);
    }
}
