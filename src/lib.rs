extern crate self as attrsel;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[macro_use]
mod macros;
mod api;
mod engine;
mod rules;

pub use api::{AttributeView, BookingRequest, LoadError, Options, SegmentQuery, ServiceDetails, Session, SubSelection};
pub use engine::{
    Attribute, Catalog, Dependents, DependentsFn, Diagnostic, DiagnosticKind, ParsedSchema, Pick, RevealedLevel,
    SelectionStore, Transition, ValidationReport, auto_select, choose, effective_segments, is_ready, normalize,
    normalize_with_diagnostics, parse, rebuild, required_attributes, revealed, standard_dependents, validate,
};
pub use rules::{AttributePattern, CascadeRule, ChoiceBuilder, default_rules, definitions_as_choices, flatten_options};

/// Reserved key under which segment choices are selected.
pub const SEGMENT_KEY: &str = "serviceSegments";

/// Reserved empty key for satellite groups merged into a root attribute.
pub const SATELLITE_KEY: &str = "";

/// Option id the backend reads as "explicitly nothing selected".
pub const NOT_APPLICABLE: &str = "NA";

// --- Schema types -----------------------------------------------------------

/// Rendering kind of an attribute group.
///
/// Declaration order is the resolution precedence: `list` wins over
/// `dropdown`, which wins over `search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    List,
    Dropdown,
    Search,
}

impl GroupKind {
    /// Kinds in resolution order.
    pub const PRECEDENCE: [GroupKind; 3] = [GroupKind::List, GroupKind::Dropdown, GroupKind::Search];

    /// Field name used by the raw schema.
    pub fn key(self) -> &'static str {
        match self {
            GroupKind::List => "list",
            GroupKind::Dropdown => "dropdown",
            GroupKind::Search => "search",
        }
    }
}

/// A priced sub-variant of a service.
///
/// Everything besides `id` and `segment_name` is kept verbatim in `pricing`
/// so downstream consumers see the fields the server sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub id: String,
    pub segment_name: String,
    #[serde(flatten)]
    pub pricing: Map<String, Value>,
}

/// One selectable option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeOption {
    pub id: String,
    /// Display text (`value`, falling back to `name`).
    pub name: String,
    pub weight: i64,
    /// Option-group label this option was flattened from.
    pub label: String,
    /// Nested choices revealed once this option is selected.
    pub levels: Vec<OptionLevel>,
    /// Segment choices revealed once this option is selected.
    pub segments: Vec<Segment>,
}

impl AttributeOption {
    /// Nested level with the given label.
    pub fn level(&self, label: &str) -> Option<&OptionLevel> {
        self.levels.iter().find(|l| l.label == label)
    }

    /// True when this option or any nested option carries segments.
    pub fn has_segments(&self) -> bool {
        !self.segments.is_empty() || self.levels.iter().any(|l| l.options.iter().any(|o| o.has_segments()))
    }
}

/// Options sharing one option-group label, in weight order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionLevel {
    pub label: String,
    pub options: Vec<AttributeOption>,
}

impl OptionLevel {
    pub fn option(&self, id: &str) -> Option<&AttributeOption> {
        self.options.iter().find(|o| o.id == id)
    }
}

/// One definition inside a group's rendering kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeDefinition {
    pub id: String,
    pub name: String,
    pub required: bool,
    pub weight: i64,
    /// All options flattened across option-group labels, in weight order.
    pub options: Vec<AttributeOption>,
    /// The same options grouped by label.
    pub levels: Vec<OptionLevel>,
    pub segments: Vec<Segment>,
}

/// Body shared by every rendering kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupBody {
    pub name: String,
    pub definitions: Vec<AttributeDefinition>,
}

/// A named attribute with exactly one authoritative rendering kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeGroup {
    Dropdown(GroupBody),
    List(GroupBody),
    Search(GroupBody),
}

impl AttributeGroup {
    pub fn new(kind: GroupKind, body: GroupBody) -> Self {
        match kind {
            GroupKind::List => AttributeGroup::List(body),
            GroupKind::Dropdown => AttributeGroup::Dropdown(body),
            GroupKind::Search => AttributeGroup::Search(body),
        }
    }

    pub fn kind(&self) -> GroupKind {
        match self {
            AttributeGroup::Dropdown(_) => GroupKind::Dropdown,
            AttributeGroup::List(_) => GroupKind::List,
            AttributeGroup::Search(_) => GroupKind::Search,
        }
    }

    pub fn body(&self) -> &GroupBody {
        match self {
            AttributeGroup::Dropdown(body) | AttributeGroup::List(body) | AttributeGroup::Search(body) => body,
        }
    }

    pub fn name(&self) -> &str {
        &self.body().name
    }

    pub fn definitions(&self) -> &[AttributeDefinition] {
        &self.body().definitions
    }

    /// Id of the first definition, the wire `attribute_id` for this group.
    pub fn attribute_id(&self) -> Option<&str> {
        self.definitions().first().map(|d| d.id.as_str()).filter(|id| !id.is_empty())
    }

    pub fn is_required(&self) -> bool {
        self.definitions().iter().any(|d| d.required)
    }
}

// --- Selection types --------------------------------------------------------

/// Full data retained for a selection, used later for cascades and names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SelectedData {
    Choice(AttributeOption),
    Segment(Segment),
}

impl SelectedData {
    pub fn id(&self) -> &str {
        match self {
            SelectedData::Choice(option) => &option.id,
            SelectedData::Segment(segment) => &segment.id,
        }
    }

    pub fn display(&self) -> &str {
        match self {
            SelectedData::Choice(option) => &option.name,
            SelectedData::Segment(segment) => &segment.segment_name,
        }
    }

    pub fn as_choice(&self) -> Option<&AttributeOption> {
        match self {
            SelectedData::Choice(option) => Some(option),
            SelectedData::Segment(_) => None,
        }
    }
}

/// A user choice for one attribute. An empty `id` means cleared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub id: String,
    pub value: String,
    pub data: Option<SelectedData>,
    /// Wall-clock milliseconds when the selection was recorded.
    pub timestamp: i64,
}

impl Selection {
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Selection { id: id.into(), value: value.into(), data: None, timestamp: 0 }
    }

    pub fn with_data(mut self, data: SelectedData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_cleared(&self) -> bool {
        self.id.is_empty()
    }

    pub fn choice(&self) -> Option<&AttributeOption> {
        self.data.as_ref().and_then(SelectedData::as_choice)
    }
}

/// Selections keyed by attribute name.
///
/// Backed by an association list so iteration follows insertion order;
/// re-selecting an attribute keeps its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSet {
    entries: Vec<(String, Selection)>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Selection> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// Insert or overwrite the selection for `name`.
    pub fn insert(&mut self, name: impl Into<String>, selection: Selection) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = selection,
            None => self.entries.push((name, selection)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Selection> {
        let idx = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Selection)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Id of the live (non-cleared) selection for `name`.
    pub fn selected_id(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|s| !s.is_cleared()).map(|s| s.id.as_str())
    }
}

/// Normalized wire entry for the pricing and booking endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterEntry {
    pub attribute_id: String,
    pub option_id: String,
    pub attribute_name: String,
    pub option_name: String,
}
