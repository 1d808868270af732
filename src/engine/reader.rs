//! Attribute schema reader.
//!
//! Turns the loosely typed `attributes` map of a service-details response
//! into tagged `AttributeGroup`s, once, so nothing downstream has to sniff
//! shapes again.
//!
//! Raw shape (every field optional and loosely typed):
//!
//! ```text
//! { "<attribute name>": {
//!     "list" | "dropdown" | "search": [
//!       { "id", "name", "required" | "is_required", "weight",
//!         "options": { "<option-group label>": [
//!             { "id", "value" | "name", "weight",
//!               "options": { "<label>": [ ... ] },
//!               "serviceSegments": [ { "id", "segment_name", ... } ] } ] },
//!         "serviceSegments": [ ... ] } ] } }
//! ```
//!
//! ## Leniency
//!
//! - Ids are strings or numbers; weights are integers, floats or numeric
//!   strings (default 0).
//! - A group with several kinds keeps the first of `list`, `dropdown`,
//!   `search`.
//! - Anything unusable is dropped with a `Diagnostic`; `parse` never fails.

use serde_json::{Map, Value};
use thiserror::Error;

use super::diagnostics::{Diagnostic, DiagnosticKind};
use crate::{
    AttributeDefinition, AttributeGroup, AttributeOption, GroupBody, GroupKind, OptionLevel, SEGMENT_KEY, Segment,
};

bitflags::bitflags! {
    /// Rendering kinds present on a raw group.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) struct KindMask: u8 {
        const LIST     = 1 << 0;
        const DROPDOWN = 1 << 1;
        const SEARCH   = 1 << 2;
    }
}

impl From<GroupKind> for KindMask {
    fn from(kind: GroupKind) -> Self {
        match kind {
            GroupKind::List => KindMask::LIST,
            GroupKind::Dropdown => KindMask::DROPDOWN,
            GroupKind::Search => KindMask::SEARCH,
        }
    }
}

/// Why a piece of the schema was dropped.
#[derive(Debug, Error)]
pub(crate) enum SchemaError {
    #[error("attribute schema is not an object")]
    SchemaNotAnObject,
    #[error("group value is not an object")]
    GroupNotAnObject,
    #[error("no dropdown, list or search entries")]
    NoRenderingKind,
    #[error("no usable definitions under `{0}`")]
    NoDefinitions(&'static str),
    #[error("entry #{0} is not an object")]
    EntryNotAnObject(usize),
    #[error("entry #{0} has no id")]
    MissingId(usize),
    #[error("definition `{0}` has neither options nor serviceSegments")]
    MissingOptions(String),
    #[error("option group `{0}` is not an array")]
    LevelNotAnArray(String),
    #[error("segment is not an object")]
    SegmentNotAnObject,
    #[error("segment has no id")]
    SegmentMissingId,
}

/// Result of [`parse`]: groups in schema order plus what was dropped.
#[derive(Debug, Clone, Default)]
pub struct ParsedSchema {
    pub groups: Vec<AttributeGroup>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedSchema {
    pub fn get(&self, name: &str) -> Option<&AttributeGroup> {
        self.groups.iter().find(|g| g.name() == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(AttributeGroup::name)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Parse a raw attribute map.
///
/// Pure: the same input always yields the same groups and diagnostics.
pub fn parse(raw: &Value) -> ParsedSchema {
    let mut schema = ParsedSchema::default();

    let Some(map) = raw.as_object() else {
        if !raw.is_null() {
            let err = SchemaError::SchemaNotAnObject;
            schema.diagnostics.push(Diagnostic::warn(DiagnosticKind::MalformedGroup, "", err.to_string()));
        }
        return schema;
    };

    for (name, value) in map {
        match read_group(name, value, &mut schema.diagnostics) {
            Ok(group) => schema.groups.push(group),
            Err(err) => {
                schema.diagnostics.push(Diagnostic::warn(DiagnosticKind::MalformedGroup, name, err.to_string()));
            }
        }
    }

    tracing::debug!(groups = schema.groups.len(), dropped = schema.diagnostics.len(), "attribute schema parsed");
    schema
}

fn read_group(name: &str, value: &Value, diags: &mut Vec<Diagnostic>) -> Result<AttributeGroup, SchemaError> {
    let obj = value.as_object().ok_or(SchemaError::GroupNotAnObject)?;

    let mut present = KindMask::empty();
    for kind in GroupKind::PRECEDENCE {
        if obj.get(kind.key()).and_then(Value::as_array).is_some_and(|a| !a.is_empty()) {
            present |= KindMask::from(kind);
        }
    }

    let kind = GroupKind::PRECEDENCE
        .into_iter()
        .find(|k| present.contains(KindMask::from(*k)))
        .ok_or(SchemaError::NoRenderingKind)?;

    if present.bits().count_ones() > 1 {
        diags.push(Diagnostic::debug(
            DiagnosticKind::MultipleKinds,
            name,
            format!("using `{}`, present: {:?}", kind.key(), present),
        ));
    }

    let entries = obj.get(kind.key()).and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
    let mut definitions = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        match read_definition(idx, entry, name, diags) {
            Ok(def) => definitions.push(def),
            Err(err) => diags.push(Diagnostic::warn(DiagnosticKind::MalformedDefinition, name, err.to_string())),
        }
    }

    if definitions.is_empty() {
        return Err(SchemaError::NoDefinitions(kind.key()));
    }

    Ok(AttributeGroup::new(kind, GroupBody { name: name.to_string(), definitions }))
}

fn read_definition(
    idx: usize,
    entry: &Value,
    group: &str,
    diags: &mut Vec<Diagnostic>,
) -> Result<AttributeDefinition, SchemaError> {
    let obj = entry.as_object().ok_or(SchemaError::EntryNotAnObject(idx))?;
    let id = id_of(obj.get("id")).ok_or(SchemaError::MissingId(idx))?;

    let levels = match obj.get("options") {
        Some(Value::Object(map)) => read_levels(map, group, diags),
        // A bare array is a single, unlabeled option group.
        Some(Value::Array(items)) => read_level("", items, group, diags).into_iter().collect(),
        _ => Vec::new(),
    };
    let segments = read_segments(obj.get(SEGMENT_KEY), group, diags);

    if levels.is_empty() && segments.is_empty() {
        return Err(SchemaError::MissingOptions(id));
    }

    let mut options: Vec<AttributeOption> = levels.iter().flat_map(|l| l.options.iter().cloned()).collect();
    options.sort_by_key(|o| o.weight);

    Ok(AttributeDefinition {
        name: text_of(obj, &["name", "value"]).unwrap_or_else(|| id.clone()),
        required: ["required", "is_required"].iter().any(|k| obj.get(*k).is_some_and(truthy)),
        weight: weight_of(obj.get("weight")),
        id,
        options,
        levels,
        segments,
    })
}

fn read_levels(map: &Map<String, Value>, group: &str, diags: &mut Vec<Diagnostic>) -> Vec<OptionLevel> {
    let mut levels = Vec::with_capacity(map.len());
    for (label, value) in map {
        match value.as_array() {
            Some(items) => levels.extend(read_level(label, items, group, diags)),
            None => {
                let err = SchemaError::LevelNotAnArray(label.clone());
                diags.push(Diagnostic::warn(DiagnosticKind::MalformedOption, group, err.to_string()));
            }
        }
    }
    levels
}

/// Read one option group, sorted by weight. Empty groups yield `None`.
fn read_level(label: &str, items: &[Value], group: &str, diags: &mut Vec<Diagnostic>) -> Option<OptionLevel> {
    let mut options = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match read_option(idx, item, label, group, diags) {
            Ok(option) => options.push(option),
            Err(err) => diags.push(Diagnostic::warn(DiagnosticKind::MalformedOption, group, err.to_string())),
        }
    }
    // `sort_by_key` is stable: equal weights keep server order.
    options.sort_by_key(|o| o.weight);

    if options.is_empty() { None } else { Some(OptionLevel { label: label.to_string(), options }) }
}

fn read_option(
    idx: usize,
    item: &Value,
    label: &str,
    group: &str,
    diags: &mut Vec<Diagnostic>,
) -> Result<AttributeOption, SchemaError> {
    let obj = item.as_object().ok_or(SchemaError::EntryNotAnObject(idx))?;
    let id = id_of(obj.get("id")).ok_or(SchemaError::MissingId(idx))?;

    let levels = match obj.get("options") {
        Some(Value::Object(map)) => read_levels(map, group, diags),
        _ => Vec::new(),
    };

    Ok(AttributeOption {
        name: text_of(obj, &["value", "name"]).unwrap_or_default(),
        weight: weight_of(obj.get("weight")),
        label: label.to_string(),
        segments: read_segments(obj.get(SEGMENT_KEY), group, diags),
        levels,
        id,
    })
}

fn read_segments(value: Option<&Value>, group: &str, diags: &mut Vec<Diagnostic>) -> Vec<Segment> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut segments = Vec::with_capacity(items.len());
    for item in items {
        match parse_segment(item) {
            Ok(segment) => segments.push(segment),
            Err(err) => diags.push(Diagnostic::warn(DiagnosticKind::MalformedOption, group, err.to_string())),
        }
    }
    segments
}

/// Read one segment, keeping every field besides `id`/`segment_name` as
/// pricing data.
pub(crate) fn parse_segment(value: &Value) -> Result<Segment, SchemaError> {
    let obj = value.as_object().ok_or(SchemaError::SegmentNotAnObject)?;
    let id = id_of(obj.get("id")).ok_or(SchemaError::SegmentMissingId)?;
    let segment_name = text_of(obj, &["segment_name", "name"]).unwrap_or_default();
    let pricing = obj
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "id" | "segment_name"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(Segment { id, segment_name, pricing })
}

// --- Loose value helpers ----------------------------------------------------

/// Ids arrive as strings or numbers.
fn id_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First non-empty text among `keys`.
fn text_of(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn weight_of(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().map(|f| f as i64)).unwrap_or(0)
        }
        _ => 0,
    }
}

/// `required` flags: booleans, non-zero numbers, and strings other than
/// `""`, `"0"` and `"false"`.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false"),
        _ => false,
    }
}
