use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::engine::{
    self, Catalog, Diagnostic, RevealedLevel, SelectionStore, Transition, ValidationReport, auto_select, choose,
    effective_segments, parse_segment, required_attributes, revealed, validate,
};
use crate::{AttributeOption, FilterEntry, GroupKind, Segment};

/// Options that affect loading and readiness.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Pick defaults for every attribute, level and segment on load.
    ///
    /// Off by default: only explicit user choices are sent downstream.
    pub auto_select: bool,
    /// Name fragments preferred by auto-selection, before the rule's own.
    pub canonical_tokens: Vec<String>,
    /// Also require a segment when the current choices offer any.
    pub require_segment: bool,
}

/// Failure to decode a service-details document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid service details JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("service details have no `attributes` field")]
    MissingAttributes,
}

/// Service-details fetch result, as far as the engine is concerned.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceDetails {
    #[serde(default)]
    pub attributes: Value,
    #[serde(default, alias = "categoryId", deserialize_with = "lenient_id")]
    pub category_id: Option<String>,
    #[serde(default, alias = "subcategoryId", alias = "sub_category_id", deserialize_with = "lenient_id")]
    pub subcategory_id: Option<String>,
}

impl ServiceDetails {
    pub fn new(attributes: Value) -> Self {
        ServiceDetails { attributes, ..Default::default() }
    }

    /// Decode a service-details document.
    ///
    /// Only the envelope is checked here; whatever inside `attributes` cannot
    /// be used is dropped later with a diagnostic.
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        let details: ServiceDetails = serde_json::from_str(text)?;
        if details.attributes.is_null() {
            return Err(LoadError::MissingAttributes);
        }
        Ok(details)
    }
}

/// Ids arrive as strings or numbers.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// A visible attribute as the UI renders it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeView {
    pub name: String,
    pub kind: GroupKind,
    pub required: bool,
    pub choices: Vec<AttributeOption>,
    pub selected: Option<String>,
}

/// Body of the segment-pricing request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentQuery {
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub segment_id: Option<String>,
    pub attribute: Vec<FilterEntry>,
}

/// A nested pick carried alongside the filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubSelection {
    pub label: String,
    pub option_id: String,
    pub option_name: String,
}

/// Payload handed to the booking step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingRequest {
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub attribute: Vec<FilterEntry>,
    pub sub_selections: Vec<SubSelection>,
    pub segment_id: Option<String>,
    pub segment: Option<Segment>,
}

/// One service-details session: a schema plus the user's choices on it.
#[derive(Debug, Clone)]
pub struct Session {
    details: ServiceDetails,
    options: Options,
    store: SelectionStore,
}

impl Session {
    pub fn load(details: ServiceDetails) -> Self {
        Self::load_with(details, Options::default())
    }

    /// Bind `details` to the built-in rules and start with no selections
    /// (or with defaults when `options.auto_select` is set).
    pub fn load_with(details: ServiceDetails, options: Options) -> Self {
        let catalog = Catalog::from_schema(&details.attributes);
        tracing::debug!(
            attributes = catalog.attributes().len(),
            diagnostics = catalog.diagnostics().len(),
            "service details loaded"
        );

        let mut store = SelectionStore::new(catalog);
        if options.auto_select {
            let picked = auto_select(&mut store, &options.canonical_tokens);
            tracing::debug!(picked = picked.len(), "auto-selection applied");
        }
        Session { details, options, store }
    }

    /// Replace the schema. Nothing selected under the old one survives.
    pub fn reload(&mut self, details: ServiceDetails) {
        *self = Self::load_with(details, self.options.clone());
    }

    pub fn details(&self) -> &ServiceDetails {
        &self.details
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        self.store.catalog()
    }

    /// Choose `option_id` for an attribute, a revealed level or
    /// `serviceSegments`. An empty id clears.
    pub fn select(&mut self, attribute: &str, option_id: &str) -> Option<Transition> {
        choose(&mut self.store, attribute, option_id)
    }

    pub fn clear_all(&mut self) {
        self.store.clear_all();
    }

    pub fn attributes(&self) -> Vec<AttributeView> {
        let selections = self.store.current();
        self.catalog()
            .attributes()
            .iter()
            .map(|a| AttributeView {
                name: a.name.clone(),
                kind: a.kind,
                required: a.required,
                choices: a.choices.clone(),
                selected: selections.selected_id(&a.name).filter(|id| a.choice(id).is_some()).map(str::to_string),
            })
            .collect()
    }

    pub fn revealed(&self) -> Vec<RevealedLevel> {
        revealed(&self.store)
    }

    /// Segments offered for the current choices.
    pub fn segments(&self) -> Vec<Segment> {
        effective_segments(&self.store)
    }

    pub fn validation(&self) -> ValidationReport {
        let catalog = self.catalog();
        validate(catalog, self.store.current(), &required_attributes(catalog))
    }

    pub fn is_ready(&self) -> bool {
        if !engine::is_ready(self.catalog(), &self.validation()) {
            return false;
        }
        !self.options.require_segment || self.store.selected_segment().is_some() || self.segments().is_empty()
    }

    pub fn filters(&self) -> &[FilterEntry] {
        self.store.filters()
    }

    pub fn segment_query(&self) -> SegmentQuery {
        SegmentQuery {
            category_id: self.details.category_id.clone(),
            subcategory_id: self.details.subcategory_id.clone(),
            segment_id: self.store.selected_segment().map(|s| s.id.clone()),
            attribute: self.filters().to_vec(),
        }
    }

    /// Booking payload, or `None` while something required is missing.
    pub fn booking_request(&self) -> Option<BookingRequest> {
        if !self.is_ready() {
            return None;
        }

        let sub_selections = self
            .revealed()
            .into_iter()
            .filter_map(|level| {
                let selected = level.selected?;
                let option = level.options.iter().find(|o| o.id == selected)?;
                Some(SubSelection { label: level.label, option_id: selected, option_name: option.name.clone() })
            })
            .collect();

        let segment_id = self.store.selected_segment().map(|s| s.id.clone());
        let segment = segment_id.as_ref().and_then(|id| self.segments().into_iter().find(|s| &s.id == id));

        Some(BookingRequest {
            category_id: self.details.category_id.clone(),
            subcategory_id: self.details.subcategory_id.clone(),
            attribute: self.filters().to_vec(),
            sub_selections,
            segment_id,
            segment,
        })
    }

    /// Apply the segment list returned by the pricing endpoint.
    ///
    /// Accepts the bare array or an object carrying it under
    /// `serviceSegments`. Unusable entries are skipped. Returns how many
    /// segments were applied.
    pub fn apply_priced_segments(&mut self, raw: &Value) -> usize {
        let items = match raw {
            Value::Array(items) => items.as_slice(),
            Value::Object(obj) => {
                obj.get(crate::SEGMENT_KEY).and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default()
            }
            _ => &[],
        };

        let mut segments = Vec::with_capacity(items.len());
        for item in items {
            match parse_segment(item) {
                Ok(segment) => segments.push(segment),
                Err(err) => tracing::warn!(error = %err, "priced segment skipped"),
            }
        }
        let count = segments.len();
        self.store.apply_priced_segments(segments);
        count
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.store.diagnostics()
    }
}
