use serde_json::{Value, json};

use crate::rules::{default_rules, rule_for};
use crate::{FilterEntry, Options, SEGMENT_KEY, ServiceDetails, Session};

/// Shape served for air conditioning: the AC types are split between the
/// named root and the empty-key satellite.
fn ac_attributes() -> Value {
    json!({
        "Type of AC": { "list": [
            { "id": "ac-window", "name": "Window AC", "weight": 2,
              "options": { "No. of Service": [
                  { "id": "n1", "value": "1", "weight": 1 },
                  { "id": "n2", "value": "2", "weight": 2 },
              ]},
              "serviceSegments": [{ "id": "seg-basic", "segment_name": "Basic", "price": 399 }] },
        ]},
        "": { "list": [
            { "id": "ac-split", "name": "Split AC", "weight": 1, "required": true,
              "options": { "No. of Service": [
                  { "id": "n1", "value": "1", "weight": 1,
                    "serviceSegments": [{ "id": "seg-jet", "segment_name": "Jet", "price": 599 }] },
                  { "id": "n3", "value": "3", "weight": 3 },
              ]},
              "serviceSegments": [
                  { "id": "seg-basic", "segment_name": "Basic", "price": 449 },
                  { "id": "seg-foam", "segment_name": "Foam", "price": 499 },
              ] },
        ]},
        "Brand": { "dropdown": [
            { "id": "brand", "options": { "All": [{ "id": "lg", "value": "LG" }, { "id": "NA", "value": "Other" }] } },
        ]},
    })
}

fn session() -> Session {
    Session::load(ServiceDetails::new(ac_attributes()))
}

fn segment_ids(session: &Session) -> Vec<String> {
    session.segments().into_iter().map(|s| s.id).collect()
}

#[test]
fn type_of_ac_matches_loosely() {
    for name in ["Type of AC", "type of ac", "  Type  of AC "] {
        assert_eq!(rule_for(default_rules(), name).unwrap().name, "type of ac (merge root)", "{name}");
    }
    assert_eq!(rule_for(default_rules(), "Type of ACs").unwrap().name, "default (definition options)");
}

#[test]
fn satellite_types_are_offered_under_the_root() {
    let session = session();
    let views = session.attributes();
    let names: Vec<&str> = views.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["Type of AC", "Brand"]);

    let ac = &views[0];
    let choices: Vec<&str> = ac.choices.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(choices, vec!["Split AC", "Window AC"]);
    assert!(ac.required);
}

#[test]
fn switching_ac_type_resets_service_count_and_segment() {
    let mut session = session();
    session.select("Type of AC", "ac-split").unwrap();
    session.select("No. of Service", "n3").unwrap();
    session.select(SEGMENT_KEY, "seg-foam").unwrap();

    let t = session.select("Type of AC", "ac-window").unwrap();
    assert_eq!(t.reset, vec!["No. of Service".to_string(), SEGMENT_KEY.to_string()]);
    assert_eq!(session.store().current().selected_id("No. of Service"), None);
    assert!(session.store().selected_segment().is_none());
}

#[test]
fn shared_service_count_survives_the_switch() {
    let mut session = session();
    session.select("Type of AC", "ac-split").unwrap();
    session.select("No. of Service", "n1").unwrap();
    assert_eq!(segment_ids(&session), vec!["seg-jet"]);

    let t = session.select("Type of AC", "ac-window").unwrap();
    assert!(!t.reset.contains(&"No. of Service".to_string()));
    assert_eq!(session.store().current().selected_id("No. of Service"), Some("n1"));
    // Window's "1" carries no segments of its own.
    assert_eq!(segment_ids(&session), vec!["seg-basic"]);
}

#[test]
fn service_count_is_pricing_only() {
    let mut session = session();
    session.select("Brand", "NA").unwrap();
    session.select("Type of AC", "ac-split").unwrap();
    session.select("No. of Service", "n1").unwrap();
    session.select(SEGMENT_KEY, "seg-jet").unwrap();

    assert_eq!(
        session.filters(),
        &[
            FilterEntry {
                attribute_id: "brand".into(),
                option_id: "".into(),
                attribute_name: "Brand".into(),
                option_name: "Other".into(),
            },
            FilterEntry {
                attribute_id: "ac-window".into(),
                option_id: "ac-split".into(),
                attribute_name: "Type of AC".into(),
                option_name: "Split AC".into(),
            },
        ]
    );
    assert!(session.is_ready());
    let booking = session.booking_request().unwrap();
    assert_eq!(booking.segment_id.as_deref(), Some("seg-jet"));
    assert_eq!(booking.sub_selections[0].option_id, "n1");
}

#[test]
fn required_type_of_ac_blocks_readiness() {
    let mut session = session();
    session.select("Brand", "lg").unwrap();
    assert_eq!(session.validation().missing, vec!["Type of AC".to_string()]);
    assert!(session.booking_request().is_none());

    session.select("Type of AC", "ac-window").unwrap();
    assert!(session.validation().is_valid);
}

#[test]
fn empty_key_cannot_be_selected() {
    let mut session = session();
    assert!(session.select("", "ac-split").is_none());
    assert!(session.store().current().is_empty());
}

#[test]
fn auto_select_prefers_split() {
    let session = Session::load_with(ServiceDetails::new(ac_attributes()), Options {
        auto_select: true,
        ..Default::default()
    });
    let current = session.store().current();
    assert_eq!(current.selected_id("Type of AC"), Some("ac-split"));
    assert_eq!(current.selected_id("No. of Service"), Some("n1"));
    assert_eq!(current.selected_id("Brand"), Some("lg"));
    assert_eq!(session.store().selected_segment().map(|s| s.id.as_str()), Some("seg-jet"));
}

#[test]
fn configured_tokens_win_over_rule_tokens() {
    let options = Options { auto_select: true, canonical_tokens: vec!["window".into()], ..Default::default() };
    let session = Session::load_with(ServiceDetails::new(ac_attributes()), options);
    assert_eq!(session.store().current().selected_id("Type of AC"), Some("ac-window"));
}
