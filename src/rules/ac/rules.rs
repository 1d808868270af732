use crate::CascadeRule;
use crate::rules::definitions_as_choices;

/// Air conditioning: "Type of AC" lists AC types as definitions, each one
/// carrying a "No. of Service" option group and the service segments.
///
/// The server splits the AC types across the root group and a satellite under
/// the empty key, so the rule merges both before building choices.
fn rule_type_of_ac() -> CascadeRule {
    cascade_rule! {
        name: "type of ac (merge root)",
        pattern: re!(r"(?i)^\s*type\s+of\s+ac\s*$"),
        satellites: [""],
        canonical: ["split"],
        pricing_only: ["No. of Service", "No.of Service", "No of Service"],
        priority: 10,
        choices: definitions_as_choices,
    }
}

pub fn get() -> Vec<CascadeRule> {
    vec![rule_type_of_ac()]
}
