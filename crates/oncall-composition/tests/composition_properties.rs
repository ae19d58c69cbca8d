//! Property tests for fragment recovery and merging.
//!
//! - Extraction is total over arbitrary text
//! - Merging is associative under a fixed order
//! - Telemetry is always the core record, whatever the fragments say

use oncall_composition::{
    extract_fragments, Fragment, MergedResult, ResultMerger, RoleId, SpecialistTelemetry,
    TelemetryRecord, TokenUsage,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn role(name: &str) -> RoleId {
    RoleId::new(name)
}

fn small_object() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(
        prop::sample::select(vec!["summary", "comms", "telemetry", "immediate_actions", "x"]),
        prop_oneof![
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,8}".prop_map(Value::from),
            Just(json!({"nested": true})),
        ],
        0..4,
    )
    .prop_map(|m| m.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

fn fragment_strategy() -> impl Strategy<Value = Fragment> {
    (prop::sample::select(vec!["triage", "summary", "comms", "pir"]), small_object())
        .prop_map(|(r, value)| Fragment::new(role(r), 0, value))
}

proptest! {
    /// Arbitrary text never panics and only yields objects.
    #[test]
    fn prop_extraction_is_total(raw in ".*") {
        let _ = extract_fragments(&role("triage"), &raw);
    }

    /// Truncating valid JSON anywhere never panics and never invents data.
    #[test]
    fn prop_truncated_json_yields_prefix(objects in prop::collection::vec(small_object(), 1..4), cut in any::<prop::sample::Index>()) {
        let text: String = objects.iter().map(|o| Value::Object(o.clone()).to_string()).collect();
        let end = cut.index(text.len() + 1);
        let Some(prefix) = text.get(..end) else { return Ok(()) };

        let recovered = extract_fragments(&role("triage"), prefix);
        prop_assert!(recovered.len() <= objects.len());
        for (fragment, original) in recovered.iter().zip(&objects) {
            prop_assert_eq!(&fragment.value, original);
        }
    }

    /// Concatenated objects come back complete and in order.
    #[test]
    fn prop_concatenated_objects_round_trip(objects in prop::collection::vec(small_object(), 0..5)) {
        let text = objects
            .iter()
            .map(|o| Value::Object(o.clone()).to_string())
            .collect::<Vec<_>>()
            .join("\n");

        let values: Vec<_> = extract_fragments(&role("comms"), &text).into_iter().map(|f| f.value).collect();
        prop_assert_eq!(values, objects);
    }

    /// merge([A, B]) then absorb(C) == merge([A, B, C]).
    #[test]
    fn prop_merge_is_associative(a in fragment_strategy(), b in fragment_strategy(), c in fragment_strategy()) {
        let mut stepwise = MergedResult::merge_all([a.clone(), b.clone()]);
        stepwise.absorb(c.clone());

        prop_assert_eq!(stepwise, MergedResult::merge_all([a, b, c]));
    }

    /// Fragment-supplied telemetry is always replaced.
    #[test]
    fn prop_telemetry_is_overwritten(fragments in prop::collection::vec(fragment_strategy(), 0..6)) {
        let telemetry = TelemetryRecord::new("corr-1", "model-router")
            .with(SpecialistTelemetry::ok(role("triage"), Some("m".into()), 1), Some(TokenUsage::new(1, 1)));

        let merger = ResultMerger::new(["triage", "summary", "comms", "pir"]);
        let merged = merger.merge_stamped(fragments, &telemetry);

        prop_assert_eq!(merged.get("telemetry"), Some(&telemetry.to_value()));
    }
}

/// A fenced single object yields exactly that object.
#[test]
fn fenced_single_object() {
    let object = json!({
        "summary": {"what_happened": "Pool exhausted", "current_status": "ONGOING: mitigating"}
    });
    let raw = format!("```json\n{}\n```", serde_json::to_string_pretty(&object).unwrap());

    let fragments = extract_fragments(&role("summary"), &raw);

    assert_eq!(fragments.len(), 1);
    assert_eq!(Value::Object(fragments[0].value.clone()), object);
    assert_eq!(fragments[0].role, role("summary"));
}

/// Two back-to-back objects yield two fragments, left to right.
#[test]
fn back_to_back_objects() {
    let fragments = extract_fragments(
        &role("triage"),
        r#"{"suspected_root_causes": []}{"immediate_actions": []}"#,
    );

    let keys: Vec<Vec<&str>> = fragments
        .iter()
        .map(|f| f.value.keys().map(String::as_str).collect())
        .collect();
    assert_eq!(keys, vec![vec!["suspected_root_causes"], vec!["immediate_actions"]]);
    assert!(fragments[0].offset < fragments[1].offset);
}
