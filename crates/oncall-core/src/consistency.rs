//! Cross-checks between the merged analysis and the incident
//!
//! The timeframe `end` is the only authority on whether an incident is
//! resolved. A summary that contradicts it is reported, never rewritten.

use crate::types::IncidentEnvelope;
use oncall_contract::{keys, Violation, ViolationKind};
use serde_json::{Map, Value};

const STATUS_PATH: &str = "summary.current_status";

/// Violations of incident/analysis consistency
#[must_use]
pub fn check_consistency(incident: &IncidentEnvelope, merged: &Map<String, Value>) -> Vec<Violation> {
    let Some(status) = merged
        .get(keys::SUMMARY)
        .and_then(|s| s.get("current_status"))
        .and_then(Value::as_str)
    else {
        return Vec::new();
    };
    let status = status.trim_start().to_ascii_uppercase();

    let reason = if !incident.is_closed() && status.starts_with("RESOLVED") {
        "status reads RESOLVED but the incident has no end timestamp"
    } else if incident.is_closed() && status.starts_with("ONGOING") {
        "status reads ONGOING but the incident has an end timestamp"
    } else {
        return Vec::new();
    };

    vec![Violation::new(
        STATUS_PATH,
        ViolationKind::Inconsistent {
            reason: reason.to_string(),
        },
    )]
}
