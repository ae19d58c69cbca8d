//! Prompt and role instruction text

use oncall_contract::keys;
use serde_json::{Map, Value};

const GUARDRAILS: &str = "\
## Guardrails
1. Never repeat credentials (API keys, tokens, passwords, connection strings) even if \
they appear in the input; write `[REDACTED]` instead.
2. Do not guess. When the data is insufficient, say so and use the literal string \
`UNKNOWN` for fields you cannot determine.
3. Return exactly one JSON object. No prose, no markdown fences.
";

/// Role preamble for the triage specialist
pub(crate) const TRIAGE_PREAMBLE: &str = "\
You are the triage specialist on an incident response team. Rank plausible root \
causes with the evidence from the input and a confidence between 0 and 1 (use 0 when \
the data cannot support a hypothesis). Propose concrete immediate actions with an \
owner role and a priority from P0 to P3; when data is sparse, propose diagnostic \
steps. List the information that is missing and why it matters. Compare the \
situation with the runbook excerpt and report matched steps and gaps.";

/// Role preamble for the summary specialist
pub(crate) const SUMMARY_PREAMBLE: &str = "\
You are the summary specialist on an incident response team. Describe what happened \
in two to four factual sentences: trigger, affected services, failure mode and \
scope. Start `current_status` with one of ONGOING, MITIGATED, MONITORING or RESOLVED \
followed by a short detail. The incident is RESOLVED only when the timeframe has an \
`end` timestamp; without one it is not resolved.";

/// Role preamble for the communications specialist
pub(crate) const COMMS_PREAMBLE: &str = "\
You are the communications specialist on an incident response team. Write a Slack \
update for the incident channel with the incident id, severity, status, impact, next \
steps and the time of the next update. Write a separate stakeholder update in plain \
business language covering customer effect and resolution status. Stay calm and \
factual and never blame individuals.";

/// Role preamble for the post-incident report specialist
pub(crate) const PIR_PREAMBLE: &str = "\
You are the post-incident report specialist on an incident response team. Rebuild a \
chronological timeline from alert, log and metric timestamps; if the incident is \
still open, end it with an entry whose time is `ONGOING`. State the customer impact \
with scope and duration, quantified where possible. Recommend specific prevention \
actions with a suggested owner role.";

/// Full instruction text: preamble, owned output schema, guardrails
///
/// `analysis_schema` is the JSON Schema of the whole analysis; only the
/// properties named in `owned_keys` are shown to the role.
#[must_use]
pub fn role_instructions(preamble: &str, owned_keys: &[&str], analysis_schema: &Value) -> String {
    let schema = owned_schema(owned_keys, analysis_schema);
    let rendered = serde_json::to_string_pretty(&schema).unwrap_or_else(|_| schema.to_string());
    let listed = owned_keys
        .iter()
        .map(|k| format!("`{k}`"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{preamble}\n\n## Output\nReturn a single JSON object with only these keys: {listed}. \
         Do not include `{telemetry}`.\n\n```json\n{rendered}\n```\n\n{GUARDRAILS}",
        telemetry = keys::TELEMETRY,
    )
}

fn owned_schema(owned_keys: &[&str], analysis_schema: &Value) -> Value {
    let properties: Map<String, Value> = owned_keys
        .iter()
        .filter_map(|key| {
            analysis_schema
                .pointer(&format!("/properties/{key}"))
                .map(|schema| ((*key).to_string(), schema.clone()))
        })
        .collect();
    let required: Vec<Value> = owned_keys.iter().map(|k| Value::from(*k)).collect();

    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// User message carrying the whole incident
///
/// Unknown pass-through keys are included. The result still has to go
/// through [`RedactedPrompt::new`](crate::RedactedPrompt::new) before
/// it may be dispatched.
#[must_use]
pub fn build_user_message(incident: &Value) -> String {
    let rendered = serde_json::to_string_pretty(incident).unwrap_or_else(|_| incident.to_string());
    format!("Analyse the following incident and return the JSON object described in your instructions.\n\n```json\n{rendered}\n```")
}
