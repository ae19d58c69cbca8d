//! Testing utilities for the oncall copilot workspace
//!
//! Shared sample incidents, canned analyses and a scripted specialist.

#![allow(missing_docs)]

use async_trait::async_trait;
use oncall_composition::TokenUsage;
use oncall_contract::{keys, BuiltinContracts};
use oncall_core::{
    RedactedPrompt, Roster, SpecialistClient, SpecialistError, SpecialistReply, SpecialistRole,
};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const OPEN_INCIDENT_ID: &str = "INC-1001";
pub const CLOSED_INCIDENT_ID: &str = "INC-2002";
pub const LEAKED_PASSWORD: &str = "hunter2-prod";

/// Open SEV1 with a credential in its logs
pub fn open_sev1_incident() -> Value {
    json!({
        "incident_id": OPEN_INCIDENT_ID,
        "title": "Checkout API returning 503",
        "severity": "SEV1",
        "timeframe": {"start": "2024-05-01T10:00:00Z", "end": null},
        "alerts": [
            {"name": "checkout-5xx", "description": "5xx rate above 20%", "timestamp": "2024-05-01T10:02:00Z"}
        ],
        "logs": [
            {
                "source": "checkout-api",
                "lines": [
                    "ERROR pool exhausted: 50/50 connections in use",
                    format!("WARN retrying with password={LEAKED_PASSWORD}")
                ]
            }
        ],
        "metrics": [
            {"name": "db_connections", "window": "15m", "values_summary": "flat at max"}
        ],
        "runbook_excerpt": "1. Check pool saturation. 2. Scale read replicas.",
        "constraints": {"max_time_minutes": 30, "environment": "prod", "region": "eu-west-1"}
    })
}

/// Closed SEV3 with only the required keys
pub fn closed_sev3_incident() -> Value {
    json!({
        "incident_id": CLOSED_INCIDENT_ID,
        "title": "Search latency spike",
        "severity": "SEV3",
        "timeframe": {"start": "2024-05-02T08:00:00Z", "end": "2024-05-02T08:40:00Z"}
    })
}

/// Every analysis section, with `current_status` set to `status`
pub fn full_analysis(status: &str) -> Map<String, Value> {
    let value = json!({
        "summary": {
            "what_happened": "Database connection pool exhausted on checkout-api",
            "current_status": status
        },
        "suspected_root_causes": [
            {"hypothesis": "Pool too small for traffic", "evidence": ["50/50 connections"], "confidence": 0.8},
            {"hypothesis": "Slow queries holding connections", "evidence": [], "confidence": 0.3}
        ],
        "immediate_actions": [
            {"step": "Raise pool size to 100", "owner_role": "SRE", "priority": "P0"},
            {"step": "Scale read replicas", "owner_role": "DBA", "priority": "P1"}
        ],
        "missing_information": [
            {"question": "Was there a deploy before 10:00?", "why_it_matters": "Rules out a regression"}
        ],
        "runbook_alignment": {
            "matched_steps": ["Check pool saturation"],
            "gaps": ["No step for raising pool size"]
        },
        "comms": {
            "slack_update": "Checkout degraded, pool exhausted, mitigation in progress",
            "stakeholder_update": "Some customers cannot check out. Engineers are mitigating."
        },
        "post_incident_report": {
            "timeline": [
                {"time": "10:00", "event": "5xx alert fired"},
                {"time": "10:05", "event": "Pool exhaustion identified"}
            ],
            "customer_impact": "Checkout failures for roughly 20% of requests",
            "prevention_actions": ["Alert on pool saturation", "Load test pool sizing"]
        }
    });
    into_map(value)
}

/// Keys of `analysis` owned by `role`, as JSON text
pub fn role_reply(role: &SpecialistRole, analysis: &Map<String, Value>) -> String {
    let part: Map<String, Value> = analysis
        .iter()
        .filter(|(key, _)| role.owns(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Value::Object(part).to_string()
}

/// The four built-in roles
pub fn builtin_roles() -> Vec<SpecialistRole> {
    let contracts = BuiltinContracts::load().unwrap();
    SpecialistRole::builtin(&contracts.analysis)
}

/// Built-in roles wired to the given clients
pub fn builtin_roster(clients: Vec<(&str, Arc<dyn SpecialistClient>)>) -> Roster {
    clients
        .into_iter()
        .fold(Roster::builder().roles(builtin_roles()), |builder, (role, client)| {
            builder.client_for(role, client)
        })
        .build()
        .unwrap()
}

/// Built-in roles, each replying with its slice of `analysis`
pub fn scripted_roster(analysis: &Map<String, Value>) -> (Roster, Vec<Arc<ScriptedSpecialist>>) {
    let roles = builtin_roles();
    let specialists: Vec<Arc<ScriptedSpecialist>> = roles
        .iter()
        .map(|role| Arc::new(ScriptedSpecialist::replying(role_reply(role, analysis))))
        .collect();
    let roster = roles
        .iter()
        .zip(&specialists)
        .fold(Roster::builder().roles(roles.clone()), |builder, (role, s)| {
            builder.client_for(role.id.clone(), s.clone() as Arc<dyn SpecialistClient>)
        })
        .build()
        .unwrap();
    (roster, specialists)
}

/// Temporary fixture directory holding `(file stem, content)` pairs
pub fn fixture_dir(fixtures: &[(&str, Value)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (stem, content) in fixtures {
        let path = dir.path().join(format!("{stem}.json"));
        std::fs::write(path, serde_json::to_vec_pretty(content).unwrap()).unwrap();
    }
    dir
}

pub fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

/// Specialist with a fixed outcome and optional delay
///
/// Counts calls started and calls that ran to completion, so tests can
/// tell an abandoned call from one that finished.
#[derive(Debug)]
pub struct ScriptedSpecialist {
    outcome: Result<SpecialistReply, SpecialistError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    completions: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedSpecialist {
    pub fn replying(text: impl Into<String>) -> Self {
        let text = text.into();
        let usage = TokenUsage::estimate("", &text);
        Self::with_outcome(Ok(SpecialistReply::text(text)
            .with_model("gpt-4o-mini")
            .with_usage(usage)))
    }

    pub fn failing(error: SpecialistError) -> Self {
        Self::with_outcome(Err(error))
    }

    pub fn with_outcome(outcome: Result<SpecialistReply, SpecialistError>) -> Self {
        Self {
            outcome,
            delay: None,
            calls: AtomicUsize::new(0),
            completions: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    /// Prompts received, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpecialistClient for ScriptedSpecialist {
    async fn call(
        &self,
        _instructions: &str,
        prompt: &RedactedPrompt,
    ) -> Result<SpecialistReply, SpecialistError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.as_str().to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.completions.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// Analysis contract keys a given role is responsible for
pub fn owned_keys(role: &str) -> Vec<&'static str> {
    builtin_roles()
        .into_iter()
        .find(|r| r.id.as_str() == role)
        .map(|r| r.owned_keys)
        .unwrap_or_default()
}

/// Every analysis section key, telemetry excluded
pub const SECTION_KEYS: [&str; 7] = [
    keys::SUMMARY,
    keys::SUSPECTED_ROOT_CAUSES,
    keys::IMMEDIATE_ACTIONS,
    keys::MISSING_INFORMATION,
    keys::RUNBOOK_ALIGNMENT,
    keys::COMMS,
    keys::POST_INCIDENT_REPORT,
];
