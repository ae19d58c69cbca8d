//! Built-in contracts for the incident envelope and the merged analysis
//!
//! Both are assembled at startup through [`BuiltinContracts::load`]; a
//! failure there is a defect in this file, not in any request.

use crate::contract::{Contract, Shape};
use crate::error::ContractError;

/// Top-level keys of the incident envelope
pub mod incident_keys {
    /// Unique incident identifier
    pub const INCIDENT_ID: &str = "incident_id";
    /// Short title
    pub const TITLE: &str = "title";
    /// `SEV1`..`SEV4`
    pub const SEVERITY: &str = "severity";
    /// `{start, end}`
    pub const TIMEFRAME: &str = "timeframe";
}

/// Top-level keys of the merged analysis
pub mod keys {
    /// What happened and current status
    pub const SUMMARY: &str = "summary";
    /// Root-cause hypotheses
    pub const SUSPECTED_ROOT_CAUSES: &str = "suspected_root_causes";
    /// Next steps with owners
    pub const IMMEDIATE_ACTIONS: &str = "immediate_actions";
    /// Open questions
    pub const MISSING_INFORMATION: &str = "missing_information";
    /// Runbook match and gaps
    pub const RUNBOOK_ALIGNMENT: &str = "runbook_alignment";
    /// Communication drafts
    pub const COMMS: &str = "comms";
    /// Post-incident report fields
    pub const POST_INCIDENT_REPORT: &str = "post_incident_report";
    /// Reserved, always computed by the core
    pub const TELEMETRY: &str = "telemetry";
}

/// Allowed severities, most severe first
pub const SEVERITIES: [&str; 4] = ["SEV1", "SEV2", "SEV3", "SEV4"];

/// Allowed action priorities
pub const PRIORITIES: [&str; 4] = ["P0", "P1", "P2", "P3"];

/// Allowed per-specialist telemetry statuses
pub const SPECIALIST_STATUSES: [&str; 4] = ["ok", "failed", "timed_out", "mocked"];

/// Contract for the inbound incident envelope
///
/// # Errors
/// Only if this definition is malformed.
pub fn incident_contract() -> Result<Contract, ContractError> {
    let timeframe = Contract::builder("timeframe")
        .required("start", Shape::timestamp())
        .nullable("end", Shape::timestamp())
        .build()?;

    let alert = Contract::builder("alert")
        .optional("name", Shape::string())
        .optional("description", Shape::string())
        .optional("timestamp", Shape::timestamp())
        .build()?;

    let log = Contract::builder("log")
        .optional("source", Shape::string())
        .optional("lines", Shape::array_of(Shape::string()))
        .build()?;

    let metric = Contract::builder("metric")
        .optional("name", Shape::string())
        .optional("window", Shape::string())
        .optional("values_summary", Shape::string())
        .build()?;

    let constraints = Contract::builder("constraints")
        .optional("max_time_minutes", Shape::integer())
        .optional("environment", Shape::string())
        .optional("region", Shape::string())
        .build()?;

    Contract::builder("incident")
        .required(incident_keys::INCIDENT_ID, Shape::string())
        .required(incident_keys::TITLE, Shape::string())
        .required(incident_keys::SEVERITY, Shape::one_of(SEVERITIES))
        .required(incident_keys::TIMEFRAME, Shape::object(timeframe))
        .optional("alerts", Shape::array_of(Shape::object(alert)))
        .optional("logs", Shape::array_of(Shape::object(log)))
        .optional("metrics", Shape::array_of(Shape::object(metric)))
        .optional("runbook_excerpt", Shape::string())
        .optional("constraints", Shape::object(constraints))
        .build()
}

/// Contract for the merged analysis returned to callers
///
/// # Errors
/// Only if this definition is malformed.
pub fn analysis_contract() -> Result<Contract, ContractError> {
    let strings = || Shape::array_of(Shape::string());

    let summary = Contract::builder("summary")
        .required("what_happened", Shape::string())
        .required("current_status", Shape::string())
        .build()?;

    let root_cause = Contract::builder("root_cause")
        .required("hypothesis", Shape::string())
        .required("evidence", strings())
        .required("confidence", Shape::number_in(0.0, 1.0))
        .build()?;

    let action = Contract::builder("action")
        .required("step", Shape::string())
        .required("owner_role", Shape::string())
        .required("priority", Shape::one_of(PRIORITIES))
        .build()?;

    let question = Contract::builder("question")
        .required("question", Shape::string())
        .required("why_it_matters", Shape::string())
        .build()?;

    let runbook = Contract::builder("runbook_alignment")
        .required("matched_steps", strings())
        .required("gaps", strings())
        .build()?;

    let comms = Contract::builder("comms")
        .required("slack_update", Shape::string())
        .required("stakeholder_update", Shape::string())
        .build()?;

    let timeline_entry = Contract::builder("timeline_entry")
        .optional("time", Shape::string())
        .optional("event", Shape::string())
        .build()?;

    let pir = Contract::builder("post_incident_report")
        .required("timeline", Shape::array_of(Shape::object(timeline_entry)))
        .required("customer_impact", Shape::string())
        .required("prevention_actions", strings())
        .build()?;

    let tokens = Contract::builder("tokens")
        .optional("prompt_tokens", Shape::integer_at_least(0.0))
        .optional("completion_tokens", Shape::integer_at_least(0.0))
        .build()?;

    let specialist = Contract::builder("specialist")
        .required("role", Shape::string())
        .required("status", Shape::one_of(SPECIALIST_STATUSES))
        .nullable("model", Shape::string())
        .optional("fragments", Shape::integer_at_least(0.0))
        .nullable("error", Shape::string())
        .build()?;

    let telemetry = Contract::builder("telemetry")
        .required("correlation_id", Shape::string())
        .required("model_router_deployment", Shape::string())
        .nullable("selected_model_if_available", Shape::string())
        .nullable("tokens_if_available", Shape::object(tokens))
        .optional("specialists", Shape::array_of(Shape::object(specialist)))
        .build()?;

    Contract::builder("analysis")
        .required(keys::SUMMARY, Shape::object(summary))
        .required(keys::SUSPECTED_ROOT_CAUSES, Shape::array_of(Shape::object(root_cause)))
        .required(keys::IMMEDIATE_ACTIONS, Shape::array_of(Shape::object(action)))
        .required(keys::MISSING_INFORMATION, Shape::array_of(Shape::object(question)))
        .required(keys::RUNBOOK_ALIGNMENT, Shape::object(runbook))
        .required(keys::COMMS, Shape::object(comms))
        .required(keys::POST_INCIDENT_REPORT, Shape::object(pir))
        .required(keys::TELEMETRY, Shape::object(telemetry))
        .build()
}

/// Both built-in contracts, built once
#[derive(Debug, Clone)]
pub struct BuiltinContracts {
    /// Inbound incident envelope
    pub incident: Contract,
    /// Outbound merged analysis
    pub analysis: Contract,
}

impl BuiltinContracts {
    /// Build both contracts
    ///
    /// # Errors
    /// Returns the first [`ContractError`] hit; this indicates a defect in
    /// the contract definitions.
    pub fn load() -> Result<Self, ContractError> {
        Ok(Self {
            incident: incident_contract()?,
            analysis: analysis_contract()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_contracts_build() {
        let contracts = BuiltinContracts::load().unwrap();
        assert_eq!(contracts.incident.name(), "incident");
        assert_eq!(contracts.analysis.name(), "analysis");
    }

    #[test]
    fn incident_required_keys() {
        let contract = incident_contract().unwrap();
        let required: Vec<_> = contract.required_keys().collect();
        assert_eq!(required, vec!["incident_id", "title", "severity", "timeframe"]);
    }

    #[test]
    fn analysis_required_keys_cover_every_section() {
        let contract = analysis_contract().unwrap();
        let required: Vec<_> = contract.required_keys().collect();
        assert_eq!(
            required,
            vec![
                keys::SUMMARY,
                keys::SUSPECTED_ROOT_CAUSES,
                keys::IMMEDIATE_ACTIONS,
                keys::MISSING_INFORMATION,
                keys::RUNBOOK_ALIGNMENT,
                keys::COMMS,
                keys::POST_INCIDENT_REPORT,
                keys::TELEMETRY,
            ]
        );
    }
}
