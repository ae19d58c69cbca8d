//! Oncall Core - Incident Copilot orchestrator
//!
//! Turns one incident envelope into one structured analysis:
//! - Validates the envelope against the incident contract
//! - Redacts secrets before anything leaves the process
//! - Fans out to specialist roles concurrently, each with its own timeout
//! - Assembles and merges their JSON fragments in role priority order
//! - Serves invalid or partial results as degraded instead of failing
//!
//! Mock mode swaps the specialists for canned fixtures keyed by incident id.
//!
//! # Example
//!
//! ```rust,ignore
//! use oncall_core::{CopilotConfig, IncidentCopilot};
//!
//! # async fn example(payload: serde_json::Value) -> Result<(), Box<dyn std::error::Error>> {
//! let config = CopilotConfig::from_env()?.with_mock_mode(true);
//! let copilot = IncidentCopilot::from_config(config)?;
//!
//! let response = copilot.analyze(&payload).await?;
//! let (name, value) = response.header();
//! println!("{name}: {value}");
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod config;
pub mod consistency;
pub mod copilot;
pub mod degradation;
pub mod dispatcher;
pub mod error;
pub mod fixtures;
pub mod http_client;
pub mod prompt;
pub mod redact;
pub mod roster;
pub mod specialist;
pub mod types;

// Re-exports for convenience
pub use config::CopilotConfig;
pub use consistency::check_consistency;
pub use copilot::IncidentCopilot;
pub use degradation::{DegradationPolicy, FinalizedResponse, ResponseStatus, SCHEMA_VALID_HEADER};
pub use dispatcher::{DispatchReport, SpecialistDispatcher, SpecialistRun};
pub use error::{ConfigError, CopilotError, ErrorCategory, FixtureError, RosterError, SpecialistError};
pub use fixtures::{FixtureStore, MockDispatcher, DEFAULT_FIXTURE, MOCK_MODEL};
pub use http_client::ChatCompletionsClient;
pub use prompt::{build_user_message, role_instructions};
pub use redact::{redact, RedactedPrompt, REDACTED};
pub use roster::{Roster, RosterBuilder, RosterEntry, SpecialistRole};
pub use specialist::{SpecialistClient, SpecialistReply};
pub use types::{IncidentEnvelope, Severity, Timeframe};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Oncall Core
    pub use crate::{
        CopilotConfig, CopilotError, FinalizedResponse, FixtureStore, IncidentCopilot,
        ResponseStatus, Roster, SpecialistClient, SpecialistReply, SpecialistRole,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn full_analysis() -> Map<String, Value> {
        let value = json!({
            "summary": {"what_happened": "Elevated 5xx on checkout", "current_status": "ONGOING"},
            "suspected_root_causes": [
                {"hypothesis": "Connection pool exhausted", "evidence": ["pool at 100%"], "confidence": 0.7}
            ],
            "immediate_actions": [
                {"step": "Raise pool size", "owner_role": "SRE", "priority": "P0"}
            ],
            "missing_information": [
                {"question": "Any deploys?", "why_it_matters": "Regression check"}
            ],
            "runbook_alignment": {"matched_steps": [], "gaps": []},
            "comms": {"slack_update": "Investigating", "stakeholder_update": "Investigating"},
            "post_incident_report": {
                "timeline": [{"time": "10:00", "event": "Alert fired"}],
                "customer_impact": "Checkout failures",
                "prevention_actions": ["Pool alerts"]
            }
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn mock_flow_is_complete() {
        let store = FixtureStore::new().with(DEFAULT_FIXTURE, full_analysis());
        let copilot = IncidentCopilot::mock(CopilotConfig::new().with_mock_mode(true), store).unwrap();

        let payload = json!({"incident": {
            "incident_id": "INC-1",
            "title": "Checkout errors",
            "severity": "SEV1",
            "timeframe": {"start": "2024-05-01T10:00:00Z"}
        }});
        let response = copilot.analyze(&payload).await.unwrap();

        assert_eq!(response.status, ResponseStatus::Complete, "{:?}", response.violations);
        assert_eq!(response.body["telemetry"]["selected_model_if_available"], json!(MOCK_MODEL));
        assert_eq!(response.body["telemetry"]["specialists"][0]["status"], json!("mocked"));
    }
}
