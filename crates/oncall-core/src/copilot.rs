//! Incident Copilot orchestrator
//!
//! Takes one incident envelope through the whole pipeline:
//! - Validates it against the incident contract (rejecting on failure)
//! - Redacts the prompt and fans out to every specialist role
//! - Recovers JSON fragments from each role's text
//! - Merges them in role priority order and stamps telemetry
//! - Checks consistency and marks the result complete or degraded

use crate::consistency::check_consistency;
use crate::config::CopilotConfig;
use crate::degradation::{DegradationPolicy, FinalizedResponse};
use crate::dispatcher::{DispatchReport, SpecialistDispatcher};
use crate::error::CopilotError;
use crate::fixtures::{FixtureStore, MockDispatcher};
use crate::http_client::ChatCompletionsClient;
use crate::prompt::build_user_message;
use crate::redact::RedactedPrompt;
use crate::roster::{Roster, SpecialistRole};
use crate::types::IncidentEnvelope;
use oncall_composition::{extract_fragments, ResultMerger, SpecialistTelemetry, TelemetryRecord};
use oncall_contract::{validate, BuiltinContracts};
use serde_json::Value;
use std::sync::Arc;
use tracing::{field, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

/// Where specialist text comes from
#[derive(Debug)]
enum Backend {
    Live(SpecialistDispatcher),
    Mock(MockDispatcher),
}

/// The orchestrator
///
/// Holds no per-request state; one instance serves any number of
/// concurrent `analyze` calls.
#[derive(Debug)]
pub struct IncidentCopilot {
    config: CopilotConfig,
    contracts: BuiltinContracts,
    backend: Backend,
    merger: ResultMerger,
    policy: DegradationPolicy,
}

impl IncidentCopilot {
    /// Copilot that calls the roster's collaborators
    ///
    /// # Errors
    /// Fails only if the built-in contracts do not build.
    pub fn live(config: CopilotConfig, roster: Roster) -> Result<Self, CopilotError> {
        let contracts = BuiltinContracts::load()?;
        Ok(Self::live_with(config, contracts, roster))
    }

    /// Copilot that serves canned fixtures for the built-in roles
    ///
    /// # Errors
    /// Fails only if the built-in contracts do not build.
    pub fn mock(config: CopilotConfig, store: FixtureStore) -> Result<Self, CopilotError> {
        let contracts = BuiltinContracts::load()?;
        let roles = SpecialistRole::builtin(&contracts.analysis);
        let merger = ResultMerger::new(roles.iter().map(|r| r.id.clone()));
        let backend = Backend::Mock(MockDispatcher::new(store, roles));
        Ok(Self::assemble(config, contracts, backend, merger))
    }

    /// Build from configuration alone
    ///
    /// Mock mode loads `fixtures_dir`; live mode wires the built-in roles
    /// to a chat-completions client at `endpoint`.
    ///
    /// # Errors
    /// Missing fixture directory, missing endpoint, or an HTTP client
    /// that cannot be built.
    pub fn from_config(config: CopilotConfig) -> Result<Self, CopilotError> {
        if config.mock_mode {
            let store = FixtureStore::load_dir(&config.fixtures_dir)?;
            return Self::mock(config, store);
        }

        let contracts = BuiltinContracts::load()?;
        let client = ChatCompletionsClient::from_config(&config)?;
        let roster = Roster::builder()
            .roles(SpecialistRole::builtin(&contracts.analysis))
            .default_client(Arc::new(client))
            .build()?;
        Ok(Self::live_with(config, contracts, roster))
    }

    fn live_with(config: CopilotConfig, contracts: BuiltinContracts, roster: Roster) -> Self {
        let merger = ResultMerger::new(roster.priority());
        let dispatcher = SpecialistDispatcher::new(roster, config.specialist_timeout());
        Self::assemble(config, contracts, Backend::Live(dispatcher), merger)
    }

    fn assemble(
        config: CopilotConfig,
        contracts: BuiltinContracts,
        backend: Backend,
        merger: ResultMerger,
    ) -> Self {
        let policy = DegradationPolicy::new(contracts.analysis.clone());
        Self {
            config,
            contracts,
            backend,
            merger,
            policy,
        }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &CopilotConfig {
        &self.config
    }

    /// Incident and analysis contracts
    #[inline]
    #[must_use]
    pub fn contracts(&self) -> &BuiltinContracts {
        &self.contracts
    }

    /// Serving fixtures instead of calling collaborators
    #[inline]
    #[must_use]
    pub fn is_mock(&self) -> bool {
        matches!(self.backend, Backend::Mock(_))
    }

    /// Analyse one incident under a fresh correlation id
    ///
    /// # Errors
    /// [`CopilotError::InvalidInput`] when the envelope breaks the
    /// incident contract; [`CopilotError::Fixture`] in mock mode when no
    /// fixture matches. Specialist failures are never errors.
    pub async fn analyze(&self, payload: &Value) -> Result<FinalizedResponse, CopilotError> {
        self.analyze_with_id(payload, Uuid::new_v4().to_string()).await
    }

    /// Analyse one incident under a caller-chosen correlation id
    ///
    /// # Errors
    /// See [`analyze`](Self::analyze).
    pub async fn analyze_with_id(
        &self,
        payload: &Value,
        correlation_id: String,
    ) -> Result<FinalizedResponse, CopilotError> {
        let span = info_span!("analyze", correlation_id = %correlation_id, incident_id = field::Empty);
        self.run(payload, correlation_id).instrument(span).await
    }

    async fn run(&self, payload: &Value, correlation_id: String) -> Result<FinalizedResponse, CopilotError> {
        let raw = IncidentEnvelope::unwrap_payload(payload);

        let outcome = validate(raw, &self.contracts.incident);
        if !outcome.is_valid() {
            for violation in outcome.violations() {
                warn!(%violation, "Input violation");
            }
            return Err(CopilotError::InvalidInput(outcome.into_violations()));
        }
        let incident = IncidentEnvelope::from_value(raw).map_err(CopilotError::Envelope)?;

        Span::current().record("incident_id", incident.incident_id.as_str());
        info!(
            severity = %incident.severity,
            closed = incident.is_closed(),
            mock = self.is_mock(),
            "Incident accepted"
        );

        let message = build_user_message(raw);
        let report = match &self.backend {
            Backend::Mock(mock) => mock.dispatch(&incident.incident_id, &message)?,
            Backend::Live(dispatcher) => dispatcher.dispatch(&RedactedPrompt::new(&message)).await,
        };

        let response = self.assemble_response(&incident, report, correlation_id);
        info!(
            status = ?response.status,
            violations = response.violations.len(),
            missing_roles = response.missing_roles.len(),
            "Analysis finished"
        );
        Ok(response)
    }

    fn assemble_response(
        &self,
        incident: &IncidentEnvelope,
        report: DispatchReport,
        correlation_id: String,
    ) -> FinalizedResponse {
        let gaps = report.gaps();
        let mut telemetry = TelemetryRecord::new(correlation_id, &self.config.model_router_deployment);
        let mut fragments = Vec::new();

        for run in report.into_runs() {
            let status = run.status();
            match run.outcome {
                Ok(reply) => {
                    let found = extract_fragments(&run.role, &reply.text);
                    let entry = SpecialistTelemetry {
                        status,
                        ..SpecialistTelemetry::ok(run.role, reply.model, found.len())
                    };
                    telemetry.record(entry, reply.usage);
                    fragments.extend(found);
                }
                Err(error) => {
                    telemetry.record(SpecialistTelemetry::failed(run.role, status, error.to_string()), None);
                }
            }
        }

        let merged = self.merger.merge_stamped(fragments, &telemetry);
        let inconsistencies = check_consistency(incident, merged.body());
        self.policy.finalize(merged, inconsistencies, gaps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpecialistError;
    use crate::specialist::{MockSpecialistClient, SpecialistReply};
    use oncall_composition::RoleId;
    use serde_json::json;

    fn incident() -> Value {
        json!({
            "incident_id": "INC-7",
            "title": "Checkout errors",
            "severity": "SEV2",
            "timeframe": {"start": "2024-05-01T10:00:00Z", "end": null},
            "logs": [{"source": "api", "lines": ["db password=hunter2 rejected"]}]
        })
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_collaborators() {
        let mut mock = MockSpecialistClient::new();
        mock.expect_call().never();
        let roster = Roster::builder()
            .role(SpecialistRole::new("a", vec![], ""))
            .default_client(Arc::new(mock))
            .build()
            .unwrap();
        let copilot = IncidentCopilot::live(CopilotConfig::new(), roster).unwrap();

        let err = copilot.analyze(&json!({"title": "no id"})).await.unwrap_err();
        assert!(err.is_caller_fault());
        assert!(err.violations().iter().any(|v| v.path == "incident_id"));
    }

    #[tokio::test]
    async fn collaborators_only_see_redacted_prompts() {
        let mut mock = MockSpecialistClient::new();
        mock.expect_call()
            .withf(|_, prompt| !prompt.as_str().contains("hunter2") && prompt.as_str().contains("INC-7"))
            .times(1)
            .returning(|_, _| Ok(SpecialistReply::text(r#"{"comms": {}}"#).with_model("m-1")));
        let roster = Roster::builder()
            .role(SpecialistRole::new("comms", vec!["comms"], ""))
            .default_client(Arc::new(mock))
            .build()
            .unwrap();
        let copilot = IncidentCopilot::live(CopilotConfig::new(), roster).unwrap();

        let response = copilot.analyze_with_id(&incident(), "corr-1".into()).await.unwrap();

        assert_eq!(response.correlation_id(), Some("corr-1"));
        assert_eq!(response.body["telemetry"]["selected_model_if_available"], json!("m-1"));
        assert!(!response.status.is_complete());
    }

    #[tokio::test]
    async fn failed_roles_are_recorded_in_telemetry() {
        let mut mock = MockSpecialistClient::new();
        mock.expect_call()
            .returning(|_, _| Err(SpecialistError::Transport("connection reset".into())));
        let roster = Roster::builder()
            .role(SpecialistRole::new("pir", vec!["post_incident_report"], ""))
            .default_client(Arc::new(mock))
            .build()
            .unwrap();
        let copilot = IncidentCopilot::live(CopilotConfig::new(), roster).unwrap();

        let response = copilot.analyze(&incident()).await.unwrap();

        assert_eq!(response.missing_roles, vec![RoleId::new("pir")]);
        let entry = &response.body["telemetry"]["specialists"][0];
        assert_eq!(entry["status"], json!("failed"));
        assert_eq!(entry["error"], json!("transport error: connection reset"));
    }

    #[test]
    fn from_config_requires_endpoint_in_live_mode() {
        let err = IncidentCopilot::from_config(CopilotConfig::new()).unwrap_err();
        assert!(matches!(err, CopilotError::Config(_)));
        assert!(!err.is_caller_fault());
    }

    #[test]
    fn from_config_requires_fixture_dir_in_mock_mode() {
        let dir = tempfile::tempdir().unwrap();
        let config = CopilotConfig::new()
            .with_mock_mode(true)
            .with_fixtures_dir(dir.path().join("missing"));
        assert!(matches!(IncidentCopilot::from_config(config), Err(CopilotError::Fixture(_))));
    }
}
