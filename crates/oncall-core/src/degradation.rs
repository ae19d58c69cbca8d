//! Serve-or-flag decision for merged results
//!
//! Output problems never turn into errors. A merged result that fails
//! the analysis contract, contradicts the incident, or lacks a role's
//! contribution is returned as-is and marked degraded.

use oncall_composition::{MergedResult, RoleId};
use oncall_contract::{keys, validate, Contract, Violation};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Header carrying the validity marker
pub const SCHEMA_VALID_HEADER: &str = "X-Schema-Valid";

/// Whether the response fully meets the output contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// Valid and every role contributed
    Complete,
    /// Best effort
    Degraded,
}

impl ResponseStatus {
    /// Value for [`SCHEMA_VALID_HEADER`]
    #[inline]
    #[must_use]
    pub fn header_value(&self) -> &'static str {
        match self {
            Self::Complete => "true",
            Self::Degraded => "false",
        }
    }

    /// Is this a complete response
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEMA_VALID_HEADER}: {}", self.header_value())
    }
}

/// Response body plus its validity marker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalizedResponse {
    /// Merged analysis, untouched
    pub body: Value,
    /// Marker
    pub status: ResponseStatus,
    /// Output violations (empty when complete)
    pub violations: Vec<Violation>,
    /// Roles that contributed nothing
    pub missing_roles: Vec<RoleId>,
}

impl FinalizedResponse {
    /// `(header name, header value)`
    #[inline]
    #[must_use]
    pub fn header(&self) -> (&'static str, &'static str) {
        (SCHEMA_VALID_HEADER, self.status.header_value())
    }

    /// Correlation id from the stamped telemetry
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.body
            .get(keys::TELEMETRY)
            .and_then(|t| t.get("correlation_id"))
            .and_then(Value::as_str)
    }
}

/// Output validation and degradation
#[derive(Debug, Clone)]
pub struct DegradationPolicy {
    contract: Contract,
}

impl DegradationPolicy {
    /// Policy validating against `contract`
    #[inline]
    #[must_use]
    pub fn new(contract: Contract) -> Self {
        Self { contract }
    }

    /// Contract in use
    #[inline]
    #[must_use]
    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    /// Validate and mark
    ///
    /// `extra` carries violations found outside the contract (consistency
    /// checks). `missing_roles` are dispatch gaps. Either one, or any
    /// contract violation, makes the response degraded.
    #[must_use]
    pub fn finalize(
        &self,
        merged: MergedResult,
        extra: Vec<Violation>,
        missing_roles: Vec<RoleId>,
    ) -> FinalizedResponse {
        let body = merged.into_value();
        let violations = validate(&body, &self.contract).with(extra).into_violations();

        let status = if violations.is_empty() && missing_roles.is_empty() {
            ResponseStatus::Complete
        } else {
            warn!(
                violations = violations.len(),
                missing_roles = ?missing_roles.iter().map(RoleId::as_str).collect::<Vec<_>>(),
                "Serving degraded response"
            );
            for violation in &violations {
                warn!(%violation, "Output violation");
            }
            ResponseStatus::Degraded
        };

        FinalizedResponse {
            body,
            status,
            violations,
            missing_roles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oncall_composition::{Fragment, TelemetryRecord};
    use oncall_contract::{Shape, ViolationKind};
    use serde_json::json;

    fn policy() -> DegradationPolicy {
        DegradationPolicy::new(
            Contract::builder("out")
                .required("a", Shape::string())
                .required("telemetry", Shape::any())
                .build()
                .unwrap(),
        )
    }

    fn merged(value: Value) -> MergedResult {
        let Value::Object(map) = value else { unreachable!() };
        let mut merged = MergedResult::merge_all([Fragment::new("r".into(), 0, map)]);
        merged.stamp(&TelemetryRecord::new("c", "d"));
        merged
    }

    #[test]
    fn valid_result_is_complete_and_unchanged() {
        let result = merged(json!({"a": "x"}));
        let expected = result.clone().into_value();

        let response = policy().finalize(result, vec![], vec![]);
        assert_eq!(response.status, ResponseStatus::Complete);
        assert_eq!(response.body, expected);
        assert_eq!(response.header(), ("X-Schema-Valid", "true"));
        assert_eq!(response.correlation_id(), Some("c"));
    }

    #[test]
    fn invalid_result_is_served_degraded() {
        let response = policy().finalize(merged(json!({"a": 5, "b": 1})), vec![], vec![]);

        assert_eq!(response.status, ResponseStatus::Degraded);
        assert_eq!(response.body["b"], json!(1));
        assert_eq!(response.violations.len(), 1);
        assert_eq!(response.status.header_value(), "false");
    }

    #[test]
    fn gaps_alone_degrade() {
        let response = policy().finalize(merged(json!({"a": "x"})), vec![], vec![RoleId::new("pir")]);
        assert_eq!(response.status, ResponseStatus::Degraded);
        assert!(response.violations.is_empty());
    }

    #[test]
    fn extra_violations_are_appended() {
        let extra = Violation::new("a", ViolationKind::Inconsistent { reason: "r".into() });
        let response = policy().finalize(merged(json!({"a": "x"})), vec![extra.clone()], vec![]);
        assert_eq!(response.violations, vec![extra]);
        assert!(!response.status.is_complete());
    }

    #[test]
    fn empty_merge_still_yields_a_body() {
        let response = policy().finalize(MergedResult::new(), vec![], vec![]);
        assert_eq!(response.status, ResponseStatus::Degraded);
        assert!(response.body.is_object());
    }
}
