//! Process-computed telemetry
//!
//! Built only from dispatch bookkeeping. Whatever a specialist writes
//! under the `telemetry` key is thrown away when this record is stamped.

use crate::role::RoleId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::ops::{Add, AddAssign};

/// Prompt and completion token counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    /// Tokens sent
    pub prompt_tokens: u64,
    /// Tokens generated
    pub completion_tokens: u64,
}

impl TokenUsage {
    /// Create usage
    #[inline]
    #[must_use]
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    /// Rough estimate from text lengths (four bytes per token)
    #[must_use]
    pub fn estimate(prompt: &str, completion: &str) -> Self {
        Self::new(prompt.len() as u64 / 4, completion.len() as u64 / 4)
    }

    /// Sum of both counts
    #[inline]
    #[must_use]
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

impl Add for TokenUsage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.prompt_tokens.saturating_add(rhs.prompt_tokens),
            self.completion_tokens.saturating_add(rhs.completion_tokens),
        )
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Terminal state of one specialist in one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialistStatus {
    /// Returned text
    Ok,
    /// Transport or response failure
    Failed,
    /// Exceeded its timeout
    TimedOut,
    /// Served from fixtures
    Mocked,
}

impl SpecialistStatus {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Mocked => "mocked",
        }
    }

    /// Did the specialist contribute text
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok | Self::Mocked)
    }
}

impl fmt::Display for SpecialistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-role telemetry entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialistTelemetry {
    /// Role
    pub role: RoleId,
    /// Terminal state
    pub status: SpecialistStatus,
    /// Model reported by the collaborator
    pub model: Option<String>,
    /// Objects recovered from the role's text
    pub fragments: usize,
    /// Failure description
    pub error: Option<String>,
}

impl SpecialistTelemetry {
    /// Successful role
    #[must_use]
    pub fn ok(role: RoleId, model: Option<String>, fragments: usize) -> Self {
        Self {
            role,
            status: SpecialistStatus::Ok,
            model,
            fragments,
            error: None,
        }
    }

    /// Failed role
    #[must_use]
    pub fn failed(role: RoleId, status: SpecialistStatus, error: impl Into<String>) -> Self {
        Self {
            role,
            status,
            model: None,
            fragments: 0,
            error: Some(error.into()),
        }
    }

    fn to_value(&self) -> Value {
        json!({
            "role": self.role.as_str(),
            "status": self.status.as_str(),
            "model": self.model,
            "fragments": self.fragments,
            "error": self.error,
        })
    }
}

/// The `telemetry` object stamped onto every merged result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Request correlation id
    pub correlation_id: String,
    /// Name of the dispatch configuration
    pub model_router_deployment: String,
    /// Model of the highest-priority role that reported one
    pub selected_model_if_available: Option<String>,
    /// Summed usage, if any role reported it
    pub tokens_if_available: Option<TokenUsage>,
    /// One entry per dispatched role, in priority order
    pub specialists: Vec<SpecialistTelemetry>,
}

impl TelemetryRecord {
    /// Empty record for one request
    #[must_use]
    pub fn new(correlation_id: impl Into<String>, model_router_deployment: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            model_router_deployment: model_router_deployment.into(),
            selected_model_if_available: None,
            tokens_if_available: None,
            specialists: Vec::new(),
        }
    }

    /// Add one role's bookkeeping
    ///
    /// Call in role priority order: the first reported model becomes the
    /// selected model.
    pub fn record(&mut self, entry: SpecialistTelemetry, usage: Option<TokenUsage>) {
        if self.selected_model_if_available.is_none() {
            self.selected_model_if_available.clone_from(&entry.model);
        }
        if let Some(usage) = usage {
            *self.tokens_if_available.get_or_insert_with(TokenUsage::default) += usage;
        }
        self.specialists.push(entry);
    }

    /// Builder form of [`record`](Self::record)
    #[must_use]
    pub fn with(mut self, entry: SpecialistTelemetry, usage: Option<TokenUsage>) -> Self {
        self.record(entry, usage);
        self
    }

    /// Roles that contributed nothing
    pub fn failed_roles(&self) -> impl Iterator<Item = &RoleId> {
        self.specialists
            .iter()
            .filter(|s| !s.status.is_success())
            .map(|s| &s.role)
    }

    /// JSON form, as stamped into the merged result
    #[must_use]
    pub fn to_value(&self) -> Value {
        let tokens = self.tokens_if_available.map(|t| {
            json!({
                "prompt_tokens": t.prompt_tokens,
                "completion_tokens": t.completion_tokens,
            })
        });
        let specialists: Vec<Value> = self.specialists.iter().map(SpecialistTelemetry::to_value).collect();

        json!({
            "correlation_id": self.correlation_id,
            "model_router_deployment": self.model_router_deployment,
            "selected_model_if_available": self.selected_model_if_available,
            "tokens_if_available": tokens,
            "specialists": specialists,
        })
    }
}
