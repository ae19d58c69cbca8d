//! Error types for the copilot core
//!
//! Caller faults (bad envelopes) and internal faults (broken contracts,
//! missing fixtures, misconfiguration) are kept apart so a front end can
//! map them to different responses. Specialist failures never surface
//! here; they become gaps in the merged result.

use oncall_composition::RoleId;
use oncall_contract::{ContractError, Violation};
use std::path::PathBuf;
use std::time::Duration;

/// Main copilot error type
#[derive(Debug, thiserror::Error)]
pub enum CopilotError {
    /// Envelope violates the incident contract
    #[error("invalid incident envelope: {} violation(s)", .0.len())]
    InvalidInput(Vec<Violation>),

    /// Envelope passed the contract but could not be decoded
    #[error("incident envelope could not be decoded: {0}")]
    Envelope(#[source] serde_json::Error),

    /// Built-in contract failed to build
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),

    /// Fixture loading or lookup failed
    #[error("fixture error: {0}")]
    Fixture(#[from] FixtureError),

    /// Configuration rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Role/client wiring rejected
    #[error("roster error: {0}")]
    Roster(#[from] RosterError),
}

/// Broad failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request was at fault
    Input,
    /// The process was at fault
    Internal,
}

impl CopilotError {
    /// Failure class
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput(_) | Self::Envelope(_) => ErrorCategory::Input,
            Self::Contract(_) | Self::Fixture(_) | Self::Config(_) | Self::Roster(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Should the caller fix the request
    #[inline]
    #[must_use]
    pub fn is_caller_fault(&self) -> bool {
        self.category() == ErrorCategory::Input
    }

    /// Input violations, if this is an input rejection
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::InvalidInput(violations) => violations,
            _ => &[],
        }
    }
}

/// Fixture errors
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// Fixture directory does not exist
    #[error("fixture directory not found: {}", .path.display())]
    DirectoryMissing {
        /// Configured directory
        path: PathBuf,
    },

    /// Directory could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Fixture file is not valid JSON
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        /// Offending file
        path: PathBuf,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// Fixture file holds something other than an object
    #[error("fixture {} is not a JSON object", .path.display())]
    NotAnObject {
        /// Offending file
        path: PathBuf,
    },

    /// Neither the incident nor the default fixture exists
    #[error("no fixture available for incident '{incident_id}'")]
    NoFixture {
        /// Requested incident
        incident_id: String,
    },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting has an unusable value
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Setting name
        key: String,
        /// Why it was rejected
        reason: String,
    },

    /// Live mode without an endpoint
    #[error("live mode requires an endpoint (set ONCALL_ENDPOINT or use mock mode)")]
    MissingEndpoint,

    /// HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ConfigError {
    /// Rejected setting
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Roster wiring errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    /// Two roles share a name
    #[error("duplicate role: {0}")]
    DuplicateRole(RoleId),

    /// Role has no client and there is no default
    #[error("no specialist client for role: {0}")]
    MissingClient(RoleId),

    /// Override names a role that is not in the roster
    #[error("client override for unknown role: {0}")]
    UnknownRole(RoleId),

    /// No roles at all
    #[error("roster has no roles")]
    Empty,
}

/// Failure of one specialist call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecialistError {
    /// Did not finish in time
    #[error("timed out after {}ms", .after.as_millis())]
    TimedOut {
        /// Configured timeout
        after: Duration,
    },

    /// Connection failure or non-success status
    #[error("transport error: {0}")]
    Transport(String),

    /// Response arrived but carried no usable content
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl SpecialistError {
    /// Was this a timeout
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}
