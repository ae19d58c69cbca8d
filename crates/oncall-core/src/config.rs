//! Copilot configuration
//!
//! Layered: defaults, then an optional TOML file, then environment
//! variables. Command-line overrides are applied by the binary through
//! the `with_*` builders.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Dispatch configuration name reported in telemetry
pub const ENV_DEPLOYMENT: &str = "MODEL_ROUTER_DEPLOYMENT";
/// `true`/`false`: serve canned fixtures instead of calling specialists
pub const ENV_MOCK_MODE: &str = "MOCK_MODE";
/// Fixture directory
pub const ENV_FIXTURES_DIR: &str = "ONCALL_FIXTURES_DIR";
/// Per-specialist timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "ONCALL_SPECIALIST_TIMEOUT_SECS";
/// Chat-completions endpoint URL
pub const ENV_ENDPOINT: &str = "ONCALL_ENDPOINT";
/// Bearer token for the endpoint
pub const ENV_API_KEY: &str = "ONCALL_API_KEY";

/// Copilot configuration
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopilotConfig {
    /// Name of the dispatch configuration
    pub model_router_deployment: String,
    /// Serve fixtures instead of live specialists
    pub mock_mode: bool,
    /// Directory of canned outputs
    pub fixtures_dir: PathBuf,
    /// Per-specialist timeout
    pub specialist_timeout_secs: u64,
    /// Chat-completions endpoint
    pub endpoint: Option<String>,
    /// Bearer token; never serialized or printed
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Sampling temperature passed to specialists
    pub temperature: f32,
}

impl CopilotConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With deployment name
    #[inline]
    #[must_use]
    pub fn with_deployment(mut self, name: impl Into<String>) -> Self {
        self.model_router_deployment = name.into();
        self
    }

    /// With mock mode
    #[inline]
    #[must_use]
    pub fn with_mock_mode(mut self, enabled: bool) -> Self {
        self.mock_mode = enabled;
        self
    }

    /// With fixture directory
    #[inline]
    #[must_use]
    pub fn with_fixtures_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixtures_dir = dir.into();
        self
    }

    /// With specialist timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.specialist_timeout_secs = secs;
        self
    }

    /// With endpoint
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// With API key
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Per-specialist timeout as a duration
    #[inline]
    #[must_use]
    pub fn specialist_timeout(&self) -> Duration {
        Duration::from_secs(self.specialist_timeout_secs)
    }

    /// Parse a TOML document over the defaults
    ///
    /// # Errors
    /// [`ConfigError::Parse`] on malformed TOML or mistyped keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Defaults, then `path` (if given), then the process environment
    ///
    /// # Errors
    /// File, parse, environment, or validation failures.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        base.apply_env(|key| std::env::var(key).ok())?.validated()
    }

    /// Defaults overlaid with the process environment
    ///
    /// # Errors
    /// Environment or validation failures.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Overlay environment values obtained through `lookup`
    ///
    /// # Errors
    /// [`ConfigError::InvalidValue`] for unparseable values.
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(name) = lookup(ENV_DEPLOYMENT) {
            self.model_router_deployment = name;
        }
        if let Some(flag) = lookup(ENV_MOCK_MODE) {
            self.mock_mode = parse_flag(ENV_MOCK_MODE, &flag)?;
        }
        if let Some(dir) = lookup(ENV_FIXTURES_DIR) {
            self.fixtures_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            self.specialist_timeout_secs = secs
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_TIMEOUT_SECS, format!("'{secs}' is not a whole number of seconds")))?;
        }
        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|e| !e.trim().is_empty()) {
            self.endpoint = Some(endpoint);
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
        Ok(self)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// [`ConfigError::InvalidValue`] naming the first bad setting.
    pub fn validated(self) -> Result<Self, ConfigError> {
        if self.model_router_deployment.trim().is_empty() {
            return Err(ConfigError::invalid("model_router_deployment", "must not be empty"));
        }
        if self.specialist_timeout_secs == 0 {
            return Err(ConfigError::invalid("specialist_timeout_secs", "must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::invalid("temperature", "must be within [0, 2]"));
        }
        Ok(self)
    }
}

impl Default for CopilotConfig {
    fn default() -> Self {
        Self {
            model_router_deployment: "model-router".to_string(),
            mock_mode: false,
            fixtures_dir: PathBuf::from("fixtures/golden"),
            specialist_timeout_secs: 120,
            endpoint: None,
            api_key: None,
            temperature: 0.2,
        }
    }
}

impl fmt::Debug for CopilotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopilotConfig")
            .field("model_router_deployment", &self.model_router_deployment)
            .field("mock_mode", &self.mock_mode)
            .field("fixtures_dir", &self.fixtures_dir)
            .field("specialist_timeout_secs", &self.specialist_timeout_secs)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("temperature", &self.temperature)
            .finish()
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(key, format!("'{other}' is not a boolean"))),
    }
}
