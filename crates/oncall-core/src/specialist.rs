//! Specialist collaborator seam
//!
//! A specialist takes role instructions and the redacted prompt and
//! returns text that is usually, but not reliably, JSON.

use crate::error::SpecialistError;
use crate::redact::RedactedPrompt;
use async_trait::async_trait;
use oncall_composition::TokenUsage;

/// What a specialist sent back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialistReply {
    /// Raw response text
    pub text: String,
    /// Model that actually served the call
    pub model: Option<String>,
    /// Token usage, when reported
    pub usage: Option<TokenUsage>,
}

impl SpecialistReply {
    /// Reply with text only
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
            usage: None,
        }
    }

    /// With reported model
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// With reported usage
    #[inline]
    #[must_use]
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Specialist collaborator
///
/// Implementations must be cancel-safe: the dispatcher drops in-flight
/// calls when the request is abandoned.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpecialistClient: Send + Sync {
    /// Run one analysis
    async fn call(
        &self,
        instructions: &str,
        prompt: &RedactedPrompt,
    ) -> Result<SpecialistReply, SpecialistError>;
}
