//! OpenAI-compatible chat-completions client
//!
//! One request per call, no retries. Timeouts are enforced by the
//! dispatcher, not here.

use crate::config::CopilotConfig;
use crate::error::{ConfigError, SpecialistError};
use crate::redact::RedactedPrompt;
use crate::specialist::{SpecialistClient, SpecialistReply};
use async_trait::async_trait;
use oncall_composition::TokenUsage;
use serde::Deserialize;
use serde_json::json;
use std::fmt;

/// Chat-completions specialist client
#[derive(Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    deployment: String,
    temperature: f32,
}

impl ChatCompletionsClient {
    /// Create client for `endpoint`, requesting model `deployment`
    ///
    /// # Errors
    /// [`ConfigError::Client`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, deployment: impl Into<String>) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("oncall-copilot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ConfigError::Client)?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: None,
            deployment: deployment.into(),
            temperature: 0.2,
        })
    }

    /// Build from configuration
    ///
    /// # Errors
    /// [`ConfigError::MissingEndpoint`] without an endpoint.
    pub fn from_config(config: &CopilotConfig) -> Result<Self, ConfigError> {
        let endpoint = config.endpoint.clone().ok_or(ConfigError::MissingEndpoint)?;
        let mut client = Self::new(endpoint, config.model_router_deployment.clone())?
            .with_temperature(config.temperature);
        client.api_key.clone_from(&config.api_key);
        Ok(client)
    }

    /// With bearer token
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// With sampling temperature
    #[inline]
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn request_body(&self, instructions: &str, prompt: &RedactedPrompt) -> serde_json::Value {
        json!({
            "model": self.deployment,
            "messages": [
                {"role": "system", "content": instructions},
                {"role": "user", "content": prompt.as_str()},
            ],
            "temperature": self.temperature,
            "response_format": {"type": "json_object"},
        })
    }
}

impl fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .field("authenticated", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SpecialistClient for ChatCompletionsClient {
    async fn call(
        &self,
        instructions: &str,
        prompt: &RedactedPrompt,
    ) -> Result<SpecialistReply, SpecialistError> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&self.request_body(instructions, prompt));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SpecialistError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SpecialistError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(SpecialistError::Transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate(&body, 200)
            )));
        }
        parse_completion(&body)
    }
}

#[derive(Deserialize)]
struct Completion {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<Message>,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

/// Extract text, model and usage from a chat-completions response body
///
/// # Errors
/// [`SpecialistError::MalformedResponse`] when the body is not a
/// completion or carries no message content.
pub fn parse_completion(body: &str) -> Result<SpecialistReply, SpecialistError> {
    let completion: Completion = serde_json::from_str(body)
        .map_err(|e| SpecialistError::MalformedResponse(format!("not a completion: {e}")))?;

    let text = completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| SpecialistError::MalformedResponse("no message content".to_string()))?;

    Ok(SpecialistReply {
        text,
        model: completion.model,
        usage: completion.usage,
    })
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_model_and_usage() {
        let body = r#"{
            "id": "cmpl-1",
            "model": "gpt-4o-mini-2024",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"summary\": {}}"}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150}
        }"#;

        let reply = parse_completion(body).unwrap();
        assert_eq!(reply.text, r#"{"summary": {}}"#);
        assert_eq!(reply.model.as_deref(), Some("gpt-4o-mini-2024"));
        assert_eq!(reply.usage, Some(TokenUsage::new(120, 30)));
    }

    #[test]
    fn missing_content_is_malformed() {
        for body in [
            r#"{"choices": []}"#,
            r#"{"choices": [{"message": {"content": null}}]}"#,
            "<html>bad gateway</html>",
        ] {
            assert!(matches!(
                parse_completion(body),
                Err(SpecialistError::MalformedResponse(_))
            ));
        }
    }

    #[test]
    fn request_body_carries_both_messages_and_json_mode() {
        let client = ChatCompletionsClient::new("http://localhost:9/v1/chat/completions", "model-router").unwrap();
        let prompt = RedactedPrompt::new("password=hunter2");
        let body = client.request_body("be brief", &prompt);

        assert_eq!(body["model"], "model-router");
        assert_eq!(body["messages"][0]["content"], "be brief");
        assert_eq!(body["messages"][1]["content"], "password=[REDACTED]");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn from_config_requires_endpoint() {
        assert!(matches!(
            ChatCompletionsClient::from_config(&CopilotConfig::new()),
            Err(ConfigError::MissingEndpoint)
        ));
        let client = ChatCompletionsClient::from_config(
            &CopilotConfig::new().with_endpoint("http://x").with_api_key("sk-1"),
        )
        .unwrap();
        assert!(!format!("{client:?}").contains("sk-1"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let client = ChatCompletionsClient::new("http://127.0.0.1:1/v1/chat/completions", "m").unwrap();
        let err = client.call("i", &RedactedPrompt::new("p")).await.unwrap_err();
        assert!(matches!(err, SpecialistError::Transport(_)));
    }
}
