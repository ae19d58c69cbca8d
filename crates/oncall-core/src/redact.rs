//! Credential masking for outbound prompts
//!
//! A fixed keyword list (`password`, `secret`, `token`, `api key`,
//! `connection string` and their separator variants) followed by `:` or
//! `=` marks the next token as a credential. A value opened with a quote
//! ends at the closing quote; any other value runs to the next
//! whitespace. Only that token is replaced. Credentials that do not
//! follow one of these keywords pass through unchanged.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Replacement for every masked value
pub const REDACTED: &str = "[REDACTED]";

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(?P<key>password|secret|token|api[ _-]?key|connection[ _-]?string)(?P<sep>(?:\\?")?\s*[:=]\s*)(?:(?P<open>\\?")(?:[^\s"\\]|\\[^\s"])+|\S+)"#,
    )
    .expect("secret pattern is a valid regex")
});

/// Mask credential values in `text`
///
/// Keyword and separator are kept; the value becomes [`REDACTED`].
/// Applying this twice gives the same result as applying it once.
#[must_use]
pub fn redact(text: &str) -> String {
    SECRET_PATTERN
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let open = caps.name("open").map_or("", |m| m.as_str());
            format!("{}{}{open}{REDACTED}", &caps["key"], &caps["sep"])
        })
        .into_owned()
}

/// Prompt text that has been through [`redact`]
///
/// The only way to build one is [`RedactedPrompt::new`], so anything that
/// takes a `&RedactedPrompt` cannot be handed raw incident text.
#[derive(Clone, PartialEq, Eq)]
pub struct RedactedPrompt(String);

impl RedactedPrompt {
    /// Redact `text` and wrap it
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self(redact(text))
    }

    /// Redacted text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No text
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for RedactedPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedactedPrompt").field("len", &self.0.len()).finish()
    }
}

impl AsRef<str> for RedactedPrompt {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
