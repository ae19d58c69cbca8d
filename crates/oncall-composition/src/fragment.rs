//! Recovery of JSON objects from free-form specialist text
//!
//! Specialists are asked for JSON but answer with whatever they like:
//! a bare object, an object inside a markdown fence, several objects
//! back to back, or an object followed by prose. Extraction keeps every
//! complete leading object and drops the rest.

use crate::role::RoleId;
use serde_json::{Deserializer, Map, Value};
use tracing::{debug, warn};

const FENCE: &str = "```";

/// One JSON object recovered from a specialist's text
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Role that produced the text
    pub role: RoleId,
    /// Byte offset of the object within the raw text
    pub offset: usize,
    /// Parsed object
    pub value: Map<String, Value>,
}

impl Fragment {
    /// Create fragment
    #[inline]
    #[must_use]
    pub fn new(role: RoleId, offset: usize, value: Map<String, Value>) -> Self {
        Self {
            role,
            offset,
            value,
        }
    }
}

/// Remove a surrounding markdown code fence, if present
///
/// Returns the byte offset of the remaining body within `raw` alongside
/// the body. An optional language tag after the opening fence is
/// dropped. A missing closing fence is tolerated.
#[must_use]
pub fn strip_fence(raw: &str) -> (usize, &str) {
    let start = raw.len() - raw.trim_start().len();
    let body = raw.trim();

    let Some(after_ticks) = body.strip_prefix(FENCE) else {
        return (start, body);
    };
    let tag_len = after_ticks
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(after_ticks.len());
    let inner = &after_ticks[tag_len..];
    let inner = inner.strip_suffix(FENCE).unwrap_or(inner);
    let lead = inner.len() - inner.trim_start().len();

    (start + FENCE.len() + tag_len + lead, inner.trim())
}

/// Extract every leading JSON object from `raw`
///
/// Parsing stops at the first value that fails to parse; everything from
/// there on is discarded. Values that parse but are not objects are
/// skipped. Never fails: unusable input yields an empty list.
#[must_use]
pub fn extract_fragments(role: &RoleId, raw: &str) -> Vec<Fragment> {
    let (base, body) = strip_fence(raw);
    let mut fragments = Vec::new();
    let mut stream = Deserializer::from_str(body).into_iter::<Value>();

    loop {
        let before = stream.byte_offset();
        let Some(next) = stream.next() else { break };
        let rest = body.get(before..).unwrap_or_default();
        let value_start = before + (rest.len() - rest.trim_start().len());

        match next {
            Ok(Value::Object(map)) => {
                fragments.push(Fragment::new(role.clone(), base + value_start, map));
            }
            Ok(other) => {
                debug!(role = %role, offset = base + value_start, kind = oncall_contract::type_name(&other), "Skipping non-object value");
            }
            Err(err) => {
                warn!(
                    role = %role,
                    offset = base + value_start,
                    discarded_bytes = body.len() - before,
                    error = %err,
                    "Discarding unparseable trailing text"
                );
                break;
            }
        }
    }

    debug!(role = %role, fragments = fragments.len(), "Extracted fragments");
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn role() -> RoleId {
        RoleId::new("triage")
    }

    fn values(fragments: &[Fragment]) -> Vec<Value> {
        fragments
            .iter()
            .map(|f| Value::Object(f.value.clone()))
            .collect()
    }

    #[test]
    fn plain_object() {
        let fragments = extract_fragments(&role(), r#"{"a": 1}"#);
        assert_eq!(values(&fragments), vec![json!({"a": 1})]);
        assert_eq!(fragments[0].offset, 0);
    }

    #[test]
    fn fenced_object_with_language_tag() {
        let raw = "```json\n{\"summary\": {\"what_happened\": \"x\"}}\n```";
        let fragments = extract_fragments(&role(), raw);
        assert_eq!(values(&fragments), vec![json!({"summary": {"what_happened": "x"}})]);
        assert_eq!(fragments[0].offset, raw.find('{').unwrap());
    }

    #[test]
    fn fence_without_closing_ticks() {
        let fragments = extract_fragments(&role(), "```\n{\"a\": true}");
        assert_eq!(values(&fragments), vec![json!({"a": true})]);
    }

    #[test]
    fn back_to_back_objects_keep_order_and_offsets() {
        let raw = r#"{"a":1}  {"b":2}{"c":3}"#;
        let fragments = extract_fragments(&role(), raw);
        assert_eq!(values(&fragments), vec![json!({"a":1}), json!({"b":2}), json!({"c":3})]);
        let offsets: Vec<_> = fragments.iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 9, 16]);
    }

    #[test]
    fn trailing_prose_is_discarded() {
        let fragments = extract_fragments(&role(), "{\"a\":1}\nHope this helps!");
        assert_eq!(values(&fragments), vec![json!({"a": 1})]);
    }

    #[test]
    fn parse_failure_stops_extraction() {
        let fragments = extract_fragments(&role(), r#"{"a":1} oops {"b":2}"#);
        assert_eq!(values(&fragments), vec![json!({"a": 1})]);
    }

    #[test]
    fn non_objects_are_skipped() {
        let fragments = extract_fragments(&role(), r#"[1,2] "note" {"a":1} 42 {"b":2}"#);
        assert_eq!(values(&fragments), vec![json!({"a":1}), json!({"b":2})]);
    }

    #[test]
    fn empty_and_blank_inputs() {
        assert!(extract_fragments(&role(), "").is_empty());
        assert!(extract_fragments(&role(), "   \n\t ").is_empty());
        assert!(extract_fragments(&role(), "```").is_empty());
        assert!(extract_fragments(&role(), "``````").is_empty());
    }

    #[test]
    fn truncated_object_yields_nothing() {
        assert!(extract_fragments(&role(), r#"{"summary": {"what_happened": "#).is_empty());
    }

    #[test]
    fn strip_fence_reports_body_offset() {
        let raw = "  ```json\n  {}\n```  ";
        let (offset, body) = strip_fence(raw);
        assert_eq!(body, "{}");
        assert_eq!(&raw[offset..offset + 2], "{}");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(strip_fence("  {} "), (2, "{}"));
    }
}
