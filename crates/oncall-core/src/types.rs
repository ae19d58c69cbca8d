//! Incident envelope types
//!
//! Decoded only after the raw payload has passed the incident contract;
//! the raw value stays around so unknown keys still reach specialists.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Incident severity, `SEV1` most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Critical
    Sev1,
    /// Major
    Sev2,
    /// Minor
    Sev3,
    /// Low
    Sev4,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sev1 => "SEV1",
            Self::Sev2 => "SEV2",
            Self::Sev3 => "SEV3",
            Self::Sev4 => "SEV4",
        };
        f.write_str(s)
    }
}

/// Incident time window; `end` present means the incident is closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeframe {
    /// Start of impact
    pub start: DateTime<Utc>,
    /// Resolution time
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

/// Alert that fired
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub name: Option<String>,
    pub description: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Log excerpt from one source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogExcerpt {
    pub source: Option<String>,
    #[serde(default)]
    pub lines: Vec<String>,
}

/// Metric summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub name: Option<String>,
    pub window: Option<String>,
    pub values_summary: Option<String>,
}

/// Operating constraints for the responders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Any integral JSON number; `45.0` reads as 45, values past `i64` saturate
    #[serde(default, deserialize_with = "whole_minutes")]
    pub max_time_minutes: Option<i64>,
    pub environment: Option<String>,
    pub region: Option<String>,
}

/// Integral minutes, written as an integer or as a float with no fraction
#[allow(clippy::cast_possible_truncation)]
fn whole_minutes<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(n) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(minutes) = n.as_i64() {
        return Ok(Some(minutes));
    }
    if n.as_u64().is_some() {
        return Ok(Some(i64::MAX));
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 => Ok(Some(f as i64)),
        _ => Err(D::Error::custom(format!("{n} is not a whole number of minutes"))),
    }
}

/// Decoded incident envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentEnvelope {
    /// Unique id, also the fixture key in mock mode
    pub incident_id: String,
    /// Short title
    pub title: String,
    /// Severity
    pub severity: Severity,
    /// Time window
    pub timeframe: Timeframe,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub logs: Vec<LogExcerpt>,
    #[serde(default)]
    pub metrics: Vec<MetricSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runbook_excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
    /// Keys outside the contract, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IncidentEnvelope {
    /// Has the incident been resolved
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.timeframe.end.is_some()
    }

    /// Decode from an already validated payload
    ///
    /// # Errors
    /// Returns the decoder error if a value is out of range for its Rust type.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Strip an optional `{"incident": {...}}` wrapper
    ///
    /// The wrapper is recognised only when `incident` is an object and
    /// the outer value has no `incident_id` of its own.
    #[must_use]
    pub fn unwrap_payload(payload: &Value) -> &Value {
        match payload.get("incident") {
            Some(inner @ Value::Object(_)) if payload.get("incident_id").is_none() => inner,
            _ => payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "incident_id": "INC-7",
            "title": "Queue backlog",
            "severity": "SEV3",
            "timeframe": {"start": "2024-03-01T08:00:00Z", "end": "2024-03-01T09:15:00+01:00"},
            "constraints": {"max_time_minutes": 45},
            "ticket": "OPS-1"
        })
    }

    #[test]
    fn decodes_known_and_extra_keys() {
        let envelope = IncidentEnvelope::from_value(&sample()).unwrap();

        assert_eq!(envelope.severity, Severity::Sev3);
        assert!(envelope.is_closed());
        assert_eq!(envelope.constraints.unwrap().max_time_minutes, Some(45));
        assert_eq!(envelope.extra.get("ticket"), Some(&json!("OPS-1")));
        assert!(envelope.alerts.is_empty());
    }

    #[test]
    fn minutes_accept_every_integral_number() {
        let minutes = |raw: Value| {
            let mut value = sample();
            value["constraints"]["max_time_minutes"] = raw;
            IncidentEnvelope::from_value(&value).unwrap().constraints.unwrap().max_time_minutes
        };

        assert_eq!(minutes(json!(45.0)), Some(45));
        assert_eq!(minutes(json!(-5)), Some(-5));
        assert_eq!(minutes(json!(u64::MAX)), Some(i64::MAX));
        assert_eq!(minutes(json!(1e300)), Some(i64::MAX));
        assert_eq!(minutes(Value::Null), None);
    }

    #[test]
    fn fractional_minutes_do_not_decode() {
        let mut value = sample();
        value["constraints"]["max_time_minutes"] = json!(2.5);
        assert!(IncidentEnvelope::from_value(&value).is_err());
    }

    #[test]
    fn null_end_means_open() {
        let mut value = sample();
        value["timeframe"]["end"] = Value::Null;
        assert!(!IncidentEnvelope::from_value(&value).unwrap().is_closed());
    }

    #[test]
    fn unwraps_incident_wrapper() {
        let wrapped = json!({"incident": sample()});
        assert_eq!(IncidentEnvelope::unwrap_payload(&wrapped), &sample());
        assert_eq!(IncidentEnvelope::unwrap_payload(&sample()), &sample());
    }

    #[test]
    fn severity_display_matches_wire() {
        assert_eq!(Severity::Sev1.to_string(), "SEV1");
        assert_eq!(serde_json::to_value(Severity::Sev4).unwrap(), json!("SEV4"));
    }
}
