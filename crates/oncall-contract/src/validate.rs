//! Structural validation against a [`Contract`]
//!
//! Validation is total: every declared key is visited and every violation
//! is collected, so callers can see the full picture before deciding
//! whether to reject or degrade.

use crate::contract::{Contract, Primitive, Shape};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// One violated constraint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Location of the offending value (`timeframe.start`, `alerts[2].name`)
    pub path: String,
    /// What was wrong
    pub kind: ViolationKind,
}

impl Violation {
    /// Create violation
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Does this violation concern `key` or something nested under it
    #[must_use]
    pub fn concerns(&self, key: &str) -> bool {
        self.path == key
            || self
                .path
                .strip_prefix(key)
                .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "$" } else { &self.path };
        write!(f, "{path}: {}", self.kind)
    }
}

/// Classification of a violation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// Required key absent
    Missing,
    /// `null` where the contract does not allow it
    UnexpectedNull,
    /// Value of the wrong JSON type
    WrongType {
        /// Expected type name
        expected: &'static str,
        /// Actual type name
        found: &'static str,
    },
    /// String outside the allowed set
    NotInEnum {
        /// Allowed values
        allowed: Vec<String>,
        /// Actual value
        found: String,
    },
    /// Number under the lower bound
    BelowMinimum {
        /// Inclusive bound
        minimum: f64,
        /// Actual value
        found: f64,
    },
    /// Number over the upper bound
    AboveMaximum {
        /// Inclusive bound
        maximum: f64,
        /// Actual value
        found: f64,
    },
    /// String that does not parse as RFC 3339
    InvalidTimestamp {
        /// Actual value
        found: String,
    },
    /// Value is well-formed but contradicts other facts about the request
    Inconsistent {
        /// Explanation
        reason: String,
    },
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "required key is missing"),
            Self::UnexpectedNull => write!(f, "null is not allowed"),
            Self::WrongType { expected, found } => write!(f, "expected {expected}, found {found}"),
            Self::NotInEnum { allowed, found } => {
                write!(f, "'{found}' is not one of [{}]", allowed.join(", "))
            }
            Self::BelowMinimum { minimum, found } => write!(f, "{found} is below minimum {minimum}"),
            Self::AboveMaximum { maximum, found } => write!(f, "{found} is above maximum {maximum}"),
            Self::InvalidTimestamp { found } => write!(f, "'{found}' is not an RFC 3339 date-time"),
            Self::Inconsistent { reason } => write!(f, "{reason}"),
        }
    }
}

/// Result of validating one value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "violations", rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// No violations
    Valid,
    /// At least one violation
    Invalid(Vec<Violation>),
}

impl ValidationOutcome {
    /// Build from a violation list
    #[inline]
    #[must_use]
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        if violations.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(violations)
        }
    }

    /// No violations
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Violations found (empty when valid)
    #[inline]
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Valid => &[],
            Self::Invalid(v) => v,
        }
    }

    /// Consume into the violation list
    #[inline]
    #[must_use]
    pub fn into_violations(self) -> Vec<Violation> {
        match self {
            Self::Valid => Vec::new(),
            Self::Invalid(v) => v,
        }
    }

    /// Append further violations, demoting a valid outcome if needed
    #[must_use]
    pub fn with(self, extra: impl IntoIterator<Item = Violation>) -> Self {
        let mut violations = self.into_violations();
        violations.extend(extra);
        Self::from_violations(violations)
    }
}

/// Validate `value` against `contract`
///
/// Never fails: non-conforming input yields [`ValidationOutcome::Invalid`]
/// with every violation found. Keys the contract does not declare are
/// ignored.
#[must_use]
pub fn validate(value: &Value, contract: &Contract) -> ValidationOutcome {
    let mut walker = Walker::default();
    match value {
        Value::Object(map) => walker.object("", map, contract),
        other => walker.push("", ViolationKind::WrongType {
            expected: "object",
            found: type_name(other),
        }),
    }
    ValidationOutcome::from_violations(walker.violations)
}

#[derive(Default)]
struct Walker {
    violations: Vec<Violation>,
}

impl Walker {
    fn push(&mut self, path: &str, kind: ViolationKind) {
        self.violations.push(Violation::new(path, kind));
    }

    fn object(&mut self, path: &str, map: &Map<String, Value>, contract: &Contract) {
        for field in contract.fields() {
            let child = join_key(path, &field.key);
            match map.get(&field.key) {
                None if field.is_required() => self.push(&child, ViolationKind::Missing),
                None => {}
                Some(Value::Null) if field.nullable => {}
                Some(Value::Null) if !matches!(field.shape, Shape::Any) => {
                    self.push(&child, ViolationKind::UnexpectedNull);
                }
                Some(value) => self.shape(&child, value, &field.shape),
            }
        }
    }

    fn shape(&mut self, path: &str, value: &Value, shape: &Shape) {
        match shape {
            Shape::Any => {}
            Shape::Primitive(primitive) => self.primitive(path, value, *primitive),
            Shape::Enum(allowed) => match value.as_str() {
                Some(s) if allowed.iter().any(|a| a == s) => {}
                Some(s) => self.push(path, ViolationKind::NotInEnum {
                    allowed: allowed.clone(),
                    found: s.to_string(),
                }),
                None => self.wrong_type(path, "string", value),
            },
            Shape::Bounded { integer, min, max } => {
                let expected = if *integer { Primitive::Integer } else { Primitive::Number };
                let Some(n) = numeric(value, expected) else {
                    self.wrong_type(path, expected.name(), value);
                    return;
                };
                if let Some(minimum) = min.filter(|m| n < *m) {
                    self.push(path, ViolationKind::BelowMinimum { minimum, found: n });
                }
                if let Some(maximum) = max.filter(|m| n > *m) {
                    self.push(path, ViolationKind::AboveMaximum { maximum, found: n });
                }
            }
            Shape::Object(contract) => match value {
                Value::Object(map) => self.object(path, map, contract),
                other => self.wrong_type(path, "object", other),
            },
            Shape::Array(item) => match value {
                Value::Array(items) => {
                    for (i, element) in items.iter().enumerate() {
                        self.shape(&format!("{path}[{i}]"), element, item);
                    }
                }
                other => self.wrong_type(path, "array", other),
            },
        }
    }

    fn primitive(&mut self, path: &str, value: &Value, primitive: Primitive) {
        let ok = match primitive {
            Primitive::String => value.is_string(),
            Primitive::Boolean => value.is_boolean(),
            Primitive::Integer | Primitive::Number => numeric(value, primitive).is_some(),
            Primitive::Timestamp => match value.as_str() {
                Some(s) => {
                    if chrono::DateTime::parse_from_rfc3339(s).is_err() {
                        self.push(path, ViolationKind::InvalidTimestamp {
                            found: s.to_string(),
                        });
                    }
                    true
                }
                None => false,
            },
        };
        if !ok {
            self.wrong_type(path, primitive.name(), value);
        }
    }

    fn wrong_type(&mut self, path: &str, expected: &'static str, value: &Value) {
        self.push(path, ViolationKind::WrongType {
            expected,
            found: type_name(value),
        });
    }
}

fn join_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Numeric value of `value`, if it satisfies `kind`
fn numeric(value: &Value, kind: Primitive) -> Option<f64> {
    let n = value.as_f64()?;
    if kind == Primitive::Integer && !(value.is_i64() || value.is_u64() || n.fract() == 0.0) {
        return None;
    }
    Some(n)
}

/// JSON type name for diagnostics
#[must_use]
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
