//! Declarative shape contracts
//!
//! A [`Contract`] is a closed list of recognized keys. Each key carries a
//! [`FieldSpec`] describing presence, nullability and the [`Shape`] its
//! value must have. Keys a contract does not mention pass through untouched.

use crate::error::ContractError;

/// Primitive JSON types a field can be constrained to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// JSON string
    String,
    /// Number without a fractional part
    Integer,
    /// Any JSON number
    Number,
    /// `true` / `false`
    Boolean,
    /// String holding an RFC 3339 date-time
    Timestamp,
}

impl Primitive {
    /// Human-readable type name used in violations
    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Timestamp => "date-time string",
        }
    }
}

/// Shape a value must have
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Plain primitive
    Primitive(Primitive),
    /// String restricted to a fixed set of values
    Enum(Vec<String>),
    /// Number (or integer) within optional inclusive bounds
    Bounded {
        /// Require an integral value
        integer: bool,
        /// Inclusive lower bound
        min: Option<f64>,
        /// Inclusive upper bound
        max: Option<f64>,
    },
    /// Nested object with its own contract
    Object(Contract),
    /// Array whose items all share one shape
    Array(Box<Shape>),
    /// Anything at all
    Any,
}

impl Shape {
    /// String value
    #[inline]
    #[must_use]
    pub fn string() -> Self {
        Self::Primitive(Primitive::String)
    }

    /// Integral number
    #[inline]
    #[must_use]
    pub fn integer() -> Self {
        Self::Primitive(Primitive::Integer)
    }

    /// Any number
    #[inline]
    #[must_use]
    pub fn number() -> Self {
        Self::Primitive(Primitive::Number)
    }

    /// Boolean value
    #[inline]
    #[must_use]
    pub fn boolean() -> Self {
        Self::Primitive(Primitive::Boolean)
    }

    /// RFC 3339 timestamp string
    #[inline]
    #[must_use]
    pub fn timestamp() -> Self {
        Self::Primitive(Primitive::Timestamp)
    }

    /// String enum
    #[must_use]
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum(values.into_iter().map(Into::into).collect())
    }

    /// Number within `[min, max]`
    #[inline]
    #[must_use]
    pub fn number_in(min: f64, max: f64) -> Self {
        Self::Bounded {
            integer: false,
            min: Some(min),
            max: Some(max),
        }
    }

    /// Integer with an optional lower bound
    #[inline]
    #[must_use]
    pub fn integer_at_least(min: f64) -> Self {
        Self::Bounded {
            integer: true,
            min: Some(min),
            max: None,
        }
    }

    /// Array of `item`
    #[inline]
    #[must_use]
    pub fn array_of(item: Shape) -> Self {
        Self::Array(Box::new(item))
    }

    /// Nested object
    #[inline]
    #[must_use]
    pub fn object(contract: Contract) -> Self {
        Self::Object(contract)
    }

    /// Unconstrained value
    #[inline]
    #[must_use]
    pub fn any() -> Self {
        Self::Any
    }

    fn check(&self, contract: &str, key: &str) -> Result<(), ContractError> {
        match self {
            Self::Enum(values) if values.is_empty() => Err(ContractError::EmptyEnum {
                contract: contract.to_string(),
                key: key.to_string(),
            }),
            Self::Bounded { min, max, .. } => {
                let nan = min.is_some_and(f64::is_nan) || max.is_some_and(f64::is_nan);
                let inverted = matches!((min, max), (Some(lo), Some(hi)) if lo > hi);
                if nan || inverted {
                    return Err(ContractError::InvalidBounds {
                        contract: contract.to_string(),
                        key: key.to_string(),
                        min: *min,
                        max: *max,
                    });
                }
                Ok(())
            }
            Self::Array(item) => item.check(contract, key),
            _ => Ok(()),
        }
    }
}

/// Whether a key must be present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Absence is a violation
    Required,
    /// Absence is fine
    Optional,
}

/// Constraints for one recognized key
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Key name
    pub key: String,
    /// Required or optional
    pub presence: Presence,
    /// Whether `null` is accepted in place of the shape
    pub nullable: bool,
    /// Expected shape
    pub shape: Shape,
}

impl FieldSpec {
    /// Is this key required
    #[inline]
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.presence == Presence::Required
    }
}

/// Closed set of recognized keys for one object
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    name: String,
    fields: Vec<FieldSpec>,
}

impl Contract {
    /// Start building a contract
    #[inline]
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ContractBuilder {
        ContractBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Contract name (for diagnostics and schema titles)
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields, in declaration order
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Look up a field by key
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Keys that must be present
    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.is_required())
            .map(|f| f.key.as_str())
    }
}

/// Builder for [`Contract`]
#[derive(Debug, Clone)]
pub struct ContractBuilder {
    name: String,
    fields: Vec<FieldSpec>,
}

impl ContractBuilder {
    /// Declare a required key
    #[must_use]
    pub fn required(self, key: impl Into<String>, shape: Shape) -> Self {
        self.field(key, Presence::Required, false, shape)
    }

    /// Declare an optional key
    #[must_use]
    pub fn optional(self, key: impl Into<String>, shape: Shape) -> Self {
        self.field(key, Presence::Optional, false, shape)
    }

    /// Declare an optional key that also accepts `null`
    #[must_use]
    pub fn nullable(self, key: impl Into<String>, shape: Shape) -> Self {
        self.field(key, Presence::Optional, true, shape)
    }

    /// Declare a required key that may be `null`
    #[must_use]
    pub fn required_nullable(self, key: impl Into<String>, shape: Shape) -> Self {
        self.field(key, Presence::Required, true, shape)
    }

    fn field(mut self, key: impl Into<String>, presence: Presence, nullable: bool, shape: Shape) -> Self {
        self.fields.push(FieldSpec {
            key: key.into(),
            presence,
            nullable,
            shape,
        });
        self
    }

    /// Finish the contract
    ///
    /// # Errors
    /// Returns [`ContractError`] for empty or duplicate keys, empty enums
    /// and NaN or inverted bounds.
    pub fn build(self) -> Result<Contract, ContractError> {
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if field.key.is_empty() {
                return Err(ContractError::EmptyKey {
                    contract: self.name.clone(),
                });
            }
            if !seen.insert(field.key.as_str()) {
                return Err(ContractError::DuplicateKey {
                    contract: self.name.clone(),
                    key: field.key.clone(),
                });
            }
            field.shape.check(&self.name, &field.key)?;
        }

        Ok(Contract {
            name: self.name,
            fields: self.fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_declaration_order() {
        let contract = Contract::builder("t")
            .required("b", Shape::string())
            .optional("a", Shape::integer())
            .build()
            .unwrap();

        let keys: Vec<_> = contract.fields().iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(contract.required_keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn duplicate_key_rejected() {
        let result = Contract::builder("t")
            .required("a", Shape::string())
            .optional("a", Shape::string())
            .build();

        assert!(matches!(result, Err(ContractError::DuplicateKey { key, .. }) if key == "a"));
    }

    #[test]
    fn empty_enum_rejected() {
        let result = Contract::builder("t")
            .required("level", Shape::one_of(Vec::<String>::new()))
            .build();
        assert!(matches!(result, Err(ContractError::EmptyEnum { .. })));
    }

    #[test]
    fn empty_enum_inside_array_rejected() {
        let result = Contract::builder("t")
            .required("levels", Shape::array_of(Shape::one_of(Vec::<String>::new())))
            .build();
        assert!(matches!(result, Err(ContractError::EmptyEnum { .. })));
    }

    #[test]
    fn inverted_bounds_rejected() {
        let result = Contract::builder("t")
            .required("x", Shape::number_in(1.0, 0.0))
            .build();
        assert!(matches!(result, Err(ContractError::InvalidBounds { .. })));
    }

    #[test]
    fn nan_bounds_rejected() {
        let result = Contract::builder("t")
            .required("x", Shape::number_in(f64::NAN, 1.0))
            .build();
        assert!(matches!(result, Err(ContractError::InvalidBounds { .. })));
    }

    #[test]
    fn empty_key_rejected() {
        let result = Contract::builder("t").optional("", Shape::any()).build();
        assert!(matches!(result, Err(ContractError::EmptyKey { .. })));
    }

    #[test]
    fn field_lookup() {
        let contract = Contract::builder("t")
            .nullable("end", Shape::timestamp())
            .build()
            .unwrap();

        let field = contract.field("end").unwrap();
        assert!(field.nullable);
        assert!(!field.is_required());
        assert!(contract.field("start").is_none());
    }
}
