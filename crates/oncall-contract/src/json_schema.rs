//! Render contracts as JSON Schema (draft 7)
//!
//! The rendered document is what specialists are shown as their output
//! shape, and what the CLI prints for external tooling.

use crate::contract::{Contract, FieldSpec, Primitive, Shape};
use serde_json::{json, Map, Value};

const DRAFT_7: &str = "http://json-schema.org/draft-07/schema#";

impl Contract {
    /// Equivalent JSON Schema document
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let mut schema = object_schema(self);
        if let Value::Object(map) = &mut schema {
            map.insert("$schema".to_string(), Value::String(DRAFT_7.to_string()));
            map.insert("title".to_string(), Value::String(self.name().to_string()));
        }
        schema
    }
}

fn object_schema(contract: &Contract) -> Value {
    let properties: Map<String, Value> = contract
        .fields()
        .iter()
        .map(|field| (field.key.clone(), field_schema(field)))
        .collect();
    let required: Vec<Value> = contract
        .required_keys()
        .map(|k| Value::String(k.to_string()))
        .collect();

    let mut schema = json!({
        "type": "object",
        "properties": properties,
    });
    if !required.is_empty() {
        schema["required"] = Value::Array(required);
    }
    schema
}

fn field_schema(field: &FieldSpec) -> Value {
    let inner = shape_schema(&field.shape);
    if field.nullable {
        json!({ "anyOf": [inner, { "type": "null" }] })
    } else {
        inner
    }
}

fn shape_schema(shape: &Shape) -> Value {
    match shape {
        Shape::Any => json!({}),
        Shape::Primitive(Primitive::String) => json!({ "type": "string" }),
        Shape::Primitive(Primitive::Integer) => json!({ "type": "integer" }),
        Shape::Primitive(Primitive::Number) => json!({ "type": "number" }),
        Shape::Primitive(Primitive::Boolean) => json!({ "type": "boolean" }),
        Shape::Primitive(Primitive::Timestamp) => {
            json!({ "type": "string", "format": "date-time" })
        }
        Shape::Enum(values) => json!({ "type": "string", "enum": values }),
        Shape::Bounded { integer, min, max } => {
            let ty = if *integer { "integer" } else { "number" };
            let mut schema = json!({ "type": ty });
            if let Some(min) = min {
                schema["minimum"] = json!(min);
            }
            if let Some(max) = max {
                schema["maximum"] = json!(max);
            }
            schema
        }
        Shape::Object(contract) => object_schema(contract),
        Shape::Array(item) => json!({ "type": "array", "items": shape_schema(item) }),
    }
}

#[cfg(test)]
mod tests {
    use crate::contract::{Contract, Shape};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn renders_nested_contract() {
        let window = Contract::builder("window")
            .required("start", Shape::timestamp())
            .nullable("end", Shape::timestamp())
            .build()
            .unwrap();
        let contract = Contract::builder("doc")
            .required("level", Shape::one_of(["A", "B"]))
            .optional("score", Shape::number_in(0.0, 1.0))
            .required("window", Shape::object(window))
            .build()
            .unwrap();

        assert_eq!(
            contract.to_json_schema(),
            json!({
                "$schema": "http://json-schema.org/draft-07/schema#",
                "title": "doc",
                "type": "object",
                "required": ["level", "window"],
                "properties": {
                    "level": {"type": "string", "enum": ["A", "B"]},
                    "score": {"type": "number", "minimum": 0.0, "maximum": 1.0},
                    "window": {
                        "type": "object",
                        "required": ["start"],
                        "properties": {
                            "start": {"type": "string", "format": "date-time"},
                            "end": {"anyOf": [
                                {"type": "string", "format": "date-time"},
                                {"type": "null"}
                            ]}
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn optional_only_object_omits_required() {
        let contract = Contract::builder("loose")
            .optional("note", Shape::string())
            .build()
            .unwrap();
        assert!(contract.to_json_schema().get("required").is_none());
    }
}
