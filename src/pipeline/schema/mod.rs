//! Declarative section schemas.
//!
//! A [`SectionSchema`] is the single description of a section's output. The
//! generator renders it as a JSON Schema for the model, the prompt embeds its
//! field instructions, workers validate generated values against it and the
//! API lists it for clients.

pub mod registry;

pub use registry::{SchemaId, SchemaRegistry};

use std::fmt;

use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    List(Box<FieldKind>),
    Object(Vec<FieldSpec>),
}

impl FieldKind {
    pub fn list_of(kind: FieldKind) -> Self {
        Self::List(Box::new(kind))
    }

    fn label(&self) -> String {
        match self {
            Self::Text => "text".to_string(),
            Self::Number => "number".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::List(item) => format!("list of {}", item.label()),
            Self::Object(_) => "object".to_string(),
        }
    }

    fn json_type(&self) -> &'static str {
        match self {
            Self::Text => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::List(_) => "array",
            Self::Object(_) => "object",
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            Self::List(item) => json!({"type": "array", "items": item.to_json_schema()}),
            Self::Object(fields) => object_schema(fields),
            other => json!({"type": other.json_type()}),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: &'static str,
}

impl FieldSpec {
    pub fn required(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
        }
    }

    pub fn optional(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub fields: Vec<FieldSpec>,
}

// ═══════════════════════════════════════════
// Violations
// ═══════════════════════════════════════════

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    #[error("missing required field `{path}`")]
    Missing { path: String },

    #[error("`{path}` should be {expected}, found {found}")]
    WrongType {
        path: String,
        expected: String,
        found: &'static str,
    },
}

/// Every violation found in one value, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolations(pub Vec<SchemaViolation>);

impl SchemaViolations {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaViolation> {
        self.0.iter()
    }
}

impl fmt::Display for SchemaViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaViolations {}

// ═══════════════════════════════════════════
// Rendering, validation, conformance
// ═══════════════════════════════════════════

impl SectionSchema {
    /// JSON Schema document for the section, used as the model's output format.
    pub fn to_json_schema(&self) -> Value {
        let mut schema = object_schema(&self.fields);
        if let Some(obj) = schema.as_object_mut() {
            obj.insert("title".into(), Value::String(self.name.to_string()));
            obj.insert("description".into(), Value::String(self.description.to_string()));
        }
        schema
    }

    /// Field-by-field instructions embedded in the generation prompt.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        describe_fields(&self.fields, 0, &mut out);
        out
    }

    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolations> {
        let mut violations = Vec::new();
        match value {
            Value::Object(map) => check_fields(&self.fields, map, "", &mut violations),
            other => violations.push(SchemaViolation::WrongType {
                path: "$".into(),
                expected: "object".into(),
                found: json_kind(other),
            }),
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaViolations(violations))
        }
    }

    /// Validate `value`, then drop every field the schema does not declare.
    pub fn conform(&self, mut value: Value) -> Result<Value, SchemaViolations> {
        self.validate(&value)?;
        if let Value::Object(map) = &mut value {
            prune_fields(&self.fields, map);
        }
        Ok(value)
    }
}

fn object_schema(fields: &[FieldSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields {
        let mut property = field.kind.to_json_schema();
        if let Some(obj) = property.as_object_mut() {
            obj.insert(
                "description".into(),
                Value::String(field.description.to_string()),
            );
        }
        properties.insert(field.name.to_string(), property);
        if field.required {
            required.push(Value::String(field.name.to_string()));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn describe_fields(fields: &[FieldSpec], depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    for field in fields {
        let presence = if field.required { "required" } else { "optional" };
        out.push_str(&format!(
            "{indent}- {} ({}, {presence}): {}\n",
            field.name,
            field.kind.label(),
            field.description
        ));
        match &field.kind {
            FieldKind::Object(nested) => describe_fields(nested, depth + 1, out),
            FieldKind::List(item) => {
                if let FieldKind::Object(nested) = item.as_ref() {
                    describe_fields(nested, depth + 1, out);
                }
            }
            _ => {}
        }
    }
}

fn check_fields(
    fields: &[FieldSpec],
    map: &Map<String, Value>,
    prefix: &str,
    violations: &mut Vec<SchemaViolation>,
) {
    for field in fields {
        let path = if prefix.is_empty() {
            field.name.to_string()
        } else {
            format!("{prefix}.{}", field.name)
        };
        match map.get(field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    violations.push(SchemaViolation::Missing { path });
                }
            }
            Some(value) => check_kind(&field.kind, value, &path, violations),
        }
    }
}

fn check_kind(kind: &FieldKind, value: &Value, path: &str, violations: &mut Vec<SchemaViolation>) {
    match (kind, value) {
        (FieldKind::Text, Value::String(_))
        | (FieldKind::Number, Value::Number(_))
        | (FieldKind::Boolean, Value::Bool(_)) => {}
        (FieldKind::List(item), Value::Array(items)) => {
            for (i, element) in items.iter().enumerate() {
                check_kind(item, element, &format!("{path}[{i}]"), violations);
            }
        }
        (FieldKind::Object(fields), Value::Object(map)) => {
            check_fields(fields, map, path, violations);
        }
        (expected, found) => violations.push(SchemaViolation::WrongType {
            path: path.to_string(),
            expected: expected.label(),
            found: json_kind(found),
        }),
    }
}

fn prune_fields(fields: &[FieldSpec], map: &mut Map<String, Value>) {
    map.retain(|key, _| fields.iter().any(|f| f.name == key.as_str()));
    for field in fields {
        if let Some(value) = map.get_mut(field.name) {
            prune_kind(&field.kind, value);
        }
    }
}

fn prune_kind(kind: &FieldKind, value: &mut Value) {
    match (kind, value) {
        (FieldKind::Object(fields), Value::Object(map)) => prune_fields(fields, map),
        (FieldKind::List(item), Value::Array(items)) => {
            for element in items.iter_mut() {
                prune_kind(item, element);
            }
        }
        _ => {}
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "text",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
