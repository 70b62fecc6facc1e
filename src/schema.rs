//! Schema model for validating agent outputs
//!
//! A [`Schema`] is an ordered mapping from field name to a [`TypeSpec`].
//! Specifiers form a closed set resolved once at construction time;
//! validation never inspects runtime type tokens. Malformed definitions
//! fail fast with [`SchemaError`].

use serde_json::Value;

use crate::error::SchemaError;

/// Expected type for a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    String,
    Integer,
    Float,
    Boolean,
    /// Sequence of elements matching the inner specifier
    List(Box<TypeSpec>),
    /// Nested schema, applied recursively
    Object(Schema),
    /// Field need not be present (or may be null)
    Optional(Box<TypeSpec>),
    /// No type check; only meaningful wrapped in `Optional`
    Any,
}

impl TypeSpec {
    /// Human-readable name for this specifier
    pub fn type_name(&self) -> String {
        match self {
            TypeSpec::String => "string".to_string(),
            TypeSpec::Integer => "integer".to_string(),
            TypeSpec::Float => "float".to_string(),
            TypeSpec::Boolean => "boolean".to_string(),
            TypeSpec::List(inner) => format!("list<{}>", inner.type_name()),
            TypeSpec::Object(_) => "object".to_string(),
            TypeSpec::Optional(inner) => format!("optional<{}>", inner.type_name()),
            TypeSpec::Any => "any".to_string(),
        }
    }

    /// Whether a field with this specifier may be absent from the input
    pub fn is_optional(&self) -> bool {
        matches!(self, TypeSpec::Optional(_))
    }

    /// The specifier with any optional marker stripped
    pub fn unwrap_optional(&self) -> &TypeSpec {
        match self {
            TypeSpec::Optional(inner) => inner,
            other => other,
        }
    }

    fn from_json(field: &str, value: &Value) -> Result<Self, SchemaError> {
        match value {
            // null marks an optional field with no type check
            Value::Null => Ok(TypeSpec::Optional(Box::new(TypeSpec::Any))),
            Value::String(tag) => Self::from_tag(field, tag),
            Value::Array(items) => {
                if items.len() != 1 {
                    return Err(SchemaError::InvalidList(field.to_string()));
                }
                let inner = Self::from_json(field, &items[0])?;
                Ok(TypeSpec::List(Box::new(inner)))
            }
            Value::Object(_) => Ok(TypeSpec::Object(Schema::from_value(value)?)),
            other => Err(SchemaError::UnknownType {
                field: field.to_string(),
                tag: other.to_string(),
            }),
        }
    }

    fn from_tag(field: &str, tag: &str) -> Result<Self, SchemaError> {
        let (base, optional) = match tag.strip_suffix('?') {
            Some(base) => (base, true),
            None => (tag, false),
        };
        let spec = match base {
            "string" => TypeSpec::String,
            "integer" => TypeSpec::Integer,
            "float" => TypeSpec::Float,
            "boolean" => TypeSpec::Boolean,
            _ => {
                return Err(SchemaError::UnknownType {
                    field: field.to_string(),
                    tag: tag.to_string(),
                })
            }
        };
        if optional {
            Ok(TypeSpec::Optional(Box::new(spec)))
        } else {
            Ok(spec)
        }
    }

    fn to_json(&self) -> Value {
        match self {
            TypeSpec::String => Value::String("string".to_string()),
            TypeSpec::Integer => Value::String("integer".to_string()),
            TypeSpec::Float => Value::String("float".to_string()),
            TypeSpec::Boolean => Value::String("boolean".to_string()),
            TypeSpec::List(inner) => Value::Array(vec![inner.to_json()]),
            TypeSpec::Object(schema) => schema.to_value(),
            TypeSpec::Optional(inner) => match inner.as_ref() {
                TypeSpec::Any => Value::Null,
                TypeSpec::String => Value::String("string?".to_string()),
                TypeSpec::Integer => Value::String("integer?".to_string()),
                TypeSpec::Float => Value::String("float?".to_string()),
                TypeSpec::Boolean => Value::String("boolean?".to_string()),
                other => other.to_json(),
            },
            TypeSpec::Any => Value::Null,
        }
    }
}

/// Declarative expected shape of validated data.
///
/// Field order is declaration order; it determines both error ordering
/// and the field order of normalized output. A constructed schema is
/// immutable and safe to share across concurrent validation sessions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    fields: Vec<(String, TypeSpec)>,
}

impl Schema {
    /// Start building a schema
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder { fields: Vec::new() }
    }

    /// Parse a schema from its JSON representation.
    ///
    /// Recognized specifier forms: the tags `"string"`, `"integer"`,
    /// `"float"`, `"boolean"` (with a trailing `?` for optional),
    /// a one-element array for lists, a nested object for object
    /// specifiers, and `null` for an optional untyped field.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| SchemaError::Parse(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Parse a schema from an already-deserialized JSON value
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        let map = match value {
            Value::Object(map) => map,
            other => return Err(SchemaError::InvalidRoot(type_label(other).to_string())),
        };

        let mut fields: Vec<(String, TypeSpec)> = Vec::with_capacity(map.len());
        for (name, spec_value) in map {
            if fields.iter().any(|(existing, _)| existing == name) {
                return Err(SchemaError::DuplicateField(name.clone()));
            }
            let spec = TypeSpec::from_json(name, spec_value)?;
            fields.push((name.clone(), spec));
        }

        Ok(Self { fields })
    }

    /// JSON representation of this schema
    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (name, spec) in &self.fields {
            map.insert(name.clone(), spec.to_json());
        }
        Value::Object(map)
    }

    /// JSON string representation of this schema
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[(String, TypeSpec)] {
        &self.fields
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema declares no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for [`Schema`]
pub struct SchemaBuilder {
    fields: Vec<(String, TypeSpec)>,
}

impl SchemaBuilder {
    /// Declare a field; declaration order is preserved
    pub fn field(mut self, name: impl Into<String>, spec: TypeSpec) -> Self {
        self.fields.push((name.into(), spec));
        self
    }

    /// Declare an optional field
    pub fn optional(self, name: impl Into<String>, spec: TypeSpec) -> Self {
        self.field(name, TypeSpec::Optional(Box::new(spec)))
    }

    /// Finish construction, rejecting duplicate field names
    pub fn build(self) -> Result<Schema, SchemaError> {
        for (i, (name, _)) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|(seen, _)| seen == name) {
                return Err(SchemaError::DuplicateField(name.clone()));
            }
        }
        Ok(Schema {
            fields: self.fields,
        })
    }
}

/// JSON type label used in diagnostics
pub(crate) fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_f64() {
                "float"
            } else {
                "integer"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_preserves_declaration_order() {
        let schema = Schema::builder()
            .field("name", TypeSpec::String)
            .field("age", TypeSpec::Integer)
            .field("tags", TypeSpec::List(Box::new(TypeSpec::String)))
            .build()
            .unwrap();

        let names: Vec<&str> = schema.fields().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["name", "age", "tags"]);
    }

    #[test]
    fn test_builder_rejects_duplicates() {
        let result = Schema::builder()
            .field("name", TypeSpec::String)
            .field("name", TypeSpec::Integer)
            .build();
        assert!(matches!(result, Err(SchemaError::DuplicateField(_))));
    }

    #[test]
    fn test_from_value_primitives() {
        let schema = Schema::from_value(&json!({
            "name": "string",
            "age": "integer",
            "score": "float",
            "active": "boolean"
        }))
        .unwrap();
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.fields()[1].1, TypeSpec::Integer);
    }

    #[test]
    fn test_from_value_nested_and_list() {
        let schema = Schema::from_value(&json!({
            "tags": ["string"],
            "address": {"zip": "string", "city": "string"}
        }))
        .unwrap();

        match &schema.fields()[0].1 {
            TypeSpec::List(inner) => assert_eq!(**inner, TypeSpec::String),
            other => panic!("expected list, got {:?}", other),
        }
        match &schema.fields()[1].1 {
            TypeSpec::Object(nested) => assert_eq!(nested.len(), 2),
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_from_value_optional_forms() {
        let schema = Schema::from_value(&json!({
            "nickname": "string?",
            "notes": null
        }))
        .unwrap();

        assert!(schema.fields()[0].1.is_optional());
        assert_eq!(*schema.fields()[0].1.unwrap_optional(), TypeSpec::String);
        assert_eq!(
            schema.fields()[1].1,
            TypeSpec::Optional(Box::new(TypeSpec::Any))
        );
    }

    #[test]
    fn test_unknown_tag_fails_fast() {
        let result = Schema::from_value(&json!({"age": "decimal"}));
        assert!(matches!(result, Err(SchemaError::UnknownType { .. })));
    }

    #[test]
    fn test_multi_element_list_rejected() {
        let result = Schema::from_value(&json!({"tags": ["string", "integer"]}));
        assert!(matches!(result, Err(SchemaError::InvalidList(_))));
    }

    #[test]
    fn test_non_object_root_rejected() {
        let result = Schema::from_value(&json!(["string"]));
        assert!(matches!(result, Err(SchemaError::InvalidRoot(_))));
    }

    #[test]
    fn test_json_roundtrip() {
        let schema = Schema::from_value(&json!({
            "name": "string",
            "age": "integer?",
            "tags": ["string"],
            "meta": {"source": "string"},
            "extra": null
        }))
        .unwrap();

        let roundtripped = Schema::from_value(&schema.to_value()).unwrap();
        assert_eq!(schema, roundtripped);
    }
}
