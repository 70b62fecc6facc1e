//! Structural validation of agent output against a schema
//!
//! Recursive descent over (value, specifier) pairs producing either a
//! normalized value or a path-qualified error list. Errors accumulate
//! across sibling fields so a single attempt reports every visible
//! problem; only the whole-payload byte limit short-circuits an attempt.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::coerce::coerce;
use crate::limits::Limits;
use crate::schema::{type_label, Schema, TypeSpec};

/// Path used for errors about the payload as a whole
pub const ROOT_PATH: &str = "root";

/// Validation mode for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// No coercion; a value's runtime type must already match
    #[default]
    Strict,
    /// Apply the coercion table before rejecting a mismatch
    Coerce,
}

impl std::fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationMode::Strict => write!(f, "strict"),
            ValidationMode::Coerce => write!(f, "coerce"),
        }
    }
}

impl std::str::FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(ValidationMode::Strict),
            "coerce" => Ok(ValidationMode::Coerce),
            _ => Err(format!("Unknown validation mode: {}", s)),
        }
    }
}

/// Machine-stable reason code for a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    TypeMismatch,
    MissingField,
    CoercionFailed,
    LimitExceeded,
    InvalidJson,
    Timeout,
    GeneratorError,
}

impl ReasonCode {
    /// The stable wire form of this code
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::TypeMismatch => "type_mismatch",
            ReasonCode::MissingField => "missing_field",
            ReasonCode::CoercionFailed => "coercion_failed",
            ReasonCode::LimitExceeded => "limit_exceeded",
            ReasonCode::InvalidJson => "invalid_json",
            ReasonCode::Timeout => "timeout",
            ReasonCode::GeneratorError => "generator_error",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single path-qualified validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Dotted/indexed locator of the failing value (`address.zip`, `tags[2]`)
    pub path: String,
    /// Machine-stable reason code
    pub reason: ReasonCode,
    /// Human-readable detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl FieldError {
    /// Create an error at a path
    pub fn new(path: impl Into<String>, reason: ReasonCode) -> Self {
        Self {
            path: path.into(),
            reason,
            detail: None,
        }
    }

    /// Attach a human-readable detail message
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Outcome of one structural pass: normalized value or ordered errors
pub type Outcome = Result<Value, Vec<FieldError>>;

/// Parse a textual candidate into structured form.
///
/// In strict mode a parse failure is a single `invalid_json` error. In
/// coerce mode, when the schema's only top-level field accepts a raw
/// string, the text is wrapped as that field's value; any other shape
/// yields a single top-level `type_mismatch`.
pub fn parse_candidate(text: &str, schema: &Schema, mode: ValidationMode) -> Outcome {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => Ok(value),
        Err(e) => match mode {
            ValidationMode::Strict => Err(vec![FieldError::new(ROOT_PATH, ReasonCode::InvalidJson)
                .with_detail(e.to_string())]),
            ValidationMode::Coerce => match string_fallback_field(schema) {
                Some(field) => {
                    let mut map = Map::new();
                    map.insert(field.to_string(), Value::String(text.to_string()));
                    Ok(Value::Object(map))
                }
                None => Err(vec![FieldError::new(ROOT_PATH, ReasonCode::TypeMismatch)
                    .with_detail("expected object, got unparsable text")]),
            },
        },
    }
}

/// The single string-typed field a plain-text payload may be wrapped into
fn string_fallback_field(schema: &Schema) -> Option<&str> {
    match schema.fields() {
        [(name, spec)] if *spec.unwrap_optional() == TypeSpec::String => Some(name.as_str()),
        _ => None,
    }
}

/// Validate a structured candidate against a schema.
///
/// The byte-size pre-check runs once over the whole payload and is fatal
/// on violation. All other errors accumulate in depth-first traversal
/// order: field declaration order, then list index order. The ordering
/// is stable for identical inputs.
pub fn validate_structure(
    value: &Value,
    schema: &Schema,
    mode: ValidationMode,
    limits: &Limits,
) -> Outcome {
    if !limits.check_total_bytes(value) {
        return Err(vec![FieldError::new(ROOT_PATH, ReasonCode::LimitExceeded)
            .with_detail(format!("payload exceeds {} bytes", limits.max_output_bytes))]);
    }

    let mut errors = Vec::new();
    let normalized = validate_object(value, schema, "", mode, limits, &mut errors);

    if errors.is_empty() {
        // normalized is always Some when no errors were recorded
        Ok(normalized.unwrap_or_else(|| Value::Object(Map::new())))
    } else {
        Err(errors)
    }
}

fn validate_object(
    value: &Value,
    schema: &Schema,
    path: &str,
    mode: ValidationMode,
    limits: &Limits,
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    let map = match value.as_object() {
        Some(map) => map,
        None => {
            errors.push(
                FieldError::new(error_path(path), ReasonCode::TypeMismatch)
                    .with_detail(format!("expected object, got {}", type_label(value))),
            );
            return None;
        }
    };

    if !limits.object_ok(map) {
        errors.push(
            FieldError::new(error_path(path), ReasonCode::LimitExceeded)
                .with_detail(format!("object exceeds {} keys", limits.max_dict_keys)),
        );
        return None;
    }

    let mut out = Map::new();
    for (name, spec) in schema.fields() {
        let child_path = join_field(path, name);
        match map.get(name) {
            None if spec.is_optional() => continue,
            Some(Value::Null) if spec.is_optional() => continue,
            None => {
                errors.push(
                    FieldError::new(&child_path, ReasonCode::MissingField)
                        .with_detail(format!("required field '{}' is absent", name)),
                );
            }
            Some(found) => {
                let target = spec.unwrap_optional();
                if let Some(normalized) =
                    validate_value(found, target, &child_path, mode, limits, errors)
                {
                    out.insert(name.clone(), normalized);
                }
            }
        }
    }

    Some(Value::Object(out))
}

fn validate_value(
    value: &Value,
    spec: &TypeSpec,
    path: &str,
    mode: ValidationMode,
    limits: &Limits,
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    match spec {
        TypeSpec::Any => Some(value.clone()),
        TypeSpec::Object(nested) => validate_object(value, nested, path, mode, limits, errors),
        TypeSpec::List(inner) => validate_list(value, inner, path, mode, limits, errors),
        primitive => validate_primitive(value, primitive, path, mode, limits, errors),
    }
}

fn validate_list(
    value: &Value,
    inner: &TypeSpec,
    path: &str,
    mode: ValidationMode,
    limits: &Limits,
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    let items = match value.as_array() {
        Some(items) => items,
        None => {
            errors.push(
                FieldError::new(path, ReasonCode::TypeMismatch)
                    .with_detail(format!("expected list, got {}", type_label(value))),
            );
            return None;
        }
    };

    if !limits.list_ok(items) {
        errors.push(
            FieldError::new(path, ReasonCode::LimitExceeded)
                .with_detail(format!("list exceeds {} elements", limits.max_list_len)),
        );
        return None;
    }

    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{}[{}]", path, i);
        if let Some(normalized) = validate_value(item, inner, &item_path, mode, limits, errors) {
            out.push(normalized);
        }
    }

    Some(Value::Array(out))
}

fn validate_primitive(
    value: &Value,
    target: &TypeSpec,
    path: &str,
    mode: ValidationMode,
    limits: &Limits,
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    if matches_primitive(value, target) {
        if let Value::String(s) = value {
            if !limits.string_ok(s) {
                errors.push(
                    FieldError::new(path, ReasonCode::LimitExceeded)
                        .with_detail(format!("string exceeds {} characters", limits.max_str_len)),
                );
                return None;
            }
        }
        return Some(value.clone());
    }

    match mode {
        ValidationMode::Strict => {
            errors.push(
                FieldError::new(path, ReasonCode::TypeMismatch).with_detail(format!(
                    "expected {}, got {}",
                    target.type_name(),
                    type_label(value)
                )),
            );
            None
        }
        ValidationMode::Coerce => match coerce(value, target) {
            Some(canonical) => Some(canonical),
            None => {
                errors.push(
                    FieldError::new(path, ReasonCode::CoercionFailed).with_detail(format!(
                        "cannot coerce {} to {}",
                        type_label(value),
                        target.type_name()
                    )),
                );
                None
            }
        },
    }
}

fn matches_primitive(value: &Value, target: &TypeSpec) -> bool {
    match (target, value) {
        (TypeSpec::String, Value::String(_)) => true,
        (TypeSpec::Integer, Value::Number(n)) => n.is_i64(),
        (TypeSpec::Float, Value::Number(n)) => n.is_f64(),
        (TypeSpec::Boolean, Value::Bool(_)) => true,
        _ => false,
    }
}

fn join_field(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn error_path(path: &str) -> &str {
    if path.is_empty() {
        ROOT_PATH
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use serde_json::json;

    fn schema(value: Value) -> Schema {
        Schema::from_value(&value).unwrap()
    }

    #[test]
    fn test_strict_rejects_string_for_integer() {
        let s = schema(json!({"age": "integer"}));
        let errors = validate_structure(
            &json!({"age": "30"}),
            &s,
            ValidationMode::Strict,
            &Limits::default(),
        )
        .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "age");
        assert_eq!(errors[0].reason, ReasonCode::TypeMismatch);
    }

    #[test]
    fn test_coerce_normalizes_string_to_integer() {
        let s = schema(json!({"age": "integer"}));
        let normalized = validate_structure(
            &json!({"age": "30"}),
            &s,
            ValidationMode::Coerce,
            &Limits::default(),
        )
        .unwrap();

        assert_eq!(normalized, json!({"age": 30}));
    }

    #[test]
    fn test_missing_fields_reported_in_declaration_order() {
        let s = schema(json!({"name": "string", "age": "integer", "email": "string"}));
        let errors = validate_structure(
            &json!({}),
            &s,
            ValidationMode::Strict,
            &Limits::default(),
        )
        .unwrap_err();

        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "age", "email"]);
        assert!(errors.iter().all(|e| e.reason == ReasonCode::MissingField));
    }

    #[test]
    fn test_optional_field_omitted_from_output() {
        let s = schema(json!({"name": "string", "nickname": "string?"}));
        let normalized = validate_structure(
            &json!({"name": "Ada"}),
            &s,
            ValidationMode::Strict,
            &Limits::default(),
        )
        .unwrap();

        assert_eq!(normalized, json!({"name": "Ada"}));
    }

    #[test]
    fn test_null_satisfies_optional_only() {
        let s = schema(json!({"nickname": "string?", "name": "string"}));
        let errors = validate_structure(
            &json!({"nickname": null, "name": null}),
            &s,
            ValidationMode::Strict,
            &Limits::default(),
        )
        .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "name");
        assert_eq!(errors[0].reason, ReasonCode::TypeMismatch);
    }

    #[test]
    fn test_list_element_errors_are_indexed() {
        let s = schema(json!({"tags": ["string"]}));
        let errors = validate_structure(
            &json!({"tags": ["a", 2, "c"]}),
            &s,
            ValidationMode::Strict,
            &Limits::default(),
        )
        .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "tags[1]");
        assert_eq!(errors[0].reason, ReasonCode::TypeMismatch);
    }

    #[test]
    fn test_empty_list_is_valid() {
        let s = schema(json!({"tags": ["string"]}));
        let normalized = validate_structure(
            &json!({"tags": []}),
            &s,
            ValidationMode::Strict,
            &Limits::default(),
        )
        .unwrap();
        assert_eq!(normalized, json!({"tags": []}));
    }

    #[test]
    fn test_nested_object_paths() {
        let s = schema(json!({"address": {"zip": "string", "city": "string"}}));
        let errors = validate_structure(
            &json!({"address": {"zip": 12345, "city": "Berlin"}}),
            &s,
            ValidationMode::Strict,
            &Limits::default(),
        )
        .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "address.zip");
    }

    #[test]
    fn test_byte_limit_short_circuits_structure() {
        let s = schema(json!({"name": "string", "age": "integer"}));
        let limits = Limits {
            max_output_bytes: 8,
            ..Limits::default()
        };
        let errors = validate_structure(
            &json!({"unexpected": "a much longer payload"}),
            &s,
            ValidationMode::Strict,
            &limits,
        )
        .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "root");
        assert_eq!(errors[0].reason, ReasonCode::LimitExceeded);
    }

    #[test]
    fn test_subtree_limit_keeps_checking_siblings() {
        let s = schema(json!({"tags": ["string"], "name": "string"}));
        let limits = Limits {
            max_list_len: 1,
            ..Limits::default()
        };
        let errors = validate_structure(
            &json!({"tags": ["a", "b"], "name": 7}),
            &s,
            ValidationMode::Strict,
            &limits,
        )
        .unwrap_err();

        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["tags", "name"]);
        assert_eq!(errors[0].reason, ReasonCode::LimitExceeded);
        assert_eq!(errors[1].reason, ReasonCode::TypeMismatch);
    }

    #[test]
    fn test_strict_integer_is_not_a_float() {
        let s = schema(json!({"score": "float"}));
        let errors = validate_structure(
            &json!({"score": 3}),
            &s,
            ValidationMode::Strict,
            &Limits::default(),
        )
        .unwrap_err();
        assert_eq!(errors[0].reason, ReasonCode::TypeMismatch);

        let normalized = validate_structure(
            &json!({"score": 3}),
            &s,
            ValidationMode::Coerce,
            &Limits::default(),
        )
        .unwrap();
        assert_eq!(normalized["score"].as_f64(), Some(3.0));
    }

    #[test]
    fn test_coerce_mode_list_mismatch_is_type_mismatch() {
        // coercion handles primitives only; structured mismatches keep
        // their type_mismatch reason in both modes
        let s = schema(json!({"tags": ["string"]}));
        let errors = validate_structure(
            &json!({"tags": "a,b,c"}),
            &s,
            ValidationMode::Coerce,
            &Limits::default(),
        )
        .unwrap_err();
        assert_eq!(errors[0].reason, ReasonCode::TypeMismatch);
    }

    #[test]
    fn test_parse_candidate_strict_invalid_json() {
        let s = schema(json!({"name": "string"}));
        let errors = parse_candidate("not json", &s, ValidationMode::Strict).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "root");
        assert_eq!(errors[0].reason, ReasonCode::InvalidJson);
    }

    #[test]
    fn test_parse_candidate_coerce_wraps_single_string_schema() {
        let s = schema(json!({"answer": "string"}));
        let value = parse_candidate("plain text answer", &s, ValidationMode::Coerce).unwrap();
        assert_eq!(value, json!({"answer": "plain text answer"}));
    }

    #[test]
    fn test_parse_candidate_coerce_rejects_wider_schema() {
        let s = schema(json!({"answer": "string", "score": "integer"}));
        let errors = parse_candidate("plain text", &s, ValidationMode::Coerce).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "root");
        assert_eq!(errors[0].reason, ReasonCode::TypeMismatch);
    }

    #[test]
    fn test_normalized_output_revalidates_strict() {
        let s = schema(json!({
            "name": "string",
            "age": "integer",
            "active": "boolean",
            "score": "float"
        }));
        let normalized = validate_structure(
            &json!({"name": "Ada", "age": "36", "active": "yes", "score": 1}),
            &s,
            ValidationMode::Coerce,
            &Limits::default(),
        )
        .unwrap();

        let again =
            validate_structure(&normalized, &s, ValidationMode::Strict, &Limits::default())
                .unwrap();
        assert_eq!(again, normalized);
    }
}
