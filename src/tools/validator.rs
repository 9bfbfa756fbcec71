//! Schema validation and argument normalization.
//!
//! `validate` is pure: no I/O, no globals. Absent optional fields are filled
//! from their declared defaults, present fields are coerced to the declared
//! type, and fields the schema does not declare are dropped.

use serde_json::{Map, Number, Value};

use super::errors::ValidationError;
use super::schema::{FieldKind, Schema};

/// Arguments after coercion and default-filling.
pub type ValidatedArguments = Map<String, Value>;

/// Validate raw tool-call arguments against a schema.
///
/// `null` arguments are treated as an empty object. Any other non-object
/// value is rejected as a type mismatch on the pseudo-field `arguments`.
pub fn validate(schema: &Schema, raw: &Value) -> Result<ValidatedArguments, ValidationError> {
    let empty = Map::new();
    let object = match raw {
        Value::Null => &empty,
        Value::Object(map) => map,
        other => {
            return Err(ValidationError::TypeMismatch {
                field: "arguments".into(),
                expected: "object",
                actual: json_type(other).into(),
            })
        }
    };
    validate_object(schema, object, None)
}

fn validate_object(
    schema: &Schema,
    object: &Map<String, Value>,
    prefix: Option<&str>,
) -> Result<ValidatedArguments, ValidationError> {
    let mut out = Map::new();

    for field in schema.fields() {
        let path = match prefix {
            Some(p) => format!("{p}.{}", field.name),
            None => field.name.to_string(),
        };

        match object.get(field.name).filter(|v| !v.is_null()) {
            Some(value) => {
                let coerced = coerce(&field.kind, value, &path)?;
                out.insert(field.name.to_string(), coerced);
            }
            None if field.required => {
                return Err(ValidationError::MissingField { field: path });
            }
            None => {
                if let Some(default) = &field.default {
                    out.insert(field.name.to_string(), default.clone());
                }
            }
        }
    }

    Ok(out)
}

fn coerce(kind: &FieldKind, value: &Value, path: &str) -> Result<Value, ValidationError> {
    match kind {
        FieldKind::String { min_length } => {
            let s = value.as_str().ok_or_else(|| mismatch(kind, value, path))?;
            if let Some(min) = min_length {
                let len = s.chars().count();
                if len < *min {
                    return Err(ValidationError::InvalidLength {
                        field: path.to_string(),
                        reason: format!("expected at least {min} characters, got {len}"),
                    });
                }
            }
            Ok(value.clone())
        }

        FieldKind::Number { min, max } => {
            let (number, parsed) = match value {
                Value::Number(n) => (n.as_f64(), value.clone()),
                Value::String(s) => {
                    let parsed = s.trim().parse::<f64>().ok();
                    (parsed, parsed.map(number_value).unwrap_or(Value::Null))
                }
                _ => (None, Value::Null),
            };
            let n = number
                .filter(|n| n.is_finite())
                .ok_or_else(|| mismatch(kind, value, path))?;
            check_bounds(n, *min, *max, path)?;
            Ok(parsed)
        }

        FieldKind::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(mismatch(kind, value, path)),
        },

        FieldKind::Enum { allowed } => {
            let s = value.as_str().ok_or_else(|| mismatch(kind, value, path))?;
            if allowed.contains(&s) {
                Ok(value.clone())
            } else {
                Err(ValidationError::NotAllowed {
                    field: path.to_string(),
                    value: s.to_string(),
                    allowed: allowed.iter().map(|a| a.to_string()).collect(),
                })
            }
        }

        FieldKind::Array {
            items,
            min_items,
            max_items,
        } => {
            let elements = value.as_array().ok_or_else(|| mismatch(kind, value, path))?;
            if let Some(min) = min_items {
                if elements.len() < *min {
                    return Err(ValidationError::InvalidLength {
                        field: path.to_string(),
                        reason: format!("expected at least {min} items, got {}", elements.len()),
                    });
                }
            }
            if let Some(max) = max_items {
                if elements.len() > *max {
                    return Err(ValidationError::InvalidLength {
                        field: path.to_string(),
                        reason: format!("expected at most {max} items, got {}", elements.len()),
                    });
                }
            }
            elements
                .iter()
                .enumerate()
                .map(|(i, el)| coerce(items, el, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }

        FieldKind::Object { fields } => {
            let map = value.as_object().ok_or_else(|| mismatch(kind, value, path))?;
            if fields.is_empty() {
                return Ok(value.clone());
            }
            validate_object(fields, map, Some(path)).map(Value::Object)
        }
    }
}

fn check_bounds(n: f64, min: Option<f64>, max: Option<f64>, path: &str) -> Result<(), ValidationError> {
    if let Some(min) = min {
        if n < min {
            return Err(ValidationError::OutOfRange {
                field: path.to_string(),
                reason: format!("{n} is below the minimum of {min}"),
            });
        }
    }
    if let Some(max) = max {
        if n > max {
            return Err(ValidationError::OutOfRange {
                field: path.to_string(),
                reason: format!("{n} exceeds the maximum of {max}"),
            });
        }
    }
    Ok(())
}

/// Integral values parsed from strings are stored as JSON integers.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn mismatch(kind: &FieldKind, value: &Value, path: &str) -> ValidationError {
    ValidationError::TypeMismatch {
        field: path.to_string(),
        expected: kind.type_name(),
        actual: json_type(value).to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
