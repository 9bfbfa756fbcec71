//! Declarative input schemas for tools.
//!
//! A [`Schema`] is an ordered list of [`FieldSpec`]s. Each field carries a
//! [`FieldKind`], the tagged variant the validator matches on, plus
//! `required`/`default` metadata. Schemas render to JSON Schema for the MCP
//! `tools/list` response.

use serde_json::{json, Map, Value};

// ─── Field kinds ─────────────────────────────────────────────────────────────

/// The declared type of a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String {
        min_length: Option<usize>,
    },
    Number {
        min: Option<f64>,
        max: Option<f64>,
    },
    Boolean,
    Enum {
        allowed: &'static [&'static str],
    },
    Array {
        items: Box<FieldKind>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    /// A nested object. An empty schema accepts any object unchanged.
    Object {
        fields: Schema,
    },
}

impl FieldKind {
    /// Human-readable type name used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String { .. } => "string",
            Self::Number { .. } => "number",
            Self::Boolean => "boolean",
            Self::Enum { .. } => "enum",
            Self::Array { .. } => "array",
            Self::Object { .. } => "object",
        }
    }

    /// Render this kind as a JSON Schema fragment.
    pub fn to_json_schema(&self) -> Value {
        match self {
            Self::String { min_length } => {
                let mut out = json!({ "type": "string" });
                if let Some(min) = min_length {
                    out["minLength"] = json!(min);
                }
                out
            }
            Self::Number { min, max } => {
                let mut out = json!({ "type": "number" });
                if let Some(min) = min {
                    out["minimum"] = json!(min);
                }
                if let Some(max) = max {
                    out["maximum"] = json!(max);
                }
                out
            }
            Self::Boolean => json!({ "type": "boolean" }),
            Self::Enum { allowed } => json!({ "type": "string", "enum": allowed }),
            Self::Array {
                items,
                min_items,
                max_items,
            } => {
                let mut out = json!({ "type": "array", "items": items.to_json_schema() });
                if let Some(min) = min_items {
                    out["minItems"] = json!(min);
                }
                if let Some(max) = max_items {
                    out["maxItems"] = json!(max);
                }
                out
            }
            Self::Object { fields } => fields.to_json_schema(),
        }
    }
}

// ─── FieldSpec ───────────────────────────────────────────────────────────────

/// One named field of a tool's input schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
}

impl FieldSpec {
    fn new(name: &'static str, description: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            description,
            kind,
            required: false,
            default: None,
        }
    }

    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, description, FieldKind::String { min_length: None })
    }

    /// A string that must contain at least one character.
    pub fn non_empty_string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, description, FieldKind::String { min_length: Some(1) })
    }

    pub fn number(name: &'static str, description: &'static str) -> Self {
        Self::new(name, description, FieldKind::Number { min: None, max: None })
    }

    /// A number constrained to the inclusive range `[min, max]`.
    pub fn bounded_number(name: &'static str, description: &'static str, min: f64, max: f64) -> Self {
        Self::new(
            name,
            description,
            FieldKind::Number {
                min: Some(min),
                max: Some(max),
            },
        )
    }

    pub fn boolean(name: &'static str, description: &'static str) -> Self {
        Self::new(name, description, FieldKind::Boolean)
    }

    pub fn enumeration(
        name: &'static str,
        description: &'static str,
        allowed: &'static [&'static str],
    ) -> Self {
        Self::new(name, description, FieldKind::Enum { allowed })
    }

    pub fn string_array(name: &'static str, description: &'static str) -> Self {
        Self::new(
            name,
            description,
            FieldKind::Array {
                items: Box::new(FieldKind::String { min_length: None }),
                min_items: None,
                max_items: None,
            },
        )
    }

    /// An array of free-form objects (e.g. chat history entries).
    pub fn object_array(name: &'static str, description: &'static str) -> Self {
        Self::new(
            name,
            description,
            FieldKind::Array {
                items: Box::new(FieldKind::Object {
                    fields: Schema::empty(),
                }),
                min_items: None,
                max_items: None,
            },
        )
    }

    pub fn object(name: &'static str, description: &'static str, fields: Schema) -> Self {
        Self::new(name, description, FieldKind::Object { fields })
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value substituted when the field is absent.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Set array length bounds. No-op on non-array kinds.
    pub fn items_between(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        if let FieldKind::Array {
            min_items,
            max_items,
            ..
        } = &mut self.kind
        {
            *min_items = min;
            *max_items = max;
        }
        self
    }

    fn to_json_schema(&self) -> Value {
        let mut out = self.kind.to_json_schema();
        if !self.description.is_empty() {
            out["description"] = json!(self.description);
        }
        if let Some(default) = &self.default {
            out["default"] = default.clone();
        }
        out
    }
}

// ─── Schema ──────────────────────────────────────────────────────────────────

/// An ordered set of field declarations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// A schema with no declared fields.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Names of the required fields, in declaration order.
    pub fn required_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect()
    }

    /// Render as a JSON Schema `object` definition.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.to_string(), f.to_json_schema()))
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": self.required_fields(),
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
