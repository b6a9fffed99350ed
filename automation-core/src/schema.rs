//! Schema - Define type schemas for resources
//!
//! Providers define a schema for each resource type. Configuration is checked
//! against it and decoded into typed models in a single step, so resource code
//! never inspects loosely typed attribute maps.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;

use crate::resource::{Attributes, Value, attributes_to_json};

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Nested block with its own fields
    Struct {
        name: String,
        fields: Vec<AttributeSchema>,
    },
}

impl AttributeType {
    /// Enum type from a list of string slices
    pub fn enumeration(variants: &[&str]) -> Self {
        AttributeType::Enum(variants.iter().map(|v| v.to_string()).collect())
    }

    /// List of strings
    pub fn string_list() -> Self {
        AttributeType::List(Box::new(AttributeType::String))
    }

    /// Map of strings
    pub fn string_map() -> Self {
        AttributeType::Map(Box::new(AttributeType::String))
    }

    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { base, validate, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Struct { fields, .. }, Value::Map(map)) => {
                let errors = validate_fields(fields.iter(), map);
                match errors.into_iter().next() {
                    None => Ok(()),
                    Some(e) => Err(e),
                }
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    /// Fill in defaults of nested struct fields
    fn apply_defaults(&self, value: &mut Value) {
        match (self, value) {
            (AttributeType::Struct { fields, .. }, Value::Map(map)) => {
                apply_field_defaults(fields.iter(), map);
            }
            (AttributeType::List(inner), Value::List(items)) => {
                for item in items {
                    inner.apply_defaults(item);
                }
            }
            _ => {}
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Struct { name, .. } => name.clone(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is read-only and cannot be set")]
    ReadOnlyAttribute { name: String },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// Error returned when attributes cannot be decoded into a typed model
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("{}", join_errors(.0))]
    Invalid(Vec<TypeError>),

    #[error("Malformed attributes: {0}")]
    Malformed(#[from] serde_json::Error),
}

fn join_errors(errors: &[TypeError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Set by the API; may not be configured
    pub read_only: bool,
    /// Changing this attribute requires the resource to be replaced
    pub force_new: bool,
    /// Never returned by the API (secrets, uploaded content)
    pub write_only: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            read_only: false,
            force_new: false,
            write_only: false,
            default: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.get(name)
    }

    /// Names of attributes the API never returns
    pub fn write_only_attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .values()
            .filter(|a| a.write_only)
            .map(|a| a.name.as_str())
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &Attributes) -> Result<(), Vec<TypeError>> {
        let errors = validate_fields(self.attributes.values(), attributes);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Copy of the attributes with schema defaults filled in
    pub fn with_defaults(&self, attributes: &Attributes) -> Attributes {
        let mut attributes = attributes.clone();
        apply_field_defaults(self.attributes.values(), &mut attributes);
        attributes
    }

    /// Validate attributes, apply defaults and deserialize into a typed model
    pub fn decode<T: DeserializeOwned>(&self, attributes: &Attributes) -> Result<T, DecodeError> {
        self.validate(attributes).map_err(DecodeError::Invalid)?;
        let attributes = self.with_defaults(attributes);
        Ok(serde_json::from_value(attributes_to_json(&attributes))?)
    }
}

fn validate_fields<'a>(
    fields: impl Iterator<Item = &'a AttributeSchema> + Clone,
    values: &HashMap<String, Value>,
) -> Vec<TypeError> {
    let mut errors = Vec::new();

    let mut required: Vec<&AttributeSchema> = fields
        .clone()
        .filter(|s| s.required && s.default.is_none() && !values.contains_key(&s.name))
        .collect();
    required.sort_by(|a, b| a.name.cmp(&b.name));
    for schema in required {
        errors.push(TypeError::MissingRequired {
            name: schema.name.clone(),
        });
    }

    let mut names: Vec<&String> = values.keys().collect();
    names.sort();
    for name in names {
        let Some(schema) = fields.clone().find(|s| &s.name == name) else {
            errors.push(TypeError::UnknownAttribute { name: name.clone() });
            continue;
        };
        if schema.read_only {
            errors.push(TypeError::ReadOnlyAttribute { name: name.clone() });
            continue;
        }
        if let Err(e) = schema.attr_type.validate(&values[name]) {
            errors.push(TypeError::AttributeError {
                name: name.clone(),
                inner: Box::new(e),
            });
        }
    }

    errors
}

fn apply_field_defaults<'a>(
    fields: impl Iterator<Item = &'a AttributeSchema>,
    values: &mut HashMap<String, Value>,
) {
    for schema in fields {
        match values.get_mut(&schema.name) {
            Some(value) => schema.attr_type.apply_defaults(value),
            None => {
                if let Some(default) = &schema.default {
                    values.insert(schema.name.clone(), default.clone());
                }
            }
        }
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        AttributeType::Custom {
            name: "PositiveInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| {
                if let Value::Int(n) = value {
                    if *n > 0 {
                        Ok(())
                    } else {
                        Err("Value must be positive".to_string())
                    }
                } else {
                    Err("Expected integer".to_string())
                }
            },
        }
    }

    /// Non-empty string type
    pub fn non_empty_string() -> AttributeType {
        AttributeType::Custom {
            name: "NonEmptyString".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) if !s.trim().is_empty() => Ok(()),
                Value::String(_) => Err("Value must not be empty".to_string()),
                _ => Err("Expected string".to_string()),
            },
        }
    }
}
