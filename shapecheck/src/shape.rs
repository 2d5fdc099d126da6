//! Expected-shape model.
//!
//! An expected shape is authored as plain JSON. Any mapping that carries one
//! of the reserved descriptor fields (`value`, `type`, `size`, `isRequired` by
//! default) is a leaf assertion; every other mapping or array is a nested
//! structure to walk. The distinction is made once, when the JSON is turned
//! into a [`Shape`] tree, so the comparator never has to re-inspect it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::comparator::extend_path;
use crate::config::DescriptorFields;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("expected shape must be a JSON object or array, got {0}")]
    NotAContainer(ValueType),
    #[error("'{path}': unknown type '{name}'")]
    UnknownType { path: String, name: String },
    #[error("'{path}': '{field}' must be a string")]
    TypeNotString { path: String, field: String },
    #[error("'{path}': '{field}' must be a non-negative integer")]
    InvalidSize { path: String, field: String },
    #[error("'{path}': '{field}' must be a boolean")]
    InvalidRequiredFlag { path: String, field: String },
}

/// Runtime type names accepted by a descriptor's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Array,
    Object,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl ValueType {
    /// The natural type of a JSON value. Numbers always report `number`.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
            Value::String(_) => ValueType::String,
            Value::Number(_) => ValueType::Number,
            Value::Bool(_) => ValueType::Boolean,
            Value::Null => ValueType::Null,
        }
    }

    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            ValueType::Integer => value.is_i64() || value.is_u64(),
            other => ValueType::of(value) == other,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Array => "array",
            ValueType::Object => "object",
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Integer => "integer",
            ValueType::Boolean => "boolean",
            ValueType::Null => "null",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "array" => Ok(ValueType::Array),
            "object" => Ok(ValueType::Object),
            "string" => Ok(ValueType::String),
            "number" => Ok(ValueType::Number),
            "integer" => Ok(ValueType::Integer),
            "boolean" | "bool" => Ok(ValueType::Boolean),
            "null" => Ok(ValueType::Null),
            other => Err(other.to_owned()),
        }
    }
}

/// Leaf assertion on a single actual value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(default)]
    pub is_required: bool,
}

/// Length of a string (in characters) or an array; `None` for anything else.
#[must_use]
pub fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(a) => Some(a.len()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A scalar the actual value must equal, `null` included.
    Literal(Value),
    /// `{}`: the actual value must be an empty object.
    EmptyObject,
    /// `[]`: the actual value must be an empty array.
    EmptyArray,
    Descriptor(Descriptor),
    Object(Vec<(String, Shape)>),
    Array(Vec<Shape>),
}

impl Shape {
    /// Builds a shape from JSON using the given descriptor field names.
    ///
    /// # Errors
    ///
    /// Returns an error if a descriptor carries a malformed `type`, `size` or
    /// `isRequired` field.
    pub fn from_value(value: &Value, fields: &DescriptorFields) -> Result<Self, ShapeError> {
        Self::build(value, fields, "")
    }

    /// Like [`Shape::from_value`], but the top level must be an object or array.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::NotAContainer`] for a scalar or descriptor at the
    /// top level, or any error from [`Shape::from_value`].
    pub fn root(value: &Value, fields: &DescriptorFields) -> Result<Self, ShapeError> {
        let shape = Self::from_value(value, fields)?;
        if shape.is_container() {
            Ok(shape)
        } else {
            Err(ShapeError::NotAContainer(ValueType::of(value)))
        }
    }

    fn build(value: &Value, fields: &DescriptorFields, path: &str) -> Result<Self, ShapeError> {
        match value {
            Value::Object(map) if map.is_empty() => Ok(Shape::EmptyObject),
            Value::Array(arr) if arr.is_empty() => Ok(Shape::EmptyArray),
            Value::Object(map) if map.keys().any(|k| fields.is_reserved(k)) => {
                Self::descriptor(map, fields, path).map(Shape::Descriptor)
            }
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| {
                    let here = extend_path(path, k, false);
                    Ok((k.clone(), Self::build(v, fields, &here)?))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Shape::Object),
            Value::Array(arr) => arr
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let here = extend_path(path, &i.to_string(), true);
                    Self::build(v, fields, &here)
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Shape::Array),
            scalar => Ok(Shape::Literal(scalar.clone())),
        }
    }

    fn descriptor(
        map: &serde_json::Map<String, Value>,
        fields: &DescriptorFields,
        path: &str,
    ) -> Result<Descriptor, ShapeError> {
        let value_type = match map.get(&fields.value_type) {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => {
                Some(name.parse::<ValueType>().map_err(|name| ShapeError::UnknownType {
                    path: path.to_owned(),
                    name,
                })?)
            }
            Some(_) => {
                return Err(ShapeError::TypeNotString {
                    path: path.to_owned(),
                    field: fields.value_type.clone(),
                });
            }
        };

        let size = match map.get(&fields.size) {
            None | Some(Value::Null) => None,
            Some(v) => Some(
                v.as_u64()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| ShapeError::InvalidSize {
                        path: path.to_owned(),
                        field: fields.size.clone(),
                    })?,
            ),
        };

        let is_required = match map.get(&fields.is_required) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                return Err(ShapeError::InvalidRequiredFlag {
                    path: path.to_owned(),
                    field: fields.is_required.clone(),
                });
            }
        };

        Ok(Descriptor {
            value: map.get(&fields.value).cloned(),
            value_type,
            size,
            is_required,
        })
    }

    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Shape::Object(_) | Shape::Array(_) | Shape::EmptyObject | Shape::EmptyArray
        )
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Shape::Array(_) | Shape::EmptyArray)
    }

    /// Keyed children in declaration order; array positions are keyed by
    /// their index. `None` for leaves.
    pub(crate) fn entries(&self) -> Option<Vec<(Cow<'_, str>, &Shape)>> {
        match self {
            Shape::Object(items) => Some(
                items
                    .iter()
                    .map(|(k, v)| (Cow::Borrowed(k.as_str()), v))
                    .collect(),
            ),
            Shape::Array(items) => Some(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (Cow::Owned(i.to_string()), v))
                    .collect(),
            ),
            Shape::EmptyObject | Shape::EmptyArray => Some(Vec::new()),
            Shape::Literal(_) | Shape::Descriptor(_) => None,
        }
    }
}

impl TryFrom<&Value> for Shape {
    type Error = ShapeError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Shape::from_value(value, &DescriptorFields::default())
    }
}
