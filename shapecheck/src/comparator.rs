//! Structural comparison of an expected [`Shape`] against an actual document.
//!
//! The walk follows the expected shape's key order and stops at the first
//! divergence, which is reported as a [`Violation`]: a dotted/bracketed path
//! plus a reason token, e.g. `items[0].id:_type:integer`.
//!
//! Three modes control how key sets must relate at every level:
//!
//! - [`ComparisonMode::Inclusive`]: both sides carry exactly the same keys.
//! - [`ComparisonMode::BoundedAbove`]: actual keys are a subset of expected
//!   keys (omission allowed, no extra keys).
//! - [`ComparisonMode::BoundedBelow`]: expected keys are a subset of actual
//!   keys (extra keys allowed, no omission).
//!
//! [`CompareOptions::keys_only`] restricts the walk to key structure: literal
//! values and descriptor `value`s are then not compared.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::config::DescriptorFields;
use crate::path_resolver::resolve;
use crate::shape::{Descriptor, Shape, ShapeError, ValueType, length_of};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonMode {
    #[default]
    Inclusive,
    BoundedAbove,
    BoundedBelow,
}

impl ComparisonMode {
    #[must_use]
    pub fn is_bounded(self) -> bool {
        !matches!(self, ComparisonMode::Inclusive)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonMode::Inclusive => "inclusive",
            ComparisonMode::BoundedAbove => "bounded-above",
            ComparisonMode::BoundedBelow => "bounded-below",
        }
    }
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "inclusive" | "exact" => Ok(ComparisonMode::Inclusive),
            "bounded-above" | "above" | "subset" => Ok(ComparisonMode::BoundedAbove),
            "bounded-below" | "below" | "superset" => Ok(ComparisonMode::BoundedBelow),
            _ => Err(format!(
                "unknown comparison mode '{s}', expected one of: inclusive, bounded-above, bounded-below"
            )),
        }
    }
}

/// Settings that apply to a whole comparison, independent of the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareOptions {
    /// Compare literal values and descriptor `value`s, not only keys.
    pub with_values: bool,
}

impl CompareOptions {
    /// Key structure, types and sizes only.
    #[must_use]
    pub fn keys_only() -> Self {
        CompareOptions { with_values: false }
    }
}

impl Default for CompareOptions {
    fn default() -> Self {
        CompareOptions { with_values: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// A key the mode or a descriptor requires is absent.
    MissingRequiredKey,
    /// A key is present where the mode forbids it.
    UnexpectedKey,
    ValueMismatch { expected: Value },
    TypeMismatch { expected: ValueType },
    /// `sized` is false when the actual value has no length at all.
    SizeMismatch { expected: usize, sized: bool },
    /// The scoping path matched nothing in the actual document.
    SubkeyNotFound,
    /// The expected shape itself is a scalar or a descriptor, so there are no
    /// keys to walk.
    NotAContainer,
}

impl ViolationKind {
    /// The reason token appended to the path after `:`.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            ViolationKind::MissingRequiredKey
            | ViolationKind::UnexpectedKey
            | ViolationKind::SubkeyNotFound => "_required".to_owned(),
            ViolationKind::NotAContainer => "_container".to_owned(),
            ViolationKind::ValueMismatch { expected } => match expected {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            ViolationKind::TypeMismatch { expected } => format!("_type:{expected}"),
            ViolationKind::SizeMismatch {
                expected,
                sized: true,
            } => format!("_size:{expected}"),
            ViolationKind::SizeMismatch {
                expected,
                sized: false,
            } => format!("_unsized:{expected}"),
        }
    }
}

/// The first divergence found by [`compare`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub path: String,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl Violation {
    fn new(path: impl Into<String>, kind: ViolationKind) -> Self {
        Violation {
            path: path.into(),
            kind,
        }
    }

    #[must_use]
    pub fn reason(&self) -> String {
        self.kind.reason()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.reason())
        } else {
            write!(f, "{}:{}", self.path, self.reason())
        }
    }
}

/// Appends one segment to a violation path.
///
/// Segments under an array render as `[key]` glued to the previous segment;
/// object keys render as `.key`, without the dot at the root.
pub(crate) fn extend_path(path: &str, key: &str, parent_is_array: bool) -> String {
    if parent_is_array {
        format!("{path}[{key}]")
    } else if path.is_empty() {
        key.to_owned()
    } else {
        format!("{path}.{key}")
    }
}

/// Compares `actual` against `expected` and returns the first violation.
///
/// When `subkey` is given, `actual` is first narrowed to the subtree at that
/// path and violation paths are relative to it. A subkey that resolves to
/// nothing is reported at the subkey itself.
#[must_use]
pub fn compare(
    expected: &Shape,
    actual: &Value,
    mode: ComparisonMode,
    subkey: Option<&str>,
) -> Option<Violation> {
    compare_with(expected, actual, mode, subkey, CompareOptions::default())
}

/// [`compare`] with explicit [`CompareOptions`].
#[must_use]
pub fn compare_with(
    expected: &Shape,
    actual: &Value,
    mode: ComparisonMode,
    subkey: Option<&str>,
    options: CompareOptions,
) -> Option<Violation> {
    let actual = match subkey {
        Some(path) => match resolve(actual, path) {
            Some(scoped) => scoped,
            None => return Some(Violation::new(path, ViolationKind::SubkeyNotFound)),
        },
        None => actual,
    };

    if !expected.is_container() {
        return Some(Violation::new(
            subkey.unwrap_or_default(),
            ViolationKind::NotAContainer,
        ));
    }

    let parent_is_array = expected.is_array() && actual.is_array();
    walk(expected, actual, mode, options, "", parent_is_array)
}

/// Builds the shape from raw JSON with `fields`, then runs [`compare_with`].
///
/// # Errors
///
/// Returns an error if `expected` is not an object/array or carries a
/// malformed descriptor.
pub fn compare_values(
    expected: &Value,
    actual: &Value,
    mode: ComparisonMode,
    subkey: Option<&str>,
    options: CompareOptions,
    fields: &DescriptorFields,
) -> Result<Option<Violation>, ShapeError> {
    let shape = Shape::root(expected, fields)?;
    Ok(compare_with(&shape, actual, mode, subkey, options))
}

fn actual_keys(value: &Value) -> Vec<Cow<'_, str>> {
    match value {
        Value::Object(map) => map.keys().map(|k| Cow::Borrowed(k.as_str())).collect(),
        Value::Array(arr) => (0..arr.len()).map(|i| Cow::Owned(i.to_string())).collect(),
        _ => Vec::new(),
    }
}

fn actual_get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(arr) => key.parse::<usize>().ok().and_then(|i| arr.get(i)),
        _ => None,
    }
}

fn walk(
    expected: &Shape,
    actual: &Value,
    mode: ComparisonMode,
    options: CompareOptions,
    path: &str,
    parent_is_array: bool,
) -> Option<Violation> {
    let entries = expected.entries().unwrap_or_default();
    let actual_keys = actual_keys(actual);

    let in_expected = |key: &str| entries.iter().any(|(k, _)| k == key);
    let in_actual = |key: &str| actual_keys.iter().any(|k| k == key);
    let at = |key: &str| extend_path(path, key, parent_is_array);

    // Key-set check, once per level.
    match mode {
        ComparisonMode::Inclusive if entries.len() > actual_keys.len() => {
            if let Some((key, _)) = entries.iter().find(|(k, _)| !in_actual(k)) {
                return Some(Violation::new(at(key), ViolationKind::MissingRequiredKey));
            }
        }
        ComparisonMode::Inclusive if entries.len() < actual_keys.len() => {
            if let Some(key) = actual_keys.iter().find(|k| !in_expected(k)) {
                return Some(Violation::new(at(key), ViolationKind::UnexpectedKey));
            }
        }
        ComparisonMode::BoundedAbove => {
            if let Some(key) = actual_keys.iter().find(|k| !in_expected(k)) {
                return Some(Violation::new(at(key), ViolationKind::UnexpectedKey));
            }
        }
        ComparisonMode::BoundedBelow => {
            if let Some((key, _)) = entries.iter().find(|(k, _)| !in_actual(k)) {
                return Some(Violation::new(at(key), ViolationKind::MissingRequiredKey));
            }
        }
        ComparisonMode::Inclusive => {}
    }

    for (key, shape) in &entries {
        let here = at(key);
        let actual_value = actual_get(actual, key);

        if mode == ComparisonMode::Inclusive && actual_value.is_none() {
            return Some(Violation::new(here, ViolationKind::MissingRequiredKey));
        }

        if let Some(violation) = check_entry(shape, actual_value, mode, options, &here) {
            return Some(violation);
        }
    }

    None
}

/// Checks one expected entry. `actual` is `None` when the key is absent,
/// which only survives the key-set check in [`ComparisonMode::BoundedAbove`].
fn check_entry(
    shape: &Shape,
    actual: Option<&Value>,
    mode: ComparisonMode,
    options: CompareOptions,
    here: &str,
) -> Option<Violation> {
    match shape {
        Shape::Descriptor(descriptor) => check_descriptor(descriptor, actual, mode, options, here),
        Shape::EmptyObject | Shape::EmptyArray => {
            let actual = actual?;
            let (identical, literal) = if matches!(shape, Shape::EmptyObject) {
                (
                    actual.as_object().is_some_and(serde_json::Map::is_empty),
                    Value::Object(serde_json::Map::new()),
                )
            } else {
                (
                    actual.as_array().is_some_and(Vec::is_empty),
                    Value::Array(Vec::new()),
                )
            };
            (!identical)
                .then(|| Violation::new(here, ViolationKind::ValueMismatch { expected: literal }))
        }
        Shape::Object(_) | Shape::Array(_) => {
            let actual = actual?;
            if actual.is_object() || actual.is_array() {
                let both_arrays = shape.is_array() && actual.is_array();
                walk(shape, actual, mode, options, here, both_arrays)
            } else {
                let expected = if shape.is_array() {
                    ValueType::Array
                } else {
                    ValueType::Object
                };
                Some(Violation::new(here, ViolationKind::TypeMismatch { expected }))
            }
        }
        Shape::Literal(_) if !options.with_values => None,
        Shape::Literal(expected) => {
            let actual = actual?;
            (!same_value(expected, actual)).then(|| {
                Violation::new(
                    here,
                    ViolationKind::ValueMismatch {
                        expected: expected.clone(),
                    },
                )
            })
        }
    }
}

fn check_descriptor(
    descriptor: &Descriptor,
    actual: Option<&Value>,
    mode: ComparisonMode,
    options: CompareOptions,
    here: &str,
) -> Option<Violation> {
    if mode.is_bounded() && descriptor.is_required && actual.is_none_or(Value::is_null) {
        return Some(Violation::new(here, ViolationKind::MissingRequiredKey));
    }

    // Absent and not required: nothing left to check.
    let actual = actual?;

    if let Some(expected) = &descriptor.value
        && options.with_values
        && !same_value(expected, actual)
    {
        return Some(Violation::new(
            here,
            ViolationKind::ValueMismatch {
                expected: expected.clone(),
            },
        ));
    }

    if let Some(expected) = descriptor.value_type
        && !expected.matches(actual)
    {
        return Some(Violation::new(here, ViolationKind::TypeMismatch { expected }));
    }

    if let Some(expected) = descriptor.size {
        match length_of(actual) {
            None => {
                return Some(Violation::new(
                    here,
                    ViolationKind::SizeMismatch {
                        expected,
                        sized: false,
                    },
                ));
            }
            Some(len) if len != expected => {
                return Some(Violation::new(
                    here,
                    ViolationKind::SizeMismatch {
                        expected,
                        sized: true,
                    },
                ));
            }
            Some(_) => {}
        }
    }

    None
}

/// Deep equality, except that numbers compare by numeric value so `1` and
/// `1.0` are the same at any depth.
pub(crate) fn same_value(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
                x == y
            } else {
                match (a.as_f64(), b.as_f64()) {
                    (Some(x), Some(y)) => x.total_cmp(&y).is_eq(),
                    _ => false,
                }
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_value(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, x)| b.get(k).is_some_and(|y| same_value(x, y)))
        }
        _ => expected == actual,
    }
}
