//! Named body assertions for request/response payloads.
//!
//! Every check runs as a named test and reports a single [`Outcome`] to a
//! [`Reporter`]. Failure messages carry the payload direction as a prefix, e.g.
//! `[Response] Invalid key: items[0].id:_type:integer`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::comparator::{CompareOptions, ComparisonMode, Violation, compare_with, same_value};
use crate::config::DescriptorFields;
use crate::path_resolver::resolve;
use crate::shape::{Shape, ShapeError, ValueType, length_of};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Direction::Request => "[Request]",
            Direction::Response => "[Response]",
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "request" | "req" => Ok(Direction::Request),
            "response" | "res" => Ok(Direction::Response),
            _ => Err(format!(
                "unknown direction '{s}', expected 'request' or 'response'"
            )),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

#[derive(Debug, Error)]
pub enum AssertionError {
    #[error("Body must not be empty")]
    EmptyBody,
    #[error("Body must be empty")]
    NonEmptyBody,
    #[error("Body must be JSON-body: {0}")]
    NotJson(String),
    #[error("Must not be JSON body")]
    UnexpectedJson,
    #[error("Content is different")]
    ContentMismatch,
    #[error("Missing key '{0}'")]
    MissingKey(String),
    #[error("Key '{key}' must equal {expected}")]
    KeyValueMismatch { key: String, expected: Value },
    #[error("Key '{key}' must be {expected}, got {actual}")]
    KeyTypeMismatch {
        key: String,
        expected: ValueType,
        actual: ValueType,
    },
    #[error("Key '{key}' must have length {expected}, got {actual}")]
    KeySizeMismatch {
        key: String,
        expected: usize,
        actual: usize,
    },
    #[error("Invalid key entry: {0}")]
    InvalidEntry(String),
    #[error("Invalid expected shape: {0}")]
    InvalidShape(#[from] ShapeError),
    #[error("Invalid key: {0}")]
    Violation(Violation),
}

/// Result of one named test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub name: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Receives pass/fail outcomes.
pub trait Reporter {
    fn report(&mut self, outcome: Outcome);
}

/// Summary of a batch of outcomes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub outcomes: Vec<Outcome>,
}

impl RunReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn merge(&mut self, other: RunReport) {
        for outcome in other.outcomes {
            self.report(outcome);
        }
    }
}

impl Reporter for RunReport {
    fn report(&mut self, outcome: Outcome) {
        self.total += 1;
        if outcome.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.outcomes.push(outcome);
    }
}

/// One key assertion for [`Assertions::has_keys`].
///
/// Accepted JSON forms: `"a.b[0]"`, `["a.b", value, type, size]` and
/// `{"key": "a.b", "value": ..., "type": ..., "size": ...}`. Trailing array
/// items and object fields are optional; `null` means "not given".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyEntry {
    pub key: String,
    pub value: Option<Value>,
    pub value_type: Option<ValueType>,
    pub size: Option<usize>,
}

impl KeyEntry {
    #[must_use]
    pub fn key(key: &str) -> Self {
        KeyEntry {
            key: key.to_owned(),
            ..KeyEntry::default()
        }
    }

    /// Parses one entry.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::InvalidEntry`] for any other JSON form or a
    /// malformed field.
    pub fn from_value(entry: &Value) -> Result<Self, AssertionError> {
        fn given(v: Option<&Value>) -> Option<&Value> {
            v.filter(|v| !v.is_null())
        }

        let (key, value, value_type, size) = match entry {
            Value::String(key) => return Ok(KeyEntry::key(key)),
            Value::Array(items) => (
                items.first(),
                items.get(1),
                items.get(2),
                items.get(3),
            ),
            Value::Object(map) => (
                map.get("key"),
                map.get("value"),
                map.get("type"),
                map.get("size"),
            ),
            other => return Err(AssertionError::InvalidEntry(other.to_string())),
        };

        let invalid = || AssertionError::InvalidEntry(entry.to_string());

        let key = given(key)
            .and_then(Value::as_str)
            .ok_or_else(invalid)?
            .to_owned();
        let value_type = match given(value_type) {
            None => None,
            Some(t) => Some(
                t.as_str()
                    .and_then(|t| t.parse::<ValueType>().ok())
                    .ok_or_else(invalid)?,
            ),
        };
        let size = match given(size) {
            None => None,
            Some(s) => Some(
                s.as_u64()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(invalid)?,
            ),
        };

        Ok(KeyEntry {
            key,
            value: given(value).cloned(),
            value_type,
            size,
        })
    }

    /// Parses a list of entries from a JSON array.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::InvalidEntry`] if `entries` is not an array
    /// or any entry is malformed.
    pub fn list_from_value(entries: &Value) -> Result<Vec<Self>, AssertionError> {
        entries
            .as_array()
            .ok_or_else(|| AssertionError::InvalidEntry(entries.to_string()))?
            .iter()
            .map(Self::from_value)
            .collect()
    }

    fn check(&self, document: &Value) -> Result<(), AssertionError> {
        let actual = resolve(document, &self.key)
            .ok_or_else(|| AssertionError::MissingKey(self.key.clone()))?;

        if let Some(expected) = &self.value
            && !same_value(expected, actual)
        {
            return Err(AssertionError::KeyValueMismatch {
                key: self.key.clone(),
                expected: expected.clone(),
            });
        }

        if let Some(expected) = self.value_type {
            if !expected.matches(actual) {
                return Err(AssertionError::KeyTypeMismatch {
                    key: self.key.clone(),
                    expected,
                    actual: ValueType::of(actual),
                });
            }

            // Without a length-bearing type the size is not looked at.
            if let Some(size) = self.size
                && matches!(expected, ValueType::Array | ValueType::String)
                && let Some(len) = length_of(actual)
                && len != size
            {
                return Err(AssertionError::KeySizeMismatch {
                    key: self.key.clone(),
                    expected: size,
                    actual: len,
                });
            }
        }

        Ok(())
    }
}

/// Expected literal content of a body.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Compared character for character.
    Text(String),
    /// Compared as parsed JSON. A JSON string holding a document is parsed
    /// before comparison.
    Json(Value),
}

/// Checks combined into a single "blank analysis" test. `None` skips a check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlankChecks {
    pub body: Option<bool>,
    pub json: Option<bool>,
    pub content: Option<Content>,
}

pub struct Assertions<'r> {
    direction: Direction,
    body: Option<String>,
    fields: DescriptorFields,
    reporter: &'r mut dyn Reporter,
}

impl<'r> Assertions<'r> {
    #[must_use]
    pub fn new(direction: Direction, body: Option<String>, reporter: &'r mut dyn Reporter) -> Self {
        Assertions {
            direction,
            body,
            fields: DescriptorFields::default(),
            reporter,
        }
    }

    /// Uses custom descriptor field names for shape assertions.
    #[must_use]
    pub fn with_fields(mut self, fields: DescriptorFields) -> Self {
        self.fields = fields;
        self
    }

    fn text(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }

    fn default_name(&self, name: Option<&str>, fallback: &str) -> String {
        name.map_or_else(|| format!("{} {fallback}", self.direction), str::to_owned)
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::NotJson`] when the body is missing or not
    /// valid JSON.
    pub fn json(&self) -> Result<Value, AssertionError> {
        serde_json::from_str(self.text()).map_err(|e| AssertionError::NotJson(e.to_string()))
    }

    /// Runs `check` as a named test and reports its outcome.
    pub fn test<F>(&mut self, name: String, check: F) -> bool
    where
        F: FnOnce(&Self) -> Result<(), AssertionError>,
    {
        let result = check(&*self);
        let outcome = match result {
            Ok(()) => {
                tracing::debug!("PASS {name}");
                Outcome {
                    name,
                    passed: true,
                    message: None,
                }
            }
            Err(e) => {
                let message = format!("{} {e}", self.direction);
                tracing::debug!("FAIL {name}: {message}");
                Outcome {
                    name,
                    passed: false,
                    message: Some(message),
                }
            }
        };
        let passed = outcome.passed;
        self.reporter.report(outcome);
        passed
    }

    fn expect_body(&self, present: bool) -> Result<(), AssertionError> {
        match (present, self.text().is_empty()) {
            (true, true) => Err(AssertionError::EmptyBody),
            (false, false) => Err(AssertionError::NonEmptyBody),
            _ => Ok(()),
        }
    }

    fn expect_json(&self, json: bool) -> Result<(), AssertionError> {
        self.expect_body(true)?;
        match (json, self.json()) {
            (true, Err(e)) => Err(e),
            (false, Ok(_)) => Err(AssertionError::UnexpectedJson),
            _ => Ok(()),
        }
    }

    fn expect_content(&self, content: &Content) -> Result<(), AssertionError> {
        self.expect_body(true)?;
        let equal = match content {
            Content::Text(expected) => self.text() == expected,
            Content::Json(expected) => {
                let actual = self.json()?;
                let expected = match expected {
                    Value::String(raw) => serde_json::from_str(raw)
                        .map_err(|e| AssertionError::NotJson(e.to_string()))?,
                    other => other.clone(),
                };
                same_value(&expected, &actual)
            }
        };
        if equal {
            Ok(())
        } else {
            Err(AssertionError::ContentMismatch)
        }
    }

    pub fn has_body(&mut self, name: Option<&str>) -> bool {
        let name = self.default_name(name, "Body must not be empty");
        self.test(name, |a| a.expect_body(true))
    }

    pub fn has_not_body(&mut self, name: Option<&str>) -> bool {
        let name = self.default_name(name, "Body must be empty");
        self.test(name, |a| a.expect_body(false))
    }

    pub fn has_json(&mut self, name: Option<&str>) -> bool {
        let name = self.default_name(name, "Body must not be empty but be json");
        self.test(name, |a| a.expect_json(true))
    }

    pub fn has_not_json(&mut self, name: Option<&str>) -> bool {
        let name = self.default_name(name, "Body must be empty and not be json");
        self.test(name, |a| a.expect_json(false))
    }

    pub fn has_content(&mut self, expected: &str, name: Option<&str>) -> bool {
        let name = self.default_name(name, "Body is equal to content");
        let content = Content::Text(expected.to_owned());
        self.test(name, |a| a.expect_content(&content))
    }

    pub fn has_json_content(&mut self, expected: &Value, name: Option<&str>) -> bool {
        let name = self.default_name(name, "Body is equal to json content");
        let content = Content::Json(expected.clone());
        self.test(name, |a| a.expect_content(&content))
    }

    /// Checks every key entry against the parsed body; stops at the first
    /// failing entry.
    pub fn has_keys(&mut self, entries: &[KeyEntry], name: Option<&str>) -> bool {
        let name = self.default_name(name, "Json body has properties");
        self.test(name, |a| {
            let document = a.json()?;
            entries.iter().try_for_each(|entry| entry.check(&document))
        })
    }

    /// Structural comparison of the parsed body (or its `subkey` subtree)
    /// against `expected`.
    pub fn has_shape(
        &mut self,
        expected: &Value,
        mode: ComparisonMode,
        options: CompareOptions,
        subkey: Option<&str>,
        name: Option<&str>,
    ) -> bool {
        let name = self.default_name(name, &format!("Json body matches shape ({mode})"));
        self.test(name, |a| {
            let document = a.json()?;
            let shape = Shape::root(expected, &a.fields)?;
            match compare_with(&shape, &document, mode, subkey, options) {
                Some(violation) => Err(AssertionError::Violation(violation)),
                None => Ok(()),
            }
        })
    }

    /// Same key set at every level. Values are compared only when
    /// `with_values` is set.
    pub fn has_keys_inclusive(
        &mut self,
        expected: &Value,
        with_values: bool,
        name: Option<&str>,
    ) -> bool {
        let options = CompareOptions { with_values };
        self.has_shape(expected, ComparisonMode::Inclusive, options, None, name)
    }

    pub fn has_keys_bounded_above(
        &mut self,
        expected: &Value,
        with_values: bool,
        name: Option<&str>,
    ) -> bool {
        let options = CompareOptions { with_values };
        self.has_shape(expected, ComparisonMode::BoundedAbove, options, None, name)
    }

    pub fn has_keys_bounded_below(
        &mut self,
        expected: &Value,
        with_values: bool,
        name: Option<&str>,
    ) -> bool {
        let options = CompareOptions { with_values };
        self.has_shape(expected, ComparisonMode::BoundedBelow, options, None, name)
    }

    /// Runs the requested body, JSON and content checks as one test.
    pub fn blank(&mut self, checks: &BlankChecks, name: Option<&str>) -> bool {
        let name = self.default_name(name, "Blank analysis");
        self.test(name, |a| {
            if let Some(body) = checks.body {
                a.expect_body(body)?;
            }
            if let Some(json) = checks.json {
                a.expect_json(json)?;
            }
            if let Some(content) = &checks.content {
                a.expect_content(content)?;
            }
            Ok(())
        })
    }
}
