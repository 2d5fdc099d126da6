use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::comparator::ComparisonMode;

pub const DEFAULT_CONFIG_FILE: &str = "shapecheck.config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("config '{path}' is not a JSON object: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Names of the reserved fields that turn a mapping into a service descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorFields {
    pub value: String,
    #[serde(rename = "type")]
    pub value_type: String,
    pub size: String,
    pub is_required: String,
}

impl Default for DescriptorFields {
    fn default() -> Self {
        DescriptorFields {
            value: "value".to_owned(),
            value_type: "type".to_owned(),
            size: "size".to_owned(),
            is_required: "isRequired".to_owned(),
        }
    }
}

impl DescriptorFields {
    #[must_use]
    pub fn is_reserved(&self, key: &str) -> bool {
        key == self.value || key == self.value_type || key == self.size || key == self.is_required
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeConfig {
    pub descriptor_fields: DescriptorFields,
    pub default_mode: ComparisonMode,
}

impl ShapeConfig {
    /// Loads the config from `config_path`, then from
    /// [`DEFAULT_CONFIG_FILE`] in the working directory, then falls back to
    /// defaults.
    #[must_use]
    pub fn load(config_path: Option<&str>) -> Self {
        if let Some(path) = config_path {
            match Self::from_path(Path::new(path)) {
                Ok(cfg) => return cfg,
                Err(e) => tracing::warn!("Ignoring config: {e}"),
            }
        }

        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.is_file()
            && let Ok(cfg) = Self::from_path(default_path)
        {
            tracing::debug!("Loaded config from {DEFAULT_CONFIG_FILE}");
            return cfg;
        }

        ShapeConfig::default()
    }

    /// Reads a config file. Missing or malformed entries keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON object.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let display = path.to_string_lossy().into_owned();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let data: serde_json::Map<String, Value> =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: display,
                source,
            })?;
        Ok(Self::from_data(&data))
    }

    fn from_data(data: &serde_json::Map<String, Value>) -> Self {
        let defaults = DescriptorFields::default();
        let fields = data.get("descriptor_fields").and_then(Value::as_object);
        let field = |name: &str, fallback: String| {
            fields
                .and_then(|f| f.get(name))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map_or(fallback, str::to_owned)
        };

        let descriptor_fields = DescriptorFields {
            value: field("value", defaults.value),
            value_type: field("type", defaults.value_type),
            size: field("size", defaults.size),
            is_required: field("is_required", defaults.is_required),
        };

        let default_mode = data
            .get("default_mode")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        ShapeConfig {
            descriptor_fields,
            default_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let cfg = ShapeConfig::default();
        assert_eq!(cfg.default_mode, ComparisonMode::Inclusive);
        assert!(cfg.descriptor_fields.is_reserved("isRequired"));
        assert!(!cfg.descriptor_fields.is_reserved("name"));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let data = json!({
            "descriptor_fields": {"type": "_type", "size": 4},
            "default_mode": "bounded-below"
        });
        let cfg = ShapeConfig::from_data(data.as_object().unwrap());
        assert_eq!(cfg.descriptor_fields.value_type, "_type");
        assert_eq!(cfg.descriptor_fields.size, "size");
        assert_eq!(cfg.descriptor_fields.value, "value");
        assert_eq!(cfg.default_mode, ComparisonMode::BoundedBelow);
    }

    #[test]
    fn test_unknown_mode_falls_back() {
        let data = json!({"default_mode": "sideways"});
        let cfg = ShapeConfig::from_data(data.as_object().unwrap());
        assert_eq!(cfg.default_mode, ComparisonMode::Inclusive);
    }

    #[test]
    fn test_from_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, r#"{"default_mode": "bounded-above"}"#).unwrap();
        let cfg = ShapeConfig::from_path(&path).unwrap();
        assert_eq!(cfg.default_mode, ComparisonMode::BoundedAbove);
    }

    #[test]
    fn test_from_path_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ShapeConfig::from_path(&dir.path().join("missing.json")),
            Err(ConfigError::Read { .. })
        ));

        let path = dir.path().join("bad.json");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            ShapeConfig::from_path(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_with_unreadable_path_uses_defaults() {
        let cfg = ShapeConfig::load(Some("/nonexistent/shapecheck.json"));
        assert_eq!(cfg.descriptor_fields, DescriptorFields::default());
    }
}
