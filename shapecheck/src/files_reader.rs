use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::comparator::ComparisonMode;

const EXCLUDE_LIST: &[&str] = &["node_modules", "target", ".git"];
const VALID_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

#[derive(Debug, Error)]
pub enum CaseFileError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse '{path}': {message}")]
    Parse { path: String, message: String },
    #[error("'{path}' item {index}: {message}")]
    InvalidCase {
        path: String,
        index: usize,
        message: String,
    },
}

/// One comparison to run: `expected` against `actual`, with the rendered
/// violation the comparison should produce (`None` expects a pass).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonCase {
    #[serde(default)]
    pub name: String,
    pub expected: Value,
    pub actual: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ComparisonMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subkey: Option<String>,
    /// Compare key structure only, ignoring literal values.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub keys_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation: Option<String>,
    #[serde(skip)]
    pub source: String,
}

#[derive(Debug, Default)]
pub struct LoadedCases {
    pub cases: Vec<ComparisonCase>,
    pub errors: Vec<CaseFileError>,
}

/// Parses a JSON or YAML document, chosen by file extension.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_document(file_path: &Path) -> Result<Value, CaseFileError> {
    let path = file_path.to_string_lossy().into_owned();
    let content = fs::read_to_string(file_path).map_err(|source| CaseFileError::Read {
        path: path.clone(),
        source,
    })?;

    let extension = file_path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "yaml" | "yml" => serde_saphyr::from_str(&content).map_err(|e| CaseFileError::Parse {
            path,
            message: e.to_string(),
        }),
        _ => serde_json::from_str(&content).map_err(|e| CaseFileError::Parse {
            path,
            message: e.to_string(),
        }),
    }
}

pub struct CaseFileReader {
    paths: Vec<PathBuf>,
    files: Vec<PathBuf>,
    initialized: bool,
}

impl CaseFileReader {
    #[must_use]
    pub fn new(path: &[String]) -> Self {
        let paths = path
            .iter()
            .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()))
            .collect();

        CaseFileReader {
            paths,
            files: Vec::new(),
            initialized: false,
        }
    }

    fn has_valid_extension(path: &Path) -> bool {
        path.extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|e| VALID_EXTENSIONS.contains(&e.as_str()))
    }

    fn collect_files(&mut self) {
        let mut seen = HashSet::new();
        let mut collected = Vec::new();

        for path in &self.paths {
            let resolved_path = path.canonicalize().unwrap_or_else(|_| path.clone());

            if resolved_path.is_file() {
                if Self::has_valid_extension(&resolved_path) && seen.insert(resolved_path.clone())
                {
                    tracing::debug!("- discovered file: {}", resolved_path.display());
                    collected.push(resolved_path);
                }
            } else if resolved_path.is_dir() {
                let walker = WalkDir::new(&resolved_path)
                    .follow_links(true)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_entry(|e| {
                        !(e.file_type().is_dir()
                            && EXCLUDE_LIST.contains(&e.file_name().to_string_lossy().as_ref()))
                    });

                for entry in walker.flatten() {
                    let path = entry.path();
                    if path.is_file() && Self::has_valid_extension(path) {
                        let rp = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
                        if seen.insert(rp.clone()) {
                            tracing::debug!("- discovered file: {}", rp.display());
                            collected.push(rp);
                        }
                    }
                }
            } else {
                tracing::warn!("Path does not exist: {}", resolved_path.display());
            }
        }

        self.files = collected;
    }

    fn process_file(file_path: &Path, out: &mut LoadedCases) {
        let content = match load_document(file_path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("Failed to load case file: {e}");
                out.errors.push(e);
                return;
            }
        };

        let source = file_path.to_string_lossy().into_owned();
        let stem = file_path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();

        // Handle both single cases and lists of cases
        let items = match content {
            Value::Array(items) => items,
            single => vec![single],
        };
        let multiple = items.len() > 1;

        for (idx, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<ComparisonCase>(item) {
                Ok(mut case) => {
                    if case.name.is_empty() {
                        case.name = if multiple {
                            format!("{stem}#{idx}")
                        } else {
                            stem.clone()
                        };
                    }
                    case.source.clone_from(&source);
                    tracing::debug!("- discovered case: {}", case.name);
                    out.cases.push(case);
                }
                Err(e) => out.errors.push(CaseFileError::InvalidCase {
                    path: source.clone(),
                    index: idx,
                    message: e.to_string(),
                }),
            }
        }
    }

    /// Loads every case from the configured paths, in path order and file
    /// name order within directories.
    pub fn read(&mut self) -> LoadedCases {
        if !self.initialized {
            self.collect_files();
            self.initialized = true;
        }

        tracing::debug!("Processing {} case files", self.files.len());

        let mut out = LoadedCases::default();
        for file in &self.files {
            Self::process_file(file, &mut out);
        }
        out
    }

    pub fn reset(&mut self) {
        self.initialized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CASE: &str = r#"{"name": "one", "expected": {"a": 1}, "actual": {"a": 1}}"#;

    #[test]
    fn test_new_with_tilde_expansion() {
        let reader = CaseFileReader::new(&["~/cases".to_owned()]);
        assert!(!reader.paths[0].to_string_lossy().contains('~'));
        assert!(!reader.initialized);
    }

    #[test]
    fn test_load_json_and_yaml_documents() {
        let dir = TempDir::new().unwrap();
        let json_path = dir.path().join("doc.json");
        let yaml_path = dir.path().join("doc.yaml");
        fs::write(&json_path, r#"{"a": [1, 2]}"#).unwrap();
        fs::write(&yaml_path, "a:\n  - 1\n  - 2\n").unwrap();

        let from_json = load_document(&json_path).unwrap();
        let from_yaml = load_document(&yaml_path).unwrap();
        assert_eq!(from_json, serde_json::json!({"a": [1, 2]}));
        assert_eq!(from_json, from_yaml);
    }

    #[test]
    fn test_load_document_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_document(&dir.path().join("none.json")),
            Err(CaseFileError::Read { .. })
        ));
        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{nope").unwrap();
        assert!(matches!(
            load_document(&bad),
            Err(CaseFileError::Parse { .. })
        ));
    }

    #[test]
    fn test_read_directory_skips_excluded_and_unknown_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.json"), CASE).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules").join("b.json"), CASE).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("nested").join("c.yml"),
            "expected: {b: 2}\nactual: {b: 3}\nmode: bounded-below\nviolation: \"b:2\"\n",
        )
        .unwrap();

        let mut reader = CaseFileReader::new(&[dir.path().to_string_lossy().into_owned()]);
        let loaded = reader.read();

        assert!(loaded.errors.is_empty());
        assert_eq!(loaded.cases.len(), 2);
        assert_eq!(loaded.cases[0].name, "one");
        assert_eq!(loaded.cases[1].name, "c");
        assert_eq!(loaded.cases[1].mode, Some(ComparisonMode::BoundedBelow));
        assert_eq!(loaded.cases[1].violation.as_deref(), Some("b:2"));
        assert!(!loaded.cases[1].keys_only);
    }

    #[test]
    fn test_read_list_file_names_cases_by_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("suite.json");
        fs::write(
            &path,
            r#"[
                {"expected": {"a": 1}, "actual": {"a": 1}},
                {"expected": {"a": 1}, "actual": {"a": 2}, "violation": "a:1"},
                {"expected": {"a": 1}}
            ]"#,
        )
        .unwrap();

        let mut reader = CaseFileReader::new(&[path.to_string_lossy().into_owned()]);
        let loaded = reader.read();

        assert_eq!(loaded.cases.len(), 2);
        assert_eq!(loaded.cases[0].name, "suite#0");
        assert_eq!(loaded.cases[1].name, "suite#1");
        assert_eq!(loaded.errors.len(), 1);
        assert!(matches!(
            loaded.errors[0],
            CaseFileError::InvalidCase { index: 2, .. }
        ));
    }

    #[test]
    fn test_same_file_listed_twice_is_read_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        fs::write(&path, CASE).unwrap();
        let p = path.to_string_lossy().into_owned();

        let mut reader = CaseFileReader::new(&[p.clone(), p]);
        assert_eq!(reader.read().cases.len(), 1);
    }

    #[test]
    fn test_reset_rediscovers_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.json"), CASE).unwrap();
        let mut reader = CaseFileReader::new(&[dir.path().to_string_lossy().into_owned()]);
        assert_eq!(reader.read().cases.len(), 1);

        fs::write(dir.path().join("b.json"), CASE).unwrap();
        assert_eq!(reader.read().cases.len(), 1);
        reader.reset();
        assert_eq!(reader.read().cases.len(), 2);
    }
}
