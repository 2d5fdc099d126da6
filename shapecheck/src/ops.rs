use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assertions::{Assertions, Direction, KeyEntry, Outcome, Reporter, RunReport};
use crate::comparator::{CompareOptions, ComparisonMode, Violation, compare_values};
use crate::config::ShapeConfig;
use crate::files_reader::{CaseFileReader, ComparisonCase};
use crate::path_resolver::JsonPathResolver;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareResult {
    pub ok: bool,
    pub mode: ComparisonMode,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub keys_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subkey: Option<String>,
    /// Rendered violation, e.g. `a[0].b:1`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Violation>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseRunResult {
    pub ok: bool,
    pub report: RunReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

pub struct ShapeOps {
    pub cfg: ShapeConfig,
}

impl ShapeOps {
    #[must_use]
    pub fn new(config: Option<&str>) -> Self {
        ShapeOps {
            cfg: ShapeConfig::load(config),
        }
    }

    #[must_use]
    pub fn with_config(cfg: ShapeConfig) -> Self {
        ShapeOps { cfg }
    }

    #[must_use]
    pub fn compare(
        &self,
        expected: &Value,
        actual: &Value,
        mode: Option<ComparisonMode>,
        options: CompareOptions,
        subkey: Option<&str>,
    ) -> CompareResult {
        let mode = mode.unwrap_or(self.cfg.default_mode);
        let mut result = CompareResult {
            ok: false,
            mode,
            keys_only: !options.with_values,
            subkey: subkey.map(str::to_owned),
            violation: None,
            detail: None,
            error: String::new(),
        };

        match compare_values(
            expected,
            actual,
            mode,
            subkey,
            options,
            &self.cfg.descriptor_fields,
        ) {
            Ok(None) => result.ok = true,
            Ok(Some(violation)) => {
                result.violation = Some(violation.to_string());
                result.detail = Some(violation);
            }
            Err(e) => result.error = e.to_string(),
        }
        result
    }

    #[must_use]
    pub fn resolve(document: Value, path: &str) -> JsonPathResolver {
        JsonPathResolver::new(document).resolve(path)
    }

    /// Runs the key-entry assertion over a raw body.
    #[must_use]
    pub fn check_keys(&self, body: String, entries: &Value, direction: Direction) -> RunReport {
        let mut report = RunReport::default();
        match KeyEntry::list_from_value(entries) {
            Ok(entries) => {
                let mut assertions = Assertions::new(direction, Some(body), &mut report)
                    .with_fields(self.cfg.descriptor_fields.clone());
                assertions.has_keys(&entries, None);
            }
            Err(e) => report.report(Outcome {
                name: format!("{direction} Json body has properties"),
                passed: false,
                message: Some(format!("{direction} {e}")),
            }),
        }
        report
    }

    /// Evaluates one case: it passes when the rendered violation equals the
    /// case's expected violation (or both are absent).
    #[must_use]
    pub fn run_case(&self, case: &ComparisonCase) -> Outcome {
        let result = self.compare(
            &case.expected,
            &case.actual,
            case.mode,
            CompareOptions {
                with_values: !case.keys_only,
            },
            case.subkey.as_deref(),
        );

        let message = if result.violation == case.violation && result.error.is_empty() {
            None
        } else if result.error.is_empty() {
            Some(format!(
                "expected {}, got {}",
                case.violation.as_deref().unwrap_or("no violation"),
                result.violation.as_deref().unwrap_or("no violation")
            ))
        } else {
            Some(result.error)
        };

        Outcome {
            name: case.name.clone(),
            passed: message.is_none(),
            message,
        }
    }

    #[must_use]
    pub fn run_cases(&self, paths: &[String]) -> CaseRunResult {
        let mut reader = CaseFileReader::new(paths);
        let loaded = reader.read();

        let mut report = RunReport::default();
        for case in &loaded.cases {
            let outcome = self.run_case(case);
            if outcome.passed {
                tracing::info!("PASS {} ({})", case.name, case.source);
            } else {
                tracing::info!("FAIL {} ({})", case.name, case.source);
            }
            report.report(outcome);
        }

        let mut errors: Vec<String> = loaded.errors.iter().map(ToString::to_string).collect();
        if loaded.cases.is_empty() && errors.is_empty() {
            errors.push("no comparison cases found".to_owned());
        }
        CaseRunResult {
            ok: report.is_success() && errors.is_empty(),
            report,
            errors,
        }
    }
}
