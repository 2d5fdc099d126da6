use anyhow::Result;
use shapecheck_cli::{Cli, Commands, run_with_cli};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

fn compare(expected: String, actual: String, mode: Option<&str>, subkey: Option<&str>) -> Cli {
    Cli {
        verbose: 0,
        config: None,
        command: Commands::Compare {
            expected,
            actual,
            mode: mode.map(str::to_owned),
            subkey: subkey.map(str::to_owned),
            keys_only: false,
        },
    }
}

#[test]
fn test_run_compare_command_passes() -> Result<()> {
    let dir = TempDir::new()?;
    let expected = write(dir.path(), "expected.json", r#"{"id": {"type": "integer"}}"#);
    let actual = write(dir.path(), "actual.json", r#"{"id": 7}"#);

    assert!(run_with_cli(compare(expected, actual, None, None))?);
    Ok(())
}

#[test]
fn test_run_compare_command_reports_violation() -> Result<()> {
    let dir = TempDir::new()?;
    let expected = write(dir.path(), "expected.json", r#"{"a": [{"b": 1}]}"#);
    let actual = write(dir.path(), "actual.json", r#"{"a": [{"b": 2}]}"#);

    assert!(!run_with_cli(compare(expected, actual, None, None))?);
    Ok(())
}

#[test]
fn test_run_compare_command_keys_only() -> Result<()> {
    let dir = TempDir::new()?;
    let expected = write(dir.path(), "expected.json", r#"{"a": [{"b": 1}]}"#);
    let actual = write(dir.path(), "actual.json", r#"{"a": [{"b": 2}]}"#);

    let mut cli = compare(expected, actual, None, None);
    if let Commands::Compare { keys_only, .. } = &mut cli.command {
        *keys_only = true;
    }
    assert!(run_with_cli(cli)?);
    Ok(())
}

#[test]
fn test_run_compare_command_with_malformed_shape_is_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    let expected = write(dir.path(), "expected.json", r#"{"a": {"type": "list"}}"#);
    let actual = write(dir.path(), "actual.json", r#"{"a": []}"#);

    let err = run_with_cli(compare(expected, actual, None, None)).unwrap_err();
    assert!(err.to_string().contains("unknown type 'list'"));
    Ok(())
}

#[test]
fn test_run_compare_command_with_yaml_mode_and_subkey() -> Result<()> {
    let dir = TempDir::new()?;
    let expected = write(dir.path(), "expected.yaml", "id: 1\n");
    let actual = write(
        dir.path(),
        "actual.json",
        r#"{"data": {"id": 1, "name": "x"}}"#,
    );

    let cli = compare(expected, actual, Some("bounded-below"), Some("data"));
    assert!(run_with_cli(cli)?);
    Ok(())
}

#[test]
fn test_run_compare_command_with_unknown_mode() -> Result<()> {
    let dir = TempDir::new()?;
    let expected = write(dir.path(), "expected.json", "{}");
    let actual = write(dir.path(), "actual.json", "{}");

    let err = run_with_cli(compare(expected, actual, Some("sideways"), None)).unwrap_err();
    assert!(err.to_string().contains("unknown comparison mode"));
    Ok(())
}

#[test]
fn test_run_compare_command_with_missing_file() -> Result<()> {
    let dir = TempDir::new()?;
    let actual = write(dir.path(), "actual.json", "{}");
    let missing = dir.path().join("none.json").to_string_lossy().into_owned();

    assert!(run_with_cli(compare(missing, actual, None, None)).is_err());
    Ok(())
}

#[test]
fn test_run_compare_command_with_config() -> Result<()> {
    let dir = TempDir::new()?;
    let config = write(
        dir.path(),
        "shapecheck.config.json",
        r#"{"descriptor_fields": {"type": "_type"}, "default_mode": "bounded-above"}"#,
    );
    let expected = write(
        dir.path(),
        "expected.json",
        r#"{"id": {"_type": "integer"}, "extra": 1}"#,
    );
    let actual = write(dir.path(), "actual.json", r#"{"id": 3}"#);

    let mut cli = compare(expected, actual, None, None);
    cli.config = Some(config);
    assert!(run_with_cli(cli)?);
    Ok(())
}

#[test]
fn test_run_resolve_command() -> Result<()> {
    let dir = TempDir::new()?;
    let document = write(dir.path(), "doc.json", r#"{"items": [{"id": 1}]}"#);

    let cli = Cli {
        verbose: 0,
        config: None,
        command: Commands::Resolve {
            document: document.clone(),
            path: "items[0].id".to_owned(),
        },
    };
    assert!(run_with_cli(cli)?);

    let cli = Cli {
        verbose: 0,
        config: None,
        command: Commands::Resolve {
            document,
            path: "items[3].id".to_owned(),
        },
    };
    assert!(!run_with_cli(cli)?);
    Ok(())
}

#[test]
fn test_run_check_keys_command() -> Result<()> {
    let dir = TempDir::new()?;
    let document = write(dir.path(), "body.json", r#"{"id": 1, "tags": ["a", "b"]}"#);
    let entries = write(
        dir.path(),
        "keys.json",
        r#"["id", ["tags", null, "array", 2]]"#,
    );

    let cli = Cli {
        verbose: 0,
        config: None,
        command: Commands::CheckKeys {
            document: document.clone(),
            entries,
            direction: "request".to_owned(),
        },
    };
    assert!(run_with_cli(cli)?);

    let entries = write(dir.path(), "missing.json", r#"["name"]"#);
    let cli = Cli {
        verbose: 0,
        config: None,
        command: Commands::CheckKeys {
            document,
            entries,
            direction: "response".to_owned(),
        },
    };
    assert!(!run_with_cli(cli)?);
    Ok(())
}

#[test]
fn test_run_cases_command() -> Result<()> {
    let dir = TempDir::new()?;
    write(
        dir.path(),
        "users.json",
        r#"[
            {"name": "same", "expected": {"id": 1}, "actual": {"id": 1}},
            {"name": "extra key", "expected": {"id": 1}, "actual": {"id": 1, "x": 2}, "violation": "x:_required"}
        ]"#,
    );
    write(
        dir.path(),
        "orders.yaml",
        "name: subset\nexpected: {id: 1}\nactual: {id: 1, total: 3}\nmode: bounded-below\n",
    );

    let cli = Cli {
        verbose: 1,
        config: None,
        command: Commands::Run {
            path: vec![dir.path().to_string_lossy().into_owned()],
        },
    };
    assert!(run_with_cli(cli)?);
    Ok(())
}

#[test]
fn test_run_cases_command_with_failing_case() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write(
        dir.path(),
        "case.json",
        r#"{"expected": {"tags": []}, "actual": {"tags": [1]}}"#,
    );

    let cli = Cli {
        verbose: 0,
        config: None,
        command: Commands::Run { path: vec![path] },
    };
    assert!(!run_with_cli(cli)?);
    Ok(())
}
