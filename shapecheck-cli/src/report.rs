use chrono::Local;
use shapecheck::{Outcome, RunReport};

// ANSI color codes
struct Colors {
    reset: &'static str,
    dim: &'static str,
    green: &'static str,
    red: &'static str,
    cyan: &'static str,
}

impl Colors {
    fn new() -> Self {
        // Check if stderr is a TTY (terminal)
        if atty::is(atty::Stream::Stderr) {
            Self::enabled()
        } else {
            Self::disabled()
        }
    }

    fn enabled() -> Self {
        Self {
            reset: "\x1b[0m",
            dim: "\x1b[2m",
            green: "\x1b[92m", // PASS
            red: "\x1b[91m",   // FAIL
            cyan: "\x1b[96m",  // test name
        }
    }

    fn disabled() -> Self {
        Self {
            reset: "",
            dim: "",
            green: "",
            red: "",
            cyan: "",
        }
    }

    fn status_color(&self, passed: bool) -> &'static str {
        if passed { self.green } else { self.red }
    }
}

fn outcome_line(colors: &Colors, outcome: &Outcome) -> String {
    let status = if outcome.passed { "PASS" } else { "FAIL" };
    let detail = outcome
        .message
        .as_ref()
        .map(|message| format!(" {}- {message}{}", colors.dim, colors.reset))
        .unwrap_or_default();
    format!(
        "{}{status}{} {}{}{}{detail}",
        colors.status_color(outcome.passed),
        colors.reset,
        colors.cyan,
        outcome.name,
        colors.reset
    )
}

fn summary_line(colors: &Colors, report: &RunReport) -> String {
    format!(
        "{} total, {}{} passed{}, {}{} failed{}",
        report.total,
        colors.green,
        report.passed,
        colors.reset,
        colors.status_color(report.failed == 0),
        report.failed,
        colors.reset
    )
}

/// Prints one line per outcome plus a summary to stderr.
pub fn print_report(report: &RunReport) {
    // eprintln! rather than tracing, which escapes ANSI codes
    let colors = Colors::new();
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S,%3f");
    for outcome in &report.outcomes {
        eprintln!("{timestamp} - {}", outcome_line(&colors, outcome));
    }
    eprintln!("{timestamp} - {}", summary_line(&colors, report));
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapecheck::Reporter;

    fn outcome(name: &str, message: Option<&str>) -> Outcome {
        Outcome {
            name: name.to_owned(),
            passed: message.is_none(),
            message: message.map(str::to_owned),
        }
    }

    #[test]
    fn test_outcome_line_without_colors() {
        let colors = Colors::disabled();
        assert_eq!(
            outcome_line(&colors, &outcome("users", None)),
            "PASS users"
        );
        assert_eq!(
            outcome_line(&colors, &outcome("users", Some("expected a:1, got a:2"))),
            "FAIL users - expected a:1, got a:2"
        );
    }

    #[test]
    fn test_outcome_line_with_colors() {
        let colors = Colors::enabled();
        let line = outcome_line(&colors, &outcome("users", Some("boom")));
        assert!(line.starts_with("\x1b[91mFAIL\x1b[0m"));
        assert!(line.contains("\x1b[96musers\x1b[0m"));
        assert!(line.ends_with("\x1b[2m- boom\x1b[0m"));
    }

    #[test]
    fn test_status_color() {
        let colors = Colors::enabled();
        assert_eq!(colors.status_color(true), "\x1b[92m");
        assert_eq!(colors.status_color(false), "\x1b[91m");
        assert_eq!(Colors::disabled().status_color(false), "");
    }

    #[test]
    fn test_summary_line() {
        let mut report = RunReport::default();
        report.report(outcome("a", None));
        report.report(outcome("b", Some("no")));
        assert_eq!(
            summary_line(&Colors::disabled(), &report),
            "2 total, 1 passed, 1 failed"
        );
        print_report(&report);
    }
}
