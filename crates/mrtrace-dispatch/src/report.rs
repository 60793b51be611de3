//! Translation of execution and evaluation reports into statements.
//!
//! A report lists the findings of one run, grouped by the stage that
//! produced them. Each error or warning becomes one `had` statement, and a
//! final `passed`/`failed` statement summarises the run.

use std::path::Path;

use mrtrace_types::{ext, Extensions};
use mrtrace_vocab::{ActivityKey, VerbKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Written in place of an instruction that could not be resolved.
const NO_INSTRUCTION: &str = "None";

/// Written in place of the assertion count when it is not meaningful.
const UNCHECKED: &str = "unchecked";

/// Severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    /// Anything else. Not traced and not counted.
    #[serde(other)]
    Other,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Other => "other",
        }
    }
}

/// The stage that produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    /// Conventions and type checking, before running.
    Typechecking,
    Compilation,
    Execution,
}

impl ErrorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Typechecking => "typechecking",
            Self::Compilation => "compilation",
            Self::Execution => "execution",
        }
    }
}

/// Programming mode the IDE was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgrammingMode {
    /// Supervised mode with conventions and test counting.
    Student,
    /// Plain Python.
    Full,
}

impl ProgrammingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Full => "full",
        }
    }
}

/// One error or warning reported by the IDE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    /// Short error kind, e.g. `HeterogenousElementError`.
    pub err_type: String,
    /// Human-readable message.
    pub details: String,
    /// 1-based source line, when known.
    #[serde(default)]
    pub line: Option<usize>,
}

/// Findings and test results of one execution or evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default)]
    pub convention_errors: Vec<Finding>,
    #[serde(default)]
    pub compilation_errors: Vec<Finding>,
    #[serde(default)]
    pub execution_errors: Vec<Finding>,
    /// Functions defined by the student program.
    #[serde(default)]
    pub nb_defined_funs: u32,
    /// Assertions that passed.
    #[serde(default)]
    pub nb_passed_tests: u32,
}

impl Report {
    pub fn has_compilation_error(&self) -> bool {
        self.compilation_errors
            .iter()
            .any(|f| f.severity == Severity::Error)
    }

    pub fn has_execution_error(&self) -> bool {
        self.execution_errors
            .iter()
            .any(|f| f.severity == Severity::Error)
    }

    fn findings(&self) -> impl Iterator<Item = (ErrorClass, &Finding)> {
        [
            (ErrorClass::Typechecking, &self.convention_errors),
            (ErrorClass::Compilation, &self.compilation_errors),
            (ErrorClass::Execution, &self.execution_errors),
        ]
        .into_iter()
        .flat_map(|(class, findings)| findings.iter().map(move |f| (class, f)))
    }
}

/// A statement to emit, before it is bound to a context.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    pub verb: VerbKey,
    pub activity: ActivityKey,
    pub extensions: Extensions,
}

fn finding_extensions(finding: &Finding, class: ErrorClass, instruction: &str) -> Extensions {
    Extensions::new()
        .with(ext::ERROR_SEVERITY, finding.severity.as_str())
        .with(ext::ERROR_TYPE, finding.err_type.as_str())
        .with(ext::ERROR_CLASS, class.as_str())
        .with(ext::ERROR_MESSAGE, finding.details.as_str())
        .with(ext::ERROR_INSTRUCTION, instruction)
        .with(
            ext::ERROR_LINE,
            finding.line.map(Value::from).unwrap_or(Value::Null),
        )
}

struct Tally {
    events: Vec<TraceEvent>,
    nb_errors: u32,
    nb_warnings: u32,
}

/// One `had` event per error or warning, in report order.
fn tally_findings<F>(report: &Report, error: ActivityKey, warning: ActivityKey, extend: F) -> Tally
where
    F: Fn(ErrorClass, &Finding) -> Extensions,
{
    let mut tally = Tally {
        events: Vec::new(),
        nb_errors: 0,
        nb_warnings: 0,
    };
    for (class, finding) in report.findings() {
        let activity = match finding.severity {
            Severity::Error => {
                tally.nb_errors += 1;
                error
            }
            Severity::Warning => {
                tally.nb_warnings += 1;
                warning
            }
            Severity::Other => continue,
        };
        tally.events.push(TraceEvent {
            verb: VerbKey::Had,
            activity,
            extensions: extend(class, finding),
        });
    }
    tally
}

fn outcome_verb(nb_errors: u32) -> VerbKey {
    if nb_errors == 0 {
        VerbKey::Passed
    } else {
        VerbKey::Failed
    }
}

fn basename(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string())
}

/// Events for a whole-file execution.
///
/// `source` is the text of the executed file. Each finding carries the
/// literal text of its line, or `"None"` when the line is unknown, out of
/// range, or the source is unavailable. `\r\n`, `\r` and `\n` all end a
/// line.
pub fn plan_execution(
    report: &Report,
    mode: ProgrammingMode,
    filename: &str,
    source: Option<&str>,
) -> Vec<TraceEvent> {
    let source = source.map(|s| s.replace("\r\n", "\n").replace('\r', "\n"));
    let lines: Vec<&str> = source
        .as_deref()
        .map(|s| s.split('\n').collect())
        .unwrap_or_default();
    let file = basename(filename);

    let Tally {
        mut events,
        nb_errors,
        nb_warnings,
    } = tally_findings(
        report,
        ActivityKey::ExecutionError,
        ActivityKey::ExecutionWarning,
        |class, finding| {
            let instruction = finding
                .line
                .and_then(|n| n.checked_sub(1))
                .and_then(|idx| lines.get(idx).copied())
                .unwrap_or(NO_INSTRUCTION);
            finding_extensions(finding, class, instruction).with(ext::FILENAME, file.as_str())
        },
    );

    let asserts_checked = !(report.has_compilation_error() || report.has_execution_error())
        && mode == ProgrammingMode::Student
        && report.nb_defined_funs > 0;
    let number_asserts = if asserts_checked {
        Value::from(report.nb_passed_tests)
    } else {
        Value::from(UNCHECKED)
    };

    events.push(TraceEvent {
        verb: outcome_verb(nb_errors),
        activity: ActivityKey::Execution,
        extensions: Extensions::new()
            .with(ext::MODE, mode.as_str())
            .with(ext::FILENAME, file.as_str())
            .with(ext::NB_ERRORS, nb_errors)
            .with(ext::NB_WARNINGS, nb_warnings)
            .with(ext::NUMBER_ASSERTS, number_asserts),
    });
    events
}

/// Events for the evaluation of a single instruction in the shell.
pub fn plan_evaluation(report: &Report, mode: ProgrammingMode, instruction: &str) -> Vec<TraceEvent> {
    let Tally {
        mut events,
        nb_errors,
        nb_warnings,
    } = tally_findings(
        report,
        ActivityKey::EvaluationError,
        ActivityKey::EvaluationWarning,
        |class, finding| finding_extensions(finding, class, instruction),
    );

    events.push(TraceEvent {
        verb: outcome_verb(nb_errors),
        activity: ActivityKey::Evaluation,
        extensions: Extensions::new()
            .with(ext::MODE, mode.as_str())
            .with(ext::INSTRUCTION, instruction)
            .with(ext::NB_ERRORS, nb_errors)
            .with(ext::NB_WARNINGS, nb_warnings),
    });
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn finding(severity: Severity, line: Option<usize>) -> Finding {
        Finding {
            severity,
            err_type: "HeterogenousElementError".to_string(),
            details: "list elements must share a type".to_string(),
            line,
        }
    }

    const SOURCE: &str = "def renverse(L):\n    LR = []\n    return LR\n";

    #[test]
    fn two_execution_errors_fail_the_run() {
        let report = Report {
            execution_errors: vec![
                finding(Severity::Error, Some(2)),
                finding(Severity::Error, Some(3)),
            ],
            ..Report::default()
        };

        let events = plan_execution(&report, ProgrammingMode::Student, "/tmp/renverse.py", Some(SOURCE));

        assert_eq!(events.len(), 3);
        for event in &events[..2] {
            assert_eq!(event.verb, VerbKey::Had);
            assert_eq!(event.activity, ActivityKey::ExecutionError);
            assert_eq!(event.extensions.get(ext::ERROR_CLASS), Some(&json!("execution")));
        }
        let summary = &events[2];
        assert_eq!(summary.verb, VerbKey::Failed);
        assert_eq!(summary.activity, ActivityKey::Execution);
        assert_eq!(summary.extensions.get(ext::NB_ERRORS), Some(&json!(2)));
        assert_eq!(summary.extensions.get(ext::NB_WARNINGS), Some(&json!(0)));
        assert_eq!(summary.extensions.get(ext::NUMBER_ASSERTS), Some(&json!("unchecked")));
        assert_eq!(summary.extensions.get(ext::FILENAME), Some(&json!("renverse.py")));
    }

    #[test]
    fn execution_findings_carry_their_source_line() {
        let report = Report {
            convention_errors: vec![finding(Severity::Warning, Some(2))],
            compilation_errors: vec![finding(Severity::Error, None)],
            execution_errors: vec![finding(Severity::Error, Some(40))],
            ..Report::default()
        };

        let events = plan_execution(&report, ProgrammingMode::Full, "renverse.py", Some(SOURCE));

        assert_eq!(events[0].activity, ActivityKey::ExecutionWarning);
        assert_eq!(events[0].extensions.get(ext::ERROR_INSTRUCTION), Some(&json!("    LR = []")));
        assert_eq!(events[0].extensions.get(ext::ERROR_LINE), Some(&json!(2)));
        assert_eq!(events[0].extensions.get(ext::ERROR_CLASS), Some(&json!("typechecking")));

        assert_eq!(events[1].extensions.get(ext::ERROR_INSTRUCTION), Some(&json!("None")));
        assert_eq!(events[1].extensions.get(ext::ERROR_LINE), Some(&Value::Null));
        assert_eq!(events[1].extensions.get(ext::ERROR_CLASS), Some(&json!("compilation")));

        // Line past the end of the file.
        assert_eq!(events[2].extensions.get(ext::ERROR_INSTRUCTION), Some(&json!("None")));

        let summary = events.last().expect("summary");
        assert_eq!(summary.extensions.get(ext::NB_ERRORS), Some(&json!(2)));
        assert_eq!(summary.extensions.get(ext::NB_WARNINGS), Some(&json!(1)));
    }

    #[test]
    fn line_endings_are_not_part_of_the_instruction() {
        let report = Report {
            execution_errors: vec![finding(Severity::Error, Some(1))],
            convention_errors: vec![finding(Severity::Warning, Some(2))],
            ..Report::default()
        };

        let crlf = plan_execution(
            &report,
            ProgrammingMode::Full,
            "a.py",
            Some("x = 1 + 'a'\r\nprint(x)\r\n"),
        );
        assert_eq!(crlf[0].extensions.get(ext::ERROR_INSTRUCTION), Some(&json!("print(x)")));
        assert_eq!(crlf[1].extensions.get(ext::ERROR_INSTRUCTION), Some(&json!("x = 1 + 'a'")));

        let cr = plan_execution(&report, ProgrammingMode::Full, "a.py", Some("x = 1 + 'a'\rprint(x)"));
        assert_eq!(cr[0].extensions.get(ext::ERROR_INSTRUCTION), Some(&json!("print(x)")));
        assert_eq!(cr[1].extensions.get(ext::ERROR_INSTRUCTION), Some(&json!("x = 1 + 'a'")));
    }

    #[test]
    fn warnings_alone_pass() {
        let report = Report {
            execution_errors: vec![finding(Severity::Warning, Some(1))],
            ..Report::default()
        };
        let events = plan_execution(&report, ProgrammingMode::Full, "a.py", None);
        assert_eq!(events[0].activity, ActivityKey::ExecutionWarning);
        assert_eq!(events[0].extensions.get(ext::ERROR_INSTRUCTION), Some(&json!("None")));
        assert_eq!(events[1].verb, VerbKey::Passed);
    }

    #[test]
    fn other_severities_are_ignored() {
        let report = Report {
            convention_errors: vec![finding(Severity::Other, Some(1))],
            ..Report::default()
        };
        let events = plan_execution(&report, ProgrammingMode::Student, "a.py", Some(SOURCE));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].verb, VerbKey::Passed);
    }

    #[test]
    fn student_mode_counts_passed_asserts() {
        let report = Report {
            nb_defined_funs: 1,
            nb_passed_tests: 3,
            ..Report::default()
        };
        let events = plan_execution(&report, ProgrammingMode::Student, "a.py", Some(SOURCE));
        assert_eq!(events[0].extensions.get(ext::NUMBER_ASSERTS), Some(&json!(3)));
        assert_eq!(events[0].extensions.get(ext::MODE), Some(&json!("student")));

        let full = plan_execution(&report, ProgrammingMode::Full, "a.py", Some(SOURCE));
        assert_eq!(full[0].extensions.get(ext::NUMBER_ASSERTS), Some(&json!("unchecked")));

        let no_funs = Report {
            nb_defined_funs: 0,
            ..report.clone()
        };
        let events = plan_execution(&no_funs, ProgrammingMode::Student, "a.py", Some(SOURCE));
        assert_eq!(events[0].extensions.get(ext::NUMBER_ASSERTS), Some(&json!("unchecked")));
    }

    #[test]
    fn compilation_error_leaves_asserts_unchecked() {
        let report = Report {
            compilation_errors: vec![finding(Severity::Error, Some(1))],
            nb_defined_funs: 2,
            nb_passed_tests: 2,
            ..Report::default()
        };
        let events = plan_execution(&report, ProgrammingMode::Student, "a.py", Some(SOURCE));
        let summary = events.last().expect("summary");
        assert_eq!(summary.extensions.get(ext::NUMBER_ASSERTS), Some(&json!("unchecked")));
        assert_eq!(summary.extensions.get(ext::NB_ERRORS), Some(&json!(1)));
    }

    #[test]
    fn evaluation_uses_the_instruction_text() {
        let report = Report {
            execution_errors: vec![finding(Severity::Error, Some(1))],
            convention_errors: vec![finding(Severity::Warning, None)],
            ..Report::default()
        };
        let events = plan_evaluation(&report, ProgrammingMode::Student, "renverse([1, 'two'])");

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].activity, ActivityKey::EvaluationWarning);
        assert_eq!(events[1].activity, ActivityKey::EvaluationError);
        for event in &events[..2] {
            assert_eq!(
                event.extensions.get(ext::ERROR_INSTRUCTION),
                Some(&json!("renverse([1, 'two'])"))
            );
            assert!(event.extensions.get(ext::FILENAME).is_none());
        }

        let summary = &events[2];
        assert_eq!(summary.verb, VerbKey::Failed);
        assert_eq!(summary.activity, ActivityKey::Evaluation);
        assert_eq!(summary.extensions.get(ext::INSTRUCTION), Some(&json!("renverse([1, 'two'])")));
        assert!(summary.extensions.get(ext::NUMBER_ASSERTS).is_none());
    }

    #[test]
    fn report_deserialises_from_ide_json() {
        let report: Report = serde_json::from_value(json!({
            "execution_errors": [
                {"severity": "error", "err_type": "ZeroDivisionError", "details": "division by zero", "line": 4},
                {"severity": "info", "err_type": "Note", "details": "ignored"}
            ],
            "nb_defined_funs": 1
        }))
        .expect("report should parse");

        assert_eq!(report.execution_errors[0].line, Some(4));
        assert_eq!(report.execution_errors[1].severity, Severity::Other);
        assert!(report.has_execution_error());
        assert!(!report.has_compilation_error());
    }
}
