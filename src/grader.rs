//! Grading pipeline: keyword gate → sandboxed run → normalized comparison.
//!
//! Every outcome, sandbox faults included, becomes a `Verdict`; nothing here
//! returns an error to the caller.

use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, instrument};

use crate::domain::Question;
use crate::keywords::check_keywords;
use crate::normalize::normalize_output;
use crate::sandbox::{Execution, Sandbox};

/// Wall-clock budget for one graded (or ungraded) run.
pub const GRADE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    Passed,
    EmptySubmission,
    KeywordGateFailure,
    RuntimeFailure,
    Timeout,
    OutputLimitExceeded,
    OutputMismatch,
    ExecutorFault,
}

#[derive(Clone, Debug, Serialize)]
pub struct Verdict {
    pub passed: bool,
    pub kind: VerdictKind,
    /// Normalized stdout on comparison, raw stderr on runtime failure, otherwise absent.
    pub output: Option<String>,
    /// Normalized expected output.
    pub expected: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_keywords: Option<Vec<String>>,
}

impl Verdict {
    fn failed(kind: VerdictKind, expected: String, message: impl Into<String>) -> Self {
        Self {
            passed: false,
            kind,
            output: None,
            expected,
            message: message.into(),
            missing_keywords: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Grader {
    sandbox: Sandbox,
    timeout: Duration,
}

impl Grader {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox, timeout: GRADE_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[instrument(level = "info", skip(self, source, question), fields(question_id = question.id, source_len = source.len()))]
    pub async fn grade(&self, source: &str, question: &Question) -> Verdict {
        let expected = normalize_output(Some(&question.expected_output));

        if source.trim().is_empty() {
            return Verdict::failed(VerdictKind::EmptySubmission, expected, "No code provided");
        }

        let gate = check_keywords(source, Some(&question.required_keywords));
        if !gate.valid {
            info!(target: "grading", question_id = question.id, missing = ?gate.missing, "Keyword gate rejected submission");
            let message = format!("Missing required keywords: {}", gate.missing.join(", "));
            return Verdict {
                missing_keywords: Some(gate.missing),
                ..Verdict::failed(VerdictKind::KeywordGateFailure, expected, message)
            };
        }

        let run = match self.sandbox.execute(source, self.timeout).await {
            Ok(Execution::Completed(run)) => run,
            Ok(Execution::TimedOut) => {
                return Verdict::failed(VerdictKind::Timeout, expected, "Code execution timed out");
            }
            Ok(Execution::OutputLimitExceeded { limit }) => {
                let message = format!("Output exceeded the {limit} byte limit");
                return Verdict::failed(VerdictKind::OutputLimitExceeded, expected, message);
            }
            Err(e) => {
                error!(target: "grading", question_id = question.id, error = %e, "Sandbox fault while grading");
                return Verdict::failed(VerdictKind::ExecutorFault, expected, e.to_string());
            }
        };

        if !run.success() {
            return Verdict {
                output: Some(run.stderr),
                ..Verdict::failed(VerdictKind::RuntimeFailure, expected, "Code has errors")
            };
        }

        let output = normalize_output(Some(&run.stdout));
        let passed = output == expected;
        info!(target: "grading", question_id = question.id, %passed, "Output compared");
        let (kind, message) = if passed {
            (VerdictKind::Passed, "Correct! Well done!")
        } else {
            (VerdictKind::OutputMismatch, "Output does not match expected result")
        };
        Verdict {
            passed,
            kind,
            output: Some(output),
            expected,
            message: message.into(),
            missing_keywords: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn question(expected: &str, keywords: &str) -> Question {
        Question {
            id: 1,
            topic_id: 1,
            title: "t".into(),
            description: String::new(),
            expected_output: expected.into(),
            order: 1,
            required_keywords: keywords.into(),
            hint: String::new(),
        }
    }

    fn sh_grader() -> Grader {
        Grader::new(Sandbox::new("sh"))
    }

    fn python_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn empty_submission_is_rejected_without_running() {
        let grader = Grader::new(Sandbox::new("/nonexistent/interpreter"));
        let v = grader.grade("  \n\t", &question("x", "")).await;
        assert!(!v.passed);
        assert_eq!(v.kind, VerdictKind::EmptySubmission);
    }

    #[tokio::test]
    async fn keyword_gate_short_circuits_execution() {
        // An unusable interpreter proves the code never ran.
        let grader = Grader::new(Sandbox::new("/nonexistent/interpreter"));
        let v = grader.grade("echo 1", &question("1", "for, range")).await;
        assert!(!v.passed);
        assert_eq!(v.kind, VerdictKind::KeywordGateFailure);
        assert_eq!(v.output, None);
        assert_eq!(v.missing_keywords, Some(vec!["for".to_string(), "range".to_string()]));
        assert!(v.message.contains("for, range"));
    }

    #[tokio::test]
    async fn whitespace_insensitive_match() {
        let grader = sh_grader();
        let v = grader.grade("echo hello", &question("hello", "")).await;
        assert!(v.passed);
        assert_eq!(v.kind, VerdictKind::Passed);

        let v = grader.grade("echo hello", &question(" hello  ", "")).await;
        assert!(v.passed);
        assert_eq!(v.expected, "hello");
        assert_eq!(v.output.as_deref(), Some("hello"));

        let v = grader.grade("printf '1\\r\\n2\\r\\n'", &question("1\n2", "")).await;
        assert!(v.passed);
    }

    #[tokio::test]
    async fn case_mismatch_fails() {
        let v = sh_grader().grade("echo hello", &question("Hello", "")).await;
        assert!(!v.passed);
        assert_eq!(v.kind, VerdictKind::OutputMismatch);
        assert_eq!(v.message, "Output does not match expected result");
    }

    #[tokio::test]
    async fn runtime_failure_surfaces_stderr() {
        let v = sh_grader()
            .grade("echo partial\necho boom >&2\nexit 1", &question("partial", ""))
            .await;
        assert!(!v.passed);
        assert_eq!(v.kind, VerdictKind::RuntimeFailure);
        assert_eq!(v.output.as_deref(), Some("boom\n"));
        assert_eq!(v.message, "Code has errors");
    }

    #[tokio::test]
    async fn infinite_loop_times_out_within_budget() {
        let grader = sh_grader().with_timeout(Duration::from_millis(400));
        let started = Instant::now();
        let v = grader.grade("while true; do :; done", &question("x", "")).await;
        assert!(!v.passed);
        assert_eq!(v.kind, VerdictKind::Timeout);
        assert!(v.message.contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn runaway_output_fails_without_capturing_it() {
        let grader = Grader::new(Sandbox::new("sh").with_output_limit(4096));
        let v = grader.grade("head -c 5000000 /dev/zero", &question("", "")).await;
        assert!(!v.passed);
        assert_eq!(v.kind, VerdictKind::OutputLimitExceeded);
        assert_eq!(v.output, None);
        assert_eq!(v.message, "Output exceeded the 4096 byte limit");
    }

    #[tokio::test]
    async fn sandbox_fault_degrades_to_failed_verdict() {
        let grader = Grader::new(Sandbox::new("/nonexistent/interpreter"));
        let v = grader.grade("print(1)", &question("1", "")).await;
        assert!(!v.passed);
        assert_eq!(v.kind, VerdictKind::ExecutorFault);
        assert!(v.message.contains("/nonexistent/interpreter"));
    }

    #[tokio::test]
    async fn python_print_hello() {
        if !python_available() {
            eprintln!("python3 not installed; skipping");
            return;
        }
        let grader = Grader::new(Sandbox::new("python3"));
        assert!(grader.grade("print(\"hello\")", &question("hello", "print")).await.passed);
        assert!(grader.grade("print(\"hello\")", &question(" hello  ", "")).await.passed);
        assert!(!grader.grade("print(\"hello\")", &question("Hello", "")).await.passed);

        let v = grader.grade("raise ValueError('nope')", &question("", "")).await;
        assert_eq!(v.kind, VerdictKind::RuntimeFailure);
        assert!(v.output.unwrap_or_default().contains("ValueError"));

        let v = grader
            .with_timeout(Duration::from_millis(500))
            .grade("while True: pass", &question("", ""))
            .await;
        assert_eq!(v.kind, VerdictKind::Timeout);
    }
}
