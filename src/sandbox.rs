//! Process-per-submission code execution.
//!
//! WARNING: this is not a security boundary. The submission runs as a plain child
//! process with the service's own privileges; the only limits are a wall-clock
//! timeout, a per-stream output cap, a closed stdin and a cleared environment. Deploy it only inside an
//! environment that is already isolated (container, VM, throwaway host).
//!
//! Each run writes the source to a fresh, uniquely named temp file that is removed
//! on every exit path, including timeouts and spawn failures.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::error::ExecutorError;
use crate::util::trunc_for_log;

/// Captured result of a program that ran to completion (any exit status).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    /// -1 when the process was terminated by a signal.
    pub exit_code: i32,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Bytes kept per stream (stdout, stderr) before a run is cut off.
pub const DEFAULT_OUTPUT_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Execution {
    Completed(ExecutionResult),
    TimedOut,
    /// A stream went past `limit` bytes; the process was killed and its output dropped.
    OutputLimitExceeded { limit: usize },
}

#[derive(Clone, Debug)]
pub struct Sandbox {
    interpreter: String,
    temp_dir: Option<PathBuf>,
    output_limit: usize,
}

impl Sandbox {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            temp_dir: None,
            output_limit: DEFAULT_OUTPUT_LIMIT,
        }
    }

    pub fn with_output_limit(mut self, bytes: usize) -> Self {
        self.output_limit = bytes;
        self
    }

    pub fn output_limit(&self) -> usize {
        self.output_limit
    }

    /// Write submission files into `dir` instead of the OS temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Run `source` with the configured interpreter, killing it after `timeout`.
    ///
    /// Only faults of the sandbox itself are `Err`; a failing program is reported
    /// as `Execution::Completed` with a non-zero exit code.
    #[instrument(level = "info", skip(self, source), fields(interpreter = %self.interpreter, source_len = source.len(), timeout_ms = timeout.as_millis() as u64))]
    pub async fn execute(&self, source: &str, timeout: Duration) -> Result<Execution, ExecutorError> {
        let script = self.write_script(source)?;
        let outcome = self.run_script(&script, timeout).await;

        // Dropping the TempPath would also remove it; closing surfaces the error.
        let script_path = script.to_path_buf();
        if let Err(e) = script.close() {
            warn!(target: "grading", path = %script_path.display(), error = %e, "Failed to remove submission file");
        }
        outcome
    }

    fn write_script(&self, source: &str) -> Result<TempPath, ExecutorError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("submission-").suffix(".py");
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(ExecutorError::TempFile)?;

        file.write_all(source.as_bytes()).map_err(ExecutorError::Write)?;
        file.flush().map_err(ExecutorError::Write)?;
        Ok(file.into_temp_path())
    }

    async fn run_script(&self, script: &Path, timeout: Duration) -> Result<Execution, ExecutorError> {
        let path_env = std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/usr/local/bin:/bin".to_string());

        // kill_on_drop: when the timeout drops the collect future, the child gets SIGKILL.
        let mut child = Command::new(&self.interpreter)
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env_clear()
            .env("PATH", path_env)
            .env("PYTHONIOENCODING", "utf-8")
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecutorError::Spawn {
                interpreter: self.interpreter.clone(),
                source,
            })?;

        let limit = self.output_limit;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let started = Instant::now();
        let collect = async {
            // try_join stops at the first overflow instead of waiting on the other stream.
            let (stdout, stderr) = tokio::try_join!(read_capped(stdout, limit), read_capped(stderr, limit))?;
            let status = child.wait().await.map_err(Capture::Io)?;
            Ok::<_, Capture>((stdout, stderr, status))
        };
        let outcome = tokio::time::timeout(timeout, collect).await;

        match outcome {
            Ok(Ok((stdout, stderr, status))) => {
                let result = ExecutionResult {
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                    exit_code: status.code().unwrap_or(-1),
                };
                info!(target: "grading", exit_code = result.exit_code, elapsed_ms = started.elapsed().as_millis() as u64, stdout_len = result.stdout.len(), stderr_len = result.stderr.len(), "Submission finished");
                debug!(target: "grading", stdout = %trunc_for_log(&result.stdout, 200), stderr = %trunc_for_log(&result.stderr, 200), "Captured output");
                Ok(Execution::Completed(result))
            }
            Ok(Err(Capture::Overflow)) => {
                if let Err(e) = child.kill().await {
                    warn!(target: "grading", error = %e, "Failed to kill submission after output overflow");
                }
                warn!(target: "grading", limit, elapsed_ms = started.elapsed().as_millis() as u64, "Submission output over limit; process killed");
                Ok(Execution::OutputLimitExceeded { limit })
            }
            Ok(Err(Capture::Io(e))) => Err(ExecutorError::Wait(e)),
            Err(_) => {
                warn!(target: "grading", timeout_ms = timeout.as_millis() as u64, "Submission timed out; process killed");
                Ok(Execution::TimedOut)
            }
        }
    }
}

enum Capture {
    Io(std::io::Error),
    Overflow,
}

/// Read a child stream to EOF, giving up once it exceeds `limit` bytes.
async fn read_capped<R: AsyncRead + Unpin>(stream: Option<R>, limit: usize) -> Result<Vec<u8>, Capture> {
    let mut buf = Vec::new();
    if let Some(stream) = stream {
        stream
            .take(limit as u64 + 1)
            .read_to_end(&mut buf)
            .await
            .map_err(Capture::Io)?;
    }
    if buf.len() > limit {
        return Err(Capture::Overflow);
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_dir_empty(dir: &Path) {
        let leftover: Vec<_> = std::fs::read_dir(dir).unwrap().collect();
        assert!(leftover.is_empty(), "leaked files: {leftover:?}");
    }

    #[tokio::test]
    async fn captures_stdout_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new("sh").with_temp_dir(dir.path());

        let out = sandbox.execute("echo hello", Duration::from_secs(5)).await.unwrap();
        assert_eq!(
            out,
            Execution::Completed(ExecutionResult {
                stdout: "hello\n".into(),
                stderr: String::new(),
                exit_code: 0,
            })
        );
        assert_dir_empty(dir.path());
    }

    #[tokio::test]
    async fn non_zero_exit_is_a_result_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new("sh").with_temp_dir(dir.path());

        let out = sandbox
            .execute("echo oops >&2\nexit 3", Duration::from_secs(5))
            .await
            .unwrap();
        match out {
            Execution::Completed(r) => {
                assert_eq!(r.exit_code, 3);
                assert!(!r.success());
                assert_eq!(r.stderr, "oops\n");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_dir_empty(dir.path());
    }

    #[tokio::test]
    async fn infinite_loop_times_out_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new("sh").with_temp_dir(dir.path());

        let started = Instant::now();
        let out = sandbox
            .execute("while true; do :; done", Duration::from_millis(300))
            .await
            .unwrap();
        assert_eq!(out, Execution::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_dir_empty(dir.path());
    }

    #[tokio::test]
    async fn missing_interpreter_is_a_fault_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new("/nonexistent/interpreter-xyz").with_temp_dir(dir.path());

        let err = sandbox.execute("print(1)", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Spawn { .. }), "got {err:?}");
        assert!(err.to_string().contains("interpreter-xyz"));
        assert_dir_empty(dir.path());
    }

    #[tokio::test]
    async fn missing_temp_dir_is_a_fault() {
        let sandbox = Sandbox::new("sh").with_temp_dir("/nonexistent/submissions-dir");
        let err = sandbox.execute("echo hi", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ExecutorError::TempFile(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn flood_of_output_is_cut_off_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new("sh").with_temp_dir(dir.path());
        assert_eq!(sandbox.output_limit(), DEFAULT_OUTPUT_LIMIT);

        let started = Instant::now();
        let out = sandbox
            .execute("head -c 5000000 /dev/zero", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, Execution::OutputLimitExceeded { limit: DEFAULT_OUTPUT_LIMIT });
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_dir_empty(dir.path());
    }

    #[tokio::test]
    async fn output_limit_applies_to_each_stream() {
        let sandbox = Sandbox::new("sh").with_output_limit(1000);

        let out = sandbox
            .execute("head -c 1000 /dev/zero\nhead -c 1000 /dev/zero >&2", Duration::from_secs(5))
            .await
            .unwrap();
        match out {
            Execution::Completed(r) => {
                assert_eq!(r.stdout.len(), 1000);
                assert_eq!(r.stderr.len(), 1000);
            }
            other => panic!("unexpected {other:?}"),
        }

        let out = sandbox
            .execute("head -c 1001 /dev/zero >&2", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, Execution::OutputLimitExceeded { limit: 1000 });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_runs_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new("sh").with_temp_dir(dir.path());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sandbox = sandbox.clone();
                tokio::spawn(async move {
                    let src = format!("echo run-{i}");
                    (i, sandbox.execute(&src, Duration::from_secs(5)).await.unwrap())
                })
            })
            .collect();

        for handle in handles {
            let (i, out) = handle.await.unwrap();
            match out {
                Execution::Completed(r) => assert_eq!(r.stdout.trim(), format!("run-{i}")),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_dir_empty(dir.path());
    }
}
