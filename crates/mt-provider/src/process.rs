//! Asynchronous subprocess execution.
//!
//! [`ProcessRunner`] is the seam between providers and real processes.
//! [`TokioProcessRunner`] merges stdout and stderr into one line stream in
//! arrival order, forwards each line to the log while the process runs, and
//! kills the process if it outlives its timeout. Lines printed before the
//! kill travel with the timeout error.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::ProviderError;

/// Creates a command rooted to a specific working directory.
#[allow(clippy::disallowed_methods)]
pub fn command(program: &str, working_dir: &Utf8Path) -> Command {
    let mut cmd = Command::new(program);
    cmd.current_dir(working_dir.as_std_path());
    cmd
}

/// A fully described subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    /// Program to run.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Working directory.
    pub working_dir: Utf8PathBuf,
    /// Upper bound on run time.
    pub timeout: Duration,
    /// Log every output line at `info` instead of `debug`.
    pub echo: bool,
}

impl fmt::Display for ProcessSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Exit status and output of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `-1` when terminated by a signal.
    pub status: i32,
    /// Stdout and stderr lines in arrival order.
    pub lines: Vec<String>,
}

impl ProcessOutput {
    /// Returns `true` for exit code 0.
    #[inline]
    #[must_use]
    pub const fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs subprocesses to completion.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs the process and returns its status and output.
    ///
    /// A non-zero exit is reported through [`ProcessOutput::status`].
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Spawn`] if the program cannot be started and
    /// [`ProviderError::Timeout`] if it does not finish in time.
    async fn run(&self, spec: &ProcessSpec) -> Result<ProcessOutput, ProviderError>;
}

/// Runs subprocesses on the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, spec: &ProcessSpec) -> Result<ProcessOutput, ProviderError> {
        debug!(command = %spec, cwd = %spec.working_dir, "spawning process");

        let mut child = command(&spec.program, &spec.working_dir)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProviderError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        let program = spec.program.as_str();
        let mut lines = Vec::new();
        let collect = async {
            while let Some(line) = rx.recv().await {
                if spec.echo {
                    info!(target: "mtool::process", program, "{line}");
                } else {
                    debug!(target: "mtool::process", program, "{line}");
                }
                lines.push(line);
            }
            child.wait().await
        };

        let outcome = tokio::time::timeout(spec.timeout, collect).await;
        match outcome {
            Ok(Ok(status)) => Ok(ProcessOutput {
                status: status.code().unwrap_or(-1),
                lines,
            }),
            Ok(Err(source)) => Err(ProviderError::Spawn {
                program: spec.program.clone(),
                source,
            }),
            Err(_) => {
                warn!(program, timeout_secs = spec.timeout.as_secs(), "process timed out, killing it");
                drop(child.start_kill());
                while let Ok(line) = rx.try_recv() {
                    lines.push(line);
                }
                Err(ProviderError::Timeout {
                    what: spec.program.clone(),
                    timeout_secs: spec.timeout.as_secs(),
                    output: lines,
                })
            }
        }
    }
}

async fn forward_lines(pipe: impl AsyncRead + Unpin, tx: mpsc::UnboundedSender<String>) {
    let mut lines = BufReader::new(pipe).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(program: &str, args: &[&str]) -> ProcessSpec {
        ProcessSpec {
            program: program.to_owned(),
            args: args.iter().map(|a| (*a).to_owned()).collect(),
            working_dir: Utf8PathBuf::from("."),
            timeout: Duration::from_secs(10),
            echo: false,
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(spec("mvn", &["-B", "-q"]).to_string(), "mvn -B -q");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_collects_both_streams() {
        let output = TokioProcessRunner
            .run(&spec("sh", &["-c", "echo out; echo err >&2; exit 2"]))
            .await
            .unwrap();
        assert_eq!(output.status, 2);
        assert!(!output.success());
        let mut lines = output.lines.clone();
        lines.sort();
        assert_eq!(lines, vec!["err", "out"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let mut sleepy = spec("sleep", &["5"]);
        sleepy.timeout = Duration::from_millis(100);
        let err = TokioProcessRunner.run(&sleepy).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_keeps_earlier_output() {
        let mut stalled = spec("sh", &["-c", "echo resolving dependencies; sleep 5"]);
        stalled.timeout = Duration::from_millis(500);
        let err = TokioProcessRunner.run(&stalled).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { .. }), "{err}");
        assert_eq!(err.output(), ["resolving dependencies"]);
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = TokioProcessRunner
            .run(&spec("definitely-not-a-real-program-mtool", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Spawn { .. }));
    }
}
