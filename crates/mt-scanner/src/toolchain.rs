//! Toolchain helpers for executing external commands.
//!
//! [`ToolRunner`] is the seam between scanners and real processes. The
//! production [`SystemToolRunner`] spawns the program, collects its output
//! line by line and enforces a timeout; tests substitute a fake. A timed out
//! tool's output so far is kept on the error.

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::ScanError;

/// Creates a command that is rooted to a specific working directory.
#[allow(clippy::disallowed_methods)]
pub fn command(program: &str, working_dir: &Utf8Path) -> Command {
    let mut cmd = Command::new(program);
    cmd.current_dir(working_dir.as_std_path());
    cmd
}

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Program to run.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Working directory.
    pub working_dir: Utf8PathBuf,
    /// Upper bound on run time.
    pub timeout: Duration,
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Exit status and combined output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `-1` when terminated by a signal.
    pub status: i32,
    /// Stdout lines followed by stderr lines.
    pub lines: Vec<String>,
}

impl ToolOutput {
    /// Returns `true` for exit code 0.
    #[inline]
    #[must_use]
    pub const fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs external commands to completion.
pub trait ToolRunner: Send + Sync {
    /// Runs the invocation and returns its status and output.
    ///
    /// A non-zero exit is reported through [`ToolOutput::status`], not as an error.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Spawn`] if the program cannot be started and
    /// [`ScanError::Timeout`] if it does not finish in time.
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ScanError>;
}

/// Runs commands as child processes of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToolRunner;

impl ToolRunner for SystemToolRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ScanError> {
        let tool = invocation.program.clone();
        debug!(command = %invocation, cwd = %invocation.working_dir, "spawning tool");

        let mut child = command(&invocation.program, &invocation.working_dir)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ScanError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        let stdout = Lines::default();
        let stderr = Lines::default();
        let readers: Vec<_> = [
            child.stdout.take().map(|pipe| spawn_line_reader(pipe, Arc::clone(&stdout))),
            child.stderr.take().map(|pipe| spawn_line_reader(pipe, Arc::clone(&stderr))),
        ]
        .into_iter()
        .flatten()
        .collect();

        let start = Instant::now();
        let poll_interval = Duration::from_millis(50);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if start.elapsed() > invocation.timeout => {
                    warn!(tool = %tool, timeout_secs = invocation.timeout.as_secs(), "tool timed out, killing process");
                    drop(child.kill());
                    drop(child.wait());
                    // Readers are not joined: a surviving grandchild may hold the pipes open.
                    let mut output = drain(&stdout);
                    output.extend(drain(&stderr));
                    return Err(ScanError::Timeout {
                        tool,
                        timeout_secs: invocation.timeout.as_secs(),
                        output,
                    });
                }
                Ok(None) => thread::sleep(poll_interval),
                Err(source) => return Err(ScanError::Spawn { tool, source }),
            }
        };

        for reader in readers {
            drop(reader.join());
        }
        let mut lines = drain(&stdout);
        lines.extend(drain(&stderr));

        debug!(tool = %tool, ?status, lines = lines.len(), "tool exited");
        Ok(ToolOutput {
            status: status.code().unwrap_or(-1),
            lines,
        })
    }
}

type Lines = Arc<Mutex<Vec<String>>>;

fn spawn_line_reader(pipe: impl Read + Send + 'static, lines: Lines) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for line in BufReader::new(pipe).lines().map_while(Result::ok) {
            lines.lock().push(line);
        }
    })
}

fn drain(lines: &Lines) -> Vec<String> {
    std::mem::take(&mut *lines.lock())
}
