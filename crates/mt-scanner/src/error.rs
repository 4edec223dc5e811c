//! Error types for the mt-scanner crate.
//!
//! This module provides the [`ScanError`] type for errors that can occur
//! while resolving a scanner and executing a query.

use camino::Utf8PathBuf;
use mt_core::CoreError;

/// Errors that can occur during scanning operations.
///
/// # Error Recovery Strategy
///
/// - **Routing and mapping errors** ([`ScanError::Core`],
///   [`ScanError::NoScannerAvailable`]): fail the rule, continue the run
/// - **File read errors** ([`ScanError::Read`]): log warning, skip file, continue scan
/// - **Tool failures** ([`ScanError::Tool`], [`ScanError::Timeout`]): fail the rule
///   with the captured output
///
/// # Examples
///
/// ```
/// use mt_scanner::ScanError;
///
/// let err = ScanError::illegal_state("no location code for symbol 'widget'");
/// assert!(err.is_fatal());
/// assert!(err.to_string().contains("widget"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Routing, mapping or match-id failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// No registered scanner supports the query.
    #[error("no scanner available for {query}: {reason}")]
    NoScannerAvailable {
        /// The offending query, rendered.
        query: String,
        /// Which scanners were considered, and why the configured one was passed over.
        reason: String,
    },

    /// A request cannot be built for the query.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// An external tool could not be started.
    #[error("failed to start {tool}: {source}")]
    Spawn {
        /// The program.
        tool: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An external tool exited unsuccessfully.
    #[error("{tool} exited with status {status}")]
    Tool {
        /// The program.
        tool: String,
        /// Exit status, `-1` when killed by a signal.
        status: i32,
        /// Combined stdout and stderr lines.
        output: Vec<String>,
    },

    /// An external tool did not finish in time.
    #[error("{tool} timed out after {timeout_secs}s")]
    Timeout {
        /// The program.
        tool: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
        /// Lines the tool printed before it was killed.
        output: Vec<String>,
    },

    /// A report written by a tool could not be read.
    #[error("invalid report {path}: {reason}")]
    Report {
        /// The report file.
        path: Utf8PathBuf,
        /// Explanation of the failure.
        reason: String,
    },

    /// The symbol server failed a request.
    #[error("symbol server error: {0}")]
    SymbolServer(String),

    /// Failed to walk a directory.
    #[error("failed to walk directory: {0}")]
    Walk(#[from] ignore::Error),

    /// Failed to read a file.
    #[error("failed to read file {path}: {source}")]
    Read {
        /// The file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file the scan needs, such as a recipe document.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The file or directory.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A glob or regex in the query is invalid.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern.
        pattern: String,
        /// Explanation of the failure.
        reason: String,
    },

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),
}

impl ScanError {
    /// Creates a new [`ScanError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`ScanError::Write`] error.
    #[inline]
    pub fn write(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`ScanError::IllegalState`] error.
    #[inline]
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState(message.into())
    }

    /// Creates a new [`ScanError::Report`] error.
    #[inline]
    pub fn report(path: impl Into<Utf8PathBuf>, reason: impl Into<String>) -> Self {
        Self::Report {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new [`ScanError::InvalidPattern`] error.
    #[inline]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` if this error is recoverable (scanning can continue).
    ///
    /// Recoverable errors are file-specific issues that don't prevent
    /// scanning other files.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Read { .. })
    }

    /// Returns `true` if this error is fatal for the query.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the captured tool output, if any.
    #[must_use]
    pub fn output(&self) -> &[String] {
        match self {
            Self::Tool { output, .. } | Self::Timeout { output, .. } => output,
            _ => &[],
        }
    }
}
