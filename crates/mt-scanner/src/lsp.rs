//! Stdio client for a Java language server.
//!
//! Messages are JSON-RPC 2.0 payloads framed with a `Content-Length` header:
//!
//! ```text
//! Content-Length: <length>\r\n
//! \r\n
//! <payload>
//! ```
//!
//! [`LspSymbolServer`] starts the server, runs the `initialize` handshake
//! once, then answers every [`SymbolServer::execute_command`] with a
//! `workspace/executeCommand` request. Requests the server sends in between
//! are answered with a `null` result; notifications are skipped.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};
use std::thread;
use std::time::Duration;

use camino::Utf8Path;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::ScanError;
use crate::scanners::SymbolServer;
use crate::toolchain::command;

/// Log target for language server traffic.
const LSP_TARGET: &str = "mtool::lsp";

/// Messages skipped while waiting for one response before giving up.
const MAX_SKIPPED_MESSAGES: usize = 10_000;

/// Time a stopping server gets to exit before it is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

fn protocol_error(message: impl Into<String>) -> ScanError {
    ScanError::SymbolServer(message.into())
}

fn io_error(e: std::io::Error) -> ScanError {
    ScanError::SymbolServer(format!("transport failed: {e}"))
}

/// Reads and writes `Content-Length` framed JSON messages.
#[derive(Debug)]
pub struct FramedTransport<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> FramedTransport<R, W> {
    /// Creates a transport reading from `reader` and writing to `writer`.
    #[must_use]
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Sends one framed message.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::SymbolServer`] if writing fails.
    pub fn send(&mut self, message: &Value) -> Result<(), ScanError> {
        let payload = serde_json::to_vec(message)
            .map_err(|e| protocol_error(format!("cannot encode message: {e}")))?;
        write!(self.writer, "Content-Length: {}\r\n\r\n", payload.len()).map_err(io_error)?;
        self.writer.write_all(&payload).map_err(io_error)?;
        self.writer.flush().map_err(io_error)
    }

    /// Receives one framed message, blocking until it is complete.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::SymbolServer`] on end of stream, a missing or
    /// malformed `Content-Length` header, or a payload that is not JSON.
    pub fn receive(&mut self) -> Result<Value, ScanError> {
        let mut length = None;
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line).map_err(io_error)? == 0 {
                return Err(protocol_error("connection closed while reading headers"));
            }
            let header = line.trim();
            if header.is_empty() {
                break;
            }
            // Other headers, such as Content-Type, are ignored.
            match header.split_once(':') {
                Some((name, value)) if name.eq_ignore_ascii_case("content-length") => {
                    let parsed = value
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| protocol_error(format!("invalid header '{header}'")))?;
                    length = Some(parsed);
                }
                _ => {}
            }
        }

        let length = length.ok_or_else(|| protocol_error("missing Content-Length header"))?;
        let mut body = vec![0u8; length];
        self.reader.read_exact(&mut body).map_err(io_error)?;
        serde_json::from_slice(&body).map_err(|e| protocol_error(format!("invalid message: {e}")))
    }

    /// Gives back the writer, ending the session.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Any message the server sends.
#[derive(Debug, Deserialize)]
struct Incoming {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// JSON-RPC requests and notifications over a [`FramedTransport`].
#[derive(Debug)]
pub struct RpcSession<R, W> {
    transport: FramedTransport<R, W>,
    next_id: i64,
}

impl<R: BufRead, W: Write> RpcSession<R, W> {
    /// Starts a session. Request ids count up from 1.
    #[must_use]
    pub fn new(transport: FramedTransport<R, W>) -> Self {
        Self {
            transport,
            next_id: 1,
        }
    }

    fn send_request(&mut self, method: &str, params: Value) -> Result<i64, ScanError> {
        let id = self.next_id;
        self.next_id += 1;
        debug!(target: LSP_TARGET, method, id, "sending request");
        self.transport.send(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))?;
        Ok(id)
    }

    /// Sends a request and waits for its response.
    ///
    /// A `null` or missing result is returned as [`Value::Null`].
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::SymbolServer`] if the server answers with an
    /// error, the transport fails, or no matching response arrives.
    pub fn request(&mut self, method: &str, params: Value) -> Result<Value, ScanError> {
        let id = self.send_request(method, params)?;
        let expected = Value::from(id);

        for _ in 0..MAX_SKIPPED_MESSAGES {
            let message: Incoming = serde_json::from_value(self.transport.receive()?)
                .map_err(|e| protocol_error(format!("invalid message: {e}")))?;

            match (message.method, message.id) {
                (Some(server_method), Some(server_id)) => {
                    debug!(target: LSP_TARGET, method = %server_method, "answering server request");
                    self.transport.send(&json!({
                        "jsonrpc": "2.0",
                        "id": server_id,
                        "result": null,
                    }))?;
                }
                (Some(notification), None) => {
                    debug!(target: LSP_TARGET, method = %notification, "skipping notification");
                }
                (None, Some(response_id)) if response_id == expected => {
                    if let Some(error) = message.error {
                        return Err(protocol_error(format!(
                            "{method} failed ({}): {}",
                            error.code, error.message
                        )));
                    }
                    return Ok(message.result.unwrap_or(Value::Null));
                }
                (None, other) => {
                    warn!(target: LSP_TARGET, expected = id, received = ?other, "skipping response with non-matching id");
                }
            }
        }

        Err(protocol_error(format!(
            "no response to {method} after {MAX_SKIPPED_MESSAGES} messages"
        )))
    }

    /// Sends a notification.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::SymbolServer`] if writing fails.
    pub fn notify(&mut self, method: &str, params: Value) -> Result<(), ScanError> {
        debug!(target: LSP_TARGET, method, "sending notification");
        self.transport.send(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }))
    }

    /// Asks the server to stop without waiting for its answer.
    fn close(mut self) -> W {
        if let Err(e) = self
            .send_request("shutdown", Value::Null)
            .and_then(|_| self.notify("exit", Value::Null))
        {
            debug!(target: LSP_TARGET, error = %e, "server gone before shutdown");
        }
        self.transport.into_writer()
    }
}

type ChildSession = RpcSession<BufReader<ChildStdout>, ChildStdin>;

/// A language server running as a child process.
///
/// Commands are serialized: one request is in flight at a time. Dropping the
/// server asks it to exit and kills it after a short grace period.
pub struct LspSymbolServer {
    program: String,
    session: Mutex<Option<ChildSession>>,
    child: Child,
}

impl LspSymbolServer {
    /// Starts `command_line` in `project_root` and initializes it for the project.
    ///
    /// `bundles` are passed as the `bundles` initialization option.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Spawn`] if the server cannot be started, and
    /// [`ScanError::SymbolServer`] if the command line is empty or the
    /// handshake fails.
    pub fn spawn(
        command_line: &[String],
        project_root: &Utf8Path,
        bundles: &[String],
    ) -> Result<Self, ScanError> {
        let (program, args) = command_line
            .split_first()
            .ok_or_else(|| protocol_error("no symbol server command configured"))?;
        let root = project_root
            .canonicalize_utf8()
            .map_err(|e| ScanError::read(project_root, e))?;

        let mut child = command(program, &root)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ScanError::Spawn {
                tool: program.clone(),
                source,
            })?;

        let session = match (child.stdout.take(), child.stdin.take()) {
            (Some(stdout), Some(stdin)) => {
                RpcSession::new(FramedTransport::new(BufReader::new(stdout), stdin))
            }
            _ => {
                drop(child.kill());
                drop(child.wait());
                return Err(protocol_error(format!("{program} has no stdio pipes")));
            }
        };

        // From here on a failed handshake stops the child through Drop.
        let server = Self {
            program: program.clone(),
            session: Mutex::new(Some(session)),
            child,
        };
        server.initialize(&root, bundles)?;
        info!(program = %server.program, root = %root, "symbol server ready");
        Ok(server)
    }

    fn initialize(&self, root: &Utf8Path, bundles: &[String]) -> Result<(), ScanError> {
        let uri = format!("file://{root}");
        let name = root.file_name().unwrap_or("project");

        let mut guard = self.session.lock();
        let session = guard
            .as_mut()
            .ok_or_else(|| protocol_error(format!("{} has shut down", self.program)))?;
        session.request(
            "initialize",
            json!({
                "processId": std::process::id(),
                "rootUri": uri,
                "rootPath": root.as_str(),
                "capabilities": {},
                "initializationOptions": {"bundles": bundles},
                "workspaceFolders": [{"uri": uri, "name": name}],
            }),
        )?;
        session.notify("initialized", json!({}))
    }

    fn terminate(&mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(target: LSP_TARGET, program = %self.program, ?status, "symbol server exited");
                return;
            }
            Ok(None) | Err(_) => thread::sleep(SHUTDOWN_GRACE),
        }
        if !matches!(self.child.try_wait(), Ok(Some(_))) {
            warn!(target: LSP_TARGET, program = %self.program, "symbol server did not exit, killing it");
            drop(self.child.kill());
            drop(self.child.wait());
        }
    }
}

impl std::fmt::Debug for LspSymbolServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LspSymbolServer")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

impl SymbolServer for LspSymbolServer {
    fn execute_command(&self, command: &str, arguments: &[Value]) -> Result<Value, ScanError> {
        let mut guard = self.session.lock();
        let session = guard
            .as_mut()
            .ok_or_else(|| protocol_error(format!("{} has shut down", self.program)))?;
        session.request(
            "workspace/executeCommand",
            json!({"command": command, "arguments": arguments}),
        )
    }
}

impl Drop for LspSymbolServer {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            // Dropping stdin closes the pipe.
            drop(session.close());
        }
        self.terminate();
    }
}

/// Frames `messages` the way a server writes them.
///
/// # Examples
///
/// ```
/// use mt_scanner::lsp::frame;
/// use serde_json::json;
///
/// let bytes = frame(&[json!({"id": 1})]);
/// assert_eq!(bytes, b"Content-Length: 8\r\n\r\n{\"id\":1}");
/// ```
#[must_use]
pub fn frame(messages: &[Value]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for message in messages {
        let payload = message.to_string();
        bytes.extend_from_slice(format!("Content-Length: {}\r\n\r\n", payload.len()).as_bytes());
        bytes.extend_from_slice(payload.as_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn session(input: Vec<u8>) -> RpcSession<Cursor<Vec<u8>>, Vec<u8>> {
        RpcSession::new(FramedTransport::new(Cursor::new(input), Vec::new()))
    }

    fn sent(bytes: &[u8]) -> Vec<Value> {
        let mut transport = FramedTransport::new(Cursor::new(bytes.to_vec()), Vec::new());
        let mut messages = Vec::new();
        while let Ok(message) = transport.receive() {
            messages.push(message);
        }
        messages
    }

    #[test]
    fn test_receive_ignores_other_headers() {
        let input = b"Content-Length: 2\r\nContent-Type: application/vscode-jsonrpc\r\n\r\n{}".to_vec();
        let mut transport = FramedTransport::new(Cursor::new(input), Vec::new());
        assert_eq!(transport.receive().unwrap(), json!({}));
    }

    #[test]
    fn test_receive_rejects_bad_frames() {
        let missing = b"Content-Type: x\r\n\r\n{}".to_vec();
        let err = FramedTransport::new(Cursor::new(missing), Vec::new())
            .receive()
            .unwrap_err();
        assert!(err.to_string().contains("missing Content-Length"), "{err}");

        let invalid = b"Content-Length: two\r\n\r\n{}".to_vec();
        let err = FramedTransport::new(Cursor::new(invalid), Vec::new())
            .receive()
            .unwrap_err();
        assert!(err.to_string().contains("invalid header"), "{err}");

        let closed = b"Content-Length: 2".to_vec();
        let err = FramedTransport::new(Cursor::new(closed), Vec::new())
            .receive()
            .unwrap_err();
        assert!(err.to_string().contains("connection closed"), "{err}");
    }

    #[test]
    fn test_request_skips_notifications_and_answers_server_requests() {
        let input = frame(&[
            json!({"jsonrpc": "2.0", "method": "window/logMessage", "params": {"message": "indexing"}}),
            json!({"jsonrpc": "2.0", "id": "reg-1", "method": "client/registerCapability", "params": {}}),
            json!({"jsonrpc": "2.0", "id": 99, "result": "stale"}),
            json!({"jsonrpc": "2.0", "id": 1, "result": [{"name": "Customer"}]}),
        ]);
        let mut session = session(input);

        let result = session
            .request("workspace/executeCommand", json!({"command": "x", "arguments": []}))
            .unwrap();
        assert_eq!(result, json!([{"name": "Customer"}]));

        let written = sent(&session.transport.into_writer());
        assert_eq!(written.len(), 2);
        assert_eq!(written[0]["id"], 1);
        assert_eq!(written[0]["method"], "workspace/executeCommand");
        assert_eq!(written[1], json!({"jsonrpc": "2.0", "id": "reg-1", "result": null}));
    }

    #[test]
    fn test_request_reports_server_error() {
        let input = frame(&[json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32601, "message": "No delegateCommandHandler"}
        })]);
        let err = session(input)
            .request("workspace/executeCommand", json!({}))
            .unwrap_err();
        assert!(matches!(err, ScanError::SymbolServer(_)));
        assert_eq!(
            err.to_string(),
            "symbol server error: workspace/executeCommand failed (-32601): No delegateCommandHandler"
        );
    }

    #[test]
    fn test_null_result() {
        let input = frame(&[json!({"jsonrpc": "2.0", "id": 1, "result": null})]);
        assert_eq!(session(input).request("initialize", json!({})).unwrap(), Value::Null);
    }

    #[test]
    fn test_close_sends_shutdown_then_exit() {
        let written = sent(&session(Vec::new()).close());
        assert_eq!(written.len(), 2);
        assert_eq!(written[0]["method"], "shutdown");
        assert_eq!(written[1]["method"], "exit");
        assert!(written[1].get("id").is_none());
    }

    #[test]
    fn test_spawn_requires_command() {
        let err = LspSymbolServer::spawn(&[], Utf8Path::new("."), &[]).unwrap_err();
        assert!(err.to_string().contains("no symbol server command"), "{err}");
    }
}
