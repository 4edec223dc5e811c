//! File tools offered to the AI assistant.
//!
//! The assistant gets exactly two tools, `read_file` and `write_file`. Both
//! take project-relative paths and refuse anything that would leave the
//! project root. A write is only accepted for a path read since the last
//! write to it, so the assistant always edits the current contents.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use mt_core::FxHashSet;
use serde_json::{Value, json};
use tracing::debug;

use crate::assistant::ToolDefinition;
use crate::error::ProviderError;

/// Name of the read tool.
pub const READ_FILE: &str = "read_file";

/// Name of the write tool.
pub const WRITE_FILE: &str = "write_file";

/// Read and write access to one project, confined to its root.
///
/// # Examples
///
/// ```no_run
/// use mt_provider::FileTools;
///
/// let mut tools = FileTools::new("/work/app");
/// let text = tools.read_file("src/main/java/App.java")?;
/// tools.write_file("src/main/java/App.java", &text.replace("javax.", "jakarta."))?;
///
/// // A second write needs a fresh read first.
/// assert!(tools.write_file("src/main/java/App.java", "").is_err());
/// # Ok::<(), mt_provider::ProviderError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileTools {
    root: Utf8PathBuf,
    read: FxHashSet<Utf8PathBuf>,
}

impl FileTools {
    /// Creates tools rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            read: FxHashSet::default(),
        }
    }

    /// Definitions advertised to the assistant.
    #[must_use]
    pub fn definitions() -> Vec<ToolDefinition> {
        let path = json!({
            "type": "string",
            "description": "Path relative to the project root"
        });
        vec![
            ToolDefinition {
                name: READ_FILE.to_owned(),
                description: "Read a file of the project. Required before every write to the same path."
                    .to_owned(),
                parameters: json!({
                    "type": "object",
                    "properties": {"path": path},
                    "required": ["path"]
                }),
            },
            ToolDefinition {
                name: WRITE_FILE.to_owned(),
                description: "Replace the contents of a file previously read with read_file."
                    .to_owned(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": path,
                        "content": {"type": "string", "description": "New file contents"}
                    },
                    "required": ["path", "content"]
                }),
            },
        ]
    }

    /// Resolves a project-relative path, rejecting absolute paths and `..`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ToolCall`] if the path would leave the project.
    pub fn resolve(&self, path: &str) -> Result<Utf8PathBuf, ProviderError> {
        let relative = Utf8Path::new(path.trim());
        if relative.as_str().is_empty() {
            return Err(ProviderError::tool_call("empty path"));
        }
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Utf8Component::Normal(part) => resolved.push(part),
                Utf8Component::CurDir => {}
                Utf8Component::ParentDir | Utf8Component::RootDir | Utf8Component::Prefix(_) => {
                    return Err(ProviderError::tool_call(format!(
                        "path escapes the project: {path}"
                    )));
                }
            }
        }
        Ok(resolved)
    }

    /// Reads a file. A missing file reads as empty so it can then be created.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ToolCall`] for paths outside the project and
    /// [`ProviderError::Io`] if the file exists but cannot be read.
    pub fn read_file(&mut self, path: &str) -> Result<String, ProviderError> {
        let resolved = self.resolve(path)?;
        let text = match std::fs::read_to_string(&resolved) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(ProviderError::io(&resolved, e)),
        };
        debug!(path = %resolved, bytes = text.len(), "assistant read file");
        self.read.insert(resolved);
        Ok(text)
    }

    /// Writes a file previously read with [`read_file`](Self::read_file).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ToolCall`] if the path is outside the project or
    /// was not read since its last write, and [`ProviderError::Io`] if writing fails.
    pub fn write_file(&mut self, path: &str, content: &str) -> Result<String, ProviderError> {
        let resolved = self.resolve(path)?;
        if !self.read.remove(&resolved) {
            return Err(ProviderError::tool_call(format!(
                "read {path} with {READ_FILE} before writing it"
            )));
        }
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ProviderError::io(parent, e))?;
        }
        std::fs::write(&resolved, content).map_err(|e| ProviderError::io(&resolved, e))?;
        debug!(path = %resolved, bytes = content.len(), "assistant wrote file");
        Ok(format!("wrote {} bytes to {path}", content.len()))
    }

    /// Dispatches a tool call by name.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ToolCall`] for unknown tools or missing
    /// arguments, and whatever the tool itself returns.
    pub fn call(&mut self, name: &str, arguments: &Value) -> Result<String, ProviderError> {
        let argument = |key: &str| {
            arguments
                .get(key)
                .and_then(Value::as_str)
                .ok_or_else(|| ProviderError::tool_call(format!("{name} requires a '{key}' string argument")))
        };
        match name {
            READ_FILE => self.read_file(argument("path")?),
            WRITE_FILE => self.write_file(argument("path")?, argument("content")?),
            other => Err(ProviderError::tool_call(format!("unknown tool '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools() -> (tempfile::TempDir, FileTools) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, FileTools::new(root))
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let (_dir, tools) = tools();
        assert!(tools.resolve("../secret").is_err());
        assert!(tools.resolve("/etc/passwd").is_err());
        assert!(tools.resolve("src/../../x").is_err());
        assert!(tools.resolve("").is_err());
        assert!(tools.resolve("./src/A.java").unwrap().ends_with("src/A.java"));
    }

    #[test]
    fn test_write_requires_fresh_read() {
        let (_dir, mut tools) = tools();
        assert!(tools.write_file("A.java", "x").is_err());

        assert_eq!(tools.read_file("A.java").unwrap(), "");
        tools.write_file("A.java", "class A {}").unwrap();
        assert!(matches!(
            tools.write_file("A.java", "class B {}"),
            Err(ProviderError::ToolCall(_))
        ));

        assert_eq!(tools.read_file("A.java").unwrap(), "class A {}");
    }

    #[test]
    fn test_read_then_write_other_path_is_rejected() {
        let (_dir, mut tools) = tools();
        tools.read_file("src/A.java").unwrap();
        assert!(tools.write_file("src/B.java", "").is_err());
        tools.write_file("./src/A.java", "ok").unwrap();
    }

    #[test]
    fn test_call_dispatch() {
        let (_dir, mut tools) = tools();
        tools
            .call(READ_FILE, &json!({"path": "notes.txt"}))
            .unwrap();
        let message = tools
            .call(WRITE_FILE, &json!({"path": "notes.txt", "content": "hi"}))
            .unwrap();
        assert_eq!(message, "wrote 2 bytes to notes.txt");
        assert!(tools.call("delete_file", &json!({"path": "notes.txt"})).is_err());
        assert!(tools.call(WRITE_FILE, &json!({"path": "notes.txt"})).is_err());
    }
}
