//! File creation, reading, and line-range editing tools

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use quill_agent::{SideEffect, Tool, ToolResult};

use crate::sandbox::Sandbox;

/// Tool for creating files
pub struct FileCreateTool {
    sandbox: Sandbox,
}

impl FileCreateTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for FileCreateTool {
    fn name(&self) -> &str {
        "file_create"
    }

    fn description(&self) -> &str {
        "Create a new file with the given content. Parent directories are created as needed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path, relative to the project root or absolute"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write to the file"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        let Some(path) = arguments.get("path").and_then(|v| v.as_str()) else {
            return ToolResult::error("Missing 'path' argument");
        };
        let content = arguments
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        let resolved = match self.sandbox.resolve(path) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(e),
        };

        if let Some(parent) = resolved.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return ToolResult::error(format!("Error creating file at {}: {}", path, e));
            }
        }
        match tokio::fs::write(&resolved, content).await {
            Ok(()) => ToolResult::text(format!("File created successfully at: {}", path)),
            Err(e) => ToolResult::error(format!("Error creating file at {}: {}", path, e)),
        }
    }
}

/// Tool for reading files with line numbers
pub struct FileReadTool {
    sandbox: Sandbox,
}

impl FileReadTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "file_read"
    }

    fn description(&self) -> &str {
        "Read a file and return its content with line numbers, optionally limited to a line range."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path, relative to the project root or absolute"
                },
                "start_line": {
                    "type": "integer",
                    "description": "The first line to read (1-indexed, default 1)"
                },
                "end_line": {
                    "type": "integer",
                    "description": "The last line to read (1-indexed, inclusive; omit to read to the end)"
                }
            },
            "required": ["path"]
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::ReadOnly
    }

    async fn execute(&self, arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        let Some(path) = arguments.get("path").and_then(|v| v.as_str()) else {
            return ToolResult::error("Missing 'path' argument");
        };
        let start_line = arguments
            .get("start_line")
            .and_then(|v| v.as_i64())
            .unwrap_or(1);
        let end_line = arguments.get("end_line").and_then(|v| v.as_i64());

        let resolved = match self.sandbox.resolve(path) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(e),
        };

        let content = match tokio::fs::read_to_string(&resolved).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ToolResult::error(format!("Error: File not found at {}", path));
            }
            Err(e) => return ToolResult::error(format!("Error reading file at {}: {}", path, e)),
        };
        let lines: Vec<&str> = content.lines().collect();

        let start_idx = (start_line - 1).max(0) as usize;
        let end_idx = match end_line {
            Some(end) => (end.max(0) as usize).min(lines.len()),
            None => lines.len(),
        };

        if start_idx >= end_idx {
            return ToolResult::text(format!(
                "File is empty or selected range is invalid (lines {}-{})",
                start_line,
                end_line.map_or("end".to_string(), |e| e.to_string())
            ));
        }

        let numbered: Vec<String> = lines[start_idx..end_idx]
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{}: {}", start_idx + i + 1, line))
            .collect();
        ToolResult::text(numbered.join("\n"))
    }
}

/// Tool for replacing a line range in a file
pub struct FileEditTool {
    sandbox: Sandbox,
}

impl FileEditTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for FileEditTool {
    fn name(&self) -> &str {
        "file_edit"
    }

    fn description(&self) -> &str {
        "Edit a file by replacing a range of lines with new content. Lines are 1-indexed; \
         omitting end_line replaces only start_line."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path, relative to the project root or absolute"
                },
                "start_line": {
                    "type": "integer",
                    "description": "The first line to replace (1-indexed)"
                },
                "end_line": {
                    "type": "integer",
                    "description": "The last line to replace (1-indexed, inclusive; omit to replace only start_line)"
                },
                "new_content": {
                    "type": "string",
                    "description": "The new content to insert (can span multiple lines)"
                }
            },
            "required": ["path", "start_line", "new_content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        let Some(path) = arguments.get("path").and_then(|v| v.as_str()) else {
            return ToolResult::error("Missing 'path' argument");
        };
        let Some(start_line) = arguments.get("start_line").and_then(|v| v.as_i64()) else {
            return ToolResult::error("Missing 'start_line' argument");
        };
        let end_line = arguments.get("end_line").and_then(|v| v.as_i64());
        let new_content = arguments
            .get("new_content")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        let resolved = match self.sandbox.resolve(path) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(e),
        };

        let content = match tokio::fs::read_to_string(&resolved).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ToolResult::error(format!("Error: File not found at {}", path));
            }
            Err(e) => return ToolResult::error(format!("Error editing file at {}: {}", path, e)),
        };
        let lines: Vec<&str> = content.lines().collect();

        if start_line < 1 || start_line as usize > lines.len() {
            return ToolResult::error(format!(
                "Error: start_line {} is out of range (file has {} lines)",
                start_line,
                lines.len()
            ));
        }
        let start_idx = (start_line - 1) as usize;

        // end_line is inclusive; absent means replace the single line
        let end_idx = match end_line {
            Some(end) => (end.max(0) as usize).min(lines.len()),
            None => start_idx + 1,
        };

        if start_idx >= end_idx {
            return ToolResult::error(format!(
                "Error: Invalid range - start_line {} must be before end_line {}",
                start_line, end_idx
            ));
        }

        let mut new_lines: Vec<&str> = new_content.split('\n').collect();
        if new_content.ends_with('\n') && new_lines.last() == Some(&"") {
            new_lines.pop();
        }

        let mut result: Vec<&str> = Vec::with_capacity(lines.len());
        result.extend_from_slice(&lines[..start_idx]);
        result.extend_from_slice(&new_lines);
        result.extend_from_slice(&lines[end_idx..]);

        let mut output = result.join("\n");
        output.push('\n');

        match tokio::fs::write(&resolved, output).await {
            Ok(()) => ToolResult::text(format!(
                "File edited successfully at {}: replaced lines {}-{} with new content.",
                path, start_line, end_idx
            )),
            Err(e) => ToolResult::error(format!("Error editing file at {}: {}", path, e)),
        }
    }
}
