//! Shell command execution tool

use async_trait::async_trait;
use serde_json::json;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use quill_agent::{Tool, ToolResult};

/// Default timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Maximum output size in bytes before truncation
const MAX_OUTPUT_SIZE: usize = 100_000;

/// Tool for executing shell commands in the project directory
pub struct ExecuteBashTool {
    cwd: std::path::PathBuf,
}

impl ExecuteBashTool {
    pub fn new(cwd: impl Into<std::path::PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }
}

#[async_trait]
impl Tool for ExecuteBashTool {
    fn name(&self) -> &str {
        "execute_bash"
    }

    fn description(&self) -> &str {
        "Execute a bash command and return the combined stdout and stderr output."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The bash command to execute"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Timeout in seconds (default 60)"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, cancel: CancellationToken) -> ToolResult {
        let Some(command) = arguments.get("command").and_then(|v| v.as_str()) else {
            return ToolResult::error("Missing 'command' argument");
        };
        let timeout_secs = arguments
            .get("timeout")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let child = match child {
            Ok(c) => c,
            Err(e) => return ToolResult::error(format!("Error executing command: {}", e)),
        };

        let duration = std::time::Duration::from_secs(timeout_secs);
        let output = tokio::select! {
            _ = cancel.cancelled() => {
                return ToolResult::error("Command cancelled");
            }
            result = tokio::time::timeout(duration, child.wait_with_output()) => {
                match result {
                    Err(_) => {
                        return ToolResult::error(format!(
                            "Error: Command timed out after {} seconds",
                            timeout_secs
                        ));
                    }
                    Ok(Err(e)) => {
                        return ToolResult::error(format!("Error executing command: {}", e));
                    }
                    Ok(Ok(output)) => output,
                }
            }
        };

        let stdout = truncate(String::from_utf8_lossy(&output.stdout).trim_end_matches('\n'));
        let stderr = truncate(String::from_utf8_lossy(&output.stderr).trim_end_matches('\n'));

        let mut parts = Vec::new();
        if !stdout.is_empty() {
            parts.push(stdout);
        }
        if !stderr.is_empty() {
            parts.push(format!("stderr: {}", stderr));
        }

        let code = output.status.code().unwrap_or(-1);
        if !output.status.success() {
            parts.push(format!("[Command exited with code {}]", code));
        }

        if parts.is_empty() {
            ToolResult::text("Command executed successfully (no output)")
        } else if output.status.success() {
            ToolResult::text(parts.join("\n"))
        } else {
            ToolResult::error(parts.join("\n"))
        }
    }
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_OUTPUT_SIZE {
        return text.to_string();
    }
    let mut cut = MAX_OUTPUT_SIZE;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}\n... (output truncated at {}KB)", &text[..cut], MAX_OUTPUT_SIZE / 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> ExecuteBashTool {
        ExecuteBashTool::new(std::env::temp_dir())
    }

    #[tokio::test]
    async fn test_stdout_captured() {
        let result = tool()
            .execute(json!({"command": "echo hello"}), CancellationToken::new())
            .await;
        assert!(!result.is_error);
        assert_eq!(result.text, "hello");
    }

    #[tokio::test]
    async fn test_stderr_prefixed_and_exit_code_noted() {
        let result = tool()
            .execute(
                json!({"command": "echo oops >&2; exit 3"}),
                CancellationToken::new(),
            )
            .await;
        assert!(result.is_error);
        assert!(result.text.contains("stderr: oops"));
        assert!(result.text.contains("[Command exited with code 3]"));
    }

    #[tokio::test]
    async fn test_no_output_message() {
        let result = tool()
            .execute(json!({"command": "true"}), CancellationToken::new())
            .await;
        assert_eq!(result.text, "Command executed successfully (no output)");
    }

    #[tokio::test]
    async fn test_timeout_is_error_text() {
        let result = tool()
            .execute(
                json!({"command": "sleep 5", "timeout": 1}),
                CancellationToken::new(),
            )
            .await;
        assert!(result.is_error);
        assert!(result.text.contains("timed out after 1 seconds"));
    }

    #[tokio::test]
    async fn test_cancellation_kills_command() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = tool()
            .execute(json!({"command": "sleep 5"}), cancel)
            .await;
        assert!(result.is_error);
        assert!(result.text.contains("cancelled"));
    }
}
