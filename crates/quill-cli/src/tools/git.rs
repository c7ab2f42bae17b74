//! Git workflow tools: commit-and-push, history, hard revert

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::LazyLock;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use quill_agent::{SideEffect, Tool, ToolResult};

use crate::sandbox::Sandbox;

static COMMIT_HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-fA-F0-9]{7,40}$").unwrap());

/// Validate a commit hash before it goes anywhere near a subprocess
pub fn is_valid_commit_hash(hash: &str) -> bool {
    COMMIT_HASH.is_match(hash)
}

/// Run one git subcommand with a timeout, returning stdout on success
async fn run_git(cwd: &PathBuf, args: &[&str], timeout_secs: u64) -> Result<String, String> {
    let child = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("Error running git: {}", e))?;

    let duration = std::time::Duration::from_secs(timeout_secs);
    let output = tokio::time::timeout(duration, child.wait_with_output())
        .await
        .map_err(|_| "Error: Git operation timed out".to_string())?
        .map_err(|e| format!("Error running git: {}", e))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
    }
}

/// Check that the working directory is inside a git repository
async fn ensure_git_repo(cwd: &PathBuf) -> Result<(), String> {
    run_git(cwd, &["rev-parse", "--is-inside-work-tree"], 10)
        .await
        .map(|_| ())
        .map_err(|_| "Not inside a git repository.".to_string())
}

/// Tool for staging, committing, and pushing a set of files
pub struct GitAddCommitPushTool {
    sandbox: Sandbox,
}

impl GitAddCommitPushTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for GitAddCommitPushTool {
    fn name(&self) -> &str {
        "git_add_commit_push"
    }

    fn description(&self) -> &str {
        "Add the given files, commit with the given message, and push to the current remote."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "files": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "File paths to add and commit"
                },
                "message": {
                    "type": "string",
                    "description": "The commit message"
                }
            },
            "required": ["files", "message"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        let files: Vec<String> = match arguments.get("files").and_then(|v| v.as_array()) {
            Some(array) => array
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
            None => return ToolResult::error("Missing 'files' argument"),
        };
        let Some(message) = arguments.get("message").and_then(|v| v.as_str()) else {
            return ToolResult::error("Missing 'message' argument");
        };
        if files.is_empty() {
            return ToolResult::error("No files given to commit");
        }

        let cwd = self.sandbox.root().to_path_buf();
        if let Err(e) = ensure_git_repo(&cwd).await {
            return ToolResult::error(e);
        }
        for file in &files {
            if let Err(e) = self.sandbox.resolve(file) {
                return ToolResult::error(format!("Invalid file path '{}': {}", file, e));
            }
        }

        let mut add_args = vec!["add"];
        add_args.extend(files.iter().map(String::as_str));
        if let Err(e) = run_git(&cwd, &add_args, 30).await {
            return ToolResult::error(format!("Error during git add: {}", e));
        }

        if let Err(e) = run_git(&cwd, &["commit", "-m", message], 30).await {
            return ToolResult::error(format!("Error during git commit: {}", e));
        }

        if let Err(e) = run_git(&cwd, &["push"], 60).await {
            return ToolResult::error(format!("Committed but push failed: {}", e));
        }

        ToolResult::text(format!(
            "Successfully added {} file(s), committed with message '{}', and pushed.",
            files.len(),
            message
        ))
    }
}

/// Tool for listing recent commits
pub struct GitHistoryTool {
    sandbox: Sandbox,
}

impl GitHistoryTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for GitHistoryTool {
    fn name(&self) -> &str {
        "git_history"
    }

    fn description(&self) -> &str {
        "Show recent git commit history with optional hash, author, and date columns."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of commits to show (default 10)"
                },
                "show_hashes": {
                    "type": "boolean",
                    "description": "Include commit hashes (default true)"
                },
                "show_author": {
                    "type": "boolean",
                    "description": "Include author names (default true)"
                },
                "show_date": {
                    "type": "boolean",
                    "description": "Include commit dates (default true)"
                }
            }
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::ReadOnly
    }

    async fn execute(&self, arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        let limit = arguments.get("limit").and_then(|v| v.as_u64()).unwrap_or(10);
        let flag = |name: &str| arguments.get(name).and_then(|v| v.as_bool()).unwrap_or(true);

        let cwd = self.sandbox.root().to_path_buf();
        if let Err(e) = ensure_git_repo(&cwd).await {
            return ToolResult::error(e);
        }

        let mut format_parts = Vec::new();
        if flag("show_hashes") {
            format_parts.push("%h");
        }
        format_parts.push("%s");
        if flag("show_author") {
            format_parts.push("%an");
        }
        if flag("show_date") {
            format_parts.push("%ad");
        }

        let format_arg = format!("--format={}", format_parts.join(" | "));
        let count_arg = format!("-n{}", limit);
        match run_git(&cwd, &["log", &format_arg, "--date=short", &count_arg], 30).await {
            Ok(log) if log.is_empty() => ToolResult::text("No commits found."),
            Ok(log) => ToolResult::text(log),
            Err(e) => ToolResult::error(format!("Error: {}", e)),
        }
    }
}

/// Tool for hard-resetting to a commit and force pushing.
///
/// Rewrites history; the description tells the model as much.
pub struct GitRevertTool {
    sandbox: Sandbox,
}

impl GitRevertTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for GitRevertTool {
    fn name(&self) -> &str {
        "git_revert_to_commit"
    }

    fn description(&self) -> &str {
        "Hard reset to a specific commit and force push. WARNING: this rewrites history and \
         discards all changes after the target commit. Commit current work first."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "commit_hash": {
                    "type": "string",
                    "description": "The commit hash to revert to (7-40 hex characters)"
                }
            },
            "required": ["commit_hash"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        let Some(hash) = arguments.get("commit_hash").and_then(|v| v.as_str()) else {
            return ToolResult::error("Missing 'commit_hash' argument");
        };

        if !is_valid_commit_hash(hash) {
            return ToolResult::error(format!(
                "Error: Invalid commit hash format '{}'. Expected 7-40 hex characters.",
                hash
            ));
        }

        let cwd = self.sandbox.root().to_path_buf();
        if let Err(e) = ensure_git_repo(&cwd).await {
            return ToolResult::error(e);
        }

        if let Err(e) = run_git(&cwd, &["reset", "--hard", hash], 30).await {
            return ToolResult::error(format!("Error during git reset: {}", e));
        }
        if let Err(e) = run_git(&cwd, &["push", "--force"], 60).await {
            return ToolResult::error(format!("Reset succeeded but force push failed: {}", e));
        }

        ToolResult::text(format!(
            "Successfully reverted to commit {} and force pushed.",
            hash
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_commit_hashes() {
        assert!(is_valid_commit_hash("abc1234"));
        assert!(is_valid_commit_hash("ABCDEF0123456789abcdef0123456789abcdef01"));
    }

    #[test]
    fn test_invalid_commit_hashes() {
        assert!(!is_valid_commit_hash("abc123"));
        assert!(!is_valid_commit_hash("HEAD"));
        assert!(!is_valid_commit_hash("abc1234; rm -rf /"));
        assert!(!is_valid_commit_hash("main"));
        assert!(!is_valid_commit_hash(""));
        assert!(!is_valid_commit_hash(&"a".repeat(41)));
    }

    #[tokio::test]
    async fn test_revert_rejects_bad_hash_before_subprocess() {
        let tool = GitRevertTool::new(Sandbox::new("/nonexistent"));
        let result = tool
            .execute(
                json!({"commit_hash": "not-a-hash"}),
                CancellationToken::new(),
            )
            .await;
        assert!(result.is_error);
        assert!(result.text.contains("Invalid commit hash format"));
    }

    #[tokio::test]
    async fn test_not_a_repo_is_error_text() {
        let dir = std::env::temp_dir().join(format!("quill-git-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let tool = GitHistoryTool::new(Sandbox::new(&dir));
        let result = tool.execute(json!({}), CancellationToken::new()).await;
        assert!(result.is_error);
        assert!(result.text.contains("Not inside a git repository."));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_commit_push_validates_paths_first() {
        let tool = GitAddCommitPushTool::new(Sandbox::new(std::env::temp_dir()));
        let result = tool
            .execute(
                json!({"files": [], "message": "m"}),
                CancellationToken::new(),
            )
            .await;
        assert!(result.is_error);
        assert!(result.text.contains("No files"));
    }
}
