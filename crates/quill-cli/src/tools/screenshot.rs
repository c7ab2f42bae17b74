//! Screen capture tool

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use quill_agent::{Tool, ToolResult};

use crate::sandbox::Sandbox;

const CAPTURE_TIMEOUT_SECS: u64 = 30;

/// Tool that shells out to the platform screen capture command
pub struct ScreenshotTool {
    sandbox: Sandbox,
}

impl ScreenshotTool {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }

    fn default_path(&self) -> String {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        format!("screenshots/screenshot_{}.png", timestamp)
    }
}

#[async_trait]
impl Tool for ScreenshotTool {
    fn name(&self) -> &str {
        "screenshot"
    }

    fn description(&self) -> &str {
        "Take a screenshot of the screen and save it as a PNG inside the project directory. \
         Returns the path to the saved file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Where to save the screenshot; defaults to a timestamped \
                                    file under screenshots/"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        let path = arguments
            .get("path")
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| self.default_path());

        let resolved = match self.sandbox.resolve(&path) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(e),
        };
        if let Some(parent) = resolved.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return ToolResult::error(format!("Error taking screenshot: {}", e));
            }
        }

        let target = resolved.to_string_lossy().to_string();
        let mut command = if cfg!(target_os = "macos") {
            let mut c = Command::new("screencapture");
            c.arg("-x").arg(&target);
            c
        } else {
            let mut c = Command::new("scrot");
            c.arg(&target);
            c
        };

        let child = match command.kill_on_drop(true).spawn() {
            Ok(c) => c,
            Err(e) => {
                return ToolResult::error(format!(
                    "Error taking screenshot: capture command unavailable ({})",
                    e
                ));
            }
        };

        let duration = std::time::Duration::from_secs(CAPTURE_TIMEOUT_SECS);
        match tokio::time::timeout(duration, child.wait_with_output()).await {
            Err(_) => ToolResult::error("Error taking screenshot: capture timed out"),
            Ok(Err(e)) => ToolResult::error(format!("Error taking screenshot: {}", e)),
            Ok(Ok(output)) if !output.status.success() => ToolResult::error(format!(
                "Error taking screenshot: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )),
            Ok(Ok(_)) => {
                if resolved.exists() {
                    ToolResult::text(self.sandbox.display_path(&resolved))
                } else {
                    ToolResult::error(format!("Error: Screenshot file not created at {}", path))
                }
            }
        }
    }
}
