//! Text-to-speech tool.
//!
//! Speech is deliberately fire and forget: the tool spawns a background
//! task holding the synthesis subprocess and returns immediately, so the
//! turn keeps moving while audio plays. The handle to the previous
//! utterance is kept (never awaited) and dropped when the next one
//! starts; playback failures disappear into the task.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use quill_agent::{Tool, ToolResult};

const PREVIEW_LEN: usize = 80;

/// Tool that speaks text through the platform TTS command
pub struct SpeakTool {
    enabled: bool,
    current: Mutex<Option<JoinHandle<()>>>,
}

impl SpeakTool {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            current: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Tool for SpeakTool {
    fn name(&self) -> &str {
        "speak"
    }

    fn description(&self) -> &str {
        "Speak text aloud to the user using text-to-speech. Use for brief conversational \
         responses and confirmations; never for code blocks or long technical text. Speech \
         plays in the background, so you can continue working immediately. Keep it to 1-3 \
         sentences."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The text to speak aloud. Keep it conversational and concise."
                }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        let Some(text) = arguments.get("text").and_then(|v| v.as_str()) else {
            return ToolResult::error("Missing 'text' argument");
        };
        if !self.enabled {
            return ToolResult::text("Voice output is not active. Text was not spoken.");
        }

        let spoken = text.to_string();
        let handle = tokio::spawn(async move {
            let mut command = if cfg!(target_os = "macos") {
                let mut c = tokio::process::Command::new("say");
                c.arg(&spoken);
                c
            } else {
                let mut c = tokio::process::Command::new("espeak");
                c.arg(&spoken);
                c
            };
            if let Ok(mut child) = command.kill_on_drop(true).spawn() {
                let _ = child.wait().await;
            }
        });
        // Replace the previous utterance's handle without awaiting it
        *self.current.lock() = Some(handle);

        let preview: String = if text.len() > PREVIEW_LEN {
            let mut cut = PREVIEW_LEN;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}...", &text[..cut])
        } else {
            text.to_string()
        };
        ToolResult::text(format!("Speaking: \"{}\"", preview))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_voice_does_not_speak() {
        let tool = SpeakTool::new(false);
        let result = tool
            .execute(json!({"text": "hello"}), CancellationToken::new())
            .await;
        assert!(!result.is_error);
        assert!(result.text.contains("not active"));
        assert!(tool.current.lock().is_none());
    }

    #[tokio::test]
    async fn test_returns_before_playback_finishes() {
        let tool = SpeakTool::new(true);
        let result = tool
            .execute(json!({"text": "hi there"}), CancellationToken::new())
            .await;
        // Even when no TTS binary exists the tool reports the queued text
        assert!(!result.is_error);
        assert!(result.text.contains("hi there"));
        assert!(tool.current.lock().is_some());
    }

    #[tokio::test]
    async fn test_long_text_preview_truncated() {
        let tool = SpeakTool::new(true);
        let long = "word ".repeat(50);
        let result = tool
            .execute(json!({"text": long}), CancellationToken::new())
            .await;
        assert!(result.text.contains("..."));
        assert!(result.text.len() < 120);
    }
}
