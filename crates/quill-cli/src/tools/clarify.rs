//! The clarify tool definition.
//!
//! Only the schema is real: the turn engine intercepts calls to this name
//! and routes them to the operator prompt, so the handler body is
//! unreachable in a normal session. It still answers defensibly in case
//! a misconfigured engine executes it.

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use quill_agent::{CLARIFY_TOOL, SideEffect, Tool, ToolResult};

pub struct ClarifyTool;

#[async_trait]
impl Tool for ClarifyTool {
    fn name(&self) -> &str {
        CLARIFY_TOOL
    }

    fn description(&self) -> &str {
        "Ask the user a clarifying question and wait for their answer. Use this when the \
         request is ambiguous and you cannot proceed safely without more information."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "The question to ask the user"
                }
            },
            "required": ["question"]
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Interactive
    }

    async fn execute(&self, _arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        ToolResult::error("clarify is handled by the session and cannot run as a tool")
    }
}
