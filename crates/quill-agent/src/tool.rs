//! Tool trait and execution results

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use quill_ai::ToolSpec;

/// What a tool does to the world, used for logging and display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    /// Reads state without changing anything
    ReadOnly,
    /// Changes files, processes, or external systems
    Mutating,
    /// Requires operator interaction to complete
    Interactive,
}

/// Result of a tool execution.
///
/// Both outcomes are ordinary data fed back to the model; a tool never
/// propagates an error past this boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Text returned to the model
    pub text: String,
    /// Whether the execution resulted in an error
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            is_error: true,
        }
    }
}

/// Trait for executable tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (used in API calls)
    fn name(&self) -> &str;

    /// Tool description for the model
    fn description(&self) -> &str;

    /// JSON Schema for parameters
    fn parameters_schema(&self) -> serde_json::Value;

    /// Side-effect classification
    fn side_effect(&self) -> SideEffect {
        SideEffect::Mutating
    }

    /// Execute the tool with the given arguments
    async fn execute(&self, arguments: serde_json::Value, cancel: CancellationToken) -> ToolResult;
}

/// Type alias for a boxed tool
pub type BoxedTool = Arc<dyn Tool>;

/// Convert a Tool to a quill_ai::ToolSpec for API calls
pub fn to_tool_spec(tool: &dyn Tool) -> ToolSpec {
    ToolSpec {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        parameters: tool.parameters_schema(),
    }
}
