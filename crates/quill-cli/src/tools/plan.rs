//! Task planning tool.
//!
//! Renders a planning brief for the model to fill in: the template comes
//! from PLAN.md in the prompts directory when present, with a built-in
//! fallback. The model receives the rendered brief as the tool result
//! and writes the actual plan itself.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use quill_agent::{SideEffect, Tool, ToolResult};

const DEFAULT_CONTEXT: &str = "No specific context provided.";
const DEFAULT_CAPABILITIES: &str =
    "File operations (create, read, edit), bash execution, git operations, planning.";

const DEFAULT_TEMPLATE: &str = "\
You are an expert task planner. Create a detailed, step-by-step plan for the following task:

TASK: {task}

CURRENT CONTEXT: {current_context}

AVAILABLE TOOLS/CAPABILITIES: {available_tools}

Please analyze this task and create a comprehensive plan that:
1. Breaks down the task into specific, actionable steps
2. Considers the current context and constraints
3. Uses the available tools effectively
4. Identifies potential challenges and how to address them
5. Prioritizes steps logically
6. Includes verification points

Format your response as a structured plan with numbered steps, each including:
- Step number and brief title
- Clear description of what needs to be done
- Which tools or approaches to use
- Any dependencies or prerequisites

Include an estimated complexity level (Low/Medium/High) at the end.";

pub struct PlanTool {
    prompts_dir: PathBuf,
}

impl PlanTool {
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.into(),
        }
    }

    fn template(&self) -> String {
        std::fs::read_to_string(self.prompts_dir.join("PLAN.md"))
            .unwrap_or_else(|_| DEFAULT_TEMPLATE.to_string())
    }
}

#[async_trait]
impl Tool for PlanTool {
    fn name(&self) -> &str {
        "plan"
    }

    fn description(&self) -> &str {
        "Produce a planning brief for a task before acting on it. \
         Use for multi-step work that benefits from an explicit plan."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "task": {
                    "type": "string",
                    "description": "The task to plan"
                },
                "current_context": {
                    "type": "string",
                    "description": "Relevant context: files involved, constraints, prior decisions"
                },
                "available_tools": {
                    "type": "string",
                    "description": "Tools or capabilities to plan around"
                }
            },
            "required": ["task"]
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::ReadOnly
    }

    async fn execute(&self, arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        let Some(task) = arguments.get("task").and_then(|v| v.as_str()) else {
            return ToolResult::error("Missing 'task' argument");
        };
        let context = arguments
            .get("current_context")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_CONTEXT);
        let capabilities = arguments
            .get("available_tools")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_CAPABILITIES);

        let rendered = self
            .template()
            .replace("{task}", task)
            .replace("{current_context}", context)
            .replace("{available_tools}", capabilities);
        ToolResult::text(rendered)
    }
}
