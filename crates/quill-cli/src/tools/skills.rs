//! Skill catalogue tools

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use quill_agent::{SideEffect, Tool, ToolResult};

use crate::skills::SkillCatalogue;

pub struct ListSkillsTool {
    catalogue: Arc<SkillCatalogue>,
}

impl ListSkillsTool {
    pub fn new(catalogue: Arc<SkillCatalogue>) -> Self {
        Self { catalogue }
    }
}

#[async_trait]
impl Tool for ListSkillsTool {
    fn name(&self) -> &str {
        "list_skills"
    }

    fn description(&self) -> &str {
        "List all available skills with their descriptions."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({"type": "object", "properties": {}})
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::ReadOnly
    }

    async fn execute(&self, _arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        ToolResult::text(self.catalogue.list_all())
    }
}

pub struct GetSkillInfoTool {
    catalogue: Arc<SkillCatalogue>,
}

impl GetSkillInfoTool {
    pub fn new(catalogue: Arc<SkillCatalogue>) -> Self {
        Self { catalogue }
    }
}

#[async_trait]
impl Tool for GetSkillInfoTool {
    fn name(&self) -> &str {
        "get_skill_info"
    }

    fn description(&self) -> &str {
        "Get the full document for a specific skill, including its instructions."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "skill_name": {
                    "type": "string",
                    "description": "Name of the skill to look up"
                }
            },
            "required": ["skill_name"]
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::ReadOnly
    }

    async fn execute(&self, arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        let Some(name) = arguments.get("skill_name").and_then(|v| v.as_str()) else {
            return ToolResult::error("Missing 'skill_name' argument");
        };
        ToolResult::text(self.catalogue.info(name))
    }
}

pub struct SkillSearchTool {
    catalogue: Arc<SkillCatalogue>,
}

impl SkillSearchTool {
    pub fn new(catalogue: Arc<SkillCatalogue>) -> Self {
        Self { catalogue }
    }
}

#[async_trait]
impl Tool for SkillSearchTool {
    fn name(&self) -> &str {
        "skill_search"
    }

    fn description(&self) -> &str {
        "Search for skills by keyword in their names and descriptions."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "keyword": {
                    "type": "string",
                    "description": "Keyword to search for"
                }
            },
            "required": ["keyword"]
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::ReadOnly
    }

    async fn execute(&self, arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        let Some(keyword) = arguments.get("keyword").and_then(|v| v.as_str()) else {
            return ToolResult::error("Missing 'keyword' argument");
        };
        ToolResult::text(self.catalogue.search(keyword))
    }
}
