//! Persistent state and restart tools

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

use quill_agent::{SideEffect, Tool, ToolResult};

use crate::state::StateStore;

pub struct SetRestartStateTool {
    store: StateStore,
}

impl SetRestartStateTool {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SetRestartStateTool {
    fn name(&self) -> &str {
        "set_restart_state"
    }

    fn description(&self) -> &str {
        "Store a key-value pair in state that persists across CLI restarts."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "key": {
                    "type": "string",
                    "description": "The key to store"
                },
                "value": {
                    "description": "The value (string, number, boolean, or null)"
                }
            },
            "required": ["key", "value"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        let Some(key) = arguments.get("key").and_then(|v| v.as_str()) else {
            return ToolResult::error("Missing 'key' argument");
        };
        let value = arguments.get("value").cloned().unwrap_or(serde_json::Value::Null);
        ToolResult::text(self.store.set_value(key, value))
    }
}

pub struct GetRestartStateTool {
    store: StateStore,
}

impl GetRestartStateTool {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetRestartStateTool {
    fn name(&self) -> &str {
        "get_restart_state"
    }

    fn description(&self) -> &str {
        "Retrieve stored state: a specific key, or the list of all keys when omitted."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "key": {
                    "type": "string",
                    "description": "Specific key to retrieve; omit to list all keys"
                }
            }
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::ReadOnly
    }

    async fn execute(&self, arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        let key = arguments.get("key").and_then(|v| v.as_str());
        ToolResult::text(self.store.get_value(key))
    }
}

pub struct ClearRestartStateTool {
    store: StateStore,
}

impl ClearRestartStateTool {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ClearRestartStateTool {
    fn name(&self) -> &str {
        "clear_restart_state"
    }

    fn description(&self) -> &str {
        "Clear all stored restart state."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        ToolResult::text(self.store.clear())
    }
}

/// Tool that requests a CLI restart.
///
/// The process is not replaced in place; the tool records the optional
/// startup instruction, raises the shared restart flag, and lets the
/// session loop finish the turn and exit with the restart code so a
/// supervisor (or the operator) relaunches cleanly.
pub struct RestartCliTool {
    store: StateStore,
    flag: Arc<AtomicBool>,
}

impl RestartCliTool {
    pub fn new(store: StateStore, flag: Arc<AtomicBool>) -> Self {
        Self { store, flag }
    }
}

#[async_trait]
impl Tool for RestartCliTool {
    fn name(&self) -> &str {
        "restart_cli"
    }

    fn description(&self) -> &str {
        "Restart the CLI application after this turn completes. Optionally saves an \
         instruction to be automatically executed on startup; the instruction must \
         describe actual work, not just 'restart' or 'continue'."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "state_instruction": {
                    "type": "string",
                    "description": "Optional instruction to execute after restart"
                }
            }
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Interactive
    }

    async fn execute(&self, arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        if let Some(instruction) = arguments
            .get("state_instruction")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
        {
            if let Err(e) = self.store.store_instruction(instruction) {
                return ToolResult::error(format!("Error restarting CLI: {}", e));
            }
        }
        self.flag.store(true, Ordering::Release);
        ToolResult::text("Restart scheduled. The CLI will relaunch after this turn.")
    }
}

pub struct CompactStateTool {
    store: StateStore,
}

impl CompactStateTool {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CompactStateTool {
    fn name(&self) -> &str {
        "compact_state"
    }

    fn description(&self) -> &str {
        "Compact the current CLI state by summarizing recent activity. Use when approaching \
         the context limit; preserves essential information and clears the rest."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        ToolResult::text(self.store.compact())
    }
}

pub struct GetCompactStateTool {
    store: StateStore,
}

impl GetCompactStateTool {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetCompactStateTool {
    fn name(&self) -> &str {
        "get_compact_state"
    }

    fn description(&self) -> &str {
        "Retrieve the compacted state summary from previous sessions."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({"type": "object", "properties": {}})
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::ReadOnly
    }

    async fn execute(&self, _arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        ToolResult::text(self.store.get_compact())
    }
}

pub struct ClearCompactStateTool {
    store: StateStore,
}

impl ClearCompactStateTool {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ClearCompactStateTool {
    fn name(&self) -> &str {
        "clear_compact_state"
    }

    fn description(&self) -> &str {
        "Clear the compacted state file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _arguments: serde_json::Value, _cancel: CancellationToken) -> ToolResult {
        ToolResult::text(self.store.clear_compact())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_store() -> (StateStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("quill-statetool-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        (StateStore::new(&dir), dir)
    }

    #[tokio::test]
    async fn test_restart_raises_flag_and_stores_instruction() {
        let (store, dir) = temp_store();
        let flag = Arc::new(AtomicBool::new(false));
        let tool = RestartCliTool::new(store.clone(), flag.clone());

        let result = tool
            .execute(
                json!({"state_instruction": "resume the migration"}),
                CancellationToken::new(),
            )
            .await;
        assert!(!result.is_error);
        assert!(flag.load(Ordering::Acquire));
        assert_eq!(
            store.take_last_instruction().as_deref(),
            Some("resume the migration")
        );
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_restart_without_instruction_stores_nothing() {
        let (store, dir) = temp_store();
        let flag = Arc::new(AtomicBool::new(false));
        let tool = RestartCliTool::new(store.clone(), flag.clone());

        tool.execute(json!({}), CancellationToken::new()).await;
        assert!(flag.load(Ordering::Acquire));
        assert!(store.take_last_instruction().is_none());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_set_get_clear_roundtrip() {
        let (store, dir) = temp_store();
        let set = SetRestartStateTool::new(store.clone());
        let get = GetRestartStateTool::new(store.clone());
        let clear = ClearRestartStateTool::new(store);

        set.execute(
            json!({"key": "pending_tasks", "value": "write docs"}),
            CancellationToken::new(),
        )
        .await;
        let result = get
            .execute(json!({"key": "pending_tasks"}), CancellationToken::new())
            .await;
        assert!(result.text.contains("write docs"));

        let result = clear.execute(json!({}), CancellationToken::new()).await;
        assert_eq!(result.text, "All stored state cleared.");
        std::fs::remove_dir_all(dir).unwrap();
    }
}
