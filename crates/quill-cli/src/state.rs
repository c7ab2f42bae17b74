//! Persistent session state: the restart document and the compact snapshot.
//!
//! Two JSON files at the project root survive process restarts:
//! `.cli_state.json` holds a flat key/value map the model writes through
//! the restart-state tools (`last_instruction` is consumed once at
//! startup), and `.cli_compact_state.json` holds the last compacted
//! summary. A missing or unreadable file is treated as empty state and
//! never aborts the session.

use serde_json::{Map, Value, json};
use std::fs;
use std::path::PathBuf;

const STATE_FILE: &str = ".cli_state.json";
const COMPACT_STATE_FILE: &str = ".cli_compact_state.json";

/// Keys carried into the compact snapshot with a `_` prefix
const PRESERVED_KEYS: [&str; 3] = ["current_file", "pending_tasks", "project_context"];

#[derive(Debug, Clone)]
pub struct StateStore {
    state_path: PathBuf,
    compact_path: PathBuf,
}

impl StateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            state_path: root.join(STATE_FILE),
            compact_path: root.join(COMPACT_STATE_FILE),
        }
    }

    /// Load the live state map, treating any failure as empty state
    pub fn load(&self) -> Map<String, Value> {
        match fs::read_to_string(&self.state_path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    tracing::warn!("state file is not a JSON object, starting empty");
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        }
    }

    fn save(&self, state: &Map<String, Value>) -> Result<(), String> {
        let content = serde_json::to_string_pretty(&Value::Object(state.clone()))
            .map_err(|e| e.to_string())?;
        fs::write(&self.state_path, content).map_err(|e| e.to_string())
    }

    /// Remove and return `last_instruction`, persisting the removal so a
    /// crash cannot replay it.
    pub fn take_last_instruction(&self) -> Option<String> {
        let mut state = self.load();
        let instruction = state.remove("last_instruction")?;
        if let Err(e) = self.save(&state) {
            tracing::warn!("failed to persist consumed instruction: {}", e);
        }
        instruction.as_str().map(String::from)
    }

    /// Store an instruction to run automatically on next startup
    pub fn store_instruction(&self, instruction: &str) -> Result<(), String> {
        let mut state = self.load();
        state.insert(
            "last_instruction".to_string(),
            Value::String(instruction.to_string()),
        );
        self.save(&state)
    }

    // --- Tool-facing operations; both outcomes are result text ---

    /// `set_restart_state`
    pub fn set_value(&self, key: &str, value: Value) -> String {
        let mut state = self.load();
        let display = match &value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        state.insert(key.to_string(), value);
        match self.save(&state) {
            Ok(()) => format!("State saved: {} = {}", key, display),
            Err(e) => format!("Error saving state: {}", e),
        }
    }

    /// `get_restart_state`
    pub fn get_value(&self, key: Option<&str>) -> String {
        let state = self.load();
        if state.is_empty() {
            return "No stored state found.".to_string();
        }
        match key {
            None => {
                let keys: Vec<&str> = state.keys().map(String::as_str).collect();
                format!("Available keys: {}", keys.join(", "))
            }
            Some(key) => match state.get(key) {
                Some(value) => format!("{} = {}", key, value),
                None => {
                    let keys: Vec<&str> = state.keys().map(String::as_str).collect();
                    format!("Key '{}' not found. Available: {}", key, keys.join(", "))
                }
            },
        }
    }

    /// `clear_restart_state`
    pub fn clear(&self) -> String {
        if self.state_path.exists() {
            match fs::remove_file(&self.state_path) {
                Ok(()) => "All stored state cleared.".to_string(),
                Err(e) => format!("Error clearing state: {}", e),
            }
        } else {
            "No state to clear.".to_string()
        }
    }

    /// `compact_state`: fold the live state into a compact snapshot.
    ///
    /// `last_instruction` becomes the recent-activity summary; the
    /// whitelisted keys move into the snapshot under a `_` prefix. The
    /// live state keeps a `last_compacted` breadcrumb and, when anything
    /// was preserved, a `compacted_info` summary.
    pub fn compact(&self) -> String {
        let mut state = self.load();

        let mut snapshot = Map::new();
        let now = chrono::Local::now().to_rfc3339();
        snapshot.insert("compacted_at".to_string(), json!(now));
        snapshot.insert(
            "summary".to_string(),
            json!("Context compacted. Key information preserved below."),
        );

        let mut preserved: Vec<String> = Vec::new();
        let mut recent_summary = "No recent activity summary available.".to_string();

        if let Some(instruction) = state.remove("last_instruction") {
            recent_summary = format!(
                "Last instruction: {}",
                instruction.as_str().unwrap_or_default()
            );
            preserved.push("last_instruction".to_string());
        }
        snapshot.insert("recent_summary".to_string(), json!(recent_summary));

        for key in PRESERVED_KEYS {
            if let Some(value) = state.remove(key) {
                snapshot.insert(format!("_{}", key), value);
                preserved.push(key.to_string());
            }
        }
        snapshot.insert("preserved_keys".to_string(), json!(preserved));

        let write_snapshot = serde_json::to_string_pretty(&Value::Object(snapshot))
            .map_err(|e| e.to_string())
            .and_then(|content| {
                fs::write(&self.compact_path, content).map_err(|e| e.to_string())
            });
        if let Err(e) = write_snapshot {
            return format!("Error compacting state: {}", e);
        }

        state.insert("last_compacted".to_string(), json!(now));
        if !preserved.is_empty() {
            state.insert("compacted_info".to_string(), json!(recent_summary));
        }
        if let Err(e) = self.save(&state) {
            return format!("Error compacting state: {}", e);
        }

        let preserved_display = if preserved.is_empty() {
            "none".to_string()
        } else {
            preserved.join(", ")
        };
        format!(
            "State compacted successfully.\nSummary: {}\nPreserved keys: {}",
            recent_summary, preserved_display
        )
    }

    /// `get_compact_state`
    pub fn get_compact(&self) -> String {
        let content = match fs::read_to_string(&self.compact_path) {
            Ok(c) => c,
            Err(_) => return "No compacted state found.".to_string(),
        };
        let data: Map<String, Value> = match serde_json::from_str(&content) {
            Ok(Value::Object(map)) => map,
            _ => return "Error reading compacted state: not a JSON object".to_string(),
        };

        let field = |key: &str, fallback: &str| -> String {
            data.get(key)
                .and_then(|v| v.as_str())
                .unwrap_or(fallback)
                .to_string()
        };

        let mut lines = vec![
            format!("Compacted at: {}", field("compacted_at", "Unknown")),
            format!("Summary: {}", field("summary", "N/A")),
        ];
        if data.contains_key("recent_summary") {
            lines.push(format!("Recent work: {}", field("recent_summary", "")));
        }
        if let Some(Value::Array(keys)) = data.get("preserved_keys") {
            if !keys.is_empty() {
                let names: Vec<&str> = keys.iter().filter_map(|k| k.as_str()).collect();
                lines.push(format!("Preserved information: {}", names.join(", ")));
            }
        }
        for (key, value) in &data {
            if let Some(stripped) = key.strip_prefix('_') {
                let display = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                lines.push(format!("{}: {}", stripped, display));
            }
        }
        lines.join("\n")
    }

    /// `clear_compact_state`
    pub fn clear_compact(&self) -> String {
        if self.compact_path.exists() {
            match fs::remove_file(&self.compact_path) {
                Ok(()) => "Compacted state cleared.".to_string(),
                Err(e) => format!("Error clearing compacted state: {}", e),
            }
        } else {
            "No compacted state to clear.".to_string()
        }
    }
}
