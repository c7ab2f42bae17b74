//! Tool registry: lookup, argument validation, uniform execution

use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use quill_ai::{ToolCall, ToolOutput, ToolSpec};

use crate::tool::{BoxedTool, ToolResult, to_tool_spec};

/// The catalogue of tools available to the model.
///
/// Execution goes through `execute()` and always produces a
/// `ToolOutput`: unknown tools, malformed arguments, schema violations,
/// and handler errors all become self-describing result text. The model
/// sees failures the same way it sees successes, and the turn engine
/// always resumes.
pub struct ToolRegistry {
    tools: Vec<BoxedTool>,
    /// Cached compiled JSON schema validators keyed by tool name
    schema_cache: HashMap<String, Arc<jsonschema::Validator>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            schema_cache: HashMap::new(),
        }
    }

    /// Add a tool, compiling and caching its schema validator
    pub fn add_tool(&mut self, tool: BoxedTool) {
        let schema = tool.parameters_schema();
        match jsonschema::validator_for(&schema) {
            Ok(validator) => {
                self.schema_cache
                    .insert(tool.name().to_string(), Arc::new(validator));
            }
            Err(e) => {
                tracing::warn!(
                    "Invalid tool parameter schema for '{}', skipping validation: {}",
                    tool.name(),
                    e
                );
            }
        }
        tracing::debug!(
            tool = %tool.name(),
            side_effect = ?tool.side_effect(),
            "registered tool"
        );
        self.tools.push(tool);
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<&BoxedTool> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Export the catalogue for the model API
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| to_tool_spec(t.as_ref())).collect()
    }

    /// Execute one tool call end to end
    pub async fn execute(&self, call: &ToolCall, cancel: CancellationToken) -> ToolOutput {
        let result = self.execute_inner(call, cancel).await;
        if result.is_error {
            tracing::warn!(tool = %call.name, "tool returned error: {}", result.text);
        } else {
            tracing::debug!(tool = %call.name, "tool completed");
        }
        ToolOutput {
            id: call.id.clone(),
            name: call.name.clone(),
            result: result.text,
        }
    }

    async fn execute_inner(&self, call: &ToolCall, cancel: CancellationToken) -> ToolResult {
        let args = match call.arguments_object() {
            Ok(args) => args,
            Err(e) => return ToolResult::error(format!("Error: {}", e)),
        };

        let Some(tool) = self.get(&call.name) else {
            return ToolResult::error(format!("Error: unknown tool '{}'", call.name));
        };

        if let Some(validator) = self.schema_cache.get(call.name.as_str()) {
            if let Some(err) = validate_with_validator(&args, validator) {
                return ToolResult::error(err);
            }
        }

        tool.execute(args, cancel).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate tool arguments using a pre-compiled validator.
/// Returns `Some(error_message)` if validation fails, `None` if valid.
fn validate_with_validator(
    args: &serde_json::Value,
    validator: &jsonschema::Validator,
) -> Option<String> {
    let errors: Vec<String> = validator
        .iter_errors(args)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{}: {}", path, e)
            }
        })
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(format!(
            "Tool argument validation failed:\n{}",
            errors.join("\n")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::Tool;
    use async_trait::async_trait;
    use quill_ai::ToolArguments;

    struct CountTool {
        calls: Arc<std::sync::atomic::AtomicU32>,
    }

    #[async_trait]
    impl Tool for CountTool {
        fn name(&self) -> &str {
            "count"
        }
        fn description(&self) -> &str {
            "Counts invocations"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string" }
                },
                "required": ["path"]
            })
        }
        async fn execute(
            &self,
            _arguments: serde_json::Value,
            _cancel: CancellationToken,
        ) -> ToolResult {
            self.calls
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            ToolResult::text("counted")
        }
    }

    fn registry_with_count() -> (ToolRegistry, Arc<std::sync::atomic::AtomicU32>) {
        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let mut registry = ToolRegistry::new();
        registry.add_tool(Arc::new(CountTool {
            calls: calls.clone(),
        }));
        (registry, calls)
    }

    fn call(name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "c1".into(),
            name: name.into(),
            arguments: ToolArguments::Object(args),
        }
    }

    #[tokio::test]
    async fn test_execute_valid_call() {
        let (registry, calls) = registry_with_count();
        let out = registry
            .execute(
                &call("count", serde_json::json!({"path": "a"})),
                CancellationToken::new(),
            )
            .await;
        assert_eq!(out.result, "counted");
        assert_eq!(calls.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_text() {
        let (registry, _) = registry_with_count();
        let out = registry
            .execute(
                &call("missing", serde_json::json!({})),
                CancellationToken::new(),
            )
            .await;
        assert!(out.result.contains("unknown tool 'missing'"));
        assert_eq!(out.id, "c1");
    }

    #[tokio::test]
    async fn test_schema_violation_skips_handler() {
        let (registry, calls) = registry_with_count();
        let out = registry
            .execute(&call("count", serde_json::json!({})), CancellationToken::new())
            .await;
        assert!(out.result.contains("validation failed"));
        assert_eq!(calls.load(std::sync::atomic::Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_arguments_is_error_text() {
        let (registry, calls) = registry_with_count();
        let bad = ToolCall {
            id: "c2".into(),
            name: "count".into(),
            arguments: ToolArguments::Json("{broken".into()),
        };
        let out = registry.execute(&bad, CancellationToken::new()).await;
        assert!(out.result.starts_with("Error:"));
        assert_eq!(calls.load(std::sync::atomic::Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_json_string_arguments_are_normalized() {
        let (registry, calls) = registry_with_count();
        let encoded = ToolCall {
            id: "c3".into(),
            name: "count".into(),
            arguments: ToolArguments::Json(r#"{"path": "a"}"#.into()),
        };
        let out = registry.execute(&encoded, CancellationToken::new()).await;
        assert_eq!(out.result, "counted");
        assert_eq!(calls.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[test]
    fn test_specs_exports_catalogue() {
        let (registry, _) = registry_with_count();
        let specs = registry.specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "count");
    }
}
