//! Core types for model interactions

use serde::{Deserialize, Serialize};

/// Content blocks inside messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    /// Text content
    Text { text: String },
    /// Thinking/reasoning content
    Thinking { thinking: String },
    /// Tool call request (arguments normalized to an object)
    ToolCall {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },
}

impl Content {
    /// Create text content
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create thinking content
    pub fn thinking(thinking: impl Into<String>) -> Self {
        Self::Thinking {
            thinking: thinking.into(),
        }
    }

    /// Create a tool call
    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self::ToolCall {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Get text if this is text content
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A message in the conversation buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// System prompt (exactly one, always first in the buffer)
    System { content: String },
    /// User message
    User {
        content: Vec<Content>,
        #[serde(default)]
        timestamp: i64,
    },
    /// Assistant response
    Assistant {
        content: Vec<Content>,
        #[serde(default)]
        timestamp: i64,
    },
    /// Tool result
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        content: Vec<Content>,
        #[serde(default)]
        is_error: bool,
        #[serde(default)]
        timestamp: i64,
    },
}

impl Message {
    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        Self::System {
            content: text.into(),
        }
    }

    /// Create a user message with text content
    pub fn user(text: impl Into<String>) -> Self {
        Self::User {
            content: vec![Content::text(text)],
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create an assistant message with the given content blocks
    pub fn assistant(content: Vec<Content>) -> Self {
        Self::Assistant {
            content,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create an assistant message containing a single text block
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::assistant(vec![Content::text(text)])
    }

    /// Create a tool result message
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        result: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self::ToolResult {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            content: vec![Content::text(result)],
            is_error,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Get the role as a string
    pub fn role(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
            Self::ToolResult { .. } => "tool_result",
        }
    }

    /// Get the content blocks (empty for system messages)
    pub fn content(&self) -> &[Content] {
        match self {
            Self::System { .. } => &[],
            Self::User { content, .. } => content,
            Self::Assistant { content, .. } => content,
            Self::ToolResult { content, .. } => content,
        }
    }

    /// Extract all tool calls from an assistant message
    pub fn tool_calls(&self) -> Vec<(&str, &str, &serde_json::Value)> {
        match self {
            Self::Assistant { content, .. } => content
                .iter()
                .filter_map(|c| match c {
                    Content::ToolCall {
                        id,
                        name,
                        arguments,
                    } => Some((id.as_str(), name.as_str(), arguments)),
                    _ => None,
                })
                .collect(),
            _ => vec![],
        }
    }

    /// Get combined text content
    pub fn text(&self) -> String {
        match self {
            Self::System { content } => content.clone(),
            _ => self
                .content()
                .iter()
                .filter_map(|c| c.as_text())
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// Tool call arguments as they arrive off the wire: either already a
/// decoded object or a JSON-encoded string. Normalize before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolArguments {
    Object(serde_json::Value),
    Json(String),
}

impl ToolArguments {
    /// Normalize to a JSON object value
    pub fn normalize(&self) -> crate::error::Result<serde_json::Value> {
        match self {
            Self::Object(v) => Ok(v.clone()),
            Self::Json(s) => {
                if s.trim().is_empty() {
                    return Ok(serde_json::json!({}));
                }
                serde_json::from_str(s).map_err(crate::error::Error::Json)
            }
        }
    }
}

/// A tool call emitted by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier correlating the call with its eventual result
    pub id: String,
    /// Tool name (must exist in the registry)
    pub name: String,
    /// Arguments payload, possibly still JSON-encoded
    pub arguments: ToolArguments,
}

impl ToolCall {
    /// Normalized arguments object, or an error describing the malformed payload
    pub fn arguments_object(&self) -> crate::error::Result<serde_json::Value> {
        self.arguments
            .normalize()
            .map_err(|e| crate::error::Error::MalformedArguments {
                name: self.name.clone(),
                detail: e.to_string(),
            })
    }
}

/// The result of one tool invocation, fed back to the model on resume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Matches the originating ToolCall id
    pub id: String,
    /// Tool name
    pub name: String,
    /// Result text (success description or self-describing error)
    pub result: String,
}

/// Events emitted during one streamed generation.
///
/// A closed union: new kinds are added here, never as ad hoc tag strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental ordinary text
    TextChunk { delta: String },
    /// Incremental thinking/reasoning text
    ThoughtChunk { delta: String },
    /// A complete tool call request
    ToolCall(ToolCall),
}

/// Tool definition exported to the model API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name (used in API calls)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema for parameters
    pub parameters: serde_json::Value,
}

impl ToolSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Context for one model request: the full message buffer plus the tool catalogue
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSpec>,
}

impl Context {
    pub fn new(messages: Vec<Message>, tools: Vec<ToolSpec>) -> Self {
        Self { messages, tools }
    }
}
