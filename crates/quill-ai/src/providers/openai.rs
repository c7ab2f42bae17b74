//! OpenAI-compatible Chat Completions backend.
//!
//! Works against any endpoint speaking the Chat Completions wire format,
//! which covers the hosted OpenAI API as well as local inference servers.
//! Reasoning deltas (`reasoning_content`) become `ThoughtChunk` events;
//! tool calls are accumulated across deltas and emitted as whole
//! `ToolCall` events once their argument payload is complete.

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

use crate::{
    client::{ModelClient, StreamEventStream},
    error::{Error, Result},
    types::{Content, Context, Message, StreamEvent, ToolArguments, ToolCall},
};

/// Client for OpenAI-compatible chat completion endpoints
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiCompatClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            max_tokens,
        }
    }

    fn build_request(&self, context: &Context, stream: bool) -> ChatRequest {
        let mut messages = Vec::new();
        for msg in &context.messages {
            messages.extend(convert_message(msg));
        }

        let tools = if context.tools.is_empty() {
            None
        } else {
            Some(
                context
                    .tools
                    .iter()
                    .map(|t| ChatTool {
                        tool_type: "function".to_string(),
                        function: ChatFunction {
                            name: t.name.clone(),
                            description: Some(t.description.clone()),
                            parameters: Some(t.parameters.clone()),
                        },
                    })
                    .collect(),
            )
        };

        let has_tools = tools.is_some();
        ChatRequest {
            model: self.model.clone(),
            messages,
            stream,
            max_tokens: Some(self.max_tokens),
            tools,
            tool_choice: if has_tools {
                Some(serde_json::json!("auto"))
            } else {
                None
            },
        }
    }

    fn request_builder(&self, request: &ChatRequest) -> Result<reqwest::RequestBuilder> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Authorization",
            format!("Bearer {}", self.api_key)
                .parse()
                .map_err(|_| Error::InvalidApiKey)?,
        );
        headers.insert(
            "content-type",
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        Ok(self.client.post(&url).headers(headers).json(request))
    }
}

#[async_trait]
impl ModelClient for OpenAiCompatClient {
    async fn stream_events(&self, context: &Context) -> Result<StreamEventStream> {
        let request = self.build_request(context, true);
        let builder = self.request_builder(&request)?;

        let event_source = EventSource::new(builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        Ok(Box::pin(create_stream(event_source)))
    }

    async fn complete(&self, context: &Context) -> Result<String> {
        let request = self.build_request(context, false);
        let response = self.request_builder(&request)?.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::api(format!("http_{}", status.as_u16()), text));
        }

        let completion: ChatCompletion = response.json().await?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::UnexpectedResponse("no choices in completion".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

fn convert_message(msg: &Message) -> Vec<ChatMessage> {
    match msg {
        Message::System { content } => vec![ChatMessage {
            role: "system".to_string(),
            content: Some(content.clone()),
            tool_calls: None,
            tool_call_id: None,
        }],
        Message::User { content, .. } => {
            let text = content
                .iter()
                .filter_map(|c| c.as_text())
                .collect::<Vec<_>>()
                .join("");

            vec![ChatMessage {
                role: "user".to_string(),
                content: Some(text),
                tool_calls: None,
                tool_call_id: None,
            }]
        }
        Message::Assistant { content, .. } => {
            let mut text_parts = Vec::new();
            let mut tool_calls = Vec::new();

            for c in content {
                match c {
                    Content::Text { text } => text_parts.push(text.clone()),
                    Content::ToolCall {
                        id,
                        name,
                        arguments,
                    } => {
                        tool_calls.push(ChatToolCall {
                            id: id.clone(),
                            call_type: "function".to_string(),
                            function: ChatFunctionCall {
                                name: name.clone(),
                                arguments: serde_json::to_string(arguments).unwrap_or_default(),
                            },
                        });
                    }
                    // Thinking is local-only; the wire format has no slot for it
                    Content::Thinking { .. } => {}
                }
            }

            vec![ChatMessage {
                role: "assistant".to_string(),
                content: if text_parts.is_empty() {
                    None
                } else {
                    Some(text_parts.join(""))
                },
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(tool_calls)
                },
                tool_call_id: None,
            }]
        }
        Message::ToolResult {
            tool_call_id,
            content,
            ..
        } => {
            let text = content
                .iter()
                .filter_map(|c| c.as_text())
                .collect::<Vec<_>>()
                .join("");

            vec![ChatMessage {
                role: "tool".to_string(),
                content: Some(text),
                tool_calls: None,
                tool_call_id: Some(tool_call_id.clone()),
            }]
        }
    }
}

fn create_stream(mut event_source: EventSource) -> impl futures::Stream<Item = Result<StreamEvent>> {
    stream! {
        // (id, name, accumulated argument json)
        let mut tool_calls: Vec<(String, String, String)> = Vec::new();
        let mut emitted_up_to = 0usize;

        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if msg.data == "[DONE]" {
                        break;
                    }

                    let chunk: std::result::Result<StreamChunk, _> =
                        serde_json::from_str(&msg.data);
                    let chunk = match chunk {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            yield Err(Error::Sse(format!("Failed to parse chunk: {}", e)));
                            return;
                        }
                    };

                    for choice in &chunk.choices {
                        if let Some(ref thinking) = choice.delta.reasoning_content {
                            if !thinking.is_empty() {
                                yield Ok(StreamEvent::ThoughtChunk {
                                    delta: thinking.clone(),
                                });
                            }
                        }

                        if let Some(ref content) = choice.delta.content {
                            if !content.is_empty() {
                                yield Ok(StreamEvent::TextChunk {
                                    delta: content.clone(),
                                });
                            }
                        }

                        if let Some(ref tcs) = choice.delta.tool_calls {
                            for tc in tcs {
                                let idx = tc.index as usize;

                                // A delta for a new index means every earlier
                                // call has its full argument payload.
                                while emitted_up_to < tool_calls.len().min(idx) {
                                    let (id, name, args) =
                                        tool_calls[emitted_up_to].clone();
                                    emitted_up_to += 1;
                                    if !id.is_empty() && !name.is_empty() {
                                        yield Ok(StreamEvent::ToolCall(ToolCall {
                                            id,
                                            name,
                                            arguments: ToolArguments::Json(args),
                                        }));
                                    }
                                }

                                while tool_calls.len() <= idx {
                                    tool_calls.push((
                                        String::new(),
                                        String::new(),
                                        String::new(),
                                    ));
                                }

                                if let Some(ref id) = tc.id {
                                    tool_calls[idx].0 = id.clone();
                                }
                                if let Some(ref function) = tc.function {
                                    if let Some(ref name) = function.name {
                                        tool_calls[idx].1 = name.clone();
                                    }
                                    if let Some(ref args) = function.arguments {
                                        tool_calls[idx].2.push_str(args);
                                    }
                                }
                            }
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(e) => {
                    yield Err(Error::Sse(format!("SSE error: {}", e)));
                    return;
                }
            }
        }

        // Flush calls still pending when the stream closed
        while emitted_up_to < tool_calls.len() {
            let (id, name, args) = tool_calls[emitted_up_to].clone();
            emitted_up_to += 1;
            if !id.is_empty() && !name.is_empty() {
                yield Ok(StreamEvent::ToolCall(ToolCall {
                    id,
                    name,
                    arguments: ToolArguments::Json(args),
                }));
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: ChatFunction,
}

#[derive(Debug, Serialize)]
struct ChatFunction {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ChatToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: ChatFunctionCall,
}

#[derive(Debug, Serialize)]
struct ChatFunctionCall {
    name: String,
    arguments: String,
}

// Streaming response types

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    tool_calls: Option<Vec<StreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct StreamToolCall {
    index: i32,
    id: Option<String>,
    function: Option<StreamFunction>,
}

#[derive(Debug, Deserialize)]
struct StreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}

// Non-streaming completion types

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_user_message() {
        let msgs = convert_message(&Message::user("hello"));
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].role, "user");
        assert_eq!(msgs[0].content.as_deref(), Some("hello"));
    }

    #[test]
    fn test_convert_assistant_with_tool_call() {
        let msg = Message::assistant(vec![
            Content::text("on it"),
            Content::tool_call("c1", "file_read", serde_json::json!({"path": "a.txt"})),
        ]);
        let msgs = convert_message(&msg);
        assert_eq!(msgs.len(), 1);
        let calls = msgs[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "file_read");
        assert!(calls[0].function.arguments.contains("a.txt"));
    }

    #[test]
    fn test_convert_tool_result_carries_call_id() {
        let msg = Message::tool_result("c1", "file_read", "contents", false);
        let msgs = convert_message(&msg);
        assert_eq!(msgs[0].role, "tool");
        assert_eq!(msgs[0].tool_call_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_thinking_dropped_on_outbound_conversion() {
        let msg = Message::assistant(vec![
            Content::thinking("hmm"),
            Content::text("answer"),
        ]);
        let msgs = convert_message(&msg);
        assert_eq!(msgs[0].content.as_deref(), Some("answer"));
        assert!(msgs[0].tool_calls.is_none());
    }
}
