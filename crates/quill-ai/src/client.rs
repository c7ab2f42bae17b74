//! The model client trait and the streaming response object.
//!
//! A `StreamingResponse` is the live, single-pass representation of one
//! generation. Consuming `next_event()` is the only way to observe the
//! event sequence; as events are consumed the response accumulates the
//! assistant message, so `messages()` yields a consistent buffer snapshot
//! even after a partially consumed (interrupted) stream.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_stream::Stream;

use crate::error::Result;
use crate::types::{Content, Context, Message, StreamEvent, ToolCall, ToolOutput, ToolSpec};

/// A stream of model events
pub type StreamEventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Capability consumed by the turn engine: given a message buffer and a
/// tool catalogue, produce a cancellable event stream, or a one-shot
/// completion for summarization.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Open a raw event stream for the given context
    async fn stream_events(&self, context: &Context) -> Result<StreamEventStream>;

    /// Degenerate one-shot, tool-less call returning plain text
    async fn complete(&self, context: &Context) -> Result<String>;
}

/// One logical model generation, resumable with tool outputs.
pub struct StreamingResponse {
    client: Arc<dyn ModelClient>,
    tools: Vec<ToolSpec>,
    /// Messages sent to the model for this pass
    messages: Vec<Message>,
    events: StreamEventStream,
    /// Accumulated assistant content, in arrival order
    text: String,
    thinking: String,
    calls: Vec<ToolCall>,
}

impl StreamingResponse {
    /// Start a new generation for the given buffer and tool catalogue
    pub async fn open(
        client: Arc<dyn ModelClient>,
        messages: Vec<Message>,
        tools: Vec<ToolSpec>,
    ) -> Result<Self> {
        let context = Context::new(messages.clone(), tools.clone());
        let events = client.stream_events(&context).await?;
        Ok(Self {
            client,
            tools,
            messages,
            events,
            text: String::new(),
            thinking: String::new(),
            calls: Vec::new(),
        })
    }

    /// Consume the next event, recording it into the accumulated
    /// assistant message. Returns `None` when the stream is exhausted.
    pub async fn next_event(&mut self) -> Option<Result<StreamEvent>> {
        let event = self.events.next().await?;
        if let Ok(ref ev) = event {
            match ev {
                StreamEvent::TextChunk { delta } => self.text.push_str(delta),
                StreamEvent::ThoughtChunk { delta } => self.thinking.push_str(delta),
                StreamEvent::ToolCall(call) => self.calls.push(call.clone()),
            }
        }
        Some(event)
    }

    /// Tool calls seen so far in this pass
    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.calls
    }

    /// The assistant message accumulated so far (partial during streaming)
    pub fn assistant_message(&self) -> Message {
        let mut content = Vec::new();
        if !self.thinking.is_empty() {
            content.push(Content::thinking(self.thinking.clone()));
        }
        if !self.text.is_empty() {
            content.push(Content::text(self.text.clone()));
        }
        for call in &self.calls {
            let arguments = call
                .arguments_object()
                .unwrap_or(serde_json::Value::Null);
            content.push(Content::tool_call(&call.id, &call.name, arguments));
        }
        Message::assistant(content)
    }

    /// Whether anything worth keeping has been accumulated
    pub fn has_content(&self) -> bool {
        !self.text.trim().is_empty() || !self.thinking.trim().is_empty() || !self.calls.is_empty()
    }

    /// Authoritative buffer snapshot: the messages this pass was opened
    /// with, plus the accumulated assistant message if non-empty.
    pub fn messages(&self) -> Vec<Message> {
        let mut out = self.messages.clone();
        if self.has_content() {
            out.push(self.assistant_message());
        }
        out
    }

    /// Continue the same logical turn by supplying tool outputs for
    /// previously emitted tool calls.
    pub async fn resume(self, outputs: Vec<ToolOutput>) -> Result<StreamingResponse> {
        let mut messages = self.messages.clone();
        messages.push(self.assistant_message());
        for output in outputs {
            messages.push(Message::tool_result(
                &output.id,
                &output.name,
                &output.result,
                false,
            ));
        }
        StreamingResponse::open(self.client, messages, self.tools).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolArguments;
    use std::sync::Mutex;

    /// A scripted client: each call to stream_events pops the next event
    /// batch off the script.
    struct ScriptedClient {
        script: Mutex<Vec<Vec<StreamEvent>>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Vec<StreamEvent>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
            })
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedClient {
        async fn stream_events(&self, _context: &Context) -> Result<StreamEventStream> {
            let batch = {
                let mut script = self.script.lock().unwrap();
                if script.is_empty() {
                    vec![]
                } else {
                    script.remove(0)
                }
            };
            Ok(Box::pin(tokio_stream::iter(
                batch.into_iter().map(Ok).collect::<Vec<_>>(),
            )))
        }

        async fn complete(&self, _context: &Context) -> Result<String> {
            Ok("summary".to_string())
        }
    }

    fn text_event(s: &str) -> StreamEvent {
        StreamEvent::TextChunk { delta: s.into() }
    }

    #[tokio::test]
    async fn test_accumulates_text_in_order() {
        let client = ScriptedClient::new(vec![vec![text_event("hel"), text_event("lo")]]);
        let mut resp = StreamingResponse::open(client, vec![Message::user("hi")], vec![])
            .await
            .unwrap();
        while let Some(ev) = resp.next_event().await {
            ev.unwrap();
        }
        assert_eq!(resp.assistant_message().text(), "hello");
        let msgs = resp.messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1].role(), "assistant");
    }

    #[tokio::test]
    async fn test_partial_snapshot_after_interruption() {
        let client = ScriptedClient::new(vec![vec![
            text_event("partial"),
            text_event(" rest never consumed"),
        ]]);
        let mut resp = StreamingResponse::open(client, vec![Message::user("go")], vec![])
            .await
            .unwrap();
        // Consume only the first event, then abandon the stream.
        resp.next_event().await.unwrap().unwrap();
        let msgs = resp.messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1].text(), "partial");
    }

    #[tokio::test]
    async fn test_empty_stream_yields_no_assistant_message() {
        let client = ScriptedClient::new(vec![vec![]]);
        let mut resp = StreamingResponse::open(client, vec![Message::user("go")], vec![])
            .await
            .unwrap();
        assert!(resp.next_event().await.is_none());
        assert!(!resp.has_content());
        assert_eq!(resp.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_resume_appends_assistant_and_tool_results() {
        let call = ToolCall {
            id: "c1".into(),
            name: "execute_bash".into(),
            arguments: ToolArguments::Object(serde_json::json!({"command": "ls"})),
        };
        let client = ScriptedClient::new(vec![
            vec![StreamEvent::ToolCall(call)],
            vec![text_event("done")],
        ]);
        let mut resp = StreamingResponse::open(client, vec![Message::user("list")], vec![])
            .await
            .unwrap();
        while let Some(ev) = resp.next_event().await {
            ev.unwrap();
        }
        assert_eq!(resp.tool_calls().len(), 1);

        let mut resumed = resp
            .resume(vec![ToolOutput {
                id: "c1".into(),
                name: "execute_bash".into(),
                result: "a.txt".into(),
            }])
            .await
            .unwrap();
        while let Some(ev) = resumed.next_event().await {
            ev.unwrap();
        }

        let msgs = resumed.messages();
        // user, assistant(tool call), tool_result, assistant(done)
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[1].tool_calls().len(), 1);
        assert_eq!(msgs[2].role(), "tool_result");
        assert_eq!(msgs[3].text(), "done");
    }
}
