//! The turn engine: one user input driven to completion.
//!
//! A turn interleaves three things: consuming the model's event stream,
//! suspending for operator clarification, and executing tool batches
//! before resuming the stream. The engine owns none of the transcript;
//! it mutates the caller's `ConversationBuffer` so the buffer stays
//! authoritative whether the turn completes or is interrupted.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use quill_ai::{
    Message, ModelClient, StreamEvent, StreamingResponse, ToolCall, ToolOutput,
};

use crate::{
    buffer::ConversationBuffer,
    error::Result,
    events::{TurnEvent, TurnObserver},
    registry::ToolRegistry,
};

/// Reserved tool name intercepted by the engine. A call to it suspends
/// the turn for operator input instead of running a handler.
pub const CLARIFY_TOOL: &str = "clarify";

/// Note recorded in the transcript when a turn ends without any
/// accumulated assistant content.
const INTERRUPTED_NOTE: &str = "[Response interrupted by user]";

/// Marker fed back to the model when the operator aborts a
/// clarification prompt instead of answering it.
const CLARIFICATION_CANCELLED: &str = "Clarification cancelled by user.";

/// Operator's reply to a clarification question. Cancelling the prompt
/// does not end the turn; the model is told and carries on without the
/// answer.
#[derive(Debug, Clone)]
pub enum ClarificationAnswer {
    Answer(String),
    Cancelled,
}

/// Source of clarification answers. `ask` blocks the turn; that pause
/// is the one legal suspension point in the state machine.
pub trait ClarificationPrompter: Send + Sync {
    fn ask(&self, question: &str) -> ClarificationAnswer;
}

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model finished without pending tool calls
    Completed,
    /// The operator cancelled mid-turn; the buffer holds the partial
    /// transcript
    Interrupted,
}

/// Drives turns against a model client and a tool registry
pub struct TurnEngine {
    client: Arc<dyn ModelClient>,
    registry: ToolRegistry,
}

impl TurnEngine {
    pub fn new(client: Arc<dyn ModelClient>, registry: ToolRegistry) -> Self {
        Self { client, registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn client(&self) -> Arc<dyn ModelClient> {
        self.client.clone()
    }

    /// Run one full turn for the given user input.
    ///
    /// On interruption the buffer is left holding everything streamed so
    /// far; if nothing was accumulated a synthetic assistant note marks
    /// the gap so the model sees a coherent transcript next turn.
    pub async fn run_turn(
        &self,
        buffer: &mut ConversationBuffer,
        input: &str,
        prompter: &dyn ClarificationPrompter,
        observer: &dyn TurnObserver,
        cancel: CancellationToken,
    ) -> Result<TurnOutcome> {
        buffer.push_user(input);

        let mut response = StreamingResponse::open(
            self.client.clone(),
            buffer.messages().to_vec(),
            self.registry.specs(),
        )
        .await?;

        loop {
            let mut clarifications: Vec<ToolOutput> = Vec::new();
            let mut interrupted = false;

            loop {
                let event = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        interrupted = true;
                        break;
                    }
                    ev = response.next_event() => ev,
                };
                let Some(event) = event else { break };
                let event = match event {
                    Ok(ev) => ev,
                    Err(e) => {
                        buffer.adopt(response.messages());
                        return Err(e.into());
                    }
                };

                match event {
                    StreamEvent::TextChunk { delta } => {
                        observer.on_event(TurnEvent::TextChunk { delta });
                    }
                    StreamEvent::ThoughtChunk { delta } => {
                        observer.on_event(TurnEvent::ThoughtChunk { delta });
                    }
                    StreamEvent::ToolCall(call) if call.name == CLARIFY_TOOL => {
                        let question = clarify_question(&call);
                        observer.on_event(TurnEvent::ClarificationRequested {
                            question: question.clone(),
                        });
                        match prompter.ask(&question) {
                            ClarificationAnswer::Answer(answer) => {
                                clarifications.push(ToolOutput {
                                    id: call.id.clone(),
                                    name: call.name.clone(),
                                    result: answer,
                                });
                            }
                            ClarificationAnswer::Cancelled => {
                                clarifications.push(ToolOutput {
                                    id: call.id.clone(),
                                    name: call.name.clone(),
                                    result: CLARIFICATION_CANCELLED.to_string(),
                                });
                            }
                        }
                    }
                    // Ordinary calls are already recorded by the
                    // response; they run as a batch after the stream ends.
                    StreamEvent::ToolCall(_) => {}
                }
            }

            if interrupted {
                observer.on_event(TurnEvent::Interrupted);
                self.adopt_interrupted(buffer, &response, vec![]);
                return Ok(TurnOutcome::Interrupted);
            }

            if !clarifications.is_empty() {
                // Short circuit: resume with only the clarification
                // answers. Other calls queued in this pass are dropped;
                // the model reissues them once it has the answers.
                tracing::debug!(
                    answered = clarifications.len(),
                    dropped = response.tool_calls().len() - clarifications.len(),
                    "resuming with clarification answers"
                );
                response = response.resume(clarifications).await?;
                continue;
            }

            let calls: Vec<ToolCall> = response.tool_calls().to_vec();
            if calls.is_empty() {
                buffer.adopt(response.messages());
                return Ok(TurnOutcome::Completed);
            }

            let mut outputs = Vec::with_capacity(calls.len());
            for call in &calls {
                if cancel.is_cancelled() {
                    outputs.push(ToolOutput {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        result: "Skipped: interrupted by user".to_string(),
                    });
                    continue;
                }
                observer.on_event(TurnEvent::ToolStart {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: call.arguments_object().unwrap_or(serde_json::Value::Null),
                });
                let output = self.registry.execute(call, cancel.clone()).await;
                observer.on_event(TurnEvent::ToolEnd {
                    id: output.id.clone(),
                    name: output.name.clone(),
                    result: output.result.clone(),
                });
                outputs.push(output);
            }

            if cancel.is_cancelled() {
                observer.on_event(TurnEvent::Interrupted);
                self.adopt_interrupted(buffer, &response, outputs);
                return Ok(TurnOutcome::Interrupted);
            }

            response = response.resume(outputs).await?;
        }
    }

    /// Record an interrupted turn: partial transcript, any tool results
    /// already produced, and a synthetic note when nothing else marks
    /// the assistant's side of the exchange.
    fn adopt_interrupted(
        &self,
        buffer: &mut ConversationBuffer,
        response: &StreamingResponse,
        outputs: Vec<ToolOutput>,
    ) {
        let mut messages = response.messages();
        for output in outputs {
            messages.push(Message::tool_result(
                &output.id,
                &output.name,
                &output.result,
                false,
            ));
        }
        if messages.last().map(|m| m.role()) == Some("user") {
            messages.push(Message::assistant_text(INTERRUPTED_NOTE));
        }
        buffer.adopt(messages);
    }
}

/// Extract the question text from a clarify call, tolerating malformed
/// arguments.
fn clarify_question(call: &ToolCall) -> String {
    call.arguments_object()
        .ok()
        .and_then(|args| {
            args.get("question")
                .and_then(|q| q.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| "The model needs more information to continue.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{Tool, ToolResult};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use quill_ai::{Context, StreamEventStream, ToolArguments};
    use std::sync::atomic::{AtomicU32, Ordering};

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
        async fn stream_events(&self, _context: &Context) -> quill_ai::Result<StreamEventStream> {
            let batch = {
                let mut script = self.script.lock();
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

        async fn complete(&self, _context: &Context) -> quill_ai::Result<String> {
            Ok("summary".to_string())
        }
    }

    /// Yields its events then never ends, so a pending `next_event` can
    /// lose the race against cancellation.
    struct HangingClient {
        events: Mutex<Vec<StreamEvent>>,
    }

    #[async_trait]
    impl ModelClient for HangingClient {
        async fn stream_events(&self, _context: &Context) -> quill_ai::Result<StreamEventStream> {
            let events: Vec<_> = self.events.lock().drain(..).map(Ok).collect();
            Ok(Box::pin(
                futures::StreamExt::chain(tokio_stream::iter(events), futures::stream::pending()),
            ))
        }

        async fn complete(&self, _context: &Context) -> quill_ai::Result<String> {
            Ok(String::new())
        }
    }

    struct CountTool {
        tool_name: String,
        calls: Arc<AtomicU32>,
    }

    impl CountTool {
        fn new(name: &str) -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            (
                Self {
                    tool_name: name.to_string(),
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl Tool for CountTool {
        fn name(&self) -> &str {
            &self.tool_name
        }
        fn description(&self) -> &str {
            "Counts invocations"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(
            &self,
            _arguments: serde_json::Value,
            _cancel: CancellationToken,
        ) -> ToolResult {
            self.calls.fetch_add(1, Ordering::Relaxed);
            ToolResult::text("ok")
        }
    }

    struct ScriptedPrompter {
        answers: Mutex<Vec<ClarificationAnswer>>,
    }

    impl ScriptedPrompter {
        fn answering(answer: &str) -> Self {
            Self {
                answers: Mutex::new(vec![ClarificationAnswer::Answer(answer.to_string())]),
            }
        }

        fn cancelling() -> Self {
            Self {
                answers: Mutex::new(vec![ClarificationAnswer::Cancelled]),
            }
        }
    }

    impl ClarificationPrompter for ScriptedPrompter {
        fn ask(&self, _question: &str) -> ClarificationAnswer {
            let mut answers = self.answers.lock();
            if answers.is_empty() {
                ClarificationAnswer::Cancelled
            } else {
                answers.remove(0)
            }
        }
    }

    #[derive(Default)]
    struct CollectingObserver {
        events: Mutex<Vec<TurnEvent>>,
    }

    impl TurnObserver for CollectingObserver {
        fn on_event(&self, event: TurnEvent) {
            self.events.lock().push(event);
        }
    }

    fn text(s: &str) -> StreamEvent {
        StreamEvent::TextChunk {
            delta: s.to_string(),
        }
    }

    fn tool_call(id: &str, name: &str, args: serde_json::Value) -> StreamEvent {
        StreamEvent::ToolCall(ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: ToolArguments::Object(args),
        })
    }

    fn engine_with(client: Arc<dyn ModelClient>, tools: Vec<crate::tool::BoxedTool>) -> TurnEngine {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.add_tool(tool);
        }
        TurnEngine::new(client, registry)
    }

    #[tokio::test]
    async fn test_plain_text_turn_completes() {
        let client = ScriptedClient::new(vec![vec![text("hello "), text("world")]]);
        let engine = engine_with(client, vec![]);
        let mut buffer = ConversationBuffer::new("sys");
        let observer = CollectingObserver::default();

        let outcome = engine
            .run_turn(
                &mut buffer,
                "hi",
                &ScriptedPrompter::answering(""),
                &observer,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::Completed);
        let msgs = buffer.messages();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[2].role(), "assistant");
        assert_eq!(msgs[2].text(), "hello world");

        let deltas: Vec<String> = observer
            .events
            .lock()
            .iter()
            .filter_map(|e| match e {
                TurnEvent::TextChunk { delta } => Some(delta.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(deltas, vec!["hello ", "world"]);
    }

    #[tokio::test]
    async fn test_tool_batch_executes_and_resumes() {
        let client = ScriptedClient::new(vec![
            vec![tool_call("c1", "lookup", serde_json::json!({}))],
            vec![text("done")],
        ]);
        let (tool, calls) = CountTool::new("lookup");
        let engine = engine_with(client, vec![Arc::new(tool)]);
        let mut buffer = ConversationBuffer::new("sys");
        let observer = CollectingObserver::default();

        let outcome = engine
            .run_turn(
                &mut buffer,
                "go",
                &ScriptedPrompter::answering(""),
                &observer,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(calls.load(Ordering::Relaxed), 1);

        // system, user, assistant(call), tool_result, assistant(done)
        let msgs = buffer.messages();
        assert_eq!(msgs.len(), 5);
        assert_eq!(msgs[3].role(), "tool_result");
        assert_eq!(msgs[4].text(), "done");

        let events = observer.events.lock();
        let start = events
            .iter()
            .position(|e| matches!(e, TurnEvent::ToolStart { .. }));
        let end = events
            .iter()
            .position(|e| matches!(e, TurnEvent::ToolEnd { .. }));
        assert!(start.unwrap() < end.unwrap());
    }

    #[tokio::test]
    async fn test_clarification_short_circuits_other_calls() {
        let client = ScriptedClient::new(vec![
            vec![
                tool_call(
                    "c1",
                    CLARIFY_TOOL,
                    serde_json::json!({"question": "which one?"}),
                ),
                tool_call("c2", "lookup", serde_json::json!({})),
            ],
            vec![text("thanks")],
        ]);
        let (tool, calls) = CountTool::new("lookup");
        let engine = engine_with(client, vec![Arc::new(tool)]);
        let mut buffer = ConversationBuffer::new("sys");
        let observer = CollectingObserver::default();

        let outcome = engine
            .run_turn(
                &mut buffer,
                "do it",
                &ScriptedPrompter::answering("the blue one"),
                &observer,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::Completed);
        // The queued lookup call was dropped, not executed
        assert_eq!(calls.load(Ordering::Relaxed), 0);

        let results: Vec<&Message> = buffer
            .messages()
            .iter()
            .filter(|m| m.role() == "tool_result")
            .collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text(), "the blue one");

        assert!(observer.events.lock().iter().any(|e| matches!(
            e,
            TurnEvent::ClarificationRequested { question } if question == "which one?"
        )));
    }

    #[tokio::test]
    async fn test_precancelled_turn_records_synthetic_note() {
        let client = ScriptedClient::new(vec![vec![text("never seen")]]);
        let engine = engine_with(client, vec![]);
        let mut buffer = ConversationBuffer::new("sys");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = engine
            .run_turn(
                &mut buffer,
                "hi",
                &ScriptedPrompter::answering(""),
                &CollectingObserver::default(),
                cancel,
            )
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::Interrupted);
        let msgs = buffer.messages();
        assert_eq!(msgs.last().unwrap().text(), INTERRUPTED_NOTE);
        assert_eq!(msgs.last().unwrap().role(), "assistant");
    }

    #[tokio::test]
    async fn test_interruption_preserves_streamed_prefix() {
        let client = Arc::new(HangingClient {
            events: Mutex::new(vec![text("partial answer")]),
        });
        let engine = engine_with(client, vec![]);
        let mut buffer = ConversationBuffer::new("sys");
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let outcome = engine
            .run_turn(
                &mut buffer,
                "hi",
                &ScriptedPrompter::answering(""),
                &CollectingObserver::default(),
                cancel,
            )
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::Interrupted);
        let msgs = buffer.messages();
        assert_eq!(msgs.last().unwrap().role(), "assistant");
        assert_eq!(msgs.last().unwrap().text(), "partial answer");
    }

    #[tokio::test]
    async fn test_unknown_tool_resumes_with_error_text() {
        let client = ScriptedClient::new(vec![
            vec![tool_call("c1", "missing", serde_json::json!({}))],
            vec![text("sorry about that")],
        ]);
        let engine = engine_with(client, vec![]);
        let mut buffer = ConversationBuffer::new("sys");

        let outcome = engine
            .run_turn(
                &mut buffer,
                "go",
                &ScriptedPrompter::answering(""),
                &CollectingObserver::default(),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::Completed);
        let result = buffer
            .messages()
            .iter()
            .find(|m| m.role() == "tool_result")
            .unwrap();
        assert!(result.text().contains("unknown tool"));
        assert_eq!(buffer.messages().last().unwrap().text(), "sorry about that");
    }

    #[tokio::test]
    async fn test_cancelled_clarification_resumes_with_marker() {
        let client = ScriptedClient::new(vec![
            vec![tool_call(
                "c1",
                CLARIFY_TOOL,
                serde_json::json!({"question": "sure?"}),
            )],
            vec![text("proceeding without it")],
        ]);
        let engine = engine_with(client, vec![]);
        let mut buffer = ConversationBuffer::new("sys");

        let outcome = engine
            .run_turn(
                &mut buffer,
                "go",
                &ScriptedPrompter::cancelling(),
                &CollectingObserver::default(),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        // Aborting the prompt is an answer, not an interruption: the
        // model sees the marker and the turn runs to completion.
        assert_eq!(outcome, TurnOutcome::Completed);
        let result = buffer
            .messages()
            .iter()
            .find(|m| m.role() == "tool_result")
            .unwrap();
        assert_eq!(result.text(), CLARIFICATION_CANCELLED);
        assert_eq!(
            buffer.messages().last().unwrap().text(),
            "proceeding without it"
        );
    }

    #[tokio::test]
    async fn test_cancelled_clarification_still_drops_queued_calls() {
        let client = ScriptedClient::new(vec![
            vec![
                tool_call(
                    "c1",
                    CLARIFY_TOOL,
                    serde_json::json!({"question": "which one?"}),
                ),
                tool_call("c2", "lookup", serde_json::json!({})),
            ],
            vec![text("ok")],
        ]);
        let (tool, calls) = CountTool::new("lookup");
        let engine = engine_with(client, vec![Arc::new(tool)]);
        let mut buffer = ConversationBuffer::new("sys");

        let outcome = engine
            .run_turn(
                &mut buffer,
                "go",
                &ScriptedPrompter::cancelling(),
                &CollectingObserver::default(),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }
}
