//! Turn lifecycle events forwarded to the session front end

use serde::{Deserialize, Serialize};

/// Events emitted by the turn engine in arrival order.
///
/// Delivery is synchronous: the observer sees each event before the
/// engine consumes the next one, so the rendered transcript matches the
/// stream order exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Incremental ordinary text from the model
    TextChunk { delta: String },
    /// Incremental thinking text from the model
    ThoughtChunk { delta: String },
    /// A tool is about to run
    ToolStart {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },
    /// A tool finished (result text may describe an error)
    ToolEnd { id: String, name: String, result: String },
    /// The model asked the operator a question
    ClarificationRequested { question: String },
    /// The turn was interrupted by the operator
    Interrupted,
}

/// Receiver for turn events
pub trait TurnObserver: Send + Sync {
    fn on_event(&self, event: TurnEvent);
}

/// Observer that discards everything, for headless turns
pub struct NullObserver;

impl TurnObserver for NullObserver {
    fn on_event(&self, _event: TurnEvent) {}
}
