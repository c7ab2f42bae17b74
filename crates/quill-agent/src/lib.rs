//! quill-agent: the turn engine and its collaborators
//!
//! One turn of conversation is a small state machine: stream model
//! events, classify each one, suspend for clarification, execute tool
//! batches, resume, repeat until the model stops asking for tools. This
//! crate owns that machine plus the conversation buffer it mutates and
//! the registry the tool batch runs through.

pub mod buffer;
pub mod engine;
pub mod error;
pub mod events;
pub mod registry;
pub mod tool;

pub use buffer::ConversationBuffer;
pub use engine::{
    CLARIFY_TOOL, ClarificationAnswer, ClarificationPrompter, TurnEngine, TurnOutcome,
};
pub use error::{Error, Result};
pub use events::{NullObserver, TurnEvent, TurnObserver};
pub use registry::ToolRegistry;
pub use tool::{BoxedTool, SideEffect, Tool, ToolResult, to_tool_spec};
