//! quill-ai: model capability layer
//!
//! Defines the message/content types shared across the workspace, the
//! closed `StreamEvent` union emitted during generation, and the
//! `StreamingResponse` object that a turn engine drives: consume events,
//! inspect pending tool calls, resume with tool outputs.

pub mod client;
pub mod error;
pub mod providers;
pub mod types;

pub use client::{ModelClient, StreamEventStream, StreamingResponse};
pub use providers::OpenAiCompatClient;
pub use error::{Error, Result};
pub use types::{
    Content, Context, Message, StreamEvent, ToolArguments, ToolCall, ToolOutput, ToolSpec,
};
