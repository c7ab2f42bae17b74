//! The conversation buffer: the single mutable transcript of a session

use quill_ai::{Content, Message};

/// Ordered message transcript for one session.
///
/// Invariant: the buffer always begins with exactly one system message,
/// from construction through reset and summary replacement.
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    messages: Vec<Message>,
}

impl ConversationBuffer {
    /// Create a buffer seeded with the system prompt
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    /// All messages in order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages including the system prompt
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a user message
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Adopt a full transcript snapshot, preserving the system-first
    /// invariant. Snapshots come from a streaming response and never
    /// include the system message themselves unless they started from
    /// this buffer.
    pub fn adopt(&mut self, messages: Vec<Message>) {
        if messages.first().map(|m| m.role()) == Some("system") {
            self.messages = messages;
        } else {
            let system = self.messages[0].clone();
            self.messages = vec![system];
            self.messages.extend(messages);
        }
    }

    /// Drop everything except the system prompt
    pub fn reset(&mut self) {
        self.messages.truncate(1);
    }

    /// Replace the transcript with a summary of itself: the system
    /// prompt followed by one user message carrying the summary.
    pub fn replace_with_summary(&mut self, summary: impl Into<String>) {
        let system = self.messages[0].clone();
        self.messages = vec![
            system,
            Message::user(format!(
                "Summary of the conversation so far:\n\n{}",
                summary.into()
            )),
        ];
    }

    /// Rough token estimate for the whole transcript (chars / 4)
    pub fn estimated_tokens(&self) -> usize {
        self.messages.iter().map(estimate_message_tokens).sum()
    }
}

/// Estimate tokens for a single message using the chars/4 heuristic
fn estimate_message_tokens(message: &Message) -> usize {
    let chars: usize = match message {
        Message::System { content } => content.len(),
        _ => message
            .content()
            .iter()
            .map(|c| match c {
                Content::Text { text } => text.len(),
                Content::Thinking { thinking } => thinking.len(),
                Content::ToolCall { arguments, .. } => arguments.to_string().len() + 40,
            })
            .sum(),
    };
    chars.div_ceil(4)
}
