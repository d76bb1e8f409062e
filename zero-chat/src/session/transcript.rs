//! Bounded, role-merging conversation transcript.
//!
//! A transcript always opens with the system prompt at index 0. Consecutive
//! messages from the same non-system speaker collapse into one turn, and the
//! oldest turns after the system prompt are evicted once the transcript grows
//! past its capacity.

use super::types::{Message, Role};

/// Push `message` onto `messages`, merging it into the last entry when both
/// share a non-system role. Returns `true` when a merge happened.
///
/// This is the single merge rule used both when appending and when
/// normalizing a transcript for transmission.
pub fn push_merged(messages: &mut Vec<Message>, message: Message) -> bool {
    if let Some(last) = messages.last_mut() {
        if last.role == message.role && message.role != Role::System {
            last.content.push('\n');
            last.content.push_str(&message.content);
            return true;
        }
    }
    messages.push(message);
    false
}

/// Repair a message sequence before it is sent to the completion API.
///
/// Adjacent same-role entries are merged, and an assistant turn directly
/// after the system prompt is dropped.
pub fn normalize(messages: &[Message]) -> Vec<Message> {
    let mut out = Vec::with_capacity(messages.len());
    for message in messages {
        push_merged(&mut out, message.clone());
    }

    while out.len() > 1 && out[0].role == Role::System && out[1].role == Role::Assistant {
        out.remove(1);
    }

    out
}

/// Ordered message history for one conversation.
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
    max_messages: usize,
}

impl Transcript {
    /// Create a transcript seeded with the system prompt.
    pub fn new(system_prompt: impl Into<String>, max_messages: usize) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
            max_messages: max_messages.max(1),
        }
    }

    /// Messages in conversation order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append a message, merging with the previous turn when the speaker
    /// repeats, then evict the oldest turns beyond capacity.
    pub fn append(&mut self, message: Message) {
        push_merged(&mut self.messages, message);
        self.trim();
    }

    /// Drop the oldest messages after index 0 until the length fits.
    fn trim(&mut self) {
        if self.messages.len() > self.max_messages {
            let excess = self.messages.len() - self.max_messages;
            self.messages.drain(1..1 + excess);
        }
    }

    /// Working copy repaired for transmission; the transcript is unchanged.
    pub fn normalized(&self) -> Vec<Message> {
        normalize(&self.messages)
    }

    /// Forget everything, system prompt included.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Put the system prompt back after a clear. Returns `true` if reseeded.
    pub fn reseed(&mut self, system_prompt: &str) -> bool {
        if self.messages.is_empty() {
            self.messages.push(Message::system(system_prompt));
            true
        } else {
            false
        }
    }
}
