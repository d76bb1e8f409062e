//! Message types exchanged with the host messaging platform.

use serde::{Deserialize, Serialize};

/// Whether a message was posted in a group or a direct conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationScope {
    Group,
    Direct,
}

impl ConversationScope {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Direct => "direct",
        }
    }
}

/// Inbound message event from the host platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Group or direct conversation
    pub scope: ConversationScope,
    /// Group/channel identifier (for direct conversations, the chat id)
    #[serde(default)]
    pub channel_id: String,
    /// Sender identifier
    pub sender_id: String,
    /// Raw message text
    #[serde(default)]
    pub text: String,
    /// Platform-level "mentions me" signal
    #[serde(default)]
    pub mentions_bot: bool,
    /// Message identifier, used for quoting
    #[serde(default)]
    pub message_id: String,
}

impl InboundMessage {
    /// Direct message from `sender_id`.
    pub fn direct(sender_id: &str, text: &str) -> Self {
        Self {
            scope: ConversationScope::Direct,
            channel_id: sender_id.to_string(),
            sender_id: sender_id.to_string(),
            text: text.to_string(),
            mentions_bot: false,
            message_id: String::new(),
        }
    }

    /// Group message in `channel_id` from `sender_id`.
    pub fn group(channel_id: &str, sender_id: &str, text: &str) -> Self {
        Self {
            scope: ConversationScope::Group,
            channel_id: channel_id.to_string(),
            sender_id: sender_id.to_string(),
            text: text.to_string(),
            mentions_bot: false,
            message_id: String::new(),
        }
    }

    pub fn with_mention(mut self) -> Self {
        self.mentions_bot = true;
        self
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = id.into();
        self
    }

    pub const fn is_direct(&self) -> bool {
        matches!(self.scope, ConversationScope::Direct)
    }
}

/// Reply to send back to the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingReply {
    pub scope: ConversationScope,
    pub channel_id: String,
    /// Message to quote, if quoting is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub text: String,
}

impl OutgoingReply {
    /// Reply addressed to the conversation `inbound` came from.
    pub fn to(inbound: &InboundMessage, text: impl Into<String>, quote: bool) -> Self {
        let reply_to = (quote && !inbound.message_id.is_empty()).then(|| inbound.message_id.clone());
        Self {
            scope: inbound.scope,
            channel_id: inbound.channel_id.clone(),
            reply_to,
            text: text.into(),
        }
    }

    /// Plain-text rendering with the quote reference prefixed.
    pub fn render(&self) -> String {
        match &self.reply_to {
            Some(id) => format!("> [reply to {id}]\n{}", self.text),
            None => self.text.clone(),
        }
    }
}
