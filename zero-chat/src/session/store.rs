//! In-memory session storage keyed by conversation.
//!
//! Transcripts are created on first use and live for the lifetime of the
//! process. Each transcript sits behind its own async mutex so one inbound
//! message is fully handled before the next one for the same key starts.

use super::transcript::Transcript;
use crate::message::{ConversationScope, InboundMessage};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use zero_common::config::SessionConfig;

/// Shared handle to one conversation's transcript.
pub type SharedTranscript = Arc<Mutex<Transcript>>;

/// Identifies a conversation: `group:<id>` or `user:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn group(group_id: &str) -> Self {
        Self(format!("group:{group_id}"))
    }

    pub fn direct(user_id: &str) -> Self {
        Self(format!("user:{user_id}"))
    }

    /// Key for the conversation an inbound message belongs to.
    pub fn for_message(message: &InboundMessage) -> Self {
        match message.scope {
            ConversationScope::Group => Self::group(&message.channel_id),
            ConversationScope::Direct => Self::direct(&message.sender_id),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Process-lifetime map from session key to transcript.
pub struct SessionStore {
    sessions: DashMap<SessionKey, SharedTranscript>,
    system_prompt: String,
    max_messages: usize,
}

impl SessionStore {
    /// Create an empty store whose transcripts are seeded with `system_prompt`.
    pub fn new(system_prompt: impl Into<String>, max_messages: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            system_prompt: system_prompt.into(),
            max_messages,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.system_prompt.clone(), config.max_messages)
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Return the transcript for `key`, creating a seeded one if absent.
    pub fn resolve(&self, key: &SessionKey) -> SharedTranscript {
        let entry = self.sessions.entry(key.clone()).or_insert_with(|| {
            tracing::debug!(session = %key, "Creating session transcript");
            Arc::new(Mutex::new(Transcript::new(
                self.system_prompt.as_str(),
                self.max_messages,
            )))
        });
        Arc::clone(entry.value())
    }

    /// Lock the transcript for `key` for one handling cycle.
    ///
    /// A transcript cleared by an earlier failure gets its system prompt back
    /// here, so callers always see a seeded transcript.
    pub async fn checkout(&self, key: &SessionKey) -> OwnedMutexGuard<Transcript> {
        let mut guard = self.resolve(key).lock_owned().await;
        if guard.reseed(&self.system_prompt) {
            tracing::debug!(session = %key, "Reseeded cleared transcript");
        }
        guard
    }

    pub fn contains(&self, key: &SessionKey) -> bool {
        self.sessions.contains_key(key)
    }

    /// Number of known conversations.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
