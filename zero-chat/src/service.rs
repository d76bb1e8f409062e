//! Per-message handling: record, decide, complete.

use crate::error::ChatResult;
use crate::message::{InboundMessage, OutgoingReply};
use crate::orchestrator::{CompletionOrchestrator, CompletionOutcome};
use crate::provider::CompletionProvider;
use crate::session::{Message, SessionKey, SessionStore};
use crate::trigger::{Command, ReplyTrigger};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use zero_common::config::Config;
use zero_common::util::truncate_with_ellipsis;

const RESET_CONFIRMATION: &str = "🆕 会话已重置，开始新对话。";
const LOGGED_TEXT_CHARS: usize = 80;

/// Handles inbound messages against the shared session store.
pub struct ChatService {
    sessions: SessionStore,
    trigger: ReplyTrigger,
    orchestrator: CompletionOrchestrator,
    rng: Mutex<StdRng>,
}

impl ChatService {
    pub fn new(config: &Config, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            sessions: SessionStore::from_config(&config.session),
            trigger: ReplyTrigger::new(config.trigger.clone(), config.random_reply.clone()),
            orchestrator: CompletionOrchestrator::new(provider, &config.completion),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Replace the random source, for reproducible random-reply draws.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle one inbound message.
    ///
    /// The message is recorded into its conversation whether or not a reply
    /// is triggered. Returns the reply to send, if any. An `Err` means the
    /// completion failed in a way that is not answered; the conversation has
    /// already been cleared.
    pub async fn handle(&self, message: InboundMessage) -> ChatResult<Option<OutgoingReply>> {
        if message.text.trim().is_empty() {
            return Ok(None);
        }

        let key = SessionKey::for_message(&message);
        let command = self.trigger.parse_command(&message);

        if matches!(command, Some(Command::Reset)) {
            let mut transcript = self.sessions.checkout(&key).await;
            transcript.clear();
            tracing::info!(session = %key, "Conversation reset");
            return Ok(Some(self.reply(&message, RESET_CONFIRMATION)));
        }

        let content = match command {
            Some(Command::Chat(body)) => body,
            _ => message.text.trim(),
        };
        if content.is_empty() {
            tracing::debug!(session = %key, "Ignoring command without a body");
            return Ok(None);
        }

        let mut transcript = self.sessions.checkout(&key).await;
        transcript.append(Message::user(content));

        let reason = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            self.trigger.evaluate(&message, &mut *rng)
        };

        let Some(reason) = reason else {
            tracing::trace!(
                session = %key,
                transcript_len = transcript.len(),
                "Recorded message without reply"
            );
            return Ok(None);
        };

        tracing::info!(
            session = %key,
            channel = %message.channel_id,
            sender = %message.sender_id,
            reason = reason.as_str(),
            text = %truncate_with_ellipsis(content, LOGGED_TEXT_CHARS),
            "Reply triggered"
        );

        let outcome = self.orchestrator.complete(&mut transcript).await?;
        drop(transcript);

        Ok(match outcome {
            CompletionOutcome::Empty => None,
            outcome => outcome
                .reply_text()
                .map(|text| self.reply(&message, text)),
        })
    }

    fn reply(&self, inbound: &InboundMessage, text: &str) -> OutgoingReply {
        OutgoingReply::to(inbound, text, self.trigger.quote_reply())
    }
}
