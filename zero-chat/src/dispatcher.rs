//! Per-conversation message queues.
//!
//! Each session key gets one queue and one worker task, created on the first
//! message for that key. Messages for the same conversation are handled in
//! arrival order; different conversations proceed in parallel.

use crate::error::{ChatError, ChatResult};
use crate::message::{InboundMessage, OutgoingReply};
use crate::service::ChatService;
use crate::session::SessionKey;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Routes inbound messages to per-key workers and forwards their replies.
pub struct Dispatcher {
    service: Arc<ChatService>,
    queues: DashMap<SessionKey, mpsc::UnboundedSender<InboundMessage>>,
    replies: mpsc::Sender<OutgoingReply>,
}

impl Dispatcher {
    pub fn new(service: Arc<ChatService>, replies: mpsc::Sender<OutgoingReply>) -> Self {
        Self {
            service,
            queues: DashMap::new(),
            replies,
        }
    }

    /// Queue `message` on its conversation's worker.
    pub fn dispatch(&self, message: InboundMessage) -> ChatResult<()> {
        let key = SessionKey::for_message(&message);
        let sender = self
            .queues
            .entry(key.clone())
            .or_insert_with(|| self.spawn_worker(key.clone()))
            .clone();

        sender.send(message).map_err(|_| ChatError::QueueClosed {
            session: key.to_string(),
        })
    }

    /// Dispatch everything from `inbound` until the channel closes.
    pub async fn run(&self, mut inbound: mpsc::Receiver<InboundMessage>) {
        while let Some(message) = inbound.recv().await {
            if let Err(e) = self.dispatch(message) {
                tracing::error!(error = %e, "Failed to dispatch message");
            }
        }
        tracing::info!(workers = self.queues.len(), "Inbound channel closed");
    }

    /// Number of conversations with a running worker.
    pub fn worker_count(&self) -> usize {
        self.queues.len()
    }

    fn spawn_worker(&self, key: SessionKey) -> mpsc::UnboundedSender<InboundMessage> {
        let (tx, mut rx) = mpsc::unbounded_channel::<InboundMessage>();
        let service = Arc::clone(&self.service);
        let replies = self.replies.clone();

        tracing::debug!(session = %key, "Starting conversation worker");
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match service.handle(message).await {
                    Ok(Some(reply)) => {
                        if replies.send(reply).await.is_err() {
                            tracing::warn!(session = %key, "Reply channel closed, stopping worker");
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(session = %key, error = %e, "Message handling failed");
                    }
                }
            }
        });

        tx
    }
}
