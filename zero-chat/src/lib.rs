//! Zero Chat - Conversational reply engine for group and direct chats.
//!
//! Keeps a bounded, role-merged transcript per conversation, decides when the
//! bot should speak (mention, command or random draw), and asks an
//! OpenAI-compatible completion endpoint for the reply.
//!
//! ## Architecture
//!
//! ```text
//! InboundMessage → Dispatcher (per-key queue) → ChatService
//!                                                   ↓
//!                     SessionStore → Transcript → ReplyTrigger
//!                                                   ↓
//! OutgoingReply ←──────────── CompletionOrchestrator → CompletionProvider
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod cli;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod orchestrator;
pub mod provider;
pub mod service;
pub mod session;
pub mod trigger;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use dispatcher::Dispatcher;
pub use error::{ChatError, ChatResult};
pub use message::{ConversationScope, InboundMessage, OutgoingReply};
pub use orchestrator::{CompletionOrchestrator, CompletionOutcome, CompletionState};
pub use provider::{
    ChatCompletion, ChatRequest, CompatibleProvider, CompletionProvider, ProviderError,
    ProviderOptions,
};
pub use service::ChatService;
pub use session::{Message, Role, SessionKey, SessionStore, Transcript};
pub use trigger::{Command, ReplyTrigger, TriggerReason};
