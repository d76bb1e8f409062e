//! Conversation session state.
//!
//! - `types`: role-tagged messages
//! - `transcript`: append-with-merge, capacity trimming, normalization
//! - `store`: per-conversation transcripts keyed by `group:<id>` / `user:<id>`

pub mod store;
pub mod transcript;
pub mod types;

pub use store::{SessionKey, SessionStore, SharedTranscript};
pub use transcript::{normalize, push_merged, Transcript};
pub use types::{Message, Role};
