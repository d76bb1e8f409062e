//! Errors propagated out of message handling.

use crate::provider::ProviderError;
use thiserror::Error;

/// Result type for chat handling.
pub type ChatResult<T> = std::result::Result<T, ChatError>;

/// Failure that is raised to the host adapter instead of being answered.
///
/// The transcript involved has already been cleared when one of these is
/// returned; the host is expected to log it and send nothing.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("completion failed: {0}")]
    Completion(#[from] ProviderError),

    #[error("dispatcher queue for {session} is closed")]
    QueueClosed { session: String },
}
