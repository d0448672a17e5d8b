//! # Reply-generation contract.
//!
//! The reply generator produces the member's answer to a citizen message. It
//! is the slowest collaborator in the system (an LLM call in the original),
//! which is why the arbiter's locking discipline exists: generation always
//! happens after the member's critical section has been released.

use async_trait::async_trait;
use thiserror::Error;

use crate::transcript::ChatMessage;

/// Failure of the reply generator.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ReplyError {
    /// The collaborator did not answer in time.
    #[error("reply generation timed out")]
    Timeout,
    /// Any other collaborator failure.
    #[error("reply generation failed: {0}")]
    Failed(String),
}

/// Contract for the reply-generation collaborator.
#[async_trait]
pub trait GenerateReply: Send + Sync + 'static {
    /// Generates the member's reply to `message`.
    ///
    /// `persona` is the member's persona text; `history` is a capped,
    /// oldest-first excerpt of the member's transcript.
    async fn generate(
        &self,
        persona: &str,
        citizen_name: &str,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<String, ReplyError>;
}
