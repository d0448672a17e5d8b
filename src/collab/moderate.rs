//! # Moderation contract.
//!
//! The moderation collaborator classifies already-sanitized text. It is an
//! external, possibly slow, possibly failing service (typically an LLM
//! classifier), so the handler treats it **fail-open**: a collaborator error
//! lets the message through rather than blocking the product on a flaky
//! classifier. An explicit unsafe verdict, on the other hand, rejects the
//! message and — during an active turn — force-ends it.

use async_trait::async_trait;

/// Verdict returned by the moderation collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Safe,
    Unsafe {
        /// Classifier category (e.g. `harassment`, `spam`).
        category: String,
    },
}

impl Verdict {
    #[inline]
    pub fn is_safe(&self) -> bool {
        matches!(self, Verdict::Safe)
    }
}

/// Contract for the moderation collaborator.
///
/// Called from the handler, never while a per-member lock is held.
#[async_trait]
pub trait Moderate: Send + Sync + 'static {
    /// Classifies one sanitized message.
    ///
    /// An `Err` means the collaborator itself failed (timeout, transport);
    /// the handler logs it and continues as if the verdict were safe.
    async fn moderate(&self, text: &str) -> anyhow::Result<Verdict>;
}
