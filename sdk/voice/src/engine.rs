//! Speech synthesis seam shared by the remote streaming vendor and the
//! local fallback.

use async_trait::async_trait;
use blitsum_core::BlitsumError;

/// A speech backend the voice session can drive.
///
/// `speak` resolves only when the utterance has fully played out; an
/// interrupted utterance rejects with `BlitsumError::Interrupted` and never
/// resolves twice.
#[async_trait]
pub trait SpeechSynth: Send + Sync {
    async fn connect(&self) -> Result<(), BlitsumError>;

    async fn speak(&self, text: &str) -> Result<(), BlitsumError>;

    /// Safe in any state, idempotent. Cancels the pending utterance, if any,
    /// by rejection.
    async fn interrupt(&self);

    async fn disconnect(&self);
}
