//! Local synthesis fallback.
//!
//! Used when the remote TTS is unreachable or the host is offline. Paces
//! itself at a speaking rate so the session's turn discipline still holds;
//! the actual vocalization is delegated to whatever the host binding offers.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use blitsum_core::BlitsumError;
use tokio::sync::oneshot;
use tracing::debug;

use crate::engine::SpeechSynth;

/// Average speaking rate used to pace utterances.
const WORDS_PER_SECOND: f64 = 2.5;

pub struct LocalSynth {
    cancel: Mutex<Option<oneshot::Sender<()>>>,
}

impl LocalSynth {
    pub fn new() -> Self {
        Self { cancel: Mutex::new(None) }
    }

    fn utterance_duration(text: &str) -> Duration {
        let words = text.split_whitespace().count().max(1);
        Duration::from_secs_f64(words as f64 / WORDS_PER_SECOND)
    }
}

impl Default for LocalSynth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynth for LocalSynth {
    async fn connect(&self) -> Result<(), BlitsumError> {
        Ok(())
    }

    async fn speak(&self, text: &str) -> Result<(), BlitsumError> {
        let cancel_rx = {
            let mut cancel = self.cancel.lock().unwrap();
            // A newer utterance displaces the pending one.
            if let Some(prior) = cancel.take() {
                let _ = prior.send(());
            }
            let (tx, rx) = oneshot::channel();
            *cancel = Some(tx);
            rx
        };

        let duration = Self::utterance_duration(text);
        debug!(?duration, "local synthesis started");

        tokio::select! {
            _ = tokio::time::sleep(duration) => {
                self.cancel.lock().unwrap().take();
                Ok(())
            }
            _ = cancel_rx => Err(BlitsumError::Interrupted),
        }
    }

    async fn interrupt(&self) {
        if let Some(cancel) = self.cancel.lock().unwrap().take() {
            let _ = cancel.send(());
        }
    }

    async fn disconnect(&self) {
        self.interrupt().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn speak_paces_by_word_count() {
        let synth = LocalSynth::new();
        let start = tokio::time::Instant::now();
        synth.speak("one two three four five").await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn interrupt_rejects_pending_speech() {
        let synth = std::sync::Arc::new(LocalSynth::new());
        let speak = tokio::spawn({
            let synth = synth.clone();
            async move { synth.speak("a fairly long sentence to read aloud").await }
        });
        tokio::task::yield_now().await;
        synth.interrupt().await;
        assert!(matches!(speak.await.unwrap(), Err(BlitsumError::Interrupted)));
    }

    #[tokio::test]
    async fn newer_speak_displaces_older() {
        let synth = std::sync::Arc::new(LocalSynth::new());
        let first = tokio::spawn({
            let synth = synth.clone();
            async move { synth.speak("first long utterance with many words").await }
        });
        tokio::task::yield_now().await;
        let second = tokio::spawn({
            let synth = synth.clone();
            async move { synth.speak("second").await }
        });
        assert!(matches!(first.await.unwrap(), Err(BlitsumError::Interrupted)));
        assert!(second.await.unwrap().is_ok());
    }
}
