//! Turn-taking over the recognition event stream.
//!
//! Partial results reset the end-of-turn timer; a final segment arms an
//! 800 ms silence window, and when it lapses the accumulated transcript is
//! handed off as one user turn. Any result arriving while the assistant is
//! speaking is a barge-in.

use std::time::Duration;

use blitsum_core::{RecognitionError, RecognitionEvent, VoiceState};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace, warn};

pub const DEFAULT_SILENCE_THRESHOLD: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// A completed user turn.
    Transcript(String),
    /// The user started talking over the assistant.
    BargeIn,
    /// The user is audibly speaking (interim results flowing).
    Speaking,
    /// A non-transient recognizer failure.
    Failure(RecognitionError),
}

pub struct TurnTaking {
    silence_threshold: Duration,
}

impl TurnTaking {
    pub fn new(silence_threshold: Duration) -> Self {
        Self { silence_threshold }
    }

    /// Consume recognition events until the stream closes.
    pub async fn run(
        &self,
        mut events: mpsc::UnboundedReceiver<RecognitionEvent>,
        state: watch::Receiver<VoiceState>,
        out: mpsc::Sender<TurnEvent>,
    ) {
        let mut accumulated = String::new();
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    let ai_speaking = *state.borrow() == VoiceState::AiSpeaking;

                    match event {
                        RecognitionEvent::Partial { transcript } => {
                            trace!(%transcript, "partial");
                            if ai_speaking {
                                let _ = out.send(TurnEvent::BargeIn).await;
                                continue;
                            }
                            // Interim speech resets any pending end-of-turn.
                            deadline = None;
                            let _ = out.send(TurnEvent::Speaking).await;
                        }
                        RecognitionEvent::Final { transcript } => {
                            if ai_speaking {
                                let _ = out.send(TurnEvent::BargeIn).await;
                                continue;
                            }
                            if !accumulated.is_empty() {
                                accumulated.push(' ');
                            }
                            accumulated.push_str(transcript.trim());
                            deadline = Some(Instant::now() + self.silence_threshold);
                        }
                        RecognitionEvent::Error { error } => {
                            if error.is_transient() {
                                debug!(?error, "transient recognition error, continuing");
                            } else {
                                warn!(?error, "recognition failure");
                                let _ = out.send(TurnEvent::Failure(error)).await;
                            }
                        }
                    }
                }
                _ = async { sleep_until(deadline.unwrap()).await }, if deadline.is_some() => {
                    deadline = None;
                    let turn = std::mem::take(&mut accumulated);
                    if !turn.is_empty() {
                        debug!(%turn, "end of turn");
                        let _ = out.send(TurnEvent::Transcript(turn)).await;
                    }
                }
            }
        }
    }
}

impl Default for TurnTaking {
    fn default() -> Self {
        Self::new(DEFAULT_SILENCE_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn harness(
        state: VoiceState,
    ) -> (
        mpsc::UnboundedSender<RecognitionEvent>,
        watch::Sender<VoiceState>,
        mpsc::Receiver<TurnEvent>,
        tokio::task::JoinHandle<()>,
    ) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(state);
        let (out_tx, out_rx) = mpsc::channel(16);
        let handle = tokio::spawn(async move {
            TurnTaking::default().run(event_rx, state_rx, out_tx).await;
        });
        (event_tx, state_tx, out_rx, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn silence_after_final_ends_the_turn() {
        let (events, _state, mut out, _task) = harness(VoiceState::Listening);
        events.send(RecognitionEvent::Final { transcript: "show me pricing".into() }).unwrap();

        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(900)).await;
        let mut turn = None;
        while let Ok(event) = tokio::time::timeout(Duration::from_millis(10), out.recv()).await {
            if let Some(TurnEvent::Transcript(text)) = event {
                turn = Some(text);
                break;
            }
        }
        assert_eq!(turn.as_deref(), Some("show me pricing"));
    }

    #[tokio::test(start_paused = true)]
    async fn partials_reset_the_silence_timer() {
        let (events, _state, mut out, _task) = harness(VoiceState::Listening);
        events.send(RecognitionEvent::Final { transcript: "show me".into() }).unwrap();
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(500)).await;
        // Still talking: the timer must re-arm, not fire at 800 ms.
        events.send(RecognitionEvent::Partial { transcript: "the".into() }).unwrap();
        events.send(RecognitionEvent::Final { transcript: "the pro plan".into() }).unwrap();
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(900)).await;

        let mut transcript = None;
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_millis(10), out.recv()).await
        {
            if let TurnEvent::Transcript(text) = event {
                transcript = Some(text);
                break;
            }
        }
        assert_eq!(transcript.as_deref(), Some("show me the pro plan"));
    }

    #[tokio::test]
    async fn results_during_ai_speech_are_barge_ins() {
        let (events, _state, mut out, _task) = harness(VoiceState::AiSpeaking);
        events.send(RecognitionEvent::Partial { transcript: "wait".into() }).unwrap();
        assert_eq!(out.recv().await, Some(TurnEvent::BargeIn));
    }

    #[tokio::test(start_paused = true)]
    async fn no_speech_errors_stay_silent() {
        let (events, _state, mut out, _task) = harness(VoiceState::Listening);
        for _ in 0..30 {
            events.send(RecognitionEvent::Error { error: RecognitionError::NoSpeech }).unwrap();
            tokio::time::advance(Duration::from_secs(1)).await;
        }
        // Thirty seconds of no-speech: no turn, no failure.
        let polled = tokio::time::timeout(Duration::from_millis(10), out.recv()).await;
        assert!(polled.is_err(), "unexpected event: {polled:?}");
    }

    #[tokio::test]
    async fn permission_errors_surface() {
        let (events, _state, mut out, _task) = harness(VoiceState::Listening);
        events
            .send(RecognitionEvent::Error { error: RecognitionError::PermissionDenied })
            .unwrap();
        assert_eq!(out.recv().await, Some(TurnEvent::Failure(RecognitionError::PermissionDenied)));
    }
}
