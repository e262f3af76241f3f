//! Voice session orchestration: the state machine tying recognition,
//! turn-taking and synthesis together.
//!
//! Recognition stays live while the assistant speaks; anything heard during
//! `AiSpeaking` is treated as a barge-in and cancels playback, which keeps
//! the swing back to `Listening` inside one event-loop turn.

use std::sync::Arc;
use std::time::Duration;

use blitsum_core::{BlitsumError, SpeechRecognizer, VoiceState};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

use crate::engine::SpeechSynth;
use crate::turn::{TurnEvent, TurnTaking};

/// Pause between playback completion and resuming the listening state.
const RESUME_DELAY: Duration = Duration::from_millis(300);

/// How long the error state lingers before returning to listening.
const ERROR_RECOVERY: Duration = Duration::from_secs(2);

pub struct VoiceSession {
    synth: Arc<dyn SpeechSynth>,
    recognizer: Arc<dyn SpeechRecognizer>,
    state_tx: watch::Sender<VoiceState>,
    transcripts_rx: Mutex<Option<mpsc::Receiver<String>>>,
    transcripts_tx: mpsc::Sender<String>,
    silence_threshold: Duration,
}

impl VoiceSession {
    pub fn new(
        synth: Arc<dyn SpeechSynth>,
        recognizer: Arc<dyn SpeechRecognizer>,
        silence_threshold: Duration,
    ) -> Arc<Self> {
        let (state_tx, _) = watch::channel(VoiceState::Idle);
        let (transcripts_tx, transcripts_rx) = mpsc::channel(16);
        Arc::new(Self {
            synth,
            recognizer,
            state_tx,
            transcripts_rx: Mutex::new(Some(transcripts_rx)),
            transcripts_tx,
            silence_threshold,
        })
    }

    pub fn state(&self) -> watch::Receiver<VoiceState> {
        self.state_tx.subscribe()
    }

    pub fn current_state(&self) -> VoiceState {
        *self.state_tx.borrow()
    }

    /// Take the stream of completed user turns. May only be taken once.
    pub async fn take_transcripts(&self) -> Option<mpsc::Receiver<String>> {
        self.transcripts_rx.lock().await.take()
    }

    fn set_state(&self, state: VoiceState) {
        if *self.state_tx.borrow() != state {
            debug!(state = ?state, "voice state");
            let _ = self.state_tx.send(state);
        }
    }

    /// Enter voice mode: connect synthesis, start recognition, and begin
    /// routing turn events.
    pub async fn start(self: &Arc<Self>) -> Result<(), BlitsumError> {
        self.synth.connect().await?;
        self.recognizer
            .start()
            .await
            .map_err(|e| BlitsumError::RecognitionUnsupported(e.to_string()))?;

        let events = self
            .recognizer
            .take_events()
            .ok_or_else(|| BlitsumError::RecognitionUnsupported("event stream taken".into()))?;

        let (turn_tx, turn_rx) = mpsc::channel(16);
        let turn_taking = TurnTaking::new(self.silence_threshold);
        let state_rx = self.state_tx.subscribe();
        tokio::spawn(async move {
            turn_taking.run(events, state_rx, turn_tx).await;
        });

        let session = self.clone();
        tokio::spawn(async move {
            session.route_turns(turn_rx).await;
        });

        self.set_state(VoiceState::Listening);
        info!("voice session started");
        Ok(())
    }

    async fn route_turns(self: Arc<Self>, mut turns: mpsc::Receiver<TurnEvent>) {
        while let Some(event) = turns.recv().await {
            match event {
                TurnEvent::Speaking => {
                    if self.current_state() == VoiceState::Listening {
                        self.set_state(VoiceState::UserSpeaking);
                    }
                }
                TurnEvent::Transcript(text) => {
                    self.set_state(VoiceState::Processing);
                    if self.transcripts_tx.send(text).await.is_err() {
                        break;
                    }
                }
                TurnEvent::BargeIn => {
                    debug!("barge-in, interrupting playback");
                    self.synth.interrupt().await;
                }
                TurnEvent::Failure(error) => {
                    warn!(?error, "recognition failure in session");
                    self.set_state(VoiceState::Error);
                    let session = self.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(ERROR_RECOVERY).await;
                        if session.current_state() == VoiceState::Error {
                            session.set_state(VoiceState::Listening);
                        }
                    });
                }
            }
        }
    }

    /// Speak one assistant reply. Resolves when playback has fully
    /// completed; a barge-in or a newer utterance rejects it.
    pub async fn speak(self: &Arc<Self>, text: &str) -> Result<(), BlitsumError> {
        self.set_state(VoiceState::AiSpeaking);

        match self.synth.speak(text).await {
            Ok(()) => {
                tokio::time::sleep(RESUME_DELAY).await;
                self.set_state(VoiceState::Listening);
                Ok(())
            }
            Err(BlitsumError::Interrupted) => {
                // The visitor talked over us; swing straight back.
                self.set_state(VoiceState::Listening);
                Err(BlitsumError::Interrupted)
            }
            Err(err) => {
                self.set_state(VoiceState::Error);
                let session = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(ERROR_RECOVERY).await;
                    if session.current_state() == VoiceState::Error {
                        session.set_state(VoiceState::Listening);
                    }
                });
                Err(err)
            }
        }
    }

    pub async fn interrupt(&self) {
        self.synth.interrupt().await;
    }

    /// Leave voice mode, releasing the recognizer and the audio pipeline.
    pub async fn stop(&self) {
        if let Err(err) = self.recognizer.stop().await {
            warn!(%err, "recognizer stop failed");
        }
        self.synth.disconnect().await;
        self.set_state(VoiceState::Idle);
        info!("voice session stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRecognizer;
    use crate::turn::DEFAULT_SILENCE_THRESHOLD;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::oneshot;

    /// A synth the test resolves by hand.
    struct ManualSynth {
        pending: StdMutex<Option<oneshot::Sender<Result<(), BlitsumError>>>>,
    }

    impl ManualSynth {
        fn new() -> Arc<Self> {
            Arc::new(Self { pending: StdMutex::new(None) })
        }

        fn resolve_ok(&self) {
            if let Some(tx) = self.pending.lock().unwrap().take() {
                let _ = tx.send(Ok(()));
            }
        }

        fn fail(&self, error: BlitsumError) {
            if let Some(tx) = self.pending.lock().unwrap().take() {
                let _ = tx.send(Err(error));
            }
        }
    }

    #[async_trait]
    impl SpeechSynth for ManualSynth {
        async fn connect(&self) -> Result<(), BlitsumError> {
            Ok(())
        }

        async fn speak(&self, _text: &str) -> Result<(), BlitsumError> {
            let (tx, rx) = oneshot::channel();
            *self.pending.lock().unwrap() = Some(tx);
            rx.await.unwrap_or(Err(BlitsumError::Disconnected))
        }

        async fn interrupt(&self) {
            if let Some(tx) = self.pending.lock().unwrap().take() {
                let _ = tx.send(Err(BlitsumError::Interrupted));
            }
        }

        async fn disconnect(&self) {}
    }

    fn session_with(
        synth: Arc<ManualSynth>,
    ) -> (Arc<VoiceSession>, Arc<ScriptedRecognizer>) {
        let recognizer = Arc::new(ScriptedRecognizer::new());
        let session = VoiceSession::new(synth, recognizer.clone(), DEFAULT_SILENCE_THRESHOLD);
        (session, recognizer)
    }

    #[tokio::test(start_paused = true)]
    async fn full_turn_reaches_processing() {
        let (session, recognizer) = session_with(ManualSynth::new());
        session.start().await.unwrap();
        let mut transcripts = session.take_transcripts().await.unwrap();

        recognizer.final_segment("show me the pro plan");
        let turn = transcripts.recv().await.unwrap();
        assert_eq!(turn, "show me the pro plan");
        assert_eq!(session.current_state(), VoiceState::Processing);
    }

    #[tokio::test(start_paused = true)]
    async fn speak_completes_then_listens_again() {
        let synth = ManualSynth::new();
        let (session, _recognizer) = session_with(synth.clone());
        session.start().await.unwrap();

        let speak = tokio::spawn({
            let session = session.clone();
            async move { session.speak("hello").await }
        });
        tokio::task::yield_now().await;
        assert_eq!(session.current_state(), VoiceState::AiSpeaking);

        synth.resolve_ok();
        assert!(speak.await.unwrap().is_ok());
        assert_eq!(session.current_state(), VoiceState::Listening);
    }

    #[tokio::test(start_paused = true)]
    async fn barge_in_interrupts_without_recognizer_restart() {
        let synth = ManualSynth::new();
        let (session, recognizer) = session_with(synth.clone());
        session.start().await.unwrap();
        assert_eq!(recognizer.start_count(), 1);

        let speak = tokio::spawn({
            let session = session.clone();
            async move { session.speak("a long spoken reply").await }
        });
        tokio::task::yield_now().await;
        assert_eq!(session.current_state(), VoiceState::AiSpeaking);

        // The visitor starts talking mid-playback.
        recognizer.partial("actually wait");
        let result = speak.await.unwrap();
        assert_eq!(result.unwrap_err().to_string(), "Interrupted by new speech");
        assert_eq!(session.current_state(), VoiceState::Listening);
        // Recognition never stopped, so it never restarted either.
        assert_eq!(recognizer.start_count(), 1);
        assert_eq!(recognizer.stop_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn synth_failure_recovers_to_listening() {
        let synth = ManualSynth::new();
        let (session, _recognizer) = session_with(synth.clone());
        session.start().await.unwrap();

        let speak = tokio::spawn({
            let session = session.clone();
            async move { session.speak("hello").await }
        });
        tokio::task::yield_now().await;
        synth.fail(BlitsumError::TtsProtocol("bad voice".into()));
        assert!(speak.await.unwrap().is_err());
        assert_eq!(session.current_state(), VoiceState::Error);

        tokio::time::advance(ERROR_RECOVERY + Duration::from_millis(10)).await;
        tokio::task::yield_now().await;
        assert_eq!(session.current_state(), VoiceState::Listening);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_releases_and_goes_idle() {
        let (session, recognizer) = session_with(ManualSynth::new());
        session.start().await.unwrap();
        session.stop().await;
        assert_eq!(session.current_state(), VoiceState::Idle);
        assert_eq!(recognizer.stop_count(), 1);
    }
}
