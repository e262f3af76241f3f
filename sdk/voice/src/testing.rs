//! Deterministic audio and recognition doubles used by the test suites.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use blitsum_core::{
    AudioBuffer, AudioOutput, RecognitionEvent, ScheduledSource, SpeechRecognizer,
};
use tokio::sync::{mpsc, oneshot};

struct SourceRecord {
    id: u64,
    at: f64,
    samples: usize,
    done: Option<oneshot::Sender<()>>,
}

/// An audio output with a manual clock that records every schedule call.
pub struct NullAudio {
    clock: Mutex<f64>,
    next_id: AtomicU64,
    sources: Mutex<Vec<SourceRecord>>,
    stopped: AtomicUsize,
}

impl NullAudio {
    pub fn new() -> Self {
        Self {
            clock: Mutex::new(0.0),
            next_id: AtomicU64::new(1),
            sources: Mutex::new(Vec::new()),
            stopped: AtomicUsize::new(0),
        }
    }

    /// Advance the audio clock.
    pub fn advance(&self, secs: f64) {
        *self.clock.lock().unwrap() += secs;
    }

    pub fn scheduled_starts(&self) -> Vec<f64> {
        self.sources.lock().unwrap().iter().map(|s| s.at).collect()
    }

    pub fn scheduled_sample_counts(&self) -> Vec<usize> {
        self.sources.lock().unwrap().iter().map(|s| s.samples).collect()
    }

    /// Mark every live source as finished playing.
    pub fn finish_all(&self) {
        for source in self.sources.lock().unwrap().iter_mut() {
            if let Some(done) = source.done.take() {
                let _ = done.send(());
            }
        }
    }

    pub fn stopped_count(&self) -> usize {
        self.stopped.load(Ordering::Relaxed)
    }
}

impl Default for NullAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for NullAudio {
    fn now(&self) -> f64 {
        *self.clock.lock().unwrap()
    }

    fn schedule(&self, buffer: AudioBuffer, at: f64) -> ScheduledSource {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.sources.lock().unwrap().push(SourceRecord {
            id,
            at,
            samples: buffer.samples.len(),
            done: Some(tx),
        });
        ScheduledSource { id, done: rx }
    }

    fn stop_all(&self) {
        self.stopped.fetch_add(1, Ordering::Relaxed);
        self.sources.lock().unwrap().iter_mut().for_each(|s| {
            s.done.take();
        });
    }
}

/// A recognizer driven by the test: events are pushed by hand.
pub struct ScriptedRecognizer {
    events_tx: mpsc::UnboundedSender<RecognitionEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<RecognitionEvent>>>,
    started: AtomicUsize,
    stopped: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            started: AtomicUsize::new(0),
            stopped: AtomicUsize::new(0),
        }
    }

    pub fn emit(&self, event: RecognitionEvent) {
        let _ = self.events_tx.send(event);
    }

    pub fn partial(&self, transcript: &str) {
        self.emit(RecognitionEvent::Partial { transcript: transcript.to_string() });
    }

    pub fn final_segment(&self, transcript: &str) {
        self.emit(RecognitionEvent::Final { transcript: transcript.to_string() });
    }

    pub fn start_count(&self) -> usize {
        self.started.load(Ordering::Relaxed)
    }

    pub fn stop_count(&self) -> usize {
        self.stopped.load(Ordering::Relaxed)
    }
}

impl Default for ScriptedRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn start(&self) -> Result<()> {
        self.started.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stopped.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<RecognitionEvent>> {
        self.events_rx.lock().unwrap().take()
    }
}
