use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::page::{ElementHandle, PageSnapshot, Rect};
use crate::types::Role;

// ---------------------------------------------------------------------------
// Page driver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBehavior {
    #[default]
    Smooth,
    Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBlock {
    Start,
    #[default]
    Center,
}

/// The runtime's view of the host page.
///
/// Everything the executor and extractor do to the page goes through this
/// trait; production bindings translate the calls to the real document,
/// tests use a deterministic in-memory page.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Capture the current markup, URL and viewport in one snapshot.
    async fn snapshot(&self) -> Result<PageSnapshot>;

    /// Resolve a handle to its current bounding box, if the element still
    /// exists and the driver can compute layout.
    async fn bounds(&self, handle: &ElementHandle) -> Result<Option<Rect>>;

    /// Whether the element is currently inside the viewport.
    async fn is_visible(&self, handle: &ElementHandle) -> Result<bool>;

    async fn scroll_to(
        &self,
        handle: &ElementHandle,
        behavior: ScrollBehavior,
        block: ScrollBlock,
    ) -> Result<()>;

    /// Read an inline style property. `None` means the property is unset.
    async fn read_style(&self, handle: &ElementHandle, property: &str) -> Result<Option<String>>;

    /// Write an inline style property; empty value clears it.
    async fn set_style(&self, handle: &ElementHandle, property: &str, value: &str) -> Result<()>;

    async fn add_class(&self, handle: &ElementHandle, class: &str) -> Result<()>;

    async fn remove_class(&self, handle: &ElementHandle, class: &str) -> Result<()>;

    async fn click(&self, handle: &ElementHandle) -> Result<()>;

    /// Cleaned visible text of the element.
    async fn text_content(&self, handle: &ElementHandle) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Audio output
// ---------------------------------------------------------------------------

/// A decoded mono audio buffer ready for scheduling.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate.max(1) as f64
    }
}

/// A buffer accepted by the output; `done` fires when playback ends or the
/// source is stopped (either resolution or sender drop counts as ended).
pub struct ScheduledSource {
    pub id: u64,
    pub done: oneshot::Receiver<()>,
}

/// The audio rendering half of the voice pipeline.
///
/// The scheduler owns all timing decisions; implementations only need a
/// monotonic clock and the ability to start a buffer at a clock time.
pub trait AudioOutput: Send + Sync {
    /// Seconds on the audio clock.
    fn now(&self) -> f64;

    /// Schedule a buffer to start at `at` seconds on the audio clock.
    fn schedule(&self, buffer: AudioBuffer, at: f64) -> ScheduledSource;

    /// Immediately stop every scheduled and playing source.
    fn stop_all(&self);
}

// ---------------------------------------------------------------------------
// Speech recognition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionError {
    /// Transient: nothing was heard. Recognition silently restarts.
    NoSpeech,
    /// Transient: the recognizer was aborted mid-utterance.
    Aborted,
    PermissionDenied,
    Network(String),
    Unsupported(String),
}

impl RecognitionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NoSpeech | Self::Aborted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecognitionEvent {
    /// Interim result; resets any pending end-of-turn timer.
    Partial { transcript: String },
    /// Final segment for the current phrase.
    Final { transcript: String },
    Error { error: RecognitionError },
}

/// Continuous, interim-results speech recognition.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn start(&self) -> Result<()>;
    async fn stop(&self) -> Result<()>;
    /// Take the event stream. May only be taken once.
    fn take_events(&self) -> Option<tokio::sync::mpsc::UnboundedReceiver<RecognitionEvent>>;
}

// ---------------------------------------------------------------------------
// LLM provider
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// One-shot completion request. Streaming is deliberately not part of the
/// contract.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;
}

// ---------------------------------------------------------------------------
// Key-value persistence
// ---------------------------------------------------------------------------

/// Minimal persistence seam. The runtime stores exactly one flag
/// (`blitsum_visited`) in the host's local storage through this trait.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}
