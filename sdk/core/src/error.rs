use thiserror::Error;

/// Top-level error type for the Blitsum runtime.
///
/// Display strings for the voice variants are load-bearing: the voice
/// session rejects pending utterances with exactly these messages.
#[derive(Debug, Error)]
pub enum BlitsumError {
    #[error("intent confidence too low: {0}")]
    LowConfidence(String),

    #[error("Section not found")]
    SectionNotFound,

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("element is not interactive: {0}")]
    NonInteractive(String),

    #[error("LLM provider error: {0}")]
    LlmTransport(String),

    #[error("TTS protocol error: {0}")]
    TtsProtocol(String),

    #[error("Disconnected")]
    Disconnected,

    #[error("Interrupted by new speech")]
    Interrupted,

    #[error("speech recognition unavailable: {0}")]
    RecognitionUnsupported(String),

    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
