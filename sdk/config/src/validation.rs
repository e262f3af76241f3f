//! Config validation run once at init.

use thiserror::Error;

use crate::schema::SdkConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("llmApiKey must not be empty")]
    MissingLlmKey,

    #[error("ttsApiKey must not be empty")]
    MissingTtsKey,

    #[error("sampleRate {0} is out of range (8000..=48000)")]
    BadSampleRate(u32),

    #[error("silenceThresholdMs {0} is out of range (100..=10000)")]
    BadSilenceThreshold(u64),

    #[error("historyMax {0} is too small (minimum 2)")]
    BadHistoryMax(usize),
}

pub fn validate(config: &SdkConfig) -> Result<(), ConfigError> {
    if config.llm_api_key.trim().is_empty() {
        return Err(ConfigError::MissingLlmKey);
    }
    if config.tts_api_key.trim().is_empty() {
        return Err(ConfigError::MissingTtsKey);
    }
    if !(8_000..=48_000).contains(&config.sample_rate) {
        return Err(ConfigError::BadSampleRate(config.sample_rate));
    }
    if let Some(ms) = config.silence_threshold_ms {
        if !(100..=10_000).contains(&ms) {
            return Err(ConfigError::BadSilenceThreshold(ms));
        }
    }
    if let Some(max) = config.history_max {
        if max < 2 {
            return Err(ConfigError::BadHistoryMax(max));
        }
    }
    Ok(())
}
