//! Embed configuration schema.
//!
//! This is the shape hosts pass to `init(config)`; unknown keys are
//! ignored so older embeds keep working against newer SDKs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkConfig {
    pub llm_api_key: String,

    pub tts_api_key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_voice_id: Option<String>,

    /// End-of-turn silence window in voice mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silence_threshold_ms: Option<u64>,

    /// Cap on retained conversation entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_max: Option<usize>,

    #[serde(default = "defaults::llm_model")]
    pub llm_model: String,

    #[serde(default = "defaults::llm_base_url")]
    pub llm_base_url: String,

    #[serde(default = "defaults::tts_url")]
    pub tts_url: String,

    #[serde(default = "defaults::tts_model")]
    pub tts_model: String,

    #[serde(default = "defaults::sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "defaults::log_level")]
    pub log_level: String,
}

pub mod defaults {
    pub fn llm_model() -> String {
        "gpt-4o-mini".to_string()
    }

    pub fn llm_base_url() -> String {
        "https://api.openai.com/v1".to_string()
    }

    pub fn tts_url() -> String {
        "wss://tts.blitsum.dev/v1/stream".to_string()
    }

    pub fn tts_model() -> String {
        "blitsum-voice-1".to_string()
    }

    pub fn sample_rate() -> u32 {
        44_100
    }

    pub fn log_level() -> String {
        "info".to_string()
    }
}

impl SdkConfig {
    pub fn new(llm_api_key: impl Into<String>, tts_api_key: impl Into<String>) -> Self {
        Self {
            llm_api_key: llm_api_key.into(),
            tts_api_key: tts_api_key.into(),
            tts_voice_id: None,
            silence_threshold_ms: None,
            history_max: None,
            llm_model: defaults::llm_model(),
            llm_base_url: defaults::llm_base_url(),
            tts_url: defaults::tts_url(),
            tts_model: defaults::tts_model(),
            sample_rate: defaults::sample_rate(),
            log_level: defaults::log_level(),
        }
    }
}
