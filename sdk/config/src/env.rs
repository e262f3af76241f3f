//! Environment overrides, applied after the host-supplied config.

use crate::schema::SdkConfig;
use tracing::debug;

const PREFIX: &str = "BLITSUM_";

/// Apply `BLITSUM_*` environment variables over the config. String knobs
/// replace, numeric knobs parse-or-keep.
pub fn apply_env(mut config: SdkConfig) -> SdkConfig {
    let var = |name: &str| std::env::var(format!("{PREFIX}{name}")).ok();

    if let Some(key) = var("LLM_API_KEY") {
        config.llm_api_key = key;
    }
    if let Some(key) = var("TTS_API_KEY") {
        config.tts_api_key = key;
    }
    if let Some(model) = var("LLM_MODEL") {
        config.llm_model = model;
    }
    if let Some(url) = var("LLM_BASE_URL") {
        config.llm_base_url = url;
    }
    if let Some(url) = var("TTS_URL") {
        config.tts_url = url;
    }
    if let Some(voice) = var("TTS_VOICE_ID") {
        config.tts_voice_id = Some(voice);
    }
    if let Some(level) = var("LOG_LEVEL") {
        config.log_level = level;
    }
    if let Some(rate) = var("SAMPLE_RATE").and_then(|v| v.parse().ok()) {
        config.sample_rate = rate;
    }
    if let Some(ms) = var("SILENCE_THRESHOLD_MS").and_then(|v| v.parse().ok()) {
        config.silence_threshold_ms = Some(ms);
    }

    debug!("environment overrides applied");
    config
}
