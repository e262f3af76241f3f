//! Blitsum sales assistant runtime.
//!
//! The embeddable conversational agent: page understanding, intent-driven
//! navigation, staged sales conversation, and a full-duplex voice pipeline,
//! wired behind a single `init` entry point.

pub mod runtime;
pub mod testing;

use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::OnceCell;

pub use blitsum_config::SdkConfig;
pub use runtime::{HostBindings, SalesRuntime};

static RUNTIME: OnceCell<Arc<SalesRuntime>> = OnceCell::new();

/// Global entry point for embeds. Idempotent: the first call builds the
/// runtime, later calls return the same instance. Safe to call before or
/// after the host page is ready; extraction is lazy.
pub async fn init(config: SdkConfig, bindings: HostBindings) -> Result<Arc<SalesRuntime>> {
    if let Some(existing) = RUNTIME.get() {
        return Ok(existing.clone());
    }
    let runtime = SalesRuntime::start(config, bindings).await?;
    // A racing second init keeps the instance that won.
    let _ = RUNTIME.set(runtime.clone());
    Ok(RUNTIME.get().cloned().unwrap_or(runtime))
}
