use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::event::RuntimeEvent;
use crate::page::PageEvent;

/// Default buffer size for inter-component channels.
const DEFAULT_BUFFER_SIZE: usize = 256;

/// A proactive message produced by the engagement engine for the shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProactiveMessage {
    pub rule_id: String,
    pub message: String,
}

/// The message bus wiring the runtime's subsystems together.
///
/// Page events flow from the driver binding into the tracker and cache;
/// proactive messages flow from the trigger engine into the shell; runtime
/// events flow into the log sink. Bounded mpsc for backpressure, receivers
/// taken once.
pub struct SdkBus {
    pub page_tx: mpsc::Sender<PageEvent>,
    page_rx: Option<mpsc::Receiver<PageEvent>>,

    pub proactive_tx: mpsc::Sender<ProactiveMessage>,
    proactive_rx: Option<mpsc::Receiver<ProactiveMessage>>,

    pub event_tx: mpsc::Sender<RuntimeEvent>,
    event_rx: Option<mpsc::Receiver<RuntimeEvent>>,
}

impl SdkBus {
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer: usize) -> Self {
        let (page_tx, page_rx) = mpsc::channel(buffer);
        let (proactive_tx, proactive_rx) = mpsc::channel(buffer);
        let (event_tx, event_rx) = mpsc::channel(buffer);

        info!(buffer_size = buffer, "SdkBus initialized");

        Self {
            page_tx,
            page_rx: Some(page_rx),
            proactive_tx,
            proactive_rx: Some(proactive_rx),
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Take the page-event receiver (can only be taken once).
    pub fn take_page_rx(&mut self) -> Option<mpsc::Receiver<PageEvent>> {
        debug!("page-event receiver taken");
        self.page_rx.take()
    }

    /// Take the proactive-message receiver (can only be taken once).
    pub fn take_proactive_rx(&mut self) -> Option<mpsc::Receiver<ProactiveMessage>> {
        debug!("proactive-message receiver taken");
        self.proactive_rx.take()
    }

    /// Take the runtime-event receiver (can only be taken once).
    pub fn take_event_rx(&mut self) -> Option<mpsc::Receiver<RuntimeEvent>> {
        debug!("runtime-event receiver taken");
        self.event_rx.take()
    }
}

impl Default for SdkBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn page_events_flow_through() {
        let mut bus = SdkBus::new();
        let mut rx = bus.take_page_rx().unwrap();

        bus.page_tx.send(PageEvent::Scroll { depth: 0.4 }).await.unwrap();
        match rx.recv().await.unwrap() {
            PageEvent::Scroll { depth } => assert!((depth - 0.4).abs() < f64::EPSILON),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn receivers_take_once() {
        let mut bus = SdkBus::new();
        assert!(bus.take_proactive_rx().is_some());
        assert!(bus.take_proactive_rx().is_none());
    }
}
