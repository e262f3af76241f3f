//! Shell interaction state machine: open/close with debounce, message
//! bubbles, submit, voice toggle, live voice status.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use blitsum_core::VoiceState;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::store::{StatePatch, Store};

/// How long the pointer must stay away before the shell closes.
const CLOSE_DEBOUNCE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bubble {
    User { text: String },
    Assistant { text: String, error: bool },
}

pub struct Shell {
    store: Arc<Store>,
    bubbles: Mutex<Vec<Bubble>>,
    message_hovered: AtomicBool,
    close_task: Mutex<Option<JoinHandle<()>>>,
    submissions: mpsc::Sender<String>,
    status: Mutex<String>,
}

impl Shell {
    pub fn new(store: Arc<Store>) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (submissions, submissions_rx) = mpsc::channel(16);
        let shell = Arc::new(Self {
            store,
            bubbles: Mutex::new(Vec::new()),
            message_hovered: AtomicBool::new(false),
            close_task: Mutex::new(None),
            submissions,
            status: Mutex::new(String::new()),
        });
        (shell, submissions_rx)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Stylesheet the host binding injects into the SDK's shadow root.
    pub fn stylesheet(&self) -> &'static str {
        crate::style::SHELL_CSS
    }

    pub fn bubbles(&self) -> Vec<Bubble> {
        self.bubbles.lock().unwrap().clone()
    }

    fn cancel_pending_close(&self) {
        if let Some(task) = self.close_task.lock().unwrap().take() {
            task.abort();
        }
    }

    /// Pointer entered the notch or the message stack.
    pub fn pointer_enter(self: &Arc<Self>) {
        self.cancel_pending_close();
        self.store.set_state(StatePatch::open(true));
    }

    /// Pointer left. Closing is debounced and suppressed during voice mode
    /// or while an assistant message is hovered.
    pub fn pointer_leave(self: &Arc<Self>) {
        if self.store.get_state().is_voice_mode || self.message_hovered.load(Ordering::Relaxed) {
            return;
        }
        self.cancel_pending_close();
        let shell = self.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(CLOSE_DEBOUNCE).await;
            if !shell.store.get_state().is_voice_mode {
                shell.store.set_state(StatePatch::open(false));
            }
        });
        *self.close_task.lock().unwrap() = Some(task);
    }

    pub fn set_message_hovered(&self, hovered: bool) {
        self.message_hovered.store(hovered, Ordering::Relaxed);
        if hovered {
            self.cancel_pending_close();
        }
    }

    /// A click landed outside the SDK: close and clear assistant bubbles.
    pub fn outside_click(&self) {
        self.cancel_pending_close();
        self.store.set_state(StatePatch::open(false));
        self.bubbles.lock().unwrap().retain(|b| matches!(b, Bubble::User { .. }));
        debug!("outside click, shell closed");
    }

    /// Enter or send button submits the input.
    pub async fn submit(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.bubbles.lock().unwrap().push(Bubble::User { text: text.to_string() });
        let _ = self.submissions.send(text.to_string()).await;
    }

    pub fn push_assistant(&self, text: impl Into<String>) {
        self.bubbles.lock().unwrap().push(Bubble::Assistant { text: text.into(), error: false });
    }

    /// Failures render as assistant bubbles with error styling.
    pub fn push_error(&self, text: impl Into<String>) {
        self.bubbles.lock().unwrap().push(Bubble::Assistant { text: text.into(), error: true });
    }

    /// Flip voice mode; returns the new value.
    pub fn toggle_voice_mode(&self) -> bool {
        let next = !self.store.get_state().is_voice_mode;
        self.store.set_state(StatePatch::voice_mode(next));
        if next {
            self.cancel_pending_close();
            self.store.set_state(StatePatch::open(true));
        }
        next
    }

    /// Update the live status line from the voice state.
    pub fn set_voice_status(&self, state: VoiceState) {
        *self.status.lock().unwrap() = state.status_label().to_string();
    }

    pub fn voice_status(&self) -> String {
        self.status.lock().unwrap().clone()
    }
}
