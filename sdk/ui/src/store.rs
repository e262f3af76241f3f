//! The in-process state store behind the shell: one piece of state,
//! shallow-merge updates, synchronous subscriber notification.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiConfig {
    pub accent_color: String,
    pub greeting: String,
    pub position: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            accent_color: "#6366f1".to_string(),
            greeting: "Hi! Ask me anything about this page.".to_string(),
            position: "bottom-right".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub is_open: bool,
    pub is_voice_mode: bool,
    #[serde(default)]
    pub config: UiConfig,
}

/// A shallow-merge update: only the provided fields change.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub is_open: Option<bool>,
    pub is_voice_mode: Option<bool>,
    pub config: Option<UiConfig>,
}

impl StatePatch {
    pub fn open(value: bool) -> Self {
        Self { is_open: Some(value), ..Default::default() }
    }

    pub fn voice_mode(value: bool) -> Self {
        Self { is_voice_mode: Some(value), ..Default::default() }
    }
}

type Subscriber = Box<dyn Fn(&UiState) + Send + Sync>;

pub struct Store {
    state: RwLock<UiState>,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
    next_id: AtomicU64,
}

impl Store {
    pub fn new(config: UiConfig) -> Self {
        Self {
            state: RwLock::new(UiState { config, ..Default::default() }),
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn get_state(&self) -> UiState {
        self.state.read().unwrap().clone()
    }

    /// Merge the patch and notify every subscriber with the new state.
    pub fn set_state(&self, patch: StatePatch) {
        let snapshot = {
            let mut state = self.state.write().unwrap();
            if let Some(is_open) = patch.is_open {
                state.is_open = is_open;
            }
            if let Some(is_voice_mode) = patch.is_voice_mode {
                state.is_voice_mode = is_voice_mode;
            }
            if let Some(config) = patch.config {
                state.config = config;
            }
            state.clone()
        };
        trace!(open = snapshot.is_open, voice = snapshot.is_voice_mode, "state updated");
        for subscriber in self.subscribers.lock().unwrap().values() {
            subscriber(&snapshot);
        }
    }

    pub fn subscribe(&self, subscriber: Subscriber) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().unwrap().insert(id, subscriber);
        id
    }

    pub fn unsubscribe(&self, id: u64) {
        self.subscribers.lock().unwrap().remove(&id);
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(UiConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn shallow_merge_keeps_other_fields() {
        let store = Store::default();
        store.set_state(StatePatch::open(true));
        store.set_state(StatePatch::voice_mode(true));
        let state = store.get_state();
        assert!(state.is_open);
        assert!(state.is_voice_mode);
    }

    #[test]
    fn subscribers_see_every_update() {
        let store = Store::default();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        store.subscribe(Box::new(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        }));
        store.set_state(StatePatch::open(true));
        store.set_state(StatePatch::open(false));
        assert_eq!(seen.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = Store::default();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let id = store.subscribe(Box::new(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        }));
        store.unsubscribe(id);
        store.set_state(StatePatch::open(true));
        assert_eq!(seen.load(Ordering::Relaxed), 0);
    }
}
