//! Behavior tracking: scroll, mouse, CTA interactions, section visibility,
//! exit intent. One instance per session; everyone else reads snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use blitsum_core::{Behavior, ElementHandle, PageDriver, PageEvent};
use blitsum_context::patterns;
use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Listener callback: event name, event payload, behavior snapshot.
pub type BehaviorListener = Box<dyn Fn(&str, &serde_json::Value, &Behavior) + Send + Sync>;

struct TrackerState {
    behavior: Behavior,
    listeners: HashMap<String, BehaviorListener>,
    ticker: Option<JoinHandle<()>>,
}

pub struct BehaviorTracker {
    driver: Arc<dyn PageDriver>,
    state: Arc<Mutex<TrackerState>>,
    snapshot_tx: watch::Sender<Behavior>,
}

impl BehaviorTracker {
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        let (snapshot_tx, _) = watch::channel(Behavior::default());
        Self {
            driver,
            state: Arc::new(Mutex::new(TrackerState {
                behavior: Behavior::default(),
                listeners: HashMap::new(),
                ticker: None,
            })),
            snapshot_tx,
        }
    }

    /// Start the one-second time accumulator. Idempotent: calling twice is
    /// equivalent to calling once.
    pub async fn init(&self) {
        let mut state = self.state.lock().await;
        if state.ticker.is_some() {
            debug!("behavior tracker already initialized");
            return;
        }
        state.behavior.session_started_at = Some(Utc::now());

        let shared = self.state.clone();
        let snapshot_tx = self.snapshot_tx.clone();
        state.ticker = Some(tokio::spawn(async move {
            let mut tick = tokio::time::interval(std::time::Duration::from_secs(1));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tick.tick().await;
                let mut state = shared.lock().await;
                state.behavior.time_on_page_secs += 1;
                let _ = snapshot_tx.send(state.behavior.clone());
            }
        }));
        info!("behavior tracker initialized");
    }

    /// Zero the accumulated behavior without touching listeners.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.behavior = Behavior::default();
        let _ = self.snapshot_tx.send(state.behavior.clone());
    }

    /// Stop the ticker and drop listeners.
    pub async fn teardown(&self) {
        let mut state = self.state.lock().await;
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        state.listeners.clear();
    }

    pub async fn add_listener(&self, id: impl Into<String>, listener: BehaviorListener) {
        self.state.lock().await.listeners.insert(id.into(), listener);
    }

    pub async fn remove_listener(&self, id: &str) {
        self.state.lock().await.listeners.remove(id);
    }

    /// Subscribe to behavior snapshots, updated on every mutation.
    pub fn subscribe(&self) -> watch::Receiver<Behavior> {
        self.snapshot_tx.subscribe()
    }

    pub async fn snapshot(&self) -> Behavior {
        self.state.lock().await.behavior.clone()
    }

    /// Feed one page event into the model.
    pub async fn observe(&self, event: PageEvent) {
        // Section visibility is re-checked on scroll; it needs the driver,
        // so it happens before the state lock.
        let (pricing_visible, features_visible) = match &event {
            PageEvent::Scroll { .. } => (
                self.is_section_visible("#pricing").await,
                self.is_section_visible("#features").await,
            ),
            _ => (false, false),
        };

        let mut state = self.state.lock().await;
        let behavior = &mut state.behavior;
        behavior.last_activity_at = Some(Utc::now());

        let event_name = match &event {
            PageEvent::Scroll { depth } => {
                behavior.scroll_depth = *depth;
                if *depth > behavior.max_scroll_depth {
                    behavior.max_scroll_depth = *depth;
                }
                if pricing_visible {
                    behavior.pricing_viewed = true;
                }
                if features_visible {
                    behavior.features_viewed = true;
                }
                "scroll"
            }
            PageEvent::MouseMove => {
                behavior.mouse_movements += 1;
                "mouse_move"
            }
            PageEvent::MouseLeave { y } => {
                if *y <= 0.0 {
                    behavior.exit_intent_detected = true;
                    "exit_intent"
                } else {
                    "mouse_leave"
                }
            }
            PageEvent::Hover { text, classes, .. } => {
                if is_cta(text, classes) {
                    behavior.cta_hovered += 1;
                }
                "hover"
            }
            PageEvent::Click { text, classes, .. } => {
                if is_cta(text, classes) {
                    behavior.cta_clicked += 1;
                }
                "click"
            }
            PageEvent::Mutation { .. } => "mutation",
        };

        let payload = serde_json::to_value(&event).unwrap_or_default();
        let snapshot = behavior.clone();
        for listener in state.listeners.values() {
            listener(event_name, &payload, &snapshot);
        }
        let _ = self.snapshot_tx.send(snapshot);
    }

    /// A chat message went out; counted toward engagement.
    pub async fn note_message_sent(&self) {
        let mut state = self.state.lock().await;
        state.behavior.messages_sent += 1;
        let _ = self.snapshot_tx.send(state.behavior.clone());
    }

    /// The visitor ran a plan comparison.
    pub async fn note_plan_comparison(&self) {
        let mut state = self.state.lock().await;
        state.behavior.plan_comparisons += 1;
        let _ = self.snapshot_tx.send(state.behavior.clone());
    }

    async fn is_section_visible(&self, selector: &str) -> bool {
        let handle = ElementHandle::new(selector, 0);
        self.driver.is_visible(&handle).await.unwrap_or(false)
    }
}

/// A button counts as a CTA by its verb text or by its classes.
fn is_cta(text: &str, classes: &str) -> bool {
    patterns::contains_any(text, patterns::CTA_VERBS)
        || classes.split_whitespace().any(|c| {
            let c = c.to_lowercase();
            c == "cta" || c == "btn-primary"
        })
}
