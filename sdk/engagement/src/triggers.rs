//! Proactive engagement: priority-ordered, cooldown-guarded rules over the
//! behavior model. At most one rule fires per evaluation cycle.

use std::collections::HashMap;
use std::time::Duration;

use blitsum_core::{Behavior, ProactiveMessage};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Periodic evaluation cadence in addition to behavior-event evaluation.
const EVALUATION_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

pub struct TriggerRule {
    pub id: String,
    pub priority: Priority,
    pub condition: fn(&Behavior) -> bool,
    pub cooldown: Duration,
    /// Wait before the message is actually surfaced.
    pub delay: Duration,
    pub message: String,
}

struct FiringState {
    last_fired: HashMap<String, Instant>,
}

pub struct EngagementEngine {
    rules: Vec<TriggerRule>,
    state: Mutex<FiringState>,
}

impl EngagementEngine {
    pub fn new(mut rules: Vec<TriggerRule>) -> Self {
        rules.sort_by_key(|r| r.priority);
        Self {
            rules,
            state: Mutex::new(FiringState { last_fired: HashMap::new() }),
        }
    }

    /// One evaluation cycle: the first eligible rule whose condition holds
    /// fires; everything after it waits for a later cycle.
    pub async fn evaluate(&self, behavior: &Behavior) -> Option<&TriggerRule> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        for rule in &self.rules {
            let eligible = match state.last_fired.get(&rule.id) {
                Some(last) => now.duration_since(*last) >= rule.cooldown,
                None => true,
            };
            if !eligible || !(rule.condition)(behavior) {
                continue;
            }
            state.last_fired.insert(rule.id.clone(), now);
            debug!(rule = %rule.id, "engagement rule fired");
            return Some(rule);
        }
        None
    }

    /// Run forever: evaluate on every behavior change and every five
    /// seconds; fired rules surface as proactive messages after their delay.
    pub async fn run(
        &self,
        mut behavior: watch::Receiver<Behavior>,
        proactive_tx: mpsc::Sender<ProactiveMessage>,
    ) {
        let mut tick = interval(EVALUATION_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(rules = self.rules.len(), "engagement engine started");

        loop {
            let snapshot = behavior.borrow().clone();
            if let Some(rule) = self.evaluate(&snapshot).await {
                if !rule.delay.is_zero() {
                    tokio::time::sleep(rule.delay).await;
                }
                let message = ProactiveMessage {
                    rule_id: rule.id.clone(),
                    message: rule.message.clone(),
                };
                if proactive_tx.send(message).await.is_err() {
                    break;
                }
            }

            tokio::select! {
                changed = behavior.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tick.tick() => {}
            }
        }
        debug!("engagement engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, priority: Priority, condition: fn(&Behavior) -> bool) -> TriggerRule {
        TriggerRule {
            id: id.to_string(),
            priority,
            condition,
            cooldown: Duration::from_secs(60),
            delay: Duration::ZERO,
            message: format!("{id} fired"),
        }
    }

    #[tokio::test]
    async fn only_one_rule_fires_per_cycle() {
        let engine = EngagementEngine::new(vec![
            rule("low", Priority::Low, |_| true),
            rule("critical", Priority::Critical, |_| true),
        ]);
        let fired = engine.evaluate(&Behavior::default()).await.unwrap();
        assert_eq!(fired.id, "critical");
        // Second cycle: critical is cooling down, low takes its turn.
        let fired = engine.evaluate(&Behavior::default()).await.unwrap();
        assert_eq!(fired.id, "low");
    }

    #[tokio::test]
    async fn cooldown_blocks_refiring() {
        let engine = EngagementEngine::new(vec![rule("once", Priority::High, |_| true)]);
        assert!(engine.evaluate(&Behavior::default()).await.is_some());
        assert!(engine.evaluate(&Behavior::default()).await.is_none());
    }

    #[tokio::test]
    async fn conditions_inspect_behavior() {
        let engine = EngagementEngine::new(vec![rule(
            "exit",
            Priority::Critical,
            |b| b.exit_intent_detected,
        )]);
        assert!(engine.evaluate(&Behavior::default()).await.is_none());
        let behavior = Behavior { exit_intent_detected: true, ..Default::default() };
        assert!(engine.evaluate(&behavior).await.is_some());
    }

    #[tokio::test]
    async fn default_rule_table_is_empty() {
        let engine = EngagementEngine::new(crate::rules::default_rules());
        assert!(engine.evaluate(&Behavior::default()).await.is_none());
    }
}
