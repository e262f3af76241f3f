//! The shipped trigger rule table.
//!
//! Empty on purpose: the engine is the product surface, and hosts supply
//! their own rules. A typical entry looks like
//!
//! ```ignore
//! TriggerRule {
//!     id: "exit-intent-offer".into(),
//!     priority: Priority::Critical,
//!     condition: |b| b.exit_intent_detected && b.cta_clicked == 0,
//!     cooldown: Duration::from_secs(300),
//!     delay: Duration::from_millis(500),
//!     message: "Before you go, want a quick tour of the plans?".into(),
//! }
//! ```

use crate::triggers::TriggerRule;

pub fn default_rules() -> Vec<TriggerRule> {
    Vec::new()
}
