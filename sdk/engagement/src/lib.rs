pub mod rules;
pub mod tracker;
pub mod triggers;

pub use tracker::{BehaviorListener, BehaviorTracker};
pub use triggers::{EngagementEngine, Priority, TriggerRule};
