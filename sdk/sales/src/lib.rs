pub mod bant;
pub mod closing;
pub mod flow;
pub mod profile;
pub mod spin;

pub use bant::{BantScore, QualificationLevel, Recommendation};
pub use closing::{ClosingPlan, ClosingTechnique};
pub use flow::ConversationFlow;
pub use profile::ProfileBuilder;
