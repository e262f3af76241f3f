pub mod channel;
pub mod error;
pub mod event;
pub mod page;
pub mod traits;
pub mod types;

pub use channel::{ProactiveMessage, SdkBus};
pub use error::BlitsumError;
pub use event::{RuntimeEvent, RuntimeEventKind};
pub use page::{ElementHandle, MutationKind, PageEvent, PageSnapshot, Rect, Viewport};
pub use traits::{
    AudioBuffer, AudioOutput, ChatMessage, KeyValueStore, LlmProvider, LlmRequest, LlmResponse,
    PageDriver, RecognitionError, RecognitionEvent, ScheduledSource, ScrollBehavior, ScrollBlock,
    SpeechRecognizer,
};
pub use types::{
    ActionKind, Behavior, BillingPeriod, BudgetLevel, CompanySize, ConversationHistory,
    ConversationStage, CtaInfo, FaqInfo, FeatureInfo, HeadingInfo, HistoryEntry, Industry, Intent,
    IntentKind, LinkInfo, PageContent, PageContext, PageMetadata, PageStructure, PlannedAction,
    PriceInfo, PricingPlan, ProductInfo, Role, SectionInfo, TargetKind, Urgency, UserProfile,
    UserType, VoiceState,
};
