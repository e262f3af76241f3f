use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::page::ElementHandle;

// ---------------------------------------------------------------------------
// Page context
// ---------------------------------------------------------------------------

/// Semantic snapshot of the host page.
///
/// Immutable once built; the content cache owns its lifecycle and flushes it
/// when the page mutates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub url: String,
    pub title: String,
    pub current_section: Option<String>,
    pub scroll_position: f64,
    pub structure: PageStructure,
    pub content: PageContent,
    pub keywords: Vec<String>,
    pub summary: String,
    pub links: Vec<LinkInfo>,
    pub extracted_at: DateTime<Utc>,
    /// Wall-clock milliseconds spent extracting.
    pub extraction_time_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStructure {
    pub headings: Vec<HeadingInfo>,
    pub sections: Vec<SectionInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingInfo {
    pub level: u8,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    pub text_preview: String,
    #[serde(skip)]
    pub handle: Option<ElementHandle>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    pub pricing: Vec<PricingPlan>,
    pub features: Vec<FeatureInfo>,
    pub faqs: Vec<FaqInfo>,
    pub products: Vec<ProductInfo>,
    pub ctas: Vec<CtaInfo>,
    pub metadata: PageMetadata,
}

/// Parsed price, or the "Custom" sentinel when a card carries no numeric
/// price but names one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceInfo {
    /// Raw price text as it appeared on the page.
    pub raw: String,
    pub value: Option<f64>,
    pub currency: Option<String>,
    pub period: Option<BillingPeriod>,
}

impl PriceInfo {
    pub fn custom() -> Self {
        Self { raw: "Custom".to_string(), value: None, currency: None, period: None }
    }

    pub fn is_custom(&self) -> bool {
        self.value.is_none() && self.raw.eq_ignore_ascii_case("custom")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingPeriod {
    Monthly,
    Yearly,
    OneTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPlan {
    pub plan: String,
    pub price: PriceInfo,
    pub features: Vec<String>,
    pub popular: bool,
    #[serde(skip)]
    pub handle: Option<ElementHandle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureInfo {
    pub name: String,
    pub description: String,
    #[serde(skip)]
    pub handle: Option<ElementHandle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqInfo {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip)]
    pub handle: Option<ElementHandle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CtaInfo {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    pub tag: String,
    #[serde(skip)]
    pub handle: Option<ElementHandle>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub site_name: String,
    pub description: String,
    pub og_tags: HashMap<String, String>,
    /// Parsed JSON-LD blocks; invalid blocks are skipped at extraction.
    pub schema: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkInfo {
    pub text: String,
    pub href: String,
}

// ---------------------------------------------------------------------------
// Intent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Navigate,
    Compare,
    Highlight,
    Read,
    Click,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Pricing,
    Features,
    Signup,
    Contact,
    About,
    Faq,
    Product,
    Cta,
    Unknown,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pricing => "pricing",
            Self::Features => "features",
            Self::Signup => "signup",
            Self::Contact => "contact",
            Self::About => "about",
            Self::Faq => "faq",
            Self::Product => "product",
            Self::Cta => "cta",
            Self::Unknown => "unknown",
        }
    }
}

/// Parsed user utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub intent: IntentKind,
    pub target: TargetKind,
    pub entities: Vec<String>,
    pub confidence: f64,
}

impl Intent {
    pub fn is_navigation_request(&self) -> bool {
        self.confidence >= 0.5 && self.intent != IntentKind::Unknown
    }
}

// ---------------------------------------------------------------------------
// Action plans
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Navigate,
    Compare,
    Highlight,
    Read,
    Click,
    Focus,
    Pulse,
}

/// A single planned step; plans execute strictly left-to-right.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedAction {
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<String>,
}

impl PlannedAction {
    pub fn new(kind: ActionKind, target: Option<String>) -> Self {
        Self { kind, target, entities: Vec::new() }
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// Ordered user/assistant transcript capped to the most recent entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationHistory {
    entries: Vec<HistoryEntry>,
    max_entries: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX)
    }
}

impl ConversationHistory {
    /// 20 entries = 10 full turns.
    pub const DEFAULT_MAX: usize = 20;

    pub fn new(max_entries: usize) -> Self {
        Self { entries: Vec::new(), max_entries: max_entries.max(2) }
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.entries.push(HistoryEntry { role, content: content.into() });
        if self.entries.len() > self.max_entries {
            let overflow = self.entries.len() - self.max_entries;
            self.entries.drain(..overflow);
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn user_messages(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.role == Role::User)
            .map(|e| e.content.as_str())
    }

    pub fn user_message_count(&self) -> usize {
        self.entries.iter().filter(|e| e.role == Role::User).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStage {
    Greeting,
    Discovery,
    Qualification,
    Presentation,
    Objection,
    Closing,
    Completed,
}

impl ConversationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Discovery => "discovery",
            Self::Qualification => "qualification",
            Self::Presentation => "presentation",
            Self::Objection => "objection",
            Self::Closing => "closing",
            Self::Completed => "completed",
        }
    }
}

// ---------------------------------------------------------------------------
// User profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Buyer,
    Researcher,
    Skeptic,
    Explorer,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanySize {
    Startup,
    Smb,
    Enterprise,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    Technology,
    Finance,
    Healthcare,
    Retail,
    Education,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    High,
    Medium,
    Low,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetLevel {
    High,
    Medium,
    Low,
    #[default]
    Unknown,
}

/// Inferred profile of the visitor, built from the transcript and behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_type: UserType,
    pub company_size: CompanySize,
    pub industry: Industry,
    pub urgency: Urgency,
    pub budget: BudgetLevel,
    pub pain_points: Vec<String>,
    pub interests: Vec<String>,
    pub objections: Vec<String>,
    pub behavior: Behavior,
    pub confidence: f64,
}

// ---------------------------------------------------------------------------
// Behavior
// ---------------------------------------------------------------------------

/// Continuously-mutated visitor behavior. Owned by the tracker; everyone
/// else reads snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Behavior {
    pub time_on_page_secs: u64,
    pub scroll_depth: f64,
    pub max_scroll_depth: f64,
    pub pricing_viewed: bool,
    pub features_viewed: bool,
    pub cta_hovered: u32,
    pub cta_clicked: u32,
    pub mouse_movements: u64,
    pub exit_intent_detected: bool,
    pub plan_comparisons: u32,
    pub messages_sent: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_started_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Voice
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceState {
    Idle,
    Listening,
    UserSpeaking,
    Processing,
    AiSpeaking,
    Error,
}

impl VoiceState {
    /// Status line rendered by the shell.
    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::Listening => "Listening…",
            Self::UserSpeaking => "You're speaking…",
            Self::Processing => "Processing…",
            Self::AiSpeaking => "AI is speaking…",
            Self::Error => "Something went wrong",
        }
    }
}
