//! Navigation agent: parse an utterance, plan an ordered action sequence,
//! execute it, and phrase a user-facing response.

use std::sync::Arc;
use std::time::Duration;

use blitsum_core::{ActionKind, Intent, IntentKind, PageContext, PlannedAction, TargetKind};
use blitsum_intent::IntentParser;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::executor::{ActionExecutor, ActionOutcome};

/// Pause between actions when a plan has more than one step.
const INTER_ACTION_DELAY: Duration = Duration::from_millis(400);

const MAX_READ_SUMMARY: usize = 200;

#[derive(Debug, Clone)]
pub struct NavigationResponse {
    pub success: bool,
    pub message: String,
    pub plan: Vec<PlannedAction>,
}

#[derive(Debug, Clone)]
struct NavigationRecord {
    input: String,
    success: bool,
}

pub struct NavigationAgent {
    executor: Arc<ActionExecutor>,
    context: RwLock<Arc<PageContext>>,
    history: Mutex<Vec<NavigationRecord>>,
}

impl NavigationAgent {
    pub fn new(executor: Arc<ActionExecutor>, context: Arc<PageContext>) -> Self {
        Self {
            executor,
            context: RwLock::new(context),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Swap in a fresh page context after re-extraction.
    pub async fn update_context(&self, context: Arc<PageContext>) {
        *self.context.write().await = context;
    }

    pub async fn navigate(&self, input: &str) -> NavigationResponse {
        let ctx = self.context.read().await.clone();
        let intent = IntentParser::parse(input, &ctx);

        if !intent.is_navigation_request() {
            let response = NavigationResponse {
                success: false,
                message: suggestion_message(&ctx),
                plan: Vec::new(),
            };
            self.record(input, false).await;
            return response;
        }

        let plan = plan_actions(&intent);
        debug!(steps = plan.len(), ?intent, "executing navigation plan");

        let mut outcomes: Vec<ActionOutcome> = Vec::with_capacity(plan.len());
        for (index, action) in plan.iter().enumerate() {
            if index > 0 && plan.len() > 1 {
                tokio::time::sleep(INTER_ACTION_DELAY).await;
            }
            let outcome = self.execute(action, &ctx).await;
            if let Some(error) = &outcome.error {
                warn!(step = index, %error, "action failed, continuing plan");
            }
            outcomes.push(outcome);
        }

        let success = outcomes.iter().any(|o| o.success);
        let message = if success {
            response_message(&intent, &outcomes)
        } else {
            let error = outcomes
                .iter()
                .find_map(|o| o.error.clone())
                .unwrap_or_else(|| "that didn't work".to_string());
            format!("{error}. {}", suggestion_message(&ctx))
        };

        self.record(input, success).await;
        info!(success, "navigation handled");
        NavigationResponse { success, message, plan }
    }

    async fn execute(&self, action: &PlannedAction, ctx: &PageContext) -> ActionOutcome {
        let target_text = action.target.clone().unwrap_or_default();
        match action.kind {
            ActionKind::Navigate => {
                if let Some(entity) = action.entities.first() {
                    self.executor.navigate_to_element(entity, ctx, true).await
                } else if let Some(target) = parse_target(&target_text) {
                    self.executor.navigate_to_section(target, ctx).await
                } else {
                    self.executor.navigate_to_element(&target_text, ctx, true).await
                }
            }
            ActionKind::Compare => {
                self.executor.compare_elements(&action.entities, ctx, None).await
            }
            ActionKind::Focus | ActionKind::Highlight => {
                self.executor.focus_element(&target_text, ctx, None).await
            }
            ActionKind::Read => self.executor.read_element_content(&target_text, ctx).await,
            ActionKind::Click => self.executor.click_element(&target_text, ctx).await,
            ActionKind::Pulse => match self.executor.resolve_element(&target_text, ctx).await {
                Ok(Some(handle)) => self.executor.pulse_cta(&handle).await,
                Ok(None) => ActionOutcome::failed(format!("Couldn't find \"{target_text}\"")),
                Err(err) => ActionOutcome::failed(err.to_string()),
            },
        }
    }

    async fn record(&self, input: &str, success: bool) {
        self.history
            .lock()
            .await
            .push(NavigationRecord { input: input.to_string(), success });
    }

    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }

    pub async fn last_input(&self) -> Option<String> {
        self.history.lock().await.last().map(|r| r.input.clone())
    }
}

/// Turn a parsed intent into an ordered plan.
fn plan_actions(intent: &Intent) -> Vec<PlannedAction> {
    let target_name = |intent: &Intent| {
        if intent.target != TargetKind::Unknown {
            Some(intent.target.as_str().to_string())
        } else {
            None
        }
    };

    match intent.intent {
        IntentKind::Navigate => {
            let mut action = PlannedAction::new(ActionKind::Navigate, target_name(intent));
            action.entities = intent.entities.clone();
            vec![action]
        }
        IntentKind::Compare if intent.entities.len() >= 2 => {
            let section = if intent.target != TargetKind::Unknown {
                intent.target
            } else {
                // Comparing named plans implies the pricing section.
                TargetKind::Pricing
            };
            let mut compare = PlannedAction::new(ActionKind::Compare, None);
            compare.entities = intent.entities.clone();
            vec![
                PlannedAction::new(ActionKind::Navigate, Some(section.as_str().to_string())),
                compare,
            ]
        }
        IntentKind::Compare => {
            // Nothing concrete to compare; treat as navigation.
            vec![PlannedAction::new(ActionKind::Navigate, target_name(intent))]
        }
        IntentKind::Highlight => {
            let focus_target = intent
                .entities
                .first()
                .cloned()
                .or_else(|| target_name(intent))
                .unwrap_or_default();
            let mut plan = Vec::new();
            if intent.target != TargetKind::Unknown {
                plan.push(PlannedAction::new(
                    ActionKind::Navigate,
                    Some(intent.target.as_str().to_string()),
                ));
            }
            plan.push(PlannedAction::new(ActionKind::Focus, Some(focus_target)));
            plan
        }
        IntentKind::Read => {
            let read_target = intent
                .entities
                .first()
                .cloned()
                .or_else(|| target_name(intent))
                .unwrap_or_default();
            let mut plan = Vec::new();
            if intent.target != TargetKind::Unknown {
                plan.push(PlannedAction::new(
                    ActionKind::Navigate,
                    Some(intent.target.as_str().to_string()),
                ));
            }
            plan.push(PlannedAction::new(ActionKind::Read, Some(read_target)));
            plan
        }
        IntentKind::Click => {
            let click_target = intent
                .entities
                .first()
                .cloned()
                .or_else(|| target_name(intent))
                .unwrap_or_default();
            vec![PlannedAction::new(ActionKind::Click, Some(click_target))]
        }
        IntentKind::Unknown => {
            vec![PlannedAction::new(ActionKind::Navigate, target_name(intent))]
        }
    }
}

fn parse_target(text: &str) -> Option<TargetKind> {
    match text {
        "pricing" => Some(TargetKind::Pricing),
        "features" => Some(TargetKind::Features),
        "signup" => Some(TargetKind::Signup),
        "contact" => Some(TargetKind::Contact),
        "about" => Some(TargetKind::About),
        "faq" => Some(TargetKind::Faq),
        "product" => Some(TargetKind::Product),
        "cta" => Some(TargetKind::Cta),
        _ => None,
    }
}

fn response_message(intent: &Intent, outcomes: &[ActionOutcome]) -> String {
    match intent.intent {
        IntentKind::Navigate | IntentKind::Unknown => match intent.target {
            TargetKind::Pricing => "Here's our pricing information.".to_string(),
            TargetKind::Features => "Here are the key features.".to_string(),
            TargetKind::Signup => "Here's where you can sign up.".to_string(),
            TargetKind::Contact => "Here's how to get in touch.".to_string(),
            TargetKind::About => "Here's more about the company.".to_string(),
            TargetKind::Faq => "Here are the frequently asked questions.".to_string(),
            TargetKind::Product => "Here are the products.".to_string(),
            TargetKind::Cta | TargetKind::Unknown => {
                "Here's the section you asked about.".to_string()
            }
        },
        IntentKind::Compare => {
            format!("Comparing {}.", intent.entities.join(" and "))
        }
        IntentKind::Highlight => {
            let subject = intent
                .entities
                .first()
                .cloned()
                .unwrap_or_else(|| intent.target.as_str().to_string());
            format!("Take a look at {subject}.")
        }
        IntentKind::Read => {
            let summary = outcomes
                .iter()
                .find_map(|o| o.content.clone())
                .map(|text| {
                    let truncated: String = text.chars().take(MAX_READ_SUMMARY).collect();
                    truncated
                })
                .unwrap_or_default();
            if summary.is_empty() {
                "There wasn't much to read there.".to_string()
            } else {
                format!("Here's what it says: {summary}")
            }
        }
        IntentKind::Click => {
            let subject = intent
                .entities
                .first()
                .cloned()
                .unwrap_or_else(|| intent.target.as_str().to_string());
            format!("Clicked {subject}.")
        }
    }
}

/// Fallback listing the categories the page actually has.
fn suggestion_message(ctx: &PageContext) -> String {
    let mut available = Vec::new();
    if !ctx.content.pricing.is_empty() {
        available.push("pricing");
    }
    if !ctx.content.features.is_empty() {
        available.push("features");
    }
    if !ctx.content.faqs.is_empty() {
        available.push("FAQs");
    }
    if !ctx.content.products.is_empty() {
        available.push("products");
    }
    if !ctx.content.ctas.is_empty() {
        available.push("signup options");
    }
    if available.is_empty() {
        "Could you be more specific about what you'd like to see?".to_string()
    } else {
        format!("I can show you: {}.", available.join(", "))
    }
}
