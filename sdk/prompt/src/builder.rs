//! System prompt assembly: identity, stage guidance, profile, page ground
//! truth, directive vocabulary, response rules.

use blitsum_core::{ChatMessage, ConversationStage, PageContext, UserProfile};
use blitsum_sales::closing::ClosingPlan;
use blitsum_sales::flow::stage_prompt;
use blitsum_sales::spin;

/// Profile facts only enter the prompt once inference is this confident.
const PROFILE_CONFIDENCE_FLOOR: f64 = 0.3;

const IDENTITY: &str = "\
You are the resident sales assistant for this website. You live on the page: \
you can scroll it, highlight things on it, and walk the visitor through it. \
Be warm, direct, and concise. Never oversell and never invent facts.";

const DIRECTIVE_VOCAB: &str = "\
PAGE ACTIONS: to act on the page, emit one JSON object on its own line, e.g.\n\
{\"action\": \"scroll\", \"section\": \"pricing\"}\n\
{\"action\": \"highlight\", \"element\": \"Pro plan\"}\n\
{\"action\": \"pulse_cta\", \"element\": \"signup button\"}\n\
Everything else you write is shown to the visitor as text.";

pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the full system message for one turn.
    pub fn build(
        ctx: &PageContext,
        stage: ConversationStage,
        profile: &UserProfile,
        closing: Option<&ClosingPlan>,
        voice_mode: bool,
    ) -> ChatMessage {
        let mut sections: Vec<String> = Vec::new();
        sections.push(IDENTITY.to_string());
        sections.push(stage_prompt(stage).to_string());

        let bank = spin::questions(spin::category_for_stage(stage));
        sections.push(format!(
            "QUESTIONS THAT FIT THIS STAGE (pick at most one):\n- {}",
            bank.join("\n- ")
        ));

        if profile.confidence >= PROFILE_CONFIDENCE_FLOOR {
            sections.push(Self::profile_block(profile));
        }
        sections.push(Self::ground_truth(ctx));
        sections.push(Self::section_map(ctx));
        if let Some(closing) = closing {
            sections.push(format!(
                "CLOSING GUIDANCE:\nUse this close now: {}\nFollow-up if they hesitate: {}",
                closing.statement, closing.follow_up
            ));
        }
        sections.push(DIRECTIVE_VOCAB.to_string());
        sections.push(Self::response_rules(voice_mode));

        ChatMessage::system(sections.join("\n\n"))
    }

    fn profile_block(profile: &UserProfile) -> String {
        let mut lines = vec!["VISITOR PROFILE:".to_string()];
        lines.push(format!("- type: {:?}", profile.user_type));
        lines.push(format!("- company size: {:?}", profile.company_size));
        lines.push(format!("- urgency: {:?}", profile.urgency));
        lines.push(format!("- budget: {:?}", profile.budget));
        if !profile.pain_points.is_empty() {
            lines.push(format!("- pain points: {}", profile.pain_points.join("; ")));
        }
        if !profile.objections.is_empty() {
            lines.push(format!("- objections raised: {}", profile.objections.join("; ")));
        }
        lines.join("\n")
    }

    /// The facts the assistant is allowed to state.
    fn ground_truth(ctx: &PageContext) -> String {
        let mut lines = vec!["PAGE FACTS (the only facts you may state):".to_string()];

        if !ctx.content.pricing.is_empty() {
            lines.push("Pricing:".to_string());
            for plan in &ctx.content.pricing {
                let mut line = format!("- {}: {}", plan.plan, plan.price.raw);
                if plan.popular {
                    line.push_str(" (most popular)");
                }
                if !plan.features.is_empty() {
                    line.push_str(&format!(" [{}]", plan.features.join(", ")));
                }
                lines.push(line);
            }
        }
        if !ctx.content.features.is_empty() {
            lines.push("Features:".to_string());
            for feature in &ctx.content.features {
                lines.push(format!("- {}: {}", feature.name, feature.description));
            }
        }
        if !ctx.content.faqs.is_empty() {
            lines.push("FAQs:".to_string());
            for faq in &ctx.content.faqs {
                lines.push(format!("- Q: {} A: {}", faq.question, faq.answer));
            }
        }
        if !ctx.content.products.is_empty() {
            lines.push("Products:".to_string());
            for product in &ctx.content.products {
                lines.push(format!("- {}: {}", product.name, product.description));
            }
        }
        if !ctx.content.ctas.is_empty() {
            lines.push("Buttons on the page:".to_string());
            for cta in &ctx.content.ctas {
                lines.push(format!("- \"{}\"", cta.text));
            }
        }
        if lines.len() == 1 {
            lines.push("(nothing extracted from this page yet)".to_string());
        }
        lines.join("\n")
    }

    fn section_map(ctx: &PageContext) -> String {
        let mut lines = vec!["SECTIONS ON THE PAGE:".to_string()];
        for section in &ctx.structure.sections {
            let name = section
                .id
                .clone()
                .or_else(|| section.heading.clone())
                .unwrap_or_else(|| section.tag.clone());
            lines.push(format!("- {name}"));
        }
        if let Some(current) = &ctx.current_section {
            lines.push(format!("The visitor is currently looking at: {current}"));
        }
        lines.join("\n")
    }

    fn response_rules(voice_mode: bool) -> String {
        if voice_mode {
            "RESPONSE RULES:\n\
             - At most 50 words; this is spoken aloud.\n\
             - No markdown, no lists, no URLs.\n\
             - End with a question, or invite a simple \"yes\" to proceed.\n\
             - Only state facts from PAGE FACTS."
                .to_string()
        } else {
            "RESPONSE RULES:\n\
             - At most 80 words.\n\
             - End with a question or a clear call to action.\n\
             - Only state facts from PAGE FACTS."
                .to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blitsum_core::{PriceInfo, PricingPlan, Role};

    fn ctx_with_pricing() -> PageContext {
        let mut ctx = PageContext::default();
        ctx.content.pricing.push(PricingPlan {
            plan: "Pro".to_string(),
            price: PriceInfo { raw: "$199/mo".into(), ..Default::default() },
            features: vec!["10 seats".into()],
            popular: true,
            handle: None,
        });
        ctx
    }

    #[test]
    fn prompt_contains_ground_truth_and_stage() {
        let msg = PromptBuilder::build(
            &ctx_with_pricing(),
            ConversationStage::Qualification,
            &UserProfile::default(),
            None,
            false,
        );
        assert_eq!(msg.role, Role::System);
        assert!(msg.content.contains("STAGE: qualification"));
        assert!(msg.content.contains("Pro: $199/mo (most popular)"));
        assert!(msg.content.contains("At most 80 words"));
        // The qualification stage pulls from the problem question bank.
        assert!(msg.content.contains("What's the most frustrating part"));
    }

    #[test]
    fn low_confidence_profile_is_omitted() {
        let profile = UserProfile { confidence: 0.1, ..Default::default() };
        let msg = PromptBuilder::build(
            &ctx_with_pricing(),
            ConversationStage::Greeting,
            &profile,
            None,
            false,
        );
        assert!(!msg.content.contains("VISITOR PROFILE"));
    }

    #[test]
    fn voice_mode_tightens_the_rules() {
        let msg = PromptBuilder::build(
            &ctx_with_pricing(),
            ConversationStage::Greeting,
            &UserProfile::default(),
            None,
            true,
        );
        assert!(msg.content.contains("At most 50 words"));
        assert!(msg.content.contains("\"yes\""));
    }
}
