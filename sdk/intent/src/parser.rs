//! Utterance parsing: keyword-scored intent and target, page-grounded
//! entities, and a composite confidence.

use blitsum_core::{Intent, IntentKind, PageContext, TargetKind};
use tracing::debug;

use crate::matcher;
use crate::tables;

pub struct IntentParser;

impl IntentParser {
    /// Parse a user utterance against the current page context.
    pub fn parse(utterance: &str, ctx: &PageContext) -> Intent {
        let text = utterance.to_lowercase();

        let mut intent = IntentKind::Unknown;
        let mut best = 0;
        for (kind, table) in tables::INTENT_GROUPS {
            let score = matcher::score_group(&text, table);
            if score > best {
                best = score;
                intent = *kind;
            }
        }

        let mut target = TargetKind::Unknown;
        let mut best = 0;
        for (kind, table) in tables::TARGET_GROUPS {
            let score = matcher::score_group(&text, table);
            if score > best {
                best = score;
                target = *kind;
            }
        }

        // A bare target is an implicit navigation ("pricing?" means "show
        // me pricing").
        if intent == IntentKind::Unknown && target != TargetKind::Unknown {
            intent = IntentKind::Navigate;
        }

        let entities = Self::extract_entities(utterance, ctx);

        let mut confidence: f64 = 0.0;
        if intent != IntentKind::Unknown {
            confidence += 0.4;
        }
        if target != TargetKind::Unknown {
            confidence += 0.3;
        }
        if !entities.is_empty() {
            confidence += 0.3;
        }
        let confidence = confidence.min(1.0);

        debug!(?intent, ?target, ?entities, confidence, "utterance parsed");
        Intent { intent, target, entities, confidence }
    }

    /// Utterance tokens that name a plan, product or feature on the page,
    /// plus common plan names as a fallback. Values keep the user's casing.
    fn extract_entities(utterance: &str, ctx: &PageContext) -> Vec<String> {
        let mut known: Vec<String> = Vec::new();
        for plan in &ctx.content.pricing {
            known.push(plan.plan.to_lowercase());
        }
        for product in &ctx.content.products {
            known.push(product.name.to_lowercase());
        }
        for feature in &ctx.content.features {
            known.push(feature.name.to_lowercase());
        }

        let lower = utterance.to_lowercase();
        let mut entities: Vec<String> = Vec::new();

        // Multi-word names match by substring and contribute as themselves.
        for name in known.iter().filter(|n| n.contains(' ')) {
            if matcher::phrase_match(&lower, name) && !entities.iter().any(|e| e.eq_ignore_ascii_case(name)) {
                entities.push(name.clone());
            }
        }

        for token in matcher::raw_tokens(utterance) {
            let token_lower = token.to_lowercase();
            let matches_known = known.iter().any(|n| *n == token_lower);
            let matches_common = tables::COMMON_PLAN_NAMES.contains(&token_lower.as_str());
            if (matches_known || matches_common)
                && !entities.iter().any(|e| e.eq_ignore_ascii_case(token))
            {
                entities.push(token.to_string());
            }
        }

        entities
    }
}
