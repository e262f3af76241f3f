//! User profile inference from the transcript and observed behavior.

use blitsum_core::{
    Behavior, BudgetLevel, CompanySize, ConversationHistory, Industry, Urgency, UserProfile,
    UserType,
};
use blitsum_intent::matcher;
use tracing::debug;

const BUYER_CUES: &[&str] =
    &["buy", "purchase", "sign up", "ready", "pricing", "cost", "trial", "upgrade"];

const RESEARCHER_CUES: &[&str] = &[
    "compare", "versus", "difference", "how does", "documentation", "integration", "api",
    "benchmark",
];

const SKEPTIC_CUES: &[&str] =
    &["really", "actually", "proof", "guarantee", "doubt", "sure about", "competitors", "catch"];

const EXPLORER_CUES: &[&str] = &["just looking", "curious", "browsing", "interesting", "cool"];

const STARTUP_CUES: &[&str] = &["startup", "founder", "small team", "just me", "solo", "side project"];
const SMB_CUES: &[&str] = &["team of", "growing", "small business", "agency", "our shop"];
const ENTERPRISE_CUES: &[&str] = &[
    "enterprise", "compliance", "sso", "procurement", "security review", "thousands of",
    "org-wide",
];

const TECH_CUES: &[&str] = &["software", "developer", "saas", "engineering", "platform"];
const FINANCE_CUES: &[&str] = &["bank", "finance", "fintech", "trading", "accounting"];
const HEALTHCARE_CUES: &[&str] = &["health", "clinic", "hipaa", "patient", "medical"];
const RETAIL_CUES: &[&str] = &["store", "shop", "ecommerce", "retail", "merchant"];
const EDUCATION_CUES: &[&str] = &["school", "university", "students", "course", "teachers"];

const URGENCY_HIGH_CUES: &[&str] = &["asap", "urgent", "today", "right now", "this week"];
const URGENCY_MEDIUM_CUES: &[&str] = &["this month", "soon", "this quarter", "next sprint"];
const URGENCY_LOW_CUES: &[&str] = &["someday", "eventually", "next year", "no rush", "exploring"];

const BUDGET_HIGH_CUES: &[&str] = &["whatever it costs", "budget isn't an issue", "enterprise plan"];
const BUDGET_MEDIUM_CUES: &[&str] = &["reasonable", "fair price", "worth paying"];
const BUDGET_LOW_CUES: &[&str] = &["cheap", "free", "tight budget", "expensive", "too much"];

const PAIN_CUES: &[&str] = &["problem", "struggle", "issue", "pain", "difficult", "frustrating"];
const INTEREST_CUES: &[&str] = &["interested", "like", "love", "want", "looking for", "excited"];
const OBJECTION_CUES: &[&str] =
    &["but", "however", "expensive", "concern", "worried", "not sure", "hesitant"];

pub struct ProfileBuilder;

impl ProfileBuilder {
    pub fn build(history: &ConversationHistory, behavior: &Behavior) -> UserProfile {
        let text = history.user_messages().collect::<Vec<_>>().join(" ").to_lowercase();
        let hits = |table: &[&str]| -> usize {
            table.iter().filter(|cue| matcher::entry_match(&text, cue)).count()
        };

        let user_type = Self::infer_type(&text, behavior);
        let company_size = Self::best_of(&[
            (CompanySize::Startup, hits(STARTUP_CUES)),
            (CompanySize::Smb, hits(SMB_CUES)),
            (CompanySize::Enterprise, hits(ENTERPRISE_CUES)),
        ])
        .unwrap_or_default();
        let industry = Self::best_of(&[
            (Industry::Technology, hits(TECH_CUES)),
            (Industry::Finance, hits(FINANCE_CUES)),
            (Industry::Healthcare, hits(HEALTHCARE_CUES)),
            (Industry::Retail, hits(RETAIL_CUES)),
            (Industry::Education, hits(EDUCATION_CUES)),
        ])
        .unwrap_or_default();
        let urgency = Self::best_of(&[
            (Urgency::High, hits(URGENCY_HIGH_CUES)),
            (Urgency::Medium, hits(URGENCY_MEDIUM_CUES)),
            (Urgency::Low, hits(URGENCY_LOW_CUES)),
        ])
        .unwrap_or_default();
        let budget = Self::best_of(&[
            (BudgetLevel::High, hits(BUDGET_HIGH_CUES)),
            (BudgetLevel::Medium, hits(BUDGET_MEDIUM_CUES)),
            (BudgetLevel::Low, hits(BUDGET_LOW_CUES)),
        ])
        .unwrap_or_default();

        let pain_points = Self::sentences_with(history, PAIN_CUES);
        let interests = Self::sentences_with(history, INTEREST_CUES);
        let objections = Self::sentences_with(history, OBJECTION_CUES);

        // Confidence is a weighted sum of which facets we actually know.
        let mut confidence = 0.0;
        if user_type != UserType::Unknown && user_type != UserType::Explorer {
            confidence += 0.3;
        }
        if company_size != CompanySize::Unknown {
            confidence += 0.2;
        }
        if industry != Industry::Unknown {
            confidence += 0.15;
        }
        if urgency != Urgency::Unknown {
            confidence += 0.15;
        }
        if budget != BudgetLevel::Unknown {
            confidence += 0.2;
        }

        debug!(?user_type, ?company_size, confidence, "profile built");
        UserProfile {
            user_type,
            company_size,
            industry,
            urgency,
            budget,
            pain_points,
            interests,
            objections,
            behavior: behavior.clone(),
            confidence,
        }
    }

    fn infer_type(text: &str, behavior: &Behavior) -> UserType {
        let hits = |table: &[&str]| -> usize {
            table.iter().filter(|cue| matcher::entry_match(text, cue)).count()
        };
        let mut buyer = hits(BUYER_CUES);
        // Behavior corroborates buying intent.
        if behavior.cta_clicked > 0 || behavior.pricing_viewed {
            buyer += 1;
        }
        let scored = [
            (UserType::Buyer, buyer),
            (UserType::Researcher, hits(RESEARCHER_CUES)),
            (UserType::Skeptic, hits(SKEPTIC_CUES)),
            (UserType::Explorer, hits(EXPLORER_CUES)),
        ];
        Self::best_of(&scored).unwrap_or(if text.trim().is_empty() {
            UserType::Unknown
        } else {
            UserType::Explorer
        })
    }

    fn best_of<T: Copy>(scored: &[(T, usize)]) -> Option<T> {
        scored
            .iter()
            .filter(|(_, score)| *score > 0)
            .max_by_key(|(_, score)| *score)
            .map(|(value, _)| *value)
    }

    /// Raw user sentences containing any cue, deduped.
    fn sentences_with(history: &ConversationHistory, table: &[&str]) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for message in history.user_messages() {
            for sentence in message.split(['.', '!', '?']) {
                let sentence = sentence.trim();
                if sentence.is_empty() {
                    continue;
                }
                let lower = sentence.to_lowercase();
                let hit = table.iter().any(|cue| matcher::entry_match(&lower, cue));
                if hit && !found.iter().any(|s| s.eq_ignore_ascii_case(sentence)) {
                    found.push(sentence.to_string());
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blitsum_core::Role;

    fn history(messages: &[&str]) -> ConversationHistory {
        let mut history = ConversationHistory::default();
        for message in messages {
            history.push(Role::User, *message);
        }
        history
    }

    #[test]
    fn buyer_profile_from_purchase_language() {
        let profile = ProfileBuilder::build(
            &history(&["I'm ready to buy, what's the pricing for a trial"]),
            &Behavior::default(),
        );
        assert_eq!(profile.user_type, UserType::Buyer);
        assert!(profile.confidence > 0.0);
    }

    #[test]
    fn behavior_corroborates_buying() {
        let behavior = Behavior { pricing_viewed: true, ..Default::default() };
        let profile = ProfileBuilder::build(&history(&["hello there"]), &behavior);
        assert_eq!(profile.user_type, UserType::Buyer);
    }

    #[test]
    fn empty_history_is_unknown() {
        let profile = ProfileBuilder::build(&history(&[]), &Behavior::default());
        assert_eq!(profile.user_type, UserType::Unknown);
        assert_eq!(profile.company_size, CompanySize::Unknown);
        assert_eq!(profile.confidence, 0.0);
    }

    #[test]
    fn objection_sentences_are_collected_verbatim() {
        let profile = ProfileBuilder::build(
            &history(&["Looks good. But the Pro tier seems expensive for us."]),
            &Behavior::default(),
        );
        assert_eq!(profile.objections.len(), 1);
        assert!(profile.objections[0].contains("expensive"));
    }

    #[test]
    fn enterprise_signals_detected() {
        let profile = ProfileBuilder::build(
            &history(&["We'd need SSO and a security review before procurement signs off"]),
            &Behavior::default(),
        );
        assert_eq!(profile.company_size, CompanySize::Enterprise);
    }
}
