//! SPIN question banks, picked by conversation stage.

use blitsum_core::ConversationStage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinCategory {
    Situation,
    Problem,
    Implication,
    NeedPayoff,
}

const SITUATION_QUESTIONS: &[&str] = &[
    "What does your current setup look like for this?",
    "How is your team handling this today?",
    "How many people would end up using this?",
    "What tools are you already working with?",
];

const PROBLEM_QUESTIONS: &[&str] = &[
    "What's the most frustrating part of the current process?",
    "Where does the current approach fall short?",
    "How often does that issue come up?",
    "What made you start looking for something better?",
];

const IMPLICATION_QUESTIONS: &[&str] = &[
    "What does that problem cost you in time each week?",
    "How does that affect the rest of the team?",
    "What happens if this stays the way it is for another quarter?",
    "Has that ever caused something to slip with a customer?",
];

const NEED_PAYOFF_QUESTIONS: &[&str] = &[
    "If this were handled automatically, what would that free you up to do?",
    "How valuable would it be to have this solved by next week?",
    "Who else on the team would feel the difference first?",
    "What would success with a tool like this look like for you?",
];

/// Which SPIN category fits the current stage.
pub fn category_for_stage(stage: ConversationStage) -> SpinCategory {
    match stage {
        ConversationStage::Greeting | ConversationStage::Discovery => SpinCategory::Situation,
        ConversationStage::Qualification => SpinCategory::Problem,
        ConversationStage::Presentation => SpinCategory::Implication,
        ConversationStage::Objection
        | ConversationStage::Closing
        | ConversationStage::Completed => SpinCategory::NeedPayoff,
    }
}

pub fn questions(category: SpinCategory) -> &'static [&'static str] {
    match category {
        SpinCategory::Situation => SITUATION_QUESTIONS,
        SpinCategory::Problem => PROBLEM_QUESTIONS,
        SpinCategory::Implication => IMPLICATION_QUESTIONS,
        SpinCategory::NeedPayoff => NEED_PAYOFF_QUESTIONS,
    }
}

/// Deterministic pick: rotate through the bank with the message count.
pub fn pick(stage: ConversationStage, message_count: usize) -> &'static str {
    let bank = questions(category_for_stage(stage));
    bank[message_count % bank.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_maps_to_category() {
        assert_eq!(category_for_stage(ConversationStage::Discovery), SpinCategory::Situation);
        assert_eq!(category_for_stage(ConversationStage::Qualification), SpinCategory::Problem);
        assert_eq!(category_for_stage(ConversationStage::Closing), SpinCategory::NeedPayoff);
    }

    #[test]
    fn picks_rotate_and_stay_in_bank() {
        let first = pick(ConversationStage::Discovery, 0);
        let second = pick(ConversationStage::Discovery, 1);
        assert_ne!(first, second);
        assert!(SITUATION_QUESTIONS.contains(&first));
    }
}
