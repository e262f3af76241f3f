//! BANT qualification scoring over the user side of the transcript.

use blitsum_core::ConversationHistory;
use blitsum_intent::matcher;
use serde::{Deserialize, Serialize};

const BUDGET_CUES: &[&str] =
    &["budget", "price", "cost", "afford", "invest", "spend", "pricing", "pay"];

const AUTHORITY_CUES: &[&str] = &[
    "i decide", "my team", "we need", "our company", "i'm the", "i am the", "manager", "founder",
    "ceo", "owner", "director",
];

const NEED_CUES: &[&str] =
    &["need", "problem", "struggle", "issue", "pain", "challenge", "looking for", "solve"];

const TIMELINE_CUES: &[&str] = &[
    "now", "today", "soon", "this week", "this month", "this quarter", "asap", "urgent",
    "deadline", "by the end",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationLevel {
    None,
    Low,
    Medium,
    High,
}

impl QualificationLevel {
    fn from_hits(hits: usize) -> Self {
        match hits {
            0 => Self::None,
            1 => Self::Low,
            2 => Self::Medium,
            _ => Self::High,
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Low => 0.5,
            Self::Medium => 0.75,
            Self::High => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BantScore {
    pub budget: QualificationLevel,
    pub authority: QualificationLevel,
    pub need: QualificationLevel,
    pub timeline: QualificationLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Close,
    Present,
    Nurture,
    Disqualify,
}

impl BantScore {
    /// Score the concatenated user messages.
    pub fn from_history(history: &ConversationHistory) -> Self {
        let text = history.user_messages().collect::<Vec<_>>().join(" ").to_lowercase();
        let hits = |table: &[&str]| {
            table.iter().filter(|cue| matcher::entry_match(&text, cue)).count()
        };
        Self {
            budget: QualificationLevel::from_hits(hits(BUDGET_CUES)),
            authority: QualificationLevel::from_hits(hits(AUTHORITY_CUES)),
            need: QualificationLevel::from_hits(hits(NEED_CUES)),
            timeline: QualificationLevel::from_hits(hits(TIMELINE_CUES)),
        }
    }

    /// Mean of the four sub-scores, in [0,1].
    pub fn total(&self) -> f64 {
        (self.budget.score() + self.authority.score() + self.need.score() + self.timeline.score())
            / 4.0
    }

    pub fn is_qualified(&self) -> bool {
        self.total() >= 0.6
    }

    pub fn recommendation(&self) -> Recommendation {
        let total = self.total();
        if total >= 0.8 {
            Recommendation::Close
        } else if total >= 0.6 {
            Recommendation::Present
        } else if total >= 0.4 {
            Recommendation::Nurture
        } else {
            Recommendation::Disqualify
        }
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
    fn empty_history_scores_zero() {
        let score = BantScore::from_history(&history(&[]));
        assert_eq!(score.total(), 0.0);
        assert!(!score.is_qualified());
        assert_eq!(score.recommendation(), Recommendation::Disqualify);
    }

    #[test]
    fn strong_signals_recommend_close() {
        let score = BantScore::from_history(&history(&[
            "I'm the founder and I decide what we spend",
            "our budget covers the pro pricing",
            "we need this to solve a real problem with churn",
            "ideally rolling out this week, it's urgent, asap",
        ]));
        assert!(score.total() >= 0.8, "total was {}", score.total());
        assert!(score.is_qualified());
        assert_eq!(score.recommendation(), Recommendation::Close);
    }

    #[test]
    fn only_assistant_messages_do_not_count() {
        let mut h = ConversationHistory::default();
        h.push(Role::Assistant, "our pricing starts at $49 and fits any budget");
        let score = BantScore::from_history(&h);
        assert_eq!(score.total(), 0.0);
    }

    #[test]
    fn partial_signals_land_midband() {
        let score = BantScore::from_history(&history(&[
            "what does it cost",
            "we need something for onboarding",
        ]));
        let total = score.total();
        assert!(total > 0.0 && total < 0.8, "total was {total}");
    }
}
