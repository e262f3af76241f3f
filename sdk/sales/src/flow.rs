//! Conversation stage machine.
//!
//! Keyword cues move the stage directly; without a cue the stage progresses
//! with the message count, except that objection and closing are sticky:
//! only an explicit cue leaves them.

use blitsum_core::ConversationStage;
use blitsum_intent::matcher;
use tracing::debug;

const CLOSING_CUES: &[&str] =
    &["sign up", "get started", "buy", "purchase", "trial", "subscribe", "join"];

const OBJECTION_CUES: &[&str] =
    &["but", "however", "expensive", "not sure", "concern", "worried", "doubt", "hesitant"];

const QUALIFICATION_CUES: &[&str] =
    &["price", "cost", "how much", "budget", "when", "timeline", "team size"];

const PRESENTATION_CUES: &[&str] =
    &["features", "how does", "show me", "demo", "capabilities", "what can"];

const DISCOVERY_CUES: &[&str] = &["what", "tell me", "explain", "help", "looking for", "need"];

pub struct ConversationFlow {
    stage: ConversationStage,
    stage_history: Vec<ConversationStage>,
}

impl ConversationFlow {
    pub fn new() -> Self {
        Self {
            stage: ConversationStage::Greeting,
            stage_history: vec![ConversationStage::Greeting],
        }
    }

    pub fn stage(&self) -> ConversationStage {
        self.stage
    }

    pub fn stage_history(&self) -> &[ConversationStage] {
        &self.stage_history
    }

    pub fn reset(&mut self) {
        self.stage = ConversationStage::Greeting;
        self.stage_history = vec![ConversationStage::Greeting];
    }

    /// Process one user utterance. `user_messages` counts messages before
    /// this one.
    pub fn advance(&mut self, utterance: &str, user_messages: usize) -> ConversationStage {
        let next = self.classify(utterance, user_messages);
        if next != self.stage {
            debug!(from = self.stage.as_str(), to = next.as_str(), "stage transition");
            self.stage = next;
            self.stage_history.push(next);
        }
        self.stage
    }

    fn classify(&self, utterance: &str, user_messages: usize) -> ConversationStage {
        let text = utterance.to_lowercase();
        let hit = |table: &[&str]| table.iter().any(|cue| matcher::entry_match(&text, cue));

        if hit(CLOSING_CUES) {
            return ConversationStage::Closing;
        }
        if hit(OBJECTION_CUES) {
            return ConversationStage::Objection;
        }
        if hit(QUALIFICATION_CUES) {
            return ConversationStage::Qualification;
        }
        if hit(PRESENTATION_CUES) {
            return ConversationStage::Presentation;
        }
        if hit(DISCOVERY_CUES) {
            return ConversationStage::Discovery;
        }

        // No cue. Objection and closing never relax on their own.
        if matches!(self.stage, ConversationStage::Objection | ConversationStage::Closing) {
            return self.stage;
        }
        match user_messages {
            0 => ConversationStage::Greeting,
            1 => ConversationStage::Discovery,
            2 => ConversationStage::Qualification,
            _ => ConversationStage::Presentation,
        }
    }

    /// Stage-specific guidance block for the system prompt.
    pub fn prompt_fragment(&self) -> &'static str {
        stage_prompt(self.stage)
    }
}

impl Default for ConversationFlow {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stage_prompt(stage: ConversationStage) -> &'static str {
    match stage {
        ConversationStage::Greeting => {
            "STAGE: greeting\n\
             Objective: make the visitor feel welcome and invite a first question.\n\
             Tactics: be brief, warm, reference what the page offers.\n\
             Example: \"Hi! Want a quick tour of the plans, or do you have a question?\""
        }
        ConversationStage::Discovery => {
            "STAGE: discovery\n\
             Objective: learn what brought the visitor here and what they're solving.\n\
             Tactics: open questions, mirror their words, no pitching yet.\n\
             Example: \"What are you hoping to improve with a tool like this?\""
        }
        ConversationStage::Qualification => {
            "STAGE: qualification\n\
             Objective: understand budget, decision authority, need and timeline.\n\
             Tactics: one qualifying question at a time, tie answers to plans.\n\
             Example: \"Roughly how many people would use this on your team?\""
        }
        ConversationStage::Presentation => {
            "STAGE: presentation\n\
             Objective: show the features and plan that fit what they told you.\n\
             Tactics: anchor on their stated need, demonstrate on the page.\n\
             Example: \"Given your team size, Pro fits well. Want me to show it?\""
        }
        ConversationStage::Objection => {
            "STAGE: objection\n\
             Objective: understand the hesitation and address it honestly.\n\
             Tactics: acknowledge first, answer with page facts, never argue.\n\
             Example: \"Fair concern. The Starter plan is a low-risk way to test it.\""
        }
        ConversationStage::Closing => {
            "STAGE: closing\n\
             Objective: make the next step effortless.\n\
             Tactics: one clear call to action, remove friction, confirm choice.\n\
             Example: \"Shall I take you to signup for the Pro plan?\""
        }
        ConversationStage::Completed => {
            "STAGE: completed\n\
             Objective: wrap up gracefully and stay available.\n\
             Tactics: thank them, offer help if anything comes up.\n\
             Example: \"You're all set. I'm here if you need anything else.\""
        }
    }
}
