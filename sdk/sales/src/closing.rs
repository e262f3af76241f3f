//! Closing technique selection and the action bundle that goes with it.

use blitsum_core::{
    ActionKind, BudgetLevel, CompanySize, PageContext, PlannedAction, UserProfile, UserType,
    Urgency,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bant::BantScore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosingTechnique {
    Assumptive,
    Alternative,
    Urgency,
    Trial,
    Direct,
    Summary,
    Takeaway,
    PuppyDog,
}

#[derive(Debug, Clone)]
pub struct ClosingPlan {
    pub technique: ClosingTechnique,
    pub statement: String,
    pub actions: Vec<PlannedAction>,
    pub follow_up: String,
}

/// Decision table for which close to run.
pub fn select_technique(bant: &BantScore, profile: &UserProfile) -> ClosingTechnique {
    if bant.total() >= 0.8 && profile.objections.is_empty() {
        return ClosingTechnique::Direct;
    }
    if profile.user_type == UserType::Buyer && profile.urgency == Urgency::High {
        return ClosingTechnique::Urgency;
    }
    if profile.user_type == UserType::Skeptic {
        return ClosingTechnique::PuppyDog;
    }
    if profile.objections.len() > 2 {
        return ClosingTechnique::Summary;
    }
    ClosingTechnique::Assumptive
}

/// The plan to steer toward: enterprise buyers get the top tier, startups
/// and tight budgets the first, everyone else the popular or middle one.
pub fn recommended_plan<'a>(ctx: &'a PageContext, profile: &UserProfile) -> Option<&'a str> {
    let plans = &ctx.content.pricing;
    if plans.is_empty() {
        return None;
    }
    let plan = if profile.company_size == CompanySize::Enterprise {
        plans.last()
    } else if profile.company_size == CompanySize::Startup || profile.budget == BudgetLevel::Low {
        plans.first()
    } else {
        plans.iter().find(|p| p.popular).or_else(|| plans.get(plans.len() / 2))
    };
    plan.map(|p| p.plan.as_str())
}

fn statement(technique: ClosingTechnique, plan: &str) -> String {
    match technique {
        ClosingTechnique::Direct => {
            format!("You've seen everything you need. Shall we get you set up on {plan}?")
        }
        ClosingTechnique::Assumptive => {
            format!("Based on what you've told me, {plan} is the right fit. I'll take you to signup.")
        }
        ClosingTechnique::Alternative => {
            format!("Would you rather start on {plan}, or go one tier up for the extra room?")
        }
        ClosingTechnique::Urgency => {
            format!("You said timing matters, so let's not lose the week. {plan} takes two minutes to set up.")
        }
        ClosingTechnique::Trial => {
            format!("The easiest way to know is to try it. {plan} comes with a free trial, no card needed.")
        }
        ClosingTechnique::Summary => {
            format!(
                "To recap what mattered to you: the fit, the support, and the price point. \
                 {plan} covers all three. Ready to start?"
            )
        }
        ClosingTechnique::Takeaway => {
            format!("If {plan} feels like more than you need, it's fine to start smaller and grow into it.")
        }
        ClosingTechnique::PuppyDog => {
            format!("No commitment needed. Take {plan} for a spin and keep it only if it earns its place.")
        }
    }
}

fn follow_up(technique: ClosingTechnique) -> String {
    match technique {
        ClosingTechnique::Direct | ClosingTechnique::Assumptive => {
            "Want me to walk you through signup?".to_string()
        }
        ClosingTechnique::Urgency => "Should I open signup so you're live today?".to_string(),
        ClosingTechnique::Trial | ClosingTechnique::PuppyDog => {
            "Shall I start the trial for you?".to_string()
        }
        ClosingTechnique::Alternative => "Which of the two sounds closer?".to_string(),
        ClosingTechnique::Summary => "Did I miss anything that still worries you?".to_string(),
        ClosingTechnique::Takeaway => "Want to look at the smaller plan together?".to_string(),
    }
}

/// Build the full closing move: the statement plus page actions that always
/// steer to pricing and pulse the signup button, focusing the recommended
/// plan when there is one.
pub fn build_plan(
    bant: &BantScore,
    profile: &UserProfile,
    ctx: &PageContext,
) -> ClosingPlan {
    let technique = select_technique(bant, profile);
    let plan_name = recommended_plan(ctx, profile).unwrap_or("the recommended plan");

    let mut actions = vec![
        PlannedAction::new(ActionKind::Navigate, Some("pricing".to_string())),
        PlannedAction::new(ActionKind::Pulse, Some("signup button".to_string())),
    ];
    if recommended_plan(ctx, profile).is_some() {
        actions.push(PlannedAction::new(ActionKind::Focus, Some(plan_name.to_string())));
    }

    debug!(?technique, plan = plan_name, "closing plan built");
    ClosingPlan {
        technique,
        statement: statement(technique, plan_name),
        actions,
        follow_up: follow_up(technique),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blitsum_core::{ConversationHistory, PriceInfo, PricingPlan, Role};

    fn ctx_with_plans(plans: &[(&str, bool)]) -> PageContext {
        let mut ctx = PageContext::default();
        for (name, popular) in plans {
            ctx.content.pricing.push(PricingPlan {
                plan: name.to_string(),
                price: PriceInfo::default(),
                features: vec![],
                popular: *popular,
                handle: None,
            });
        }
        ctx
    }

    fn qualified_bant() -> BantScore {
        let mut history = ConversationHistory::default();
        history.push(
            Role::User,
            "I'm the founder, we have budget, we need it now, rollout this week is urgent, asap, \
             it solves a real problem and the price works",
        );
        BantScore::from_history(&history)
    }

    #[test]
    fn direct_close_when_qualified_and_unopposed() {
        let profile = UserProfile::default();
        assert_eq!(select_technique(&qualified_bant(), &profile), ClosingTechnique::Direct);
    }

    #[test]
    fn skeptics_get_puppy_dog() {
        let profile = UserProfile { user_type: UserType::Skeptic, ..Default::default() };
        let bant = BantScore::from_history(&ConversationHistory::default());
        assert_eq!(select_technique(&bant, &profile), ClosingTechnique::PuppyDog);
    }

    #[test]
    fn many_objections_get_summary() {
        let profile = UserProfile {
            objections: vec!["a".into(), "b".into(), "c".into()],
            ..Default::default()
        };
        let bant = BantScore::from_history(&ConversationHistory::default());
        assert_eq!(select_technique(&bant, &profile), ClosingTechnique::Summary);
    }

    #[test]
    fn urgent_buyers_get_urgency_close() {
        let profile = UserProfile {
            user_type: UserType::Buyer,
            urgency: Urgency::High,
            objections: vec!["too expensive".into()],
            ..Default::default()
        };
        assert_eq!(select_technique(&qualified_bant(), &profile), ClosingTechnique::Urgency);
    }

    #[test]
    fn enterprise_gets_last_plan_startup_gets_first() {
        let ctx = ctx_with_plans(&[("Starter", false), ("Pro", true), ("Enterprise", false)]);
        let enterprise =
            UserProfile { company_size: CompanySize::Enterprise, ..Default::default() };
        assert_eq!(recommended_plan(&ctx, &enterprise), Some("Enterprise"));

        let startup = UserProfile { company_size: CompanySize::Startup, ..Default::default() };
        assert_eq!(recommended_plan(&ctx, &startup), Some("Starter"));

        let unknown = UserProfile::default();
        assert_eq!(recommended_plan(&ctx, &unknown), Some("Pro"));
    }

    #[test]
    fn closing_actions_always_include_pricing_and_pulse() {
        let ctx = ctx_with_plans(&[("Starter", false), ("Pro", true)]);
        let plan = build_plan(&qualified_bant(), &UserProfile::default(), &ctx);
        assert_eq!(plan.technique, ClosingTechnique::Direct);
        assert_eq!(plan.actions[0].kind, ActionKind::Navigate);
        assert_eq!(plan.actions[0].target.as_deref(), Some("pricing"));
        assert_eq!(plan.actions[1].kind, ActionKind::Pulse);
        assert_eq!(plan.actions[2].kind, ActionKind::Focus);
        assert_eq!(plan.actions[2].target.as_deref(), Some("Pro"));
        assert!(plan.statement.contains("Pro"));
    }
}
