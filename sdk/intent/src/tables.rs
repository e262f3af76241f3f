//! Keyword tables driving intent and target classification. Data, not code:
//! changing what counts as a "compare" utterance means editing a slice here.

use blitsum_core::{IntentKind, TargetKind};

pub const INTENT_GROUPS: &[(IntentKind, &[&str])] = &[
    (
        IntentKind::Navigate,
        &["show", "go", "take", "navigate", "scroll", "find", "where", "view", "see", "look"],
    ),
    (
        IntentKind::Compare,
        &["compare", "versus", "vs", "difference", "differences", "between"],
    ),
    (IntentKind::Highlight, &["highlight", "point", "emphasize", "focus"]),
    (IntentKind::Read, &["read", "tell", "say", "explain", "describe", "what does"]),
    (IntentKind::Click, &["click", "press", "tap", "open"]),
];

pub const TARGET_GROUPS: &[(TargetKind, &[&str])] = &[
    (
        TargetKind::Pricing,
        &["pricing", "price", "prices", "plan", "plans", "cost", "costs", "tier", "subscription"],
    ),
    (
        TargetKind::Features,
        &["feature", "features", "capabilities", "functionality"],
    ),
    (
        TargetKind::Signup,
        &["signup", "sign up", "register", "registration", "get started", "trial"],
    ),
    (TargetKind::Contact, &["contact", "support", "reach", "email"]),
    (TargetKind::About, &["about", "company", "team", "story"]),
    (TargetKind::Faq, &["faq", "faqs", "question", "questions"]),
    (TargetKind::Product, &["product", "products", "item", "items"]),
    (TargetKind::Cta, &["button", "buttons", "cta"]),
];

/// Plan names recognized even when the page context has no pricing section.
pub const COMMON_PLAN_NAMES: &[&str] = &[
    "starter", "basic", "free", "pro", "professional", "premium", "plus", "team", "business",
    "enterprise",
];

/// Per-target keyword lists used by `find_section_by_type`.
pub fn section_keywords(target: TargetKind) -> &'static [&'static str] {
    match target {
        TargetKind::Pricing => &["pricing", "price", "plans"],
        TargetKind::Features => &["features", "capabilities", "benefits"],
        TargetKind::Signup => &["signup", "sign-up", "register", "get-started", "cta"],
        TargetKind::Contact => &["contact", "support"],
        TargetKind::About => &["about", "company", "team"],
        TargetKind::Faq => &["faq", "faqs", "questions"],
        TargetKind::Product => &["products", "product", "shop", "catalog"],
        TargetKind::Cta => &["cta", "action"],
        TargetKind::Unknown => &[],
    }
}
