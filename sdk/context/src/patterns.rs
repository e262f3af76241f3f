//! Compiled patterns and keyword tables used by the region classifiers.
//!
//! Tables are data, not code: classifiers consult these slices and regexes
//! so the matching rules live in exactly one place.

use once_cell::sync::Lazy;
use regex::Regex;

/// Currency-prefixed amount, e.g. "$49", "€1,299.00".
pub static PRICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[$\x{20AC}\x{00A3}\x{00A5}]\s*\d[\d,]*(?:\.\d{1,2})?").unwrap()
});

/// Amount followed by a currency code, e.g. "49 USD".
pub static PRICE_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d[\d,]*(?:\.\d{1,2})?\s*(?:USD|EUR|GBP|JPY)").unwrap()
});

/// Billing period suffixes: "/mo", "/month", "per month", "/yr", "annually".
pub static PERIOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(/\s*mo(?:nth)?\b|per\s+month|monthly|/\s*yr\b|/\s*year\b|per\s+year|annually|yearly)").unwrap()
});

/// Tokens in id/class/text that mark an element as pricing-related.
pub const PRICE_KEYWORDS: &[&str] = &["pricing", "price", "plan", "plans", "tier", "subscription"];

/// Tokens that mark a plan card as the highlighted one.
pub const POPULAR_MARKERS: &[&str] =
    &["popular", "most popular", "recommended", "best value", "most advanced"];

/// Badge-like list items excluded from per-plan feature lists.
pub const FEATURE_BADGE_TOKENS: &[&str] =
    &["popular", "most advanced", "recommended", "best value"];

pub const FEATURE_KEYWORDS: &[&str] =
    &["feature", "features", "benefits", "capabilities", "what you get", "why"];

pub const FAQ_KEYWORDS: &[&str] = &["faq", "faqs", "frequently asked", "questions"];

pub const ACCORDION_MARKERS: &[&str] = &["accordion", "collapse", "expandable", "toggle"];

pub const PRODUCT_CARD_KEYWORDS: &[&str] = &["product", "card", "item", "offer"];

/// Verbs that make a button-like element a call to action.
pub const CTA_VERBS: &[&str] = &[
    "get started", "start", "sign up", "signup", "try", "buy", "subscribe", "join", "book",
    "request", "contact", "demo", "upgrade", "download", "learn more",
];

pub const CTA_CLASSES: &[&str] = &["cta", "btn-primary", "button-primary", "hero-button"];

/// Words a question is likely to start with.
pub const QUESTION_STARTERS: &[&str] =
    &["what", "how", "why", "can", "do", "does", "is", "are", "when", "where", "who"];

/// Common English stop words filtered out of keyword ranking.
pub const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "your", "with", "this", "that", "from",
    "have", "has", "was", "were", "will", "can", "our", "all", "any", "get", "more", "about",
    "into", "than", "then", "them", "they", "their", "there", "what", "when", "how", "who",
    "out", "use", "its", "one", "two", "per",
];

/// Map a currency symbol to its ISO code.
pub fn currency_code(symbol: char) -> Option<&'static str> {
    match symbol {
        '$' => Some("USD"),
        '\u{20AC}' => Some("EUR"),
        '\u{00A3}' => Some("GBP"),
        '\u{00A5}' => Some("JPY"),
        _ => None,
    }
}

/// Case-insensitive containment of any keyword from `table`.
pub fn contains_any(haystack: &str, table: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    table.iter().any(|kw| lower.contains(kw))
}

/// Whether a line of text looks like a question.
pub fn is_question_shaped(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.ends_with('?') {
        return true;
    }
    let first = trimmed
        .split_whitespace()
        .next()
        .map(|w| w.to_lowercase())
        .unwrap_or_default();
    QUESTION_STARTERS.contains(&first.as_str())
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_regex_matches_symbols() {
        assert!(PRICE_RE.is_match("$49"));
        assert!(PRICE_RE.is_match("\u{20AC}1,299.00"));
        assert!(!PRICE_RE.is_match("Custom"));
    }

    #[test]
    fn period_regex_variants() {
        for sample in ["$49/mo", "$49 / month", "49 per month", "$490 annually"] {
            assert!(PERIOD_RE.is_match(sample), "no period in {sample}");
        }
    }

    #[test]
    fn question_shapes() {
        assert!(is_question_shaped("How does billing work?"));
        assert!(is_question_shaped("Can I cancel anytime"));
        assert!(!is_question_shaped("Simple pricing."));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
    }
}
