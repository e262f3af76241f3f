//! Small helpers over `scraper` elements: visibility, text, stable handles.

use blitsum_core::{ElementHandle, PriceInfo, BillingPeriod};
use scraper::{ElementRef, Html, Selector};

use crate::patterns;

const IGNORED_TAGS: &[&str] =
    &["script", "style", "noscript", "template", "head", "meta", "link", "title"];

/// Tags that never contribute visible content.
pub fn is_ignored_tag(name: &str) -> bool {
    IGNORED_TAGS.contains(&name)
}

/// Computed-invisibility approximation over static markup: inline style,
/// the `hidden` attribute, and `aria-hidden`.
pub fn is_hidden(el: &ElementRef) -> bool {
    if el.value().attr("hidden").is_some() {
        return true;
    }
    if el.value().attr("aria-hidden") == Some("true") {
        return true;
    }
    if let Some(style) = el.value().attr("style") {
        let style = style.replace(' ', "").to_lowercase();
        if style.contains("display:none")
            || style.contains("visibility:hidden")
            || style.contains("opacity:0;")
            || style.ends_with("opacity:0")
        {
            return true;
        }
    }
    false
}

/// Whitespace-normalized visible text of an element.
pub fn element_text(el: &ElementRef) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Space-joined class attribute.
pub fn class_string(el: &ElementRef) -> String {
    el.value().classes().collect::<Vec<_>>().join(" ")
}

/// Combined id + class tokens, lowercased, for keyword classification.
pub fn id_class_tokens(el: &ElementRef) -> String {
    let id = el.value().id().unwrap_or_default();
    format!("{} {}", id, class_string(el)).to_lowercase()
}

fn selector_safe(token: &str) -> bool {
    !token.is_empty()
        && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && !token.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(true)
}

/// Build a stable handle for an element: `#id` when the id is selector-safe,
/// otherwise tag plus up to two classes, disambiguated by match index.
pub fn handle_for(doc: &Html, el: ElementRef) -> ElementHandle {
    if let Some(id) = el.value().id() {
        if selector_safe(id) {
            return ElementHandle::new(format!("#{id}"), 0);
        }
    }

    let tag = el.value().name();
    let classes: Vec<&str> = el.value().classes().filter(|c| selector_safe(c)).take(2).collect();
    let selector = if classes.is_empty() {
        tag.to_string()
    } else {
        format!("{tag}.{}", classes.join("."))
    };

    let node_index = Selector::parse(&selector)
        .ok()
        .and_then(|sel| doc.select(&sel).position(|e| e.id() == el.id()))
        .unwrap_or(0);

    ElementHandle::new(selector, node_index)
}

/// First heading (h1..h6) inside the element, preferring `h4` for plan
/// cards, then any heading in document order.
pub fn plan_heading(el: &ElementRef) -> Option<String> {
    static H4: once_cell::sync::Lazy<Selector> =
        once_cell::sync::Lazy::new(|| Selector::parse("h4").unwrap());
    static ANY: once_cell::sync::Lazy<Selector> =
        once_cell::sync::Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());

    if let Some(h) = el.select(&H4).next() {
        let text = element_text(&h);
        if !text.is_empty() {
            return Some(text);
        }
    }
    el.select(&ANY).next().map(|h| element_text(&h)).filter(|t| !t.is_empty())
}

pub fn first_heading(el: &ElementRef) -> Option<String> {
    static ANY: once_cell::sync::Lazy<Selector> =
        once_cell::sync::Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());
    el.select(&ANY).next().map(|h| element_text(&h)).filter(|t| !t.is_empty())
}

/// Parse a displayed price out of free text. Returns `None` when neither a
/// currency amount nor a "Custom" marker is present.
pub fn parse_price(text: &str) -> Option<PriceInfo> {
    if let Some(m) = patterns::PRICE_RE.find(text) {
        let raw = m.as_str().trim().to_string();
        let symbol = raw.chars().next()?;
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
        let value = digits.parse::<f64>().ok();
        let period = parse_period(text);
        return Some(PriceInfo {
            raw,
            value,
            currency: patterns::currency_code(symbol).map(str::to_string),
            period,
        });
    }
    if let Some(m) = patterns::PRICE_CODE_RE.find(text) {
        let raw = m.as_str().trim().to_string();
        let digits: String = raw.chars().take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
            .filter(|c| *c != ',')
            .collect();
        let code = raw.split_whitespace().last().map(str::to_string);
        return Some(PriceInfo {
            raw,
            value: digits.parse::<f64>().ok(),
            currency: code,
            period: parse_period(text),
        });
    }
    if text.to_lowercase().contains("custom") {
        return Some(PriceInfo::custom());
    }
    None
}

fn parse_period(text: &str) -> Option<BillingPeriod> {
    let m = patterns::PERIOD_RE.find(text)?;
    let token = m.as_str().to_lowercase();
    if token.contains("mo") {
        Some(BillingPeriod::Monthly)
    } else {
        Some(BillingPeriod::Yearly)
    }
}
