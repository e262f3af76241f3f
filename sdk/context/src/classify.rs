//! Region classifiers: pricing, feature lists, FAQs, product cards, CTAs.
//!
//! Each classifier is independent and swallow-on-error: a candidate that
//! trips an edge case is skipped, never fatal to the extraction pass.

use blitsum_core::{
    CtaInfo, FaqInfo, FeatureInfo, PageSnapshot, PriceInfo, PricingPlan, ProductInfo, Rect,
    Viewport,
};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::trace;

use crate::dom;
use crate::patterns;

static LI: Lazy<Selector> = Lazy::new(|| Selector::parse("li").unwrap());
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static BUTTONISH: Lazy<Selector> =
    Lazy::new(|| Selector::parse("button, a, [role=\"button\"], input[type=\"submit\"]").unwrap());
static DT: Lazy<Selector> = Lazy::new(|| Selector::parse("dt").unwrap());
static DD: Lazy<Selector> = Lazy::new(|| Selector::parse("dd").unwrap());
static SUMMARY: Lazy<Selector> = Lazy::new(|| Selector::parse("summary").unwrap());

const MAX_PLAN_FEATURES: usize = 15;
const MAX_FEATURE_NAME: usize = 100;
const MAX_FEATURE_DESC: usize = 200;
const MAX_FAQS: usize = 20;
const MAX_FAQ_ANSWER: usize = 300;
const MAX_PRODUCTS: usize = 20;
const MAX_CTAS: usize = 10;

/// Rank an element when multiple candidates compete for the same role.
///
/// Base 50; +30 fully in viewport; up to +20 inversely to scroll distance;
/// +20 proportional to viewport-area fraction capped at 0.5; +10 for
/// semantic tags; -20 for footer/aside.
pub fn relevance_score(tag: &str, rect: Option<Rect>, viewport: &Viewport) -> f64 {
    let mut score = 50.0;

    if let Some(rect) = rect {
        let top = viewport.scroll_y;
        let bottom = viewport.scroll_y + viewport.height;
        if rect.y >= top && rect.bottom() <= bottom {
            score += 30.0;
        } else {
            let distance = if rect.bottom() < top {
                top - rect.bottom()
            } else if rect.y > bottom {
                rect.y - bottom
            } else {
                0.0
            };
            score += 20.0 * (1.0 - (distance / viewport.page_height.max(1.0)).min(1.0));
        }

        let viewport_area = (viewport.width * viewport.height).max(1.0);
        let fraction = (rect.area() / viewport_area).min(0.5);
        score += 20.0 * fraction / 0.5;
    }

    match tag {
        "main" | "article" | "section" | "h1" | "h2" | "h3" => score += 10.0,
        "footer" | "aside" => score -= 20.0,
        _ => {}
    }

    score
}

fn visible_elements<'a>(doc: &'a Html) -> impl Iterator<Item = ElementRef<'a>> {
    doc.root_element().descendants().filter_map(ElementRef::wrap).filter(|el| {
        !dom::is_ignored_tag(el.value().name()) && !dom::is_hidden(el)
    })
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

fn distinct_price_matches(text: &str) -> usize {
    let mut seen: Vec<&str> = Vec::new();
    for m in patterns::PRICE_RE.find_iter(text) {
        if !seen.contains(&m.as_str()) {
            seen.push(m.as_str());
        }
    }
    seen.len()
}

fn is_pricing_container(el: &ElementRef) -> bool {
    let tokens = dom::id_class_tokens(el);
    let text = dom::element_text(el);
    let keyworded = patterns::contains_any(&tokens, patterns::PRICE_KEYWORDS)
        || patterns::contains_any(&text, patterns::PRICE_KEYWORDS);

    if keyworded && (patterns::PRICE_RE.is_match(&text) || text.to_lowercase().contains("custom")) {
        return true;
    }

    matches!(el.value().name(), "table" | "section") && distinct_price_matches(&text) >= 2
}

fn is_plan_card(el: &ElementRef) -> bool {
    dom::plan_heading(el).is_some() && dom::parse_price(&dom::element_text(el)).is_some()
}

pub fn extract_pricing(doc: &Html, snapshot: &PageSnapshot) -> Vec<PricingPlan> {
    let mut containers: Vec<ElementRef> =
        visible_elements(doc).filter(is_pricing_container).collect();
    if containers.is_empty() {
        return Vec::new();
    }

    // When several containers qualify, the most relevant one is extracted.
    containers.sort_by(|a, b| {
        let score = |el: &ElementRef| {
            let handle = dom::handle_for(doc, *el);
            relevance_score(el.value().name(), snapshot.bounds.get(&handle).copied(), &snapshot.viewport)
        };
        score(b).partial_cmp(&score(a)).unwrap_or(std::cmp::Ordering::Equal)
    });
    let container = containers[0];

    let mut plans = Vec::new();
    for card in container.descendants().filter_map(ElementRef::wrap) {
        if !is_plan_card(&card) || dom::is_hidden(&card) {
            continue;
        }
        // Innermost qualifying element wins; a wrapper around several cards
        // is skipped in favor of the cards themselves.
        let has_inner_card = card
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|inner| inner.id() != card.id())
            .any(|inner| is_plan_card(&inner));
        if has_inner_card {
            continue;
        }

        let text = dom::element_text(&card);
        let Some(plan_name) = dom::plan_heading(&card) else { continue };
        let price = dom::parse_price(&text).unwrap_or_else(PriceInfo::custom);

        let features: Vec<String> = card
            .select(&LI)
            .map(|li| dom::element_text(&li))
            .filter(|t| (3..=200).contains(&t.chars().count()))
            .filter(|t| !patterns::contains_any(t, patterns::FEATURE_BADGE_TOKENS))
            .take(MAX_PLAN_FEATURES)
            .collect();

        let class_tokens = dom::id_class_tokens(&card);
        let popular = patterns::contains_any(&text, patterns::POPULAR_MARKERS)
            || patterns::contains_any(&class_tokens, patterns::POPULAR_MARKERS);

        plans.push(PricingPlan {
            plan: plan_name,
            price,
            features,
            popular,
            handle: Some(dom::handle_for(doc, card)),
        });
    }

    trace!(plans = plans.len(), "pricing extraction complete");
    plans
}

// ---------------------------------------------------------------------------
// Feature lists
// ---------------------------------------------------------------------------

struct FeatureItem {
    name: String,
    description: String,
}

fn feature_item(el: &ElementRef) -> Option<FeatureItem> {
    let heading = dom::first_heading(el)?;
    let full = dom::element_text(el);
    let body = full.replacen(&heading, "", 1).trim().to_string();
    if body.chars().count() < 20 {
        return None;
    }
    Some(FeatureItem { name: heading, description: body })
}

fn is_list_or_grid(el: &ElementRef) -> bool {
    matches!(el.value().name(), "ul" | "ol")
        || dom::id_class_tokens(el).split_whitespace().any(|t| t.contains("grid") || t.contains("list"))
}

pub fn extract_features(doc: &Html) -> Vec<FeatureInfo> {
    let mut features: Vec<FeatureInfo> = Vec::new();

    for el in visible_elements(doc) {
        let tokens = dom::id_class_tokens(&el);
        let keyworded = patterns::contains_any(&tokens, patterns::FEATURE_KEYWORDS)
            || dom::first_heading(&el)
                .map(|h| patterns::contains_any(&h, patterns::FEATURE_KEYWORDS))
                .unwrap_or(false);

        let items: Vec<(ElementRef, FeatureItem)> = el
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|c| !dom::is_hidden(c))
            .filter_map(|c| feature_item(&c).map(|item| (c, item)))
            .collect();

        let qualifies = (keyworded && is_list_or_grid(&el)) || items.len() >= 3;
        if !qualifies {
            continue;
        }

        for (child, item) in items {
            let name = patterns::truncate_chars(&item.name, MAX_FEATURE_NAME);
            if features.iter().any(|f: &FeatureInfo| f.name.eq_ignore_ascii_case(&name)) {
                continue;
            }
            features.push(FeatureInfo {
                name,
                description: patterns::truncate_chars(&item.description, MAX_FEATURE_DESC),
                handle: Some(dom::handle_for(doc, child)),
            });
        }
    }

    features
}

// ---------------------------------------------------------------------------
// FAQs
// ---------------------------------------------------------------------------

fn question_children(el: &ElementRef) -> usize {
    el.descendants()
        .filter_map(ElementRef::wrap)
        .filter(|c| {
            let text = dom::element_text(c);
            !text.is_empty() && text.chars().count() < 200 && patterns::is_question_shaped(&text)
        })
        .count()
}

fn is_faq_container(el: &ElementRef) -> bool {
    if el.value().name() == "dl" {
        return el.select(&DT).count() >= 2;
    }
    let tokens = dom::id_class_tokens(el);
    let heading = dom::first_heading(el).unwrap_or_default();
    let keyworded = patterns::contains_any(&tokens, patterns::FAQ_KEYWORDS)
        || patterns::contains_any(&heading, patterns::FAQ_KEYWORDS);
    let accordion = patterns::contains_any(&tokens, patterns::ACCORDION_MARKERS);

    (keyworded || accordion) && question_children(el) >= 2
}

fn faqs_from_dl(el: &ElementRef) -> Vec<FaqInfo> {
    let questions: Vec<String> = el.select(&DT).map(|dt| dom::element_text(&dt)).collect();
    let answers: Vec<String> = el.select(&DD).map(|dd| dom::element_text(&dd)).collect();
    questions
        .into_iter()
        .zip(answers)
        .map(|(question, answer)| FaqInfo {
            question,
            answer: patterns::truncate_chars(&answer, MAX_FAQ_ANSWER),
        })
        .collect()
}

fn faqs_from_children(el: &ElementRef) -> Vec<FaqInfo> {
    // details/summary pairs first, then adjacent question/answer children.
    let mut faqs = Vec::new();
    for child in el.children().filter_map(ElementRef::wrap) {
        if child.value().name() == "details" {
            if let Some(summary) = child.select(&SUMMARY).next() {
                let question = dom::element_text(&summary);
                let answer = dom::element_text(&child).replacen(&question, "", 1).trim().to_string();
                if patterns::is_question_shaped(&question) && !answer.is_empty() {
                    faqs.push(FaqInfo {
                        question,
                        answer: patterns::truncate_chars(&answer, MAX_FAQ_ANSWER),
                    });
                }
            }
        }
    }
    if !faqs.is_empty() {
        return faqs;
    }

    let children: Vec<ElementRef> = el.children().filter_map(ElementRef::wrap).collect();
    let mut i = 0;
    while i < children.len() {
        let text = dom::element_text(&children[i]);
        if patterns::is_question_shaped(&text) && text.chars().count() < 200 {
            if let Some(next) = children.get(i + 1) {
                let answer = dom::element_text(next);
                if !answer.is_empty() && !patterns::is_question_shaped(&answer) {
                    faqs.push(FaqInfo {
                        question: text,
                        answer: patterns::truncate_chars(&answer, MAX_FAQ_ANSWER),
                    });
                    i += 2;
                    continue;
                }
            }
        }
        i += 1;
    }
    faqs
}

pub fn extract_faqs(doc: &Html) -> Vec<FaqInfo> {
    let mut faqs = Vec::new();
    for el in visible_elements(doc) {
        if !is_faq_container(&el) {
            continue;
        }
        let mut found = if el.value().name() == "dl" {
            faqs_from_dl(&el)
        } else {
            faqs_from_children(&el)
        };
        faqs.append(&mut found);
        if faqs.len() >= MAX_FAQS {
            break;
        }
    }
    faqs.truncate(MAX_FAQS);
    faqs
}

// ---------------------------------------------------------------------------
// Product cards
// ---------------------------------------------------------------------------

fn is_product_card(el: &ElementRef, rect: Option<Rect>) -> bool {
    let has_heading = dom::first_heading(el).is_some();
    if !has_heading {
        return false;
    }
    let has_image = el.select(&IMG).next().is_some();
    let has_button = el.select(&BUTTONISH).next().is_some();
    let text = dom::element_text(el);
    let has_price = dom::parse_price(&text).map(|p| !p.is_custom()).unwrap_or(false);

    let tokens = dom::id_class_tokens(el);
    if patterns::contains_any(&tokens, patterns::PRODUCT_CARD_KEYWORDS) && (has_image || has_button) {
        return true;
    }
    if has_price && has_button {
        return true;
    }
    if let Some(rect) = rect {
        let area = rect.area();
        let text_len = text.chars().count();
        if (10_000.0..=500_000.0).contains(&area)
            && has_image
            && (50..=500).contains(&text_len)
        {
            return true;
        }
    }
    false
}

pub fn extract_products(doc: &Html, snapshot: &PageSnapshot) -> Vec<ProductInfo> {
    let mut products = Vec::new();
    for el in visible_elements(doc) {
        let handle = dom::handle_for(doc, el);
        let rect = snapshot.bounds.get(&handle).copied();
        if !is_product_card(&el, rect) {
            continue;
        }
        let Some(name) = dom::first_heading(&el) else { continue };
        let text = dom::element_text(&el);
        let description = patterns::truncate_chars(text.replacen(&name, "", 1).trim(), MAX_FEATURE_DESC);
        let price = dom::parse_price(&text).map(|p| p.raw);
        let image = el.select(&IMG).next().and_then(|img| img.value().attr("src")).map(str::to_string);

        if products.iter().any(|p: &ProductInfo| p.name.eq_ignore_ascii_case(&name)) {
            continue;
        }
        products.push(ProductInfo { name, description, price, image, handle: Some(handle) });
        if products.len() >= MAX_PRODUCTS {
            break;
        }
    }
    products
}

// ---------------------------------------------------------------------------
// CTAs
// ---------------------------------------------------------------------------

fn has_prominent_typography(el: &ElementRef) -> bool {
    if let Some(style) = el.value().attr("style") {
        let style = style.replace(' ', "").to_lowercase();
        if let Some(idx) = style.find("font-size:") {
            let rest = &style[idx + "font-size:".len()..];
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.parse::<u32>().map(|px| px >= 18).unwrap_or(false) {
                return true;
            }
        }
    }
    dom::id_class_tokens(el)
        .split_whitespace()
        .any(|t| t.contains("hero") || t.ends_with("-lg") || t.contains("large"))
}

pub fn extract_ctas(doc: &Html) -> Vec<CtaInfo> {
    let mut ctas = Vec::new();
    for el in doc.select(&BUTTONISH) {
        if dom::is_hidden(&el) {
            continue;
        }
        let text = dom::element_text(&el);
        if text.is_empty() || text.chars().count() > 60 {
            continue;
        }
        let tokens = dom::id_class_tokens(&el);
        let qualifies = patterns::contains_any(&text, patterns::CTA_VERBS)
            || patterns::contains_any(&tokens, patterns::CTA_CLASSES)
            || has_prominent_typography(&el);
        if !qualifies {
            continue;
        }
        ctas.push(CtaInfo {
            text,
            href: el.value().attr("href").map(str::to_string),
            tag: el.value().name().to_string(),
            handle: Some(dom::handle_for(doc, el)),
        });
        if ctas.len() >= MAX_CTAS {
            break;
        }
    }
    ctas
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRICING_PAGE: &str = r#"
        <html><body>
        <section id="pricing" class="pricing">
            <h2>Simple pricing</h2>
            <div class="pricing-card"><h4>Starter</h4><div class="price">$49/mo</div>
                <ul><li>1 seat</li><li>Email support</li></ul></div>
            <div class="pricing-card featured"><h4>Pro</h4><div class="price">$199/mo</div>
                <span class="badge">Most Popular</span>
                <ul><li>10 seats</li><li>Most Popular</li><li>Priority support</li></ul></div>
            <div class="pricing-card"><h4>Enterprise</h4><div class="price">Custom</div>
                <ul><li>Unlimited seats</li><li>SLA</li></ul></div>
        </section>
        </body></html>"#;

    fn snapshot_for(html: &str) -> PageSnapshot {
        PageSnapshot::new("https://example.com", html, Viewport::default())
    }

    #[test]
    fn extracts_three_plan_cards() {
        let doc = Html::parse_document(PRICING_PAGE);
        let plans = extract_pricing(&doc, &snapshot_for(PRICING_PAGE));
        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0].plan, "Starter");
        assert_eq!(plans[1].plan, "Pro");
        assert_eq!(plans[2].plan, "Enterprise");
        assert_eq!(plans[1].price.value, Some(199.0));
        assert!(plans[2].price.is_custom());
    }

    #[test]
    fn popular_marker_detected() {
        let doc = Html::parse_document(PRICING_PAGE);
        let plans = extract_pricing(&doc, &snapshot_for(PRICING_PAGE));
        assert!(!plans[0].popular);
        assert!(plans[1].popular);
    }

    #[test]
    fn badge_tokens_excluded_from_plan_features() {
        let doc = Html::parse_document(PRICING_PAGE);
        let plans = extract_pricing(&doc, &snapshot_for(PRICING_PAGE));
        assert_eq!(plans[1].features, vec!["10 seats", "Priority support"]);
    }

    #[test]
    fn feature_grid_requires_three_structured_children() {
        let two = r#"<div class="grid">
            <div><h3>Fast</h3><p>Sub-millisecond responses on every request.</p></div>
            <div><h3>Safe</h3><p>Encrypted at rest and in transit, always.</p></div>
        </div>"#;
        let doc = Html::parse_document(two);
        assert!(extract_features(&doc).is_empty());

        let three = r#"<div class="cards">
            <div><h3>Fast</h3><p>Sub-millisecond responses on every request.</p></div>
            <div><h3>Safe</h3><p>Encrypted at rest and in transit, always.</p></div>
            <div><h3>Simple</h3><p>Integrate with five lines of code today.</p></div>
        </div>"#;
        let doc = Html::parse_document(three);
        let features = extract_features(&doc);
        assert_eq!(features.len(), 3);
        assert_eq!(features[0].name, "Fast");
    }

    #[test]
    fn faq_from_definition_list() {
        let html = r#"<dl>
            <dt>How does billing work?</dt><dd>Monthly, cancel anytime.</dd>
            <dt>Can I export my data?</dt><dd>Yes, as CSV or JSON.</dd>
        </dl>"#;
        let doc = Html::parse_document(html);
        let faqs = extract_faqs(&doc);
        assert_eq!(faqs.len(), 2);
        assert_eq!(faqs[0].question, "How does billing work?");
    }

    #[test]
    fn ctas_capped_and_classified() {
        let html = r#"<div>
            <a class="btn btn-primary" href="/signup">Get Started</a>
            <button>Try it free</button>
            <a href="/docs">Documentation</a>
        </div>"#;
        let doc = Html::parse_document(html);
        let ctas = extract_ctas(&doc);
        assert_eq!(ctas.len(), 2);
        assert_eq!(ctas[0].text, "Get Started");
        assert_eq!(ctas[0].href.as_deref(), Some("/signup"));
    }

    #[test]
    fn relevance_prefers_in_viewport_semantic_tags() {
        let viewport = Viewport { width: 1280.0, height: 720.0, scroll_y: 0.0, page_height: 4000.0 };
        let visible = Rect { x: 0.0, y: 100.0, width: 600.0, height: 400.0 };
        let far = Rect { x: 0.0, y: 3500.0, width: 600.0, height: 400.0 };
        let near_score = relevance_score("section", Some(visible), &viewport);
        let far_score = relevance_score("div", Some(far), &viewport);
        assert!(near_score > far_score);
        assert!(relevance_score("footer", Some(visible), &viewport) < near_score);
    }
}
