//! Element resolution: description → handle, trying page-context names
//! first, then semantic section scoring, then raw DOM lookups.

use blitsum_core::{ElementHandle, PageContext, TargetKind};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::matcher;
use crate::tables;

static SECTIONISH: Lazy<Selector> =
    Lazy::new(|| Selector::parse("section, article, main, div[id], div[class]").unwrap());

/// Fraction of query tokens that must appear in a section's text for the
/// semantic strategy to accept it.
const SEMANTIC_THRESHOLD: f64 = 0.3;

pub struct ElementFinder;

impl ElementFinder {
    /// Resolve a free-text description to an element handle.
    pub fn find(description: &str, ctx: &PageContext, doc: &Html) -> Option<ElementHandle> {
        if let Some(handle) = Self::context_search(description, ctx) {
            debug!(%description, %handle, "resolved via page context");
            return Some(handle);
        }
        if let Some(handle) = Self::semantic_search(description, doc) {
            debug!(%description, %handle, "resolved via semantic search");
            return Some(handle);
        }
        let handle = Self::dom_fallback(description, doc);
        if let Some(handle) = &handle {
            debug!(%description, %handle, "resolved via DOM fallback");
        }
        handle
    }

    /// Exact or substring match against extracted names; also word-level
    /// matches where a >2-char query token equals a token of a plan name.
    fn context_search(description: &str, ctx: &PageContext) -> Option<ElementHandle> {
        let query = description.to_lowercase();
        let query_tokens = matcher::tokens(&query);

        let name_matches = |name: &str| {
            let name = name.to_lowercase();
            name == query || name.contains(&query) || query.contains(&name)
        };

        for plan in &ctx.content.pricing {
            if name_matches(&plan.plan) {
                if let Some(handle) = &plan.handle {
                    return Some(handle.clone());
                }
            }
            let plan_tokens = matcher::tokens(&plan.plan.to_lowercase());
            let word_hit = query_tokens
                .iter()
                .filter(|t| t.len() > 2)
                .any(|t| plan_tokens.iter().any(|p| p == t));
            if word_hit {
                if let Some(handle) = &plan.handle {
                    return Some(handle.clone());
                }
            }
        }
        for feature in &ctx.content.features {
            if name_matches(&feature.name) {
                if let Some(handle) = &feature.handle {
                    return Some(handle.clone());
                }
            }
        }
        for product in &ctx.content.products {
            if name_matches(&product.name) {
                if let Some(handle) = &product.handle {
                    return Some(handle.clone());
                }
            }
        }
        for cta in &ctx.content.ctas {
            if name_matches(&cta.text) {
                if let Some(handle) = &cta.handle {
                    return Some(handle.clone());
                }
            }
        }
        None
    }

    /// Score section-like containers by the fraction of query tokens their
    /// text contains; best section over the threshold wins.
    fn semantic_search(description: &str, doc: &Html) -> Option<ElementHandle> {
        let query = description.to_lowercase();
        let query_tokens: Vec<String> =
            matcher::tokens(&query).into_iter().filter(|t| t.len() > 2).collect();
        if query_tokens.is_empty() {
            return None;
        }

        let mut best: Option<(f64, ElementRef)> = None;
        for section in doc.select(&SECTIONISH) {
            let text = section.text().collect::<Vec<_>>().join(" ").to_lowercase();
            let hits = query_tokens.iter().filter(|t| matcher::word_match(&text, t)).count();
            let score = hits as f64 / query_tokens.len() as f64;
            if score >= SEMANTIC_THRESHOLD
                && best.map(|(s, _)| score > s).unwrap_or(true)
            {
                best = Some((score, section));
            }
        }
        best.map(|(_, el)| handle_of(doc, el))
    }

    /// Raw selector lookups, one query token at a time.
    fn dom_fallback(description: &str, doc: &Html) -> Option<ElementHandle> {
        let query = description.to_lowercase();
        for token in matcher::tokens(&query).iter().filter(|t| t.len() > 2) {
            for selector in [
                format!("#{token}"),
                format!("[id*=\"{token}\"]"),
                format!("[class*=\"{token}\"]"),
            ] {
                if let Some(handle) = first_match(doc, &selector) {
                    return Some(handle);
                }
            }
        }
        for selector in [
            format!("[aria-label*=\"{query}\"]"),
            format!("[data-section*=\"{query}\"]"),
        ] {
            if let Some(handle) = first_match(doc, &selector) {
                return Some(handle);
            }
        }
        None
    }

    /// Resolve a target category to its section on the page.
    pub fn find_section_by_type(
        target: TargetKind,
        ctx: &PageContext,
        doc: &Html,
    ) -> Option<ElementHandle> {
        for keyword in tables::section_keywords(target) {
            for selector in [
                format!("#{keyword}"),
                format!("[id*=\"{keyword}\"]"),
                format!("section[class*=\"{keyword}\"]"),
            ] {
                if let Some(handle) = first_match(doc, &selector) {
                    return Some(handle);
                }
            }
        }
        // Fall back to the extracted structure: a section whose heading or
        // id mentions the category.
        ctx.structure.sections.iter().find_map(|section| {
            let haystack = format!(
                "{} {}",
                section.id.as_deref().unwrap_or_default(),
                section.heading.as_deref().unwrap_or_default()
            )
            .to_lowercase();
            let hit = tables::section_keywords(target)
                .iter()
                .any(|kw| haystack.contains(kw));
            if hit {
                section.handle.clone()
            } else {
                None
            }
        })
    }

    /// The element itself when it scrolls its own overflow, else its nearest
    /// section-like ancestor.
    pub fn scrollable_parent(handle: &ElementHandle, doc: &Html) -> Option<ElementHandle> {
        let sel = Selector::parse(&handle.selector).ok()?;
        let el = doc.select(&sel).nth(handle.node_index)?;

        if let Some(style) = el.value().attr("style") {
            let style = style.replace(' ', "").to_lowercase();
            if style.contains("overflow:auto") || style.contains("overflow:scroll") {
                return Some(handle.clone());
            }
        }

        for ancestor in el.ancestors().filter_map(ElementRef::wrap) {
            if matches!(ancestor.value().name(), "section" | "article" | "main") {
                return Some(handle_of(doc, ancestor));
            }
        }
        None
    }
}

fn first_match(doc: &Html, selector: &str) -> Option<ElementHandle> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel).next()?;
    Some(ElementHandle::new(selector, 0))
}

fn handle_of(doc: &Html, el: ElementRef) -> ElementHandle {
    if let Some(id) = el.value().id() {
        if id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') && !id.is_empty() {
            return ElementHandle::new(format!("#{id}"), 0);
        }
    }
    let tag = el.value().name();
    let selector = tag.to_string();
    let index = Selector::parse(&selector)
        .ok()
        .and_then(|sel| doc.select(&sel).position(|e| e.id() == el.id()))
        .unwrap_or(0);
    ElementHandle::new(selector, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blitsum_core::{PriceInfo, PricingPlan};

    const PAGE: &str = r#"<html><body>
        <section id="pricing"><h2>Pricing</h2>
            <div class="pricing-card"><h4>Pro</h4><p>$199/mo</p></div>
        </section>
        <section id="features"><h2>Features</h2><p>Realtime voice and page awareness.</p></section>
        <div data-section="testimonials"><p>People love it.</p></div>
        </body></html>"#;

    fn ctx_with_pro() -> PageContext {
        let mut ctx = PageContext::default();
        ctx.content.pricing.push(PricingPlan {
            plan: "Pro".to_string(),
            price: PriceInfo::default(),
            features: vec![],
            popular: false,
            handle: Some(ElementHandle::new("div.pricing-card", 0)),
        });
        ctx
    }

    #[test]
    fn context_name_wins_first() {
        let doc = Html::parse_document(PAGE);
        let handle = ElementFinder::find("pro", &ctx_with_pro(), &doc).unwrap();
        assert_eq!(handle.selector, "div.pricing-card");
    }

    #[test]
    fn plan_token_match_requires_three_chars() {
        let mut ctx = PageContext::default();
        ctx.content.pricing.push(PricingPlan {
            plan: "Pro Max".to_string(),
            price: PriceInfo::default(),
            features: vec![],
            popular: false,
            handle: Some(ElementHandle::new("div.pricing-card", 0)),
        });
        let doc = Html::parse_document(PAGE);
        let found = ElementFinder::find("show the max tier please", &ctx, &doc);
        assert_eq!(found.unwrap().selector, "div.pricing-card");
    }

    #[test]
    fn semantic_search_scores_sections() {
        let doc = Html::parse_document(PAGE);
        let ctx = PageContext::default();
        let handle = ElementFinder::find("realtime voice awareness", &ctx, &doc).unwrap();
        assert_eq!(handle.selector, "#features");
    }

    #[test]
    fn dom_fallback_uses_data_section() {
        let doc = Html::parse_document(PAGE);
        let ctx = PageContext::default();
        let handle = ElementFinder::find("testimonials", &ctx, &doc).unwrap();
        assert!(handle.selector.contains("testimonials"));
    }

    #[test]
    fn section_by_type_prefers_ids() {
        let doc = Html::parse_document(PAGE);
        let ctx = PageContext::default();
        let handle = ElementFinder::find_section_by_type(TargetKind::Pricing, &ctx, &doc).unwrap();
        assert_eq!(handle.selector, "#pricing");
    }

    #[test]
    fn scrollable_parent_walks_to_section() {
        let html = r#"<section id="plans">
            <div><p id="leaf">deep content</p></div>
        </section>
        <div id="pane" style="overflow: auto"><p>scrolls itself</p></div>"#;
        let doc = Html::parse_document(html);

        let leaf = ElementHandle::new("#leaf", 0);
        let parent = ElementFinder::scrollable_parent(&leaf, &doc).unwrap();
        assert_eq!(parent.selector, "#plans");

        let pane = ElementHandle::new("#pane", 0);
        let parent = ElementFinder::scrollable_parent(&pane, &doc).unwrap();
        assert_eq!(parent, pane);
    }
}
