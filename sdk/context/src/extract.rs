//! Page-context extraction: one pass over a page snapshot producing the
//! semantic model every other subsystem consumes.

use std::collections::HashMap;
use std::time::Instant;

use blitsum_core::{
    HeadingInfo, LinkInfo, PageContext, PageSnapshot, PageStructure, SectionInfo,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::classify;
use crate::dom;
use crate::metadata;
use crate::patterns;

static HEADINGS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());
static SECTIONS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("section, article, main, div[id]").unwrap());
static PARAGRAPHS: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

const MAX_KEYWORDS: usize = 15;
const MAX_SUMMARY: usize = 200;
const SECTION_PREVIEW: usize = 150;

/// Deterministic page-context extractor.
///
/// Never fails: malformed markup yields empty lists, and a pass that
/// exceeds the soft time budget returns whatever was built so far.
pub struct Extractor {
    soft_budget: std::time::Duration,
}

impl Default for Extractor {
    fn default() -> Self {
        Self { soft_budget: std::time::Duration::from_millis(200) }
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_soft_budget(mut self, budget: std::time::Duration) -> Self {
        self.soft_budget = budget;
        self
    }

    pub fn extract(&self, snapshot: &PageSnapshot) -> PageContext {
        let start = Instant::now();
        let doc = Html::parse_document(&snapshot.html);

        let mut ctx = PageContext {
            url: snapshot.url.clone(),
            scroll_position: snapshot.viewport.scroll_y,
            extracted_at: Utc::now(),
            ..Default::default()
        };

        ctx.title = doc
            .select(&TITLE)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        ctx.content.metadata = metadata::extract_metadata(&doc);
        ctx.structure = self.extract_structure(&doc);
        ctx.current_section = current_section(&ctx.structure.sections, snapshot);

        // Content classifiers run in fixed order; each checks the budget so
        // a pathological page still returns a usable partial context.
        let phases: &[(&str, fn(&Html, &PageSnapshot, &mut PageContext))] = &[
            ("pricing", |doc, snap, ctx| ctx.content.pricing = classify::extract_pricing(doc, snap)),
            ("features", |doc, _snap, ctx| ctx.content.features = classify::extract_features(doc)),
            ("faqs", |doc, _snap, ctx| ctx.content.faqs = classify::extract_faqs(doc)),
            ("products", |doc, snap, ctx| ctx.content.products = classify::extract_products(doc, snap)),
            ("ctas", |doc, _snap, ctx| ctx.content.ctas = classify::extract_ctas(doc)),
        ];
        for (name, phase) in phases {
            if start.elapsed() > self.soft_budget {
                warn!(phase = name, "extraction budget exceeded, returning partial context");
                return finish(ctx, start);
            }
            phase(&doc, snapshot, &mut ctx);
        }

        if start.elapsed() <= self.soft_budget {
            ctx.keywords = extract_keywords(&doc);
            ctx.summary = extract_summary(&doc);
            ctx.links = extract_links(&doc);
        }

        debug!(
            pricing = ctx.content.pricing.len(),
            features = ctx.content.features.len(),
            faqs = ctx.content.faqs.len(),
            ctas = ctx.content.ctas.len(),
            "page context extracted"
        );
        finish(ctx, start)
    }

    fn extract_structure(&self, doc: &Html) -> PageStructure {
        let headings = doc
            .select(&HEADINGS)
            .filter(|h| !dom::is_hidden(h))
            .filter_map(|h| {
                let text = dom::element_text(&h);
                if text.is_empty() {
                    return None;
                }
                let level = h.value().name().as_bytes()[1] - b'0';
                Some(HeadingInfo {
                    level,
                    text,
                    id: h.value().id().map(str::to_string),
                })
            })
            .collect();

        let sections = doc
            .select(&SECTIONS)
            .filter(|s| !dom::is_hidden(s))
            .map(|s| {
                let text = dom::element_text(&s);
                SectionInfo {
                    id: s.value().id().map(str::to_string),
                    tag: s.value().name().to_string(),
                    heading: dom::first_heading(&s),
                    text_preview: patterns::truncate_chars(&text, SECTION_PREVIEW),
                    handle: Some(dom::handle_for(doc, s)),
                }
            })
            .collect();

        PageStructure { headings, sections }
    }
}

fn finish(mut ctx: PageContext, start: Instant) -> PageContext {
    ctx.extraction_time_ms = start.elapsed().as_millis() as u64;
    ctx
}

/// The section whose vertical range straddles the viewport mid-line, else a
/// percentage-scroll bucket.
fn current_section(sections: &[SectionInfo], snapshot: &PageSnapshot) -> Option<String> {
    let mid = snapshot.viewport.mid_line();
    for section in sections {
        let Some(handle) = &section.handle else { continue };
        let Some(rect) = snapshot.bounds.get(handle) else { continue };
        if rect.y <= mid && mid <= rect.bottom() {
            return section
                .id
                .clone()
                .or_else(|| section.heading.clone())
                .or_else(|| Some(section.tag.clone()));
        }
    }

    let bucket = match snapshot.viewport.scroll_fraction() {
        f if f < 0.33 => "top",
        f if f < 0.66 => "middle",
        _ => "bottom",
    };
    Some(bucket.to_string())
}

fn extract_keywords(doc: &Html) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let body_text = doc
        .select(&BODY)
        .next()
        .map(|b| dom::element_text(&b))
        .unwrap_or_default();
    for token in body_text.split(|c: char| !c.is_alphanumeric()) {
        let token = token.to_lowercase();
        if token.len() < 4 || patterns::STOP_WORDS.contains(&token.as_str()) {
            continue;
        }
        *counts.entry(token).or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().filter(|(_, n)| *n >= 2).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(MAX_KEYWORDS).map(|(word, _)| word).collect()
}

fn extract_summary(doc: &Html) -> String {
    for p in doc.select(&PARAGRAPHS) {
        if dom::is_hidden(&p) {
            continue;
        }
        let text = dom::element_text(&p);
        if text.chars().count() >= 50 {
            return patterns::truncate_chars(&text, MAX_SUMMARY);
        }
    }
    String::new()
}

fn extract_links(doc: &Html) -> Vec<LinkInfo> {
    let mut links = Vec::new();
    for a in doc.select(&LINKS) {
        if dom::is_hidden(&a) {
            continue;
        }
        let text = dom::element_text(&a);
        let href = a.value().attr("href").unwrap_or_default().to_string();
        if text.is_empty() || href.is_empty() || href.starts_with('#') {
            continue;
        }
        if links.iter().any(|l: &LinkInfo| l.href == href) {
            continue;
        }
        links.push(LinkInfo { text, href });
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use blitsum_core::{ElementHandle, Rect, Viewport};

    const PAGE: &str = r#"<html><head>
        <title>Blitsum - AI sales assistant</title>
        <meta name="description" content="An AI assistant that sells while you sleep.">
        </head><body>
        <main>
        <h1>Meet Blitsum</h1>
        <p>Blitsum is an embeddable sales assistant that answers questions, gives tours,
           and closes deals on your pricing page around the clock.</p>
        <section id="features" class="features grid">
            <h2>Features</h2>
            <div><h3>Voice native</h3><p>Talks to visitors with real-time speech in both directions.</p></div>
            <div><h3>Page aware</h3><p>Understands pricing, plans and features on the host page.</p></div>
            <div><h3>Always on</h3><p>Runs in the page with zero backend integration required.</p></div>
        </section>
        <section id="pricing" class="pricing">
            <h2>Pricing</h2>
            <div class="pricing-card"><h4>Starter</h4><p>$49/mo</p><ul><li>1 seat</li></ul></div>
            <div class="pricing-card"><h4>Pro</h4><p>$199/mo</p><ul><li>10 seats</li></ul></div>
        </section>
        <a class="btn btn-primary" href="/signup">Get Started</a>
        <a href="/about">About us</a>
        </main>
        </body></html>"#;

    #[test]
    fn full_extraction_populates_model() {
        let snapshot = PageSnapshot::new("https://blitsum.dev", PAGE, Viewport {
            width: 1280.0,
            height: 720.0,
            scroll_y: 0.0,
            page_height: 2400.0,
        });
        let ctx = Extractor::new().extract(&snapshot);

        assert_eq!(ctx.url, "https://blitsum.dev");
        assert_eq!(ctx.title, "Blitsum - AI sales assistant");
        assert_eq!(ctx.content.metadata.site_name, "Blitsum");
        assert_eq!(ctx.content.pricing.len(), 2);
        assert_eq!(ctx.content.features.len(), 3);
        assert_eq!(ctx.content.ctas.len(), 1);
        assert!(ctx.summary.starts_with("Blitsum is an embeddable"));
        assert!(!ctx.keywords.is_empty());
        assert!(ctx.links.iter().any(|l| l.href == "/about"));
    }

    #[test]
    fn missing_regions_yield_empty_lists() {
        let snapshot = PageSnapshot::new(
            "https://empty.dev",
            "<html><body><p>hello</p></body></html>",
            Viewport::default(),
        );
        let ctx = Extractor::new().extract(&snapshot);
        assert!(ctx.content.pricing.is_empty());
        assert!(ctx.content.features.is_empty());
        assert!(ctx.content.faqs.is_empty());
    }

    #[test]
    fn current_section_straddles_mid_line() {
        let mut snapshot = PageSnapshot::new("https://blitsum.dev", PAGE, Viewport {
            width: 1280.0,
            height: 720.0,
            scroll_y: 800.0,
            page_height: 2400.0,
        });
        snapshot.bounds.insert(
            ElementHandle::new("#pricing", 0),
            Rect { x: 0.0, y: 900.0, width: 1280.0, height: 700.0 },
        );
        let ctx = Extractor::new().extract(&snapshot);
        assert_eq!(ctx.current_section.as_deref(), Some("pricing"));
    }

    #[test]
    fn scroll_bucket_fallback_without_bounds() {
        let snapshot = PageSnapshot::new("https://blitsum.dev", PAGE, Viewport {
            width: 1280.0,
            height: 720.0,
            scroll_y: 1680.0,
            page_height: 2400.0,
        });
        let ctx = Extractor::new().extract(&snapshot);
        assert_eq!(ctx.current_section.as_deref(), Some("bottom"));
    }
}
