//! Site metadata: Open Graph tags, meta description, JSON-LD blocks.

use std::collections::HashMap;

use blitsum_core::PageMetadata;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::trace;

static META: Lazy<Selector> = Lazy::new(|| Selector::parse("meta").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static JSON_LD: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

pub fn extract_metadata(doc: &Html) -> PageMetadata {
    let mut og_tags: HashMap<String, String> = HashMap::new();
    let mut meta_by_name: HashMap<String, String> = HashMap::new();

    for el in doc.select(&META) {
        let content = match el.value().attr("content") {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => continue,
        };
        if let Some(property) = el.value().attr("property") {
            if property.starts_with("og:") {
                og_tags.insert(property.to_string(), content.clone());
            }
        }
        if let Some(name) = el.value().attr("name") {
            meta_by_name.insert(name.to_lowercase(), content);
        }
    }

    let title = doc
        .select(&TITLE)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    // Site name: OG, then application-name, then the title prefix before a
    // separator like " - " or " | ".
    let site_name = og_tags
        .get("og:site_name")
        .cloned()
        .or_else(|| meta_by_name.get("application-name").cloned())
        .unwrap_or_else(|| {
            title
                .split(['-', '|', '\u{2013}', '\u{2014}'])
                .next()
                .unwrap_or("")
                .trim()
                .to_string()
        });

    let description = og_tags
        .get("og:description")
        .cloned()
        .or_else(|| meta_by_name.get("description").cloned())
        .unwrap_or_default();

    let mut schema = Vec::new();
    for script in doc.select(&JSON_LD) {
        let raw: String = script.text().collect();
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => schema.push(value),
            Err(err) => trace!(%err, "skipping invalid JSON-LD block"),
        }
    }

    PageMetadata { site_name, description, og_tags, schema }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_og_site_name() {
        let html = r#"<html><head>
            <title>Blitsum - AI sales assistant</title>
            <meta property="og:site_name" content="Blitsum">
            <meta property="og:description" content="Close more deals.">
        </head><body></body></html>"#;
        let meta = extract_metadata(&Html::parse_document(html));
        assert_eq!(meta.site_name, "Blitsum");
        assert_eq!(meta.description, "Close more deals.");
        assert_eq!(meta.og_tags.get("og:site_name").unwrap(), "Blitsum");
    }

    #[test]
    fn falls_back_to_title_prefix() {
        let html = r#"<html><head><title>Acme | Home</title></head><body></body></html>"#;
        let meta = extract_metadata(&Html::parse_document(html));
        assert_eq!(meta.site_name, "Acme");
    }

    #[test]
    fn invalid_json_ld_is_skipped() {
        let html = r#"<html><head>
            <script type="application/ld+json">{"@type":"Organization","name":"Acme"}</script>
            <script type="application/ld+json">{not json</script>
        </head><body></body></html>"#;
        let meta = extract_metadata(&Html::parse_document(html));
        assert_eq!(meta.schema.len(), 1);
        assert_eq!(meta.schema[0]["name"], "Acme");
    }
}
