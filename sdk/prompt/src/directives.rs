//! Assistant output parsing: prose for the visitor, JSON action directives
//! for the page. A line that is a single JSON object becomes a directive;
//! anything else, including malformed JSON, stays text.

use blitsum_actions::{ActionExecutor, ActionOutcome};
use blitsum_core::{PageContext, TargetKind};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Directive {
    Scroll { section: String },
    Highlight { element: String },
    PulseCta {
        #[serde(default)]
        element: Option<String>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ParsedReply {
    pub text: String,
    pub directives: Vec<Directive>,
}

/// Split assistant output line by line.
pub fn parse_reply(raw: &str) -> ParsedReply {
    let mut text_lines: Vec<&str> = Vec::new();
    let mut directives = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            match serde_json::from_str::<serde_json::Value>(trimmed) {
                Ok(value) if value.is_object() => {
                    match serde_json::from_value::<Directive>(value.clone()) {
                        Ok(directive) => {
                            directives.push(directive);
                            continue;
                        }
                        Err(_) => {
                            // Valid JSON, unknown or malformed action tag:
                            // log and drop rather than guessing.
                            warn!(line = trimmed, "ignoring unknown action directive");
                            continue;
                        }
                    }
                }
                _ => {} // malformed JSON falls through as text
            }
        }
        text_lines.push(line);
    }

    ParsedReply {
        text: text_lines.join("\n").trim().to_string(),
        directives,
    }
}

fn scroll_target(section: &str) -> Option<TargetKind> {
    match section.to_lowercase().as_str() {
        "pricing" => Some(TargetKind::Pricing),
        "features" => Some(TargetKind::Features),
        "signup" => Some(TargetKind::Signup),
        "contact" => Some(TargetKind::Contact),
        "about" => Some(TargetKind::About),
        "faq" | "faqs" => Some(TargetKind::Faq),
        _ => None,
    }
}

/// Execute the directives in order against the page.
pub async fn dispatch(
    directives: &[Directive],
    executor: &ActionExecutor,
    ctx: &PageContext,
) -> Vec<ActionOutcome> {
    let mut outcomes = Vec::with_capacity(directives.len());
    for directive in directives {
        let outcome = match directive {
            Directive::Scroll { section } => match scroll_target(section) {
                Some(target) => executor.navigate_to_section(target, ctx).await,
                None => executor.scroll_to_section(section, ctx).await,
            },
            Directive::Highlight { element } => {
                match executor.resolve_element(element, ctx).await {
                    Ok(Some(handle)) => executor.highlight_element(&handle, None).await,
                    Ok(None) => ActionOutcome::failed(format!("Couldn't find \"{element}\"")),
                    Err(err) => ActionOutcome::failed(err.to_string()),
                }
            }
            Directive::PulseCta { element } => {
                let description = element.as_deref().unwrap_or("signup button");
                match executor.resolve_element(description, ctx).await {
                    Ok(Some(handle)) => executor.pulse_cta(&handle).await,
                    Ok(None) => ActionOutcome::failed(format!("Couldn't find \"{description}\"")),
                    Err(err) => ActionOutcome::failed(err.to_string()),
                }
            }
        };
        if let Some(error) = &outcome.error {
            debug!(%error, "directive failed");
        }
        outcomes.push(outcome);
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prose_and_directives_split_cleanly() {
        let raw = "Our Pro plan fits teams of ten.\n\
                   {\"action\": \"scroll\", \"section\": \"pricing\"}\n\
                   Want me to highlight it?";
        let parsed = parse_reply(raw);
        assert_eq!(parsed.directives, vec![Directive::Scroll { section: "pricing".into() }]);
        assert_eq!(parsed.text, "Our Pro plan fits teams of ten.\nWant me to highlight it?");
    }

    #[test]
    fn unknown_actions_are_dropped_not_guessed() {
        let raw = "{\"action\": \"teleport\", \"section\": \"moon\"}\nHello.";
        let parsed = parse_reply(raw);
        assert!(parsed.directives.is_empty());
        assert_eq!(parsed.text, "Hello.");
    }

    #[test]
    fn malformed_json_stays_text() {
        let raw = "{not json at all}";
        let parsed = parse_reply(raw);
        assert!(parsed.directives.is_empty());
        assert_eq!(parsed.text, "{not json at all}");
    }

    #[test]
    fn pulse_cta_element_is_optional() {
        let parsed = parse_reply("{\"action\": \"pulse_cta\"}");
        assert_eq!(parsed.directives, vec![Directive::PulseCta { element: None }]);
    }
}
