use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A stable reference to an element on the host page.
///
/// Cached snapshots never hold live DOM handles; they hold a selector plus
/// the index of the matching node at extraction time, and every consumer
/// re-resolves through the page driver. The content cache guarantees the
/// snapshot is flushed when the page mutates, so a stale `node_index` can
/// only be observed inside the 1 s mutation debounce window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementHandle {
    /// CSS selector that matched the element.
    pub selector: String,
    /// Index into the selector's match list.
    pub node_index: usize,
}

impl ElementHandle {
    pub fn new(selector: impl Into<String>, node_index: usize) -> Self {
        Self { selector: selector.into(), node_index }
    }
}

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.selector, self.node_index)
    }
}

/// Pixel rectangle in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Scroll and viewport metrics at snapshot time.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_y: f64,
    pub page_height: f64,
}

impl Viewport {
    /// Scroll progress through the document, 0..=1.
    pub fn scroll_fraction(&self) -> f64 {
        let scrollable = (self.page_height - self.height).max(1.0);
        (self.scroll_y / scrollable).clamp(0.0, 1.0)
    }

    /// Vertical midpoint of the visible area, in page coordinates.
    pub fn mid_line(&self) -> f64 {
        self.scroll_y + self.height / 2.0
    }
}

/// Everything the extractor needs from the host page in one capture.
///
/// `bounds` is best-effort: drivers that can compute layout provide element
/// geometry keyed by handle; drivers that cannot leave it empty and the
/// extractor degrades to document-order heuristics.
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    pub url: String,
    pub html: String,
    pub viewport: Viewport,
    pub bounds: HashMap<ElementHandle, Rect>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, html: impl Into<String>, viewport: Viewport) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            viewport,
            bounds: HashMap::new(),
        }
    }
}

/// DOM mutation categories relevant to cache invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    ChildList,
    CharacterData,
}

/// Events the host page pushes into the runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEvent {
    /// The user scrolled; `depth` is scroll progress 0..=1.
    Scroll { depth: f64 },
    MouseMove,
    /// Pointer left the document at the given client Y.
    MouseLeave { y: f64 },
    /// Pointer entered a button-like element.
    Hover { handle: ElementHandle, text: String, classes: String },
    /// A button-like element was clicked.
    Click { handle: ElementHandle, text: String, classes: String },
    /// The DOM mutated outside the SDK shell.
    Mutation { kind: MutationKind, text_len: usize },
}
