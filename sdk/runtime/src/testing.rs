//! In-memory host bindings used by the integration suites and demos.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use blitsum_core::{
    ElementHandle, KeyValueStore, PageDriver, PageSnapshot, Rect, ScrollBehavior, ScrollBlock,
    Viewport,
};
use scraper::{Html, Selector};

/// A deterministic page driver over a fixed HTML string.
pub struct StaticPage {
    url: String,
    html: Mutex<String>,
    viewport: Mutex<Viewport>,
    bounds: Mutex<HashMap<ElementHandle, Rect>>,
    styles: Mutex<HashMap<(ElementHandle, String), String>>,
    classes: Mutex<HashMap<ElementHandle, Vec<String>>>,
    clicks: Mutex<Vec<ElementHandle>>,
    scrolls: Mutex<Vec<ElementHandle>>,
}

impl StaticPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: Mutex::new(html.into()),
            viewport: Mutex::new(Viewport {
                width: 1280.0,
                height: 720.0,
                scroll_y: 0.0,
                page_height: 3000.0,
            }),
            bounds: Mutex::new(HashMap::new()),
            styles: Mutex::new(HashMap::new()),
            classes: Mutex::new(HashMap::new()),
            clicks: Mutex::new(Vec::new()),
            scrolls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_html(&self, html: impl Into<String>) {
        *self.html.lock().unwrap() = html.into();
    }

    pub fn set_bounds(&self, handle: ElementHandle, rect: Rect) {
        self.bounds.lock().unwrap().insert(handle, rect);
    }

    pub fn scrolled_to(&self) -> Vec<ElementHandle> {
        self.scrolls.lock().unwrap().clone()
    }

    pub fn clicked(&self) -> Vec<ElementHandle> {
        self.clicks.lock().unwrap().clone()
    }

    pub fn style_of(&self, handle: &ElementHandle, property: &str) -> Option<String> {
        self.styles.lock().unwrap().get(&(handle.clone(), property.to_string())).cloned()
    }

    pub fn has_class(&self, handle: &ElementHandle, class: &str) -> bool {
        self.classes
            .lock()
            .unwrap()
            .get(handle)
            .map(|list| list.iter().any(|c| c == class))
            .unwrap_or(false)
    }

    fn exists(&self, handle: &ElementHandle) -> bool {
        let html = self.html.lock().unwrap().clone();
        let doc = Html::parse_document(&html);
        Selector::parse(&handle.selector)
            .ok()
            .map(|sel| doc.select(&sel).nth(handle.node_index).is_some())
            .unwrap_or(false)
    }
}

#[async_trait]
impl PageDriver for StaticPage {
    async fn snapshot(&self) -> Result<PageSnapshot> {
        Ok(PageSnapshot {
            url: self.url.clone(),
            html: self.html.lock().unwrap().clone(),
            viewport: *self.viewport.lock().unwrap(),
            bounds: self.bounds.lock().unwrap().clone(),
        })
    }

    async fn bounds(&self, handle: &ElementHandle) -> Result<Option<Rect>> {
        Ok(self.bounds.lock().unwrap().get(handle).copied())
    }

    async fn is_visible(&self, handle: &ElementHandle) -> Result<bool> {
        if let Some(rect) = self.bounds.lock().unwrap().get(handle) {
            let viewport = self.viewport.lock().unwrap();
            let top = viewport.scroll_y;
            let bottom = viewport.scroll_y + viewport.height;
            return Ok(rect.bottom() > top && rect.y < bottom);
        }
        Ok(self.exists(handle))
    }

    async fn scroll_to(
        &self,
        handle: &ElementHandle,
        _behavior: ScrollBehavior,
        block: ScrollBlock,
    ) -> Result<()> {
        self.scrolls.lock().unwrap().push(handle.clone());
        if let Some(rect) = self.bounds.lock().unwrap().get(handle) {
            let mut viewport = self.viewport.lock().unwrap();
            let target = match block {
                ScrollBlock::Start => rect.y,
                ScrollBlock::Center => rect.y + rect.height / 2.0 - viewport.height / 2.0,
            };
            viewport.scroll_y = target.max(0.0);
        }
        Ok(())
    }

    async fn read_style(&self, handle: &ElementHandle, property: &str) -> Result<Option<String>> {
        Ok(self.styles.lock().unwrap().get(&(handle.clone(), property.to_string())).cloned())
    }

    async fn set_style(&self, handle: &ElementHandle, property: &str, value: &str) -> Result<()> {
        let key = (handle.clone(), property.to_string());
        let mut styles = self.styles.lock().unwrap();
        if value.is_empty() {
            styles.remove(&key);
        } else {
            styles.insert(key, value.to_string());
        }
        Ok(())
    }

    async fn add_class(&self, handle: &ElementHandle, class: &str) -> Result<()> {
        let mut classes = self.classes.lock().unwrap();
        let list = classes.entry(handle.clone()).or_default();
        if !list.iter().any(|c| c == class) {
            list.push(class.to_string());
        }
        Ok(())
    }

    async fn remove_class(&self, handle: &ElementHandle, class: &str) -> Result<()> {
        if let Some(list) = self.classes.lock().unwrap().get_mut(handle) {
            list.retain(|c| c != class);
        }
        Ok(())
    }

    async fn click(&self, handle: &ElementHandle) -> Result<()> {
        self.clicks.lock().unwrap().push(handle.clone());
        Ok(())
    }

    async fn text_content(&self, handle: &ElementHandle) -> Result<String> {
        let html = self.html.lock().unwrap().clone();
        let doc = Html::parse_document(&html);
        let text = Selector::parse(&handle.selector)
            .ok()
            .and_then(|sel| {
                doc.select(&sel)
                    .nth(handle.node_index)
                    .map(|el| el.text().collect::<Vec<_>>().join(" "))
            })
            .unwrap_or_default();
        Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

/// Key-value storage backed by a map.
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { values: Mutex::new(HashMap::new()) }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
