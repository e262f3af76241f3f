//! Visual action execution: scroll, highlight, pulse, compare, read, click,
//! focus. Every inline-style mutation snapshots the prior values and is
//! restored by timer; teardown runs any restore still pending.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use blitsum_core::{
    ElementHandle, PageContext, PageDriver, ScrollBehavior, ScrollBlock, TargetKind,
};
use blitsum_intent::ElementFinder;
use scraper::Html;
use tracing::{debug, warn};

/// No visual effect may outlive this, whatever duration was asked for.
const MAX_EFFECT: Duration = Duration::from_secs(10);

const HIGHLIGHT_DURATION: Duration = Duration::from_millis(2000);
const PULSE_DURATION: Duration = Duration::from_millis(3000);
const COMPARE_DURATION: Duration = Duration::from_millis(3000);
const FOCUS_DURATION: Duration = Duration::from_millis(2500);
const FOCUS_PRE_DELAY: Duration = Duration::from_millis(600);
const CLICK_DELAY: Duration = Duration::from_millis(500);

const PULSE_CLASS: &str = "blitsum-pulse";

/// Outline colors assigned per index during comparisons.
const COMPARE_PALETTE: &[&str] = &["#6366f1", "#ec4899", "#f59e0b"];

/// Result of a single executed action.
#[derive(Debug, Clone, Default)]
pub struct ActionOutcome {
    pub success: bool,
    /// Cleaned text for read actions.
    pub content: Option<String>,
    /// Whether the target ended up inside the viewport, for navigations.
    pub visible: Option<bool>,
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn ok() -> Self {
        Self { success: true, ..Default::default() }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()), ..Default::default() }
    }
}

struct PendingRestore {
    handle: ElementHandle,
    /// (property, prior value) pairs; `None` means the property was unset.
    styles: Vec<(String, Option<String>)>,
    class: Option<String>,
}

pub struct ActionExecutor {
    driver: Arc<dyn PageDriver>,
    pending: Arc<Mutex<HashMap<u64, PendingRestore>>>,
    next_effect: AtomicU64,
}

impl ActionExecutor {
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self {
            driver,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_effect: AtomicU64::new(1),
        }
    }

    // -- resolution ---------------------------------------------------------

    pub async fn resolve_element(
        &self,
        description: &str,
        ctx: &PageContext,
    ) -> Result<Option<ElementHandle>> {
        let snapshot = self.driver.snapshot().await?;
        let handle = {
            let doc = Html::parse_document(&snapshot.html);
            ElementFinder::find(description, ctx, &doc)
        };
        Ok(handle)
    }

    async fn resolve_section(
        &self,
        target: TargetKind,
        ctx: &PageContext,
    ) -> Result<Option<ElementHandle>> {
        let snapshot = self.driver.snapshot().await?;
        let handle = {
            let doc = Html::parse_document(&snapshot.html);
            ElementFinder::find_section_by_type(target, ctx, &doc)
                .or_else(|| ElementFinder::find(target.as_str(), ctx, &doc))
        };
        Ok(handle)
    }

    /// Whether the element is a button, link, `role=button`, or carries an
    /// inline click handler.
    async fn is_interactive(&self, handle: &ElementHandle) -> Result<bool> {
        let snapshot = self.driver.snapshot().await?;
        let interactive = {
            let doc = Html::parse_document(&snapshot.html);
            scraper::Selector::parse(&handle.selector)
                .ok()
                .and_then(|sel| doc.select(&sel).nth(handle.node_index).map(|el| {
                    matches!(el.value().name(), "button" | "a")
                        || el.value().attr("role") == Some("button")
                        || el.value().attr("onclick").is_some()
                }))
                .unwrap_or(false)
        };
        Ok(interactive)
    }

    // -- effects ------------------------------------------------------------

    /// Apply inline styles, remembering priors, and schedule the restore.
    async fn apply_styles(
        &self,
        handle: &ElementHandle,
        styles: &[(&str, &str)],
        duration: Duration,
    ) -> Result<()> {
        let mut priors = Vec::with_capacity(styles.len());
        for (property, value) in styles {
            let prior = self.driver.read_style(handle, property).await?;
            priors.push((property.to_string(), prior));
            self.driver.set_style(handle, property, value).await?;
        }
        self.schedule_restore(
            PendingRestore { handle: handle.clone(), styles: priors, class: None },
            duration,
        );
        Ok(())
    }

    async fn apply_class(&self, handle: &ElementHandle, class: &str, duration: Duration) -> Result<()> {
        self.driver.add_class(handle, class).await?;
        self.schedule_restore(
            PendingRestore {
                handle: handle.clone(),
                styles: Vec::new(),
                class: Some(class.to_string()),
            },
            duration,
        );
        Ok(())
    }

    fn schedule_restore(&self, restore: PendingRestore, duration: Duration) {
        let effect_id = self.next_effect.fetch_add(1, Ordering::Relaxed);
        let duration = duration.min(MAX_EFFECT);
        // Registered before the timer exists, so teardown always sees it.
        self.pending.lock().unwrap().insert(effect_id, restore);

        let pending = self.pending.clone();
        let driver = self.driver.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let restore = pending.lock().unwrap().remove(&effect_id);
            if let Some(restore) = restore {
                Self::run_restore(&*driver, restore).await;
            }
        });
    }

    async fn run_restore(driver: &dyn PageDriver, restore: PendingRestore) {
        for (property, prior) in &restore.styles {
            let value = prior.as_deref().unwrap_or("");
            if let Err(err) = driver.set_style(&restore.handle, property, value).await {
                warn!(%err, handle = %restore.handle, "style restore failed");
            }
        }
        if let Some(class) = &restore.class {
            if let Err(err) = driver.remove_class(&restore.handle, class).await {
                warn!(%err, handle = %restore.handle, "class restore failed");
            }
        }
    }

    /// Run every pending restore immediately. Called on shell teardown so no
    /// effect survives the component that created it.
    pub async fn teardown(&self) {
        let drained: Vec<PendingRestore> =
            self.pending.lock().unwrap().drain().map(|(_, r)| r).collect();
        for restore in drained {
            Self::run_restore(&*self.driver, restore).await;
        }
    }

    /// Number of effects whose restore has not yet run.
    pub fn pending_effects(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    // -- operations ---------------------------------------------------------

    pub async fn scroll_to_section(&self, id: &str, ctx: &PageContext) -> ActionOutcome {
        let handle = match self.resolve_element(id, ctx).await {
            Ok(Some(handle)) => handle,
            Ok(None) => return ActionOutcome::failed("Section not found"),
            Err(err) => return ActionOutcome::failed(err.to_string()),
        };
        match self.driver.scroll_to(&handle, ScrollBehavior::Smooth, ScrollBlock::Start).await {
            Ok(()) => ActionOutcome::ok(),
            Err(err) => ActionOutcome::failed(err.to_string()),
        }
    }

    pub async fn highlight_element(&self, handle: &ElementHandle, duration: Option<Duration>) -> ActionOutcome {
        let duration = duration.unwrap_or(HIGHLIGHT_DURATION);
        let styles = [
            ("box-shadow", "0 0 0 3px rgba(99, 102, 241, 0.6), 0 0 24px rgba(99, 102, 241, 0.4)"),
            ("transform", "scale(1.02)"),
            ("transition", "box-shadow 0.2s ease, transform 0.2s ease"),
        ];
        match self.apply_styles(handle, &styles, duration).await {
            Ok(()) => ActionOutcome::ok(),
            Err(err) => ActionOutcome::failed(err.to_string()),
        }
    }

    pub async fn pulse_cta(&self, handle: &ElementHandle) -> ActionOutcome {
        match self.apply_class(handle, PULSE_CLASS, PULSE_DURATION).await {
            Ok(()) => ActionOutcome::ok(),
            Err(err) => ActionOutcome::failed(err.to_string()),
        }
    }

    pub async fn navigate_to_element(
        &self,
        description: &str,
        ctx: &PageContext,
        smooth: bool,
    ) -> ActionOutcome {
        let handle = match self.resolve_element(description, ctx).await {
            Ok(Some(handle)) => handle,
            Ok(None) => return ActionOutcome::failed(format!("Couldn't find \"{description}\"")),
            Err(err) => return ActionOutcome::failed(err.to_string()),
        };
        let behavior = if smooth { ScrollBehavior::Smooth } else { ScrollBehavior::Instant };
        if let Err(err) = self.driver.scroll_to(&handle, behavior, ScrollBlock::Center).await {
            return ActionOutcome::failed(err.to_string());
        }
        let visible = self.driver.is_visible(&handle).await.unwrap_or(false);
        ActionOutcome { success: true, visible: Some(visible), ..Default::default() }
    }

    pub async fn navigate_to_section(&self, target: TargetKind, ctx: &PageContext) -> ActionOutcome {
        let handle = match self.resolve_section(target, ctx).await {
            Ok(Some(handle)) => handle,
            Ok(None) => return ActionOutcome::failed("Section not found"),
            Err(err) => return ActionOutcome::failed(err.to_string()),
        };
        match self.driver.scroll_to(&handle, ScrollBehavior::Smooth, ScrollBlock::Center).await {
            Ok(()) => {
                let visible = self.driver.is_visible(&handle).await.unwrap_or(false);
                ActionOutcome { success: true, visible: Some(visible), ..Default::default() }
            }
            Err(err) => ActionOutcome::failed(err.to_string()),
        }
    }

    /// Resolve each description, outline all of them simultaneously in
    /// per-index colors, and restore everything at the duration end.
    pub async fn compare_elements(
        &self,
        descriptions: &[String],
        ctx: &PageContext,
        duration: Option<Duration>,
    ) -> ActionOutcome {
        let duration = duration.unwrap_or(COMPARE_DURATION);
        let mut handles = Vec::new();
        for description in descriptions {
            match self.resolve_element(description, ctx).await {
                Ok(Some(handle)) => handles.push(handle),
                Ok(None) => {
                    return ActionOutcome::failed(format!("Couldn't find \"{description}\""))
                }
                Err(err) => return ActionOutcome::failed(err.to_string()),
            }
        }
        if handles.len() < 2 {
            return ActionOutcome::failed("Need at least two things to compare");
        }

        for (index, handle) in handles.iter().enumerate() {
            let color = COMPARE_PALETTE[index % COMPARE_PALETTE.len()];
            let styles = [
                ("outline", format!("3px solid {color}")),
                ("box-shadow", format!("0 0 18px {color}")),
                ("transform", "scale(1.03)".to_string()),
            ];
            let borrowed: Vec<(&str, &str)> =
                styles.iter().map(|(p, v)| (*p, v.as_str())).collect();
            if let Err(err) = self.apply_styles(handle, &borrowed, duration).await {
                return ActionOutcome::failed(err.to_string());
            }
        }
        debug!(count = handles.len(), "comparison outlines applied");
        ActionOutcome::ok()
    }

    pub async fn read_element_content(&self, description: &str, ctx: &PageContext) -> ActionOutcome {
        let handle = match self.resolve_element(description, ctx).await {
            Ok(Some(handle)) => handle,
            Ok(None) => return ActionOutcome::failed(format!("Couldn't find \"{description}\"")),
            Err(err) => return ActionOutcome::failed(err.to_string()),
        };
        match self.driver.text_content(&handle).await {
            Ok(text) => ActionOutcome { success: true, content: Some(text), ..Default::default() },
            Err(err) => ActionOutcome::failed(err.to_string()),
        }
    }

    pub async fn click_element(&self, description: &str, ctx: &PageContext) -> ActionOutcome {
        let handle = match self.resolve_element(description, ctx).await {
            Ok(Some(handle)) => handle,
            Ok(None) => return ActionOutcome::failed(format!("Couldn't find \"{description}\"")),
            Err(err) => return ActionOutcome::failed(err.to_string()),
        };
        match self.is_interactive(&handle).await {
            Ok(true) => {}
            Ok(false) => {
                return ActionOutcome::failed(format!("\"{description}\" isn't clickable"))
            }
            Err(err) => return ActionOutcome::failed(err.to_string()),
        }
        if let Err(err) = self.driver.scroll_to(&handle, ScrollBehavior::Smooth, ScrollBlock::Center).await
        {
            return ActionOutcome::failed(err.to_string());
        }
        tokio::time::sleep(CLICK_DELAY).await;
        match self.driver.click(&handle).await {
            Ok(()) => ActionOutcome::ok(),
            Err(err) => ActionOutcome::failed(err.to_string()),
        }
    }

    pub async fn focus_element(
        &self,
        description: &str,
        ctx: &PageContext,
        duration: Option<Duration>,
    ) -> ActionOutcome {
        let duration = duration.unwrap_or(FOCUS_DURATION);
        let handle = match self.resolve_element(description, ctx).await {
            Ok(Some(handle)) => handle,
            Ok(None) => return ActionOutcome::failed(format!("Couldn't find \"{description}\"")),
            Err(err) => return ActionOutcome::failed(err.to_string()),
        };
        if let Err(err) = self.driver.scroll_to(&handle, ScrollBehavior::Smooth, ScrollBlock::Center).await
        {
            return ActionOutcome::failed(err.to_string());
        }
        tokio::time::sleep(FOCUS_PRE_DELAY).await;
        let styles = [
            ("box-shadow", "0 0 0 4px rgba(99, 102, 241, 0.8), 0 0 36px rgba(99, 102, 241, 0.6)"),
            ("transform", "scale(1.05)"),
            ("z-index", "9999"),
            ("position", "relative"),
        ];
        match self.apply_styles(&handle, &styles, duration).await {
            Ok(()) => ActionOutcome::ok(),
            Err(err) => ActionOutcome::failed(err.to_string()),
        }
    }
}
