//! Content cache: TTL-bounded page-context snapshots keyed by URL and
//! content hash, flushed wholesale when the page mutates.

use std::sync::Arc;
use std::time::Duration;

use blitsum_core::{MutationKind, PageContext, PageEvent};
use moka::sync::Cache;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep_until, Instant};
use tracing::{debug, info};

const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
const MUTATION_DEBOUNCE: Duration = Duration::from_secs(1);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// CharacterData mutations shorter than this are cosmetic and ignored.
const SIGNIFICANT_TEXT_LEN: usize = 10;

/// Fast 32-bit rolling hash over page markup, used to key snapshots so a
/// changed page never serves a stale context even inside the TTL.
pub fn content_hash(text: &str) -> u32 {
    let mut hash: u32 = 5381;
    for byte in text.bytes() {
        hash = hash.wrapping_mul(31).wrapping_add(byte as u32);
    }
    hash
}

pub struct ContentCache {
    inner: Cache<String, Arc<PageContext>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().time_to_live(ttl).build(),
        }
    }

    fn key(url: &str, hash: Option<u32>) -> String {
        match hash {
            Some(hash) => format!("content:{url}:{hash:08x}"),
            None => format!("content:{url}"),
        }
    }

    /// Expired entries self-evict on read: a get after TTL returns `None`.
    pub fn get(&self, url: &str, hash: Option<u32>) -> Option<Arc<PageContext>> {
        self.inner.get(&Self::key(url, hash))
    }

    pub fn set(&self, url: &str, hash: Option<u32>, context: PageContext) -> Arc<PageContext> {
        let context = Arc::new(context);
        self.inner.insert(Self::key(url, hash), context.clone());
        context
    }

    /// Drop every cached snapshot.
    pub fn invalidate_all(&self) {
        debug!("content cache flushed");
        self.inner.invalidate_all();
    }

    /// Evict entries whose TTL has lapsed without waiting for a read.
    pub fn sweep(&self) {
        self.inner.run_pending_tasks();
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    fn is_significant(event: &PageEvent) -> bool {
        match event {
            PageEvent::Mutation { kind: MutationKind::ChildList, .. } => true,
            PageEvent::Mutation { kind: MutationKind::CharacterData, text_len } => {
                *text_len > SIGNIFICANT_TEXT_LEN
            }
            _ => false,
        }
    }

    /// Watch the page-event stream: significant mutations are debounced for
    /// one second and then flush the whole cache; a periodic sweep evicts
    /// expired entries. Runs until the sender side closes.
    pub async fn watch(self: Arc<Self>, mut events: mpsc::Receiver<PageEvent>) {
        let mut flush_at: Option<Instant> = None;
        let mut sweep = interval(SWEEP_INTERVAL);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!("content cache mutation watcher started");
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) if Self::is_significant(&event) => {
                            flush_at = Some(Instant::now() + MUTATION_DEBOUNCE);
                        }
                        Some(_) => {}
                        None => break,
                    }
                }
                _ = async { sleep_until(flush_at.unwrap()).await }, if flush_at.is_some() => {
                    self.invalidate_all();
                    flush_at = None;
                }
                _ = sweep.tick() => self.sweep(),
            }
        }
        debug!("content cache mutation watcher stopped");
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new()
    }
}
