//! Per-(address, token) cooldown memory.
//!
//! Entries live only in process memory. A background [`CooldownSweeper`]
//! evicts entries once they fall outside the window so the map does not
//! grow without bound.

use crate::types::Address;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// 24 hours in milliseconds.
pub const DEFAULT_COOLDOWN_MS: i64 = 86_400_000;

/// Window used by the service. Client messages state "24 hours".
pub const COOLDOWN_WINDOW: Duration = Duration::from_millis(DEFAULT_COOLDOWN_MS as u64);

/// Source of "now" in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// True once `now - last_sent` reaches the window. The boundary is inclusive.
pub fn is_cooled_down(last_sent: i64, now: i64, window_ms: i64) -> bool {
    now.saturating_sub(last_sent) >= window_ms
}

/// Remove every entry whose age is at least `window_ms`. Returns the number
/// of evicted entries.
pub fn sweep_entries<K>(entries: &mut HashMap<K, i64>, now: i64, window_ms: i64) -> usize {
    let before = entries.len();
    entries.retain(|_, last_sent| !is_cooled_down(*last_sent, now, window_ms));
    before - entries.len()
}

type CooldownKey = (Address, String);

/// Last-dispensed timestamps keyed by recipient and token symbol.
pub struct CooldownStore {
    entries: RwLock<HashMap<CooldownKey, i64>>,
    window_ms: i64,
    clock: Arc<dyn Clock>,
}

impl CooldownStore {
    pub fn new(window: Duration) -> Self {
        Self::with_clock(window, Arc::new(SystemClock))
    }

    pub fn with_clock(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            window_ms: i64::try_from(window.as_millis()).unwrap_or(i64::MAX),
            clock,
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Last recorded send time for the pair, if any.
    pub async fn get_last_sent(&self, address: &Address, token: &str) -> Option<i64> {
        self.entries
            .read()
            .await
            .get(&(*address, token.to_string()))
            .copied()
    }

    /// Overwrite the pair's timestamp with the current time.
    pub async fn record_sent(&self, address: &Address, token: &str) {
        let now = self.clock.now_millis();
        self.entries
            .write()
            .await
            .insert((*address, token.to_string()), now);
    }

    /// Check eligibility and record the send in one critical section.
    ///
    /// Returns the claim timestamp on success, or the milliseconds left in
    /// the window when the pair is still cooling down.
    pub async fn try_claim(&self, address: &Address, token: &str) -> Result<i64, i64> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.write().await;
        let key = (*address, token.to_string());

        if let Some(&last_sent) = entries.get(&key) {
            if !is_cooled_down(last_sent, now, self.window_ms) {
                return Err(self.window_ms - now.saturating_sub(last_sent));
            }
        }

        entries.insert(key, now);
        Ok(now)
    }

    /// Undo a claim made by [`try_claim`](Self::try_claim). Leaves the entry
    /// alone if it has been overwritten since.
    pub async fn release(&self, address: &Address, token: &str, claimed_at: i64) -> bool {
        let mut entries = self.entries.write().await;
        let key = (*address, token.to_string());
        if entries.get(&key) == Some(&claimed_at) {
            entries.remove(&key);
            true
        } else {
            false
        }
    }

    /// Evict entries whose age is at least the window.
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now_millis();
        let mut entries = self.entries.write().await;
        let removed = sweep_entries(&mut entries, now, self.window_ms);
        debug!(removed, remaining = entries.len(), "Cooldown sweep finished");
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Background task running [`CooldownStore::sweep`] on a fixed interval.
pub struct CooldownSweeper {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl CooldownSweeper {
    /// Spawn the sweep loop. The first sweep happens one `interval` after start.
    pub fn start(store: Arc<CooldownStore>, interval: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = store.sweep().await;
                        if removed > 0 {
                            info!("Evicted {} expired cooldown entries", removed);
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            debug!("Cooldown sweeper stopped");
        });

        info!("Cooldown sweeper started, interval {:?}", interval);
        Self { shutdown, handle }
    }

    /// Signal the loop to exit and wait for it.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
