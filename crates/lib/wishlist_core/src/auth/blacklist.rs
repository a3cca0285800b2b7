//! Revocation registry for otherwise stateless access tokens.
//!
//! Entries map a token's `jti` to the token's own expiry. Once that expiry
//! passes the signature check rejects the token anyway, so the entry can go.
//! Purging happens three ways:
//!
//! - amortised from [`TokenBlacklist::revoke`] once the sweep interval has
//!   elapsed since the last sweep,
//! - on demand through [`TokenBlacklist::sweep`],
//! - on a timer through [`TokenBlacklist::spawn_sweep_task`].
//!
//! Reads go straight to a sharded [`DashMap`]; a sweep walks one shard at a
//! time, so lookups on other shards are never held up. Concurrent sweepers
//! agree on a single owner through atomics: the amortised path claims the
//! last-sweep timestamp with a compare-and-swap, and every sweep additionally
//! holds a `sweeping` flag so a racing caller returns immediately.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

/// Default interval between amortised sweeps: one hour.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Default period of the background sweep task: ten minutes.
pub const DEFAULT_SWEEP_TASK_PERIOD: Duration = Duration::from_secs(10 * 60);

/// Concurrent set of revoked token identifiers.
#[derive(Debug)]
pub struct TokenBlacklist {
    entries: DashMap<String, DateTime<Utc>>,
    /// Unix millis of the last completed or claimed sweep.
    last_sweep_ms: AtomicI64,
    sweeping: AtomicBool,
    sweep_interval_ms: i64,
}

impl TokenBlacklist {
    /// Create a blacklist with the default one-hour sweep interval.
    pub fn new() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }

    pub fn with_sweep_interval(interval: Duration) -> Self {
        Self::with_sweep_interval_at(interval, Utc::now())
    }

    /// Create a blacklist whose sweep clock starts at `now`.
    pub fn with_sweep_interval_at(interval: Duration, now: DateTime<Utc>) -> Self {
        Self {
            entries: DashMap::new(),
            last_sweep_ms: AtomicI64::new(now.timestamp_millis()),
            sweeping: AtomicBool::new(false),
            sweep_interval_ms: i64::try_from(interval.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// Record `token_id` as revoked until `expires_at`. Idempotent: a second
    /// call for the same id keeps the later of the two expiries.
    pub fn revoke(&self, token_id: &str, expires_at: DateTime<Utc>) {
        self.revoke_at(token_id, expires_at, Utc::now());
    }

    /// [`Self::revoke`] against an explicit clock.
    pub fn revoke_at(&self, token_id: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.entries
            .entry(token_id.to_string())
            .and_modify(|exp| {
                if expires_at > *exp {
                    *exp = expires_at;
                }
            })
            .or_insert(expires_at);

        self.sweep_if_due(now);
    }

    /// Whether `token_id` has been revoked.
    pub fn is_revoked(&self, token_id: &str) -> bool {
        self.entries.contains_key(token_id)
    }

    /// Remove every entry whose expiry has passed. Returns the number removed;
    /// a caller that loses the race to a running sweep gets `0` straight away.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    /// [`Self::sweep`] against an explicit clock.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let Some(_guard) = SweepGuard::acquire(&self.sweeping) else {
            return 0;
        };

        let before = self.entries.len();
        self.entries.retain(|_, exp| *exp >= now);
        let removed = before.saturating_sub(self.entries.len());

        self.last_sweep_ms
            .fetch_max(now.timestamp_millis(), Ordering::AcqRel);
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "swept token blacklist");
        }
        removed
    }

    /// Number of live entries (revoked tokens not yet swept).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run a sweep if the interval has elapsed and this caller wins the
    /// compare-and-swap on the last-sweep timestamp.
    fn sweep_if_due(&self, now: DateTime<Utc>) {
        let now_ms = now.timestamp_millis();
        let last = self.last_sweep_ms.load(Ordering::Acquire);
        if now_ms.saturating_sub(last) <= self.sweep_interval_ms {
            return;
        }
        if self
            .last_sweep_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.sweep_at(now);
        }
    }

    /// Spawn a task that sweeps every `period`.
    pub fn spawn_sweep_task(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let blacklist = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                blacklist.sweep();
            }
        })
    }
}

impl Default for TokenBlacklist {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive right to run a sweep; released on drop, including on unwind.
struct SweepGuard<'a>(&'a AtomicBool);

impl<'a> SweepGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
