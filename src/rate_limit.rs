use dashmap::DashMap;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;

const MINUTE_MS: u64 = 60_000;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

// Source of "now" in milliseconds since the Unix epoch
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// Clock that only moves when told to. Lets tests step through hours of
/// traffic without sleeping.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

// Trailing windows, in the order they are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Window {
    Minute,
    Hour,
    Day,
}

impl Window {
    pub const ALL: [Window; 3] = [Window::Minute, Window::Hour, Window::Day];

    pub fn as_str(&self) -> &'static str {
        match self {
            Window::Minute => "minute",
            Window::Hour => "hour",
            Window::Day => "day",
        }
    }

    pub fn span_millis(&self) -> u64 {
        match self {
            Window::Minute => MINUTE_MS,
            Window::Hour => HOUR_MS,
            Window::Day => DAY_MS,
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single admission check.
///
/// `Rejected` carries the first window that was full, with the count observed
/// and the configured cap. Those details are for operator logs and metrics;
/// clients only ever see a generic 429.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admitted,
    Rejected { window: Window, count: usize, limit: u32 },
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted)
    }
}

// Request history for one client, oldest first
#[derive(Debug, Default, Clone)]
pub struct ClientRecord {
    timestamps: VecDeque<u64>,
}

impl ClientRecord {
    // Drop everything a full day old or older
    fn prune(&mut self, now: u64) {
        self.timestamps
            .retain(|&stamp| now.saturating_sub(stamp) < DAY_MS);
    }

    // Requests inside the trailing window; assumes prune() already ran
    fn count_within(&self, window: Window, now: u64) -> usize {
        match window {
            Window::Day => self.timestamps.len(),
            _ => self
                .timestamps
                .iter()
                .filter(|&&stamp| now.saturating_sub(stamp) < window.span_millis())
                .count(),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Per-client sliding-window limiter enforcing minute, hour and day quotas.
///
/// Every check for a key runs under that key's map entry lock, so the
/// prune/count/append sequence is atomic per client. Different clients only
/// contend when they hash to the same shard.
pub struct RateLimiter {
    config: RateLimitConfig,
    clients: DashMap<String, ClientRecord>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clients: DashMap::new(),
            clock,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Admits the request and records it if the client is under every quota.
    pub fn check_and_record(&self, client_id: &str) -> bool {
        self.check(client_id).is_admitted()
    }

    /// Same as [`check_and_record`](Self::check_and_record) but reports which
    /// window rejected the request.
    pub fn check(&self, client_id: &str) -> Decision {
        let now = self.clock.now_millis();

        let mut record = self.clients.entry(client_id.to_string()).or_default();
        record.prune(now);

        for window in Window::ALL {
            let count = record.count_within(window, now);
            let limit = self.config.limit(window);
            if count >= limit as usize {
                warn!(
                    client = client_id,
                    window = window.as_str(),
                    count,
                    limit,
                    "rate limit exceeded"
                );
                return Decision::Rejected { window, count, limit };
            }
        }

        record.timestamps.push_back(now);
        debug!(client = client_id, day_count = record.len(), "request admitted");
        Decision::Admitted
    }

    /// Drops clients with no requests left in the trailing day. Returns how
    /// many records were removed.
    pub fn sweep_idle(&self) -> usize {
        let now = self.clock.now_millis();
        let before = self.clients.len();

        self.clients.retain(|_, record| {
            record.prune(now);
            !record.is_empty()
        });

        before.saturating_sub(self.clients.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}
