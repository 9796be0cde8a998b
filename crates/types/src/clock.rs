use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of wall-clock time, injected so time-dependent transitions
/// (signing dates, retry delays, lease expiry) can be driven from tests.
pub trait Clock: Send + Sync + Debug {
    /// Current time in milliseconds since the Unix epoch
    fn now_millis(&self) -> u64;

    /// Current time in whole seconds since the Unix epoch
    fn now_secs(&self) -> u64 {
        self.now_millis() / 1000
    }
}

/// Wall clock backed by `chrono::Utc`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Manually advanced clock for deterministic tests
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(start_millis),
        }
    }

    pub fn advance_millis(&self, delta: u64) {
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn set_millis(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}
