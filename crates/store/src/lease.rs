/// Exclusive, time-bounded claim on an entity by one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub leased_by: String,

    /// Acquisition time, epoch milliseconds
    pub leased_at: u64,

    pub duration_ms: u64,
}

impl Lease {
    pub fn new(leased_by: impl Into<String>, leased_at: u64, duration_ms: u64) -> Self {
        Self {
            leased_by: leased_by.into(),
            leased_at,
            duration_ms,
        }
    }

    pub fn expires_at(&self) -> u64 {
        self.leased_at.saturating_add(self.duration_ms)
    }

    pub fn is_expired(&self, now_millis: u64) -> bool {
        now_millis >= self.expires_at()
    }

    pub fn is_held_by(&self, holder: &str) -> bool {
        self.leased_by == holder
    }

    /// Whether `holder` is locked out by this lease at `now_millis`
    pub fn blocks(&self, holder: &str, now_millis: u64) -> bool {
        !self.is_held_by(holder) && !self.is_expired(now_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_expiry() {
        let lease = Lease::new("worker-a", 1_000, 500);
        assert_eq!(lease.expires_at(), 1_500);
        assert!(!lease.is_expired(1_499));
        assert!(lease.is_expired(1_500));
    }

    #[test]
    fn test_lease_blocks_only_other_live_holders() {
        let lease = Lease::new("worker-a", 1_000, 500);
        assert!(!lease.blocks("worker-a", 1_100));
        assert!(lease.blocks("worker-b", 1_100));
        assert!(!lease.blocks("worker-b", 2_000));
    }

    #[test]
    fn test_lease_duration_saturates() {
        let lease = Lease::new("worker-a", u64::MAX - 1, 500);
        assert_eq!(lease.expires_at(), u64::MAX);
    }
}
