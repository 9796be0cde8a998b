use std::time::Duration;

/// Delay for the given attempt: `initial * multiplier^attempt`, capped at `max`
pub fn exponential_delay(initial: Duration, max: Duration, multiplier: f64, attempt: u32) -> Duration {
    if attempt == 0 {
        return initial.min(max);
    }

    let exponent = attempt.min(i32::MAX as u32) as i32;
    let delay_ms = initial.as_millis() as f64 * multiplier.powi(exponent);
    let delay_ms = delay_ms.min(max.as_millis() as f64);
    Duration::from_millis(delay_ms as u64)
}

/// Decides how long the manager sleeps after a tick that found no work
pub trait WaitStrategy: Send {
    /// Delay before the next tick; called once per idle tick
    fn wait_for(&mut self) -> Duration;

    /// Work was found, reset any accumulated backoff
    fn success(&mut self);
}

/// Idle backoff that doubles on every consecutive empty tick
pub struct ExponentialWaitStrategy {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    idle_ticks: u32,
}

impl ExponentialWaitStrategy {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            multiplier: 2.0,
            idle_ticks: 0,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn idle_ticks(&self) -> u32 {
        self.idle_ticks
    }
}

impl WaitStrategy for ExponentialWaitStrategy {
    fn wait_for(&mut self) -> Duration {
        let delay = exponential_delay(self.initial, self.max, self.multiplier, self.idle_ticks);
        self.idle_ticks = self.idle_ticks.saturating_add(1);
        delay
    }

    fn success(&mut self) {
        self.idle_ticks = 0;
    }
}

impl Default for ExponentialWaitStrategy {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(5))
    }
}

/// Constant delay between idle ticks
pub struct FixedWaitStrategy {
    delay: Duration,
}

impl FixedWaitStrategy {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl WaitStrategy for FixedWaitStrategy {
    fn wait_for(&mut self) -> Duration {
        self.delay
    }

    fn success(&mut self) {}
}
