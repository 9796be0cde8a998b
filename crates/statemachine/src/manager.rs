use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::instrumentation::{ExecutorInstrumentation, TracingInstrumentation};
use crate::processor::{ProcessOutcome, Processor};
use crate::wait::{ExponentialWaitStrategy, WaitStrategy};

#[derive(Debug, Error)]
pub enum StateMachineError {
    #[error("state machine '{0}' is already running")]
    AlreadyRunning(String),

    #[error("state machine '{0}' has no processors")]
    NoProcessors(String),
}

/// Cumulative counters since the manager was built
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ManagerStats {
    pub ticks: u64,
    pub idle_ticks: u64,
    pub processed: u64,
    /// Entities skipped because their retry was not due yet
    pub delayed: u64,
    pub not_processed: u64,
    pub errors: u64,
    pub panics: u64,
}

#[derive(Default)]
struct Counters {
    ticks: AtomicU64,
    idle_ticks: AtomicU64,
    processed: AtomicU64,
    delayed: AtomicU64,
    not_processed: AtomicU64,
    errors: AtomicU64,
    panics: AtomicU64,
}

struct Engine {
    name: String,
    processors: Vec<Box<dyn Processor>>,
    instrumentation: Box<dyn ExecutorInstrumentation>,
    wait_strategy: Mutex<Box<dyn WaitStrategy>>,
    counters: Counters,
}

impl Engine {
    async fn tick(&self) -> ProcessOutcome {
        let mut total = ProcessOutcome::default();
        for processor in &self.processors {
            total += processor.process(self.instrumentation.as_ref()).await;
        }

        self.counters.ticks.fetch_add(1, Ordering::Relaxed);
        self.counters
            .processed
            .fetch_add(total.processed as u64, Ordering::Relaxed);
        self.counters
            .delayed
            .fetch_add(total.delayed as u64, Ordering::Relaxed);
        self.counters
            .not_processed
            .fetch_add(total.not_processed as u64, Ordering::Relaxed);
        self.counters
            .errors
            .fetch_add(total.errors as u64, Ordering::Relaxed);
        self.counters
            .panics
            .fetch_add(total.panics as u64, Ordering::Relaxed);
        if total.processed == 0 {
            self.counters.idle_ticks.fetch_add(1, Ordering::Relaxed);
        }

        total
    }

    /// Delay before the next tick given how much work this one did
    async fn next_delay(&self, processed: usize) -> Duration {
        let mut wait_strategy = self.wait_strategy.lock().await;
        if processed > 0 {
            wait_strategy.success();
            Duration::ZERO
        } else {
            wait_strategy.wait_for()
        }
    }

    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(manager = %self.name, processors = self.processors.len(), "state machine started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = self.tick().await;
            let delay = self.next_delay(outcome.processed).await;

            if delay.is_zero() {
                tokio::task::yield_now().await;
                continue;
            }

            debug!(manager = %self.name, delay_ms = delay.as_millis() as u64, "no work found, waiting");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(manager = %self.name, "state machine stopped");
    }
}

/// Scheduling loop driving a fixed, ordered set of processors.
///
/// Every tick runs each processor once in registration order. A tick that
/// processes nothing is followed by a wait-strategy delay; any processed
/// entity resets the delay.
pub struct StateMachineManager {
    engine: Arc<Engine>,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl StateMachineManager {
    pub fn builder(name: impl Into<String>) -> StateMachineManagerBuilder {
        StateMachineManagerBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.engine.name
    }

    pub fn processor_names(&self) -> Vec<String> {
        self.engine
            .processors
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Spawn the scheduling loop on the current tokio runtime
    pub fn start(&mut self) -> Result<(), StateMachineError> {
        if self.is_running() {
            return Err(StateMachineError::AlreadyRunning(self.engine.name.clone()));
        }

        let (tx, rx) = watch::channel(false);
        let engine = Arc::clone(&self.engine);
        self.handle = Some(tokio::spawn(engine.run(rx)));
        self.shutdown = Some(tx);
        Ok(())
    }

    /// Signal the loop to halt and wait for the in-flight tick to finish
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!(manager = %self.engine.name, error = %e, "state machine task failed");
            }
        }
    }

    /// Run a single tick in the caller's task and feed the wait strategy.
    /// Returns the number of processed entities.
    pub async fn tick(&self) -> usize {
        let outcome = self.engine.tick().await;
        self.engine.next_delay(outcome.processed).await;
        outcome.processed
    }

    pub fn stats(&self) -> ManagerStats {
        let c = &self.engine.counters;
        ManagerStats {
            ticks: c.ticks.load(Ordering::Relaxed),
            idle_ticks: c.idle_ticks.load(Ordering::Relaxed),
            processed: c.processed.load(Ordering::Relaxed),
            delayed: c.delayed.load(Ordering::Relaxed),
            not_processed: c.not_processed.load(Ordering::Relaxed),
            errors: c.errors.load(Ordering::Relaxed),
            panics: c.panics.load(Ordering::Relaxed),
        }
    }
}

impl Drop for StateMachineManager {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
    }
}

/// Builder for StateMachineManager
pub struct StateMachineManagerBuilder {
    name: String,
    processors: Vec<Box<dyn Processor>>,
    instrumentation: Option<Box<dyn ExecutorInstrumentation>>,
    wait_strategy: Option<Box<dyn WaitStrategy>>,
}

impl StateMachineManagerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            processors: Vec::new(),
            instrumentation: None,
            wait_strategy: None,
        }
    }

    /// Add a processor; processors run in the order they are added
    pub fn with_processor(mut self, processor: impl Processor + 'static) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    pub fn with_wait_strategy(mut self, wait_strategy: impl WaitStrategy + 'static) -> Self {
        self.wait_strategy = Some(Box::new(wait_strategy));
        self
    }

    pub fn with_instrumentation(mut self, instrumentation: impl ExecutorInstrumentation + 'static) -> Self {
        self.instrumentation = Some(Box::new(instrumentation));
        self
    }

    pub fn build(self) -> Result<StateMachineManager, StateMachineError> {
        if self.processors.is_empty() {
            return Err(StateMachineError::NoProcessors(self.name));
        }

        let instrumentation: Box<dyn ExecutorInstrumentation> = match self.instrumentation {
            Some(instrumentation) => instrumentation,
            None => Box::new(TracingInstrumentation::new(self.name.clone())),
        };
        let wait_strategy: Box<dyn WaitStrategy> = match self.wait_strategy {
            Some(wait_strategy) => wait_strategy,
            None => Box::new(ExponentialWaitStrategy::default()),
        };

        Ok(StateMachineManager {
            engine: Arc::new(Engine {
                name: self.name,
                processors: self.processors,
                instrumentation,
                wait_strategy: Mutex::new(wait_strategy),
                counters: Counters::default(),
            }),
            shutdown: None,
            handle: None,
        })
    }
}
