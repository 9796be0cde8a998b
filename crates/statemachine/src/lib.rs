//! Generic state-machine engine for persisted, leased entities
//!
//! This crate provides the pieces every negotiation side is built from:
//!
//! - `EntityStore`: lease-aware persistence contract
//! - `RetryProcess`: one dispatch attempt with retry, fatal and exhaustion routing
//! - `StateProcessor`: binds an entity state to a handler
//! - `StateMachineManager`: the scheduling loop driving a set of processors
//! - `WaitStrategy`: idle-tick backoff

pub mod instrumentation;
pub mod manager;
pub mod processor;
pub mod retry;
pub mod store;
pub mod wait;

pub use instrumentation::{ExecutorInstrumentation, NoopInstrumentation, TracingInstrumentation};
pub use manager::{ManagerStats, StateMachineError, StateMachineManager, StateMachineManagerBuilder};
pub use processor::{EntityHandler, HandlerOutcome, ProcessOutcome, Processor, StateProcessor};
pub use retry::{RetryError, RetryPolicy, RetryProcess};
pub use store::{EntityStore, StoreError};
pub use wait::{exponential_delay, ExponentialWaitStrategy, FixedWaitStrategy, WaitStrategy};
