//! Contract negotiation engine
//!
//! Drives provider and consumer negotiations through their states on a
//! lease-based state machine: each tick leases negotiations per state,
//! dispatches the protocol message for that state, and persists the
//! resulting transition.

pub mod logging;

pub use negotiation_config as config;
pub use negotiation_dispatch as dispatch;
pub use negotiation_manager as manager;
pub use negotiation_statemachine as statemachine;
pub use negotiation_store as store;
pub use negotiation_types as types;

pub use logging::{init_tracing, TracingError};

use negotiation_config::NegotiationConfig;
use negotiation_manager::NegotiationContextBuilder;
use negotiation_store::InMemoryStore;
use negotiation_types::{Clock, Negotiation};
use std::sync::Arc;

/// Context builder preloaded with the configured participant and engine
/// settings; the caller still supplies the store and dispatcher.
pub fn context_builder(config: &NegotiationConfig) -> NegotiationContextBuilder {
    NegotiationContextBuilder::new()
        .participant_id(config.participant_id.as_str())
        .retry_policy(config.retry_policy())
        .batch_size(config.state_machine.batch_size)
        .auto_agree_requested(config.provider.auto_agree_requested)
}

/// In-memory store for `holder` using the configured lease duration
pub fn in_memory_store(
    holder: impl Into<String>,
    clock: Arc<dyn Clock>,
    config: &NegotiationConfig,
) -> InMemoryStore<Negotiation> {
    InMemoryStore::new(holder, clock).with_lease_duration(config.state_machine.lease_duration_ms)
}
