//! Negotiation persistence.
//!
//! The state machine only needs [`EntityStore`]; the negotiation handlers and
//! embedding applications use the richer [`NegotiationStore`] contract.

pub mod lease;
pub mod memory;

pub use lease::Lease;
pub use memory::InMemoryStore;
pub use negotiation_statemachine::{EntityStore, StoreError};

use async_trait::async_trait;
use negotiation_types::{Negotiation, NegotiationState};

/// Storage contract for contract negotiations
#[async_trait]
pub trait NegotiationStore: EntityStore<Negotiation> {
    /// Look up the negotiation the counterparty knows under `correlation_id`
    async fn find_by_correlation_id(
        &self,
        correlation_id: &str,
    ) -> Result<Option<Negotiation>, StoreError>;

    /// Remove a negotiation. Fails if another holder has a live lease on it.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Negotiations in `state`, oldest transition first, ignoring leases
    async fn query_by_state(
        &self,
        state: NegotiationState,
        limit: usize,
    ) -> Result<Vec<Negotiation>, StoreError>;
}
