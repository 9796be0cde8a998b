use async_trait::async_trait;
use negotiation_types::StatefulEntity;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("entity {id} is leased by {holder}")]
    AlreadyLeased { id: String, holder: String },

    #[error("duplicate entity ID: {0}")]
    DuplicateId(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Lease-aware persistence used by the state machine.
///
/// Implementations must be safe under concurrent callers from multiple
/// workers; `next_not_leased` must never hand out an entity whose lease is
/// held by another live holder.
#[async_trait]
pub trait EntityStore<E: StatefulEntity>: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<E>, StoreError>;

    /// Atomically lease and return up to `limit` entities in `state` that
    /// are not currently leased (or whose lease expired)
    async fn next_not_leased(&self, limit: usize, state: E::State) -> Result<Vec<E>, StoreError>;

    /// Persist the entity and release the caller's lease on it
    async fn save(&self, entity: &E) -> Result<(), StoreError>;

    /// Release the caller's lease without changing the entity.
    /// Releasing a lease that is not held is a no-op.
    async fn break_lease(&self, entity: &E) -> Result<(), StoreError>;
}
