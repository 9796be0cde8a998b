use async_trait::async_trait;
use negotiation_statemachine::{EntityStore, StoreError};
use negotiation_types::{Clock, Negotiation, NegotiationState, StatefulEntity};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::lease::Lease;
use crate::NegotiationStore;

// ═══════════════════════════════════════════════════════════════════════════
// CORE TYPES
// ═══════════════════════════════════════════════════════════════════════════

pub const DEFAULT_LEASE_DURATION_MS: u64 = 60_000;

#[derive(Debug, Clone)]
struct Record<E> {
    entity: E,
    lease: Option<Lease>,
}

// ═══════════════════════════════════════════════════════════════════════════
// IN-MEMORY STORE
// ═══════════════════════════════════════════════════════════════════════════

/// Lease-aware in-memory store.
///
/// Each handle acts on behalf of one lease holder. Handles obtained through
/// [`InMemoryStore::for_holder`] share the same records, which is how several
/// workers in one process contend for the same entities.
pub struct InMemoryStore<E> {
    holder: String,
    records: Arc<Mutex<HashMap<String, Record<E>>>>,
    clock: Arc<dyn Clock>,
    lease_duration_ms: u64,
}

impl<E: StatefulEntity> InMemoryStore<E> {
    pub fn new(holder: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            holder: holder.into(),
            records: Arc::new(Mutex::new(HashMap::new())),
            clock,
            lease_duration_ms: DEFAULT_LEASE_DURATION_MS,
        }
    }

    pub fn with_lease_duration(mut self, lease_duration_ms: u64) -> Self {
        self.lease_duration_ms = lease_duration_ms;
        self
    }

    /// Another handle on the same records, leasing as `holder`
    pub fn for_holder(&self, holder: impl Into<String>) -> Self {
        Self {
            holder: holder.into(),
            records: Arc::clone(&self.records),
            clock: Arc::clone(&self.clock),
            lease_duration_ms: self.lease_duration_ms,
        }
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Insert a new, unleased entity
    pub async fn create(&self, entity: E) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        if records.contains_key(entity.id()) {
            return Err(StoreError::DuplicateId(entity.id().to_string()));
        }
        records.insert(entity.id().to_string(), Record { entity, lease: None });
        Ok(())
    }

    pub async fn lease_of(&self, id: &str) -> Option<Lease> {
        self.records
            .lock()
            .await
            .get(id)
            .and_then(|r| r.lease.clone())
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Fails when a live lease is held by someone other than this handle
    fn check_lease(&self, id: &str, lease: Option<&Lease>, now: u64) -> Result<(), StoreError> {
        match lease {
            Some(lease) if lease.blocks(&self.holder, now) => Err(StoreError::AlreadyLeased {
                id: id.to_string(),
                holder: lease.leased_by.clone(),
            }),
            _ => Ok(()),
        }
    }
}

impl<E> Clone for InMemoryStore<E> {
    fn clone(&self) -> Self {
        Self {
            holder: self.holder.clone(),
            records: Arc::clone(&self.records),
            clock: Arc::clone(&self.clock),
            lease_duration_ms: self.lease_duration_ms,
        }
    }
}

#[async_trait]
impl<E: StatefulEntity> EntityStore<E> for InMemoryStore<E> {
    async fn find_by_id(&self, id: &str) -> Result<Option<E>, StoreError> {
        Ok(self.records.lock().await.get(id).map(|r| r.entity.clone()))
    }

    async fn next_not_leased(&self, limit: usize, state: E::State) -> Result<Vec<E>, StoreError> {
        let now = self.clock.now_millis();
        let mut records = self.records.lock().await;

        let mut candidates: Vec<(u64, String)> = records
            .values()
            .filter(|r| r.entity.state() == state)
            .filter(|r| r.lease.as_ref().map_or(true, |l| l.is_expired(now)))
            .map(|r| (r.entity.state_timestamp(), r.entity.id().to_string()))
            .collect();
        candidates.sort();
        candidates.truncate(limit);

        let mut batch = Vec::with_capacity(candidates.len());
        for (_, id) in candidates {
            if let Some(record) = records.get_mut(&id) {
                record.lease = Some(Lease::new(&self.holder, now, self.lease_duration_ms));
                batch.push(record.entity.clone());
            }
        }

        if !batch.is_empty() {
            trace!(holder = %self.holder, state = %state, count = batch.len(), "leased entities");
        }
        Ok(batch)
    }

    async fn save(&self, entity: &E) -> Result<(), StoreError> {
        let now = self.clock.now_millis();
        let mut records = self.records.lock().await;

        if let Some(existing) = records.get(entity.id()) {
            self.check_lease(entity.id(), existing.lease.as_ref(), now)?;
        }
        records.insert(
            entity.id().to_string(),
            Record {
                entity: entity.clone(),
                lease: None,
            },
        );
        Ok(())
    }

    async fn break_lease(&self, entity: &E) -> Result<(), StoreError> {
        let now = self.clock.now_millis();
        let mut records = self.records.lock().await;

        let Some(record) = records.get_mut(entity.id()) else {
            return Ok(());
        };
        self.check_lease(entity.id(), record.lease.as_ref(), now)?;
        if record.lease.take().is_some() {
            debug!(holder = %self.holder, entity_id = %entity.id(), "lease released");
        }
        Ok(())
    }
}

#[async_trait]
impl NegotiationStore for InMemoryStore<Negotiation> {
    async fn find_by_correlation_id(
        &self,
        correlation_id: &str,
    ) -> Result<Option<Negotiation>, StoreError> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .find(|r| r.entity.correlation_id() == Some(correlation_id))
            .map(|r| r.entity.clone()))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let now = self.clock.now_millis();
        let mut records = self.records.lock().await;

        let record = records
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.check_lease(id, record.lease.as_ref(), now)?;
        records.remove(id);
        Ok(())
    }

    async fn query_by_state(
        &self,
        state: NegotiationState,
        limit: usize,
    ) -> Result<Vec<Negotiation>, StoreError> {
        let records = self.records.lock().await;
        let mut results: Vec<_> = records
            .values()
            .filter(|r| r.entity.state() == state)
            .map(|r| r.entity.clone())
            .collect();

        results.sort_by_key(|n| n.state_timestamp());
        results.truncate(limit);
        Ok(results)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════
