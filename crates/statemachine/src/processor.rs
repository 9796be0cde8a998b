use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use negotiation_types::StatefulEntity;
use std::fmt::Display;
use std::ops::AddAssign;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, Instrument};

use crate::instrumentation::ExecutorInstrumentation;
use crate::store::EntityStore;

/// What a handler did with the entity it was given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The handler acted and persisted the entity
    Processed,
    /// A retry is not due yet; the entity was left as is until a later tick
    Delayed,
    /// The handler could not act on the entity
    NotProcessed,
}

/// Handler bound to one state
pub type EntityHandler<E, Err> =
    Arc<dyn Fn(E) -> BoxFuture<'static, Result<HandlerOutcome, Err>> + Send + Sync>;

/// Per-processor result of one manager tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub processed: usize,
    pub delayed: usize,
    pub not_processed: usize,
    pub errors: usize,
    pub panics: usize,
}

impl AddAssign for ProcessOutcome {
    fn add_assign(&mut self, other: Self) {
        self.processed += other.processed;
        self.delayed += other.delayed;
        self.not_processed += other.not_processed;
        self.errors += other.errors;
        self.panics += other.panics;
    }
}

#[async_trait]
pub trait Processor: Send + Sync {
    fn name(&self) -> &str;

    async fn process(&self, instrumentation: &dyn ExecutorInstrumentation) -> ProcessOutcome;
}

/// Leases a batch of entities in one state and runs the bound handler on
/// each of them concurrently.
///
/// Whenever the handler does not complete its work (delayed, not
/// processed, failed or panicked) the lease is broken so the entity becomes
/// eligible for the next tick.
pub struct StateProcessor<E: StatefulEntity, Err, S: EntityStore<E> + ?Sized = dyn EntityStore<E>> {
    name: String,
    state: E::State,
    batch_size: usize,
    store: Arc<S>,
    handler: EntityHandler<E, Err>,
}

impl<E, Err, S> StateProcessor<E, Err, S>
where
    E: StatefulEntity,
    Err: Display + Send + 'static,
    S: EntityStore<E> + ?Sized,
{
    pub fn new(
        state: E::State,
        batch_size: usize,
        store: Arc<S>,
        handler: EntityHandler<E, Err>,
    ) -> Self {
        Self {
            name: format!("{}:{}", E::entity_type(), state),
            state,
            batch_size,
            store,
            handler,
        }
    }

    pub fn state(&self) -> E::State {
        self.state
    }

    async fn process_one(&self, entity: E, instrumentation: &dyn ExecutorInstrumentation) -> ProcessOutcome {
        let span = instrumentation.span(&self.name, entity.id());
        let handler = Arc::clone(&self.handler);
        let input = entity.clone();
        let result = AssertUnwindSafe(async move { handler(input).await })
            .catch_unwind()
            .instrument(span)
            .await;

        let outcome = match result {
            Ok(Ok(HandlerOutcome::Processed)) => {
                return ProcessOutcome {
                    processed: 1,
                    ..Default::default()
                }
            }
            Ok(Ok(HandlerOutcome::Delayed)) => {
                debug!(processor = %self.name, entity_id = %entity.id(), "entity delayed");
                ProcessOutcome {
                    delayed: 1,
                    ..Default::default()
                }
            }
            Ok(Ok(HandlerOutcome::NotProcessed)) => {
                error!(
                    processor = %self.name,
                    entity_id = %entity.id(),
                    alert = true,
                    "entity not processed"
                );
                ProcessOutcome {
                    not_processed: 1,
                    ..Default::default()
                }
            }
            Ok(Err(e)) => {
                error!(
                    processor = %self.name,
                    entity_id = %entity.id(),
                    error = %e,
                    "handler failed"
                );
                ProcessOutcome {
                    errors: 1,
                    ..Default::default()
                }
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(
                    processor = %self.name,
                    entity_id = %entity.id(),
                    panic = %message,
                    "handler panicked"
                );
                ProcessOutcome {
                    panics: 1,
                    ..Default::default()
                }
            }
        };

        if let Err(e) = self.store.break_lease(&entity).await {
            error!(entity_id = %entity.id(), error = %e, "failed to break lease");
        }
        outcome
    }
}

#[async_trait]
impl<E, Err, S> Processor for StateProcessor<E, Err, S>
where
    E: StatefulEntity,
    Err: Display + Send + 'static,
    S: EntityStore<E> + ?Sized + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, instrumentation: &dyn ExecutorInstrumentation) -> ProcessOutcome {
        let entities = match self.store.next_not_leased(self.batch_size, self.state).await {
            Ok(entities) => entities,
            Err(e) => {
                error!(processor = %self.name, error = %e, "failed to lease entities");
                return ProcessOutcome::default();
            }
        };

        if entities.is_empty() {
            return ProcessOutcome::default();
        }
        debug!(processor = %self.name, count = entities.len(), "leased batch");

        let outcomes = join_all(
            entities
                .into_iter()
                .map(|entity| self.process_one(entity, instrumentation)),
        )
        .await;

        let mut total = ProcessOutcome::default();
        for outcome in outcomes {
            total += outcome;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrumentation::NoopInstrumentation;
    use crate::store::StoreError;
    use negotiation_types::{
        ContractOffer, Negotiation, NegotiationParams, NegotiationState, NegotiationType, Policy,
    };
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    #[derive(Default)]
    struct LeasingStore {
        entities: Mutex<HashMap<String, Negotiation>>,
        leased: Mutex<HashSet<String>>,
    }

    impl LeasingStore {
        fn with(ids: &[&str], state: NegotiationState) -> Arc<Self> {
            let store = Self::default();
            for id in ids {
                let n = negotiation(id, state);
                store.entities.lock().unwrap().insert(id.to_string(), n);
            }
            Arc::new(store)
        }

        fn is_leased(&self, id: &str) -> bool {
            self.leased.lock().unwrap().contains(id)
        }
    }

    #[async_trait]
    impl EntityStore<Negotiation> for LeasingStore {
        async fn find_by_id(&self, id: &str) -> Result<Option<Negotiation>, StoreError> {
            Ok(self.entities.lock().unwrap().get(id).cloned())
        }

        async fn next_not_leased(
            &self,
            limit: usize,
            state: NegotiationState,
        ) -> Result<Vec<Negotiation>, StoreError> {
            let entities = self.entities.lock().unwrap();
            let mut leased = self.leased.lock().unwrap();
            let mut batch: Vec<_> = entities
                .values()
                .filter(|n| n.state() == state && !leased.contains(n.id()))
                .cloned()
                .collect();
            batch.sort_by(|a, b| a.id().cmp(b.id()));
            batch.truncate(limit);
            for n in &batch {
                leased.insert(n.id().to_string());
            }
            Ok(batch)
        }

        async fn save(&self, entity: &Negotiation) -> Result<(), StoreError> {
            self.entities
                .lock()
                .unwrap()
                .insert(entity.id().to_string(), entity.clone());
            self.leased.lock().unwrap().remove(entity.id());
            Ok(())
        }

        async fn break_lease(&self, entity: &Negotiation) -> Result<(), StoreError> {
            self.leased.lock().unwrap().remove(entity.id());
            Ok(())
        }
    }

    fn negotiation(id: &str, state: NegotiationState) -> Negotiation {
        Negotiation::new(
            NegotiationParams {
                id: Some(id.to_string()),
                negotiation_type: NegotiationType::Provider,
                state,
                correlation_id: None,
                counter_party_id: "consumer".to_string(),
                counter_party_address: "http://consumer".to_string(),
                protocol: "dsp".to_string(),
                callback_address: None,
                offer: ContractOffer::new("def:asset:uuid", "asset", Policy::new()),
            },
            0,
        )
        .unwrap()
    }

    fn processor(
        store: Arc<LeasingStore>,
        batch_size: usize,
        handler: EntityHandler<Negotiation, String>,
    ) -> StateProcessor<Negotiation, String> {
        let store: Arc<dyn EntityStore<Negotiation>> = store;
        StateProcessor::new(NegotiationState::Offering, batch_size, store, handler)
    }

    #[test]
    fn test_processor_name() {
        let store = LeasingStore::with(&[], NegotiationState::Offering);
        let handler: EntityHandler<Negotiation, String> = Arc::new(|_| Box::pin(async { Ok(HandlerOutcome::Processed) }));
        assert_eq!(
            processor(store, 1, handler).name(),
            "ContractNegotiation:OFFERING"
        );
    }

    #[tokio::test]
    async fn test_batch_size_limits_leased_entities() {
        let store = LeasingStore::with(&["a", "b", "c"], NegotiationState::Offering);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let handler: EntityHandler<Negotiation, String> = Arc::new(move |n| {
            recorder.lock().unwrap().push(n.id().to_string());
            Box::pin(async { Ok(HandlerOutcome::Processed) })
        });

        let outcome = processor(store.clone(), 2, handler)
            .process(&NoopInstrumentation)
            .await;

        assert_eq!(outcome.processed, 2);
        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_unfinished_entities_have_leases_broken() {
        let store = LeasingStore::with(&["ok", "later", "skip", "fail"], NegotiationState::Offering);
        let handler: EntityHandler<Negotiation, String> = Arc::new(|n| {
            let id = n.id().to_string();
            Box::pin(async move {
                match id.as_str() {
                    "ok" => Ok(HandlerOutcome::Processed),
                    "later" => Ok(HandlerOutcome::Delayed),
                    "skip" => Ok(HandlerOutcome::NotProcessed),
                    _ => Err("boom".to_string()),
                }
            })
        });

        let outcome = processor(store.clone(), 10, handler)
            .process(&NoopInstrumentation)
            .await;

        assert_eq!(
            outcome,
            ProcessOutcome {
                processed: 1,
                delayed: 1,
                not_processed: 1,
                errors: 1,
                panics: 0,
            }
        );
        // The successful handler never saved, so its lease is still held
        assert!(store.is_leased("ok"));
        assert!(!store.is_leased("later"));
        assert!(!store.is_leased("skip"));
        assert!(!store.is_leased("fail"));
    }

    #[tokio::test]
    async fn test_panicking_handler_is_contained() {
        let store = LeasingStore::with(&["p", "q"], NegotiationState::Offering);
        let handler: EntityHandler<Negotiation, String> = Arc::new(|n| {
            let id = n.id().to_string();
            Box::pin(async move {
                if id == "p" {
                    panic!("handler exploded");
                }
                Ok(HandlerOutcome::Processed)
            })
        });

        let outcome = processor(store.clone(), 10, handler)
            .process(&NoopInstrumentation)
            .await;

        assert_eq!(outcome.panics, 1);
        assert_eq!(outcome.processed, 1);
        assert!(!store.is_leased("p"));
    }

    #[tokio::test]
    async fn test_other_states_are_ignored() {
        let store = LeasingStore::with(&["x"], NegotiationState::Agreeing);
        let handler: EntityHandler<Negotiation, String> = Arc::new(|_| Box::pin(async { Ok(HandlerOutcome::Processed) }));

        let outcome = processor(store, 10, handler)
            .process(&NoopInstrumentation)
            .await;
        assert_eq!(outcome, ProcessOutcome::default());
    }
}
