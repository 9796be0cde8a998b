use negotiation_dispatch::RemoteMessageDispatcher;
use negotiation_statemachine::RetryPolicy;
use negotiation_store::NegotiationStore;
use negotiation_types::{Clock, SystemClock};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Collaborators and settings shared by every negotiation handler
pub struct NegotiationContext {
    pub store: Arc<dyn NegotiationStore>,
    pub dispatcher: Arc<dyn RemoteMessageDispatcher>,
    pub clock: Arc<dyn Clock>,

    /// Our own participant id; the provider id on agreements we create
    pub participant_id: String,

    pub retry_policy: RetryPolicy,

    /// Entities leased per state per tick
    pub batch_size: usize,

    /// Provider only: move REQUESTED negotiations straight to AGREEING
    pub auto_agree_requested: bool,
}

impl NegotiationContext {
    pub fn builder() -> NegotiationContextBuilder {
        NegotiationContextBuilder::new()
    }
}

impl fmt::Debug for NegotiationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NegotiationContext")
            .field("participant_id", &self.participant_id)
            .field("retry_policy", &self.retry_policy)
            .field("batch_size", &self.batch_size)
            .field("auto_agree_requested", &self.auto_agree_requested)
            .finish_non_exhaustive()
    }
}

/// Builder error
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("batch size must be at least 1")]
    InvalidBatchSize,
}

/// Builder for NegotiationContext
pub struct NegotiationContextBuilder {
    store: Option<Arc<dyn NegotiationStore>>,
    dispatcher: Option<Arc<dyn RemoteMessageDispatcher>>,
    clock: Option<Arc<dyn Clock>>,
    participant_id: Option<String>,
    retry_policy: RetryPolicy,
    batch_size: usize,
    auto_agree_requested: bool,
}

impl NegotiationContextBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            dispatcher: None,
            clock: None,
            participant_id: None,
            retry_policy: RetryPolicy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            auto_agree_requested: false,
        }
    }

    pub fn store(mut self, store: Arc<dyn NegotiationStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn RemoteMessageDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Defaults to the system clock
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn participant_id(mut self, participant_id: impl Into<String>) -> Self {
        self.participant_id = Some(participant_id.into());
        self
    }

    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn auto_agree_requested(mut self, auto_agree_requested: bool) -> Self {
        self.auto_agree_requested = auto_agree_requested;
        self
    }

    pub fn build(self) -> Result<NegotiationContext, BuilderError> {
        let store = self.store.ok_or_else(|| BuilderError::MissingField {
            field: "store".to_string(),
        })?;

        let dispatcher = self.dispatcher.ok_or_else(|| BuilderError::MissingField {
            field: "dispatcher".to_string(),
        })?;

        let participant_id = self
            .participant_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BuilderError::MissingField {
                field: "participant_id".to_string(),
            })?;

        if self.batch_size == 0 {
            return Err(BuilderError::InvalidBatchSize);
        }

        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };

        Ok(NegotiationContext {
            store,
            dispatcher,
            clock,
            participant_id,
            retry_policy: self.retry_policy,
            batch_size: self.batch_size,
            auto_agree_requested: self.auto_agree_requested,
        })
    }
}

impl Default for NegotiationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use negotiation_dispatch::MockDispatcher;
    use negotiation_store::InMemoryStore;
    use negotiation_types::{ManualClock, Negotiation};

    fn store() -> Arc<dyn NegotiationStore> {
        Arc::new(InMemoryStore::<Negotiation>::new(
            "provider",
            Arc::new(ManualClock::new(0)),
        ))
    }

    #[test]
    fn test_builder_defaults() {
        let ctx = NegotiationContext::builder()
            .store(store())
            .dispatcher(Arc::new(MockDispatcher::new("dsp")))
            .participant_id("provider-1")
            .build()
            .unwrap();

        assert_eq!(ctx.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(ctx.retry_policy, RetryPolicy::default());
        assert!(!ctx.auto_agree_requested);
        assert!(ctx.clock.now_millis() > 0);
    }

    #[test]
    fn test_builder_missing_fields() {
        let result = NegotiationContext::builder()
            .dispatcher(Arc::new(MockDispatcher::new("dsp")))
            .participant_id("provider-1")
            .build();
        match result {
            Err(BuilderError::MissingField { field }) => assert_eq!(field, "store"),
            other => panic!("expected MissingField error, got {other:?}"),
        }

        let result = NegotiationContext::builder()
            .store(store())
            .dispatcher(Arc::new(MockDispatcher::new("dsp")))
            .participant_id("")
            .build();
        assert!(matches!(result, Err(BuilderError::MissingField { field }) if field == "participant_id"));
    }

    #[test]
    fn test_builder_rejects_zero_batch_size() {
        let result = NegotiationContext::builder()
            .store(store())
            .dispatcher(Arc::new(MockDispatcher::new("dsp")))
            .participant_id("provider-1")
            .batch_size(0)
            .build();
        assert!(matches!(result, Err(BuilderError::InvalidBatchSize)));
    }
}
