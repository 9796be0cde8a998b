use futures::FutureExt;
use negotiation_statemachine::{
    EntityHandler, HandlerOutcome, ManagerStats, StateMachineError, StateMachineManager,
    StateMachineManagerBuilder, StateProcessor, WaitStrategy,
};
use negotiation_store::NegotiationStore;
use negotiation_types::{Negotiation, NegotiationState, NegotiationType};
use std::future::Future;
use std::sync::Arc;
use tracing::info;

use crate::context::NegotiationContext;
use crate::error::NegotiationError;
use crate::{consumer, provider};

type NegotiationProcessor = StateProcessor<Negotiation, NegotiationError, dyn NegotiationStore>;

/// One side of the negotiation protocol running on the state-machine engine
pub struct NegotiationManager {
    negotiation_type: NegotiationType,
    states: Vec<NegotiationState>,
    inner: StateMachineManager,
}

impl NegotiationManager {
    /// Provider bindings, in processing order: OFFERING, REQUESTED (when
    /// auto-agree is enabled), AGREEING, VERIFIED, FINALIZING, TERMINATING
    pub fn provider(
        ctx: Arc<NegotiationContext>,
        wait_strategy: impl WaitStrategy + 'static,
    ) -> Result<Self, StateMachineError> {
        let mut bindings = SideBuilder::new(NegotiationType::Provider, &ctx, wait_strategy)
            .bind(NegotiationState::Offering, provider::process_offering);
        if ctx.auto_agree_requested {
            bindings = bindings.bind(NegotiationState::Requested, provider::process_requested);
        }
        bindings
            .bind(NegotiationState::Agreeing, provider::process_agreeing)
            .bind(NegotiationState::Verified, provider::process_verified)
            .bind(NegotiationState::Finalizing, provider::process_finalizing)
            .bind(NegotiationState::Terminating, provider::process_terminating)
            .build()
    }

    /// Consumer bindings, in processing order: INITIAL, REQUESTING,
    /// ACCEPTING, AGREED, VERIFYING, TERMINATING
    pub fn consumer(
        ctx: Arc<NegotiationContext>,
        wait_strategy: impl WaitStrategy + 'static,
    ) -> Result<Self, StateMachineError> {
        SideBuilder::new(NegotiationType::Consumer, &ctx, wait_strategy)
            .bind(NegotiationState::Initial, consumer::process_initial)
            .bind(NegotiationState::Requesting, consumer::process_requesting)
            .bind(NegotiationState::Accepting, consumer::process_accepting)
            .bind(NegotiationState::Agreed, consumer::process_agreed)
            .bind(NegotiationState::Verifying, consumer::process_verifying)
            .bind(NegotiationState::Terminating, consumer::process_terminating)
            .build()
    }

    pub fn negotiation_type(&self) -> NegotiationType {
        self.negotiation_type
    }

    /// States this manager processes, in processing order
    pub fn monitored_states(&self) -> &[NegotiationState] {
        &self.states
    }

    pub fn start(&mut self) -> Result<(), StateMachineError> {
        info!(side = ?self.negotiation_type, states = ?self.states, "starting negotiation manager");
        self.inner.start()
    }

    pub async fn stop(&mut self) {
        self.inner.stop().await;
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    /// Run one processing round; returns the number of negotiations processed
    pub async fn tick(&self) -> usize {
        self.inner.tick().await
    }

    pub fn stats(&self) -> ManagerStats {
        self.inner.stats()
    }
}

struct SideBuilder {
    negotiation_type: NegotiationType,
    ctx: Arc<NegotiationContext>,
    states: Vec<NegotiationState>,
    builder: StateMachineManagerBuilder,
}

impl SideBuilder {
    fn new(
        negotiation_type: NegotiationType,
        ctx: &Arc<NegotiationContext>,
        wait_strategy: impl WaitStrategy + 'static,
    ) -> Self {
        let name = match negotiation_type {
            NegotiationType::Provider => "provider-contract-negotiation",
            NegotiationType::Consumer => "consumer-contract-negotiation",
        };
        Self {
            negotiation_type,
            ctx: Arc::clone(ctx),
            states: Vec::new(),
            builder: StateMachineManager::builder(name).with_wait_strategy(wait_strategy),
        }
    }

    fn bind<F, Fut>(mut self, state: NegotiationState, handle: F) -> Self
    where
        F: Fn(Arc<NegotiationContext>, Negotiation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HandlerOutcome, NegotiationError>> + Send + 'static,
    {
        let ctx = Arc::clone(&self.ctx);
        let handler: EntityHandler<Negotiation, NegotiationError> =
            Arc::new(move |negotiation| handle(Arc::clone(&ctx), negotiation).boxed());

        let processor: NegotiationProcessor = StateProcessor::new(
            state,
            self.ctx.batch_size,
            Arc::clone(&self.ctx.store),
            handler,
        );
        self.states.push(state);
        self.builder = self.builder.with_processor(processor);
        self
    }

    fn build(self) -> Result<NegotiationManager, StateMachineError> {
        Ok(NegotiationManager {
            negotiation_type: self.negotiation_type,
            states: self.states,
            inner: self.builder.build()?,
        })
    }
}
