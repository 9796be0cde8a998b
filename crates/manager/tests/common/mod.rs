#![allow(dead_code)]

use negotiation_dispatch::MockDispatcher;
use negotiation_manager::{NegotiationContext, NegotiationManager};
use negotiation_statemachine::{EntityStore, FixedWaitStrategy, RetryPolicy};
use negotiation_store::InMemoryStore;
use negotiation_types::{
    ContractAgreement, ContractOffer, ManualClock, Negotiation, NegotiationParams,
    NegotiationState, NegotiationType, Policy, Rule,
};
use std::sync::Arc;
use std::time::Duration;

pub const PROTOCOL: &str = "dataspace-protocol-http";
pub const PROVIDER_ID: &str = "urn:connector:provider";
pub const START_MILLIS: u64 = 1_700_000_000_000;

/// Everything a handler scenario needs, wired against in-memory doubles
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: InMemoryStore<Negotiation>,
    pub dispatcher: MockDispatcher,
    pub ctx: Arc<NegotiationContext>,
}

impl Harness {
    pub fn new(retry_policy: RetryPolicy) -> Self {
        Self::with_options(retry_policy, false)
    }

    pub fn with_options(retry_policy: RetryPolicy, auto_agree_requested: bool) -> Self {
        let clock = Arc::new(ManualClock::new(START_MILLIS));
        let store = InMemoryStore::new("worker-1", clock.clone()).with_lease_duration(30_000);
        let dispatcher = MockDispatcher::new(PROTOCOL);

        let ctx = NegotiationContext::builder()
            .store(Arc::new(store.clone()))
            .dispatcher(Arc::new(dispatcher.clone()))
            .clock(clock.clone())
            .participant_id(PROVIDER_ID)
            .retry_policy(retry_policy)
            .batch_size(10)
            .auto_agree_requested(auto_agree_requested)
            .build()
            .expect("context");

        Self {
            clock,
            store,
            dispatcher,
            ctx: Arc::new(ctx),
        }
    }

    pub fn provider(&self) -> NegotiationManager {
        NegotiationManager::provider(
            self.ctx.clone(),
            FixedWaitStrategy::new(Duration::from_millis(5)),
        )
        .expect("provider manager")
    }

    pub fn consumer(&self) -> NegotiationManager {
        NegotiationManager::consumer(
            self.ctx.clone(),
            FixedWaitStrategy::new(Duration::from_millis(5)),
        )
        .expect("consumer manager")
    }

    pub async fn insert(&self, negotiation: Negotiation) {
        self.store.create(negotiation).await.expect("insert");
    }

    pub async fn get(&self, id: &str) -> Negotiation {
        self.store
            .find_by_id(id)
            .await
            .expect("store")
            .expect("negotiation exists")
    }
}

pub fn no_delay(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(max_retries, Duration::ZERO, Duration::ZERO)
}

pub fn policy() -> Policy {
    Policy::new()
        .with_target("asset-7")
        .with_permission(Rule::new("use"))
}

pub fn negotiation(
    id: &str,
    negotiation_type: NegotiationType,
    state: NegotiationState,
    offer_id: &str,
) -> Negotiation {
    Negotiation::new(
        NegotiationParams {
            id: Some(id.to_string()),
            negotiation_type,
            state,
            correlation_id: Some(format!("{id}-corr")),
            counter_party_id: "urn:connector:counterparty".to_string(),
            counter_party_address: "http://counterparty/protocol".to_string(),
            protocol: PROTOCOL.to_string(),
            callback_address: Some("http://us/callback".to_string()),
            offer: ContractOffer::new(offer_id, "asset-7", policy()),
        },
        START_MILLIS,
    )
    .expect("negotiation")
}

pub fn provider_negotiation(id: &str, state: NegotiationState) -> Negotiation {
    negotiation(id, NegotiationType::Provider, state, "ctr:asset-7:efgh")
}

pub fn consumer_negotiation(id: &str, state: NegotiationState) -> Negotiation {
    negotiation(id, NegotiationType::Consumer, state, "ctr:asset-7:efgh")
}

pub fn with_agreement(mut negotiation: Negotiation, agreement_id: &str) -> Negotiation {
    let agreement = ContractAgreement::new(
        agreement_id,
        PROVIDER_ID,
        negotiation.counter_party_id.clone(),
        1_600_000_000,
        "asset-7",
        policy(),
    )
    .expect("agreement");
    negotiation.set_contract_agreement(agreement);
    negotiation
}
