use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    ContractAgreement, ContractOffer, NegotiationState, NegotiationType, StatefulEntity,
    TransitionError,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationBuildError {
    #[error("negotiation is missing required field: {0}")]
    MissingField(&'static str),
}

/// Everything needed to create a negotiation record
#[derive(Debug, Clone)]
pub struct NegotiationParams {
    /// Generated when absent
    pub id: Option<String>,
    pub negotiation_type: NegotiationType,
    pub state: NegotiationState,
    pub correlation_id: Option<String>,
    pub counter_party_id: String,
    pub counter_party_address: String,
    pub protocol: String,
    pub callback_address: Option<String>,
    pub offer: ContractOffer,
}

/// Persistent negotiation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Negotiation {
    id: String,
    negotiation_type: NegotiationType,
    state: NegotiationState,
    state_count: u32,
    state_timestamp: u64,
    correlation_id: Option<String>,
    pub counter_party_id: String,
    pub counter_party_address: String,
    pub protocol: String,
    pub callback_address: Option<String>,
    contract_offers: Vec<ContractOffer>,
    contract_agreement: Option<ContractAgreement>,
    error_detail: Option<String>,
    created_at: u64,
    updated_at: u64,
}

impl Negotiation {
    pub fn new(params: NegotiationParams, now_millis: u64) -> Result<Self, NegotiationBuildError> {
        if params.counter_party_id.is_empty() {
            return Err(NegotiationBuildError::MissingField("counter_party_id"));
        }
        if params.counter_party_address.is_empty() {
            return Err(NegotiationBuildError::MissingField("counter_party_address"));
        }
        if params.protocol.is_empty() {
            return Err(NegotiationBuildError::MissingField("protocol"));
        }
        if params.offer.id.is_empty() {
            return Err(NegotiationBuildError::MissingField("offer.id"));
        }

        let id = params
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(Self {
            id,
            negotiation_type: params.negotiation_type,
            state: params.state,
            state_count: 1,
            state_timestamp: now_millis,
            correlation_id: params.correlation_id.filter(|c| !c.is_empty()),
            counter_party_id: params.counter_party_id,
            counter_party_address: params.counter_party_address,
            protocol: params.protocol,
            callback_address: params.callback_address,
            contract_offers: vec![params.offer],
            contract_agreement: None,
            error_detail: None,
            created_at: now_millis,
            updated_at: now_millis,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn negotiation_type(&self) -> NegotiationType {
        self.negotiation_type
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn state_count(&self) -> u32 {
        self.state_count
    }

    pub fn state_timestamp(&self) -> u64 {
        self.state_timestamp
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Process id to put on outgoing messages.
    ///
    /// Before the counterparty has told us its id (consumer's initial
    /// request) our own id is what it will correlate on.
    pub fn process_id(&self) -> &str {
        self.correlation_id.as_deref().unwrap_or(&self.id)
    }

    pub fn contract_offers(&self) -> &[ContractOffer] {
        &self.contract_offers
    }

    pub fn last_contract_offer(&self) -> Option<&ContractOffer> {
        self.contract_offers.last()
    }

    pub fn contract_agreement(&self) -> Option<&ContractAgreement> {
        self.contract_agreement.as_ref()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn updated_at(&self) -> u64 {
        self.updated_at
    }

    /// Record the counterparty's process id; it cannot change once known
    pub fn set_correlation_id(&mut self, correlation_id: impl Into<String>) -> Result<(), TransitionError> {
        let correlation_id = correlation_id.into();
        match &self.correlation_id {
            Some(existing) if *existing != correlation_id => Err(TransitionError::CorrelationIdImmutable {
                id: self.id.clone(),
                existing: existing.clone(),
            }),
            _ => {
                self.correlation_id = Some(correlation_id);
                Ok(())
            }
        }
    }

    pub fn add_contract_offer(&mut self, offer: ContractOffer) {
        self.contract_offers.push(offer);
    }

    pub fn set_contract_agreement(&mut self, agreement: ContractAgreement) {
        self.contract_agreement = Some(agreement);
    }

    /// Move to `next`, or re-enter the current state to record a retry
    pub fn transition_to(&mut self, next: NegotiationState, now_millis: u64) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError::Illegal {
                id: self.id.clone(),
                from: self.state,
                to: next,
            });
        }

        if next == self.state {
            self.state_count += 1;
        } else {
            self.state = next;
            self.state_count = 1;
        }
        self.state_timestamp = now_millis;
        self.updated_at = now_millis;
        Ok(())
    }

    pub fn transition_to_terminating(
        &mut self,
        detail: Option<String>,
        now_millis: u64,
    ) -> Result<(), TransitionError> {
        self.transition_to(NegotiationState::Terminating, now_millis)?;
        if detail.is_some() {
            self.error_detail = detail;
        }
        Ok(())
    }

    pub fn transition_to_terminated(
        &mut self,
        detail: Option<String>,
        now_millis: u64,
    ) -> Result<(), TransitionError> {
        self.transition_to(NegotiationState::Terminated, now_millis)?;
        if detail.is_some() {
            self.error_detail = detail;
        }
        Ok(())
    }
}

impl StatefulEntity for Negotiation {
    type State = NegotiationState;

    fn entity_type() -> &'static str {
        "ContractNegotiation"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> NegotiationState {
        self.state
    }

    fn state_count(&self) -> u32 {
        self.state_count
    }

    fn state_timestamp(&self) -> u64 {
        self.state_timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Policy;

    fn params(state: NegotiationState) -> NegotiationParams {
        NegotiationParams {
            id: Some("neg-1".to_string()),
            negotiation_type: NegotiationType::Provider,
            state,
            correlation_id: Some("consumer-proc-1".to_string()),
            counter_party_id: "consumer".to_string(),
            counter_party_address: "http://consumer/dsp".to_string(),
            protocol: "dataspace-protocol-http".to_string(),
            callback_address: None,
            offer: ContractOffer::new("ctr:asset-1:abcd", "asset-1", Policy::new()),
        }
    }

    #[test]
    fn test_new_negotiation() {
        let negotiation = Negotiation::new(params(NegotiationState::Offering), 1_000).unwrap();
        assert_eq!(negotiation.id(), "neg-1");
        assert_eq!(negotiation.state(), NegotiationState::Offering);
        assert_eq!(negotiation.state_count(), 1);
        assert_eq!(negotiation.state_timestamp(), 1_000);
        assert_eq!(negotiation.last_contract_offer().unwrap().id, "ctr:asset-1:abcd");
        assert!(negotiation.contract_agreement().is_none());
    }

    #[test]
    fn test_id_generated_when_absent() {
        let mut p = params(NegotiationState::Initial);
        p.id = None;
        let negotiation = Negotiation::new(p, 0).unwrap();
        assert!(Uuid::parse_str(negotiation.id()).is_ok());
    }

    #[test]
    fn test_required_fields() {
        let mut p = params(NegotiationState::Initial);
        p.counter_party_address = String::new();
        assert_eq!(
            Negotiation::new(p, 0),
            Err(NegotiationBuildError::MissingField("counter_party_address"))
        );
    }

    #[test]
    fn test_retry_increments_state_count() {
        let mut negotiation = Negotiation::new(params(NegotiationState::Offering), 1_000).unwrap();

        negotiation.transition_to(NegotiationState::Offering, 2_000).unwrap();
        negotiation.transition_to(NegotiationState::Offering, 3_000).unwrap();
        assert_eq!(negotiation.state_count(), 3);
        assert_eq!(negotiation.state_timestamp(), 3_000);
        assert!(negotiation.is_retry());

        negotiation.transition_to(NegotiationState::Offered, 4_000).unwrap();
        assert_eq!(negotiation.state_count(), 1);
        assert!(!negotiation.is_retry());
    }

    #[test]
    fn test_illegal_transition_leaves_entity_untouched() {
        let mut negotiation = Negotiation::new(params(NegotiationState::Offering), 1_000).unwrap();
        let before = negotiation.clone();

        let result = negotiation.transition_to(NegotiationState::Finalized, 2_000);
        assert!(matches!(result, Err(TransitionError::Illegal { .. })));
        assert_eq!(negotiation, before);
    }

    #[test]
    fn test_termination_records_detail() {
        let mut negotiation = Negotiation::new(params(NegotiationState::Agreeing), 0).unwrap();
        negotiation
            .transition_to_terminating(Some("peer unreachable".to_string()), 10)
            .unwrap();
        assert_eq!(negotiation.state(), NegotiationState::Terminating);
        assert_eq!(negotiation.error_detail(), Some("peer unreachable"));

        // Detail is kept when the notice is sent successfully
        negotiation.transition_to_terminated(None, 20).unwrap();
        assert_eq!(negotiation.state(), NegotiationState::Terminated);
        assert_eq!(negotiation.error_detail(), Some("peer unreachable"));
    }

    #[test]
    fn test_correlation_id_is_immutable() {
        let mut negotiation = Negotiation::new(params(NegotiationState::Offering), 0).unwrap();
        assert!(negotiation.set_correlation_id("consumer-proc-1").is_ok());
        assert!(matches!(
            negotiation.set_correlation_id("other"),
            Err(TransitionError::CorrelationIdImmutable { .. })
        ));

        let mut p = params(NegotiationState::Requesting);
        p.correlation_id = None;
        let mut fresh = Negotiation::new(p, 0).unwrap();
        assert_eq!(fresh.process_id(), "neg-1");
        fresh.set_correlation_id("provider-proc").unwrap();
        assert_eq!(fresh.process_id(), "provider-proc");
    }

    #[test]
    fn test_offer_history() {
        let mut negotiation = Negotiation::new(params(NegotiationState::Requested), 0).unwrap();
        negotiation.add_contract_offer(ContractOffer::new("ctr:asset-1:zzzz", "asset-1", Policy::new()));
        assert_eq!(negotiation.contract_offers().len(), 2);
        assert_eq!(negotiation.last_contract_offer().unwrap().id, "ctr:asset-1:zzzz");
    }
}
