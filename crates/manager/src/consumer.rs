//! Consumer-side state handlers

use negotiation_statemachine::HandlerOutcome;
use negotiation_types::{
    ContractAgreementApprovalMessage, ContractNegotiationEventMessage, ContractRequestMessage,
    Negotiation, NegotiationEventType, NegotiationState,
};
use std::sync::Arc;

use crate::context::NegotiationContext;
use crate::error::NegotiationError;
use crate::transitions::{advance, header_for, send, send_termination, OnExhausted};

/// INITIAL: queue the request for sending
pub async fn process_initial(
    ctx: Arc<NegotiationContext>,
    negotiation: Negotiation,
) -> Result<HandlerOutcome, NegotiationError> {
    advance(&ctx, negotiation, NegotiationState::Requesting).await
}

/// REQUESTING: send the contract request to the provider
pub async fn process_requesting(
    ctx: Arc<NegotiationContext>,
    negotiation: Negotiation,
) -> Result<HandlerOutcome, NegotiationError> {
    let offer = negotiation
        .last_contract_offer()
        .cloned()
        .ok_or_else(|| NegotiationError::MissingOffer(negotiation.id().to_string()))?;

    let message = ContractRequestMessage {
        header: header_for(&negotiation)?,
        contract_offer: offer,
        callback_address: negotiation.callback_address.clone(),
    };

    send(
        &ctx,
        negotiation,
        message.into(),
        "[Consumer] send request",
        |n, now| n.transition_to(NegotiationState::Requested, now),
        OnExhausted::Terminating,
    )
    .await
}

/// ACCEPTING: tell the provider we accept its last offer
pub async fn process_accepting(
    ctx: Arc<NegotiationContext>,
    negotiation: Negotiation,
) -> Result<HandlerOutcome, NegotiationError> {
    let message = ContractNegotiationEventMessage {
        header: header_for(&negotiation)?,
        event_type: NegotiationEventType::Accepted,
        policy: negotiation.last_contract_offer().map(|o| o.policy.clone()),
    };

    send(
        &ctx,
        negotiation,
        message.into(),
        "[Consumer] send acceptance",
        |n, now| n.transition_to(NegotiationState::Accepted, now),
        OnExhausted::Terminating,
    )
    .await
}

/// AGREED: the provider's agreement arrived, start verifying
pub async fn process_agreed(
    ctx: Arc<NegotiationContext>,
    negotiation: Negotiation,
) -> Result<HandlerOutcome, NegotiationError> {
    advance(&ctx, negotiation, NegotiationState::Verifying).await
}

/// VERIFYING: send the agreement approval to the provider
pub async fn process_verifying(
    ctx: Arc<NegotiationContext>,
    negotiation: Negotiation,
) -> Result<HandlerOutcome, NegotiationError> {
    let message = ContractAgreementApprovalMessage {
        header: header_for(&negotiation)?,
    };

    send(
        &ctx,
        negotiation,
        message.into(),
        "[Consumer] send verification",
        |n, now| n.transition_to(NegotiationState::Verified, now),
        OnExhausted::Terminating,
    )
    .await
}

/// TERMINATING: send the termination notice to the provider
pub async fn process_terminating(
    ctx: Arc<NegotiationContext>,
    negotiation: Negotiation,
) -> Result<HandlerOutcome, NegotiationError> {
    send_termination(&ctx, negotiation, "[Consumer] send termination").await
}
