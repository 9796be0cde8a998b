//! Provider-side state handlers

use negotiation_statemachine::HandlerOutcome;
use negotiation_types::{
    ContractAgreement, ContractAgreementMessage, ContractId, ContractNegotiationEventMessage,
    ContractOfferMessage, Negotiation, NegotiationEventType, NegotiationState,
};
use std::sync::Arc;
use tracing::error;

use crate::context::NegotiationContext;
use crate::error::NegotiationError;
use crate::transitions::{advance, header_for, send, send_termination, OnExhausted};

/// OFFERING: send the current (counter-)offer to the consumer
pub async fn process_offering(
    ctx: Arc<NegotiationContext>,
    negotiation: Negotiation,
) -> Result<HandlerOutcome, NegotiationError> {
    let offer = negotiation
        .last_contract_offer()
        .cloned()
        .ok_or_else(|| NegotiationError::MissingOffer(negotiation.id().to_string()))?;

    let message = ContractOfferMessage {
        header: header_for(&negotiation)?,
        contract_offer: offer,
    };

    send(
        &ctx,
        negotiation,
        message.into(),
        "[Provider] send counter offer",
        |n, now| n.transition_to(NegotiationState::Offered, now),
        OnExhausted::Terminating,
    )
    .await
}

/// REQUESTED: agree automatically. Only bound when the context enables it.
pub async fn process_requested(
    ctx: Arc<NegotiationContext>,
    negotiation: Negotiation,
) -> Result<HandlerOutcome, NegotiationError> {
    advance(&ctx, negotiation, NegotiationState::Agreeing).await
}

/// AGREEING: create the agreement unless an earlier attempt already did,
/// then send it to the consumer
pub async fn process_agreeing(
    ctx: Arc<NegotiationContext>,
    negotiation: Negotiation,
) -> Result<HandlerOutcome, NegotiationError> {
    let agreement = match negotiation.contract_agreement() {
        Some(existing) => existing.clone(),
        None => match create_agreement(&ctx, &negotiation)? {
            Some(agreement) => agreement,
            None => return Ok(HandlerOutcome::NotProcessed),
        },
    };

    let message = ContractAgreementMessage {
        header: header_for(&negotiation)?,
        contract_agreement: agreement.clone(),
    };

    send(
        &ctx,
        negotiation,
        message.into(),
        "[Provider] send agreement",
        move |n, now| {
            n.transition_to(NegotiationState::Agreed, now)?;
            n.set_contract_agreement(agreement);
            Ok(())
        },
        OnExhausted::Terminating,
    )
    .await
}

/// Build a new agreement from the last offer. `None` when the offer id is not
/// a well-formed contract id.
fn create_agreement(
    ctx: &NegotiationContext,
    negotiation: &Negotiation,
) -> Result<Option<ContractAgreement>, NegotiationError> {
    let offer = negotiation
        .last_contract_offer()
        .ok_or_else(|| NegotiationError::MissingOffer(negotiation.id().to_string()))?;

    let contract_id = match ContractId::parse(&offer.id) {
        Ok(contract_id) => contract_id,
        Err(e) => {
            error!(
                negotiation_id = %negotiation.id(),
                offer_id = %offer.id,
                error = %e,
                alert = true,
                "offer id not correctly formatted, cannot create agreement"
            );
            return Ok(None);
        }
    };

    let agreement = ContractAgreement::new(
        contract_id.derive().to_string(),
        ctx.participant_id.as_str(),
        negotiation.counter_party_id.as_str(),
        ctx.clock.now_secs(),
        offer.asset_id.as_str(),
        offer.policy.clone(),
    )?;
    Ok(Some(agreement))
}

/// VERIFIED: the consumer approved the agreement, start finalizing
pub async fn process_verified(
    ctx: Arc<NegotiationContext>,
    negotiation: Negotiation,
) -> Result<HandlerOutcome, NegotiationError> {
    advance(&ctx, negotiation, NegotiationState::Finalizing).await
}

/// FINALIZING: notify the consumer that the contract is final
pub async fn process_finalizing(
    ctx: Arc<NegotiationContext>,
    negotiation: Negotiation,
) -> Result<HandlerOutcome, NegotiationError> {
    let policy = negotiation
        .contract_agreement()
        .map(|agreement| agreement.policy.clone())
        .ok_or_else(|| NegotiationError::MissingAgreement(negotiation.id().to_string()))?;

    let message = ContractNegotiationEventMessage {
        header: header_for(&negotiation)?,
        event_type: NegotiationEventType::Finalized,
        policy: Some(policy),
    };

    send(
        &ctx,
        negotiation,
        message.into(),
        "[Provider] send finalization",
        |n, now| n.transition_to(NegotiationState::Finalized, now),
        OnExhausted::Terminating,
    )
    .await
}

/// TERMINATING: send the rejection notice to the consumer
pub async fn process_terminating(
    ctx: Arc<NegotiationContext>,
    negotiation: Negotiation,
) -> Result<HandlerOutcome, NegotiationError> {
    send_termination(&ctx, negotiation, "[Provider] send rejection").await
}
