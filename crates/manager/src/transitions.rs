use negotiation_dispatch::RemoteMessageDispatcher;
use negotiation_statemachine::{EntityStore, HandlerOutcome, RetryProcess};
use negotiation_types::{
    ContractNegotiationTerminationMessage, MessageHeader, Negotiation, NegotiationState,
    ProtocolMessage, TransitionError,
};
use tracing::debug;

use crate::context::NegotiationContext;
use crate::error::NegotiationError;

/// Where a negotiation goes once retries of its current send are used up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnExhausted {
    /// Still try to tell the counterparty before giving up
    Terminating,
    Terminated,
}

/// Detail recorded when retries are exhausted
pub fn exhausted_detail(message_type: &str, counter_party_role: &str, cause: &str) -> String {
    format!("Failed to send {message_type} to {counter_party_role}: {cause}")
}

/// Keep the reason a negotiation was being terminated ahead of any later
/// failure
pub fn append_detail(existing: Option<&str>, detail: String) -> String {
    match existing {
        Some(existing) if !existing.is_empty() => format!("{existing}; {detail}"),
        _ => detail,
    }
}

/// Addressing for a message about `negotiation`
pub fn header_for(negotiation: &Negotiation) -> Result<MessageHeader, NegotiationError> {
    Ok(MessageHeader::new(
        negotiation.protocol.as_str(),
        negotiation.counter_party_address.as_str(),
        negotiation.process_id(),
    )?)
}

/// Move a negotiation that needs no dispatch and persist it
pub async fn advance(
    ctx: &NegotiationContext,
    mut negotiation: Negotiation,
    next: NegotiationState,
) -> Result<HandlerOutcome, NegotiationError> {
    let from = negotiation.state();
    negotiation.transition_to(next, ctx.clock.now_millis())?;
    ctx.store.save(&negotiation).await?;

    debug!(negotiation_id = %negotiation.id(), from = %from, to = %next, "negotiation advanced");
    Ok(HandlerOutcome::Processed)
}

/// Send `message` once through the retry process and route the outcome:
/// success applies `on_success`, a retryable failure re-enters the current
/// state, a fatal failure terminates, and exhaustion moves to `on_exhausted`.
pub async fn send<F>(
    ctx: &NegotiationContext,
    negotiation: Negotiation,
    message: ProtocolMessage,
    description: &str,
    on_success: F,
    on_exhausted: OnExhausted,
) -> Result<HandlerOutcome, NegotiationError>
where
    F: FnOnce(&mut Negotiation, u64) -> Result<(), TransitionError> + Send,
{
    let state = negotiation.state();
    let role = negotiation.negotiation_type().counter_party_role();
    let message_type = message.type_name();
    let clock = ctx.clock.as_ref();

    let outcome = RetryProcess::new(
        negotiation,
        ctx.dispatcher.dispatch(message),
        ctx.store.as_ref(),
        clock,
        ctx.retry_policy,
    )
    .on_success(move |n, _| on_success(n, clock.now_millis()))
    .on_failure(move |n, _| n.transition_to(state, clock.now_millis()))
    .on_fatal_error(move |n, failure| {
        n.transition_to_terminated(Some(failure.failure_detail()), clock.now_millis())
    })
    .on_retry_exhausted(move |n, cause| {
        let detail = exhausted_detail(message_type, role, cause);
        match on_exhausted {
            OnExhausted::Terminating => {
                n.transition_to_terminating(Some(detail), clock.now_millis())
            }
            OnExhausted::Terminated => {
                let detail = append_detail(n.error_detail(), detail);
                n.transition_to_terminated(Some(detail), clock.now_millis())
            }
        }
    })
    .execute(description)
    .await?;

    Ok(outcome)
}

/// Termination notice shared by both sides. Exhaustion terminates locally
/// since there is nobody left to notify.
pub async fn send_termination(
    ctx: &NegotiationContext,
    negotiation: Negotiation,
    description: &str,
) -> Result<HandlerOutcome, NegotiationError> {
    let message = ContractNegotiationTerminationMessage {
        header: header_for(&negotiation)?,
        rejection_reason: negotiation.error_detail().map(str::to_string),
        policy: negotiation.last_contract_offer().map(|o| o.policy.clone()),
    };

    send(
        ctx,
        negotiation,
        message.into(),
        description,
        |n, now| n.transition_to(NegotiationState::Terminated, now),
        OnExhausted::Terminated,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use negotiation_types::{ContractOffer, NegotiationParams, NegotiationType, Policy};

    #[test]
    fn test_exhausted_detail_format() {
        assert_eq!(
            exhausted_detail("ContractOfferMessage", "consumer", "connection refused"),
            "Failed to send ContractOfferMessage to consumer: connection refused"
        );
    }

    #[test]
    fn test_append_detail_keeps_root_cause() {
        assert_eq!(
            append_detail(
                Some("Failed to send ContractOfferMessage to consumer: reset"),
                "later".to_string()
            ),
            "Failed to send ContractOfferMessage to consumer: reset; later"
        );
        assert_eq!(append_detail(None, "only".to_string()), "only");
        assert_eq!(append_detail(Some(""), "only".to_string()), "only");
    }

    #[test]
    fn test_header_uses_correlation_id() {
        let mut negotiation = Negotiation::new(
            NegotiationParams {
                id: Some("neg-1".to_string()),
                negotiation_type: NegotiationType::Consumer,
                state: NegotiationState::Requesting,
                correlation_id: None,
                counter_party_id: "provider".to_string(),
                counter_party_address: "http://provider/dsp".to_string(),
                protocol: "dataspace-protocol-http".to_string(),
                callback_address: None,
                offer: ContractOffer::new("def:asset:1", "asset", Policy::new()),
            },
            0,
        )
        .unwrap();

        assert_eq!(header_for(&negotiation).unwrap().process_id, "neg-1");

        negotiation.set_correlation_id("provider-process-7").unwrap();
        let header = header_for(&negotiation).unwrap();
        assert_eq!(header.process_id, "provider-process-7");
        assert_eq!(header.counter_party_address, "http://provider/dsp");
        assert_eq!(header.protocol, "dataspace-protocol-http");
    }
}
