use negotiation_statemachine::{RetryError, StoreError};
use negotiation_types::{AgreementError, MessageError, TransitionError};
use thiserror::Error;

/// Failures that stop a handler from acting on a negotiation.
///
/// The manager logs these and releases the lease; the negotiation is
/// picked up again on a later tick.
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("negotiation {0} has no contract offer")]
    MissingOffer(String),

    #[error("negotiation {0} has no contract agreement")]
    MissingAgreement(String),

    #[error("invalid agreement: {0}")]
    Agreement(#[from] AgreementError),

    #[error("invalid message: {0}")]
    Message(#[from] MessageError),

    #[error("transition error: {0}")]
    Transition(#[from] TransitionError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("retry process failed: {0}")]
    Retry(#[from] RetryError),
}
