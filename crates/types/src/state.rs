use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which side of the negotiation a participant plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationType {
    Consumer,
    Provider,
}

impl NegotiationType {
    /// Role name of the remote party, used in log and error messages
    pub fn counter_party_role(&self) -> &'static str {
        match self {
            NegotiationType::Consumer => "provider",
            NegotiationType::Provider => "consumer",
        }
    }
}

/// Negotiation lifecycle states.
///
/// Numeric codes follow the dataspace protocol ordering so that persisted
/// records sort by progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationState {
    Initial,
    Requesting,
    Requested,
    Offering,
    Offered,
    Accepting,
    Accepted,
    Agreeing,
    Agreed,
    Verifying,
    Verified,
    Finalizing,
    Finalized,
    Terminating,
    Terminated,
}

impl NegotiationState {
    pub const ALL: [NegotiationState; 15] = [
        NegotiationState::Initial,
        NegotiationState::Requesting,
        NegotiationState::Requested,
        NegotiationState::Offering,
        NegotiationState::Offered,
        NegotiationState::Accepting,
        NegotiationState::Accepted,
        NegotiationState::Agreeing,
        NegotiationState::Agreed,
        NegotiationState::Verifying,
        NegotiationState::Verified,
        NegotiationState::Finalizing,
        NegotiationState::Finalized,
        NegotiationState::Terminating,
        NegotiationState::Terminated,
    ];

    pub fn code(&self) -> u32 {
        match self {
            NegotiationState::Initial => 50,
            NegotiationState::Requesting => 100,
            NegotiationState::Requested => 200,
            NegotiationState::Offering => 300,
            NegotiationState::Offered => 400,
            NegotiationState::Accepting => 700,
            NegotiationState::Accepted => 800,
            NegotiationState::Agreeing => 825,
            NegotiationState::Agreed => 850,
            NegotiationState::Verifying => 1050,
            NegotiationState::Verified => 1100,
            NegotiationState::Finalizing => 1150,
            NegotiationState::Finalized => 1200,
            NegotiationState::Terminating => 1300,
            NegotiationState::Terminated => 1400,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.code() == code)
    }

    /// Final states are retained for audit but never processed again
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            NegotiationState::Finalized | NegotiationState::Terminated
        )
    }

    /// Whether the protocol allows moving from `self` to `next`.
    ///
    /// Re-entering the current state is how retries are recorded, so it is
    /// allowed for every non-final state.
    pub fn can_transition_to(&self, next: NegotiationState) -> bool {
        use NegotiationState::*;

        if self.is_final() {
            return false;
        }
        if *self == next || matches!(next, Terminating | Terminated) {
            return true;
        }

        matches!(
            (self, next),
            (Initial, Requesting)
                | (Requesting, Requested)
                | (Requested, Offering | Offered | Agreeing | Agreed)
                | (Offering, Offered)
                | (Offered, Requesting | Requested | Accepting | Agreeing)
                | (Accepting, Accepted)
                | (Accepted, Agreeing | Agreed)
                | (Agreeing, Agreed)
                | (Agreed, Verifying | Verified)
                | (Verifying, Verified)
                | (Verified, Finalizing | Finalized)
                | (Finalizing, Finalized)
        )
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NegotiationState::Initial => "INITIAL",
            NegotiationState::Requesting => "REQUESTING",
            NegotiationState::Requested => "REQUESTED",
            NegotiationState::Offering => "OFFERING",
            NegotiationState::Offered => "OFFERED",
            NegotiationState::Accepting => "ACCEPTING",
            NegotiationState::Accepted => "ACCEPTED",
            NegotiationState::Agreeing => "AGREEING",
            NegotiationState::Agreed => "AGREED",
            NegotiationState::Verifying => "VERIFYING",
            NegotiationState::Verified => "VERIFIED",
            NegotiationState::Finalizing => "FINALIZING",
            NegotiationState::Finalized => "FINALIZED",
            NegotiationState::Terminating => "TERMINATING",
            NegotiationState::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("negotiation {id}: illegal transition {from} -> {to}")]
    Illegal {
        id: String,
        from: NegotiationState,
        to: NegotiationState,
    },

    #[error("negotiation {id}: correlation id already set to {existing}")]
    CorrelationIdImmutable { id: String, existing: String },
}
