use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Policy;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgreementError {
    #[error("agreement is missing required field: {0}")]
    MissingField(&'static str),

    #[error("agreement signing date must be positive")]
    InvalidSigningDate,
}

/// The finalized contract terms both parties concurred on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAgreement {
    pub id: String,

    pub provider_id: String,

    pub consumer_id: String,

    /// Signing time in epoch seconds
    pub contract_signing_date: u64,

    pub asset_id: String,

    pub policy: Policy,
}

impl ContractAgreement {
    pub fn new(
        id: impl Into<String>,
        provider_id: impl Into<String>,
        consumer_id: impl Into<String>,
        contract_signing_date: u64,
        asset_id: impl Into<String>,
        policy: Policy,
    ) -> Result<Self, AgreementError> {
        let agreement = Self {
            id: id.into(),
            provider_id: provider_id.into(),
            consumer_id: consumer_id.into(),
            contract_signing_date,
            asset_id: asset_id.into(),
            policy,
        };

        if agreement.id.is_empty() {
            return Err(AgreementError::MissingField("id"));
        }
        if agreement.provider_id.is_empty() {
            return Err(AgreementError::MissingField("provider_id"));
        }
        if agreement.consumer_id.is_empty() {
            return Err(AgreementError::MissingField("consumer_id"));
        }
        if agreement.asset_id.is_empty() {
            return Err(AgreementError::MissingField("asset_id"));
        }
        if agreement.contract_signing_date == 0 {
            return Err(AgreementError::InvalidSigningDate);
        }

        Ok(agreement)
    }
}
