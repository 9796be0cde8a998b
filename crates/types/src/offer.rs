use serde::{Deserialize, Serialize};

use crate::Policy;

/// A set of terms proposed by one side of a negotiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractOffer {
    /// Composite id, see [`crate::ContractId`]
    pub id: String,

    pub asset_id: String,

    pub policy: Policy,
}

impl ContractOffer {
    pub fn new(id: impl Into<String>, asset_id: impl Into<String>, policy: Policy) -> Self {
        Self {
            id: id.into(),
            asset_id: asset_id.into(),
            policy,
        }
    }
}
