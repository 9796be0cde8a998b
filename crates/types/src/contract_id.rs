use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

const SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractIdError {
    #[error("contract id is empty")]
    Empty,

    #[error("contract id '{0}' must have the form <definition>:<asset>:<uuid>")]
    Malformed(String),
}

/// Composite contract identifier of the form `<definition>:<asset>:<uuid>`.
///
/// Offers carry one of these; the agreement id is derived from the offer's
/// id so both sides can trace an agreement back to the definition and asset
/// it was negotiated for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractId {
    definition_part: String,
    asset_part: String,
    uuid_part: String,
}

impl ContractId {
    pub fn new(
        definition_part: impl Into<String>,
        asset_part: impl Into<String>,
        uuid_part: impl Into<String>,
    ) -> Self {
        Self {
            definition_part: definition_part.into(),
            asset_part: asset_part.into(),
            uuid_part: uuid_part.into(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ContractIdError> {
        if raw.trim().is_empty() {
            return Err(ContractIdError::Empty);
        }

        let parts: Vec<&str> = raw.split(SEPARATOR).collect();
        match parts.as_slice() {
            [definition, asset, uuid]
                if !definition.is_empty() && !asset.is_empty() && !uuid.is_empty() =>
            {
                Ok(Self::new(*definition, *asset, *uuid))
            }
            _ => Err(ContractIdError::Malformed(raw.to_string())),
        }
    }

    /// Derive the id of a new contract for the same definition and asset.
    ///
    /// The new uuid part is name-based on the full original id, so deriving
    /// twice from the same offer yields the same agreement id.
    pub fn derive(&self) -> ContractId {
        let seed = Uuid::new_v5(&Uuid::NAMESPACE_OID, self.to_string().as_bytes());
        Self::new(
            self.definition_part.clone(),
            self.asset_part.clone(),
            seed.to_string(),
        )
    }

    pub fn definition_part(&self) -> &str {
        &self.definition_part
    }

    pub fn asset_part(&self) -> &str {
        &self.asset_part
    }

    pub fn uuid_part(&self) -> &str {
        &self.uuid_part
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            self.definition_part, self.asset_part, self.uuid_part
        )
    }
}

impl FromStr for ContractId {
    type Err = ContractIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
