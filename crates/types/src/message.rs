use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{ContractAgreement, ContractOffer, Policy};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("message is missing required field: {0}")]
    MissingField(&'static str),
}

/// Addressing shared by every outbound protocol message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    pub id: String,

    pub protocol: String,

    pub counter_party_address: String,

    /// Correlation id the counterparty uses for its own negotiation record
    pub process_id: String,
}

impl MessageHeader {
    pub fn new(
        protocol: impl Into<String>,
        counter_party_address: impl Into<String>,
        process_id: impl Into<String>,
    ) -> Result<Self, MessageError> {
        let header = Self {
            id: Uuid::new_v4().to_string(),
            protocol: protocol.into(),
            counter_party_address: counter_party_address.into(),
            process_id: process_id.into(),
        };

        if header.protocol.is_empty() {
            return Err(MessageError::MissingField("protocol"));
        }
        if header.counter_party_address.is_empty() {
            return Err(MessageError::MissingField("counter_party_address"));
        }
        if header.process_id.is_empty() {
            return Err(MessageError::MissingField("process_id"));
        }

        Ok(header)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Consumer → provider: initial request or counter-request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRequestMessage {
    pub header: MessageHeader,
    pub contract_offer: ContractOffer,
    pub callback_address: Option<String>,
}

/// Provider → consumer: offer or counter-offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractOfferMessage {
    pub header: MessageHeader,
    pub contract_offer: ContractOffer,
}

/// Provider → consumer: the agreement to be verified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAgreementMessage {
    pub header: MessageHeader,
    pub contract_agreement: ContractAgreement,
}

/// Consumer → provider: the consumer approves the agreement it received
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAgreementApprovalMessage {
    pub header: MessageHeader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationEventType {
    Accepted,
    Finalized,
}

/// Either side: a lifecycle event (consumer accepted, provider finalized)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractNegotiationEventMessage {
    pub header: MessageHeader,
    pub event_type: NegotiationEventType,
    pub policy: Option<Policy>,
}

/// Either side: the negotiation is being abandoned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractNegotiationTerminationMessage {
    pub header: MessageHeader,
    pub rejection_reason: Option<String>,
    pub policy: Option<Policy>,
}

/// Every message the engine can hand to a dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProtocolMessage {
    Request(ContractRequestMessage),
    Offer(ContractOfferMessage),
    Agreement(ContractAgreementMessage),
    AgreementApproval(ContractAgreementApprovalMessage),
    Event(ContractNegotiationEventMessage),
    Termination(ContractNegotiationTerminationMessage),
}

impl ProtocolMessage {
    pub fn header(&self) -> &MessageHeader {
        match self {
            ProtocolMessage::Request(m) => &m.header,
            ProtocolMessage::Offer(m) => &m.header,
            ProtocolMessage::Agreement(m) => &m.header,
            ProtocolMessage::AgreementApproval(m) => &m.header,
            ProtocolMessage::Event(m) => &m.header,
            ProtocolMessage::Termination(m) => &m.header,
        }
    }

    pub fn protocol(&self) -> &str {
        &self.header().protocol
    }

    pub fn process_id(&self) -> &str {
        &self.header().process_id
    }

    /// Message type name, as used in failure details
    pub fn type_name(&self) -> &'static str {
        match self {
            ProtocolMessage::Request(_) => "ContractRequestMessage",
            ProtocolMessage::Offer(_) => "ContractOfferMessage",
            ProtocolMessage::Agreement(_) => "ContractAgreementMessage",
            ProtocolMessage::AgreementApproval(_) => "ContractAgreementApprovalMessage",
            ProtocolMessage::Event(_) => "ContractNegotiationEventMessage",
            ProtocolMessage::Termination(_) => "ContractNegotiationTerminationMessage",
        }
    }
}

impl From<ContractRequestMessage> for ProtocolMessage {
    fn from(m: ContractRequestMessage) -> Self {
        ProtocolMessage::Request(m)
    }
}

impl From<ContractOfferMessage> for ProtocolMessage {
    fn from(m: ContractOfferMessage) -> Self {
        ProtocolMessage::Offer(m)
    }
}

impl From<ContractAgreementMessage> for ProtocolMessage {
    fn from(m: ContractAgreementMessage) -> Self {
        ProtocolMessage::Agreement(m)
    }
}

impl From<ContractAgreementApprovalMessage> for ProtocolMessage {
    fn from(m: ContractAgreementApprovalMessage) -> Self {
        ProtocolMessage::AgreementApproval(m)
    }
}

impl From<ContractNegotiationEventMessage> for ProtocolMessage {
    fn from(m: ContractNegotiationEventMessage) -> Self {
        ProtocolMessage::Event(m)
    }
}

impl From<ContractNegotiationTerminationMessage> for ProtocolMessage {
    fn from(m: ContractNegotiationTerminationMessage) -> Self {
        ProtocolMessage::Termination(m)
    }
}
