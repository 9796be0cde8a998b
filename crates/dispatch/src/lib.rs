pub mod mock;
pub mod registry;

pub use mock::MockDispatcher;
pub use registry::DispatcherRegistry;

use async_trait::async_trait;
use negotiation_types::{DispatchError, ProtocolMessage, StatusResult};

/// Result of handing a message to a dispatcher
pub type DispatchResult = Result<StatusResult<serde_json::Value>, DispatchError>;

/// Sends protocol messages to a remote participant over one protocol binding
#[async_trait]
pub trait RemoteMessageDispatcher: Send + Sync {
    /// Protocol identifier this dispatcher serves, e.g. `dataspace-protocol-http`
    fn protocol(&self) -> &str;

    async fn dispatch(&self, message: ProtocolMessage) -> DispatchResult;
}
