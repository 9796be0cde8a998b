use async_trait::async_trait;
use negotiation_types::{DispatchError, ProtocolMessage};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{DispatchResult, RemoteMessageDispatcher};

/// Routes each message to the dispatcher registered for its protocol
#[derive(Default, Clone)]
pub struct DispatcherRegistry {
    dispatchers: HashMap<String, Arc<dyn RemoteMessageDispatcher>>,
    timeout: Option<Duration>,
}

impl DispatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dispatcher under its own protocol, replacing any previous one
    pub fn register(&mut self, dispatcher: Arc<dyn RemoteMessageDispatcher>) {
        let protocol = dispatcher.protocol().to_string();
        if self.dispatchers.insert(protocol.clone(), dispatcher).is_some() {
            warn!(protocol = %protocol, "replaced existing dispatcher");
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn RemoteMessageDispatcher>) -> Self {
        self.register(dispatcher);
        self
    }

    /// Bound every dispatch; an elapsed timeout is reported as a transient error
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn protocols(&self) -> Vec<&str> {
        let mut protocols: Vec<_> = self.dispatchers.keys().map(String::as_str).collect();
        protocols.sort_unstable();
        protocols
    }
}

#[async_trait]
impl RemoteMessageDispatcher for DispatcherRegistry {
    fn protocol(&self) -> &str {
        "*"
    }

    async fn dispatch(&self, message: ProtocolMessage) -> DispatchResult {
        let Some(dispatcher) = self.dispatchers.get(message.protocol()) else {
            return Err(DispatchError::NoDispatcher(message.protocol().to_string()));
        };

        debug!(
            protocol = %message.protocol(),
            message_type = message.type_name(),
            process_id = %message.process_id(),
            "dispatching message"
        );

        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, dispatcher.dispatch(message))
                .await
                .unwrap_or_else(|_| Err(DispatchError::Timeout(timeout.as_millis() as u64))),
            None => dispatcher.dispatch(message).await,
        }
    }
}
