use async_trait::async_trait;
use negotiation_types::{ProtocolMessage, StatusResult};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::{DispatchResult, RemoteMessageDispatcher};

/// Mock dispatcher for testing.
///
/// Records every message it receives and answers with queued outcomes, in
/// order. Once the queue is drained every dispatch succeeds with `null`.
#[derive(Clone)]
pub struct MockDispatcher {
    protocol: String,
    outcomes: Arc<Mutex<VecDeque<DispatchResult>>>,
    sent: Arc<Mutex<Vec<ProtocolMessage>>>,
    latency: Option<Duration>,
}

impl MockDispatcher {
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            latency: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn enqueue(&self, outcome: DispatchResult) {
        self.outcomes.lock().await.push_back(outcome);
    }

    pub async fn enqueue_many(&self, outcome: DispatchResult, times: usize) {
        let mut outcomes = self.outcomes.lock().await;
        for _ in 0..times {
            outcomes.push_back(outcome.clone());
        }
    }

    pub async fn sent(&self) -> Vec<ProtocolMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn last_sent(&self) -> Option<ProtocolMessage> {
        self.sent.lock().await.last().cloned()
    }
}

#[async_trait]
impl RemoteMessageDispatcher for MockDispatcher {
    fn protocol(&self) -> &str {
        &self.protocol
    }

    async fn dispatch(&self, message: ProtocolMessage) -> DispatchResult {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.sent.lock().await.push(message);
        self.outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(StatusResult::success(serde_json::Value::Null)))
    }
}
