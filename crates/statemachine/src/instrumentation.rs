use tracing::Span;

/// Supplies the span each handler invocation runs in.
///
/// The manager enters the span around the handler future, so handlers stay
/// free of instrumentation code.
pub trait ExecutorInstrumentation: Send + Sync {
    fn span(&self, processor: &str, entity_id: &str) -> Span;
}

/// Default instrumentation: one info-level span per processed entity
#[derive(Debug, Default, Clone)]
pub struct TracingInstrumentation {
    manager: String,
}

impl TracingInstrumentation {
    pub fn new(manager: impl Into<String>) -> Self {
        Self {
            manager: manager.into(),
        }
    }
}

impl ExecutorInstrumentation for TracingInstrumentation {
    fn span(&self, processor: &str, entity_id: &str) -> Span {
        tracing::info_span!(
            "process_entity",
            manager = %self.manager,
            processor = %processor,
            entity_id = %entity_id,
        )
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInstrumentation;

impl ExecutorInstrumentation for NoopInstrumentation {
    fn span(&self, _processor: &str, _entity_id: &str) -> Span {
        Span::none()
    }
}
