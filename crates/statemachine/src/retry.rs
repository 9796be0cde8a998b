use futures::future::BoxFuture;
use negotiation_types::{
    Clock, DispatchError, ResponseFailure, StatefulEntity, StatusResult, TransitionError,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::processor::HandlerOutcome;
use crate::store::{EntityStore, StoreError};
use crate::wait::exponential_delay;

#[derive(Debug, Error)]
pub enum RetryError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("transition error: {0}")]
    Transition(#[from] TransitionError),
}

/// Bounds on how often and how fast a failed state action is re-attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed before the exhausted callback fires
    pub max_retries: u32,

    /// Delay before the first retry; doubles with every further retry
    pub base_delay: Duration,

    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// How long after the last transition the `retries`-th retry may run
    pub fn delay_for(&self, retries: u32) -> Duration {
        if retries == 0 {
            return Duration::ZERO;
        }
        exponential_delay(self.base_delay, self.max_delay, 2.0, retries - 1)
    }

    /// Whether an entity that just failed with this state count has used up
    /// its retries
    pub fn is_exhausted(&self, state_count: u32) -> bool {
        state_count > self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 7,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

type DispatchFuture<'a, T> = BoxFuture<'a, Result<StatusResult<T>, DispatchError>>;
type SuccessCallback<'a, E, T> = Box<dyn FnOnce(&mut E, T) -> Result<(), TransitionError> + Send + 'a>;
type FailureCallback<'a, E> = Box<dyn FnOnce(&mut E, &str) -> Result<(), TransitionError> + Send + 'a>;
type FatalCallback<'a, E> =
    Box<dyn FnOnce(&mut E, &ResponseFailure) -> Result<(), TransitionError> + Send + 'a>;

/// A single, at most once, dispatch attempt for an entity in its current
/// state, with the outcome routed to the matching transition callback.
///
/// Callbacks only mutate the re-fetched entity; the process persists the
/// result (which releases the lease) once the callback returns.
pub struct RetryProcess<'a, E: StatefulEntity, T, S: EntityStore<E> + ?Sized> {
    entity: E,
    dispatch: DispatchFuture<'a, T>,
    store: &'a S,
    clock: &'a dyn Clock,
    policy: RetryPolicy,
    on_success: Option<SuccessCallback<'a, E, T>>,
    on_failure: Option<FailureCallback<'a, E>>,
    on_fatal_error: Option<FatalCallback<'a, E>>,
    on_retry_exhausted: Option<FailureCallback<'a, E>>,
}

impl<'a, E, T, S> RetryProcess<'a, E, T, S>
where
    E: StatefulEntity,
    T: Send + 'a,
    S: EntityStore<E> + ?Sized,
{
    /// `dispatch` is only polled if the entity is due; futures are lazy so a
    /// delayed entity never sends anything.
    pub fn new(
        entity: E,
        dispatch: DispatchFuture<'a, T>,
        store: &'a S,
        clock: &'a dyn Clock,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            entity,
            dispatch,
            store,
            clock,
            policy,
            on_success: None,
            on_failure: None,
            on_fatal_error: None,
            on_retry_exhausted: None,
        }
    }

    pub fn on_success(
        mut self,
        callback: impl FnOnce(&mut E, T) -> Result<(), TransitionError> + Send + 'a,
    ) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn on_failure(
        mut self,
        callback: impl FnOnce(&mut E, &str) -> Result<(), TransitionError> + Send + 'a,
    ) -> Self {
        self.on_failure = Some(Box::new(callback));
        self
    }

    pub fn on_fatal_error(
        mut self,
        callback: impl FnOnce(&mut E, &ResponseFailure) -> Result<(), TransitionError> + Send + 'a,
    ) -> Self {
        self.on_fatal_error = Some(Box::new(callback));
        self
    }

    pub fn on_retry_exhausted(
        mut self,
        callback: impl FnOnce(&mut E, &str) -> Result<(), TransitionError> + Send + 'a,
    ) -> Self {
        self.on_retry_exhausted = Some(Box::new(callback));
        self
    }

    /// Run the attempt. Resolves to `Delayed` when the entity was not due yet.
    pub async fn execute(self, description: &str) -> Result<HandlerOutcome, RetryError> {
        let RetryProcess {
            entity,
            dispatch,
            store,
            clock,
            policy,
            on_success,
            on_failure,
            on_fatal_error,
            on_retry_exhausted,
        } = self;

        if entity.is_retry() {
            let retries = entity.state_count() - 1;
            let due_at = entity
                .state_timestamp()
                .saturating_add(policy.delay_for(retries).as_millis() as u64);
            let now = clock.now_millis();
            if due_at > now {
                debug!(
                    entity_type = E::entity_type(),
                    entity_id = %entity.id(),
                    retries,
                    wait_ms = due_at - now,
                    "{description}: retry not due yet"
                );
                store.break_lease(&entity).await?;
                return Ok(HandlerOutcome::Delayed);
            }
        }

        debug!(
            entity_type = E::entity_type(),
            entity_id = %entity.id(),
            state = %entity.state(),
            attempt = entity.state_count(),
            "{description}"
        );

        let outcome = dispatch.await;

        let Some(mut current) = store.find_by_id(entity.id()).await? else {
            debug!(entity_id = %entity.id(), "{description}: entity no longer exists");
            return Ok(HandlerOutcome::Processed);
        };
        if current.state() != entity.state() {
            debug!(
                entity_id = %entity.id(),
                expected = %entity.state(),
                actual = %current.state(),
                "{description}: entity moved concurrently"
            );
            return Ok(HandlerOutcome::Processed);
        }

        match outcome {
            Ok(StatusResult::Succeeded(content)) => {
                if let Some(callback) = on_success {
                    callback(&mut current, content)?;
                }
            }
            Ok(StatusResult::Failed(failure)) if failure.is_fatal() => {
                warn!(
                    entity_id = %current.id(),
                    detail = %failure.failure_detail(),
                    "{description}: fatal error"
                );
                if let Some(callback) = on_fatal_error {
                    callback(&mut current, &failure)?;
                }
            }
            Ok(StatusResult::Failed(failure)) => {
                route_retryable(
                    &mut current,
                    &failure.failure_detail(),
                    policy,
                    description,
                    on_failure,
                    on_retry_exhausted,
                )?;
            }
            Err(error) => {
                route_retryable(
                    &mut current,
                    &error.to_string(),
                    policy,
                    description,
                    on_failure,
                    on_retry_exhausted,
                )?;
            }
        }

        store.save(&current).await?;
        Ok(HandlerOutcome::Processed)
    }
}

fn route_retryable<E: StatefulEntity>(
    entity: &mut E,
    cause: &str,
    policy: RetryPolicy,
    description: &str,
    on_failure: Option<FailureCallback<'_, E>>,
    on_retry_exhausted: Option<FailureCallback<'_, E>>,
) -> Result<(), TransitionError> {
    if policy.is_exhausted(entity.state_count()) {
        warn!(
            entity_id = %entity.id(),
            attempts = entity.state_count(),
            cause,
            "{description}: retries exhausted"
        );
        if let Some(callback) = on_retry_exhausted {
            return callback(entity, cause);
        }
        return Ok(());
    }

    warn!(
        entity_id = %entity.id(),
        attempt = entity.state_count(),
        max_retries = policy.max_retries,
        cause,
        "{description}: failed, will retry"
    );
    if let Some(callback) = on_failure {
        return callback(entity, cause);
    }
    Ok(())
}
