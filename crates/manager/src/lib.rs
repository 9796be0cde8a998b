//! Contract negotiation state handlers.
//!
//! Each processable negotiation state is bound to one free handler
//! function taking the shared [`NegotiationContext`]. [`NegotiationManager`]
//! wires either the provider or the consumer bindings into a
//! [`negotiation_statemachine::StateMachineManager`].

pub mod consumer;
pub mod context;
pub mod error;
pub mod manager;
pub mod provider;
pub mod transitions;

pub use context::{BuilderError, NegotiationContext, NegotiationContextBuilder, DEFAULT_BATCH_SIZE};
pub use error::NegotiationError;
pub use manager::NegotiationManager;
