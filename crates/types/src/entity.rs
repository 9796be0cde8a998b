use std::fmt::{Debug, Display};
use std::hash::Hash;

/// An entity that advances through states under the control of a
/// state-machine processor.
///
/// `state_count` is 1 on first entry into a state and grows by one every
/// time the entity re-enters the same state, so `state_count - 1` is the
/// number of retries already spent on the current state.
pub trait StatefulEntity: Clone + Debug + Send + Sync + 'static {
    type State: Copy + Debug + Display + Eq + Hash + Send + Sync + 'static;

    /// Short type name used in log output
    fn entity_type() -> &'static str;

    fn id(&self) -> &str;

    fn state(&self) -> Self::State;

    fn state_count(&self) -> u32;

    /// Time of the last state transition, epoch milliseconds
    fn state_timestamp(&self) -> u64;

    /// Whether the entity is re-attempting its current state
    fn is_retry(&self) -> bool {
        self.state_count() > 1
    }
}
