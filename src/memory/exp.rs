use crate::env::Environment;

/// Represents a single experience or transition in the environment
pub struct Exp<E: Environment> {
    /// The state of the environment before taking the action
    pub state: E::State,
    /// The action taken in the given state
    pub action: E::Action,
    /// The state of the environment after the action is taken, or `None` when the
    /// transition ends the episode and must not be bootstrapped from
    pub next_state: Option<E::State>,
    /// The reward received after taking the action
    pub reward: f64,
}

impl<E: Environment> Clone for Exp<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: Environment> Copy for Exp<E> {}

impl<E: Environment> Exp<E> {
    /// Whether this transition closes its episode
    pub fn is_terminal(&self) -> bool {
        self.next_state.is_none()
    }
}
