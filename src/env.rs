use rand::Rng;

/// Represents the dynamics of a discrete-time Markov decision process with a finite
/// state space and action space.
///
/// Unlike a stateful simulator, the environment here is a pure transition model:
/// the caller owns the current state and asks the environment where an action
/// leads and what it pays. This keeps the reward grid read-only for the whole run.
pub trait Environment {
    /// A representation of the state of the environment to be passed to an agent
    type State: Copy;

    /// A representation of an action that an agent can take to affect the environment
    type Action: Copy;

    /// The state every episode starts from
    fn start(&self) -> Self::State;

    /// Sample the successor of `state` under `action`
    ///
    /// Never fails: moves that would leave the state space leave `state` unchanged.
    fn step<R: Rng + ?Sized>(
        &self,
        state: Self::State,
        action: Self::Action,
        rng: &mut R,
    ) -> Self::State;

    /// Reward for taking `action` in `state`, judged against the intended successor
    fn reward(&self, state: Self::State, action: Self::Action) -> f64;

    /// Determine if reaching `state` ends an episode
    fn is_absorbing(&self, state: Self::State) -> bool;
}

/// An environment whose action set is known up front
pub trait DiscreteActionSpace: Environment {
    /// Get the available actions, in table order
    ///
    /// The returned vector should never be empty.
    fn actions(&self) -> Vec<Self::Action>;
}
