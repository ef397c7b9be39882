use std::ops::Range;

use log::{debug, info};
use rand::Rng;

use crate::{
    algo::{ActionValueTable, TdLearner, UpdateRule},
    decay::{self, Decay},
    env::Environment,
    exploration::EpsilonGreedy,
    gym::{Dynamics, GridWorld, Pos, RewardGrid},
    memory::Exp,
    Error, Result,
};

/// Configuration for a [`Trainer`] run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// Reward layout; its dimensions are the state space
    ///
    /// **Default**: [`RewardGrid::classic`], 4x6
    pub grid: RewardGrid,
    /// Cell every episode starts from
    ///
    /// **Default**: `(3, 0)`
    pub start: Pos,
    /// Transition model used while training
    ///
    /// **Default**: [`Dynamics::Deterministic`]
    pub dynamics: Dynamics,
    /// Update applied to non-terminal transitions
    ///
    /// **Default**: [`UpdateRule::Sarsa`]
    pub rule: UpdateRule,
    /// Discount factor, in `[0,1]`
    ///
    /// **Default**: `0.99`
    pub gamma: f64,
    /// Learning rate, in `[0,1]`
    ///
    /// **Default**: `0.1`
    pub alpha: f64,
    /// Exploration rate during learning episodes, in `[0,1]`
    ///
    /// **Default**: `0.1`
    pub epsilon: f64,
    /// Independent reset-and-relearn repetitions averaged into the reward curve
    ///
    /// **Default**: `20`
    pub epochs: u32,
    /// Episodes per epoch
    ///
    /// **Default**: `500`
    pub episodes: u32,
    /// Trailing episodes of every epoch run greedily and without updates
    ///
    /// **Default**: `50`
    pub eval_episodes: u32,
    /// Step budget of a single episode
    ///
    /// **Default**: `48`
    pub horizon: u32,
    /// Value every table entry is reset to at the start of an epoch
    ///
    /// **Default**: `150.0`
    pub initial_value: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            grid: RewardGrid::classic(),
            start: (3, 0),
            dynamics: Dynamics::Deterministic,
            rule: UpdateRule::Sarsa,
            gamma: 0.99,
            alpha: 0.1,
            epsilon: 0.1,
            epochs: 20,
            episodes: 500,
            eval_episodes: 50,
            horizon: 48,
            initial_value: 150.0,
        }
    }
}

impl TrainConfig {
    /// Check every range the training loop relies on
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("gamma", self.gamma),
            ("alpha", self.alpha),
            ("epsilon", self.epsilon),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::config(format!(
                    "`{name}` must be in [0, 1], got {value}"
                )));
            }
        }
        if self.epochs == 0 || self.episodes == 0 || self.horizon == 0 {
            return Err(Error::config(
                "`epochs`, `episodes` and `horizon` must be positive",
            ));
        }
        if self.eval_episodes > self.episodes {
            return Err(Error::config(format!(
                "`eval_episodes` ({}) exceeds `episodes` ({})",
                self.eval_episodes, self.episodes
            )));
        }
        if !self.initial_value.is_finite() {
            return Err(Error::config(format!(
                "`initial_value` must be finite, got {}",
                self.initial_value
            )));
        }
        if !self.grid.contains(self.start) {
            return Err(Error::config(format!(
                "start {:?} is outside the {}x{} grid",
                self.start,
                self.grid.rows(),
                self.grid.cols()
            )));
        }
        Ok(())
    }

    /// Index of the first evaluation episode
    pub fn learning_episodes(&self) -> u32 {
        self.episodes - self.eval_episodes
    }
}

/// Discounted reward per episode index, averaged over epochs
#[derive(Debug, Clone, PartialEq)]
pub struct RewardCurve {
    rewards: Vec<f64>,
}

impl RewardCurve {
    pub fn new(episodes: usize) -> Self {
        Self {
            rewards: vec![0.0; episodes],
        }
    }

    fn accumulate(&mut self, episode: usize, value: f64) {
        self.rewards[episode] += value;
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.rewards
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.rewards
    }

    /// Mean over a range of episodes, `0.0` for an empty range
    ///
    /// **Panics** if `range` extends past the last episode
    pub fn mean(&self, range: Range<usize>) -> f64 {
        let slice = &self.rewards[range];
        if slice.is_empty() {
            return 0.0;
        }
        slice.iter().sum::<f64>() / slice.len() as f64
    }
}

/// What happened in one episode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeSummary {
    /// Timesteps taken, at most the horizon
    pub steps: u32,
    /// Discounted reward collected, before averaging over epochs
    pub reward: f64,
    /// Whether the episode ended by entering an absorbing cell
    pub absorbed: bool,
    /// Whether the table was updated during the episode
    pub learning: bool,
}

/// Runs epochs of episodes of an epsilon-greedy agent in a [`GridWorld`], learning
/// with a [`TdLearner`]
///
/// The trainer owns the environment, the action-value table and the random
/// source for the whole run.
pub struct Trainer<R: Rng, D: Decay = decay::Constant> {
    config: TrainConfig,
    env: GridWorld,
    table: ActionValueTable,
    learner: TdLearner,
    exploration: EpsilonGreedy<D>,
    rng: R,
}

impl<R: Rng> Trainer<R> {
    /// A trainer exploring at the constant rate `config.epsilon`
    pub fn new(config: TrainConfig, rng: R) -> Result<Self> {
        let schedule = decay::Constant::new(config.epsilon);
        Self::with_schedule(config, schedule, rng)
    }
}

impl<R: Rng, D: Decay> Trainer<R, D> {
    /// A trainer whose learning-episode epsilon follows `schedule`
    ///
    /// `config.epsilon` is ignored. The schedule must yield an epsilon in `[0,1]`
    /// for every learning episode.
    pub fn with_schedule(config: TrainConfig, schedule: D, rng: R) -> Result<Self> {
        config.validate()?;
        if let Some((episode, epsilon)) = (0..config.learning_episodes())
            .map(|t| (t, schedule.evaluate(t)))
            .find(|(_, epsilon)| !(0.0..=1.0).contains(epsilon))
        {
            return Err(Error::config(format!(
                "schedule gives epsilon {epsilon} at episode {episode}"
            )));
        }
        let env = GridWorld::new(config.grid.clone(), config.start, config.dynamics)?;
        let table = ActionValueTable::new(
            config.grid.rows(),
            config.grid.cols(),
            config.initial_value,
        );
        let learner = TdLearner::new(config.alpha, config.gamma, config.rule);
        Ok(Self {
            config,
            env,
            table,
            learner,
            exploration: EpsilonGreedy::new(schedule),
            rng,
        })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// The table as left by the most recent epoch
    pub fn table(&self) -> &ActionValueTable {
        &self.table
    }

    /// Train every epoch and return the epoch-averaged reward curve
    pub fn run(&mut self) -> Result<RewardCurve> {
        let mut curve = RewardCurve::new(self.config.episodes as usize);
        for epoch in 0..self.config.epochs {
            self.run_epoch(epoch, &mut curve)?;
        }
        Ok(curve)
    }

    /// Reset the table and run one full sequence of episodes, adding this epoch's
    /// share to `curve`
    pub fn run_epoch(&mut self, epoch: u32, curve: &mut RewardCurve) -> Result<()> {
        let grid = self.env.grid();
        self.table
            .reset(grid.rows(), grid.cols(), self.config.initial_value);
        info!(
            "Epoch {}/{} started ({} rule)",
            epoch + 1,
            self.config.epochs,
            self.learner.rule()
        );

        let mut total = [0.0; 2];
        let mut absorbed = 0;
        for episode in 0..self.config.episodes {
            let summary = self.run_episode(episode, curve)?;
            total[usize::from(!summary.learning)] += summary.reward;
            absorbed += u32::from(summary.absorbed);
        }

        let learning = self.config.learning_episodes();
        info!(
            "Epoch {}/{} finished: mean reward {:.2} learning, {:.2} evaluation, {} episodes absorbed",
            epoch + 1,
            self.config.epochs,
            total[0] / learning.max(1) as f64,
            total[1] / self.config.eval_episodes.max(1) as f64,
            absorbed,
        );
        Ok(())
    }

    /// Run a single episode from the start cell
    ///
    /// Learning episodes update the table and end early on entering an absorbing
    /// cell. Evaluation episodes act greedily for the full horizon and leave the
    /// table untouched.
    ///
    /// **Errors** if `episode` is not below `config.episodes` or `curve` does not
    /// hold exactly one value per configured episode.
    pub fn run_episode(&mut self, episode: u32, curve: &mut RewardCurve) -> Result<EpisodeSummary> {
        if episode >= self.config.episodes {
            return Err(Error::config(format!(
                "episode {episode} is past the last of {} episodes",
                self.config.episodes
            )));
        }
        if curve.len() != self.config.episodes as usize {
            return Err(Error::config(format!(
                "curve holds {} episodes, expected {}",
                curve.len(),
                self.config.episodes
            )));
        }
        let learning = episode < self.config.learning_episodes();
        let epsilon = if learning {
            self.exploration.epsilon(episode)
        } else {
            0.0
        };
        let epochs = self.config.epochs as f64;
        let gamma = self.config.gamma;
        let horizon = self.config.horizon;

        let mut summary = EpisodeSummary {
            steps: 0,
            reward: 0.0,
            absorbed: false,
            learning,
        };
        let mut cumulative_gamma = 1.0;

        let mut state = self.env.start();
        let mut action = self
            .exploration
            .act(&self.table, state, epsilon, &mut self.rng)?;

        for t in 0..horizon {
            let next_state = self.env.step(state, action, &mut self.rng);
            let reward = self.env.reward(state, action);

            let discounted = cumulative_gamma * reward;
            curve.accumulate(episode as usize, discounted / epochs);
            summary.reward += discounted;
            summary.steps = t + 1;
            cumulative_gamma *= gamma;

            let next_action =
                self.exploration
                    .act(&self.table, next_state, epsilon, &mut self.rng)?;

            if learning {
                let absorbed = self.env.is_absorbing(next_state);
                let done = absorbed || t == horizon - 1;
                let experience = Exp {
                    state,
                    action,
                    next_state: (!done).then_some(next_state),
                    reward,
                };
                self.learner.learn(&mut self.table, experience, next_action)?;
                if done {
                    summary.absorbed = absorbed;
                    break;
                }
            }

            state = next_state;
            action = next_action;
        }

        debug!(
            "Episode {episode}: {} steps, reward {:.2}{}{}",
            summary.steps,
            summary.reward,
            if summary.absorbed { ", absorbed" } else { "" },
            if learning { "" } else { " (evaluation)" },
        );
        Ok(summary)
    }
}

/// Outcome of training one update rule
#[derive(Debug, Clone, PartialEq)]
pub struct RuleRun {
    pub rule: UpdateRule,
    /// Epoch-averaged reward curve
    pub curve: RewardCurve,
    /// Table as left by the final epoch
    pub table: ActionValueTable,
}

/// Train one run per update rule from the same configuration
///
/// **Returns** one [`RuleRun`] per rule, SARSA first
pub fn compare_rules<R: Rng>(config: &TrainConfig, rng: &mut R) -> Result<Vec<RuleRun>> {
    [UpdateRule::Sarsa, UpdateRule::QLearning]
        .into_iter()
        .map(|rule| -> Result<RuleRun> {
            let config = TrainConfig {
                rule,
                ..config.clone()
            };
            let mut trainer = Trainer::new(config, &mut *rng)?;
            let curve = trainer.run()?;
            info!(
                "{rule}: mean reward {:.2} over learning episodes, {:.2} greedy",
                curve.mean(0..trainer.config.learning_episodes() as usize),
                curve.mean(trainer.config.learning_episodes() as usize..curve.len()),
            );
            Ok(RuleRun {
                rule,
                curve,
                table: trainer.table,
            })
        })
        .collect()
}
