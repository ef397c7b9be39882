use log::trace;
use strum::Display;

use crate::{
    assert_interval,
    gym::{Action, GridWorld, Pos},
    memory::Exp,
    Result,
};

use super::q_table::ActionValueTable;

/// Which successor estimate a non-terminal update bootstraps from
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[strum(serialize_all = "snake_case")]
pub enum UpdateRule {
    /// On-policy: the value of the action actually chosen next
    #[default]
    Sarsa,
    /// Off-policy: the best value available next
    QLearning,
}

/// One-step temporal-difference learner over an [`ActionValueTable`]
///
/// Every update has the form `Q(s,a) <- (1 - alpha) * Q(s,a) + alpha * target`
/// and touches exactly one entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TdLearner {
    alpha: f64, // learning rate
    gamma: f64, // discount factor
    rule: UpdateRule,
}

impl TdLearner {
    /// **Panics** if `alpha` or `gamma` is not in the interval `[0,1]`
    pub fn new(alpha: f64, gamma: f64, rule: UpdateRule) -> Self {
        assert_interval!(alpha, 0.0, 1.0);
        assert_interval!(gamma, 0.0, 1.0);
        Self { alpha, gamma, rule }
    }

    pub fn rule(&self) -> UpdateRule {
        self.rule
    }

    /// Target is `reward + gamma * Q(next_state, next_action)`
    pub fn sarsa_update(
        &self,
        table: &mut ActionValueTable,
        state: Pos,
        action: Action,
        reward: f64,
        next_state: Pos,
        next_action: Action,
    ) -> Result<()> {
        let next_q = table.value(next_state, next_action)?;
        self.blend(table, state, action, reward + self.gamma * next_q)
    }

    /// Target is `reward + gamma * max_a Q(next_state, a)`
    pub fn q_learning_update(
        &self,
        table: &mut ActionValueTable,
        state: Pos,
        action: Action,
        reward: f64,
        next_state: Pos,
    ) -> Result<()> {
        let max_next_q = table.max_value(next_state)?;
        self.blend(table, state, action, reward + self.gamma * max_next_q)
    }

    /// Target is the reward alone, for transitions that end the episode
    pub fn terminal_update(
        &self,
        table: &mut ActionValueTable,
        state: Pos,
        action: Action,
        reward: f64,
    ) -> Result<()> {
        self.blend(table, state, action, reward)
    }

    /// Apply the configured rule to an experience
    ///
    /// A terminal experience always gets [`terminal_update`](Self::terminal_update);
    /// `next_action` is only read by SARSA.
    pub fn learn(
        &self,
        table: &mut ActionValueTable,
        experience: Exp<GridWorld>,
        next_action: Action,
    ) -> Result<()> {
        let Exp {
            state,
            action,
            next_state,
            reward,
        } = experience;

        match (next_state, self.rule) {
            (None, _) => self.terminal_update(table, state, action, reward),
            (Some(next), UpdateRule::Sarsa) => {
                self.sarsa_update(table, state, action, reward, next, next_action)
            }
            (Some(next), UpdateRule::QLearning) => {
                self.q_learning_update(table, state, action, reward, next)
            }
        }
    }

    fn blend(
        &self,
        table: &mut ActionValueTable,
        state: Pos,
        action: Action,
        target: f64,
    ) -> Result<()> {
        let q_value = table.value(state, action)?;
        let updated = (1.0 - self.alpha) * q_value + self.alpha * target;
        trace!("Q({state:?}, {action}) {q_value:.3} -> {updated:.3}");
        table.set(state, action.index(), updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ActionValueTable {
        let mut table = ActionValueTable::new(4, 6, 150.0);
        table.set((2, 3), Action::Up.index(), 40.0).unwrap();
        table.set((1, 3), Action::Left.index(), 20.0).unwrap();
        table.set((1, 3), Action::Right.index(), 160.0).unwrap();
        table
    }

    #[test]
    fn sarsa_alpha_zero_is_noop() {
        let mut t = table();
        let learner = TdLearner::new(0.0, 0.99, UpdateRule::Sarsa);
        learner
            .sarsa_update(&mut t, (2, 3), Action::Up, 5.0, (1, 3), Action::Left)
            .unwrap();
        assert_eq!(t.value((2, 3), Action::Up).unwrap(), 40.0, "Entry unchanged");
    }

    #[test]
    fn sarsa_alpha_one_takes_target() {
        let mut t = table();
        let learner = TdLearner::new(1.0, 0.99, UpdateRule::Sarsa);
        learner
            .sarsa_update(&mut t, (2, 3), Action::Up, 5.0, (1, 3), Action::Left)
            .unwrap();
        assert_eq!(
            t.value((2, 3), Action::Up).unwrap(),
            5.0 + 0.99 * 20.0,
            "Bootstraps from the chosen next action"
        );
    }

    #[test]
    fn sarsa_blends() {
        let mut t = table();
        let learner = TdLearner::new(0.1, 0.99, UpdateRule::Sarsa);
        learner
            .sarsa_update(&mut t, (2, 3), Action::Up, 5.0, (1, 3), Action::Left)
            .unwrap();
        let expected = 0.9 * 40.0 + 0.1 * (5.0 + 0.99 * 20.0);
        assert!((t.value((2, 3), Action::Up).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn q_learning_uses_best_next_value() {
        let mut t = table();
        let learner = TdLearner::new(1.0, 0.5, UpdateRule::QLearning);
        learner
            .q_learning_update(&mut t, (2, 3), Action::Up, 5.0, (1, 3))
            .unwrap();
        assert_eq!(t.value((2, 3), Action::Up).unwrap(), 5.0 + 0.5 * 160.0);
    }

    #[test]
    fn terminal_alpha_one_takes_reward() {
        let mut t = table();
        let learner = TdLearner::new(1.0, 0.99, UpdateRule::Sarsa);
        learner
            .terminal_update(&mut t, (1, 4), Action::Up, 100.0)
            .unwrap();
        assert_eq!(t.value((1, 4), Action::Up).unwrap(), 100.0, "No bootstrap term");
    }

    #[test]
    fn learn_dispatches_on_rule_and_terminality() {
        let exp = Exp::<GridWorld> {
            state: (2, 3),
            action: Action::Up,
            next_state: Some((1, 3)),
            reward: 5.0,
        };

        let mut sarsa = table();
        TdLearner::new(1.0, 1.0, UpdateRule::Sarsa)
            .learn(&mut sarsa, exp, Action::Left)
            .unwrap();
        assert_eq!(sarsa.value((2, 3), Action::Up).unwrap(), 25.0, "SARSA target");

        let mut q = table();
        TdLearner::new(1.0, 1.0, UpdateRule::QLearning)
            .learn(&mut q, exp, Action::Left)
            .unwrap();
        assert_eq!(q.value((2, 3), Action::Up).unwrap(), 165.0, "Q-learning target");

        let mut terminal = table();
        let exp = Exp {
            next_state: None,
            ..exp
        };
        assert!(exp.is_terminal());
        TdLearner::new(1.0, 1.0, UpdateRule::QLearning)
            .learn(&mut terminal, exp, Action::Left)
            .unwrap();
        assert_eq!(terminal.value((2, 3), Action::Up).unwrap(), 5.0, "Terminal target");
    }

    #[test]
    fn off_grid_states_are_errors() {
        let mut t = table();
        let learner = TdLearner::new(0.5, 0.9, UpdateRule::Sarsa);
        assert!(learner
            .sarsa_update(&mut t, (0, 0), Action::Up, 0.0, (7, 7), Action::Up)
            .is_err());
        assert!(learner.terminal_update(&mut t, (7, 0), Action::Up, 0.0).is_err());
    }

    #[test]
    #[should_panic(expected = "Invalid value for `alpha`")]
    fn alpha_out_of_range_panics() {
        TdLearner::new(1.5, 0.9, UpdateRule::Sarsa);
    }
}
