use rand::Rng;

use crate::{
    algo::ActionValueTable,
    assert_interval,
    decay::{self, Decay},
    gym::{Action, Pos},
    util::argmax,
    Result,
};

use super::Choice;

/// Epsilon greedy exploration policy with an episode-indexed epsilon schedule
#[derive(Debug, Clone)]
pub struct EpsilonGreedy<D: Decay = decay::Constant> {
    epsilon: D,
}

impl<D: Decay> EpsilonGreedy<D> {
    /// Initialize epsilon greedy policy with a decay strategy
    pub fn new(decay: D) -> Self {
        Self { epsilon: decay }
    }

    /// Scheduled epsilon for `episode`
    pub fn epsilon(&self, episode: u32) -> f64 {
        self.epsilon.evaluate(episode)
    }

    /// Flip the explore/exploit coin: exploit when a uniform draw from `[0,1)` is
    /// at most `1 - epsilon`
    ///
    /// **Panics** if `epsilon` is not in the interval `[0,1]`
    pub fn choose<R: Rng + ?Sized>(&self, epsilon: f64, rng: &mut R) -> Choice {
        assert_interval!(epsilon, 0.0, 1.0);
        if rng.gen::<f64>() <= 1.0 - epsilon {
            Choice::Exploit
        } else {
            Choice::Explore
        }
    }

    /// Pick an action for `state` from the table
    ///
    /// Exploiting takes the first maximal estimate. Exploring draws a random slot of
    /// the state's value row and maps the slot back to its action.
    pub fn act<R: Rng + ?Sized>(
        &self,
        table: &ActionValueTable,
        state: Pos,
        epsilon: f64,
        rng: &mut R,
    ) -> Result<Action> {
        let values = table.get(state)?;
        let slot = match self.choose(epsilon, rng) {
            Choice::Exploit => argmax(values).expect("a table row is never empty"),
            Choice::Explore => rng.gen_range(0..values.len()),
        };
        Action::from_index(slot)
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};
    use statrs::distribution::{ChiSquared, ContinuousCDF};

    use super::*;

    fn policy() -> EpsilonGreedy {
        EpsilonGreedy::new(decay::Constant::new(0.1))
    }

    #[test]
    fn greedy_when_epsilon_zero() {
        let mut table = ActionValueTable::new(4, 6, 150.0);
        table.set((3, 0), Action::Right.index(), 151.0).unwrap();
        table.set((3, 0), Action::Left.index(), 151.0).unwrap();
        table.set((2, 2), Action::Down.index(), 149.0).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let p = policy();
        for _ in 0..1000 {
            assert_eq!(
                p.act(&table, (3, 0), 0.0, &mut rng).unwrap(),
                Action::Right,
                "First maximal action"
            );
            assert_eq!(
                p.act(&table, (2, 2), 0.0, &mut rng).unwrap(),
                Action::Up,
                "Ties resolve to the lowest index"
            );
        }
    }

    #[test]
    fn uniform_when_epsilon_one() {
        let mut table = ActionValueTable::new(4, 6, 150.0);
        table.set((0, 0), Action::Down.index(), 500.0).unwrap();

        let mut rng = StdRng::seed_from_u64(11);
        let p = policy();
        let n = 40_000;
        let mut counts = [0.0; 4];
        for _ in 0..n {
            counts[p.act(&table, (0, 0), 1.0, &mut rng).unwrap().index()] += 1.0;
        }

        let expected = n as f64 / 4.0;
        let chi2: f64 = counts.iter().map(|o| (o - expected).powi(2) / expected).sum();
        let bound = ChiSquared::new(3.0).unwrap().inverse_cdf(0.999);
        assert!(chi2 < bound, "Exploration is uniform over slots (chi2 = {chi2})");
    }

    #[test]
    fn explore_rate_matches_epsilon() {
        let mut rng = StdRng::seed_from_u64(5);
        let p = policy();
        let n = 20_000;
        let explored = (0..n)
            .filter(|_| p.choose(0.1, &mut rng) == Choice::Explore)
            .count();
        let rate = explored as f64 / n as f64;
        assert!((rate - 0.1).abs() < 0.01, "Explores about 10% of the time ({rate})");
    }

    #[test]
    fn schedule_is_evaluated_per_episode() {
        let p = EpsilonGreedy::new(decay::Linear::new(0.01, 0.5, 0.1).unwrap());
        assert_eq!(p.epsilon(0), 0.5, "Starts at the schedule's initial value");
        assert_eq!(p.epsilon(1000), 0.1, "Floors at the final value");
    }

    #[test]
    fn off_grid_state_is_error() {
        let table = ActionValueTable::new(4, 6, 150.0);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(policy().act(&table, (4, 6), 0.1, &mut rng).is_err());
    }
}
