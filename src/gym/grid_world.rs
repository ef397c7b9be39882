use std::ops::Index;

use rand::{seq::SliceRandom, Rng};
use strum::{Display, EnumString, FromRepr, VariantArray};

use crate::{
    assert_interval,
    env::{DiscreteActionSpace, Environment},
    Error, Result,
};

/// Grid coordinates as `(row, col)`
pub type Pos = (usize, usize);

/// Number of actions, and the length of every row in an action-value table
pub const NUM_ACTIONS: usize = 4;

/// Cell values that end an episode when reached
pub const ABSORBING_REWARDS: [f64; 2] = [100.0, -100.0];

/// Probability that the actuator slips in [`Dynamics::Stochastic`]
pub const DEFAULT_SLIP: f64 = 0.2;

/// A unit move on the grid
///
/// The discriminant is the column of the action in an action-value table.
#[derive(VariantArray, FromRepr, EnumString, Display, Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
#[repr(usize)]
pub enum Action {
    Up = 0,
    Down = 1,
    Right = 2,
    Left = 3,
}

impl Action {
    /// Map a table column back to its action
    pub fn from_index(index: usize) -> Result<Self> {
        Self::from_repr(index).ok_or_else(|| Error::InvalidAction(index.to_string()))
    }

    /// Parse a lowercase action label such as `"up"`
    pub fn from_label(label: &str) -> Result<Self> {
        label
            .parse()
            .map_err(|_| Error::InvalidAction(label.to_owned()))
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Displacement as `(d_row, d_col)`
    pub fn delta(self) -> (isize, isize) {
        match self {
            Action::Up => (-1, 0),
            Action::Down => (1, 0),
            Action::Right => (0, 1),
            Action::Left => (0, -1),
        }
    }

    /// The two actions an actuator can slip into
    pub fn orthogonal(self) -> [Action; 2] {
        match self {
            Action::Up | Action::Down => [Action::Left, Action::Right],
            Action::Right | Action::Left => [Action::Up, Action::Down],
        }
    }
}

/// How an intended action turns into a move
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Dynamics {
    /// The intended action is always carried out
    #[default]
    Deterministic,
    /// With probability `slip` one of the two orthogonal actions is carried out
    /// instead, chosen uniformly
    Stochastic { slip: f64 },
}

/// Dense per-cell rewards, fixed once the environment is built
#[derive(Debug, Clone, PartialEq)]
pub struct RewardGrid {
    rows: usize,
    cols: usize,
    cells: Vec<f64>,
}

impl RewardGrid {
    /// An all-zero grid
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::config(format!(
                "grid must have at least one cell, got {rows}x{cols}"
            )));
        }
        Ok(Self {
            rows,
            cols,
            cells: vec![0.0; rows * cols],
        })
    }

    /// Set the value of a single cell
    pub fn with_cell(mut self, pos: Pos, value: f64) -> Result<Self> {
        let i = self.offset(pos)?;
        self.cells[i] = value;
        Ok(self)
    }

    /// The 4x6 layout with a goal, three hazards and several shaping cells
    pub fn classic() -> Self {
        Self::from_layout(
            4,
            6,
            &[
                ((0, 4), 100.0),
                ((0, 1), 5.0),
                ((1, 2), -20.0),
                ((1, 3), 5.0),
                ((1, 4), 10.0),
                ((1, 5), -100.0),
                ((2, 0), -100.0),
                ((2, 2), -10.0),
                ((2, 5), -10.0),
                ((3, 4), -20.0),
            ],
        )
    }

    /// The 4x6 layout with only the goal, hazards and two mild penalties
    pub fn sparse() -> Self {
        Self::from_layout(
            4,
            6,
            &[
                ((0, 4), 100.0),
                ((1, 2), -10.0),
                ((1, 5), -100.0),
                ((2, 0), -100.0),
                ((3, 4), -10.0),
            ],
        )
    }

    fn from_layout(rows: usize, cols: usize, layout: &[(Pos, f64)]) -> Self {
        let mut cells = vec![0.0; rows * cols];
        for &((row, col), value) in layout {
            cells[row * cols + col] = value;
        }
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn contains(&self, (row, col): Pos) -> bool {
        row < self.rows && col < self.cols
    }

    /// Value of a cell, failing for positions outside the grid
    pub fn get(&self, pos: Pos) -> Result<f64> {
        self.offset(pos).map(|i| self.cells[i])
    }

    fn offset(&self, (row, col): Pos) -> Result<usize> {
        if self.contains((row, col)) {
            Ok(row * self.cols + col)
        } else {
            Err(Error::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }
}

impl Index<Pos> for RewardGrid {
    type Output = f64;

    /// **Panics** if `pos` is outside the grid
    fn index(&self, (row, col): Pos) -> &Self::Output {
        assert!(self.contains((row, col)), "({row}, {col}) is outside the grid");
        &self.cells[row * self.cols + col]
    }
}

/// A small grid an agent walks from a fixed corner toward a rewarding cell,
/// avoiding penalizing cells on the way
#[derive(Debug, Clone)]
pub struct GridWorld {
    grid: RewardGrid,
    start: Pos,
    dynamics: Dynamics,
}

impl GridWorld {
    /// **Errors** if `start` is outside the grid or a slip probability is outside `[0,1]`
    pub fn new(grid: RewardGrid, start: Pos, dynamics: Dynamics) -> Result<Self> {
        grid.get(start)?;
        if let Dynamics::Stochastic { slip } = dynamics {
            if !(0.0..=1.0).contains(&slip) {
                return Err(Error::config(format!(
                    "slip probability must be in [0, 1], got {slip}"
                )));
            }
        }
        Ok(Self {
            grid,
            start,
            dynamics,
        })
    }

    pub fn grid(&self) -> &RewardGrid {
        &self.grid
    }

    pub fn dynamics(&self) -> Dynamics {
        self.dynamics
    }

    /// The cell `action` leads to, or `state` itself if that would leave the grid
    pub fn step_deterministic(&self, state: Pos, action: Action) -> Pos {
        let (dr, dc) = action.delta();
        let next = (
            state.0.checked_add_signed(dr),
            state.1.checked_add_signed(dc),
        );
        match next {
            (Some(row), Some(col)) if self.grid.contains((row, col)) => (row, col),
            _ => state,
        }
    }

    /// Carry out `action` with probability `1 - slip`, otherwise a uniformly chosen
    /// orthogonal action
    ///
    /// **Panics** if `slip` is not in the interval `[0,1]`
    pub fn step_stochastic<R: Rng + ?Sized>(
        &self,
        state: Pos,
        action: Action,
        slip: f64,
        rng: &mut R,
    ) -> Pos {
        assert_interval!(slip, 0.0, 1.0);
        if !rng.gen_bool(slip) {
            return self.step_deterministic(state, action);
        }
        let substitute = *action
            .orthogonal()
            .choose(rng)
            .expect("orthogonal pair is not empty");
        self.step_deterministic(state, substitute)
    }
}

impl Environment for GridWorld {
    type State = Pos;
    type Action = Action;

    fn start(&self) -> Self::State {
        self.start
    }

    fn step<R: Rng + ?Sized>(&self, state: Pos, action: Action, rng: &mut R) -> Pos {
        match self.dynamics {
            Dynamics::Deterministic => self.step_deterministic(state, action),
            Dynamics::Stochastic { slip } => self.step_stochastic(state, action, slip, rng),
        }
    }

    /// Bumping into a wall pays exactly nothing, whatever the current cell holds
    fn reward(&self, state: Pos, action: Action) -> f64 {
        let next = self.step_deterministic(state, action);
        if next == state {
            0.0
        } else {
            self.grid[next]
        }
    }

    fn is_absorbing(&self, state: Pos) -> bool {
        self.grid
            .get(state)
            .is_ok_and(|v| ABSORBING_REWARDS.contains(&v))
    }
}

impl DiscreteActionSpace for GridWorld {
    fn actions(&self) -> Vec<Self::Action> {
        Action::VARIANTS.to_vec()
    }
}
