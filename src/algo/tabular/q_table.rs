use std::collections::HashMap;

use crate::{
    gym::{grid_world::NUM_ACTIONS, Action, Pos},
    util::argmax,
    Error, Result,
};

/// Estimated return of every action in every cell of a grid
///
/// Rows are indexed by [`Action::index`]. The table holds exactly one row per cell,
/// so a missing key always means the position is off the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionValueTable {
    rows: usize,
    cols: usize,
    values: HashMap<Pos, [f64; NUM_ACTIONS]>,
}

impl ActionValueTable {
    /// Allocate a table for a `rows` x `cols` grid with every estimate set to `initial_value`
    pub fn new(rows: usize, cols: usize, initial_value: f64) -> Self {
        let mut table = Self {
            rows,
            cols,
            values: HashMap::with_capacity(rows * cols),
        };
        table.reset(rows, cols, initial_value);
        table
    }

    /// Discard all estimates and reallocate for a `rows` x `cols` grid
    pub fn reset(&mut self, rows: usize, cols: usize, initial_value: f64) {
        self.rows = rows;
        self.cols = cols;
        self.values.clear();
        for row in 0..rows {
            for col in 0..cols {
                self.values.insert((row, col), [initial_value; NUM_ACTIONS]);
            }
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// All action estimates for `state`
    pub fn get(&self, state: Pos) -> Result<&[f64; NUM_ACTIONS]> {
        self.values
            .get(&state)
            .ok_or_else(|| self.out_of_bounds(state))
    }

    /// Estimate for a single state-action pair
    pub fn value(&self, state: Pos, action: Action) -> Result<f64> {
        self.get(state).map(|row| row[action.index()])
    }

    /// Overwrite the estimate in column `action_index` for `state`
    pub fn set(&mut self, state: Pos, action_index: usize, value: f64) -> Result<()> {
        if action_index >= NUM_ACTIONS {
            return Err(Error::InvalidAction(action_index.to_string()));
        }
        let err = self.out_of_bounds(state);
        let row = self.values.get_mut(&state).ok_or(err)?;
        row[action_index] = value;
        Ok(())
    }

    /// Largest estimate for `state`
    pub fn max_value(&self, state: Pos) -> Result<f64> {
        let row = self.get(state)?;
        Ok(row.iter().copied().fold(f64::NEG_INFINITY, f64::max))
    }

    /// Action with the largest estimate for `state`, lowest index on ties
    pub fn greedy(&self, state: Pos) -> Result<Action> {
        let row = self.get(state)?;
        let index = argmax(row).expect("a table row is never empty");
        Action::from_index(index)
    }

    /// Greedy action for every cell, in row-major order
    pub fn greedy_policy(&self) -> Result<Vec<(Pos, Action)>> {
        self.cells()
            .map(|pos| self.greedy(pos).map(|a| (pos, a)))
            .collect()
    }

    /// Estimates of `action` for every cell, in row-major order
    pub fn values_for(&self, action: Action) -> Result<Vec<f64>> {
        self.cells().map(|pos| self.value(pos, action)).collect()
    }

    /// Every position of the grid, in row-major order
    pub fn cells(&self) -> impl Iterator<Item = Pos> {
        let (rows, cols) = (self.rows, self.cols);
        (0..rows).flat_map(move |row| (0..cols).map(move |col| (row, col)))
    }

    fn out_of_bounds(&self, (row, col): Pos) -> Error {
        Error::OutOfBounds {
            row,
            col,
            rows: self.rows,
            cols: self.cols,
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::VariantArray;

    use super::*;

    #[test]
    fn reset_fills_every_entry() {
        let mut table = ActionValueTable::new(4, 6, 150.0);
        table.set((2, 3), 1, -4.0).unwrap();
        table.reset(4, 6, 150.0);

        assert_eq!(table.cells().count(), 24, "One row per cell");
        for pos in table.cells() {
            assert_eq!(table.get(pos).unwrap(), &[150.0; 4], "{pos:?} is reset");
        }

        table.reset(2, 2, 0.5);
        assert_eq!(table.cells().count(), 4, "Reallocated for new dimensions");
        assert!(table.get((3, 5)).is_err(), "Old cells are gone");
        assert_eq!(table.value((1, 1), Action::Left).unwrap(), 0.5);
    }

    #[test]
    fn set_and_get() {
        let mut table = ActionValueTable::new(4, 6, 0.0);
        table.set((0, 4), Action::Right.index(), 12.5).unwrap();
        assert_eq!(table.get((0, 4)).unwrap(), &[0.0, 0.0, 12.5, 0.0], "Only one column changed");
        assert_eq!(table.value((0, 4), Action::Right).unwrap(), 12.5);
        assert_eq!(table.max_value((0, 4)).unwrap(), 12.5);
    }

    #[test]
    fn misuse_is_reported() {
        let mut table = ActionValueTable::new(4, 6, 0.0);
        assert_eq!(
            table.get((4, 0)),
            Err(Error::OutOfBounds {
                row: 4,
                col: 0,
                rows: 4,
                cols: 6
            }),
            "Row past the grid"
        );
        assert!(
            matches!(table.set((0, 6), 0, 1.0), Err(Error::OutOfBounds { .. })),
            "Column past the grid"
        );
        assert!(
            matches!(table.set((0, 0), 4, 1.0), Err(Error::InvalidAction(_))),
            "Column past the action enumeration"
        );
    }

    #[test]
    fn greedy_breaks_ties_by_first_index() {
        let mut table = ActionValueTable::new(1, 1, 150.0);
        assert_eq!(table.greedy((0, 0)).unwrap(), Action::Up, "All equal picks up");

        table.set((0, 0), Action::Right.index(), 151.0).unwrap();
        table.set((0, 0), Action::Left.index(), 151.0).unwrap();
        assert_eq!(table.greedy((0, 0)).unwrap(), Action::Right, "First of tied maxima");
    }

    #[test]
    fn reporting_views() {
        let mut table = ActionValueTable::new(2, 2, 0.0);
        table.set((1, 0), Action::Down.index(), 3.0).unwrap();

        let policy = table.greedy_policy().unwrap();
        assert_eq!(policy.len(), 4, "One action per cell");
        assert_eq!(policy[2], ((1, 0), Action::Down), "Row-major order");

        for &a in Action::VARIANTS {
            let column = table.values_for(a).unwrap();
            let expected = if a == Action::Down { 3.0 } else { 0.0 };
            assert_eq!(column[2], expected, "{a} column at (1, 0)");
        }
    }
}
