pub mod grid_world;

pub use grid_world::{Action, Dynamics, GridWorld, Pos, RewardGrid};
