/// Tabular learning algorithms
pub mod algo;

/// Implementations of strategies for episode-decaying hyperparameters
pub mod decay;

/// Environment
pub mod env;

/// Exploration policies
pub mod exploration;

/// Observed transitions
pub mod memory;

/// Grid environments
pub mod gym;

/// Epoch and episode orchestration
pub mod train;

mod error;
mod util;

pub use error::{Error, Result};
pub use train::{compare_rules, EpisodeSummary, RewardCurve, RuleRun, TrainConfig, Trainer};
