pub mod tabular;

pub use tabular::{ActionValueTable, TdLearner, UpdateRule};
