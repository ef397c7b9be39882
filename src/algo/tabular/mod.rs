pub mod q_table;
pub mod td;

pub use q_table::ActionValueTable;
pub use td::{TdLearner, UpdateRule};
