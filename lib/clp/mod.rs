//! Circular-linear progression value analysis.
//!
//! `Value` is the abstract domain of machine words, `State` maps registers
//! and memory cells to values, and `ClpProblem` gives the transfer functions
//! run by `analysis::fixed_point`. `StatePack` and `Manager` replay a block
//! once the analysis is over, to look at the states inside it.

pub mod filter;
mod manager;
mod options;
mod pack;
mod problem;
mod state;
pub mod value;

pub use self::filter::{Comparison, Filter};
pub use self::manager::{Manager, Step};
pub use self::options::{Options, OptionsBuilder, DEFAULT_MEMORY_ACCESS_THRESHOLD};
pub use self::pack::{InstPack, StatePack};
pub use self::problem::{ClpProblem, Statistics};
pub use self::state::State;
pub use self::value::{Kind, Value, MAXN, MINN, UMAX};
