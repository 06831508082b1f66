//! Data-flow analyses over a `ControlFlowGraph`.

mod clp_analysis;
mod dead_code;
pub mod fixed_point;
mod state_map;

pub use self::clp_analysis::{clp_analysis, ClpResult};
pub use self::dead_code::{dead_blocks, dead_edges};
pub use self::state_map::StateMap;
