//! Clp: Circular-Linear Progression value analysis.
//!
//! This crate computes, for every point of a program, an over-approximation
//! of the values held by registers and memory cells. Values are abstracted as
//! circular-linear progressions, sets of the form `{ base + delta * i | 0 <= i
//! <= mtimes }` over 32-bit machine words.
//!
//! The analysis runs over a control flow graph whose blocks carry semantic
//! micro-instructions, see `sem`. A classic worklist solver, see
//! `analysis::fixed_point`, iterates the `clp::ClpProblem` transfer functions
//! until a fixed point is reached, using widening on loop headers.
//!
//! Once the analysis is over, per-instruction states can be recovered with a
//! `clp::StatePack`, and a `clp::Manager` can step through a block one
//! semantic instruction at a time.

pub mod analysis;
pub mod cfg;
pub mod clp;
mod error;
pub mod flow_facts;
pub mod graph;
pub mod memory;
pub mod platform;
pub mod process;
pub mod sem;

pub use error::Error;

#[cfg(not(feature = "thread_safe"))]
use std::rc::Rc;
#[cfg(not(feature = "thread_safe"))]
pub type RC<T> = Rc<T>;

#[cfg(feature = "thread_safe")]
use std::sync::Arc;
#[cfg(feature = "thread_safe")]
pub type RC<T> = Arc<T>;
