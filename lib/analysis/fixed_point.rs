//! A worklist solver for forward data-flow problems over a
//! `ControlFlowGraph`.

use crate::analysis::StateMap;
use crate::cfg::{Block, ControlFlowGraph, Edge};
use crate::graph::Loop;
use crate::Error;
use log::{debug, trace};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};

/// A forward data-flow problem.
///
/// The solver only moves states around: the lattice operations and the
/// transfer functions all come from the problem.
pub trait Problem {
    type Domain: Clone;

    /// The state of unreachable code.
    fn bottom(&self) -> Self::Domain;

    fn top(&self) -> Self::Domain;

    /// The state on entry of the entry block.
    fn entry(&self) -> Self::Domain;

    /// Joins `b` into `a`.
    fn lub(&self, a: &mut Self::Domain, b: &Self::Domain);

    /// Widens `a` with `b` at the header `block` of a loop.
    fn widening(&self, block: usize, a: &mut Self::Domain, b: &Self::Domain);

    fn equals(&self, a: &Self::Domain, b: &Self::Domain) -> bool;

    fn assign(&self, a: &mut Self::Domain, b: &Self::Domain) {
        *a = b.clone();
    }

    /// Transfer function of an edge, applied to the output of its head.
    fn update_edge(&mut self, edge: &Edge, state: &mut Self::Domain) -> Result<(), Error>;

    /// Transfer function of a block.
    fn update(
        &mut self,
        out: &mut Self::Domain,
        input: &Self::Domain,
        block: &Block,
    ) -> Result<(), Error>;

    /// Called on a state flowing into the loop headed by `header`.
    fn enter_context(&mut self, _state: &mut Self::Domain, _header: usize) {}

    /// Called on a state flowing out of the loop headed by `header`.
    fn leave_context(&mut self, _state: &mut Self::Domain, _header: usize) {}
}

/// Solves `problem` over `cfg`, returning the input and output state of each
/// reachable block.
///
/// Blocks are visited in reverse post order. The input of a loop header is
/// widened each time it is recomputed.
pub fn fixed_point_forward<P: Problem>(
    problem: &mut P,
    cfg: &ControlFlowGraph,
) -> Result<StateMap<P::Domain>, Error> {
    let entry = cfg.entry().ok_or(Error::NoEntry)?;
    let order = cfg.graph().compute_reverse_post_order(entry)?;
    let rank: FxHashMap<usize, usize> = order
        .iter()
        .enumerate()
        .map(|(rank, index)| (*index, rank))
        .collect();
    let loops: BTreeMap<usize, Loop> = cfg
        .loops()?
        .into_iter()
        .map(|l| (l.header(), l))
        .collect();

    let mut states: StateMap<P::Domain> = StateMap::new();
    let mut queue: BTreeSet<usize> = BTreeSet::new();
    queue.insert(0);
    let mut iterations = 0usize;

    while let Some(position) = queue.iter().next().copied() {
        queue.remove(&position);
        iterations += 1;
        let index = order[position];
        let header = loops.get(&index);

        let mut input = if index == entry {
            problem.entry()
        } else {
            problem.bottom()
        };
        for edge in cfg.edges_in(index)? {
            let mut state = match states.output(edge.head()) {
                Some(output) => output.clone(),
                None => continue,
            };
            problem.update_edge(edge, &mut state)?;
            for l in loops.values() {
                if l.contains(edge.head()) && !l.contains(edge.tail()) {
                    problem.leave_context(&mut state, l.header());
                }
            }
            if let Some(l) = header {
                if !l.contains(edge.head()) {
                    problem.enter_context(&mut state, index);
                }
            }
            problem.lub(&mut input, &state);
        }

        if let Some(old) = states.input(index) {
            if header.is_some() {
                let mut joined = old.clone();
                problem.lub(&mut joined, &input);
                let mut widened = old.clone();
                problem.widening(index, &mut widened, &joined);
                problem.assign(&mut input, &widened);
            }
            if problem.equals(old, &input) && states.output(index).is_some() {
                continue;
            }
        }

        trace!("updating block 0x{:x}", index);
        let mut output = problem.bottom();
        problem.update(&mut output, &input, cfg.block(index)?)?;
        states.set_input(index, input);

        let changed = match states.output(index) {
            Some(old) => !problem.equals(old, &output),
            None => true,
        };
        if changed {
            states.set_output(index, output);
            for successor in cfg.successor_indices(index)? {
                if let Some(rank) = rank.get(&successor) {
                    queue.insert(*rank);
                }
            }
        }
    }

    debug!("fixed point reached after {} block updates", iterations);
    Ok(states)
}
