use crate::analysis::StateMap;
use crate::cfg::ControlFlowGraph;
use crate::clp::State;
use std::collections::BTreeSet;

fn is_dead(states: &StateMap<State>, block: usize) -> bool {
    states.output(block).map(State::is_bottom).unwrap_or(true)
}

/// Blocks the value analysis found unreachable.
pub fn dead_blocks(cfg: &ControlFlowGraph, states: &StateMap<State>) -> BTreeSet<usize> {
    cfg.blocks()
        .into_iter()
        .map(|block| block.index())
        .filter(|index| is_dead(states, *index))
        .collect()
}

/// Edges never followed, as `(head, tail)` pairs: one of their ends is
/// unreachable.
pub fn dead_edges(cfg: &ControlFlowGraph, states: &StateMap<State>) -> BTreeSet<(usize, usize)> {
    cfg.edges()
        .into_iter()
        .filter(|edge| is_dead(states, edge.head()) || is_dead(states, edge.tail()))
        .map(|edge| (edge.head(), edge.tail()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::clp_analysis;
    use crate::cfg::Branch;
    use crate::clp::{Comparison, Filter, Options, Value};
    use crate::flow_facts::FlowFacts;
    use crate::memory::backing::Memory;
    use crate::platform::{Endian, Platform};
    use crate::process::Process;
    use crate::sem;

    #[test]
    fn infeasible_branch() {
        let process = Process::new(Platform::arm(), Memory::new(Endian::Little));
        let facts = FlowFacts::new();

        // r0 <- 5; if r0 < 3 { 1 } else { 2 }; 3
        let mut cfg = ControlFlowGraph::new();
        let entry = cfg.new_block().unwrap();
        entry.push(0x100, vec![sem::seti(0, 5)]);
        let entry = entry.index();
        let then = cfg.new_block().unwrap();
        then.push(0x104, vec![sem::seti(1, 1)]);
        let then = then.index();
        let other = cfg.new_block().unwrap();
        other.push(0x108, vec![sem::seti(1, 2)]);
        let other = other.index();
        let exit = cfg.new_exit_block().unwrap().index();
        cfg.set_entry(entry).unwrap();
        cfg.conditional_edge(entry, then, Branch::Taken)
            .unwrap()
            .set_register_filters(vec![Filter::register(0, Comparison::Lt, Value::constant(3))]);
        cfg.conditional_edge(entry, other, Branch::NotTaken)
            .unwrap()
            .set_register_filters(vec![Filter::register(0, Comparison::Ge, Value::constant(3))]);
        cfg.unconditional_edge(then, exit).unwrap();
        cfg.unconditional_edge(other, exit).unwrap();

        let result = clp_analysis(&process, &cfg, &facts, Options::new(), None).unwrap();
        let states = result.states();

        assert_eq!(dead_blocks(&cfg, states), vec![then].into_iter().collect());
        assert_eq!(
            dead_edges(&cfg, states),
            vec![(entry, then), (then, exit)].into_iter().collect()
        );
        assert_eq!(
            result.state_in(exit).unwrap().get(&Value::register(1)).unwrap(),
            Value::constant(2)
        );
    }
}
