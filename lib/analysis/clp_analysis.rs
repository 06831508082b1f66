use crate::analysis::fixed_point::{fixed_point_forward, Problem};
use crate::analysis::StateMap;
use crate::cfg::ControlFlowGraph;
use crate::clp::{ClpProblem, Options, State, Statistics, Value};
use crate::flow_facts::FlowFacts;
use crate::process::{InitialState, Process};
use crate::Error;
use log::{info, warn};
use serde::Serialize;

/// Block states and statistics of a value analysis run.
#[derive(Clone, Debug, Serialize)]
pub struct ClpResult {
    states: StateMap<State>,
    statistics: Statistics,
}

impl ClpResult {
    pub fn states(&self) -> &StateMap<State> {
        &self.states
    }

    /// State on entry of `block`, `None` when the block is unreachable.
    pub fn state_in(&self, block: usize) -> Option<&State> {
        self.states.input(block)
    }

    /// State on exit of `block`.
    pub fn state_out(&self, block: usize) -> Option<&State> {
        self.states.output(block)
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Gives the stack pointer a value when nothing else did: the top of the
/// writable memory, or else the stack chosen by the loader.
fn initialize_stack_pointer(problem: &mut ClpProblem) -> Result<(), Error> {
    let process = problem.process();
    let sp = match process.platform().stack_pointer() {
        Some(sp) => sp,
        None => return Ok(()),
    };
    if !problem.entry().get(&Value::register(sp as i32))?.is_all() {
        return Ok(());
    }

    warn!("no initial value for the stack pointer, looking for writable memory");
    let address = match process.writable_top() {
        Some(address) => Some(address),
        None => {
            warn!("no writable memory, falling back to the loader stack");
            process.default_stack()
        }
    };
    match address {
        Some(address) => {
            warn!("stack pointer set to 0x{:08x}", address);
            problem.initialize_register(sp, Value::constant(address as i32))
        }
        None => {
            warn!("no value found for the stack pointer");
            Ok(())
        }
    }
}

/// Runs the value analysis over `cfg`.
///
/// `initial` holds what is known of the registers and memory on entry, on
/// top of the initial registers of `options`.
pub fn clp_analysis(
    process: &Process,
    cfg: &ControlFlowGraph,
    flow_facts: &FlowFacts,
    options: Options,
    initial: Option<&InitialState>,
) -> Result<ClpResult, Error> {
    let mut problem = ClpProblem::new(process, flow_facts, options)?;
    if let Some(initial) = initial {
        problem.with_initial_state(initial)?;
    }
    initialize_stack_pointer(&mut problem)?;

    let states = fixed_point_forward(&mut problem, cfg)?;
    let statistics = problem.statistics().clone();
    info!(
        "value analysis: {} blocks reached, {} block updates",
        states.blocks().count(),
        statistics.blocks
    );
    if problem.options().verbose() {
        info!("{}", statistics);
    }

    Ok(ClpResult { states, statistics })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::Branch;
    use crate::clp::{Comparison, Filter, UMAX};
    use crate::memory::backing::Memory;
    use crate::memory::MemoryPermissions;
    use crate::platform::{Endian, Platform};
    use crate::sem;

    fn k(n: i32) -> Value {
        Value::constant(n)
    }

    fn r(index: i32) -> Value {
        Value::register(index)
    }

    /// r1 <- 0; while r1 < 5 { r1 <- r1 + 1 }
    fn counting_loop() -> ControlFlowGraph {
        let mut cfg = ControlFlowGraph::new();
        let entry = cfg.new_block().unwrap();
        entry.push(0x100, vec![sem::seti(1, 0)]);
        let entry = entry.index();
        let header = cfg.new_block().unwrap();
        header.push(0x104, vec![sem::nop()]);
        let header = header.index();
        let body = cfg.new_block().unwrap();
        body.push(0x108, vec![sem::seti(2, 1), sem::add(1, 1, 2)]);
        let body = body.index();
        let exit = cfg.new_exit_block().unwrap().index();

        cfg.set_entry(entry).unwrap();
        cfg.unconditional_edge(entry, header).unwrap();
        cfg.conditional_edge(header, body, Branch::Taken)
            .unwrap()
            .set_register_filters(vec![Filter::register(1, Comparison::Lt, k(5))]);
        cfg.conditional_edge(header, exit, Branch::NotTaken)
            .unwrap()
            .set_register_filters(vec![Filter::register(1, Comparison::Ge, k(5))]);
        cfg.unconditional_edge(body, header).unwrap();
        cfg
    }

    fn process() -> Process {
        Process::new(Platform::arm(), Memory::new(Endian::Little))
    }

    #[test]
    fn bounded_loop() {
        let process = process();
        let cfg = counting_loop();
        let mut facts = FlowFacts::new();
        facts.set_loop_bound(1, 5);

        let result = clp_analysis(&process, &cfg, &facts, Options::new(), None).unwrap();
        assert_eq!(
            result.state_in(1).unwrap().get(&r(1)).unwrap(),
            Value::clp(0, 1, 5)
        );
        assert_eq!(result.state_in(3).unwrap().get(&r(1)).unwrap(), k(5));
        assert!(result.to_json().is_ok());
    }

    #[test]
    fn unbounded_loop() {
        let process = process();
        let cfg = counting_loop();
        let facts = FlowFacts::new();

        let result = clp_analysis(&process, &cfg, &facts, Options::new(), None).unwrap();
        assert_eq!(
            result.state_in(1).unwrap().get(&r(1)).unwrap(),
            Value::clp(0, 1, UMAX)
        );
        assert!(result.state_in(3).is_some());
    }

    #[test]
    fn stack_pointer_fallback() {
        let mut memory = Memory::new(Endian::Little);
        memory
            .set_memory(0x8000, vec![0; 0x100], MemoryPermissions::READ | MemoryPermissions::WRITE)
            .unwrap();
        let process = Process::new(Platform::arm(), memory);
        let mut cfg = ControlFlowGraph::new();
        let entry = cfg.new_block().unwrap().index();
        cfg.set_entry(entry).unwrap();
        let facts = FlowFacts::new();

        let result = clp_analysis(&process, &cfg, &facts, Options::new(), None).unwrap();
        assert_eq!(result.state_in(entry).unwrap().get(&r(13)).unwrap(), k(0x8100));

        let mut initial = InitialState::new();
        initial.set_register(13, k(0x7000));
        initial.set_memory(0x7000, k(3));
        let result = clp_analysis(&process, &cfg, &facts, Options::new(), Some(&initial)).unwrap();
        let input = result.state_in(entry).unwrap();
        assert_eq!(input.get(&r(13)).unwrap(), k(0x7000));
        assert_eq!(input.get(&k(0x7000)).unwrap(), k(3));

        let mut process = self::process();
        process.set_default_stack(Some(0x9000));
        let result = clp_analysis(&process, &cfg, &facts, Options::new(), None).unwrap();
        assert_eq!(result.state_in(entry).unwrap().get(&r(13)).unwrap(), k(0x9000));
    }

    #[test]
    fn missing_entry() {
        let process = process();
        let mut cfg = ControlFlowGraph::new();
        cfg.new_block().unwrap();
        let facts = FlowFacts::new();
        assert!(matches!(
            clp_analysis(&process, &cfg, &facts, Options::new(), None),
            Err(Error::NoEntry)
        ));
    }
}
