use crate::cfg::Block;
use crate::clp::problem::ClpProblem;
use crate::clp::state::State;
use crate::Error;

/// States recorded while interpreting one machine instruction.
#[derive(Clone, Debug)]
pub struct InstPack {
    address: u32,
    states: Vec<State>,
    output: State,
}

impl InstPack {
    pub(crate) fn new(address: u32) -> InstPack {
        InstPack {
            address,
            states: Vec::new(),
            output: State::empty(),
        }
    }

    pub(crate) fn push(&mut self, state: State) {
        self.states.push(state);
    }

    pub(crate) fn set_output(&mut self, output: State) {
        self.output = output;
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    /// State after each interpreted semantic instruction, in interpretation
    /// order. Forked paths follow the main one.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// State after the whole instruction, all paths joined.
    pub fn output(&self) -> &State {
        &self.output
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// The states of one block, instruction by instruction and semantic
/// instruction by semantic instruction, computed once from the block input.
#[derive(Clone, Debug)]
pub struct StatePack {
    input: State,
    packs: Vec<InstPack>,
}

impl StatePack {
    pub fn new(problem: &mut ClpProblem, block: &Block, input: &State) -> Result<StatePack, Error> {
        let mut packs = Vec::new();
        let mut output = State::empty();
        problem.update_block(&mut output, input, block, Some(&mut packs))?;
        Ok(StatePack {
            input: input.clone(),
            packs,
        })
    }

    pub fn input(&self) -> &State {
        &self.input
    }

    pub fn packs(&self) -> &[InstPack] {
        &self.packs
    }

    fn pack(&self, address: u32) -> Option<&InstPack> {
        self.packs.iter().find(|pack| pack.address() == address)
    }

    /// State after the instruction at `address`.
    pub fn state_after(&self, address: u32) -> Option<&State> {
        self.pack(address).map(InstPack::output)
    }

    /// State after the `sem`-th interpreted semantic instruction of the
    /// instruction at `address`.
    pub fn state_after_sem(&self, address: u32, sem: usize) -> Option<&State> {
        self.pack(address)?.states().get(sem)
    }

    /// State before the instruction at `address`. When no instruction has
    /// this address, the state at the end of the block.
    pub fn state_before(&self, address: u32) -> &State {
        let mut last = &self.input;
        for pack in &self.packs {
            if pack.address() == address {
                return last;
            }
            last = pack.output();
        }
        last
    }

    /// State before the `sem`-th interpreted semantic instruction of the
    /// instruction at `address`.
    pub fn state_before_sem(&self, address: u32, sem: usize) -> Option<&State> {
        let mut last = &self.input;
        for pack in &self.packs {
            if pack.address() == address {
                return match sem {
                    0 => Some(last),
                    _ => pack.states().get(sem - 1),
                };
            }
            if !pack.is_empty() {
                last = pack.output();
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::ControlFlowGraph;
    use crate::clp::{Options, Value};
    use crate::flow_facts::FlowFacts;
    use crate::memory::backing::Memory;
    use crate::platform::{Endian, Platform};
    use crate::process::Process;
    use crate::sem;

    #[test]
    fn queries() {
        let process = Process::new(Platform::arm(), Memory::new(Endian::Little));
        let facts = FlowFacts::new();
        let mut problem = ClpProblem::new(&process, &facts, Options::new()).unwrap();
        let mut cfg = ControlFlowGraph::new();
        let block = cfg.new_block().unwrap();
        block.push(0x100, vec![sem::seti(0, 1), sem::seti(1, 2)]);
        block.push(0x104, vec![sem::add(2, 0, 1)]);

        let pack = StatePack::new(&mut problem, block, &State::full()).unwrap();
        let r = |index| Value::register(index);

        assert_eq!(pack.packs().len(), 2);
        assert_eq!(pack.state_before(0x100), &State::full());
        assert_eq!(pack.state_after(0x100).unwrap().get(&r(1)).unwrap(), Value::constant(2));
        assert_eq!(pack.state_before(0x104).get(&r(0)).unwrap(), Value::constant(1));
        assert_eq!(
            pack.state_after(0x104).unwrap().get(&r(2)).unwrap(),
            Value::constant(3)
        );
        assert!(pack.state_after(0x108).is_none());
        assert_eq!(pack.state_before(0x108), pack.state_after(0x104).unwrap());

        let first = pack.state_after_sem(0x100, 0).unwrap();
        assert_eq!(first.get(&r(0)).unwrap(), Value::constant(1));
        assert_eq!(first.get(&r(1)).unwrap(), Value::ALL);
        assert_eq!(pack.state_before_sem(0x100, 1), Some(first));
        assert_eq!(pack.state_before_sem(0x104, 0), pack.state_after(0x100));
        assert!(pack.state_after_sem(0x100, 2).is_none());
        assert!(pack.state_before_sem(0x10c, 0).is_none());
    }
}
