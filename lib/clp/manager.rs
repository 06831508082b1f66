use crate::cfg::{Block, Instruction};
use crate::clp::problem::ClpProblem;
use crate::clp::state::State;
use crate::clp::value::Value;
use crate::sem::Inst;
use crate::Error;
use bitflags::bitflags;

bitflags! {
    /// What changed with the last step of a `Manager`.
    pub struct Step: u32 {
        /// Nothing left to interpret.
        const ENDED    = 0b000;
        const NEW_SEM  = 0b001;
        const NEW_PATH = 0b010;
        const NEW_INST = 0b100;
    }
}

/// Steps through a block one semantic instruction at a time, giving access
/// to the state after each of them.
pub struct Manager<'m, 'p> {
    problem: ClpProblem<'p>,
    block: Option<&'m Block>,
    instruction: usize,
    sem: usize,
    state: State,
    path: Option<State>,
}

impl<'m, 'p> Manager<'m, 'p> {
    pub fn new(problem: ClpProblem<'p>) -> Manager<'m, 'p> {
        Manager {
            problem,
            block: None,
            instruction: 0,
            sem: 0,
            state: State::empty(),
            path: None,
        }
    }

    pub fn problem(&self) -> &ClpProblem<'p> {
        &self.problem
    }

    /// Starts the interpretation of `block` from `input`, and interprets its
    /// first semantic instruction.
    pub fn start(&mut self, block: &'m Block, input: &State) -> Result<Step, Error> {
        self.state = input.clone();
        self.path = None;
        self.instruction = 0;
        self.sem = 0;
        match block.instructions().first() {
            Some(instruction) => {
                self.block = Some(block);
                self.problem.prepare(instruction);
                Ok(self.next()? | Step::NEW_PATH | Step::NEW_INST)
            }
            None => {
                self.block = None;
                Ok(Step::ENDED)
            }
        }
    }

    fn merge_path(&mut self) {
        if let Some(path) = self.path.take() {
            self.state.join(&path);
        }
    }

    /// Interprets the next semantic instruction.
    pub fn next(&mut self) -> Result<Step, Error> {
        let block = match self.block {
            Some(block) => block,
            None => return Ok(Step::ENDED),
        };

        let mut step = Step::NEW_SEM;
        while self.problem.is_path_ended() {
            self.merge_path();
            self.path = self.problem.next_path();
            step |= Step::NEW_PATH;
            if self.path.is_none() {
                step |= Step::NEW_INST;
                self.state.clear_temporaries();
                self.instruction += 1;
                match block.instructions().get(self.instruction) {
                    Some(instruction) => self.problem.prepare(instruction),
                    None => {
                        self.block = None;
                        return Ok(Step::ENDED);
                    }
                }
            }
        }

        self.sem = self.problem.pc();
        let state = match self.path.as_mut() {
            Some(path) => path,
            None => &mut self.state,
        };
        self.problem.step(state)?;

        // the state is usable right away, later paths re-assign it
        if self.problem.is_path_ended() {
            self.merge_path();
        }
        Ok(step)
    }

    /// The last interpreted semantic instruction.
    pub fn sem(&self) -> Option<Inst> {
        self.block?;
        self.problem.sem(self.sem)
    }

    /// The machine instruction being interpreted.
    pub fn inst(&self) -> Option<&'m Instruction> {
        self.block?.instructions().get(self.instruction)
    }

    /// State after the last interpreted semantic instruction.
    pub fn state(&self) -> &State {
        self.path.as_ref().unwrap_or(&self.state)
    }

    /// Address computed by the last load or store.
    pub fn access_address(&self) -> Value {
        self.problem.access_address()
    }

    /// Restarts the current machine instruction from `state`.
    pub fn rewind(&mut self, state: State) -> Step {
        self.state = state;
        self.path = None;
        if let Some(instruction) = self.inst() {
            self.problem.prepare(instruction);
        }
        self.sem = self.problem.pc();
        Step::NEW_SEM | Step::NEW_INST
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::ControlFlowGraph;
    use crate::clp::Options;
    use crate::flow_facts::FlowFacts;
    use crate::memory::backing::Memory;
    use crate::platform::{Endian, Platform};
    use crate::process::Process;
    use crate::sem::{self, Condition, DataType};

    fn r(index: i32) -> Value {
        Value::register(index)
    }

    #[test]
    fn steps() {
        let process = Process::new(Platform::arm(), Memory::new(Endian::Little));
        let facts = FlowFacts::new();
        let problem = ClpProblem::new(&process, &facts, Options::new()).unwrap();
        let mut cfg = ControlFlowGraph::new();
        let block = cfg.new_block().unwrap();
        block.push(0x100, vec![sem::seti(0, 0x200), sem::load(1, 0, DataType::Int32)]);
        block.push(
            0x104,
            vec![
                sem::scratch(-1),
                sem::if_(Condition::Eq, -1, 1),
                sem::seti(2, 1),
                sem::seti(3, 5),
            ],
        );
        let block: &Block = block;

        let mut manager = Manager::new(problem);
        let step = manager.start(block, &State::full()).unwrap();
        assert_eq!(step, Step::NEW_SEM | Step::NEW_PATH | Step::NEW_INST);
        assert_eq!(manager.sem(), Some(sem::seti(0, 0x200)));
        assert_eq!(manager.inst().unwrap().address(), 0x100);
        assert_eq!(manager.state().get(&r(0)).unwrap(), Value::constant(0x200));

        assert_eq!(manager.next().unwrap(), Step::NEW_SEM);
        assert_eq!(manager.access_address(), Value::constant(0x200));

        let step = manager.next().unwrap();
        assert_eq!(step, Step::NEW_SEM | Step::NEW_PATH | Step::NEW_INST);
        assert_eq!(manager.inst().unwrap().address(), 0x104);
        assert_eq!(manager.sem(), Some(sem::scratch(-1)));

        assert_eq!(manager.next().unwrap(), Step::NEW_SEM);
        assert_eq!(manager.next().unwrap(), Step::NEW_SEM);
        assert_eq!(manager.sem(), Some(sem::seti(2, 1)));
        assert_eq!(manager.state().get(&r(2)).unwrap(), Value::constant(1));
        assert_eq!(manager.next().unwrap(), Step::NEW_SEM);

        // the path skipping the assignment, joined as soon as it ends
        let step = manager.next().unwrap();
        assert_eq!(step, Step::NEW_SEM | Step::NEW_PATH);
        assert_eq!(manager.sem(), Some(sem::seti(3, 5)));
        assert_eq!(manager.state().get(&r(2)).unwrap(), Value::ALL);
        assert_eq!(manager.state().get(&r(3)).unwrap(), Value::constant(5));

        assert_eq!(manager.next().unwrap(), Step::ENDED);
        assert_eq!(manager.next().unwrap(), Step::ENDED);
        assert!(manager.sem().is_none());
    }

    #[test]
    fn rewind() {
        let process = Process::new(Platform::arm(), Memory::new(Endian::Little));
        let facts = FlowFacts::new();
        let problem = ClpProblem::new(&process, &facts, Options::new()).unwrap();
        let mut cfg = ControlFlowGraph::new();
        let block = cfg.new_block().unwrap();
        block.push(0x100, vec![sem::add(0, 0, 1)]);
        let block: &Block = block;
        let mut other_cfg = ControlFlowGraph::new();
        let empty: &Block = other_cfg.new_block().unwrap();

        let mut manager = Manager::new(problem);
        let mut input = State::full();
        input.set(&r(1), Value::constant(1)).unwrap();
        input.set(&r(0), Value::constant(1)).unwrap();
        manager.start(block, &input).unwrap();
        assert_eq!(manager.state().get(&r(0)).unwrap(), Value::constant(2));

        let mut other = input.clone();
        other.set(&r(0), Value::constant(10)).unwrap();
        assert_eq!(manager.rewind(other), Step::NEW_SEM | Step::NEW_INST);
        assert_eq!(manager.next().unwrap(), Step::NEW_SEM);
        assert_eq!(manager.state().get(&r(0)).unwrap(), Value::constant(11));

        assert_eq!(manager.start(empty, &input).unwrap(), Step::ENDED);
    }
}
