//! Transfer functions of the value analysis.

use crate::analysis::fixed_point::Problem;
use crate::cfg::{Block, BlockKind, Branch, Edge, Instruction};
use crate::clp::filter::{self, Filter};
use crate::clp::options::Options;
use crate::clp::pack::InstPack;
use crate::clp::state::State;
use crate::clp::value::Value;
use crate::flow_facts::FlowFacts;
use crate::process::{InitialState, Process};
use crate::sem::{BinOp, DataType, Inst};
use crate::Error;
use log::{trace, warn};
use serde::Serialize;
use std::fmt;

/// Counters describing how much precision the analysis lost.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Statistics {
    /// Blocks interpreted, all iterations included.
    pub blocks: usize,
    pub instructions: usize,
    pub semantic_instructions: usize,
    pub sets: usize,
    /// Registers set to T.
    pub top_sets: usize,
    pub stores: usize,
    /// Stores of T, or to more addresses than can be enumerated.
    pub top_stores: usize,
    /// Stores whose address is T.
    pub top_store_addresses: usize,
    pub loads: usize,
    /// Loads whose address is T.
    pub top_load_addresses: usize,
    /// Loads giving T.
    pub top_loads: usize,
    pub filters: usize,
    /// Filters against a T bound.
    pub top_filters: usize,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "blocks: {}", self.blocks)?;
        writeln!(
            f,
            "instructions: {} ({} semantic)",
            self.instructions, self.semantic_instructions
        )?;
        writeln!(f, "sets: {} ({} to T)", self.sets, self.top_sets)?;
        writeln!(
            f,
            "stores: {} ({} of T, {} to T)",
            self.stores, self.top_stores, self.top_store_addresses
        )?;
        writeln!(
            f,
            "loads: {} ({} of T, {} from T)",
            self.loads, self.top_loads, self.top_load_addresses
        )?;
        write!(f, "filters: {} ({} against T)", self.filters, self.top_filters)
    }
}

/// The words denoted by `address`, in progression order.
fn addresses(address: &Value) -> impl Iterator<Item = u32> {
    let (base, delta) = (address.base(), address.delta());
    let count = if delta == 0 { 0 } else { address.mtimes() };
    (0..=count).map(move |m| base.wrapping_add(delta.wrapping_mul(m as i32)) as u32)
}

/// The value analysis of one function.
///
/// Besides the block transfer function driven by the fixed point solver,
/// this holds the state of a small interpreter for the semantic
/// instructions of one machine instruction. An `If` forks the interpretation:
/// the alternative is pushed on a stack with a copy of the current state and
/// resumed once the current path ends. All paths are joined before the next
/// machine instruction.
pub struct ClpProblem<'p> {
    process: &'p Process,
    flow_facts: &'p FlowFacts,
    options: Options,
    init: State,
    sems: Vec<Inst>,
    pc: usize,
    forks: Vec<(usize, State)>,
    current_inst: Option<u32>,
    access_address: Value,
    statistics: Statistics,
}

impl<'p> ClpProblem<'p> {
    /// Creates the problem, the entry state holding the initial registers of
    /// `options`.
    pub fn new(
        process: &'p Process,
        flow_facts: &'p FlowFacts,
        options: Options,
    ) -> Result<ClpProblem<'p>, Error> {
        let mut problem = ClpProblem {
            process,
            flow_facts,
            options,
            init: State::full(),
            sems: Vec::new(),
            pc: 0,
            forks: Vec::new(),
            current_inst: None,
            access_address: Value::NONE,
            statistics: Statistics::default(),
        };
        let registers = problem.options.initial_registers().to_vec();
        for (register, address) in registers {
            problem.initialize_register(register, Value::constant(address as i32))?;
        }
        Ok(problem)
    }

    pub fn process(&self) -> &'p Process {
        self.process
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Sets a register of the entry state.
    pub fn initialize_register(&mut self, register: usize, value: Value) -> Result<(), Error> {
        let index = register as i32;
        self.process.platform().check_register(index)?;
        trace!("init: r{} <- {}", register, value);
        self.init.set(&Value::register(index), value)
    }

    /// Sets a memory cell of the entry state.
    pub fn initialize_memory(&mut self, address: u32, value: Value) -> Result<(), Error> {
        trace!("init: @{:08x} <- {}", address, value);
        self.init.set(&Value::constant(address as i32), value)
    }

    /// Merges the registers and memory cells known on function entry into
    /// the entry state.
    pub fn with_initial_state(&mut self, initial: &InitialState) -> Result<(), Error> {
        for (register, value) in initial.registers() {
            self.initialize_register(*register, *value)?;
        }
        for (address, value) in initial.memory() {
            self.initialize_memory(*address, *value)?;
        }
        Ok(())
    }

    /// Address computed by the last load or store.
    pub fn access_address(&self) -> Value {
        self.access_address
    }

    fn get(&self, state: &State, register: i16) -> Result<Value, Error> {
        let index = register as i32;
        self.process.platform().check_register(index)?;
        state.get(&Value::register(index))
    }

    fn set(&self, state: &mut State, register: i16, value: Value) -> Result<(), Error> {
        let index = register as i32;
        self.process.platform().check_register(index)?;
        state.set(&Value::register(index), value)
    }

    /// Prepares the interpretation of the semantics of `instruction`.
    pub(crate) fn prepare(&mut self, instruction: &Instruction) {
        self.sems.clear();
        self.sems.extend_from_slice(instruction.semantics());
        self.current_inst = Some(instruction.address());
        self.pc = 0;
        self.forks.clear();
    }

    /// Index of the next semantic instruction to interpret.
    pub(crate) fn pc(&self) -> usize {
        self.pc
    }

    pub(crate) fn sem(&self, index: usize) -> Option<Inst> {
        self.sems.get(index).copied()
    }

    pub(crate) fn is_path_ended(&self) -> bool {
        self.pc >= self.sems.len()
    }

    /// Resumes the last forked path, returning its state.
    pub(crate) fn next_path(&mut self) -> Option<State> {
        let (pc, state) = self.forks.pop()?;
        self.pc = pc;
        Some(state)
    }

    /// Interprets the current semantic instruction over `state`.
    pub(crate) fn step(&mut self, state: &mut State) -> Result<(), Error> {
        let inst = match self.sems.get(self.pc) {
            Some(inst) => *inst,
            None => return Ok(()),
        };
        self.statistics.semantic_instructions += 1;
        if state.is_bottom() {
            self.pc += 1;
            return Ok(());
        }

        match inst {
            Inst::Nop => {}
            Inst::Branch { target } => {
                trace!("branch({})", self.get(state, target)?);
            }
            Inst::Trap | Inst::Cont => {
                self.pc = self.sems.len();
                return Ok(());
            }
            Inst::If { jump, .. } => {
                self.forks.push((self.pc + jump as usize + 1, state.clone()));
            }
            Inst::Load { dst, addr, ty } => self.load(state, dst, addr, ty)?,
            Inst::Store { src, addr, .. } => self.store(state, src, addr)?,
            Inst::Scratch { dst } | Inst::Setp { dst, .. } => self.set(state, dst, Value::ALL)?,
            Inst::Set { dst, src } => {
                let value = self.get(state, src)?;
                self.statistics.sets += 1;
                if value.is_all() {
                    self.statistics.top_sets += 1;
                }
                self.set(state, dst, value)?;
            }
            Inst::Seti { dst, cst } => self.set(state, dst, Value::constant(cst as i32))?,
            Inst::Binary { op, dst, a, b } => {
                let (va, vb) = (self.get(state, a)?, self.get(state, b)?);
                let value = match op {
                    BinOp::Add => va.add(&vb),
                    BinOp::Sub => va.sub(&vb),
                    BinOp::Shl => va.shl(&vb),
                    BinOp::Shr => va.shr(&vb),
                    BinOp::Asr => va.asr(&vb),
                    BinOp::And => va.and(&vb),
                    BinOp::Or => va.or(&vb),
                    BinOp::Mul | BinOp::Mulu => va.mul(&vb),
                    BinOp::Mulh => va.mulh(&vb),
                    BinOp::Cmp
                    | BinOp::Cmpu
                    | BinOp::Xor
                    | BinOp::Div
                    | BinOp::Divu
                    | BinOp::Mod
                    | BinOp::Modu => Value::ALL,
                };
                trace!("{} = {} ({}, {})", inst, value, va, vb);
                if value.is_all() {
                    self.statistics.top_sets += 1;
                }
                self.set(state, dst, value)?;
            }
        }

        self.pc += 1;
        Ok(())
    }

    fn load(&mut self, state: &mut State, dst: i16, addr: i16, ty: DataType) -> Result<(), Error> {
        self.statistics.loads += 1;
        let address = self.get(state, addr)?;
        self.access_address = address;
        let threshold = self.options.memory_access_threshold();

        let mut value = if address.is_all() {
            self.statistics.top_load_addresses += 1;
            trace!("load({}) from T", dst);
            Value::ALL
        } else if address.mtimes() < threshold {
            let mut value = Value::NONE;
            for word in addresses(&address) {
                value = value.join(&state.get(&Value::constant(word as i32))?);
                if value.is_all() {
                    break;
                }
            }
            value
        } else {
            trace!("load({}) from {}: too many addresses", dst, address);
            Value::ALL
        };

        if value.is_all() && !address.is_all() && address.mtimes() < threshold.saturating_mul(2) {
            if address.mtimes() >= threshold {
                warn!(
                    "reading {} locations of the initialized memory",
                    address.mtimes() as u64 + 1
                );
            }
            if let Some(initial) = self.read_initial(&address, ty) {
                value = initial;
            }
        }

        if value.is_all() {
            self.statistics.top_loads += 1;
        }
        trace!("load({}, {}) = {}", dst, address, value);
        self.set(state, dst, value)
    }

    /// Join of the words of the initial image at `address`, when all of them
    /// are read-only.
    fn read_initial(&self, address: &Value, ty: DataType) -> Option<Value> {
        let mut value = Value::NONE;
        for word in addresses(address) {
            if !self.process.is_read_only(word) {
                return None;
            }
            value = value.join(&Value::constant(self.process.read(word, ty)?));
        }
        Some(value)
    }

    fn store(&mut self, state: &mut State, src: i16, addr: i16) -> Result<(), Error> {
        self.statistics.stores += 1;
        let address = self.get(state, addr)?;
        let value = self.get(state, src)?;
        self.access_address = address;
        let threshold = self.options.memory_access_threshold();

        if address.is_all() {
            self.statistics.top_stores += 1;
            self.statistics.top_store_addresses += 1;
            let range = self
                .current_inst
                .and_then(|inst| self.flow_facts.access_range(inst));
            match range {
                Some(range) => {
                    let span = Value::clp(range.low as i32, 1, range.high.wrapping_sub(range.low));
                    trace!("store({}) to T, access range {}", value, span);
                    state.set(&span, value)?;
                }
                None => state.set(&Value::ALL, value)?,
            }
            if self.options.verbose() {
                warn!(
                    "store to T at {:08X}",
                    self.current_inst.unwrap_or_default()
                );
            }
        } else if address.mtimes() >= threshold {
            self.statistics.top_stores += 1;
            if !address.is_inf() {
                if address.uwrap() {
                    state.set(&Value::ALL, value)?;
                } else {
                    let low = if address.direction() {
                        address.lower()
                    } else {
                        address.upper()
                    } as u32;
                    let size = address.delta().unsigned_abs() as u64 * address.mtimes() as u64 + 1;
                    trace!("store({}, {}): clearing {} bytes", value, address, size);
                    state.clear(low, std::cmp::min(size, u32::MAX as u64) as u32);
                }
            } else {
                match self.process.find_symbol_at(address.lower() as u32) {
                    Some(symbol) => state.clear(symbol.address(), symbol.size()),
                    None => {
                        self.statistics.top_store_addresses += 1;
                        state.set(&Value::ALL, value)?;
                        if self.options.verbose() {
                            warn!(
                                "store to T at {:08X}",
                                self.current_inst.unwrap_or_default()
                            );
                        }
                    }
                }
            }
        } else {
            if value.is_all() {
                self.statistics.top_stores += 1;
            }
            if address.is_const() {
                state.set(&Value::constant(address.base()), value)?;
            } else {
                // the written word is unknown, every candidate keeps its
                // previous value as a possibility
                for word in addresses(&address) {
                    let cell = Value::constant(word as i32);
                    let joined = value.join(&state.get(&cell)?);
                    state.set(&cell, joined)?;
                }
            }
            trace!("store({}, {})", value, address);
        }
        Ok(())
    }

    /// Block transfer function. When `recorder` is given, one `InstPack` per
    /// machine instruction is pushed to it.
    pub(crate) fn update_block(
        &mut self,
        out: &mut State,
        input: &State,
        block: &Block,
        mut recorder: Option<&mut Vec<InstPack>>,
    ) -> Result<(), Error> {
        *out = input.clone();
        self.statistics.blocks += 1;

        match block.kind() {
            BlockKind::Basic => {}
            BlockKind::Call { callee: None } => {
                *out = if self.options.unknown_callee_bottom() {
                    State::empty()
                } else {
                    State::full()
                };
                return Ok(());
            }
            BlockKind::Entry | BlockKind::Exit | BlockKind::Call { .. } => return Ok(()),
        }
        if out.is_bottom() {
            return Ok(());
        }

        for instruction in block.instructions() {
            trace!("{}", instruction);
            self.statistics.instructions += 1;
            self.prepare(instruction);
            let mut pack = recorder
                .as_ref()
                .map(|_| InstPack::new(instruction.address()));

            // `None` while interpreting the main path, which works on `out`
            let mut path: Option<State> = None;
            loop {
                {
                    let state = match path.as_mut() {
                        Some(state) => state,
                        None => &mut *out,
                    };
                    while !self.is_path_ended() {
                        self.step(state)?;
                        if let Some(pack) = pack.as_mut() {
                            pack.push(state.clone());
                        }
                    }
                }
                if let Some(state) = path.take() {
                    out.join(&state);
                }
                match self.next_path() {
                    Some(state) => path = Some(state),
                    None => break,
                }
            }
            out.clear_temporaries();

            if let (Some(recorder), Some(mut pack)) = (recorder.as_mut(), pack) {
                pack.set_output(out.clone());
                recorder.push(pack);
            }
        }

        self.current_inst = None;
        Ok(())
    }

    fn apply_filters(
        &mut self,
        filters: &[Filter],
        state: &mut State,
        registers: bool,
    ) -> Result<(), Error> {
        let init = state.clone();
        let mut all = State::empty();
        for filter in filters {
            match filter {
                Filter::Skip => {}
                Filter::Or => {
                    all.join(state);
                    *state = init.clone();
                }
                Filter::Compare { op, target, bound } => {
                    let target = if registers {
                        self.process.platform().check_register(target.lower())?;
                        Value::register(target.lower())
                    } else {
                        *target
                    };
                    let value = state.get(&target)?;
                    let filtered = filter::apply(&value, *op, bound);
                    trace!("filter {}: {} -> {}", filter, value, filtered);
                    state.set(&target, filtered)?;
                    self.statistics.filters += 1;
                    if bound.is_all() {
                        self.statistics.top_filters += 1;
                    }
                }
            }
        }
        state.join(&all);
        Ok(())
    }
}

impl<'p> Problem for ClpProblem<'p> {
    type Domain = State;

    fn bottom(&self) -> State {
        State::empty()
    }

    fn top(&self) -> State {
        State::full()
    }

    fn entry(&self) -> State {
        self.init.clone()
    }

    fn lub(&self, a: &mut State, b: &State) {
        a.join(b);
    }

    fn widening(&self, block: usize, a: &mut State, b: &State) {
        a.widening(b, self.flow_facts.loop_bound(block));
    }

    fn equals(&self, a: &State, b: &State) -> bool {
        a.equals(b)
    }

    /// Narrows `state` with the filters of `edge`, register filters first.
    fn update_edge(&mut self, edge: &Edge, state: &mut State) -> Result<(), Error> {
        if edge.branch() == Branch::Both || !edge.has_filters() || state.is_bottom() {
            return Ok(());
        }
        trace!("edge {}", edge);
        self.apply_filters(edge.register_filters(), state, true)?;
        self.apply_filters(edge.address_filters(), state, false)
    }

    fn update(&mut self, out: &mut State, input: &State, block: &Block) -> Result<(), Error> {
        self.update_block(out, input, block, None)
    }
}
