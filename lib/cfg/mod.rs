//! Control flow graph of the analyzed function.
//!
//! Blocks hold machine instructions, each already translated into its
//! semantic micro-instructions. Edges leaving a conditional branch carry the
//! filters known to hold when they are followed.

use crate::clp::Filter;
use crate::graph::{self, Loop};
use crate::sem::Inst;
use crate::Error;
use serde::Serialize;
use std::fmt;

/// A machine instruction and its semantics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Instruction {
    address: u32,
    semantics: Vec<Inst>,
}

impl Instruction {
    pub fn new(address: u32, semantics: Vec<Inst>) -> Instruction {
        Instruction { address, semantics }
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn semantics(&self) -> &[Inst] {
        &self.semantics
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let semantics: Vec<String> = self.semantics.iter().map(|i| i.to_string()).collect();
        write!(f, "{:08X}: {}", self.address, semantics.join("; "))
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum BlockKind {
    Entry,
    Exit,
    Basic,
    /// A synthetic block standing for a call. The callee is `None` when it
    /// could not be resolved.
    Call { callee: Option<String> },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Block {
    index: usize,
    kind: BlockKind,
    instructions: Vec<Instruction>,
}

impl Block {
    fn new(index: usize, kind: BlockKind) -> Block {
        Block {
            index,
            kind,
            instructions: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    pub fn is_exit(&self) -> bool {
        self.kind == BlockKind::Exit
    }

    /// True for a call whose target is unknown.
    pub fn is_unknown_call(&self) -> bool {
        self.kind == BlockKind::Call { callee: None }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn instruction(&self, address: u32) -> Option<&Instruction> {
        self.instructions.iter().find(|i| i.address() == address)
    }

    pub fn push(&mut self, address: u32, semantics: Vec<Inst>) {
        self.instructions.push(Instruction::new(address, semantics));
    }
}

impl graph::Vertex for Block {
    fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "[ Block: 0x{:X} ]", self.index)?;
        for instruction in &self.instructions {
            writeln!(f, "{}", instruction)?;
        }
        Ok(())
    }
}

/// Which outcome of the branch ending the head block an edge follows.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum Branch {
    Taken,
    NotTaken,
    /// Followed whatever the outcome, never filtered.
    Both,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Edge {
    head: usize,
    tail: usize,
    branch: Branch,
    register_filters: Vec<Filter>,
    address_filters: Vec<Filter>,
}

impl Edge {
    fn new(head: usize, tail: usize, branch: Branch) -> Edge {
        Edge {
            head,
            tail,
            branch,
            register_filters: Vec::new(),
            address_filters: Vec::new(),
        }
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn tail(&self) -> usize {
        self.tail
    }

    pub fn branch(&self) -> Branch {
        self.branch
    }

    /// Filters on registers, in disjunctive normal form.
    pub fn register_filters(&self) -> &[Filter] {
        &self.register_filters
    }

    /// Filters on memory cells, in disjunctive normal form.
    pub fn address_filters(&self) -> &[Filter] {
        &self.address_filters
    }

    pub fn has_filters(&self) -> bool {
        !self.register_filters.is_empty() || !self.address_filters.is_empty()
    }

    pub fn set_register_filters(&mut self, filters: Vec<Filter>) -> &mut Edge {
        self.register_filters = filters;
        self
    }

    pub fn set_address_filters(&mut self, filters: Vec<Filter>) -> &mut Edge {
        self.address_filters = filters;
        self
    }
}

impl graph::Edge for Edge {
    fn head(&self) -> usize {
        self.head
    }

    fn tail(&self) -> usize {
        self.tail
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(0x{:X}->0x{:X}) {:?}", self.head, self.tail, self.branch)?;
        for filter in self.register_filters.iter().chain(self.address_filters.iter()) {
            write!(f, " [{}]", filter)?;
        }
        Ok(())
    }
}

/// A directed graph of types `Block` and `Edge`.
#[derive(Clone, Debug)]
pub struct ControlFlowGraph {
    graph: graph::Graph<Block, Edge>,
    entry: Option<usize>,
    next_index: usize,
}

impl Default for ControlFlowGraph {
    fn default() -> ControlFlowGraph {
        ControlFlowGraph::new()
    }
}

impl ControlFlowGraph {
    pub fn new() -> ControlFlowGraph {
        ControlFlowGraph {
            graph: graph::Graph::new(),
            entry: None,
            next_index: 0,
        }
    }

    /// Returns the underlying graph
    pub fn graph(&self) -> &graph::Graph<Block, Edge> {
        &self.graph
    }

    /// Sets the entry point for this `ControlFlowGraph` to the given `Block` index.
    pub fn set_entry(&mut self, entry: usize) -> Result<(), Error> {
        if !self.graph.has_vertex(entry) {
            return Err(Error::GraphVertexNotFound(entry));
        }
        self.entry = Some(entry);
        Ok(())
    }

    pub fn entry(&self) -> Option<usize> {
        self.entry
    }

    fn insert_block(&mut self, kind: BlockKind) -> Result<&mut Block, Error> {
        let index = self.next_index;
        self.next_index += 1;
        self.graph.insert_vertex(Block::new(index, kind))?;
        self.graph.vertex_mut(index)
    }

    /// Creates a new basic block, adds it to the graph, and returns it
    pub fn new_block(&mut self) -> Result<&mut Block, Error> {
        self.insert_block(BlockKind::Basic)
    }

    pub fn new_entry_block(&mut self) -> Result<&mut Block, Error> {
        self.insert_block(BlockKind::Entry)
    }

    pub fn new_exit_block(&mut self) -> Result<&mut Block, Error> {
        self.insert_block(BlockKind::Exit)
    }

    pub fn new_call_block(&mut self, callee: Option<String>) -> Result<&mut Block, Error> {
        self.insert_block(BlockKind::Call { callee })
    }

    pub fn block(&self, index: usize) -> Result<&Block, Error> {
        self.graph.vertex(index)
    }

    pub fn block_mut(&mut self, index: usize) -> Result<&mut Block, Error> {
        self.graph.vertex_mut(index)
    }

    pub fn blocks(&self) -> Vec<&Block> {
        self.graph.vertices()
    }

    pub fn edge(&self, head: usize, tail: usize) -> Result<&Edge, Error> {
        self.graph.edge(head, tail)
    }

    pub fn edge_mut(&mut self, head: usize, tail: usize) -> Result<&mut Edge, Error> {
        self.graph.edge_mut(head, tail)
    }

    pub fn edges(&self) -> Vec<&Edge> {
        self.graph.edges()
    }

    /// Get every incoming edge to a block
    pub fn edges_in(&self, index: usize) -> Result<Vec<&Edge>, Error> {
        self.graph.edges_in(index)
    }

    /// Get every outgoing edge from a block
    pub fn edges_out(&self, index: usize) -> Result<Vec<&Edge>, Error> {
        self.graph.edges_out(index)
    }

    pub fn predecessor_indices(&self, index: usize) -> Result<Vec<usize>, Error> {
        self.graph.predecessor_indices(index)
    }

    pub fn successor_indices(&self, index: usize) -> Result<Vec<usize>, Error> {
        self.graph.successor_indices(index)
    }

    /// Creates an unconditional edge from one block to another block
    pub fn unconditional_edge(&mut self, head: usize, tail: usize) -> Result<&mut Edge, Error> {
        self.conditional_edge(head, tail, Branch::Both)
    }

    /// Creates an edge followed on one outcome of the branch ending `head`.
    pub fn conditional_edge(
        &mut self,
        head: usize,
        tail: usize,
        branch: Branch,
    ) -> Result<&mut Edge, Error> {
        self.graph.insert_edge(Edge::new(head, tail, branch))?;
        self.graph.edge_mut(head, tail)
    }

    /// Natural loops, from the entry block.
    pub fn loops(&self) -> Result<Vec<Loop>, Error> {
        let entry = self.entry.ok_or(Error::NoEntry)?;
        self.graph.compute_loops(entry)
    }
}

impl fmt::Display for ControlFlowGraph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for block in self.blocks() {
            writeln!(f, "{}", block)?;
        }
        for edge in self.edges() {
            writeln!(f, "edge {}", edge)?;
        }
        Ok(())
    }
}
