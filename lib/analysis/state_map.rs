use serde::Serialize;
use std::collections::BTreeMap;

/// Input and output states of the blocks of a control flow graph, for one
/// analysis run.
///
/// A block missing from the map was never reached.
#[derive(Clone, Debug, Serialize)]
pub struct StateMap<S> {
    inputs: BTreeMap<usize, S>,
    outputs: BTreeMap<usize, S>,
}

impl<S> Default for StateMap<S> {
    fn default() -> StateMap<S> {
        StateMap::new()
    }
}

impl<S> StateMap<S> {
    pub fn new() -> StateMap<S> {
        StateMap {
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// State on entry of `block`.
    pub fn input(&self, block: usize) -> Option<&S> {
        self.inputs.get(&block)
    }

    /// State on exit of `block`, before edge filters.
    pub fn output(&self, block: usize) -> Option<&S> {
        self.outputs.get(&block)
    }

    pub fn set_input(&mut self, block: usize, state: S) {
        self.inputs.insert(block, state);
    }

    pub fn set_output(&mut self, block: usize, state: S) {
        self.outputs.insert(block, state);
    }

    /// Indices of the blocks with a recorded input state.
    pub fn blocks(&self) -> impl Iterator<Item = usize> + '_ {
        self.inputs.keys().copied()
    }

    /// Forgets the states of `block`, after it changed.
    pub fn invalidate_block(&mut self, block: usize) {
        self.inputs.remove(&block);
        self.outputs.remove(&block);
    }

    /// Forgets every state, after the control flow graph changed.
    pub fn invalidate(&mut self) {
        self.inputs.clear();
        self.outputs.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}
