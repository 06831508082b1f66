//! Facts about the program supplied from outside the analysis.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Address interval `[low, high]` a memory instruction may touch.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct AccessRange {
    pub low: u32,
    pub high: u32,
}

impl AccessRange {
    pub fn new(low: u32, high: u32) -> AccessRange {
        AccessRange { low, high }
    }
}

/// Loop bounds, keyed by loop header block, and access ranges, keyed by
/// instruction address.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct FlowFacts {
    loop_bounds: BTreeMap<usize, u32>,
    access_ranges: BTreeMap<u32, AccessRange>,
}

impl FlowFacts {
    pub fn new() -> FlowFacts {
        FlowFacts::default()
    }

    /// Parses flow facts such as
    /// `{"loop_bounds": {"1": 10}, "access_ranges": {"4096": {"low": 0, "high": 64}}}`.
    pub fn from_json(json: &str) -> Result<FlowFacts, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Maximum number of iterations of the loop headed by `header`.
    pub fn loop_bound(&self, header: usize) -> Option<u32> {
        self.loop_bounds.get(&header).copied()
    }

    pub fn set_loop_bound(&mut self, header: usize, bound: u32) {
        self.loop_bounds.insert(header, bound);
    }

    pub fn access_range(&self, address: u32) -> Option<AccessRange> {
        self.access_ranges.get(&address).copied()
    }

    pub fn set_access_range(&mut self, address: u32, range: AccessRange) {
        self.access_ranges.insert(address, range);
    }
}
