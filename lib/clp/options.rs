use crate::Error;
use serde::{Deserialize, Serialize};
use std::default;

/// Number of addresses under which a memory access is enumerated.
pub const DEFAULT_MEMORY_ACCESS_THRESHOLD: u32 = 1024;

/// Various options that can be passed to the value analysis.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Options {
    memory_access_threshold: u32,
    unknown_callee_bottom: bool,
    initial_registers: Vec<(usize, u32)>,
    verbose: bool,
}

impl default::Default for Options {
    fn default() -> Options {
        Options {
            memory_access_threshold: DEFAULT_MEMORY_ACCESS_THRESHOLD,
            unknown_callee_bottom: false,
            initial_registers: Vec::new(),
            verbose: false,
        }
    }
}

impl Options {
    /// Create a new set of Options with the default settings.
    pub fn new() -> Options {
        Options::default()
    }

    /// Reads options from JSON, absent fields taking their default value.
    pub fn from_json(json: &str) -> Result<Options, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads and stores whose address denotes at least this many words are
    /// not enumerated: loads give T, stores forget the covered range.
    pub fn memory_access_threshold(&self) -> u32 {
        self.memory_access_threshold
    }

    pub fn set_memory_access_threshold(&mut self, memory_access_threshold: u32) {
        self.memory_access_threshold = memory_access_threshold;
    }

    /// Whether a call to an unresolved callee produces the bottom state, the
    /// path being considered infeasible, instead of the top state.
    pub fn unknown_callee_bottom(&self) -> bool {
        self.unknown_callee_bottom
    }

    pub fn set_unknown_callee_bottom(&mut self, unknown_callee_bottom: bool) {
        self.unknown_callee_bottom = unknown_callee_bottom;
    }

    /// Registers holding a known address on function entry.
    pub fn initial_registers(&self) -> &[(usize, u32)] {
        &self.initial_registers
    }

    pub fn add_initial_register(&mut self, register: usize, address: u32) {
        self.initial_registers.push((register, address));
    }

    /// Log stores and loads that lose all precision.
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }
}

/// Create your options with the builder pattern.
///
/// For more details on the options, see `clp::Options`
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    pub fn new() -> OptionsBuilder {
        OptionsBuilder {
            options: Options::default(),
        }
    }

    pub fn memory_access_threshold(mut self, memory_access_threshold: u32) -> OptionsBuilder {
        self.options.memory_access_threshold = memory_access_threshold;
        self
    }

    pub fn unknown_callee_bottom(mut self, unknown_callee_bottom: bool) -> OptionsBuilder {
        self.options.unknown_callee_bottom = unknown_callee_bottom;
        self
    }

    pub fn initial_register(mut self, register: usize, address: u32) -> OptionsBuilder {
        self.options.add_initial_register(register, address);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> OptionsBuilder {
        self.options.verbose = verbose;
        self
    }

    pub fn build(self) -> Options {
        self.options
    }
}

impl default::Default for OptionsBuilder {
    fn default() -> OptionsBuilder {
        OptionsBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let options = OptionsBuilder::new()
            .memory_access_threshold(16)
            .initial_register(13, 0x8000)
            .build();
        assert_eq!(options.memory_access_threshold(), 16);
        assert_eq!(options.initial_registers(), &[(13, 0x8000)]);
        assert!(!options.unknown_callee_bottom());
        assert!(!options.verbose());
    }

    #[test]
    fn json() {
        let options = Options::from_json(r#"{"unknown_callee_bottom": true}"#).unwrap();
        assert!(options.unknown_callee_bottom());
        assert_eq!(
            options.memory_access_threshold(),
            DEFAULT_MEMORY_ACCESS_THRESHOLD
        );

        let options =
            Options::from_json(r#"{"initial_registers": [[13, 4096]], "verbose": true}"#).unwrap();
        assert_eq!(options.initial_registers(), &[(13, 4096)]);
        assert!(options.verbose());
        assert!(Options::from_json(r#"{"verbose": 3}"#).is_err());
    }
}
