//! The loaded program: platform, initial memory image and symbols.

use crate::clp::Value;
use crate::memory::backing::Memory;
use crate::memory::MemoryPermissions;
use crate::platform::Platform;
use crate::sem::DataType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named object of the program image.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Symbol {
    name: String,
    address: u32,
    size: u32,
}

impl Symbol {
    pub fn new<S: Into<String>>(name: S, address: u32, size: u32) -> Symbol {
        Symbol {
            name: name.into(),
            address,
            size,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn contains(&self, address: u32) -> bool {
        self.address <= address && (address as u64) < self.address as u64 + self.size as u64
    }
}

/// The program as loaded in memory.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Process {
    platform: Platform,
    memory: Memory,
    symbols: BTreeMap<u32, Symbol>,
    default_stack: Option<u32>,
}

impl Process {
    pub fn new(platform: Platform, memory: Memory) -> Process {
        Process {
            platform,
            memory,
            symbols: BTreeMap::new(),
            default_stack: None,
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn add_symbol(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.address(), symbol);
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// The symbol whose extent covers `address`.
    pub fn find_symbol_at(&self, address: u32) -> Option<&Symbol> {
        self.symbols
            .range(..=address)
            .next_back()
            .map(|(_, symbol)| symbol)
            .filter(|symbol| symbol.contains(address))
    }

    /// Stack address chosen by the loader.
    pub fn default_stack(&self) -> Option<u32> {
        self.default_stack
    }

    pub fn set_default_stack(&mut self, default_stack: Option<u32>) {
        self.default_stack = default_stack;
    }

    /// True when `address` lies in initialized memory the program cannot
    /// write.
    pub fn is_read_only(&self, address: u32) -> bool {
        self.memory
            .permissions(address)
            .map(|permissions| {
                permissions.contains(MemoryPermissions::READ)
                    && !permissions.contains(MemoryPermissions::WRITE)
            })
            .unwrap_or(false)
    }

    /// Top address of the highest writable section, a natural place for the
    /// initial stack pointer.
    pub fn writable_top(&self) -> Option<u32> {
        self.memory
            .sections()
            .iter()
            .filter(|(_, section)| section.permissions().contains(MemoryPermissions::WRITE))
            .map(|(address, section)| {
                std::cmp::min(*address as u64 + section.len() as u64, u32::MAX as u64) as u32
            })
            .max()
    }

    /// Reads a word of the initial image, extended to 32 bits according to
    /// its type.
    pub fn read(&self, address: u32, data_type: DataType) -> Option<i32> {
        let memory = &self.memory;
        match data_type {
            DataType::Int8 => memory.get8(address).map(|v| v as i8 as i32),
            DataType::Uint8 => memory.get8(address).map(|v| v as i32),
            DataType::Int16 => memory.get16(address).map(|v| v as i16 as i32),
            DataType::Uint16 => memory.get16(address).map(|v| v as i32),
            DataType::Int32 | DataType::Uint32 => memory.get32(address).map(|v| v as i32),
            DataType::Other => None,
        }
    }
}

/// Register and memory values known when the analyzed function is entered.
#[derive(Clone, Debug, Default)]
pub struct InitialState {
    registers: Vec<(usize, Value)>,
    memory: Vec<(u32, Value)>,
}

impl InitialState {
    pub fn new() -> InitialState {
        InitialState::default()
    }

    pub fn set_register(&mut self, index: usize, value: Value) {
        self.registers.push((index, value));
    }

    pub fn set_memory(&mut self, address: u32, value: Value) {
        self.memory.push((address, value));
    }

    pub fn registers(&self) -> &[(usize, Value)] {
        &self.registers
    }

    pub fn memory(&self) -> &[(u32, Value)] {
        &self.memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Endian;

    fn process() -> Process {
        let mut memory = Memory::new(Endian::Little);
        memory
            .set_memory(0x1000, vec![0xff, 0x80, 0x01, 0x00], MemoryPermissions::READ)
            .unwrap();
        memory
            .set_memory(
                0x8000,
                vec![0; 0x100],
                MemoryPermissions::READ | MemoryPermissions::WRITE,
            )
            .unwrap();
        let mut process = Process::new(Platform::arm(), memory);
        process.add_symbol(Symbol::new("table", 0x8000, 0x40));
        process
    }

    #[test]
    fn read_extends() {
        let process = process();
        assert_eq!(process.read(0x1000, DataType::Int8), Some(-1));
        assert_eq!(process.read(0x1000, DataType::Uint8), Some(0xff));
        assert_eq!(process.read(0x1000, DataType::Int16), Some(-32513));
        assert_eq!(process.read(0x1000, DataType::Uint16), Some(0x80ff));
        assert_eq!(process.read(0x1000, DataType::Int32), Some(0x0001_80ff));
        assert_eq!(process.read(0x1000, DataType::Other), None);
        assert_eq!(process.read(0x2000, DataType::Int32), None);
    }

    #[test]
    fn regions() {
        let process = process();
        assert!(process.is_read_only(0x1002));
        assert!(!process.is_read_only(0x8010));
        assert!(!process.is_read_only(0x3000));
        assert_eq!(process.writable_top(), Some(0x8100));
        assert_eq!(process.find_symbol_at(0x8020).map(Symbol::name), Some("table"));
        assert!(process.find_symbol_at(0x8040).is_none());
        assert!(process.find_symbol_at(0x10).is_none());
    }
}
