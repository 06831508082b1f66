//! A flat representation of the program image, split into permissioned
//! sections.

use crate::memory::MemoryPermissions;
use crate::platform::Endian;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A section of backed memory. Essentially a vector of type `u8` with
/// permissions.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Section {
    data: Vec<u8>,
    permissions: MemoryPermissions,
}

impl Section {
    /// Create a new memory section.
    pub fn new(data: Vec<u8>, permissions: MemoryPermissions) -> Section {
        Section { data, permissions }
    }

    /// Get this memory section's data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the length of this memory section.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the permissions of this memory section.
    pub fn permissions(&self) -> MemoryPermissions {
        self.permissions
    }

    fn end(&self, address: u32) -> u64 {
        address as u64 + self.data.len() as u64
    }
}

/// A simple memory model, containing permissioned sections of type `u8`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Memory {
    endian: Endian,
    sections: BTreeMap<u32, Section>,
}

impl Memory {
    /// Create a new backed memory module with the given endianness.
    pub fn new(endian: Endian) -> Memory {
        Memory {
            endian,
            sections: BTreeMap::new(),
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Get the sections in this memory module.
    pub fn sections(&self) -> &BTreeMap<u32, Section> {
        &self.sections
    }

    /// Get the permissions at the given address.
    pub fn permissions(&self, address: u32) -> Option<MemoryPermissions> {
        self.section_address(address)
            .map(|section_address| self.sections[&section_address].permissions())
    }

    /// Get the `u8` value at the given address.
    pub fn get8(&self, address: u32) -> Option<u8> {
        self.section_address_offset(address)
            .map(|(section_address, offset)| self.sections[&section_address].data[offset])
    }

    /// Reads `size` bytes, all within the same section, and assembles them
    /// according to the endianness.
    fn get(&self, address: u32, size: usize) -> Option<u32> {
        let (section_address, offset) = self.section_address_offset(address)?;
        let bytes = self.sections[&section_address]
            .data
            .get(offset..offset + size)?;
        let value = match self.endian {
            Endian::Big => bytes
                .iter()
                .fold(0u32, |value, byte| (value << 8) | *byte as u32),
            Endian::Little => bytes
                .iter()
                .rev()
                .fold(0u32, |value, byte| (value << 8) | *byte as u32),
        };
        Some(value)
    }

    /// Get the 16-bit value at the given address, allowing the memory model
    /// to account for the underlying endianness.
    pub fn get16(&self, address: u32) -> Option<u16> {
        self.get(address, 2).map(|value| value as u16)
    }

    /// Get the 32-bit value at the given address, allowing the memory model
    /// to account for the underlying endianness.
    pub fn get32(&self, address: u32) -> Option<u32> {
        self.get(address, 4)
    }

    /// Set the memory at the given address, and give that memory the given
    /// permissions.
    ///
    /// # Errors
    /// Sections may not overlap, nor run past the end of the address space.
    pub fn set_memory(
        &mut self,
        address: u32,
        data: Vec<u8>,
        permissions: MemoryPermissions,
    ) -> Result<(), Error> {
        let section = Section::new(data, permissions);
        let end = section.end(address);
        if end > 1 << 32 {
            return Err(format!("Section at 0x{:x} runs past the address space", address).into());
        }
        // sections are disjoint, so the last one starting before `end` is the
        // only candidate
        let mut before_end = if end > u32::MAX as u64 {
            self.sections.range(..)
        } else {
            self.sections.range(..end as u32)
        };
        let overlap = before_end
            .next_back()
            .filter(|(other_address, other)| other.end(**other_address) > address as u64);
        if let Some((other_address, _)) = overlap {
            return Err(format!(
                "Section at 0x{:x} overlaps section at 0x{:x}",
                address, other_address
            )
            .into());
        }
        self.sections.insert(address, section);
        Ok(())
    }

    fn section_address(&self, address: u32) -> Option<u32> {
        let (section_address, section) = self.sections.range(..=address).next_back()?;
        if section.end(*section_address) > address as u64 {
            Some(*section_address)
        } else {
            None
        }
    }

    fn section_address_offset(&self, address: u32) -> Option<(u32, usize)> {
        self.section_address(address)
            .map(|section_address| (section_address, (address - section_address) as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endianness() {
        let mut memory = Memory::new(Endian::Little);
        memory
            .set_memory(0x100, vec![0x78, 0x56, 0x34, 0x12], MemoryPermissions::READ)
            .unwrap();
        assert_eq!(memory.get32(0x100), Some(0x1234_5678));
        assert_eq!(memory.get16(0x102), Some(0x1234));
        assert_eq!(memory.get8(0x103), Some(0x12));
        assert_eq!(memory.get32(0x101), None);
        assert_eq!(memory.get8(0x104), None);

        let mut memory = Memory::new(Endian::Big);
        memory
            .set_memory(0x100, vec![0x12, 0x34, 0x56, 0x78], MemoryPermissions::READ)
            .unwrap();
        assert_eq!(memory.get32(0x100), Some(0x1234_5678));
        assert_eq!(memory.get16(0x100), Some(0x1234));
    }

    #[test]
    fn permissions_and_overlap() {
        let mut memory = Memory::new(Endian::Little);
        memory
            .set_memory(0x100, vec![0; 0x10], MemoryPermissions::READ)
            .unwrap();
        memory
            .set_memory(0x200, vec![0; 0x10], MemoryPermissions::READ | MemoryPermissions::WRITE)
            .unwrap();
        assert!(memory
            .set_memory(0x108, vec![0; 0x10], MemoryPermissions::READ)
            .is_err());
        assert!(memory
            .set_memory(0xf8, vec![0; 0x10], MemoryPermissions::READ)
            .is_err());
        assert!(memory
            .set_memory(0x110, vec![0; 0x10], MemoryPermissions::READ)
            .is_ok());

        assert_eq!(memory.permissions(0x10f), Some(MemoryPermissions::READ));
        assert!(memory
            .permissions(0x204)
            .unwrap()
            .contains(MemoryPermissions::WRITE));
        assert_eq!(memory.permissions(0x300), None);
        assert_eq!(memory.sections().len(), 3);
    }
}
