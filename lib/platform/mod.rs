//! Description of the target processor, as far as the value analysis needs
//! it.

use crate::Error;
use serde::{Deserialize, Serialize};

/// The underlying endianness of memory.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Endian {
    Big,
    Little,
}

/// Register file and memory layout of a processor.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Platform {
    name: String,
    register_count: usize,
    stack_pointer: Option<usize>,
    endian: Endian,
}

impl Platform {
    pub fn new<S: Into<String>>(name: S, register_count: usize, endian: Endian) -> Platform {
        Platform {
            name: name.into(),
            register_count,
            stack_pointer: None,
            endian,
        }
    }

    /// 32-bit ARM: r0-r15, the stack pointer is r13.
    pub fn arm() -> Platform {
        Platform::new("arm", 16, Endian::Little).with_stack_pointer(13)
    }

    pub fn with_stack_pointer(mut self, stack_pointer: usize) -> Platform {
        self.stack_pointer = Some(stack_pointer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of platform registers. Temporaries are not counted.
    pub fn register_count(&self) -> usize {
        self.register_count
    }

    /// Index of the stack pointer register, if the platform has one.
    pub fn stack_pointer(&self) -> Option<usize> {
        self.stack_pointer
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Ensures `index` designates a platform register or a temporary.
    pub fn check_register(&self, index: i32) -> Result<(), Error> {
        if index >= 0 && index as usize >= self.register_count {
            Err(Error::RegisterOutOfRange(index))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_range() {
        let platform = Platform::arm();
        assert!(platform.check_register(0).is_ok());
        assert!(platform.check_register(15).is_ok());
        assert!(platform.check_register(-3).is_ok());
        assert!(matches!(
            platform.check_register(16),
            Err(Error::RegisterOutOfRange(16))
        ));
        assert_eq!(platform.stack_pointer(), Some(13));
    }
}
