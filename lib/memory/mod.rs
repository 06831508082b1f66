//! The initial memory image of the analyzed program.
//!
//! The value analysis never writes to this image. It is read when a load
//! cannot be resolved from the abstract state and every address it may read
//! lies in read-only initialized memory.

pub mod backing;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// RWX permissions for memory.
    #[derive(Deserialize, Serialize)]
    pub struct MemoryPermissions: u32 {
        const NONE    = 0b000;
        const READ    = 0b001;
        const WRITE   = 0b010;
        const EXECUTE = 0b100;
        const ALL     = 0b111;
    }
}
