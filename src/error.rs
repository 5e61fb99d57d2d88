//! Crate-wide error types.
//!
//! Configuration errors (raised while wiring up a [`crate::bus::SystemBus`])
//! are fatal at setup time. Runtime faults (bad decode, bad memory access)
//! are surfaced to the [`crate::hart::Hart`] loop, which records them and
//! transitions to `Faulted` rather than unwinding.

use thiserror::Error;

/// Errors raised by [`crate::bus::SystemBus::attach`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("port at base 0x{base:08x} size {size} overlaps an existing port")]
    Overlap { base: u32, size: u32 },
    #[error("port size must be nonzero (base 0x{base:08x})")]
    BadPortSize { base: u32 },
}

/// Errors raised by a single [`crate::bus::SystemBus`] access.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    #[error("address 0x{addr:08x} (width {width}) is not mapped by any port")]
    UnmappedAccess { addr: u32, width: u32 },
    #[error("address 0x{addr:08x} is misaligned for a {width}-byte access")]
    MisalignedAccess { addr: u32, width: u32 },
}

/// Errors raised by [`crate::decode::decode`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("illegal instruction 0x{word:08x} at pc 0x{pc:08x}: unknown opcode 0b{opcode:07b}")]
    IllegalOpcode { word: u32, pc: u32, opcode: u32 },
    #[error("illegal instruction 0x{word:08x} at pc 0x{pc:08x}: bad shift-immediate encoding")]
    IllegalShift { word: u32, pc: u32 },
    #[error("illegal instruction 0x{word:08x} at pc 0x{pc:08x}: bad funct7 for R-type")]
    IllegalFunct7 { word: u32, pc: u32 },
}

impl DecodeError {
    /// The raw instruction word that failed to decode.
    pub fn word(&self) -> u32 {
        match *self {
            DecodeError::IllegalOpcode { word, .. } => word,
            DecodeError::IllegalShift { word, .. } => word,
            DecodeError::IllegalFunct7 { word, .. } => word,
        }
    }
}

/// All faults a hart can encounter while stepping, unified into one type so
/// [`crate::hart::Hart::step`] has a single `Result` error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HartFault {
    #[error("illegal instruction: {0}")]
    IllegalInstruction(#[from] DecodeError),
    #[error("{0}")]
    Bus(#[from] BusError),
    #[error("misaligned fetch target 0x{target:08x} from pc 0x{pc:08x}")]
    MisalignedFetch { pc: u32, target: u32 },
}
