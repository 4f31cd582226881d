//! Guest memory model.

/// Region map and address lookup.
pub mod map;

pub use map::{AddressSpace, MappedRegion};

/// Size of one A64 instruction in bytes.
pub const INSTRUCTION_BYTES: u64 = 4;
