//! Single-step emulator core for a subset of the Armv8-A A64 instruction set.

/// Guest memory model and region map.
pub mod memory;
pub use memory::{AddressSpace, MappedRegion, INSTRUCTION_BYTES};

/// Architectural CPU state model primitives.
pub mod state;
pub use state::{
    Nzcv, RegisterFile, RegisterId, GENERAL_REGISTER_COUNT, REG_31, VECTOR_REGISTER_COUNT,
};

/// Field-level encoding helpers shared with the assembler.
pub mod encoding;
pub use encoding::{
    bit, bits, decode_bit_masks, encode_bit_masks, expand_fp_imm_double, expand_fp_imm_single,
    fp_imm8_for, ones, sign_extend, Condition, Extend, ShiftType,
};

/// Instruction decode with field extraction and validation.
pub mod decoder;
pub use decoder::{DecodedInstruction, DecodedOrFault, Decoder};

/// Fault taxonomy and host-facing errors.
pub mod fault;
pub use fault::{FaultClass, FaultCode, MachineError};

/// Instruction execution pipeline.
pub mod execute;
pub use execute::{commit_execution, execute_instruction, ExecuteState, FlagsUpdate};

/// Host-facing machine API.
pub mod api;
pub use api::{Machine, StepOutcome};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
