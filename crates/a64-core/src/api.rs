//! Host-facing machine API.
//!
//! [`Machine`] owns the register file and the address space and exposes the
//! operations a front-end needs: map memory, read and write registers and
//! memory by name and address, and execute exactly one instruction.

use tracing::trace;

use crate::decoder::Decoder;
use crate::execute::{commit_execution, execute_instruction};
use crate::fault::{FaultCode, MachineError};
use crate::memory::{AddressSpace, INSTRUCTION_BYTES};
use crate::state::{RegisterFile, RegisterId};

/// Outcome of a successful single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StepOutcome {
    /// Address the instruction was fetched from.
    pub pc: u64,
    /// Raw instruction word.
    pub word: u32,
}

/// A single-core A64 machine with a sparse memory map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Machine {
    registers: RegisterFile,
    memory: AddressSpace,
}

impl Machine {
    /// Creates a machine with zeroed registers and no memory mapped.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `size` zeroed bytes at `base`.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::InvalidRegion`] or [`MachineError::MapOverlap`].
    pub fn map_memory(&mut self, base: u64, size: u64) -> Result<(), MachineError> {
        self.memory.map(base, size)?;
        trace!(base = format_args!("{base:#x}"), size, "mapped memory");
        Ok(())
    }

    /// Reads a register through a named view.
    #[must_use]
    pub fn read_register(&self, id: RegisterId) -> u128 {
        self.registers.read(id)
    }

    /// Writes a register through a named view, truncating to its width.
    pub fn write_register(&mut self, id: RegisterId, value: u128) {
        self.registers.write(id, value);
    }

    /// Reads `len` bytes of memory.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::Unmapped`] when any byte is outside a mapping.
    pub fn read_memory(&self, address: u64, len: usize) -> Result<Vec<u8>, MachineError> {
        self.memory.read(address, len)
    }

    /// Writes `bytes` to memory. A faulting write changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::Unmapped`] when any byte is outside a mapping.
    pub fn write_memory(&mut self, address: u64, bytes: &[u8]) -> Result<(), MachineError> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.memory.write(address, bytes)
    }

    /// Sets `PC` to `address` and executes exactly one instruction from it.
    ///
    /// On success `PC` is `address + 4`. On a fault `PC` stays at `address`;
    /// stores committed before a faulting store are kept.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::Fault`] carrying the faulting PC and code.
    pub fn step_at(&mut self, address: u64) -> Result<StepOutcome, MachineError> {
        self.registers.set_pc(address);
        self.step().map_err(|code| {
            trace!(pc = format_args!("{address:#x}"), %code, "step faulted");
            MachineError::Fault { pc: address, code }
        })
    }

    fn step(&mut self) -> Result<StepOutcome, FaultCode> {
        let pc = self.registers.pc();
        let mut raw = [0u8; INSTRUCTION_BYTES as usize];
        self.memory
            .read_into(pc, &mut raw)
            .map_err(|_| FaultCode::UnmappedFetch)?;
        let word = u32::from_le_bytes(raw);

        let instr = Decoder::decode(word)?;
        trace!(pc = format_args!("{pc:#x}"), word = format_args!("{word:#010x}"), ?instr, "step");

        let exec = execute_instruction(&instr, &self.registers, &self.memory)?;
        commit_execution(&mut self.registers, &mut self.memory, &exec)?;
        Ok(StepOutcome { pc, word })
    }
}
