//! Collaborator seams: the emulator that runs instructions and the assembler
//! that produces them. The shell core only talks to these traits, so it can
//! run against stubs as well as the real crates.

use a64_asm::AsmError;
use a64_core::{Machine, MachineError, RegisterId};
use tracing::trace;

/// A machine that can hold state and execute exactly one instruction.
pub trait Emulator {
    /// Maps `size` zeroed bytes at `base`.
    ///
    /// # Errors
    ///
    /// Returns a [`MachineError`] when the region is invalid or overlaps.
    fn map(&mut self, base: u64, size: u64) -> Result<(), MachineError>;

    /// Reads a register through its named view.
    fn read_register(&self, id: RegisterId) -> u128;

    /// Writes a register through its named view.
    ///
    /// # Errors
    ///
    /// Returns a [`MachineError`] when the register rejects the write.
    fn write_register(&mut self, id: RegisterId, value: u128) -> Result<(), MachineError>;

    /// Reads `len` bytes at `address`.
    ///
    /// # Errors
    ///
    /// Returns a [`MachineError`] when the range is not mapped.
    fn read_memory(&self, address: u64, len: usize) -> Result<Vec<u8>, MachineError>;

    /// Writes `bytes` at `address`.
    ///
    /// # Errors
    ///
    /// Returns a [`MachineError`] when the range is not mapped.
    fn write_memory(&mut self, address: u64, bytes: &[u8]) -> Result<(), MachineError>;

    /// Executes the single instruction stored at `address`.
    ///
    /// # Errors
    ///
    /// Returns a [`MachineError`] when fetch, decode or execution faults.
    fn execute_one(&mut self, address: u64) -> Result<(), MachineError>;
}

/// Turns one line of assembly into instruction bytes.
pub trait Assembler {
    /// Assembles `source` as if placed at `address`.
    ///
    /// # Errors
    ///
    /// Returns an [`AsmError`] for anything but exactly one valid instruction.
    fn assemble(&self, source: &str, address: u64) -> Result<Vec<u8>, AsmError>;
}

impl Emulator for Machine {
    fn map(&mut self, base: u64, size: u64) -> Result<(), MachineError> {
        self.map_memory(base, size)
    }

    fn read_register(&self, id: RegisterId) -> u128 {
        Self::read_register(self, id)
    }

    fn write_register(&mut self, id: RegisterId, value: u128) -> Result<(), MachineError> {
        Self::write_register(self, id, value);
        Ok(())
    }

    fn read_memory(&self, address: u64, len: usize) -> Result<Vec<u8>, MachineError> {
        Self::read_memory(self, address, len)
    }

    fn write_memory(&mut self, address: u64, bytes: &[u8]) -> Result<(), MachineError> {
        Self::write_memory(self, address, bytes)
    }

    fn execute_one(&mut self, address: u64) -> Result<(), MachineError> {
        let outcome = self.step_at(address)?;
        trace!(
            pc = format_args!("{:#x}", outcome.pc),
            word = format_args!("{:#010x}", outcome.word),
            "executed"
        );
        Ok(())
    }
}

/// [`Assembler`] backed by the `a64-asm` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineAssembler;

impl Assembler for LineAssembler {
    fn assemble(&self, source: &str, address: u64) -> Result<Vec<u8>, AsmError> {
        a64_asm::assemble_line(source, address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_adapter_executes_assembled_bytes() {
        let mut machine = Machine::new();
        Emulator::map(&mut machine, 0x1000, 0x100).expect("map");
        let bytes = LineAssembler.assemble("movz x2, #9", 0x1000).expect("assemble");
        Emulator::write_memory(&mut machine, 0x1000, &bytes).expect("load");
        machine.execute_one(0x1000).expect("execute");
        assert_eq!(Emulator::read_register(&machine, RegisterId::X(2)), 9);
        assert_eq!(Emulator::read_register(&machine, RegisterId::Pc), 0x1004);
    }

    #[test]
    fn register_writes_through_the_adapter_truncate() {
        let mut machine = Machine::new();
        Emulator::write_register(&mut machine, RegisterId::W(1), u128::MAX).expect("write");
        assert_eq!(Emulator::read_register(&machine, RegisterId::X(1)), 0xFFFF_FFFF);
    }

    #[test]
    fn faults_surface_from_the_adapter() {
        let mut machine = Machine::new();
        assert!(matches!(
            machine.execute_one(0x1000),
            Err(MachineError::Fault { pc: 0x1000, .. })
        ));
    }
}
