//! Assemble, load, execute one instruction, then diff.

use a64_core::MachineError;
use tracing::debug;

use crate::backend::{Assembler, Emulator};
use crate::config::ShellConfig;
use crate::errors::ShellError;
use crate::registers::register_table;
use crate::snapshot::{Diff, Snapshot};

/// Result of a command that touched machine state.
///
/// A fault does not undo effects committed before it, so the diff is
/// reported either way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// Fault raised while applying the command, printed before the diff.
    pub fault: Option<MachineError>,
    /// Observable changes.
    pub diff: Diff,
}

/// Runs one line of assembly from the instruction slot.
///
/// # Errors
///
/// Returns [`ShellError::Syntax`] when the line does not assemble, in which
/// case nothing was changed. Execution faults are carried in the [`Report`].
pub fn execute_line<E: Emulator, A: Assembler>(
    emulator: &mut E,
    assembler: &A,
    config: &ShellConfig,
    line: &str,
) -> Result<Report, ShellError> {
    let table = register_table();
    let slot = config.base();
    let before = Snapshot::capture(emulator, table, config)?;

    let bytes = assembler.assemble(line, slot)?;
    debug!(line, bytes = ?bytes, "assembled");
    emulator.write_memory(slot, &bytes)?;

    let fault = emulator.execute_one(slot).err();
    if let Some(fault) = &fault {
        debug!(%fault, "execution fault");
    }

    let after = Snapshot::capture(emulator, table, config)?;
    let diff = Diff {
        registers: before.register_changes(&after),
        memory: before.memory_changes(&after, slot),
    };
    debug!(
        registers = diff.registers.len(),
        words = diff.memory.len(),
        "diff"
    );
    Ok(Report { fault, diff })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LineAssembler;
    use a64_asm::AsmError;
    use a64_core::{FaultCode, Machine, RegisterId};

    fn machine(config: &ShellConfig) -> Machine {
        let mut machine = Machine::new();
        machine
            .map_memory(config.base(), config.backing_size())
            .expect("map");
        machine.write_register(RegisterId::Pc, u128::from(config.initial_pc()));
        machine
    }

    #[test]
    fn data_processing_reports_only_its_destination() {
        let config = ShellConfig::default();
        let mut machine = machine(&config);
        let report = execute_line(&mut machine, &LineAssembler, &config, "movz w5, #0x2a")
            .expect("runs");
        assert_eq!(report.fault, None);
        let lines: Vec<String> = report.diff.registers.iter().map(ToString::to_string).collect();
        assert_eq!(lines, ["X5: 0x000000000000002a", "W5: 0x0000002a"]);
        assert!(report.diff.memory.is_empty());
    }

    #[test]
    fn store_into_the_window_is_reported() {
        let config = ShellConfig::default();
        let mut machine = machine(&config);
        machine.write_register(RegisterId::X(1), 0x1020);
        machine.write_register(RegisterId::X(2), 0x1122_3344);
        let report =
            execute_line(&mut machine, &LineAssembler, &config, "str w2, [x1]").expect("runs");
        assert!(report.diff.registers.is_empty());
        assert_eq!(report.diff.memory.len(), 1);
        assert_eq!(report.diff.memory[0].to_string(), "0x1020 44332211");
    }

    #[test]
    fn syntax_error_leaves_state_untouched() {
        let config = ShellConfig::default();
        let mut machine = machine(&config);
        let before = machine.clone();
        let err = execute_line(&mut machine, &LineAssembler, &config, "add x0, x1")
            .expect_err("bad operands");
        assert!(matches!(err, ShellError::Syntax(AsmError::InvalidOperands { .. })));
        assert_eq!(machine, before);
    }

    #[test]
    fn fault_is_reported_alongside_the_diff() {
        let config = ShellConfig::default();
        let mut machine = machine(&config);
        let report = execute_line(&mut machine, &LineAssembler, &config, "brk #1").expect("runs");
        assert_eq!(
            report.fault,
            Some(MachineError::Fault {
                pc: 0x1000,
                code: FaultCode::ExceptionGenerated
            })
        );
        let lines: Vec<String> = report.diff.registers.iter().map(ToString::to_string).collect();
        assert_eq!(lines, ["PC: 0x00001000"]);
    }
}
