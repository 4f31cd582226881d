//! Before/after capture of machine state and the minimal change set between
//! two captures.

use std::fmt;

use a64_core::MachineError;

use crate::backend::Emulator;
use crate::config::ShellConfig;
use crate::registers::{display_digits, RegisterTable};

/// Words at the start of the window that diffs never report. Word 0 is the
/// instruction slot.
pub const RESERVED_WORDS: usize = 4;

/// Register values in table order plus a copy of the memory window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    registers: Vec<(&'static str, u128)>,
    memory: Vec<u8>,
}

impl Snapshot {
    /// Captures every register in `table` and the window bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`MachineError`] when the window cannot be read.
    pub fn capture<E: Emulator>(
        emulator: &E,
        table: &'static RegisterTable,
        config: &ShellConfig,
    ) -> Result<Self, MachineError> {
        let registers = table
            .entries()
            .iter()
            .map(|entry| (entry.name.as_str(), emulator.read_register(entry.id)))
            .collect();
        let memory = emulator.read_memory(config.base(), config.window())?;
        Ok(Self { registers, memory })
    }

    /// Registers whose value differs in `after`, in table order.
    #[must_use]
    pub fn register_changes(&self, after: &Self) -> Vec<RegisterChange> {
        self.registers
            .iter()
            .zip(&after.registers)
            .filter(|(before, now)| before.1 != now.1)
            .map(|(_, &(name, value))| RegisterChange { name, value })
            .collect()
    }

    /// Window words that differ in `after`, skipping the reserved words.
    #[must_use]
    pub fn memory_changes(&self, after: &Self, base: u64) -> Vec<WordChange> {
        self.memory
            .chunks_exact(4)
            .zip(after.memory.chunks_exact(4))
            .zip((base..).step_by(4))
            .skip(RESERVED_WORDS)
            .filter(|((before, now), _)| before != now)
            .filter_map(|((_, now), address)| {
                let bytes = <[u8; 4]>::try_from(now).ok()?;
                Some(WordChange { address, bytes })
            })
            .collect()
    }
}

/// A register that changed, printed as `NAME: 0x<value>` padded to its
/// family width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterChange {
    /// Register name.
    pub name: &'static str,
    /// Value after the command.
    pub value: u128,
}

impl fmt::Display for RegisterChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = display_digits(self.name);
        write!(f, "{}: 0x{:0digits$x}", self.name, self.value)
    }
}

/// A window word that changed, printed as `0x<address> <WORD>` with the
/// bytes in memory order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordChange {
    /// Address of the word.
    pub address: u64,
    /// Word bytes after the command.
    pub bytes: [u8; 4],
}

impl fmt::Display for WordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x} ", self.address)?;
        self.bytes.iter().try_for_each(|b| write!(f, "{b:02X}"))
    }
}

/// Changes between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Changed registers in table order.
    pub registers: Vec<RegisterChange>,
    /// Changed words in ascending address order.
    pub memory: Vec<WordChange>,
}

impl Diff {
    /// Returns `true` when nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registers.is_empty() && self.memory.is_empty()
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for change in &self.registers {
            writeln!(f, "{change}")?;
        }
        for change in &self.memory {
            writeln!(f, "{change}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::register_table;
    use a64_core::{Machine, RegisterId};
    use proptest::prelude::*;
    use rstest::rstest;

    fn machine(config: &ShellConfig) -> Machine {
        let mut machine = Machine::new();
        machine
            .map_memory(config.base(), config.backing_size())
            .expect("map");
        machine
    }

    fn capture(machine: &Machine, config: &ShellConfig) -> Snapshot {
        Snapshot::capture(machine, register_table(), config).expect("capture")
    }

    #[test]
    fn untouched_machine_has_no_changes() {
        let config = ShellConfig::default();
        let machine = machine(&config);
        let before = capture(&machine, &config);
        let after = capture(&machine, &config);
        assert!(before.register_changes(&after).is_empty());
        assert!(before.memory_changes(&after, config.base()).is_empty());
    }

    #[test]
    fn aliases_are_reported_in_table_order() {
        let config = ShellConfig::default();
        let mut machine = machine(&config);
        let before = capture(&machine, &config);
        machine.write_register(RegisterId::X(1), 5);
        let after = capture(&machine, &config);

        let lines: Vec<String> = before
            .register_changes(&after)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(lines, ["X1: 0x0000000000000005", "W1: 0x00000005"]);
    }

    #[rstest]
    #[case(RegisterId::Q(2), u128::MAX, "Q2: 0xffffffffffffffffffffffffffffffff")]
    #[case(RegisterId::H(2), 0xAB, "H2: 0x00ab")]
    #[case(RegisterId::B(2), 0xAB, "B2: 0xab")]
    #[case(RegisterId::Sp, 0x10, "SP: 0x00000010")]
    fn family_widths(#[case] id: RegisterId, #[case] value: u128, #[case] expected: &str) {
        let config = ShellConfig::default();
        let mut machine = machine(&config);
        let before = capture(&machine, &config);
        machine.write_register(id, value);
        let after = capture(&machine, &config);
        let changes = before.register_changes(&after);
        assert!(changes.iter().any(|c| c.to_string() == expected), "{changes:?}");
    }

    #[test]
    fn memory_words_print_in_byte_order() {
        let config = ShellConfig::default();
        let mut machine = machine(&config);
        let before = capture(&machine, &config);
        machine.write_memory(0x1010, &[0xDE, 0xAD]).expect("write");
        let after = capture(&machine, &config);
        let changes = before.memory_changes(&after, config.base());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].to_string(), "0x1010 DEAD0000");
    }

    proptest! {
        #[test]
        fn reserved_words_are_never_reported(offset in 0usize..128, byte in 1u8..) {
            let config = ShellConfig::default();
            let mut machine = machine(&config);
            let before = capture(&machine, &config);
            let address = config.base() + offset as u64;
            machine.write_memory(address, &[byte]).expect("write");
            let after = capture(&machine, &config);

            let changes = before.memory_changes(&after, config.base());
            prop_assert!(changes.iter().all(|c| c.address >= config.base() + 16));
            prop_assert_eq!(changes.len(), usize::from(offset >= 16));
        }
    }
}
