//! The `write` command: store a value directly into a register or memory.

use tracing::debug;

use crate::backend::Emulator;
use crate::config::ShellConfig;
use crate::errors::ShellError;
use crate::literal::{memory_bytes, parse_address, Literal};
use crate::pipeline::Report;
use crate::registers::{register_table, RegisterEntry};
use crate::snapshot::{Diff, Snapshot};

/// Where a `write` stores its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    /// A named register.
    Register(&'static RegisterEntry),
    /// A memory address.
    Memory(u64),
}

impl WriteTarget {
    /// Resolves a target token. Register names win over addresses, so `b0`
    /// is a register and never the address `0xb0`.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::NotAddressable`] when the token is neither.
    pub fn resolve(token: &str) -> Result<Self, ShellError> {
        if let Some(entry) = register_table().lookup(token) {
            return Ok(Self::Register(entry));
        }
        parse_address(token)
            .map(Self::Memory)
            .ok_or_else(|| ShellError::NotAddressable(token.to_owned()))
    }
}

/// Splits `write` arguments into exactly a target and a value.
///
/// # Errors
///
/// Returns [`ShellError::InvalidArguments`] for any other token count.
pub fn split_arguments(args: &str) -> Result<(&str, &str), ShellError> {
    let mut tokens = args
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty());
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(target), Some(value), None) => Ok((target, value)),
        _ => Err(ShellError::InvalidArguments),
    }
}

/// Applies `write <target> <value>`.
///
/// Register writes report the register diff, memory writes the memory diff.
/// A fault from the emulator is carried in the [`Report`].
///
/// # Errors
///
/// Returns the argument, value or target rejection before touching the
/// machine.
pub fn write_command<E: Emulator>(
    emulator: &mut E,
    config: &ShellConfig,
    args: &str,
) -> Result<Report, ShellError> {
    let (target, value) = split_arguments(args)?;
    let literal = Literal::parse(value).ok_or(ShellError::InvalidValue)?;
    let table = register_table();

    match WriteTarget::resolve(target)? {
        WriteTarget::Register(entry) => {
            let before = Snapshot::capture(emulator, table, config)?;
            let fault = emulator
                .write_register(entry.id, literal.bit_pattern())
                .err();
            let after = Snapshot::capture(emulator, table, config)?;
            debug!(register = %entry.name, faulted = fault.is_some(), "register write");
            Ok(Report {
                fault,
                diff: Diff {
                    registers: before.register_changes(&after),
                    memory: Vec::new(),
                },
            })
        }
        WriteTarget::Memory(address) => {
            let bytes = memory_bytes(value)?;
            let before = Snapshot::capture(emulator, table, config)?;
            let fault = emulator.write_memory(address, &bytes).err();
            let after = Snapshot::capture(emulator, table, config)?;
            debug!(
                address = format_args!("{address:#x}"),
                len = bytes.len(),
                faulted = fault.is_some(),
                "memory write"
            );
            Ok(Report {
                fault,
                diff: Diff {
                    registers: Vec::new(),
                    memory: before.memory_changes(&after, config.base()),
                },
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a64_core::{Machine, MachineError, RegisterId};
    use rstest::rstest;

    fn machine(config: &ShellConfig) -> Machine {
        let mut machine = Machine::new();
        machine
            .map_memory(config.base(), config.backing_size())
            .expect("map");
        machine
    }

    fn lines(report: &Report) -> Vec<String> {
        report.diff.to_string().lines().map(str::to_owned).collect()
    }

    #[rstest]
    #[case("x0 5", Ok(("x0", "5")))]
    #[case("x0, 5", Ok(("x0", "5")))]
    #[case("x0,5", Ok(("x0", "5")))]
    #[case("  0x1010 ,  0x1 ", Ok(("0x1010", "0x1")))]
    #[case("", Err(()))]
    #[case("x0", Err(()))]
    #[case("x0 1 2", Err(()))]
    fn argument_splitting(#[case] args: &str, #[case] expected: Result<(&str, &str), ()>) {
        assert_eq!(split_arguments(args).map_err(|_| ()), expected);
    }

    #[test]
    fn register_write_truncates_and_reports_aliases() {
        let config = ShellConfig::default();
        let mut machine = machine(&config);
        let report = write_command(&mut machine, &config, "w3, -1").expect("write");
        assert_eq!(report.fault, None);
        assert_eq!(lines(&report), ["X3: 0x00000000ffffffff", "W3: 0xffffffff"]);
        assert_eq!(machine.read_register(RegisterId::X(3)), 0xFFFF_FFFF);
    }

    #[test]
    fn odd_hex_digit_count_pads_a_trailing_nibble() {
        let config = ShellConfig::default();
        let mut machine = machine(&config);
        let report = write_command(&mut machine, &config, "0x1010 0x1").expect("write");
        assert_eq!(lines(&report), ["0x1010 10000000"]);
        assert_eq!(machine.read_memory(0x1010, 2).expect("read"), [0x10, 0x00]);
    }

    #[test]
    fn zero_writes_nothing() {
        let config = ShellConfig::default();
        let mut machine = machine(&config);
        let before = machine.clone();
        let report = write_command(&mut machine, &config, "0x1010 0").expect("write");
        assert!(report.diff.is_empty());
        assert_eq!(machine, before);
    }

    #[test]
    fn writes_into_reserved_words_are_not_reported() {
        let config = ShellConfig::default();
        let mut machine = machine(&config);
        let report = write_command(&mut machine, &config, "1004 0xff").expect("write");
        assert!(report.diff.is_empty());
        assert_eq!(machine.read_memory(0x1004, 1).expect("read"), [0xFF]);
    }

    #[test]
    fn unmapped_write_is_carried_as_a_fault() {
        let config = ShellConfig::default();
        let mut machine = machine(&config);
        let report = write_command(&mut machine, &config, "0x100 0x1234").expect("write");
        assert_eq!(
            report.fault,
            Some(MachineError::Unmapped {
                address: 0x100,
                len: 2
            })
        );
        assert!(report.diff.is_empty());
    }

    #[rstest]
    #[case("x0", ShellError::InvalidArguments)]
    #[case("x0 ten", ShellError::InvalidValue)]
    #[case("0x1010 -1", ShellError::InvalidValue)]
    #[case("foo 1", ShellError::NotAddressable("foo".into()))]
    fn rejections(#[case] args: &str, #[case] expected: ShellError) {
        let config = ShellConfig::default();
        let mut machine = machine(&config);
        let err = write_command(&mut machine, &config, args).expect_err("rejected");
        assert_eq!(err.to_string(), expected.to_string());
    }
}
