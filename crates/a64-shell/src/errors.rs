//! Errors reported by the shell.
//!
//! Every variant's `Display` output is the exact message printed to the user;
//! the dispatcher catches them all and only `exit` or end of input ends a
//! session.

use std::io;

use a64_asm::AsmError;
use a64_core::MachineError;
use thiserror::Error;

/// Rejections and failures surfaced while handling one input line.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The assembler rejected the instruction text.
    #[error("{0}")]
    Syntax(#[from] AsmError),
    /// A register, memory or execution fault raised by the emulator.
    #[error("{0}")]
    Machine(#[from] MachineError),
    /// `write` was not given exactly a target and a value.
    #[error("Invalid arguments")]
    InvalidArguments,
    /// `write` value is not an integer literal or cannot be stored.
    #[error("Invalid value")]
    InvalidValue,
    /// Register query with an unknown display selector.
    #[error("Unknown argument '{0}'")]
    UnknownArgument(String),
    /// `write` target is neither a register nor an address.
    #[error("'{0}' is not recognized as a register or memory address")]
    NotAddressable(String),
    /// Branch mnemonics cannot run in a single-instruction shell.
    #[error("Branching instructions are not supported")]
    BranchUnsupported,
    /// Input line looked like a label definition.
    #[error("Labels are not supported")]
    LabelUnsupported,
    /// Input line looked like an assembler directive.
    #[error("Directives are not supported")]
    DirectiveUnsupported,
    /// Leading token matched nothing.
    #[error("Unknown command or instruction '{0}'")]
    UnknownCommand(String),
    /// `info` lookup missed both reference tables.
    #[error("Instruction '{0}' not found.")]
    NotFound(String),
    /// Startup configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(&'static str),
    /// Reading input or writing output failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}
