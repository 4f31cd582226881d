//! Interactive single-instruction shell for the Armv8-A A64 instruction set.
//!
//! Each input line is classified into a [`Command`]. Instructions are
//! assembled into the instruction slot, executed exactly once, and the
//! register and memory changes are printed.

/// Collaborator traits and their adapters.
pub mod backend;
/// Line classification.
pub mod command;
/// Startup configuration.
pub mod config;
/// Shell error types.
pub mod errors;
/// Integer literals and memory byte strings.
pub mod literal;
/// Execute pipeline.
pub mod pipeline;
/// Instruction reference tables.
pub mod reference;
/// Addressable register table.
pub mod registers;
/// Interactive session.
pub mod session;
/// State capture and diffing.
pub mod snapshot;
/// Direct register and memory writes.
pub mod write;

pub use backend::{Assembler, Emulator, LineAssembler};
pub use command::{classify, Command, RegisterFormat};
pub use config::{ShellConfig, DEFAULT_BASE, DEFAULT_WINDOW};
pub use errors::ShellError;
pub use pipeline::{execute_line, Report};
pub use registers::{register_table, RegisterTable};
pub use session::{Flow, Session, BANNER, PROMPT};
pub use snapshot::{Diff, Snapshot};

use clap as _;
use tracing_subscriber as _;

#[cfg(test)]
use tempfile as _;
