//! Input line classification.
//!
//! Every line becomes exactly one [`Command`] or a typed rejection before
//! the machine is touched.

use a64_asm::is_branch;

use crate::errors::ShellError;
use crate::reference;
use crate::registers::{register_table, RegisterEntry};

/// Radix a register query prints its value in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterFormat {
    /// `NAME: 0x2a`
    Hex,
    /// `NAME: 42`
    Decimal,
    /// `NAME: 101010`, at least four digits.
    Binary,
}

impl RegisterFormat {
    /// Parses a query selector. Surrounding spaces and commas are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::UnknownArgument`] for unrecognised selectors.
    pub fn parse(selector: &str) -> Result<Self, ShellError> {
        let trimmed = selector.trim_matches(|c| c == ' ' || c == ',');
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "x" | "hex" | "hexadecimal" => Ok(Self::Hex),
            "d" | "dec" | "decimal" => Ok(Self::Decimal),
            "b" | "bin" | "binary" => Ok(Self::Binary),
            _ => Err(ShellError::UnknownArgument(trimmed.to_owned())),
        }
    }

    /// Formats `value` for a query reply.
    #[must_use]
    pub fn render(self, value: u128) -> String {
        match self {
            Self::Hex => format!("0x{value:x}"),
            Self::Decimal => value.to_string(),
            Self::Binary => format!("{value:04b}"),
        }
    }
}

/// One classified input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Blank line.
    Empty,
    /// `help` with an optional topic.
    Help(&'a str),
    /// `exit`.
    Exit,
    /// `overview`.
    Overview,
    /// `write` with its unparsed arguments.
    Write(&'a str),
    /// `info` with the mnemonic to look up.
    Info(&'a str),
    /// A known instruction; carries the whole line.
    Execute(&'a str),
    /// A register query.
    Query {
        /// Register token as typed.
        token: &'a str,
        /// Resolved register.
        register: &'static RegisterEntry,
        /// Output radix.
        format: RegisterFormat,
    },
}

/// Splits a line into its leading identifier and the trimmed remainder.
#[must_use]
pub fn split_line(line: &str) -> (&str, &str) {
    let end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(line.len());
    (&line[..end], line[end..].trim())
}

/// Classifies one input line.
///
/// Shell commands match exactly in lower case. Everything else is tried as,
/// in order: instruction mnemonic, register name, branch, label, directive.
///
/// # Errors
///
/// Returns the rejection for branches, labels, directives, unknown tokens
/// and unknown register query selectors.
pub fn classify(line: &str) -> Result<Command<'_>, ShellError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    if let Some(topic) = line.strip_prefix('?') {
        return Ok(Command::Help(topic.trim()));
    }

    let (token, rest) = split_line(line);
    match token {
        "help" => return Ok(Command::Help(rest)),
        "exit" => return Ok(Command::Exit),
        "overview" => return Ok(Command::Overview),
        "write" => return Ok(Command::Write(rest)),
        "info" => return Ok(Command::Info(rest)),
        _ => {}
    }

    if !token.is_empty() && reference::is_instruction(token) {
        return Ok(Command::Execute(line));
    }
    if let Some(register) = register_table().lookup(token) {
        return Ok(Command::Query {
            token,
            register,
            format: RegisterFormat::parse(rest)?,
        });
    }
    if !token.is_empty() && is_branch(token) {
        return Err(ShellError::BranchUnsupported);
    }
    if line.ends_with(':') {
        return Err(ShellError::LabelUnsupported);
    }
    if line.starts_with('.') {
        return Err(ShellError::DirectiveUnsupported);
    }
    Err(ShellError::UnknownCommand(token.to_owned()))
}
