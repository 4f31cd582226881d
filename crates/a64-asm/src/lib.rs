//! Single-line assembler for the A64 subset executed by `a64-core`.

use tracing::debug;

/// Instruction encoding.
pub mod encoder;
/// Structured assembly error types.
pub mod errors;
/// Mnemonic resolution and the branch blocklist.
pub mod mnemonic;
/// Line parser producing typed operands.
pub mod parser;

pub use encoder::encode;
pub use errors::AsmError;
pub use mnemonic::{is_branch, mnemonic_entries, resolve_mnemonic, MnemonicClass};
pub use parser::{parse_line, ParsedInstruction};

/// Assembles exactly one instruction placed at `address`.
///
/// Returns the four little-endian bytes of the encoded word.
///
/// # Errors
///
/// Returns an [`AsmError`] when the line is empty, holds more than one
/// instruction, names an unknown or branch mnemonic, or has operands that
/// cannot be encoded.
pub fn assemble_line(source: &str, address: u64) -> Result<Vec<u8>, AsmError> {
    let word = assemble_word(source, address)?;
    Ok(word.to_le_bytes().to_vec())
}

/// Assembles exactly one instruction and returns the 32-bit word.
///
/// # Errors
///
/// See [`assemble_line`].
pub fn assemble_word(source: &str, address: u64) -> Result<u32, AsmError> {
    let text = parser::instruction_text(source)?;
    let (mnemonic, _) = parser::split_mnemonic(text);
    resolve_mnemonic(mnemonic)?;

    let parsed = parse_line(text)?;
    let word = encode(&parsed, address)?;
    debug!(source = text, address, word, "assembled");
    Ok(word)
}

#[cfg(test)]
use proptest as _;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_little_endian_bytes() {
        assert_eq!(
            assemble_line("nop", 0x1000),
            Ok(vec![0x1F, 0x20, 0x03, 0xD5])
        );
    }

    #[test]
    fn branch_is_rejected_before_operands_are_parsed() {
        assert_eq!(
            assemble_line("b.ne loop", 0x1000),
            Err(AsmError::BranchUnsupported("B.NE".into()))
        );
        assert_eq!(
            assemble_line("bl printf", 0x1000),
            Err(AsmError::BranchUnsupported("BL".into()))
        );
    }

    #[test]
    fn unknown_mnemonic_wins_over_bad_operands() {
        assert_eq!(
            assemble_line("frob x0, ???", 0x1000),
            Err(AsmError::UnknownMnemonic("FROB".into()))
        );
    }

    #[test]
    fn empty_and_multiple_lines() {
        assert_eq!(assemble_line("   ", 0x1000), Err(AsmError::Empty));
        assert_eq!(
            assemble_line("nop\nnop", 0x1000),
            Err(AsmError::MultipleInstructions)
        );
    }
}
