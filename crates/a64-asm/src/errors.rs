//! Assembler error type.

use thiserror::Error;

/// Reasons a line could not be assembled into one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    /// Line had no instruction after comments were stripped.
    #[error("empty instruction")]
    Empty,
    /// Line contained more than one instruction.
    #[error("only one instruction can be assembled at a time")]
    MultipleInstructions,
    /// Mnemonic is not part of the supported instruction set.
    #[error("invalid mnemonic '{0}'")]
    UnknownMnemonic(String),
    /// Mnemonic is a branch; control flow cannot run in a single step.
    #[error("branch instruction '{0}' cannot be assembled")]
    BranchUnsupported(String),
    /// Operand list does not match any form of the mnemonic.
    #[error("invalid operands for '{mnemonic}': {detail}")]
    InvalidOperands {
        /// Upper-case mnemonic.
        mnemonic: String,
        /// What was wrong with the operands.
        detail: String,
    },
    /// Operand looked like a register but is not a valid one.
    #[error("invalid register '{0}'")]
    InvalidRegister(String),
    /// Immediate text is not a number.
    #[error("invalid immediate '{0}'")]
    InvalidImmediate(String),
    /// Immediate does not fit its field.
    #[error("immediate {value} out of range: {detail}")]
    ImmediateOutOfRange {
        /// Value as written.
        value: i64,
        /// Accepted range or constraint.
        detail: String,
    },
    /// Value is not a repeating bit pattern a logical instruction can encode.
    #[error("immediate {0:#x} cannot be encoded as a bitmask")]
    UnencodableBitmask(u64),
    /// Value has no 8-bit floating-point immediate form.
    #[error("floating-point immediate {0} cannot be encoded")]
    UnencodableFloat(String),
}

impl AsmError {
    /// Builds an [`AsmError::InvalidOperands`].
    pub fn operands(mnemonic: &str, detail: impl Into<String>) -> Self {
        Self::InvalidOperands {
            mnemonic: mnemonic.to_owned(),
            detail: detail.into(),
        }
    }

    /// Builds an [`AsmError::ImmediateOutOfRange`].
    pub fn out_of_range(value: i64, detail: impl Into<String>) -> Self {
        Self::ImmediateOutOfRange {
            value,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AsmError;

    #[test]
    fn messages_name_the_offending_input() {
        assert_eq!(
            AsmError::UnknownMnemonic("FOO".into()).to_string(),
            "invalid mnemonic 'FOO'"
        );
        assert_eq!(
            AsmError::operands("ADD", "expected 3 operands").to_string(),
            "invalid operands for 'ADD': expected 3 operands"
        );
        assert_eq!(
            AsmError::out_of_range(4096, "expected 0..=4095").to_string(),
            "immediate 4096 out of range: expected 0..=4095"
        );
        assert_eq!(
            AsmError::UnencodableBitmask(0x1234).to_string(),
            "immediate 0x1234 cannot be encoded as a bitmask"
        );
    }
}
