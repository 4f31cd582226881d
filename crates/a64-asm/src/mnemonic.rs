//! Mnemonic resolution for the supported A64 subset.

use std::collections::HashSet;
use std::sync::OnceLock;

use crate::errors::AsmError;

/// Instruction class a mnemonic is encoded by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MnemonicClass {
    /// Integer data processing, immediates and aliases.
    Integer,
    /// Loads and stores.
    Memory,
    /// Scalar floating point.
    FloatingPoint,
    /// Advanced SIMD.
    Vector,
    /// Hints and exception generation.
    System,
}

const MNEMONIC_ENTRIES: &[(&str, MnemonicClass)] = &[
    ("ADD", MnemonicClass::Integer),
    ("ADDS", MnemonicClass::Integer),
    ("SUB", MnemonicClass::Integer),
    ("SUBS", MnemonicClass::Integer),
    ("CMP", MnemonicClass::Integer),
    ("CMN", MnemonicClass::Integer),
    ("NEG", MnemonicClass::Integer),
    ("NEGS", MnemonicClass::Integer),
    ("ADC", MnemonicClass::Integer),
    ("ADCS", MnemonicClass::Integer),
    ("SBC", MnemonicClass::Integer),
    ("SBCS", MnemonicClass::Integer),
    ("NGC", MnemonicClass::Integer),
    ("NGCS", MnemonicClass::Integer),
    ("AND", MnemonicClass::Integer),
    ("ANDS", MnemonicClass::Integer),
    ("ORR", MnemonicClass::Integer),
    ("EOR", MnemonicClass::Integer),
    ("BIC", MnemonicClass::Integer),
    ("BICS", MnemonicClass::Integer),
    ("ORN", MnemonicClass::Integer),
    ("EON", MnemonicClass::Integer),
    ("TST", MnemonicClass::Integer),
    ("MVN", MnemonicClass::Integer),
    ("MOV", MnemonicClass::Integer),
    ("MOVZ", MnemonicClass::Integer),
    ("MOVN", MnemonicClass::Integer),
    ("MOVK", MnemonicClass::Integer),
    ("ADR", MnemonicClass::Integer),
    ("ADRP", MnemonicClass::Integer),
    ("LSL", MnemonicClass::Integer),
    ("LSR", MnemonicClass::Integer),
    ("ASR", MnemonicClass::Integer),
    ("ROR", MnemonicClass::Integer),
    ("LSLV", MnemonicClass::Integer),
    ("LSRV", MnemonicClass::Integer),
    ("ASRV", MnemonicClass::Integer),
    ("RORV", MnemonicClass::Integer),
    ("SBFM", MnemonicClass::Integer),
    ("BFM", MnemonicClass::Integer),
    ("UBFM", MnemonicClass::Integer),
    ("SBFX", MnemonicClass::Integer),
    ("UBFX", MnemonicClass::Integer),
    ("SBFIZ", MnemonicClass::Integer),
    ("UBFIZ", MnemonicClass::Integer),
    ("BFI", MnemonicClass::Integer),
    ("BFXIL", MnemonicClass::Integer),
    ("SXTB", MnemonicClass::Integer),
    ("SXTH", MnemonicClass::Integer),
    ("SXTW", MnemonicClass::Integer),
    ("UXTB", MnemonicClass::Integer),
    ("UXTH", MnemonicClass::Integer),
    ("EXTR", MnemonicClass::Integer),
    ("CCMP", MnemonicClass::Integer),
    ("CCMN", MnemonicClass::Integer),
    ("CSEL", MnemonicClass::Integer),
    ("CSINC", MnemonicClass::Integer),
    ("CSINV", MnemonicClass::Integer),
    ("CSNEG", MnemonicClass::Integer),
    ("CSET", MnemonicClass::Integer),
    ("CSETM", MnemonicClass::Integer),
    ("CINC", MnemonicClass::Integer),
    ("CINV", MnemonicClass::Integer),
    ("CNEG", MnemonicClass::Integer),
    ("UDIV", MnemonicClass::Integer),
    ("SDIV", MnemonicClass::Integer),
    ("RBIT", MnemonicClass::Integer),
    ("REV16", MnemonicClass::Integer),
    ("REV32", MnemonicClass::Integer),
    ("REV", MnemonicClass::Integer),
    ("CLZ", MnemonicClass::Integer),
    ("CLS", MnemonicClass::Integer),
    ("MADD", MnemonicClass::Integer),
    ("MSUB", MnemonicClass::Integer),
    ("MUL", MnemonicClass::Integer),
    ("MNEG", MnemonicClass::Integer),
    ("SMADDL", MnemonicClass::Integer),
    ("SMSUBL", MnemonicClass::Integer),
    ("UMADDL", MnemonicClass::Integer),
    ("UMSUBL", MnemonicClass::Integer),
    ("SMULL", MnemonicClass::Integer),
    ("UMULL", MnemonicClass::Integer),
    ("SMULH", MnemonicClass::Integer),
    ("UMULH", MnemonicClass::Integer),
    ("LDR", MnemonicClass::Memory),
    ("STR", MnemonicClass::Memory),
    ("LDUR", MnemonicClass::Memory),
    ("STUR", MnemonicClass::Memory),
    ("LDRB", MnemonicClass::Memory),
    ("STRB", MnemonicClass::Memory),
    ("LDRH", MnemonicClass::Memory),
    ("STRH", MnemonicClass::Memory),
    ("LDURB", MnemonicClass::Memory),
    ("STURB", MnemonicClass::Memory),
    ("LDURH", MnemonicClass::Memory),
    ("STURH", MnemonicClass::Memory),
    ("LDRSB", MnemonicClass::Memory),
    ("LDRSH", MnemonicClass::Memory),
    ("LDRSW", MnemonicClass::Memory),
    ("LDP", MnemonicClass::Memory),
    ("STP", MnemonicClass::Memory),
    ("LDPSW", MnemonicClass::Memory),
    ("FMOV", MnemonicClass::FloatingPoint),
    ("FADD", MnemonicClass::FloatingPoint),
    ("FSUB", MnemonicClass::FloatingPoint),
    ("FMUL", MnemonicClass::FloatingPoint),
    ("FDIV", MnemonicClass::FloatingPoint),
    ("FNMUL", MnemonicClass::FloatingPoint),
    ("FMAX", MnemonicClass::FloatingPoint),
    ("FMIN", MnemonicClass::FloatingPoint),
    ("FABS", MnemonicClass::FloatingPoint),
    ("FNEG", MnemonicClass::FloatingPoint),
    ("FSQRT", MnemonicClass::FloatingPoint),
    ("FCVT", MnemonicClass::FloatingPoint),
    ("FCMP", MnemonicClass::FloatingPoint),
    ("FCMPE", MnemonicClass::FloatingPoint),
    ("SCVTF", MnemonicClass::FloatingPoint),
    ("UCVTF", MnemonicClass::FloatingPoint),
    ("FCVTZS", MnemonicClass::FloatingPoint),
    ("FCVTZU", MnemonicClass::FloatingPoint),
    ("DUP", MnemonicClass::Vector),
    ("INS", MnemonicClass::Vector),
    ("UMOV", MnemonicClass::Vector),
    ("MOVI", MnemonicClass::Vector),
    ("NOP", MnemonicClass::System),
    ("YIELD", MnemonicClass::System),
    ("WFE", MnemonicClass::System),
    ("WFI", MnemonicClass::System),
    ("SEV", MnemonicClass::System),
    ("SEVL", MnemonicClass::System),
    ("SVC", MnemonicClass::System),
    ("HVC", MnemonicClass::System),
    ("SMC", MnemonicClass::System),
    ("BRK", MnemonicClass::System),
    ("HLT", MnemonicClass::System),
];

/// Branch and control-flow mnemonics. Conditional branches (`B.EQ`,
/// `BC.EQ`) are recognised by their `B.`/`BC.` prefix, or by the bare `B`/`BC`
/// stem when the condition has already been split off.
pub const BRANCH_MNEMONICS: &[&str] = &[
    "B", "BC", "BL", "BR", "BLR", "RET", "CBZ", "CBNZ", "TBZ", "TBNZ", "ERET",
];

fn branch_set() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| BRANCH_MNEMONICS.iter().copied().collect())
}

/// Returns `true` for branch mnemonics, including `B.<cond>`.
#[must_use]
pub fn is_branch(mnemonic: &str) -> bool {
    let upper = mnemonic.to_ascii_uppercase();
    branch_set().contains(upper.as_str()) || upper.starts_with("B.") || upper.starts_with("BC.")
}

/// All supported mnemonics with their class, in table order.
#[must_use]
pub const fn mnemonic_entries() -> &'static [(&'static str, MnemonicClass)] {
    MNEMONIC_ENTRIES
}

/// Resolves a mnemonic to its canonical upper-case name and class.
///
/// # Errors
///
/// Returns [`AsmError::BranchUnsupported`] for branches and
/// [`AsmError::UnknownMnemonic`] for anything else outside the table.
pub fn resolve_mnemonic(mnemonic: &str) -> Result<(&'static str, MnemonicClass), AsmError> {
    let upper = mnemonic.to_ascii_uppercase();
    if is_branch(&upper) {
        return Err(AsmError::BranchUnsupported(upper));
    }
    MNEMONIC_ENTRIES
        .iter()
        .find(|(name, _)| *name == upper)
        .copied()
        .ok_or(AsmError::UnknownMnemonic(upper))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("add", "ADD", MnemonicClass::Integer)]
    #[case("Ldp", "LDP", MnemonicClass::Memory)]
    #[case("fcvtzs", "FCVTZS", MnemonicClass::FloatingPoint)]
    #[case("movi", "MOVI", MnemonicClass::Vector)]
    #[case("svc", "SVC", MnemonicClass::System)]
    fn resolves_case_insensitively(
        #[case] input: &str,
        #[case] name: &str,
        #[case] class: MnemonicClass,
    ) {
        assert_eq!(resolve_mnemonic(input), Ok((name, class)));
    }

    #[rstest]
    #[case("b")]
    #[case("BL")]
    #[case("ret")]
    #[case("b.eq")]
    #[case("bc")]
    #[case("bc.ne")]
    #[case("cbnz")]
    fn branches_are_rejected(#[case] input: &str) {
        assert_eq!(
            resolve_mnemonic(input),
            Err(AsmError::BranchUnsupported(input.to_ascii_uppercase()))
        );
    }

    #[test]
    fn unknown_mnemonic_is_reported_upper_case() {
        assert_eq!(
            resolve_mnemonic("frob"),
            Err(AsmError::UnknownMnemonic("FROB".into()))
        );
    }

    #[test]
    fn table_has_no_duplicates_or_branches() {
        let mut seen = HashSet::new();
        for (name, _) in mnemonic_entries() {
            assert!(seen.insert(*name), "duplicate {name}");
            assert!(!is_branch(name), "{name} listed as branch");
        }
    }
}
