//! Static instruction reference used by `info` and by line classification.
//!
//! Two tables group entries by mnemonic: base instructions and SIMD/FP
//! instructions. A mnemonic may appear in both. Branches are deliberately
//! absent so the dispatcher can reject them separately.

/// One syntax form of an instruction and what it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceEntry {
    /// Operand syntax following the mnemonic.
    pub syntax: &'static str,
    /// One-line description.
    pub description: &'static str,
}

const fn e(syntax: &'static str, description: &'static str) -> ReferenceEntry {
    ReferenceEntry {
        syntax,
        description,
    }
}

type Group = (&'static str, &'static [ReferenceEntry]);

/// A titled mnemonic table.
#[derive(Debug)]
pub struct ReferenceTable {
    title: &'static str,
    groups: &'static [Group],
}

impl ReferenceTable {
    /// Heading printed above this table's `info` output.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        self.title
    }

    /// Entries for `mnemonic`, ignoring ASCII case.
    #[must_use]
    pub fn lookup(&self, mnemonic: &str) -> Option<&'static [ReferenceEntry]> {
        self.groups
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(mnemonic))
            .map(|(_, entries)| *entries)
    }

    /// Mnemonics in table order.
    pub fn mnemonics(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.groups.iter().map(|(name, _)| *name)
    }
}

/// Base (general-purpose) instructions.
pub static BASE: ReferenceTable = ReferenceTable {
    title: "Base Instructions",
    groups: BASE_GROUPS,
};

/// SIMD and floating-point instructions.
pub static SIMD_FP: ReferenceTable = ReferenceTable {
    title: "SIMD and Floating-point Instructions",
    groups: SIMD_FP_GROUPS,
};

/// Both tables in `info` print order.
#[must_use]
pub fn tables() -> [&'static ReferenceTable; 2] {
    [&BASE, &SIMD_FP]
}

/// Returns `true` when either table knows `mnemonic`.
#[must_use]
pub fn is_instruction(mnemonic: &str) -> bool {
    tables().iter().any(|table| table.lookup(mnemonic).is_some())
}

const BASE_GROUPS: &[Group] = &[
    ("ADD", &[
        e("Rd, Rn, #imm{, LSL #12}", "Add immediate"),
        e("Rd, Rn, Rm{, shift #amount}", "Add shifted register"),
        e("Rd, Rn, Rm, extend {#amount}", "Add extended register"),
    ]),
    ("ADDS", &[
        e("Rd, Rn, #imm{, LSL #12}", "Add immediate, setting flags"),
        e("Rd, Rn, Rm{, shift #amount}", "Add shifted register, setting flags"),
        e("Rd, Rn, Rm, extend {#amount}", "Add extended register, setting flags"),
    ]),
    ("SUB", &[
        e("Rd, Rn, #imm{, LSL #12}", "Subtract immediate"),
        e("Rd, Rn, Rm{, shift #amount}", "Subtract shifted register"),
        e("Rd, Rn, Rm, extend {#amount}", "Subtract extended register"),
    ]),
    ("SUBS", &[
        e("Rd, Rn, #imm{, LSL #12}", "Subtract immediate, setting flags"),
        e("Rd, Rn, Rm{, shift #amount}", "Subtract shifted register, setting flags"),
        e("Rd, Rn, Rm, extend {#amount}", "Subtract extended register, setting flags"),
    ]),
    ("CMP", &[
        e("Rn, #imm{, LSL #12}", "Compare immediate"),
        e("Rn, Rm{, shift #amount}", "Compare shifted register"),
    ]),
    ("CMN", &[
        e("Rn, #imm{, LSL #12}", "Compare negative immediate"),
        e("Rn, Rm{, shift #amount}", "Compare negative shifted register"),
    ]),
    ("NEG", &[e("Rd, Rm{, shift #amount}", "Negate")]),
    ("NEGS", &[e("Rd, Rm{, shift #amount}", "Negate, setting flags")]),
    ("ADC", &[e("Rd, Rn, Rm", "Add with carry")]),
    ("ADCS", &[e("Rd, Rn, Rm", "Add with carry, setting flags")]),
    ("SBC", &[e("Rd, Rn, Rm", "Subtract with carry")]),
    ("SBCS", &[e("Rd, Rn, Rm", "Subtract with carry, setting flags")]),
    ("NGC", &[e("Rd, Rm", "Negate with carry")]),
    ("NGCS", &[e("Rd, Rm", "Negate with carry, setting flags")]),
    ("AND", &[
        e("Rd, Rn, #imm", "Bitwise AND (bitmask immediate)"),
        e("Rd, Rn, Rm{, shift #amount}", "Bitwise AND (shifted register)"),
    ]),
    ("ANDS", &[
        e("Rd, Rn, #imm", "Bitwise AND (bitmask immediate), setting flags"),
        e("Rd, Rn, Rm{, shift #amount}", "Bitwise AND (shifted register), setting flags"),
    ]),
    ("ORR", &[
        e("Rd, Rn, #imm", "Bitwise inclusive OR (bitmask immediate)"),
        e("Rd, Rn, Rm{, shift #amount}", "Bitwise inclusive OR (shifted register)"),
    ]),
    ("EOR", &[
        e("Rd, Rn, #imm", "Bitwise exclusive OR (bitmask immediate)"),
        e("Rd, Rn, Rm{, shift #amount}", "Bitwise exclusive OR (shifted register)"),
    ]),
    ("BIC", &[e("Rd, Rn, Rm{, shift #amount}", "Bitwise bit clear")]),
    ("BICS", &[e("Rd, Rn, Rm{, shift #amount}", "Bitwise bit clear, setting flags")]),
    ("ORN", &[e("Rd, Rn, Rm{, shift #amount}", "Bitwise OR NOT")]),
    ("EON", &[e("Rd, Rn, Rm{, shift #amount}", "Bitwise exclusive OR NOT")]),
    ("TST", &[
        e("Rn, #imm", "Test bits (bitmask immediate)"),
        e("Rn, Rm{, shift #amount}", "Test bits (shifted register)"),
    ]),
    ("MVN", &[e("Rd, Rm{, shift #amount}", "Bitwise NOT")]),
    ("MOV", &[
        e("Rd, #imm", "Move immediate (wide or bitmask)"),
        e("Rd, Rm", "Move register"),
        e("Rd|SP, Rn|SP", "Move to or from stack pointer"),
    ]),
    ("MOVZ", &[e("Rd, #imm16{, LSL #shift}", "Move wide with zero")]),
    ("MOVN", &[e("Rd, #imm16{, LSL #shift}", "Move wide with NOT")]),
    ("MOVK", &[e("Rd, #imm16{, LSL #shift}", "Move wide with keep")]),
    ("ADR", &[e("Xd, #address", "Form PC-relative address")]),
    ("ADRP", &[e("Xd, #address", "Form PC-relative address to 4KB page")]),
    ("LSL", &[
        e("Rd, Rn, #shift", "Logical shift left (immediate)"),
        e("Rd, Rn, Rm", "Logical shift left (register)"),
    ]),
    ("LSR", &[
        e("Rd, Rn, #shift", "Logical shift right (immediate)"),
        e("Rd, Rn, Rm", "Logical shift right (register)"),
    ]),
    ("ASR", &[
        e("Rd, Rn, #shift", "Arithmetic shift right (immediate)"),
        e("Rd, Rn, Rm", "Arithmetic shift right (register)"),
    ]),
    ("ROR", &[
        e("Rd, Rn, #shift", "Rotate right (immediate)"),
        e("Rd, Rn, Rm", "Rotate right (register)"),
    ]),
    ("LSLV", &[e("Rd, Rn, Rm", "Logical shift left variable")]),
    ("LSRV", &[e("Rd, Rn, Rm", "Logical shift right variable")]),
    ("ASRV", &[e("Rd, Rn, Rm", "Arithmetic shift right variable")]),
    ("RORV", &[e("Rd, Rn, Rm", "Rotate right variable")]),
    ("SBFM", &[e("Rd, Rn, #immr, #imms", "Signed bitfield move")]),
    ("BFM", &[e("Rd, Rn, #immr, #imms", "Bitfield move")]),
    ("UBFM", &[e("Rd, Rn, #immr, #imms", "Unsigned bitfield move")]),
    ("SBFX", &[e("Rd, Rn, #lsb, #width", "Signed bitfield extract")]),
    ("UBFX", &[e("Rd, Rn, #lsb, #width", "Unsigned bitfield extract")]),
    ("SBFIZ", &[e("Rd, Rn, #lsb, #width", "Signed bitfield insert in zero")]),
    ("UBFIZ", &[e("Rd, Rn, #lsb, #width", "Unsigned bitfield insert in zero")]),
    ("BFI", &[e("Rd, Rn, #lsb, #width", "Bitfield insert")]),
    ("BFXIL", &[e("Rd, Rn, #lsb, #width", "Bitfield extract and insert at low end")]),
    ("SXTB", &[e("Rd, Wn", "Sign-extend byte")]),
    ("SXTH", &[e("Rd, Wn", "Sign-extend halfword")]),
    ("SXTW", &[e("Xd, Wn", "Sign-extend word")]),
    ("UXTB", &[e("Wd, Wn", "Zero-extend byte")]),
    ("UXTH", &[e("Wd, Wn", "Zero-extend halfword")]),
    ("EXTR", &[e("Rd, Rn, Rm, #lsb", "Extract register")]),
    ("CCMP", &[
        e("Rn, #imm5, #nzcv, cond", "Conditional compare (immediate)"),
        e("Rn, Rm, #nzcv, cond", "Conditional compare (register)"),
    ]),
    ("CCMN", &[
        e("Rn, #imm5, #nzcv, cond", "Conditional compare negative (immediate)"),
        e("Rn, Rm, #nzcv, cond", "Conditional compare negative (register)"),
    ]),
    ("CSEL", &[e("Rd, Rn, Rm, cond", "Conditional select")]),
    ("CSINC", &[e("Rd, Rn, Rm, cond", "Conditional select increment")]),
    ("CSINV", &[e("Rd, Rn, Rm, cond", "Conditional select invert")]),
    ("CSNEG", &[e("Rd, Rn, Rm, cond", "Conditional select negation")]),
    ("CSET", &[e("Rd, cond", "Conditional set")]),
    ("CSETM", &[e("Rd, cond", "Conditional set mask")]),
    ("CINC", &[e("Rd, Rn, cond", "Conditional increment")]),
    ("CINV", &[e("Rd, Rn, cond", "Conditional invert")]),
    ("CNEG", &[e("Rd, Rn, cond", "Conditional negate")]),
    ("UDIV", &[e("Rd, Rn, Rm", "Unsigned divide")]),
    ("SDIV", &[e("Rd, Rn, Rm", "Signed divide")]),
    ("RBIT", &[e("Rd, Rn", "Reverse bits")]),
    ("REV16", &[e("Rd, Rn", "Reverse bytes in 16-bit halfwords")]),
    ("REV32", &[e("Xd, Xn", "Reverse bytes in 32-bit words")]),
    ("REV", &[e("Rd, Rn", "Reverse bytes")]),
    ("CLZ", &[e("Rd, Rn", "Count leading zeros")]),
    ("CLS", &[e("Rd, Rn", "Count leading sign bits")]),
    ("MADD", &[e("Rd, Rn, Rm, Ra", "Multiply-add")]),
    ("MSUB", &[e("Rd, Rn, Rm, Ra", "Multiply-subtract")]),
    ("MUL", &[e("Rd, Rn, Rm", "Multiply")]),
    ("MNEG", &[e("Rd, Rn, Rm", "Multiply-negate")]),
    ("SMADDL", &[e("Xd, Wn, Wm, Xa", "Signed multiply-add long")]),
    ("SMSUBL", &[e("Xd, Wn, Wm, Xa", "Signed multiply-subtract long")]),
    ("UMADDL", &[e("Xd, Wn, Wm, Xa", "Unsigned multiply-add long")]),
    ("UMSUBL", &[e("Xd, Wn, Wm, Xa", "Unsigned multiply-subtract long")]),
    ("SMULL", &[e("Xd, Wn, Wm", "Signed multiply long")]),
    ("UMULL", &[e("Xd, Wn, Wm", "Unsigned multiply long")]),
    ("SMULH", &[e("Xd, Xn, Xm", "Signed multiply high")]),
    ("UMULH", &[e("Xd, Xn, Xm", "Unsigned multiply high")]),
    ("LDR", &[
        e("Rt, [Xn|SP{, #pimm}]", "Load register (unsigned offset)"),
        e("Rt, [Xn|SP, #simm]!", "Load register (pre-index)"),
        e("Rt, [Xn|SP], #simm", "Load register (post-index)"),
        e("Rt, [Xn|SP, Rm{, extend {#amount}}]", "Load register (register offset)"),
    ]),
    ("STR", &[
        e("Rt, [Xn|SP{, #pimm}]", "Store register (unsigned offset)"),
        e("Rt, [Xn|SP, #simm]!", "Store register (pre-index)"),
        e("Rt, [Xn|SP], #simm", "Store register (post-index)"),
        e("Rt, [Xn|SP, Rm{, extend {#amount}}]", "Store register (register offset)"),
    ]),
    ("LDUR", &[e("Rt, [Xn|SP{, #simm}]", "Load register (unscaled offset)")]),
    ("STUR", &[e("Rt, [Xn|SP{, #simm}]", "Store register (unscaled offset)")]),
    ("LDRB", &[e("Wt, [Xn|SP{, #pimm}]", "Load register byte")]),
    ("STRB", &[e("Wt, [Xn|SP{, #pimm}]", "Store register byte")]),
    ("LDRH", &[e("Wt, [Xn|SP{, #pimm}]", "Load register halfword")]),
    ("STRH", &[e("Wt, [Xn|SP{, #pimm}]", "Store register halfword")]),
    ("LDURB", &[e("Wt, [Xn|SP{, #simm}]", "Load register byte (unscaled)")]),
    ("STURB", &[e("Wt, [Xn|SP{, #simm}]", "Store register byte (unscaled)")]),
    ("LDURH", &[e("Wt, [Xn|SP{, #simm}]", "Load register halfword (unscaled)")]),
    ("STURH", &[e("Wt, [Xn|SP{, #simm}]", "Store register halfword (unscaled)")]),
    ("LDRSB", &[e("Rt, [Xn|SP{, #pimm}]", "Load register signed byte")]),
    ("LDRSH", &[e("Rt, [Xn|SP{, #pimm}]", "Load register signed halfword")]),
    ("LDRSW", &[e("Xt, [Xn|SP{, #pimm}]", "Load register signed word")]),
    ("LDP", &[
        e("Rt1, Rt2, [Xn|SP{, #imm}]", "Load pair of registers (signed offset)"),
        e("Rt1, Rt2, [Xn|SP, #imm]!", "Load pair of registers (pre-index)"),
        e("Rt1, Rt2, [Xn|SP], #imm", "Load pair of registers (post-index)"),
    ]),
    ("STP", &[
        e("Rt1, Rt2, [Xn|SP{, #imm}]", "Store pair of registers (signed offset)"),
        e("Rt1, Rt2, [Xn|SP, #imm]!", "Store pair of registers (pre-index)"),
        e("Rt1, Rt2, [Xn|SP], #imm", "Store pair of registers (post-index)"),
    ]),
    ("LDPSW", &[e("Xt1, Xt2, [Xn|SP{, #imm}]", "Load pair of registers signed word")]),
    ("NOP", &[e("", "No operation")]),
    ("YIELD", &[e("", "Yield hint")]),
    ("WFE", &[e("", "Wait for event")]),
    ("WFI", &[e("", "Wait for interrupt")]),
    ("SEV", &[e("", "Send event")]),
    ("SEVL", &[e("", "Send event local")]),
    ("SVC", &[e("#imm16", "Supervisor call")]),
    ("HVC", &[e("#imm16", "Hypervisor call")]),
    ("SMC", &[e("#imm16", "Secure monitor call")]),
    ("BRK", &[e("#imm16", "Breakpoint")]),
    ("HLT", &[e("#imm16", "Halt")]),
];

const SIMD_FP_GROUPS: &[Group] = &[
    ("FMOV", &[
        e("Fd, Fn", "Floating-point move register"),
        e("Fd, Rn", "Floating-point move from general register"),
        e("Rd, Fn", "Floating-point move to general register"),
        e("Fd, #fimm", "Floating-point move immediate"),
    ]),
    ("FADD", &[e("Fd, Fn, Fm", "Floating-point add")]),
    ("FSUB", &[e("Fd, Fn, Fm", "Floating-point subtract")]),
    ("FMUL", &[e("Fd, Fn, Fm", "Floating-point multiply")]),
    ("FDIV", &[e("Fd, Fn, Fm", "Floating-point divide")]),
    ("FNMUL", &[e("Fd, Fn, Fm", "Floating-point multiply-negate")]),
    ("FMAX", &[e("Fd, Fn, Fm", "Floating-point maximum")]),
    ("FMIN", &[e("Fd, Fn, Fm", "Floating-point minimum")]),
    ("FABS", &[e("Fd, Fn", "Floating-point absolute value")]),
    ("FNEG", &[e("Fd, Fn", "Floating-point negate")]),
    ("FSQRT", &[e("Fd, Fn", "Floating-point square root")]),
    ("FCVT", &[
        e("Dd, Sn", "Floating-point convert single to double"),
        e("Sd, Dn", "Floating-point convert double to single"),
    ]),
    ("FCMP", &[
        e("Fn, Fm", "Floating-point quiet compare"),
        e("Fn, #0.0", "Floating-point quiet compare with zero"),
    ]),
    ("FCMPE", &[
        e("Fn, Fm", "Floating-point signaling compare"),
        e("Fn, #0.0", "Floating-point signaling compare with zero"),
    ]),
    ("SCVTF", &[e("Fd, Rn", "Signed integer convert to floating-point")]),
    ("UCVTF", &[e("Fd, Rn", "Unsigned integer convert to floating-point")]),
    ("FCVTZS", &[e("Rd, Fn", "Floating-point convert to signed integer, rounding toward zero")]),
    ("FCVTZU", &[e("Rd, Fn", "Floating-point convert to unsigned integer, rounding toward zero")]),
    ("ADD", &[e("Vd.T, Vn.T, Vm.T", "Vector add")]),
    ("SUB", &[e("Vd.T, Vn.T, Vm.T", "Vector subtract")]),
    ("MUL", &[e("Vd.T, Vn.T, Vm.T", "Vector multiply")]),
    ("AND", &[e("Vd.T, Vn.T, Vm.T", "Vector bitwise AND")]),
    ("ORR", &[e("Vd.T, Vn.T, Vm.T", "Vector bitwise inclusive OR")]),
    ("EOR", &[e("Vd.T, Vn.T, Vm.T", "Vector bitwise exclusive OR")]),
    ("BIC", &[e("Vd.T, Vn.T, Vm.T", "Vector bitwise bit clear")]),
    ("MOV", &[
        e("Vd.T, Vn.T", "Move vector"),
        e("Vd.Ts[index], Rn", "Move general register to vector element"),
        e("Rd, Vn.Ts[index]", "Move vector element to general register"),
    ]),
    ("DUP", &[e("Vd.T, Rn", "Duplicate general register to vector")]),
    ("INS", &[e("Vd.Ts[index], Rn", "Insert vector element from general register")]),
    ("UMOV", &[e("Rd, Vn.Ts[index]", "Unsigned move vector element to general register")]),
    ("MOVI", &[
        e("Vd.T, #imm8", "Move immediate to every byte"),
        e("Dd, #imm", "Move 64-bit byte-mask immediate"),
        e("Vd.2D, #imm", "Move 64-bit byte-mask immediate to both lanes"),
    ]),
    ("LDR", &[e("Bt|Ht|St|Dt|Qt, [Xn|SP{, #imm}]", "Load SIMD&FP register")]),
    ("STR", &[e("Bt|Ht|St|Dt|Qt, [Xn|SP{, #imm}]", "Store SIMD&FP register")]),
    ("LDUR", &[e("Bt|Ht|St|Dt|Qt, [Xn|SP{, #simm}]", "Load SIMD&FP register (unscaled offset)")]),
    ("STUR", &[e("Bt|Ht|St|Dt|Qt, [Xn|SP{, #simm}]", "Store SIMD&FP register (unscaled offset)")]),
];

#[cfg(test)]
mod tests {
    use super::*;
    use a64_asm::{is_branch, mnemonic_entries};
    use rstest::rstest;

    #[test]
    fn every_assembler_mnemonic_is_documented() {
        for (name, _) in mnemonic_entries() {
            assert!(is_instruction(name), "{name} missing from reference");
        }
    }

    #[test]
    fn tables_hold_no_branches_or_duplicates() {
        for table in tables() {
            let names: Vec<&str> = table.mnemonics().collect();
            for (i, name) in names.iter().enumerate() {
                assert!(!is_branch(name), "{name}");
                assert!(!names[i + 1..].contains(name), "duplicate {name}");
            }
        }
    }

    #[rstest]
    #[case("add", true, true)]
    #[case("ADDS", true, false)]
    #[case("fmul", false, true)]
    #[case("b", false, false)]
    #[case("ret", false, false)]
    fn lookup_per_table(#[case] mnemonic: &str, #[case] base: bool, #[case] simd: bool) {
        assert_eq!(BASE.lookup(mnemonic).is_some(), base);
        assert_eq!(SIMD_FP.lookup(mnemonic).is_some(), simd);
    }
}
