//! Instruction encoding.
//!
//! Maps a [`ParsedInstruction`] onto one 32-bit A64 word. Aliases (`MOV`,
//! `CMP`, `LSL`, `CSET`, ...) are rewritten onto their underlying encodings
//! here, so the decoder only ever sees canonical forms.

use a64_core::{encode_bit_masks, fp_imm8_for, ones, Condition, Extend, ShiftType};

use crate::errors::AsmError;
use crate::mnemonic::resolve_mnemonic;
use crate::parser::{
    Arrangement, MemoryOffset, MemoryOperand, Operand, ParsedInstruction, Reg, RegClass,
};

/// Encodes one parsed instruction placed at `address`.
///
/// `address` only matters for `ADR`/`ADRP`, whose operand is an absolute
/// target address.
///
/// # Errors
///
/// Returns an [`AsmError`] when the mnemonic is unknown or a branch, or when
/// the operands match no encodable form.
pub fn encode(instr: &ParsedInstruction, address: u64) -> Result<u32, AsmError> {
    let (mnemonic, _) = resolve_mnemonic(&instr.mnemonic)?;
    let ops = Operands {
        mnemonic,
        list: &instr.operands,
    };

    match mnemonic {
        "ADD" | "SUB" if ops.is_vector(0) => {
            encode_simd_three_same(ops, if mnemonic == "ADD" { SIMD_ADD } else { SIMD_SUB })
        }
        "ADD" => encode_add_sub(ops, false, false),
        "ADDS" => encode_add_sub(ops, false, true),
        "SUB" => encode_add_sub(ops, true, false),
        "SUBS" => encode_add_sub(ops, true, true),
        "CMP" | "CMN" => {
            ops.count(&[2, 3])?;
            let rn = ops.general(0)?;
            let list = ops.with_zero_register(0, rn.class);
            encode_add_sub(ops.rebind(&list), mnemonic == "CMP", true)
        }
        "NEG" | "NEGS" => {
            ops.count(&[2, 3])?;
            ops.general(1)?;
            let rd = ops.general(0)?;
            let list = ops.with_zero_register(1, rd.class);
            encode_add_sub(ops.rebind(&list), true, mnemonic == "NEGS")
        }
        "ADC" => encode_add_sub_carry(ops, false, false),
        "ADCS" => encode_add_sub_carry(ops, false, true),
        "SBC" => encode_add_sub_carry(ops, true, false),
        "SBCS" => encode_add_sub_carry(ops, true, true),
        "NGC" | "NGCS" => {
            ops.count(&[2])?;
            let rd = ops.general(0)?;
            let list = ops.with_zero_register(1, rd.class);
            encode_add_sub_carry(ops.rebind(&list), true, mnemonic == "NGCS")
        }
        "AND" | "ORR" | "EOR" | "BIC" | "ORN" if ops.is_vector(0) => {
            let op = match mnemonic {
                "AND" => SIMD_AND,
                "ORR" => SIMD_ORR,
                "EOR" => SIMD_EOR,
                "BIC" => SIMD_BIC,
                _ => SIMD_ORN,
            };
            encode_simd_three_same(ops, op)
        }
        "AND" => encode_logical(ops, 0b00, false),
        "ORR" => encode_logical(ops, 0b01, false),
        "EOR" => encode_logical(ops, 0b10, false),
        "ANDS" => encode_logical(ops, 0b11, false),
        "BIC" => encode_logical(ops, 0b00, true),
        "ORN" => encode_logical(ops, 0b01, true),
        "EON" => encode_logical(ops, 0b10, true),
        "BICS" => encode_logical(ops, 0b11, true),
        "TST" => {
            ops.count(&[2, 3])?;
            let rn = ops.general(0)?;
            let list = ops.with_zero_register(0, rn.class);
            encode_logical(ops.rebind(&list), 0b11, false)
        }
        "MVN" => {
            ops.count(&[2, 3])?;
            ops.general(1)?;
            let rd = ops.general(0)?;
            let list = ops.with_zero_register(1, rd.class);
            encode_logical(ops.rebind(&list), 0b01, true)
        }
        "MOV" => encode_mov(ops),
        "MOVN" => encode_move_wide(ops, 0b00),
        "MOVZ" => encode_move_wide(ops, 0b10),
        "MOVK" => encode_move_wide(ops, 0b11),
        "ADR" => encode_pc_relative(ops, address, false),
        "ADRP" => encode_pc_relative(ops, address, true),
        "LSL" => encode_shift_alias(ops, ShiftType::Lsl),
        "LSR" => encode_shift_alias(ops, ShiftType::Lsr),
        "ASR" => encode_shift_alias(ops, ShiftType::Asr),
        "ROR" => encode_shift_alias(ops, ShiftType::Ror),
        "LSLV" => encode_dp2(ops, 0b00_1000),
        "LSRV" => encode_dp2(ops, 0b00_1001),
        "ASRV" => encode_dp2(ops, 0b00_1010),
        "RORV" => encode_dp2(ops, 0b00_1011),
        "UDIV" => encode_dp2(ops, 0b00_0010),
        "SDIV" => encode_dp2(ops, 0b00_0011),
        "SBFM" => encode_bitfield_raw(ops, BFM_SIGNED),
        "BFM" => encode_bitfield_raw(ops, BFM_INSERT),
        "UBFM" => encode_bitfield_raw(ops, BFM_UNSIGNED),
        "SBFX" => encode_bitfield_extract(ops, BFM_SIGNED),
        "BFXIL" => encode_bitfield_extract(ops, BFM_INSERT),
        "UBFX" => encode_bitfield_extract(ops, BFM_UNSIGNED),
        "SBFIZ" => encode_bitfield_insert(ops, BFM_SIGNED),
        "BFI" => encode_bitfield_insert(ops, BFM_INSERT),
        "UBFIZ" => encode_bitfield_insert(ops, BFM_UNSIGNED),
        "SXTB" => encode_extend_alias(ops, BFM_SIGNED, 7),
        "SXTH" => encode_extend_alias(ops, BFM_SIGNED, 15),
        "SXTW" => encode_extend_alias(ops, BFM_SIGNED, 31),
        "UXTB" => encode_extend_alias(ops, BFM_UNSIGNED, 7),
        "UXTH" => encode_extend_alias(ops, BFM_UNSIGNED, 15),
        "EXTR" => encode_extr(ops),
        "CCMN" => encode_cond_compare(ops, false),
        "CCMP" => encode_cond_compare(ops, true),
        "CSEL" => encode_cond_select(ops, false, false),
        "CSINC" => encode_cond_select(ops, false, true),
        "CSINV" => encode_cond_select(ops, true, false),
        "CSNEG" => encode_cond_select(ops, true, true),
        "CSET" | "CSETM" => {
            ops.count(&[2])?;
            let rd = ops.general(0)?;
            let cond = invertible(ops, ops.condition(1)?)?;
            let zero = Operand::Register(zero_register(rd.class));
            let list = [Operand::Register(rd), zero, zero, Operand::Condition(cond)];
            encode_cond_select(ops.rebind(&list), mnemonic == "CSETM", mnemonic == "CSET")
        }
        "CINC" | "CINV" | "CNEG" => {
            ops.count(&[3])?;
            let rd = ops.general(0)?;
            let rn = ops.general(1)?;
            let cond = invertible(ops, ops.condition(2)?)?;
            let list = [
                Operand::Register(rd),
                Operand::Register(rn),
                Operand::Register(rn),
                Operand::Condition(cond),
            ];
            let (invert, increment) = match mnemonic {
                "CINC" => (false, true),
                "CINV" => (true, false),
                _ => (true, true),
            };
            encode_cond_select(ops.rebind(&list), invert, increment)
        }
        "RBIT" => encode_dp1(ops, 0b00_0000),
        "REV16" => encode_dp1(ops, 0b00_0001),
        "REV32" => {
            ops.count(&[2])?;
            if ops.general(0)?.class != RegClass::X {
                return Err(ops.error("REV32 requires 64-bit registers"));
            }
            encode_dp1(ops, 0b00_0010)
        }
        "REV" => {
            ops.count(&[2])?;
            let opcode = if ops.general(0)?.class == RegClass::X {
                0b00_0011
            } else {
                0b00_0010
            };
            encode_dp1(ops, opcode)
        }
        "CLZ" => encode_dp1(ops, 0b00_0100),
        "CLS" => encode_dp1(ops, 0b00_0101),
        "MUL" if ops.is_vector(0) => encode_simd_three_same(ops, SIMD_MUL),
        "MADD" => encode_dp3(ops, Dp3::MADD),
        "MSUB" => encode_dp3(ops, Dp3::MSUB),
        "MUL" | "MNEG" => {
            ops.count(&[3])?;
            let rd = ops.general(0)?;
            let list = ops.with_zero_register(3, rd.class);
            let form = if mnemonic == "MUL" { Dp3::MADD } else { Dp3::MSUB };
            encode_dp3(ops.rebind(&list), form)
        }
        "SMADDL" => encode_dp3(ops, Dp3::SMADDL),
        "SMSUBL" => encode_dp3(ops, Dp3::SMSUBL),
        "UMADDL" => encode_dp3(ops, Dp3::UMADDL),
        "UMSUBL" => encode_dp3(ops, Dp3::UMSUBL),
        "SMULL" | "UMULL" => {
            ops.count(&[3])?;
            let list = ops.with_zero_register(3, RegClass::X);
            let form = if mnemonic == "SMULL" {
                Dp3::SMADDL
            } else {
                Dp3::UMADDL
            };
            encode_dp3(ops.rebind(&list), form)
        }
        "SMULH" | "UMULH" => {
            ops.count(&[3])?;
            let list = ops.with_zero_register(3, RegClass::X);
            let form = if mnemonic == "SMULH" {
                Dp3::SMULH
            } else {
                Dp3::UMULH
            };
            encode_dp3(ops.rebind(&list), form)
        }
        "LDR" | "STR" | "LDRB" | "STRB" | "LDRH" | "STRH" | "LDRSB" | "LDRSH" | "LDRSW"
        | "LDUR" | "STUR" | "LDURB" | "STURB" | "LDURH" | "STURH" => {
            encode_load_store(ops, mnemonic)
        }
        "LDP" | "STP" | "LDPSW" => encode_load_store_pair(ops, mnemonic),
        "FMOV" => encode_fmov(ops),
        "FMUL" => encode_fp2(ops, 0b0000),
        "FDIV" => encode_fp2(ops, 0b0001),
        "FADD" => encode_fp2(ops, 0b0010),
        "FSUB" => encode_fp2(ops, 0b0011),
        "FMAX" => encode_fp2(ops, 0b0100),
        "FMIN" => encode_fp2(ops, 0b0101),
        "FNMUL" => encode_fp2(ops, 0b1000),
        "FABS" => encode_fp1(ops, 0b00_0001),
        "FNEG" => encode_fp1(ops, 0b00_0010),
        "FSQRT" => encode_fp1(ops, 0b00_0011),
        "FCVT" => encode_fcvt(ops),
        "FCMP" => encode_fcmp(ops, false),
        "FCMPE" => encode_fcmp(ops, true),
        "SCVTF" => encode_int_to_fp(ops, 0b010),
        "UCVTF" => encode_int_to_fp(ops, 0b011),
        "FCVTZS" => encode_fp_to_int(ops, 0b000),
        "FCVTZU" => encode_fp_to_int(ops, 0b001),
        "DUP" => encode_dup(ops),
        "INS" => encode_ins(ops),
        "UMOV" => encode_umov(ops),
        "MOVI" => encode_movi(ops),
        "NOP" => encode_hint(ops, 0b000),
        "YIELD" => encode_hint(ops, 0b001),
        "WFE" => encode_hint(ops, 0b010),
        "WFI" => encode_hint(ops, 0b011),
        "SEV" => encode_hint(ops, 0b100),
        "SEVL" => encode_hint(ops, 0b101),
        "SVC" => encode_exception(ops, 0xD400_0001),
        "HVC" => encode_exception(ops, 0xD400_0002),
        "SMC" => encode_exception(ops, 0xD400_0003),
        "BRK" => encode_exception(ops, 0xD420_0000),
        "HLT" => encode_exception(ops, 0xD440_0000),
        other => Err(AsmError::UnknownMnemonic(other.to_owned())),
    }
}

/// Operand list plus the mnemonic used in error messages.
#[derive(Clone, Copy)]
struct Operands<'a> {
    mnemonic: &'a str,
    list: &'a [Operand],
}

impl<'a> Operands<'a> {
    fn rebind<'b>(self, list: &'b [Operand]) -> Operands<'b>
    where
        'a: 'b,
    {
        Operands {
            mnemonic: self.mnemonic,
            list,
        }
    }

    fn error(self, detail: impl Into<String>) -> AsmError {
        AsmError::operands(self.mnemonic, detail)
    }

    fn count(self, allowed: &[usize]) -> Result<(), AsmError> {
        if allowed.contains(&self.list.len()) {
            return Ok(());
        }
        let expected = allowed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        Err(self.error(format!(
            "expected {expected} operands, found {}",
            self.list.len()
        )))
    }

    fn is_vector(self, index: usize) -> bool {
        matches!(self.list.get(index), Some(Operand::Vector { .. }))
    }

    fn general(self, index: usize) -> Result<Reg, AsmError> {
        match self.list.get(index) {
            Some(Operand::Register(reg)) if reg.class.is_general() => Ok(*reg),
            _ => Err(self.error(format!(
                "operand {} must be a general-purpose register",
                index + 1
            ))),
        }
    }

    fn scalar_fp(self, index: usize) -> Result<Reg, AsmError> {
        match self.list.get(index) {
            Some(Operand::Register(reg)) if !reg.class.is_general() => Ok(*reg),
            _ => Err(self.error(format!(
                "operand {} must be a SIMD&FP scalar register",
                index + 1
            ))),
        }
    }

    fn immediate(self, index: usize) -> Result<i64, AsmError> {
        match self.list.get(index) {
            Some(Operand::Immediate(value)) => Ok(*value),
            _ => Err(self.error(format!("operand {} must be an immediate", index + 1))),
        }
    }

    fn condition(self, index: usize) -> Result<Condition, AsmError> {
        match self.list.get(index) {
            Some(Operand::Condition(cond)) => Ok(*cond),
            _ => Err(self.error(format!("operand {} must be a condition code", index + 1))),
        }
    }

    fn vector(self, index: usize) -> Result<(u8, Arrangement), AsmError> {
        match self.list.get(index) {
            Some(Operand::Vector { index, arrangement }) => Ok((*index, *arrangement)),
            _ => Err(self.error(format!(
                "operand {} must be a vector register",
                index + 1
            ))),
        }
    }

    fn element(self, index: usize) -> Result<(u8, u32, u32), AsmError> {
        match self.list.get(index) {
            Some(Operand::Element {
                index,
                esize_log2,
                lane,
            }) => Ok((*index, u32::from(*esize_log2), u32::from(*lane))),
            _ => Err(self.error(format!(
                "operand {} must be a vector element",
                index + 1
            ))),
        }
    }

    fn memory(self, index: usize) -> Result<MemoryOperand, AsmError> {
        match self.list.get(index) {
            Some(Operand::Memory(mem)) => Ok(*mem),
            _ => Err(self.error(format!(
                "operand {} must be a memory operand",
                index + 1
            ))),
        }
    }

    /// Field value for a register slot where 31 means the zero register.
    fn zr_field(self, reg: Reg) -> Result<u32, AsmError> {
        if reg.sp {
            return Err(self.error("SP is not allowed here"));
        }
        Ok(u32::from(reg.index))
    }

    /// Field value for a register slot where 31 means the stack pointer.
    fn sp_field(self, reg: Reg) -> Result<u32, AsmError> {
        if reg.is_zero() {
            return Err(self.error("the zero register is not allowed here"));
        }
        Ok(u32::from(reg.index))
    }

    fn same_width(self, regs: &[Reg]) -> Result<(), AsmError> {
        match regs.split_first() {
            Some((first, rest)) if rest.iter().any(|reg| reg.class != first.class) => {
                Err(self.error("register widths do not match"))
            }
            _ => Ok(()),
        }
    }

    /// Optional trailing `<shift> #amount`.
    fn shift_modifier(
        self,
        index: usize,
        width: u32,
        allow_ror: bool,
    ) -> Result<(u32, u32), AsmError> {
        match self.list.get(index) {
            None => Ok((0, 0)),
            Some(Operand::Shift { kind, amount }) => {
                if *kind == ShiftType::Ror && !allow_ror {
                    return Err(self.error("ROR is not allowed here"));
                }
                let amount = u32::from(*amount);
                if amount >= width {
                    return Err(AsmError::out_of_range(
                        i64::from(amount),
                        format!("shift amount must be 0..={}", width - 1),
                    ));
                }
                Ok((kind.bits(), amount))
            }
            Some(_) => Err(self.error(format!("operand {} must be a shift", index + 1))),
        }
    }

    /// Copy of the list with a zero register of `class` inserted at `at`.
    fn with_zero_register(self, at: usize, class: RegClass) -> Vec<Operand> {
        let mut list = self.list.to_vec();
        list.insert(
            at.min(list.len()),
            Operand::Register(zero_register(class)),
        );
        list
    }
}

const fn zero_register(class: RegClass) -> Reg {
    Reg {
        class,
        index: 31,
        sp: false,
    }
}

const fn sf(reg: Reg) -> u32 {
    matches!(reg.class, RegClass::X) as u32
}

const fn width(reg: Reg) -> u32 {
    if matches!(reg.class, RegClass::X) {
        64
    } else {
        32
    }
}

/// Converts an immediate to an unsigned field, checking `0..=max`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unsigned_field(value: i64, max: u32, what: &str) -> Result<u32, AsmError> {
    if (0..=i64::from(max)).contains(&value) {
        Ok(value as u32)
    } else {
        Err(AsmError::out_of_range(value, format!("{what} must be 0..={max}")))
    }
}

/// Narrows an immediate to `width` bits, accepting sign-extended negatives.
#[allow(clippy::cast_sign_loss)]
fn narrow_immediate(value: i64, width: u32) -> Result<u64, AsmError> {
    let raw = value as u64;
    if width == 64 {
        return Ok(raw);
    }
    let high = raw >> width;
    if high == 0 || high == ones(64 - width) {
        Ok(raw & ones(width))
    } else {
        Err(AsmError::out_of_range(
            value,
            format!("expected a {width}-bit value"),
        ))
    }
}

fn invertible(ops: Operands<'_>, cond: Condition) -> Result<Condition, AsmError> {
    if matches!(cond, Condition::Al | Condition::Nv) {
        return Err(ops.error("condition cannot be AL or NV"));
    }
    Ok(cond.invert())
}

// ---------------------------------------------------------------------------
// Integer arithmetic and logic
// ---------------------------------------------------------------------------

fn encode_add_sub(ops: Operands<'_>, sub: bool, set_flags: bool) -> Result<u32, AsmError> {
    ops.count(&[3, 4])?;
    let rd = ops.general(0)?;
    let rn = ops.general(1)?;
    ops.same_width(&[rd, rn])?;

    match ops.list.get(2) {
        Some(Operand::Immediate(value)) => {
            add_sub_immediate(ops, sub, set_flags, rd, rn, *value)
        }
        Some(Operand::Register(rm)) if rm.class.is_general() => {
            let extended = matches!(ops.list.get(3), Some(Operand::Extend { .. }))
                || rn.sp
                || (rd.sp && !set_flags);
            if extended {
                add_sub_extended(ops, sub, set_flags, rd, rn, *rm)
            } else {
                add_sub_shifted(ops, sub, set_flags, rd, rn, *rm)
            }
        }
        _ => Err(ops.error("operand 3 must be a register or immediate")),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn add_sub_immediate(
    ops: Operands<'_>,
    sub: bool,
    set_flags: bool,
    rd: Reg,
    rn: Reg,
    value: i64,
) -> Result<u32, AsmError> {
    let rd_field = if set_flags {
        ops.zr_field(rd)?
    } else {
        ops.sp_field(rd)?
    };
    let rn_field = ops.sp_field(rn)?;

    let explicit_shift = match ops.list.get(3) {
        None => None,
        Some(Operand::Shift {
            kind: ShiftType::Lsl,
            amount: amount @ (0 | 12),
        }) => Some(*amount == 12),
        Some(_) => return Err(ops.error("immediate shift must be LSL #0 or LSL #12")),
    };

    let (sub, magnitude) = match (value < 0, explicit_shift) {
        (true, None) => (!sub, value.unsigned_abs()),
        (true, Some(_)) => {
            return Err(AsmError::out_of_range(
                value,
                "expected 0..=4095 with an explicit shift",
            ))
        }
        (false, _) => (sub, value as u64),
    };

    let (imm12, shifted) = match explicit_shift {
        Some(shift) if magnitude <= 0xFFF => (magnitude, shift),
        Some(_) => {
            return Err(AsmError::out_of_range(
                value,
                "expected 0..=4095 with an explicit shift",
            ))
        }
        None if magnitude <= 0xFFF => (magnitude, false),
        None if magnitude & 0xFFF == 0 && magnitude >> 12 <= 0xFFF => (magnitude >> 12, true),
        None => {
            return Err(AsmError::out_of_range(
                value,
                "expected a 12-bit value, optionally shifted left by 12",
            ))
        }
    };

    Ok(sf(rd) << 31
        | u32::from(sub) << 30
        | u32::from(set_flags) << 29
        | 0b1_0001 << 24
        | u32::from(shifted) << 22
        | (imm12 as u32) << 10
        | rn_field << 5
        | rd_field)
}

fn add_sub_shifted(
    ops: Operands<'_>,
    sub: bool,
    set_flags: bool,
    rd: Reg,
    rn: Reg,
    rm: Reg,
) -> Result<u32, AsmError> {
    ops.same_width(&[rd, rn, rm])?;
    let (shift, amount) = ops.shift_modifier(3, width(rd), false)?;
    Ok(sf(rd) << 31
        | u32::from(sub) << 30
        | u32::from(set_flags) << 29
        | 0b0_1011 << 24
        | shift << 22
        | ops.zr_field(rm)? << 16
        | amount << 10
        | ops.zr_field(rn)? << 5
        | ops.zr_field(rd)?)
}

fn add_sub_extended(
    ops: Operands<'_>,
    sub: bool,
    set_flags: bool,
    rd: Reg,
    rn: Reg,
    rm: Reg,
) -> Result<u32, AsmError> {
    let rd_field = if set_flags {
        ops.zr_field(rd)?
    } else {
        ops.sp_field(rd)?
    };
    let rn_field = ops.sp_field(rn)?;
    let rm_field = ops.zr_field(rm)?;

    let default = if rd.class == RegClass::X {
        Extend::Uxtx
    } else {
        Extend::Uxtw
    };
    let (extend, amount) = match ops.list.get(3) {
        None => (default, 0),
        Some(Operand::Extend { kind, amount }) => (*kind, amount.unwrap_or(0)),
        Some(Operand::Shift {
            kind: ShiftType::Lsl,
            amount,
        }) => (default, *amount),
        Some(_) => return Err(ops.error("operand 4 must be an extend or LSL")),
    };
    if amount > 4 {
        return Err(AsmError::out_of_range(
            i64::from(amount),
            "extend shift must be 0..=4",
        ));
    }

    let wants_x = rd.class == RegClass::X && matches!(extend, Extend::Uxtx | Extend::Sxtx);
    let rm_ok = if wants_x {
        rm.class == RegClass::X
    } else {
        rm.class == RegClass::W
    };
    if !rm_ok {
        return Err(ops.error("index register width does not match the extend"));
    }

    Ok(sf(rd) << 31
        | u32::from(sub) << 30
        | u32::from(set_flags) << 29
        | 0b0_1011 << 24
        | 1 << 21
        | rm_field << 16
        | extend.bits() << 13
        | u32::from(amount) << 10
        | rn_field << 5
        | rd_field)
}

fn encode_add_sub_carry(ops: Operands<'_>, sub: bool, set_flags: bool) -> Result<u32, AsmError> {
    ops.count(&[3])?;
    let rd = ops.general(0)?;
    let rn = ops.general(1)?;
    let rm = ops.general(2)?;
    ops.same_width(&[rd, rn, rm])?;
    Ok(sf(rd) << 31
        | u32::from(sub) << 30
        | u32::from(set_flags) << 29
        | 0b1101_0000 << 21
        | ops.zr_field(rm)? << 16
        | ops.zr_field(rn)? << 5
        | ops.zr_field(rd)?)
}

#[allow(clippy::cast_sign_loss)]
fn encode_logical(ops: Operands<'_>, opc: u32, invert: bool) -> Result<u32, AsmError> {
    ops.count(&[3, 4])?;
    let rd = ops.general(0)?;
    let rn = ops.general(1)?;
    ops.same_width(&[rd, rn])?;

    match ops.list.get(2) {
        Some(Operand::Immediate(value)) => {
            ops.count(&[3])?;
            let width = width(rd);
            let pattern = narrow_immediate(*value, width)?;
            let pattern = if invert {
                !pattern & ones(width)
            } else {
                pattern
            };
            let (n, immr, imms) = encode_bit_masks(pattern, width)
                .ok_or(AsmError::UnencodableBitmask(*value as u64))?;
            let rd_field = if opc == 0b11 {
                ops.zr_field(rd)?
            } else {
                ops.sp_field(rd)?
            };
            Ok(sf(rd) << 31
                | opc << 29
                | 0b10_0100 << 23
                | u32::from(n) << 22
                | immr << 16
                | imms << 10
                | ops.zr_field(rn)? << 5
                | rd_field)
        }
        Some(Operand::Register(rm)) if rm.class.is_general() => {
            ops.same_width(&[rd, *rm])?;
            let (shift, amount) = ops.shift_modifier(3, width(rd), true)?;
            Ok(sf(rd) << 31
                | opc << 29
                | 0b0_1010 << 24
                | shift << 22
                | u32::from(invert) << 21
                | ops.zr_field(*rm)? << 16
                | amount << 10
                | ops.zr_field(rn)? << 5
                | ops.zr_field(rd)?)
        }
        _ => Err(ops.error("operand 3 must be a register or immediate")),
    }
}

// ---------------------------------------------------------------------------
// Moves and PC-relative addressing
// ---------------------------------------------------------------------------

fn encode_mov(ops: Operands<'_>) -> Result<u32, AsmError> {
    ops.count(&[2])?;
    match (ops.list.first(), ops.list.get(1)) {
        (Some(Operand::Register(rd)), Some(Operand::Immediate(value))) if rd.class.is_general() => {
            mov_immediate(ops, *rd, *value)
        }
        (Some(Operand::Register(rd)), Some(Operand::Register(rn)))
            if rd.class.is_general() && rn.class.is_general() =>
        {
            ops.same_width(&[*rd, *rn])?;
            if rd.sp || rn.sp {
                let list = [
                    Operand::Register(*rd),
                    Operand::Register(*rn),
                    Operand::Immediate(0),
                ];
                return add_sub_immediate(ops.rebind(&list), false, false, *rd, *rn, 0);
            }
            let list = [
                Operand::Register(*rd),
                Operand::Register(zero_register(rd.class)),
                Operand::Register(*rn),
            ];
            encode_logical(ops.rebind(&list), 0b01, false)
        }
        (Some(first @ Operand::Vector { .. }), Some(second @ Operand::Vector { .. })) => {
            let list = [*first, *second, *second];
            encode_simd_three_same(ops.rebind(&list), SIMD_ORR)
        }
        (Some(Operand::Element { .. }), Some(Operand::Register(_))) => encode_ins(ops),
        (Some(Operand::Register(_)), Some(Operand::Element { .. })) => encode_umov(ops),
        _ => Err(ops.error("unsupported operand combination")),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn mov_immediate(ops: Operands<'_>, rd: Reg, value: i64) -> Result<u32, AsmError> {
    let width = width(rd);
    let raw = narrow_immediate(value, width)?;

    if !rd.sp {
        let inverted = !raw & ones(width);
        for hw in 0..width / 16 {
            let chunk = 0xFFFF_u64 << (16 * hw);
            if raw & !chunk == 0 {
                return Ok(move_wide(sf(rd), 0b10, hw, (raw >> (16 * hw)) as u32, rd));
            }
        }
        for hw in 0..width / 16 {
            let chunk = 0xFFFF_u64 << (16 * hw);
            if inverted & !chunk == 0 {
                return Ok(move_wide(
                    sf(rd),
                    0b00,
                    hw,
                    (inverted >> (16 * hw)) as u32 & 0xFFFF,
                    rd,
                ));
            }
        }
    }

    if let Some((n, immr, imms)) = encode_bit_masks(raw, width) {
        return Ok(sf(rd) << 31
            | 0b01 << 29
            | 0b10_0100 << 23
            | u32::from(n) << 22
            | immr << 16
            | imms << 10
            | 31 << 5
            | ops.sp_field(rd)?);
    }

    Err(AsmError::out_of_range(
        value,
        "not encodable as MOVZ, MOVN or a bitmask immediate",
    ))
}

const fn move_wide(sf: u32, opc: u32, hw: u32, imm16: u32, rd: Reg) -> u32 {
    sf << 31 | opc << 29 | 0b10_0101 << 23 | hw << 21 | (imm16 & 0xFFFF) << 5 | rd.index as u32
}

fn encode_move_wide(ops: Operands<'_>, opc: u32) -> Result<u32, AsmError> {
    ops.count(&[2, 3])?;
    let rd = ops.general(0)?;
    ops.zr_field(rd)?;
    let imm16 = unsigned_field(ops.immediate(1)?, 0xFFFF, "immediate")?;
    let hw = match ops.list.get(2) {
        None => 0,
        Some(Operand::Shift {
            kind: ShiftType::Lsl,
            amount,
        }) if u32::from(*amount) % 16 == 0 && u32::from(*amount) < width(rd) => {
            u32::from(*amount) / 16
        }
        Some(_) => {
            return Err(ops.error(format!(
                "shift must be LSL by a multiple of 16 below {}",
                width(rd)
            )))
        }
    };
    Ok(move_wide(sf(rd), opc, hw, imm16, rd))
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
fn encode_pc_relative(ops: Operands<'_>, address: u64, page: bool) -> Result<u32, AsmError> {
    ops.count(&[2])?;
    let rd = ops.general(0)?;
    if rd.class != RegClass::X {
        return Err(ops.error("destination must be a 64-bit register"));
    }
    let rd_field = ops.zr_field(rd)?;
    let target = ops.immediate(1)?;

    let offset = if page {
        ((target as u64 & !0xFFF).wrapping_sub(address & !0xFFF) as i64) >> 12
    } else {
        (target as u64).wrapping_sub(address) as i64
    };
    if !(-(1 << 20)..(1 << 20)).contains(&offset) {
        return Err(AsmError::out_of_range(
            target,
            if page {
                "target page must be within 4GiB of the instruction"
            } else {
                "target must be within 1MiB of the instruction"
            },
        ));
    }

    let imm = offset as u32 & 0x1F_FFFF;
    Ok(u32::from(page) << 31 | (imm & 0b11) << 29 | 0b1_0000 << 24 | (imm >> 2) << 5 | rd_field)
}

// ---------------------------------------------------------------------------
// Shifts, bitfields and extracts
// ---------------------------------------------------------------------------

const BFM_SIGNED: u32 = 0b00;
const BFM_INSERT: u32 = 0b01;
const BFM_UNSIGNED: u32 = 0b10;

const fn bitfield(sf: u32, opc: u32, immr: u32, imms: u32, rn: u32, rd: u32) -> u32 {
    sf << 31 | opc << 29 | 0b10_0110 << 23 | sf << 22 | immr << 16 | imms << 10 | rn << 5 | rd
}

const fn extract(sf: u32, rm: u32, lsb: u32, rn: u32, rd: u32) -> u32 {
    sf << 31 | 0b10_0111 << 23 | sf << 22 | rm << 16 | lsb << 10 | rn << 5 | rd
}

fn bitfield_registers(ops: Operands<'_>) -> Result<(Reg, u32, u32), AsmError> {
    let rd = ops.general(0)?;
    let rn = ops.general(1)?;
    ops.same_width(&[rd, rn])?;
    Ok((rd, ops.zr_field(rn)?, ops.zr_field(rd)?))
}

fn encode_shift_alias(ops: Operands<'_>, kind: ShiftType) -> Result<u32, AsmError> {
    ops.count(&[3])?;
    match ops.list.get(2) {
        Some(Operand::Register(_)) => encode_dp2(ops, 0b00_1000 | kind.bits()),
        Some(Operand::Immediate(value)) => {
            let (rd, rn, rd_field) = bitfield_registers(ops)?;
            let width = width(rd);
            let shift = unsigned_field(*value, width - 1, "shift amount")?;
            let sf = sf(rd);
            Ok(match kind {
                ShiftType::Lsl => bitfield(
                    sf,
                    BFM_UNSIGNED,
                    (width - shift) % width,
                    width - 1 - shift,
                    rn,
                    rd_field,
                ),
                ShiftType::Lsr => bitfield(sf, BFM_UNSIGNED, shift, width - 1, rn, rd_field),
                ShiftType::Asr => bitfield(sf, BFM_SIGNED, shift, width - 1, rn, rd_field),
                ShiftType::Ror => extract(sf, rn, shift, rn, rd_field),
            })
        }
        _ => Err(ops.error("operand 3 must be a register or immediate")),
    }
}

fn encode_bitfield_raw(ops: Operands<'_>, opc: u32) -> Result<u32, AsmError> {
    ops.count(&[4])?;
    let (rd, rn, rd_field) = bitfield_registers(ops)?;
    let limit = width(rd) - 1;
    let immr = unsigned_field(ops.immediate(2)?, limit, "immr")?;
    let imms = unsigned_field(ops.immediate(3)?, limit, "imms")?;
    Ok(bitfield(sf(rd), opc, immr, imms, rn, rd_field))
}

fn lsb_and_width(ops: Operands<'_>, reg_width: u32) -> Result<(u32, u32), AsmError> {
    let lsb = unsigned_field(ops.immediate(2)?, reg_width - 1, "lsb")?;
    let field_width = ops.immediate(3)?;
    let max = reg_width - lsb;
    if !(1..=i64::from(max)).contains(&field_width) {
        return Err(AsmError::out_of_range(
            field_width,
            format!("width must be 1..={max}"),
        ));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok((lsb, field_width as u32))
}

fn encode_bitfield_extract(ops: Operands<'_>, opc: u32) -> Result<u32, AsmError> {
    ops.count(&[4])?;
    let (rd, rn, rd_field) = bitfield_registers(ops)?;
    let (lsb, field_width) = lsb_and_width(ops, width(rd))?;
    Ok(bitfield(sf(rd), opc, lsb, lsb + field_width - 1, rn, rd_field))
}

fn encode_bitfield_insert(ops: Operands<'_>, opc: u32) -> Result<u32, AsmError> {
    ops.count(&[4])?;
    let (rd, rn, rd_field) = bitfield_registers(ops)?;
    let width = width(rd);
    let (lsb, field_width) = lsb_and_width(ops, width)?;
    Ok(bitfield(
        sf(rd),
        opc,
        (width - lsb) % width,
        field_width - 1,
        rn,
        rd_field,
    ))
}

fn encode_extend_alias(ops: Operands<'_>, opc: u32, imms: u32) -> Result<u32, AsmError> {
    ops.count(&[2])?;
    let rd = ops.general(0)?;
    let rn = ops.general(1)?;
    if rn.class != RegClass::W {
        return Err(ops.error("source must be a 32-bit register"));
    }
    let rd_ok = match (opc, imms) {
        (BFM_SIGNED, 31) => rd.class == RegClass::X,
        (BFM_UNSIGNED, _) => rd.class == RegClass::W,
        _ => true,
    };
    if !rd_ok {
        return Err(ops.error("destination width is not valid for this extend"));
    }
    Ok(bitfield(
        sf(rd),
        opc,
        0,
        imms,
        ops.zr_field(rn)?,
        ops.zr_field(rd)?,
    ))
}

fn encode_extr(ops: Operands<'_>) -> Result<u32, AsmError> {
    ops.count(&[4])?;
    let rd = ops.general(0)?;
    let rn = ops.general(1)?;
    let rm = ops.general(2)?;
    ops.same_width(&[rd, rn, rm])?;
    let lsb = unsigned_field(ops.immediate(3)?, width(rd) - 1, "lsb")?;
    Ok(extract(
        sf(rd),
        ops.zr_field(rm)?,
        lsb,
        ops.zr_field(rn)?,
        ops.zr_field(rd)?,
    ))
}

// ---------------------------------------------------------------------------
// Conditional and multi-source data processing
// ---------------------------------------------------------------------------

fn encode_cond_compare(ops: Operands<'_>, sub: bool) -> Result<u32, AsmError> {
    ops.count(&[4])?;
    let rn = ops.general(0)?;
    let (operand, immediate) = match ops.list.get(1) {
        Some(Operand::Register(rm)) if rm.class.is_general() => {
            ops.same_width(&[rn, *rm])?;
            (ops.zr_field(*rm)?, false)
        }
        Some(Operand::Immediate(value)) => (unsigned_field(*value, 31, "immediate")?, true),
        _ => return Err(ops.error("operand 2 must be a register or immediate")),
    };
    let nzcv = unsigned_field(ops.immediate(2)?, 15, "nzcv")?;
    let cond = ops.condition(3)?;
    Ok(sf(rn) << 31
        | u32::from(sub) << 30
        | 1 << 29
        | 0b1101_0010 << 21
        | operand << 16
        | cond.bits() << 12
        | u32::from(immediate) << 11
        | ops.zr_field(rn)? << 5
        | nzcv)
}

fn encode_cond_select(ops: Operands<'_>, invert: bool, increment: bool) -> Result<u32, AsmError> {
    ops.count(&[4])?;
    let rd = ops.general(0)?;
    let rn = ops.general(1)?;
    let rm = ops.general(2)?;
    ops.same_width(&[rd, rn, rm])?;
    let cond = ops.condition(3)?;
    Ok(sf(rd) << 31
        | u32::from(invert) << 30
        | 0b1101_0100 << 21
        | ops.zr_field(rm)? << 16
        | cond.bits() << 12
        | u32::from(increment) << 10
        | ops.zr_field(rn)? << 5
        | ops.zr_field(rd)?)
}

fn encode_dp1(ops: Operands<'_>, opcode: u32) -> Result<u32, AsmError> {
    ops.count(&[2])?;
    let rd = ops.general(0)?;
    let rn = ops.general(1)?;
    ops.same_width(&[rd, rn])?;
    Ok(sf(rd) << 31
        | 1 << 30
        | 0b1101_0110 << 21
        | opcode << 10
        | ops.zr_field(rn)? << 5
        | ops.zr_field(rd)?)
}

fn encode_dp2(ops: Operands<'_>, opcode: u32) -> Result<u32, AsmError> {
    ops.count(&[3])?;
    let rd = ops.general(0)?;
    let rn = ops.general(1)?;
    let rm = ops.general(2)?;
    ops.same_width(&[rd, rn, rm])?;
    Ok(sf(rd) << 31
        | 0b1101_0110 << 21
        | ops.zr_field(rm)? << 16
        | opcode << 10
        | ops.zr_field(rn)? << 5
        | ops.zr_field(rd)?)
}

/// Three-source form: `op31`, `o0` and whether sources are 32-bit.
#[derive(Clone, Copy)]
struct Dp3 {
    op31: u32,
    o0: bool,
    long: bool,
}

impl Dp3 {
    const MADD: Self = Self::new(0b000, false, false);
    const MSUB: Self = Self::new(0b000, true, false);
    const SMADDL: Self = Self::new(0b001, false, true);
    const SMSUBL: Self = Self::new(0b001, true, true);
    const SMULH: Self = Self::new(0b010, false, false);
    const UMADDL: Self = Self::new(0b101, false, true);
    const UMSUBL: Self = Self::new(0b101, true, true);
    const UMULH: Self = Self::new(0b110, false, false);

    const fn new(op31: u32, o0: bool, long: bool) -> Self {
        Self { op31, o0, long }
    }
}

fn encode_dp3(ops: Operands<'_>, form: Dp3) -> Result<u32, AsmError> {
    ops.count(&[4])?;
    let rd = ops.general(0)?;
    let rn = ops.general(1)?;
    let rm = ops.general(2)?;
    let ra = ops.general(3)?;

    if form.long {
        let ok = rd.class == RegClass::X
            && ra.class == RegClass::X
            && rn.class == RegClass::W
            && rm.class == RegClass::W;
        if !ok {
            return Err(ops.error("expected Xd, Wn, Wm, Xa"));
        }
    } else {
        ops.same_width(&[rd, rn, rm, ra])?;
        if form.op31 != 0 && rd.class != RegClass::X {
            return Err(ops.error("requires 64-bit registers"));
        }
    }

    Ok(sf(rd) << 31
        | 0b1_1011 << 24
        | form.op31 << 21
        | ops.zr_field(rm)? << 16
        | u32::from(form.o0) << 15
        | ops.zr_field(ra)? << 10
        | ops.zr_field(rn)? << 5
        | ops.zr_field(rd)?)
}

// ---------------------------------------------------------------------------
// Loads and stores
// ---------------------------------------------------------------------------

/// Size, opc and V fields for a single-register transfer.
struct Transfer {
    size: u32,
    opc: u32,
    vector: bool,
    log2: u32,
    unscaled_only: bool,
}

fn transfer_for(ops: Operands<'_>, mnemonic: &str, rt: Reg) -> Result<Transfer, AsmError> {
    let unscaled_only = mnemonic.starts_with("LDUR") || mnemonic.starts_with("STUR");
    let load = mnemonic.starts_with("LD");
    let base = mnemonic
        .trim_start_matches("LDUR")
        .trim_start_matches("STUR")
        .trim_start_matches("LDR")
        .trim_start_matches("STR");

    let general = |size: u32, opc: u32| Transfer {
        size,
        opc,
        vector: false,
        log2: size,
        unscaled_only,
    };

    let transfer = match (base, rt.class) {
        ("", RegClass::X) => general(3, u32::from(load)),
        ("", RegClass::W) => general(2, u32::from(load)),
        ("", RegClass::Q) => Transfer {
            size: 0,
            opc: 0b10 | u32::from(load),
            vector: true,
            log2: 4,
            unscaled_only,
        },
        ("", class) => Transfer {
            size: class.size_log2(),
            opc: u32::from(load),
            vector: true,
            log2: class.size_log2(),
            unscaled_only,
        },
        ("B", RegClass::W) => general(0, u32::from(load)),
        ("H", RegClass::W) => general(1, u32::from(load)),
        ("SB", RegClass::X) => general(0, 0b10),
        ("SB", RegClass::W) => general(0, 0b11),
        ("SH", RegClass::X) => general(1, 0b10),
        ("SH", RegClass::W) => general(1, 0b11),
        ("SW", RegClass::X) => general(2, 0b10),
        _ => return Err(ops.error("transfer register has the wrong width")),
    };
    if rt.sp {
        return Err(ops.error("SP cannot be transferred"));
    }
    Ok(transfer)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn encode_load_store(ops: Operands<'_>, mnemonic: &str) -> Result<u32, AsmError> {
    ops.count(&[2, 3])?;
    let rt = match ops.list.first() {
        Some(Operand::Register(reg)) => *reg,
        _ => return Err(ops.error("operand 1 must be a register")),
    };
    let transfer = transfer_for(ops, mnemonic, rt)?;
    let mem = ops.memory(1)?;
    let rn = ops.sp_field(mem.base)?;
    let fixed = transfer.size << 30 | 0b111 << 27 | u32::from(transfer.vector) << 26;
    let head = fixed | transfer.opc << 22 | rn << 5 | u32::from(rt.index);

    let imm9 = |value: i64, mode: u32| -> Result<u32, AsmError> {
        if !(-256..=255).contains(&value) {
            return Err(AsmError::out_of_range(value, "expected -256..=255"));
        }
        Ok(head | ((value as u32) & 0x1FF) << 12 | mode << 10)
    };

    if let Some(post) = ops.list.get(2) {
        let Operand::Immediate(value) = post else {
            return Err(ops.error("post-index offset must be an immediate"));
        };
        if mem.pre_index || mem.offset != MemoryOffset::None || transfer.unscaled_only {
            return Err(ops.error("post-index needs a plain [Xn] base"));
        }
        return imm9(*value, 0b01);
    }

    if mem.pre_index {
        if transfer.unscaled_only {
            return Err(ops.error("writeback is not available for unscaled forms"));
        }
        return match mem.offset {
            MemoryOffset::None => imm9(0, 0b11),
            MemoryOffset::Immediate(value) => imm9(value, 0b11),
            MemoryOffset::Register { .. } => Err(ops.error("pre-index needs an immediate offset")),
        };
    }

    match mem.offset {
        MemoryOffset::None => Ok(head | 0b01 << 24),
        MemoryOffset::Immediate(value) if transfer.unscaled_only => imm9(value, 0b00),
        MemoryOffset::Immediate(value) => {
            let scale = 1i64 << transfer.log2;
            if value >= 0 && value % scale == 0 && value / scale <= 0xFFF {
                Ok(head | 0b01 << 24 | ((value / scale) as u32) << 10)
            } else if (-256..=255).contains(&value) {
                imm9(value, 0b00)
            } else {
                Err(AsmError::out_of_range(
                    value,
                    format!(
                        "expected a multiple of {scale} in 0..={} or -256..=255",
                        0xFFF * scale
                    ),
                ))
            }
        }
        MemoryOffset::Register { rm, extend, amount } => {
            if transfer.unscaled_only {
                return Err(ops.error("register offsets are not available for unscaled forms"));
            }
            let rm_ok = match extend {
                Extend::Uxtw | Extend::Sxtw => rm.class == RegClass::W,
                Extend::Uxtx | Extend::Sxtx => rm.class == RegClass::X,
                _ => false,
            };
            if !rm_ok {
                return Err(ops.error("index register does not match the extend"));
            }
            let scaled = match amount {
                None => false,
                Some(a) if u32::from(a) == transfer.log2 => true,
                Some(0) => false,
                Some(a) => {
                    return Err(AsmError::out_of_range(
                        i64::from(a),
                        format!("index shift must be 0 or {}", transfer.log2),
                    ))
                }
            };
            Ok(head
                | 1 << 21
                | ops.zr_field(rm)? << 16
                | extend.bits() << 13
                | u32::from(scaled) << 12
                | 0b10 << 10)
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn encode_load_store_pair(ops: Operands<'_>, mnemonic: &str) -> Result<u32, AsmError> {
    ops.count(&[3, 4])?;
    let (rt, rt2) = match (ops.list.first(), ops.list.get(1)) {
        (Some(Operand::Register(a)), Some(Operand::Register(b))) => (*a, *b),
        _ => return Err(ops.error("operands 1 and 2 must be registers")),
    };
    ops.same_width(&[rt, rt2])?;
    if rt.sp || rt2.sp {
        return Err(ops.error("SP cannot be transferred"));
    }
    let load = mnemonic != "STP";

    let (opc, vector, log2) = match (mnemonic, rt.class) {
        ("LDPSW", RegClass::X) => (0b01, false, 2),
        ("LDPSW", _) => return Err(ops.error("LDPSW requires 64-bit registers")),
        (_, RegClass::W) => (0b00, false, 2),
        (_, RegClass::X) => (0b10, false, 3),
        (_, RegClass::S) => (0b00, true, 2),
        (_, RegClass::D) => (0b01, true, 3),
        (_, RegClass::Q) => (0b10, true, 4),
        _ => return Err(ops.error("pair registers must be W, X, S, D or Q")),
    };

    let mem = ops.memory(2)?;
    let (offset, mode) = match (ops.list.get(3), mem.offset, mem.pre_index) {
        (Some(Operand::Immediate(value)), MemoryOffset::None, false) => (*value, 0b001),
        (Some(_), _, _) => return Err(ops.error("post-index needs a plain [Xn] base and an immediate")),
        (None, MemoryOffset::None, pre) => (0, if pre { 0b011 } else { 0b010 }),
        (None, MemoryOffset::Immediate(value), pre) => (value, if pre { 0b011 } else { 0b010 }),
        (None, MemoryOffset::Register { .. }, _) => {
            return Err(ops.error("pairs do not take a register offset"))
        }
    };

    let scale = 1i64 << log2;
    if offset % scale != 0 || !(-64..=63).contains(&(offset / scale)) {
        return Err(AsmError::out_of_range(
            offset,
            format!("expected a multiple of {scale} in {}..={}", -64 * scale, 63 * scale),
        ));
    }
    let imm7 = ((offset / scale) as u32) & 0x7F;

    Ok(opc << 30
        | 0b101 << 27
        | u32::from(vector) << 26
        | mode << 23
        | u32::from(load) << 22
        | imm7 << 15
        | u32::from(rt2.index) << 10
        | ops.sp_field(mem.base)? << 5
        | u32::from(rt.index))
}

// ---------------------------------------------------------------------------
// Scalar floating point
// ---------------------------------------------------------------------------

fn fp_type(ops: Operands<'_>, reg: Reg) -> Result<u32, AsmError> {
    match reg.class {
        RegClass::S => Ok(0b00),
        RegClass::D => Ok(0b01),
        RegClass::H => Ok(0b11),
        _ => Err(ops.error("expected an H, S or D register")),
    }
}

fn encode_fp1(ops: Operands<'_>, opcode: u32) -> Result<u32, AsmError> {
    ops.count(&[2])?;
    let rd = ops.scalar_fp(0)?;
    let rn = ops.scalar_fp(1)?;
    ops.same_width(&[rd, rn])?;
    Ok(fp1(fp_type(ops, rd)?, opcode, rn, rd))
}

fn fp1(ftype: u32, opcode: u32, rn: Reg, rd: Reg) -> u32 {
    0x1E20_4000 | ftype << 22 | opcode << 15 | u32::from(rn.index) << 5 | u32::from(rd.index)
}

fn encode_fp2(ops: Operands<'_>, opcode: u32) -> Result<u32, AsmError> {
    ops.count(&[3])?;
    let rd = ops.scalar_fp(0)?;
    let rn = ops.scalar_fp(1)?;
    let rm = ops.scalar_fp(2)?;
    ops.same_width(&[rd, rn, rm])?;
    Ok(0x1E20_0800
        | fp_type(ops, rd)? << 22
        | u32::from(rm.index) << 16
        | opcode << 12
        | u32::from(rn.index) << 5
        | u32::from(rd.index))
}

fn encode_fcvt(ops: Operands<'_>) -> Result<u32, AsmError> {
    ops.count(&[2])?;
    let rd = ops.scalar_fp(0)?;
    let rn = ops.scalar_fp(1)?;
    let source = fp_type(ops, rn)?;
    let target = fp_type(ops, rd)?;
    if source == target {
        return Err(ops.error("source and destination precision must differ"));
    }
    Ok(fp1(source, 0b00_0100 | target, rn, rd))
}

fn encode_fcmp(ops: Operands<'_>, signalling: bool) -> Result<u32, AsmError> {
    ops.count(&[2])?;
    let rn = ops.scalar_fp(0)?;
    let ftype = fp_type(ops, rn)?;
    let (rm, with_zero) = match ops.list.get(1) {
        Some(Operand::Register(rm)) if !rm.class.is_general() => {
            ops.same_width(&[rn, *rm])?;
            (u32::from(rm.index), false)
        }
        Some(Operand::Immediate(0)) => (0, true),
        Some(Operand::Float(value)) if *value == 0.0 => (0, true),
        _ => return Err(ops.error("second operand must be a register or #0.0")),
    };
    Ok(0x1E20_2000
        | ftype << 22
        | rm << 16
        | u32::from(rn.index) << 5
        | u32::from(signalling) << 4
        | u32::from(with_zero) << 3)
}

fn encode_fmov(ops: Operands<'_>) -> Result<u32, AsmError> {
    ops.count(&[2])?;
    let (rd, source) = match (ops.list.first(), ops.list.get(1)) {
        (Some(Operand::Register(rd)), Some(source)) => (*rd, *source),
        _ => return Err(ops.error("operand 1 must be a register")),
    };

    match source {
        Operand::Register(rn) if rd.class.is_general() && !rn.class.is_general() => {
            fp_general_move(ops, rd, rn, 0b110)
        }
        Operand::Register(rn) if !rd.class.is_general() && rn.class.is_general() => {
            fp_general_move(ops, rn, rd, 0b111)
        }
        Operand::Register(rn) if !rd.class.is_general() => {
            ops.same_width(&[rd, rn])?;
            Ok(fp1(fp_type(ops, rd)?, 0, rn, rd))
        }
        Operand::Float(_) | Operand::Immediate(_) if !rd.class.is_general() => {
            #[allow(clippy::cast_precision_loss)]
            let value = match source {
                Operand::Float(value) => value,
                Operand::Immediate(value) => value as f64,
                _ => 0.0,
            };
            let imm8 = fp_imm8_for(value)
                .ok_or_else(|| AsmError::UnencodableFloat(value.to_string()))?;
            Ok(0x1E20_1000
                | fp_type(ops, rd)? << 22
                | u32::from(imm8) << 13
                | u32::from(rd.index))
        }
        _ => Err(ops.error("unsupported operand combination")),
    }
}

/// `FMOV` between a general register and an FP register.
fn fp_general_move(ops: Operands<'_>, general: Reg, fp: Reg, opcode: u32) -> Result<u32, AsmError> {
    let ftype = fp_type(ops, fp)?;
    let legal = matches!(
        (general.class, fp.class),
        (RegClass::W, RegClass::S | RegClass::H) | (RegClass::X, RegClass::D | RegClass::H)
    );
    if !legal {
        return Err(ops.error("register widths do not match"));
    }
    let (rd, rn) = if opcode == 0b110 {
        (ops.zr_field(general)?, u32::from(fp.index))
    } else {
        (u32::from(fp.index), ops.zr_field(general)?)
    };
    Ok(fp_convert(sf(general), ftype, 0b00, opcode, rn, rd))
}

const fn fp_convert(sf: u32, ftype: u32, rmode: u32, opcode: u32, rn: u32, rd: u32) -> u32 {
    sf << 31 | 0x1E20_0000 | ftype << 22 | rmode << 19 | opcode << 16 | rn << 5 | rd
}

fn encode_int_to_fp(ops: Operands<'_>, opcode: u32) -> Result<u32, AsmError> {
    ops.count(&[2])?;
    let rd = ops.scalar_fp(0)?;
    let rn = ops.general(1)?;
    Ok(fp_convert(
        sf(rn),
        fp_type(ops, rd)?,
        0b00,
        opcode,
        ops.zr_field(rn)?,
        u32::from(rd.index),
    ))
}

fn encode_fp_to_int(ops: Operands<'_>, opcode: u32) -> Result<u32, AsmError> {
    ops.count(&[2])?;
    let rd = ops.general(0)?;
    let rn = ops.scalar_fp(1)?;
    Ok(fp_convert(
        sf(rd),
        fp_type(ops, rn)?,
        0b11,
        opcode,
        u32::from(rn.index),
        ops.zr_field(rd)?,
    ))
}

// ---------------------------------------------------------------------------
// Advanced SIMD
// ---------------------------------------------------------------------------

/// Three-same vector form: `U`, `opcode` and an optional fixed `size`.
#[derive(Clone, Copy)]
struct SimdForm {
    u: bool,
    opcode: u32,
    size: Option<u32>,
}

const SIMD_ADD: SimdForm = SimdForm {
    u: false,
    opcode: 0b1_0000,
    size: None,
};
const SIMD_SUB: SimdForm = SimdForm {
    u: true,
    opcode: 0b1_0000,
    size: None,
};
const SIMD_MUL: SimdForm = SimdForm {
    u: false,
    opcode: 0b1_0011,
    size: None,
};
const SIMD_AND: SimdForm = SimdForm {
    u: false,
    opcode: 0b0_0011,
    size: Some(0b00),
};
const SIMD_BIC: SimdForm = SimdForm {
    u: false,
    opcode: 0b0_0011,
    size: Some(0b01),
};
const SIMD_ORR: SimdForm = SimdForm {
    u: false,
    opcode: 0b0_0011,
    size: Some(0b10),
};
const SIMD_ORN: SimdForm = SimdForm {
    u: false,
    opcode: 0b0_0011,
    size: Some(0b11),
};
const SIMD_EOR: SimdForm = SimdForm {
    u: true,
    opcode: 0b0_0011,
    size: Some(0b00),
};

fn encode_simd_three_same(ops: Operands<'_>, form: SimdForm) -> Result<u32, AsmError> {
    ops.count(&[3])?;
    let (rd, arrangement) = ops.vector(0)?;
    let (rn, rn_arrangement) = ops.vector(1)?;
    let (rm, rm_arrangement) = ops.vector(2)?;
    if rn_arrangement != arrangement || rm_arrangement != arrangement {
        return Err(ops.error("arrangements do not match"));
    }

    let size = match form.size {
        Some(size) => {
            if arrangement.size() != 0 {
                return Err(ops.error("bitwise operations take 8B or 16B"));
            }
            size
        }
        None => {
            let size = arrangement.size();
            if size == 3 && (form.opcode == SIMD_MUL.opcode || !arrangement.q()) {
                return Err(ops.error("arrangement is not valid for this operation"));
            }
            size
        }
    };

    Ok(u32::from(arrangement.q()) << 30
        | u32::from(form.u) << 29
        | 0x0E20_0400
        | size << 22
        | u32::from(rm) << 16
        | form.opcode << 11
        | u32::from(rn) << 5
        | u32::from(rd))
}

const fn element_imm5(esize_log2: u32, lane: u32) -> u32 {
    (lane << (esize_log2 + 1)) | (1 << esize_log2)
}

fn encode_dup(ops: Operands<'_>) -> Result<u32, AsmError> {
    ops.count(&[2])?;
    let (rd, arrangement) = ops.vector(0)?;
    let rn = ops.general(1)?;
    let size = arrangement.size();
    if size == 3 && !arrangement.q() {
        return Err(ops.error("1D is not a valid DUP arrangement"));
    }
    let expected = if size == 3 { RegClass::X } else { RegClass::W };
    if rn.class != expected {
        return Err(ops.error("source register width does not match the element size"));
    }
    Ok(u32::from(arrangement.q()) << 30
        | 0x0E00_0C00
        | element_imm5(size, 0) << 16
        | ops.zr_field(rn)? << 5
        | u32::from(rd))
}

fn encode_ins(ops: Operands<'_>) -> Result<u32, AsmError> {
    ops.count(&[2])?;
    let (rd, esize_log2, lane) = ops.element(0)?;
    let rn = ops.general(1)?;
    let expected = if esize_log2 == 3 {
        RegClass::X
    } else {
        RegClass::W
    };
    if rn.class != expected {
        return Err(ops.error("source register width does not match the element size"));
    }
    Ok(0x4E00_1C00
        | element_imm5(esize_log2, lane) << 16
        | ops.zr_field(rn)? << 5
        | u32::from(rd))
}

fn encode_umov(ops: Operands<'_>) -> Result<u32, AsmError> {
    ops.count(&[2])?;
    let rd = ops.general(0)?;
    let (rn, esize_log2, lane) = ops.element(1)?;
    let q = esize_log2 == 3;
    let expected = if q { RegClass::X } else { RegClass::W };
    if rd.class != expected {
        return Err(ops.error("destination register width does not match the element size"));
    }
    Ok(u32::from(q) << 30
        | 0x0E00_3C00
        | element_imm5(esize_log2, lane) << 16
        | u32::from(rn) << 5
        | ops.zr_field(rd)?)
}

#[allow(clippy::cast_sign_loss)]
fn encode_movi(ops: Operands<'_>) -> Result<u32, AsmError> {
    ops.count(&[2, 3])?;
    if let Some(extra) = ops.list.get(2) {
        if *extra
            != (Operand::Shift {
                kind: ShiftType::Lsl,
                amount: 0,
            })
        {
            return Err(ops.error("only LSL #0 is supported"));
        }
    }
    let value = ops.immediate(1)?;

    let (q, op, rd, imm8) = match ops.list.first() {
        Some(Operand::Vector { index, arrangement }) if arrangement.size() == 0 => {
            let imm8 = unsigned_field(value, 0xFF, "immediate")?;
            (arrangement.q(), false, *index, imm8)
        }
        Some(Operand::Vector {
            index,
            arrangement: Arrangement::D2,
        }) => (true, true, *index, byte_mask_imm8(value as u64)?),
        Some(Operand::Register(reg)) if reg.class == RegClass::D => {
            (false, true, reg.index, byte_mask_imm8(value as u64)?)
        }
        _ => return Err(ops.error("destination must be Vd.8B, Vd.16B, Vd.2D or Dd")),
    };

    Ok(u32::from(q) << 30
        | u32::from(op) << 29
        | 0x0F00_0400
        | (imm8 >> 5) << 16
        | 0b1110 << 12
        | (imm8 & 0x1F) << 5
        | u32::from(rd))
}

/// Packs a 64-bit value whose bytes are all `0x00` or `0xFF` into one bit per byte.
fn byte_mask_imm8(value: u64) -> Result<u32, AsmError> {
    (0..8).try_fold(0u32, |acc, i| match (value >> (i * 8)) & 0xFF {
        0x00 => Ok(acc),
        0xFF => Ok(acc | 1 << i),
        #[allow(clippy::cast_possible_wrap)]
        _ => Err(AsmError::out_of_range(
            value as i64,
            "each byte must be 0x00 or 0xFF",
        )),
    })
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

fn encode_hint(ops: Operands<'_>, op2: u32) -> Result<u32, AsmError> {
    ops.count(&[0])?;
    Ok(0xD503_201F | op2 << 5)
}

fn encode_exception(ops: Operands<'_>, base: u32) -> Result<u32, AsmError> {
    ops.count(&[0, 1])?;
    let imm16 = match ops.list.first() {
        None => 0,
        Some(_) => unsigned_field(ops.immediate(0)?, 0xFFFF, "immediate")?,
    };
    Ok(base | imm16 << 5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;
    use rstest::rstest;

    fn assemble(source: &str) -> Result<u32, AsmError> {
        encode(&parse_line(source)?, 0x1000)
    }

    #[rstest]
    #[case("add x0, x1, #1", 0x9100_0420)]
    #[case("add x0, x1, #1, lsl #12", 0x9140_0420)]
    #[case("add x0, x1, #0x1000", 0x9140_0420)]
    #[case("add w0, w0, #1", 0x1100_0400)]
    #[case("sub x0, x1, #-1", 0x9100_0420)]
    #[case("add x0, x1, x2", 0x8B02_0020)]
    #[case("add x0, sp, x2", 0x8B22_63E0)]
    #[case("add sp, sp, #16", 0x9100_43FF)]
    #[case("cmp x1, x2", 0xEB02_003F)]
    #[case("cmp x1, #-1", 0xB100_043F)]
    #[case("neg x0, x1", 0xCB01_03E0)]
    #[case("adc x0, x1, x2", 0x9A02_0020)]
    #[case("ngc w0, w1", 0x5A01_03E0)]
    fn arithmetic(#[case] source: &str, #[case] expected: u32) {
        assert_eq!(assemble(source), Ok(expected), "{source}");
    }

    #[rstest]
    #[case("and x0, x1, #0xff", 0x9240_1C20)]
    #[case("orr w0, w1, #0xffff0000", 0x3210_3C20)]
    #[case("eor x0, x1, x2, lsl #4", 0xCA02_1020)]
    #[case("mvn x0, x1", 0xAA21_03E0)]
    #[case("tst x1, #1", 0xF240_003F)]
    #[case("bic x0, x1, x2", 0x8A22_0020)]
    fn logical(#[case] source: &str, #[case] expected: u32) {
        assert_eq!(assemble(source), Ok(expected), "{source}");
    }

    #[rstest]
    #[case("mov x0, #42", 0xD280_0540)]
    #[case("mov x0, #0x10000", 0xD2A0_0020)]
    #[case("mov x0, #-1", 0x9280_0000)]
    #[case("mov w0, #-1", 0x1280_0000)]
    #[case("mov x0, #0x5555555555555555", 0xB200_F3E0)]
    #[case("mov x1, x0", 0xAA00_03E1)]
    #[case("mov x29, sp", 0x9100_03FD)]
    #[case("movk x0, #0xbeef, lsl #16", 0xF2B7_DDE0)]
    fn moves(#[case] source: &str, #[case] expected: u32) {
        assert_eq!(assemble(source), Ok(expected), "{source}");
    }

    #[rstest]
    #[case("lsl x0, x1, #4", 0xD37C_EC20)]
    #[case("lsr x0, x1, #4", 0xD344_FC20)]
    #[case("asr w0, w1, #31", 0x131F_7C20)]
    #[case("ror x0, x1, #8", 0x93C1_2020)]
    #[case("lsl x0, x1, x2", 0x9AC2_2020)]
    #[case("ubfx x0, x1, #4, #8", 0xD344_2C20)]
    #[case("sxtw x0, w1", 0x9340_7C20)]
    #[case("uxtb w0, w1", 0x5300_1C20)]
    fn shifts_and_bitfields(#[case] source: &str, #[case] expected: u32) {
        assert_eq!(assemble(source), Ok(expected), "{source}");
    }

    #[rstest]
    #[case("csel x0, x1, x2, lt", 0x9A82_B020)]
    #[case("cset w0, eq", 0x1A9F_17E0)]
    #[case("cinc x0, x1, ne", 0x9A81_0420)]
    #[case("ccmp x1, #3, #4, ne", 0xFA43_1824)]
    #[case("udiv x0, x1, x2", 0x9AC2_0820)]
    #[case("madd x0, x1, x2, x3", 0x9B02_0C20)]
    #[case("mul x0, x1, x2", 0x9B02_7C20)]
    #[case("umull x0, w1, w2", 0x9BA2_7C20)]
    #[case("clz x0, x1", 0xDAC0_1020)]
    #[case("rev w0, w1", 0x5AC0_0820)]
    fn conditional_and_multiply(#[case] source: &str, #[case] expected: u32) {
        assert_eq!(assemble(source), Ok(expected), "{source}");
    }

    #[rstest]
    #[case("str x0, [x1]", 0xF900_0020)]
    #[case("ldr w2, [x1]", 0xB940_0022)]
    #[case("ldr x0, [x1, #8]", 0xF940_0420)]
    #[case("ldr x0, [x1, #-8]", 0xF85F_8020)]
    #[case("ldr x0, [x1], #8", 0xF840_8420)]
    #[case("str x0, [sp, #-16]!", 0xF81F_0FE0)]
    #[case("ldrb w0, [x1, x2]", 0x3862_6820)]
    #[case("ldr x0, [x1, x2, lsl #3]", 0xF862_7820)]
    #[case("ldrsb x0, [x1]", 0x3980_0020)]
    #[case("ldur x0, [x1, #1]", 0xF840_1020)]
    #[case("stp x29, x30, [sp, #-16]!", 0xA9BF_7BFD)]
    #[case("ldp x29, x30, [sp], #16", 0xA8C1_7BFD)]
    #[case("ldr q0, [x1]", 0x3DC0_0020)]
    fn loads_and_stores(#[case] source: &str, #[case] expected: u32) {
        assert_eq!(assemble(source), Ok(expected), "{source}");
    }

    #[rstest]
    #[case("fadd d0, d1, d2", 0x1E62_2820)]
    #[case("fmov d0, #1.0", 0x1E6E_1000)]
    #[case("fmov s0, #-1.5", 0x1E3F_1000)]
    #[case("fmov x0, d1", 0x9E66_0020)]
    #[case("fmov d0, x1", 0x9E67_0020)]
    #[case("fcvtzs x0, d0", 0x9E78_0000)]
    #[case("scvtf d0, x1", 0x9E62_0020)]
    #[case("fcmp d0, #0.0", 0x1E60_2008)]
    #[case("fcvt d0, s1", 0x1E22_C020)]
    #[case("fsqrt s0, s1", 0x1E21_C020)]
    fn floating_point(#[case] source: &str, #[case] expected: u32) {
        assert_eq!(assemble(source), Ok(expected), "{source}");
    }

    #[rstest]
    #[case("add v0.4s, v1.4s, v2.4s", 0x4EA2_8420)]
    #[case("eor v0.16b, v1.16b, v2.16b", 0x6E22_1C20)]
    #[case("mov v0.16b, v1.16b", 0x4EA1_1C20)]
    #[case("dup v0.4s, w1", 0x4E04_0C20)]
    #[case("ins v0.s[1], w1", 0x4E0C_1C20)]
    #[case("umov w0, v1.s[1]", 0x0E0C_3C20)]
    #[case("mov x0, v1.d[1]", 0x4E18_3C20)]
    #[case("movi v0.16b, #0xff", 0x4F07_E7E0)]
    fn vectors(#[case] source: &str, #[case] expected: u32) {
        assert_eq!(assemble(source), Ok(expected), "{source}");
    }

    #[rstest]
    #[case("nop", 0xD503_201F)]
    #[case("yield", 0xD503_203F)]
    #[case("svc #0", 0xD400_0001)]
    #[case("brk #1", 0xD420_0020)]
    fn system(#[case] source: &str, #[case] expected: u32) {
        assert_eq!(assemble(source), Ok(expected), "{source}");
    }

    #[test]
    fn adr_targets_are_absolute() {
        let parsed = parse_line("adr x0, #0x1010").expect("parse");
        assert_eq!(encode(&parsed, 0x1000), Ok(0x1000_0080));
        let parsed = parse_line("adrp x0, #0x3000").expect("parse");
        assert_eq!(encode(&parsed, 0x1000), Ok(0xD000_0000));
    }

    #[rstest]
    #[case("add x0, x1, #4097")]
    #[case("and x0, x1, #0")]
    #[case("and x0, x1, #0x1234")]
    #[case("ldr x0, [x1, #300]!")]
    #[case("movz x0, #0x10000")]
    #[case("lsl w0, w1, #32")]
    #[case("fmov d0, #0.1")]
    #[case("cset x0, al")]
    fn unencodable_operands_are_rejected(#[case] source: &str) {
        assert!(assemble(source).is_err(), "{source}");
    }

    #[rstest]
    #[case("add x0, w1, x2")]
    #[case("add x0, x1")]
    #[case("ldrb x0, [x1]")]
    #[case("mov x0, d1")]
    #[case("fadd d0, s1, d2")]
    #[case("sxtw w0, w1")]
    fn mismatched_operands_are_invalid(#[case] source: &str) {
        assert!(
            matches!(assemble(source), Err(AsmError::InvalidOperands { .. })),
            "{source}"
        );
    }
}
