//! A64 instruction decoder.
//!
//! Splits a 32-bit instruction word into a [`DecodedInstruction`] with every
//! field extracted and validated. Unallocated encodings fault with
//! [`FaultCode::UnallocatedEncoding`]; allocated encodings outside the
//! emulated subset fault with [`FaultCode::UnsupportedEncoding`].

#![allow(missing_docs)]

use crate::encoding::{bit, bits, decode_bit_masks, sign_extend, Condition, Extend, ShiftType};
use crate::fault::FaultCode;

/// Result of decoding one instruction word.
pub type DecodedOrFault = Result<DecodedInstruction, FaultCode>;

/// Logical operation selected by `opc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Orr,
    Eor,
    Ands,
}

impl LogicalOp {
    const fn from_bits(opc: u32) -> Self {
        match opc & 0b11 {
            0b00 => Self::And,
            0b01 => Self::Orr,
            0b10 => Self::Eor,
            _ => Self::Ands,
        }
    }
}

/// Move-wide variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveWideOp {
    Movn,
    Movz,
    Movk,
}

/// Bitfield-move variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitfieldOp {
    Sbfm,
    Bfm,
    Ubfm,
}

/// Conditional-select variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CondSelectOp {
    Csel,
    Csinc,
    Csinv,
    Csneg,
}

/// Two-source data-processing variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataProc2Op {
    Udiv,
    Sdiv,
    Lslv,
    Lsrv,
    Asrv,
    Rorv,
}

/// One-source data-processing variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataProc1Op {
    Rbit,
    Rev16,
    Rev32,
    Rev,
    Clz,
    Cls,
}

/// Three-source data-processing variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataProc3Op {
    Madd,
    Msub,
    Smaddl,
    Smsubl,
    Umaddl,
    Umsubl,
    Smulh,
    Umulh,
}

/// Second operand of a conditional compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CondCompareOperand {
    Register(u8),
    Immediate(u8),
}

/// Register class and extension behaviour of a single-register load/store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKind {
    /// Store from a general register.
    Store,
    /// Load into a general register, zero-extended.
    Load,
    /// Load into a general register, sign-extended to 32 or 64 bits.
    LoadSigned { to_64: bool },
    /// Store from a SIMD/FP register.
    StoreVector,
    /// Load into a SIMD/FP register (upper bits cleared).
    LoadVector,
}

impl TransferKind {
    /// Returns `true` for any store variant.
    #[must_use]
    pub const fn is_store(self) -> bool {
        matches!(self, Self::Store | Self::StoreVector)
    }
}

/// Effective-address form of a load/store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Addressing {
    /// `[Xn, #imm]` with the offset already scaled.
    Offset(i64),
    /// `[Xn, #imm]!`
    PreIndex(i64),
    /// `[Xn], #imm`
    PostIndex(i64),
    /// `[Xn, Rm{, extend #amount}]`
    Register { rm: u8, extend: Extend, shift: u8 },
}

/// Floating-point precision selected by the `ftype` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FpType {
    Single,
    Double,
    Half,
}

impl FpType {
    const fn from_bits(ftype: u32) -> Result<Self, FaultCode> {
        match ftype & 0b11 {
            0b00 => Ok(Self::Single),
            0b01 => Ok(Self::Double),
            0b11 => Ok(Self::Half),
            _ => Err(FaultCode::UnallocatedEncoding),
        }
    }

    /// Width in bits.
    #[must_use]
    pub const fn width(self) -> u32 {
        match self {
            Self::Single => 32,
            Self::Double => 64,
            Self::Half => 16,
        }
    }
}

/// Scalar floating-point two-source operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FpOp2 {
    Mul,
    Div,
    Add,
    Sub,
    Max,
    Min,
    Nmul,
}

/// Scalar floating-point one-source operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FpOp1 {
    Mov,
    Abs,
    Neg,
    Sqrt,
    ConvertTo(FpType),
}

/// Conversion between general and floating-point registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FpConvertOp {
    /// Signed integer to float.
    Scvtf,
    /// Unsigned integer to float.
    Ucvtf,
    /// Float to signed integer, rounding toward zero.
    Fcvtzs,
    /// Float to unsigned integer, rounding toward zero.
    Fcvtzu,
    /// Bit copy from FP register to general register.
    MovToGeneral,
    /// Bit copy from general register to FP register.
    MovFromGeneral,
}

/// Advanced SIMD three-same operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimdOp {
    Add,
    Sub,
    Mul,
    And,
    Bic,
    Orr,
    Orn,
    Eor,
}

/// Decoded instruction with all fields extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedInstruction {
    Nop,
    Exception,
    PcRelative {
        rd: u8,
        page: bool,
        offset: i64,
    },
    AddSubImmediate {
        sf: bool,
        sub: bool,
        set_flags: bool,
        rd: u8,
        rn: u8,
        imm: u64,
    },
    LogicalImmediate {
        sf: bool,
        op: LogicalOp,
        rd: u8,
        rn: u8,
        imm: u64,
    },
    MoveWide {
        sf: bool,
        op: MoveWideOp,
        rd: u8,
        imm16: u16,
        shift: u8,
    },
    Bitfield {
        sf: bool,
        op: BitfieldOp,
        rd: u8,
        rn: u8,
        immr: u8,
        imms: u8,
    },
    Extract {
        sf: bool,
        rd: u8,
        rn: u8,
        rm: u8,
        lsb: u8,
    },
    AddSubShifted {
        sf: bool,
        sub: bool,
        set_flags: bool,
        rd: u8,
        rn: u8,
        rm: u8,
        shift: ShiftType,
        amount: u8,
    },
    AddSubExtended {
        sf: bool,
        sub: bool,
        set_flags: bool,
        rd: u8,
        rn: u8,
        rm: u8,
        extend: Extend,
        amount: u8,
    },
    LogicalShifted {
        sf: bool,
        op: LogicalOp,
        invert: bool,
        rd: u8,
        rn: u8,
        rm: u8,
        shift: ShiftType,
        amount: u8,
    },
    AddSubCarry {
        sf: bool,
        sub: bool,
        set_flags: bool,
        rd: u8,
        rn: u8,
        rm: u8,
    },
    CondCompare {
        sf: bool,
        sub: bool,
        rn: u8,
        operand: CondCompareOperand,
        cond: Condition,
        nzcv: u8,
    },
    CondSelect {
        sf: bool,
        op: CondSelectOp,
        rd: u8,
        rn: u8,
        rm: u8,
        cond: Condition,
    },
    DataProc1 {
        sf: bool,
        op: DataProc1Op,
        rd: u8,
        rn: u8,
    },
    DataProc2 {
        sf: bool,
        op: DataProc2Op,
        rd: u8,
        rn: u8,
        rm: u8,
    },
    DataProc3 {
        sf: bool,
        op: DataProc3Op,
        rd: u8,
        rn: u8,
        rm: u8,
        ra: u8,
    },
    LoadStore {
        kind: TransferKind,
        size: u8,
        rt: u8,
        rn: u8,
        addressing: Addressing,
    },
    LoadStorePair {
        load: bool,
        vector: bool,
        sign_extend: bool,
        size: u8,
        rt: u8,
        rt2: u8,
        rn: u8,
        addressing: Addressing,
    },
    FpDataProc1 {
        ftype: FpType,
        op: FpOp1,
        rd: u8,
        rn: u8,
    },
    FpDataProc2 {
        ftype: FpType,
        op: FpOp2,
        rd: u8,
        rn: u8,
        rm: u8,
    },
    FpImmediate {
        ftype: FpType,
        rd: u8,
        imm8: u8,
    },
    FpCompare {
        ftype: FpType,
        rn: u8,
        rm: Option<u8>,
    },
    FpConvert {
        sf: bool,
        ftype: FpType,
        op: FpConvertOp,
        rd: u8,
        rn: u8,
    },
    SimdThreeSame {
        q: bool,
        size: u8,
        op: SimdOp,
        rd: u8,
        rn: u8,
        rm: u8,
    },
    SimdDupGeneral {
        q: bool,
        esize_log2: u8,
        rd: u8,
        rn: u8,
    },
    SimdInsGeneral {
        esize_log2: u8,
        index: u8,
        rd: u8,
        rn: u8,
    },
    SimdUmov {
        esize_log2: u8,
        index: u8,
        rd: u8,
        rn: u8,
    },
    SimdMovi {
        q: bool,
        value: u64,
        rd: u8,
    },
}

const fn reg(word: u32, lo: u32) -> u8 {
    bits(word, lo + 4, lo) as u8
}

/// Stateless A64 decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder;

impl Decoder {
    /// Decodes a 32-bit instruction word.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::UnallocatedEncoding`] or
    /// [`FaultCode::UnsupportedEncoding`].
    pub fn decode(word: u32) -> DecodedOrFault {
        let op0 = bits(word, 28, 25);
        match op0 {
            0b1000 | 0b1001 => decode_dp_immediate(word),
            0b1010 | 0b1011 => decode_branch_system(word),
            0b0101 | 0b1101 => decode_dp_register(word),
            0b0111 | 0b1111 => decode_simd_fp(word),
            op0 if op0 & 0b0101 == 0b0100 => decode_load_store(word),
            0b0010 => Err(FaultCode::UnsupportedEncoding),
            _ => Err(FaultCode::UnallocatedEncoding),
        }
    }
}

fn decode_dp_immediate(word: u32) -> DecodedOrFault {
    let sf = bit(word, 31);
    let rd = reg(word, 0);
    let rn = reg(word, 5);

    match bits(word, 25, 23) {
        0b000 | 0b001 => {
            let page = bit(word, 31);
            let imm = (u64::from(bits(word, 23, 5)) << 2) | u64::from(bits(word, 30, 29));
            let offset = sign_extend(imm, 21);
            Ok(DecodedInstruction::PcRelative {
                rd,
                page,
                offset: if page { offset << 12 } else { offset },
            })
        }
        0b010 => {
            let shift12 = bit(word, 22);
            let imm = u64::from(bits(word, 21, 10));
            Ok(DecodedInstruction::AddSubImmediate {
                sf,
                sub: bit(word, 30),
                set_flags: bit(word, 29),
                rd,
                rn,
                imm: if shift12 { imm << 12 } else { imm },
            })
        }
        0b011 => Err(FaultCode::UnsupportedEncoding),
        0b100 => {
            let n = bit(word, 22);
            if !sf && n {
                return Err(FaultCode::UnallocatedEncoding);
            }
            let width = if sf { 64 } else { 32 };
            let imm = decode_bit_masks(n, bits(word, 21, 16), bits(word, 15, 10), width)
                .ok_or(FaultCode::UnallocatedEncoding)?;
            Ok(DecodedInstruction::LogicalImmediate {
                sf,
                op: LogicalOp::from_bits(bits(word, 30, 29)),
                rd,
                rn,
                imm,
            })
        }
        0b101 => {
            let hw = bits(word, 22, 21);
            if !sf && hw >= 2 {
                return Err(FaultCode::UnallocatedEncoding);
            }
            let op = match bits(word, 30, 29) {
                0b00 => MoveWideOp::Movn,
                0b10 => MoveWideOp::Movz,
                0b11 => MoveWideOp::Movk,
                _ => return Err(FaultCode::UnallocatedEncoding),
            };
            Ok(DecodedInstruction::MoveWide {
                sf,
                op,
                rd,
                imm16: bits(word, 20, 5) as u16,
                shift: (hw * 16) as u8,
            })
        }
        0b110 => {
            let op = match bits(word, 30, 29) {
                0b00 => BitfieldOp::Sbfm,
                0b01 => BitfieldOp::Bfm,
                0b10 => BitfieldOp::Ubfm,
                _ => return Err(FaultCode::UnallocatedEncoding),
            };
            let immr = bits(word, 21, 16);
            let imms = bits(word, 15, 10);
            if bit(word, 22) != sf || (!sf && (immr >= 32 || imms >= 32)) {
                return Err(FaultCode::UnallocatedEncoding);
            }
            Ok(DecodedInstruction::Bitfield {
                sf,
                op,
                rd,
                rn,
                immr: immr as u8,
                imms: imms as u8,
            })
        }
        _ => {
            let imms = bits(word, 15, 10);
            if bits(word, 30, 29) != 0
                || bit(word, 21)
                || bit(word, 22) != sf
                || (!sf && imms >= 32)
            {
                return Err(FaultCode::UnallocatedEncoding);
            }
            Ok(DecodedInstruction::Extract {
                sf,
                rd,
                rn,
                rm: reg(word, 16),
                lsb: imms as u8,
            })
        }
    }
}

fn decode_branch_system(word: u32) -> DecodedOrFault {
    // HINT space: NOP, YIELD, WFE, WFI, SEV, SEVL and friends
    if word & 0xFFFF_F01F == 0xD503_201F {
        return Ok(DecodedInstruction::Nop);
    }

    if bits(word, 31, 24) == 0b1101_0100 {
        let opc = bits(word, 23, 21);
        let ll = bits(word, 1, 0);
        if bits(word, 4, 2) != 0 {
            return Err(FaultCode::UnallocatedEncoding);
        }
        return match (opc, ll) {
            (0b000, 0b01 | 0b10 | 0b11) | (0b001 | 0b010, 0b00) => {
                Ok(DecodedInstruction::Exception)
            }
            _ => Err(FaultCode::UnsupportedEncoding),
        };
    }

    Err(FaultCode::UnsupportedEncoding)
}

fn decode_dp_register(word: u32) -> DecodedOrFault {
    let sf = bit(word, 31);
    let rd = reg(word, 0);
    let rn = reg(word, 5);
    let rm = reg(word, 16);
    let op1 = bit(word, 28);

    if !op1 {
        let amount = bits(word, 15, 10);
        if bit(word, 24) {
            if bit(word, 21) {
                let imm3 = bits(word, 12, 10);
                if bits(word, 23, 22) != 0 || imm3 > 4 {
                    return Err(FaultCode::UnallocatedEncoding);
                }
                return Ok(DecodedInstruction::AddSubExtended {
                    sf,
                    sub: bit(word, 30),
                    set_flags: bit(word, 29),
                    rd,
                    rn,
                    rm,
                    extend: Extend::from_bits(bits(word, 15, 13)),
                    amount: imm3 as u8,
                });
            }
            let shift = bits(word, 23, 22);
            if shift == 0b11 || (!sf && amount >= 32) {
                return Err(FaultCode::UnallocatedEncoding);
            }
            return Ok(DecodedInstruction::AddSubShifted {
                sf,
                sub: bit(word, 30),
                set_flags: bit(word, 29),
                rd,
                rn,
                rm,
                shift: ShiftType::from_bits(shift),
                amount: amount as u8,
            });
        }

        if !sf && amount >= 32 {
            return Err(FaultCode::UnallocatedEncoding);
        }
        return Ok(DecodedInstruction::LogicalShifted {
            sf,
            op: LogicalOp::from_bits(bits(word, 30, 29)),
            invert: bit(word, 21),
            rd,
            rn,
            rm,
            shift: ShiftType::from_bits(bits(word, 23, 22)),
            amount: amount as u8,
        });
    }

    let op2 = bits(word, 24, 21);
    match op2 {
        0b0000 => {
            if bits(word, 15, 10) != 0 {
                return Err(FaultCode::UnsupportedEncoding);
            }
            Ok(DecodedInstruction::AddSubCarry {
                sf,
                sub: bit(word, 30),
                set_flags: bit(word, 29),
                rd,
                rn,
                rm,
            })
        }
        0b0010 => {
            if !bit(word, 29) || bit(word, 10) || bit(word, 4) {
                return Err(FaultCode::UnallocatedEncoding);
            }
            let operand = if bit(word, 11) {
                CondCompareOperand::Immediate(rm)
            } else {
                CondCompareOperand::Register(rm)
            };
            Ok(DecodedInstruction::CondCompare {
                sf,
                sub: bit(word, 30),
                rn,
                operand,
                cond: Condition::from_bits(bits(word, 15, 12)),
                nzcv: bits(word, 3, 0) as u8,
            })
        }
        0b0100 => {
            if bit(word, 29) {
                return Err(FaultCode::UnallocatedEncoding);
            }
            let op = match (bit(word, 30), bits(word, 11, 10)) {
                (false, 0b00) => CondSelectOp::Csel,
                (false, 0b01) => CondSelectOp::Csinc,
                (true, 0b00) => CondSelectOp::Csinv,
                (true, 0b01) => CondSelectOp::Csneg,
                _ => return Err(FaultCode::UnallocatedEncoding),
            };
            Ok(DecodedInstruction::CondSelect {
                sf,
                op,
                rd,
                rn,
                rm,
                cond: Condition::from_bits(bits(word, 15, 12)),
            })
        }
        0b0110 => {
            if bit(word, 29) {
                return Err(FaultCode::UnallocatedEncoding);
            }
            let opcode = bits(word, 15, 10);
            if bit(word, 30) {
                if rm != 0 {
                    return Err(FaultCode::UnsupportedEncoding);
                }
                let op = match (opcode, sf) {
                    (0b00_0000, _) => DataProc1Op::Rbit,
                    (0b00_0001, _) => DataProc1Op::Rev16,
                    (0b00_0010, true) => DataProc1Op::Rev32,
                    (0b00_0010, false) | (0b00_0011, true) => DataProc1Op::Rev,
                    (0b00_0100, _) => DataProc1Op::Clz,
                    (0b00_0101, _) => DataProc1Op::Cls,
                    _ => return Err(FaultCode::UnsupportedEncoding),
                };
                return Ok(DecodedInstruction::DataProc1 { sf, op, rd, rn });
            }
            let op = match opcode {
                0b00_0010 => DataProc2Op::Udiv,
                0b00_0011 => DataProc2Op::Sdiv,
                0b00_1000 => DataProc2Op::Lslv,
                0b00_1001 => DataProc2Op::Lsrv,
                0b00_1010 => DataProc2Op::Asrv,
                0b00_1011 => DataProc2Op::Rorv,
                _ => return Err(FaultCode::UnsupportedEncoding),
            };
            Ok(DecodedInstruction::DataProc2 { sf, op, rd, rn, rm })
        }
        op2 if op2 & 0b1000 != 0 => {
            if bits(word, 30, 29) != 0 {
                return Err(FaultCode::UnallocatedEncoding);
            }
            let op = match (bits(word, 23, 21), bit(word, 15), sf) {
                (0b000, false, _) => DataProc3Op::Madd,
                (0b000, true, _) => DataProc3Op::Msub,
                (0b001, false, true) => DataProc3Op::Smaddl,
                (0b001, true, true) => DataProc3Op::Smsubl,
                (0b010, false, true) => DataProc3Op::Smulh,
                (0b101, false, true) => DataProc3Op::Umaddl,
                (0b101, true, true) => DataProc3Op::Umsubl,
                (0b110, false, true) => DataProc3Op::Umulh,
                _ => return Err(FaultCode::UnallocatedEncoding),
            };
            Ok(DecodedInstruction::DataProc3 {
                sf,
                op,
                rd,
                rn,
                rm,
                ra: reg(word, 10),
            })
        }
        _ => Err(FaultCode::UnsupportedEncoding),
    }
}

fn decode_load_store(word: u32) -> DecodedOrFault {
    let vector = bit(word, 26);
    let rt = reg(word, 0);
    let rn = reg(word, 5);

    match bits(word, 29, 27) {
        0b101 => decode_load_store_pair(word, vector, rt, rn),
        0b111 => {
            let size = bits(word, 31, 30);
            let opc = bits(word, 23, 22);
            let (kind, log2) = transfer_kind(size, opc, vector)?;

            if bit(word, 24) {
                let imm12 = u64::from(bits(word, 21, 10));
                #[allow(clippy::cast_possible_wrap)]
                let offset = (imm12 << log2) as i64;
                return Ok(DecodedInstruction::LoadStore {
                    kind,
                    size: 1 << log2,
                    rt,
                    rn,
                    addressing: Addressing::Offset(offset),
                });
            }

            if bit(word, 21) {
                if bits(word, 11, 10) != 0b10 {
                    return Err(FaultCode::UnsupportedEncoding);
                }
                let option = bits(word, 15, 13);
                if option & 0b010 == 0 {
                    return Err(FaultCode::UnallocatedEncoding);
                }
                let shift = if bit(word, 12) { log2 as u8 } else { 0 };
                return Ok(DecodedInstruction::LoadStore {
                    kind,
                    size: 1 << log2,
                    rt,
                    rn,
                    addressing: Addressing::Register {
                        rm: reg(word, 16),
                        extend: Extend::from_bits(option),
                        shift,
                    },
                });
            }

            let imm9 = sign_extend(u64::from(bits(word, 20, 12)), 9);
            let addressing = match bits(word, 11, 10) {
                0b00 => Addressing::Offset(imm9),
                0b01 => Addressing::PostIndex(imm9),
                0b11 => Addressing::PreIndex(imm9),
                _ => return Err(FaultCode::UnsupportedEncoding),
            };
            Ok(DecodedInstruction::LoadStore {
                kind,
                size: 1 << log2,
                rt,
                rn,
                addressing,
            })
        }
        _ => Err(FaultCode::UnsupportedEncoding),
    }
}

/// Resolves `size:opc` into a transfer kind and log2 of the access size.
fn transfer_kind(size: u32, opc: u32, vector: bool) -> Result<(TransferKind, u32), FaultCode> {
    if vector {
        return match (size, opc) {
            (_, 0b00) => Ok((TransferKind::StoreVector, size)),
            (_, 0b01) => Ok((TransferKind::LoadVector, size)),
            (0b00, 0b10) => Ok((TransferKind::StoreVector, 4)),
            (0b00, 0b11) => Ok((TransferKind::LoadVector, 4)),
            _ => Err(FaultCode::UnallocatedEncoding),
        };
    }

    match (size, opc) {
        (_, 0b00) => Ok((TransferKind::Store, size)),
        (_, 0b01) => Ok((TransferKind::Load, size)),
        (0b11, 0b10) => Err(FaultCode::UnsupportedEncoding),
        (0b00 | 0b01 | 0b10, 0b10) => Ok((TransferKind::LoadSigned { to_64: true }, size)),
        (0b00 | 0b01, 0b11) => Ok((TransferKind::LoadSigned { to_64: false }, size)),
        _ => Err(FaultCode::UnallocatedEncoding),
    }
}

fn decode_load_store_pair(word: u32, vector: bool, rt: u8, rn: u8) -> DecodedOrFault {
    let opc = bits(word, 31, 30);
    let load = bit(word, 22);
    let (log2, sign_extend_load) = match (vector, opc) {
        (false, 0b00) => (2, false),
        (false, 0b01) if load => (2, true),
        (false, 0b10) => (3, false),
        (true, 0b00) => (2, false),
        (true, 0b01) => (3, false),
        (true, 0b10) => (4, false),
        _ => return Err(FaultCode::UnallocatedEncoding),
    };

    let imm7 = sign_extend(u64::from(bits(word, 21, 15)), 7) << log2;
    let addressing = match bits(word, 24, 23) {
        0b00 | 0b10 => Addressing::Offset(imm7),
        0b01 => Addressing::PostIndex(imm7),
        _ => Addressing::PreIndex(imm7),
    };

    Ok(DecodedInstruction::LoadStorePair {
        load,
        vector,
        sign_extend: sign_extend_load,
        size: 1 << log2,
        rt,
        rt2: reg(word, 10),
        rn,
        addressing,
    })
}

fn decode_simd_fp(word: u32) -> DecodedOrFault {
    if bits(word, 28, 24) == 0b11110 && !bit(word, 30) {
        return decode_fp_scalar(word);
    }
    if !bit(word, 31) && bits(word, 28, 24) == 0b01110 {
        return decode_simd_vector(word);
    }
    if !bit(word, 31) && bits(word, 28, 19) == 0b01_1110_0000 && bit(word, 10) {
        return decode_simd_modified_immediate(word);
    }
    Err(FaultCode::UnsupportedEncoding)
}

fn decode_fp_scalar(word: u32) -> DecodedOrFault {
    if bit(word, 29) || !bit(word, 21) {
        return Err(FaultCode::UnsupportedEncoding);
    }
    let sf = bit(word, 31);
    let ftype = FpType::from_bits(bits(word, 23, 22))?;
    let rd = reg(word, 0);
    let rn = reg(word, 5);
    let rm = reg(word, 16);

    if bits(word, 15, 10) == 0 {
        let op = match (bits(word, 20, 19), bits(word, 18, 16)) {
            (0b00, 0b010) => FpConvertOp::Scvtf,
            (0b00, 0b011) => FpConvertOp::Ucvtf,
            (0b11, 0b000) => FpConvertOp::Fcvtzs,
            (0b11, 0b001) => FpConvertOp::Fcvtzu,
            (0b00, 0b110) => FpConvertOp::MovToGeneral,
            (0b00, 0b111) => FpConvertOp::MovFromGeneral,
            _ => return Err(FaultCode::UnsupportedEncoding),
        };
        if matches!(op, FpConvertOp::MovToGeneral | FpConvertOp::MovFromGeneral) {
            let legal = matches!(
                (sf, ftype),
                (false, FpType::Single) | (true, FpType::Double) | (_, FpType::Half)
            );
            if !legal {
                return Err(FaultCode::UnallocatedEncoding);
            }
        }
        return Ok(DecodedInstruction::FpConvert {
            sf,
            ftype,
            op,
            rd,
            rn,
        });
    }

    if sf {
        return Err(FaultCode::UnallocatedEncoding);
    }

    if bits(word, 14, 10) == 0b10000 {
        let op = match bits(word, 20, 15) {
            0b00_0000 => FpOp1::Mov,
            0b00_0001 => FpOp1::Abs,
            0b00_0010 => FpOp1::Neg,
            0b00_0011 => FpOp1::Sqrt,
            0b00_0100 => FpOp1::ConvertTo(FpType::Single),
            0b00_0101 => FpOp1::ConvertTo(FpType::Double),
            0b00_0111 => FpOp1::ConvertTo(FpType::Half),
            _ => return Err(FaultCode::UnsupportedEncoding),
        };
        if let FpOp1::ConvertTo(target) = op {
            if target == ftype {
                return Err(FaultCode::UnallocatedEncoding);
            }
        }
        return Ok(DecodedInstruction::FpDataProc1 { ftype, op, rd, rn });
    }

    if bits(word, 13, 10) == 0b1000 {
        if bits(word, 15, 14) != 0 || bits(word, 2, 0) != 0 {
            return Err(FaultCode::UnallocatedEncoding);
        }
        let with_zero = bit(word, 3);
        return Ok(DecodedInstruction::FpCompare {
            ftype,
            rn,
            rm: if with_zero { None } else { Some(rm) },
        });
    }

    if bits(word, 12, 10) == 0b100 {
        if bits(word, 9, 5) != 0 {
            return Err(FaultCode::UnallocatedEncoding);
        }
        return Ok(DecodedInstruction::FpImmediate {
            ftype,
            rd,
            imm8: bits(word, 20, 13) as u8,
        });
    }

    if bits(word, 11, 10) == 0b10 {
        let op = match bits(word, 15, 12) {
            0b0000 => FpOp2::Mul,
            0b0001 => FpOp2::Div,
            0b0010 => FpOp2::Add,
            0b0011 => FpOp2::Sub,
            0b0100 => FpOp2::Max,
            0b0101 => FpOp2::Min,
            0b1000 => FpOp2::Nmul,
            _ => return Err(FaultCode::UnsupportedEncoding),
        };
        return Ok(DecodedInstruction::FpDataProc2 {
            ftype,
            op,
            rd,
            rn,
            rm,
        });
    }

    Err(FaultCode::UnsupportedEncoding)
}

fn decode_simd_vector(word: u32) -> DecodedOrFault {
    let q = bit(word, 30);
    let u = bit(word, 29);
    let rd = reg(word, 0);
    let rn = reg(word, 5);
    let rm = reg(word, 16);

    if bit(word, 21) && bit(word, 10) {
        let size = bits(word, 23, 22);
        let op = match (bits(word, 15, 11), u, size) {
            (0b10000, false, _) => SimdOp::Add,
            (0b10000, true, _) => SimdOp::Sub,
            (0b10011, false, 0b00..=0b10) => SimdOp::Mul,
            (0b00011, false, 0b00) => SimdOp::And,
            (0b00011, false, 0b01) => SimdOp::Bic,
            (0b00011, false, 0b10) => SimdOp::Orr,
            (0b00011, false, 0b11) => SimdOp::Orn,
            (0b00011, true, 0b00) => SimdOp::Eor,
            _ => return Err(FaultCode::UnsupportedEncoding),
        };
        if matches!(op, SimdOp::Add | SimdOp::Sub) && size == 0b11 && !q {
            return Err(FaultCode::UnallocatedEncoding);
        }
        return Ok(DecodedInstruction::SimdThreeSame {
            q,
            size: size as u8,
            op,
            rd,
            rn,
            rm,
        });
    }

    if bits(word, 23, 21) == 0 && !bit(word, 15) && bit(word, 10) && !u {
        let imm5 = bits(word, 20, 16);
        if imm5 & 0b1111 == 0 {
            return Err(FaultCode::UnallocatedEncoding);
        }
        let esize_log2 = imm5.trailing_zeros();
        let index = (imm5 >> (esize_log2 + 1)) as u8;
        let esize_log2 = esize_log2 as u8;
        return match bits(word, 14, 11) {
            0b0001 => {
                if esize_log2 == 3 && !q {
                    return Err(FaultCode::UnallocatedEncoding);
                }
                Ok(DecodedInstruction::SimdDupGeneral {
                    q,
                    esize_log2,
                    rd,
                    rn,
                })
            }
            0b0011 if q => Ok(DecodedInstruction::SimdInsGeneral {
                esize_log2,
                index,
                rd,
                rn,
            }),
            0b0111 => {
                if (esize_log2 == 3) != q {
                    return Err(FaultCode::UnallocatedEncoding);
                }
                Ok(DecodedInstruction::SimdUmov {
                    esize_log2,
                    index,
                    rd,
                    rn,
                })
            }
            _ => Err(FaultCode::UnsupportedEncoding),
        };
    }

    Err(FaultCode::UnsupportedEncoding)
}

fn decode_simd_modified_immediate(word: u32) -> DecodedOrFault {
    let q = bit(word, 30);
    let op = bit(word, 29);
    let cmode = bits(word, 15, 12);
    let imm8 = (bits(word, 18, 16) << 5) | bits(word, 9, 5);
    let rd = reg(word, 0);

    if bit(word, 11) || cmode != 0b1110 {
        return Err(FaultCode::UnsupportedEncoding);
    }

    let value = if op {
        (0..8).fold(0u64, |acc, i| {
            if (imm8 >> i) & 1 == 1 {
                acc | (0xFF << (i * 8))
            } else {
                acc
            }
        })
    } else {
        u64::from(imm8) * 0x0101_0101_0101_0101
    };

    Ok(DecodedInstruction::SimdMovi { q, value, rd })
}
