//! Instruction execution for the emulated A64 subset.
//!
//! Execution runs in two phases:
//! 1. Read source operands and memory, compute results and addresses
//! 2. Commit memory writes, register writes, NZCV, then advance PC
//!
//! A fault in phase 1 leaves the machine untouched. Commit applies effects in
//! order and stops at the first memory write that faults; effects applied
//! before it are kept.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::too_many_lines
)]

mod flags;
mod fp;
mod helpers;
mod simd;

pub use flags::FlagsUpdate;
pub use helpers::add_with_carry;

use crate::decoder::{
    Addressing, CondCompareOperand, CondSelectOp, DataProc2Op, DataProc3Op, DecodedInstruction,
    FpConvertOp, LogicalOp, MoveWideOp, TransferKind,
};
use crate::encoding::{ones, sign_extend, ShiftType};
use crate::fault::FaultCode;
use crate::memory::{AddressSpace, INSTRUCTION_BYTES};
use crate::state::RegisterFile;
use crate::Nzcv;

use helpers::{
    bitfield_move, data_proc_1, extract, from_le_bytes, logical_flags, signed_divide,
    to_le_bytes, unsigned_divide, width_of,
};

/// A pending register update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterWrite {
    /// General register `n`; index 31 is SP when `sp` is set, else discarded.
    General {
        /// Register index.
        n: u8,
        /// New 64-bit value.
        value: u64,
        /// Whether index 31 names the stack pointer.
        sp: bool,
    },
    /// Full 128-bit SIMD/FP register `n`.
    Vector {
        /// Register index.
        n: u8,
        /// New 128-bit value.
        value: u128,
    },
}

/// A pending store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryWrite {
    /// First byte address.
    pub address: u64,
    /// Bytes in memory order.
    pub bytes: Vec<u8>,
}

/// Side effects accumulated while executing one instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteState {
    /// Stores, applied first and in order.
    pub memory_writes: Vec<MemoryWrite>,
    /// Register updates, applied after the stores and in order.
    pub register_writes: Vec<RegisterWrite>,
    /// NZCV update.
    pub flags_update: FlagsUpdate,
    /// PC after the instruction retires.
    pub next_pc: Option<u64>,
}

impl ExecuteState {
    fn write_x(&mut self, n: u8, value: u64) {
        self.register_writes.push(RegisterWrite::General {
            n,
            value,
            sp: false,
        });
    }

    fn write_x_or_sp(&mut self, n: u8, value: u64) {
        self.register_writes.push(RegisterWrite::General {
            n,
            value,
            sp: true,
        });
    }

    fn write_v(&mut self, n: u8, value: u128) {
        self.register_writes.push(RegisterWrite::Vector { n, value });
    }

    fn store(&mut self, address: u64, bytes: Vec<u8>) {
        self.memory_writes.push(MemoryWrite { address, bytes });
    }

    const fn set_flags(&mut self, flags: Nzcv) {
        self.flags_update = FlagsUpdate::Set(flags);
    }
}

/// Executes one decoded instruction against the current machine state.
///
/// Nothing is modified here; the returned [`ExecuteState`] must be applied
/// with [`commit_execution`].
///
/// # Errors
///
/// Returns the fault raised by the instruction. No effects are pending when
/// this fails.
pub fn execute_instruction(
    instr: &DecodedInstruction,
    regs: &RegisterFile,
    memory: &AddressSpace,
) -> Result<ExecuteState, FaultCode> {
    let pc = regs.pc();
    let mut exec = ExecuteState {
        next_pc: Some(pc.wrapping_add(INSTRUCTION_BYTES)),
        ..ExecuteState::default()
    };

    match *instr {
        DecodedInstruction::Nop => {}
        DecodedInstruction::Exception => return Err(FaultCode::ExceptionGenerated),
        DecodedInstruction::PcRelative { rd, page, offset } => {
            let base = if page { pc & !0xFFF } else { pc };
            exec.write_x(rd, base.wrapping_add(offset as u64));
        }
        DecodedInstruction::AddSubImmediate {
            sf,
            sub,
            set_flags,
            rd,
            rn,
            imm,
        } => {
            let width = width_of(sf);
            let (result, flags) = add_or_sub(regs.x_or_sp(rn), imm, sub, width);
            if set_flags {
                exec.set_flags(flags);
                exec.write_x(rd, result);
            } else {
                exec.write_x_or_sp(rd, result);
            }
        }
        DecodedInstruction::LogicalImmediate { sf, op, rd, rn, imm } => {
            let width = width_of(sf);
            let result = logical(op, regs.x_or_zr(rn), imm) & ones(width);
            if op == LogicalOp::Ands {
                exec.set_flags(logical_flags(result, width));
                exec.write_x(rd, result);
            } else {
                exec.write_x_or_sp(rd, result);
            }
        }
        DecodedInstruction::MoveWide {
            sf,
            op,
            rd,
            imm16,
            shift,
        } => {
            let mask = ones(width_of(sf));
            let imm = u64::from(imm16) << shift;
            let result = match op {
                MoveWideOp::Movz => imm,
                MoveWideOp::Movn => !imm,
                MoveWideOp::Movk => (regs.x_or_zr(rd) & !(0xFFFF << shift)) | imm,
            };
            exec.write_x(rd, result & mask);
        }
        DecodedInstruction::Bitfield {
            sf,
            op,
            rd,
            rn,
            immr,
            imms,
        } => {
            let result = bitfield_move(
                op,
                width_of(sf),
                regs.x_or_zr(rd),
                regs.x_or_zr(rn),
                u32::from(immr),
                u32::from(imms),
            );
            exec.write_x(rd, result);
        }
        DecodedInstruction::Extract { sf, rd, rn, rm, lsb } => {
            let result = extract(
                regs.x_or_zr(rn),
                regs.x_or_zr(rm),
                u32::from(lsb),
                width_of(sf),
            );
            exec.write_x(rd, result);
        }
        DecodedInstruction::AddSubShifted {
            sf,
            sub,
            set_flags,
            rd,
            rn,
            rm,
            shift,
            amount,
        } => {
            let width = width_of(sf);
            let operand = shift.apply(regs.x_or_zr(rm), u32::from(amount), width);
            let (result, flags) = add_or_sub(regs.x_or_zr(rn), operand, sub, width);
            if set_flags {
                exec.set_flags(flags);
            }
            exec.write_x(rd, result);
        }
        DecodedInstruction::AddSubExtended {
            sf,
            sub,
            set_flags,
            rd,
            rn,
            rm,
            extend,
            amount,
        } => {
            let width = width_of(sf);
            let operand = extend.apply(regs.x_or_zr(rm), u32::from(amount));
            let (result, flags) = add_or_sub(regs.x_or_sp(rn), operand, sub, width);
            if set_flags {
                exec.set_flags(flags);
                exec.write_x(rd, result);
            } else {
                exec.write_x_or_sp(rd, result);
            }
        }
        DecodedInstruction::LogicalShifted {
            sf,
            op,
            invert,
            rd,
            rn,
            rm,
            shift,
            amount,
        } => {
            let width = width_of(sf);
            let mut operand = shift.apply(regs.x_or_zr(rm), u32::from(amount), width);
            if invert {
                operand = !operand;
            }
            let result = logical(op, regs.x_or_zr(rn), operand) & ones(width);
            if op == LogicalOp::Ands {
                exec.set_flags(logical_flags(result, width));
            }
            exec.write_x(rd, result);
        }
        DecodedInstruction::AddSubCarry {
            sf,
            sub,
            set_flags,
            rd,
            rn,
            rm,
        } => {
            let mut operand = regs.x_or_zr(rm);
            if sub {
                operand = !operand;
            }
            let (result, flags) =
                add_with_carry(regs.x_or_zr(rn), operand, regs.nzcv().c, width_of(sf));
            if set_flags {
                exec.set_flags(flags);
            }
            exec.write_x(rd, result);
        }
        DecodedInstruction::CondCompare {
            sf,
            sub,
            rn,
            operand,
            cond,
            nzcv,
        } => {
            let flags = if cond.holds(regs.nzcv()) {
                let operand = match operand {
                    CondCompareOperand::Register(rm) => regs.x_or_zr(rm),
                    CondCompareOperand::Immediate(imm) => u64::from(imm),
                };
                add_or_sub(regs.x_or_zr(rn), operand, sub, width_of(sf)).1
            } else {
                Nzcv::from_nibble(nzcv)
            };
            exec.set_flags(flags);
        }
        DecodedInstruction::CondSelect {
            sf,
            op,
            rd,
            rn,
            rm,
            cond,
        } => {
            let result = if cond.holds(regs.nzcv()) {
                regs.x_or_zr(rn)
            } else {
                let value = regs.x_or_zr(rm);
                match op {
                    CondSelectOp::Csel => value,
                    CondSelectOp::Csinc => value.wrapping_add(1),
                    CondSelectOp::Csinv => !value,
                    CondSelectOp::Csneg => value.wrapping_neg(),
                }
            };
            exec.write_x(rd, result & ones(width_of(sf)));
        }
        DecodedInstruction::DataProc1 { sf, op, rd, rn } => {
            exec.write_x(rd, data_proc_1(op, regs.x_or_zr(rn), width_of(sf)));
        }
        DecodedInstruction::DataProc2 { sf, op, rd, rn, rm } => {
            let width = width_of(sf);
            let (n, m) = (regs.x_or_zr(rn), regs.x_or_zr(rm));
            let amount = (m % u64::from(width)) as u32;
            let result = match op {
                DataProc2Op::Udiv => unsigned_divide(n, m, width),
                DataProc2Op::Sdiv => signed_divide(n, m, width),
                DataProc2Op::Lslv => ShiftType::Lsl.apply(n, amount, width),
                DataProc2Op::Lsrv => ShiftType::Lsr.apply(n, amount, width),
                DataProc2Op::Asrv => ShiftType::Asr.apply(n, amount, width),
                DataProc2Op::Rorv => ShiftType::Ror.apply(n, amount, width),
            };
            exec.write_x(rd, result);
        }
        DecodedInstruction::DataProc3 {
            sf,
            op,
            rd,
            rn,
            rm,
            ra,
        } => {
            let (n, m, a) = (regs.x_or_zr(rn), regs.x_or_zr(rm), regs.x_or_zr(ra));
            let signed_product = || sign_extend(n, 32).wrapping_mul(sign_extend(m, 32)) as u64;
            let unsigned_product = || (n & ones(32)).wrapping_mul(m & ones(32));
            let result = match op {
                DataProc3Op::Madd => a.wrapping_add(n.wrapping_mul(m)),
                DataProc3Op::Msub => a.wrapping_sub(n.wrapping_mul(m)),
                DataProc3Op::Smaddl => a.wrapping_add(signed_product()),
                DataProc3Op::Smsubl => a.wrapping_sub(signed_product()),
                DataProc3Op::Umaddl => a.wrapping_add(unsigned_product()),
                DataProc3Op::Umsubl => a.wrapping_sub(unsigned_product()),
                DataProc3Op::Smulh => {
                    ((i128::from(n as i64) * i128::from(m as i64)) >> 64) as u64
                }
                DataProc3Op::Umulh => ((u128::from(n) * u128::from(m)) >> 64) as u64,
            };
            exec.write_x(rd, result & ones(width_of(sf)));
        }
        DecodedInstruction::LoadStore {
            kind,
            size,
            rt,
            rn,
            addressing,
        } => {
            let (address, writeback) = effective_address(regs, rn, addressing);
            let size = usize::from(size);
            match kind {
                TransferKind::Store => {
                    exec.store(address, to_le_bytes(u128::from(regs.x_or_zr(rt)), size));
                }
                TransferKind::StoreVector => exec.store(address, to_le_bytes(regs.v(rt), size)),
                TransferKind::Load | TransferKind::LoadSigned { .. } | TransferKind::LoadVector => {
                    let value = load(memory, address, size)?;
                    write_loaded(&mut exec, kind, rt, value, size);
                }
            }
            if let Some(base) = writeback {
                exec.write_x_or_sp(rn, base);
            }
        }
        DecodedInstruction::LoadStorePair {
            load: is_load,
            vector,
            sign_extend: signed,
            size,
            rt,
            rt2,
            rn,
            addressing,
        } => {
            let (address, writeback) = effective_address(regs, rn, addressing);
            let size = usize::from(size);
            let second = address.wrapping_add(size as u64);
            if is_load {
                let kind = match (vector, signed) {
                    (true, _) => TransferKind::LoadVector,
                    (false, true) => TransferKind::LoadSigned { to_64: true },
                    (false, false) => TransferKind::Load,
                };
                let first_value = load(memory, address, size)?;
                let second_value = load(memory, second, size)?;
                write_loaded(&mut exec, kind, rt, first_value, size);
                write_loaded(&mut exec, kind, rt2, second_value, size);
            } else {
                for (reg, at) in [(rt, address), (rt2, second)] {
                    let value = if vector {
                        regs.v(reg)
                    } else {
                        u128::from(regs.x_or_zr(reg))
                    };
                    exec.store(at, to_le_bytes(value, size));
                }
            }
            if let Some(base) = writeback {
                exec.write_x_or_sp(rn, base);
            }
        }
        DecodedInstruction::FpDataProc1 { ftype, op, rd, rn } => {
            let (result, _) = fp::fp_unary(ftype, op, regs.v(rn) as u64)?;
            exec.write_v(rd, u128::from(result));
        }
        DecodedInstruction::FpDataProc2 {
            ftype,
            op,
            rd,
            rn,
            rm,
        } => {
            let result = fp::fp_binary(ftype, op, regs.v(rn) as u64, regs.v(rm) as u64)?;
            exec.write_v(rd, u128::from(result));
        }
        DecodedInstruction::FpImmediate { ftype, rd, imm8 } => {
            exec.write_v(rd, u128::from(fp::fp_immediate(ftype, imm8)?));
        }
        DecodedInstruction::FpCompare { ftype, rn, rm } => {
            let ordering = fp::fp_compare(
                ftype,
                regs.v(rn) as u64,
                rm.map(|rm| regs.v(rm) as u64),
            )?;
            exec.flags_update = FlagsUpdate::from_fp_compare(ordering);
        }
        DecodedInstruction::FpConvert {
            sf,
            ftype,
            op,
            rd,
            rn,
        } => {
            let width = width_of(sf);
            match op {
                FpConvertOp::Scvtf | FpConvertOp::Ucvtf => {
                    let signed = op == FpConvertOp::Scvtf;
                    let result = fp::int_to_fp(ftype, regs.x_or_zr(rn), width, signed)?;
                    exec.write_v(rd, u128::from(result));
                }
                FpConvertOp::Fcvtzs | FpConvertOp::Fcvtzu => {
                    let signed = op == FpConvertOp::Fcvtzs;
                    let result = fp::fp_to_int(ftype, regs.v(rn) as u64, width, signed)?;
                    exec.write_x(rd, result);
                }
                FpConvertOp::MovToGeneral => {
                    let bits = (regs.v(rn) as u64) & ones(ftype.width());
                    exec.write_x(rd, bits);
                }
                FpConvertOp::MovFromGeneral => {
                    let bits = regs.x_or_zr(rn) & ones(ftype.width());
                    exec.write_v(rd, u128::from(bits));
                }
            }
        }
        DecodedInstruction::SimdThreeSame {
            q,
            size,
            op,
            rd,
            rn,
            rm,
        } => {
            exec.write_v(rd, simd::three_same(op, q, size, regs.v(rn), regs.v(rm)));
        }
        DecodedInstruction::SimdDupGeneral {
            q,
            esize_log2,
            rd,
            rn,
        } => {
            exec.write_v(rd, simd::duplicate(regs.x_or_zr(rn), esize_log2, q));
        }
        DecodedInstruction::SimdInsGeneral {
            esize_log2,
            index,
            rd,
            rn,
        } => {
            let value = simd::insert(regs.v(rd), esize_log2, index, regs.x_or_zr(rn));
            exec.write_v(rd, value);
        }
        DecodedInstruction::SimdUmov {
            esize_log2,
            index,
            rd,
            rn,
        } => {
            exec.write_x(rd, simd::element(regs.v(rn), esize_log2, index));
        }
        DecodedInstruction::SimdMovi { q, value, rd } => {
            let value = u128::from(value);
            let value = if q { value | (value << 64) } else { value };
            exec.write_v(rd, value);
        }
    }

    Ok(exec)
}

/// Applies the effects of a successful [`execute_instruction`].
///
/// # Errors
///
/// Returns [`FaultCode::UnmappedDataAccess`] when a store faults. Stores
/// already applied stay applied; registers, NZCV and PC are not updated.
pub fn commit_execution(
    regs: &mut RegisterFile,
    memory: &mut AddressSpace,
    exec: &ExecuteState,
) -> Result<(), FaultCode> {
    for write in &exec.memory_writes {
        memory
            .write(write.address, &write.bytes)
            .map_err(|_| FaultCode::UnmappedDataAccess)?;
    }

    for write in &exec.register_writes {
        match *write {
            RegisterWrite::General { n, value, sp: true } => regs.set_x_or_sp(n, value),
            RegisterWrite::General { n, value, sp: false } => regs.set_x_or_zr(n, value),
            RegisterWrite::Vector { n, value } => regs.set_v(n, value),
        }
    }

    if let FlagsUpdate::Set(flags) = exec.flags_update {
        regs.set_nzcv(flags);
    }

    if let Some(pc) = exec.next_pc {
        regs.set_pc(pc);
    }

    Ok(())
}

fn add_or_sub(x: u64, y: u64, sub: bool, width: u32) -> (u64, Nzcv) {
    if sub {
        add_with_carry(x, !y, true, width)
    } else {
        add_with_carry(x, y, false, width)
    }
}

const fn logical(op: LogicalOp, x: u64, y: u64) -> u64 {
    match op {
        LogicalOp::And | LogicalOp::Ands => x & y,
        LogicalOp::Orr => x | y,
        LogicalOp::Eor => x ^ y,
    }
}

/// Address accessed and the new base value when the form writes back.
fn effective_address(regs: &RegisterFile, rn: u8, addressing: Addressing) -> (u64, Option<u64>) {
    let base = regs.x_or_sp(rn);
    match addressing {
        Addressing::Offset(offset) => (base.wrapping_add(offset as u64), None),
        Addressing::PreIndex(offset) => {
            let address = base.wrapping_add(offset as u64);
            (address, Some(address))
        }
        Addressing::PostIndex(offset) => (base, Some(base.wrapping_add(offset as u64))),
        Addressing::Register { rm, extend, shift } => {
            let offset = extend.apply(regs.x_or_zr(rm), u32::from(shift));
            (base.wrapping_add(offset), None)
        }
    }
}

fn load(memory: &AddressSpace, address: u64, size: usize) -> Result<u128, FaultCode> {
    memory
        .read(address, size)
        .map(|bytes| from_le_bytes(&bytes))
        .map_err(|_| FaultCode::UnmappedDataAccess)
}

fn write_loaded(exec: &mut ExecuteState, kind: TransferKind, rt: u8, value: u128, size: usize) {
    let bits = (size * 8) as u32;
    match kind {
        TransferKind::LoadVector => exec.write_v(rt, value),
        TransferKind::LoadSigned { to_64 } => {
            let extended = sign_extend(value as u64, bits) as u64;
            let width = if to_64 { 64 } else { 32 };
            exec.write_x(rt, extended & ones(width));
        }
        _ => exec.write_x(rt, value as u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Decoder;
    use crate::state::RegisterId;

    fn setup() -> (RegisterFile, AddressSpace) {
        let mut regs = RegisterFile::default();
        regs.set_pc(0x1000);
        let mut memory = AddressSpace::new();
        memory.map(0x1000, 0x100).expect("map");
        (regs, memory)
    }

    fn run(word: u32, regs: &mut RegisterFile, memory: &mut AddressSpace) -> Result<(), FaultCode> {
        let instr = Decoder::decode(word)?;
        let exec = execute_instruction(&instr, regs, memory)?;
        commit_execution(regs, memory, &exec)
    }

    #[test]
    fn movz_writes_register_and_advances_pc() {
        let (mut regs, mut memory) = setup();
        // MOVZ X0, #0x2A
        run(0xD280_0540, &mut regs, &mut memory).expect("execute");
        assert_eq!(regs.read(RegisterId::X(0)), 0x2A);
        assert_eq!(regs.pc(), 0x1004);
    }

    #[test]
    fn subs_sets_flags_for_equal_operands() {
        let (mut regs, mut memory) = setup();
        regs.set_x_or_zr(1, 7);
        // SUBS X0, X1, #7
        run(0xF100_1C20, &mut regs, &mut memory).expect("execute");
        assert_eq!(regs.x_or_zr(0), 0);
        assert_eq!(regs.nzcv(), Nzcv::from_nibble(0b0110));
    }

    #[test]
    fn add_immediate_to_sp_uses_stack_pointer() {
        let (mut regs, mut memory) = setup();
        regs.write(RegisterId::Sp, 0x1080);
        // ADD SP, SP, #0x10
        run(0x9100_43FF, &mut regs, &mut memory).expect("execute");
        assert_eq!(regs.read(RegisterId::Sp), 0x1090);
    }

    #[test]
    fn store_pair_pre_index_writes_memory_and_base() {
        let (mut regs, mut memory) = setup();
        regs.write(RegisterId::Sp, 0x1080);
        regs.set_x_or_zr(29, 0x1111);
        regs.set_x_or_zr(30, 0x2222);
        // STP X29, X30, [SP, #-16]!
        run(0xA9BF_7BFD, &mut regs, &mut memory).expect("execute");
        assert_eq!(regs.read(RegisterId::Sp), 0x1070);
        assert_eq!(
            memory.read(0x1070, 16).expect("read"),
            vec![0x11, 0x11, 0, 0, 0, 0, 0, 0, 0x22, 0x22, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn store_pair_straddling_the_mapping_keeps_the_first_store() {
        let (mut regs, mut memory) = setup();
        regs.write(RegisterId::Sp, 0x10F8);
        regs.set_x_or_zr(29, 0xAA);
        // STP X29, X30, [SP]
        let word = 0xA900_7BFD;
        assert_eq!(
            run(word, &mut regs, &mut memory),
            Err(FaultCode::UnmappedDataAccess)
        );
        assert_eq!(memory.read(0x10F8, 1).expect("read"), vec![0xAA]);
        assert_eq!(regs.pc(), 0x1000);
    }

    #[test]
    fn faulting_load_changes_nothing() {
        let (mut regs, mut memory) = setup();
        regs.set_x_or_zr(1, 0x9000);
        let before = regs.clone();
        // LDR X0, [X1]
        assert_eq!(
            run(0xF940_0020, &mut regs, &mut memory),
            Err(FaultCode::UnmappedDataAccess)
        );
        assert_eq!(regs, before);
    }

    #[test]
    fn signed_byte_load_extends_to_32_bits() {
        let (mut regs, mut memory) = setup();
        memory.write(0x1040, &[0x80]).expect("seed");
        regs.set_x_or_zr(1, 0x1040);
        // LDRSB W0, [X1]
        run(0x39C0_0020, &mut regs, &mut memory).expect("execute");
        assert_eq!(regs.x_or_zr(0), 0xFFFF_FF80);
    }

    #[test]
    fn svc_raises_exception_fault() {
        let (mut regs, mut memory) = setup();
        assert_eq!(
            run(0xD400_0001, &mut regs, &mut memory),
            Err(FaultCode::ExceptionGenerated)
        );
        assert_eq!(regs.pc(), 0x1000);
    }

    #[test]
    fn fadd_double_clears_upper_vector_bits() {
        let (mut regs, mut memory) = setup();
        regs.set_v(0, u128::MAX);
        regs.set_v(1, u128::from(1.5f64.to_bits()));
        regs.set_v(2, u128::from(2.0f64.to_bits()));
        // FADD D0, D1, D2
        run(0x1E62_2820, &mut regs, &mut memory).expect("execute");
        assert_eq!(regs.v(0), u128::from(3.5f64.to_bits()));
    }

    #[test]
    fn csinc_selects_incremented_value_when_condition_fails() {
        let (mut regs, mut memory) = setup();
        regs.set_x_or_zr(1, 10);
        regs.set_x_or_zr(2, 20);
        // CSINC X0, X1, X2, EQ with Z clear
        run(0x9A82_0420, &mut regs, &mut memory).expect("execute");
        assert_eq!(regs.x_or_zr(0), 21);
    }

    #[test]
    fn udiv_by_zero_writes_zero() {
        let (mut regs, mut memory) = setup();
        regs.set_x_or_zr(0, 99);
        regs.set_x_or_zr(1, 10);
        // UDIV X0, X1, X2
        run(0x9AC2_0820, &mut regs, &mut memory).expect("execute");
        assert_eq!(regs.x_or_zr(0), 0);
    }
}
