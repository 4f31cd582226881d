use std::fmt;
use std::str::FromStr;

use crate::MachineError;

/// Number of numbered general-purpose registers (`X0..X30`).
pub const GENERAL_REGISTER_COUNT: usize = 31;
/// Number of SIMD/FP registers (`V0..V31`).
pub const VECTOR_REGISTER_COUNT: usize = 32;

/// Register number that selects `SP` or the zero register depending on context.
pub const REG_31: u8 = 31;

/// Host-visible register handle.
///
/// Narrow names are views over a physical register: `W3` is the low 32 bits of
/// `X3`, and `D3`/`S3`/`H3`/`B3` are the low bits of `Q3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegisterId {
    /// 64-bit general-purpose register `X0..X30`.
    X(u8),
    /// 32-bit view of a general-purpose register `W0..W30`.
    W(u8),
    /// Stack pointer.
    Sp,
    /// 32-bit view of the stack pointer.
    Wsp,
    /// 64-bit zero register.
    Xzr,
    /// 32-bit zero register.
    Wzr,
    /// Program counter.
    Pc,
    /// Condition flags, `N:Z:C:V` in bits `31:28`.
    Nzcv,
    /// 128-bit SIMD/FP register.
    Q(u8),
    /// 64-bit view of a SIMD/FP register.
    D(u8),
    /// 32-bit view of a SIMD/FP register.
    S(u8),
    /// 16-bit view of a SIMD/FP register.
    H(u8),
    /// 8-bit view of a SIMD/FP register.
    B(u8),
}

impl RegisterId {
    /// Resolves a register name, ignoring ASCII case.
    ///
    /// `FP` and `LR` resolve to `X29` and `X30`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        match upper.as_str() {
            "SP" => return Some(Self::Sp),
            "WSP" => return Some(Self::Wsp),
            "XZR" => return Some(Self::Xzr),
            "WZR" => return Some(Self::Wzr),
            "PC" => return Some(Self::Pc),
            "NZCV" => return Some(Self::Nzcv),
            "FP" => return Some(Self::X(29)),
            "LR" => return Some(Self::X(30)),
            _ => {}
        }

        let mut chars = upper.chars();
        let family = chars.next()?;
        let digits = chars.as_str();
        if digits.is_empty()
            || !digits.bytes().all(|b| b.is_ascii_digit())
            || (digits.len() > 1 && digits.starts_with('0'))
        {
            return None;
        }
        let index: u8 = digits.parse().ok()?;

        match family {
            'X' if usize::from(index) < GENERAL_REGISTER_COUNT => Some(Self::X(index)),
            'W' if usize::from(index) < GENERAL_REGISTER_COUNT => Some(Self::W(index)),
            'Q' | 'V' if usize::from(index) < VECTOR_REGISTER_COUNT => Some(Self::Q(index)),
            'D' if usize::from(index) < VECTOR_REGISTER_COUNT => Some(Self::D(index)),
            'S' if usize::from(index) < VECTOR_REGISTER_COUNT => Some(Self::S(index)),
            'H' if usize::from(index) < VECTOR_REGISTER_COUNT => Some(Self::H(index)),
            'B' if usize::from(index) < VECTOR_REGISTER_COUNT => Some(Self::B(index)),
            _ => None,
        }
    }

    /// Width of the view in bits.
    #[must_use]
    pub const fn width_bits(self) -> u32 {
        match self {
            Self::X(_) | Self::Sp | Self::Xzr | Self::Pc | Self::D(_) => 64,
            Self::W(_) | Self::Wsp | Self::Wzr | Self::Nzcv | Self::S(_) => 32,
            Self::Q(_) => 128,
            Self::H(_) => 16,
            Self::B(_) => 8,
        }
    }

    /// Mask covering every bit of the view.
    #[must_use]
    pub const fn mask(self) -> u128 {
        match self.width_bits() {
            128 => u128::MAX,
            bits => (1u128 << bits) - 1,
        }
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X(n) => write!(f, "X{n}"),
            Self::W(n) => write!(f, "W{n}"),
            Self::Sp => f.write_str("SP"),
            Self::Wsp => f.write_str("WSP"),
            Self::Xzr => f.write_str("XZR"),
            Self::Wzr => f.write_str("WZR"),
            Self::Pc => f.write_str("PC"),
            Self::Nzcv => f.write_str("NZCV"),
            Self::Q(n) => write!(f, "Q{n}"),
            Self::D(n) => write!(f, "D{n}"),
            Self::S(n) => write!(f, "S{n}"),
            Self::H(n) => write!(f, "H{n}"),
            Self::B(n) => write!(f, "B{n}"),
        }
    }
}

impl FromStr for RegisterId {
    type Err = MachineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| MachineError::UnknownRegister(s.to_string()))
    }
}

/// Condition flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct Nzcv {
    /// Negative.
    pub n: bool,
    /// Zero.
    pub z: bool,
    /// Carry / not-borrow.
    pub c: bool,
    /// Signed overflow.
    pub v: bool,
}

impl Nzcv {
    /// Builds flags from the 4-bit `nzcv` immediate layout (`N` in bit 3).
    #[must_use]
    pub const fn from_nibble(nibble: u8) -> Self {
        Self {
            n: nibble & 0b1000 != 0,
            z: nibble & 0b0100 != 0,
            c: nibble & 0b0010 != 0,
            v: nibble & 0b0001 != 0,
        }
    }

    /// Packs flags into the 4-bit `nzcv` layout.
    #[must_use]
    pub const fn nibble(self) -> u8 {
        ((self.n as u8) << 3) | ((self.z as u8) << 2) | ((self.c as u8) << 1) | (self.v as u8)
    }

    /// Packs flags into the `NZCV` system-register layout (bits `31:28`).
    #[must_use]
    pub const fn bits(self) -> u32 {
        (self.nibble() as u32) << 28
    }

    /// Unpacks flags from the `NZCV` system-register layout.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self::from_nibble(((bits >> 28) & 0xF) as u8)
    }
}

/// Architectural register file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    x: [u64; GENERAL_REGISTER_COUNT],
    sp: u64,
    pc: u64,
    nzcv: Nzcv,
    v: [u128; VECTOR_REGISTER_COUNT],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self {
            x: [0; GENERAL_REGISTER_COUNT],
            sp: 0,
            pc: 0,
            nzcv: Nzcv::default(),
            v: [0; VECTOR_REGISTER_COUNT],
        }
    }
}

impl RegisterFile {
    /// Reads a register through a named view, zero-extended to `u128`.
    #[must_use]
    pub fn read(&self, id: RegisterId) -> u128 {
        let full = match id {
            RegisterId::X(n) | RegisterId::W(n) => u128::from(self.x[usize::from(n)]),
            RegisterId::Sp | RegisterId::Wsp => u128::from(self.sp),
            RegisterId::Xzr | RegisterId::Wzr => 0,
            RegisterId::Pc => u128::from(self.pc),
            RegisterId::Nzcv => u128::from(self.nzcv.bits()),
            RegisterId::Q(n)
            | RegisterId::D(n)
            | RegisterId::S(n)
            | RegisterId::H(n)
            | RegisterId::B(n) => self.v[usize::from(n)],
        };
        full & id.mask()
    }

    /// Writes a register through a named view.
    ///
    /// The value is truncated to the view width and zero-extended into the
    /// physical register. Writes to the zero registers are discarded.
    #[allow(clippy::cast_possible_truncation)]
    pub fn write(&mut self, id: RegisterId, value: u128) {
        let value = value & id.mask();
        match id {
            RegisterId::X(n) | RegisterId::W(n) => self.x[usize::from(n)] = value as u64,
            RegisterId::Sp | RegisterId::Wsp => self.sp = value as u64,
            RegisterId::Xzr | RegisterId::Wzr => {}
            RegisterId::Pc => self.pc = value as u64,
            RegisterId::Nzcv => self.nzcv = Nzcv::from_bits(value as u32),
            RegisterId::Q(n)
            | RegisterId::D(n)
            | RegisterId::S(n)
            | RegisterId::H(n)
            | RegisterId::B(n) => self.v[usize::from(n)] = value,
        }
    }

    /// Reads general register `n`, treating 31 as the zero register.
    #[must_use]
    pub fn x_or_zr(&self, n: u8) -> u64 {
        if n == REG_31 {
            0
        } else {
            self.x[usize::from(n)]
        }
    }

    /// Reads general register `n`, treating 31 as the stack pointer.
    #[must_use]
    pub fn x_or_sp(&self, n: u8) -> u64 {
        if n == REG_31 {
            self.sp
        } else {
            self.x[usize::from(n)]
        }
    }

    /// Writes general register `n`, discarding writes to the zero register.
    pub fn set_x_or_zr(&mut self, n: u8, value: u64) {
        if n != REG_31 {
            self.x[usize::from(n)] = value;
        }
    }

    /// Writes general register `n`, treating 31 as the stack pointer.
    pub fn set_x_or_sp(&mut self, n: u8, value: u64) {
        if n == REG_31 {
            self.sp = value;
        } else {
            self.x[usize::from(n)] = value;
        }
    }

    /// Reads the full 128-bit SIMD/FP register `n`.
    #[must_use]
    pub fn v(&self, n: u8) -> u128 {
        self.v[usize::from(n)]
    }

    /// Writes the full 128-bit SIMD/FP register `n`.
    pub fn set_v(&mut self, n: u8, value: u128) {
        self.v[usize::from(n)] = value;
    }

    /// Reads the program counter.
    #[must_use]
    pub const fn pc(&self) -> u64 {
        self.pc
    }

    /// Writes the program counter.
    pub const fn set_pc(&mut self, value: u64) {
        self.pc = value;
    }

    /// Reads the condition flags.
    #[must_use]
    pub const fn nzcv(&self) -> Nzcv {
        self.nzcv
    }

    /// Writes the condition flags.
    pub const fn set_nzcv(&mut self, flags: Nzcv) {
        self.nzcv = flags;
    }
}

#[cfg(test)]
mod tests {
    use super::{Nzcv, RegisterFile, RegisterId};
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("x0", RegisterId::X(0))]
    #[case("X30", RegisterId::X(30))]
    #[case("w7", RegisterId::W(7))]
    #[case("sp", RegisterId::Sp)]
    #[case("PC", RegisterId::Pc)]
    #[case("nzcv", RegisterId::Nzcv)]
    #[case("q31", RegisterId::Q(31))]
    #[case("v2", RegisterId::Q(2))]
    #[case("d4", RegisterId::D(4))]
    #[case("s5", RegisterId::S(5))]
    #[case("h6", RegisterId::H(6))]
    #[case("b7", RegisterId::B(7))]
    #[case("lr", RegisterId::X(30))]
    #[case("fp", RegisterId::X(29))]
    fn parses_register_names(#[case] name: &str, #[case] expected: RegisterId) {
        assert_eq!(RegisterId::parse(name), Some(expected));
    }

    #[rstest]
    #[case("x31")]
    #[case("w31")]
    #[case("q32")]
    #[case("x01")]
    #[case("x")]
    #[case("mov")]
    #[case("r0")]
    fn rejects_non_register_names(#[case] name: &str) {
        assert_eq!(RegisterId::parse(name), None);
    }

    #[test]
    fn w_view_aliases_low_bits_of_x() {
        let mut regs = RegisterFile::default();
        regs.write(RegisterId::X(1), 0x1122_3344_5566_7788);
        assert_eq!(regs.read(RegisterId::W(1)), 0x5566_7788);

        regs.write(RegisterId::W(1), 0xFFFF_FFFF_0000_0001);
        assert_eq!(regs.read(RegisterId::X(1)), 1);
    }

    #[test]
    fn scalar_fp_views_zero_extend_into_vector_register() {
        let mut regs = RegisterFile::default();
        regs.write(RegisterId::Q(0), u128::MAX);
        regs.write(RegisterId::S(0), 0x3F80_0000);

        assert_eq!(regs.read(RegisterId::Q(0)), 0x3F80_0000);
        assert_eq!(regs.read(RegisterId::H(0)), 0);
        assert_eq!(regs.read(RegisterId::B(0)), 0);
    }

    #[test]
    fn zero_registers_ignore_writes() {
        let mut regs = RegisterFile::default();
        regs.write(RegisterId::Xzr, 5);
        regs.set_x_or_zr(31, 9);
        assert_eq!(regs.read(RegisterId::Xzr), 0);
        assert_eq!(regs.x_or_zr(31), 0);
    }

    #[test]
    fn register_31_selects_stack_pointer_in_sp_context() {
        let mut regs = RegisterFile::default();
        regs.set_x_or_sp(31, 0x8000);
        assert_eq!(regs.read(RegisterId::Sp), 0x8000);
        assert_eq!(regs.x_or_sp(31), 0x8000);
    }

    #[test]
    fn nzcv_register_keeps_only_flag_bits() {
        let mut regs = RegisterFile::default();
        regs.write(RegisterId::Nzcv, 0xFFFF_FFFF);
        assert_eq!(regs.read(RegisterId::Nzcv), 0xF000_0000);
        assert_eq!(
            regs.nzcv(),
            Nzcv {
                n: true,
                z: true,
                c: true,
                v: true
            }
        );
    }

    #[test]
    fn nzcv_nibble_layout_matches_architecture() {
        let flags = Nzcv::from_nibble(0b1010);
        assert!(flags.n && !flags.z && flags.c && !flags.v);
        assert_eq!(flags.bits(), 0xA000_0000);
    }

    proptest! {
        #[test]
        fn write_then_read_truncates_to_view_width(value in any::<u128>(), index in 0u8..31) {
            let mut regs = RegisterFile::default();
            for id in [
                RegisterId::X(index),
                RegisterId::W(index),
                RegisterId::Q(index),
                RegisterId::D(index),
                RegisterId::S(index),
                RegisterId::H(index),
                RegisterId::B(index),
            ] {
                regs.write(id, value);
                prop_assert_eq!(regs.read(id), value & id.mask());
            }
        }
    }
}
