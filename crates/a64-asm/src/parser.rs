//! Single-line A64 assembly parser.
//!
//! Turns one source line into an upper-case mnemonic plus a list of typed
//! operands. No encoding decisions are made here.

use a64_core::{Condition, Extend, ShiftType};

use crate::errors::AsmError;

/// Register bank and view width of a scalar register operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegClass {
    /// 64-bit general register.
    X,
    /// 32-bit general register.
    W,
    /// 8-bit SIMD/FP scalar.
    B,
    /// 16-bit SIMD/FP scalar.
    H,
    /// 32-bit SIMD/FP scalar.
    S,
    /// 64-bit SIMD/FP scalar.
    D,
    /// 128-bit SIMD/FP scalar.
    Q,
}

impl RegClass {
    /// Returns `true` for `X` and `W`.
    #[must_use]
    pub const fn is_general(self) -> bool {
        matches!(self, Self::X | Self::W)
    }

    /// Log2 of the view size in bytes (`B` is 0, `Q` is 4).
    #[must_use]
    pub const fn size_log2(self) -> u32 {
        match self {
            Self::B => 0,
            Self::H => 1,
            Self::W | Self::S => 2,
            Self::X | Self::D => 3,
            Self::Q => 4,
        }
    }
}

/// A scalar register operand.
///
/// Index 31 of a general register is the stack pointer when `sp` is set and
/// the zero register otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg {
    /// Bank and width.
    pub class: RegClass,
    /// Register number.
    pub index: u8,
    /// Written as `SP`/`WSP`.
    pub sp: bool,
}

impl Reg {
    /// Returns `true` for `XZR`/`WZR`.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.class.is_general() && self.index == 31 && !self.sp
    }
}

/// Vector arrangement specifier (`.8B` .. `.2D`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arrangement {
    /// Eight bytes.
    B8,
    /// Sixteen bytes.
    B16,
    /// Four halfwords.
    H4,
    /// Eight halfwords.
    H8,
    /// Two words.
    S2,
    /// Four words.
    S4,
    /// One doubleword.
    D1,
    /// Two doublewords.
    D2,
}

impl Arrangement {
    fn parse(text: &str) -> Option<Self> {
        Some(match text {
            "8B" => Self::B8,
            "16B" => Self::B16,
            "4H" => Self::H4,
            "8H" => Self::H8,
            "2S" => Self::S2,
            "4S" => Self::S4,
            "1D" => Self::D1,
            "2D" => Self::D2,
            _ => return None,
        })
    }

    /// `Q` bit: whether the full 128 bits are used.
    #[must_use]
    pub const fn q(self) -> bool {
        matches!(self, Self::B16 | Self::H8 | Self::S4 | Self::D2)
    }

    /// Log2 of the element size in bytes.
    #[must_use]
    pub const fn size(self) -> u32 {
        match self {
            Self::B8 | Self::B16 => 0,
            Self::H4 | Self::H8 => 1,
            Self::S2 | Self::S4 => 2,
            Self::D1 | Self::D2 => 3,
        }
    }
}

/// Offset part of a memory operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOffset {
    /// `[Xn]`
    None,
    /// `[Xn, #imm]`
    Immediate(i64),
    /// `[Xn, Rm{, extend {#amount}}]`; a bare index or `LSL` is `UXTX`.
    Register {
        /// Index register.
        rm: Reg,
        /// Extend applied to the index.
        extend: Extend,
        /// Explicit shift amount, if written.
        amount: Option<u8>,
    },
}

/// A bracketed memory operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryOperand {
    /// Base register (`Xn` or `SP`).
    pub base: Reg,
    /// Offset inside the brackets.
    pub offset: MemoryOffset,
    /// Trailing `!`.
    pub pre_index: bool,
}

/// One parsed operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    /// Scalar register.
    Register(Reg),
    /// Whole vector with arrangement, e.g. `V1.4S`.
    Vector {
        /// Register number.
        index: u8,
        /// Arrangement specifier.
        arrangement: Arrangement,
    },
    /// Vector element, e.g. `V1.S[2]`.
    Element {
        /// Register number.
        index: u8,
        /// Log2 of the element size in bytes.
        esize_log2: u8,
        /// Element index.
        lane: u8,
    },
    /// Integer immediate.
    Immediate(i64),
    /// Floating-point immediate.
    Float(f64),
    /// Shift modifier, e.g. `LSL #12`.
    Shift {
        /// Shift kind.
        kind: ShiftType,
        /// Shift amount.
        amount: u8,
    },
    /// Extend modifier, e.g. `UXTW #2`.
    Extend {
        /// Extend kind.
        kind: Extend,
        /// Optional left shift.
        amount: Option<u8>,
    },
    /// Condition code.
    Condition(Condition),
    /// Memory operand.
    Memory(MemoryOperand),
}

/// A parsed instruction line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInstruction {
    /// Mnemonic, upper-cased.
    pub mnemonic: String,
    /// Operands in source order.
    pub operands: Vec<Operand>,
}

/// Parses one line of assembly.
///
/// Comments start with `//` or `;`. Blank lines of a multi-line input are
/// ignored, but only one instruction may remain.
///
/// # Errors
///
/// Returns [`AsmError::Empty`], [`AsmError::MultipleInstructions`] or an
/// operand error.
pub fn parse_line(source: &str) -> Result<ParsedInstruction, AsmError> {
    let (mnemonic, rest) = split_mnemonic(instruction_text(source)?);

    let operands = split_operands(rest)
        .iter()
        .map(|token| parse_operand(token))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedInstruction {
        mnemonic: mnemonic.to_ascii_uppercase(),
        operands,
    })
}

/// Returns the single instruction in `source` with comments and blank lines removed.
///
/// # Errors
///
/// Returns [`AsmError::Empty`] or [`AsmError::MultipleInstructions`].
pub fn instruction_text(source: &str) -> Result<&str, AsmError> {
    let mut lines = source
        .lines()
        .map(|line| strip_comment(line).trim())
        .filter(|line| !line.is_empty());

    let text = lines.next().ok_or(AsmError::Empty)?;
    if lines.next().is_some() {
        return Err(AsmError::MultipleInstructions);
    }
    Ok(text)
}

/// Splits an instruction into its mnemonic and the raw operand text.
#[must_use]
pub fn split_mnemonic(text: &str) -> (&str, &str) {
    let text = text.trim();
    text.find(char::is_whitespace)
        .map_or((text, ""), |pos| (&text[..pos], text[pos..].trim()))
}

fn strip_comment(line: &str) -> &str {
    let cut = [line.find("//"), line.find(';')]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());
    &line[..cut]
}

/// Splits on commas outside brackets.
fn split_operands(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for ch in text.chars() {
        match ch {
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                tokens.push(current.trim().to_owned());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() || !tokens.is_empty() {
        tokens.push(current.trim().to_owned());
    }
    tokens
}

/// Parses a single operand token.
///
/// # Errors
///
/// Returns [`AsmError::InvalidRegister`] or [`AsmError::InvalidImmediate`]
/// for tokens that cannot be read as any operand.
pub fn parse_operand(token: &str) -> Result<Operand, AsmError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AsmError::InvalidImmediate(String::new()));
    }

    if token.starts_with('[') {
        return parse_memory(token).map(Operand::Memory);
    }

    if token.starts_with('#')
        || token.starts_with('-')
        || token.starts_with(|c: char| c.is_ascii_digit())
    {
        return parse_immediate(token);
    }

    let upper = token.to_ascii_uppercase();
    if let Some(reg) = parse_register(&upper) {
        return Ok(Operand::Register(reg));
    }
    if let Some(operand) = parse_vector(&upper) {
        return Ok(operand);
    }
    if let Some(operand) = parse_modifier(&upper)? {
        return Ok(operand);
    }
    if let Some(cond) = Condition::parse(&upper) {
        return Ok(Operand::Condition(cond));
    }

    Err(AsmError::InvalidRegister(token.to_owned()))
}

/// Resolves a scalar register name (already upper-cased).
#[must_use]
pub fn parse_register(upper: &str) -> Option<Reg> {
    let named = |class, index, sp| Some(Reg { class, index, sp });
    match upper {
        "SP" => return named(RegClass::X, 31, true),
        "WSP" => return named(RegClass::W, 31, true),
        "XZR" => return named(RegClass::X, 31, false),
        "WZR" => return named(RegClass::W, 31, false),
        "FP" => return named(RegClass::X, 29, false),
        "LR" => return named(RegClass::X, 30, false),
        _ => {}
    }

    let mut chars = upper.chars();
    let class = match chars.next()? {
        'X' => RegClass::X,
        'W' => RegClass::W,
        'B' => RegClass::B,
        'H' => RegClass::H,
        'S' => RegClass::S,
        'D' => RegClass::D,
        'Q' => RegClass::Q,
        _ => return None,
    };
    let index = parse_register_number(chars.as_str())?;
    let limit = if class.is_general() { 31 } else { 32 };
    (index < limit).then_some(Reg {
        class,
        index,
        sp: false,
    })
}

fn parse_register_number(digits: &str) -> Option<u8> {
    if digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || (digits.len() > 1 && digits.starts_with('0'))
    {
        return None;
    }
    digits.parse().ok()
}

fn parse_vector(upper: &str) -> Option<Operand> {
    let rest = upper.strip_prefix('V')?;
    let (number, suffix) = rest.split_once('.')?;
    let index = parse_register_number(number).filter(|n| *n < 32)?;

    if let Some(arrangement) = Arrangement::parse(suffix) {
        return Some(Operand::Vector { index, arrangement });
    }

    let (size, lane) = suffix.split_once('[')?;
    let lane = lane.strip_suffix(']')?.trim().parse::<u8>().ok()?;
    let esize_log2 = match size {
        "B" => 0,
        "H" => 1,
        "S" => 2,
        "D" => 3,
        _ => return None,
    };
    (u32::from(lane) < (16 >> esize_log2)).then_some(Operand::Element {
        index,
        esize_log2,
        lane,
    })
}

/// Parses `LSL #n`-style shifts and `UXTW {#n}`-style extends.
fn parse_modifier(upper: &str) -> Result<Option<Operand>, AsmError> {
    let (name, amount_text) = upper
        .split_once(char::is_whitespace)
        .map_or((upper, None), |(name, amount)| (name, Some(amount.trim())));

    let amount = match amount_text {
        Some(text) => {
            let value =
                parse_integer(text).ok_or_else(|| AsmError::InvalidImmediate(text.to_owned()))?;
            let amount = u8::try_from(value)
                .ok()
                .filter(|amount| *amount < 64)
                .ok_or_else(|| AsmError::out_of_range(value, "shift amount must be 0..=63"))?;
            Some(amount)
        }
        None => None,
    };

    if let Some(kind) = ShiftType::parse(name) {
        return match amount {
            Some(amount) => Ok(Some(Operand::Shift { kind, amount })),
            None => Err(AsmError::InvalidImmediate(upper.to_owned())),
        };
    }
    Ok(Extend::parse(name).map(|kind| Operand::Extend { kind, amount }))
}

fn parse_memory(token: &str) -> Result<MemoryOperand, AsmError> {
    let close = token
        .find(']')
        .ok_or_else(|| AsmError::InvalidRegister(token.to_owned()))?;
    let inside = &token[1..close];
    let pre_index = match token[close + 1..].trim() {
        "" => false,
        "!" => true,
        other => return Err(AsmError::InvalidImmediate(other.to_owned())),
    };

    let parts: Vec<&str> = inside.split(',').map(str::trim).collect();
    let base_text = parts.first().copied().unwrap_or_default();
    let base = parse_register(&base_text.to_ascii_uppercase())
        .filter(|reg| reg.class == RegClass::X && (reg.sp || reg.index != 31))
        .ok_or_else(|| AsmError::InvalidRegister(base_text.to_owned()))?;

    let offset = match parts.as_slice() {
        [_] => MemoryOffset::None,
        [_, second] if is_immediate_text(second) => {
            let value = parse_integer(second)
                .ok_or_else(|| AsmError::InvalidImmediate((*second).to_owned()))?;
            MemoryOffset::Immediate(value)
        }
        [_, second, ..] if is_immediate_text(second) => {
            return Err(AsmError::InvalidImmediate(inside.to_owned()));
        }
        [_, index, modifier @ ..] => {
            let rm = parse_register(&index.to_ascii_uppercase())
                .filter(|reg| reg.class.is_general() && !reg.sp)
                .ok_or_else(|| AsmError::InvalidRegister((*index).to_owned()))?;
            let (extend, amount) = match modifier {
                [] => (Extend::Uxtx, None),
                [text] => match parse_modifier(&text.to_ascii_uppercase())? {
                    Some(Operand::Shift {
                        kind: ShiftType::Lsl,
                        amount,
                    }) => (Extend::Uxtx, Some(amount)),
                    Some(Operand::Extend { kind, amount }) => (kind, amount),
                    _ => return Err(AsmError::InvalidImmediate((*text).to_owned())),
                },
                _ => return Err(AsmError::InvalidImmediate(inside.to_owned())),
            };
            MemoryOffset::Register { rm, extend, amount }
        }
        [] => return Err(AsmError::InvalidRegister(String::new())),
    };

    Ok(MemoryOperand {
        base,
        offset,
        pre_index,
    })
}

fn is_immediate_text(text: &str) -> bool {
    text.starts_with('#') || text.starts_with('-') || text.starts_with(|c: char| c.is_ascii_digit())
}

fn parse_immediate(token: &str) -> Result<Operand, AsmError> {
    let text = token.strip_prefix('#').unwrap_or(token).trim();
    if let Some(value) = parse_integer(text) {
        return Ok(Operand::Immediate(value));
    }
    let is_float = !text.to_ascii_lowercase().contains("0x")
        && text.contains(|c: char| c == '.' || c == 'e' || c == 'E');
    if is_float {
        if let Ok(value) = text.parse::<f64>() {
            return Ok(Operand::Float(value));
        }
    }
    Err(AsmError::InvalidImmediate(token.to_owned()))
}

/// Parses a decimal, `0x` hex or `0b` binary integer with optional `#` and sign.
///
/// Values above `i64::MAX` keep their 64-bit pattern.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    let text = text.strip_prefix('#').unwrap_or(text).trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let lower = digits.to_ascii_lowercase();

    let magnitude = if let Some(hex) = lower.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u64::from_str_radix(bin, 2).ok()?
    } else if !lower.is_empty() && lower.bytes().all(|b| b.is_ascii_digit()) {
        lower.parse::<u64>().ok()?
    } else {
        return None;
    };

    let value = magnitude as i64;
    Some(if negative { value.wrapping_neg() } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn x(index: u8) -> Reg {
        Reg {
            class: RegClass::X,
            index,
            sp: false,
        }
    }

    #[test]
    fn splits_mnemonic_and_operands() {
        let parsed = parse_line("add x0, x1, #4").expect("parse");
        assert_eq!(parsed.mnemonic, "ADD");
        assert_eq!(
            parsed.operands,
            vec![
                Operand::Register(x(0)),
                Operand::Register(x(1)),
                Operand::Immediate(4)
            ]
        );
    }

    #[test]
    fn strips_both_comment_styles() {
        assert_eq!(parse_line("nop // idle").expect("parse").mnemonic, "NOP");
        assert_eq!(parse_line("nop ; idle").expect("parse").mnemonic, "NOP");
        assert_eq!(parse_line("  // nothing"), Err(AsmError::Empty));
    }

    #[test]
    fn rejects_two_instructions() {
        assert_eq!(
            parse_line("nop\nnop"),
            Err(AsmError::MultipleInstructions)
        );
    }

    #[rstest]
    #[case("sp", Reg { class: RegClass::X, index: 31, sp: true })]
    #[case("wzr", Reg { class: RegClass::W, index: 31, sp: false })]
    #[case("lr", Reg { class: RegClass::X, index: 30, sp: false })]
    #[case("q31", Reg { class: RegClass::Q, index: 31, sp: false })]
    #[case("h7", Reg { class: RegClass::H, index: 7, sp: false })]
    fn register_operands(#[case] text: &str, #[case] expected: Reg) {
        assert_eq!(parse_operand(text), Ok(Operand::Register(expected)));
    }

    #[rstest]
    #[case("x31")]
    #[case("w01")]
    #[case("q32")]
    #[case("r3")]
    fn invalid_registers(#[case] text: &str) {
        assert_eq!(
            parse_operand(text),
            Err(AsmError::InvalidRegister(text.to_owned()))
        );
    }

    #[rstest]
    #[case("#42", 42)]
    #[case("#-16", -16)]
    #[case("0x1F", 31)]
    #[case("#0b101", 5)]
    #[case("#0xFFFFFFFFFFFFFFFF", -1)]
    fn integer_immediates(#[case] text: &str, #[case] expected: i64) {
        assert_eq!(parse_operand(text), Ok(Operand::Immediate(expected)));
    }

    #[test]
    fn float_immediates() {
        assert_eq!(parse_operand("#1.5"), Ok(Operand::Float(1.5)));
        assert_eq!(parse_operand("#-0.25"), Ok(Operand::Float(-0.25)));
        assert!(matches!(
            parse_operand("#1.2.3"),
            Err(AsmError::InvalidImmediate(_))
        ));
    }

    #[test]
    fn vectors_and_elements() {
        assert_eq!(
            parse_operand("v3.4s"),
            Ok(Operand::Vector {
                index: 3,
                arrangement: Arrangement::S4
            })
        );
        assert_eq!(
            parse_operand("V1.D[1]"),
            Ok(Operand::Element {
                index: 1,
                esize_log2: 3,
                lane: 1
            })
        );
        assert!(parse_operand("v1.d[2]").is_err());
    }

    #[test]
    fn modifiers_and_conditions() {
        assert_eq!(
            parse_operand("lsl #12"),
            Ok(Operand::Shift {
                kind: ShiftType::Lsl,
                amount: 12
            })
        );
        assert_eq!(
            parse_operand("sxtw"),
            Ok(Operand::Extend {
                kind: Extend::Sxtw,
                amount: None
            })
        );
        assert_eq!(parse_operand("ne"), Ok(Operand::Condition(Condition::Ne)));
    }

    #[test]
    fn memory_operand_forms() {
        let sp = Reg {
            class: RegClass::X,
            index: 31,
            sp: true,
        };
        assert_eq!(
            parse_operand("[sp, #-16]!"),
            Ok(Operand::Memory(MemoryOperand {
                base: sp,
                offset: MemoryOffset::Immediate(-16),
                pre_index: true
            }))
        );
        assert_eq!(
            parse_operand("[x1]"),
            Ok(Operand::Memory(MemoryOperand {
                base: x(1),
                offset: MemoryOffset::None,
                pre_index: false
            }))
        );
        assert_eq!(
            parse_operand("[x1, x2, lsl #3]"),
            Ok(Operand::Memory(MemoryOperand {
                base: x(1),
                offset: MemoryOffset::Register {
                    rm: x(2),
                    extend: Extend::Uxtx,
                    amount: Some(3)
                },
                pre_index: false
            }))
        );
        assert!(parse_operand("[xzr]").is_err());
    }

    #[test]
    fn post_index_is_a_separate_operand() {
        let parsed = parse_line("ldr x0, [x1], #8").expect("parse");
        assert_eq!(parsed.operands.len(), 3);
        assert_eq!(parsed.operands[2], Operand::Immediate(8));
    }
}
