//! The fixed set of registers the shell can name, query, write and diff.

use std::collections::HashMap;
use std::sync::OnceLock;

use a64_core::{RegisterId, GENERAL_REGISTER_COUNT, VECTOR_REGISTER_COUNT};

/// Hex digits used when printing a register of unknown family.
const DEFAULT_DIGITS: usize = 8;

/// One addressable register name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterEntry {
    /// Canonical upper-case name.
    pub name: String,
    /// Emulator handle the name resolves to.
    pub id: RegisterId,
}

/// Ordered register names with case-insensitive lookup.
///
/// Order is `X0-X30`, `W0-W30`, `SP`, `PC`, `NZCV`, then `Q`, `D`, `S`, `H`,
/// `B` `0-31`. Diffs are reported in this order.
#[derive(Debug)]
pub struct RegisterTable {
    entries: Vec<RegisterEntry>,
    index: HashMap<String, usize>,
}

impl RegisterTable {
    fn build() -> Self {
        let general = u8::try_from(GENERAL_REGISTER_COUNT).unwrap_or(u8::MAX);
        let vector = u8::try_from(VECTOR_REGISTER_COUNT).unwrap_or(u8::MAX);

        let mut ids: Vec<RegisterId> = Vec::new();
        ids.extend((0..general).map(RegisterId::X));
        ids.extend((0..general).map(RegisterId::W));
        ids.extend([RegisterId::Sp, RegisterId::Pc, RegisterId::Nzcv]);
        for family in [
            RegisterId::Q as fn(u8) -> RegisterId,
            RegisterId::D,
            RegisterId::S,
            RegisterId::H,
            RegisterId::B,
        ] {
            ids.extend((0..vector).map(family));
        }

        let entries: Vec<RegisterEntry> = ids
            .into_iter()
            .map(|id| RegisterEntry {
                name: id.to_string(),
                id,
            })
            .collect();
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.name.clone(), i))
            .collect();
        Self { entries, index }
    }

    /// Entries in report order.
    #[must_use]
    pub fn entries(&self) -> &[RegisterEntry] {
        &self.entries
    }

    /// Resolves a register name, ignoring ASCII case.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&RegisterEntry> {
        self.index
            .get(&name.to_ascii_uppercase())
            .map(|&i| &self.entries[i])
    }
}

/// Shared register table, built on first use.
#[must_use]
pub fn register_table() -> &'static RegisterTable {
    static TABLE: OnceLock<RegisterTable> = OnceLock::new();
    TABLE.get_or_init(RegisterTable::build)
}

/// Hex digits a register is zero-padded to in diffs.
///
/// Keyed by the first character of the name; names without a digit use 8.
#[must_use]
pub fn display_digits(name: &str) -> usize {
    if !name.bytes().any(|b| b.is_ascii_digit()) {
        return DEFAULT_DIGITS;
    }
    match name.bytes().next().map(|b| b.to_ascii_uppercase()) {
        Some(b'X' | b'D') => 16,
        Some(b'Q') => 32,
        Some(b'H') => 4,
        Some(b'B') => 2,
        _ => DEFAULT_DIGITS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn table_order_and_size() {
        let table = register_table();
        let names: Vec<&str> = table.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names.len(), 31 * 2 + 3 + 32 * 5);
        assert_eq!(names[0], "X0");
        assert_eq!(names[30], "X30");
        assert_eq!(names[31], "W0");
        assert_eq!(&names[62..65], &["SP", "PC", "NZCV"]);
        assert_eq!(names[65], "Q0");
        assert_eq!(names.last(), Some(&"B31"));
    }

    #[rstest]
    #[case("x0", RegisterId::X(0))]
    #[case("W30", RegisterId::W(30))]
    #[case("sp", RegisterId::Sp)]
    #[case("Pc", RegisterId::Pc)]
    #[case("nzcv", RegisterId::Nzcv)]
    #[case("q31", RegisterId::Q(31))]
    #[case("h7", RegisterId::H(7))]
    fn lookup_ignores_case(#[case] name: &str, #[case] id: RegisterId) {
        assert_eq!(register_table().lookup(name).map(|e| e.id), Some(id));
    }

    #[rstest]
    #[case("x31")]
    #[case("xzr")]
    #[case("v0")]
    #[case("lr")]
    #[case("x01")]
    #[case("")]
    fn names_outside_the_table_are_unknown(#[case] name: &str) {
        assert!(register_table().lookup(name).is_none());
    }

    #[rstest]
    #[case("X3", 16)]
    #[case("W3", 8)]
    #[case("Q3", 32)]
    #[case("D3", 16)]
    #[case("S3", 8)]
    #[case("H3", 4)]
    #[case("B3", 2)]
    #[case("SP", 8)]
    #[case("PC", 8)]
    #[case("NZCV", 8)]
    fn digits_follow_the_family(#[case] name: &str, #[case] digits: usize) {
        assert_eq!(display_digits(name), digits);
    }
}
