//! End-to-end sessions driven line by line with output captured in memory.

use a64_asm::AsmError;
use a64_core::{FaultCode, Machine, MachineError, RegisterId};
use a64_shell::{Assembler, Emulator, Session, ShellConfig};
use clap as _;
use proptest::prelude::*;
use rstest::rstest;
use tempfile as _;
use thiserror as _;
use tracing as _;
use tracing_subscriber as _;

fn session() -> Session {
    Session::new(ShellConfig::default()).expect("session")
}

fn send(session: &mut Session, line: &str) -> String {
    let mut out = Vec::new();
    session.handle_line(line, &mut out).expect("write to vec");
    String::from_utf8(out).expect("utf-8")
}

fn transcript(lines: &[&str]) -> String {
    let mut session = session();
    let mut out = Vec::new();
    session
        .run(lines.join("\n").as_bytes(), &mut out, true)
        .expect("run");
    String::from_utf8(out).expect("utf-8")
}

#[test]
fn hex_then_decimal_queries() {
    let mut session = session();
    send(&mut session, "write X0, 0x2A");
    assert_eq!(send(&mut session, "X0"), "X0: 0x2a\n");

    send(&mut session, "write X0, 42");
    assert_eq!(send(&mut session, "X0 dec"), "X0: 42\n");
    assert_eq!(send(&mut session, "x0 bin"), "x0: 101010\n");
}

#[test]
fn mov_reports_both_views_and_no_memory() {
    let out = transcript(&["write X0, 5", "MOV X1, X0"]);
    let after_write = "X0: 0x0000000000000005\nW0: 0x00000005\n";
    assert_eq!(
        out,
        format!("{after_write}X1: 0x0000000000000005\nW1: 0x00000005\n")
    );
}

#[test]
fn instruction_touching_nothing_prints_nothing() {
    assert_eq!(transcript(&["nop"]), "");
    assert_eq!(transcript(&["cmp x0, #1", "nop"]), "NZCV: 0x80000000\n");
}

#[test]
fn odd_length_hex_write_stores_one_byte() {
    let mut session = session();
    assert_eq!(send(&mut session, "write 0x1010 0x1"), "0x1010 10000000\n");
    assert_eq!(
        session.emulator().read_memory(0x1010, 4).expect("read"),
        [0x10, 0, 0, 0]
    );
}

#[test]
fn zero_write_changes_nothing() {
    let mut session = session();
    let before = session.emulator().clone();
    assert_eq!(send(&mut session, "write 0x1010 0"), "");
    assert_eq!(session.emulator(), &before);
}

#[test]
fn thirty_two_bit_registers_print_eight_digits() {
    let out = transcript(&["movz w7, #1"]);
    assert!(out.lines().any(|line| line == "W7: 0x00000001"), "{out}");
}

#[test]
fn stores_below_word_four_are_hidden() {
    let out = transcript(&[
        "write x1 0x1000",
        "write x2 -1",
        "str x2, [x1, #8]",
        "str x2, [x1, #16]",
    ]);
    let memory: Vec<&str> = out.lines().filter(|l| l.starts_with("0x")).collect();
    assert_eq!(memory, ["0x1010 FFFFFFFF", "0x1014 FFFFFFFF"]);
}

#[rstest]
#[case("add x0, x1")]
#[case("add x0, x1, #0x12345")]
#[case("mov x0, #0x1234567")]
#[case("ldr x0, [x1, #-300]")]
#[case("ldr x0, [x1")]
#[case("movz x0, #0x10000")]
fn malformed_instructions_leave_state_identical(#[case] line: &str) {
    let mut session = session();
    let before = session.emulator().clone();
    let out = send(&mut session, line);
    assert_eq!(out.lines().count(), 1, "{out}");
    assert_eq!(session.emulator(), &before);
}

#[rstest]
#[case("add x0, x0, #1", "X0: 0x0000000000000001")]
#[case("x0", "x0: 0x0")]
#[case("b 0x1000", "Branching instructions are not supported")]
#[case("cbz x0, done", "Branching instructions are not supported")]
#[case("done:", "Labels are not supported")]
#[case(".align 4", "Directives are not supported")]
#[case("banana", "Unknown command or instruction 'banana'")]
#[case("x0 hexa", "Unknown argument 'hexa'")]
#[case("write x0", "Invalid arguments")]
#[case("write x0 0x", "Invalid value")]
#[case("write 0x1010 -3", "Invalid value")]
#[case("write xyz 3", "'xyz' is not recognized as a register or memory address")]
fn dispatcher_replies(#[case] line: &str, #[case] first_line: &str) {
    let out = send(&mut session(), line);
    assert_eq!(out.lines().next(), Some(first_line), "{out}");
}

#[test]
fn fault_leaves_pc_on_the_slot() {
    let out = transcript(&["svc #0", "pc"]);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        [
            "unhandled exception-generating instruction at pc 0x1000",
            "PC: 0x00001000",
            "pc: 0x1000",
        ]
    );
}

#[test]
fn faulting_load_reports_the_fault_only() {
    let out = transcript(&["write x1 0x100000", "ldr x0, [x1]"]);
    let lines: Vec<&str> = out.lines().skip(2).collect();
    assert_eq!(
        lines,
        ["data access to unmapped memory at pc 0x1000", "PC: 0x00001000"]
    );
}

#[test]
fn memory_write_outside_the_mapping_is_reported() {
    let out = send(&mut session(), "write 0x10 0xff");
    assert_eq!(
        out,
        "invalid memory access of 1 byte(s) at 0x10 (unmapped)\n"
    );
}

#[test]
fn floating_point_sequence() {
    let out = transcript(&["fmov d0, #1.5", "fadd d1, d0, d0", "fcvtzs x2, d1", "x2 dec"]);
    assert!(out.ends_with("x2: 3\n"), "{out}");
    assert!(out.contains("D1: 0x4008000000000000"), "{out}");
}

#[rstest]
#[case(&["fmov d1, #-1.0", "fsqrt d2, d1", "d2"], "d2: 0x7ff8000000000000")]
#[case(&["fmov d3, xzr", "fdiv d4, d3, d3", "d4"], "d4: 0x7ff8000000000000")]
#[case(&["fmov s1, #-1.0", "fsqrt s2, s1", "s2"], "s2: 0x7fc00000")]
#[case(&["fneg d5, d3", "fmax d7, d3, d5", "d7"], "d7: 0x0")]
#[case(&["fneg d5, d3", "fmin d9, d5, d3", "d9"], "d9: 0x8000000000000000")]
fn floating_point_special_values(#[case] lines: &[&str], #[case] last: &str) {
    let out = transcript(lines);
    assert_eq!(out.lines().last(), Some(last), "{out}");
}

#[test]
fn custom_window_shrinks_the_overview() {
    let config = ShellConfig::new(0x4000, 32).expect("config");
    let mut session = Session::new(config).expect("session");
    let out = send(&mut session, "overview");
    assert_eq!(out.lines().count(), 4);
    assert!(out.contains("║ 0x4010 "));
    assert_eq!(send(&mut session, "pc"), "pc: 0x4004\n");
}

#[derive(Debug, Default)]
struct ReadOnlyRegisters {
    inner: Machine,
}

impl Emulator for ReadOnlyRegisters {
    fn map(&mut self, base: u64, size: u64) -> Result<(), MachineError> {
        self.inner.map_memory(base, size)
    }

    fn read_register(&self, id: RegisterId) -> u128 {
        self.inner.read_register(id)
    }

    fn write_register(&mut self, id: RegisterId, value: u128) -> Result<(), MachineError> {
        if id == RegisterId::Pc {
            self.inner.write_register(id, value);
            return Ok(());
        }
        Err(MachineError::UnknownRegister(id.to_string()))
    }

    fn read_memory(&self, address: u64, len: usize) -> Result<Vec<u8>, MachineError> {
        self.inner.read_memory(address, len)
    }

    fn write_memory(&mut self, address: u64, bytes: &[u8]) -> Result<(), MachineError> {
        self.inner.write_memory(address, bytes)
    }

    fn execute_one(&mut self, address: u64) -> Result<(), MachineError> {
        Err(MachineError::Fault {
            pc: address,
            code: FaultCode::UnsupportedEncoding,
        })
    }
}

#[derive(Debug)]
struct FixedAssembler(u32);

impl Assembler for FixedAssembler {
    fn assemble(&self, source: &str, _address: u64) -> Result<Vec<u8>, AsmError> {
        if source.contains('!') {
            return Err(AsmError::Empty);
        }
        Ok(self.0.to_le_bytes().to_vec())
    }
}

#[test]
fn shell_core_runs_against_stub_backends() {
    let mut session = Session::with_backends(
        ReadOnlyRegisters::default(),
        FixedAssembler(0xD503_201F),
        ShellConfig::default(),
    )
    .expect("session");
    let mut out = Vec::new();
    session
        .run("write x0 1\nnop\nnop !\n".as_bytes(), &mut out, true)
        .expect("run");
    let text = String::from_utf8(out).expect("utf-8");
    assert_eq!(
        text,
        format!(
            "unknown register 'X0'\ninstruction not supported by the emulator at pc 0x1000\n{}\n",
            AsmError::Empty
        )
    );
}

proptest! {
    #[test]
    fn register_write_reads_back_truncated(value in any::<u64>(), index in 0u8..31) {
        let mut session = session();
        send(&mut session, &format!("write w{index} {value}"));
        let reply = send(&mut session, &format!("x{index} dec"));
        prop_assert_eq!(reply, format!("x{index}: {}\n", value & 0xFFFF_FFFF));
    }

    #[test]
    fn add_matches_host_arithmetic(a in any::<u32>(), b in any::<u32>()) {
        let mut session = session();
        send(&mut session, &format!("write w1 {a}"));
        send(&mut session, &format!("write w2 {b}"));
        send(&mut session, "add w0, w1, w2");
        let reply = send(&mut session, "w0 dec");
        prop_assert_eq!(reply, format!("w0: {}\n", a.wrapping_add(b)));
    }
}
