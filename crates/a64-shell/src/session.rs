//! The interactive session: owns the machine, dispatches lines and renders
//! every reply.

use std::io::{BufRead, Write};

use a64_core::{Machine, RegisterId};
use tracing::{debug, info};

use crate::backend::{Assembler, Emulator, LineAssembler};
use crate::command::{classify, Command};
use crate::config::ShellConfig;
use crate::errors::ShellError;
use crate::pipeline::{execute_line, Report};
use crate::reference::{self, ReferenceEntry, ReferenceTable};
use crate::write::write_command;

/// Greeting printed when a session starts.
pub const BANNER: &str = "Welcome to the Armv8-A A64 shell. Type help or ? to list commands.";
/// Prompt printed before each line is read.
pub const PROMPT: &str = "(A64) ";

const OVERVIEW_ROWS: usize = 8;
const OVERVIEW_TOP: &str =
    "╔══════╡64-BIT REG╞══════╦══╡32-BIT REG╞══╦══════════════════╡MEMORY╞══════════════════╗";
const OVERVIEW_BOTTOM: &str =
    "╚════════════════════════╩════════════════╩════════════════════════════════════════════╝";

const COMMAND_HELP: &[(&str, &str)] = &[
    ("exit", "Exit the program"),
    ("help", "List available commands or show help for one command"),
    ("info", "Display info about an instruction"),
    ("overview", "Show X0-X7, W0-W7 and the memory window"),
    ("write", "Directly write to memory or registers"),
];

/// Whether the session should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// End the session.
    Exit,
}

/// A shell session over an emulator and an assembler.
#[derive(Debug)]
pub struct Session<E = Machine, A = LineAssembler> {
    emulator: E,
    assembler: A,
    config: ShellConfig,
    last_line: Option<String>,
}

impl Session {
    /// Creates a session over a fresh [`Machine`] and the line assembler.
    ///
    /// # Errors
    ///
    /// Returns a [`ShellError`] when the window cannot be mapped.
    pub fn new(config: ShellConfig) -> Result<Self, ShellError> {
        Self::with_backends(Machine::new(), LineAssembler, config)
    }
}

impl<E: Emulator, A: Assembler> Session<E, A> {
    /// Creates a session, mapping the window and pointing `PC` one word past
    /// the instruction slot.
    ///
    /// # Errors
    ///
    /// Returns a [`ShellError`] when the window cannot be mapped or `PC`
    /// cannot be set.
    pub fn with_backends(mut emulator: E, assembler: A, config: ShellConfig) -> Result<Self, ShellError> {
        emulator.map(config.base(), config.backing_size())?;
        emulator.write_register(RegisterId::Pc, u128::from(config.initial_pc()))?;
        info!(
            base = format_args!("{:#x}", config.base()),
            window = config.window(),
            "session started"
        );
        Ok(Self {
            emulator,
            assembler,
            config,
            last_line: None,
        })
    }

    /// The emulator this session drives.
    pub const fn emulator(&self) -> &E {
        &self.emulator
    }

    /// Reads lines from `input` until `exit` or end of input.
    ///
    /// Unless `quiet`, prints the banner once and a prompt before each line.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Io`] when reading or writing fails.
    pub fn run(&mut self, input: impl BufRead, out: &mut impl Write, quiet: bool) -> Result<(), ShellError> {
        if !quiet {
            writeln!(out, "{BANNER}\n")?;
        }
        let mut lines = input.lines();
        loop {
            if !quiet {
                write!(out, "{PROMPT}")?;
                out.flush()?;
            }
            let Some(line) = lines.next().transpose()? else {
                debug!("end of input");
                return Ok(());
            };
            if self.handle_line(&line, out)? == Flow::Exit {
                return Ok(());
            }
        }
    }

    /// Handles one input line, writing every reply to `out`.
    ///
    /// A blank line repeats the last non-blank line. Rejections and faults
    /// are printed, never returned.
    ///
    /// # Errors
    ///
    /// Returns an I/O error only when `out` cannot be written.
    pub fn handle_line(&mut self, line: &str, out: &mut impl Write) -> std::io::Result<Flow> {
        let line = if line.trim().is_empty() {
            let Some(last) = self.last_line.clone() else {
                return Ok(Flow::Continue);
            };
            last
        } else {
            self.last_line = Some(line.to_owned());
            line.to_owned()
        };
        match self.dispatch(&line, out) {
            Ok(flow) => Ok(flow),
            Err(ShellError::Io(err)) => Err(err),
            Err(err) => {
                debug!(line = %line, %err, "rejected");
                writeln!(out, "{err}")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn dispatch(&mut self, line: &str, out: &mut impl Write) -> Result<Flow, ShellError> {
        match classify(line)? {
            Command::Empty => {}
            Command::Exit => return Ok(Flow::Exit),
            Command::Help(topic) => help_command(topic, out)?,
            Command::Overview => self.overview(out)?,
            Command::Info(mnemonic) => info_command(mnemonic, out)?,
            Command::Write(args) => {
                let report = write_command(&mut self.emulator, &self.config, args)?;
                print_report(&report, out)?;
            }
            Command::Execute(source) => {
                let report = execute_line(&mut self.emulator, &self.assembler, &self.config, source)?;
                print_report(&report, out)?;
            }
            Command::Query {
                token,
                register,
                format,
            } => {
                let value = self.emulator.read_register(register.id);
                writeln!(out, "{token}: {}", format.render(value))?;
            }
        }
        Ok(Flow::Continue)
    }

    fn overview(&self, out: &mut impl Write) -> Result<(), ShellError> {
        let base = self.config.base();
        let memory = self.emulator.read_memory(base, self.config.window())?;
        let rows = OVERVIEW_ROWS.min(self.config.window() / 16);

        writeln!(out, "{OVERVIEW_TOP}")?;
        for ((index, chunk), address) in (0u8..)
            .zip(memory.chunks_exact(16))
            .zip((base..).step_by(16))
            .take(rows)
        {
            let x = self.emulator.read_register(RegisterId::X(index));
            let w = self.emulator.read_register(RegisterId::W(index));
            write!(out, "║ X{index}: 0x{x:016x} ║ W{index}: 0x{w:08x} ║ {address:#x}")?;
            for word in chunk.chunks_exact(4) {
                write!(out, " ")?;
                for byte in word {
                    write!(out, "{byte:02X}")?;
                }
            }
            writeln!(out, " ║")?;
        }
        writeln!(out, "{OVERVIEW_BOTTOM}")?;
        Ok(())
    }
}

fn help_command(topic: &str, out: &mut impl Write) -> Result<(), ShellError> {
    if topic.is_empty() {
        writeln!(out)?;
        writeln!(out, "Documented commands (type help <topic>):")?;
        writeln!(out, "{}", "=".repeat(40))?;
        let names: Vec<&str> = COMMAND_HELP.iter().map(|(name, _)| *name).collect();
        writeln!(out, "{}", names.join("  "))?;
        writeln!(out)?;
        return Ok(());
    }
    match COMMAND_HELP.iter().find(|(name, _)| *name == topic) {
        Some((_, summary)) => writeln!(out, "{summary}")?,
        None => info_command(topic, out)?,
    }
    Ok(())
}

fn print_report(report: &Report, out: &mut impl Write) -> Result<(), ShellError> {
    if let Some(fault) = &report.fault {
        writeln!(out, "{fault}")?;
    }
    write!(out, "{}", report.diff)?;
    Ok(())
}

fn info_command(mnemonic: &str, out: &mut impl Write) -> Result<(), ShellError> {
    let mut found = false;
    for table in reference::tables() {
        if let Some(entries) = table.lookup(mnemonic) {
            found = true;
            print_reference(table, mnemonic, entries, out)?;
        }
    }
    if found {
        Ok(())
    } else {
        Err(ShellError::NotFound(mnemonic.to_owned()))
    }
}

fn print_reference(
    table: &ReferenceTable,
    mnemonic: &str,
    entries: &[ReferenceEntry],
    out: &mut impl Write,
) -> Result<(), ShellError> {
    let upper = mnemonic.to_ascii_uppercase();
    let syntax_len = entries.iter().map(|e| e.syntax.chars().count()).max().unwrap_or(0);
    let padding = syntax_len + upper.chars().count() + 2;
    let width = entries
        .iter()
        .map(|e| e.description.chars().count())
        .max()
        .unwrap_or(0)
        + 1;

    writeln!(out, " -- {} --", table.title())?;
    writeln!(out, "╔{}═╦═{}╗", "═".repeat(padding), "═".repeat(width))?;
    for entry in entries {
        let left = format!("{upper} {} ", entry.syntax);
        writeln!(out, "║ {left:<padding$}║ {:<width$}║", entry.description)?;
    }
    writeln!(out, "╚{}═╩═{}╝", "═".repeat(padding), "═".repeat(width))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(ShellConfig::default()).expect("session")
    }

    fn reply(session: &mut Session, line: &str) -> String {
        let mut out = Vec::new();
        session.handle_line(line, &mut out).expect("write to vec");
        String::from_utf8(out).expect("utf-8")
    }

    #[test]
    fn pc_starts_one_word_past_the_slot() {
        let mut session = session();
        assert_eq!(reply(&mut session, "pc"), "pc: 0x1004\n");
    }

    #[test]
    fn blank_line_repeats_the_last_line() {
        let mut session = session();
        assert_eq!(reply(&mut session, ""), "");
        reply(&mut session, "add x0, x0, #1");
        assert_eq!(reply(&mut session, "   "), "X0: 0x0000000000000002\nW0: 0x00000002\n");
        assert_eq!(reply(&mut session, "x0 dec"), "x0: 2\n");
        assert_eq!(reply(&mut session, ""), "x0: 2\n");
    }

    #[test]
    fn repeated_rejection_is_reported_again() {
        let mut session = session();
        reply(&mut session, "frob");
        assert_eq!(
            reply(&mut session, ""),
            "Unknown command or instruction 'frob'\n"
        );
    }

    #[test]
    fn exit_ends_the_session() {
        let mut session = session();
        let mut out = Vec::new();
        assert_eq!(session.handle_line("exit", &mut out).expect("io"), Flow::Exit);
        assert!(out.is_empty());
    }

    #[test]
    fn info_prints_a_box_per_table() {
        let out = reply(&mut session(), "info nop");
        let expected = "\
 -- Base Instructions --
╔══════╦══════════════╗
║ NOP  ║ No operation ║
╚══════╩══════════════╝
";
        assert_eq!(out, expected);
    }

    #[test]
    fn info_covers_both_tables_for_shared_mnemonics() {
        let out = reply(&mut session(), "info add");
        assert!(out.contains(" -- Base Instructions --"));
        assert!(out.contains(" -- SIMD and Floating-point Instructions --"));
        assert!(out.contains("║ ADD Vd.T, Vn.T, Vm.T ║ Vector add "));
    }

    #[test]
    fn info_miss() {
        assert_eq!(
            reply(&mut session(), "info frob"),
            "Instruction 'frob' not found.\n"
        );
    }

    #[test]
    fn help_topics() {
        let mut session = session();
        assert_eq!(reply(&mut session, "help exit"), "Exit the program\n");
        assert!(reply(&mut session, "help").contains("exit  help  info  overview  write"));
        assert!(reply(&mut session, "? fmul").contains("Floating-point multiply"));
    }

    #[test]
    fn overview_layout() {
        let mut session = session();
        reply(&mut session, "write x1 0xabc");
        reply(&mut session, "write 0x1010 0xdeadbeef");
        let out = reply(&mut session, "overview");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], OVERVIEW_TOP);
        assert_eq!(
            lines[1],
            "║ X0: 0x0000000000000000 ║ W0: 0x00000000 ║ 0x1000 00000000 00000000 00000000 00000000 ║"
        );
        assert_eq!(
            lines[2],
            "║ X1: 0x0000000000000abc ║ W1: 0x00000abc ║ 0x1010 DEADBEEF 00000000 00000000 00000000 ║"
        );
        assert_eq!(lines[9], OVERVIEW_BOTTOM);
        for line in &lines {
            assert_eq!(line.chars().count(), OVERVIEW_TOP.chars().count());
        }
    }

    #[test]
    fn run_prints_banner_and_prompts() {
        let mut session = session();
        let mut out = Vec::new();
        session
            .run("x0\nexit\nx0\n".as_bytes(), &mut out, false)
            .expect("run");
        let text = String::from_utf8(out).expect("utf-8");
        assert_eq!(text, format!("{BANNER}\n\n{PROMPT}x0: 0x0\n{PROMPT}"));
    }

    #[test]
    fn quiet_run_stops_at_end_of_input() {
        let mut session = session();
        let mut out = Vec::new();
        session
            .run("write x0 7\nx0 dec\n".as_bytes(), &mut out, true)
            .expect("run");
        let text = String::from_utf8(out).expect("utf-8");
        assert_eq!(text, "X0: 0x0000000000000007\nW0: 0x00000007\nx0: 7\n");
    }
}
