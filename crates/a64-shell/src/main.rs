//! `a64sh`: interactive Armv8-A A64 shell.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use a64_shell::{Session, ShellConfig, ShellError, DEFAULT_WINDOW};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use a64_asm as _;
use a64_core as _;
use thiserror as _;
use tracing as _;
#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
#[cfg(test)]
use tempfile as _;

/// Run single A64 instructions and see what they change.
#[derive(Debug, Parser)]
#[command(name = "a64sh", version)]
struct Args {
    /// Address of the memory window and instruction slot (hex)
    #[arg(long, default_value = "0x1000", value_parser = parse_hex)]
    base: u64,

    /// Size of the memory window in bytes
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    window: usize,

    /// Do not print the banner or prompts
    #[arg(short, long)]
    quiet: bool,

    /// Read commands from this file instead of standard input
    script: Option<PathBuf>,
}

fn parse_hex(text: &str) -> Result<u64, String> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u64::from_str_radix(digits, 16).map_err(|err| format!("invalid hex address '{text}': {err}"))
}

fn run(args: Args) -> Result<(), ShellError> {
    let config = ShellConfig::new(args.base, args.window)?;
    let mut session = Session::new(config)?;
    let mut stdout = io::stdout().lock();

    match args.script {
        Some(path) => {
            let file = File::open(path)?;
            session.run(BufReader::new(file), &mut stdout, args.quiet)
        }
        None => session.run(io::stdin().lock(), &mut stdout, args.quiet),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_match_reference_configuration() {
        let args = Args::parse_from(["a64sh"]);
        assert_eq!(args.base, a64_shell::DEFAULT_BASE);
        assert_eq!(args.window, DEFAULT_WINDOW);
        assert!(!args.quiet);
        assert_eq!(args.script, None);
    }

    #[test]
    fn base_is_hexadecimal_with_or_without_prefix() {
        assert_eq!(Args::parse_from(["a64sh", "--base", "0x2000"]).base, 0x2000);
        assert_eq!(Args::parse_from(["a64sh", "--base", "2000"]).base, 0x2000);
        assert!(Args::try_parse_from(["a64sh", "--base", "zz"]).is_err());
    }

    #[test]
    fn script_and_quiet() {
        let args = Args::parse_from(["a64sh", "-q", "demo.a64"]);
        assert!(args.quiet);
        assert_eq!(args.script, Some(PathBuf::from("demo.a64")));
    }
}
