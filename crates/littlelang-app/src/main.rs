//! Command-line driver: read a source file, run it, and render diagnostics
//! with the offending line and a caret.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use littlelang::{execute, parse_program, Config, Error, Position};

/// Tree-walk interpreter for the littlelang scripting language.
#[derive(Parser, Debug)]
#[command(name = "littlelang", version, about, long_about = None)]
struct Args {
    /// Print elapsed time and evaluation counts after the program finishes.
    #[arg(long)]
    stats: bool,

    /// The littlelang source file to run.
    source: PathBuf,

    /// Arguments exposed to the program through args().
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Args::parse();

    let source = match fs::read(&cli.source) {
        Ok(bytes) => bytes,
        Err(_) => {
            println!("error reading {:?}", cli.source);
            return ExitCode::FAILURE;
        }
    };

    let prog = match parse_program(&source) {
        Ok(prog) => prog,
        Err(e) => {
            report_error(&source, &e);
            return ExitCode::FAILURE;
        }
    };

    let start = Instant::now();
    let config = Config { args: cli.args, ..Config::default() };
    let stats = match execute(&prog, config) {
        Ok(stats) => stats,
        Err(e) => {
            report_error(&source, &e);
            return ExitCode::FAILURE;
        }
    };

    if cli.stats {
        let elapsed = start.elapsed();
        let secs = elapsed.as_secs_f64();
        let rate = |n: u64| if secs > 0.0 { n as f64 / secs } else { 0.0 };
        println!(
            "{:?} elapsed: {} ops ({:.0}/s), {} builtin calls ({:.0}/s), {} user calls ({:.0}/s)",
            elapsed,
            stats.ops,
            rate(stats.ops),
            stats.builtin_calls,
            rate(stats.builtin_calls),
            stats.user_calls,
            rate(stats.user_calls),
        );
    }
    ExitCode::SUCCESS
}

/// Diagnostic block: a dash rule the width of the message, the offending
/// source line with a caret under the error column, and the message itself.
fn report_error(source: &[u8], err: &Error) {
    let message = err.to_string();
    show_error_source(source, err.pos, message.len());
    println!("{message}");
}

fn show_error_source(source: &[u8], pos: Position, divider_len: usize) {
    let divider = "-".repeat(divider_len);
    println!("{divider}");
    let lines: Vec<&[u8]> = source.split(|&b| b == b'\n').collect();
    let line = lines.get(pos.line as usize - 1).copied().unwrap_or(b"");
    let line = String::from_utf8_lossy(line);
    let column = pos.column as usize - 1;
    // tabs render as four spaces, so the caret shifts three extra per tab
    let num_tabs = line.chars().take(column).filter(|&c| c == '\t').count();
    println!("{}", line.replace('\t', "    "));
    println!("{}{}^", " ".repeat(column), "   ".repeat(num_tabs));
    println!("{divider}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_args_source_only() {
        let args = Args::try_parse_from(["littlelang", "prog.ll"]).unwrap();
        assert!(!args.stats);
        assert_eq!(args.source, PathBuf::from("prog.ll"));
        assert!(args.args.is_empty());
    }

    #[test]
    fn parse_args_with_stats() {
        let args = Args::try_parse_from(["littlelang", "--stats", "prog.ll"]).unwrap();
        assert!(args.stats);
    }

    #[test]
    fn parse_args_passes_trailing_args_through() {
        let args =
            Args::try_parse_from(["littlelang", "prog.ll", "one", "2", "-x"]).unwrap();
        assert_eq!(args.args, vec!["one", "2", "-x"]);
    }
}
