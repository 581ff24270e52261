//! Operator console – single-character commands read from stdin while the
//! relay streams.
//!
//! Supported commands:
//!   q     – stop streaming and exit
//!   h, ?  – show this list

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A recognised console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    Help,
}

/// Map an input line to a command.  Only the first non-blank character
/// counts.
pub fn parse(line: &str) -> Option<ReplCommand> {
    match line.trim().chars().next()? {
        'q' | 'Q' => Some(ReplCommand::Quit),
        'h' | 'H' | '?' => Some(ReplCommand::Help),
        _ => None,
    }
}

/// Run the console on stdin/stdout until `q`, EOF, or `shutdown` is raised
/// elsewhere.
pub fn run(shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    run_with(stdin.lock(), io::stdout(), &shutdown);
}

pub(crate) fn run_with(mut input: impl BufRead, mut out: impl Write, shutdown: &AtomicBool) {
    let mut line = String::new();
    loop {
        if shutdown.load(Ordering::Acquire) {
            break;
        }

        line.clear();
        match input.read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                let _ = writeln!(out, "{}: {}", "Read error".red(), e);
                break;
            }
        }
        if line.trim().is_empty() {
            continue;
        }

        match parse(&line) {
            Some(ReplCommand::Quit) => {
                let _ = writeln!(out, "{}", "Stopping relay …".yellow());
                shutdown.store(true, Ordering::Release);
                break;
            }
            Some(ReplCommand::Help) => print_help(&mut out),
            None => {
                let _ = writeln!(
                    out,
                    "{} '{}'. Press {} for help.",
                    "Unknown command:".red(),
                    line.trim().yellow(),
                    "h".bold()
                );
            }
        }
    }
}

fn print_help(out: &mut impl Write) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "Lightcraft Commands".bold().underline());
    let _ = writeln!(out, "  {}     – stop streaming and exit", "q".bold().cyan());
    let _ = writeln!(out, "  {}  – show this help", "h  ?".bold().cyan());
    let _ = writeln!(out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run_script(script: &str, shutdown: &AtomicBool) -> String {
        colored::control::set_override(false);
        let mut out = Vec::new();
        run_with(Cursor::new(script.to_string()), &mut out, shutdown);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parse_commands() {
        assert_eq!(parse("q"), Some(ReplCommand::Quit));
        assert_eq!(parse("  Q\n"), Some(ReplCommand::Quit));
        assert_eq!(parse("h"), Some(ReplCommand::Help));
        assert_eq!(parse("?"), Some(ReplCommand::Help));
        assert_eq!(parse("x"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn quit_raises_shutdown() {
        let shutdown = AtomicBool::new(false);
        let out = run_script("h\nq\nh\n", &shutdown);
        assert!(shutdown.load(Ordering::Acquire));
        assert_eq!(out.matches("Lightcraft Commands").count(), 1);
    }

    #[test]
    fn eof_leaves_shutdown_untouched() {
        let shutdown = AtomicBool::new(false);
        let out = run_script("\n\nz\n", &shutdown);
        assert!(!shutdown.load(Ordering::Acquire));
        assert!(out.contains("Unknown command"));
    }

    #[test]
    fn external_shutdown_stops_before_reading() {
        let shutdown = AtomicBool::new(true);
        let out = run_script("h\n", &shutdown);
        assert!(out.is_empty());
    }
}
