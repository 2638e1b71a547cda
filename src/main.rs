//! The `lox` CLI: no arguments starts a REPL, one argument runs a file,
//! more than one is a usage error. Exit codes follow the `sysexits` family:
//! `64` usage, `65` static error, `70` runtime error, `74` I/O error reading
//! the script.

use std::io::{self, BufRead, Write as _};
use std::process::ExitCode;

use anyhow::Context as _;
use colored::Colorize as _;
use lox::diagnostics::Diagnostics;
use lox::interpreter::Interpreter;

fn main() -> ExitCode {
	let args: Vec<String> = std::env::args().skip(1).collect();
	match args.as_slice() {
		[] => run_repl(),
		[path] => run_file(path),
		_ => {
			eprintln!("Usage: lox [script]");
			ExitCode::from(64)
		},
	}
}

fn read_source(path: &str) -> anyhow::Result<String> {
	std::fs::read_to_string(path).with_context(|| format!("couldn't read script '{path}'"))
}

fn run_file(path: &str) -> ExitCode {
	let source = match read_source(path) {
		Ok(source) => source,
		Err(error) => {
			eprintln!("{error:#}");
			return ExitCode::from(74);
		},
	};

	let mut diagnostics = Diagnostics::new_boxed(io::stderr());
	let mut interpreter = Interpreter::new(io::stdout());
	lox::run(&source, &mut interpreter, &mut diagnostics, false);

	if diagnostics.had_error {
		ExitCode::from(65)
	} else if diagnostics.had_runtime_error {
		ExitCode::from(70)
	} else {
		ExitCode::SUCCESS
	}
}

/// Prints `> `, reads one line, evaluates, loops until EOF.
/// The static-error flag resets between prompts so an error on one line
/// never prevents later lines from running; a runtime error likewise never
/// ends the session, only the REPL's own exit code never reflects either.
fn run_repl() -> ExitCode {
	let stdin = io::stdin();
	let mut diagnostics = Diagnostics::new_boxed(io::stderr());
	let mut interpreter = Interpreter::new(io::stdout());

	loop {
		print!("{} ", ">".blue().bold());
		if io::stdout().flush().is_err() {
			break;
		}

		let mut line = String::new();
		match stdin.lock().read_line(&mut line) {
			Ok(0) | Err(_) => break,
			Ok(_) => {},
		}

		diagnostics.reset();
		lox::run(&line, &mut interpreter, &mut diagnostics, true);
	}

	ExitCode::SUCCESS
}
