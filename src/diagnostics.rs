//! The shared error sink threaded through the pipeline: an explicit context
//! value carrying the two error flags and a diagnostic writer, in place of
//! the process-wide static state a naive port would reach for.

use std::io::Write;

use colored::Colorize as _;

use crate::token::{Token, TokenKind};

/// A runtime error raised by the evaluator. Carries the line of the
/// operation that failed so the driver can report `MESSAGE\n[line N]`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct RuntimeError {
	pub message: String,
	pub line: usize,
}

impl RuntimeError {
	#[must_use]
	pub fn new(line: usize, message: impl Into<String>) -> Self {
		Self { line, message: message.into() }
	}
}

/// Carries `had_error`/`had_runtime_error` plus a diagnostic writer, instead
/// of the process-wide mutable statics a naive port of this pipeline would
/// reach for. One instance is threaded through a whole
/// interpreter session; the REPL resets it between prompts (see
/// [`Diagnostics::reset`]).
pub struct Diagnostics {
	writer: Box<dyn Write>,
	pub had_error: bool,
	pub had_runtime_error: bool,
}

impl Diagnostics {
	#[must_use]
	pub fn new_boxed(writer: impl Write + 'static) -> Self {
		Self { writer: Box::new(writer), had_error: false, had_runtime_error: false }
	}

	/// Reports a lexical error with no token context (only a line number).
	pub fn error(&mut self, line: usize, message: &str) {
		self.report(line, "", message);
	}

	/// Reports a parser or resolver error anchored to a specific token:
	/// empty `WHERE` for lexer errors (see [`Diagnostics::error`]),
	/// `" at end"` at `EOF`, `" at 'LEXEME'"` otherwise.
	pub fn error_at(&mut self, token: &Token, message: &str) {
		let location = if token.kind == TokenKind::Eof { " at end".to_owned() } else { format!(" at '{}'", token.lexeme) };
		self.report(token.line, &location, message);
	}

	fn report(&mut self, line: usize, location: &str, message: &str) {
		let _ = writeln!(self.writer, "[line {line}] {}{location}: {message}", "Error".bold().red());
		self.had_error = true;
	}

	/// Reports a runtime error as `MESSAGE\n[line N]` and sets
	/// `had_runtime_error`.
	pub fn runtime_error(&mut self, error: &RuntimeError) {
		let _ = writeln!(self.writer, "{}\n[line {}]", error.message, error.line);
		self.had_runtime_error = true;
	}

	/// Resets both flags. Called between REPL prompts so earlier errors
	/// don't suppress later lines in the same session.
	pub fn reset(&mut self) {
		self.had_error = false;
		self.had_runtime_error = false;
	}
}
