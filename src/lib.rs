//! The scan → parse → resolve → evaluate pipeline, exposed as a library so
//! the `lox` binary's file/REPL drivers and the end-to-end tests share one
//! implementation.

pub mod ast;
pub mod diagnostics;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;

use diagnostics::Diagnostics;
use interpreter::Interpreter;
use resolver::Resolver;
use scanner::Scanner;

/// Runs one unit of source (a whole file, or one REPL line) through the
/// full pipeline against `interpreter`. A static error (lexer/parser/
/// resolver) suppresses evaluation entirely; it does not abort its own
/// phase, which keeps running to surface every error it can in one pass.
pub fn run(source: &str, interpreter: &mut Interpreter, diagnostics: &mut Diagnostics, repl: bool) {
	let tokens = Scanner::new(source).scan_tokens(diagnostics);
	let statements = parser::parse(&tokens, diagnostics, repl);
	if diagnostics.had_error {
		return;
	}
	let locals = Resolver::new(diagnostics).resolve(&statements);
	if diagnostics.had_error {
		return;
	}
	interpreter.load_locals(locals);
	interpreter.interpret(&statements, diagnostics, repl);
}
