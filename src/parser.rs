//! Recursive-descent predictive parser: tokens in, a statement sequence (or,
//! in REPL mode, a trailing bare expression) out.
//!
//! Grammar precedence climbs `assignment → or → and → equality → comparison
//! → term → factor → unary → call → primary`. Parse errors are reported
//! through [`Diagnostics`] and recovered from via [`Parser::synchronize`]
//! rather than aborting the whole parse, so one run can surface more than
//! one syntax error: report and keep going, skip the next stage, for every
//! static-analysis phase.

use crate::ast::{Expr, ExprKind, FunctionDecl, LitValue, Stmt};
use crate::diagnostics::Diagnostics;
use crate::token::{LiteralValue, Token, TokenKind};
use std::rc::Rc;

const MAX_ARGS: usize = 255;

/// Marks that a parse error was already reported; recovery happens by
/// unwinding to the nearest [`Parser::synchronize`] call, not by carrying
/// error details through `Result`.
struct ParseError;

type PResult<T> = Result<T, ParseError>;

/// Parses a full token stream into a statement sequence.
///
/// When `repl` is `true`, a final expression with no trailing `;` is
/// accepted as a bare `Stmt::Expression`. The caller (the REPL loop) is
/// expected to echo its value instead of discarding it.
pub fn parse(tokens: &[Token], diagnostics: &mut Diagnostics, repl: bool) -> Vec<Stmt> {
	let mut parser = Parser { tokens, current: 0, repl };
	let mut statements = Vec::new();
	while !parser.is_at_end() {
		match parser.declaration(diagnostics) {
			Ok(stmt) => statements.push(stmt),
			Err(ParseError) => parser.synchronize(),
		}
	}
	statements
}

struct Parser<'a> {
	tokens: &'a [Token],
	current: usize,
	repl: bool,
}

impl<'a> Parser<'a> {
	// ---- declarations ----

	fn declaration(&mut self, diagnostics: &mut Diagnostics) -> PResult<Stmt> {
		if self.match_kind(&[TokenKind::Class]) {
			return self.class_declaration(diagnostics);
		}
		if self.match_kind(&[TokenKind::Fun]) {
			return self.function("function", diagnostics).map(|decl| Stmt::Function(Rc::new(decl)));
		}
		if self.match_kind(&[TokenKind::Var]) {
			return self.var_declaration(diagnostics);
		}
		self.statement(diagnostics)
	}

	fn class_declaration(&mut self, diagnostics: &mut Diagnostics) -> PResult<Stmt> {
		let name = self.consume(TokenKind::Identifier, "Expect class name.", diagnostics)?.clone();

		let superclass = if self.match_kind(&[TokenKind::Less]) {
			let superclass_name = self.consume(TokenKind::Identifier, "Expect superclass name.", diagnostics)?.clone();
			Some(Expr::new(ExprKind::Variable(superclass_name)))
		} else {
			None
		};

		self.consume(TokenKind::LeftBrace, "Expect '{' before class body.", diagnostics)?;

		let mut methods = Vec::new();
		while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
			methods.push(Rc::new(self.function("method", diagnostics)?));
		}

		self.consume(TokenKind::RightBrace, "Expect '}' after class body.", diagnostics)?;

		Ok(Stmt::Class(name, superclass, methods))
	}

	/// Parses a `function` production: `IDENT "(" params? ")" block`. Used
	/// both for `fun` declarations and for each method in a class body
	/// (`kind` is only used to word the error messages, matching the
	/// grammar's single shared production for both).
	fn function(&mut self, kind: &str, diagnostics: &mut Diagnostics) -> PResult<FunctionDecl> {
		let name = self.consume(TokenKind::Identifier, &format!("Expect {kind} name."), diagnostics)?.clone();
		self.consume(TokenKind::LeftParen, &format!("Expect '(' after {kind} name."), diagnostics)?;

		let mut params = Vec::new();
		if !self.check(TokenKind::RightParen) {
			loop {
				if params.len() >= MAX_ARGS {
					diagnostics.error_at(self.peek(), "Can't have more than 255 parameters.");
				}
				params.push(self.consume(TokenKind::Identifier, "Expect parameter name.", diagnostics)?.clone());
				if !self.match_kind(&[TokenKind::Comma]) {
					break;
				}
			}
		}
		self.consume(TokenKind::RightParen, "Expect ')' after parameters.", diagnostics)?;

		self.consume(TokenKind::LeftBrace, &format!("Expect '{{' before {kind} body."), diagnostics)?;
		let body = self.block(diagnostics)?;

		Ok(FunctionDecl { name, params, body })
	}

	fn var_declaration(&mut self, diagnostics: &mut Diagnostics) -> PResult<Stmt> {
		let name = self.consume(TokenKind::Identifier, "Expect variable name.", diagnostics)?.clone();

		let initializer = if self.match_kind(&[TokenKind::Equal]) { Some(self.expression(diagnostics)?) } else { None };

		self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.", diagnostics)?;
		Ok(Stmt::Var(name, initializer))
	}

	// ---- statements ----

	fn statement(&mut self, diagnostics: &mut Diagnostics) -> PResult<Stmt> {
		if self.match_kind(&[TokenKind::For]) {
			return self.for_statement(diagnostics);
		}
		if self.match_kind(&[TokenKind::If]) {
			return self.if_statement(diagnostics);
		}
		if self.match_kind(&[TokenKind::Print]) {
			return self.print_statement(diagnostics);
		}
		if self.match_kind(&[TokenKind::Return]) {
			return self.return_statement(diagnostics);
		}
		if self.match_kind(&[TokenKind::While]) {
			return self.while_statement(diagnostics);
		}
		if self.match_kind(&[TokenKind::LeftBrace]) {
			return Ok(Stmt::Block(self.block(diagnostics)?));
		}
		self.expression_statement(diagnostics)
	}

	/// Desugars `for (init; cond; incr) body` into
	/// `{ init; while (cond) { body; incr; } }` at parse time. A missing
	/// `cond` becomes the literal `true`, a missing `init`/`incr` is simply
	/// elided from the nested block.
	fn for_statement(&mut self, diagnostics: &mut Diagnostics) -> PResult<Stmt> {
		self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.", diagnostics)?;

		let initializer = if self.match_kind(&[TokenKind::Semicolon]) {
			None
		} else if self.check(TokenKind::Var) {
			self.advance();
			Some(self.var_declaration(diagnostics)?)
		} else {
			Some(self.expression_statement(diagnostics)?)
		};

		let condition = if self.check(TokenKind::Semicolon) { None } else { Some(self.expression(diagnostics)?) };
		self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.", diagnostics)?;

		let increment = if self.check(TokenKind::RightParen) { None } else { Some(self.expression(diagnostics)?) };
		self.consume(TokenKind::RightParen, "Expect ')' after for clauses.", diagnostics)?;

		let mut body = self.statement(diagnostics)?;

		if let Some(increment) = increment {
			body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
		}

		let condition = condition.unwrap_or_else(|| Expr::new(ExprKind::Literal(LitValue::Bool(true))));
		body = Stmt::While(condition, Box::new(body));

		if let Some(initializer) = initializer {
			body = Stmt::Block(vec![initializer, body]);
		}

		Ok(body)
	}

	fn if_statement(&mut self, diagnostics: &mut Diagnostics) -> PResult<Stmt> {
		self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.", diagnostics)?;
		let condition = self.expression(diagnostics)?;
		self.consume(TokenKind::RightParen, "Expect ')' after if condition.", diagnostics)?;

		let then_branch = Box::new(self.statement(diagnostics)?);
		let else_branch = if self.match_kind(&[TokenKind::Else]) { Some(Box::new(self.statement(diagnostics)?)) } else { None };

		Ok(Stmt::If(condition, then_branch, else_branch))
	}

	fn print_statement(&mut self, diagnostics: &mut Diagnostics) -> PResult<Stmt> {
		let value = self.expression(diagnostics)?;
		self.consume(TokenKind::Semicolon, "Expect ';' after value.", diagnostics)?;
		Ok(Stmt::Print(value))
	}

	fn return_statement(&mut self, diagnostics: &mut Diagnostics) -> PResult<Stmt> {
		let keyword = self.previous().clone();
		let value = if self.check(TokenKind::Semicolon) { None } else { Some(self.expression(diagnostics)?) };
		self.consume(TokenKind::Semicolon, "Expect ';' after return value.", diagnostics)?;
		Ok(Stmt::Return(keyword, value))
	}

	fn while_statement(&mut self, diagnostics: &mut Diagnostics) -> PResult<Stmt> {
		self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.", diagnostics)?;
		let condition = self.expression(diagnostics)?;
		self.consume(TokenKind::RightParen, "Expect ')' after condition.", diagnostics)?;
		let body = Box::new(self.statement(diagnostics)?);
		Ok(Stmt::While(condition, body))
	}

	fn block(&mut self, diagnostics: &mut Diagnostics) -> PResult<Vec<Stmt>> {
		let mut statements = Vec::new();
		while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
			match self.declaration(diagnostics) {
				Ok(stmt) => statements.push(stmt),
				Err(ParseError) => self.synchronize(),
			}
		}
		self.consume(TokenKind::RightBrace, "Expect '}' after block.", diagnostics)?;
		Ok(statements)
	}

	fn expression_statement(&mut self, diagnostics: &mut Diagnostics) -> PResult<Stmt> {
		let expr = self.expression(diagnostics)?;

		// REPL affordance: a trailing expression with no semicolon, right at
		// EOF, is accepted and echoed by the evaluator instead of erroring.
		if self.repl && self.check(TokenKind::Eof) && !self.check(TokenKind::Semicolon) {
			return Ok(Stmt::Expression(expr));
		}

		self.consume(TokenKind::Semicolon, "Expect ';' after expression.", diagnostics)?;
		Ok(Stmt::Expression(expr))
	}

	// ---- expressions ----

	fn expression(&mut self, diagnostics: &mut Diagnostics) -> PResult<Expr> {
		self.assignment(diagnostics)
	}

	/// Parses a general expression first; if `=` follows, the left-hand
	/// side must already have parsed as a `Variable` (rewritten here to
	/// `Assign`) or a `Get` (rewritten to `Set`). Any other left-hand side
	/// is a parse error reported on the `=` token; the already-parsed
	/// left-hand side is still returned so parsing can continue.
	fn assignment(&mut self, diagnostics: &mut Diagnostics) -> PResult<Expr> {
		let expr = self.or(diagnostics)?;

		if self.match_kind(&[TokenKind::Equal]) {
			let equals = self.previous().clone();
			let value = self.assignment(diagnostics)?;

			return match expr.kind {
				ExprKind::Variable(name) => Ok(Expr::new(ExprKind::Assign(name, Box::new(value)))),
				ExprKind::Get(object, name) => Ok(Expr::new(ExprKind::Set(object, name, Box::new(value)))),
				_ => {
					diagnostics.error_at(&equals, "Invalid assignment target.");
					Ok(expr)
				},
			};
		}

		Ok(expr)
	}

	fn or(&mut self, diagnostics: &mut Diagnostics) -> PResult<Expr> {
		let mut expr = self.and(diagnostics)?;
		while self.match_kind(&[TokenKind::Or]) {
			let op = self.previous().clone();
			let right = self.and(diagnostics)?;
			expr = Expr::new(ExprKind::Logical(Box::new(expr), op, Box::new(right)));
		}
		Ok(expr)
	}

	fn and(&mut self, diagnostics: &mut Diagnostics) -> PResult<Expr> {
		let mut expr = self.equality(diagnostics)?;
		while self.match_kind(&[TokenKind::And]) {
			let op = self.previous().clone();
			let right = self.equality(diagnostics)?;
			expr = Expr::new(ExprKind::Logical(Box::new(expr), op, Box::new(right)));
		}
		Ok(expr)
	}

	fn equality(&mut self, diagnostics: &mut Diagnostics) -> PResult<Expr> {
		self.binary_level(Self::comparison, &[TokenKind::BangEqual, TokenKind::EqualEqual], diagnostics)
	}

	fn comparison(&mut self, diagnostics: &mut Diagnostics) -> PResult<Expr> {
		self.binary_level(Self::term, &[TokenKind::Greater, TokenKind::GreaterEqual, TokenKind::Less, TokenKind::LessEqual], diagnostics)
	}

	fn term(&mut self, diagnostics: &mut Diagnostics) -> PResult<Expr> {
		self.binary_level(Self::factor, &[TokenKind::Minus, TokenKind::Plus], diagnostics)
	}

	fn factor(&mut self, diagnostics: &mut Diagnostics) -> PResult<Expr> {
		self.binary_level(Self::unary, &[TokenKind::Slash, TokenKind::Star], diagnostics)
	}

	/// Shared left-associative binary operator climbing step, parameterized
	/// over the next-tighter precedence level and the set of operator token
	/// kinds this level matches.
	fn binary_level(&mut self, mut operand: impl FnMut(&mut Self, &mut Diagnostics) -> PResult<Expr>, kinds: &[TokenKind], diagnostics: &mut Diagnostics) -> PResult<Expr> {
		let mut expr = operand(self, diagnostics)?;
		while self.match_kind(kinds) {
			let op = self.previous().clone();
			let right = operand(self, diagnostics)?;
			expr = Expr::new(ExprKind::Binary(Box::new(expr), op, Box::new(right)));
		}
		Ok(expr)
	}

	fn unary(&mut self, diagnostics: &mut Diagnostics) -> PResult<Expr> {
		if self.match_kind(&[TokenKind::Bang, TokenKind::Minus]) {
			let op = self.previous().clone();
			let operand = self.unary(diagnostics)?;
			return Ok(Expr::new(ExprKind::Unary(op, Box::new(operand))));
		}
		self.call(diagnostics)
	}

	fn call(&mut self, diagnostics: &mut Diagnostics) -> PResult<Expr> {
		let mut expr = self.primary(diagnostics)?;

		loop {
			if self.match_kind(&[TokenKind::LeftParen]) {
				expr = self.finish_call(expr, diagnostics)?;
			} else if self.match_kind(&[TokenKind::Dot]) {
				let name = self.consume(TokenKind::Identifier, "Expect property name after '.'.", diagnostics)?.clone();
				expr = Expr::new(ExprKind::Get(Box::new(expr), name));
			} else {
				break;
			}
		}

		Ok(expr)
	}

	fn finish_call(&mut self, callee: Expr, diagnostics: &mut Diagnostics) -> PResult<Expr> {
		let mut arguments = Vec::new();
		if !self.check(TokenKind::RightParen) {
			loop {
				if arguments.len() >= MAX_ARGS {
					diagnostics.error_at(self.peek(), "Can't have more than 255 arguments.");
				}
				arguments.push(self.expression(diagnostics)?);
				if !self.match_kind(&[TokenKind::Comma]) {
					break;
				}
			}
		}
		let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.", diagnostics)?.clone();
		Ok(Expr::new(ExprKind::Call(Box::new(callee), paren, arguments)))
	}

	fn primary(&mut self, diagnostics: &mut Diagnostics) -> PResult<Expr> {
		if self.match_kind(&[TokenKind::False]) {
			return Ok(Expr::new(ExprKind::Literal(LitValue::Bool(false))));
		}
		if self.match_kind(&[TokenKind::True]) {
			return Ok(Expr::new(ExprKind::Literal(LitValue::Bool(true))));
		}
		if self.match_kind(&[TokenKind::Nil]) {
			return Ok(Expr::new(ExprKind::Literal(LitValue::Nil)));
		}
		if self.match_kind(&[TokenKind::Number]) {
			let LiteralValue::Number(n) = &self.previous().literal else { unreachable!("NUMBER token always carries a decoded Number literal") };
			return Ok(Expr::new(ExprKind::Literal(LitValue::Number(*n))));
		}
		if self.match_kind(&[TokenKind::String]) {
			let LiteralValue::Str(s) = self.previous().literal.clone() else { unreachable!("STRING token always carries a decoded Str literal") };
			return Ok(Expr::new(ExprKind::Literal(LitValue::Str(s))));
		}
		if self.match_kind(&[TokenKind::Super]) {
			let keyword = self.previous().clone();
			self.consume(TokenKind::Dot, "Expect '.' after 'super'.", diagnostics)?;
			let method = self.consume(TokenKind::Identifier, "Expect superclass method name.", diagnostics)?.clone();
			return Ok(Expr::new(ExprKind::Super(keyword, method)));
		}
		if self.match_kind(&[TokenKind::This]) {
			return Ok(Expr::new(ExprKind::This(self.previous().clone())));
		}
		if self.match_kind(&[TokenKind::Identifier]) {
			return Ok(Expr::new(ExprKind::Variable(self.previous().clone())));
		}
		if self.match_kind(&[TokenKind::LeftParen]) {
			let expr = self.expression(diagnostics)?;
			self.consume(TokenKind::RightParen, "Expect ')' after expression.", diagnostics)?;
			return Ok(Expr::new(ExprKind::Grouping(Box::new(expr))));
		}

		diagnostics.error_at(self.peek(), "Expect expression.");
		Err(ParseError)
	}

	// ---- token stream primitives ----

	fn match_kind(&mut self, kinds: &[TokenKind]) -> bool {
		for &kind in kinds {
			if self.check(kind) {
				self.advance();
				return true;
			}
		}
		false
	}

	fn check(&self, kind: TokenKind) -> bool {
		!self.is_at_end() && self.peek().kind == kind
	}

	fn advance(&mut self) -> &Token {
		if !self.is_at_end() {
			self.current += 1;
		}
		self.previous()
	}

	fn is_at_end(&self) -> bool {
		self.peek().kind == TokenKind::Eof
	}

	fn peek(&self) -> &Token {
		&self.tokens[self.current]
	}

	fn previous(&self) -> &Token {
		&self.tokens[self.current - 1]
	}

	fn consume(&mut self, kind: TokenKind, message: &str, diagnostics: &mut Diagnostics) -> PResult<&Token> {
		if self.check(kind) {
			return Ok(self.advance());
		}
		diagnostics.error_at(self.peek(), message);
		Err(ParseError)
	}

	/// Discards tokens until the next statement boundary (a consumed `;` or
	/// a token that starts a likely statement), so the parser can resume at
	/// the next declaration after a syntax error instead of cascading
	/// spurious errors from the same bad parse state.
	fn synchronize(&mut self) {
		self.advance();

		while !self.is_at_end() {
			if self.previous().kind == TokenKind::Semicolon {
				return;
			}

			if matches!(
				self.peek().kind,
				TokenKind::Class | TokenKind::Fun | TokenKind::Var | TokenKind::For | TokenKind::If | TokenKind::While | TokenKind::Print | TokenKind::Return
			) {
				return;
			}

			self.advance();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scanner::Scanner;

	fn parse_source(source: &str) -> (Vec<Stmt>, Diagnostics) {
		let mut diagnostics = Diagnostics::new_boxed(Vec::new());
		let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
		let statements = parse(&tokens, &mut diagnostics, false);
		(statements, diagnostics)
	}

	#[test]
	fn parses_arithmetic_precedence() {
		let (statements, diagnostics) = parse_source("1 + 2 * 3;");
		assert!(!diagnostics.had_error);
		assert_eq!(statements.len(), 1);
		let Stmt::Expression(Expr { kind: ExprKind::Binary(left, op, _), .. }) = &statements[0] else { panic!("expected binary expression statement") };
		assert_eq!(op.kind, TokenKind::Plus);
		assert!(matches!(left.kind, ExprKind::Literal(LitValue::Number(n)) if n == 1.0));
	}

	#[test]
	fn for_desugars_to_block_with_while() {
		let (statements, diagnostics) = parse_source("for (var i = 0; i < 3; i = i + 1) print i;");
		assert!(!diagnostics.had_error);
		let Stmt::Block(outer) = &statements[0] else { panic!("expected desugared block") };
		assert!(matches!(outer[0], Stmt::Var(..)));
		assert!(matches!(outer[1], Stmt::While(..)));
	}

	#[test]
	fn assignment_to_non_lvalue_is_reported_but_recovers() {
		let (statements, diagnostics) = parse_source("1 = 2;");
		assert!(diagnostics.had_error);
		// Parsing still produces a statement (the left-hand side), so later
		// lines in the same run are unaffected.
		assert_eq!(statements.len(), 1);
	}

	#[test]
	fn missing_semicolon_reports_error_and_synchronizes() {
		let (statements, diagnostics) = parse_source("print 1 print 2;");
		assert!(diagnostics.had_error);
		// The second `print` statement still parses after synchronizing.
		assert_eq!(statements.len(), 1);
		assert!(matches!(statements[0], Stmt::Print(_)));
	}

	#[test]
	fn repl_mode_accepts_trailing_bare_expression() {
		let mut diagnostics = Diagnostics::new_boxed(Vec::new());
		let tokens = Scanner::new("1 + 2").scan_tokens(&mut diagnostics);
		let statements = parse(&tokens, &mut diagnostics, true);
		assert!(!diagnostics.had_error);
		assert_eq!(statements.len(), 1);
		assert!(matches!(statements[0], Stmt::Expression(_)));
	}

	#[test]
	fn class_with_superclass_and_methods() {
		let (statements, diagnostics) = parse_source("class B < A { hi() { print \"hi\"; } }");
		assert!(!diagnostics.had_error);
		let Stmt::Class(name, superclass, methods) = &statements[0] else { panic!("expected class statement") };
		assert_eq!(name.lexeme, "B");
		assert!(superclass.is_some());
		assert_eq!(methods.len(), 1);
		assert_eq!(methods[0].name.lexeme, "hi");
	}
}
