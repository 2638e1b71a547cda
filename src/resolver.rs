//! The static variable-resolution pass: walks a parsed program once, without
//! evaluating anything, recording for every `Variable`/`Assign`/`This`/
//! `Super` node how many enclosing environments to skip to find its
//! binding. Also the home for every purely-static-analysis error this
//! interpreter catches before running anything (self-reference in
//! initializers, re-declaration, `return`/`this`/`super` misuse).

use std::collections::HashMap;

use crate::ast::{Expr, ExprId, ExprKind, FunctionDecl, Stmt};
use crate::diagnostics::Diagnostics;
use crate::token::Token;

/// The resolver's output: for every `Variable`/`Assign`/`This`/`Super` node
/// (keyed by its stable [`ExprId`]), how many enclosing environments to
/// skip at evaluation time. Absence means "look it up in globals".
pub type Locals = HashMap<ExprId, usize>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
	None,
	Function,
	Method,
	Initializer,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ClassKind {
	None,
	Class,
	Subclass,
}

/// One lexical scope frame: identifier → "has its initializer finished
/// resolving yet". A `false` entry marks a variable whose own initializer
/// is still being resolved, catching `var a = a;`.
type Scope = HashMap<String, bool>;

pub struct Resolver<'a> {
	diagnostics: &'a mut Diagnostics,
	scopes: Vec<Scope>,
	locals: Locals,
	current_function: FunctionKind,
	current_class: ClassKind,
}

impl<'a> Resolver<'a> {
	#[must_use]
	pub fn new(diagnostics: &'a mut Diagnostics) -> Self {
		Self { diagnostics, scopes: Vec::new(), locals: Locals::new(), current_function: FunctionKind::None, current_class: ClassKind::None }
	}

	/// Resolves a whole statement sequence (a file, or one REPL line's
	/// worth of statements) and returns the side-table entries it produced.
	#[must_use]
	pub fn resolve(mut self, statements: &[Stmt]) -> Locals {
		self.resolve_statements(statements);
		self.locals
	}

	fn resolve_statements(&mut self, statements: &[Stmt]) {
		for statement in statements {
			self.resolve_stmt(statement);
		}
	}

	fn resolve_stmt(&mut self, stmt: &Stmt) {
		match stmt {
			Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),
			Stmt::Var(name, initializer) => {
				self.declare(name);
				if let Some(initializer) = initializer {
					self.resolve_expr(initializer);
				}
				self.define(name);
			},
			Stmt::Block(statements) => {
				self.begin_scope();
				self.resolve_statements(statements);
				self.end_scope();
			},
			Stmt::If(condition, then_branch, else_branch) => {
				self.resolve_expr(condition);
				self.resolve_stmt(then_branch);
				if let Some(else_branch) = else_branch {
					self.resolve_stmt(else_branch);
				}
			},
			Stmt::While(condition, body) => {
				self.resolve_expr(condition);
				self.resolve_stmt(body);
			},
			Stmt::Function(decl) => {
				self.declare(&decl.name);
				self.define(&decl.name);
				self.resolve_function(decl, FunctionKind::Function);
			},
			Stmt::Return(keyword, value) => {
				if self.current_function == FunctionKind::None {
					self.diagnostics.error_at(keyword, "Can't return from top-level code.");
				}
				if let Some(value) = value {
					if self.current_function == FunctionKind::Initializer {
						self.diagnostics.error_at(keyword, "Can't return a value from an initializer.");
					}
					self.resolve_expr(value);
				}
			},
			Stmt::Class(name, superclass, methods) => self.resolve_class(name, superclass.as_ref(), methods),
		}
	}

	fn resolve_class(&mut self, name: &Token, superclass: Option<&Expr>, methods: &[std::rc::Rc<FunctionDecl>]) {
		let enclosing_class = self.current_class;
		self.current_class = ClassKind::Class;

		self.declare(name);
		self.define(name);

		if let Some(superclass_expr) = superclass {
			let ExprKind::Variable(superclass_name) = &superclass_expr.kind else { unreachable!("parser only ever builds a Variable expr for a superclass") };
			if superclass_name.lexeme == name.lexeme {
				self.diagnostics.error_at(superclass_name, "A class can't inherit from itself.");
			}
			self.current_class = ClassKind::Subclass;
			self.resolve_expr(superclass_expr);

			self.begin_scope();
			self.scopes.last_mut().expect("scope just pushed").insert("super".to_owned(), true);
		}

		self.begin_scope();
		self.scopes.last_mut().expect("scope just pushed").insert("this".to_owned(), true);

		for method in methods {
			let kind = if method.name.lexeme == "init" { FunctionKind::Initializer } else { FunctionKind::Method };
			self.resolve_function(method, kind);
		}

		self.end_scope();

		if superclass.is_some() {
			self.end_scope();
		}

		self.current_class = enclosing_class;
	}

	fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionKind) {
		let enclosing_function = self.current_function;
		self.current_function = kind;

		self.begin_scope();
		for param in &decl.params {
			self.declare(param);
			self.define(param);
		}
		self.resolve_statements(&decl.body);
		self.end_scope();

		self.current_function = enclosing_function;
	}

	fn resolve_expr(&mut self, expr: &Expr) {
		match &expr.kind {
			ExprKind::Literal(_) => {},
			ExprKind::Grouping(inner) => self.resolve_expr(inner),
			ExprKind::Unary(_, operand) => self.resolve_expr(operand),
			ExprKind::Binary(left, _, right) | ExprKind::Logical(left, _, right) => {
				self.resolve_expr(left);
				self.resolve_expr(right);
			},
			ExprKind::Variable(name) => {
				if let Some(scope) = self.scopes.last() {
					if scope.get(name.lexeme.as_str()) == Some(&false) {
						self.diagnostics.error_at(name, "Can't read local variable in its own initializer.");
					}
				}
				self.resolve_local(expr.id, &name.lexeme);
			},
			ExprKind::Assign(name, value) => {
				self.resolve_expr(value);
				self.resolve_local(expr.id, &name.lexeme);
			},
			ExprKind::Call(callee, _, arguments) => {
				self.resolve_expr(callee);
				for argument in arguments {
					self.resolve_expr(argument);
				}
			},
			ExprKind::Get(object, _) => self.resolve_expr(object),
			ExprKind::Set(object, _, value) => {
				self.resolve_expr(value);
				self.resolve_expr(object);
			},
			ExprKind::This(keyword) => {
				if self.current_class == ClassKind::None {
					self.diagnostics.error_at(keyword, "Can't use 'this' outside of a class.");
					return;
				}
				self.resolve_local(expr.id, "this");
			},
			ExprKind::Super(keyword, _) => {
				match self.current_class {
					ClassKind::None => self.diagnostics.error_at(keyword, "Can't use 'super' outside of a class."),
					ClassKind::Class => self.diagnostics.error_at(keyword, "Can't use 'super' in a class with no superclass."),
					ClassKind::Subclass => self.resolve_local(expr.id, "super"),
				}
			},
		}
	}

	/// Walks the scope stack from innermost outward; the first frame that
	/// defines `name` fixes the resolution depth recorded for `id`. No entry
	/// is recorded if no local scope defines it; it's a global.
	fn resolve_local(&mut self, id: ExprId, name: &str) {
		for (depth, scope) in self.scopes.iter().rev().enumerate() {
			if scope.contains_key(name) {
				self.locals.insert(id, depth);
				return;
			}
		}
	}

	fn begin_scope(&mut self) {
		self.scopes.push(Scope::new());
	}

	fn end_scope(&mut self) {
		self.scopes.pop();
	}

	fn declare(&mut self, name: &Token) {
		let Some(scope) = self.scopes.last_mut() else { return };
		if scope.contains_key(name.lexeme.as_str()) {
			self.diagnostics.error_at(name, "Already a variable with this name in this scope.");
		}
		scope.insert(name.lexeme.clone(), false);
	}

	fn define(&mut self, name: &Token) {
		let Some(scope) = self.scopes.last_mut() else { return };
		scope.insert(name.lexeme.clone(), true);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::parser::parse;
	use crate::scanner::Scanner;

	fn resolve_source(source: &str) -> (Locals, Vec<Stmt>, Diagnostics) {
		let mut diagnostics = Diagnostics::new_boxed(Vec::new());
		let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
		let statements = parse(&tokens, &mut diagnostics, false);
		let locals = Resolver::new(&mut diagnostics).resolve(&statements);
		(locals, statements, diagnostics)
	}

	#[test]
	fn self_initializer_reference_is_an_error() {
		let (_, _, diagnostics) = resolve_source("{ var a = a; }");
		assert!(diagnostics.had_error);
	}

	#[test]
	fn redeclaration_in_same_scope_is_an_error() {
		let (_, _, diagnostics) = resolve_source("{ var a = 1; var a = 2; }");
		assert!(diagnostics.had_error);
	}

	#[test]
	fn global_redeclaration_is_allowed() {
		let (_, _, diagnostics) = resolve_source("var a = 1; var a = 2;");
		assert!(!diagnostics.had_error);
	}

	#[test]
	fn this_outside_class_is_an_error() {
		let (_, _, diagnostics) = resolve_source("print this;");
		assert!(diagnostics.had_error);
	}

	#[test]
	fn return_outside_function_is_an_error() {
		let (_, _, diagnostics) = resolve_source("return 1;");
		assert!(diagnostics.had_error);
	}

	#[test]
	fn returning_value_from_initializer_is_an_error() {
		let (_, _, diagnostics) = resolve_source("class A { init() { return 1; } }");
		assert!(diagnostics.had_error);
	}

	#[test]
	fn class_inheriting_from_itself_is_an_error() {
		let (_, _, diagnostics) = resolve_source("class A < A {}");
		assert!(diagnostics.had_error);
	}

	#[test]
	fn super_without_superclass_is_an_error() {
		let (_, _, diagnostics) = resolve_source("class A { hi() { super.hi(); } }");
		assert!(diagnostics.had_error);
	}

	#[test]
	fn closure_variable_resolves_to_defining_scope_depth() {
		// `f`'s body reads `a` from one scope out (the block), not the
		// global scope shadowed later by `var a = "local";`.
		let (locals, statements, diagnostics) = resolve_source(
			r#"
			var a = "global";
			{
				fun f() { print a; }
				var a = "local";
				f();
			}
			"#,
		);
		assert!(!diagnostics.had_error);
		let Stmt::Block(block) = &statements[1] else { panic!("expected block") };
		let Stmt::Function(decl) = &block[0] else { panic!("expected function decl") };
		let Stmt::Print(print_expr) = &decl.body[0] else { panic!("expected print statement") };
		// `a` inside `f` is global (no entry), because `f`'s enclosing scope
		// at the time it's declared doesn't yet have a local `a`.
		assert!(!locals.contains_key(&print_expr.id));
	}
}
