//! Statement nodes.

use std::rc::Rc;

use crate::ast::expr::Expr;
use crate::token::Token;

/// A `fun`/method declaration's fixed parts: name, parameter list, and body.
/// Shared via `Rc` between the AST (`Stmt::Function`, `Stmt::Class`'s
/// method list) and any `LoxFunction` values created from it, so calling a
/// function repeatedly never clones its body.
#[derive(Debug)]
pub struct FunctionDecl {
	pub name: Token,
	pub params: Vec<Token>,
	pub body: Vec<Stmt>,
}

#[derive(Debug)]
pub enum Stmt {
	Expression(Expr),
	Print(Expr),
	Var(Token, Option<Expr>),
	Block(Vec<Stmt>),
	If(Expr, Box<Stmt>, Option<Box<Stmt>>),
	While(Expr, Box<Stmt>),
	Function(Rc<FunctionDecl>),
	Return(Token, Option<Expr>),
	/// `superclass` is `Some(Variable(name))` when the class declares one.
	/// Keeping it as an `Expr` (rather than a bare `Token`) lets the resolver and
	/// evaluator treat it exactly like any other variable reference,
	/// including recording its resolution depth in the same side-table.
	Class(Token, Option<Expr>, Vec<Rc<FunctionDecl>>),
}
